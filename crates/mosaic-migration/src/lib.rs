//! Mosaic migrations.
//!
//! Stored widget instances outlive the code that created them. Each widget
//! type registers its current config version, its default config, and one
//! migration per version step:
//!
//! ```text
//! v1 ──migration[1]──► v2 ──migration[2]──► v3 (current)
//! ```
//!
//! Loading an instance runs it through [`WidgetRegistry::normalize`], which
//! walks the chain from the stored version to the current one. A gap in the
//! chain stops the walk at the last version reached; steps already applied
//! are kept. The outcome is always a [`Normalized`] value, never an error, so
//! one stale widget cannot stop a dashboard from loading.

mod error;
mod merge;
mod registry;

pub use error::MigrationError;
pub use merge::merge_config;
pub use registry::{MigrationFn, Normalized, WidgetRegistry, WidgetType};
