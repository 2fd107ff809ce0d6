//! Mosaic validator.
//!
//! Widget definitions are the only input in Mosaic that is allowed to be
//! rejected outright. Everything downstream of a definition degrades instead
//! of failing, so the checks here are where authoring mistakes surface.
//!
//! Two entry points:
//! - [`validate`] checks a typed [`WidgetDef`](mosaic_config::WidgetDef)
//! - [`validate_value`] checks an untyped JSON document, reporting missing
//!   keys by location before it attempts to deserialize
//!
//! Both return a [`ValidationReport`]. Errors make a definition invalid;
//! warnings are advisory.
//!
//! [`read_definition`] loads a definition file and refuses invalid ones.

mod document;
mod error;
mod load;
mod report;
mod rules;

pub use document::validate_value;
pub use error::LoadError;
pub use load::read_definition;
pub use report::{ValidationIssue, ValidationReport};
pub use rules::validate;
