//! Mosaic runtime.
//!
//! The dashboard host. It mounts widget instances, keeps their records fresh
//! through a [`Provider`], routes user selections onto the event bus and runs
//! every subscription's action against the subscribing widget's records.
//!
//! # Lifecycle of one widget
//! 1. `mount`: validate the definition, normalize the instance through the
//!    widget registry, register subscriptions, start fetching
//! 2. fetch cycles: provider JSON → `dataPath` → field mappings → records
//! 3. `select`: render the `onSelect` payload from a record and publish it
//! 4. events from other widgets: filter, highlight or notify
//! 5. `remove`: cancel the timer, unsubscribe, drop state
//!
//! The renderer learns about every change through a [`WidgetNotifier`].

mod config;
mod dashboard;
mod error;
mod events;
mod fetch;
mod provider;
mod widget;

pub use config::RuntimeConfig;
pub use dashboard::{Dashboard, Mounted};
pub use error::RuntimeError;
pub use events::{ChannelNotifier, NoopNotifier, WidgetEvent, WidgetNotifier};
pub use fetch::FetchOutcome;
pub use provider::{Provider, ProviderError, ProviderRequest};
