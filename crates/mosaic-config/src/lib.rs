//! Mosaic Config
//!
//! This crate contains the serializable widget types for Mosaic. A widget
//! definition is the authored document describing where a widget's data comes
//! from, how raw provider records map onto display fields, how the widget is
//! laid out, and how it talks to other widgets over the event bus.
//!
//! Definitions can be loaded from:
//! - JSON files (hand-written or generated)
//! - Database storage (as JSON blobs owned by the hosting dashboard)
//!
//! The validator checks these types for structural completeness before the
//! pipeline, filter engine or runtime touch them. Widget instances are the
//! stored per-dashboard records, upgraded by the migration engine on load.

mod data_source;
mod field;
mod instance;
mod interaction;
mod layout;
mod widget;

pub use data_source::{DataSource, HttpMethod};
pub use field::{FieldMapping, FieldType};
pub use instance::{LayoutPosition, WidgetInstance};
pub use interaction::{
  EventPublishSpec, EventSubscription, FilterOperator, FilterSpec, HighlightSpec, Interactions,
  NotificationLevel, NotificationSpec, SubscriptionAction,
};
pub use layout::{
  CardFields, CardsLayout, ChartLayout, ChartType, Layout, ListFields, ListLayout, MetricLayout,
  TableColumn, TableLayout,
};
pub use widget::{Metadata, WidgetDef};
