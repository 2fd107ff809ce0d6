use serde::{Deserialize, Serialize};

use crate::data_source::DataSource;
use crate::field::FieldMapping;
use crate::interaction::{EventPublishSpec, EventSubscription, Interactions};
use crate::layout::Layout;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Metadata {
  pub name: String,
  #[serde(default)]
  pub description: String,
  #[serde(default)]
  pub category: String,
  /// Version of the definition schema this document was written against.
  pub schema_version: u32,
}

/// An authored widget definition, immutable once loaded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WidgetDef {
  pub metadata: Metadata,
  pub data_source: DataSource,
  pub fields: Vec<FieldMapping>,
  pub layout: Layout,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub interactions: Option<Interactions>,
  #[serde(default, skip_serializing_if = "Vec::is_empty")]
  pub subscriptions: Vec<EventSubscription>,
}

impl WidgetDef {
  /// Get a field mapping by name.
  pub fn field(&self, name: &str) -> Option<&FieldMapping> {
    self.fields.iter().find(|f| f.name == name)
  }

  /// The event published when a record is selected, if any.
  pub fn on_select(&self) -> Option<&EventPublishSpec> {
    self.interactions.as_ref()?.on_select.as_ref()
  }
}
