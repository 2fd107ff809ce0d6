use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Display type a raw value is coerced to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
  String,
  Number,
  Boolean,
  Date,
  Url,
  Enum,
}

/// A rule turning one raw JSON value into one typed, labeled display field.
///
/// # Example
///
/// ```json
/// {
///   "name": "state",
///   "path": "$.state",
///   "label": "State",
///   "type": "enum",
///   "enumLabels": { "open": "Open", "closed": "Closed" }
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldMapping {
  /// Unique within one definition.
  pub name: String,

  /// Path expression evaluated against one raw record, e.g. "$.user.login".
  pub path: String,

  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub label: Option<String>,

  #[serde(rename = "type")]
  pub field_type: FieldType,

  /// Template rendered with `{ value }` after coercion, e.g. "#{{value}}".
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub format: Option<String>,

  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub enum_labels: Option<HashMap<String, String>>,
}

impl FieldMapping {
  /// The label shown to users, falling back to the field name.
  pub fn display_label(&self) -> &str {
    self.label.as_deref().unwrap_or(&self.name)
  }
}
