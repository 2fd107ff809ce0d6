use mosaic_validator::ValidationIssue;
use thiserror::Error;

/// Errors returned by dashboard operations.
#[derive(Debug, Error)]
pub enum RuntimeError {
  #[error("widget not found: {widget_id}")]
  WidgetNotFound { widget_id: String },

  #[error("widget already mounted: {widget_id}")]
  DuplicateWidget { widget_id: String },

  /// The definition failed validation and was refused.
  #[error("invalid widget definition '{widget}': {} error(s)", .errors.len())]
  InvalidDefinition {
    widget: String,
    errors: Vec<ValidationIssue>,
  },

  #[error("record {index} out of range for widget {widget_id} ({len} visible)")]
  RecordOutOfRange {
    widget_id: String,
    index: usize,
    len: usize,
  },

  #[error("widget {widget_id} has no onSelect interaction")]
  NoSelectInteraction { widget_id: String },
}
