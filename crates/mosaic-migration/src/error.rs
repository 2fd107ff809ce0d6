use thiserror::Error;

#[derive(Debug, Error)]
pub enum MigrationError {
  /// No widget type with this name is registered.
  #[error("unknown widget type: {widget_type}")]
  UnknownWidgetType { widget_type: String },

  /// The chain has no step from `reached`.
  ///
  /// `config` holds the result of the steps applied before the gap.
  #[error("no migration registered for '{widget_type}' from version {reached} (target {target})")]
  MissingStep {
    widget_type: String,
    reached: u32,
    target: u32,
    config: serde_json::Value,
  },

  /// Migrations only run forward.
  #[error("cannot migrate '{widget_type}' backwards from version {from} to {to}")]
  Downgrade { widget_type: String, from: u32, to: u32 },
}
