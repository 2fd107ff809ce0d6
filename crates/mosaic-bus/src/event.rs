use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An event delivered to subscribers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
  /// Dot-segmented name, e.g. "issue.selected".
  pub name: String,
  pub payload: serde_json::Value,
  /// Publishing widget.
  pub source: String,
  pub timestamp: DateTime<Utc>,
}

impl Event {
  pub fn new(name: impl Into<String>, payload: serde_json::Value, source: impl Into<String>) -> Self {
    Self {
      name: name.into(),
      payload,
      source: source.into(),
      timestamp: Utc::now(),
    }
  }
}

/// What happened to a published event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DeliveryOutcome {
  /// Delivered to `handlers` matching subscriptions (possibly zero).
  Delivered { handlers: usize },
  /// Safe mode was on; no handler ran.
  Suppressed,
  /// Published from handlers nested deeper than the bus allows.
  Dropped { depth: usize },
}

/// An event as recorded in the bus debug log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventLogEntry {
  #[serde(flatten)]
  pub event: Event,
  pub outcome: DeliveryOutcome,
}

impl EventLogEntry {
  pub fn is_suppressed(&self) -> bool {
    matches!(self.outcome, DeliveryOutcome::Suppressed)
  }
}
