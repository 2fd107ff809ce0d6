use serde::{Deserialize, Serialize};

/// Event bus settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct BusConfig {
  /// Number of events kept in the debug log before the oldest is evicted.
  pub log_capacity: usize,

  /// Maximum nesting of publishes made from inside handlers.
  pub max_depth: usize,
}

impl Default for BusConfig {
  fn default() -> Self {
    Self {
      log_capacity: 100,
      max_depth: 10,
    }
  }
}
