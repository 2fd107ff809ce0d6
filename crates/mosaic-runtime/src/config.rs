use mosaic_bus::BusConfig;
use serde::{Deserialize, Serialize};

/// Dashboard settings.
///
/// ```json
/// { "bus": { "logCapacity": 200, "maxDepth": 10 }, "minPollIntervalSeconds": 15 }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RuntimeConfig {
  pub bus: BusConfig,

  /// Floor applied to every widget's `pollIntervalSeconds`.
  pub min_poll_interval_seconds: u64,
}

impl Default for RuntimeConfig {
  fn default() -> Self {
    Self {
      bus: BusConfig::default(),
      min_poll_interval_seconds: 5,
    }
  }
}

impl RuntimeConfig {
  /// The effective poll period for a requested interval.
  pub fn poll_interval(&self, requested: Option<u64>) -> Option<u64> {
    requested.map(|seconds| seconds.max(self.min_poll_interval_seconds).max(1))
  }
}
