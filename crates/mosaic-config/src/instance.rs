use serde::{Deserialize, Serialize};

const DEFAULT_WIDTH: u32 = 4;
const DEFAULT_HEIGHT: u32 = 4;

/// One widget placed on a dashboard, as stored by the host.
///
/// ```json
/// { "id": "w-1", "type": "github-issues", "version": 2, "config": {}, "layout": { "x": 0, "y": 3, "w": 6, "h": 4 } }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WidgetInstance {
  pub id: String,
  #[serde(rename = "type")]
  pub widget_type: String,
  pub version: u32,
  #[serde(default)]
  pub config: serde_json::Value,
  #[serde(rename = "layout", default, skip_serializing_if = "Option::is_none")]
  pub layout_position: Option<LayoutPosition>,
}

/// Grid position of a widget instance.
///
/// Absent or `null` coordinates take their defaults; `0` is a real position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "StoredPosition")]
pub struct LayoutPosition {
  pub x: u32,
  pub y: u32,
  pub w: u32,
  pub h: u32,
}

impl Default for LayoutPosition {
  fn default() -> Self {
    Self {
      x: 0,
      y: 0,
      w: DEFAULT_WIDTH,
      h: DEFAULT_HEIGHT,
    }
  }
}

#[derive(Deserialize)]
struct StoredPosition {
  #[serde(default)]
  x: Option<u32>,
  #[serde(default)]
  y: Option<u32>,
  #[serde(default)]
  w: Option<u32>,
  #[serde(default)]
  h: Option<u32>,
}

impl From<StoredPosition> for LayoutPosition {
  fn from(stored: StoredPosition) -> Self {
    let defaults = LayoutPosition::default();
    Self {
      x: stored.x.unwrap_or(defaults.x),
      y: stored.y.unwrap_or(defaults.y),
      w: stored.w.unwrap_or(defaults.w),
      h: stored.h.unwrap_or(defaults.h),
    }
  }
}
