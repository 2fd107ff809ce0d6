//! Widget events and notifiers for the rendering layer.
//!
//! The dashboard never paints anything. It tells a [`WidgetNotifier`] what
//! changed and the host decides how to redraw.

use mosaic_config::NotificationLevel;
use mosaic_pipeline::NormalizedRecord;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::provider::ProviderError;

/// Events emitted by a dashboard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WidgetEvent {
  /// A fetch cycle produced new records. `records` are the visible ones,
  /// after any active filter.
  DataUpdated {
    widget_id: String,
    records: Vec<NormalizedRecord>,
    total: usize,
  },

  /// A fetch cycle failed. The previous records stay on screen.
  FetchFailed {
    widget_id: String,
    error: ProviderError,
  },

  /// A subscription narrowed (or a clear widened) the visible records.
  Filtered {
    widget_id: String,
    records: Vec<NormalizedRecord>,
    total: usize,
  },

  /// Indices into the visible records that should be emphasized.
  Highlighted {
    widget_id: String,
    indices: Vec<usize>,
  },

  /// A subscription asked for a transient message.
  Notification {
    widget_id: String,
    level: NotificationLevel,
    message: String,
  },

  /// The instance's widget type is not registered; render a placeholder.
  Fallback {
    widget_id: String,
    widget_type: String,
  },

  Removed { widget_id: String },
}

impl WidgetEvent {
  pub fn widget_id(&self) -> &str {
    match self {
      WidgetEvent::DataUpdated { widget_id, .. }
      | WidgetEvent::FetchFailed { widget_id, .. }
      | WidgetEvent::Filtered { widget_id, .. }
      | WidgetEvent::Highlighted { widget_id, .. }
      | WidgetEvent::Notification { widget_id, .. }
      | WidgetEvent::Fallback { widget_id, .. }
      | WidgetEvent::Removed { widget_id } => widget_id,
    }
  }
}

/// Trait for receiving widget events.
///
/// Called from poll tasks and from inside bus handlers, so implementations
/// must return quickly and must not call back into the dashboard.
pub trait WidgetNotifier: Send + Sync {
  fn notify(&self, event: WidgetEvent);
}

/// A notifier that discards all events.
#[derive(Debug, Clone, Default)]
pub struct NoopNotifier;

impl WidgetNotifier for NoopNotifier {
  fn notify(&self, _event: WidgetEvent) {}
}

/// A notifier that forwards events to an unbounded channel.
///
/// Unbounded so a slow renderer never stalls a publish.
#[derive(Debug, Clone)]
pub struct ChannelNotifier {
  sender: mpsc::UnboundedSender<WidgetEvent>,
}

impl ChannelNotifier {
  pub fn new(sender: mpsc::UnboundedSender<WidgetEvent>) -> Self {
    Self { sender }
  }

  /// Create a notifier together with its receiving end.
  pub fn channel() -> (Self, mpsc::UnboundedReceiver<WidgetEvent>) {
    let (sender, receiver) = mpsc::unbounded_channel();
    (Self::new(sender), receiver)
  }
}

impl WidgetNotifier for ChannelNotifier {
  fn notify(&self, event: WidgetEvent) {
    // Receiver may have been dropped
    let _ = self.sender.send(event);
  }
}
