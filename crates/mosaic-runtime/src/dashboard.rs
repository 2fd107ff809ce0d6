use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

use mosaic_bus::{Event, EventBus};
use mosaic_config::{LayoutPosition, SubscriptionAction, WidgetDef, WidgetInstance};
use mosaic_expr::render;
use mosaic_migration::{Normalized, WidgetRegistry};
use mosaic_pipeline::NormalizedRecord;
use mosaic_validator::validate;
use serde_json::{Map, Value, json};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::RuntimeConfig;
use crate::error::RuntimeError;
use crate::events::{WidgetEvent, WidgetNotifier};
use crate::fetch::{Collaborators, FetchOutcome, poll, run_fetch};
use crate::provider::Provider;
use crate::widget::WidgetSlot;

/// Result of mounting a widget instance.
#[derive(Debug, Clone, PartialEq)]
pub enum Mounted {
  /// The widget is live. Carries the normalized instance so the host can
  /// persist an upgrade.
  Ready(Normalized),
  /// The instance's type is not registered. It is kept, unchanged, so the
  /// host can render a placeholder and still move or remove it.
  Fallback(WidgetInstance),
}

impl Mounted {
  pub fn instance(&self) -> &WidgetInstance {
    match self {
      Mounted::Ready(normalized) => normalized.instance(),
      Mounted::Fallback(instance) => instance,
    }
  }

  pub fn is_fallback(&self) -> bool {
    matches!(self, Mounted::Fallback(_))
  }
}

struct Inner {
  config: RuntimeConfig,
  bus: EventBus,
  registry: WidgetRegistry,
  collaborators: Collaborators,
  widgets: RwLock<HashMap<String, Arc<WidgetSlot>>>,
  /// Parent of every widget's token; cancelled when the dashboard is dropped.
  shutdown: CancellationToken,
}

impl Drop for Inner {
  fn drop(&mut self) {
    self.shutdown.cancel();
  }
}

/// Hosts the widgets of one dashboard.
///
/// A dashboard owns the event bus its widgets talk over, the provider they
/// fetch from and the notifier the renderer listens to:
///
/// ```text
///              ┌────────────── Dashboard ──────────────┐
///  provider ──►│ poll task ─► pipeline ─► records      │──► notifier
///              │                            ▲          │
///  select() ──►│ onSelect ─► EventBus ─► subscription  │
///              └───────────────────────────────────────┘
/// ```
///
/// # Usage
///
/// ```ignore
/// let (notifier, mut events) = ChannelNotifier::channel();
/// let dashboard = Dashboard::new(config, registry, provider, Arc::new(notifier));
///
/// dashboard.mount(instance, definition)?;
/// while let Some(event) = events.recv().await {
///   // redraw
/// }
/// ```
///
/// Mounting spawns tasks and must happen inside a tokio runtime. Cloning a
/// dashboard yields another handle to the same widgets.
#[derive(Clone)]
pub struct Dashboard {
  inner: Arc<Inner>,
}

impl Dashboard {
  pub fn new(
    config: RuntimeConfig,
    registry: WidgetRegistry,
    provider: Arc<dyn Provider>,
    notifier: Arc<dyn WidgetNotifier>,
  ) -> Self {
    let bus = EventBus::new(config.bus.clone());
    Self::with_bus(bus, config, registry, provider, notifier)
  }

  /// Create a dashboard on an existing bus, e.g. one shared with other hosts.
  pub fn with_bus(
    bus: EventBus,
    config: RuntimeConfig,
    registry: WidgetRegistry,
    provider: Arc<dyn Provider>,
    notifier: Arc<dyn WidgetNotifier>,
  ) -> Self {
    Self {
      inner: Arc::new(Inner {
        config,
        bus,
        registry,
        collaborators: Collaborators { provider, notifier },
        widgets: RwLock::new(HashMap::new()),
        shutdown: CancellationToken::new(),
      }),
    }
  }

  pub fn config(&self) -> &RuntimeConfig {
    &self.inner.config
  }

  pub fn bus(&self) -> &EventBus {
    &self.inner.bus
  }

  pub fn registry(&self) -> &WidgetRegistry {
    &self.inner.registry
  }

  /// Mount a stored instance with its definition.
  ///
  /// The definition is validated first and refused if invalid. The instance
  /// is normalized through the registry; an unregistered type mounts as a
  /// fallback that neither fetches nor subscribes. Otherwise every
  /// subscription is registered on the bus and fetching starts: a poll loop
  /// when the data source has an interval, a single fetch when it does not.
  pub fn mount(&self, instance: WidgetInstance, definition: WidgetDef) -> Result<Mounted, RuntimeError> {
    let report = validate(&definition);
    if !report.valid {
      return Err(RuntimeError::InvalidDefinition {
        widget: definition.metadata.name.clone(),
        errors: report.errors,
      });
    }
    for warning in &report.warnings {
      warn!(widget_id = %instance.id, "{warning}");
    }

    let normalized = self.inner.registry.normalize(instance);
    let fallback = normalized.is_unknown_type();
    let slot = Arc::new(WidgetSlot::new(
      normalized.instance().clone(),
      definition,
      fallback,
      self.inner.shutdown.child_token(),
    ));

    {
      let mut widgets = self.write_widgets();
      if widgets.contains_key(&slot.id) {
        return Err(RuntimeError::DuplicateWidget {
          widget_id: slot.id.clone(),
        });
      }
      widgets.insert(slot.id.clone(), slot.clone());
    }

    if fallback {
      let instance = normalized.into_instance();
      self.notify(WidgetEvent::Fallback {
        widget_id: instance.id.clone(),
        widget_type: instance.widget_type.clone(),
      });
      return Ok(Mounted::Fallback(instance));
    }

    self.register_subscriptions(&slot);
    self.start_fetching(&slot);

    info!(
      widget_id = %slot.id,
      widget = %slot.definition.metadata.name,
      subscriptions = slot.definition.subscriptions.len(),
      "mounted widget"
    );
    Ok(Mounted::Ready(normalized))
  }

  /// Unmount a widget: stop its timer, drop its bus registrations and its
  /// state. A fetch still running for it is discarded on completion.
  pub fn remove(&self, widget_id: &str) -> Result<WidgetInstance, RuntimeError> {
    let slot = self
      .write_widgets()
      .remove(widget_id)
      .ok_or_else(|| not_found(widget_id))?;

    slot.close();
    let unsubscribed = slot.unsubscribe_all();
    info!(widget_id = %widget_id, unsubscribed, "removed widget");

    self.notify(WidgetEvent::Removed {
      widget_id: widget_id.to_string(),
    });
    Ok(slot.instance())
  }

  /// Remove every widget.
  pub fn shutdown(&self) {
    let ids = self.widget_ids();
    for id in ids {
      // Already gone if removed concurrently
      let _ = self.remove(&id);
    }
  }

  /// Fetch now, outside the poll schedule.
  pub async fn refresh(&self, widget_id: &str) -> Result<FetchOutcome, RuntimeError> {
    let slot = self.slot(widget_id)?;
    if slot.fallback {
      debug!(widget_id = %widget_id, "fallback widget, nothing to refresh");
      return Ok(FetchOutcome::Skipped);
    }
    Ok(run_fetch(slot, self.inner.collaborators.clone()).await)
  }

  /// Publish the widget's `onSelect` event for the visible record at `index`.
  ///
  /// Payload templates are rendered against the record's selection context.
  /// Returns the number of subscribers the event reached.
  pub fn select(&self, widget_id: &str, index: usize) -> Result<usize, RuntimeError> {
    let slot = self.slot(widget_id)?;
    let spec = slot
      .definition
      .on_select()
      .ok_or_else(|| RuntimeError::NoSelectInteraction {
        widget_id: widget_id.to_string(),
      })?;

    let view = slot.view();
    let record = view
      .records
      .get(index)
      .ok_or_else(|| RuntimeError::RecordOutOfRange {
        widget_id: widget_id.to_string(),
        index,
        len: view.records.len(),
      })?;

    let context = record.selection_context();
    let payload: Map<String, Value> = spec
      .payload
      .iter()
      .map(|(key, template)| (key.clone(), Value::String(render(template, &context))))
      .collect();

    let source = if spec.source.is_empty() {
      widget_id
    } else {
      spec.source.as_str()
    };

    let matched = self
      .inner
      .bus
      .publish(&spec.event_name, Value::Object(payload), source);
    debug!(widget_id = %widget_id, event = %spec.event_name, index, matched, "record selected");
    Ok(matched)
  }

  /// Every record from the last successful fetch.
  pub fn records(&self, widget_id: &str) -> Result<Vec<NormalizedRecord>, RuntimeError> {
    Ok(self.slot(widget_id)?.records())
  }

  /// The records currently shown, after any active filter.
  pub fn visible_records(&self, widget_id: &str) -> Result<Vec<NormalizedRecord>, RuntimeError> {
    Ok(self.slot(widget_id)?.view().records)
  }

  /// Highlighted indices into the visible records.
  pub fn highlighted(&self, widget_id: &str) -> Result<Vec<usize>, RuntimeError> {
    Ok(self.slot(widget_id)?.view().highlighted.unwrap_or_default())
  }

  pub fn instance(&self, widget_id: &str) -> Result<WidgetInstance, RuntimeError> {
    Ok(self.slot(widget_id)?.instance())
  }

  /// Record a drag or resize. Returns the updated instance for persisting.
  pub fn move_widget(
    &self,
    widget_id: &str,
    position: LayoutPosition,
  ) -> Result<WidgetInstance, RuntimeError> {
    let instance = self.slot(widget_id)?.set_position(position);
    debug!(widget_id = %widget_id, x = position.x, y = position.y, w = position.w, h = position.h, "widget moved");
    Ok(instance)
  }

  /// Replace the instance config. The next fetch cycle uses it.
  pub fn update_config(&self, widget_id: &str, config: Value) -> Result<WidgetInstance, RuntimeError> {
    Ok(self.slot(widget_id)?.set_config(config))
  }

  /// Drop the active filter and show every record again.
  pub fn clear_filter(&self, widget_id: &str) -> Result<Vec<NormalizedRecord>, RuntimeError> {
    let view = self.slot(widget_id)?.clear_filter();
    self.notify(WidgetEvent::Filtered {
      widget_id: widget_id.to_string(),
      records: view.records.clone(),
      total: view.total,
    });
    Ok(view.records)
  }

  pub fn widget_ids(&self) -> Vec<String> {
    let mut ids: Vec<String> = self.read_widgets().keys().cloned().collect();
    ids.sort();
    ids
  }

  fn register_subscriptions(&self, slot: &Arc<WidgetSlot>) {
    for subscription in &slot.definition.subscriptions {
      let weak = Arc::downgrade(slot);
      let notifier = self.inner.collaborators.notifier.clone();
      let action = subscription.action.clone();

      let registration = self
        .inner
        .bus
        .subscribe(subscription.pattern.as_str(), move |event| {
          if let Some(slot) = weak.upgrade()
            && let Some(_emit) = slot.emit()
          {
            apply_action(&slot, &action, event, notifier.as_ref());
          }
          Ok(())
        });
      slot.push_subscription(registration);
    }
  }

  fn start_fetching(&self, slot: &Arc<WidgetSlot>) {
    let collaborators = self.inner.collaborators.clone();
    let requested = slot.definition.data_source.poll_interval_seconds;
    match self.inner.config.poll_interval(requested) {
      Some(seconds) => {
        tokio::spawn(poll(slot.clone(), collaborators, Duration::from_secs(seconds)));
      }
      None => {
        tokio::spawn(run_fetch(slot.clone(), collaborators));
      }
    }
  }

  fn slot(&self, widget_id: &str) -> Result<Arc<WidgetSlot>, RuntimeError> {
    self
      .read_widgets()
      .get(widget_id)
      .cloned()
      .ok_or_else(|| not_found(widget_id))
  }

  fn notify(&self, event: WidgetEvent) {
    self.inner.collaborators.notifier.notify(event);
  }

  fn read_widgets(&self) -> RwLockReadGuard<'_, HashMap<String, Arc<WidgetSlot>>> {
    self
      .inner
      .widgets
      .read()
      .unwrap_or_else(PoisonError::into_inner)
  }

  fn write_widgets(&self) -> RwLockWriteGuard<'_, HashMap<String, Arc<WidgetSlot>>> {
    self
      .inner
      .widgets
      .write()
      .unwrap_or_else(PoisonError::into_inner)
  }
}

/// Run a subscription's action on the subscribing widget.
fn apply_action(
  slot: &WidgetSlot,
  action: &SubscriptionAction,
  event: &Event,
  notifier: &dyn WidgetNotifier,
) {
  if let Some(spec) = &action.filter {
    let view = slot.apply_filter(spec.clone(), event.payload.clone());
    debug!(
      widget_id = %slot.id,
      event = %event.name,
      visible = view.records.len(),
      total = view.total,
      "filter applied from event"
    );
    let highlighted = view.highlighted.clone();
    notifier.notify(WidgetEvent::Filtered {
      widget_id: slot.id.clone(),
      records: view.records,
      total: view.total,
    });
    if action.highlight.is_none()
      && let Some(indices) = highlighted
    {
      notifier.notify(WidgetEvent::Highlighted {
        widget_id: slot.id.clone(),
        indices,
      });
    }
  }

  if let Some(spec) = &action.highlight {
    let view = slot.apply_highlight(spec.clone(), event.payload.clone());
    notifier.notify(WidgetEvent::Highlighted {
      widget_id: slot.id.clone(),
      indices: view.highlighted.unwrap_or_default(),
    });
  }

  if let Some(spec) = &action.notification {
    let context = json!({
      "event": event.payload,
      "name": event.name,
      "source": event.source,
    });
    notifier.notify(WidgetEvent::Notification {
      widget_id: slot.id.clone(),
      level: spec.level,
      message: render(&spec.message, &context),
    });
  }
}

fn not_found(widget_id: &str) -> RuntimeError {
  RuntimeError::WidgetNotFound {
    widget_id: widget_id.to_string(),
  }
}
