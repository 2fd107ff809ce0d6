//! Per-widget state held by a dashboard.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use mosaic_bus::Subscription;
use mosaic_config::{FilterSpec, HighlightSpec, LayoutPosition, WidgetDef, WidgetInstance};
use mosaic_pipeline::{NormalizedRecord, Transformer, filter, highlight, locate_records};
use serde_json::Value;
use tokio_util::sync::CancellationToken;

/// A subscription action that is currently in effect, with the payload of
/// the event that triggered it.
#[derive(Debug, Clone)]
struct Active<S> {
  spec: S,
  payload: Value,
}

#[derive(Debug, Default)]
struct WidgetState {
  records: Vec<NormalizedRecord>,
  filter: Option<Active<FilterSpec>>,
  highlight: Option<Active<HighlightSpec>>,
}

impl WidgetState {
  fn view(&self) -> View {
    let records = match &self.filter {
      Some(active) => filter(&self.records, &active.spec, &active.payload),
      None => self.records.clone(),
    };
    let highlighted = self
      .highlight
      .as_ref()
      .map(|active| highlight(&records, &active.spec, &active.payload));
    View {
      records,
      total: self.records.len(),
      highlighted,
    }
  }
}

/// What the renderer should currently show for one widget.
#[derive(Debug, Clone)]
pub(crate) struct View {
  pub(crate) records: Vec<NormalizedRecord>,
  pub(crate) total: usize,
  /// `None` when no highlight is active.
  pub(crate) highlighted: Option<Vec<usize>>,
}

pub(crate) struct WidgetSlot {
  pub(crate) id: String,
  pub(crate) definition: WidgetDef,
  /// Mounted with an unregistered widget type: no fetching, no subscriptions.
  pub(crate) fallback: bool,
  pub(crate) cancel: CancellationToken,
  transformer: Transformer,
  instance: Mutex<WidgetInstance>,
  state: Mutex<WidgetState>,
  in_flight: AtomicBool,
  subscriptions: Mutex<Vec<Subscription>>,
  /// Held while a fetch result or an action is published, and while the
  /// slot is closed, so `Removed` is always the widget's last event.
  emit: Mutex<()>,
}

/// Clears the in-flight flag when a fetch cycle ends, however it ends.
pub(crate) struct FetchGuard<'a> {
  flag: &'a AtomicBool,
}

impl Drop for FetchGuard<'_> {
  fn drop(&mut self) {
    self.flag.store(false, Ordering::Release);
  }
}

impl WidgetSlot {
  pub(crate) fn new(
    instance: WidgetInstance,
    definition: WidgetDef,
    fallback: bool,
    cancel: CancellationToken,
  ) -> Self {
    Self {
      id: instance.id.clone(),
      transformer: Transformer::new(&definition.fields),
      definition,
      fallback,
      cancel,
      instance: Mutex::new(instance),
      state: Mutex::new(WidgetState::default()),
      in_flight: AtomicBool::new(false),
      subscriptions: Mutex::new(Vec::new()),
      emit: Mutex::new(()),
    }
  }

  /// Claim the right to publish widget events. `None` once the slot is closed.
  pub(crate) fn emit(&self) -> Option<MutexGuard<'_, ()>> {
    let guard = lock(&self.emit);
    (!self.cancel.is_cancelled()).then_some(guard)
  }

  /// Cancel the slot, waiting for any event publication in progress.
  pub(crate) fn close(&self) {
    let _emit = lock(&self.emit);
    self.cancel.cancel();
  }

  /// Claim the in-flight flag. `None` if a fetch is already running.
  pub(crate) fn begin_fetch(&self) -> Option<FetchGuard<'_>> {
    if self.in_flight.swap(true, Ordering::AcqRel) {
      return None;
    }
    Some(FetchGuard {
      flag: &self.in_flight,
    })
  }

  pub(crate) fn instance(&self) -> WidgetInstance {
    lock(&self.instance).clone()
  }

  pub(crate) fn set_position(&self, position: LayoutPosition) -> WidgetInstance {
    let mut instance = lock(&self.instance);
    instance.layout_position = Some(position);
    instance.clone()
  }

  pub(crate) fn set_config(&self, config: Value) -> WidgetInstance {
    let mut instance = lock(&self.instance);
    instance.config = config;
    instance.clone()
  }

  pub(crate) fn records(&self) -> Vec<NormalizedRecord> {
    lock(&self.state).records.clone()
  }

  pub(crate) fn view(&self) -> View {
    lock(&self.state).view()
  }

  /// Replace the records with a freshly fetched provider response.
  pub(crate) fn ingest(&self, response: &Value) -> View {
    let data_path = self.definition.data_source.data_path.as_deref();
    let records = self.transformer.transform(locate_records(response, data_path));
    let mut state = lock(&self.state);
    state.records = records;
    state.view()
  }

  pub(crate) fn apply_filter(&self, spec: FilterSpec, payload: Value) -> View {
    let mut state = lock(&self.state);
    state.filter = Some(Active { spec, payload });
    state.view()
  }

  pub(crate) fn apply_highlight(&self, spec: HighlightSpec, payload: Value) -> View {
    let mut state = lock(&self.state);
    state.highlight = Some(Active { spec, payload });
    state.view()
  }

  pub(crate) fn clear_filter(&self) -> View {
    let mut state = lock(&self.state);
    state.filter = None;
    state.view()
  }

  pub(crate) fn push_subscription(&self, subscription: Subscription) {
    lock(&self.subscriptions).push(subscription);
  }

  /// Drop every bus registration of this widget. Returns how many were removed.
  pub(crate) fn unsubscribe_all(&self) -> usize {
    let subscriptions = std::mem::take(&mut *lock(&self.subscriptions));
    subscriptions
      .iter()
      .filter(|subscription| subscription.unsubscribe())
      .count()
  }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
  mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
