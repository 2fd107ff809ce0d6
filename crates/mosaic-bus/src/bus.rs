//! The publish/subscribe core.

use std::any::Any;
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock, Weak};

use tracing::{debug, info, warn};

use crate::config::BusConfig;
use crate::event::{DeliveryOutcome, Event, EventLogEntry};
use crate::log::EventLog;
use crate::pattern::Pattern;

/// Error returned by a handler. Logged by the bus, never propagated.
pub type HandlerError = Box<dyn std::error::Error + Send + Sync>;

/// A subscription callback.
pub type Handler = Arc<dyn Fn(&Event) -> Result<(), HandlerError> + Send + Sync>;

/// Identifies one registration on one bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

impl fmt::Display for SubscriptionId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "sub-{}", self.0)
  }
}

struct Subscriber {
  id: SubscriptionId,
  pattern: Pattern,
  handler: Handler,
}

struct Inner {
  config: BusConfig,
  enabled: AtomicBool,
  next_id: AtomicU64,
  subscribers: RwLock<Vec<Subscriber>>,
  log: Mutex<EventLog>,
}

/// Event bus shared by the widgets of one dashboard.
///
/// Handlers run synchronously on the publishing thread, in subscription order.
/// A failing or panicking handler is logged and skipped; the remaining
/// handlers still run. Handlers may publish, subscribe and unsubscribe: the
/// matching handlers are snapshotted before any of them runs.
#[derive(Clone)]
pub struct EventBus {
  inner: Arc<Inner>,
}

impl EventBus {
  pub fn new(config: BusConfig) -> Self {
    let log = EventLog::new(config.log_capacity);
    Self {
      inner: Arc::new(Inner {
        config,
        enabled: AtomicBool::new(true),
        next_id: AtomicU64::new(1),
        subscribers: RwLock::new(Vec::new()),
        log: Mutex::new(log),
      }),
    }
  }

  pub fn config(&self) -> &BusConfig {
    &self.inner.config
  }

  /// Register `handler` for every event whose name matches `pattern`.
  ///
  /// The registration lives until [`Subscription::unsubscribe`] or
  /// [`EventBus::unsubscribe`] is called; dropping the handle keeps it.
  pub fn subscribe<F>(&self, pattern: impl Into<Pattern>, handler: F) -> Subscription
  where
    F: Fn(&Event) -> Result<(), HandlerError> + Send + Sync + 'static,
  {
    let pattern = pattern.into();
    let id = SubscriptionId(self.inner.next_id.fetch_add(1, Ordering::Relaxed));

    debug!(subscription = %id, pattern = %pattern, "subscribed");

    self.write_subscribers().push(Subscriber {
      id,
      pattern: pattern.clone(),
      handler: Arc::new(handler),
    });

    Subscription {
      id,
      pattern,
      bus: Arc::downgrade(&self.inner),
    }
  }

  /// Remove a registration. Returns `false` if it was already gone.
  pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
    remove_subscriber(&self.inner, id)
  }

  /// Publish an event and return the number of matched subscribers.
  ///
  /// Returns 0 without running any handler while safe mode is on, and when
  /// called from handlers nested deeper than [`BusConfig::max_depth`]. Every
  /// call is recorded in the event log with its outcome.
  pub fn publish(&self, name: &str, payload: serde_json::Value, source: &str) -> usize {
    let event = Event::new(name, payload, source);

    if !self.is_enabled() {
      debug!(event = %event.name, source = %event.source, "safe mode on, event suppressed");
      self.record(event, DeliveryOutcome::Suppressed);
      return 0;
    }

    let guard = DepthGuard::enter(&self.inner);
    if guard.depth > self.inner.config.max_depth {
      warn!(
        event = %event.name,
        source = %event.source,
        depth = guard.depth,
        max_depth = self.inner.config.max_depth,
        "publish nested too deeply, event dropped"
      );
      self.record(event, DeliveryOutcome::Dropped { depth: guard.depth });
      return 0;
    }

    let handlers: Vec<(SubscriptionId, Handler)> = self
      .read_subscribers()
      .iter()
      .filter(|s| s.pattern.matches(&event.name))
      .map(|s| (s.id, s.handler.clone()))
      .collect();

    let matched = handlers.len();
    debug!(event = %event.name, source = %event.source, handlers = matched, "publishing");
    self.record(event.clone(), DeliveryOutcome::Delivered { handlers: matched });

    for (id, handler) in handlers {
      match catch_unwind(AssertUnwindSafe(|| handler(&event))) {
        Ok(Ok(())) => {}
        Ok(Err(e)) => {
          warn!(event = %event.name, subscription = %id, error = %e, "handler failed");
        }
        Err(panic) => {
          warn!(
            event = %event.name,
            subscription = %id,
            panic = %panic_message(&*panic),
            "handler panicked"
          );
        }
      }
    }

    matched
  }

  /// Flip safe mode and return whether delivery is now enabled.
  pub fn toggle_safe_mode(&self) -> bool {
    let enabled = !self.inner.enabled.fetch_xor(true, Ordering::SeqCst);
    info!(enabled, "event delivery toggled");
    enabled
  }

  pub fn set_enabled(&self, enabled: bool) {
    self.inner.enabled.store(enabled, Ordering::SeqCst);
    info!(enabled, "event delivery set");
  }

  /// Whether events are delivered (safe mode off).
  pub fn is_enabled(&self) -> bool {
    self.inner.enabled.load(Ordering::SeqCst)
  }

  /// Recent events, most recent last.
  pub fn event_log(&self) -> Vec<EventLogEntry> {
    self.lock_log().entries()
  }

  pub fn clear_log(&self) {
    self.lock_log().clear();
  }

  pub fn subscriber_count(&self) -> usize {
    self.read_subscribers().len()
  }

  fn record(&self, event: Event, outcome: DeliveryOutcome) {
    self.lock_log().push(EventLogEntry { event, outcome });
  }

  fn read_subscribers(&self) -> std::sync::RwLockReadGuard<'_, Vec<Subscriber>> {
    self
      .inner
      .subscribers
      .read()
      .unwrap_or_else(PoisonError::into_inner)
  }

  fn write_subscribers(&self) -> std::sync::RwLockWriteGuard<'_, Vec<Subscriber>> {
    self
      .inner
      .subscribers
      .write()
      .unwrap_or_else(PoisonError::into_inner)
  }

  fn lock_log(&self) -> std::sync::MutexGuard<'_, EventLog> {
    self.inner.log.lock().unwrap_or_else(PoisonError::into_inner)
  }
}

impl Default for EventBus {
  fn default() -> Self {
    Self::new(BusConfig::default())
  }
}

impl fmt::Debug for EventBus {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("EventBus")
      .field("enabled", &self.is_enabled())
      .field("subscribers", &self.subscriber_count())
      .finish()
  }
}

/// Handle to one registration.
#[derive(Debug)]
pub struct Subscription {
  id: SubscriptionId,
  pattern: Pattern,
  bus: Weak<Inner>,
}

impl Subscription {
  pub fn id(&self) -> SubscriptionId {
    self.id
  }

  pub fn pattern(&self) -> &Pattern {
    &self.pattern
  }

  /// Remove the registration. Safe to call after the bus is gone.
  pub fn unsubscribe(&self) -> bool {
    match self.bus.upgrade() {
      Some(inner) => remove_subscriber(&inner, self.id),
      None => false,
    }
  }
}

impl fmt::Debug for Inner {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Inner").field("config", &self.config).finish()
  }
}

fn remove_subscriber(inner: &Inner, id: SubscriptionId) -> bool {
  let mut subscribers = inner
    .subscribers
    .write()
    .unwrap_or_else(PoisonError::into_inner);
  let before = subscribers.len();
  subscribers.retain(|s| s.id != id);
  let removed = subscribers.len() != before;
  if removed {
    debug!(subscription = %id, "unsubscribed");
  }
  removed
}

thread_local! {
  /// Publish nesting on the current thread, keyed by bus.
  static DEPTHS: RefCell<HashMap<usize, usize>> = RefCell::new(HashMap::new());
}

/// Counts how deeply publishes on one bus are nested on the current thread.
///
/// Handlers run on the publishing thread, so only publishes made from inside
/// a handler raise the depth. Concurrent publishes from other threads do not.
struct DepthGuard {
  bus: usize,
  depth: usize,
}

impl DepthGuard {
  fn enter(inner: &Arc<Inner>) -> Self {
    let bus = Arc::as_ptr(inner) as usize;
    let depth = DEPTHS.with(|depths| {
      let mut depths = depths.borrow_mut();
      let depth = depths.entry(bus).or_insert(0);
      *depth += 1;
      *depth
    });
    Self { bus, depth }
  }
}

impl Drop for DepthGuard {
  fn drop(&mut self) {
    DEPTHS.with(|depths| {
      let mut depths = depths.borrow_mut();
      if let Some(depth) = depths.get_mut(&self.bus) {
        *depth -= 1;
        if *depth == 0 {
          depths.remove(&self.bus);
        }
      }
    });
  }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
  if let Some(s) = panic.downcast_ref::<&str>() {
    s.to_string()
  } else if let Some(s) = panic.downcast_ref::<String>() {
    s.clone()
  } else {
    "unknown panic".to_string()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;
  use std::sync::Barrier;
  use std::sync::atomic::AtomicUsize;
  use std::time::Duration;

  fn counter() -> Arc<AtomicUsize> {
    Arc::new(AtomicUsize::new(0))
  }

  #[test]
  fn test_publish_to_matching_pattern() {
    let bus = EventBus::default();
    let calls = counter();
    let seen = Arc::new(Mutex::new(Vec::new()));

    let c = calls.clone();
    let s = seen.clone();
    bus.subscribe("order.*", move |event| {
      c.fetch_add(1, Ordering::SeqCst);
      s.lock().unwrap().push(event.payload.clone());
      Ok(())
    });

    assert_eq!(bus.publish("order.created", json!({ "id": 5 }), "src"), 1);
    assert_eq!(bus.publish("invoice.created", json!({ "id": 6 }), "src"), 0);

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(*seen.lock().unwrap(), vec![json!({ "id": 5 })]);
  }

  #[test]
  fn test_handlers_run_in_subscription_order() {
    let bus = EventBus::default();
    let order = Arc::new(Mutex::new(Vec::new()));

    for label in ["first", "second", "third"] {
      let order = order.clone();
      bus.subscribe("tick", move |_| {
        order.lock().unwrap().push(label);
        Ok(())
      });
    }

    assert_eq!(bus.publish("tick", json!(null), "clock"), 3);
    assert_eq!(*order.lock().unwrap(), vec!["first", "second", "third"]);
  }

  #[test]
  fn test_safe_mode_suppresses_delivery() {
    let bus = EventBus::default();
    let calls = counter();
    let c = calls.clone();
    bus.subscribe("*", move |_| {
      c.fetch_add(1, Ordering::SeqCst);
      Ok(())
    });

    assert!(!bus.toggle_safe_mode());
    assert!(!bus.is_enabled());
    assert_eq!(bus.publish("ping", json!({}), "src"), 0);
    assert_eq!(calls.load(Ordering::SeqCst), 0);

    let log = bus.event_log();
    assert_eq!(log.len(), 1);
    assert!(log[0].is_suppressed());

    assert!(bus.toggle_safe_mode());
    assert_eq!(bus.publish("ping", json!({}), "src"), 1);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
  }

  #[test]
  fn test_failing_handler_is_isolated() {
    let bus = EventBus::default();
    let calls = counter();

    bus.subscribe("job.*", |_| Err("boom".into()));
    bus.subscribe("job.*", |_| panic!("handler exploded"));
    let c = calls.clone();
    bus.subscribe("job.*", move |_| {
      c.fetch_add(1, Ordering::SeqCst);
      Ok(())
    });

    assert_eq!(bus.publish("job.done", json!({}), "worker"), 3);
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    // The bus is still usable after a panicking handler.
    assert_eq!(bus.publish("job.done", json!({}), "worker"), 3);
    assert_eq!(calls.load(Ordering::SeqCst), 2);
  }

  #[test]
  fn test_unsubscribe() {
    let bus = EventBus::default();
    let calls = counter();
    let c = calls.clone();
    let sub = bus.subscribe("a.b", move |_| {
      c.fetch_add(1, Ordering::SeqCst);
      Ok(())
    });

    assert_eq!(bus.publish("a.b", json!({}), "src"), 1);
    assert!(sub.unsubscribe());
    assert!(!sub.unsubscribe());
    assert_eq!(bus.publish("a.b", json!({}), "src"), 0);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(bus.subscriber_count(), 0);
  }

  #[test]
  fn test_unsubscribe_after_bus_dropped() {
    let bus = EventBus::default();
    let sub = bus.subscribe("a", |_| Ok(()));
    drop(bus);
    assert!(!sub.unsubscribe());
  }

  #[test]
  fn test_reentrant_publish_is_bounded() {
    let bus = EventBus::new(BusConfig {
      log_capacity: 100,
      max_depth: 10,
    });
    let calls = counter();

    let inner_bus = bus.clone();
    let c = calls.clone();
    bus.subscribe("echo", move |event| {
      c.fetch_add(1, Ordering::SeqCst);
      inner_bus.publish("echo", event.payload.clone(), "echo");
      Ok(())
    });

    assert_eq!(bus.publish("echo", json!({}), "src"), 1);
    assert_eq!(calls.load(Ordering::SeqCst), 10);

    let log = bus.event_log();
    assert_eq!(log.len(), 11);
    assert_eq!(log[10].outcome, DeliveryOutcome::Dropped { depth: 11 });

    // Depth is released after the outermost publish returns.
    bus.clear_log();
    bus.subscribe("plain", |_| Ok(()));
    assert_eq!(bus.publish("plain", json!({}), "src"), 1);
  }

  #[test]
  fn test_concurrent_publishes_are_not_nested() {
    let bus = EventBus::new(BusConfig {
      log_capacity: 100,
      max_depth: 10,
    });
    bus.subscribe("tick", |_| {
      std::thread::sleep(Duration::from_millis(100));
      Ok(())
    });

    let threads = 12;
    let barrier = Arc::new(Barrier::new(threads));
    let handles: Vec<_> = (0..threads)
      .map(|i| {
        let bus = bus.clone();
        let barrier = barrier.clone();
        std::thread::spawn(move || {
          barrier.wait();
          bus.publish("tick", json!({ "thread": i }), "worker")
        })
      })
      .collect();

    let delivered: Vec<usize> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    assert_eq!(delivered, vec![1; threads]);

    let log = bus.event_log();
    assert_eq!(log.len(), threads);
    assert!(
      log
        .iter()
        .all(|entry| entry.outcome == DeliveryOutcome::Delivered { handlers: 1 })
    );
  }

  #[test]
  fn test_nesting_is_tracked_per_bus() {
    let outer = EventBus::new(BusConfig {
      log_capacity: 100,
      max_depth: 1,
    });
    let inner = EventBus::new(BusConfig {
      log_capacity: 100,
      max_depth: 1,
    });
    inner.subscribe("relay", |_| Ok(()));

    let relay = inner.clone();
    outer.subscribe("start", move |event| {
      relay.publish("relay", event.payload.clone(), "outer");
      Ok(())
    });

    assert_eq!(outer.publish("start", json!({}), "src"), 1);
    assert_eq!(
      inner.event_log()[0].outcome,
      DeliveryOutcome::Delivered { handlers: 1 }
    );
  }

  #[test]
  fn test_handler_may_unsubscribe_itself() {
    let bus = EventBus::default();
    let calls = counter();
    let slot: Arc<Mutex<Option<Subscription>>> = Arc::new(Mutex::new(None));

    let c = calls.clone();
    let s = slot.clone();
    let sub = bus.subscribe("once", move |_| {
      c.fetch_add(1, Ordering::SeqCst);
      if let Some(sub) = s.lock().unwrap().take() {
        sub.unsubscribe();
      }
      Ok(())
    });
    *slot.lock().unwrap() = Some(sub);

    assert_eq!(bus.publish("once", json!({}), "src"), 1);
    assert_eq!(bus.publish("once", json!({}), "src"), 0);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
  }

  #[test]
  fn test_log_is_capped_most_recent_last() {
    let bus = EventBus::new(BusConfig {
      log_capacity: 3,
      max_depth: 10,
    });
    for i in 0..5 {
      bus.publish(&format!("n.{}", i), json!(i), "src");
    }

    let names: Vec<_> = bus.event_log().into_iter().map(|e| e.event.name).collect();
    assert_eq!(names, vec!["n.2", "n.3", "n.4"]);
  }

  #[test]
  fn test_clones_share_state() {
    let bus = EventBus::default();
    let other = bus.clone();
    other.subscribe("x", |_| Ok(()));
    bus.set_enabled(false);

    assert!(!other.is_enabled());
    assert_eq!(bus.subscriber_count(), 1);
  }

  #[test]
  fn test_separate_buses_are_isolated() {
    let a = EventBus::default();
    let b = EventBus::default();
    a.subscribe("x", |_| Ok(()));

    assert_eq!(b.publish("x", json!({}), "src"), 0);
    assert!(a.event_log().is_empty());
  }
}
