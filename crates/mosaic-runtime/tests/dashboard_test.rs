use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use mosaic_bus::DeliveryOutcome;
use mosaic_config::{LayoutPosition, NotificationLevel, WidgetDef, WidgetInstance};
use mosaic_migration::{Normalized, WidgetRegistry, WidgetType};
use mosaic_runtime::{
  ChannelNotifier, Dashboard, FetchOutcome, Mounted, NoopNotifier, Provider, ProviderError,
  ProviderRequest, RuntimeConfig, RuntimeError, WidgetEvent,
};
use serde_json::{Value, json};
use tokio::sync::{Notify, mpsc};

struct MockProvider {
  responses: HashMap<String, Result<Value, ProviderError>>,
  calls: AtomicUsize,
  started: Notify,
  gate: Option<Notify>,
}

impl MockProvider {
  fn new() -> Self {
    let mut responses = HashMap::new();
    responses.insert(
      "/projects".to_string(),
      Ok(json!([
        { "key": "PROJ", "name": "Platform" },
        { "key": "OPS", "name": "Operations" }
      ])),
    );
    responses.insert(
      "/issues".to_string(),
      Ok(json!({ "data": { "items": [
        { "key": "PROJ-1", "title": "Fix login", "assignee": { "login": "ana" } },
        { "key": "OPS-2", "title": "Rotate keys", "assignee": { "login": "ben" } },
        { "key": "PROJ-3", "title": "Ship widgets", "assignee": { "login": "ben" } }
      ] } })),
    );
    responses.insert(
      "/broken".to_string(),
      Err(ProviderError::new("rate_limited", "slow down", true)),
    );
    Self {
      responses,
      calls: AtomicUsize::new(0),
      started: Notify::new(),
      gate: None,
    }
  }

  fn gated() -> Self {
    Self {
      gate: Some(Notify::new()),
      ..Self::new()
    }
  }

  fn calls(&self) -> usize {
    self.calls.load(Ordering::SeqCst)
  }

  fn release(&self) {
    if let Some(gate) = &self.gate {
      gate.notify_one();
    }
  }
}

#[async_trait]
impl Provider for MockProvider {
  async fn fetch(&self, request: &ProviderRequest) -> Result<Value, ProviderError> {
    self.calls.fetch_add(1, Ordering::SeqCst);
    self.started.notify_one();
    if let Some(gate) = &self.gate {
      gate.notified().await;
    }
    self
      .responses
      .get(&request.endpoint)
      .cloned()
      .unwrap_or_else(|| Err(ProviderError::new("not_found", request.endpoint.clone(), false)))
  }
}

fn registry() -> WidgetRegistry {
  let mut registry = WidgetRegistry::new();
  registry.register(WidgetType::new("projects", 1));
  registry.register(WidgetType::new("issues", 1));
  registry
}

fn instance(id: &str, widget_type: &str) -> WidgetInstance {
  WidgetInstance {
    id: id.to_string(),
    widget_type: widget_type.to_string(),
    version: 1,
    config: json!({}),
    layout_position: None,
  }
}

fn projects_definition() -> WidgetDef {
  serde_json::from_value(json!({
    "metadata": { "name": "Projects", "schemaVersion": 1 },
    "dataSource": { "provider": "tracker", "endpoint": "/projects" },
    "fields": [
      { "name": "key", "path": "$.key", "type": "string" },
      { "name": "name", "path": "$.name", "type": "string" }
    ],
    "layout": { "type": "list", "fields": { "title": "name", "subtitle": "key" } },
    "interactions": {
      "onSelect": {
        "eventName": "project.selected",
        "payload": { "projectKey": "{{key}}", "label": "{{name}} ({{key}})" },
        "source": "projects"
      }
    }
  }))
  .unwrap()
}

fn issues_definition(endpoint: &str) -> WidgetDef {
  serde_json::from_value(json!({
    "metadata": { "name": "Issues", "schemaVersion": 1 },
    "dataSource": { "provider": "tracker", "endpoint": endpoint, "dataPath": "$.data.items" },
    "fields": [
      { "name": "key", "path": "$.key", "type": "string" },
      { "name": "title", "path": "$.title", "type": "string" },
      { "name": "assignee", "path": "$.assignee.login", "type": "string" }
    ],
    "layout": { "type": "table", "columns": [{ "field": "key" }, { "field": "title" }] },
    "subscriptions": [
      {
        "pattern": "project.*",
        "action": {
          "filter": { "field": "key", "operator": "startsWith", "value": "{{event.projectKey}}" },
          "notification": { "message": "Showing {{event.label}}", "level": "success" }
        }
      },
      {
        "pattern": "user.selected",
        "action": { "highlight": { "field": "assignee", "value": "{{event.login}}" } }
      }
    ]
  }))
  .unwrap()
}

fn dashboard(provider: Arc<MockProvider>) -> (Dashboard, mpsc::UnboundedReceiver<WidgetEvent>) {
  let (notifier, events) = ChannelNotifier::channel();
  let dashboard = Dashboard::new(RuntimeConfig::default(), registry(), provider, Arc::new(notifier));
  (dashboard, events)
}

/// Receive events until one satisfies `predicate`.
async fn wait_for<F>(events: &mut mpsc::UnboundedReceiver<WidgetEvent>, predicate: F) -> WidgetEvent
where
  F: Fn(&WidgetEvent) -> bool,
{
  tokio::time::timeout(Duration::from_secs(5), async {
    loop {
      let event = events.recv().await.expect("notifier channel closed");
      if predicate(&event) {
        return event;
      }
    }
  })
  .await
  .expect("timed out waiting for widget event")
}

async fn wait_for_data(events: &mut mpsc::UnboundedReceiver<WidgetEvent>, widget_id: &str) {
  wait_for(events, |event| {
    matches!(event, WidgetEvent::DataUpdated { .. }) && event.widget_id() == widget_id
  })
  .await;
}

async fn wait_for_all_data(events: &mut mpsc::UnboundedReceiver<WidgetEvent>, widget_ids: &[&str]) {
  let mut pending: Vec<&str> = widget_ids.to_vec();
  while !pending.is_empty() {
    let event = wait_for(events, |event| matches!(event, WidgetEvent::DataUpdated { .. })).await;
    pending.retain(|id| *id != event.widget_id());
  }
}

async fn mount_pair(provider: Arc<MockProvider>) -> (Dashboard, mpsc::UnboundedReceiver<WidgetEvent>) {
  let (dashboard, mut events) = dashboard(provider);
  dashboard
    .mount(instance("projects", "projects"), projects_definition())
    .unwrap();
  dashboard
    .mount(instance("issues", "issues"), issues_definition("/issues"))
    .unwrap();
  wait_for_all_data(&mut events, &["projects", "issues"]).await;
  (dashboard, events)
}

fn keys(records: &[mosaic_pipeline::NormalizedRecord]) -> Vec<String> {
  records
    .iter()
    .filter_map(|r| r.get("key").and_then(Value::as_str).map(str::to_string))
    .collect()
}

#[tokio::test]
async fn test_selection_filters_subscribed_widget() {
  let provider = Arc::new(MockProvider::new());
  let (dashboard, mut events) = mount_pair(provider).await;

  assert_eq!(dashboard.visible_records("issues").unwrap().len(), 3);

  let matched = dashboard.select("projects", 0).unwrap();
  assert_eq!(matched, 1);

  assert_eq!(
    keys(&dashboard.visible_records("issues").unwrap()),
    vec!["PROJ-1", "PROJ-3"]
  );
  assert_eq!(dashboard.records("issues").unwrap().len(), 3);

  let filtered = wait_for(&mut events, |e| matches!(e, WidgetEvent::Filtered { .. })).await;
  match filtered {
    WidgetEvent::Filtered { widget_id, records, total } => {
      assert_eq!(widget_id, "issues");
      assert_eq!(records.len(), 2);
      assert_eq!(total, 3);
    }
    other => panic!("expected Filtered, got {:?}", other),
  }

  let notification = wait_for(&mut events, |e| matches!(e, WidgetEvent::Notification { .. })).await;
  assert_eq!(
    notification,
    WidgetEvent::Notification {
      widget_id: "issues".to_string(),
      level: NotificationLevel::Success,
      message: "Showing Platform (PROJ)".to_string(),
    }
  );

  let log = dashboard.bus().event_log();
  assert_eq!(log.len(), 1);
  assert_eq!(log[0].event.name, "project.selected");
  assert_eq!(log[0].event.source, "projects");
  assert_eq!(
    log[0].event.payload,
    json!({ "projectKey": "PROJ", "label": "Platform (PROJ)" })
  );
  assert_eq!(log[0].outcome, DeliveryOutcome::Delivered { handlers: 1 });

  let all = dashboard.clear_filter("issues").unwrap();
  assert_eq!(all.len(), 3);
}

#[tokio::test]
async fn test_later_selection_replaces_filter() {
  let provider = Arc::new(MockProvider::new());
  let (dashboard, _events) = mount_pair(provider).await;

  dashboard.select("projects", 0).unwrap();
  dashboard.select("projects", 1).unwrap();

  assert_eq!(keys(&dashboard.visible_records("issues").unwrap()), vec!["OPS-2"]);
}

#[tokio::test]
async fn test_safe_mode_blocks_selection() {
  let provider = Arc::new(MockProvider::new());
  let (dashboard, _events) = mount_pair(provider).await;

  assert!(!dashboard.bus().toggle_safe_mode());
  assert_eq!(dashboard.select("projects", 0).unwrap(), 0);
  assert_eq!(dashboard.visible_records("issues").unwrap().len(), 3);
  assert!(dashboard.bus().event_log()[0].is_suppressed());
}

#[tokio::test]
async fn test_highlight_from_published_event() {
  let provider = Arc::new(MockProvider::new());
  let (dashboard, mut events) = mount_pair(provider).await;

  let matched = dashboard
    .bus()
    .publish("user.selected", json!({ "login": "ben" }), "people");
  assert_eq!(matched, 1);

  let highlighted = wait_for(&mut events, |e| matches!(e, WidgetEvent::Highlighted { .. })).await;
  assert_eq!(
    highlighted,
    WidgetEvent::Highlighted {
      widget_id: "issues".to_string(),
      indices: vec![1, 2],
    }
  );
  assert_eq!(dashboard.highlighted("issues").unwrap(), vec![1, 2]);
}

#[tokio::test]
async fn test_select_errors() {
  let provider = Arc::new(MockProvider::new());
  let (dashboard, _events) = mount_pair(provider).await;

  assert!(matches!(
    dashboard.select("issues", 0),
    Err(RuntimeError::NoSelectInteraction { .. })
  ));
  assert!(matches!(
    dashboard.select("projects", 99),
    Err(RuntimeError::RecordOutOfRange { index: 99, len: 2, .. })
  ));
  assert!(matches!(
    dashboard.select("missing", 0),
    Err(RuntimeError::WidgetNotFound { .. })
  ));
}

#[tokio::test]
async fn test_refresh_coalesces_while_in_flight() {
  let provider = Arc::new(MockProvider::gated());
  let (dashboard, mut events) = dashboard(provider.clone());

  dashboard
    .mount(instance("issues", "issues"), issues_definition("/issues"))
    .unwrap();
  provider.started.notified().await;

  assert_eq!(dashboard.refresh("issues").await.unwrap(), FetchOutcome::Skipped);
  assert_eq!(provider.calls(), 1);

  provider.release();
  wait_for_data(&mut events, "issues").await;

  provider.release();
  assert_eq!(
    dashboard.refresh("issues").await.unwrap(),
    FetchOutcome::Updated { total: 3 }
  );
  assert_eq!(provider.calls(), 2);
}

#[tokio::test]
async fn test_remove_discards_late_fetch() {
  let provider = Arc::new(MockProvider::gated());
  let (dashboard, mut events) = dashboard(provider.clone());

  dashboard
    .mount(instance("issues", "issues"), issues_definition("/issues"))
    .unwrap();
  assert_eq!(dashboard.bus().subscriber_count(), 2);
  provider.started.notified().await;

  let removed = dashboard.remove("issues").unwrap();
  assert_eq!(removed.id, "issues");
  assert_eq!(dashboard.bus().subscriber_count(), 0);

  provider.release();
  tokio::time::sleep(Duration::from_millis(50)).await;

  let mut seen = Vec::new();
  while let Ok(event) = events.try_recv() {
    seen.push(event);
  }
  assert_eq!(
    seen,
    vec![WidgetEvent::Removed {
      widget_id: "issues".to_string()
    }]
  );

  assert!(matches!(
    dashboard.refresh("issues").await,
    Err(RuntimeError::WidgetNotFound { .. })
  ));
  assert_eq!(dashboard.bus().publish("project.selected", json!({}), "test"), 0);
}

#[tokio::test(start_paused = true)]
async fn test_poll_loop_ticks_until_removed() {
  let provider = Arc::new(MockProvider::new());
  let (dashboard, _events) = dashboard(provider.clone());

  let mut definition = issues_definition("/issues");
  definition.data_source.poll_interval_seconds = Some(10);
  dashboard.mount(instance("issues", "issues"), definition).unwrap();

  tokio::time::sleep(Duration::from_secs(25)).await;
  assert_eq!(provider.calls(), 3);

  dashboard.remove("issues").unwrap();
  tokio::time::sleep(Duration::from_secs(60)).await;
  assert_eq!(provider.calls(), 3);
}

#[tokio::test(start_paused = true)]
async fn test_poll_interval_floor() {
  let provider = Arc::new(MockProvider::new());
  let config = RuntimeConfig {
    min_poll_interval_seconds: 30,
    ..Default::default()
  };
  let dashboard = Dashboard::new(config, registry(), provider.clone(), Arc::new(NoopNotifier));

  let mut definition = issues_definition("/issues");
  definition.data_source.poll_interval_seconds = Some(1);
  dashboard.mount(instance("issues", "issues"), definition).unwrap();

  tokio::time::sleep(Duration::from_secs(45)).await;
  assert_eq!(provider.calls(), 2);
  dashboard.shutdown();
}

#[tokio::test]
async fn test_fetch_failure_is_reported() {
  let provider = Arc::new(MockProvider::new());
  let (dashboard, mut events) = dashboard(provider);

  dashboard
    .mount(instance("issues", "issues"), issues_definition("/broken"))
    .unwrap();

  let failed = wait_for(&mut events, |e| matches!(e, WidgetEvent::FetchFailed { .. })).await;
  match failed {
    WidgetEvent::FetchFailed { widget_id, error } => {
      assert_eq!(widget_id, "issues");
      assert_eq!(error.code, "rate_limited");
      assert!(error.retryable);
    }
    other => panic!("expected FetchFailed, got {:?}", other),
  }

  assert!(matches!(
    dashboard.refresh("issues").await.unwrap(),
    FetchOutcome::Failed(_)
  ));
  assert!(dashboard.records("issues").unwrap().is_empty());
}

#[tokio::test]
async fn test_unknown_type_mounts_as_fallback() {
  let provider = Arc::new(MockProvider::new());
  let (dashboard, mut events) = dashboard(provider.clone());

  let mounted = dashboard
    .mount(instance("legacy", "retired-widget"), issues_definition("/issues"))
    .unwrap();
  assert!(mounted.is_fallback());
  assert_eq!(mounted.instance().widget_type, "retired-widget");

  let fallback = wait_for(&mut events, |e| matches!(e, WidgetEvent::Fallback { .. })).await;
  assert_eq!(
    fallback,
    WidgetEvent::Fallback {
      widget_id: "legacy".to_string(),
      widget_type: "retired-widget".to_string(),
    }
  );

  assert_eq!(dashboard.refresh("legacy").await.unwrap(), FetchOutcome::Skipped);
  assert_eq!(provider.calls(), 0);
  assert_eq!(dashboard.bus().subscriber_count(), 0);

  let moved = dashboard
    .move_widget("legacy", LayoutPosition { x: 0, y: 8, w: 4, h: 4 })
    .unwrap();
  assert_eq!(moved.layout_position.map(|p| (p.x, p.y)), Some((0, 8)));
  assert!(dashboard.remove("legacy").is_ok());
}

#[tokio::test]
async fn test_mount_upgrades_stored_instance() {
  let mut registry = WidgetRegistry::new();
  registry.register(WidgetType::new("issues", 2).with_migration(1, |mut config| {
    if let Value::Object(map) = &mut config {
      map.insert("state".to_string(), json!("open"));
    }
    config
  }));
  let provider = Arc::new(MockProvider::new());
  let dashboard = Dashboard::new(
    RuntimeConfig::default(),
    registry,
    provider,
    Arc::new(NoopNotifier),
  );

  let mut stored = instance("issues", "issues");
  stored.layout_position = Some(LayoutPosition { x: 0, y: 0, w: 6, h: 3 });

  let mounted = dashboard.mount(stored, issues_definition("/issues")).unwrap();
  assert!(matches!(mounted, Mounted::Ready(Normalized::Upgraded { from: 1, .. })));

  let current = dashboard.instance("issues").unwrap();
  assert_eq!(current.version, 2);
  assert_eq!(current.config, json!({ "state": "open" }));
  assert_eq!(
    current.layout_position,
    Some(LayoutPosition { x: 0, y: 0, w: 6, h: 3 })
  );
}

#[tokio::test]
async fn test_invalid_and_duplicate_mounts_rejected() {
  let provider = Arc::new(MockProvider::new());
  let (dashboard, _events) = dashboard(provider);

  let mut invalid = issues_definition("/issues");
  invalid.fields.clear();
  assert!(matches!(
    dashboard.mount(instance("issues", "issues"), invalid),
    Err(RuntimeError::InvalidDefinition { .. })
  ));
  assert!(dashboard.widget_ids().is_empty());

  dashboard
    .mount(instance("issues", "issues"), issues_definition("/issues"))
    .unwrap();
  assert!(matches!(
    dashboard.mount(instance("issues", "issues"), issues_definition("/issues")),
    Err(RuntimeError::DuplicateWidget { .. })
  ));
  assert_eq!(dashboard.bus().subscriber_count(), 2);
}

#[tokio::test]
async fn test_update_config_reaches_provider() {
  struct EchoProvider;

  #[async_trait]
  impl Provider for EchoProvider {
    async fn fetch(&self, request: &ProviderRequest) -> Result<Value, ProviderError> {
      Ok(json!({ "data": { "items": [{ "key": request.config["project"], "title": "t" }] } }))
    }
  }

  let (notifier, mut events) = ChannelNotifier::channel();
  let dashboard = Dashboard::new(
    RuntimeConfig::default(),
    registry(),
    Arc::new(EchoProvider),
    Arc::new(notifier),
  );

  dashboard
    .mount(instance("issues", "issues"), issues_definition("/issues"))
    .unwrap();
  wait_for_data(&mut events, "issues").await;

  dashboard
    .update_config("issues", json!({ "project": "OPS" }))
    .unwrap();
  dashboard.refresh("issues").await.unwrap();

  assert_eq!(keys(&dashboard.records("issues").unwrap()), vec!["OPS"]);
}
