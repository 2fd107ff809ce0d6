use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Interactions a widget exposes to the user.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Interactions {
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub on_select: Option<EventPublishSpec>,
}

/// Event published when the user selects a record.
///
/// Payload values are templates resolved against the selected record, e.g.
/// `{ "issueId": "{{id}}", "repo": "{{raw.repository.name}}" }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventPublishSpec {
  pub event_name: String,
  #[serde(default)]
  pub payload: HashMap<String, String>,
  pub source: String,
}

/// Reaction to events published by other widgets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventSubscription {
  /// Dot-segmented pattern; `*` matches exactly one segment.
  pub pattern: String,
  pub action: SubscriptionAction,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SubscriptionAction {
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub filter: Option<FilterSpec>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub highlight: Option<HighlightSpec>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub notification: Option<NotificationSpec>,
}

impl SubscriptionAction {
  pub fn is_empty(&self) -> bool {
    self.filter.is_none() && self.highlight.is_none() && self.notification.is_none()
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FilterOperator {
  /// Exact string match.
  Equals,
  /// Case-insensitive substring.
  Contains,
  /// Case-insensitive prefix.
  StartsWith,
  /// Membership in a comma-separated list.
  In,
}

/// Narrows a widget's records using an incoming event payload.
///
/// `value` is a template resolved against `{ event: payload }`, e.g.
/// `"{{event.projectKey}}"`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterSpec {
  pub field: String,
  pub operator: FilterOperator,
  pub value: String,
}

/// Marks records whose field equals the resolved value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HighlightSpec {
  pub field: String,
  pub value: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationLevel {
  #[default]
  Info,
  Success,
  Warning,
  Error,
}

/// Shows a transient message rendered from the event payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationSpec {
  pub message: String,
  #[serde(default)]
  pub level: NotificationLevel,
}
