use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// HTTP verb the provider adapter should use.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
  #[default]
  Get,
  Post,
  Put,
  Patch,
  Delete,
  /// GraphQL-style query; the endpoint carries the document.
  Query,
}

/// Where a widget's raw records come from.
///
/// The runtime never talks to the network itself; this is handed to the
/// provider collaborator as-is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataSource {
  /// Provider name, e.g. "github" or "linear"
  pub provider: String,

  /// Provider endpoint, e.g. "/repos/{owner}/{repo}/issues"
  pub endpoint: String,

  #[serde(default)]
  pub method: HttpMethod,

  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub params: Option<HashMap<String, serde_json::Value>>,

  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub body: Option<serde_json::Value>,

  /// Refresh cadence. Absent means fetch once on mount and on demand.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub poll_interval_seconds: Option<u64>,

  /// Path locating the record array inside the provider response envelope,
  /// e.g. "$.data.items". Absent means the response itself is the array.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub data_path: Option<String>,
}
