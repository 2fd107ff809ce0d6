//! The data provider seam.
//!
//! The runtime never performs network I/O. Hosts plug in a [`Provider`] that
//! knows how to talk to GitHub, Linear, a GraphQL gateway or a fixture file.

use std::collections::HashMap;

use async_trait::async_trait;
use mosaic_config::{DataSource, HttpMethod};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// What a widget asks its provider for on each fetch cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderRequest {
  pub provider: String,
  pub endpoint: String,
  pub method: HttpMethod,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub params: Option<HashMap<String, serde_json::Value>>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub body: Option<serde_json::Value>,
  /// The requesting instance's config, for adapters that parametrize
  /// endpoints per instance (owner, repo, team...).
  #[serde(default)]
  pub config: serde_json::Value,
}

impl ProviderRequest {
  pub fn new(source: &DataSource, config: serde_json::Value) -> Self {
    Self {
      provider: source.provider.clone(),
      endpoint: source.endpoint.clone(),
      method: source.method,
      params: source.params.clone(),
      body: source.body.clone(),
      config,
    }
  }
}

/// Structured failure reported by a provider.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("{code}: {message}")]
pub struct ProviderError {
  pub code: String,
  pub message: String,
  /// Whether the same request may succeed later (rate limits, timeouts).
  pub retryable: bool,
}

impl ProviderError {
  pub fn new(code: impl Into<String>, message: impl Into<String>, retryable: bool) -> Self {
    Self {
      code: code.into(),
      message: message.into(),
      retryable,
    }
  }
}

/// Fetches raw JSON for a widget.
#[async_trait]
pub trait Provider: Send + Sync {
  async fn fetch(&self, request: &ProviderRequest) -> Result<serde_json::Value, ProviderError>;
}
