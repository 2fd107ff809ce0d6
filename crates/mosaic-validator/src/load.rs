use std::path::Path;

use mosaic_config::WidgetDef;
use tokio::fs;
use tracing::{debug, warn};

use crate::document::validate_value;
use crate::error::LoadError;

/// Read, parse and validate a widget definition file.
///
/// Definitions with validation errors are refused. Warnings are logged and
/// the definition is returned.
pub async fn read_definition(path: impl AsRef<Path>) -> Result<WidgetDef, LoadError> {
  let path = path.as_ref();
  let content = fs::read_to_string(path).await.map_err(|source| LoadError::Io {
    path: path.to_path_buf(),
    source,
  })?;

  let document: serde_json::Value =
    serde_json::from_str(&content).map_err(|source| LoadError::Parse {
      path: path.to_path_buf(),
      source,
    })?;

  let report = validate_value(&document);
  for warning in &report.warnings {
    warn!(file = %path.display(), "{warning}");
  }
  if !report.valid {
    return Err(LoadError::Invalid {
      path: path.to_path_buf(),
      errors: report.errors,
    });
  }

  let def: WidgetDef = serde_json::from_value(document).map_err(|source| LoadError::Parse {
    path: path.to_path_buf(),
    source,
  })?;
  debug!(file = %path.display(), widget = %def.metadata.name, "loaded widget definition");
  Ok(def)
}
