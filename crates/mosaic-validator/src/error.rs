use std::path::PathBuf;

use thiserror::Error;

use crate::report::ValidationIssue;

/// Errors that can occur while loading a definition file.
#[derive(Debug, Error)]
pub enum LoadError {
  #[error("failed to read {}: {source}", .path.display())]
  Io {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("failed to parse {}: {source}", .path.display())]
  Parse {
    path: PathBuf,
    #[source]
    source: serde_json::Error,
  },

  /// The document parsed but failed validation.
  #[error("invalid widget definition {}: {} error(s)", .path.display(), .errors.len())]
  Invalid {
    path: PathBuf,
    errors: Vec<ValidationIssue>,
  },
}
