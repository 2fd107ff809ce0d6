use serde::Serialize;
use thiserror::Error;

/// A single problem found in a widget definition.
///
/// `location` values use dotted paths with indexes, e.g. `fields[2].path`.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ValidationIssue {
  #[error("missing required key '{location}'")]
  MissingKey { location: String },

  #[error("'{location}' must be {expected}")]
  WrongType {
    location: String,
    expected: &'static str,
  },

  #[error("'{location}' must not be empty")]
  Empty { location: String },

  #[error("'{location}' must be at least {min}")]
  OutOfRange { location: String, min: u64 },

  #[error("duplicate field name '{name}'")]
  DuplicateField { name: String },

  #[error("invalid path '{path}' at '{location}': {reason}")]
  InvalidPath {
    location: String,
    path: String,
    reason: String,
  },

  #[error("unknown field type '{field_type}' at '{location}'")]
  UnknownFieldType { location: String, field_type: String },

  #[error("unknown layout type '{layout_type}'")]
  UnknownLayoutType { layout_type: String },

  #[error("invalid event name or pattern '{pattern}' at '{location}'")]
  InvalidPattern { location: String, pattern: String },

  #[error("'{location}' references unknown field '{field}'")]
  UnknownFieldReference { location: String, field: String },

  #[error("enum field '{field}' has no enumLabels")]
  MissingEnumLabels { field: String },

  #[error("subscription at '{location}' has no action")]
  EmptyAction { location: String },

  #[error("malformed definition: {message}")]
  Malformed { message: String },
}

/// Outcome of validating one definition.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ValidationReport {
  pub valid: bool,
  pub errors: Vec<ValidationIssue>,
  pub warnings: Vec<ValidationIssue>,
}

impl ValidationReport {
  pub fn new(errors: Vec<ValidationIssue>, warnings: Vec<ValidationIssue>) -> Self {
    Self {
      valid: errors.is_empty(),
      errors,
      warnings,
    }
  }

  pub fn is_valid(&self) -> bool {
    self.valid
  }
}

/// Collects issues while a definition is walked.
#[derive(Debug, Default)]
pub(crate) struct Issues {
  pub(crate) errors: Vec<ValidationIssue>,
  pub(crate) warnings: Vec<ValidationIssue>,
}

impl Issues {
  pub(crate) fn error(&mut self, issue: ValidationIssue) {
    self.errors.push(issue);
  }

  pub(crate) fn warn(&mut self, issue: ValidationIssue) {
    self.warnings.push(issue);
  }

  pub(crate) fn require_non_empty(&mut self, location: impl Into<String>, value: &str) {
    if value.trim().is_empty() {
      self.error(ValidationIssue::Empty {
        location: location.into(),
      });
    }
  }

  pub(crate) fn into_report(self) -> ValidationReport {
    ValidationReport::new(self.errors, self.warnings)
  }
}
