use std::collections::HashSet;

use mosaic_config::{FieldType, Layout, WidgetDef};
use mosaic_expr::Path;
use tracing::debug;

use crate::report::{Issues, ValidationIssue, ValidationReport};

/// Check a typed widget definition.
pub fn validate(def: &WidgetDef) -> ValidationReport {
  let mut issues = Issues::default();
  check_definition(def, &mut issues);
  debug!(
    widget = %def.metadata.name,
    errors = issues.errors.len(),
    warnings = issues.warnings.len(),
    "validated widget definition"
  );
  issues.into_report()
}

pub(crate) fn check_definition(def: &WidgetDef, issues: &mut Issues) {
  issues.require_non_empty("metadata.name", &def.metadata.name);
  check_data_source(def, issues);
  let names = check_fields(def, issues);
  check_layout(&def.layout, &names, issues);
  check_interactions(def, issues);
  check_subscriptions(def, &names, issues);
}

fn check_data_source(def: &WidgetDef, issues: &mut Issues) {
  let source = &def.data_source;
  issues.require_non_empty("dataSource.provider", &source.provider);
  issues.require_non_empty("dataSource.endpoint", &source.endpoint);

  if source.poll_interval_seconds == Some(0) {
    issues.error(ValidationIssue::OutOfRange {
      location: "dataSource.pollIntervalSeconds".to_string(),
      min: 1,
    });
  }

  if let Some(data_path) = &source.data_path {
    check_path("dataSource.dataPath", data_path, issues);
  }
}

/// Returns the set of declared field names.
fn check_fields<'a>(def: &'a WidgetDef, issues: &mut Issues) -> HashSet<&'a str> {
  let mut names = HashSet::new();

  if def.fields.is_empty() {
    issues.error(ValidationIssue::Empty {
      location: "fields".to_string(),
    });
  }

  for (i, field) in def.fields.iter().enumerate() {
    issues.require_non_empty(format!("fields[{i}].name"), &field.name);
    if !field.name.is_empty() && !names.insert(field.name.as_str()) {
      issues.error(ValidationIssue::DuplicateField {
        name: field.name.clone(),
      });
    }

    check_path(&format!("fields[{i}].path"), &field.path, issues);

    if field.field_type == FieldType::Enum && field.enum_labels.is_none() {
      issues.warn(ValidationIssue::MissingEnumLabels {
        field: field.name.clone(),
      });
    }
  }

  names
}

fn check_layout(layout: &Layout, names: &HashSet<&str>, issues: &mut Issues) {
  match layout {
    Layout::List(list) => issues.require_non_empty("layout.fields.title", &list.fields.title),
    Layout::Cards(cards) => issues.require_non_empty("layout.fields.title", &cards.fields.title),
    Layout::Table(table) => {
      if table.columns.is_empty() {
        issues.error(ValidationIssue::Empty {
          location: "layout.columns".to_string(),
        });
      }
      for (i, column) in table.columns.iter().enumerate() {
        issues.require_non_empty(format!("layout.columns[{i}].field"), &column.field);
      }
    }
    Layout::Metric(metric) => issues.require_non_empty("layout.value", &metric.value),
    Layout::Chart(chart) => {
      issues.require_non_empty("layout.xField", &chart.x_field);
      issues.require_non_empty("layout.yField", &chart.y_field);
    }
  }

  for field in layout.referenced_fields() {
    if !field.is_empty() && !names.contains(field) {
      issues.warn(ValidationIssue::UnknownFieldReference {
        location: "layout".to_string(),
        field: field.to_string(),
      });
    }
  }
}

fn check_interactions(def: &WidgetDef, issues: &mut Issues) {
  let Some(on_select) = def.on_select() else {
    return;
  };

  let location = "interactions.onSelect.eventName";
  if on_select.event_name.trim().is_empty() {
    issues.error(ValidationIssue::Empty {
      location: location.to_string(),
    });
  } else if has_empty_segment(&on_select.event_name) {
    issues.error(ValidationIssue::InvalidPattern {
      location: location.to_string(),
      pattern: on_select.event_name.clone(),
    });
  }
}

fn check_subscriptions(def: &WidgetDef, names: &HashSet<&str>, issues: &mut Issues) {
  for (i, subscription) in def.subscriptions.iter().enumerate() {
    let location = format!("subscriptions[{i}]");

    if subscription.pattern.trim().is_empty() {
      issues.error(ValidationIssue::Empty {
        location: format!("{location}.pattern"),
      });
    } else if has_empty_segment(&subscription.pattern) {
      issues.error(ValidationIssue::InvalidPattern {
        location: format!("{location}.pattern"),
        pattern: subscription.pattern.clone(),
      });
    }

    let action = &subscription.action;
    if action.is_empty() {
      issues.warn(ValidationIssue::EmptyAction {
        location: location.clone(),
      });
    }
    if let Some(filter) = &action.filter {
      check_target_field(&format!("{location}.action.filter.field"), &filter.field, names, issues);
    }
    if let Some(highlight) = &action.highlight {
      check_target_field(
        &format!("{location}.action.highlight.field"),
        &highlight.field,
        names,
        issues,
      );
    }
  }
}

/// A filter or highlight target is either a declared field name or a raw
/// path starting with `$`.
fn check_target_field(location: &str, field: &str, names: &HashSet<&str>, issues: &mut Issues) {
  if field.trim().is_empty() {
    issues.error(ValidationIssue::Empty {
      location: location.to_string(),
    });
  } else if field.starts_with('$') {
    check_path(location, field, issues);
  } else if !names.contains(field) {
    issues.warn(ValidationIssue::UnknownFieldReference {
      location: location.to_string(),
      field: field.to_string(),
    });
  }
}

fn check_path(location: &str, path: &str, issues: &mut Issues) {
  if let Err(err) = Path::parse(path) {
    issues.error(ValidationIssue::InvalidPath {
      location: location.to_string(),
      path: path.to_string(),
      reason: err.to_string(),
    });
  }
}

fn has_empty_segment(name: &str) -> bool {
  name.split('.').any(str::is_empty)
}
