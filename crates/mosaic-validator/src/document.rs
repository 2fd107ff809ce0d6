use mosaic_config::WidgetDef;
use serde_json::{Map, Value};

use crate::report::{Issues, ValidationIssue, ValidationReport};
use crate::rules::check_definition;

const FIELD_TYPES: &[&str] = &["string", "number", "boolean", "date", "url", "enum"];

/// Check an untyped definition document.
///
/// Structural problems (missing keys, wrong shapes, unknown types) are
/// reported by location first. Only a structurally complete document is
/// deserialized and run through the typed checks of [`validate`](crate::validate).
pub fn validate_value(document: &Value) -> ValidationReport {
  let mut issues = Issues::default();

  let Some(root) = document.as_object() else {
    issues.error(ValidationIssue::WrongType {
      location: "$".to_string(),
      expected: "an object",
    });
    return issues.into_report();
  };

  if let Some(metadata) = object_at(root, "metadata", "metadata", &mut issues) {
    require_keys(metadata, "metadata", &["name", "schemaVersion"], &mut issues);
  }
  if let Some(source) = object_at(root, "dataSource", "dataSource", &mut issues) {
    require_keys(source, "dataSource", &["provider", "endpoint"], &mut issues);
  }
  check_field_entries(root, &mut issues);
  if let Some(layout) = object_at(root, "layout", "layout", &mut issues) {
    check_layout_shape(layout, &mut issues);
  }

  if !issues.errors.is_empty() {
    return issues.into_report();
  }

  match serde_json::from_value::<WidgetDef>(document.clone()) {
    Ok(def) => check_definition(&def, &mut issues),
    Err(err) => issues.error(ValidationIssue::Malformed {
      message: err.to_string(),
    }),
  }
  issues.into_report()
}

fn object_at<'a>(
  parent: &'a Map<String, Value>,
  key: &str,
  location: &str,
  issues: &mut Issues,
) -> Option<&'a Map<String, Value>> {
  match parent.get(key) {
    None | Some(Value::Null) => {
      issues.error(ValidationIssue::MissingKey {
        location: location.to_string(),
      });
      None
    }
    Some(Value::Object(map)) => Some(map),
    Some(_) => {
      issues.error(ValidationIssue::WrongType {
        location: location.to_string(),
        expected: "an object",
      });
      None
    }
  }
}

fn require_keys(map: &Map<String, Value>, location: &str, keys: &[&str], issues: &mut Issues) {
  for key in keys {
    if map.get(*key).is_none_or(Value::is_null) {
      issues.error(ValidationIssue::MissingKey {
        location: format!("{location}.{key}"),
      });
    }
  }
}

fn check_field_entries(root: &Map<String, Value>, issues: &mut Issues) {
  let entries = match root.get("fields") {
    None | Some(Value::Null) => {
      issues.error(ValidationIssue::MissingKey {
        location: "fields".to_string(),
      });
      return;
    }
    Some(Value::Array(entries)) => entries,
    Some(_) => {
      issues.error(ValidationIssue::WrongType {
        location: "fields".to_string(),
        expected: "an array",
      });
      return;
    }
  };

  for (i, entry) in entries.iter().enumerate() {
    let location = format!("fields[{i}]");
    let Some(field) = entry.as_object() else {
      issues.error(ValidationIssue::WrongType {
        location,
        expected: "an object",
      });
      continue;
    };

    require_keys(field, &location, &["name", "path", "type"], issues);

    if let Some(field_type) = field.get("type").and_then(Value::as_str)
      && !FIELD_TYPES.contains(&field_type)
    {
      issues.error(ValidationIssue::UnknownFieldType {
        location: format!("{location}.type"),
        field_type: field_type.to_string(),
      });
    }
  }
}

fn check_layout_shape(layout: &Map<String, Value>, issues: &mut Issues) {
  let Some(layout_type) = layout.get("type").and_then(Value::as_str) else {
    issues.error(ValidationIssue::MissingKey {
      location: "layout.type".to_string(),
    });
    return;
  };

  match layout_type {
    "list" | "cards" => {
      if let Some(fields) = object_at(layout, "fields", "layout.fields", issues) {
        require_keys(fields, "layout.fields", &["title"], issues);
      }
    }
    "table" => match layout.get("columns") {
      Some(Value::Array(columns)) => {
        for (i, column) in columns.iter().enumerate() {
          match column.as_object() {
            Some(column) => require_keys(column, &format!("layout.columns[{i}]"), &["field"], issues),
            None => issues.error(ValidationIssue::WrongType {
              location: format!("layout.columns[{i}]"),
              expected: "an object",
            }),
          }
        }
      }
      None | Some(Value::Null) => issues.error(ValidationIssue::MissingKey {
        location: "layout.columns".to_string(),
      }),
      Some(_) => issues.error(ValidationIssue::WrongType {
        location: "layout.columns".to_string(),
        expected: "an array",
      }),
    },
    "metric" => require_keys(layout, "layout", &["value"], issues),
    "chart" => require_keys(layout, "layout", &["chartType", "xField", "yField"], issues),
    other => issues.error(ValidationIssue::UnknownLayoutType {
      layout_type: other.to_string(),
    }),
  }
}
