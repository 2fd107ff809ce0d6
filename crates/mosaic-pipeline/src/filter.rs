//! Event-driven filtering of normalized records.
//!
//! A filter spec names a record field, an operator and a value template. The
//! template is resolved against `{ event: payload }` so a subscription can say
//! "keep the issues whose project key starts with the selected project":
//!
//! ```json
//! { "field": "key", "operator": "startsWith", "value": "{{event.projectKey}}" }
//! ```

use mosaic_config::{FilterOperator, FilterSpec, HighlightSpec};
use mosaic_expr::{extract, render, stringify};
use serde_json::{Value, json};
use tracing::debug;

use crate::record::NormalizedRecord;

/// Keep the records matching `spec` for the given event payload.
///
/// Records without a value for `spec.field` are excluded.
pub fn filter(
  records: &[NormalizedRecord],
  spec: &FilterSpec,
  event_payload: &Value,
) -> Vec<NormalizedRecord> {
  let expected = resolve(&spec.value, event_payload);

  let kept: Vec<NormalizedRecord> = records
    .iter()
    .filter(|record| matches(record, spec, &expected))
    .cloned()
    .collect();

  debug!(
    field = %spec.field,
    operator = ?spec.operator,
    value = %expected,
    kept = kept.len(),
    total = records.len(),
    "filter applied"
  );

  kept
}

/// Whether `record` passes `spec` against an already resolved value.
pub fn matches(record: &NormalizedRecord, spec: &FilterSpec, expected: &str) -> bool {
  let Some(actual) = field_value(record, &spec.field) else {
    return false;
  };
  let actual = stringify(actual);

  match spec.operator {
    FilterOperator::Equals => actual == expected,
    FilterOperator::Contains => actual.to_lowercase().contains(&expected.to_lowercase()),
    FilterOperator::StartsWith => actual.to_lowercase().starts_with(&expected.to_lowercase()),
    FilterOperator::In => expected
      .split(',')
      .map(str::trim)
      .filter(|candidate| !candidate.is_empty())
      .any(|candidate| candidate == actual),
  }
}

/// Indices of the records whose field equals the resolved highlight value.
pub fn highlight(records: &[NormalizedRecord], spec: &HighlightSpec, event_payload: &Value) -> Vec<usize> {
  let expected = resolve(&spec.value, event_payload);

  records
    .iter()
    .enumerate()
    .filter(|(_, record)| field_value(record, &spec.field).is_some_and(|v| stringify(v) == expected))
    .map(|(index, _)| index)
    .collect()
}

fn resolve(template: &str, event_payload: &Value) -> String {
  render(template, &json!({ "event": event_payload }))
}

/// A record's value for `field`: the normalized value by name, or a raw path
/// when the field is written as one (`$.user.login`).
fn field_value<'a>(record: &'a NormalizedRecord, field: &str) -> Option<&'a Value> {
  let value = match record.get(field) {
    Some(value) => Some(value),
    None if field.starts_with('$') => extract(&record.raw, field),
    None => None,
  };
  value.filter(|v| !v.is_null())
}
