//! Type coercion for field values.

use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, Utc};
use mosaic_config::{FieldMapping, FieldType};
use mosaic_expr::stringify;
use serde_json::{Number, Value};

/// Largest magnitude kept as an integer when a number has no fractional part.
const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_991.0;

/// Coerce a resolved raw value to the field's display type.
///
/// Callers handle unresolved values before coercion; a `null` here is
/// returned unchanged.
pub fn coerce(value: &Value, field: &FieldMapping) -> Value {
  if value.is_null() {
    return Value::Null;
  }

  match field.field_type {
    FieldType::String | FieldType::Url => Value::String(stringify(value)),
    FieldType::Number => to_number(value),
    FieldType::Boolean => Value::Bool(is_truthy(value)),
    FieldType::Date => to_date(value),
    FieldType::Enum => field
      .enum_labels
      .as_ref()
      .and_then(|labels| labels.get(&stringify(value)))
      .map(|label| Value::String(label.clone()))
      .unwrap_or_else(|| value.clone()),
  }
}

fn to_number(value: &Value) -> Value {
  let n = match value {
    Value::Number(n) => return Value::Number(n.clone()),
    Value::Bool(b) => {
      if *b {
        1.0
      } else {
        0.0
      }
    }
    Value::String(s) => {
      let trimmed = s.trim();
      if trimmed.is_empty() {
        0.0
      } else {
        match trimmed.parse::<f64>() {
          Ok(n) => n,
          Err(_) => return Value::Null,
        }
      }
    }
    Value::Null | Value::Array(_) | Value::Object(_) => return Value::Null,
  };
  number_value(n)
}

fn number_value(n: f64) -> Value {
  if !n.is_finite() {
    return Value::Null;
  }
  if n.fract() == 0.0 && n.abs() <= MAX_SAFE_INTEGER {
    return Value::from(n as i64);
  }
  Number::from_f64(n).map(Value::Number).unwrap_or(Value::Null)
}

fn is_truthy(value: &Value) -> bool {
  match value {
    Value::Null => false,
    Value::Bool(b) => *b,
    Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
    Value::String(s) => !s.is_empty(),
    Value::Array(_) | Value::Object(_) => true,
  }
}

fn to_date(value: &Value) -> Value {
  let parsed = match value {
    Value::Number(n) => n
      .as_f64()
      .filter(|ms| ms.is_finite())
      .and_then(|ms| DateTime::<Utc>::from_timestamp_millis(ms as i64)),
    Value::String(s) => parse_date(s.trim()),
    _ => None,
  };

  parsed
    .map(|dt| Value::String(dt.to_rfc3339_opts(SecondsFormat::Millis, true)))
    .unwrap_or(Value::Null)
}

fn parse_date(s: &str) -> Option<DateTime<Utc>> {
  if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
    return Some(dt.with_timezone(&Utc));
  }
  for format in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S"] {
    if let Ok(naive) = NaiveDateTime::parse_from_str(s, format) {
      return Some(naive.and_utc());
    }
  }
  NaiveDate::parse_from_str(s, "%Y-%m-%d")
    .ok()
    .and_then(|date| date.and_hms_opt(0, 0, 0))
    .map(|naive| naive.and_utc())
}
