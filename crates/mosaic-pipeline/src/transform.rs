//! Raw records → normalized records.

use mosaic_config::FieldMapping;
use mosaic_expr::{Path, render};
use serde_json::{Map, Value, json};
use tracing::{debug, warn};

use crate::coerce::coerce;
use crate::record::NormalizedRecord;

/// Field mappings with their paths parsed once.
///
/// Build one per definition and reuse it for every poll cycle.
#[derive(Debug, Clone)]
pub struct Transformer {
  fields: Vec<CompiledField>,
}

#[derive(Debug, Clone)]
struct CompiledField {
  mapping: FieldMapping,
  /// `None` when the path failed to parse; the field then always resolves to `null`.
  path: Option<Path>,
}

impl Transformer {
  pub fn new(fields: &[FieldMapping]) -> Self {
    let fields = fields
      .iter()
      .map(|mapping| {
        let path = match Path::parse(&mapping.path) {
          Ok(path) => Some(path),
          Err(e) => {
            warn!(field = %mapping.name, path = %mapping.path, error = %e, "unparsable field path");
            None
          }
        };
        CompiledField {
          mapping: mapping.clone(),
          path,
        }
      })
      .collect();

    Self { fields }
  }

  /// Transform an array of raw records.
  ///
  /// Anything other than an array is logged and yields no records.
  pub fn transform(&self, raw_records: &Value) -> Vec<NormalizedRecord> {
    let Some(records) = raw_records.as_array() else {
      warn!(
        found = json_kind(raw_records),
        "expected an array of records, skipping transform"
      );
      return Vec::new();
    };

    let normalized: Vec<NormalizedRecord> = records.iter().map(|r| self.normalize(r)).collect();
    debug!(records = normalized.len(), fields = self.fields.len(), "records transformed");
    normalized
  }

  /// Normalize a single raw record.
  pub fn normalize(&self, raw: &Value) -> NormalizedRecord {
    let mut values = Map::with_capacity(self.fields.len());

    for field in &self.fields {
      let resolved = field
        .path
        .as_ref()
        .and_then(|path| path.extract(raw))
        .filter(|value| !value.is_null());

      let value = match resolved {
        Some(value) => {
          let coerced = coerce(value, &field.mapping);
          match &field.mapping.format {
            Some(format) => Value::String(render(format, &json!({ "value": coerced }))),
            None => coerced,
          }
        }
        None => Value::Null,
      };

      values.insert(field.mapping.name.clone(), value);
    }

    NormalizedRecord::new(raw.clone(), values)
  }
}

/// Transform raw provider records using `fields`.
pub fn transform(raw_records: &Value, fields: &[FieldMapping]) -> Vec<NormalizedRecord> {
  Transformer::new(fields).transform(raw_records)
}

fn json_kind(value: &Value) -> &'static str {
  match value {
    Value::Null => "null",
    Value::Bool(_) => "boolean",
    Value::Number(_) => "number",
    Value::String(_) => "string",
    Value::Array(_) => "array",
    Value::Object(_) => "object",
  }
}
