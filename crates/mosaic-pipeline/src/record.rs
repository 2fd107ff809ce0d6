use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A provider record after transformation.
///
/// The raw record is kept next to the normalized values because `onSelect`
/// payload templates may reference fields that were never mapped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedRecord {
  pub raw: Value,
  pub values: Map<String, Value>,
}

impl NormalizedRecord {
  pub fn new(raw: Value, values: Map<String, Value>) -> Self {
    Self { raw, values }
  }

  /// Get a normalized value by field name.
  pub fn get(&self, field: &str) -> Option<&Value> {
    self.values.get(field)
  }

  /// Template context used when this record is selected.
  ///
  /// Raw fields are overlaid by normalized values of the same name, and the
  /// whole raw record and value map stay reachable as `raw` and `values`:
  ///
  /// ```json
  /// { "title": "Fix bug", "state": "Open", "raw": { "state": "open" }, "values": { "state": "Open" } }
  /// ```
  pub fn selection_context(&self) -> Value {
    let mut context = match &self.raw {
      Value::Object(raw) => raw.clone(),
      _ => Map::new(),
    };
    for (name, value) in &self.values {
      context.insert(name.clone(), value.clone());
    }
    context.insert("raw".to_string(), self.raw.clone());
    context.insert("values".to_string(), Value::Object(self.values.clone()));
    Value::Object(context)
  }
}
