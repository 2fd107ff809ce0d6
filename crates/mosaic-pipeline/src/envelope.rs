//! Locating records inside provider responses.

use mosaic_config::WidgetDef;
use mosaic_expr::extract;
use serde_json::Value;
use tracing::warn;

use crate::record::NormalizedRecord;
use crate::transform::Transformer;

static NULL: Value = Value::Null;

/// Apply `data_path` to a provider response to find the record array.
///
/// Without a data path the response itself is returned. A path that does not
/// resolve yields `null`, which transforms to no records.
pub fn locate_records<'a>(response: &'a Value, data_path: Option<&str>) -> &'a Value {
  match data_path {
    None => response,
    Some(path) => extract(response, path).unwrap_or_else(|| {
      warn!(data_path = %path, "data path did not resolve in provider response");
      &NULL
    }),
  }
}

/// Locate and transform the records of a provider response for `def`.
pub fn normalize_response(response: &Value, def: &WidgetDef) -> Vec<NormalizedRecord> {
  let records = locate_records(response, def.data_source.data_path.as_deref());
  Transformer::new(&def.fields).transform(records)
}
