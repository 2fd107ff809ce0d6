use serde_json::Value;

/// Overlay `user` config on top of `defaults`.
///
/// Object keys are merged one level deep. A user value of `null` counts as
/// absent and keeps the default; `0`, `false` and `""` are real values and
/// win.
pub fn merge_config(defaults: &Value, user: Value) -> Value {
  match (defaults, user) {
    (Value::Object(defaults), Value::Object(user)) => {
      let mut merged = defaults.clone();
      for (key, value) in user {
        if !value.is_null() {
          merged.insert(key, value);
        }
      }
      Value::Object(merged)
    }
    (defaults, Value::Null) => defaults.clone(),
    (_, user) => user,
  }
}
