//! `{{placeholder}}` substitution.
//!
//! A placeholder is `{{` followed by one or more identifiers joined with `.`
//! and closed by `}}`; whitespace just inside the braces is ignored. Each
//! placeholder is resolved through the path extractor against the context and
//! replaced by its string form. Unresolved values render as the empty string.
//!
//! Anything that is not a well-formed placeholder (`{{ a + b }}`, `{{a[0]}}`,
//! an unclosed `{{`) is copied through verbatim. Substitution is a single
//! left-to-right pass, so text produced by a substitution is never scanned
//! again.

use serde_json::Value;

use crate::path::Path;

const OPEN: &str = "{{";
const CLOSE: &str = "}}";

/// Render `template` against `context`.
///
/// # Example
///
/// ```
/// use serde_json::json;
///
/// let ctx = json!({ "event": { "id": 5 } });
/// assert_eq!(mosaic_expr::render("issue #{{event.id}}", &ctx), "issue #5");
/// assert_eq!(mosaic_expr::render("{{event.missing}}!", &ctx), "!");
/// ```
pub fn render(template: &str, context: &Value) -> String {
  let mut out = String::with_capacity(template.len());
  scan(template, |piece| match piece {
    Piece::Text(text) => out.push_str(text),
    Piece::Variable(variable) => {
      let path = Path::from_fields(variable.split('.'));
      if let Some(value) = path.extract(context) {
        out.push_str(&stringify(value));
      }
    }
  });
  out
}

/// List the variables referenced by `template`, in order of appearance.
pub fn placeholders(template: &str) -> Vec<String> {
  let mut found = Vec::new();
  scan(template, |piece| {
    if let Piece::Variable(variable) = piece {
      found.push(variable.to_string());
    }
  });
  found
}

/// Display form of a JSON value.
///
/// Strings are written without quotes, `null` is empty, and arrays and objects
/// fall back to compact JSON.
pub fn stringify(value: &Value) -> String {
  match value {
    Value::Null => String::new(),
    Value::String(s) => s.clone(),
    Value::Bool(b) => b.to_string(),
    Value::Number(n) => n.to_string(),
    Value::Array(_) | Value::Object(_) => value.to_string(),
  }
}

enum Piece<'a> {
  Text(&'a str),
  Variable(&'a str),
}

fn scan<'a>(template: &'a str, mut emit: impl FnMut(Piece<'a>)) {
  let mut rest = template;

  while let Some(open) = rest.find(OPEN) {
    let (before, after_open) = (&rest[..open], &rest[open + OPEN.len()..]);
    if !before.is_empty() {
      emit(Piece::Text(before));
    }

    let Some(close) = after_open.find(CLOSE) else {
      emit(Piece::Text(&rest[open..]));
      return;
    };

    let inner = after_open[..close].trim();
    if is_variable(inner) {
      emit(Piece::Variable(inner));
      rest = &after_open[close + CLOSE.len()..];
    } else {
      // Not a placeholder: keep the braces and rescan right after them, so
      // "{{{{a}}" still finds "{{a}}".
      emit(Piece::Text(OPEN));
      rest = after_open;
    }
  }

  if !rest.is_empty() {
    emit(Piece::Text(rest));
  }
}

fn is_variable(inner: &str) -> bool {
  !inner.is_empty() && inner.split('.').all(is_identifier)
}

fn is_identifier(segment: &str) -> bool {
  !segment.is_empty()
    && segment
      .chars()
      .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}
