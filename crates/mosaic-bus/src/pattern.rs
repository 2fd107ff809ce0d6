use std::fmt;

const WILDCARD: &str = "*";

/// A dot-segmented subscription pattern.
///
/// A pattern matches an event name when both have the same number of
/// segments and every pattern segment is either equal to the name segment or
/// exactly `*`. There is no multi-segment wildcard: `a.*` matches `a.b` but
/// neither `a` nor `a.b.c`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pattern {
  raw: String,
}

impl Pattern {
  pub fn new(raw: impl Into<String>) -> Self {
    Self { raw: raw.into() }
  }

  pub fn as_str(&self) -> &str {
    &self.raw
  }

  /// Whether `name` matches this pattern.
  pub fn matches(&self, name: &str) -> bool {
    let mut pattern = self.raw.split('.');
    let mut segments = name.split('.');
    loop {
      match (pattern.next(), segments.next()) {
        (None, None) => return true,
        (Some(p), Some(s)) if p == WILDCARD || p == s => continue,
        _ => return false,
      }
    }
  }
}

impl fmt::Display for Pattern {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.raw)
  }
}

impl From<&str> for Pattern {
  fn from(raw: &str) -> Self {
    Self::new(raw)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_single_segment_wildcard() {
    let pattern = Pattern::new("a.b.*");
    assert!(pattern.matches("a.b.c"));
    assert!(!pattern.matches("a.b"));
    assert!(!pattern.matches("a.b.c.d"));
    assert!(!pattern.matches("a.x.c"));
  }

  #[test]
  fn test_literal_pattern() {
    let pattern = Pattern::new("issue.selected");
    assert!(pattern.matches("issue.selected"));
    assert!(!pattern.matches("issue.selected.twice"));
    assert!(!pattern.matches("issue"));
  }

  #[test]
  fn test_leading_wildcard() {
    let pattern = Pattern::new("*.created");
    assert!(pattern.matches("order.created"));
    assert!(pattern.matches("invoice.created"));
    assert!(!pattern.matches("order.updated"));
  }

  #[test]
  fn test_wildcard_is_exact_token() {
    let pattern = Pattern::new("order.c*");
    assert!(!pattern.matches("order.created"));
    assert!(pattern.matches("order.c*"));
  }

  #[test]
  fn test_lone_wildcard() {
    let pattern = Pattern::new("*");
    assert!(pattern.matches("anything"));
    assert!(!pattern.matches("two.segments"));
  }
}
