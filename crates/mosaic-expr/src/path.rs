//! Path extraction over JSON records.
//!
//! # Grammar
//!
//! ```text
//! path     := "$" segment*
//! segment  := "." ident | "[" index "]" | "[*]"
//! ident    := any run of characters except '.', '[' and ']'
//! index    := decimal digits
//! ```
//!
//! A path without the leading `$` is read as if it started with `$.`, so
//! `user.login` and `$.user.login` are the same path.
//!
//! `[*]` returns the whole array at that point and ignores anything after it;
//! iterating the elements is the caller's job.
//!
//! Extraction never fails: missing keys, out-of-range indexes and type
//! mismatches all resolve to `None`.

use std::fmt;
use std::str::FromStr;

use serde_json::Value;
use thiserror::Error;

/// Errors produced while parsing a path expression.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PathError {
  #[error("path is empty")]
  Empty,

  #[error("empty segment at offset {offset}")]
  EmptySegment { offset: usize },

  #[error("unclosed '[' at offset {offset}")]
  UnclosedBracket { offset: usize },

  #[error("invalid index '{index}' at offset {offset}")]
  InvalidIndex { index: String, offset: usize },

  #[error("unexpected '{found}' at offset {offset}")]
  Unexpected { found: char, offset: usize },
}

/// One step of a path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
  /// `.name` object field access.
  Field(String),
  /// `[n]` array element.
  Index(usize),
  /// `[*]` the whole array.
  All,
}

/// A parsed path expression.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Path {
  segments: Vec<Segment>,
}

impl Path {
  /// Parse a path expression.
  pub fn parse(input: &str) -> Result<Self, PathError> {
    if input.is_empty() {
      return Err(PathError::Empty);
    }

    // Bare paths ("user.login") are implicitly rooted.
    let (rest, base) = match input.strip_prefix('$') {
      Some(rest) => (rest, 1),
      None => (input, 0),
    };

    let mut segments = Vec::new();
    let bytes = rest.as_bytes();
    let mut pos = 0;

    if base == 0 {
      let end = ident_end(rest, 0);
      if end == 0 {
        return Err(unexpected(rest, 0, base));
      }
      segments.push(Segment::Field(rest[..end].to_string()));
      pos = end;
    }

    while pos < bytes.len() {
      match bytes[pos] {
        b'.' => {
          let start = pos + 1;
          let end = ident_end(rest, start);
          if end == start {
            return Err(PathError::EmptySegment {
              offset: base + start,
            });
          }
          segments.push(Segment::Field(rest[start..end].to_string()));
          pos = end;
        }
        b'[' => {
          let start = pos + 1;
          let close = rest[start..]
            .find(']')
            .map(|i| start + i)
            .ok_or(PathError::UnclosedBracket { offset: base + pos })?;
          let inner = &rest[start..close];
          if inner == "*" {
            segments.push(Segment::All);
          } else if !inner.is_empty() && inner.bytes().all(|b| b.is_ascii_digit()) {
            let index = inner.parse().map_err(|_| PathError::InvalidIndex {
              index: inner.to_string(),
              offset: base + start,
            })?;
            segments.push(Segment::Index(index));
          } else {
            return Err(PathError::InvalidIndex {
              index: inner.to_string(),
              offset: base + start,
            });
          }
          pos = close + 1;
        }
        _ => return Err(unexpected(rest, pos, base)),
      }
    }

    Ok(Self { segments })
  }

  /// Build a path of plain field accesses, e.g. from a template variable.
  pub fn from_fields<I, S>(fields: I) -> Self
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    Self {
      segments: fields.into_iter().map(|f| Segment::Field(f.into())).collect(),
    }
  }

  pub fn segments(&self) -> &[Segment] {
    &self.segments
  }

  /// Whether this path ends in (or passes through) `[*]`.
  pub fn is_wildcard(&self) -> bool {
    self.segments.contains(&Segment::All)
  }

  /// Walk `record` along this path.
  pub fn extract<'a>(&self, record: &'a Value) -> Option<&'a Value> {
    let mut current = record;
    for segment in &self.segments {
      current = match segment {
        Segment::Field(name) => current.as_object()?.get(name)?,
        Segment::Index(index) => current.as_array()?.get(*index)?,
        Segment::All => {
          return current.is_array().then_some(current);
        }
      };
    }
    Some(current)
  }
}

impl FromStr for Path {
  type Err = PathError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    Self::parse(s)
  }
}

impl fmt::Display for Path {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str("$")?;
    for segment in &self.segments {
      match segment {
        Segment::Field(name) => write!(f, ".{}", name)?,
        Segment::Index(index) => write!(f, "[{}]", index)?,
        Segment::All => f.write_str("[*]")?,
      }
    }
    Ok(())
  }
}

/// Extract a value from `record` using a path expression.
///
/// Malformed paths resolve to `None` just like missing values.
pub fn extract<'a>(record: &'a Value, path: &str) -> Option<&'a Value> {
  Path::parse(path).ok()?.extract(record)
}

fn ident_end(s: &str, start: usize) -> usize {
  s[start..]
    .find(['.', '[', ']'])
    .map(|i| start + i)
    .unwrap_or(s.len())
}

fn unexpected(rest: &str, pos: usize, base: usize) -> PathError {
  PathError::Unexpected {
    found: rest[pos..].chars().next().unwrap_or('\0'),
    offset: base + pos,
  }
}
