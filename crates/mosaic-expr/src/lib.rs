//! Mosaic expression languages.
//!
//! Widget authors are untrusted, so the only expressions a definition may carry
//! are the two tiny languages in this crate:
//!
//! - [`path`]: pulls one value out of nested JSON (`$.user.login`, `$.labels[0]`, `$.items[*]`)
//! - [`template`]: substitutes `{{identifier.identifier}}` placeholders into text
//!
//! Neither language has arithmetic, conditionals, loops, function calls or any
//! way to reach host code. Both are interpreted by straight-line scanners over
//! the input string; nothing here ever hands author text to an evaluator.
//! This is the security boundary of the widget runtime: keep it that way.

pub mod path;
pub mod template;

pub use path::{Path, PathError, Segment, extract};
pub use template::{placeholders, render, stringify};
