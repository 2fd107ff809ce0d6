//! Mosaic pipeline.
//!
//! Turns raw provider JSON into display-ready widget records, and narrows
//! those records in reaction to events from other widgets.
//!
//! # Flow
//! 1. Envelope: `dataPath` locates the record array inside the provider response
//! 2. Transform: each field mapping extracts, coerces and formats one value
//! 3. Filter: a subscription's filter spec keeps the records matching an event
//!
//! Nothing in this crate fails. Bad input degrades to empty results or `null`
//! fields so one widget's data can never take down its neighbours.

mod coerce;
mod envelope;
mod filter;
mod record;
mod transform;

pub use coerce::coerce;
pub use envelope::{locate_records, normalize_response};
pub use filter::{filter, highlight, matches};
pub use record::NormalizedRecord;
pub use transform::{Transformer, transform};
