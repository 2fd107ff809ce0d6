use std::collections::VecDeque;

use crate::event::EventLogEntry;

/// Bounded event history, oldest evicted first.
///
/// Purely observational: nothing reads it back to drive behaviour.
#[derive(Debug, Clone)]
pub struct EventLog {
  entries: VecDeque<EventLogEntry>,
  capacity: usize,
}

impl EventLog {
  pub fn new(capacity: usize) -> Self {
    Self {
      entries: VecDeque::with_capacity(capacity),
      capacity,
    }
  }

  pub fn push(&mut self, entry: EventLogEntry) {
    if self.capacity == 0 {
      return;
    }
    if self.entries.len() == self.capacity {
      self.entries.pop_front();
    }
    self.entries.push_back(entry);
  }

  /// Entries, most recent last.
  pub fn entries(&self) -> Vec<EventLogEntry> {
    self.entries.iter().cloned().collect()
  }

  pub fn len(&self) -> usize {
    self.entries.len()
  }

  pub fn is_empty(&self) -> bool {
    self.entries.is_empty()
  }

  pub fn clear(&mut self) {
    self.entries.clear();
  }
}
