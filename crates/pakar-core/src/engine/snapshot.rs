//! The immutable rule base a single consultation runs against.

use crate::rule::{RuleEntry, RuleScope};

/// Rules read once at the start of a consultation.
///
/// Iteration order is the order the store returned them in (ascending
/// creation time, then insertion order); tie-breaks in the resolution policy
/// depend on it. Rules outside the scope are dropped on construction.
#[derive(Debug, Clone, Default)]
pub struct RuleSnapshot {
  entries: Vec<RuleEntry>,
}

impl RuleSnapshot {
  pub fn new(scope: RuleScope, entries: Vec<RuleEntry>) -> Self {
    let entries =
      entries.into_iter().filter(|e| scope.admits(&e.rule)).collect();
    Self { entries }
  }

  pub fn iter(&self) -> impl Iterator<Item = &RuleEntry> { self.entries.iter() }

  pub fn len(&self) -> usize { self.entries.len() }

  pub fn is_empty(&self) -> bool { self.entries.is_empty() }
}

impl FromIterator<RuleEntry> for RuleSnapshot {
  fn from_iter<I: IntoIterator<Item = RuleEntry>>(iter: I) -> Self {
    Self { entries: iter.into_iter().collect() }
  }
}
