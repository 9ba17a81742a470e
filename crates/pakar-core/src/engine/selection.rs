//! The set of characteristics a user selected for one consultation.

use std::collections::HashSet;

use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SelectionError {
  #[error("at least one characteristic must be selected")]
  Empty,

  #[error("characteristic {0} is selected more than once")]
  Duplicate(Uuid),
}

/// A non-empty, duplicate-free set of selected characteristic ids.
///
/// The caller's order is kept for the consultation record; membership tests
/// go through a hash set.
#[derive(Debug, Clone)]
pub struct Selection {
  ordered: Vec<Uuid>,
  members: HashSet<Uuid>,
}

impl Selection {
  pub fn new(ids: Vec<Uuid>) -> Result<Self, SelectionError> {
    if ids.is_empty() {
      return Err(SelectionError::Empty);
    }
    let mut members = HashSet::with_capacity(ids.len());
    for id in &ids {
      if !members.insert(*id) {
        return Err(SelectionError::Duplicate(*id));
      }
    }
    Ok(Self { ordered: ids, members })
  }

  pub fn contains(&self, id: &Uuid) -> bool { self.members.contains(id) }

  pub fn len(&self) -> usize { self.ordered.len() }

  pub fn is_empty(&self) -> bool { self.ordered.is_empty() }

  /// Ids in the order they were selected.
  pub fn iter(&self) -> impl Iterator<Item = &Uuid> { self.ordered.iter() }

  pub fn into_ordered(self) -> Vec<Uuid> { self.ordered }
}
