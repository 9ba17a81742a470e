//! Categories and the parent/child tree they form.
//!
//! Categories are stored flat, each with an optional parent id. The tree is
//! never materialised as linked nodes; [`CategoryTree`] is an arena keyed by
//! id that answers ancestry questions, which is all the acyclicity check needs.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Error, Result};

/// A grouping for characteristics, recommendations, rules and subjects.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Category {
  pub category_id: Uuid,
  /// Unique across all categories.
  pub name:        String,
  pub description: Option<String>,
  pub parent_id:   Option<Uuid>,
  pub created_at:  DateTime<Utc>,
  pub updated_at:  DateTime<Utc>,
}

/// Input to [`crate::store::KnowledgeStore::create_category`] and
/// [`crate::store::KnowledgeStore::update_category`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewCategory {
  pub name:        String,
  #[serde(default)]
  pub description: Option<String>,
  #[serde(default)]
  pub parent_id:   Option<Uuid>,
}

impl NewCategory {
  pub fn new(name: impl Into<String>) -> Self {
    Self { name: name.into(), description: None, parent_id: None }
  }

  /// Trim the name and reject it if nothing is left.
  pub fn normalized(mut self) -> Result<Self> {
    self.name = self.name.trim().to_owned();
    if self.name.is_empty() {
      return Err(Error::InvalidInput("category name must not be empty".into()));
    }
    Ok(self)
  }
}

// ─── Tree ────────────────────────────────────────────────────────────────────

/// Flat parent table for every stored category.
#[derive(Debug, Clone, Default)]
pub struct CategoryTree {
  parents: HashMap<Uuid, Option<Uuid>>,
}

impl CategoryTree {
  pub fn from_edges(
    edges: impl IntoIterator<Item = (Uuid, Option<Uuid>)>,
  ) -> Self {
    Self { parents: edges.into_iter().collect() }
  }

  pub fn contains(&self, id: Uuid) -> bool { self.parents.contains_key(&id) }

  /// Walk upwards from `id`, yielding each ancestor (parent first).
  ///
  /// The walk is bounded by the number of stored categories, so a table that
  /// already contains a cycle terminates instead of looping forever.
  pub fn ancestors(&self, id: Uuid) -> impl Iterator<Item = Uuid> + '_ {
    let mut next = self.parents.get(&id).copied().flatten();
    let mut remaining = self.parents.len();
    std::iter::from_fn(move || {
      if remaining == 0 {
        return None;
      }
      remaining -= 1;
      let current = next?;
      next = self.parents.get(&current).copied().flatten();
      Some(current)
    })
  }

  /// Check that `category_id` may take `parent_id` as its parent.
  ///
  /// `category_id` need not be in the tree yet (creation). The parent must
  /// exist, must not be the category itself, and must not have the category
  /// anywhere in its ancestor chain.
  pub fn check_parent(
    &self,
    category_id: Uuid,
    parent_id: Option<Uuid>,
  ) -> Result<()> {
    let Some(parent_id) = parent_id else {
      return Ok(());
    };
    if !self.contains(parent_id) {
      return Err(Error::CategoryNotFound(parent_id));
    }
    if parent_id == category_id
      || self.ancestors(parent_id).any(|a| a == category_id)
    {
      return Err(Error::CategoryCycle { category_id, parent_id });
    }
    Ok(())
  }
}
