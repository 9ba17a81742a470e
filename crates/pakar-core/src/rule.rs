//! Rules: "if these characteristics, then this recommendation".

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Error, Result, status::Status};

/// A production rule in the knowledge base.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Rule {
  pub rule_id:     Uuid,
  /// Unique, upper-cased code, e.g. `"R01"`.
  pub code:        String,
  /// The "if" part: characteristic ids that must be observed. Owned by the
  /// rule; never empty for a rule accepted by a store.
  pub antecedent:  BTreeSet<Uuid>,
  /// The "then" part: the recommendation this rule concludes.
  pub consequent:  Uuid,
  /// Restricts which subjects the rule applies to in category-scoped
  /// resolution.
  pub category_id: Option<Uuid>,
  pub created_at:  DateTime<Utc>,
  pub updated_at:  DateTime<Utc>,
}

impl Rule {
  /// Number of characteristics in the antecedent.
  pub fn specificity(&self) -> usize { self.antecedent.len() }
}

/// Input to [`crate::store::KnowledgeStore::create_rule`] and
/// [`crate::store::KnowledgeStore::update_rule`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewRule {
  pub code:        String,
  pub antecedent:  Vec<Uuid>,
  pub consequent:  Uuid,
  #[serde(default)]
  pub category_id: Option<Uuid>,
}

/// A [`NewRule`] whose shape has been checked. Stores still have to verify
/// that the referenced entities exist.
#[derive(Debug, Clone)]
pub struct ValidRule {
  pub code:        String,
  pub antecedent:  BTreeSet<Uuid>,
  pub consequent:  Uuid,
  pub category_id: Option<Uuid>,
}

impl NewRule {
  pub fn new(
    code: impl Into<String>,
    antecedent: impl IntoIterator<Item = Uuid>,
    consequent: Uuid,
  ) -> Self {
    Self {
      code: code.into(),
      antecedent: antecedent.into_iter().collect(),
      consequent,
      category_id: None,
    }
  }

  pub fn with_category(mut self, category_id: Uuid) -> Self {
    self.category_id = Some(category_id);
    self
  }

  /// Normalise the code and check the antecedent is a non-empty set.
  pub fn validate(self) -> Result<ValidRule> {
    let code = self.code.trim().to_uppercase();
    if code.is_empty() {
      return Err(Error::InvalidInput("rule code must not be empty".into()));
    }
    if self.antecedent.is_empty() {
      return Err(Error::EmptyAntecedent);
    }
    let mut antecedent = BTreeSet::new();
    for id in self.antecedent {
      if !antecedent.insert(id) {
        return Err(Error::InvalidInput(format!(
          "characteristic {id} appears twice in the antecedent"
        )));
      }
    }
    Ok(ValidRule {
      code,
      antecedent,
      consequent: self.consequent,
      category_id: self.category_id,
    })
  }
}

// ─── Snapshot inputs ─────────────────────────────────────────────────────────

/// Which rules a consultation may consider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleScope {
  /// Every rule in the knowledge base.
  All,
  /// Only rules whose category is exactly this one.
  Category(Uuid),
}

impl RuleScope {
  pub fn admits(&self, rule: &Rule) -> bool {
    match self {
      Self::All => true,
      Self::Category(id) => rule.category_id == Some(*id),
    }
  }
}

/// A rule with its consequent's status pre-joined, as handed to the engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleEntry {
  pub rule:              Rule,
  pub consequent_status: Status,
}
