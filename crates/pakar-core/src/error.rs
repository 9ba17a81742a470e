//! Error types for `pakar-core`.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// The kind of catalogue entity an error refers to.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Serialize,
  Deserialize,
  strum::Display,
  strum::AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum EntityKind {
  Category,
  Characteristic,
  Recommendation,
  Rule,
  Subject,
}

#[derive(Debug, Error)]
pub enum Error {
  #[error("invalid input: {0}")]
  InvalidInput(String),

  #[error("category not found: {0}")]
  CategoryNotFound(Uuid),

  #[error("characteristic not found: {0}")]
  CharacteristicNotFound(Uuid),

  #[error("recommendation not found: {0}")]
  RecommendationNotFound(Uuid),

  #[error("rule not found: {0}")]
  RuleNotFound(Uuid),

  #[error("subject not found: {0}")]
  SubjectNotFound(Uuid),

  #[error("consultation record not found: {0}")]
  ConsultationNotFound(Uuid),

  #[error("{entity} {key:?} already exists")]
  Duplicate { entity: EntityKind, key: String },

  #[error("user {user_id} already has a subject in category {category_id}")]
  SubjectExists { user_id: Uuid, category_id: Uuid },

  #[error("{entity} {id} is referenced by rule {rule_code:?}")]
  InUse {
    entity:    EntityKind,
    id:        Uuid,
    rule_code: String,
  },

  #[error("category {0} still has children or referencing entities")]
  CategoryInUse(Uuid),

  #[error("making {parent_id} the parent of {category_id} would create a cycle")]
  CategoryCycle { category_id: Uuid, parent_id: Uuid },

  #[error("a rule needs at least one characteristic in its antecedent")]
  EmptyAntecedent,
}

impl Error {
  /// Whether this error reports a missing entity.
  pub fn is_not_found(&self) -> bool {
    matches!(
      self,
      Self::CategoryNotFound(_)
        | Self::CharacteristicNotFound(_)
        | Self::RecommendationNotFound(_)
        | Self::RuleNotFound(_)
        | Self::SubjectNotFound(_)
        | Self::ConsultationNotFound(_)
    )
  }

  /// Whether this error reports a conflict with existing stored state.
  pub fn is_conflict(&self) -> bool {
    matches!(
      self,
      Self::Duplicate { .. }
        | Self::SubjectExists { .. }
        | Self::InUse { .. }
        | Self::CategoryInUse(_)
        | Self::CategoryCycle { .. }
    )
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
