//! Subject: the entity being diagnosed.
//!
//! A subject pairs a user with a category. Users themselves live outside this
//! system; `user_id` is an opaque reference supplied by the caller.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Error, Result};

/// At most one subject exists per `(user_id, category_id)` pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Subject {
  pub subject_id:  Uuid,
  pub user_id:     Uuid,
  pub category_id: Uuid,
  /// Display name, e.g. the name of the plant or patient being assessed.
  pub name:        String,
  pub created_at:  DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewSubject {
  pub user_id:     Uuid,
  pub category_id: Uuid,
  pub name:        String,
}

impl NewSubject {
  pub fn normalized(mut self) -> Result<Self> {
    self.name = self.name.trim().to_owned();
    if self.name.is_empty() {
      return Err(Error::InvalidInput("subject name must not be empty".into()));
    }
    Ok(self)
  }
}

/// Filters for [`crate::store::KnowledgeStore::list_subjects`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SubjectFilter {
  pub user_id:     Option<Uuid>,
  pub category_id: Option<Uuid>,
}
