//! Characteristics: the observable traits a user can select.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Error, Result, status::Status};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Characteristic {
  pub characteristic_id: Uuid,
  /// Short unique code, e.g. `"K01"`.
  pub code:              String,
  /// The question shown to the user, e.g. "Does the leaf have brown spots?".
  pub question:          String,
  pub category_id:       Uuid,
  pub status:            Status,
  pub created_at:        DateTime<Utc>,
  pub updated_at:        DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewCharacteristic {
  pub code:        String,
  pub question:    String,
  pub category_id: Uuid,
}

impl NewCharacteristic {
  pub fn normalized(mut self) -> Result<Self> {
    self.code = self.code.trim().to_owned();
    self.question = self.question.trim().to_owned();
    if self.code.is_empty() {
      return Err(Error::InvalidInput("characteristic code must not be empty".into()));
    }
    if self.question.is_empty() {
      return Err(Error::InvalidInput(
        "characteristic question must not be empty".into(),
      ));
    }
    Ok(self)
  }
}
