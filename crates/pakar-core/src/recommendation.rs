//! Recommendations: the conclusions a rule can reach.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Error, Result, status::Status};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recommendation {
  pub recommendation_id: Uuid,
  pub code:              String,
  pub name:              String,
  pub description:       Option<String>,
  pub category_id:       Uuid,
  /// The engine never resolves to a deleted recommendation in best-match
  /// mode.
  pub status:            Status,
  pub created_at:        DateTime<Utc>,
  pub updated_at:        DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewRecommendation {
  pub code:        String,
  pub name:        String,
  #[serde(default)]
  pub description: Option<String>,
  pub category_id: Uuid,
}

impl NewRecommendation {
  pub fn normalized(mut self) -> Result<Self> {
    self.code = self.code.trim().to_owned();
    self.name = self.name.trim().to_owned();
    if self.code.is_empty() || self.name.is_empty() {
      return Err(Error::InvalidInput(
        "recommendation code and name must not be empty".into(),
      ));
    }
    Ok(self)
  }
}
