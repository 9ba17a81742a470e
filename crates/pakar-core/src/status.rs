//! Soft-delete status shared by characteristics and recommendations.

use serde::{Deserialize, Serialize};

/// Whether a catalogue entry is live or soft-deleted.
///
/// Deleted entries stay in storage so that historical consultation records and
/// rules keep resolving, but they are hidden from normal reads.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Default,
  Serialize,
  Deserialize,
  strum::Display,
  strum::AsRefStr,
  strum::EnumString,
  strum::IntoStaticStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Status {
  #[default]
  Active,
  Deleted,
}

impl Status {
  pub fn is_active(&self) -> bool { matches!(self, Self::Active) }
}

#[cfg(test)]
mod tests {
  use std::str::FromStr;

  use super::*;

  #[test]
  fn string_forms_match_serde() {
    assert_eq!(Status::Active.as_ref(), "active");
    assert_eq!(<&'static str>::from(Status::Deleted), "deleted");
    assert_eq!(Status::from_str("deleted").unwrap(), Status::Deleted);
    assert_eq!(
      serde_json::to_string(&Status::Deleted).unwrap(),
      "\"deleted\""
    );
    assert!(Status::from_str("dihapus").is_err());
  }
}
