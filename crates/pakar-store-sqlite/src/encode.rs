//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are stored as fixed-width RFC 3339 strings (microseconds, `Z`
//! suffix) so that lexical order equals chronological order. Id lists are
//! stored as compact JSON arrays. UUIDs are hyphenated lowercase strings.

use std::{collections::BTreeSet, str::FromStr};

use chrono::{DateTime, SecondsFormat, Utc};
use pakar_core::{
  category::Category,
  characteristic::Characteristic,
  consultation::ConsultationRecord,
  recommendation::Recommendation,
  rule::{Rule, RuleEntry},
  status::Status,
  subject::Subject,
};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Uuid ────────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

fn decode_opt_uuid(s: Option<String>) -> Result<Option<Uuid>> {
  s.as_deref().map(decode_uuid).transpose()
}

/// Read a UUID column inside a database closure, where only
/// [`rusqlite::Error`] can be raised.
pub fn read_uuid(row: &rusqlite::Row<'_>, idx: usize) -> rusqlite::Result<Uuid> {
  let s: String = row.get(idx)?;
  Uuid::parse_str(&s).map_err(|e| {
    rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
  })
}

pub fn read_opt_uuid(
  row: &rusqlite::Row<'_>,
  idx: usize,
) -> rusqlite::Result<Option<Uuid>> {
  let s: Option<String> = row.get(idx)?;
  s.map(|s| {
    Uuid::parse_str(&s).map_err(|e| {
      rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
    })
  })
  .transpose()
}

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String {
  dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

/// The current time, truncated to what survives a round trip through
/// [`encode_dt`].
pub fn now() -> DateTime<Utc> {
  let now = Utc::now();
  decode_dt(&encode_dt(now)).unwrap_or(now)
}

// ─── Status ──────────────────────────────────────────────────────────────────

pub fn encode_status(s: Status) -> &'static str { s.into() }

pub fn decode_status(s: &str) -> Result<Status> {
  Status::from_str(s).map_err(|_| Error::Decode(format!("unknown status: {s:?}")))
}

// ─── Id lists ────────────────────────────────────────────────────────────────

pub fn encode_ids(ids: &[Uuid]) -> Result<String> {
  Ok(serde_json::to_string(ids)?)
}

pub fn decode_ids(s: &str) -> Result<Vec<Uuid>> { Ok(serde_json::from_str(s)?) }

// ─── Row types ───────────────────────────────────────────────────────────────

/// Raw strings read directly from a `categories` row.
pub struct RawCategory {
  pub category_id: String,
  pub name:        String,
  pub description: Option<String>,
  pub parent_id:   Option<String>,
  pub created_at:  String,
  pub updated_at:  String,
}

pub const CATEGORY_COLUMNS: &str =
  "category_id, name, description, parent_id, created_at, updated_at";

impl RawCategory {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      category_id: row.get(0)?,
      name:        row.get(1)?,
      description: row.get(2)?,
      parent_id:   row.get(3)?,
      created_at:  row.get(4)?,
      updated_at:  row.get(5)?,
    })
  }

  pub fn into_category(self) -> Result<Category> {
    Ok(Category {
      category_id: decode_uuid(&self.category_id)?,
      name:        self.name,
      description: self.description,
      parent_id:   decode_opt_uuid(self.parent_id)?,
      created_at:  decode_dt(&self.created_at)?,
      updated_at:  decode_dt(&self.updated_at)?,
    })
  }
}

/// Raw strings read directly from a `characteristics` row.
pub struct RawCharacteristic {
  pub characteristic_id: String,
  pub code:              String,
  pub question:          String,
  pub category_id:       String,
  pub status:            String,
  pub created_at:        String,
  pub updated_at:        String,
}

pub const CHARACTERISTIC_COLUMNS: &str =
  "characteristic_id, code, question, category_id, status, created_at, updated_at";

impl RawCharacteristic {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      characteristic_id: row.get(0)?,
      code:              row.get(1)?,
      question:          row.get(2)?,
      category_id:       row.get(3)?,
      status:            row.get(4)?,
      created_at:        row.get(5)?,
      updated_at:        row.get(6)?,
    })
  }

  pub fn into_characteristic(self) -> Result<Characteristic> {
    Ok(Characteristic {
      characteristic_id: decode_uuid(&self.characteristic_id)?,
      code:              self.code,
      question:          self.question,
      category_id:       decode_uuid(&self.category_id)?,
      status:            decode_status(&self.status)?,
      created_at:        decode_dt(&self.created_at)?,
      updated_at:        decode_dt(&self.updated_at)?,
    })
  }
}

/// Raw strings read directly from a `recommendations` row.
pub struct RawRecommendation {
  pub recommendation_id: String,
  pub code:              String,
  pub name:              String,
  pub description:       Option<String>,
  pub category_id:       String,
  pub status:            String,
  pub created_at:        String,
  pub updated_at:        String,
}

pub const RECOMMENDATION_COLUMNS: &str = "recommendation_id, code, name, \
                                          description, category_id, status, \
                                          created_at, updated_at";

impl RawRecommendation {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      recommendation_id: row.get(0)?,
      code:              row.get(1)?,
      name:              row.get(2)?,
      description:       row.get(3)?,
      category_id:       row.get(4)?,
      status:            row.get(5)?,
      created_at:        row.get(6)?,
      updated_at:        row.get(7)?,
    })
  }

  pub fn into_recommendation(self) -> Result<Recommendation> {
    Ok(Recommendation {
      recommendation_id: decode_uuid(&self.recommendation_id)?,
      code:              self.code,
      name:              self.name,
      description:       self.description,
      category_id:       decode_uuid(&self.category_id)?,
      status:            decode_status(&self.status)?,
      created_at:        decode_dt(&self.created_at)?,
      updated_at:        decode_dt(&self.updated_at)?,
    })
  }
}

/// A `rules` row joined with its consequent's status, plus the antecedent
/// ids gathered from `rule_antecedents`.
pub struct RawRule {
  pub rule_id:           String,
  pub code:              String,
  pub consequent_id:     String,
  pub category_id:       Option<String>,
  pub created_at:        String,
  pub updated_at:        String,
  pub consequent_status: String,
  pub antecedent:        Vec<String>,
}

impl RawRule {
  pub fn into_entry(self) -> Result<RuleEntry> {
    let antecedent = self
      .antecedent
      .iter()
      .map(|s| decode_uuid(s))
      .collect::<Result<BTreeSet<_>>>()?;
    Ok(RuleEntry {
      consequent_status: decode_status(&self.consequent_status)?,
      rule:              Rule {
        rule_id: decode_uuid(&self.rule_id)?,
        code: self.code,
        antecedent,
        consequent: decode_uuid(&self.consequent_id)?,
        category_id: decode_opt_uuid(self.category_id)?,
        created_at: decode_dt(&self.created_at)?,
        updated_at: decode_dt(&self.updated_at)?,
      },
    })
  }

  pub fn into_rule(self) -> Result<Rule> { Ok(self.into_entry()?.rule) }
}

/// Raw strings read directly from a `subjects` row.
pub struct RawSubject {
  pub subject_id:  String,
  pub user_id:     String,
  pub category_id: String,
  pub name:        String,
  pub created_at:  String,
}

pub const SUBJECT_COLUMNS: &str =
  "subject_id, user_id, category_id, name, created_at";

impl RawSubject {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      subject_id:  row.get(0)?,
      user_id:     row.get(1)?,
      category_id: row.get(2)?,
      name:        row.get(3)?,
      created_at:  row.get(4)?,
    })
  }

  pub fn into_subject(self) -> Result<Subject> {
    Ok(Subject {
      subject_id:  decode_uuid(&self.subject_id)?,
      user_id:     decode_uuid(&self.user_id)?,
      category_id: decode_uuid(&self.category_id)?,
      name:        self.name,
      created_at:  decode_dt(&self.created_at)?,
    })
  }
}

/// Raw strings read directly from a `consultations` row.
pub struct RawConsultation {
  pub record_id:            String,
  pub subject_id:           String,
  pub selected_json:        String,
  pub recommendations_json: String,
  pub created_at:           String,
}

pub const CONSULTATION_COLUMNS: &str =
  "record_id, subject_id, selected_json, recommendations_json, created_at";

impl RawConsultation {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      record_id:            row.get(0)?,
      subject_id:           row.get(1)?,
      selected_json:        row.get(2)?,
      recommendations_json: row.get(3)?,
      created_at:           row.get(4)?,
    })
  }

  pub fn into_record(self) -> Result<ConsultationRecord> {
    Ok(ConsultationRecord {
      record_id:       decode_uuid(&self.record_id)?,
      subject_id:      decode_uuid(&self.subject_id)?,
      selected:        decode_ids(&self.selected_json)?,
      recommendations: decode_ids(&self.recommendations_json)?,
      created_at:      decode_dt(&self.created_at)?,
    })
  }
}
