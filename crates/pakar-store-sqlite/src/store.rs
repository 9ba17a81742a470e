//! [`SqliteStore`]: the SQLite implementation of the Pakar store traits.
//!
//! The trait impls here are thin; the SQL for each entity lives in the
//! `catalog`, `rules` and `consultations` modules as inherent methods.

use std::path::Path;

use pakar_core::{
  category::{Category, NewCategory},
  characteristic::{Characteristic, NewCharacteristic},
  consultation::{ConsultationQuery, ConsultationRecord, NewConsultationRecord},
  recommendation::{NewRecommendation, Recommendation},
  rule::{NewRule, Rule, RuleEntry, RuleScope},
  store::{ConsultationStore, KnowledgeStore},
  subject::{NewSubject, Subject, SubjectFilter},
};
use uuid::Uuid;

use crate::{Error, Result, schema::SCHEMA};

/// The outcome of a closure run on the database thread: either the value or a
/// domain rejection detected inside the same transaction.
pub(crate) type Checked<T> = std::result::Result<T, pakar_core::Error>;

// ─── Store ───────────────────────────────────────────────────────────────────

/// A Pakar knowledge base backed by a single SQLite file.
///
/// Cloning is cheap: the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  pub(crate) conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store, useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    tracing::debug!("schema initialised");
    Ok(())
  }
}

// ─── ConsultationStore impl ──────────────────────────────────────────────────

impl ConsultationStore for SqliteStore {
  type Error = Error;

  async fn find_subject(&self, id: Uuid) -> Result<Option<Subject>> {
    self.fetch_subject(id).await
  }

  async fn list_rules(&self, scope: RuleScope) -> Result<Vec<RuleEntry>> {
    let category = match scope {
      RuleScope::All => None,
      RuleScope::Category(id) => Some(id),
    };
    self.fetch_rule_entries(category).await
  }

  async fn record_consultation(
    &self,
    input: NewConsultationRecord,
  ) -> Result<ConsultationRecord> {
    self.insert_consultation(input).await
  }
}

// ─── KnowledgeStore impl ─────────────────────────────────────────────────────

impl KnowledgeStore for SqliteStore {
  // ── Categories ────────────────────────────────────────────────────────────

  async fn create_category(&self, input: NewCategory) -> Result<Category> {
    self.insert_category(input).await
  }

  async fn get_category(&self, id: Uuid) -> Result<Option<Category>> {
    self.fetch_category(id).await
  }

  async fn list_categories(&self) -> Result<Vec<Category>> {
    self.fetch_categories().await
  }

  async fn update_category(&self, id: Uuid, input: NewCategory) -> Result<Category> {
    self.modify_category(id, input).await
  }

  async fn delete_category(&self, id: Uuid) -> Result<()> {
    self.remove_category(id).await
  }

  // ── Characteristics ───────────────────────────────────────────────────────

  async fn create_characteristic(
    &self,
    input: NewCharacteristic,
  ) -> Result<Characteristic> {
    self.insert_characteristic(input).await
  }

  async fn get_characteristic(&self, id: Uuid) -> Result<Option<Characteristic>> {
    self.fetch_characteristic(id).await
  }

  async fn list_characteristics(
    &self,
    category_id: Option<Uuid>,
  ) -> Result<Vec<Characteristic>> {
    self.fetch_characteristics(category_id).await
  }

  async fn update_characteristic(
    &self,
    id: Uuid,
    input: NewCharacteristic,
  ) -> Result<Characteristic> {
    self.modify_characteristic(id, input).await
  }

  async fn delete_characteristic(&self, id: Uuid) -> Result<()> {
    self.soft_delete_characteristic(id).await
  }

  // ── Recommendations ───────────────────────────────────────────────────────

  async fn create_recommendation(
    &self,
    input: NewRecommendation,
  ) -> Result<Recommendation> {
    self.insert_recommendation(input).await
  }

  async fn get_recommendation(&self, id: Uuid) -> Result<Option<Recommendation>> {
    self.fetch_recommendation(id).await
  }

  async fn list_recommendations(
    &self,
    category_id: Option<Uuid>,
  ) -> Result<Vec<Recommendation>> {
    self.fetch_recommendations(category_id).await
  }

  async fn update_recommendation(
    &self,
    id: Uuid,
    input: NewRecommendation,
  ) -> Result<Recommendation> {
    self.modify_recommendation(id, input).await
  }

  async fn delete_recommendation(&self, id: Uuid) -> Result<()> {
    self.soft_delete_recommendation(id).await
  }

  // ── Rules ─────────────────────────────────────────────────────────────────

  async fn create_rule(&self, input: NewRule) -> Result<Rule> {
    self.insert_rule(input).await
  }

  async fn get_rule(&self, id: Uuid) -> Result<Option<Rule>> {
    self.fetch_rule(id).await
  }

  async fn list_rule_definitions(&self, category_id: Option<Uuid>) -> Result<Vec<Rule>> {
    self
      .fetch_rule_entries(category_id)
      .await
      .map(|entries| entries.into_iter().map(|e| e.rule).collect())
  }

  async fn update_rule(&self, id: Uuid, input: NewRule) -> Result<Rule> {
    self.modify_rule(id, input).await
  }

  async fn delete_rule(&self, id: Uuid) -> Result<()> {
    self.remove_rule(id).await
  }

  // ── Subjects ──────────────────────────────────────────────────────────────

  async fn create_subject(&self, input: NewSubject) -> Result<Subject> {
    self.insert_subject(input).await
  }

  async fn list_subjects(&self, filter: SubjectFilter) -> Result<Vec<Subject>> {
    self.fetch_subjects(filter).await
  }

  async fn update_subject(&self, id: Uuid, input: NewSubject) -> Result<Subject> {
    self.modify_subject(id, input).await
  }

  async fn delete_subject(&self, id: Uuid) -> Result<()> {
    self.remove_subject(id).await
  }

  // ── Consultation history ──────────────────────────────────────────────────

  async fn get_consultation(&self, id: Uuid) -> Result<Option<ConsultationRecord>> {
    self.fetch_consultation(id).await
  }

  async fn list_consultations(
    &self,
    query: ConsultationQuery,
  ) -> Result<Vec<ConsultationRecord>> {
    self.fetch_consultations(query).await
  }

  async fn delete_consultation(&self, id: Uuid) -> Result<()> {
    self.remove_consultation(id).await
  }
}
