//! Store traits and the error contract their implementations honour.
//!
//! [`ConsultationStore`] is the narrow seam the inference engine reads and
//! writes through. [`KnowledgeStore`] extends it with the administrative
//! operations that curate the knowledge base. Storage backends (e.g.
//! `pakar-store-sqlite`) implement both; higher layers (`pakar-api`) depend on
//! these abstractions, not on any concrete backend.

use std::future::Future;

use uuid::Uuid;

use crate::{
  category::{Category, NewCategory},
  characteristic::{Characteristic, NewCharacteristic},
  consultation::{ConsultationQuery, ConsultationRecord, NewConsultationRecord},
  recommendation::{NewRecommendation, Recommendation},
  rule::{NewRule, Rule, RuleEntry, RuleScope},
  subject::{NewSubject, Subject, SubjectFilter},
};

// ─── Error contract ──────────────────────────────────────────────────────────

/// Implemented by backend error types so callers can tell domain rejections
/// (not found, duplicate code, referenced entity) from infrastructure faults.
pub trait StoreError: std::error::Error + Send + Sync + 'static {
  /// The domain error behind this failure, if it is one.
  fn domain(&self) -> Option<&crate::Error>;
}

// ─── Engine seam ─────────────────────────────────────────────────────────────

/// Everything the consultation engine needs from storage.
///
/// All methods return `Send` futures so the trait can be used in
/// multi-threaded async runtimes (e.g. tokio with `axum`).
pub trait ConsultationStore: Send + Sync {
  type Error: StoreError;

  /// Retrieve a subject by id. Returns `None` if not found.
  fn find_subject(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Subject>, Self::Error>> + Send + '_;

  /// Read the rules admitted by `scope`, each with the status of its
  /// consequent recommendation.
  ///
  /// The order is part of the contract: ascending `created_at`, ties broken
  /// by insertion order. Best-match tie-breaking depends on it.
  fn list_rules(
    &self,
    scope: RuleScope,
  ) -> impl Future<Output = Result<Vec<RuleEntry>, Self::Error>> + Send + '_;

  /// Persist a consultation record. The record id and `created_at` are set by
  /// the store. Either the whole record is written or nothing is.
  fn record_consultation(
    &self,
    input: NewConsultationRecord,
  ) -> impl Future<Output = Result<ConsultationRecord, Self::Error>> + Send + '_;
}

// ─── Administrative seam ─────────────────────────────────────────────────────

/// Curation of the knowledge base and access to consultation history.
///
/// Create and update methods take the same input type; an update replaces
/// every editable field. Reads of characteristics and recommendations only
/// ever return entries with [`crate::status::Status::Active`].
pub trait KnowledgeStore: ConsultationStore {
  // ── Categories ────────────────────────────────────────────────────────

  /// Fails with `Duplicate` on a taken name, `CategoryNotFound` on an unknown
  /// parent.
  fn create_category(
    &self,
    input: NewCategory,
  ) -> impl Future<Output = Result<Category, Self::Error>> + Send + '_;

  fn get_category(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Category>, Self::Error>> + Send + '_;

  /// All categories ordered by name.
  fn list_categories(
    &self,
  ) -> impl Future<Output = Result<Vec<Category>, Self::Error>> + Send + '_;

  /// Fails with `CategoryCycle` if the new parent is the category itself or
  /// one of its descendants.
  fn update_category(
    &self,
    id: Uuid,
    input: NewCategory,
  ) -> impl Future<Output = Result<Category, Self::Error>> + Send + '_;

  /// Fails with `CategoryInUse` while the category has children or anything
  /// refers to it.
  fn delete_category(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  // ── Characteristics ───────────────────────────────────────────────────

  fn create_characteristic(
    &self,
    input: NewCharacteristic,
  ) -> impl Future<Output = Result<Characteristic, Self::Error>> + Send + '_;

  fn get_characteristic(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Characteristic>, Self::Error>> + Send + '_;

  /// Active characteristics ordered by code, optionally within one category.
  fn list_characteristics(
    &self,
    category_id: Option<Uuid>,
  ) -> impl Future<Output = Result<Vec<Characteristic>, Self::Error>> + Send + '_;

  fn update_characteristic(
    &self,
    id: Uuid,
    input: NewCharacteristic,
  ) -> impl Future<Output = Result<Characteristic, Self::Error>> + Send + '_;

  /// Soft delete. Fails with `InUse` if any rule references it.
  fn delete_characteristic(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  // ── Recommendations ───────────────────────────────────────────────────

  fn create_recommendation(
    &self,
    input: NewRecommendation,
  ) -> impl Future<Output = Result<Recommendation, Self::Error>> + Send + '_;

  fn get_recommendation(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Recommendation>, Self::Error>> + Send + '_;

  /// Active recommendations ordered by code, optionally within one category.
  fn list_recommendations(
    &self,
    category_id: Option<Uuid>,
  ) -> impl Future<Output = Result<Vec<Recommendation>, Self::Error>> + Send + '_;

  fn update_recommendation(
    &self,
    id: Uuid,
    input: NewRecommendation,
  ) -> impl Future<Output = Result<Recommendation, Self::Error>> + Send + '_;

  /// Soft delete. Fails with `InUse` if any rule concludes it.
  fn delete_recommendation(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  // ── Rules ─────────────────────────────────────────────────────────────

  /// Every antecedent characteristic and the consequent must be active.
  fn create_rule(
    &self,
    input: NewRule,
  ) -> impl Future<Output = Result<Rule, Self::Error>> + Send + '_;

  fn get_rule(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Rule>, Self::Error>> + Send + '_;

  /// Rules in snapshot order, optionally within one category.
  fn list_rule_definitions(
    &self,
    category_id: Option<Uuid>,
  ) -> impl Future<Output = Result<Vec<Rule>, Self::Error>> + Send + '_;

  fn update_rule(
    &self,
    id: Uuid,
    input: NewRule,
  ) -> impl Future<Output = Result<Rule, Self::Error>> + Send + '_;

  fn delete_rule(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  // ── Subjects ──────────────────────────────────────────────────────────

  /// Fails with `SubjectExists` if the user already has a subject in the
  /// category.
  fn create_subject(
    &self,
    input: NewSubject,
  ) -> impl Future<Output = Result<Subject, Self::Error>> + Send + '_;

  fn list_subjects(
    &self,
    filter: SubjectFilter,
  ) -> impl Future<Output = Result<Vec<Subject>, Self::Error>> + Send + '_;

  /// Rename a subject or move it to another user or category. Fails with
  /// `SubjectExists` if the target pair is taken by a different subject.
  /// Existing consultation records stay with the subject.
  fn update_subject(
    &self,
    id: Uuid,
    input: NewSubject,
  ) -> impl Future<Output = Result<Subject, Self::Error>> + Send + '_;

  /// Deletes the subject together with its consultation records.
  fn delete_subject(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  // ── Consultation history ──────────────────────────────────────────────

  fn get_consultation(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<ConsultationRecord>, Self::Error>> + Send + '_;

  /// Records newest first.
  fn list_consultations(
    &self,
    query: ConsultationQuery,
  ) -> impl Future<Output = Result<Vec<ConsultationRecord>, Self::Error>> + Send + '_;

  fn delete_consultation(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;
}
