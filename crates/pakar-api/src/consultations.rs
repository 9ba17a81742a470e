//! Handlers for `/consultations` endpoints.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `POST`   | `/consultations` | Body: [`ConsultBody`]; runs a consultation |
//! | `GET`    | `/consultations` | All records, newest first; `?limit=&offset=` |
//! | `GET`    | `/consultations/{id}` | Record with its subject and resolved entries; 404 if not found |
//! | `DELETE` | `/consultations/{id}` | Admin removal of one record |
//!
//! `POST /consultations` answers 200 for both outcomes; the body's `outcome`
//! field tells them apart. The configured timeout bounds validation and
//! scoring only. Once a record is being written the request waits for it, so
//! a 504 always means nothing was persisted.

use axum::{
  Json,
  extract::{Path, Query, State},
  http::StatusCode,
};
use pakar_core::{
  characteristic::Characteristic,
  consultation::{ConsultationQuery, ConsultationRecord},
  engine::{Consultation, RuleMatch, evaluate, persist},
  recommendation::Recommendation,
  store::KnowledgeStore,
  subject::Subject,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{ApiState, Paging, error::ApiError};

// ─── Run ──────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ConsultBody {
  pub subject_id: Uuid,
  /// Selected characteristic ids. Must be non-empty and duplicate-free.
  pub selected:   Vec<Uuid>,
}

/// Response body of `POST /consultations`.
#[derive(Debug, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ConsultResponse {
  Resolved {
    record:          ConsultationRecord,
    matches:         Vec<RuleMatch>,
    /// The resolved recommendations in `record.recommendations` order. One
    /// soft-deleted between scoring and this lookup is left out.
    recommendations: Vec<Recommendation>,
  },
  NoMatch,
}

/// `POST /consultations`
pub async fn run<S: KnowledgeStore>(
  State(state): State<ApiState<S>>,
  Json(body): Json<ConsultBody>,
) -> Result<Json<ConsultResponse>, ApiError> {
  let store = state.store.as_ref();
  let subject_id = body.subject_id;

  let pending = evaluate(store, &state.policy, subject_id, body.selected);
  let evaluation = match state.consult_timeout {
    Some(limit) => tokio::time::timeout(limit, pending).await.map_err(|_| {
      tracing::warn!(%subject_id, ?limit, "consultation timed out");
      ApiError::Timeout(limit)
    })?,
    None => pending.await,
  }
  .map_err(ApiError::from_consult)?;

  let outcome = persist(store, evaluation)
    .await
    .map_err(ApiError::from_consult)?;
  let Consultation::Resolved { record, matches } = outcome else {
    return Ok(Json(ConsultResponse::NoMatch));
  };

  let recommendations = recommendations_of(store, &record).await?;
  Ok(Json(ConsultResponse::Resolved { record, matches, recommendations }))
}

async fn recommendations_of<S: KnowledgeStore>(
  store: &S,
  record: &ConsultationRecord,
) -> Result<Vec<Recommendation>, ApiError> {
  let mut found = Vec::with_capacity(record.recommendations.len());
  for id in &record.recommendations {
    match store.get_recommendation(*id).await.map_err(ApiError::from_store)? {
      Some(recommendation) => found.push(recommendation),
      None => tracing::warn!(
        record_id = %record.record_id,
        recommendation_id = %id,
        "recorded recommendation is no longer active",
      ),
    }
  }
  Ok(found)
}

async fn characteristics_of<S: KnowledgeStore>(
  store: &S,
  record: &ConsultationRecord,
) -> Result<Vec<Characteristic>, ApiError> {
  let mut found = Vec::with_capacity(record.selected.len());
  for id in &record.selected {
    // Unknown ids are legal selections, so a miss is not worth a warning.
    if let Some(characteristic) =
      store.get_characteristic(*id).await.map_err(ApiError::from_store)?
    {
      found.push(characteristic);
    }
  }
  Ok(found)
}

// ─── History ──────────────────────────────────────────────────────────────────

/// `GET /consultations[?limit=&offset=]`
pub async fn list<S: KnowledgeStore>(
  State(state): State<ApiState<S>>,
  Query(paging): Query<Paging>,
) -> Result<Json<Vec<ConsultationRecord>>, ApiError> {
  let records = state
    .store
    .list_consultations(ConsultationQuery {
      subject_id: None,
      limit:      paging.limit,
      offset:     paging.offset,
    })
    .await
    .map_err(ApiError::from_store)?;
  Ok(Json(records))
}

/// Response body of `GET /consultations/{id}`.
#[derive(Debug, Serialize)]
pub struct ConsultationDetail {
  pub record:          ConsultationRecord,
  pub subject:         Subject,
  /// Selected characteristics that are still active, in selection order.
  pub characteristics: Vec<Characteristic>,
  /// Resolved recommendations that are still active, in result order.
  pub recommendations: Vec<Recommendation>,
}

/// `GET /consultations/{id}`
pub async fn get_one<S: KnowledgeStore>(
  State(state): State<ApiState<S>>,
  Path(id): Path<Uuid>,
) -> Result<Json<ConsultationDetail>, ApiError> {
  let store = state.store.as_ref();
  let record = store
    .get_consultation(id)
    .await
    .map_err(ApiError::from_store)?
    .ok_or_else(|| ApiError::NotFound(format!("consultation record {id} not found")))?;

  // Records go with their subject, so a miss here means it was deleted
  // between the two reads.
  let subject = store
    .find_subject(record.subject_id)
    .await
    .map_err(ApiError::from_store)?
    .ok_or_else(|| ApiError::NotFound(format!("consultation record {id} not found")))?;

  let characteristics = characteristics_of(store, &record).await?;
  let recommendations = recommendations_of(store, &record).await?;
  Ok(Json(ConsultationDetail { record, subject, characteristics, recommendations }))
}

/// `DELETE /consultations/{id}`
pub async fn delete<S: KnowledgeStore>(
  State(state): State<ApiState<S>>,
  Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
  state
    .store
    .delete_consultation(id)
    .await
    .map_err(ApiError::from_store)?;
  Ok(StatusCode::NO_CONTENT)
}
