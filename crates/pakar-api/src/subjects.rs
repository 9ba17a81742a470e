//! Handlers for `/subjects` endpoints.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `GET`    | `/subjects` | Optional `?user_id=` and `?category_id=` |
//! | `POST`   | `/subjects` | Body: [`NewSubject`]; 409 if the user already has one in the category |
//! | `GET`    | `/subjects/{id}` | 404 if not found |
//! | `PUT`    | `/subjects/{id}` | Body: [`NewSubject`]; 409 if the target user/category pair is taken |
//! | `DELETE` | `/subjects/{id}` | Also deletes the subject's consultation records |
//! | `GET`    | `/subjects/{id}/consultations` | Newest first; `?limit=&offset=` |

use axum::{
  Json,
  extract::{Path, Query, State},
  http::StatusCode,
  response::IntoResponse,
};
use pakar_core::{
  consultation::{ConsultationQuery, ConsultationRecord},
  store::KnowledgeStore,
  subject::{NewSubject, Subject, SubjectFilter},
};
use uuid::Uuid;

use crate::{ApiState, Paging, error::ApiError};

// ─── List ─────────────────────────────────────────────────────────────────────

/// `GET /subjects[?user_id=<id>][&category_id=<id>]`
pub async fn list<S: KnowledgeStore>(
  State(state): State<ApiState<S>>,
  Query(filter): Query<SubjectFilter>,
) -> Result<Json<Vec<Subject>>, ApiError> {
  let subjects = state
    .store
    .list_subjects(filter)
    .await
    .map_err(ApiError::from_store)?;
  Ok(Json(subjects))
}

// ─── Create ───────────────────────────────────────────────────────────────────

/// `POST /subjects`, body: `{"user_id":..,"category_id":..,"name":".."}`
pub async fn create<S: KnowledgeStore>(
  State(state): State<ApiState<S>>,
  Json(body): Json<NewSubject>,
) -> Result<impl IntoResponse, ApiError> {
  let subject = state
    .store
    .create_subject(body)
    .await
    .map_err(ApiError::from_store)?;
  Ok((StatusCode::CREATED, Json(subject)))
}

// ─── Get / update / delete one ────────────────────────────────────────────────

/// `GET /subjects/{id}`
pub async fn get_one<S: KnowledgeStore>(
  State(state): State<ApiState<S>>,
  Path(id): Path<Uuid>,
) -> Result<Json<Subject>, ApiError> {
  let subject = state
    .store
    .find_subject(id)
    .await
    .map_err(ApiError::from_store)?
    .ok_or_else(|| ApiError::NotFound(format!("subject {id} not found")))?;
  Ok(Json(subject))
}

/// `PUT /subjects/{id}`
pub async fn update<S: KnowledgeStore>(
  State(state): State<ApiState<S>>,
  Path(id): Path<Uuid>,
  Json(body): Json<NewSubject>,
) -> Result<Json<Subject>, ApiError> {
  let subject = state
    .store
    .update_subject(id, body)
    .await
    .map_err(ApiError::from_store)?;
  Ok(Json(subject))
}

/// `DELETE /subjects/{id}`
pub async fn delete<S: KnowledgeStore>(
  State(state): State<ApiState<S>>,
  Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
  state
    .store
    .delete_subject(id)
    .await
    .map_err(ApiError::from_store)?;
  Ok(StatusCode::NO_CONTENT)
}

// ─── History ──────────────────────────────────────────────────────────────────

/// `GET /subjects/{id}/consultations[?limit=&offset=]`
pub async fn history<S: KnowledgeStore>(
  State(state): State<ApiState<S>>,
  Path(id): Path<Uuid>,
  Query(paging): Query<Paging>,
) -> Result<Json<Vec<ConsultationRecord>>, ApiError> {
  // An unknown subject is a 404, not an empty history.
  state
    .store
    .find_subject(id)
    .await
    .map_err(ApiError::from_store)?
    .ok_or_else(|| ApiError::NotFound(format!("subject {id} not found")))?;

  let records = state
    .store
    .list_consultations(ConsultationQuery {
      subject_id: Some(id),
      limit:      paging.limit,
      offset:     paging.offset,
    })
    .await
    .map_err(ApiError::from_store)?;
  Ok(Json(records))
}
