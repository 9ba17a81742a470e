//! Handlers for `/rules` endpoints.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `GET`    | `/rules` | Snapshot order; optional `?category_id=` |
//! | `POST`   | `/rules` | Body: [`NewRule`]; code is upper-cased |
//! | `GET`    | `/rules/{id}` | 404 if not found |
//! | `PUT`    | `/rules/{id}` | Replaces code, antecedent, consequent and category |
//! | `DELETE` | `/rules/{id}` | Hard delete |

use axum::{
  Json,
  extract::{Path, Query, State},
  http::StatusCode,
  response::IntoResponse,
};
use pakar_core::{
  rule::{NewRule, Rule},
  store::KnowledgeStore,
};
use uuid::Uuid;

use crate::{ApiState, CategoryFilter, error::ApiError};

/// `GET /rules[?category_id=<id>]`
pub async fn list<S: KnowledgeStore>(
  State(state): State<ApiState<S>>,
  Query(filter): Query<CategoryFilter>,
) -> Result<Json<Vec<Rule>>, ApiError> {
  let rules = state
    .store
    .list_rule_definitions(filter.category_id)
    .await
    .map_err(ApiError::from_store)?;
  Ok(Json(rules))
}

/// `POST /rules`
pub async fn create<S: KnowledgeStore>(
  State(state): State<ApiState<S>>,
  Json(body): Json<NewRule>,
) -> Result<impl IntoResponse, ApiError> {
  let rule = state
    .store
    .create_rule(body)
    .await
    .map_err(ApiError::from_store)?;
  Ok((StatusCode::CREATED, Json(rule)))
}

/// `GET /rules/{id}`
pub async fn get_one<S: KnowledgeStore>(
  State(state): State<ApiState<S>>,
  Path(id): Path<Uuid>,
) -> Result<Json<Rule>, ApiError> {
  let rule = state
    .store
    .get_rule(id)
    .await
    .map_err(ApiError::from_store)?
    .ok_or_else(|| ApiError::NotFound(format!("rule {id} not found")))?;
  Ok(Json(rule))
}

/// `PUT /rules/{id}`
pub async fn update<S: KnowledgeStore>(
  State(state): State<ApiState<S>>,
  Path(id): Path<Uuid>,
  Json(body): Json<NewRule>,
) -> Result<Json<Rule>, ApiError> {
  let rule = state
    .store
    .update_rule(id, body)
    .await
    .map_err(ApiError::from_store)?;
  Ok(Json(rule))
}

/// `DELETE /rules/{id}`
pub async fn delete<S: KnowledgeStore>(
  State(state): State<ApiState<S>>,
  Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
  state
    .store
    .delete_rule(id)
    .await
    .map_err(ApiError::from_store)?;
  Ok(StatusCode::NO_CONTENT)
}
