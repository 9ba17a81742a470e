//! Handlers for `/characteristics` endpoints.
//!
//! Only active characteristics are ever returned. `DELETE` is a soft delete
//! and is refused with 409 while a rule still lists the characteristic in
//! its antecedent.

use axum::{
  Json,
  extract::{Path, Query, State},
  http::StatusCode,
  response::IntoResponse,
};
use pakar_core::{
  characteristic::{Characteristic, NewCharacteristic},
  store::KnowledgeStore,
};
use uuid::Uuid;

use crate::{ApiState, CategoryFilter, error::ApiError};

/// `GET /characteristics[?category_id=<id>]`
pub async fn list<S: KnowledgeStore>(
  State(state): State<ApiState<S>>,
  Query(filter): Query<CategoryFilter>,
) -> Result<Json<Vec<Characteristic>>, ApiError> {
  let characteristics = state
    .store
    .list_characteristics(filter.category_id)
    .await
    .map_err(ApiError::from_store)?;
  Ok(Json(characteristics))
}

/// `POST /characteristics`
pub async fn create<S: KnowledgeStore>(
  State(state): State<ApiState<S>>,
  Json(body): Json<NewCharacteristic>,
) -> Result<impl IntoResponse, ApiError> {
  let characteristic = state
    .store
    .create_characteristic(body)
    .await
    .map_err(ApiError::from_store)?;
  Ok((StatusCode::CREATED, Json(characteristic)))
}

/// `GET /characteristics/{id}`
pub async fn get_one<S: KnowledgeStore>(
  State(state): State<ApiState<S>>,
  Path(id): Path<Uuid>,
) -> Result<Json<Characteristic>, ApiError> {
  let characteristic = state
    .store
    .get_characteristic(id)
    .await
    .map_err(ApiError::from_store)?
    .ok_or_else(|| ApiError::NotFound(format!("characteristic {id} not found")))?;
  Ok(Json(characteristic))
}

/// `PUT /characteristics/{id}`
pub async fn update<S: KnowledgeStore>(
  State(state): State<ApiState<S>>,
  Path(id): Path<Uuid>,
  Json(body): Json<NewCharacteristic>,
) -> Result<Json<Characteristic>, ApiError> {
  let characteristic = state
    .store
    .update_characteristic(id, body)
    .await
    .map_err(ApiError::from_store)?;
  Ok(Json(characteristic))
}

/// `DELETE /characteristics/{id}`
pub async fn delete<S: KnowledgeStore>(
  State(state): State<ApiState<S>>,
  Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
  state
    .store
    .delete_characteristic(id)
    .await
    .map_err(ApiError::from_store)?;
  Ok(StatusCode::NO_CONTENT)
}
