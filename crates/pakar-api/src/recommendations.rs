//! Handlers for `/recommendations` endpoints.

use axum::{
  Json,
  extract::{Path, Query, State},
  http::StatusCode,
  response::IntoResponse,
};
use pakar_core::{
  recommendation::{NewRecommendation, Recommendation},
  store::KnowledgeStore,
};
use uuid::Uuid;

use crate::{ApiState, CategoryFilter, error::ApiError};

/// `GET /recommendations[?category_id=<id>]`
pub async fn list<S: KnowledgeStore>(
  State(state): State<ApiState<S>>,
  Query(filter): Query<CategoryFilter>,
) -> Result<Json<Vec<Recommendation>>, ApiError> {
  let recommendations = state
    .store
    .list_recommendations(filter.category_id)
    .await
    .map_err(ApiError::from_store)?;
  Ok(Json(recommendations))
}

/// `POST /recommendations`
pub async fn create<S: KnowledgeStore>(
  State(state): State<ApiState<S>>,
  Json(body): Json<NewRecommendation>,
) -> Result<impl IntoResponse, ApiError> {
  let recommendation = state
    .store
    .create_recommendation(body)
    .await
    .map_err(ApiError::from_store)?;
  Ok((StatusCode::CREATED, Json(recommendation)))
}

/// `GET /recommendations/{id}`
pub async fn get_one<S: KnowledgeStore>(
  State(state): State<ApiState<S>>,
  Path(id): Path<Uuid>,
) -> Result<Json<Recommendation>, ApiError> {
  let recommendation = state
    .store
    .get_recommendation(id)
    .await
    .map_err(ApiError::from_store)?
    .ok_or_else(|| ApiError::NotFound(format!("recommendation {id} not found")))?;
  Ok(Json(recommendation))
}

/// `PUT /recommendations/{id}`
pub async fn update<S: KnowledgeStore>(
  State(state): State<ApiState<S>>,
  Path(id): Path<Uuid>,
  Json(body): Json<NewRecommendation>,
) -> Result<Json<Recommendation>, ApiError> {
  let recommendation = state
    .store
    .update_recommendation(id, body)
    .await
    .map_err(ApiError::from_store)?;
  Ok(Json(recommendation))
}

/// `DELETE /recommendations/{id}` (soft; 409 while a rule concludes it)
pub async fn delete<S: KnowledgeStore>(
  State(state): State<ApiState<S>>,
  Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
  state
    .store
    .delete_recommendation(id)
    .await
    .map_err(ApiError::from_store)?;
  Ok(StatusCode::NO_CONTENT)
}
