//! Handlers for `/categories` endpoints.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `GET`    | `/categories` | Ordered by name |
//! | `POST`   | `/categories` | Body: [`NewCategory`]; 409 on a taken name |
//! | `GET`    | `/categories/{id}` | 404 if not found |
//! | `PUT`    | `/categories/{id}` | May reparent; 409 on a cycle |
//! | `DELETE` | `/categories/{id}` | 409 while children or references exist |

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
  response::IntoResponse,
};
use pakar_core::{
  category::{Category, NewCategory},
  store::KnowledgeStore,
};
use uuid::Uuid;

use crate::{ApiState, error::ApiError};

/// `GET /categories`
pub async fn list<S: KnowledgeStore>(
  State(state): State<ApiState<S>>,
) -> Result<Json<Vec<Category>>, ApiError> {
  let categories = state
    .store
    .list_categories()
    .await
    .map_err(ApiError::from_store)?;
  Ok(Json(categories))
}

/// `POST /categories`
pub async fn create<S: KnowledgeStore>(
  State(state): State<ApiState<S>>,
  Json(body): Json<NewCategory>,
) -> Result<impl IntoResponse, ApiError> {
  let category = state
    .store
    .create_category(body)
    .await
    .map_err(ApiError::from_store)?;
  Ok((StatusCode::CREATED, Json(category)))
}

/// `GET /categories/{id}`
pub async fn get_one<S: KnowledgeStore>(
  State(state): State<ApiState<S>>,
  Path(id): Path<Uuid>,
) -> Result<Json<Category>, ApiError> {
  let category = state
    .store
    .get_category(id)
    .await
    .map_err(ApiError::from_store)?
    .ok_or_else(|| ApiError::NotFound(format!("category {id} not found")))?;
  Ok(Json(category))
}

/// `PUT /categories/{id}`
pub async fn update<S: KnowledgeStore>(
  State(state): State<ApiState<S>>,
  Path(id): Path<Uuid>,
  Json(body): Json<NewCategory>,
) -> Result<Json<Category>, ApiError> {
  let category = state
    .store
    .update_category(id, body)
    .await
    .map_err(ApiError::from_store)?;
  Ok(Json(category))
}

/// `DELETE /categories/{id}`
pub async fn delete<S: KnowledgeStore>(
  State(state): State<ApiState<S>>,
  Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
  state
    .store
    .delete_category(id)
    .await
    .map_err(ApiError::from_store)?;
  Ok(StatusCode::NO_CONTENT)
}
