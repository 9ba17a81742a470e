//! JSON REST API for Pakar.
//!
//! Exposes an axum [`Router`] backed by any [`pakar_core::store::KnowledgeStore`].
//! Auth, TLS, and transport concerns are the caller's responsibility.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", pakar_api::api_router(ApiState::new(store.clone(), policy)))
//! ```

pub mod categories;
pub mod characteristics;
pub mod consultations;
pub mod error;
pub mod recommendations;
pub mod rules;
pub mod subjects;

use std::{sync::Arc, time::Duration};

use axum::{Router, routing::get};
use pakar_core::{engine::ResolutionPolicy, store::KnowledgeStore};
use serde::Deserialize;

pub use error::ApiError;

/// Shared handler state: the store plus the deployment's consultation
/// settings.
pub struct ApiState<S> {
  pub store:           Arc<S>,
  pub policy:          ResolutionPolicy,
  /// Upper bound on a single consultation; `None` waits indefinitely.
  pub consult_timeout: Option<Duration>,
}

impl<S> ApiState<S> {
  pub fn new(store: Arc<S>, policy: ResolutionPolicy) -> Self {
    Self { store, policy, consult_timeout: None }
  }

  pub fn with_consult_timeout(mut self, timeout: Duration) -> Self {
    self.consult_timeout = Some(timeout);
    self
  }
}

// Manual impl: `S` itself need not be `Clone`.
impl<S> Clone for ApiState<S> {
  fn clone(&self) -> Self {
    Self {
      store:           Arc::clone(&self.store),
      policy:          self.policy,
      consult_timeout: self.consult_timeout,
    }
  }
}

/// `?category_id=` filter shared by the catalogue listings.
#[derive(Debug, Default, Deserialize)]
pub struct CategoryFilter {
  pub category_id: Option<uuid::Uuid>,
}

/// `?limit=&offset=` paging for consultation history.
#[derive(Debug, Default, Deserialize)]
pub struct Paging {
  pub limit:  Option<usize>,
  pub offset: Option<usize>,
}

/// Build a fully-materialised API router for `state`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S>(state: ApiState<S>) -> Router<()>
where
  S: KnowledgeStore + 'static,
{
  Router::new()
    // Categories
    .route("/categories", get(categories::list::<S>).post(categories::create::<S>))
    .route(
      "/categories/{id}",
      get(categories::get_one::<S>)
        .put(categories::update::<S>)
        .delete(categories::delete::<S>),
    )
    // Characteristics
    .route(
      "/characteristics",
      get(characteristics::list::<S>).post(characteristics::create::<S>),
    )
    .route(
      "/characteristics/{id}",
      get(characteristics::get_one::<S>)
        .put(characteristics::update::<S>)
        .delete(characteristics::delete::<S>),
    )
    // Recommendations
    .route(
      "/recommendations",
      get(recommendations::list::<S>).post(recommendations::create::<S>),
    )
    .route(
      "/recommendations/{id}",
      get(recommendations::get_one::<S>)
        .put(recommendations::update::<S>)
        .delete(recommendations::delete::<S>),
    )
    // Rules
    .route("/rules", get(rules::list::<S>).post(rules::create::<S>))
    .route(
      "/rules/{id}",
      get(rules::get_one::<S>)
        .put(rules::update::<S>)
        .delete(rules::delete::<S>),
    )
    // Subjects
    .route("/subjects", get(subjects::list::<S>).post(subjects::create::<S>))
    .route(
      "/subjects/{id}",
      get(subjects::get_one::<S>)
        .put(subjects::update::<S>)
        .delete(subjects::delete::<S>),
    )
    .route("/subjects/{id}/consultations", get(subjects::history::<S>))
    // Consultations
    .route(
      "/consultations",
      get(consultations::list::<S>).post(consultations::run::<S>),
    )
    .route(
      "/consultations/{id}",
      get(consultations::get_one::<S>).delete(consultations::delete::<S>),
    )
    .with_state(state)
}
