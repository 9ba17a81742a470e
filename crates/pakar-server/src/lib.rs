//! HTTP server assembly for Pakar.
//!
//! Deserialises [`ServerConfig`] and mounts the JSON API under `/api` with
//! request tracing. The binary in `main.rs` only wires these to a listener.

use std::{path::PathBuf, sync::Arc, time::Duration};

use axum::Router;
use pakar_api::ApiState;
use pakar_core::{engine::ResolutionPolicy, store::KnowledgeStore};
use serde::Deserialize;
use tower_http::trace::TraceLayer;

// ─── Configuration ────────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `config.toml` and
/// `PAKAR_*` environment variables.
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
  #[serde(default = "default_host")]
  pub host:               String,
  #[serde(default = "default_port")]
  pub port:               u16,
  #[serde(default = "default_store_path")]
  pub store_path:         PathBuf,
  /// Bound on validating and scoring a consultation. Past it the request is
  /// a 504 and nothing is recorded.
  #[serde(default)]
  pub consult_timeout_ms: Option<u64>,
  #[serde(default)]
  pub resolution:         ResolutionPolicy,
}

fn default_host() -> String { "127.0.0.1".to_string() }

fn default_port() -> u16 { 5300 }

fn default_store_path() -> PathBuf { PathBuf::from("~/.local/share/pakar/pakar.db") }

impl ServerConfig {
  pub fn consult_timeout(&self) -> Option<Duration> {
    self.consult_timeout_ms.map(Duration::from_millis)
  }
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// Build the application router: the API nested under `/api`, traced.
pub fn router<S>(store: Arc<S>, config: &ServerConfig) -> Router
where
  S: KnowledgeStore + 'static,
{
  let mut state = ApiState::new(store, config.resolution);
  if let Some(timeout) = config.consult_timeout() {
    state = state.with_consult_timeout(timeout);
  }

  Router::new()
    .nest("/api", pakar_api::api_router(state))
    .layer(TraceLayer::new_for_http())
}

#[cfg(test)]
mod tests {
  use std::num::NonZeroUsize;

  use axum::{
    body::Body,
    http::{Request, StatusCode, header},
  };
  use pakar_core::{
    category::{Category, NewCategory},
    characteristic::{Characteristic, NewCharacteristic},
    consultation::{ConsultationQuery, ConsultationRecord, NewConsultationRecord},
    recommendation::{NewRecommendation, Recommendation},
    rule::{NewRule, Rule, RuleEntry, RuleScope},
    store::ConsultationStore,
    subject::{NewSubject, Subject, SubjectFilter},
  };
  use pakar_store_sqlite::{Result as StoreResult, SqliteStore};
  use serde_json::{Value, json};
  use tower::ServiceExt as _;
  use uuid::Uuid;

  use super::*;

  fn test_config(resolution: ResolutionPolicy) -> ServerConfig {
    ServerConfig {
      host: "127.0.0.1".to_string(),
      port: 5300,
      store_path: PathBuf::from(":memory:"),
      consult_timeout_ms: Some(5_000),
      resolution,
    }
  }

  async fn make_app(resolution: ResolutionPolicy) -> Router {
    let store = SqliteStore::open_in_memory().await.unwrap();
    router(Arc::new(store), &test_config(resolution))
  }

  async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    body: Option<Value>,
  ) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let req = match body {
      Some(body) => builder
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap(),
      None => builder.body(Body::empty()).unwrap(),
    };
    let resp = app.clone().oneshot(req).await.unwrap();
    let status = resp.status();
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
      .await
      .unwrap();
    let value = if bytes.is_empty() {
      Value::Null
    } else {
      serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
  }

  async fn create(app: &Router, uri: &str, body: Value) -> Value {
    let (status, value) = send(app, "POST", uri, Some(body)).await;
    assert_eq!(status, StatusCode::CREATED, "POST {uri}: {value}");
    value
  }

  /// A knowledge base with two characteristics, two recommendations and
  /// two rules, plus one subject. Returns `(subject_id, [c1, c2], [p1, p2])`.
  async fn seed(app: &Router) -> (String, [String; 2], [String; 2]) {
    let category = create(app, "/api/categories", json!({ "name": "Roses" })).await;
    let category_id = category["category_id"].as_str().unwrap().to_string();

    let mut c = Vec::new();
    for code in ["C01", "C02"] {
      let v = create(
        app,
        "/api/characteristics",
        json!({ "code": code, "question": "Present?", "category_id": category_id }),
      )
      .await;
      c.push(v["characteristic_id"].as_str().unwrap().to_string());
    }
    let mut p = Vec::new();
    for code in ["P01", "P02"] {
      let v = create(
        app,
        "/api/recommendations",
        json!({ "code": code, "name": "Prune", "category_id": category_id }),
      )
      .await;
      p.push(v["recommendation_id"].as_str().unwrap().to_string());
    }

    create(
      app,
      "/api/rules",
      json!({
        "code": "r01",
        "antecedent": [c[0]],
        "consequent": p[0],
        "category_id": category_id,
      }),
    )
    .await;
    create(
      app,
      "/api/rules",
      json!({
        "code": "r02",
        "antecedent": [c[0], c[1]],
        "consequent": p[1],
        "category_id": category_id,
      }),
    )
    .await;

    let subject = create(
      app,
      "/api/subjects",
      json!({ "user_id": Uuid::new_v4(), "category_id": category_id, "name": "Front bed" }),
    )
    .await;
    let subject_id = subject["subject_id"].as_str().unwrap().to_string();

    (subject_id, [c[0].clone(), c[1].clone()], [p[0].clone(), p[1].clone()])
  }

  // ── Slow store ──────────────────────────────────────────────────────────────

  /// SQLite underneath, sleeping while rules are read and after a record has
  /// been written.
  struct Stalled {
    inner:       SqliteStore,
    scoring:     Duration,
    after_write: Duration,
  }

  impl ConsultationStore for Stalled {
    type Error = pakar_store_sqlite::Error;

    async fn find_subject(&self, id: Uuid) -> StoreResult<Option<Subject>> {
      self.inner.find_subject(id).await
    }

    async fn list_rules(&self, scope: RuleScope) -> StoreResult<Vec<RuleEntry>> {
      tokio::time::sleep(self.scoring).await;
      self.inner.list_rules(scope).await
    }

    async fn record_consultation(
      &self,
      input: NewConsultationRecord,
    ) -> StoreResult<ConsultationRecord> {
      let record = self.inner.record_consultation(input).await;
      tokio::time::sleep(self.after_write).await;
      record
    }
  }

  impl KnowledgeStore for Stalled {
    async fn create_category(&self, input: NewCategory) -> StoreResult<Category> {
      self.inner.create_category(input).await
    }

    async fn get_category(&self, id: Uuid) -> StoreResult<Option<Category>> {
      self.inner.get_category(id).await
    }

    async fn list_categories(&self) -> StoreResult<Vec<Category>> {
      self.inner.list_categories().await
    }

    async fn update_category(&self, id: Uuid, input: NewCategory) -> StoreResult<Category> {
      self.inner.update_category(id, input).await
    }

    async fn delete_category(&self, id: Uuid) -> StoreResult<()> {
      self.inner.delete_category(id).await
    }

    async fn create_characteristic(
      &self,
      input: NewCharacteristic,
    ) -> StoreResult<Characteristic> {
      self.inner.create_characteristic(input).await
    }

    async fn get_characteristic(&self, id: Uuid) -> StoreResult<Option<Characteristic>> {
      self.inner.get_characteristic(id).await
    }

    async fn list_characteristics(
      &self,
      category_id: Option<Uuid>,
    ) -> StoreResult<Vec<Characteristic>> {
      self.inner.list_characteristics(category_id).await
    }

    async fn update_characteristic(
      &self,
      id: Uuid,
      input: NewCharacteristic,
    ) -> StoreResult<Characteristic> {
      self.inner.update_characteristic(id, input).await
    }

    async fn delete_characteristic(&self, id: Uuid) -> StoreResult<()> {
      self.inner.delete_characteristic(id).await
    }

    async fn create_recommendation(
      &self,
      input: NewRecommendation,
    ) -> StoreResult<Recommendation> {
      self.inner.create_recommendation(input).await
    }

    async fn get_recommendation(&self, id: Uuid) -> StoreResult<Option<Recommendation>> {
      self.inner.get_recommendation(id).await
    }

    async fn list_recommendations(
      &self,
      category_id: Option<Uuid>,
    ) -> StoreResult<Vec<Recommendation>> {
      self.inner.list_recommendations(category_id).await
    }

    async fn update_recommendation(
      &self,
      id: Uuid,
      input: NewRecommendation,
    ) -> StoreResult<Recommendation> {
      self.inner.update_recommendation(id, input).await
    }

    async fn delete_recommendation(&self, id: Uuid) -> StoreResult<()> {
      self.inner.delete_recommendation(id).await
    }

    async fn create_rule(&self, input: NewRule) -> StoreResult<Rule> {
      self.inner.create_rule(input).await
    }

    async fn get_rule(&self, id: Uuid) -> StoreResult<Option<Rule>> {
      self.inner.get_rule(id).await
    }

    async fn list_rule_definitions(&self, category_id: Option<Uuid>) -> StoreResult<Vec<Rule>> {
      self.inner.list_rule_definitions(category_id).await
    }

    async fn update_rule(&self, id: Uuid, input: NewRule) -> StoreResult<Rule> {
      self.inner.update_rule(id, input).await
    }

    async fn delete_rule(&self, id: Uuid) -> StoreResult<()> {
      self.inner.delete_rule(id).await
    }

    async fn create_subject(&self, input: NewSubject) -> StoreResult<Subject> {
      self.inner.create_subject(input).await
    }

    async fn list_subjects(&self, filter: SubjectFilter) -> StoreResult<Vec<Subject>> {
      self.inner.list_subjects(filter).await
    }

    async fn update_subject(&self, id: Uuid, input: NewSubject) -> StoreResult<Subject> {
      self.inner.update_subject(id, input).await
    }

    async fn delete_subject(&self, id: Uuid) -> StoreResult<()> {
      self.inner.delete_subject(id).await
    }

    async fn get_consultation(&self, id: Uuid) -> StoreResult<Option<ConsultationRecord>> {
      self.inner.get_consultation(id).await
    }

    async fn list_consultations(
      &self,
      query: ConsultationQuery,
    ) -> StoreResult<Vec<ConsultationRecord>> {
      self.inner.list_consultations(query).await
    }

    async fn delete_consultation(&self, id: Uuid) -> StoreResult<()> {
      self.inner.delete_consultation(id).await
    }
  }

  /// Best-match app over a [`Stalled`] store with a 50 ms consultation
  /// timeout.
  async fn stalled_app(scoring: Duration, after_write: Duration) -> Router {
    let inner = SqliteStore::open_in_memory().await.unwrap();
    let mut config = test_config(ResolutionPolicy::BestMatch);
    config.consult_timeout_ms = Some(50);
    router(Arc::new(Stalled { inner, scoring, after_write }), &config)
  }

  // ── Configuration ───────────────────────────────────────────────────────────

  #[test]
  fn config_from_toml() {
    let settings = config::Config::builder()
      .add_source(config::File::from_str(
        r#"
          port = 8080
          store_path = "/tmp/pakar.db"
          consult_timeout_ms = 250

          [resolution]
          mode = "quorum_ranked"
          limit = 2
        "#,
        config::FileFormat::Toml,
      ))
      .build()
      .unwrap();
    let cfg: ServerConfig = settings.try_deserialize().unwrap();

    assert_eq!(cfg.host, "127.0.0.1");
    assert_eq!(cfg.port, 8080);
    assert_eq!(cfg.consult_timeout(), Some(Duration::from_millis(250)));
    assert_eq!(
      cfg.resolution,
      ResolutionPolicy::quorum_ranked(NonZeroUsize::new(2).unwrap())
    );
  }

  #[test]
  fn config_defaults_to_best_match() {
    let cfg: ServerConfig = config::Config::builder()
      .build()
      .unwrap()
      .try_deserialize()
      .unwrap();
    assert_eq!(cfg.port, 5300);
    assert_eq!(cfg.resolution, ResolutionPolicy::BestMatch);
    assert!(cfg.consult_timeout().is_none());
  }

  // ── Catalogue ───────────────────────────────────────────────────────────────

  #[tokio::test]
  async fn unknown_category_is_404() {
    let app = make_app(ResolutionPolicy::BestMatch).await;
    let (status, body) =
      send(&app, "GET", &format!("/api/categories/{}", Uuid::new_v4()), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].is_string());
  }

  #[tokio::test]
  async fn duplicate_code_is_409() {
    let app = make_app(ResolutionPolicy::BestMatch).await;
    let (_, [c1, _], [p1, _]) = seed(&app).await;

    let (status, _) = send(
      &app,
      "POST",
      "/api/rules",
      Some(json!({ "code": "R01", "antecedent": [c1], "consequent": p1 })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
  }

  #[tokio::test]
  async fn empty_antecedent_is_400() {
    let app = make_app(ResolutionPolicy::BestMatch).await;
    let (_, _, [p1, _]) = seed(&app).await;

    let (status, _) = send(
      &app,
      "POST",
      "/api/rules",
      Some(json!({ "code": "R09", "antecedent": [], "consequent": p1 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
  }

  #[tokio::test]
  async fn deleting_referenced_characteristic_is_409() {
    let app = make_app(ResolutionPolicy::BestMatch).await;
    let (_, [c1, _], _) = seed(&app).await;

    let (status, body) =
      send(&app, "DELETE", &format!("/api/characteristics/{c1}"), None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body["error"].as_str().unwrap().contains("R01"));
  }

  #[tokio::test]
  async fn rules_listed_in_creation_order() {
    let app = make_app(ResolutionPolicy::BestMatch).await;
    seed(&app).await;

    let (status, body) = send(&app, "GET", "/api/rules", None).await;
    assert_eq!(status, StatusCode::OK);
    let codes: Vec<&str> = body
      .as_array()
      .unwrap()
      .iter()
      .map(|r| r["code"].as_str().unwrap())
      .collect();
    assert_eq!(codes, ["R01", "R02"]);
  }

  // ── Consultations ───────────────────────────────────────────────────────────

  #[tokio::test]
  async fn best_match_consultation() {
    let app = make_app(ResolutionPolicy::BestMatch).await;
    let (subject_id, [c1, c2], [_, p2]) = seed(&app).await;

    let (status, body) = send(
      &app,
      "POST",
      "/api/consultations",
      Some(json!({ "subject_id": subject_id, "selected": [c1, c2] })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["outcome"], "resolved");
    assert_eq!(body["record"]["recommendations"], json!([p2]));
    assert_eq!(body["matches"][0]["rule_code"], "R02");
    assert_eq!(body["matches"][0]["match_count"], 2);
    assert_eq!(body["recommendations"][0]["code"], "P02");

    let (status, history) = send(
      &app,
      "GET",
      &format!("/api/subjects/{subject_id}/consultations"),
      None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(history.as_array().unwrap().len(), 1);
    assert_eq!(history[0]["record_id"], body["record"]["record_id"]);
  }

  #[tokio::test]
  async fn quorum_consultation_ranks_by_specificity() {
    let limit = NonZeroUsize::new(3).unwrap();
    let app = make_app(ResolutionPolicy::quorum_ranked(limit)).await;
    let (subject_id, [c1, c2], [p1, p2]) = seed(&app).await;

    let (status, body) = send(
      &app,
      "POST",
      "/api/consultations",
      Some(json!({ "subject_id": subject_id, "selected": [c1, c2] })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["record"]["recommendations"], json!([p2, p1]));
  }

  #[tokio::test]
  async fn no_match_is_200_and_not_recorded() {
    let app = make_app(ResolutionPolicy::BestMatch).await;
    let (subject_id, _, _) = seed(&app).await;

    let (status, body) = send(
      &app,
      "POST",
      "/api/consultations",
      Some(json!({ "subject_id": subject_id, "selected": [Uuid::new_v4()] })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "outcome": "no_match" }));

    let (_, history) = send(&app, "GET", "/api/consultations", None).await;
    assert_eq!(history, json!([]));
  }

  #[tokio::test]
  async fn invalid_selection_is_400() {
    let app = make_app(ResolutionPolicy::BestMatch).await;
    let (subject_id, [c1, _], _) = seed(&app).await;

    for selected in [json!([]), json!([c1, c1])] {
      let (status, _) = send(
        &app,
        "POST",
        "/api/consultations",
        Some(json!({ "subject_id": subject_id, "selected": selected })),
      )
      .await;
      assert_eq!(status, StatusCode::BAD_REQUEST);
    }
  }

  #[tokio::test]
  async fn unknown_subject_is_404() {
    let app = make_app(ResolutionPolicy::BestMatch).await;
    let (status, _) = send(
      &app,
      "POST",
      "/api/consultations",
      Some(json!({ "subject_id": Uuid::new_v4(), "selected": [Uuid::new_v4()] })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
  }

  #[tokio::test]
  async fn deleting_subject_removes_history() {
    let app = make_app(ResolutionPolicy::BestMatch).await;
    let (subject_id, [c1, _], _) = seed(&app).await;

    let (status, body) = send(
      &app,
      "POST",
      "/api/consultations",
      Some(json!({ "subject_id": subject_id, "selected": [c1] })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let record_id = body["record"]["record_id"].as_str().unwrap().to_string();

    let (status, _) = send(&app, "DELETE", &format!("/api/subjects/{subject_id}"), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) =
      send(&app, "GET", &format!("/api/consultations/{record_id}"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
  }

  #[tokio::test]
  async fn timeout_while_scoring_is_504_and_not_recorded() {
    let app = stalled_app(Duration::from_secs(2), Duration::ZERO).await;
    let (subject_id, [c1, _], _) = seed(&app).await;

    let (status, body) = send(
      &app,
      "POST",
      "/api/consultations",
      Some(json!({ "subject_id": subject_id, "selected": [c1] })),
    )
    .await;
    assert_eq!(status, StatusCode::GATEWAY_TIMEOUT);
    assert!(body["error"].is_string());

    let (_, history) = send(&app, "GET", "/api/consultations", None).await;
    assert_eq!(history, json!([]));
  }

  #[tokio::test]
  async fn slow_write_completes_past_the_timeout() {
    let app = stalled_app(Duration::ZERO, Duration::from_millis(200)).await;
    let (subject_id, [c1, _], [p1, _]) = seed(&app).await;

    let (status, body) = send(
      &app,
      "POST",
      "/api/consultations",
      Some(json!({ "subject_id": subject_id, "selected": [c1] })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["record"]["recommendations"], json!([p1]));

    let (_, history) = send(&app, "GET", "/api/consultations", None).await;
    assert_eq!(history.as_array().unwrap().len(), 1);
    assert_eq!(history[0]["record_id"], body["record"]["record_id"]);
  }

  #[tokio::test]
  async fn consultation_detail_resolves_entries() {
    let app = make_app(ResolutionPolicy::BestMatch).await;
    let (subject_id, [c1, c2], _) = seed(&app).await;

    let (_, body) = send(
      &app,
      "POST",
      "/api/consultations",
      Some(json!({ "subject_id": subject_id, "selected": [c2, c1, Uuid::new_v4()] })),
    )
    .await;
    let record_id = body["record"]["record_id"].as_str().unwrap().to_string();

    let (status, detail) =
      send(&app, "GET", &format!("/api/consultations/{record_id}"), None).await;
    assert_eq!(status, StatusCode::OK, "{detail}");
    assert_eq!(detail["record"]["record_id"], record_id.as_str());
    assert_eq!(detail["subject"]["name"], "Front bed");
    let codes: Vec<&str> = detail["characteristics"]
      .as_array()
      .unwrap()
      .iter()
      .map(|c| c["code"].as_str().unwrap())
      .collect();
    assert_eq!(codes, ["C02", "C01"]);
    assert_eq!(detail["recommendations"][0]["code"], "P02");
  }

  // ── Subjects ────────────────────────────────────────────────────────────────

  #[tokio::test]
  async fn subject_update_moves_between_categories() {
    let app = make_app(ResolutionPolicy::BestMatch).await;
    let (subject_id, _, _) = seed(&app).await;
    let (_, subject) = send(&app, "GET", &format!("/api/subjects/{subject_id}"), None).await;
    let orchids = create(&app, "/api/categories", json!({ "name": "Orchids" })).await;

    let (status, body) = send(
      &app,
      "PUT",
      &format!("/api/subjects/{subject_id}"),
      Some(json!({
        "user_id": subject["user_id"],
        "category_id": orchids["category_id"],
        "name": "Windowsill",
      })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["name"], "Windowsill");
    assert_eq!(body["category_id"], orchids["category_id"]);

    // The user's new subject in the old category cannot move onto the taken pair.
    let second = create(
      &app,
      "/api/subjects",
      json!({
        "user_id": subject["user_id"],
        "category_id": subject["category_id"],
        "name": "Front bed",
      }),
    )
    .await;
    let (status, _) = send(
      &app,
      "PUT",
      &format!("/api/subjects/{}", second["subject_id"].as_str().unwrap()),
      Some(json!({
        "user_id": subject["user_id"],
        "category_id": orchids["category_id"],
        "name": "Front bed",
      })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = send(
      &app,
      "PUT",
      &format!("/api/subjects/{}", Uuid::new_v4()),
      Some(json!({
        "user_id": subject["user_id"],
        "category_id": subject["category_id"],
        "name": "Ghost",
      })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
  }
}
