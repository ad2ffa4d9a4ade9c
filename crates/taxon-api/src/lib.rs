//! JSON REST API for Taxon.
//!
//! Exposes an axum [`Router`] backed by any [`taxon_core::store::TaxonomyStore`].
//! Auth, TLS, and transport concerns are the caller's responsibility.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", taxon_api::api_router(AppState::new(store, ttl)))
//! ```

pub mod cache;
pub mod error;
pub mod labels;
pub mod levels;
pub mod reports;
pub mod subjects;

use std::{sync::Arc, time::Duration};

use axum::{
  Router,
  routing::{get, put},
};
use serde::Serialize;
use taxon_core::{Id, store::TaxonomyStore};
use tower_http::trace::TraceLayer;

pub use cache::ReportCache;
pub use error::ApiError;

// ─── Application state ────────────────────────────────────────────────────────

/// Shared state threaded through all handlers.
pub struct AppState<S> {
  pub store: Arc<S>,
  pub cache: Arc<ReportCache>,
}

impl<S> AppState<S> {
  pub fn new(store: Arc<S>, cache_ttl: Duration) -> Self {
    Self { store, cache: Arc::new(ReportCache::new(cache_ttl)) }
  }

  /// Record that a write went through: cached reports are now stale.
  pub(crate) fn written(&self) { self.cache.invalidate_all(); }
}

impl<S> Clone for AppState<S> {
  fn clone(&self) -> Self {
    Self { store: Arc::clone(&self.store), cache: Arc::clone(&self.cache) }
  }
}

/// Body returned by every create endpoint.
#[derive(Debug, Serialize)]
pub struct Created {
  pub id: Id,
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// Build a fully-materialised API router for `state`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S>(state: AppState<S>) -> Router<()>
where
  S: TaxonomyStore + 'static,
{
  Router::new()
    // Tree levels
    .route("/levels/{level}", get(levels::list::<S>).post(levels::create::<S>))
    .route("/levels/{level}/children", get(levels::children::<S>))
    .route(
      "/levels/{level}/{id}",
      get(levels::get_one::<S>)
        .put(levels::update::<S>)
        .delete(levels::delete::<S>),
    )
    // Subjects
    .route("/subjects", get(subjects::list::<S>))
    .route("/subjects/{id}/hierarchy", get(subjects::hierarchy::<S>))
    .route(
      "/subjects/{id}/labels/{label_id}",
      put(subjects::link::<S>).delete(subjects::unlink::<S>),
    )
    // Labels
    .route("/labels", get(labels::list::<S>).post(labels::create::<S>))
    .route(
      "/labels/{id}",
      get(labels::get_one::<S>)
        .put(labels::update::<S>)
        .delete(labels::delete::<S>),
    )
    // Reports
    .route("/reports/subjects-per-label", get(reports::subjects_per_label::<S>))
    .route("/reports/subjects-per-macro-theme", get(reports::subjects_per_macro_theme::<S>))
    .route("/reports/fan-out/{level}", get(reports::fan_out::<S>))
    .route("/reports/orphans", get(reports::orphans::<S>))
    .route("/reports/total-subjects", get(reports::total_subjects::<S>))
    .route("/reports/labels/{id}/subjects", get(reports::subjects_for_label::<S>))
    .layer(TraceLayer::new_for_http())
    .with_state(state)
}

#[cfg(test)]
mod tests {
  use super::*;

  use axum::{
    body::Body,
    http::{Request, StatusCode, header},
    response::Response,
  };
  use serde_json::{Value, json};
  use taxon_store_sqlite::SqliteStore;
  use tower::ServiceExt as _;

  async fn make_state() -> AppState<SqliteStore> {
    let store = SqliteStore::open_in_memory().await.unwrap();
    AppState::new(Arc::new(store), cache::DEFAULT_TTL)
  }

  async fn send(
    state: &AppState<SqliteStore>,
    method: &str,
    uri: &str,
    body: Option<Value>,
  ) -> Response {
    let builder = Request::builder().method(method).uri(uri);
    let req = match body {
      Some(v) => builder
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(v.to_string()))
        .unwrap(),
      None => builder.body(Body::empty()).unwrap(),
    };
    api_router(state.clone()).oneshot(req).await.unwrap()
  }

  async fn json_body(resp: Response) -> Value {
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
  }

  async fn create(state: &AppState<SqliteStore>, uri: &str, body: Value) -> Id {
    let resp = send(state, "POST", uri, Some(body)).await;
    assert_eq!(resp.status(), StatusCode::CREATED, "POST {uri}");
    json_body(resp).await["id"].as_i64().unwrap()
  }

  /// Macro theme → area → subarea → discipline → subject; returns the ids
  /// root first.
  async fn chain(state: &AppState<SqliteStore>) -> [Id; 5] {
    let m = create(state, "/levels/macro_theme", json!({ "name": "Ciências Exatas" })).await;
    let a = create(state, "/levels/area", json!({ "name": "Matemática", "parent_id": m })).await;
    let sa = create(state, "/levels/subarea", json!({ "name": "Álgebra", "parent_id": a })).await;
    let d = create(state, "/levels/discipline", json!({ "name": "Álgebra Linear", "parent_id": sa }))
      .await;
    let s = create(state, "/levels/subject", json!({ "name": "Matrizes", "parent_id": d })).await;
    [m, a, sa, d, s]
  }

  // ── Levels ──────────────────────────────────────────────────────────────────

  #[tokio::test]
  async fn create_and_fetch_chain() {
    let state = make_state().await;
    let [_, _, _, d, s] = chain(&state).await;

    let resp = send(&state, "GET", &format!("/levels/subject/{s}"), None).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body = json_body(resp).await;
    assert_eq!(body["name"], "Matrizes");
    assert_eq!(body["discipline_id"], d);

    let resp = send(&state, "GET", &format!("/subjects/{s}/hierarchy"), None).await;
    let body = json_body(resp).await;
    assert_eq!(body["macro_theme"], "Ciências Exatas");
    assert_eq!(body["subject"], "Matrizes");
  }

  #[tokio::test]
  async fn children_are_listed_by_parent() {
    let state = make_state().await;
    let [m, a, ..] = chain(&state).await;
    create(&state, "/levels/area", json!({ "name": "Física", "parent_id": m })).await;

    let resp = send(&state, "GET", &format!("/levels/area/children?parent_id={m}"), None).await;
    let body = json_body(resp).await;
    let names: Vec<_> = body.as_array().unwrap().iter().map(|n| n["name"].clone()).collect();
    assert_eq!(names, vec![json!("Física"), json!("Matemática")]);
    assert_eq!(body[1]["id"], a);

    let resp = send(&state, "GET", "/levels/area/children", None).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
  }

  #[tokio::test]
  async fn parent_rules_map_to_status_codes() {
    let state = make_state().await;

    let resp = send(&state, "POST", "/levels/area", Some(json!({ "name": "Órfã" }))).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let resp =
      send(&state, "POST", "/levels/area", Some(json!({ "name": "Órfã", "parent_id": 999 }))).await;
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let resp = send(&state, "POST", "/levels/macro_theme", Some(json!({ "name": "   " }))).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let resp = send(&state, "GET", "/levels/planet", None).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
  }

  #[tokio::test]
  async fn missing_node_is_404() {
    let state = make_state().await;
    let resp = send(&state, "GET", "/levels/discipline/42", None).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let resp = send(&state, "DELETE", "/levels/discipline/42", None).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
  }

  #[tokio::test]
  async fn update_renames_and_reparents() {
    let state = make_state().await;
    let [m, a, ..] = chain(&state).await;
    let other = create(&state, "/levels/macro_theme", json!({ "name": "Ciências da Natureza" })).await;

    let resp = send(
      &state,
      "PUT",
      &format!("/levels/area/{a}"),
      Some(json!({ "name": "Matemática Aplicada", "parent_id": 999 })),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let resp = send(
      &state,
      "PUT",
      &format!("/levels/area/{a}"),
      Some(json!({ "name": "Matemática Aplicada", "parent_id": other })),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);

    let body = json_body(send(&state, "GET", &format!("/levels/area/{a}"), None).await).await;
    assert_eq!(body["name"], "Matemática Aplicada");
    assert_eq!(body["macro_theme_id"], other);

    let resp = send(&state, "GET", &format!("/levels/area/children?parent_id={m}"), None).await;
    assert_eq!(json_body(resp).await, json!([]));
  }

  #[tokio::test]
  async fn delete_cascades_down_the_tree() {
    let state = make_state().await;
    let [m, a, _, _, s] = chain(&state).await;

    let resp = send(&state, "DELETE", &format!("/levels/area/{a}"), None).await;
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);

    let resp = send(&state, "GET", &format!("/levels/subject/{s}"), None).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let resp = send(&state, "GET", &format!("/levels/macro_theme/{m}"), None).await;
    assert_eq!(resp.status(), StatusCode::OK);
  }

  // ── Labels ──────────────────────────────────────────────────────────────────

  #[tokio::test]
  async fn label_codes_are_unique() {
    let state = make_state().await;
    let id = create(&state, "/labels", json!({ "code": 101, "name": "Básico" })).await;

    let resp = send(&state, "POST", "/labels", Some(json!({ "code": 101, "name": "Outro" }))).await;
    assert_eq!(resp.status(), StatusCode::CONFLICT);

    let other = create(&state, "/labels", json!({ "code": 102, "name": "Avançado" })).await;
    let resp = send(
      &state,
      "PUT",
      &format!("/labels/{other}"),
      Some(json!({ "code": 101, "name": "Avançado" })),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::CONFLICT);

    let body = json_body(send(&state, "GET", &format!("/labels/{id}"), None).await).await;
    assert_eq!(body["code"], 101);
    assert_eq!(body["description"], Value::Null);
  }

  #[tokio::test]
  async fn link_and_unlink() {
    let state = make_state().await;
    let [.., s] = chain(&state).await;
    let l = create(&state, "/labels", json!({ "code": 7, "name": "Prova" })).await;
    let uri = format!("/subjects/{s}/labels/{l}");

    assert_eq!(send(&state, "PUT", &uri, None).await.status(), StatusCode::NO_CONTENT);
    assert_eq!(send(&state, "PUT", &uri, None).await.status(), StatusCode::CONFLICT);

    let rows = json_body(send(&state, "GET", "/subjects", None).await).await;
    assert_eq!(rows[0]["label"], "LBL 7 - Prova");

    assert_eq!(send(&state, "DELETE", &uri, None).await.status(), StatusCode::NO_CONTENT);
    assert_eq!(send(&state, "DELETE", &uri, None).await.status(), StatusCode::NOT_FOUND);

    let resp = send(&state, "PUT", &format!("/subjects/{s}/labels/999"), None).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
  }

  // ── Reports ─────────────────────────────────────────────────────────────────

  #[tokio::test]
  async fn reports_follow_writes() {
    let state = make_state().await;
    let [.., d, s] = chain(&state).await;

    let body = json_body(send(&state, "GET", "/reports/total-subjects", None).await).await;
    assert_eq!(body, json!({ "total": 1 }));

    create(&state, "/levels/subject", json!({ "name": "Determinantes", "parent_id": d })).await;
    let body = json_body(send(&state, "GET", "/reports/total-subjects", None).await).await;
    assert_eq!(body, json!({ "total": 2 }));

    let l = create(&state, "/labels", json!({ "code": 1, "name": "Base" })).await;
    send(&state, "PUT", &format!("/subjects/{s}/labels/{l}"), None).await;

    let body = json_body(send(&state, "GET", "/reports/subjects-per-label", None).await).await;
    assert_eq!(body, json!([{ "id": l, "name": "LBL 1 - Base", "count": 1 }]));

    let body = json_body(send(&state, "GET", "/reports/orphans", None).await).await;
    assert_eq!(body["macro_themes_without_areas"], json!([]));
    assert_eq!(body["subjects_without_labels"][0]["subject"], "Determinantes");
  }

  #[tokio::test]
  async fn per_label_report_requires_the_label() {
    let state = make_state().await;
    let [m, ..] = chain(&state).await;
    create(&state, "/levels/macro_theme", json!({ "name": "Humanas" })).await;

    let resp = send(&state, "GET", "/reports/subjects-per-macro-theme?label_id=5", None).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let resp = send(&state, "GET", "/reports/labels/5/subjects", None).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let l = create(&state, "/labels", json!({ "code": 5, "name": "Revisão" })).await;
    let uri = format!("/reports/subjects-per-macro-theme?label_id={l}");
    assert_eq!(json_body(send(&state, "GET", &uri, None).await).await, json!([]));

    let body = json_body(send(&state, "GET", "/reports/subjects-per-macro-theme", None).await).await;
    assert_eq!(body.as_array().unwrap().len(), 2);
    assert_eq!(body[0]["id"], m);
  }

  #[tokio::test]
  async fn fan_out_rejects_the_leaf_level() {
    let state = make_state().await;
    chain(&state).await;

    let resp = send(&state, "GET", "/reports/fan-out/subject", None).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let body = json_body(send(&state, "GET", "/reports/fan-out/discipline", None).await).await;
    assert_eq!(body[0]["count"], 1);
  }
}
