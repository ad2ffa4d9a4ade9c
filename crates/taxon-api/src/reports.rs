//! Handlers for `/reports` endpoints.
//!
//! Every report is computed from a [`TaxonomySnapshot`] and cached under its
//! own key in the [`ReportCache`](crate::ReportCache) until the next write.
//!
//! | Path | Notes |
//! |------|-------|
//! | `/reports/subjects-per-label` | Labels with no subjects count 0 |
//! | `/reports/subjects-per-macro-theme` | `?label_id=` restricts to one label and drops empty themes |
//! | `/reports/fan-out/:level` | Children per node at `level`; 400 for `subject` |
//! | `/reports/orphans` | Themes without areas, subjects without labels |
//! | `/reports/total-subjects` | `{"total": n}` |
//! | `/reports/labels/:id/subjects` | Hierarchy of every subject carrying the label |

use axum::{
  Json,
  extract::{Path, Query, State},
};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use taxon_core::{Id, Level, report::TaxonomySnapshot, store::TaxonomyStore};

use crate::{AppState, error::ApiError};

/// Serve `key` from the cache, or load a snapshot and compute it.
async fn cached<S, T, F>(state: &AppState<S>, key: String, compute: F) -> Result<Json<Value>, ApiError>
where
  S: TaxonomyStore,
  T: Serialize,
  F: FnOnce(&TaxonomySnapshot) -> Result<T, ApiError> + Send,
{
  if let Some(hit) = state.cache.get(&key).await {
    tracing::debug!(%key, "report cache hit");
    return Ok(Json(hit));
  }

  let generation = state.cache.generation();
  let snapshot = TaxonomySnapshot::load(state.store.as_ref())
    .await
    .map_err(ApiError::from_store)?;
  let value = serde_json::to_value(compute(&snapshot)?)
    .map_err(|e| ApiError::Store(Box::new(e)))?;
  state.cache.insert(generation, key, value.clone()).await;
  Ok(Json(value))
}

async fn require_label<S: TaxonomyStore>(state: &AppState<S>, id: Id) -> Result<(), ApiError> {
  match state.store.get_label(id).await.map_err(ApiError::from_store)? {
    Some(_) => Ok(()),
    None => Err(ApiError::NotFound(format!("label {id} not found"))),
  }
}

// ─── Counts ───────────────────────────────────────────────────────────────────

/// `GET /reports/subjects-per-label`
pub async fn subjects_per_label<S: TaxonomyStore>(
  State(state): State<AppState<S>>,
) -> Result<Json<Value>, ApiError> {
  cached(&state, "subjects-per-label".into(), |s| Ok(s.subjects_per_label())).await
}

#[derive(Debug, Deserialize)]
pub struct MacroThemeParams {
  pub label_id: Option<Id>,
}

/// `GET /reports/subjects-per-macro-theme[?label_id=<id>]`
pub async fn subjects_per_macro_theme<S: TaxonomyStore>(
  State(state): State<AppState<S>>,
  Query(params): Query<MacroThemeParams>,
) -> Result<Json<Value>, ApiError> {
  match params.label_id {
    None => {
      cached(&state, "subjects-per-macro-theme".into(), |s| {
        Ok(s.subjects_per_macro_theme())
      })
      .await
    }
    Some(label_id) => {
      require_label(&state, label_id).await?;
      cached(&state, format!("subjects-per-macro-theme:{label_id}"), move |s| {
        Ok(s.subjects_per_macro_theme_for_label(label_id))
      })
      .await
    }
  }
}

/// `GET /reports/fan-out/:level`
pub async fn fan_out<S: TaxonomyStore>(
  State(state): State<AppState<S>>,
  Path(level): Path<Level>,
) -> Result<Json<Value>, ApiError> {
  cached(&state, format!("fan-out:{level}"), move |s| {
    s.fan_out(level).map_err(ApiError::from_store)
  })
  .await
}

/// `GET /reports/total-subjects`
pub async fn total_subjects<S: TaxonomyStore>(
  State(state): State<AppState<S>>,
) -> Result<Json<Value>, ApiError> {
  cached(&state, "total-subjects".into(), |s| {
    Ok(json!({ "total": s.total_subjects() }))
  })
  .await
}

// ─── Listings ─────────────────────────────────────────────────────────────────

/// `GET /reports/orphans`
pub async fn orphans<S: TaxonomyStore>(
  State(state): State<AppState<S>>,
) -> Result<Json<Value>, ApiError> {
  cached(&state, "orphans".into(), |s| Ok(s.orphans())).await
}

/// `GET /reports/labels/:id/subjects`
pub async fn subjects_for_label<S: TaxonomyStore>(
  State(state): State<AppState<S>>,
  Path(label_id): Path<Id>,
) -> Result<Json<Value>, ApiError> {
  require_label(&state, label_id).await?;
  cached(&state, format!("label-subjects:{label_id}"), move |s| {
    Ok(s.subjects_for_label(label_id))
  })
  .await
}
