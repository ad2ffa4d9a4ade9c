//! Handlers for `/subjects` endpoints.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `GET`    | `/subjects` | Flattened hierarchy, one row per subject/label pair |
//! | `GET`    | `/subjects/:id/hierarchy` | Names from macro theme down to the subject |
//! | `PUT`    | `/subjects/:id/labels/:label_id` | Tag; 409 if already tagged |
//! | `DELETE` | `/subjects/:id/labels/:label_id` | Untag; 404 if not tagged |

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
};
use taxon_core::{
  Id,
  entity::{HierarchyRow, SubjectHierarchy},
  store::TaxonomyStore,
};

use crate::{AppState, error::ApiError};

/// `GET /subjects`
pub async fn list<S: TaxonomyStore>(
  State(state): State<AppState<S>>,
) -> Result<Json<Vec<HierarchyRow>>, ApiError> {
  let rows = state
    .store
    .get_all_subjects_with_hierarchy()
    .await
    .map_err(ApiError::from_store)?;
  Ok(Json(rows))
}

/// `GET /subjects/:id/hierarchy`
pub async fn hierarchy<S: TaxonomyStore>(
  State(state): State<AppState<S>>,
  Path(id): Path<Id>,
) -> Result<Json<SubjectHierarchy>, ApiError> {
  let chain = state
    .store
    .get_full_hierarchy_for_subject(id)
    .await
    .map_err(ApiError::from_store)?;
  Ok(Json(chain))
}

// ─── Labels on a subject ──────────────────────────────────────────────────────

/// `PUT /subjects/:id/labels/:label_id`
pub async fn link<S: TaxonomyStore>(
  State(state): State<AppState<S>>,
  Path((subject_id, label_id)): Path<(Id, Id)>,
) -> Result<StatusCode, ApiError> {
  state
    .store
    .link_subject_label(subject_id, label_id)
    .await
    .map_err(ApiError::from_store)?;
  state.written();
  Ok(StatusCode::NO_CONTENT)
}

/// `DELETE /subjects/:id/labels/:label_id`
pub async fn unlink<S: TaxonomyStore>(
  State(state): State<AppState<S>>,
  Path((subject_id, label_id)): Path<(Id, Id)>,
) -> Result<StatusCode, ApiError> {
  let removed = state
    .store
    .unlink_subject_label(subject_id, label_id)
    .await
    .map_err(ApiError::from_store)?;
  if !removed {
    return Err(ApiError::NotFound(format!(
      "subject {subject_id} is not tagged with label {label_id}"
    )));
  }
  state.written();
  Ok(StatusCode::NO_CONTENT)
}
