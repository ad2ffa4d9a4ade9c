//! Handlers for `/levels` endpoints.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `GET`    | `/levels/:level` | Every row of the level, sorted by name |
//! | `GET`    | `/levels/:level/children` | `?parent_id=` required below the root |
//! | `POST`   | `/levels/:level` | Body: `{"name":"...","parent_id":1}` |
//! | `GET`    | `/levels/:level/:id` | Level-specific record; 404 if absent |
//! | `PUT`    | `/levels/:level/:id` | Rename and/or re-parent |
//! | `DELETE` | `/levels/:level/:id` | Cascades; 404 if already absent |

use axum::{
  Json,
  extract::{Path, Query, State},
  http::StatusCode,
  response::IntoResponse,
};
use serde::Deserialize;
use taxon_core::{
  Id, Level,
  entity::{Node, Record, TreeNode},
  store::TaxonomyStore,
};

use crate::{AppState, Created, error::ApiError};

/// Body for create and update. `parent_id` is required for every level but
/// the root, where it must be absent.
#[derive(Debug, Deserialize)]
pub struct NodeBody {
  pub name:      String,
  pub parent_id: Option<Id>,
}

/// The root level takes no parent; every other level requires one.
fn parent_mismatch(level: Level, parent_id: Option<Id>) -> ApiError {
  match parent_id {
    Some(_) => ApiError::BadRequest(format!("{level} takes no parent_id")),
    None => ApiError::BadRequest(format!("{level} requires a parent_id")),
  }
}

// ─── List ─────────────────────────────────────────────────────────────────────

/// `GET /levels/:level`
pub async fn list<S: TaxonomyStore>(
  State(state): State<AppState<S>>,
  Path(level): Path<Level>,
) -> Result<Json<Vec<TreeNode>>, ApiError> {
  let nodes = state.store.list_level(level).await.map_err(ApiError::from_store)?;
  Ok(Json(nodes))
}

#[derive(Debug, Deserialize)]
pub struct ChildrenParams {
  pub parent_id: Option<Id>,
}

/// `GET /levels/:level/children[?parent_id=<id>]`
pub async fn children<S: TaxonomyStore>(
  State(state): State<AppState<S>>,
  Path(level): Path<Level>,
  Query(params): Query<ChildrenParams>,
) -> Result<Json<Vec<Node>>, ApiError> {
  let nodes = state
    .store
    .get_children(level, params.parent_id)
    .await
    .map_err(ApiError::from_store)?;
  Ok(Json(nodes))
}

// ─── Create ───────────────────────────────────────────────────────────────────

/// `POST /levels/:level`
pub async fn create<S: TaxonomyStore>(
  State(state): State<AppState<S>>,
  Path(level): Path<Level>,
  Json(body): Json<NodeBody>,
) -> Result<impl IntoResponse, ApiError> {
  let store = &state.store;
  let name = body.name;
  let id = match (level, body.parent_id) {
    (Level::MacroTheme, None) => store.create_macro_theme(name).await,
    (Level::Area, Some(p)) => store.create_area(name, p).await,
    (Level::SubArea, Some(p)) => store.create_subarea(name, p).await,
    (Level::Discipline, Some(p)) => store.create_discipline(name, p).await,
    (Level::Subject, Some(p)) => store.create_subject(name, p).await,
    (_, parent_id) => return Err(parent_mismatch(level, parent_id)),
  }
  .map_err(ApiError::from_store)?;

  state.written();
  tracing::info!(%level, id, "created");
  Ok((StatusCode::CREATED, Json(Created { id })))
}

// ─── Get one ──────────────────────────────────────────────────────────────────

/// `GET /levels/:level/:id`
pub async fn get_one<S: TaxonomyStore>(
  State(state): State<AppState<S>>,
  Path((level, id)): Path<(Level, Id)>,
) -> Result<Json<Record>, ApiError> {
  let node = state
    .store
    .get_node(level, id)
    .await
    .map_err(ApiError::from_store)?
    .ok_or_else(|| ApiError::NotFound(format!("{level} {id} not found")))?;
  let record = node.into_record().map_err(ApiError::from_store)?;
  Ok(Json(record))
}

// ─── Update ───────────────────────────────────────────────────────────────────

/// `PUT /levels/:level/:id`
pub async fn update<S: TaxonomyStore>(
  State(state): State<AppState<S>>,
  Path((level, id)): Path<(Level, Id)>,
  Json(body): Json<NodeBody>,
) -> Result<StatusCode, ApiError> {
  let store = &state.store;
  let name = body.name;
  match (level, body.parent_id) {
    (Level::MacroTheme, None) => store.update_macro_theme(id, name).await,
    (Level::Area, Some(p)) => store.update_area(id, name, p).await,
    (Level::SubArea, Some(p)) => store.update_subarea(id, name, p).await,
    (Level::Discipline, Some(p)) => store.update_discipline(id, name, p).await,
    (Level::Subject, Some(p)) => store.update_subject(id, name, p).await,
    (_, parent_id) => return Err(parent_mismatch(level, parent_id)),
  }
  .map_err(ApiError::from_store)?;

  state.written();
  Ok(StatusCode::NO_CONTENT)
}

// ─── Delete ───────────────────────────────────────────────────────────────────

/// `DELETE /levels/:level/:id`
pub async fn delete<S: TaxonomyStore>(
  State(state): State<AppState<S>>,
  Path((level, id)): Path<(Level, Id)>,
) -> Result<StatusCode, ApiError> {
  let deleted = state.store.delete(level, id).await.map_err(ApiError::from_store)?;
  if !deleted {
    return Err(ApiError::NotFound(format!("{level} {id} not found")));
  }
  state.written();
  tracing::info!(%level, id, "deleted with descendants");
  Ok(StatusCode::NO_CONTENT)
}
