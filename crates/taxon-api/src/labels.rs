//! Handlers for `/labels` endpoints.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `GET`    | `/labels` | Sorted by code |
//! | `POST`   | `/labels` | Body: `{"code":1,"name":"...","description":"..."}` |
//! | `GET`    | `/labels/:id` | 404 if absent |
//! | `PUT`    | `/labels/:id` | Full replacement; 409 on a taken code |
//! | `DELETE` | `/labels/:id` | Also drops the label's subject links |

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
  response::IntoResponse,
};
use serde::Deserialize;
use taxon_core::{
  Id,
  entity::{Label, NewLabel},
  store::TaxonomyStore,
};

use crate::{AppState, Created, error::ApiError};

#[derive(Debug, Deserialize)]
pub struct LabelBody {
  pub code:        i64,
  pub name:        String,
  #[serde(default)]
  pub description: Option<String>,
}

impl LabelBody {
  fn into_new(self) -> Result<NewLabel, ApiError> {
    NewLabel::new(self.code, self.name, self.description).map_err(ApiError::from_store)
  }
}

/// `GET /labels`
pub async fn list<S: TaxonomyStore>(
  State(state): State<AppState<S>>,
) -> Result<Json<Vec<Label>>, ApiError> {
  let labels = state.store.list_labels().await.map_err(ApiError::from_store)?;
  Ok(Json(labels))
}

/// `POST /labels`
pub async fn create<S: TaxonomyStore>(
  State(state): State<AppState<S>>,
  Json(body): Json<LabelBody>,
) -> Result<impl IntoResponse, ApiError> {
  let label = body.into_new()?;
  let code = label.code;
  let id = state.store.create_label(label).await.map_err(ApiError::from_store)?;
  state.written();
  tracing::info!(id, code, "label created");
  Ok((StatusCode::CREATED, Json(Created { id })))
}

/// `GET /labels/:id`
pub async fn get_one<S: TaxonomyStore>(
  State(state): State<AppState<S>>,
  Path(id): Path<Id>,
) -> Result<Json<Label>, ApiError> {
  state
    .store
    .get_label(id)
    .await
    .map_err(ApiError::from_store)?
    .map(Json)
    .ok_or_else(|| ApiError::NotFound(format!("label {id} not found")))
}

/// `PUT /labels/:id`
pub async fn update<S: TaxonomyStore>(
  State(state): State<AppState<S>>,
  Path(id): Path<Id>,
  Json(body): Json<LabelBody>,
) -> Result<StatusCode, ApiError> {
  let label = body.into_new()?;
  state.store.update_label(id, label).await.map_err(ApiError::from_store)?;
  state.written();
  Ok(StatusCode::NO_CONTENT)
}

/// `DELETE /labels/:id`
pub async fn delete<S: TaxonomyStore>(
  State(state): State<AppState<S>>,
  Path(id): Path<Id>,
) -> Result<StatusCode, ApiError> {
  let deleted = state.store.delete_label(id).await.map_err(ApiError::from_store)?;
  if !deleted {
    return Err(ApiError::NotFound(format!("label {id} not found")));
  }
  state.written();
  Ok(StatusCode::NO_CONTENT)
}
