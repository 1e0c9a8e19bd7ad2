//! Handlers for `/imports/{import_id}/citizens` endpoints.
//!
//! | Method  | Path | Notes |
//! |---------|------|-------|
//! | `GET`   | `/imports/{import_id}/citizens` | 404 if the import is unknown |
//! | `PATCH` | `/imports/{import_id}/citizens/{citizen_id}` | Body: [`CitizenPatch`] |

use std::sync::Arc;

use axum::{
  Json,
  extract::{
    Path, State,
    rejection::{JsonRejection, PathRejection},
  },
};
use census_core::{
  citizen::{Citizen, CitizenId, CitizenPatch, ImportId},
  store::CitizenStore,
};

use crate::{Data, error::ApiError};

// ─── List ─────────────────────────────────────────────────────────────────────

/// `GET /imports/{import_id}/citizens`
pub async fn list<S>(
  State(store): State<Arc<S>>,
  path: Result<Path<ImportId>, PathRejection>,
) -> Result<Json<Data<Vec<Citizen>>>, ApiError>
where
  S: CitizenStore,
{
  let Path(import_id) = path?;
  let citizens = store
    .list_citizens(import_id)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(Data::new(citizens)))
}

// ─── Patch ────────────────────────────────────────────────────────────────────

/// `PATCH /imports/{import_id}/citizens/{citizen_id}`
pub async fn patch_one<S>(
  State(store): State<Arc<S>>,
  path: Result<Path<(ImportId, CitizenId)>, PathRejection>,
  body: Result<Json<CitizenPatch>, JsonRejection>,
) -> Result<Json<Data<Citizen>>, ApiError>
where
  S: CitizenStore,
{
  let Path((import_id, citizen_id)) = path?;
  let Json(patch) = body?;
  let citizen = store
    .patch_citizen(import_id, citizen_id, patch)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(Data::new(citizen)))
}
