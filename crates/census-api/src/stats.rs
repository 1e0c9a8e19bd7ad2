//! Aggregated views over one import.
//!
//! | Method | Path |
//! |--------|------|
//! | `GET`  | `/imports/{import_id}/citizens/birthdays` |
//! | `GET`  | `/imports/{import_id}/towns/stat/percentile/age` |

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, State, rejection::PathRejection},
};
use census_core::{
  aggregate::{BirthdayPresents, TownAgeStats},
  citizen::ImportId,
  store::CitizenStore,
};
use chrono::Utc;

use crate::{Data, error::ApiError};

/// `GET /imports/{import_id}/citizens/birthdays`
pub async fn birthdays<S>(
  State(store): State<Arc<S>>,
  path: Result<Path<ImportId>, PathRejection>,
) -> Result<Json<Data<BirthdayPresents>>, ApiError>
where
  S: CitizenStore,
{
  let Path(import_id) = path?;
  let presents = store
    .birthday_presents(import_id)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(Data::new(presents)))
}

/// `GET /imports/{import_id}/towns/stat/percentile/age`
///
/// Ages are computed as of the current UTC date.
pub async fn age_percentiles<S>(
  State(store): State<Arc<S>>,
  path: Result<Path<ImportId>, PathRejection>,
) -> Result<Json<Data<Vec<TownAgeStats>>>, ApiError>
where
  S: CitizenStore,
{
  let Path(import_id) = path?;
  let today = Utc::now().date_naive();
  let stats = store
    .age_percentiles(import_id, today)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(Data::new(stats)))
}
