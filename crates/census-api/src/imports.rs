//! Handler for `POST /imports`.
//!
//! Body: `{"citizens":[...]}`. Returns 201 with the allocated import id.

use std::sync::Arc;

use axum::{
  Json,
  extract::{State, rejection::JsonRejection},
  http::StatusCode,
  response::IntoResponse,
};
use census_core::{
  citizen::{CitizenDraft, ImportId},
  store::CitizenStore,
};
use serde::{Deserialize, Serialize};

use crate::{Data, error::ApiError};

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ImportBody {
  pub citizens: Vec<CitizenDraft>,
}

#[derive(Debug, Serialize)]
pub struct ImportCreated {
  pub import_id: ImportId,
}

/// `POST /imports`
pub async fn create<S>(
  State(store): State<Arc<S>>,
  body: Result<Json<ImportBody>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError>
where
  S: CitizenStore,
{
  let Json(body) = body?;
  let import_id = store
    .submit_import(body.citizens)
    .await
    .map_err(ApiError::store)?;
  Ok((StatusCode::CREATED, Json(Data::new(ImportCreated { import_id }))))
}
