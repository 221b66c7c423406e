//! Administrative handlers.
//!
//! Status is display-only data everywhere else in the system; this is the
//! single write path, and it sits behind Basic auth.

use axum::{
  Json,
  extract::{Path, State},
};
use serde::Deserialize;
use tally_core::{
  feature::{FeatureRequest, Status},
  store::FeatureStore,
};
use uuid::Uuid;

use crate::{AppState, auth::Authenticated, error::Error};

#[derive(Debug, Deserialize)]
pub struct StatusBody {
  pub status: Status,
}

/// `PUT /admin/features/:id/status` — body: `{"status":"planned"}`
pub async fn set_status<S>(
  _auth: Authenticated,
  State(state): State<AppState<S>>,
  Path(id): Path<Uuid>,
  Json(body): Json<StatusBody>,
) -> Result<Json<FeatureRequest>, Error>
where
  S: FeatureStore + Clone + Send + Sync + 'static,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  state
    .store
    .get_feature(id)
    .await
    .map_err(|e| Error::Store(Box::new(e)))?
    .ok_or(Error::NotFound)?;

  let updated = state
    .store
    .set_status(id, body.status)
    .await
    .map_err(|e| Error::Store(Box::new(e)))?;
  Ok(Json(updated))
}
