//! Handlers for `/features` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/features` | Optional `?sort=popular\|newest` |
//! | `POST` | `/features` | Body: `{"title":…,"description":…,"user_id":…}` |
//! | `GET`  | `/features/:id` | 404 if not found |
//! | `POST` | `/features/:id/vote` | Body: `{"user_id":…}`; toggles |

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, Query, State},
  http::StatusCode,
  response::IntoResponse,
};
use serde::Deserialize;
use tally_core::{
  board::{SortMode, sort_features},
  feature::{FeatureRequest, NewFeature, VoteOutcome},
  identity::{Identity, Profile, UserId},
  store::FeatureStore,
};
use uuid::Uuid;

use crate::error::ApiError;

// ─── List ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ListParams {
  pub sort: Option<SortMode>,
}

/// `GET /features[?sort=<mode>]`
pub async fn list<S>(
  State(store): State<Arc<S>>,
  Query(params): Query<ListParams>,
) -> Result<Json<Vec<FeatureRequest>>, ApiError>
where
  S: FeatureStore,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  let mut features = store
    .list_features()
    .await
    .map_err(|e| ApiError::Store(Box::new(e)))?;
  if let Some(mode) = params.sort {
    sort_features(&mut features, mode);
  }
  Ok(Json(features))
}

// ─── Create ───────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct CreateBody {
  pub title:       String,
  pub description: String,
  pub user_id:     String,
  pub author_name: Option<String>,
}

/// `POST /features` — validates, then delegates creation to the store.
pub async fn create<S>(
  State(store): State<Arc<S>>,
  Json(body): Json<CreateBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: FeatureStore,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  let author = Identity {
    user_id: UserId::new(body.user_id)?,
    profile: body.author_name.map(|name| Profile {
      display_name: Some(name),
      avatar_url:   None,
    }),
  };
  let input = NewFeature::new(&body.title, &body.description, &author)?;

  let created = store
    .create_feature(input)
    .await
    .map_err(|e| ApiError::Store(Box::new(e)))?;
  Ok((StatusCode::CREATED, Json(created)))
}

// ─── Get one ──────────────────────────────────────────────────────────────────

/// `GET /features/:id`
pub async fn get_one<S>(
  State(store): State<Arc<S>>,
  Path(id): Path<Uuid>,
) -> Result<Json<FeatureRequest>, ApiError>
where
  S: FeatureStore,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  let feature = store
    .get_feature(id)
    .await
    .map_err(|e| ApiError::Store(Box::new(e)))?
    .ok_or_else(|| ApiError::NotFound(format!("feature {id} not found")))?;
  Ok(Json(feature))
}

// ─── Vote ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct VoteBody {
  pub user_id: String,
}

/// `POST /features/:id/vote` — toggles the caller's upvote.
pub async fn vote<S>(
  State(store): State<Arc<S>>,
  Path(id): Path<Uuid>,
  Json(body): Json<VoteBody>,
) -> Result<Json<VoteOutcome>, ApiError>
where
  S: FeatureStore,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  let user = UserId::new(body.user_id)?;

  // Resolve "unknown feature" to a 404 before issuing the toggle; the
  // store's own not-found error is backend-specific.
  store
    .get_feature(id)
    .await
    .map_err(|e| ApiError::Store(Box::new(e)))?
    .ok_or_else(|| ApiError::NotFound(format!("feature {id} not found")))?;

  let outcome = store
    .toggle_upvote(id, user)
    .await
    .map_err(|e| ApiError::Store(Box::new(e)))?;
  Ok(Json(outcome))
}
