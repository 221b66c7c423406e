//! JSON REST API for the tally board.
//!
//! Exposes an axum [`Router`] backed by any [`tally_core::store::FeatureStore`].
//! Auth, TLS, and transport concerns are the caller's responsibility.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", tally_api::api_router(store.clone()))
//! ```

pub mod error;
pub mod features;

use std::sync::Arc;

use axum::{
  Router,
  routing::{get, post},
};
use tally_core::store::FeatureStore;

pub use error::ApiError;

/// Build a fully-materialised API router for `store`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S>(store: Arc<S>) -> Router<()>
where
  S: FeatureStore + Clone + Send + Sync + 'static,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  Router::new()
    .route(
      "/features",
      get(features::list::<S>).post(features::create::<S>),
    )
    .route("/features/{id}", get(features::get_one::<S>))
    .route("/features/{id}/vote", post(features::vote::<S>))
    .with_state(store)
}
