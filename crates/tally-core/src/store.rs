//! The `FeatureStore` trait and the live snapshot feed types.
//!
//! The trait is implemented by storage backends (e.g. `tally-store-sqlite`).
//! Higher layers (`tally-api`, `tally-cli`) depend on this abstraction, not
//! on any concrete backend.

use std::{fmt, future::Future};

use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use uuid::Uuid;

use crate::{
  feature::{FeatureRequest, NewFeature, Status, VoteOutcome},
  identity::UserId,
};

// ─── Feed events ─────────────────────────────────────────────────────────────

/// User-facing category of a feed failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedFailureKind {
  /// The store's access-control policy rejected the subscription.
  AccessDenied,
  /// Anything else: transport, timeout, corrupt snapshot.
  Connectivity,
}

/// A classified subscription failure, surfaced as a banner until the next
/// successful snapshot clears it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedFailure {
  pub kind:   FeedFailureKind,
  pub detail: String,
}

impl FeedFailure {
  /// Classify a raw failure detail. Anything carrying an access-control
  /// signal is `AccessDenied`; everything else is `Connectivity`.
  pub fn classify(detail: impl Into<String>) -> Self {
    let detail = detail.into();
    let lower = detail.to_ascii_lowercase();
    let denied = ["permission-denied", "permission denied", "access denied", "unauthorized"]
      .iter()
      .any(|signal| lower.contains(signal));
    let kind = if denied {
      FeedFailureKind::AccessDenied
    } else {
      FeedFailureKind::Connectivity
    };
    Self { kind, detail }
  }

  /// Short banner text for display.
  pub fn message(&self) -> &'static str {
    match self.kind {
      FeedFailureKind::AccessDenied => {
        "Access denied. Check the store's access rules."
      }
      FeedFailureKind::Connectivity => {
        "Failed to load features. Check your connection."
      }
    }
  }
}

impl fmt::Display for FeedFailure {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{} ({})", self.message(), self.detail)
  }
}

/// One push from the store's live feed: either a complete replacement
/// snapshot of every record, or a classified failure.
#[derive(Debug, Clone)]
pub enum FeedEvent {
  Snapshot(Vec<FeatureRequest>),
  Failed(FeedFailure),
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Abstraction over a feature-request store backend.
///
/// The store is the sole source of truth; callers hold only the
/// eventually-consistent projection delivered by [`subscribe`].
///
/// All async methods return `Send` futures so the trait can be used in
/// multi-threaded async runtimes (e.g. tokio with `axum`).
///
/// [`subscribe`]: FeatureStore::subscribe
pub trait FeatureStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Persist a new feature request. The store assigns `feature_id` and
  /// `created_at` and initialises it as open with zero votes.
  fn create_feature(
    &self,
    input: NewFeature,
  ) -> impl Future<Output = Result<FeatureRequest, Self::Error>> + Send + '_;

  /// Retrieve one record. Returns `None` if not found.
  fn get_feature(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<FeatureRequest>, Self::Error>> + Send + '_;

  /// List every record, in store order.
  fn list_features(
    &self,
  ) -> impl Future<Output = Result<Vec<FeatureRequest>, Self::Error>> + Send + '_;

  /// Toggle `user`'s upvote on a record as a single conditional
  /// transformation: the store reads current membership, adds or removes
  /// it, and recomputes the counter from the set — all in one atomic unit,
  /// so the counter and the set can never be observed diverged.
  fn toggle_upvote(
    &self,
    feature_id: Uuid,
    user: UserId,
  ) -> impl Future<Output = Result<VoteOutcome, Self::Error>> + Send + '_;

  /// Administrative status mutation. No user-facing operation calls this.
  fn set_status(
    &self,
    feature_id: Uuid,
    status: Status,
  ) -> impl Future<Output = Result<FeatureRequest, Self::Error>> + Send + '_;

  /// Subscribe to the live snapshot feed. The receiver always holds the
  /// latest event; dropping it is unsubscription.
  fn subscribe(&self) -> watch::Receiver<FeedEvent>;
}
