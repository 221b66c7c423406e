//! The board view-model: cached snapshot, sorted projection, and dispatch.
//!
//! The board holds the latest snapshot pushed by the store feed and derives
//! a sorted view from it on demand. User actions (submit, vote) are gated on
//! a resolved identity and delegated to the store; the board itself never
//! mutates records — the next snapshot is always authoritative.

use thiserror::Error;
use uuid::Uuid;

use crate::{
  feature::{self, FeatureRequest, NewFeature, VoteOutcome},
  identity::Identity,
  store::{FeatureStore, FeedEvent, FeedFailure},
};

// ─── Sort modes ──────────────────────────────────────────────────────────────

/// How the projection is ordered. Both modes sort descending and leave ties
/// in store order (stable sort, no secondary key).
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Default,
  serde::Serialize,
  serde::Deserialize,
  strum::Display,
  strum::EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum SortMode {
  #[default]
  Popular,
  Newest,
}

/// Sort `features` in place according to `mode`. Pure apart from the
/// reordering; record contents are never touched.
pub fn sort_features(features: &mut [FeatureRequest], mode: SortMode) {
  match mode {
    SortMode::Popular => {
      features.sort_by(|a, b| b.upvotes.cmp(&a.upvotes));
    }
    SortMode::Newest => {
      features.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    }
  }
}

// ─── Dispatch results ────────────────────────────────────────────────────────

/// Outcome of a submit dispatch.
#[derive(Debug, Clone)]
pub enum SubmitOutcome {
  Created(FeatureRequest),
  /// No identity is resolved; the caller should run sign-in instead.
  SignInRequired,
}

/// Outcome of a vote dispatch.
#[derive(Debug, Clone, Copy)]
pub enum VoteDispatch {
  Toggled(VoteOutcome),
  /// No identity is resolved; the caller should prompt for sign-in.
  SignInRequired,
}

/// A dispatch failed either before reaching the store (validation) or in
/// the store itself. No rollback is attempted in the store case — the next
/// snapshot corrects any optimistic display state.
#[derive(Debug, Error)]
pub enum DispatchError<E>
where
  E: std::error::Error,
{
  #[error(transparent)]
  Invalid(#[from] crate::Error),

  #[error("store error: {0}")]
  Store(E),
}

// ─── Board ───────────────────────────────────────────────────────────────────

/// Cached board state for one viewer.
#[derive(Debug, Default)]
pub struct Board {
  features: Vec<FeatureRequest>,
  sort:     SortMode,
  identity: Option<Identity>,
  banner:   Option<FeedFailure>,
}

impl Board {
  pub fn new(sort: SortMode) -> Self {
    Self { sort, ..Self::default() }
  }

  // ── Snapshot feed ─────────────────────────────────────────────────────

  /// Apply one feed event. A snapshot replaces the entire cached record
  /// set (the feed is authoritative and complete on each push) and clears
  /// any current banner; a failure sets the banner and leaves the last
  /// good snapshot in place.
  pub fn apply_event(&mut self, event: FeedEvent) {
    match event {
      FeedEvent::Snapshot(features) => {
        self.features = features;
        self.banner = None;
      }
      FeedEvent::Failed(failure) => {
        self.banner = Some(failure);
      }
    }
  }

  /// The current feed failure, if the last event was one.
  pub fn banner(&self) -> Option<&FeedFailure> {
    self.banner.as_ref()
  }

  // ── Projection ────────────────────────────────────────────────────────

  pub fn sort(&self) -> SortMode {
    self.sort
  }

  pub fn set_sort(&mut self, sort: SortMode) {
    self.sort = sort;
  }

  /// The cached records in the current sort order. Recomputed on every
  /// call; never mutates the cache.
  pub fn sorted(&self) -> Vec<&FeatureRequest> {
    let mut view: Vec<&FeatureRequest> = self.features.iter().collect();
    match self.sort {
      SortMode::Popular => view.sort_by(|a, b| b.upvotes.cmp(&a.upvotes)),
      SortMode::Newest => view.sort_by(|a, b| b.created_at.cmp(&a.created_at)),
    }
    view
  }

  pub fn len(&self) -> usize {
    self.features.len()
  }

  pub fn is_empty(&self) -> bool {
    self.features.is_empty()
  }

  // ── Identity ──────────────────────────────────────────────────────────

  pub fn identity(&self) -> Option<&Identity> {
    self.identity.as_ref()
  }

  pub fn set_identity(&mut self, identity: Option<Identity>) {
    self.identity = identity;
  }

  /// Whether the current viewer has upvoted `feature_id`, per the cached
  /// snapshot. `false` when signed out or when the record is unknown.
  pub fn has_upvoted(&self, feature_id: Uuid) -> bool {
    let Some(identity) = &self.identity else {
      return false;
    };
    self
      .features
      .iter()
      .find(|f| f.feature_id == feature_id)
      .is_some_and(|f| f.has_upvoted(&identity.user_id))
  }

  // ── Dispatch ──────────────────────────────────────────────────────────

  /// Validate and submit a new feature request.
  ///
  /// Empty title or description is rejected before any store contact; a
  /// missing identity short-circuits to [`SubmitOutcome::SignInRequired`].
  pub async fn submit<S: FeatureStore>(
    &self,
    store: &S,
    title: &str,
    description: &str,
  ) -> Result<SubmitOutcome, DispatchError<S::Error>> {
    feature::validate_text(title, description)?;

    let Some(identity) = &self.identity else {
      return Ok(SubmitOutcome::SignInRequired);
    };

    let input = NewFeature::new(title, description, identity)?;
    let created = store
      .create_feature(input)
      .await
      .map_err(DispatchError::Store)?;
    Ok(SubmitOutcome::Created(created))
  }

  /// Toggle the viewer's vote on `feature_id`.
  ///
  /// With no resolved identity the store is never contacted; the dispatch
  /// reports [`VoteDispatch::SignInRequired`] instead.
  pub async fn vote<S: FeatureStore>(
    &self,
    store: &S,
    feature_id: Uuid,
  ) -> Result<VoteDispatch, DispatchError<S::Error>> {
    let Some(identity) = &self.identity else {
      return Ok(VoteDispatch::SignInRequired);
    };

    let outcome = store
      .toggle_upvote(feature_id, identity.user_id.clone())
      .await
      .map_err(DispatchError::Store)?;
    Ok(VoteDispatch::Toggled(outcome))
  }
}
