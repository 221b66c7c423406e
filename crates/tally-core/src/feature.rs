//! Feature requests — the unit of voting.
//!
//! A feature request is created once and never edited; the only user-facing
//! mutation is the vote toggle, which the store applies as a single atomic
//! transformation of the membership set and its counter.

use std::{collections::BTreeSet, str::FromStr as _};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
  Error, Result,
  identity::{Identity, UserId},
};

// ─── Status ──────────────────────────────────────────────────────────────────

/// Roadmap status of a feature request. Set to [`Status::Open`] at creation
/// and mutated only by an administrative actor, never by user operations.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Default,
  Serialize,
  Deserialize,
  strum::Display,
  strum::EnumString,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum Status {
  #[default]
  Open,
  Planned,
  InProgress,
  Completed,
}

impl Status {
  /// Parse the kebab-case string form (`"in-progress"`, `"open"`, …).
  pub fn parse(s: &str) -> Result<Self> {
    Self::from_str(s).map_err(|_| Error::UnknownStatus(s.to_owned()))
  }
}

// ─── FeatureRequest ──────────────────────────────────────────────────────────

/// One user-submitted idea.
///
/// Invariant: `upvotes` always equals `upvoted_by.len()`. The store enforces
/// this by recomputing the counter from the membership set inside the same
/// transaction as every membership change.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureRequest {
  /// Store-assigned on creation; immutable.
  pub feature_id:  Uuid,
  pub title:       String,
  pub description: String,
  /// Store-assigned creation timestamp; never changes.
  pub created_at:  DateTime<Utc>,
  pub created_by:  UserId,
  pub author_name: Option<String>,
  pub upvotes:     u32,
  pub upvoted_by:  BTreeSet<UserId>,
  pub status:      Status,
}

impl FeatureRequest {
  /// Whether `user` is currently a member of the upvote set.
  pub fn has_upvoted(&self, user: &UserId) -> bool {
    self.upvoted_by.contains(user)
  }

  /// Whether the counter matches the membership set cardinality.
  pub fn vote_count_consistent(&self) -> bool {
    self.upvotes as usize == self.upvoted_by.len()
  }
}

// ─── VoteOutcome ─────────────────────────────────────────────────────────────

/// Result of a vote toggle: the membership state after the toggle and the
/// post-toggle counter value.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct VoteOutcome {
  pub feature_id: Uuid,
  /// `true` if the toggle added the vote, `false` if it removed it.
  pub upvoted:    bool,
  pub upvotes:    u32,
}

// ─── NewFeature ──────────────────────────────────────────────────────────────

/// Validate title and description without constructing anything.
///
/// Rejects empty-after-trimming input so invalid submissions never reach a
/// store.
pub fn validate_text(title: &str, description: &str) -> Result<()> {
  if title.trim().is_empty() {
    return Err(Error::EmptyTitle);
  }
  if description.trim().is_empty() {
    return Err(Error::EmptyDescription);
  }
  Ok(())
}

/// Input to [`crate::store::FeatureStore::create_feature`].
/// `feature_id` and `created_at` are always set by the store; they are not
/// accepted from callers.
#[derive(Debug, Clone)]
pub struct NewFeature {
  pub title:       String,
  pub description: String,
  pub created_by:  UserId,
  pub author_name: Option<String>,
}

impl NewFeature {
  /// Build a validated submission: trims both text fields and rejects empty
  /// input.
  pub fn new(
    title: &str,
    description: &str,
    author: &Identity,
  ) -> Result<Self> {
    validate_text(title, description)?;
    Ok(Self {
      title:       title.trim().to_owned(),
      description: description.trim().to_owned(),
      created_by:  author.user_id.clone(),
      author_name: author.display_name().map(str::to_owned),
    })
  }
}
