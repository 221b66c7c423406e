//! Viewer identity — provider-issued or locally generated.
//!
//! The board only ever needs a stable opaque identifier to key upvote
//! membership. A provider-issued identity may also carry display metadata;
//! a pseudo-identity (generated and persisted locally) carries none.

use std::fmt;

use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use uuid::Uuid;

use crate::{Error, Result};

// ─── UserId ──────────────────────────────────────────────────────────────────

/// An opaque, non-empty user identifier.
#[derive(
  Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
  /// Wrap a raw identifier, trimming whitespace and rejecting empty input.
  pub fn new(raw: impl Into<String>) -> Result<Self> {
    let raw = raw.into();
    let trimmed = raw.trim();
    if trimmed.is_empty() {
      return Err(Error::EmptyUserId);
    }
    Ok(Self(trimmed.to_owned()))
  }

  /// Generate a fresh random identifier — the basis of a pseudo-identity.
  pub fn random() -> Self {
    Self(Uuid::new_v4().hyphenated().to_string())
  }

  pub fn as_str(&self) -> &str {
    &self.0
  }
}

impl fmt::Display for UserId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.0)
  }
}

// ─── Identity ────────────────────────────────────────────────────────────────

/// Display metadata attached to a provider-issued identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
  pub display_name: Option<String>,
  pub avatar_url:   Option<String>,
}

/// The resolved viewer: a stable identifier plus optional profile metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
  pub user_id: UserId,
  pub profile: Option<Profile>,
}

impl Identity {
  /// An identity with no profile metadata (anonymous session or
  /// pseudo-identity).
  pub fn anonymous(user_id: UserId) -> Self {
    Self { user_id, profile: None }
  }

  pub fn display_name(&self) -> Option<&str> {
    self.profile.as_ref()?.display_name.as_deref()
  }
}

// ─── Provider trait ──────────────────────────────────────────────────────────

/// Abstraction over an identity provider.
///
/// The shipped implementation resolves an anonymous session backed by a
/// locally persisted identifier; an interactive provider plugs in through
/// the same seam.
pub trait IdentityProvider {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Resolve (or create) an anonymous session identity.
  async fn resolve_anonymous(&self) -> Result<Identity, Self::Error>;

  /// Complete an interactive sign-in and return the resulting identity.
  async fn sign_in(&self) -> Result<Identity, Self::Error>;

  /// Discard the current identity.
  async fn sign_out(&self) -> Result<(), Self::Error>;

  /// Live feed of the current identity. Yields `None` while signed out.
  fn changes(&self) -> watch::Receiver<Option<Identity>>;
}

// ─── Resolution state machine ────────────────────────────────────────────────

/// Startup identity resolution: `Uninitialized → Resolving → Resolved`.
///
/// Resolution must complete (with an identity or with `None`) before the
/// feature subscription is established, so the subscription always reflects
/// a known viewer.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum IdentityState {
  #[default]
  Uninitialized,
  Resolving,
  Resolved(Option<Identity>),
}

impl IdentityState {
  /// Mark resolution as started.
  pub fn begin(&mut self) {
    if matches!(self, Self::Uninitialized) {
      *self = Self::Resolving;
    }
  }

  /// Record the outcome of resolution.
  pub fn complete(&mut self, identity: Option<Identity>) {
    *self = Self::Resolved(identity);
  }

  pub fn is_resolved(&self) -> bool {
    matches!(self, Self::Resolved(_))
  }

  /// The resolved identity, if resolution finished with one.
  pub fn identity(&self) -> Option<&Identity> {
    match self {
      Self::Resolved(id) => id.as_ref(),
      _ => None,
    }
  }
}
