//! The text-polish collaborator seam.
//!
//! A polisher is a stateless request/response transform of a submission's
//! title and description. Failures carry no side effects; callers keep the
//! text they already have and do not retry.

use serde::{Deserialize, Serialize};

/// The rewritten title and description returned by a polisher.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Polished {
  pub title:       String,
  pub description: String,
}

/// Abstraction over a text-polish service.
pub trait TextPolisher {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Rewrite `title` and `description` for clarity, preserving intent.
  async fn polish(
    &self,
    title: &str,
    description: &str,
  ) -> Result<Polished, Self::Error>;
}
