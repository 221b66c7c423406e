//! Error types for `tally-core`.

use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum Error {
  #[error("title must not be empty")]
  EmptyTitle,

  #[error("description must not be empty")]
  EmptyDescription,

  #[error("user id must not be empty")]
  EmptyUserId,

  #[error("feature not found: {0}")]
  FeatureNotFound(Uuid),

  #[error("unknown status: {0:?}")]
  UnknownStatus(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
