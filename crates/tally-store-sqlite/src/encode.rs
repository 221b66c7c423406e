//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! All timestamps are stored as RFC 3339 strings. UUIDs are stored as
//! hyphenated lowercase strings. Status uses its kebab-case string form.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use tally_core::{
  feature::{FeatureRequest, Status},
  identity::UserId,
};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Uuid ─────────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── Status ──────────────────────────────────────────────────────────────────

pub fn encode_status(status: Status) -> String { status.to_string() }

pub fn decode_status(s: &str) -> Result<Status> { Ok(Status::parse(s)?) }

// ─── Row types ───────────────────────────────────────────────────────────────

/// Raw strings read directly from a `features` row. The membership set is
/// assembled separately from the `votes` table.
pub struct RawFeature {
  pub feature_id:  String,
  pub title:       String,
  pub description: String,
  pub created_at:  String,
  pub created_by:  String,
  pub author_name: Option<String>,
  pub upvotes:     i64,
  pub status:      String,
}

impl RawFeature {
  pub fn into_feature(self, upvoted_by: BTreeSet<UserId>) -> Result<FeatureRequest> {
    Ok(FeatureRequest {
      feature_id:  decode_uuid(&self.feature_id)?,
      title:       self.title,
      description: self.description,
      created_at:  decode_dt(&self.created_at)?,
      created_by:  UserId::new(self.created_by).map_err(Error::Core)?,
      author_name: self.author_name,
      upvotes:     u32::try_from(self.upvotes)
        .map_err(|_| Error::DateParse(format!("negative vote count: {}", self.upvotes)))?,
      upvoted_by,
      status:      decode_status(&self.status)?,
    })
  }
}
