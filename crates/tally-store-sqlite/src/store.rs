//! [`SqliteStore`] — the SQLite implementation of [`FeatureStore`].

use std::{
  collections::{BTreeSet, HashMap},
  path::Path,
  sync::Arc,
};

use chrono::Utc;
use rusqlite::OptionalExtension as _;
use tokio::sync::watch;
use uuid::Uuid;

use tally_core::{
  feature::{FeatureRequest, NewFeature, Status, VoteOutcome},
  identity::UserId,
  store::{FeatureStore, FeedEvent, FeedFailure},
};

use crate::{
  Error, Result,
  encode::{RawFeature, encode_dt, encode_status, encode_uuid},
  schema::SCHEMA,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A feature-request store backed by a single SQLite file.
///
/// Cloning is cheap — the inner connection and the feed channel are
/// reference-counted. Every successful mutation publishes a fresh complete
/// snapshot to the feed.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
  feed: Arc<watch::Sender<FeedEvent>>,
}

impl SqliteStore {
  /// Open (or create) a store at `path`, run schema initialisation, and
  /// seed the feed with the current snapshot.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    Self::finish_open(conn).await
  }

  /// Open an in-memory store — useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    Self::finish_open(conn).await
  }

  async fn finish_open(conn: tokio_rusqlite::Connection) -> Result<Self> {
    let (feed, _) = watch::channel(FeedEvent::Snapshot(Vec::new()));
    let store = Self { conn, feed: Arc::new(feed) };
    store.init_schema().await?;

    let initial = store.snapshot().await?;
    store.feed.send_replace(FeedEvent::Snapshot(initial));
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Assemble the complete current record set, in store (insertion) order.
  async fn snapshot(&self) -> Result<Vec<FeatureRequest>> {
    let (raws, vote_rows): (Vec<RawFeature>, Vec<(String, String)>) = self
      .conn
      .call(|conn| {
        let mut stmt = conn.prepare(
          "SELECT feature_id, title, description, created_at, created_by,
                  author_name, upvotes, status
           FROM features
           ORDER BY rowid",
        )?;
        let raws = stmt
          .query_map([], |row| {
            Ok(RawFeature {
              feature_id:  row.get(0)?,
              title:       row.get(1)?,
              description: row.get(2)?,
              created_at:  row.get(3)?,
              created_by:  row.get(4)?,
              author_name: row.get(5)?,
              upvotes:     row.get(6)?,
              status:      row.get(7)?,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;

        let mut stmt = conn.prepare("SELECT feature_id, user_id FROM votes")?;
        let votes = stmt
          .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
          .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok((raws, votes))
      })
      .await?;

    let mut membership: HashMap<String, BTreeSet<UserId>> = HashMap::new();
    for (feature_id, user_id) in vote_rows {
      membership.entry(feature_id).or_default().insert(UserId::new(user_id)?);
    }

    raws
      .into_iter()
      .map(|raw| {
        let voters = membership.remove(&raw.feature_id).unwrap_or_default();
        raw.into_feature(voters)
      })
      .collect()
  }

  /// Publish the current snapshot to all feed subscribers. If snapshot
  /// assembly itself fails, subscribers see a classified failure event
  /// instead of silence.
  async fn publish(&self) {
    let event = match self.snapshot().await {
      Ok(features) => FeedEvent::Snapshot(features),
      Err(e) => FeedEvent::Failed(FeedFailure::classify(e.to_string())),
    };
    self.feed.send_replace(event);
  }
}

// ─── FeatureStore impl ───────────────────────────────────────────────────────

impl FeatureStore for SqliteStore {
  type Error = Error;

  async fn create_feature(&self, input: NewFeature) -> Result<FeatureRequest> {
    let feature = FeatureRequest {
      feature_id:  Uuid::new_v4(),
      title:       input.title,
      description: input.description,
      created_at:  Utc::now(),
      created_by:  input.created_by,
      author_name: input.author_name,
      upvotes:     0,
      upvoted_by:  BTreeSet::new(),
      status:      Status::Open,
    };

    let id_str      = encode_uuid(feature.feature_id);
    let title       = feature.title.clone();
    let description = feature.description.clone();
    let at_str      = encode_dt(feature.created_at);
    let by_str      = feature.created_by.as_str().to_owned();
    let author_name = feature.author_name.clone();
    let status_str  = encode_status(feature.status);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO features (
             feature_id, title, description, created_at, created_by,
             author_name, upvotes, status
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, 0, ?7)",
          rusqlite::params![
            id_str,
            title,
            description,
            at_str,
            by_str,
            author_name,
            status_str,
          ],
        )?;
        Ok(())
      })
      .await?;

    self.publish().await;
    Ok(feature)
  }

  async fn get_feature(&self, id: Uuid) -> Result<Option<FeatureRequest>> {
    let id_str = encode_uuid(id);

    let found: Option<(RawFeature, Vec<String>)> = self
      .conn
      .call(move |conn| {
        let raw = conn
          .query_row(
            "SELECT feature_id, title, description, created_at, created_by,
                    author_name, upvotes, status
             FROM features WHERE feature_id = ?1",
            rusqlite::params![id_str],
            |row| {
              Ok(RawFeature {
                feature_id:  row.get(0)?,
                title:       row.get(1)?,
                description: row.get(2)?,
                created_at:  row.get(3)?,
                created_by:  row.get(4)?,
                author_name: row.get(5)?,
                upvotes:     row.get(6)?,
                status:      row.get(7)?,
              })
            },
          )
          .optional()?;

        let Some(raw) = raw else {
          return Ok(None);
        };

        let mut stmt =
          conn.prepare("SELECT user_id FROM votes WHERE feature_id = ?1")?;
        let voters = stmt
          .query_map(rusqlite::params![raw.feature_id], |row| row.get(0))?
          .collect::<rusqlite::Result<Vec<String>>>()?;

        Ok(Some((raw, voters)))
      })
      .await?;

    let Some((raw, voters)) = found else {
      return Ok(None);
    };

    let upvoted_by = voters
      .into_iter()
      .map(UserId::new)
      .collect::<tally_core::Result<BTreeSet<_>>>()?;
    Ok(Some(raw.into_feature(upvoted_by)?))
  }

  async fn list_features(&self) -> Result<Vec<FeatureRequest>> {
    self.snapshot().await
  }

  async fn toggle_upvote(
    &self,
    feature_id: Uuid,
    user: UserId,
  ) -> Result<VoteOutcome> {
    // UserId validates at construction, but deserialised input can bypass
    // that path. Reject here so the membership table never keys on "".
    if user.as_str().is_empty() {
      return Err(tally_core::Error::EmptyUserId.into());
    }

    let id_str   = encode_uuid(feature_id);
    let user_str = user.as_str().to_owned();
    let at_str   = encode_dt(Utc::now());

    // The whole toggle is one transaction: membership is read, flipped, and
    // the counter recomputed from the set before commit. Concurrent toggles
    // from any mix of users serialise on the write transaction, so the
    // counter can never drift from the set's cardinality.
    let result: Option<(bool, i64)> = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;

        let exists: bool = tx
          .query_row(
            "SELECT 1 FROM features WHERE feature_id = ?1",
            rusqlite::params![id_str],
            |_| Ok(true),
          )
          .optional()?
          .unwrap_or(false);
        if !exists {
          return Ok(None);
        }

        let member: bool = tx
          .query_row(
            "SELECT 1 FROM votes WHERE feature_id = ?1 AND user_id = ?2",
            rusqlite::params![id_str, user_str],
            |_| Ok(true),
          )
          .optional()?
          .unwrap_or(false);

        if member {
          tx.execute(
            "DELETE FROM votes WHERE feature_id = ?1 AND user_id = ?2",
            rusqlite::params![id_str, user_str],
          )?;
        } else {
          tx.execute(
            "INSERT INTO votes (feature_id, user_id, recorded_at)
             VALUES (?1, ?2, ?3)",
            rusqlite::params![id_str, user_str, at_str],
          )?;
        }

        tx.execute(
          "UPDATE features
           SET upvotes = (SELECT COUNT(*) FROM votes WHERE feature_id = ?1)
           WHERE feature_id = ?1",
          rusqlite::params![id_str],
        )?;

        let count: i64 = tx.query_row(
          "SELECT upvotes FROM features WHERE feature_id = ?1",
          rusqlite::params![id_str],
          |row| row.get(0),
        )?;

        tx.commit()?;
        Ok(Some((!member, count)))
      })
      .await?;

    let Some((upvoted, count)) = result else {
      return Err(Error::FeatureNotFound(feature_id));
    };

    self.publish().await;

    Ok(VoteOutcome {
      feature_id,
      upvoted,
      upvotes: u32::try_from(count)
        .map_err(|_| Error::DateParse(format!("negative vote count: {count}")))?,
    })
  }

  async fn set_status(
    &self,
    feature_id: Uuid,
    status: Status,
  ) -> Result<FeatureRequest> {
    let id_str     = encode_uuid(feature_id);
    let status_str = encode_status(status);

    let updated: usize = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE features SET status = ?1 WHERE feature_id = ?2",
          rusqlite::params![status_str, id_str],
        )?)
      })
      .await?;

    if updated == 0 {
      return Err(Error::FeatureNotFound(feature_id));
    }

    self.publish().await;

    self
      .get_feature(feature_id)
      .await?
      .ok_or(Error::FeatureNotFound(feature_id))
  }

  fn subscribe(&self) -> watch::Receiver<FeedEvent> {
    self.feed.subscribe()
  }
}
