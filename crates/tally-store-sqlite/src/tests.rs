//! Integration tests for `SqliteStore` against an in-memory database.

use tally_core::{
  feature::{NewFeature, Status},
  identity::{Identity, UserId},
  store::{FeatureStore, FeedEvent},
};
use uuid::Uuid;

use crate::SqliteStore;

async fn store() -> SqliteStore {
  SqliteStore::open_in_memory()
    .await
    .expect("in-memory store")
}

fn user(name: &str) -> UserId {
  UserId::new(name).unwrap()
}

fn submission(title: &str) -> NewFeature {
  let author = Identity::anonymous(user("author-1"));
  NewFeature::new(title, "a longer description of the idea", &author).unwrap()
}

// ─── Creation ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn create_assigns_id_and_defaults() {
  let s = store().await;

  let created = s.create_feature(submission("Dark mode")).await.unwrap();
  assert_eq!(created.title, "Dark mode");
  assert_eq!(created.status, Status::Open);
  assert_eq!(created.upvotes, 0);
  assert!(created.upvoted_by.is_empty());
  assert!(created.vote_count_consistent());

  let fetched = s.get_feature(created.feature_id).await.unwrap().unwrap();
  assert_eq!(fetched.feature_id, created.feature_id);
  assert_eq!(fetched.created_by, created.created_by);
  assert_eq!(fetched.created_at, created.created_at);
}

#[tokio::test]
async fn get_feature_missing_returns_none() {
  let s = store().await;
  assert!(s.get_feature(Uuid::new_v4()).await.unwrap().is_none());
}

#[tokio::test]
async fn list_preserves_insertion_order() {
  let s = store().await;
  let a = s.create_feature(submission("first")).await.unwrap();
  let b = s.create_feature(submission("second")).await.unwrap();
  let c = s.create_feature(submission("third")).await.unwrap();

  let all = s.list_features().await.unwrap();
  let ids: Vec<_> = all.iter().map(|f| f.feature_id).collect();
  assert_eq!(ids, vec![a.feature_id, b.feature_id, c.feature_id]);
}

// ─── Vote toggle ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn toggle_adds_then_removes_membership() {
  let s = store().await;
  let created = s.create_feature(submission("votable")).await.unwrap();
  let voter = user("voter-1");

  let added = s
    .toggle_upvote(created.feature_id, voter.clone())
    .await
    .unwrap();
  assert!(added.upvoted);
  assert_eq!(added.upvotes, 1);

  let mid = s.get_feature(created.feature_id).await.unwrap().unwrap();
  assert!(mid.has_upvoted(&voter));
  assert!(mid.vote_count_consistent());

  let removed = s
    .toggle_upvote(created.feature_id, voter.clone())
    .await
    .unwrap();
  assert!(!removed.upvoted);
  assert_eq!(removed.upvotes, 0);

  // Round-trip: back to the original state.
  let after = s.get_feature(created.feature_id).await.unwrap().unwrap();
  assert_eq!(after.upvotes, created.upvotes);
  assert_eq!(after.upvoted_by, created.upvoted_by);
}

#[tokio::test]
async fn counter_tracks_membership_across_many_voters() {
  let s = store().await;
  let created = s.create_feature(submission("popular")).await.unwrap();

  for n in 0..5 {
    s.toggle_upvote(created.feature_id, user(&format!("voter-{n}")))
      .await
      .unwrap();
  }
  // Two voters change their minds.
  s.toggle_upvote(created.feature_id, user("voter-0")).await.unwrap();
  s.toggle_upvote(created.feature_id, user("voter-3")).await.unwrap();

  let after = s.get_feature(created.feature_id).await.unwrap().unwrap();
  assert_eq!(after.upvotes, 3);
  assert_eq!(after.upvoted_by.len(), 3);
  assert!(after.vote_count_consistent());
}

#[tokio::test]
async fn same_user_concurrent_toggles_cannot_diverge_counter_from_set() {
  let s = store().await;
  let created = s.create_feature(submission("contended")).await.unwrap();
  let id = created.feature_id;

  // The historical failure mode: one user toggling from several sessions at
  // once. Whatever interleaving the runtime picks, the counter must equal
  // the set cardinality afterwards because both change in one transaction.
  let mut tasks = tokio::task::JoinSet::new();
  for _ in 0..8 {
    let s = s.clone();
    tasks.spawn(async move { s.toggle_upvote(id, user("flapper")).await });
  }
  while let Some(res) = tasks.join_next().await {
    res.unwrap().unwrap();
  }

  let after = s.get_feature(id).await.unwrap().unwrap();
  assert!(after.vote_count_consistent());
  // Eight toggles of one membership bit land back where they started.
  assert_eq!(after.upvotes, 0);
}

#[tokio::test]
async fn toggle_unknown_feature_errors() {
  let s = store().await;
  let err = s.toggle_upvote(Uuid::new_v4(), user("voter")).await.unwrap_err();
  assert!(matches!(err, crate::Error::FeatureNotFound(_)));
}

#[tokio::test]
async fn votes_by_distinct_users_accumulate() {
  let s = store().await;
  let created = s.create_feature(submission("liked twice")).await.unwrap();

  s.toggle_upvote(created.feature_id, user("alice")).await.unwrap();
  let second = s
    .toggle_upvote(created.feature_id, user("bob"))
    .await
    .unwrap();
  assert_eq!(second.upvotes, 2);

  let after = s.get_feature(created.feature_id).await.unwrap().unwrap();
  assert!(after.has_upvoted(&user("alice")));
  assert!(after.has_upvoted(&user("bob")));
}

// ─── Status mutation ─────────────────────────────────────────────────────────

#[tokio::test]
async fn set_status_updates_record() {
  let s = store().await;
  let created = s.create_feature(submission("roadmapped")).await.unwrap();

  let updated = s
    .set_status(created.feature_id, Status::InProgress)
    .await
    .unwrap();
  assert_eq!(updated.status, Status::InProgress);

  let fetched = s.get_feature(created.feature_id).await.unwrap().unwrap();
  assert_eq!(fetched.status, Status::InProgress);
}

#[tokio::test]
async fn set_status_unknown_feature_errors() {
  let s = store().await;
  let err = s
    .set_status(Uuid::new_v4(), Status::Planned)
    .await
    .unwrap_err();
  assert!(matches!(err, crate::Error::FeatureNotFound(_)));
}

// ─── Snapshot feed ───────────────────────────────────────────────────────────

#[tokio::test]
async fn feed_starts_with_current_snapshot() {
  let s = store().await;
  s.create_feature(submission("pre-existing")).await.unwrap();

  let rx = s.subscribe();
  let FeedEvent::Snapshot(features) = rx.borrow().clone() else {
    panic!("expected a snapshot");
  };
  assert_eq!(features.len(), 1);
}

#[tokio::test]
async fn every_mutation_pushes_a_full_snapshot() {
  let s = store().await;
  let mut rx = s.subscribe();

  let created = s.create_feature(submission("watched")).await.unwrap();
  rx.changed().await.unwrap();
  let FeedEvent::Snapshot(after_create) = rx.borrow_and_update().clone() else {
    panic!("expected a snapshot");
  };
  assert_eq!(after_create.len(), 1);
  assert_eq!(after_create[0].upvotes, 0);

  s.toggle_upvote(created.feature_id, user("voter")).await.unwrap();
  rx.changed().await.unwrap();
  let FeedEvent::Snapshot(after_vote) = rx.borrow_and_update().clone() else {
    panic!("expected a snapshot");
  };
  assert_eq!(after_vote[0].upvotes, 1);
  assert!(after_vote[0].has_upvoted(&user("voter")));
}

#[tokio::test]
async fn empty_store_feed_holds_empty_snapshot() {
  let s = store().await;
  let rx = s.subscribe();
  let FeedEvent::Snapshot(features) = rx.borrow().clone() else {
    panic!("expected a snapshot");
  };
  assert!(features.is_empty());
}
