//! SQL schema for the tally SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS features (
    feature_id  TEXT PRIMARY KEY,
    title       TEXT NOT NULL,
    description TEXT NOT NULL,
    created_at  TEXT NOT NULL,   -- ISO 8601 UTC; store-assigned
    created_by  TEXT NOT NULL,
    author_name TEXT,
    upvotes     INTEGER NOT NULL DEFAULT 0,  -- always equals the row count in votes
    status      TEXT NOT NULL DEFAULT 'open' -- 'open' | 'planned' | 'in-progress' | 'completed'
);

-- Upvote membership. The composite primary key is what makes the set a set:
-- a user can hold at most one vote per feature.
CREATE TABLE IF NOT EXISTS votes (
    feature_id  TEXT NOT NULL REFERENCES features(feature_id),
    user_id     TEXT NOT NULL,
    recorded_at TEXT NOT NULL,
    PRIMARY KEY (feature_id, user_id)
);

CREATE INDEX IF NOT EXISTS votes_user_idx       ON votes(user_id);
CREATE INDEX IF NOT EXISTS features_created_idx ON features(created_at);

PRAGMA user_version = 1;
";
