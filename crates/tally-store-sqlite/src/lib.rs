//! SQLite backend for the tally feature-request store.
//!
//! Wraps [`tokio_rusqlite`] so all database access runs on a dedicated thread
//! without blocking the async runtime. Every successful mutation publishes a
//! complete snapshot on a [`tokio::sync::watch`] channel, giving subscribers
//! the live full-replacement feed the board consumes.

mod encode;
mod schema;
mod store;

pub mod error;

pub use error::{Error, Result};
pub use store::SqliteStore;

#[cfg(test)]
mod tests;
