//! Local identity provider: an anonymous session backed by a persisted
//! pseudo-identity.
//!
//! The identifier is generated once, stored at a fixed path, and reused
//! across restarts of the same account. It keys upvote membership only — it
//! is a pseudo-identity, not a verified one.

use std::{io::ErrorKind, path::PathBuf};

use thiserror::Error;
use tokio::{fs, sync::watch};

use tally_core::identity::{Identity, IdentityProvider, UserId};

#[derive(Debug, Error)]
pub enum IdentityError {
  #[error("identity file error: {0}")]
  Io(#[from] std::io::Error),

  #[error(transparent)]
  Invalid(#[from] tally_core::Error),
}

/// Identity provider backed by a single file holding the generated
/// identifier.
pub struct LocalIdentityProvider {
  path:    PathBuf,
  current: watch::Sender<Option<Identity>>,
}

impl LocalIdentityProvider {
  pub fn new(path: PathBuf) -> Self {
    let (current, _) = watch::channel(None);
    Self { path, current }
  }
}

impl IdentityProvider for LocalIdentityProvider {
  type Error = IdentityError;

  async fn resolve_anonymous(&self) -> Result<Identity, IdentityError> {
    // An unreadable or absent file falls back to a freshly generated
    // identifier, persisted for the next run.
    let user_id = match fs::read_to_string(&self.path).await {
      Ok(raw) if !raw.trim().is_empty() => UserId::new(raw.trim())?,
      _ => {
        let fresh = UserId::random();
        if let Some(parent) = self.path.parent() {
          fs::create_dir_all(parent).await?;
        }
        fs::write(&self.path, fresh.as_str()).await?;
        fresh
      }
    };

    let identity = Identity::anonymous(user_id);
    self.current.send_replace(Some(identity.clone()));
    Ok(identity)
  }

  async fn sign_in(&self) -> Result<Identity, IdentityError> {
    // No interactive flow locally; sign-in resolves the same persisted
    // session identity.
    self.resolve_anonymous().await
  }

  async fn sign_out(&self) -> Result<(), IdentityError> {
    match fs::remove_file(&self.path).await {
      Ok(()) => {}
      Err(e) if e.kind() == ErrorKind::NotFound => {}
      Err(e) => return Err(e.into()),
    }
    self.current.send_replace(None);
    Ok(())
  }

  fn changes(&self) -> watch::Receiver<Option<Identity>> {
    self.current.subscribe()
  }
}
