//! HTTP server for the tally board.
//!
//! Mounts the JSON API from `tally-api` under `/api` and an auth-gated
//! administrative surface under `/admin`, backed by any
//! [`FeatureStore`].

pub mod admin;
pub mod auth;
pub mod error;

pub use error::Error;

use std::{path::PathBuf, sync::Arc};

use axum::{Router, routing::put};
use serde::Deserialize;
use tally_core::store::FeatureStore;
use thiserror::Error as ThisError;
use tower_http::trace::TraceLayer;

use auth::AuthConfig;

// ─── Configuration ────────────────────────────────────────────────────────────

/// A required configuration field failed validation.
#[derive(Debug, ThisError)]
pub enum ConfigError {
  #[error("config field `{0}` must not be empty")]
  EmptyField(&'static str),

  #[error("config field `port` must be non-zero")]
  ZeroPort,

  #[error(
    "config field `admin_password_hash` must be an argon2 PHC string \
     (generate one with `tally-server --hash-password`)"
  )]
  NotAPasswordHash,
}

/// Runtime server configuration, deserialised from `config.toml` (with
/// `TALLY_`-prefixed environment overrides).
#[derive(Deserialize, Clone)]
pub struct ServerConfig {
  pub host:                String,
  pub port:                u16,
  pub store_path:          PathBuf,
  pub admin_username:      String,
  pub admin_password_hash: String,
}

impl ServerConfig {
  /// Reject malformed configuration at load time, before anything is
  /// opened or bound.
  pub fn validate(&self) -> Result<(), ConfigError> {
    if self.host.trim().is_empty() {
      return Err(ConfigError::EmptyField("host"));
    }
    if self.port == 0 {
      return Err(ConfigError::ZeroPort);
    }
    if self.store_path.as_os_str().is_empty() {
      return Err(ConfigError::EmptyField("store_path"));
    }
    if self.admin_username.trim().is_empty() {
      return Err(ConfigError::EmptyField("admin_username"));
    }
    if self.admin_password_hash.trim().is_empty() {
      return Err(ConfigError::EmptyField("admin_password_hash"));
    }
    if !self.admin_password_hash.starts_with("$argon2") {
      return Err(ConfigError::NotAPasswordHash);
    }
    Ok(())
  }
}

// ─── Application state ────────────────────────────────────────────────────────

/// Shared state threaded through all axum handlers. Constructed once in
/// `main` and passed down explicitly — there are no module-global handles.
#[derive(Clone)]
pub struct AppState<S: FeatureStore> {
  pub store:  Arc<S>,
  pub config: Arc<ServerConfig>,
  pub auth:   Arc<AuthConfig>,
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// Build the axum [`Router`] for the server: public JSON API under `/api`,
/// admin surface under `/admin`.
pub fn router<S>(state: AppState<S>) -> Router
where
  S: FeatureStore + Clone + Send + Sync + 'static,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  let admin = Router::new()
    .route("/admin/features/{id}/status", put(admin::set_status::<S>))
    .with_state(state.clone());

  Router::new()
    .nest("/api", tally_api::api_router(state.store.clone()))
    .merge(admin)
    .layer(TraceLayer::new_for_http())
}

// ─── Integration tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
  use super::*;

  use argon2::{Argon2, PasswordHasher, password_hash::SaltString};
  use axum::{
    body::Body,
    http::{Request, StatusCode, header},
  };
  use base64::Engine as _;
  use base64::engine::general_purpose::STANDARD as B64;
  use rand_core::OsRng;
  use tally_store_sqlite::SqliteStore;
  use tower::ServiceExt as _;
  use uuid::Uuid;

  async fn make_state(password: &str) -> AppState<SqliteStore> {
    let store = SqliteStore::open_in_memory().await.unwrap();
    let salt  = SaltString::generate(&mut OsRng);
    let hash  = Argon2::default()
      .hash_password(password.as_bytes(), &salt)
      .unwrap()
      .to_string();

    AppState {
      store: Arc::new(store),
      config: Arc::new(ServerConfig {
        host:                "127.0.0.1".to_string(),
        port:                5233,
        store_path:          PathBuf::from(":memory:"),
        admin_username:      "admin".to_string(),
        admin_password_hash: hash.clone(),
      }),
      auth: Arc::new(AuthConfig {
        username:      "admin".to_string(),
        password_hash: hash,
      }),
    }
  }

  fn auth_header(user: &str, pass: &str) -> String {
    format!("Basic {}", B64.encode(format!("{user}:{pass}")))
  }

  async fn oneshot_json(
    state:  AppState<SqliteStore>,
    method: &str,
    uri:    &str,
    auth:   Option<&str>,
    body:   &str,
  ) -> (StatusCode, serde_json::Value) {
    let mut builder = Request::builder()
      .method(method)
      .uri(uri)
      .header(header::CONTENT_TYPE, "application/json");
    if let Some(a) = auth {
      builder = builder.header(header::AUTHORIZATION, a);
    }
    let req  = builder.body(Body::from(body.to_string())).unwrap();
    let resp = router(state).oneshot(req).await.unwrap();

    let status = resp.status();
    let bytes  = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    let json = if bytes.is_empty() {
      serde_json::Value::Null
    } else {
      serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null)
    };
    (status, json)
  }

  // ── API round-trips ─────────────────────────────────────────────────────────

  #[tokio::test]
  async fn create_then_list_returns_the_feature() {
    let state = make_state("secret").await;

    let (status, created) = oneshot_json(
      state.clone(),
      "POST",
      "/api/features",
      None,
      r#"{"title":"Dark mode","description":"A dark theme","user_id":"user-1"}"#,
    ).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["title"], "Dark mode");
    assert_eq!(created["status"], "open");
    assert_eq!(created["upvotes"], 0);

    let (status, list) =
      oneshot_json(state, "GET", "/api/features", None, "").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(list.as_array().unwrap().len(), 1);
  }

  #[tokio::test]
  async fn create_with_empty_title_is_rejected() {
    let state = make_state("secret").await;
    let (status, body) = oneshot_json(
      state,
      "POST",
      "/api/features",
      None,
      r#"{"title":"   ","description":"something","user_id":"user-1"}"#,
    ).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["error"].as_str().unwrap().contains("title"));
  }

  #[tokio::test]
  async fn vote_toggles_on_and_off() {
    let state = make_state("secret").await;

    let (_, created) = oneshot_json(
      state.clone(),
      "POST",
      "/api/features",
      None,
      r#"{"title":"Votable","description":"d","user_id":"author"}"#,
    ).await;
    let id = created["feature_id"].as_str().unwrap().to_string();

    let (status, outcome) = oneshot_json(
      state.clone(),
      "POST",
      &format!("/api/features/{id}/vote"),
      None,
      r#"{"user_id":"voter-1"}"#,
    ).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(outcome["upvoted"], true);
    assert_eq!(outcome["upvotes"], 1);

    let (_, outcome) = oneshot_json(
      state,
      "POST",
      &format!("/api/features/{id}/vote"),
      None,
      r#"{"user_id":"voter-1"}"#,
    ).await;
    assert_eq!(outcome["upvoted"], false);
    assert_eq!(outcome["upvotes"], 0);
  }

  #[tokio::test]
  async fn vote_on_unknown_feature_returns_404() {
    let state = make_state("secret").await;
    let (status, _) = oneshot_json(
      state,
      "POST",
      &format!("/api/features/{}/vote", Uuid::new_v4()),
      None,
      r#"{"user_id":"voter-1"}"#,
    ).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
  }

  #[tokio::test]
  async fn list_sorted_by_popularity() {
    let state = make_state("secret").await;

    for title in ["one", "two"] {
      oneshot_json(
        state.clone(),
        "POST",
        "/api/features",
        None,
        &format!(r#"{{"title":"{title}","description":"d","user_id":"author"}}"#),
      ).await;
    }
    let (_, list) =
      oneshot_json(state.clone(), "GET", "/api/features", None, "").await;
    let second_id = list[1]["feature_id"].as_str().unwrap().to_string();

    oneshot_json(
      state.clone(),
      "POST",
      &format!("/api/features/{second_id}/vote"),
      None,
      r#"{"user_id":"voter-1"}"#,
    ).await;

    let (_, sorted) = oneshot_json(
      state,
      "GET",
      "/api/features?sort=popular",
      None,
      "",
    ).await;
    assert_eq!(sorted[0]["feature_id"], second_id.as_str());
    assert_eq!(sorted[0]["upvotes"], 1);
  }

  // ── Admin surface ───────────────────────────────────────────────────────────

  #[tokio::test]
  async fn admin_without_credentials_returns_401() {
    let state = make_state("secret").await;
    let (_, created) = oneshot_json(
      state.clone(),
      "POST",
      "/api/features",
      None,
      r#"{"title":"t","description":"d","user_id":"author"}"#,
    ).await;
    let id = created["feature_id"].as_str().unwrap().to_string();

    let req = Request::builder()
      .method("PUT")
      .uri(format!("/admin/features/{id}/status"))
      .header(header::CONTENT_TYPE, "application/json")
      .body(Body::from(r#"{"status":"planned"}"#))
      .unwrap();
    let resp = router(state).oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    assert!(resp.headers().contains_key(header::WWW_AUTHENTICATE));
  }

  #[tokio::test]
  async fn admin_sets_status_with_valid_credentials() {
    let state = make_state("secret").await;
    let auth  = auth_header("admin", "secret");

    let (_, created) = oneshot_json(
      state.clone(),
      "POST",
      "/api/features",
      None,
      r#"{"title":"t","description":"d","user_id":"author"}"#,
    ).await;
    let id = created["feature_id"].as_str().unwrap().to_string();

    let (status, updated) = oneshot_json(
      state.clone(),
      "PUT",
      &format!("/admin/features/{id}/status"),
      Some(auth.as_str()),
      r#"{"status":"in-progress"}"#,
    ).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["status"], "in-progress");

    // Visible through the public API afterwards.
    let (_, fetched) = oneshot_json(
      state,
      "GET",
      &format!("/api/features/{id}"),
      None,
      "",
    ).await;
    assert_eq!(fetched["status"], "in-progress");
  }

  #[tokio::test]
  async fn admin_rejects_unknown_status_value() {
    let state = make_state("secret").await;
    let auth  = auth_header("admin", "secret");

    let (status, _) = oneshot_json(
      state,
      "PUT",
      &format!("/admin/features/{}/status", Uuid::new_v4()),
      Some(auth.as_str()),
      r#"{"status":"archived"}"#,
    ).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
  }

  // ── Config validation ───────────────────────────────────────────────────────

  fn valid_config() -> ServerConfig {
    ServerConfig {
      host:                "127.0.0.1".into(),
      port:                5233,
      store_path:          PathBuf::from("tally.db"),
      admin_username:      "admin".into(),
      admin_password_hash: "$argon2id$v=19$m=19456,t=2,p=1$abc$def".into(),
    }
  }

  #[test]
  fn valid_config_passes_validation() {
    assert!(valid_config().validate().is_ok());
  }

  #[test]
  fn empty_host_is_rejected_with_field_name() {
    let mut cfg = valid_config();
    cfg.host = "  ".into();
    let err = cfg.validate().unwrap_err();
    assert!(err.to_string().contains("host"));
  }

  #[test]
  fn zero_port_is_rejected() {
    let mut cfg = valid_config();
    cfg.port = 0;
    assert!(matches!(cfg.validate(), Err(ConfigError::ZeroPort)));
  }

  #[test]
  fn non_phc_password_hash_is_rejected() {
    let mut cfg = valid_config();
    cfg.admin_password_hash = "hunter2".into();
    assert!(matches!(cfg.validate(), Err(ConfigError::NotAPasswordHash)));
  }

  #[test]
  fn empty_store_path_is_rejected() {
    let mut cfg = valid_config();
    cfg.store_path = PathBuf::new();
    let err = cfg.validate().unwrap_err();
    assert!(err.to_string().contains("store_path"));
  }
}
