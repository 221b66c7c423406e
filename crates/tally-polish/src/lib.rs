//! HTTP text-polish client.
//!
//! Implements [`TextPolisher`] against a generative-language REST endpoint:
//! one JSON request per polish, a JSON `{title, description}` object back,
//! no retries and no state. A failure leaves the caller's text untouched —
//! the caller simply keeps what it already has.

use reqwest::Client;
use serde_json::{Value, json};
use std::time::Duration;
use thiserror::Error;

use tally_core::polish::{Polished, TextPolisher};

// ─── Errors ──────────────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum Error {
  #[error("polish endpoint configuration: {0}")]
  Config(String),

  #[error("http error: {0}")]
  Http(#[from] reqwest::Error),

  #[error("polish service returned status {0}")]
  Status(u16),

  #[error("polish response carried no text")]
  MissingText,

  #[error("polish response was not valid JSON: {0}")]
  Parse(#[from] serde_json::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

// ─── Configuration ───────────────────────────────────────────────────────────

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_MODEL: &str = "gemini-2.0-flash";

/// Connection settings for the polish endpoint.
#[derive(Debug, Clone)]
pub struct PolishConfig {
  pub api_key:  String,
  pub model:    String,
  pub base_url: String,
}

impl PolishConfig {
  /// Build a config with the default model and endpoint.
  pub fn new(api_key: impl Into<String>) -> Self {
    Self {
      api_key:  api_key.into(),
      model:    DEFAULT_MODEL.to_string(),
      base_url: DEFAULT_BASE_URL.to_string(),
    }
  }
}

// ─── Client ──────────────────────────────────────────────────────────────────

/// Async HTTP client for the polish service.
///
/// Cheap to clone — the inner [`reqwest::Client`] is `Arc`-based.
#[derive(Debug, Clone)]
pub struct HttpPolisher {
  client: Client,
  config: PolishConfig,
}

impl HttpPolisher {
  pub fn new(config: PolishConfig) -> Result<Self> {
    if config.api_key.trim().is_empty() {
      return Err(Error::Config("api_key must not be empty".to_string()));
    }
    let client = Client::builder()
      .timeout(Duration::from_secs(30))
      .build()?;
    Ok(Self { client, config })
  }

  fn url(&self) -> String {
    format!(
      "{}/v1beta/models/{}:generateContent",
      self.config.base_url.trim_end_matches('/'),
      self.config.model,
    )
  }
}

impl TextPolisher for HttpPolisher {
  type Error = Error;

  async fn polish(&self, title: &str, description: &str) -> Result<Polished> {
    let resp = self
      .client
      .post(self.url())
      .query(&[("key", self.config.api_key.as_str())])
      .json(&build_request(title, description))
      .send()
      .await?;

    if !resp.status().is_success() {
      return Err(Error::Status(resp.status().as_u16()));
    }

    let body: Value = resp.json().await?;
    parse_polished(&body, title, description)
  }
}

// ─── Request / response plumbing ─────────────────────────────────────────────

/// The generateContent request: the prompt plus a response schema pinning
/// the reply to a JSON `{title, description}` object.
fn build_request(title: &str, description: &str) -> Value {
  let prompt = format!(
    "You are a product manager assistant. Rewrite the following feature \
     request to be clear, concise, and professional. Maintain the original \
     intent but improve grammar and clarity.\n\n\
     Input Title: {title}\n\
     Input Description: {description}"
  );

  json!({
    "contents": [{ "parts": [{ "text": prompt }] }],
    "generationConfig": {
      "responseMimeType": "application/json",
      "responseSchema": {
        "type": "OBJECT",
        "properties": {
          "title":       { "type": "STRING" },
          "description": { "type": "STRING" },
        },
        "required": ["title", "description"],
      },
    },
  })
}

/// Extract the polished pair from a generateContent response body.
///
/// Fields the service left out fall back to the caller's originals, so a
/// partial reply can never erase text the user typed.
fn parse_polished(body: &Value, title: &str, description: &str) -> Result<Polished> {
  let text = body
    .pointer("/candidates/0/content/parts/0/text")
    .and_then(Value::as_str)
    .ok_or(Error::MissingText)?;

  let parsed: Value = serde_json::from_str(text)?;

  Ok(Polished {
    title: parsed
      .get("title")
      .and_then(Value::as_str)
      .filter(|t| !t.trim().is_empty())
      .unwrap_or(title)
      .to_string(),
    description: parsed
      .get("description")
      .and_then(Value::as_str)
      .filter(|d| !d.trim().is_empty())
      .unwrap_or(description)
      .to_string(),
  })
}

#[cfg(test)]
mod tests {
  use super::*;

  fn response_with_text(text: &str) -> Value {
    json!({
      "candidates": [{
        "content": { "parts": [{ "text": text }] }
      }]
    })
  }

  #[test]
  fn parses_a_complete_reply() {
    let body = response_with_text(
      r#"{"title":"Add dark mode","description":"Provide a dark theme."}"#,
    );
    let polished = parse_polished(&body, "dark mode pls", "make it dark").unwrap();
    assert_eq!(polished.title, "Add dark mode");
    assert_eq!(polished.description, "Provide a dark theme.");
  }

  #[test]
  fn missing_candidates_is_missing_text() {
    let body = json!({ "candidates": [] });
    let err = parse_polished(&body, "t", "d").unwrap_err();
    assert!(matches!(err, Error::MissingText));
  }

  #[test]
  fn non_json_text_is_a_parse_error() {
    let body = response_with_text("sorry, I can't do that");
    let err = parse_polished(&body, "t", "d").unwrap_err();
    assert!(matches!(err, Error::Parse(_)));
  }

  #[test]
  fn partial_reply_falls_back_to_original_fields() {
    let body = response_with_text(r#"{"title":"Better title"}"#);
    let polished =
      parse_polished(&body, "old title", "old description").unwrap();
    assert_eq!(polished.title, "Better title");
    assert_eq!(polished.description, "old description");
  }

  #[test]
  fn blank_reply_fields_fall_back_to_originals() {
    let body = response_with_text(r#"{"title":"  ","description":""}"#);
    let polished = parse_polished(&body, "old title", "old desc").unwrap();
    assert_eq!(polished.title, "old title");
    assert_eq!(polished.description, "old desc");
  }

  #[test]
  fn request_carries_prompt_and_schema() {
    let req = build_request("My Title", "My description");
    let prompt = req
      .pointer("/contents/0/parts/0/text")
      .and_then(Value::as_str)
      .unwrap();
    assert!(prompt.contains("My Title"));
    assert!(prompt.contains("My description"));
    assert_eq!(
      req.pointer("/generationConfig/responseMimeType")
        .and_then(Value::as_str),
      Some("application/json"),
    );
  }

  #[test]
  fn empty_api_key_is_rejected() {
    let err = HttpPolisher::new(PolishConfig::new("  ")).unwrap_err();
    assert!(matches!(err, Error::Config(_)));
  }

  #[test]
  fn url_joins_base_and_model() {
    let mut config = PolishConfig::new("k");
    config.base_url = "https://example.test/".into();
    config.model = "test-model".into();
    let polisher = HttpPolisher::new(config).unwrap();
    assert_eq!(
      polisher.url(),
      "https://example.test/v1beta/models/test-model:generateContent",
    );
  }
}
