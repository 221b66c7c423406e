//! CLI configuration file handling.

use std::path::{Path, PathBuf};

use anyhow::Context as _;
use serde::Deserialize;

/// Shape of the optional TOML config file.
#[derive(Debug, Deserialize, Default)]
pub struct CliConfig {
  /// Path to the SQLite store. Flags override; defaults to `tally.db`.
  #[serde(default)]
  pub store_path: Option<PathBuf>,

  /// Where the pseudo-identity lives. Defaults to
  /// `~/.config/tally/identity`.
  #[serde(default)]
  pub identity_path: Option<PathBuf>,

  /// Polish endpoint settings; polishing is unavailable without them.
  #[serde(default)]
  pub polish: Option<PolishSection>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PolishSection {
  pub api_key: String,
  #[serde(default)]
  pub model: Option<String>,
  #[serde(default)]
  pub base_url: Option<String>,
}

impl CliConfig {
  /// Load from `path` if given (missing file is then an error), otherwise
  /// from the default location (missing file is fine).
  pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
    let (path, required) = match path {
      Some(p) => (p.to_path_buf(), true),
      None => (default_config_path(), false),
    };

    let raw = match std::fs::read_to_string(&path) {
      Ok(raw) => raw,
      Err(_) if !required => return Ok(Self::default()),
      Err(e) => {
        return Err(e).with_context(|| format!("reading config file {}", path.display()));
      }
    };

    toml::from_str(&raw)
      .with_context(|| format!("parsing config file {}", path.display()))
  }
}

fn config_dir() -> PathBuf {
  let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
  PathBuf::from(home).join(".config").join("tally")
}

pub fn default_config_path() -> PathBuf {
  config_dir().join("config.toml")
}

pub fn default_identity_path() -> PathBuf {
  config_dir().join("identity")
}
