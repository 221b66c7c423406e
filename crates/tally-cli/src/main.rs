//! `tally` — command-line client for the feature-request board.
//!
//! # Usage
//!
//! ```
//! tally list --sort popular
//! tally submit --title "Dark mode" --description "Please add a dark theme"
//! tally vote 6fa459ea-ee8a-4ca4-894e-db77e160355e
//! tally watch
//! ```
//!
//! Identity is resolved before anything subscribes: an anonymous session
//! identifier is generated on first use and persisted, so votes stay stable
//! across runs.

mod config;
mod identity;

use std::path::PathBuf;

use anyhow::{Context as _, Result, anyhow};
use clap::{Parser, Subcommand};
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use tally_core::{
  board::{Board, SortMode, SubmitOutcome, VoteDispatch},
  feature::FeatureRequest,
  identity::{IdentityProvider as _, IdentityState, UserId},
  polish::TextPolisher as _,
  store::{FeatureStore, FeedEvent},
};
use tally_polish::{HttpPolisher, PolishConfig};
use tally_store_sqlite::SqliteStore;

use config::{CliConfig, PolishSection, default_identity_path};
use identity::LocalIdentityProvider;

// ─── CLI args ─────────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "tally", about = "Community feature-request board")]
struct Cli {
  /// Path to a TOML config file (store path, identity path, polish keys).
  #[arg(short, long, value_name = "FILE")]
  config: Option<PathBuf>,

  /// Path to the SQLite store (overrides the config file).
  #[arg(long, env = "TALLY_STORE")]
  store: Option<PathBuf>,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
  /// Print the board once.
  List {
    /// Sort order: popular | newest.
    #[arg(long, default_value = "popular")]
    sort: String,
  },

  /// Submit a new feature request.
  Submit {
    #[arg(long)]
    title: String,

    #[arg(long)]
    description: String,

    /// Rewrite title and description through the polish service first.
    #[arg(long)]
    polish: bool,
  },

  /// Toggle your upvote on a feature.
  Vote {
    feature_id: Uuid,
  },

  /// Follow the live feed, re-rendering on every change.
  Watch {
    /// Sort order: popular | newest.
    #[arg(long, default_value = "popular")]
    sort: String,
  },

  /// Print the resolved identity.
  Whoami,

  /// Clear the locally persisted identity.
  SignOut,
}

// ─── Entry point ──────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::WARN.into())
        .from_env_lossy(),
    )
    .init();

  let args = Cli::parse();
  let file_cfg = CliConfig::load(args.config.as_deref())?;

  let store_path = args
    .store
    .or(file_cfg.store_path.clone())
    .unwrap_or_else(|| PathBuf::from("tally.db"));
  let identity_path = file_cfg
    .identity_path
    .clone()
    .unwrap_or_else(default_identity_path);

  let store = SqliteStore::open(&store_path)
    .await
    .with_context(|| format!("opening store at {}", store_path.display()))?;
  let provider = LocalIdentityProvider::new(identity_path);

  match args.command {
    Command::List { sort } => list(&store, &provider, parse_sort(&sort)?).await,
    Command::Submit { title, description, polish } => {
      submit(&store, &provider, &file_cfg, title, description, polish).await
    }
    Command::Vote { feature_id } => vote(&store, &provider, feature_id).await,
    Command::Watch { sort } => watch(&store, &provider, parse_sort(&sort)?).await,
    Command::Whoami => whoami(&provider).await,
    Command::SignOut => sign_out(&provider).await,
  }
}

fn parse_sort(raw: &str) -> Result<SortMode> {
  raw
    .parse()
    .map_err(|_| anyhow!("unknown sort mode {raw:?} (expected \"popular\" or \"newest\")"))
}

/// Run identity resolution to completion. A provider failure degrades to no
/// identity rather than aborting; voting and submitting will then prompt.
async fn resolve_identity(provider: &LocalIdentityProvider) -> IdentityState {
  let mut state = IdentityState::default();
  state.begin();
  match provider.resolve_anonymous().await {
    Ok(identity) => state.complete(Some(identity)),
    Err(e) => {
      tracing::warn!("identity resolution failed: {e}");
      state.complete(None);
    }
  }
  state
}

// ─── Commands ─────────────────────────────────────────────────────────────────

async fn list(
  store: &SqliteStore,
  provider: &LocalIdentityProvider,
  sort: SortMode,
) -> Result<()> {
  let state = resolve_identity(provider).await;
  let mut board = Board::new(sort);
  board.set_identity(state.identity().cloned());

  let features = store.list_features().await.context("listing features")?;
  board.apply_event(FeedEvent::Snapshot(features));
  render(&board);
  Ok(())
}

async fn submit(
  store: &SqliteStore,
  provider: &LocalIdentityProvider,
  file_cfg: &CliConfig,
  mut title: String,
  mut description: String,
  polish: bool,
) -> Result<()> {
  let state = resolve_identity(provider).await;
  let mut board = Board::new(SortMode::default());
  board.set_identity(state.identity().cloned());

  if polish {
    match polish_text(file_cfg.polish.as_ref(), &title, &description).await {
      Ok(polished) => {
        title = polished.title;
        description = polished.description;
        println!("Polished:\n  {title}\n  {description}");
      }
      Err(e) => {
        // The submission proceeds with the text the user typed.
        eprintln!("Polish failed ({e}); keeping your original text.");
      }
    }
  }

  match board.submit(store, &title, &description).await? {
    SubmitOutcome::Created(feature) => {
      println!("Submitted {} — {}", feature.feature_id, feature.title);
    }
    SubmitOutcome::SignInRequired => {
      println!("No identity is resolved; run `tally whoami` to create one.");
    }
  }
  Ok(())
}

async fn polish_text(
  section: Option<&PolishSection>,
  title: &str,
  description: &str,
) -> Result<tally_core::polish::Polished> {
  let section = section
    .ok_or_else(|| anyhow!("no [polish] section in the config file"))?;

  let mut polish_cfg = PolishConfig::new(section.api_key.clone());
  if let Some(model) = &section.model {
    polish_cfg.model = model.clone();
  }
  if let Some(base_url) = &section.base_url {
    polish_cfg.base_url = base_url.clone();
  }

  let polisher = HttpPolisher::new(polish_cfg)?;
  Ok(polisher.polish(title, description).await?)
}

async fn vote(
  store: &SqliteStore,
  provider: &LocalIdentityProvider,
  feature_id: Uuid,
) -> Result<()> {
  let state = resolve_identity(provider).await;
  let mut board = Board::new(SortMode::default());
  board.set_identity(state.identity().cloned());

  match board.vote(store, feature_id).await? {
    VoteDispatch::Toggled(outcome) => {
      let verb = if outcome.upvoted { "added" } else { "removed" };
      println!("Upvote {verb}; {} now has {} upvote(s).", outcome.feature_id, outcome.upvotes);
    }
    VoteDispatch::SignInRequired => {
      println!("No identity is resolved; run `tally whoami` to create one.");
    }
  }
  Ok(())
}

async fn watch(
  store: &SqliteStore,
  provider: &LocalIdentityProvider,
  sort: SortMode,
) -> Result<()> {
  // Identity resolution completes before the subscription is established.
  let state = resolve_identity(provider).await;
  let mut board = Board::new(sort);
  board.set_identity(state.identity().cloned());

  let mut changes = provider.changes();
  let mut feed = store.subscribe();
  board.apply_event(feed.borrow().clone());
  render(&board);

  loop {
    tokio::select! {
      changed = feed.changed() => {
        if changed.is_err() {
          break;
        }
        let event = feed.borrow_and_update().clone();
        board.apply_event(event);
        render(&board);
      }
      changed = changes.changed() => {
        if changed.is_err() {
          break;
        }
        board.set_identity(changes.borrow_and_update().clone());
        // Identity changed: tear the subscription down and re-establish it
        // so access control is re-evaluated for the new viewer.
        feed = store.subscribe();
        board.apply_event(feed.borrow().clone());
        render(&board);
      }
      _ = tokio::signal::ctrl_c() => {
        break;
      }
    }
  }
  Ok(())
}

async fn whoami(provider: &LocalIdentityProvider) -> Result<()> {
  let state = resolve_identity(provider).await;
  match state.identity() {
    Some(identity) => match identity.display_name() {
      Some(name) => println!("{name} ({})", identity.user_id),
      None => println!("{} (anonymous)", identity.user_id),
    },
    None => println!("No identity could be resolved."),
  }
  Ok(())
}

async fn sign_out(provider: &LocalIdentityProvider) -> Result<()> {
  provider.sign_out().await.context("clearing identity")?;
  println!("Signed out; the local identity was cleared.");
  Ok(())
}

// ─── Rendering ────────────────────────────────────────────────────────────────

fn render(board: &Board) {
  if let Some(failure) = board.banner() {
    println!("! {}", failure.message());
  }

  let view = board.sorted();
  if view.is_empty() {
    println!("No features yet. Be the first to request one!");
    return;
  }

  println!("{} feature(s), sorted by {}:", view.len(), board.sort());
  let viewer = board.identity().map(|i| i.user_id.clone());
  for feature in view {
    print_feature(feature, viewer.as_ref());
  }
}

fn print_feature(feature: &FeatureRequest, viewer: Option<&UserId>) {
  let marker = if viewer.is_some_and(|u| feature.has_upvoted(u)) {
    "▲"
  } else {
    "△"
  };
  println!(
    "{marker} {:>3}  [{:<11}] {}  {}",
    feature.upvotes,
    feature.status.to_string(),
    feature.feature_id,
    feature.title,
  );
  println!("       {}", feature.description);
}
