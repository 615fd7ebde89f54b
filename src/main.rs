mod cache;
mod catalog;
mod config;
mod jobs;
mod prefs;
mod session;

use clap::{Parser, Subcommand};
use color_eyre::{eyre::eyre, Result};
use reqwest::StatusCode;
use sha2::{Digest, Sha256};
use std::io::{BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

use cache::{AssetRepository, AssetStore};
use catalog::{ApiError, CatalogClient, CatalogSync, IndexSource, NewAsset};
use config::Config;
use jobs::{LogNotifier, RevalidateJob};
use session::SessionStore;

#[derive(Parser, Debug)]
#[command(name = "seekr")]
#[command(about = "A command line client for the Seeker asset catalog")]
#[command(version)]
struct Args {
  /// Path to config file (default: $XDG_CONFIG_HOME/seekr/config.yaml)
  #[arg(short, long)]
  config: Option<PathBuf>,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
  /// Log in and start a session
  Login {
    username: String,
    /// Persist the session so later invocations stay logged in
    #[arg(long)]
    remember: bool,
  },
  /// End the session and forget stored credentials
  Logout,
  /// Show the asset index, falling back to the local cache when offline
  List {
    /// Defaults to the logged-in user
    username: Option<String>,
  },
  /// Tag a new asset at a location
  Add {
    /// Visual category for the asset
    #[arg(long)]
    set: String,
    #[arg(long)]
    latitude: String,
    #[arg(long)]
    longitude: String,
    #[arg(long, default_value = "")]
    tag: String,
  },
  /// Change the tag of an existing asset
  Tag { id: i64, tag: String },
  /// Check whether the current session token is still valid
  Validate,
  /// Periodically revalidate the session until interrupted
  Watch {
    /// Requested period in seconds; clamped to the scheduler minimum
    #[arg(long, default_value_t = 900)]
    period_secs: u64,
  },
}

#[tokio::main]
async fn main() -> Result<()> {
  color_eyre::install()?;

  let args = Args::parse();
  let _log_guard = init_tracing(matches!(args.command, Command::Watch { .. }))?;

  let config = Config::load(args.config.as_deref())?;

  let session = Arc::new(SessionStore::new());
  if let Some(saved) = prefs::load()? {
    session.set_logged_in(&saved.username, &saved.token);
  }

  let client = CatalogClient::new(&config.backend.url, Arc::clone(&session))?;

  let session_rx = session.subscribe();
  let was_logged_in = session.is_logged_in();
  let explicit_logout = matches!(args.command, Command::Logout);

  let result = run(args.command, &config, &client, &session).await;

  // A 403 mid-command force-cleared the session; surface it once here,
  // whatever the command was.
  if was_logged_in && !session_rx.borrow().logged_in && !explicit_logout {
    prefs::clear()?;
    eprintln!("Session expired, log in again with `seekr login <username>`.");
  }

  result
}

async fn run(
  command: Command,
  config: &Config,
  client: &CatalogClient,
  session: &SessionStore,
) -> Result<()> {
  match command {
    Command::Login { username, remember } => login(client, session, &username, remember).await,
    Command::Logout => {
      session.clear();
      prefs::clear()?;
      println!("Logged out.");
      Ok(())
    }
    Command::List { username } => {
      let state = require_login(session)?;
      let username = username
        .or_else(|| config.backend.username.clone())
        .unwrap_or(state.username);
      list(client, &username).await
    }
    Command::Add {
      set,
      latitude,
      longitude,
      tag,
    } => {
      let state = require_login(session)?;
      let new = NewAsset {
        username: state.username,
        set,
        latitude,
        longitude,
        tag,
      };
      add(client, &new).await
    }
    Command::Tag { id, tag } => {
      let state = require_login(session)?;
      retag(client, &state.username, id, &tag).await
    }
    Command::Validate => {
      if client.validate_session().await {
        println!("Session is valid.");
      } else {
        println!("Session is not valid.");
      }
      Ok(())
    }
    Command::Watch { period_secs } => {
      require_login(session)?;
      watch(client, period_secs).await
    }
  }
}

async fn login(
  client: &CatalogClient,
  session: &SessionStore,
  username: &str,
  remember: bool,
) -> Result<()> {
  let password = prompt_password()?;
  let surrogate = sha256_hex(&password);

  let token = match client.login(username, &surrogate).await {
    Ok(token) => token,
    Err(ApiError::Status(status))
      if status == StatusCode::BAD_REQUEST
        || status == StatusCode::UNAUTHORIZED
        || status == StatusCode::FORBIDDEN =>
    {
      return Err(eyre!("Login failed: wrong credentials"));
    }
    Err(ApiError::Transport(_)) => return Err(eyre!("Login failed: backend unreachable")),
    Err(e) => return Err(eyre!("Login failed: {}", e)),
  };

  session.set_logged_in(username, &token);
  if remember {
    prefs::store(&prefs::Preferences {
      username: username.to_string(),
      token,
    })?;
  }

  println!("Logged in as {}.", username);
  Ok(())
}

async fn list(client: &CatalogClient, username: &str) -> Result<()> {
  let sync = CatalogSync::new(client.clone(), AssetRepository::new(AssetStore::open()?));
  let index = sync.refresh(username).await?;

  if index.source == IndexSource::Cached {
    eprintln!("Backend unreachable; showing the local cache copy.");
  }

  if index.assets.is_empty() {
    println!("No assets for {}.", username);
    return Ok(());
  }

  for asset in &index.assets {
    println!(
      "{:>6}  {:<12} {:>10},{:<10} {:<12} {}",
      asset.id, asset.set, asset.latitude, asset.longitude, asset.tag, asset.name
    );
  }

  Ok(())
}

async fn add(client: &CatalogClient, new: &NewAsset) -> Result<()> {
  let sync = CatalogSync::new(client.clone(), AssetRepository::new(AssetStore::open()?));
  let created = sync.create_and_mirror(new).await?;

  println!("Created asset {} in set {}.", created.id, created.set);
  Ok(())
}

async fn retag(client: &CatalogClient, username: &str, id: i64, tag: &str) -> Result<()> {
  let sync = CatalogSync::new(client.clone(), AssetRepository::new(AssetStore::open()?));
  let updated = sync.retag_and_mirror(username, id, tag).await?;

  println!("Asset {} tagged {:?}.", updated.id, updated.tag);
  Ok(())
}

async fn watch(client: &CatalogClient, period_secs: u64) -> Result<()> {
  let mut job = RevalidateJob::new();
  job.schedule_unique(
    client.clone(),
    Arc::new(LogNotifier),
    Duration::from_secs(period_secs),
  );

  println!("Revalidating session periodically; Ctrl-C to stop.");
  tokio::signal::ctrl_c().await?;
  job.cancel();

  Ok(())
}

fn require_login(session: &SessionStore) -> Result<session::SessionState> {
  let state = session.snapshot();
  if !state.logged_in {
    return Err(eyre!("Not logged in. Run `seekr login <username>` first."));
  }

  Ok(state)
}

fn prompt_password() -> Result<String> {
  eprint!("Password: ");
  std::io::stderr().flush()?;

  let mut line = String::new();
  std::io::stdin().lock().read_line(&mut line)?;

  Ok(line.trim_end_matches(['\r', '\n']).to_string())
}

/// SHA-256 surrogate of the password; the cleartext is never sent.
fn sha256_hex(input: &str) -> String {
  let mut hasher = Sha256::new();
  hasher.update(input.as_bytes());
  hex::encode(hasher.finalize())
}

fn init_tracing(log_to_file: bool) -> Result<Option<tracing_appender::non_blocking::WorkerGuard>> {
  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("seekr=info"));

  if log_to_file {
    // Long-running mode: keep notifications in a daily-rolling log file
    let dir = dirs::data_dir()
      .or_else(|| dirs::home_dir().map(|p| p.join(".local/share")))
      .ok_or_else(|| eyre!("Could not determine data directory"))?
      .join("seekr")
      .join("logs");
    std::fs::create_dir_all(&dir)?;

    let (writer, guard) = tracing_appender::non_blocking(tracing_appender::rolling::daily(
      dir,
      "seekr.log",
    ));
    tracing_subscriber::fmt()
      .with_env_filter(filter)
      .with_writer(writer)
      .with_ansi(false)
      .init();

    Ok(Some(guard))
  } else {
    tracing_subscriber::fmt()
      .with_env_filter(filter)
      .with_writer(std::io::stderr)
      .init();

    Ok(None)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn password_surrogate_is_sha256_hex() {
    assert_eq!(
      sha256_hex("secret"),
      "2bb80d537b1da3e38bd30361aa855686bde0eacd7162fef6a25fe97bf527a25b"
    );
  }
}
