//! Durable "remember me" preference storage.
//!
//! Two string values (username and the session token) written as a small
//! YAML file so a remembered login survives process restarts.

use color_eyre::{eyre::eyre, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Preferences {
  pub username: String,
  pub token: String,
}

/// Get the default preference file path.
fn default_path() -> Result<PathBuf> {
  let config_dir = dirs::config_dir()
    .or_else(|| dirs::home_dir().map(|p| p.join(".config")))
    .ok_or_else(|| eyre!("Could not determine config directory"))?;

  Ok(config_dir.join("seekr").join("credentials.yaml"))
}

/// Persist the remembered credentials at the default location.
pub fn store(prefs: &Preferences) -> Result<()> {
  store_at(&default_path()?, prefs)
}

pub fn store_at(path: &Path, prefs: &Preferences) -> Result<()> {
  if let Some(parent) = path.parent() {
    std::fs::create_dir_all(parent)
      .map_err(|e| eyre!("Failed to create preference directory: {}", e))?;
  }

  let contents =
    serde_yaml::to_string(prefs).map_err(|e| eyre!("Failed to serialize preferences: {}", e))?;

  std::fs::write(path, contents)
    .map_err(|e| eyre!("Failed to write preferences {}: {}", path.display(), e))?;

  Ok(())
}

/// Read remembered credentials, if any.
///
/// SEEKR_USERNAME / SEEKR_TOKEN environment variables take precedence over
/// the preference file.
pub fn load() -> Result<Option<Preferences>> {
  if let (Ok(username), Ok(token)) =
    (std::env::var("SEEKR_USERNAME"), std::env::var("SEEKR_TOKEN"))
  {
    return Ok(Some(Preferences { username, token }));
  }

  load_at(&default_path()?)
}

pub fn load_at(path: &Path) -> Result<Option<Preferences>> {
  if !path.exists() {
    return Ok(None);
  }

  let contents = std::fs::read_to_string(path)
    .map_err(|e| eyre!("Failed to read preferences {}: {}", path.display(), e))?;

  let prefs: Preferences = serde_yaml::from_str(&contents)
    .map_err(|e| eyre!("Failed to parse preferences {}: {}", path.display(), e))?;

  Ok(Some(prefs))
}

/// Forget remembered credentials. Missing file is not an error.
pub fn clear() -> Result<()> {
  clear_at(&default_path()?)
}

pub fn clear_at(path: &Path) -> Result<()> {
  match std::fs::remove_file(path) {
    Ok(()) => Ok(()),
    Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
    Err(e) => Err(eyre!("Failed to remove preferences {}: {}", path.display(), e)),
  }
}
