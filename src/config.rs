use color_eyre::{eyre::eyre, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
  pub backend: BackendConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BackendConfig {
  /// Backend origin, e.g. "https://catalog.example.com"
  pub url: String,
  /// Default username for list/create when none is given on the command line
  pub username: Option<String>,
}

impl Config {
  /// Load configuration from file.
  ///
  /// Search order:
  /// 1. Explicit path if provided
  /// 2. ./seekr.yaml (current directory)
  /// 3. $XDG_CONFIG_HOME/seekr/config.yaml
  pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
    let path = if let Some(p) = explicit_path {
      if p.exists() {
        Some(p.to_path_buf())
      } else {
        return Err(eyre!("Config file not found: {}", p.display()));
      }
    } else {
      Self::find_config_file()
    };

    match path {
      Some(p) => Self::load_from_path(&p),
      None => Err(eyre!(
        "No configuration file found. Create one at ~/.config/seekr/config.yaml\n\
                 with at least a backend url."
      )),
    }
  }

  fn find_config_file() -> Option<PathBuf> {
    // Check current directory
    let local = PathBuf::from("seekr.yaml");
    if local.exists() {
      return Some(local);
    }

    // Check XDG config directory
    if let Some(config_dir) = dirs::config_dir() {
      let xdg_path = config_dir.join("seekr").join("config.yaml");
      if xdg_path.exists() {
        return Some(xdg_path);
      }
    }

    None
  }

  fn load_from_path(path: &Path) -> Result<Self> {
    let contents = std::fs::read_to_string(path)
      .map_err(|e| eyre!("Failed to read config file {}: {}", path.display(), e))?;

    let config: Config = serde_yaml::from_str(&contents)
      .map_err(|e| eyre!("Failed to parse config file {}: {}", path.display(), e))?;

    Ok(config)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::io::Write;

  #[test]
  fn parses_backend_section() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.yaml");
    let mut f = std::fs::File::create(&path).unwrap();
    writeln!(f, "backend:\n  url: http://localhost:4000\n  username: alice").unwrap();

    let config = Config::load(Some(&path)).unwrap();
    assert_eq!(config.backend.url, "http://localhost:4000");
    assert_eq!(config.backend.username.as_deref(), Some("alice"));
  }

  #[test]
  fn missing_explicit_path_is_an_error() {
    let err = Config::load(Some(Path::new("/nonexistent/seekr.yaml"))).unwrap_err();
    assert!(err.to_string().contains("not found"));
  }
}
