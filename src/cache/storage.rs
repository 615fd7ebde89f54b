//! SQLite store holding the last-known copy of every asset the device has
//! seen. One table, keyed by the backend-assigned identifier.

use color_eyre::{eyre::eyre, Result};
use rusqlite::{params, Connection, Row};
use std::path::Path;
use std::sync::Mutex;

use crate::catalog::Asset;

/// Schema for the asset mirror. Columns match the Asset entity exactly;
/// "set" needs quoting because it is an SQL keyword.
const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS assets (
    id INTEGER PRIMARY KEY,
    username TEXT NOT NULL,
    "set" TEXT NOT NULL,
    latitude TEXT NOT NULL,
    longitude TEXT NOT NULL,
    name TEXT NOT NULL,
    description TEXT NOT NULL,
    tag TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_assets_username ON assets(username);
"#;

/// SQLite-backed asset store.
pub struct AssetStore {
  conn: Mutex<Connection>,
}

impl AssetStore {
  /// Open or create the store at the default location.
  pub fn open() -> Result<Self> {
    let path = Self::default_path()?;

    // Ensure parent directory exists
    if let Some(parent) = path.parent() {
      std::fs::create_dir_all(parent)
        .map_err(|e| eyre!("Failed to create cache directory: {}", e))?;
    }

    let conn = Connection::open(&path)
      .map_err(|e| eyre!("Failed to open cache database at {}: {}", path.display(), e))?;

    Self::from_connection(conn)
  }

  /// Open or create the store at an explicit path.
  #[allow(dead_code)]
  pub fn open_at(path: &Path) -> Result<Self> {
    let conn = Connection::open(path)
      .map_err(|e| eyre!("Failed to open cache database at {}: {}", path.display(), e))?;

    Self::from_connection(conn)
  }

  /// In-memory store, used by tests.
  #[allow(dead_code)]
  pub fn in_memory() -> Result<Self> {
    let conn =
      Connection::open_in_memory().map_err(|e| eyre!("Failed to open in-memory store: {}", e))?;

    Self::from_connection(conn)
  }

  fn from_connection(conn: Connection) -> Result<Self> {
    let store = Self {
      conn: Mutex::new(conn),
    };
    store.run_migrations()?;

    Ok(store)
  }

  /// Get the default database path.
  fn default_path() -> Result<std::path::PathBuf> {
    let data_dir = dirs::data_dir()
      .or_else(|| dirs::home_dir().map(|p| p.join(".local/share")))
      .ok_or_else(|| eyre!("Could not determine data directory"))?;

    Ok(data_dir.join("seekr").join("cache.db"))
  }

  fn run_migrations(&self) -> Result<()> {
    let conn = self.lock()?;

    conn
      .execute_batch(SCHEMA)
      .map_err(|e| eyre!("Failed to run cache migrations: {}", e))?;

    Ok(())
  }

  fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>> {
    self.conn.lock().map_err(|e| eyre!("Lock poisoned: {}", e))
  }

  /// Insert or replace an asset row by id.
  pub fn upsert(&self, asset: &Asset) -> Result<()> {
    let conn = self.lock()?;

    conn
      .execute(
        r#"INSERT OR REPLACE INTO assets (id, username, "set", latitude, longitude, name, description, tag)
           VALUES (?, ?, ?, ?, ?, ?, ?, ?)"#,
        params![
          asset.id,
          asset.username,
          asset.set,
          asset.latitude,
          asset.longitude,
          asset.name,
          asset.description,
          asset.tag
        ],
      )
      .map_err(|e| eyre!("Failed to store asset {}: {}", asset.id, e))?;

    Ok(())
  }

  /// Update an existing row. Missing rows are left alone.
  pub fn update(&self, asset: &Asset) -> Result<()> {
    let conn = self.lock()?;

    conn
      .execute(
        r#"UPDATE assets
           SET username = ?, "set" = ?, latitude = ?, longitude = ?, name = ?, description = ?, tag = ?
           WHERE id = ?"#,
        params![
          asset.username,
          asset.set,
          asset.latitude,
          asset.longitude,
          asset.name,
          asset.description,
          asset.tag,
          asset.id
        ],
      )
      .map_err(|e| eyre!("Failed to update asset {}: {}", asset.id, e))?;

    Ok(())
  }

  pub fn delete(&self, id: i64) -> Result<()> {
    let conn = self.lock()?;

    conn
      .execute("DELETE FROM assets WHERE id = ?", params![id])
      .map_err(|e| eyre!("Failed to delete asset {}: {}", id, e))?;

    Ok(())
  }

  pub fn get(&self, id: i64) -> Result<Option<Asset>> {
    let conn = self.lock()?;

    let mut stmt = conn
      .prepare(
        r#"SELECT id, username, "set", latitude, longitude, name, description, tag
           FROM assets WHERE id = ?"#,
      )
      .map_err(|e| eyre!("Failed to prepare query: {}", e))?;

    let asset = stmt.query_row(params![id], row_to_asset).ok();

    Ok(asset)
  }

  /// All stored assets, in storage insertion order.
  pub fn list_all(&self) -> Result<Vec<Asset>> {
    let conn = self.lock()?;

    let mut stmt = conn
      .prepare(
        r#"SELECT id, username, "set", latitude, longitude, name, description, tag
           FROM assets ORDER BY rowid"#,
      )
      .map_err(|e| eyre!("Failed to prepare query: {}", e))?;

    let assets = stmt
      .query_map([], row_to_asset)
      .map_err(|e| eyre!("Failed to query assets: {}", e))?
      .filter_map(|r| r.ok())
      .collect();

    Ok(assets)
  }

  /// Stored assets belonging to one user, in storage insertion order.
  pub fn list_for_user(&self, username: &str) -> Result<Vec<Asset>> {
    let conn = self.lock()?;

    let mut stmt = conn
      .prepare(
        r#"SELECT id, username, "set", latitude, longitude, name, description, tag
           FROM assets WHERE username = ? ORDER BY rowid"#,
      )
      .map_err(|e| eyre!("Failed to prepare query: {}", e))?;

    let assets = stmt
      .query_map(params![username], row_to_asset)
      .map_err(|e| eyre!("Failed to query assets for {}: {}", username, e))?
      .filter_map(|r| r.ok())
      .collect();

    Ok(assets)
  }
}

fn row_to_asset(row: &Row<'_>) -> rusqlite::Result<Asset> {
  Ok(Asset {
    id: row.get(0)?,
    username: row.get(1)?,
    set: row.get(2)?,
    latitude: row.get(3)?,
    longitude: row.get(4)?,
    name: row.get(5)?,
    description: row.get(6)?,
    tag: row.get(7)?,
  })
}

#[cfg(test)]
mod tests {
  use super::*;

  fn asset(id: i64, username: &str, tag: &str) -> Asset {
    Asset {
      id,
      username: username.to_string(),
      set: "landmark".to_string(),
      latitude: "41.40".to_string(),
      longitude: "2.17".to_string(),
      name: format!("Asset {}", id),
      description: String::new(),
      tag: tag.to_string(),
    }
  }

  #[test]
  fn upsert_replaces_by_id() {
    let store = AssetStore::in_memory().unwrap();

    store.upsert(&asset(1, "alice", "blue")).unwrap();
    store.upsert(&asset(1, "alice", "red")).unwrap();

    let assets = store.list_all().unwrap();
    assert_eq!(assets.len(), 1);
    assert_eq!(assets[0].tag, "red");
  }

  #[test]
  fn list_for_user_filters_and_preserves_order() {
    let store = AssetStore::in_memory().unwrap();

    store.upsert(&asset(3, "alice", "a")).unwrap();
    store.upsert(&asset(1, "bob", "b")).unwrap();
    store.upsert(&asset(2, "alice", "c")).unwrap();

    let alice: Vec<i64> = store
      .list_for_user("alice")
      .unwrap()
      .iter()
      .map(|a| a.id)
      .collect();
    assert_eq!(alice, vec![2, 3]);

    assert_eq!(store.list_all().unwrap().len(), 3);
  }

  #[test]
  fn update_and_delete() {
    let store = AssetStore::in_memory().unwrap();
    store.upsert(&asset(5, "alice", "blue")).unwrap();

    let mut updated = asset(5, "alice", "red");
    updated.description = "repainted".to_string();
    store.update(&updated).unwrap();
    assert_eq!(store.get(5).unwrap().unwrap().tag, "red");

    store.delete(5).unwrap();
    assert_eq!(store.get(5).unwrap(), None);
  }

  #[test]
  fn survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("cache.db");

    {
      let store = AssetStore::open_at(&path).unwrap();
      store.upsert(&asset(1, "alice", "blue")).unwrap();
    }

    let store = AssetStore::open_at(&path).unwrap();
    assert_eq!(store.list_all().unwrap().len(), 1);
  }
}
