//! Async facade over the asset store.
//!
//! Every operation runs on the blocking pool so callers only suspend,
//! mirroring the original repository interface over the local store.

use color_eyre::{eyre::eyre, Result};
use std::sync::Arc;

use crate::catalog::Asset;

use super::storage::AssetStore;

#[derive(Clone)]
pub struct AssetRepository {
  store: Arc<AssetStore>,
}

impl AssetRepository {
  pub fn new(store: AssetStore) -> Self {
    Self {
      store: Arc::new(store),
    }
  }

  async fn run<T, F>(&self, op: F) -> Result<T>
  where
    T: Send + 'static,
    F: FnOnce(&AssetStore) -> Result<T> + Send + 'static,
  {
    let store = Arc::clone(&self.store);

    tokio::task::spawn_blocking(move || op(&store))
      .await
      .map_err(|e| eyre!("Cache task failed: {}", e))?
  }

  pub async fn insert(&self, asset: Asset) -> Result<()> {
    self.run(move |store| store.upsert(&asset)).await
  }

  pub async fn update(&self, asset: Asset) -> Result<()> {
    self.run(move |store| store.update(&asset)).await
  }

  /// Present for interface parity with the original repository; no command
  /// currently drives it.
  #[allow(dead_code)]
  pub async fn delete(&self, asset: Asset) -> Result<()> {
    self.run(move |store| store.delete(asset.id)).await
  }

  #[allow(dead_code)]
  pub async fn get(&self, id: i64) -> Result<Option<Asset>> {
    self.run(move |store| store.get(id)).await
  }

  /// Every stored asset, regardless of owner.
  #[allow(dead_code)]
  pub async fn all(&self) -> Result<Vec<Asset>> {
    self.run(|store| store.list_all()).await
  }

  pub async fn for_user(&self, username: &str) -> Result<Vec<Asset>> {
    let username = username.to_string();
    self.run(move |store| store.list_for_user(&username)).await
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn asset(id: i64, username: &str) -> Asset {
    Asset {
      id,
      username: username.to_string(),
      set: "landmark".to_string(),
      latitude: "0".to_string(),
      longitude: "0".to_string(),
      name: String::new(),
      description: String::new(),
      tag: String::new(),
    }
  }

  #[tokio::test]
  async fn facade_round_trip() {
    let repo = AssetRepository::new(AssetStore::in_memory().unwrap());

    repo.insert(asset(1, "alice")).await.unwrap();
    repo.insert(asset(2, "bob")).await.unwrap();

    assert_eq!(repo.all().await.unwrap().len(), 2);
    assert_eq!(repo.for_user("alice").await.unwrap().len(), 1);

    let mut retagged = asset(1, "alice");
    retagged.tag = "red".to_string();
    repo.update(retagged).await.unwrap();
    assert_eq!(repo.get(1).await.unwrap().unwrap().tag, "red");

    repo.delete(asset(1, "alice")).await.unwrap();
    assert_eq!(repo.get(1).await.unwrap(), None);
  }
}
