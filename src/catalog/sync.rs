//! Index synchronization between the backend and the local cache.
//!
//! Serving a list never mutates the cache as a hidden side effect: the
//! remote fetch and the cache sync are separate steps, orchestrated by
//! [`CatalogSync::refresh`].

use color_eyre::Result;
use tracing::{debug, info};

use crate::cache::AssetRepository;

use super::client::{ApiError, CatalogClient};
use super::types::{Asset, NewAsset};

/// Where a served index came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexSource {
  /// Authoritative list from the backend
  Remote,
  /// Local cache copy, because the backend call failed
  Cached,
}

/// An asset index together with its provenance.
#[derive(Debug)]
pub struct IndexList {
  pub assets: Vec<Asset>,
  pub source: IndexSource,
}

/// Orchestrates the backend client and the local cache.
#[derive(Clone)]
pub struct CatalogSync {
  client: CatalogClient,
  repo: AssetRepository,
}

impl CatalogSync {
  pub fn new(client: CatalogClient, repo: AssetRepository) -> Self {
    Self { client, repo }
  }

  /// Phase one: fetch the authoritative list. No cache interaction.
  pub async fn fetch_remote(&self, username: &str) -> Result<Vec<Asset>, ApiError> {
    self.client.list_assets(username).await
  }

  /// Phase two: mirror fetched records into the local store.
  pub async fn sync_to_cache(&self, assets: &[Asset]) -> Result<()> {
    for asset in assets {
      self.repo.insert(asset.clone()).await?;
    }

    Ok(())
  }

  /// Serve the index for a user: remote first, local cache on any failure.
  ///
  /// Transport, status, and decode failures are treated identically here;
  /// once fallen back to the cache there is no network retry within this
  /// invocation. An empty cache plus a failed fetch yields an empty list.
  pub async fn refresh(&self, username: &str) -> Result<IndexList> {
    match self.fetch_remote(username).await {
      Ok(assets) => {
        self.sync_to_cache(&assets).await?;
        Ok(IndexList {
          assets,
          source: IndexSource::Remote,
        })
      }
      Err(e) => {
        debug!("remote index fetch failed, serving cache: {}", e);
        let assets = self.repo.for_user(username).await?;
        info!(
          username,
          count = assets.len(),
          "serving asset index from local cache"
        );
        Ok(IndexList {
          assets,
          source: IndexSource::Cached,
        })
      }
    }
  }

  /// Create an asset remotely and mirror it into the cache.
  pub async fn create_and_mirror(&self, new: &NewAsset) -> Result<Asset> {
    let created = self.client.create_asset(new).await?;
    self.repo.insert(created.clone()).await?;

    Ok(created)
  }

  /// Retag an asset remotely and mirror the updated row.
  pub async fn retag_and_mirror(&self, username: &str, id: i64, tag: &str) -> Result<Asset> {
    let updated = self.client.retag_asset(username, id, tag).await?;
    self.repo.update(updated.clone()).await?;

    Ok(updated)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::cache::AssetStore;
  use crate::session::SessionStore;
  use httpmock::Method::{GET, PATCH};
  use httpmock::MockServer;
  use serde_json::json;
  use std::sync::Arc;

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

  fn asset_json(asset: &Asset) -> serde_json::Value {
    json!({
      "id": asset.id.to_string(),
      "username": asset.username,
      "set": asset.set,
      "latitude": asset.latitude,
      "longitude": asset.longitude,
      "name": asset.name,
      "description": asset.description,
      "tag": asset.tag,
    })
  }

  fn sync_for(server: &MockServer) -> (CatalogSync, AssetRepository) {
    let session = Arc::new(SessionStore::new());
    let client = CatalogClient::new(&server.base_url(), session).unwrap();
    let repo = AssetRepository::new(AssetStore::in_memory().unwrap());

    (CatalogSync::new(client, repo.clone()), repo)
  }

  #[tokio::test]
  async fn refresh_writes_every_fetched_asset_through() {
    let server = MockServer::start_async().await;
    let remote = vec![asset(1, "alice", "a"), asset(2, "alice", "b")];
    server
      .mock_async(|when, then| {
        when.method(GET).path("/api/users/alice/assets");
        then.status(200).json_body(json!({
          "data": [asset_json(&remote[0]), asset_json(&remote[1])],
        }));
      })
      .await;

    let (sync, repo) = sync_for(&server);
    let index = sync.refresh("alice").await.unwrap();

    assert_eq!(index.source, IndexSource::Remote);
    assert_eq!(index.assets, remote);

    // Write-through completeness: every fetched element is in the store
    for expected in &remote {
      assert_eq!(repo.get(expected.id).await.unwrap().as_ref(), Some(expected));
    }
  }

  #[tokio::test]
  async fn refresh_falls_back_to_the_users_cached_rows() {
    let server = MockServer::start_async().await;
    server
      .mock_async(|when, then| {
        when.method(GET).path("/api/users/alice/assets");
        then.status(500);
      })
      .await;

    let (sync, repo) = sync_for(&server);
    repo.insert(asset(1, "alice", "a")).await.unwrap();
    repo.insert(asset(2, "alice", "b")).await.unwrap();
    repo.insert(asset(3, "bob", "c")).await.unwrap();

    let index = sync.refresh("alice").await.unwrap();

    assert_eq!(index.source, IndexSource::Cached);
    let ids: Vec<i64> = index.assets.iter().map(|a| a.id).collect();
    assert_eq!(ids, vec![1, 2]);
    assert!(index.assets.iter().all(|a| a.username == "alice"));
  }

  #[tokio::test]
  async fn refresh_with_failed_fetch_and_empty_cache_is_empty() {
    let server = MockServer::start_async().await;
    server
      .mock_async(|when, then| {
        when.method(GET).path("/api/users/alice/assets");
        then.status(500);
      })
      .await;

    let (sync, _) = sync_for(&server);
    let index = sync.refresh("alice").await.unwrap();

    assert_eq!(index.source, IndexSource::Cached);
    assert!(index.assets.is_empty());
  }

  #[tokio::test]
  async fn retag_mirrors_the_updated_row() {
    let server = MockServer::start_async().await;
    let updated = asset(5, "alice", "red");
    server
      .mock_async(|when, then| {
        when
          .method(PATCH)
          .path("/api/users/alice/assets/5")
          .json_body(json!({"tag": "red"}));
        then.status(200).json_body(json!({"data": asset_json(&updated)}));
      })
      .await;

    let (sync, repo) = sync_for(&server);
    repo.insert(asset(5, "alice", "blue")).await.unwrap();

    let returned = sync.retag_and_mirror("alice", 5, "red").await.unwrap();

    assert_eq!(returned.tag, "red");
    assert_eq!(repo.get(5).await.unwrap().unwrap().tag, "red");
  }
}
