use color_eyre::{eyre::eyre, Result};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};
use url::Url;

use crate::session::SessionStore;

use super::api_types::{ApiAsset, Envelope, LoginRequest, LoginResponse, NewAssetBody, RetagBody};
use super::types::{Asset, NewAsset};

/// Error from a catalog backend call.
///
/// Callers can tell "offline" (fall back to cache) from "backend said no"
/// from "backend sent garbage" instead of getting one collapsed error.
#[derive(Debug, Error)]
pub enum ApiError {
  /// Connection, DNS, or timeout failure before a response arrived
  #[error("network error: {0}")]
  Transport(#[from] reqwest::Error),
  /// Backend answered with a non-success status
  #[error("backend returned {0}")]
  Status(StatusCode),
  /// Backend answered 2xx but the body did not parse
  #[error("invalid response body: {0}")]
  Decode(String),
}

/// Catalog API client wrapper.
///
/// Every request carries the current session token in the `jwt` header. A
/// 403 on any call clears the session store before the error is returned,
/// so the rest of the process observes the forced logout.
#[derive(Clone)]
pub struct CatalogClient {
  http: reqwest::Client,
  base: String,
  session: Arc<SessionStore>,
}

impl CatalogClient {
  pub fn new(base_url: &str, session: Arc<SessionStore>) -> Result<Self> {
    let parsed =
      Url::parse(base_url).map_err(|e| eyre!("Invalid backend url {}: {}", base_url, e))?;

    Ok(Self {
      http: reqwest::Client::new(),
      base: parsed.as_str().trim_end_matches('/').to_string(),
      session,
    })
  }

  /// Exchange credentials for a session token.
  ///
  /// `password_hash` is the SHA-256 surrogate of the password; the cleartext
  /// never leaves the login prompt.
  pub async fn login(&self, username: &str, password_hash: &str) -> Result<String, ApiError> {
    let body = LoginRequest {
      username,
      password: password_hash,
    };

    let response = self
      .send(self.http.post(format!("{}/api/login", self.base)).json(&body))
      .await?;

    let login: LoginResponse = Self::decode(response).await?;
    debug!(username, "login succeeded");

    Ok(login.token)
  }

  /// Ask the backend whether the current session token is still valid.
  ///
  /// Deliberately fail-soft: every error path reports "not valid" instead
  /// of propagating, so callers never have to handle a failure here.
  pub async fn validate_session(&self) -> bool {
    let result = self
      .send(self.http.get(format!("{}/api/users/validate", self.base)))
      .await;

    match result {
      Ok(_) => true,
      Err(e) => {
        debug!("session validation failed: {}", e);
        false
      }
    }
  }

  /// Fetch the full asset list for a user.
  pub async fn list_assets(&self, username: &str) -> Result<Vec<Asset>, ApiError> {
    let response = self
      .send(
        self
          .http
          .get(format!("{}/api/users/{}/assets", self.base, username)),
      )
      .await?;

    let envelope: Envelope<Vec<ApiAsset>> = Self::decode(response).await?;

    envelope
      .data
      .into_iter()
      .map(ApiAsset::into_asset)
      .collect()
  }

  /// Create an asset; the backend assigns the identifier.
  pub async fn create_asset(&self, new: &NewAsset) -> Result<Asset, ApiError> {
    let body = NewAssetBody {
      username: &new.username,
      set: &new.set,
      latitude: &new.latitude,
      longitude: &new.longitude,
      tag: &new.tag,
    };

    let response = self
      .send(
        self
          .http
          .post(format!("{}/api/users/{}/assets", self.base, new.username))
          .json(&body),
      )
      .await?;

    let envelope: Envelope<ApiAsset> = Self::decode(response).await?;
    envelope.data.into_asset()
  }

  /// Partial update: only the tag is mutable after creation.
  pub async fn retag_asset(&self, username: &str, id: i64, tag: &str) -> Result<Asset, ApiError> {
    let response = self
      .send(
        self
          .http
          .patch(format!("{}/api/users/{}/assets/{}", self.base, username, id))
          .json(&RetagBody { tag }),
      )
      .await?;

    let envelope: Envelope<ApiAsset> = Self::decode(response).await?;
    envelope.data.into_asset()
  }

  /// Attach the session token, send, and screen the response status.
  async fn send(&self, request: reqwest::RequestBuilder) -> Result<reqwest::Response, ApiError> {
    let response = request
      .header("jwt", self.session.token())
      .send()
      .await
      .map_err(ApiError::Transport)?;

    let status = response.status();
    if status == StatusCode::FORBIDDEN {
      // Expired or revoked token. Force the logout here so it takes effect
      // no matter which operation hit it.
      warn!("backend rejected the session token, clearing session");
      self.session.clear();
      return Err(ApiError::Status(status));
    }
    if !status.is_success() {
      return Err(ApiError::Status(status));
    }

    Ok(response)
  }

  async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, ApiError> {
    let body = response.text().await.map_err(ApiError::Transport)?;
    serde_json::from_str(&body).map_err(|e| ApiError::Decode(e.to_string()))
  }
}
