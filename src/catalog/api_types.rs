//! Serde types matching the catalog backend's JSON bodies.
//!
//! These are separate from domain types so the wire format can shift
//! without touching the rest of the application.

use serde::{Deserialize, Serialize};

use super::client::ApiError;
use super::types::Asset;

#[derive(Debug, Serialize)]
pub struct LoginRequest<'a> {
  pub username: &'a str,
  pub password: &'a str,
}

#[derive(Debug, Deserialize)]
pub struct LoginResponse {
  pub token: String,
}

/// Standard response wrapper: every asset endpoint answers `{"data": ...}`.
#[derive(Debug, Deserialize)]
pub struct Envelope<T> {
  pub data: T,
}

#[derive(Debug, Serialize)]
pub struct NewAssetBody<'a> {
  pub username: &'a str,
  pub set: &'a str,
  pub latitude: &'a str,
  pub longitude: &'a str,
  pub tag: &'a str,
}

#[derive(Debug, Serialize)]
pub struct RetagBody<'a> {
  pub tag: &'a str,
}

/// Asset record as the backend sends it. Identifiers arrive as strings.
#[derive(Debug, Deserialize)]
pub struct ApiAsset {
  pub id: String,
  pub username: String,
  pub set: String,
  pub latitude: String,
  pub longitude: String,
  pub name: String,
  pub description: String,
  pub tag: String,
}

impl ApiAsset {
  pub fn into_asset(self) -> Result<Asset, ApiError> {
    let id = self
      .id
      .parse::<i64>()
      .map_err(|_| ApiError::Decode(format!("non-numeric asset id: {:?}", self.id)))?;

    Ok(Asset {
      id,
      username: self.username,
      set: self.set,
      latitude: self.latitude,
      longitude: self.longitude,
      name: self.name,
      description: self.description,
      tag: self.tag,
    })
  }
}
