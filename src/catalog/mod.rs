//! Remote catalog service: client, wire types, and the index sync routine.

mod api_types;
mod client;
mod sync;
mod types;

pub use client::{ApiError, CatalogClient};
pub use sync::{CatalogSync, IndexSource};
pub use types::{Asset, NewAsset};
