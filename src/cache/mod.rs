//! Local persistent cache for the asset index.
//!
//! Holds the last-known copy of every asset this device has seen so the
//! index can still be served when the backend is unreachable. The store is
//! a single SQLite table keyed by asset id; the repository wraps it with
//! async operations dispatched onto the blocking pool.

mod repository;
mod storage;

pub use repository::AssetRepository;
pub use storage::AssetStore;
