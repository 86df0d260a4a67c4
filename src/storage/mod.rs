//! Durable key-value storage for playlists, favorites, the session and play history.
//!
//! - [`RedbStore`]: embedded redb database (default)
//! - [`MemoryStore`]: process-local map, used for `--ephemeral` runs and tests
//!
//! Values are JSON strings. Everything above this layer goes through
//! [`read_json`] / [`write_json`].

pub mod local;
pub mod memory;

pub use local::RedbStore;
pub use memory::MemoryStore;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::CatalogError;

/// Persisted session blob
pub const SESSION_KEY: &str = "mysic_session";
/// Playlist id -> ordered track references
pub const PLAYLISTS_KEY: &str = "mysic_playlists";
/// Metadata for playlists created on this device
pub const PLAYLISTS_META_KEY: &str = "mysic_playlists_meta";
/// Mirror of the favorites playlist contents
pub const FAVORITES_KEY: &str = "mysic_favorites";
pub const PLAYS_KEY: &str = "mysic_plays";

#[async_trait]
pub trait KvStore: Send + Sync {
    /// Human-readable backend name (e.g., "redb", "memory").
    fn backend_name(&self) -> &str;

    async fn get(&self, key: &str) -> Result<Option<String>, CatalogError>;

    async fn set(&self, key: &str, value: &str) -> Result<(), CatalogError>;

    async fn remove(&self, key: &str) -> Result<(), CatalogError>;
}

/// Read and decode `key`. Missing, unreadable or corrupt values yield `T::default()`.
pub async fn read_json<T>(store: &dyn KvStore, key: &str) -> T
where
    T: DeserializeOwned + Default,
{
    match store.get(key).await {
        Ok(Some(raw)) => serde_json::from_str(&raw).unwrap_or_else(|e| {
            tracing::warn!("Discarding corrupt value under {}: {}", key, e);
            T::default()
        }),
        Ok(None) => T::default(),
        Err(e) => {
            tracing::warn!("Failed to read {} from {} storage: {}", key, store.backend_name(), e);
            T::default()
        }
    }
}

pub async fn write_json<T>(store: &dyn KvStore, key: &str, value: &T) -> Result<(), CatalogError>
where
    T: Serialize + ?Sized,
{
    let raw = serde_json::to_string(value)
        .map_err(|e| CatalogError::Persistence(e.to_string()))?;
    store.set(key, &raw).await.map_err(|e| {
        tracing::warn!("Failed to write {} to {} storage: {}", key, store.backend_name(), e);
        e
    })
}
