//! Read-only snapshot of the bundled dataset, loaded on first use.

use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::OnceCell;

use crate::error::CatalogError;
use crate::service::normalize::{opt_string_or_number, string_or_number, vec_string_or_number};

/// A track row from the dataset
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LocalTrack {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub artist: String,
    #[serde(default, deserialize_with = "opt_string_or_number")]
    pub duration: Option<String>,
    #[serde(default)]
    pub cover: Option<String>,
    #[serde(rename = "audioSrc", default)]
    pub audio_src: Option<String>,
    #[serde(default)]
    pub genre: Option<String>,
}

impl LocalTrack {
    /// Case-insensitive substring match on title, artist or genre
    fn matches(&self, needle: &str) -> bool {
        self.title.to_lowercase().contains(needle)
            || self.artist.to_lowercase().contains(needle)
            || self
                .genre
                .as_deref()
                .is_some_and(|g| g.to_lowercase().contains(needle))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LocalArtist {
    #[serde(default, deserialize_with = "opt_string_or_number")]
    pub id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub genre: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    /// Track id references
    #[serde(default, deserialize_with = "vec_string_or_number")]
    pub tracks: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LocalPlaylist {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    /// Track id references
    #[serde(default, deserialize_with = "vec_string_or_number")]
    pub tracks: Vec<String>,
}

/// The whole dataset document
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LocalDataset {
    #[serde(default)]
    pub tracks: Vec<LocalTrack>,
    #[serde(default)]
    pub artists: Vec<LocalArtist>,
    #[serde(default)]
    pub playlists: Vec<LocalPlaylist>,
}

enum DatasetSource {
    File(PathBuf),
    Inline(String),
}

/// Bundled dataset, fetched at most once per process.
///
/// A failed load is not cached; the next caller retries.
pub struct LocalCatalog {
    source: DatasetSource,
    snapshot: OnceCell<Arc<LocalDataset>>,
    load_count: AtomicUsize,
}

impl LocalCatalog {
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        Self::with_source(DatasetSource::File(path.into()))
    }

    /// Dataset held in memory, parsed on first use like a file would be
    pub fn from_json(json: impl Into<String>) -> Self {
        Self::with_source(DatasetSource::Inline(json.into()))
    }

    fn with_source(source: DatasetSource) -> Self {
        Self {
            source,
            snapshot: OnceCell::new(),
            load_count: AtomicUsize::new(0),
        }
    }

    pub fn is_loaded(&self) -> bool {
        self.snapshot.initialized()
    }

    /// Number of times the source was actually read
    pub fn load_count(&self) -> usize {
        self.load_count.load(Ordering::Relaxed)
    }

    pub async fn snapshot(&self) -> Result<Arc<LocalDataset>, CatalogError> {
        self.snapshot
            .get_or_try_init(|| async {
                self.load_count.fetch_add(1, Ordering::Relaxed);
                let dataset = self.read_source().await?;
                tracing::debug!(
                    "Loaded local dataset: {} tracks, {} artists, {} playlists",
                    dataset.tracks.len(),
                    dataset.artists.len(),
                    dataset.playlists.len()
                );
                Ok::<_, CatalogError>(Arc::new(dataset))
            })
            .await
            .cloned()
    }

    async fn read_source(&self) -> Result<LocalDataset, CatalogError> {
        let contents = match &self.source {
            DatasetSource::File(path) => tokio::fs::read_to_string(path).await.map_err(|e| {
                tracing::warn!("Failed to read dataset {}: {}", path.display(), e);
                CatalogError::Dataset(e.to_string())
            })?,
            DatasetSource::Inline(json) => json.clone(),
        };

        serde_json::from_str(&contents).map_err(|e| {
            tracing::warn!("Failed to parse dataset: {}", e);
            CatalogError::Dataset(e.to_string())
        })
    }

    /// Substring search; a blank query returns every track. `limit` caps the result.
    pub async fn search(&self, query: &str, limit: usize) -> Result<Vec<LocalTrack>, CatalogError> {
        let dataset = self.snapshot().await?;
        let needle = query.trim().to_lowercase();

        Ok(dataset
            .tracks
            .iter()
            .filter(|t| needle.is_empty() || t.matches(&needle))
            .take(limit)
            .cloned()
            .collect())
    }

    /// A random selection of up to `limit` tracks
    pub async fn shuffled(&self, limit: usize) -> Result<Vec<LocalTrack>, CatalogError> {
        let dataset = self.snapshot().await?;
        let mut tracks = dataset.tracks.clone();
        tracks.shuffle(&mut rand::thread_rng());
        tracks.truncate(limit);
        Ok(tracks)
    }

    pub async fn track_by_id(&self, id: &str) -> Result<Option<LocalTrack>, CatalogError> {
        let dataset = self.snapshot().await?;
        Ok(dataset.tracks.iter().find(|t| t.id == id).cloned())
    }

    pub async fn artists(&self) -> Result<Vec<LocalArtist>, CatalogError> {
        Ok(self.snapshot().await?.artists.clone())
    }

    pub async fn playlists(&self) -> Result<Vec<LocalPlaylist>, CatalogError> {
        Ok(self.snapshot().await?.playlists.clone())
    }

    pub async fn playlist_by_id(&self, id: &str) -> Result<Option<LocalPlaylist>, CatalogError> {
        let dataset = self.snapshot().await?;
        Ok(dataset.playlists.iter().find(|p| p.id == id).cloned())
    }
}
