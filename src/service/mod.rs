#[cfg(test)]
pub(crate) mod fake;
pub mod normalize;
pub mod openwhyd;
pub mod resolver;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::CatalogError;

pub use openwhyd::{OpenWhydClient, RemotePlaylist, RemotePlaylistDetail, RemoteTrack, RemoteUser};
pub use resolver::{Resolver, ResolverSettings};

/// Prefix reserved for playlists created on this device. Remote IDs never carry it.
pub const LOCAL_PLAYLIST_PREFIX: &str = "local_";

/// Playlist whose track list is mirrored into its own storage key.
pub const FAVORITES_PLAYLIST_ID: &str = "favorites";

/// Which backend produced a record. Informational only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SourceLabel {
    #[default]
    Remote,
    Local,
    Trending,
    Playlist,
}

impl SourceLabel {
    /// True for every label the local fallback path can produce.
    pub fn is_local_origin(self) -> bool {
        !matches!(self, SourceLabel::Remote)
    }
}

impl std::fmt::Display for SourceLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SourceLabel::Remote => write!(f, "remote"),
            SourceLabel::Local => write!(f, "local"),
            SourceLabel::Trending => write!(f, "trending"),
            SourceLabel::Playlist => write!(f, "playlist"),
        }
    }
}

impl std::str::FromStr for SourceLabel {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "remote" | "openwhyd" => Ok(SourceLabel::Remote),
            "local" => Ok(SourceLabel::Local),
            "trending" => Ok(SourceLabel::Trending),
            "playlist" => Ok(SourceLabel::Playlist),
            _ => Err(anyhow::anyhow!("Unknown source label: {}", s)),
        }
    }
}

/// A track in canonical shape, whichever backend produced it.
///
/// `id` is only unique within one result set: the same song can carry a
/// different id depending on provenance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Track {
    pub id: String,
    pub title: String,
    pub artist: String,
    /// Free-form "m:ss", never parsed.
    pub duration_label: String,
    pub cover_url: String,
    /// Streamable URL, or empty when the external reference is not recognized.
    pub playable_reference: String,
    pub genre: Option<String>,
    pub source_label: SourceLabel,
    pub play_count: u64,
    /// `<provider>/<providerTrackId>` reference, real or synthesized.
    pub external_id: Option<String>,
}

/// An artist derived from a track scan or read from the dataset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Artist {
    pub id: String,
    pub name: String,
    pub genre: String,
    /// 0-100, synthesized
    pub popularity: u8,
    pub follower_count: u64,
    /// First-seen order
    pub track_ids: Vec<String>,
    pub image_url: Option<String>,
    pub description: Option<String>,
}

/// A playlist from the remote service, the dataset, or local storage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Playlist {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    /// Ordered, no duplicates
    pub track_ids: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl Playlist {
    pub fn is_local(&self) -> bool {
        is_local_playlist_id(&self.id)
    }

    pub fn is_favorites(&self) -> bool {
        self.id == FAVORITES_PLAYLIST_ID
    }

    /// Append ids not already present, keeping existing order.
    pub fn merge_track_ids<I, S>(&mut self, ids: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for id in ids {
            let id = id.as_ref();
            if !self.track_ids.iter().any(|t| t == id) {
                self.track_ids.push(id.to_string());
            }
        }
    }
}

/// Check if a playlist ID lives in the local-only namespace
pub fn is_local_playlist_id(id: &str) -> bool {
    id.starts_with(LOCAL_PLAYLIST_PREFIX) || id == FAVORITES_PLAYLIST_ID
}

/// Playlist metadata together with its resolved tracks
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct PlaylistTracks {
    pub playlist: Playlist,
    pub tracks: Vec<Track>,
}

/// An authenticated session with the remote service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub user_id: String,
    pub email: String,
    pub established_at: DateTime<Utc>,
    /// Opaque cookie pairs replayed on every request
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credential: Option<String>,
}

/// `{success, data | error}` answer handed to the presentation layer.
///
/// Read paths always produce one of these; on failure `data` is empty.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryResult<T> {
    pub success: bool,
    pub data: T,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> QueryResult<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data,
            error: None,
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> QueryResult<U> {
        QueryResult {
            success: self.success,
            data: f(self.data),
            error: self.error,
        }
    }

    pub fn into_result(self) -> Result<T, String> {
        if self.success {
            Ok(self.data)
        } else {
            Err(self.error.unwrap_or_else(|| "unknown error".to_string()))
        }
    }
}

impl<T: Default> QueryResult<T> {
    pub fn failed(error: impl std::fmt::Display) -> Self {
        Self {
            success: false,
            data: T::default(),
            error: Some(error.to_string()),
        }
    }
}

/// Transport to the remote music-discovery service.
///
/// Every call is a single attempt; failures surface immediately and the
/// caller decides whether to fall back. Mutations require a session and must
/// not be attempted without one.
#[async_trait]
pub trait CatalogRemote: Send + Sync {
    /// Current session, if logged in
    fn session(&self) -> Option<Session>;

    /// Install or clear the session used for authenticated calls
    fn set_session(&self, session: Option<Session>);

    fn is_authenticated(&self) -> bool {
        self.session().is_some()
    }

    // === Catalog ===

    async fn search(&self, query: &str, limit: usize) -> Result<Vec<RemoteTrack>, CatalogError>;

    async fn hot_tracks(&self, limit: usize) -> Result<Vec<RemoteTrack>, CatalogError>;

    async fn playlists_for_user(&self, user_id: &str) -> Result<Vec<RemotePlaylist>, CatalogError>;

    async fn playlist_tracks(&self, playlist_id: &str) -> Result<RemotePlaylistDetail, CatalogError>;

    // === Playlist Management ===

    async fn create_playlist(
        &self,
        name: &str,
        description: &str,
    ) -> Result<RemotePlaylist, CatalogError>;

    /// Returns whether the service acknowledged the addition
    async fn add_track(&self, playlist_id: &str, track: &Track) -> Result<bool, CatalogError>;

    // === Account ===

    /// Exchange credentials for a session. Does not persist anything.
    async fn login(&self, email: &str, password: &str) -> Result<Session, CatalogError>;

    async fn who_am_i(&self) -> Result<RemoteUser, CatalogError>;
}
