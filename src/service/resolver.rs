use lru::LruCache;
use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex};

use super::normalize::{
    artists_from_tracks, normalize_artist, normalize_playlist, normalize_track, CatalogRecord,
    PlaylistRecord, TrackDefaults,
};
use super::{Artist, CatalogRemote, Playlist, PlaylistTracks, QueryResult, SourceLabel, Track};
use crate::catalog::LocalCatalog;
use crate::config::CatalogConfig;
use crate::error::CatalogError;

/// Result sizing and defaults used while resolving
#[derive(Debug, Clone)]
pub struct ResolverSettings {
    pub search_limit: usize,
    pub hot_limit: usize,
    pub artist_seed_limit: usize,
    pub track_cache_size: usize,
    pub defaults: TrackDefaults,
}

impl From<&CatalogConfig> for ResolverSettings {
    fn from(config: &CatalogConfig) -> Self {
        Self {
            search_limit: config.search_limit,
            hot_limit: config.hot_limit,
            artist_seed_limit: config.artist_seed_limit,
            track_cache_size: config.track_cache_size,
            defaults: TrackDefaults {
                fallback_cover: config.fallback_cover.clone(),
            },
        }
    }
}

impl Default for ResolverSettings {
    fn default() -> Self {
        Self::from(&CatalogConfig::default())
    }
}

/// Keep remote data only when there is some. Empty and failed answers are
/// treated the same way: both send the caller to the local dataset.
fn remote_data<T>(op: &str, result: Result<Vec<T>, CatalogError>) -> Option<Vec<T>> {
    match result {
        Ok(items) if !items.is_empty() => {
            tracing::debug!("{}: remote returned {} records", op, items.len());
            Some(items)
        }
        Ok(_) => {
            tracing::info!("{}: remote returned nothing, using local dataset", op);
            None
        }
        Err(e) => {
            tracing::info!("{}: remote failed ({}), using local dataset", op, e);
            None
        }
    }
}

/// Answers catalog queries from the remote service, falling back to the
/// bundled dataset. Read operations never fail outward; they return a
/// [`QueryResult`] whose `error` describes why there is no data.
pub struct Resolver {
    remote: Arc<dyn CatalogRemote>,
    catalog: Arc<LocalCatalog>,
    /// Every track handed out recently, by id
    track_cache: Mutex<LruCache<String, Track>>,
    settings: ResolverSettings,
}

impl Resolver {
    pub fn new(
        remote: Arc<dyn CatalogRemote>,
        catalog: Arc<LocalCatalog>,
        settings: ResolverSettings,
    ) -> Self {
        let cap = NonZeroUsize::new(settings.track_cache_size.max(1)).unwrap_or(NonZeroUsize::MIN);
        Self {
            remote,
            catalog,
            track_cache: Mutex::new(LruCache::new(cap)),
            settings,
        }
    }

    pub fn remote(&self) -> &Arc<dyn CatalogRemote> {
        &self.remote
    }

    pub fn catalog(&self) -> &Arc<LocalCatalog> {
        &self.catalog
    }

    pub fn settings(&self) -> &ResolverSettings {
        &self.settings
    }

    pub async fn search(&self, query: &str) -> QueryResult<Vec<Track>> {
        self.search_with_limit(query, self.settings.search_limit).await
    }

    pub async fn search_with_limit(&self, query: &str, limit: usize) -> QueryResult<Vec<Track>> {
        if let Some(items) = remote_data("search", self.remote.search(query, limit).await) {
            return self.answer(items.into_iter().map(CatalogRecord::Remote), limit);
        }

        match self.catalog.search(query, limit).await {
            Ok(rows) => self.answer(
                rows.into_iter().map(|row| CatalogRecord::Local {
                    row,
                    label: SourceLabel::Local,
                }),
                limit,
            ),
            Err(e) => QueryResult::failed(e),
        }
    }

    pub async fn hot_tracks(&self, limit: usize) -> QueryResult<Vec<Track>> {
        if let Some(items) = remote_data("hot_tracks", self.remote.hot_tracks(limit).await) {
            return self.answer(items.into_iter().map(CatalogRecord::Remote), limit);
        }

        match self.catalog.shuffled(limit).await {
            Ok(rows) => self.answer(
                rows.into_iter().map(|row| CatalogRecord::Local {
                    row,
                    label: SourceLabel::Trending,
                }),
                limit,
            ),
            Err(e) => QueryResult::failed(e),
        }
    }

    /// Artists grouped from the current hot tracks.
    ///
    /// When no hot tracks can be produced at all, the dataset's artist list
    /// is used instead.
    pub async fn artist_recommendations(&self) -> QueryResult<Vec<Artist>> {
        let hot = self.hot_tracks(self.settings.artist_seed_limit).await;
        if hot.success && !hot.data.is_empty() {
            return QueryResult::ok(artists_from_tracks(&hot.data));
        }

        tracing::info!("artist_recommendations: no hot tracks, using dataset artists");
        match self.catalog.artists().await {
            Ok(rows) => QueryResult::ok(
                rows.into_iter()
                    .enumerate()
                    .map(|(i, row)| normalize_artist(row, i, &self.settings.defaults))
                    .collect(),
            ),
            Err(e) => QueryResult::failed(e),
        }
    }

    /// Tracks for an artist: its known track ids first, then a name search.
    pub async fn artist_tracks(&self, artist: &Artist) -> QueryResult<Vec<Track>> {
        let mut tracks = Vec::new();
        for id in &artist.track_ids {
            if let Some(track) = self.find_track(id).await {
                tracks.push(track);
            }
        }
        if !tracks.is_empty() {
            return QueryResult::ok(tracks);
        }

        let wanted = artist.name.to_lowercase();
        self.search(&artist.name).await.map(|found| {
            found
                .into_iter()
                .filter(|t| t.artist.to_lowercase() == wanted)
                .collect()
        })
    }

    /// Playlists of the signed-in user, or the dataset playlists.
    pub async fn playlists(&self) -> QueryResult<Vec<Playlist>> {
        match self.remote.session() {
            Some(session) => {
                let result = self.remote.playlists_for_user(&session.user_id).await;
                if let Some(items) = remote_data("playlists", result) {
                    return QueryResult::ok(
                        items
                            .into_iter()
                            .map(|p| normalize_playlist(PlaylistRecord::Remote(p)))
                            .collect(),
                    );
                }
            }
            None => tracing::debug!("playlists: no session, skipping remote"),
        }

        match self.catalog.playlists().await {
            Ok(rows) => QueryResult::ok(
                rows.into_iter()
                    .map(|p| normalize_playlist(PlaylistRecord::Local(p)))
                    .collect(),
            ),
            Err(e) => QueryResult::failed(e),
        }
    }

    pub async fn playlist_tracks(&self, playlist_id: &str) -> QueryResult<PlaylistTracks> {
        match self.remote.playlist_tracks(playlist_id).await {
            Ok(detail) if !detail.tracks.is_empty() => {
                tracing::debug!("playlist_tracks: remote returned {} records", detail.tracks.len());
                let count = detail.tracks.len();
                let tracks = self
                    .answer(detail.tracks.into_iter().map(CatalogRecord::Remote), count)
                    .data;
                let playlist = Playlist {
                    id: playlist_id.to_string(),
                    name: detail.name.unwrap_or_default(),
                    description: detail.description.filter(|d| !d.is_empty()),
                    track_ids: tracks.iter().map(|t| t.id.clone()).collect(),
                    created_at: None,
                };
                return QueryResult::ok(PlaylistTracks { playlist, tracks });
            }
            Ok(_) => tracing::info!("playlist_tracks: remote returned nothing, using local dataset"),
            Err(e) => tracing::info!("playlist_tracks: remote failed ({}), using local dataset", e),
        }

        match self.local_playlist_tracks(playlist_id).await {
            Ok(found) => QueryResult::ok(found),
            Err(e) => QueryResult::failed(e),
        }
    }

    async fn local_playlist_tracks(&self, playlist_id: &str) -> Result<PlaylistTracks, CatalogError> {
        let row = self
            .catalog
            .playlist_by_id(playlist_id)
            .await?
            .ok_or_else(|| CatalogError::NotFound(format!("playlist {}", playlist_id)))?;

        let mut records = Vec::with_capacity(row.tracks.len());
        for track_id in &row.tracks {
            match self.catalog.track_by_id(track_id).await? {
                Some(track) => records.push(CatalogRecord::Local {
                    row: track,
                    label: SourceLabel::Playlist,
                }),
                None => tracing::debug!("Playlist {} references unknown track {}", playlist_id, track_id),
            }
        }

        let count = records.len();
        let tracks = self.answer(records.into_iter(), count).data;
        Ok(PlaylistTracks {
            playlist: normalize_playlist(PlaylistRecord::Local(row)),
            tracks,
        })
    }

    /// A track previously returned by any query
    pub fn cached_track(&self, id: &str) -> Option<Track> {
        self.track_cache
            .lock()
            .ok()
            .and_then(|mut cache| cache.get(id).cloned())
    }

    /// Look a track up by id: recent results first, then the dataset.
    pub async fn find_track(&self, id: &str) -> Option<Track> {
        if let Some(track) = self.cached_track(id) {
            return Some(track);
        }

        let row = self.catalog.track_by_id(id).await.ok().flatten()?;
        let track = normalize_track(
            CatalogRecord::Local {
                row,
                label: SourceLabel::Local,
            },
            &self.settings.defaults,
        );
        self.remember(std::slice::from_ref(&track));
        Some(track)
    }

    /// Normalize, drop repeated ids, cap at `limit` and remember the tracks
    fn answer(
        &self,
        records: impl Iterator<Item = CatalogRecord>,
        limit: usize,
    ) -> QueryResult<Vec<Track>> {
        let mut tracks: Vec<Track> = Vec::new();
        for record in records {
            if tracks.len() >= limit {
                break;
            }
            let track = normalize_track(record, &self.settings.defaults);
            if tracks.iter().any(|t| t.id == track.id) {
                continue;
            }
            tracks.push(track);
        }

        self.remember(&tracks);
        QueryResult::ok(tracks)
    }

    fn remember(&self, tracks: &[Track]) {
        if let Ok(mut cache) = self.track_cache.lock() {
            for track in tracks {
                cache.put(track.id.clone(), track.clone());
            }
        }
    }
}
