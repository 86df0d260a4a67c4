//! Playlist, favorites, play-history and session persistence.
//!
//! Mutations go to the remote service while a session is active and fall back
//! to durable local storage on any remote failure or when anonymous. Every
//! local mutation re-reads the stored value right before writing it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::error::CatalogError;
use crate::history::{PlayEntry, PlayHistory};
use crate::service::normalize::{normalize_playlist, PlaylistRecord};
use crate::service::{
    is_local_playlist_id, CatalogRemote, Playlist, PlaylistTracks, QueryResult, RemoteUser, Resolver,
    Session, SourceLabel, Track, FAVORITES_PLAYLIST_ID, LOCAL_PLAYLIST_PREFIX,
};
use crate::storage::{
    read_json, write_json, KvStore, FAVORITES_KEY, PLAYLISTS_KEY, PLAYLISTS_META_KEY, SESSION_KEY,
};

const FAVORITES_NAME: &str = "Favorites";
const FAVORITES_DESCRIPTION: &str = "Your favorite tracks";

/// Lightweight track reference kept in local playlists
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackRef {
    pub id: String,
    pub title: String,
    pub artist: String,
    pub cover: String,
    /// Milliseconds since epoch when the track was added
    pub timestamp: i64,
}

impl TrackRef {
    fn from_track(track: &Track) -> Self {
        Self {
            id: track.id.clone(),
            title: track.title.clone(),
            artist: track.artist.clone(),
            cover: track.cover_url.clone(),
            timestamp: Utc::now().timestamp_millis(),
        }
    }

    fn to_track(&self) -> Track {
        Track {
            id: self.id.clone(),
            title: self.title.clone(),
            artist: self.artist.clone(),
            cover_url: self.cover.clone(),
            source_label: SourceLabel::Local,
            ..Default::default()
        }
    }
}

/// Metadata of a playlist created on this device
#[derive(Debug, Clone, Serialize, Deserialize)]
struct PlaylistMeta {
    id: String,
    name: String,
    #[serde(default)]
    description: String,
    /// Creation time, milliseconds since epoch
    timestamp: i64,
}

impl PlaylistMeta {
    fn to_playlist(&self) -> Playlist {
        Playlist {
            id: self.id.clone(),
            name: self.name.clone(),
            description: Some(self.description.clone()).filter(|d| !d.is_empty()),
            track_ids: Vec::new(),
            created_at: DateTime::from_timestamp_millis(self.timestamp),
        }
    }
}

type TrackRefMap = BTreeMap<String, Vec<TrackRef>>;

/// Produces local playlist ids: the local prefix plus a strictly increasing
/// microsecond timestamp.
#[derive(Debug, Default)]
pub struct LocalIdGenerator {
    last: AtomicU64,
}

impl LocalIdGenerator {
    pub fn next_id(&self) -> String {
        let now = Utc::now().timestamp_micros().max(0) as u64;
        let prev = self
            .last
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |last| {
                Some(now.max(last + 1))
            })
            .unwrap_or_else(|v| v);
        format!("{}{}", LOCAL_PLAYLIST_PREFIX, now.max(prev + 1))
    }
}

fn favorites_playlist() -> Playlist {
    Playlist {
        id: FAVORITES_PLAYLIST_ID.to_string(),
        name: FAVORITES_NAME.to_string(),
        description: Some(FAVORITES_DESCRIPTION.to_string()),
        track_ids: Vec::new(),
        created_at: None,
    }
}

/// Union of two ref lists by id, `first` wins and keeps its order
fn merge_refs(first: Vec<TrackRef>, second: &[TrackRef]) -> Vec<TrackRef> {
    let mut merged = first;
    for r in second {
        if !merged.iter().any(|m| m.id == r.id) {
            merged.push(r.clone());
        }
    }
    merged
}

pub struct PlaylistStore {
    resolver: Arc<Resolver>,
    store: Arc<dyn KvStore>,
    history: PlayHistory,
    ids: LocalIdGenerator,
    /// Serializes read-modify-write sequences on the playlist namespaces
    mutation: Mutex<()>,
}

impl PlaylistStore {
    pub fn new(resolver: Arc<Resolver>, store: Arc<dyn KvStore>, history_size: usize) -> Self {
        Self {
            history: PlayHistory::new(store.clone(), history_size),
            resolver,
            store,
            ids: LocalIdGenerator::default(),
            mutation: Mutex::new(()),
        }
    }

    fn remote(&self) -> &Arc<dyn CatalogRemote> {
        self.resolver.remote()
    }

    pub fn session(&self) -> Option<Session> {
        self.remote().session()
    }

    // === Reads ===

    /// Favorites, then playlists created here, then remote or dataset playlists.
    ///
    /// Locally stored playlists are always listed; if the resolved part cannot
    /// be produced its error is carried alongside them.
    pub async fn list_playlists(&self) -> QueryResult<Vec<Playlist>> {
        let refs: TrackRefMap = read_json(self.store.as_ref(), PLAYLISTS_KEY).await;
        let metas: Vec<PlaylistMeta> = read_json(self.store.as_ref(), PLAYLISTS_META_KEY).await;

        let mut favorites = favorites_playlist();
        favorites.merge_track_ids(self.favorite_refs(&refs).await.iter().map(|r| &r.id));

        let mut playlists = vec![favorites];
        for meta in &metas {
            let mut playlist = meta.to_playlist();
            if let Some(tracks) = refs.get(&meta.id) {
                playlist.merge_track_ids(tracks.iter().map(|r| &r.id));
            }
            playlists.push(playlist);
        }

        let resolved = self.resolver.playlists().await;
        let error = resolved.error.clone();
        for mut playlist in resolved.data {
            if is_local_playlist_id(&playlist.id) || playlists.iter().any(|p| p.id == playlist.id) {
                continue;
            }
            if let Some(tracks) = refs.get(&playlist.id) {
                playlist.merge_track_ids(tracks.iter().map(|r| &r.id));
            }
            playlists.push(playlist);
        }

        if let Some(ref e) = error {
            tracing::warn!("Listing only local playlists: {}", e);
        }
        QueryResult {
            success: true,
            data: playlists,
            error,
        }
    }

    pub async fn get_tracks(&self, playlist_id: &str) -> QueryResult<PlaylistTracks> {
        let refs: TrackRefMap = read_json(self.store.as_ref(), PLAYLISTS_KEY).await;

        if is_local_playlist_id(playlist_id) {
            return match self.local_playlist(playlist_id, &refs).await {
                Ok(found) => QueryResult::ok(found),
                Err(e) => QueryResult::failed(e),
            };
        }

        let stored = refs.get(playlist_id).cloned().unwrap_or_default();
        let resolved = self.resolver.playlist_tracks(playlist_id).await;
        if !resolved.success && stored.is_empty() {
            return resolved;
        }

        let mut found = if resolved.success {
            resolved.data
        } else {
            PlaylistTracks {
                playlist: Playlist {
                    id: playlist_id.to_string(),
                    name: playlist_id.to_string(),
                    ..Default::default()
                },
                tracks: Vec::new(),
            }
        };
        for r in &stored {
            if !found.tracks.iter().any(|t| t.id == r.id) {
                found.tracks.push(self.resolve_ref(r).await);
            }
        }
        found.playlist.merge_track_ids(stored.iter().map(|r| &r.id));
        QueryResult::ok(found)
    }

    async fn local_playlist(
        &self,
        playlist_id: &str,
        refs: &TrackRefMap,
    ) -> Result<PlaylistTracks, CatalogError> {
        let (mut playlist, stored) = if playlist_id == FAVORITES_PLAYLIST_ID {
            (favorites_playlist(), self.favorite_refs(refs).await)
        } else {
            let metas: Vec<PlaylistMeta> =
                read_json(self.store.as_ref(), PLAYLISTS_META_KEY).await;
            let meta = metas
                .iter()
                .find(|m| m.id == playlist_id)
                .ok_or_else(|| CatalogError::NotFound(format!("playlist {}", playlist_id)))?;
            (
                meta.to_playlist(),
                refs.get(playlist_id).cloned().unwrap_or_default(),
            )
        };

        let mut tracks = Vec::with_capacity(stored.len());
        for r in &stored {
            tracks.push(self.resolve_ref(r).await);
        }
        playlist.merge_track_ids(stored.iter().map(|r| &r.id));
        Ok(PlaylistTracks { playlist, tracks })
    }

    /// Full track for a stored reference when still known, otherwise the reference itself
    async fn resolve_ref(&self, r: &TrackRef) -> Track {
        match self.resolver.find_track(&r.id).await {
            Some(track) => track,
            None => r.to_track(),
        }
    }

    /// Favorites mirror first, then anything under the general namespace
    async fn favorite_refs(&self, refs: &TrackRefMap) -> Vec<TrackRef> {
        let mirror: Vec<TrackRef> = read_json(self.store.as_ref(), FAVORITES_KEY).await;
        let general = refs.get(FAVORITES_PLAYLIST_ID).cloned().unwrap_or_default();
        merge_refs(mirror, &general)
    }

    // === Mutations ===

    pub async fn create_playlist(
        &self,
        name: &str,
        description: &str,
    ) -> Result<Playlist, CatalogError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(CatalogError::validation("Playlist name must not be empty"));
        }

        if self.remote().is_authenticated() {
            match self.remote().create_playlist(name, description).await {
                Ok(created) if !created.id.is_empty() => {
                    tracing::info!("Created remote playlist {}", created.id);
                    let mut playlist = normalize_playlist(PlaylistRecord::Remote(created));
                    if playlist.name.is_empty() {
                        playlist.name = name.to_string();
                    }
                    return Ok(playlist);
                }
                Ok(_) => tracing::info!("Remote playlist creation returned no id, storing locally"),
                Err(e) => tracing::info!("Remote playlist creation failed ({}), storing locally", e),
            }
        }

        let _guard = self.mutation.lock().await;
        let mut metas: Vec<PlaylistMeta> = read_json(self.store.as_ref(), PLAYLISTS_META_KEY).await;

        let mut id = self.ids.next_id();
        while metas.iter().any(|m| m.id == id) {
            id = self.ids.next_id();
        }

        let meta = PlaylistMeta {
            id: id.clone(),
            name: name.to_string(),
            description: description.to_string(),
            timestamp: Utc::now().timestamp_millis(),
        };
        metas.push(meta.clone());
        write_json(self.store.as_ref(), PLAYLISTS_META_KEY, &metas).await?;

        let mut refs: TrackRefMap = read_json(self.store.as_ref(), PLAYLISTS_KEY).await;
        refs.entry(id.clone()).or_default();
        write_json(self.store.as_ref(), PLAYLISTS_KEY, &refs).await?;

        tracing::debug!("Created local playlist {}", id);
        Ok(meta.to_playlist())
    }

    /// Add `track` to a playlist. Adding a track already present succeeds without change.
    pub async fn add_track(&self, playlist_id: &str, track: &Track) -> Result<(), CatalogError> {
        if track.id.trim().is_empty() {
            return Err(CatalogError::validation("track id must not be empty"));
        }
        if !is_local_playlist_id(playlist_id) && self.remote().is_authenticated() {
            match self.remote().add_track(playlist_id, track).await {
                Ok(true) => return Ok(()),
                Ok(false) => tracing::info!("Remote refused track {}, storing locally", track.id),
                Err(e) => tracing::info!("Remote add track failed ({}), storing locally", e),
            }
        }

        let _guard = self.mutation.lock().await;
        if playlist_id.starts_with(LOCAL_PLAYLIST_PREFIX) {
            self.require_local_playlist(playlist_id).await?;
        }

        let mut refs: TrackRefMap = read_json(self.store.as_ref(), PLAYLISTS_KEY).await;
        let mut list = if playlist_id == FAVORITES_PLAYLIST_ID {
            self.favorite_refs(&refs).await
        } else {
            refs.get(playlist_id).cloned().unwrap_or_default()
        };

        if list.iter().any(|r| r.id == track.id) {
            tracing::debug!("Track {} already in {}", track.id, playlist_id);
            return Ok(());
        }
        list.push(TrackRef::from_track(track));

        self.store_refs(playlist_id, &mut refs, list).await
    }

    /// Resolve `track_id` through recent results or the dataset, then add it
    pub async fn add_track_by_id(
        &self,
        playlist_id: &str,
        track_id: &str,
    ) -> Result<Track, CatalogError> {
        let track = self
            .resolver
            .find_track(track_id)
            .await
            .ok_or_else(|| CatalogError::validation("track not found"))?;
        self.add_track(playlist_id, &track).await?;
        Ok(track)
    }

    /// Remove a track from the locally stored copy of a playlist. Absent tracks are a no-op.
    pub async fn remove_track(&self, playlist_id: &str, track_id: &str) -> Result<(), CatalogError> {
        let _guard = self.mutation.lock().await;
        let mut refs: TrackRefMap = read_json(self.store.as_ref(), PLAYLISTS_KEY).await;
        let mut list = if playlist_id == FAVORITES_PLAYLIST_ID {
            self.favorite_refs(&refs).await
        } else {
            refs.get(playlist_id).cloned().unwrap_or_default()
        };

        let before = list.len();
        list.retain(|r| r.id != track_id);
        if list.len() == before {
            return Ok(());
        }

        self.store_refs(playlist_id, &mut refs, list).await
    }

    async fn store_refs(
        &self,
        playlist_id: &str,
        refs: &mut TrackRefMap,
        list: Vec<TrackRef>,
    ) -> Result<(), CatalogError> {
        if playlist_id == FAVORITES_PLAYLIST_ID {
            write_json(self.store.as_ref(), FAVORITES_KEY, &list).await?;
        }
        refs.insert(playlist_id.to_string(), list);
        write_json(self.store.as_ref(), PLAYLISTS_KEY, refs).await
    }

    async fn require_local_playlist(&self, playlist_id: &str) -> Result<(), CatalogError> {
        let metas: Vec<PlaylistMeta> = read_json(self.store.as_ref(), PLAYLISTS_META_KEY).await;
        if metas.iter().any(|m| m.id == playlist_id) {
            Ok(())
        } else {
            Err(CatalogError::NotFound(format!("playlist {}", playlist_id)))
        }
    }

    // === Play history ===

    pub async fn record_play(&self, track_id: &str) -> Result<(), CatalogError> {
        if track_id.is_empty() {
            return Err(CatalogError::validation("track id must not be empty"));
        }
        let _guard = self.mutation.lock().await;
        self.history.record(track_id).await.map(|_| ())
    }

    pub async fn recent_plays(&self, limit: usize) -> Vec<PlayEntry> {
        self.history.recent(limit).await
    }

    // === Session ===

    /// Sign in with the remote service and persist the session
    pub async fn login(&self, email: &str, password: &str) -> Result<Session, CatalogError> {
        if email.trim().is_empty() || password.is_empty() {
            return Err(CatalogError::validation("email and password are required"));
        }

        let mut session = self.remote().login(email.trim(), password).await?;
        match self.remote().who_am_i().await {
            Ok(user) => session = self.adopt_user_id(session, &user),
            Err(e) => tracing::warn!("Could not look up signed-in user: {}", e),
        }
        if let Err(e) = write_json(self.store.as_ref(), SESSION_KEY, &session).await {
            tracing::warn!("Session will not survive a restart: {}", e);
        }
        Ok(session)
    }

    pub async fn logout(&self) -> Result<(), CatalogError> {
        self.remote().set_session(None);
        self.store.remove(SESSION_KEY).await?;
        tracing::info!("Logged out");
        Ok(())
    }

    /// Take the account id reported by `/me` as the session's user id
    fn adopt_user_id(&self, mut session: Session, user: &RemoteUser) -> Session {
        if let Some(id) = user.id.as_deref().filter(|id| *id != session.user_id) {
            tracing::debug!("Session user id {} -> {}", session.user_id, id);
            session.user_id = id.to_string();
            self.remote().set_session(Some(session.clone()));
        }
        session
    }

    /// Reinstate the stored session if the remote service still accepts it.
    ///
    /// A rejected or unreadable check destroys the stored session; an
    /// unreachable service leaves it stored for the next start.
    pub async fn restore_session(&self) -> Option<Session> {
        let stored: Option<Session> = read_json(self.store.as_ref(), SESSION_KEY).await;
        let session = stored?;

        self.remote().set_session(Some(session.clone()));
        match self.remote().who_am_i().await {
            Ok(user) => {
                let changed = user.id.as_deref().is_some_and(|id| id != session.user_id);
                let session = self.adopt_user_id(session, &user);
                if changed {
                    if let Err(e) = write_json(self.store.as_ref(), SESSION_KEY, &session).await {
                        tracing::warn!("Failed to update stored session: {}", e);
                    }
                }
                tracing::info!(
                    "Restored session for {}",
                    user.name.as_deref().unwrap_or(&session.user_id)
                );
                Some(session)
            }
            Err(CatalogError::Network(e)) => {
                tracing::warn!("Could not verify stored session, continuing signed out: {}", e);
                self.remote().set_session(None);
                None
            }
            Err(e) => {
                tracing::info!("Stored session rejected ({}), discarding", e);
                self.remote().set_session(None);
                if let Err(e) = self.store.remove(SESSION_KEY).await {
                    tracing::warn!("Failed to discard stored session: {}", e);
                }
                None
            }
        }
    }
}
