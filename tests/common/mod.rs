#![allow(dead_code)]

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use mysic::catalog::LocalCatalog;
use mysic::config::Config;
use mysic::service::{
    CatalogRemote, RemotePlaylist, RemotePlaylistDetail, RemoteTrack, RemoteUser, Session, Track,
};
use mysic::storage::{KvStore, MemoryStore};
use mysic::{CatalogContext, CatalogError};

pub const DATASET: &str = r#"{
    "tracks": [
        {"id": 1, "title": "A", "artist": "Satu", "duration": "3:01", "cover": "/img/a.jpg", "audioSrc": "/audio/a.mp3", "genre": "Rock"},
        {"id": 2, "title": "B", "artist": "Dua", "duration": "2:45", "cover": "/img/b.jpg", "audioSrc": "/audio/b.mp3", "genre": "Pop"},
        {"id": 3, "title": "C", "artist": "Satu", "duration": "4:20", "genre": "Jazz"}
    ],
    "artists": [
        {"name": "Satu", "genre": "Rock", "tracks": [1, 3]},
        {"name": "Dua", "genre": "Pop", "tracks": [2]}
    ],
    "playlists": [
        {"id": 1, "name": "Santai", "description": "Lagu santai", "tracks": [2, 3]}
    ]
}"#;

/// Remote whose search answer is fixed up front. `None` means unreachable.
pub struct ScriptedRemote {
    pub search_reply: Option<Vec<RemoteTrack>>,
    pub search_calls: AtomicUsize,
    pub mutation_calls: AtomicUsize,
    session: Mutex<Option<Session>>,
}

impl ScriptedRemote {
    pub fn unreachable() -> Self {
        Self {
            search_reply: None,
            search_calls: AtomicUsize::new(0),
            mutation_calls: AtomicUsize::new(0),
            session: Mutex::new(None),
        }
    }

    pub fn answering(tracks: Vec<RemoteTrack>) -> Self {
        Self {
            search_reply: Some(tracks),
            ..Self::unreachable()
        }
    }
}

fn down() -> CatalogError {
    CatalogError::Network("connection refused".to_string())
}

#[async_trait]
impl CatalogRemote for ScriptedRemote {
    fn session(&self) -> Option<Session> {
        self.session.lock().ok().and_then(|s| s.clone())
    }

    fn set_session(&self, session: Option<Session>) {
        if let Ok(mut guard) = self.session.lock() {
            *guard = session;
        }
    }

    async fn search(&self, _query: &str, _limit: usize) -> Result<Vec<RemoteTrack>, CatalogError> {
        self.search_calls.fetch_add(1, Ordering::SeqCst);
        self.search_reply.clone().ok_or_else(down)
    }

    async fn hot_tracks(&self, _limit: usize) -> Result<Vec<RemoteTrack>, CatalogError> {
        Err(down())
    }

    async fn playlists_for_user(&self, _user_id: &str) -> Result<Vec<RemotePlaylist>, CatalogError> {
        Err(down())
    }

    async fn playlist_tracks(&self, _playlist_id: &str) -> Result<RemotePlaylistDetail, CatalogError> {
        Err(down())
    }

    async fn create_playlist(
        &self,
        _name: &str,
        _description: &str,
    ) -> Result<RemotePlaylist, CatalogError> {
        self.mutation_calls.fetch_add(1, Ordering::SeqCst);
        Err(down())
    }

    async fn add_track(&self, _playlist_id: &str, _track: &Track) -> Result<bool, CatalogError> {
        self.mutation_calls.fetch_add(1, Ordering::SeqCst);
        Err(down())
    }

    async fn login(&self, _email: &str, _password: &str) -> Result<Session, CatalogError> {
        Err(down())
    }

    async fn who_am_i(&self) -> Result<RemoteUser, CatalogError> {
        Err(down())
    }
}

pub fn context_with(remote: Arc<ScriptedRemote>, dataset: &str) -> CatalogContext {
    context_with_store(remote, dataset, Arc::new(MemoryStore::new()))
}

pub fn context_with_store(
    remote: Arc<ScriptedRemote>,
    dataset: &str,
    store: Arc<dyn KvStore>,
) -> CatalogContext {
    CatalogContext::new(
        Config::default(),
        remote,
        Arc::new(LocalCatalog::from_json(dataset)),
        store,
    )
}

pub fn remote_track(id: &str, name: &str) -> RemoteTrack {
    RemoteTrack {
        id: Some(id.to_string()),
        name: Some(name.to_string()),
        user_name: Some("Remote Artist".to_string()),
        external_id: Some(format!("vi/{}", id)),
        ..Default::default()
    }
}
