//! Scripted [`CatalogRemote`] for unit tests. Nothing here touches the network.

use async_trait::async_trait;
use chrono::Utc;
use std::sync::Mutex;

use super::{
    CatalogRemote, RemotePlaylist, RemotePlaylistDetail, RemoteTrack, RemoteUser, Session, Track,
};
use crate::error::CatalogError;

/// How `who_am_i` answers
#[derive(Clone)]
pub(crate) enum WhoAmI {
    User(RemoteUser),
    Http(u16),
    Unreachable,
}

/// `None` in any reply slot means the call fails as unreachable.
pub(crate) struct FakeRemote {
    session: Mutex<Option<Session>>,
    search: Option<Vec<RemoteTrack>>,
    hot: Option<Vec<RemoteTrack>>,
    playlists: Option<Vec<RemotePlaylist>>,
    detail: Option<RemotePlaylistDetail>,
    created: Option<RemotePlaylist>,
    add_ack: Option<bool>,
    login: Option<Session>,
    who: WhoAmI,
    calls: Mutex<Vec<&'static str>>,
}

impl FakeRemote {
    pub fn unreachable() -> Self {
        Self {
            session: Mutex::new(None),
            search: None,
            hot: None,
            playlists: None,
            detail: None,
            created: None,
            add_ack: None,
            login: None,
            who: WhoAmI::Unreachable,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn with_search(mut self, tracks: Vec<RemoteTrack>) -> Self {
        self.search = Some(tracks);
        self
    }

    pub fn with_hot(mut self, tracks: Vec<RemoteTrack>) -> Self {
        self.hot = Some(tracks);
        self
    }

    pub fn with_playlists(mut self, playlists: Vec<RemotePlaylist>) -> Self {
        self.playlists = Some(playlists);
        self
    }

    pub fn with_detail(mut self, detail: RemotePlaylistDetail) -> Self {
        self.detail = Some(detail);
        self
    }

    pub fn with_created(mut self, playlist: RemotePlaylist) -> Self {
        self.created = Some(playlist);
        self
    }

    pub fn with_add_ack(mut self, ack: bool) -> Self {
        self.add_ack = Some(ack);
        self
    }

    pub fn with_login(mut self, user_id: &str) -> Self {
        self.login = Some(session(user_id));
        self
    }

    pub fn with_who_am_i(mut self, who: WhoAmI) -> Self {
        self.who = who;
        self
    }

    pub fn signed_in(self, user_id: &str) -> Self {
        self.set_session(Some(session(user_id)));
        self
    }

    /// How many times `name` was called
    pub fn calls(&self, name: &str) -> usize {
        self.calls
            .lock()
            .map(|c| c.iter().filter(|n| **n == name).count())
            .unwrap_or(0)
    }

    fn record(&self, name: &'static str) {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(name);
        }
    }
}

pub(crate) fn session(user_id: &str) -> Session {
    Session {
        user_id: user_id.to_string(),
        email: format!("{}@example.com", user_id),
        established_at: Utc::now(),
        credential: Some(format!("whydSid={}", user_id)),
    }
}

pub(crate) fn remote_track(id: &str, name: &str, artist: &str) -> RemoteTrack {
    RemoteTrack {
        id: Some(id.to_string()),
        name: Some(name.to_string()),
        user_name: Some(artist.to_string()),
        img: Some(format!("https://img/{}.jpg", id)),
        external_id: Some(format!("yt/{}", id)),
        duration: Some("2:58".to_string()),
        play_count: Some(3),
        genre: None,
    }
}

fn unreachable_error() -> CatalogError {
    CatalogError::Network("connection refused".to_string())
}

fn reply<T: Clone>(slot: &Option<T>) -> Result<T, CatalogError> {
    slot.clone().ok_or_else(unreachable_error)
}

#[async_trait]
impl CatalogRemote for FakeRemote {
    fn session(&self) -> Option<Session> {
        self.session.lock().ok().and_then(|s| s.clone())
    }

    fn set_session(&self, session: Option<Session>) {
        if let Ok(mut guard) = self.session.lock() {
            *guard = session;
        }
    }

    async fn search(&self, _query: &str, _limit: usize) -> Result<Vec<RemoteTrack>, CatalogError> {
        self.record("search");
        reply(&self.search)
    }

    async fn hot_tracks(&self, _limit: usize) -> Result<Vec<RemoteTrack>, CatalogError> {
        self.record("hot_tracks");
        reply(&self.hot)
    }

    async fn playlists_for_user(&self, _user_id: &str) -> Result<Vec<RemotePlaylist>, CatalogError> {
        self.record("playlists_for_user");
        reply(&self.playlists)
    }

    async fn playlist_tracks(&self, _playlist_id: &str) -> Result<RemotePlaylistDetail, CatalogError> {
        self.record("playlist_tracks");
        reply(&self.detail)
    }

    async fn create_playlist(
        &self,
        _name: &str,
        _description: &str,
    ) -> Result<RemotePlaylist, CatalogError> {
        self.record("create_playlist");
        if !self.is_authenticated() {
            return Err(CatalogError::NotAuthenticated);
        }
        reply(&self.created)
    }

    async fn add_track(&self, _playlist_id: &str, _track: &Track) -> Result<bool, CatalogError> {
        self.record("add_track");
        if !self.is_authenticated() {
            return Err(CatalogError::NotAuthenticated);
        }
        reply(&self.add_ack)
    }

    async fn login(&self, _email: &str, _password: &str) -> Result<Session, CatalogError> {
        self.record("login");
        let session = self
            .login
            .clone()
            .ok_or_else(|| CatalogError::LoginRejected("Invalid credentials".to_string()))?;
        self.set_session(Some(session.clone()));
        Ok(session)
    }

    async fn who_am_i(&self) -> Result<RemoteUser, CatalogError> {
        self.record("who_am_i");
        match &self.who {
            WhoAmI::User(user) => Ok(user.clone()),
            WhoAmI::Http(status) => Err(CatalogError::Http(*status)),
            WhoAmI::Unreachable => Err(unreachable_error()),
        }
    }
}
