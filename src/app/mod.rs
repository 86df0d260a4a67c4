pub mod presenter;
pub mod state;

use std::collections::HashMap;

use crate::context::CatalogContext;
use crate::service::{Artist, CatalogRemote, QueryResult};

pub use presenter::Presenter;
pub use state::{MessageLevel, RequestToken, StatusMessage, ViewMode};

/// Turns user intents into core calls and hands the answers to a [`Presenter`].
pub struct App<P: Presenter> {
    context: CatalogContext,
    presenter: P,
    next_seq: u64,
    latest: HashMap<ViewMode, u64>,
    /// Last artist recommendations, for opening an artist by name
    artists: Vec<Artist>,
}

impl<P: Presenter> App<P> {
    pub fn new(context: CatalogContext, presenter: P) -> Self {
        Self {
            context,
            presenter,
            next_seq: 0,
            latest: HashMap::new(),
            artists: Vec::new(),
        }
    }

    pub fn context(&self) -> &CatalogContext {
        &self.context
    }

    pub fn presenter(&self) -> &P {
        &self.presenter
    }

    /// Stamp a new request for `view`, superseding any earlier one
    pub fn begin(&mut self, view: ViewMode) -> RequestToken {
        self.next_seq += 1;
        self.latest.insert(view, self.next_seq);
        RequestToken {
            view,
            seq: self.next_seq,
        }
    }

    /// True while no newer request for the same view has been issued
    pub fn is_current(&self, token: RequestToken) -> bool {
        self.latest.get(&token.view) == Some(&token.seq)
    }

    /// Restore the stored session and tell the presenter who is signed in
    pub async fn start(&mut self) {
        let session = self.context.start().await;
        self.presenter.session_changed(session.as_ref());
    }

    pub async fn search(&mut self, query: &str) -> RequestToken {
        let token = self.begin(ViewMode::Tracks);
        let result = self.context.resolver.search(query).await;
        if self.is_current(token) {
            let heading = if query.trim().is_empty() {
                "All tracks".to_string()
            } else {
                format!("Results for \"{}\"", query.trim())
            };
            self.presenter.show_tracks(token, &heading, &result);
        }
        token
    }

    pub async fn hot(&mut self) -> RequestToken {
        let token = self.begin(ViewMode::Tracks);
        let limit = self.context.resolver.settings().hot_limit;
        let result = self.context.resolver.hot_tracks(limit).await;
        if self.is_current(token) {
            self.presenter.show_tracks(token, "Trending", &result);
        }
        token
    }

    pub async fn artists(&mut self) -> RequestToken {
        let token = self.begin(ViewMode::Artists);
        let result = self.context.resolver.artist_recommendations().await;
        if result.success {
            self.artists = result.data.clone();
        }
        if self.is_current(token) {
            self.presenter.show_artists(token, &result);
        }
        token
    }

    /// Show the tracks of an artist, matched by id or name
    pub async fn open_artist(&mut self, name_or_id: &str) -> RequestToken {
        if self.find_artist(name_or_id).is_none() {
            let recommended = self.context.resolver.artist_recommendations().await;
            self.artists = recommended.data;
        }
        let artist = self.find_artist(name_or_id).unwrap_or_else(|| Artist {
            name: name_or_id.to_string(),
            ..Default::default()
        });

        let token = self.begin(ViewMode::Tracks);
        let result = self.context.resolver.artist_tracks(&artist).await;
        if self.is_current(token) {
            self.presenter.show_tracks(token, &artist.name, &result);
        }
        token
    }

    fn find_artist(&self, name_or_id: &str) -> Option<Artist> {
        let wanted = name_or_id.to_lowercase();
        self.artists
            .iter()
            .find(|a| a.id == name_or_id || a.name.to_lowercase() == wanted)
            .cloned()
    }

    pub async fn playlists(&mut self) -> RequestToken {
        let token = self.begin(ViewMode::Playlists);
        let result = self.context.playlists.list_playlists().await;
        if self.is_current(token) {
            self.presenter.show_playlists(token, &result);
        }
        token
    }

    pub async fn open_playlist(&mut self, playlist_id: &str) -> RequestToken {
        let token = self.begin(ViewMode::PlaylistDetail);
        let result = self.context.playlists.get_tracks(playlist_id).await;
        if self.is_current(token) {
            self.presenter.show_playlist(token, &result);
        }
        token
    }

    pub async fn history(&mut self, limit: usize) -> RequestToken {
        let token = self.begin(ViewMode::History);
        let entries = self.context.playlists.recent_plays(limit).await;
        if self.is_current(token) {
            self.presenter.show_history(token, &entries);
        }
        token
    }

    // === Commands ===

    pub async fn create_playlist(&mut self, name: &str, description: &str) -> bool {
        match self.context.playlists.create_playlist(name, description).await {
            Ok(playlist) => {
                self.presenter.notify(StatusMessage::info(format!(
                    "Created playlist '{}' ({})",
                    playlist.name, playlist.id
                )));
                true
            }
            Err(e) => self.report(e),
        }
    }

    pub async fn add_to_playlist(&mut self, playlist_id: &str, track_id: &str) -> bool {
        match self
            .context
            .playlists
            .add_track_by_id(playlist_id, track_id)
            .await
        {
            Ok(track) => {
                self.presenter.notify(StatusMessage::info(format!(
                    "Added '{}' to playlist",
                    track.title
                )));
                true
            }
            Err(e) => self.report(e),
        }
    }

    pub async fn remove_from_playlist(&mut self, playlist_id: &str, track_id: &str) -> bool {
        match self
            .context
            .playlists
            .remove_track(playlist_id, track_id)
            .await
        {
            Ok(()) => {
                self.presenter
                    .notify(StatusMessage::info("Removed from playlist"));
                true
            }
            Err(e) => self.report(e),
        }
    }

    pub async fn play(&mut self, track_id: &str) -> bool {
        let track = self.context.resolver.find_track(track_id).await;
        match self.context.playlists.record_play(track_id).await {
            Ok(()) => {
                let text = match track {
                    Some(t) if !t.playable_reference.is_empty() => {
                        format!("Playing '{}' ({})", t.title, t.playable_reference)
                    }
                    Some(t) => format!("Playing '{}' (no playable source)", t.title),
                    None => format!("Playing {}", track_id),
                };
                self.presenter.notify(StatusMessage::info(text));
                true
            }
            Err(e) => self.report(e),
        }
    }

    pub async fn login(&mut self, email: &str, password: &str) -> bool {
        match self.context.playlists.login(email, password).await {
            Ok(session) => {
                self.presenter.session_changed(Some(&session));
                true
            }
            Err(e) => self.report(e),
        }
    }

    pub async fn logout(&mut self) -> bool {
        match self.context.playlists.logout().await {
            Ok(()) => {
                self.presenter.session_changed(None);
                true
            }
            Err(e) => self.report(e),
        }
    }

    /// Ask the remote service who the current session belongs to
    pub async fn who_am_i(&mut self) -> bool {
        let remote = self.context.resolver.remote().clone();
        if !remote.is_authenticated() {
            self.presenter.notify(StatusMessage::info("Not signed in"));
            return false;
        }
        let answer: QueryResult<String> = match remote.who_am_i().await {
            Ok(user) => QueryResult::ok(
                user.name
                    .or(user.email)
                    .or(user.id)
                    .unwrap_or_default(),
            ),
            Err(e) => QueryResult::failed(e),
        };
        match answer.into_result() {
            Ok(name) => {
                self.presenter
                    .notify(StatusMessage::info(format!("Signed in as {}", name)));
                true
            }
            Err(e) => {
                self.presenter.notify(StatusMessage::error(e));
                false
            }
        }
    }

    fn report(&mut self, error: crate::error::CatalogError) -> bool {
        tracing::debug!("Command failed ({:?}): {}", error.kind(), error);
        self.presenter.notify(StatusMessage::error(error.to_string()));
        false
    }
}
