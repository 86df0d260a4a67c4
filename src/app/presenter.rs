use super::state::{RequestToken, StatusMessage};
use crate::history::PlayEntry;
use crate::service::{Artist, Playlist, PlaylistTracks, QueryResult, Session, Track};

/// Rendering side of the application. Whatever displays results implements this.
///
/// Query results arrive with the token of the request that produced them;
/// a renderer that can have several requests in flight should drop results
/// whose token is no longer current.
pub trait Presenter {
    fn show_tracks(&mut self, token: RequestToken, heading: &str, result: &QueryResult<Vec<Track>>);

    fn show_artists(&mut self, token: RequestToken, result: &QueryResult<Vec<Artist>>);

    fn show_playlists(&mut self, token: RequestToken, result: &QueryResult<Vec<Playlist>>);

    fn show_playlist(&mut self, token: RequestToken, result: &QueryResult<PlaylistTracks>);

    fn show_history(&mut self, token: RequestToken, entries: &[PlayEntry]);

    fn notify(&mut self, message: StatusMessage);

    fn session_changed(&mut self, session: Option<&Session>);
}
