//! Mapping from the two record schemas (remote service rows, bundled dataset
//! rows) into the canonical model.
//!
//! Every path that produces a [`Track`] or [`Playlist`] goes through
//! [`normalize_track`] / [`normalize_playlist`] so both backends yield the same
//! shape, including fabricated play counts and external references where the
//! local schema has none.

use chrono::Utc;
use rand::Rng;
use serde::{Deserialize, Deserializer};

use super::{Artist, Playlist, RemotePlaylist, RemoteTrack, SourceLabel, Track};
use crate::catalog::{LocalArtist, LocalPlaylist, LocalTrack};

const UNKNOWN_ARTIST: &str = "Unknown Artist";
const UNKNOWN_GENRE: &str = "Unknown";
const DEFAULT_DURATION: &str = "3:30";
const DEFAULT_ARTIST_GENRE: &str = "Pop";

const VIDEO_ID_CHARS: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789-_";
const BASE36_CHARS: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// A track row from either backend
#[derive(Debug, Clone)]
pub enum CatalogRecord {
    Remote(RemoteTrack),
    /// Dataset row plus the provenance label the fallback path assigns
    Local { row: LocalTrack, label: SourceLabel },
}

/// A playlist row from either backend
#[derive(Debug, Clone)]
pub enum PlaylistRecord {
    Remote(RemotePlaylist),
    Local(LocalPlaylist),
}

/// Values substituted when a record leaves a field blank
#[derive(Debug, Clone)]
pub struct TrackDefaults {
    pub fallback_cover: String,
}

impl Default for TrackDefaults {
    fn default() -> Self {
        Self {
            fallback_cover: "/assets/images/fallback.svg".to_string(),
        }
    }
}

pub fn normalize_track(record: CatalogRecord, defaults: &TrackDefaults) -> Track {
    match record {
        CatalogRecord::Remote(item) => {
            let playable_reference = item
                .external_id
                .as_deref()
                .and_then(playable_reference)
                .unwrap_or_default();

            Track {
                id: item.id.unwrap_or_else(generated_record_id),
                title: item.name.unwrap_or_default(),
                artist: non_empty(item.user_name).unwrap_or_else(|| UNKNOWN_ARTIST.to_string()),
                duration_label: non_empty(item.duration)
                    .unwrap_or_else(|| DEFAULT_DURATION.to_string()),
                cover_url: non_empty(item.img).unwrap_or_else(|| defaults.fallback_cover.clone()),
                playable_reference,
                genre: Some(non_empty(item.genre).unwrap_or_else(|| UNKNOWN_GENRE.to_string())),
                source_label: SourceLabel::Remote,
                play_count: item
                    .play_count
                    .unwrap_or_else(|| synthetic_play_count(SourceLabel::Remote)),
                external_id: item.external_id,
            }
        }
        CatalogRecord::Local { row, label } => Track {
            id: row.id,
            title: row.title,
            artist: non_empty(Some(row.artist)).unwrap_or_else(|| UNKNOWN_ARTIST.to_string()),
            duration_label: non_empty(row.duration)
                .unwrap_or_else(|| DEFAULT_DURATION.to_string()),
            cover_url: non_empty(row.cover).unwrap_or_else(|| defaults.fallback_cover.clone()),
            playable_reference: row.audio_src.unwrap_or_default(),
            genre: non_empty(row.genre),
            source_label: label,
            play_count: synthetic_play_count(label),
            external_id: Some(synthetic_external_id()),
        },
    }
}

pub fn normalize_playlist(record: PlaylistRecord) -> Playlist {
    match record {
        PlaylistRecord::Remote(item) => Playlist {
            id: item.id,
            name: item.name,
            description: non_empty(item.description),
            track_ids: Vec::new(),
            created_at: None,
        },
        PlaylistRecord::Local(row) => {
            let mut playlist = Playlist {
                id: row.id,
                name: row.name,
                description: non_empty(row.description),
                track_ids: Vec::new(),
                created_at: None,
            };
            playlist.merge_track_ids(&row.tracks);
            playlist
        }
    }
}

/// Dataset artist with synthesized popularity figures
pub fn normalize_artist(row: LocalArtist, index: usize, defaults: &TrackDefaults) -> Artist {
    let mut rng = rand::thread_rng();
    Artist {
        id: row.id.unwrap_or_else(|| format!("artist_{}", index + 1)),
        name: row.name,
        genre: non_empty(row.genre).unwrap_or_else(|| DEFAULT_ARTIST_GENRE.to_string()),
        popularity: rng.gen_range(0..=100),
        follower_count: rng.gen_range(0..1_000_000),
        track_ids: row.tracks,
        image_url: Some(defaults.fallback_cover.clone()),
        description: non_empty(row.description),
    }
}

/// Group tracks by exact artist name, first-seen order.
///
/// Popularity and follower counts are random; only names, ids and track
/// grouping carry meaning.
pub fn artists_from_tracks(tracks: &[Track]) -> Vec<Artist> {
    let mut rng = rand::thread_rng();
    let mut artists: Vec<Artist> = Vec::new();

    for track in tracks {
        if track.artist.is_empty() {
            continue;
        }
        if let Some(artist) = artists.iter_mut().find(|a| a.name == track.artist) {
            artist.track_ids.push(track.id.clone());
            continue;
        }
        artists.push(Artist {
            id: format!("artist_{}", artists.len() + 1),
            name: track.artist.clone(),
            genre: track
                .genre
                .clone()
                .unwrap_or_else(|| DEFAULT_ARTIST_GENRE.to_string()),
            popularity: rng.gen_range(0..=100),
            follower_count: rng.gen_range(0..1_000_000),
            track_ids: vec![track.id.clone()],
            image_url: Some(track.cover_url.clone()),
            description: None,
        });
    }

    artists
}

/// Streamable URL for a recognized `<provider>/<id>` reference
pub fn playable_reference(external_id: &str) -> Option<String> {
    let (provider, id) = external_id.split_once('/')?;
    if id.is_empty() {
        return None;
    }
    match provider {
        "yt" => Some(format!("https://www.youtube.com/watch?v={}", id)),
        "vi" => Some(format!("https://vimeo.com/{}", id)),
        "dm" => Some(format!("https://www.dailymotion.com/video/{}", id)),
        _ => None,
    }
}

/// A plausible YouTube reference for records that have none
pub fn synthetic_external_id() -> String {
    format!("yt/{}", random_string(VIDEO_ID_CHARS, 11))
}

pub fn synthetic_play_count(label: SourceLabel) -> u64 {
    let mut rng = rand::thread_rng();
    match label {
        SourceLabel::Trending => rng.gen_range(10_000..100_000),
        _ => rng.gen_range(0..10_000),
    }
}

fn generated_record_id() -> String {
    format!(
        "openwhyd_{}_{}",
        Utc::now().timestamp_millis(),
        random_string(BASE36_CHARS, 7)
    )
}

fn random_string(alphabet: &[u8], len: usize) -> String {
    let mut rng = rand::thread_rng();
    (0..len)
        .map(|_| alphabet[rng.gen_range(0..alphabet.len())] as char)
        .collect()
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.trim().is_empty())
}

// IDs show up as numbers in the dataset and sometimes in API payloads.

#[derive(Deserialize)]
#[serde(untagged)]
enum StringOrNumber {
    String(String),
    Int(i64),
    Float(f64),
}

impl StringOrNumber {
    fn into_string(self) -> String {
        match self {
            StringOrNumber::String(s) => s,
            StringOrNumber::Int(n) => n.to_string(),
            StringOrNumber::Float(f) if f.fract() == 0.0 => format!("{}", f as i64),
            StringOrNumber::Float(f) => f.to_string(),
        }
    }
}

pub fn string_or_number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    StringOrNumber::deserialize(deserializer).map(StringOrNumber::into_string)
}

pub fn opt_string_or_number<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<String>, D::Error> {
    Option::<StringOrNumber>::deserialize(deserializer).map(|v| v.map(StringOrNumber::into_string))
}

pub fn vec_string_or_number<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Vec<String>, D::Error> {
    Vec::<StringOrNumber>::deserialize(deserializer)
        .map(|v| v.into_iter().map(StringOrNumber::into_string).collect())
}
