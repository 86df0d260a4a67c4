use async_trait::async_trait;
use chrono::Utc;
use reqwest::{header, Client as HttpClient, Method, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::sync::RwLock;
use std::time::Duration;

use super::normalize::{opt_string_or_number, string_or_number};
use super::{CatalogRemote, Session, Track};
use crate::config::RemoteConfig;
use crate::error::CatalogError;

// API Response models

/// A track as the remote service returns it
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RemoteTrack {
    #[serde(rename = "_id", default, deserialize_with = "opt_string_or_number")]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    /// Uploader name, used as the artist
    #[serde(rename = "uNm", default)]
    pub user_name: Option<String>,
    #[serde(default)]
    pub img: Option<String>,
    /// `<provider>/<providerTrackId>`
    #[serde(rename = "eId", default)]
    pub external_id: Option<String>,
    #[serde(default, deserialize_with = "opt_string_or_number")]
    pub duration: Option<String>,
    #[serde(rename = "nbPlays", default)]
    pub play_count: Option<u64>,
    #[serde(default)]
    pub genre: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RemotePlaylist {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RemotePlaylistDetail {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub tracks: Vec<RemoteTrack>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RemoteUser {
    #[serde(default, deserialize_with = "opt_string_or_number")]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Debug, Deserialize)]
struct HotResponse {
    #[serde(default)]
    tracks: Vec<RemoteTrack>,
}

#[derive(Debug, Deserialize)]
struct LoginResponse {
    error: Option<String>,
    redirect: Option<String>,
    #[serde(default, deserialize_with = "opt_string_or_number")]
    uid: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AddTrackResponse {
    #[serde(default)]
    success: bool,
}

#[derive(Debug, Serialize)]
struct AddTrackRequest<'a> {
    #[serde(rename = "eId")]
    external_id: &'a str,
    name: &'a str,
    img: &'a str,
}

#[derive(Debug, Serialize)]
struct CreatePlaylistRequest<'a> {
    name: &'a str,
    description: &'a str,
}

/// HTTP client for the OpenWhyd API
pub struct OpenWhydClient {
    http_client: HttpClient,
    base_url: String,
    api_path: String,
    session: RwLock<Option<Session>>,
}

impl OpenWhydClient {
    pub fn new(config: &RemoteConfig) -> Result<Self, CatalogError> {
        let http_client = HttpClient::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()?;

        Ok(Self {
            http_client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_path: format!("/{}", config.api_path.trim_matches('/')),
            session: RwLock::new(None),
        })
    }

    fn api_url(&self, endpoint: &str) -> String {
        format!(
            "{}{}/{}",
            self.base_url,
            self.api_path,
            endpoint.trim_start_matches('/')
        )
    }

    fn request(&self, method: Method, endpoint: &str) -> RequestBuilder {
        let mut builder = self
            .http_client
            .request(method, self.api_url(endpoint))
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(credential) = self.session().and_then(|s| s.credential) {
            builder = builder.header(header::COOKIE, credential);
        }
        builder
    }

    async fn send_json<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        builder: RequestBuilder,
    ) -> Result<T, CatalogError> {
        let response = builder.send().await.map_err(|e| {
            tracing::warn!("API request failed for {}: {}", endpoint, e);
            CatalogError::from(e)
        })?;

        let status = response.status();
        if !status.is_success() {
            tracing::warn!("API request failed for {}: status {}", endpoint, status);
            return Err(CatalogError::Http(status.as_u16()));
        }

        Ok(response.json::<T>().await?)
    }

    fn require_session(&self) -> Result<Session, CatalogError> {
        self.session().ok_or(CatalogError::NotAuthenticated)
    }
}

/// Collect the `name=value` part of every Set-Cookie header into one Cookie value
fn cookie_credential(headers: &header::HeaderMap) -> Option<String> {
    let pairs: Vec<&str> = headers
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .filter_map(|v| v.split(';').next())
        .map(str::trim)
        .filter(|pair| !pair.is_empty())
        .collect();

    if pairs.is_empty() {
        None
    } else {
        Some(pairs.join("; "))
    }
}

fn session_from_login(
    body: LoginResponse,
    email: &str,
    credential: Option<String>,
) -> Result<Session, CatalogError> {
    if let Some(error) = body.error {
        return Err(CatalogError::LoginRejected(error));
    }
    if body.redirect.is_none() {
        return Err(CatalogError::LoginRejected("login failed".to_string()));
    }

    Ok(Session {
        user_id: body.uid.unwrap_or_else(|| email.to_string()),
        email: email.to_string(),
        established_at: Utc::now(),
        credential,
    })
}

#[async_trait]
impl CatalogRemote for OpenWhydClient {
    fn session(&self) -> Option<Session> {
        self.session.read().ok().and_then(|s| s.clone())
    }

    fn set_session(&self, session: Option<Session>) {
        match self.session.write() {
            Ok(mut guard) => *guard = session,
            Err(poisoned) => *poisoned.into_inner() = session,
        }
    }

    async fn search(&self, query: &str, limit: usize) -> Result<Vec<RemoteTrack>, CatalogError> {
        let formatted = query.split_whitespace().collect::<Vec<_>>().join(" ");
        let limit = limit.to_string();
        let builder = self.request(Method::GET, "/search").query(&[
            ("q", formatted.as_str()),
            ("format", "json"),
            ("limit", limit.as_str()),
        ]);
        self.send_json("/search", builder).await
    }

    async fn hot_tracks(&self, limit: usize) -> Result<Vec<RemoteTrack>, CatalogError> {
        let limit = limit.to_string();
        let builder = self
            .request(Method::GET, "/hot")
            .query(&[("format", "json"), ("limit", limit.as_str())]);
        let hot: HotResponse = self.send_json("/hot", builder).await?;
        Ok(hot.tracks)
    }

    async fn playlists_for_user(&self, user_id: &str) -> Result<Vec<RemotePlaylist>, CatalogError> {
        let endpoint = format!("/user/{}/playlists", user_id);
        let builder = self.request(Method::GET, &endpoint);
        self.send_json(&endpoint, builder).await
    }

    async fn playlist_tracks(&self, playlist_id: &str) -> Result<RemotePlaylistDetail, CatalogError> {
        let endpoint = format!("/playlist/{}", playlist_id);
        let builder = self.request(Method::GET, &endpoint);
        self.send_json(&endpoint, builder).await
    }

    async fn create_playlist(
        &self,
        name: &str,
        description: &str,
    ) -> Result<RemotePlaylist, CatalogError> {
        self.require_session()?;
        let builder = self
            .request(Method::POST, "/playlist")
            .json(&CreatePlaylistRequest { name, description });
        self.send_json("/playlist", builder).await
    }

    async fn add_track(&self, playlist_id: &str, track: &Track) -> Result<bool, CatalogError> {
        self.require_session()?;
        let external_id = track
            .external_id
            .clone()
            .unwrap_or_else(super::normalize::synthetic_external_id);
        let endpoint = format!("/playlist/{}/track", playlist_id);
        let builder = self.request(Method::POST, &endpoint).json(&AddTrackRequest {
            external_id: &external_id,
            name: &track.title,
            img: &track.cover_url,
        });
        let response: AddTrackResponse = self.send_json(&endpoint, builder).await?;
        Ok(response.success)
    }

    async fn login(&self, email: &str, password: &str) -> Result<Session, CatalogError> {
        let url = format!("{}/login", self.base_url);
        let response = self
            .http_client
            .post(&url)
            .form(&[("email", email), ("password", password)])
            .send()
            .await?;

        let credential = cookie_credential(response.headers());
        let body: LoginResponse = response.json().await?;
        let session = session_from_login(body, email, credential)?;

        tracing::info!("Logged in as {}", session.user_id);
        self.set_session(Some(session.clone()));
        Ok(session)
    }

    async fn who_am_i(&self) -> Result<RemoteUser, CatalogError> {
        let builder = self.request(Method::GET, "/me");
        let user: RemoteUser = self.send_json("/me", builder).await?;
        if user.id.is_none() {
            return Err(CatalogError::Decode("missing user id".to_string()));
        }
        Ok(user)
    }
}

/// Stand-in used when the remote service is disabled in config.
///
/// Every call fails as unreachable, so resolution always lands on local data.
#[derive(Default)]
pub struct OfflineRemote;

#[async_trait]
impl CatalogRemote for OfflineRemote {
    fn session(&self) -> Option<Session> {
        None
    }

    fn set_session(&self, _session: Option<Session>) {}

    async fn search(&self, _query: &str, _limit: usize) -> Result<Vec<RemoteTrack>, CatalogError> {
        Err(offline())
    }

    async fn hot_tracks(&self, _limit: usize) -> Result<Vec<RemoteTrack>, CatalogError> {
        Err(offline())
    }

    async fn playlists_for_user(&self, _user_id: &str) -> Result<Vec<RemotePlaylist>, CatalogError> {
        Err(offline())
    }

    async fn playlist_tracks(&self, _playlist_id: &str) -> Result<RemotePlaylistDetail, CatalogError> {
        Err(offline())
    }

    async fn create_playlist(
        &self,
        _name: &str,
        _description: &str,
    ) -> Result<RemotePlaylist, CatalogError> {
        Err(CatalogError::NotAuthenticated)
    }

    async fn add_track(&self, _playlist_id: &str, _track: &Track) -> Result<bool, CatalogError> {
        Err(CatalogError::NotAuthenticated)
    }

    async fn login(&self, _email: &str, _password: &str) -> Result<Session, CatalogError> {
        Err(offline())
    }

    async fn who_am_i(&self) -> Result<RemoteUser, CatalogError> {
        Err(offline())
    }
}

fn offline() -> CatalogError {
    CatalogError::Network("remote service disabled".to_string())
}
