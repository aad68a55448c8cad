//! Spotify Web API client (source catalog)
//!
//! Consumes an already-acquired bearer token; the OAuth dance lives outside
//! this crate. Fetches playlist tracks or the user's liked songs, following
//! pagination, and turns each track into a plain-text search query.

use serde::Deserialize;
use songbridge_common::text::clean_string;
use std::time::Duration;
use thiserror::Error;

const SPOTIFY_API_BASE: &str = "https://api.spotify.com/v1";
const USER_AGENT: &str = "songbridge/0.1.0";
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Spotify client errors
#[derive(Debug, Error)]
pub enum SpotifyError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("API error {0}: {1}")]
    Api(u16, String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Invalid playlist URL: {0}")]
    InvalidUrl(String),
}

/// One source-catalog track, reduced to what a search query needs
#[derive(Debug, Clone, PartialEq)]
pub struct TrackInfo {
    pub title: String,
    pub artist: String,
}

impl TrackInfo {
    /// Normalized "title artist" search query text.
    pub fn to_query(&self) -> String {
        clean_string(&format!("{} {}", self.title, self.artist))
    }
}

/// Extract the playlist id from a share URL like
/// `https://open.spotify.com/playlist/<id>?si=...`.
pub fn playlist_id_from_url(url: &str) -> Result<String, SpotifyError> {
    let id = url
        .split('/')
        .next_back()
        .unwrap_or_default()
        .split('?')
        .next()
        .unwrap_or_default();

    if id.is_empty() {
        return Err(SpotifyError::InvalidUrl(url.to_string()));
    }

    Ok(id.to_string())
}

/// Paged track listing (shared shape between playlist items and liked songs)
#[derive(Debug, Deserialize)]
struct TrackPage {
    #[serde(default)]
    items: Vec<PageItem>,
    next: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PageItem {
    // local or removed tracks come back null
    track: Option<Track>,
}

#[derive(Debug, Deserialize)]
struct Track {
    name: String,
    #[serde(default)]
    artists: Vec<Artist>,
}

#[derive(Debug, Deserialize)]
struct Artist {
    name: String,
}

#[derive(Debug, Deserialize)]
struct PlaylistInfo {
    name: String,
}

/// Spotify Web API client
pub struct SpotifyClient {
    http_client: reqwest::Client,
    token: String,
}

impl SpotifyClient {
    pub fn new(token: impl Into<String>) -> Result<Self, SpotifyError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| SpotifyError::Network(e.to_string()))?;

        Ok(Self {
            http_client,
            token: token.into(),
        })
    }

    /// Fetch all tracks from a playlist share URL.
    pub async fn get_playlist_tracks(
        &self,
        playlist_url: &str,
    ) -> Result<Vec<TrackInfo>, SpotifyError> {
        let playlist_id = playlist_id_from_url(playlist_url)?;

        tracing::info!(playlist_id = %playlist_id, "Fetching source playlist");

        let first_url = format!("{}/playlists/{}/tracks", SPOTIFY_API_BASE, playlist_id);
        let tracks = self.fetch_all_pages(first_url).await?;

        tracing::info!(count = tracks.len(), "Fetched playlist tracks");
        Ok(tracks)
    }

    /// Fetch a playlist's display name, for deriving output file names.
    pub async fn get_playlist_name(&self, playlist_url: &str) -> Result<String, SpotifyError> {
        let playlist_id = playlist_id_from_url(playlist_url)?;
        let url = format!(
            "{}/playlists/{}?fields=name",
            SPOTIFY_API_BASE, playlist_id
        );

        let response = self
            .http_client
            .get(&url)
            .bearer_auth(&self.token)
            .send()
            .await
            .map_err(|e| SpotifyError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SpotifyError::Api(status.as_u16(), body));
        }

        let info: PlaylistInfo = response
            .json()
            .await
            .map_err(|e| SpotifyError::Parse(e.to_string()))?;

        Ok(info.name)
    }

    /// Fetch the user's saved ("liked") songs.
    pub async fn get_liked_songs(&self) -> Result<Vec<TrackInfo>, SpotifyError> {
        tracing::info!("Fetching liked songs");

        let first_url = format!("{}/me/tracks", SPOTIFY_API_BASE);
        let tracks = self.fetch_all_pages(first_url).await?;

        tracing::info!(count = tracks.len(), "Fetched liked songs");
        Ok(tracks)
    }

    /// Follow `next` links until the listing is exhausted.
    async fn fetch_all_pages(&self, first_url: String) -> Result<Vec<TrackInfo>, SpotifyError> {
        let mut tracks = Vec::new();
        let mut next_url = Some(first_url);

        while let Some(url) = next_url {
            let response = self
                .http_client
                .get(&url)
                .bearer_auth(&self.token)
                .send()
                .await
                .map_err(|e| SpotifyError::Network(e.to_string()))?;

            let status = response.status();
            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                return Err(SpotifyError::Api(status.as_u16(), body));
            }

            let page: TrackPage = response
                .json()
                .await
                .map_err(|e| SpotifyError::Parse(e.to_string()))?;

            for item in page.items {
                let Some(track) = item.track else { continue };
                tracks.push(TrackInfo {
                    title: track.name,
                    artist: track
                        .artists
                        .into_iter()
                        .next()
                        .map(|a| a.name)
                        .unwrap_or_default(),
                });
            }

            next_url = page.next;
        }

        Ok(tracks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_playlist_id_from_share_url() {
        let url = "https://open.spotify.com/playlist/37i9dQZF1DXcBWIGoYBM5M?si=abc123";
        assert_eq!(playlist_id_from_url(url).unwrap(), "37i9dQZF1DXcBWIGoYBM5M");
    }

    #[test]
    fn test_playlist_id_without_query_string() {
        let url = "https://open.spotify.com/playlist/37i9dQZF1DXcBWIGoYBM5M";
        assert_eq!(playlist_id_from_url(url).unwrap(), "37i9dQZF1DXcBWIGoYBM5M");
    }

    #[test]
    fn test_bare_id_passes_through() {
        assert_eq!(playlist_id_from_url("37i9dQZF1DXcBWIGoYBM5M").unwrap(), "37i9dQZF1DXcBWIGoYBM5M");
    }

    #[test]
    fn test_track_query_normalization() {
        let track = TrackInfo {
            title: "Don't Stop Me Now".to_string(),
            artist: "Queen".to_string(),
        };
        assert_eq!(track.to_query(), "Don t Stop Me Now Queen");
    }

    #[test]
    fn test_page_decoding_skips_null_tracks() {
        let body = r#"{"items":[{"track":null},{"track":{"name":"Halo","artists":[{"name":"Beyoncé"}]}}],"next":null}"#;
        let page: TrackPage = serde_json::from_str(body).unwrap();
        assert_eq!(page.items.len(), 2);
        assert!(page.items[0].track.is_none());
        assert_eq!(page.items[1].track.as_ref().unwrap().name, "Halo");
    }
}
