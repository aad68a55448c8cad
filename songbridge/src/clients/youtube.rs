//! YouTube Data API v3 client
//!
//! Authenticated with an already-acquired OAuth bearer token; token
//! acquisition and refresh live outside this crate. All failures are
//! classified into [`RemoteErrorKind`] here, at the call boundary.

use super::{PlaylistApi, PlaylistId, RemoteError, VideoId, VideoSearch};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;

const YOUTUBE_API_BASE: &str = "https://www.googleapis.com/youtube/v3";
const USER_AGENT: &str = "songbridge/0.1.0";
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Search response (only the fields we read)
#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    items: Vec<SearchItem>,
}

#[derive(Debug, Deserialize)]
struct SearchItem {
    id: SearchItemId,
}

#[derive(Debug, Deserialize)]
struct SearchItemId {
    #[serde(rename = "videoId")]
    video_id: Option<String>,
}

/// Playlist listing response
#[derive(Debug, Deserialize)]
struct PlaylistListResponse {
    #[serde(default)]
    items: Vec<PlaylistResource>,
}

#[derive(Debug, Deserialize)]
struct PlaylistResource {
    id: String,
    snippet: PlaylistSnippet,
}

#[derive(Debug, Deserialize)]
struct PlaylistSnippet {
    title: String,
}

/// Insert responses only need the new resource id
#[derive(Debug, Deserialize)]
struct InsertResponse {
    id: String,
}

/// YouTube Data API client
pub struct YouTubeClient {
    http_client: reqwest::Client,
    token: String,
}

impl YouTubeClient {
    pub fn new(token: impl Into<String>) -> Result<Self, RemoteError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| RemoteError::other(format!("cannot build HTTP client: {}", e)))?;

        Ok(Self {
            http_client,
            token: token.into(),
        })
    }

    /// Search for a video and return the top result's identifier.
    ///
    /// Zero results is a miss, not an error.
    pub async fn search_video(&self, query: &str) -> Result<Option<VideoId>, RemoteError> {
        let url = format!("{}/search", YOUTUBE_API_BASE);

        tracing::debug!(query = %query, "Searching destination platform");

        let response = self
            .http_client
            .get(&url)
            .bearer_auth(&self.token)
            .query(&[
                ("part", "snippet"),
                ("type", "video"),
                ("maxResults", "1"),
                ("q", query),
            ])
            .send()
            .await
            .map_err(|e| RemoteError::network(&e))?;

        let parsed: SearchResponse = Self::read_json(response).await?;

        let video_id = parsed
            .items
            .into_iter()
            .next()
            .and_then(|item| item.id.video_id)
            .map(VideoId);

        match &video_id {
            Some(id) => tracing::debug!(query = %query, video_id = %id, "Search hit"),
            None => tracing::debug!(query = %query, "Search returned no results"),
        }

        Ok(video_id)
    }

    /// Create a private playlist and return its identifier.
    pub async fn create_playlist(
        &self,
        title: &str,
        description: &str,
    ) -> Result<PlaylistId, RemoteError> {
        let url = format!("{}/playlists", YOUTUBE_API_BASE);
        let body = json!({
            "snippet": { "title": title, "description": description },
            "status": { "privacyStatus": "private" },
        });

        let response = self
            .http_client
            .post(&url)
            .bearer_auth(&self.token)
            .query(&[("part", "snippet,status")])
            .json(&body)
            .send()
            .await
            .map_err(|e| RemoteError::network(&e))?;

        let parsed: InsertResponse = Self::read_json(response).await?;

        tracing::info!(title = %title, playlist_id = %parsed.id, "Created destination playlist");

        Ok(PlaylistId(parsed.id))
    }

    /// Look for an existing playlist with this exact title among the
    /// authenticated user's playlists.
    pub async fn find_playlist_by_name(
        &self,
        title: &str,
    ) -> Result<Option<PlaylistId>, RemoteError> {
        let url = format!("{}/playlists", YOUTUBE_API_BASE);

        let response = self
            .http_client
            .get(&url)
            .bearer_auth(&self.token)
            .query(&[("part", "snippet"), ("mine", "true"), ("maxResults", "50")])
            .send()
            .await
            .map_err(|e| RemoteError::network(&e))?;

        let parsed: PlaylistListResponse = Self::read_json(response).await?;

        Ok(parsed
            .items
            .into_iter()
            .find(|p| p.snippet.title == title)
            .map(|p| PlaylistId(p.id)))
    }

    /// Add one video to a playlist.
    pub async fn add_playlist_item(
        &self,
        playlist: &PlaylistId,
        video: &VideoId,
    ) -> Result<(), RemoteError> {
        let url = format!("{}/playlistItems", YOUTUBE_API_BASE);
        let body = json!({
            "snippet": {
                "playlistId": playlist.as_str(),
                "resourceId": { "kind": "youtube#video", "videoId": video.as_str() },
            }
        });

        let response = self
            .http_client
            .post(&url)
            .bearer_auth(&self.token)
            .query(&[("part", "snippet")])
            .json(&body)
            .send()
            .await
            .map_err(|e| RemoteError::network(&e))?;

        let _: InsertResponse = Self::read_json(response).await?;

        tracing::debug!(playlist_id = %playlist, video_id = %video, "Added playlist item");

        Ok(())
    }

    /// Check the status and decode the body, classifying failures.
    async fn read_json<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, RemoteError> {
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RemoteError::from_status(status.as_u16(), body));
        }

        response.json().await.map_err(|e| RemoteError::parse(e))
    }
}

#[async_trait]
impl VideoSearch for YouTubeClient {
    async fn search_video(&self, query: &str) -> Result<Option<VideoId>, RemoteError> {
        YouTubeClient::search_video(self, query).await
    }
}

#[async_trait]
impl PlaylistApi for YouTubeClient {
    async fn create_playlist(
        &self,
        title: &str,
        description: &str,
    ) -> Result<PlaylistId, RemoteError> {
        YouTubeClient::create_playlist(self, title, description).await
    }

    async fn find_playlist_by_name(&self, title: &str) -> Result<Option<PlaylistId>, RemoteError> {
        YouTubeClient::find_playlist_by_name(self, title).await
    }

    async fn add_item(&self, playlist: &PlaylistId, video: &VideoId) -> Result<(), RemoteError> {
        self.add_playlist_item(playlist, video).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_creation() {
        assert!(YouTubeClient::new("token").is_ok());
    }

    #[test]
    fn test_search_response_decoding() {
        let body = r#"{"items":[{"id":{"kind":"youtube#video","videoId":"dQw4w9WgXcQ"}}]}"#;
        let parsed: SearchResponse = serde_json::from_str(body).unwrap();
        assert_eq!(
            parsed.items[0].id.video_id.as_deref(),
            Some("dQw4w9WgXcQ")
        );
    }

    #[test]
    fn test_search_response_tolerates_missing_items() {
        let parsed: SearchResponse = serde_json::from_str("{}").unwrap();
        assert!(parsed.items.is_empty());
    }

    #[test]
    fn test_search_response_tolerates_channel_results() {
        // channels come back without a videoId
        let body = r#"{"items":[{"id":{"kind":"youtube#channel","channelId":"UC123"}}]}"#;
        let parsed: SearchResponse = serde_json::from_str(body).unwrap();
        assert!(parsed.items[0].id.video_id.is_none());
    }
}
