//! Remote platform clients
//!
//! Every remote failure is classified exactly once, at the call boundary,
//! into a [`RemoteErrorKind`]; downstream code branches on the kind and
//! never inspects message text.

pub mod spotify;
pub mod youtube;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Opaque destination-platform key referencing one playable item.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VideoId(pub String);

impl VideoId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for VideoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for VideoId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Opaque destination-platform key referencing one playlist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlaylistId(pub String);

impl PlaylistId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PlaylistId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PlaylistId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Classification of a failed remote call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteErrorKind {
    /// Server hiccup (5xx, 409, network failure); safe to retry
    Transient,
    /// Call budget exhausted (403/429); not retryable, stops the batch
    QuotaExceeded,
    /// Resource does not exist (404)
    NotFound,
    /// Anything else (client errors, malformed responses)
    Other,
}

/// Error from a remote platform call, classified at the boundary
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct RemoteError {
    pub kind: RemoteErrorKind,
    /// HTTP status, absent for network-level failures
    pub status: Option<u16>,
    pub message: String,
}

impl RemoteError {
    /// Classify an HTTP error status.
    pub fn from_status(status: u16, message: impl Into<String>) -> Self {
        let kind = match status {
            403 | 429 => RemoteErrorKind::QuotaExceeded,
            404 => RemoteErrorKind::NotFound,
            409 => RemoteErrorKind::Transient,
            500..=599 => RemoteErrorKind::Transient,
            _ => RemoteErrorKind::Other,
        };
        Self {
            kind,
            status: Some(status),
            message: message.into(),
        }
    }

    /// A network-level failure (connect, timeout); treated as transient.
    pub fn network(err: &reqwest::Error) -> Self {
        Self {
            kind: RemoteErrorKind::Transient,
            status: None,
            message: format!("network error: {}", err),
        }
    }

    /// A malformed or unexpected response body.
    pub fn parse(err: impl fmt::Display) -> Self {
        Self {
            kind: RemoteErrorKind::Other,
            status: None,
            message: format!("parse error: {}", err),
        }
    }

    pub fn other(message: impl Into<String>) -> Self {
        Self {
            kind: RemoteErrorKind::Other,
            status: None,
            message: message.into(),
        }
    }

    pub fn is_retryable(&self) -> bool {
        self.kind == RemoteErrorKind::Transient
    }
}

/// Best-effort search: top result for a query, or `None` for a miss.
#[async_trait]
pub trait VideoSearch: Send + Sync {
    async fn search_video(&self, query: &str) -> Result<Option<VideoId>, RemoteError>;
}

/// Playlist write operations on the destination platform.
#[async_trait]
pub trait PlaylistApi: Send + Sync {
    async fn create_playlist(
        &self,
        title: &str,
        description: &str,
    ) -> Result<PlaylistId, RemoteError>;

    async fn find_playlist_by_name(&self, title: &str) -> Result<Option<PlaylistId>, RemoteError>;

    async fn add_item(&self, playlist: &PlaylistId, video: &VideoId) -> Result<(), RemoteError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_classification() {
        assert_eq!(RemoteError::from_status(500, "").kind, RemoteErrorKind::Transient);
        assert_eq!(RemoteError::from_status(503, "").kind, RemoteErrorKind::Transient);
        assert_eq!(RemoteError::from_status(409, "").kind, RemoteErrorKind::Transient);
        assert_eq!(
            RemoteError::from_status(403, "").kind,
            RemoteErrorKind::QuotaExceeded
        );
        assert_eq!(
            RemoteError::from_status(429, "").kind,
            RemoteErrorKind::QuotaExceeded
        );
        assert_eq!(RemoteError::from_status(404, "").kind, RemoteErrorKind::NotFound);
        assert_eq!(RemoteError::from_status(400, "").kind, RemoteErrorKind::Other);
    }

    #[test]
    fn test_retryable() {
        assert!(RemoteError::from_status(503, "").is_retryable());
        assert!(!RemoteError::from_status(403, "").is_retryable());
        assert!(!RemoteError::other("bad").is_retryable());
    }
}
