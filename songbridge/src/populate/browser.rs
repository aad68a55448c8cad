//! Interactive-session playlist population
//!
//! Fallback path for accounts without programmatic write access: drives an
//! authenticated browser session against a pre-existing destination
//! playlist. The session sits behind the narrow [`InteractiveSession`]
//! capability trait so the UI-automation engine is swappable; the default
//! engine lives in [`super::webdriver`].
//!
//! Items are processed strictly sequentially. The session is a single
//! mutable resource and is never driven from more than one task.

use super::{ItemOutcome, PopulationOutcome};
use crate::clients::VideoId;
use async_trait::async_trait;
use chrono::Utc;
use songbridge_common::events::{emit, EventSink, MigrationEvent};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio_util::sync::CancellationToken;

/// Fixed snapshot name for the authentication precondition failure
pub const AUTH_SNAPSHOT_FILE: &str = "auth_check_failure.png";

/// Interactive session errors
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("not signed in: {0}")]
    NotAuthenticated(String),

    #[error("timed out waiting for {0}")]
    Timeout(String),

    #[error("interaction failed: {0}")]
    Interaction(String),

    #[error("session error: {0}")]
    Session(String),
}

/// Narrow capability interface over an authenticated browser session.
///
/// Implementations own the underlying page/context; any UI-automation
/// engine can sit behind this.
#[async_trait]
pub trait InteractiveSession: Send {
    /// Confirm the session presents an authenticated identity.
    async fn verify_authenticated(&mut self) -> Result<(), SessionError>;

    /// Navigate to the item's resource page.
    async fn open_item(&mut self, video: &VideoId) -> Result<(), SessionError>;

    /// Save the currently open item to the playlist with this exact name.
    async fn save_to_playlist(&mut self, playlist_name: &str) -> Result<(), SessionError>;

    /// Write a diagnostic snapshot of the current session state.
    async fn capture_snapshot(&mut self, path: &Path) -> Result<(), SessionError>;

    /// Release the session.
    async fn close(&mut self) -> Result<(), SessionError>;
}

/// Population failures that abort the whole phase
#[derive(Debug, Error)]
pub enum PopulateError {
    /// The session is not signed in; no per-item attempts were made
    #[error("authentication precondition failed: {0}")]
    Authentication(#[source] SessionError),
}

/// Sequential interactive-session populator
pub struct SessionPopulator {
    playlist_name: String,
    snapshot_dir: PathBuf,
    events: Option<EventSink>,
    cancel: CancellationToken,
}

impl SessionPopulator {
    pub fn new(playlist_name: impl Into<String>, snapshot_dir: impl Into<PathBuf>) -> Self {
        Self {
            playlist_name: playlist_name.into(),
            snapshot_dir: snapshot_dir.into(),
            events: None,
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_events(mut self, events: EventSink) -> Self {
        self.events = Some(events);
        self
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Apply the identifier sequence through the session.
    ///
    /// The authentication precondition is checked before any item; an
    /// unauthenticated session fails the whole run with one fixed-name
    /// snapshot. Per-item failures capture a snapshot keyed by the item's
    /// identifier and the loop continues. The session is closed on every
    /// exit path. Re-running against the same sequence saves duplicates;
    /// existing playlist contents are not consulted.
    pub async fn populate(
        &self,
        mut session: Box<dyn InteractiveSession>,
        identifiers: &[Option<VideoId>],
    ) -> Result<PopulationOutcome, PopulateError> {
        if let Err(err) = session.verify_authenticated().await {
            let snapshot = self.snapshot_dir.join(AUTH_SNAPSHOT_FILE);
            tracing::error!(
                error = %err,
                snapshot = %snapshot.display(),
                "Session is not authenticated, aborting population"
            );
            if let Err(snap_err) = session.capture_snapshot(&snapshot).await {
                tracing::warn!(error = %snap_err, "Could not capture diagnostic snapshot");
            }
            close_session(session.as_mut()).await;
            return Err(PopulateError::Authentication(err));
        }

        let mut outcome = PopulationOutcome::default();

        emit(
            self.events.as_ref(),
            MigrationEvent::PopulateStarted {
                total: identifiers.len(),
                timestamp: Utc::now(),
            },
        );

        tracing::info!(
            playlist = %self.playlist_name,
            total = identifiers.len(),
            "Populating playlist via interactive session"
        );

        for (index, entry) in identifiers.iter().enumerate() {
            if self.cancel.is_cancelled() {
                tracing::info!(index, "Population cancelled, leaving remaining items");
                break;
            }

            let Some(video_id) = entry else {
                outcome.record(ItemOutcome::Skipped { index });
                emit(
                    self.events.as_ref(),
                    MigrationEvent::ItemSkipped {
                        index,
                        timestamp: Utc::now(),
                    },
                );
                continue;
            };

            match self.save_one(session.as_mut(), video_id).await {
                Ok(()) => {
                    outcome.record(ItemOutcome::Added {
                        index,
                        video_id: video_id.clone(),
                    });
                    emit(
                        self.events.as_ref(),
                        MigrationEvent::ItemAdded {
                            index,
                            video_id: video_id.0.clone(),
                            timestamp: Utc::now(),
                        },
                    );
                }
                Err(err) => {
                    let snapshot = self
                        .snapshot_dir
                        .join(format!("save_failure_{}.png", video_id));
                    tracing::warn!(
                        index,
                        video_id = %video_id,
                        error = %err,
                        snapshot = %snapshot.display(),
                        "Item failed, continuing with next"
                    );
                    if let Err(snap_err) = session.capture_snapshot(&snapshot).await {
                        tracing::warn!(error = %snap_err, "Could not capture diagnostic snapshot");
                    }
                    outcome.record(ItemOutcome::Failed {
                        index,
                        video_id: Some(video_id.clone()),
                        cause: err.to_string(),
                    });
                    emit(
                        self.events.as_ref(),
                        MigrationEvent::ItemFailed {
                            index,
                            video_id: Some(video_id.0.clone()),
                            reason: err.to_string(),
                            timestamp: Utc::now(),
                        },
                    );
                }
            }
        }

        close_session(session.as_mut()).await;

        tracing::info!(
            added = outcome.added,
            skipped = outcome.skipped,
            failed = outcome.failed,
            "Population complete"
        );

        Ok(outcome)
    }

    async fn save_one(
        &self,
        session: &mut dyn InteractiveSession,
        video_id: &VideoId,
    ) -> Result<(), SessionError> {
        session.open_item(video_id).await?;
        session.save_to_playlist(&self.playlist_name).await
    }
}

async fn close_session(session: &mut dyn InteractiveSession) {
    if let Err(err) = session.close().await {
        tracing::warn!(error = %err, "Could not close browser session");
    }
}
