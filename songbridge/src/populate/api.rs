//! API-path playlist population
//!
//! Applies an identifier sequence to a playlist through the programmatic
//! API, sequentially, with bounded retry on transient failures. Quota
//! exhaustion terminates the remaining batch immediately; everything else
//! is absorbed at the item boundary.

use super::{ItemOutcome, PopulationOutcome};
use crate::clients::{PlaylistApi, PlaylistId, RemoteError, RemoteErrorKind, VideoId};
use crate::retry::{retry_remote, RetryPolicy};
use chrono::Utc;
use songbridge_common::events::{emit, EventSink, MigrationEvent};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Destination playlist for an API-path run
#[derive(Debug, Clone)]
pub enum PlaylistTarget {
    /// Use this playlist as-is
    Existing(PlaylistId),
    /// Reuse a playlist with this exact title, or create it
    Named(String),
}

/// Sequential API-path populator
pub struct ApiPopulator {
    client: Arc<dyn PlaylistApi>,
    policy: RetryPolicy,
    events: Option<EventSink>,
    cancel: CancellationToken,
}

impl ApiPopulator {
    pub fn new(client: Arc<dyn PlaylistApi>) -> Self {
        Self {
            client,
            policy: RetryPolicy::default(),
            events: None,
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_events(mut self, events: EventSink) -> Self {
        self.events = Some(events);
        self
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Resolve the playlist target to a concrete handle, creating the
    /// playlist when no exact-title match exists.
    pub async fn ensure_playlist(&self, target: &PlaylistTarget) -> Result<PlaylistId, RemoteError> {
        match target {
            PlaylistTarget::Existing(id) => Ok(id.clone()),
            PlaylistTarget::Named(title) => {
                let existing = retry_remote("playlist lookup", &self.policy, || {
                    self.client.find_playlist_by_name(title)
                })
                .await?;

                if let Some(id) = existing {
                    tracing::info!(title = %title, playlist_id = %id, "Reusing existing playlist");
                    return Ok(id);
                }

                retry_remote("playlist create", &self.policy, || {
                    self.client.create_playlist(title, "Migrated by songbridge")
                })
                .await
            }
        }
    }

    /// Add every present identifier to the playlist.
    ///
    /// Absent identifiers are counted as skipped and never generate a
    /// remote call. A quota-exhaustion failure stops the remaining batch;
    /// completed additions stand. Re-running against the same sequence adds
    /// duplicates, population does not check existing playlist contents.
    pub async fn populate(
        &self,
        playlist: &PlaylistId,
        identifiers: &[Option<VideoId>],
    ) -> PopulationOutcome {
        let mut outcome = PopulationOutcome::default();

        emit(
            self.events.as_ref(),
            MigrationEvent::PopulateStarted {
                total: identifiers.len(),
                timestamp: Utc::now(),
            },
        );

        tracing::info!(
            playlist_id = %playlist,
            total = identifiers.len(),
            "Populating playlist via API"
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

            let added = retry_remote("playlist add", &self.policy, || {
                self.client.add_item(playlist, video_id)
            })
            .await;

            match added {
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
                Err(err) if err.kind == RemoteErrorKind::QuotaExceeded => {
                    tracing::error!(
                        index,
                        video_id = %video_id,
                        error = %err,
                        "Quota exhausted, aborting remaining additions"
                    );
                    outcome.record(ItemOutcome::Failed {
                        index,
                        video_id: Some(video_id.clone()),
                        cause: err.to_string(),
                    });
                    outcome.halted = true;
                    emit(
                        self.events.as_ref(),
                        MigrationEvent::PopulateHalted {
                            reason: err.to_string(),
                            timestamp: Utc::now(),
                        },
                    );
                    break;
                }
                Err(err) => {
                    tracing::warn!(
                        index,
                        video_id = %video_id,
                        error = %err,
                        "Item failed, continuing with next"
                    );
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

        tracing::info!(
            added = outcome.added,
            skipped = outcome.skipped,
            failed = outcome.failed,
            halted = outcome.halted,
            "Population complete"
        );

        outcome
    }
}
