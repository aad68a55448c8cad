//! Migration pipeline orchestrator
//!
//! Sequences resolution and population as a state machine:
//! `Idle → Resolving → Resolved → Populating → Done`, with a terminal
//! `Failed` reachable from any non-terminal state on unrecoverable error.
//! The identifier sequence is durably written between the phases so a run
//! that dies after resolution can be resumed by re-running population
//! against the artifact.
//!
//! Partial per-item failure is not pipeline failure; `Failed` is reserved
//! for conditions that make the whole run meaningless (unreadable input,
//! unwritable artifact, no authenticated session).

use crate::clients::{PlaylistApi, VideoId, VideoSearch};
use crate::populate::api::{ApiPopulator, PlaylistTarget};
use crate::populate::browser::{InteractiveSession, PopulateError, SessionPopulator};
use crate::populate::PopulationOutcome;
use crate::resolver::{Resolver, DEFAULT_CONCURRENCY};
use crate::retry::RetryPolicy;
use crate::songfile;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use songbridge_common::events::{emit, EventSink, MigrationEvent};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// Pipeline run state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RunState {
    /// Created, not started
    Idle,
    /// Resolver batch in flight
    Resolving,
    /// Identifier sequence complete and durably written
    Resolved,
    /// Populator applying identifiers
    Populating,
    /// Run finished; per-item failures may have occurred
    Done,
    /// Run aborted by an unrecoverable error
    Failed,
}

impl RunState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, RunState::Done | RunState::Failed)
    }
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RunState::Idle => "IDLE",
            RunState::Resolving => "RESOLVING",
            RunState::Resolved => "RESOLVED",
            RunState::Populating => "POPULATING",
            RunState::Done => "DONE",
            RunState::Failed => "FAILED",
        };
        f.write_str(name)
    }
}

/// State transition record
#[derive(Debug, Clone, Serialize)]
pub struct StateTransition {
    pub session_id: Uuid,
    pub old_state: RunState,
    pub new_state: RunState,
    pub transitioned_at: DateTime<Utc>,
}

/// One pipeline run (in-memory state)
#[derive(Debug, Clone)]
pub struct MigrationSession {
    pub session_id: Uuid,
    pub state: RunState,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
}

impl MigrationSession {
    pub fn new() -> Self {
        Self {
            session_id: Uuid::new_v4(),
            state: RunState::Idle,
            started_at: Utc::now(),
            ended_at: None,
        }
    }

    /// Transition to a new state, stamping the end time on terminal states.
    pub fn transition_to(&mut self, new_state: RunState) -> StateTransition {
        let transition = StateTransition {
            session_id: self.session_id,
            old_state: self.state,
            new_state,
            transitioned_at: Utc::now(),
        };
        self.state = new_state;

        if new_state.is_terminal() {
            self.ended_at = Some(Utc::now());
        }

        transition
    }
}

impl Default for MigrationSession {
    fn default() -> Self {
        Self::new()
    }
}

/// Which populator path a run uses; exactly one per run
pub enum PopulatePath {
    /// Programmatic API path
    Api {
        client: Arc<dyn PlaylistApi>,
        target: PlaylistTarget,
    },
    /// UI-automation fallback against a pre-existing playlist
    Interactive {
        session: Box<dyn InteractiveSession>,
        playlist_name: String,
    },
}

/// Unrecoverable pipeline failures
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("query input unreadable: {0}")]
    Input(songbridge_common::Error),

    #[error("identifier artifact unwritable: {0}")]
    Artifact(songbridge_common::Error),

    #[error("authentication precondition failed: {0}")]
    Authentication(String),

    #[error("destination playlist unavailable: {0}")]
    Playlist(String),
}

/// Aggregate counters surfaced to the caller
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct MigrationReport {
    pub resolved: usize,
    pub unresolved: usize,
    pub added: usize,
    pub failed: usize,
}

/// Pipeline configuration
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Resolver worker pool width
    pub concurrency: usize,
    /// Retry bounds for API-path remote calls
    pub retry: RetryPolicy,
    /// Where the identifier artifact is written after resolution
    pub artifact_path: PathBuf,
    /// Where interactive-path diagnostic snapshots land
    pub snapshot_dir: PathBuf,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            concurrency: DEFAULT_CONCURRENCY,
            retry: RetryPolicy::default(),
            artifact_path: PathBuf::from("video_ids.txt"),
            snapshot_dir: PathBuf::from("."),
        }
    }
}

/// Migration pipeline orchestrator
pub struct Pipeline {
    config: PipelineConfig,
    events: Option<EventSink>,
    cancel: CancellationToken,
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Self {
            config,
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

    /// Run the full pipeline: read queries, resolve, persist the artifact,
    /// populate through the chosen path, report.
    pub async fn run(
        &self,
        search: Arc<dyn VideoSearch>,
        path: PopulatePath,
        query_file: &Path,
    ) -> Result<MigrationReport, PipelineError> {
        let mut session = MigrationSession::new();

        tracing::info!(
            session_id = %session.session_id,
            input = %query_file.display(),
            "Starting migration run"
        );

        let queries = match songfile::read_queries(query_file) {
            Ok(queries) => queries,
            Err(err) => {
                self.transition(&mut session, RunState::Failed);
                return Err(PipelineError::Input(err));
            }
        };

        // Resolve
        self.transition(&mut session, RunState::Resolving);

        let resolver = Resolver::new(search)
            .with_concurrency(self.config.concurrency)
            .with_cancellation(self.cancel.clone());
        let resolver = match &self.events {
            Some(events) => resolver.with_events(events.clone()),
            None => resolver,
        };

        let identifiers = resolver.resolve(&queries).await;

        // durable artifact before population, so population can be re-run
        // without re-resolving
        if let Err(err) = songfile::write_identifiers(&self.config.artifact_path, &identifiers) {
            self.transition(&mut session, RunState::Failed);
            return Err(PipelineError::Artifact(err));
        }

        tracing::info!(
            artifact = %self.config.artifact_path.display(),
            "Identifier sequence persisted"
        );

        self.transition(&mut session, RunState::Resolved);

        let resolved = identifiers.iter().filter(|entry| entry.is_some()).count();
        let unresolved = identifiers.len() - resolved;

        // Populate
        self.transition(&mut session, RunState::Populating);

        let outcome = match self.populate(path, &identifiers).await {
            Ok(outcome) => outcome,
            Err(err) => {
                self.transition(&mut session, RunState::Failed);
                return Err(err);
            }
        };

        // partial per-item failure is not pipeline failure
        self.transition(&mut session, RunState::Done);

        let report = MigrationReport {
            resolved,
            unresolved,
            added: outcome.added,
            failed: outcome.failed,
        };

        emit(
            self.events.as_ref(),
            MigrationEvent::RunCompleted {
                resolved: report.resolved,
                unresolved: report.unresolved,
                added: report.added,
                failed: report.failed,
                timestamp: Utc::now(),
            },
        );

        tracing::info!(
            session_id = %session.session_id,
            resolved = report.resolved,
            unresolved = report.unresolved,
            added = report.added,
            failed = report.failed,
            "Migration run complete"
        );

        Ok(report)
    }

    async fn populate(
        &self,
        path: PopulatePath,
        identifiers: &[Option<VideoId>],
    ) -> Result<PopulationOutcome, PipelineError> {
        match path {
            PopulatePath::Api { client, target } => {
                let populator = ApiPopulator::new(client)
                    .with_policy(self.config.retry.clone())
                    .with_cancellation(self.cancel.clone());
                let populator = match &self.events {
                    Some(events) => populator.with_events(events.clone()),
                    None => populator,
                };

                let playlist = populator
                    .ensure_playlist(&target)
                    .await
                    .map_err(|err| PipelineError::Playlist(err.to_string()))?;

                Ok(populator.populate(&playlist, identifiers).await)
            }
            PopulatePath::Interactive {
                session,
                playlist_name,
            } => {
                let populator =
                    SessionPopulator::new(playlist_name, self.config.snapshot_dir.clone())
                        .with_cancellation(self.cancel.clone());
                let populator = match &self.events {
                    Some(events) => populator.with_events(events.clone()),
                    None => populator,
                };

                populator
                    .populate(session, identifiers)
                    .await
                    .map_err(|err| match err {
                        PopulateError::Authentication(cause) => {
                            PipelineError::Authentication(cause.to_string())
                        }
                    })
            }
        }
    }

    fn transition(&self, session: &mut MigrationSession, new_state: RunState) {
        let transition = session.transition_to(new_state);

        tracing::info!(
            session_id = %session.session_id,
            old_state = %transition.old_state,
            new_state = %transition.new_state,
            "Pipeline state changed"
        );

        emit(
            self.events.as_ref(),
            MigrationEvent::StateChanged {
                old_state: transition.old_state.to_string(),
                new_state: transition.new_state.to_string(),
                timestamp: transition.transitioned_at,
            },
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_session_is_idle() {
        let session = MigrationSession::new();
        assert_eq!(session.state, RunState::Idle);
        assert!(session.ended_at.is_none());
    }

    #[test]
    fn test_transition_records_old_and_new() {
        let mut session = MigrationSession::new();
        let transition = session.transition_to(RunState::Resolving);

        assert_eq!(transition.old_state, RunState::Idle);
        assert_eq!(transition.new_state, RunState::Resolving);
        assert_eq!(session.state, RunState::Resolving);
        assert!(session.ended_at.is_none());
    }

    #[test]
    fn test_terminal_states_stamp_end_time() {
        for terminal in [RunState::Done, RunState::Failed] {
            let mut session = MigrationSession::new();
            session.transition_to(terminal);
            assert!(session.state.is_terminal());
            assert!(session.ended_at.is_some());
        }
    }
}
