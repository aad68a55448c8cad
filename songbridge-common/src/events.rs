//! Event types for the songbridge migration pipeline
//!
//! The pipeline reports progress through an injected event sink rather than
//! process-global state: `Resolver`, the populators, and the orchestrator
//! each accept an optional [`EventSink`] and emit [`MigrationEvent`]s as work
//! completes. The sender is unbounded so emission never blocks pipeline
//! progress; a dropped receiver just loses the progress feed.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Sink for migration progress events.
pub type EventSink = tokio::sync::mpsc::UnboundedSender<MigrationEvent>;

/// Emit an event into an optional sink.
pub fn emit(sink: Option<&EventSink>, event: MigrationEvent) {
    if let Some(tx) = sink {
        let _ = tx.send(event);
    }
}

/// Migration pipeline events
///
/// Serializable so callers can forward them over a wire or into a log.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum MigrationEvent {
    /// Pipeline run state changed
    StateChanged {
        /// State before the transition
        old_state: String,
        /// State after the transition
        new_state: String,
        /// When the transition happened
        timestamp: DateTime<Utc>,
    },

    /// Resolution phase started
    ResolveStarted {
        /// Number of queries submitted to the worker pool
        total: usize,
        timestamp: DateTime<Utc>,
    },

    /// One track query finished resolving (found or not)
    TrackResolved {
        /// Index of the query in the input sequence
        index: usize,
        /// The query text
        query: String,
        /// Resolved video identifier, absent when not found
        video_id: Option<String>,
        /// Queries completed so far, in completion order
        completed: usize,
        /// Total queries in this batch
        total: usize,
        timestamp: DateTime<Utc>,
    },

    /// Resolution phase finished; the identifier sequence is complete
    ResolveCompleted {
        resolved: usize,
        unresolved: usize,
        timestamp: DateTime<Utc>,
    },

    /// Population phase started
    PopulateStarted {
        /// Length of the identifier sequence, including absent entries
        total: usize,
        timestamp: DateTime<Utc>,
    },

    /// One identifier was added to the destination playlist
    ItemAdded {
        index: usize,
        video_id: String,
        timestamp: DateTime<Utc>,
    },

    /// An absent identifier (unresolved track) was skipped
    ItemSkipped {
        index: usize,
        timestamp: DateTime<Utc>,
    },

    /// One identifier failed to apply; the run continues
    ItemFailed {
        index: usize,
        video_id: Option<String>,
        reason: String,
        timestamp: DateTime<Utc>,
    },

    /// Population stopped early; remaining items were not attempted
    PopulateHalted {
        reason: String,
        timestamp: DateTime<Utc>,
    },

    /// Pipeline run finished with aggregate counts
    RunCompleted {
        resolved: usize,
        unresolved: usize,
        added: usize,
        failed: usize,
        timestamp: DateTime<Utc>,
    },
}
