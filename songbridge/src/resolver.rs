//! Concurrent track resolution
//!
//! Maps each track query to zero-or-one video identifier via a bounded
//! worker pool. Output order always matches input order: results land in a
//! vector pre-sized to the input length, written at the original index by
//! whichever worker finishes that query. Completion order is never exposed.
//!
//! A per-query failure degrades to an absent identifier for that index and
//! is logged; it never aborts the batch.

use crate::clients::{VideoId, VideoSearch};
use chrono::Utc;
use songbridge_common::events::{emit, EventSink, MigrationEvent};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

/// Default worker pool width
pub const DEFAULT_CONCURRENCY: usize = 4;

/// Order-preserving concurrent resolver
pub struct Resolver {
    search: Arc<dyn VideoSearch>,
    concurrency: usize,
    events: Option<EventSink>,
    cancel: CancellationToken,
}

impl Resolver {
    pub fn new(search: Arc<dyn VideoSearch>) -> Self {
        Self {
            search,
            concurrency: DEFAULT_CONCURRENCY,
            events: None,
            cancel: CancellationToken::new(),
        }
    }

    /// Set the worker pool width (minimum 1).
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// Attach a progress event sink.
    pub fn with_events(mut self, events: EventSink) -> Self {
        self.events = Some(events);
        self
    }

    /// Attach a cooperative cancellation token, checked between queries.
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Resolve a query sequence into an identifier sequence of equal length.
    ///
    /// `result[i]` corresponds to `queries[i]` for every `i`; unresolved
    /// queries (no results, search error, cancellation) are `None`.
    pub async fn resolve(&self, queries: &[String]) -> Vec<Option<VideoId>> {
        let total = queries.len();
        let mut results: Vec<Option<VideoId>> = vec![None; total];

        if total == 0 {
            return results;
        }

        emit(
            self.events.as_ref(),
            MigrationEvent::ResolveStarted {
                total,
                timestamp: Utc::now(),
            },
        );

        tracing::info!(total, concurrency = self.concurrency, "Resolving track queries");

        let semaphore = Arc::new(Semaphore::new(self.concurrency));
        let mut workers: JoinSet<(usize, String, Option<VideoId>)> = JoinSet::new();

        for (index, query) in queries.iter().cloned().enumerate() {
            let semaphore = Arc::clone(&semaphore);
            let search = Arc::clone(&self.search);
            let cancel = self.cancel.clone();

            workers.spawn(async move {
                let Ok(_permit) = semaphore.acquire_owned().await else {
                    return (index, query, None);
                };

                // cancellation leaves the remaining queries unresolved
                if cancel.is_cancelled() {
                    return (index, query, None);
                }

                let video_id = match search.search_video(&query).await {
                    Ok(found) => found,
                    Err(err) => {
                        tracing::warn!(
                            index,
                            query = %query,
                            error = %err,
                            "Search failed, leaving track unresolved"
                        );
                        None
                    }
                };

                (index, query, video_id)
            });
        }

        let mut completed = 0usize;
        while let Some(joined) = workers.join_next().await {
            match joined {
                Ok((index, query, video_id)) => {
                    completed += 1;

                    emit(
                        self.events.as_ref(),
                        MigrationEvent::TrackResolved {
                            index,
                            query,
                            video_id: video_id.as_ref().map(|id| id.0.clone()),
                            completed,
                            total,
                            timestamp: Utc::now(),
                        },
                    );

                    results[index] = video_id;
                }
                Err(err) => {
                    // the slot stays None; the index is still accounted for
                    tracing::error!(error = %err, "Resolver worker panicked");
                    completed += 1;
                }
            }
        }

        let resolved = results.iter().filter(|entry| entry.is_some()).count();

        tracing::info!(resolved, unresolved = total - resolved, "Resolution complete");

        emit(
            self.events.as_ref(),
            MigrationEvent::ResolveCompleted {
                resolved,
                unresolved: total - resolved,
                timestamp: Utc::now(),
            },
        );

        results
    }
}
