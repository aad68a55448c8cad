//! Resolver integration tests
//!
//! Order preservation regardless of completion timing, completeness of the
//! output sequence, per-query failure isolation, and the bounded worker
//! pool.

use async_trait::async_trait;
use songbridge::clients::{RemoteError, VideoId, VideoSearch};
use songbridge::resolver::Resolver;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Scripted search backend with call recording
#[derive(Default)]
struct MockSearch {
    /// per-query artificial latency
    delays: HashMap<String, Duration>,
    /// queries that fail with a transient error
    failures: Vec<String>,
    /// queries that return zero results
    misses: Vec<String>,
    calls: Mutex<Vec<String>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

#[async_trait]
impl VideoSearch for MockSearch {
    async fn search_video(&self, query: &str) -> Result<Option<VideoId>, RemoteError> {
        self.calls.lock().unwrap().push(query.to_string());

        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(current, Ordering::SeqCst);

        let delay = self
            .delays
            .get(query)
            .copied()
            .unwrap_or(Duration::from_millis(1));
        tokio::time::sleep(delay).await;

        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if self.failures.iter().any(|q| q == query) {
            return Err(RemoteError::from_status(500, "search backend exploded"));
        }
        if self.misses.iter().any(|q| q == query) {
            return Ok(None);
        }
        Ok(Some(VideoId(format!("vid-{}", query))))
    }
}

fn queries(count: usize) -> Vec<String> {
    (0..count).map(|i| format!("q{}", i)).collect()
}

#[tokio::test]
async fn test_output_order_matches_input_order() {
    // earlier queries take longer, so completion order is reversed
    let count = 8;
    let mut search = MockSearch::default();
    for (i, query) in queries(count).iter().enumerate() {
        search
            .delays
            .insert(query.clone(), Duration::from_millis(((count - i) * 20) as u64));
    }

    let resolver = Resolver::new(Arc::new(search)).with_concurrency(count);
    let results = resolver.resolve(&queries(count)).await;

    assert_eq!(results.len(), count);
    for (i, result) in results.iter().enumerate() {
        assert_eq!(
            result.as_ref().map(|id| id.as_str()),
            Some(format!("vid-q{}", i).as_str()),
            "result {} out of order",
            i
        );
    }
}

#[tokio::test]
async fn test_every_query_resolved_exactly_once() {
    let search = Arc::new(MockSearch::default());
    let resolver = Resolver::new(search.clone()).with_concurrency(3);

    let input = queries(10);
    let results = resolver.resolve(&input).await;

    assert_eq!(results.len(), input.len());

    let mut calls = search.calls.lock().unwrap().clone();
    calls.sort();
    let mut expected = input.clone();
    expected.sort();
    assert_eq!(calls, expected, "each query searched exactly once");
}

#[tokio::test]
async fn test_search_failure_degrades_to_unresolved() {
    let search = MockSearch {
        failures: vec!["q2".to_string()],
        ..MockSearch::default()
    };

    let resolver = Resolver::new(Arc::new(search));
    let results = resolver.resolve(&queries(5)).await;

    assert_eq!(results.len(), 5);
    assert!(results[2].is_none(), "failed query becomes unresolved");
    for (i, result) in results.iter().enumerate() {
        if i != 2 {
            assert!(result.is_some(), "other queries unaffected");
        }
    }
}

#[tokio::test]
async fn test_zero_results_is_a_miss_not_an_error() {
    let search = MockSearch {
        misses: vec!["q1".to_string()],
        ..MockSearch::default()
    };

    let results = Resolver::new(Arc::new(search)).resolve(&queries(3)).await;

    assert_eq!(
        results.iter().filter(|r| r.is_some()).count(),
        2,
        "only the miss is unresolved"
    );
    assert!(results[1].is_none());
}

#[tokio::test]
async fn test_empty_input_empty_output() {
    let resolver = Resolver::new(Arc::new(MockSearch::default()));
    let results = resolver.resolve(&[]).await;
    assert!(results.is_empty());
}

#[tokio::test]
async fn test_duplicate_queries_resolved_independently() {
    let search = Arc::new(MockSearch::default());
    let resolver = Resolver::new(search.clone());

    let input = vec!["dup".to_string(), "dup".to_string()];
    let results = resolver.resolve(&input).await;

    assert_eq!(results.len(), 2);
    assert_eq!(search.calls.lock().unwrap().len(), 2, "no caching at this layer");
}

#[tokio::test]
async fn test_worker_pool_is_bounded() {
    let mut search = MockSearch::default();
    for query in queries(8) {
        search.delays.insert(query, Duration::from_millis(25));
    }
    let search = Arc::new(search);

    let resolver = Resolver::new(search.clone()).with_concurrency(2);
    resolver.resolve(&queries(8)).await;

    assert!(
        search.max_in_flight.load(Ordering::SeqCst) <= 2,
        "no more than 2 searches in flight, saw {}",
        search.max_in_flight.load(Ordering::SeqCst)
    );
}

#[tokio::test]
async fn test_progress_events_observable() {
    use songbridge_common::events::MigrationEvent;

    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();

    let search = MockSearch {
        misses: vec!["q0".to_string()],
        ..MockSearch::default()
    };
    let resolver = Resolver::new(Arc::new(search)).with_events(tx);
    resolver.resolve(&queries(4)).await;

    let mut started_total = None;
    let mut resolved_events = 0;
    let mut completed_counts = Vec::new();
    let mut final_counts = None;

    while let Ok(event) = rx.try_recv() {
        match event {
            MigrationEvent::ResolveStarted { total, .. } => started_total = Some(total),
            MigrationEvent::TrackResolved { completed, .. } => {
                resolved_events += 1;
                completed_counts.push(completed);
            }
            MigrationEvent::ResolveCompleted {
                resolved,
                unresolved,
                ..
            } => final_counts = Some((resolved, unresolved)),
            _ => {}
        }
    }

    assert_eq!(started_total, Some(4));
    assert_eq!(resolved_events, 4, "one event per query");
    assert_eq!(completed_counts, vec![1, 2, 3, 4], "monotonic progress");
    assert_eq!(final_counts, Some((3, 1)));
}
