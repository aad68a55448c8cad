//! API-path population integration tests
//!
//! Retry/backoff on transient failures, the quota short-circuit,
//! skipped-vs-failed accounting, and the documented duplicate behavior on
//! resume.

use async_trait::async_trait;
use songbridge::clients::{PlaylistApi, PlaylistId, RemoteError, VideoId};
use songbridge::populate::api::{ApiPopulator, PlaylistTarget};
use songbridge::retry::RetryPolicy;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// Scripted destination API with call recording
#[derive(Default)]
struct MockPlaylistApi {
    /// per-video scripted failures, consumed one per attempt
    failures: Mutex<HashMap<String, VecDeque<RemoteError>>>,
    add_calls: Mutex<Vec<String>>,
    contents: Mutex<Vec<String>>,
    playlists: Mutex<Vec<(String, String)>>,
    next_playlist: AtomicUsize,
}

impl MockPlaylistApi {
    fn fail_with(&self, video: &str, errors: Vec<RemoteError>) {
        self.failures
            .lock()
            .unwrap()
            .insert(video.to_string(), errors.into());
    }

    fn add_call_count(&self) -> usize {
        self.add_calls.lock().unwrap().len()
    }
}

#[async_trait]
impl PlaylistApi for MockPlaylistApi {
    async fn create_playlist(
        &self,
        title: &str,
        _description: &str,
    ) -> Result<PlaylistId, RemoteError> {
        let id = format!("PL{}", self.next_playlist.fetch_add(1, Ordering::SeqCst));
        self.playlists
            .lock()
            .unwrap()
            .push((title.to_string(), id.clone()));
        Ok(PlaylistId(id))
    }

    async fn find_playlist_by_name(&self, title: &str) -> Result<Option<PlaylistId>, RemoteError> {
        Ok(self
            .playlists
            .lock()
            .unwrap()
            .iter()
            .find(|(t, _)| t == title)
            .map(|(_, id)| PlaylistId(id.clone())))
    }

    async fn add_item(&self, _playlist: &PlaylistId, video: &VideoId) -> Result<(), RemoteError> {
        self.add_calls.lock().unwrap().push(video.0.clone());

        if let Some(queue) = self.failures.lock().unwrap().get_mut(video.as_str()) {
            if let Some(err) = queue.pop_front() {
                return Err(err);
            }
        }

        self.contents.lock().unwrap().push(video.0.clone());
        Ok(())
    }
}

fn identifiers(count: usize) -> Vec<Option<VideoId>> {
    (0..count).map(|i| Some(VideoId(format!("v{}", i)))).collect()
}

fn fast_policy() -> RetryPolicy {
    RetryPolicy {
        max_attempts: 3,
        initial_delay: Duration::from_millis(10),
    }
}

fn populator(api: &Arc<MockPlaylistApi>) -> ApiPopulator {
    ApiPopulator::new(api.clone()).with_policy(fast_policy())
}

#[tokio::test]
async fn test_all_present_identifiers_added_in_order() {
    let api = Arc::new(MockPlaylistApi::default());
    let outcome = populator(&api)
        .populate(&PlaylistId::from("PL0"), &identifiers(3))
        .await;

    assert_eq!(outcome.added, 3);
    assert_eq!(outcome.failed, 0);
    assert!(!outcome.halted);
    assert_eq!(*api.contents.lock().unwrap(), vec!["v0", "v1", "v2"]);
}

#[tokio::test]
async fn test_absent_identifiers_skipped_without_remote_call() {
    let api = Arc::new(MockPlaylistApi::default());

    let sequence = vec![
        Some(VideoId::from("v0")),
        None,
        Some(VideoId::from("v2")),
        None,
    ];
    let outcome = populator(&api)
        .populate(&PlaylistId::from("PL0"), &sequence)
        .await;

    assert_eq!(outcome.added, 2);
    assert_eq!(outcome.skipped, 2);
    assert_eq!(outcome.failed, 0);
    assert_eq!(api.add_call_count(), 2, "unresolved entries never hit the API");
}

#[tokio::test]
async fn test_quota_exhaustion_short_circuits_remaining_batch() {
    let api = Arc::new(MockPlaylistApi::default());
    // item 5 of 10 trips the quota
    api.fail_with("v4", vec![RemoteError::from_status(403, "quotaExceeded")]);

    let outcome = populator(&api)
        .populate(&PlaylistId::from("PL0"), &identifiers(10))
        .await;

    assert_eq!(outcome.added, 4);
    assert_eq!(outcome.failed, 1);
    assert!(outcome.halted);
    // items 6-10 never attempted, and the quota error itself is not retried
    assert_eq!(api.add_call_count(), 5);
    // completed work stands
    assert_eq!(*api.contents.lock().unwrap(), vec!["v0", "v1", "v2", "v3"]);
}

#[tokio::test]
async fn test_transient_failure_retried_then_succeeds() {
    let api = Arc::new(MockPlaylistApi::default());
    api.fail_with(
        "v0",
        vec![
            RemoteError::from_status(503, "unavailable"),
            RemoteError::from_status(503, "unavailable"),
        ],
    );

    let start = Instant::now();
    let outcome = populator(&api)
        .populate(&PlaylistId::from("PL0"), &identifiers(1))
        .await;

    assert_eq!(outcome.added, 1);
    assert_eq!(outcome.failed, 0);
    assert_eq!(api.add_call_count(), 3, "two retries after the initial attempt");
    // backoff slept 10ms then 20ms
    assert!(start.elapsed() >= Duration::from_millis(30));
}

#[tokio::test]
async fn test_retry_bound_exhausted_downgrades_to_item_failure() {
    let api = Arc::new(MockPlaylistApi::default());
    api.fail_with(
        "v1",
        vec![
            RemoteError::from_status(503, "unavailable"),
            RemoteError::from_status(503, "unavailable"),
            RemoteError::from_status(503, "unavailable"),
        ],
    );

    let outcome = populator(&api)
        .populate(&PlaylistId::from("PL0"), &identifiers(3))
        .await;

    assert_eq!(outcome.added, 2);
    assert_eq!(outcome.failed, 1);
    assert!(!outcome.halted, "transient exhaustion does not stop the batch");
    assert_eq!(*api.contents.lock().unwrap(), vec!["v0", "v2"]);
}

#[tokio::test]
async fn test_non_retryable_failure_continues_with_next_item() {
    let api = Arc::new(MockPlaylistApi::default());
    api.fail_with("v1", vec![RemoteError::from_status(400, "bad request")]);

    let outcome = populator(&api)
        .populate(&PlaylistId::from("PL0"), &identifiers(3))
        .await;

    assert_eq!(outcome.added, 2);
    assert_eq!(outcome.failed, 1);
    // no retry for a client error: exactly one call per item
    assert_eq!(api.add_call_count(), 3);
}

#[tokio::test]
async fn test_rerun_adds_duplicates() {
    // population does not consult existing playlist contents; re-running
    // against the same artifact duplicates every entry
    let api = Arc::new(MockPlaylistApi::default());
    let playlist = PlaylistId::from("PL0");
    let sequence = identifiers(2);

    let first = populator(&api).populate(&playlist, &sequence).await;
    let second = populator(&api).populate(&playlist, &sequence).await;

    assert_eq!(first.added, 2);
    assert_eq!(second.added, 2);
    assert_eq!(
        *api.contents.lock().unwrap(),
        vec!["v0", "v1", "v0", "v1"],
        "duplicates are expected on resume"
    );
}

#[tokio::test]
async fn test_ensure_playlist_creates_then_reuses() {
    let api = Arc::new(MockPlaylistApi::default());
    let populator = populator(&api);

    let target = PlaylistTarget::Named("Road Trip".to_string());
    let first = populator.ensure_playlist(&target).await.unwrap();
    let second = populator.ensure_playlist(&target).await.unwrap();

    assert_eq!(first, second, "exact-title match reused");
    assert_eq!(api.playlists.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn test_ensure_playlist_existing_handle_passes_through() {
    let api = Arc::new(MockPlaylistApi::default());
    let target = PlaylistTarget::Existing(PlaylistId::from("PLxyz"));

    let resolved = populator(&api).ensure_playlist(&target).await.unwrap();
    assert_eq!(resolved, PlaylistId::from("PLxyz"));
    assert!(api.playlists.lock().unwrap().is_empty(), "no remote call");
}
