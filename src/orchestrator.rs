//! Bounded-concurrency batch downloads.
//!
//! A batch is a list of [`DownloadTask`]s. Each task decodes its locator,
//! streams the media through a [`MediaSource`] and writes it with
//! [`storage::write_stream`]. At most `max_concurrency` tasks are in flight;
//! the rest wait for a permit. One task failing never stops its siblings, and
//! [`Orchestrator::run`] only returns once every task has an outcome.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use futures_util::TryStreamExt;
use tokio::sync::Semaphore;
use tokio::task::{Id, JoinSet};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::api::MediaSource;
use crate::crypto;
use crate::error::{Result, SaavnError};
use crate::models::{Quality, TrackDescriptor};
use crate::storage;

/// Concurrent downloads allowed by default.
pub const DEFAULT_MAX_CONCURRENCY: usize = 20;

/// One track bound to the file it will be written to.
#[derive(Debug, Clone, PartialEq)]
pub struct DownloadTask {
    /// Position in the batch; outcomes are reported in this order.
    pub id: usize,
    pub track: TrackDescriptor,
    pub destination: PathBuf,
}

impl DownloadTask {
    pub fn new(id: usize, track: TrackDescriptor, destination: PathBuf) -> Self {
        Self {
            id,
            track,
            destination,
        }
    }
}

/// Terminal state of a task.
#[derive(Debug)]
pub struct DownloadOutcome {
    /// The task this outcome belongs to.
    pub task: DownloadTask,
    /// Bytes written on success.
    pub result: Result<u64>,
}

impl DownloadOutcome {
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }

    /// The error, if the task failed.
    pub fn error(&self) -> Option<&SaavnError> {
        self.result.as_ref().err()
    }
}

/// Every outcome of a batch, ordered by task id.
#[derive(Debug, Default)]
pub struct AggregateResult {
    pub outcomes: Vec<DownloadOutcome>,
}

impl AggregateResult {
    /// Total number of tasks attempted.
    pub fn total(&self) -> usize {
        self.outcomes.len()
    }

    pub fn successful(&self) -> impl Iterator<Item = &DownloadOutcome> {
        self.outcomes.iter().filter(|o| o.is_success())
    }

    pub fn failed(&self) -> impl Iterator<Item = &DownloadOutcome> {
        self.outcomes.iter().filter(|o| !o.is_success())
    }

    /// Check if all tasks succeeded.
    pub fn all_successful(&self) -> bool {
        self.outcomes.iter().all(DownloadOutcome::is_success)
    }

    /// Sum of bytes written by successful tasks.
    pub fn bytes_downloaded(&self) -> u64 {
        self.outcomes
            .iter()
            .filter_map(|o| o.result.as_ref().ok())
            .sum()
    }
}

/// Receives per-task progress. All methods are called from worker tasks.
pub trait ProgressObserver: Send + Sync {
    /// A task obtained a permit and is starting.
    fn on_start(&self, _task: &DownloadTask) {}

    /// Bytes were written. Only called when the response declared a size.
    fn on_progress(&self, task_id: usize, bytes_done: u64, bytes_total: u64);

    /// A task reached its terminal state.
    fn on_finish(&self, _outcome: &DownloadOutcome) {}
}

/// Runs download batches with a concurrency limit.
pub struct Orchestrator {
    source: Arc<dyn MediaSource>,
    max_concurrency: usize,
    quality: Quality,
    observer: Option<Arc<dyn ProgressObserver>>,
}

impl Orchestrator {
    pub fn new(source: Arc<dyn MediaSource>) -> Self {
        Self {
            source,
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
            quality: Quality::default(),
            observer: None,
        }
    }

    /// Limit simultaneous downloads. Zero is treated as one.
    pub fn with_max_concurrency(mut self, max_concurrency: usize) -> Self {
        self.max_concurrency = max_concurrency.max(1);
        self
    }

    /// Bitrate substituted into decoded URLs.
    pub fn with_quality(mut self, quality: Quality) -> Self {
        self.quality = quality;
        self
    }

    pub fn with_observer(mut self, observer: Arc<dyn ProgressObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    pub fn max_concurrency(&self) -> usize {
        self.max_concurrency
    }

    /// Download every task, returning once all have finished.
    ///
    /// Cancelling `cancel` stops dispatch; queued and in-flight tasks finish
    /// with [`SaavnError::Cancelled`]. A worker that panics is reported as
    /// [`SaavnError::TaskPanicked`].
    pub async fn run(&self, tasks: Vec<DownloadTask>, cancel: &CancellationToken) -> AggregateResult {
        let total = tasks.len();
        if total == 0 {
            return AggregateResult::default();
        }

        info!(
            "Starting batch of {} downloads ({} at a time)",
            total, self.max_concurrency
        );

        let semaphore = Arc::new(Semaphore::new(self.max_concurrency));
        let mut workers = JoinSet::new();
        // Each worker's task, kept so a panicked worker still gets an outcome.
        let mut running: HashMap<Id, DownloadTask> = HashMap::with_capacity(total);
        let mut outcomes = Vec::with_capacity(total);

        for task in tasks {
            let permit = tokio::select! {
                biased;
                _ = cancel.cancelled() => None,
                permit = semaphore.clone().acquire_owned() => permit.ok(),
            };

            let Some(permit) = permit else {
                debug!("Task {} cancelled before start", task.id);
                outcomes.push(DownloadOutcome {
                    task,
                    result: Err(SaavnError::Cancelled),
                });
                continue;
            };

            let source = Arc::clone(&self.source);
            let observer = self.observer.clone();
            let cancel = cancel.clone();
            let quality = self.quality;
            let tracked = task.clone();

            let handle = workers.spawn(async move {
                let _permit = permit;
                if let Some(observer) = &observer {
                    observer.on_start(&task);
                }

                let result = tokio::select! {
                    _ = cancel.cancelled() => Err(SaavnError::Cancelled),
                    result = download_one(&task, source.as_ref(), quality, observer.as_deref()) => result,
                };

                match &result {
                    Ok(bytes) => debug!("Task {} done: {} bytes", task.id, bytes),
                    Err(e) => warn!("Task {} ({}) failed: {}", task.id, task.track.title, e),
                }

                let outcome = DownloadOutcome { task, result };
                if let Some(observer) = &observer {
                    observer.on_finish(&outcome);
                }
                outcome
            });
            running.insert(handle.id(), tracked);
        }

        while let Some(joined) = workers.join_next_with_id().await {
            match joined {
                Ok((id, outcome)) => {
                    running.remove(&id);
                    outcomes.push(outcome);
                }
                Err(e) => {
                    let Some(task) = running.remove(&e.id()) else {
                        warn!("Lost track of a failed worker: {}", e);
                        continue;
                    };
                    warn!("Task {} ({}) panicked: {}", task.id, task.track.title, e);
                    let outcome = DownloadOutcome {
                        task,
                        result: Err(SaavnError::TaskPanicked(e.to_string())),
                    };
                    if let Some(observer) = &self.observer {
                        observer.on_finish(&outcome);
                    }
                    outcomes.push(outcome);
                }
            }
        }

        outcomes.sort_by_key(|o| o.task.id);

        let result = AggregateResult { outcomes };
        info!(
            "Batch finished: {}/{} succeeded",
            result.successful().count(),
            result.total()
        );
        result
    }
}

async fn download_one(
    task: &DownloadTask,
    source: &dyn MediaSource,
    quality: Quality,
    observer: Option<&dyn ProgressObserver>,
) -> Result<u64> {
    let url = crypto::decode_locator_with(&task.track.encrypted_media_url, quality)?;
    let body = source.open(&url).await?;

    let task_id = task.id;
    let total = body.total;
    let mut done = 0u64;
    let stream = body.stream.inspect_ok(move |chunk| {
        done += chunk.len() as u64;
        if let (Some(observer), Some(total)) = (observer, total) {
            observer.on_progress(task_id, done, total);
        }
    });

    storage::write_stream(&task.destination, stream).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::MediaBody;
    use crate::crypto::tests::encrypt_locator;
    use async_trait::async_trait;
    use bytes::Bytes;
    use futures_util::stream::{self, StreamExt};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    /// Serves a fixed body for every URL and tracks overlapping `open` calls.
    #[derive(Default)]
    struct FakeSource {
        active: AtomicUsize,
        peak: AtomicUsize,
        opened: AtomicUsize,
        delay_ms: u64,
        hang: bool,
        /// Panic when the URL contains this.
        panic_on: Option<&'static str>,
    }

    #[async_trait]
    impl MediaSource for FakeSource {
        async fn open(&self, url: &str) -> Result<MediaBody> {
            self.opened.fetch_add(1, Ordering::SeqCst);
            let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);

            if let Some(needle) = self.panic_on {
                if url.contains(needle) {
                    panic!("media source failed hard on {}", url);
                }
            }
            if self.hang {
                std::future::pending::<()>().await;
            }
            tokio::time::sleep(Duration::from_millis(self.delay_ms)).await;
            self.active.fetch_sub(1, Ordering::SeqCst);

            let body = Bytes::from(format!("audio from {}", url));
            let total = body.len() as u64;
            let halves = vec![
                Ok(body.slice(..total as usize / 2)),
                Ok(body.slice(total as usize / 2..)),
            ];
            Ok(MediaBody {
                total: Some(total),
                stream: stream::iter(halves).boxed(),
            })
        }
    }

    #[derive(Default)]
    struct RecordingObserver {
        progress: Mutex<Vec<(usize, u64, u64)>>,
        finished: AtomicUsize,
    }

    impl ProgressObserver for RecordingObserver {
        fn on_progress(&self, task_id: usize, bytes_done: u64, bytes_total: u64) {
            self.progress
                .lock()
                .unwrap()
                .push((task_id, bytes_done, bytes_total));
        }

        fn on_finish(&self, _outcome: &DownloadOutcome) {
            self.finished.fetch_add(1, Ordering::SeqCst);
        }
    }

    /// Counts tasks between `on_start` and `on_finish`.
    #[derive(Default)]
    struct InFlightObserver {
        active: AtomicUsize,
        peak: AtomicUsize,
        started: AtomicUsize,
    }

    impl ProgressObserver for InFlightObserver {
        fn on_start(&self, _task: &DownloadTask) {
            self.started.fetch_add(1, Ordering::SeqCst);
            let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
        }

        fn on_progress(&self, _task_id: usize, _bytes_done: u64, _bytes_total: u64) {}

        fn on_finish(&self, _outcome: &DownloadOutcome) {
            self.active.fetch_sub(1, Ordering::SeqCst);
        }
    }

    fn tasks(root: &std::path::Path, count: usize) -> Vec<DownloadTask> {
        (0..count)
            .map(|i| {
                let track = TrackDescriptor {
                    id: format!("song{}", i),
                    title: format!("Track {}", i),
                    album: "Album".to_string(),
                    artist: "Artist".to_string(),
                    encrypted_media_url: encrypt_locator(
                        format!("https://aac.saavncdn.com/{}/file_96.mp4", i).as_bytes(),
                    ),
                    ..Default::default()
                };
                let dest = storage::track_path(root, "Artist", "Album", &track.title, "m4a");
                DownloadTask::new(i, track, dest)
            })
            .collect()
    }

    #[tokio::test]
    async fn test_concurrency_is_bounded() {
        let dir = tempfile::tempdir().unwrap();
        let source = Arc::new(FakeSource {
            delay_ms: 10,
            ..Default::default()
        });
        let observer = Arc::new(InFlightObserver::default());
        let orchestrator = Orchestrator::new(source.clone())
            .with_max_concurrency(20)
            .with_observer(observer.clone());

        let result = orchestrator
            .run(tasks(dir.path(), 50), &CancellationToken::new())
            .await;

        assert_eq!(result.total(), 50);
        assert!(result.all_successful());
        assert_eq!(observer.started.load(Ordering::SeqCst), 50);
        assert_eq!(observer.active.load(Ordering::SeqCst), 0);

        // From start to terminal state, not just while opening.
        let peak = observer.peak.load(Ordering::SeqCst);
        assert!(peak <= 20, "peak in-flight was {}", peak);
        assert!(peak > 1, "downloads never overlapped");
        assert!(source.peak.load(Ordering::SeqCst) <= 20);
    }

    #[tokio::test]
    async fn test_panicking_worker_still_reports() {
        let dir = tempfile::tempdir().unwrap();
        let source = Arc::new(FakeSource {
            panic_on: Some("/3/"),
            ..Default::default()
        });
        let observer = Arc::new(RecordingObserver::default());
        let orchestrator = Orchestrator::new(source).with_observer(observer.clone());

        let result = orchestrator
            .run(tasks(dir.path(), 5), &CancellationToken::new())
            .await;

        let ids: Vec<_> = result.outcomes.iter().map(|o| o.task.id).collect();
        assert_eq!(ids, vec![0, 1, 2, 3, 4]);
        assert_eq!(result.successful().count(), 4);
        assert!(matches!(
            result.outcomes[3].error(),
            Some(SaavnError::TaskPanicked(_))
        ));
        assert_eq!(observer.finished.load(Ordering::SeqCst), 5);
    }

    #[tokio::test]
    async fn test_partial_failure_is_contained() {
        let dir = tempfile::tempdir().unwrap();
        let mut batch = tasks(dir.path(), 10);

        // Task 7 writes beneath a regular file, which cannot succeed.
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, b"not a directory").unwrap();
        batch[7].destination = blocker.join("Track 7.m4a");

        let orchestrator = Orchestrator::new(Arc::new(FakeSource::default()));
        let result = orchestrator.run(batch, &CancellationToken::new()).await;

        assert_eq!(result.total(), 10);
        assert_eq!(result.successful().count(), 9);
        let failed: Vec<_> = result.failed().collect();
        assert_eq!(failed.len(), 1);
        assert_eq!(failed[0].task.id, 7);
        assert!(matches!(failed[0].error(), Some(SaavnError::Io(_))));

        // Outcomes come back in task order.
        let ids: Vec<_> = result.outcomes.iter().map(|o| o.task.id).collect();
        assert_eq!(ids, (0..10).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn test_writes_decoded_media_to_layout() {
        let dir = tempfile::tempdir().unwrap();
        let orchestrator = Orchestrator::new(Arc::new(FakeSource::default()));
        let result = orchestrator
            .run(tasks(dir.path(), 1), &CancellationToken::new())
            .await;

        assert!(result.all_successful());
        let path = dir.path().join("Artist").join("Album").join("Track 0.m4a");
        let body = std::fs::read_to_string(path).unwrap();
        assert_eq!(body, "audio from https://aac.saavncdn.com/0/file_320.mp4");
        assert_eq!(result.bytes_downloaded(), body.len() as u64);
    }

    #[tokio::test]
    async fn test_bad_locator_fails_only_that_task() {
        let dir = tempfile::tempdir().unwrap();
        let mut batch = tasks(dir.path(), 3);
        batch[1].track.encrypted_media_url = "AAAA".to_string();

        let source = Arc::new(FakeSource::default());
        let orchestrator = Orchestrator::new(source.clone());
        let result = orchestrator.run(batch, &CancellationToken::new()).await;

        assert_eq!(result.successful().count(), 2);
        assert!(matches!(
            result.outcomes[1].error(),
            Some(SaavnError::MalformedLocator(_))
        ));
        assert_eq!(source.opened.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_progress_reported_per_chunk() {
        let dir = tempfile::tempdir().unwrap();
        let observer = Arc::new(RecordingObserver::default());
        let orchestrator =
            Orchestrator::new(Arc::new(FakeSource::default())).with_observer(observer.clone());

        let result = orchestrator
            .run(tasks(dir.path(), 2), &CancellationToken::new())
            .await;
        assert!(result.all_successful());

        let progress = observer.progress.lock().unwrap().clone();
        assert_eq!(progress.len(), 4);
        for task_id in 0..2 {
            let last = progress.iter().filter(|p| p.0 == task_id).last().unwrap();
            assert_eq!(last.1, last.2);
        }
        assert_eq!(observer.finished.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_cancel_before_run() {
        let dir = tempfile::tempdir().unwrap();
        let cancel = CancellationToken::new();
        cancel.cancel();

        let source = Arc::new(FakeSource::default());
        let orchestrator = Orchestrator::new(source.clone());
        let result = orchestrator.run(tasks(dir.path(), 5), &cancel).await;

        assert_eq!(result.total(), 5);
        assert!(result
            .outcomes
            .iter()
            .all(|o| matches!(o.error(), Some(SaavnError::Cancelled))));
        assert_eq!(source.opened.load(Ordering::SeqCst), 0);
        assert!(!dir.path().join("Artist").exists());
    }

    #[tokio::test]
    async fn test_cancel_in_flight() {
        let dir = tempfile::tempdir().unwrap();
        let cancel = CancellationToken::new();
        let source = Arc::new(FakeSource {
            hang: true,
            ..Default::default()
        });
        let orchestrator = Orchestrator::new(source).with_max_concurrency(2);

        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            trigger.cancel();
        });

        let result = orchestrator.run(tasks(dir.path(), 6), &cancel).await;
        assert_eq!(result.total(), 6);
        assert!(result
            .outcomes
            .iter()
            .all(|o| matches!(o.error(), Some(SaavnError::Cancelled))));
    }

    #[tokio::test]
    async fn test_empty_batch() {
        let orchestrator = Orchestrator::new(Arc::new(FakeSource::default()));
        let result = orchestrator.run(Vec::new(), &CancellationToken::new()).await;
        assert_eq!(result.total(), 0);
        assert!(result.all_successful());
    }
}
