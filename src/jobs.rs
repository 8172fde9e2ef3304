use crate::feed::{
    FeedError, FeedEvent, FeedObserver, FeedOrchestrator, FeedOutcome, FeedSubmission,
    ListingImageRequest, ListingImageWorkflow, PollPolicy, TracingObserver,
};
use crate::models::ApiError;
use serde::Serialize;
use std::{
    collections::{HashMap, VecDeque},
    sync::{Arc, Mutex, MutexGuard},
    time::Instant,
};
use tokio::{
    sync::{Semaphore, mpsc},
    task::JoinHandle,
};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use uuid::Uuid;

type SharedJobs = Arc<Mutex<JobTable>>;

#[derive(Clone)]
pub struct JobQueue {
    tx: mpsc::Sender<Job>,
    jobs: SharedJobs,
}

#[derive(Debug, Clone, Copy)]
pub struct QueueLimits {
    pub capacity: usize,
    pub concurrency: usize,
    /// Finished jobs kept for status lookups; the oldest are evicted first.
    pub history: usize,
}

impl QueueLimits {
    pub fn from_env() -> Self {
        Self {
            capacity: usize_from_env("QUEUE_CAPACITY", 64),
            concurrency: usize_from_env("JOB_CONCURRENCY", 4),
            history: usize_from_env("JOB_HISTORY_LIMIT", 256),
        }
    }
}

/// What a job runs against.
#[derive(Clone)]
pub struct JobRunner {
    pub orchestrator: FeedOrchestrator,
    pub listing_images: ListingImageWorkflow,
    pub policy: PollPolicy,
}

#[derive(Debug, Clone)]
enum JobKind {
    Feed(FeedSubmission),
    ListingImage(ListingImageRequest),
}

impl JobKind {
    fn label(&self) -> &'static str {
        match self {
            JobKind::Feed(_) => "feed",
            JobKind::ListingImage(_) => "listing_image",
        }
    }
}

struct Job {
    id: Uuid,
    kind: JobKind,
    cancel: CancellationToken,
}

struct JobEntry {
    org_id: String,
    state: JobState,
    cancel: CancellationToken,
}

struct JobTable {
    entries: HashMap<Uuid, JobEntry>,
    finished: VecDeque<Uuid>,
    history: usize,
}

impl JobTable {
    fn new(history: usize) -> Self {
        Self {
            entries: HashMap::new(),
            finished: VecDeque::new(),
            history,
        }
    }

    /// Lookup scoped to the organisation that submitted the job.
    fn owned(&self, id: &Uuid, org_id: &str) -> Option<&JobEntry> {
        self.entries.get(id).filter(|entry| entry.org_id == org_id)
    }

    fn finish(&mut self, id: Uuid, state: JobState) {
        let Some(entry) = self.entries.get_mut(&id) else {
            return;
        };
        entry.state = state;
        self.finished.push_back(id);
        while self.finished.len() > self.history {
            if let Some(evicted) = self.finished.pop_front() {
                self.entries.remove(&evicted);
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum JobState {
    Queued,
    Running {
        #[serde(skip_serializing_if = "Option::is_none")]
        feed_id: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        processing_status: Option<String>,
        attempts: u32,
    },
    Completed {
        feed_id: String,
        processing_status: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        result_feed_document_id: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        report: Option<String>,
    },
    Failed {
        error: String,
        kind: String,
    },
}

impl JobState {
    fn running() -> Self {
        JobState::Running {
            feed_id: None,
            processing_status: None,
            attempts: 0,
        }
    }

    fn is_finished(&self) -> bool {
        matches!(self, JobState::Completed { .. } | JobState::Failed { .. })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct JobInfo {
    pub id: String,
    #[serde(flatten)]
    pub state: JobState,
}

fn lock(jobs: &SharedJobs) -> MutexGuard<'_, JobTable> {
    jobs.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Mirrors orchestrator progress into the job table.
struct JobObserver {
    id: Uuid,
    jobs: SharedJobs,
}

impl FeedObserver for JobObserver {
    fn on_event(&self, event: &FeedEvent) {
        TracingObserver.on_event(event);
        let mut guard = lock(&self.jobs);
        let Some(entry) = guard.entries.get_mut(&self.id) else {
            return;
        };
        let JobState::Running {
            feed_id,
            processing_status,
            attempts,
        } = &mut entry.state
        else {
            return;
        };
        match event {
            FeedEvent::Submitted { feed_id: id, .. } => *feed_id = Some(id.clone()),
            FeedEvent::Polled {
                attempt, status, ..
            } => {
                *attempts = *attempt;
                *processing_status = Some(status.to_string());
            }
            _ => {}
        }
    }
}

impl JobQueue {
    pub fn spawn(runner: JobRunner) -> (Self, JoinHandle<()>) {
        Self::spawn_with(runner, QueueLimits::from_env())
    }

    pub fn spawn_with(runner: JobRunner, limits: QueueLimits) -> (Self, JoinHandle<()>) {
        let (tx, mut rx) = mpsc::channel::<Job>(limits.capacity.max(1));
        let jobs: SharedJobs = Arc::new(Mutex::new(JobTable::new(limits.history)));
        let jobs_bg = jobs.clone();
        let permits = Arc::new(Semaphore::new(limits.concurrency.max(1)));

        let handle = tokio::spawn(async move {
            while let Some(job) = rx.recv().await {
                let Ok(permit) = permits.clone().acquire_owned().await else {
                    break;
                };
                let runner = runner.clone();
                let jobs = jobs_bg.clone();
                tokio::spawn(async move {
                    run_job(runner, jobs, job).await;
                    drop(permit);
                });
            }
        });

        (Self { tx, jobs }, handle)
    }

    async fn enqueue(&self, kind: JobKind, org_id: &str) -> Result<Uuid, ApiError> {
        let id = Uuid::new_v4();
        let cancel = CancellationToken::new();
        lock(&self.jobs).entries.insert(
            id,
            JobEntry {
                org_id: org_id.to_string(),
                state: JobState::Queued,
                cancel: cancel.clone(),
            },
        );
        info!(
            target = "spapi.jobs",
            job_id = %id,
            org_id = %org_id,
            kind = kind.label(),
            "job queued"
        );
        let job = Job { id, kind, cancel };
        if self.tx.send(job).await.is_err() {
            lock(&self.jobs).entries.remove(&id);
            return Err(ApiError {
                error: "queue_send_failed".into(),
                detail: Some("worker not available".into()),
            });
        }
        Ok(id)
    }

    pub async fn enqueue_feed(
        &self,
        submission: FeedSubmission,
        org_id: &str,
    ) -> Result<Uuid, ApiError> {
        self.enqueue(JobKind::Feed(submission), org_id).await
    }

    pub async fn enqueue_listing_image(
        &self,
        request: ListingImageRequest,
        org_id: &str,
    ) -> Result<Uuid, ApiError> {
        self.enqueue(JobKind::ListingImage(request), org_id).await
    }

    /// Jobs are only visible to the organisation that enqueued them.
    pub fn get(&self, id: Uuid, org_id: &str) -> Option<JobInfo> {
        lock(&self.jobs).owned(&id, org_id).map(|entry| JobInfo {
            id: id.to_string(),
            state: entry.state.clone(),
        })
    }

    /// Requests cancellation. Returns `None` for unknown jobs and `Some(false)`
    /// when the job already finished. A queued job never reaches SP-API.
    pub fn cancel(&self, id: Uuid, org_id: &str) -> Option<bool> {
        let guard = lock(&self.jobs);
        let entry = guard.owned(&id, org_id)?;
        if entry.state.is_finished() {
            return Some(false);
        }
        entry.cancel.cancel();
        Some(true)
    }
}

async fn run_job(runner: JobRunner, jobs: SharedJobs, job: Job) {
    let started = Instant::now();
    let result = if job.cancel.is_cancelled() {
        info!(target = "spapi.jobs", job_id = %job.id, "job cancelled while queued");
        Err(FeedError::CancelledBefore { stage: "start" })
    } else {
        execute(&runner, &jobs, &job).await
    };

    let state = match result {
        Ok(outcome) => JobState::Completed {
            feed_id: outcome.feed_id,
            processing_status: outcome.job.processing_status.to_string(),
            result_feed_document_id: outcome.job.result_feed_document_id,
            report: outcome.report.map(|r| r.text),
        },
        Err(err) => {
            warn!(target = "spapi.jobs", job_id = %job.id, kind = err.kind().as_str(), error = %err, "job failed");
            JobState::Failed {
                error: err.to_string(),
                kind: err.kind().as_str().to_string(),
            }
        }
    };
    let outcome = match &state {
        JobState::Completed { .. } => "completed",
        _ => "failed",
    };
    crate::metrics::job_finished(job.kind.label(), outcome, started.elapsed().as_millis());
    lock(&jobs).finish(job.id, state);
}

async fn execute(runner: &JobRunner, jobs: &SharedJobs, job: &Job) -> Result<FeedOutcome, FeedError> {
    if let Some(entry) = lock(jobs).entries.get_mut(&job.id) {
        entry.state = JobState::running();
    }

    let observer = Arc::new(JobObserver {
        id: job.id,
        jobs: jobs.clone(),
    });
    let orchestrator = runner.orchestrator.with_observer(observer);
    match &job.kind {
        JobKind::Feed(submission) => {
            orchestrator
                .run(submission, &runner.policy, &job.cancel)
                .await
        }
        JobKind::ListingImage(request) => {
            runner
                .listing_images
                .with_orchestrator(orchestrator)
                .run(request, &runner.policy, &job.cancel)
                .await
        }
    }
}

fn usize_from_env(key: &str, default: usize) -> usize {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<usize>().ok())
        .filter(|v| *v > 0)
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feed::types::JSON_LISTINGS_FEED;
    use crate::spapi::{StaticToken, TokenSource};
    use crate::testing::{MockSpApi, in_progress, job_with};
    use std::time::Duration;

    const ORG: &str = "acme";

    fn queue(api: &Arc<MockSpApi>, max_attempts: u32) -> JobQueue {
        queue_with_history(api, max_attempts, 64)
    }

    fn queue_with_history(api: &Arc<MockSpApi>, max_attempts: u32, history: usize) -> JobQueue {
        let tokens: Arc<dyn TokenSource> = Arc::new(StaticToken::new("Atza|test"));
        let orchestrator = FeedOrchestrator::new(api.clone(), api.clone(), tokens.clone());
        let listing_images =
            ListingImageWorkflow::new(orchestrator.clone(), api.clone(), tokens);
        let runner = JobRunner {
            orchestrator,
            listing_images,
            policy: PollPolicy {
                interval: Duration::from_secs(30),
                max_attempts,
            },
        };
        let limits = QueueLimits {
            capacity: 16,
            concurrency: 4,
            history,
        };
        JobQueue::spawn_with(runner, limits).0
    }

    async fn wait_finished(queue: &JobQueue, id: Uuid) -> JobState {
        for _ in 0..200 {
            if let Some(info) = queue.get(id, ORG)
                && info.state.is_finished()
            {
                return info.state;
            }
            tokio::time::sleep(Duration::from_secs(1)).await;
        }
        panic!("job {id} did not finish");
    }

    fn submission() -> FeedSubmission {
        FeedSubmission::new("doc-123", JSON_LISTINGS_FEED, vec!["A21TJRUUN4KGV".into()]).unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn feed_job_completes_with_status() {
        let api = Arc::new(MockSpApi::new());
        api.set_feed_id("feed-456");
        api.push_status(Ok(in_progress("feed-456")));
        api.push_status(Ok(job_with("feed-456", "DONE_NO_DATA", None)));
        let queue = queue(&api, 5);

        let id = queue.enqueue_feed(submission(), ORG).await.unwrap();
        let state = wait_finished(&queue, id).await;
        assert_eq!(
            state,
            JobState::Completed {
                feed_id: "feed-456".into(),
                processing_status: "DONE_NO_DATA".into(),
                result_feed_document_id: None,
                report: None,
            }
        );
    }

    #[tokio::test(start_paused = true)]
    async fn timed_out_job_is_failed_with_kind() {
        let api = Arc::new(MockSpApi::new());
        api.repeat_status(in_progress("feed-1"));
        let queue = queue(&api, 2);

        let id = queue.enqueue_feed(submission(), ORG).await.unwrap();
        match wait_finished(&queue, id).await {
            JobState::Failed { kind, .. } => assert_eq!(kind, "timeout"),
            other => panic!("unexpected state {other:?}"),
        }
        assert_eq!(api.status_reads(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_running_job() {
        let api = Arc::new(MockSpApi::new());
        api.repeat_status(in_progress("feed-1"));
        let queue = queue(&api, 20);

        let id = queue.enqueue_feed(submission(), ORG).await.unwrap();
        tokio::time::sleep(Duration::from_secs(40)).await;
        match queue.get(id, ORG).map(|info| info.state) {
            Some(JobState::Running {
                feed_id, attempts, ..
            }) => {
                assert_eq!(feed_id.as_deref(), Some("feed-1"));
                assert!(attempts >= 1);
            }
            other => panic!("unexpected state {other:?}"),
        }
        assert_eq!(queue.cancel(id, ORG), Some(true));
        match wait_finished(&queue, id).await {
            JobState::Failed { kind, .. } => assert_eq!(kind, "cancelled"),
            other => panic!("unexpected state {other:?}"),
        }
        assert_eq!(queue.cancel(id, ORG), Some(false));
        assert_eq!(queue.cancel(Uuid::new_v4(), ORG), None);
    }

    #[tokio::test]
    async fn unknown_job_is_none() {
        let api = Arc::new(MockSpApi::new());
        let queue = queue(&api, 1);
        assert!(queue.get(Uuid::new_v4(), ORG).is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn jobs_are_scoped_to_their_organisation() {
        let api = Arc::new(MockSpApi::new());
        api.repeat_status(in_progress("feed-1"));
        let queue = queue(&api, 20);

        let id = queue.enqueue_feed(submission(), ORG).await.unwrap();
        assert!(queue.get(id, "other-org").is_none());
        assert_eq!(queue.cancel(id, "other-org"), None);
        assert!(queue.get(id, ORG).is_some());
        assert_eq!(queue.cancel(id, ORG), Some(true));
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_queued_feed_job_never_submits() {
        let api = Arc::new(MockSpApi::new());
        api.repeat_status(in_progress("feed-1"));
        let queue = queue(&api, 20);

        let id = queue.enqueue_feed(submission(), ORG).await.unwrap();
        assert_eq!(queue.cancel(id, ORG), Some(true));
        match wait_finished(&queue, id).await {
            JobState::Failed { kind, error } => {
                assert_eq!(kind, "cancelled");
                assert_eq!(error, "cancelled before start");
            }
            other => panic!("unexpected state {other:?}"),
        }
        assert!(api.created_feeds().is_empty());
        assert_eq!(api.status_reads(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_queued_image_job_never_uploads() {
        let api = Arc::new(MockSpApi::new());
        api.set_product_type("A1SELLER", "0A-SLD7-P9Y1", "LUGGAGE");
        let queue = queue(&api, 20);

        let request = ListingImageRequest {
            seller_id: "A1SELLER".into(),
            sku: "0A-SLD7-P9Y1".into(),
            image_url: "https://bucket.s3.eu-west-1.amazonaws.com/photo.png".into(),
            slot: crate::spapi::ImageSlot::Main,
            marketplace_id: "A21TJRUUN4KGV".into(),
            product_type: None,
            operation: None,
        };
        let id = queue.enqueue_listing_image(request, ORG).await.unwrap();
        assert_eq!(queue.cancel(id, ORG), Some(true));
        match wait_finished(&queue, id).await {
            JobState::Failed { kind, .. } => assert_eq!(kind, "cancelled"),
            other => panic!("unexpected state {other:?}"),
        }
        assert!(api.tokens_seen().is_empty());
        assert!(api.uploads().is_empty());
        assert!(api.created_feeds().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn finished_jobs_are_evicted_oldest_first() {
        let api = Arc::new(MockSpApi::new());
        api.repeat_status(job_with("feed-1", "DONE_NO_DATA", None));
        let queue = queue_with_history(&api, 3, 2);

        let mut ids = Vec::new();
        for _ in 0..5 {
            let id = queue.enqueue_feed(submission(), ORG).await.unwrap();
            wait_finished(&queue, id).await;
            ids.push(id);
        }
        assert_eq!(api.created_feeds().len(), 5);
        assert_eq!(lock(&queue.jobs).entries.len(), 2);
        for old in &ids[..3] {
            assert!(queue.get(*old, ORG).is_none());
        }
        for recent in &ids[3..] {
            assert!(queue.get(*recent, ORG).is_some());
        }
    }
}
