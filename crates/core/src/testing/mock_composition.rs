//! Mock composition API for testing.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::composition::{CompositionApi, CompositionError, CompositionJob, JobHandle};
use crate::media::ImageRef;

use super::fixtures;

/// A recorded submission for test assertions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedSubmission {
    pub job_id: String,
    pub target: ImageRef,
    pub source: ImageRef,
}

/// How jobs end once their pending polls are used up.
#[derive(Debug, Clone, PartialEq, Eq)]
enum MockJobOutcome {
    Succeed,
    Fail(String),
    NeverFinish,
}

/// Mock implementation of the CompositionApi trait.
///
/// Provides controllable behavior for testing:
/// - Track submissions, status polls and cancellations
/// - Jobs stay pending for a configurable number of polls
/// - Jobs succeed, fail or never finish
/// - Inject submit and status errors
/// - Slow down status polls and cancellations
///
/// # Example
///
/// ```rust,ignore
/// use luckyticket_core::testing::MockCompositionApi;
///
/// let api = MockCompositionApi::new();
/// api.set_pending_polls(2).await;
///
/// // ...run a composition...
///
/// assert_eq!(api.submissions().await.len(), 1);
/// assert_eq!(api.status_calls().await, 3);
/// ```
#[derive(Debug)]
pub struct MockCompositionApi {
    submissions: Arc<RwLock<Vec<RecordedSubmission>>>,
    status_calls: Arc<RwLock<u32>>,
    cancelled: Arc<RwLock<Vec<String>>>,
    downloads: Arc<RwLock<Vec<ImageRef>>>,
    pending_polls: Arc<RwLock<u32>>,
    outcome: Arc<RwLock<MockJobOutcome>>,
    next_submit_error: Arc<RwLock<Option<CompositionError>>>,
    next_status_error: Arc<RwLock<Option<CompositionError>>>,
    status_delay: Arc<RwLock<Duration>>,
    cancel_delay: Arc<RwLock<Duration>>,
}

impl Default for MockCompositionApi {
    fn default() -> Self {
        Self::new()
    }
}

impl MockCompositionApi {
    /// Create a mock whose jobs succeed on the first poll.
    pub fn new() -> Self {
        Self {
            submissions: Arc::new(RwLock::new(Vec::new())),
            status_calls: Arc::new(RwLock::new(0)),
            cancelled: Arc::new(RwLock::new(Vec::new())),
            downloads: Arc::new(RwLock::new(Vec::new())),
            pending_polls: Arc::new(RwLock::new(0)),
            outcome: Arc::new(RwLock::new(MockJobOutcome::Succeed)),
            next_submit_error: Arc::new(RwLock::new(None)),
            next_status_error: Arc::new(RwLock::new(None)),
            status_delay: Arc::new(RwLock::new(Duration::ZERO)),
            cancel_delay: Arc::new(RwLock::new(Duration::ZERO)),
        }
    }

    /// Report `pending` for the next `polls` status calls.
    pub async fn set_pending_polls(&self, polls: u32) {
        *self.pending_polls.write().await = polls;
    }

    /// Jobs end in the failed state with `reason`.
    pub async fn fail_jobs(&self, reason: impl Into<String>) {
        *self.outcome.write().await = MockJobOutcome::Fail(reason.into());
    }

    /// Jobs stay pending forever.
    pub async fn never_finish(&self) {
        *self.outcome.write().await = MockJobOutcome::NeverFinish;
    }

    /// Every status poll takes `delay` before answering.
    pub async fn set_status_delay(&self, delay: Duration) {
        *self.status_delay.write().await = delay;
    }

    /// Every cancellation takes `delay` before it is recorded.
    pub async fn set_cancel_delay(&self, delay: Duration) {
        *self.cancel_delay.write().await = delay;
    }

    /// Configure the next submit to fail with the given error.
    pub async fn set_submit_error(&self, error: CompositionError) {
        *self.next_submit_error.write().await = Some(error);
    }

    /// Configure the next status poll to fail with the given error.
    pub async fn set_status_error(&self, error: CompositionError) {
        *self.next_status_error.write().await = Some(error);
    }

    pub async fn submissions(&self) -> Vec<RecordedSubmission> {
        self.submissions.read().await.clone()
    }

    pub async fn status_calls(&self) -> u32 {
        *self.status_calls.read().await
    }

    pub async fn cancelled_jobs(&self) -> Vec<String> {
        self.cancelled.read().await.clone()
    }

    /// Remote cancels run in the background; wait up to `within` for
    /// `count` of them to land.
    pub async fn wait_for_cancellations(&self, count: usize, within: Duration) -> Vec<String> {
        let deadline = tokio::time::Instant::now() + within;
        loop {
            let cancelled = self.cancelled_jobs().await;
            if cancelled.len() >= count || tokio::time::Instant::now() >= deadline {
                return cancelled;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    }

    pub async fn downloads(&self) -> Vec<ImageRef> {
        self.downloads.read().await.clone()
    }
}

#[async_trait]
impl CompositionApi for MockCompositionApi {
    fn name(&self) -> &str {
        "mock"
    }

    async fn submit(
        &self,
        target: &ImageRef,
        source: &ImageRef,
    ) -> Result<JobHandle, CompositionError> {
        if let Some(err) = self.next_submit_error.write().await.take() {
            return Err(err);
        }

        let mut submissions = self.submissions.write().await;
        let job_id = format!("mock-job-{}", submissions.len() + 1);
        submissions.push(RecordedSubmission {
            job_id: job_id.clone(),
            target: target.clone(),
            source: source.clone(),
        });
        Ok(JobHandle::new(job_id))
    }

    async fn status(&self, job_id: &str) -> Result<CompositionJob, CompositionError> {
        *self.status_calls.write().await += 1;

        let delay = *self.status_delay.read().await;
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        if let Some(err) = self.next_status_error.write().await.take() {
            return Err(err);
        }

        {
            let mut pending = self.pending_polls.write().await;
            if *pending > 0 {
                *pending -= 1;
                return Ok(CompositionJob::pending(job_id));
            }
        }

        Ok(match &*self.outcome.read().await {
            MockJobOutcome::Succeed => CompositionJob::succeeded(
                job_id,
                ImageRef::Remote(format!("mock://results/{}.png", job_id)),
            ),
            MockJobOutcome::Fail(reason) => CompositionJob::failed(job_id, reason.clone()),
            MockJobOutcome::NeverFinish => CompositionJob::pending(job_id),
        })
    }

    async fn cancel(&self, job_id: &str) -> Result<(), CompositionError> {
        let delay = *self.cancel_delay.read().await;
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        self.cancelled.write().await.push(job_id.to_string());
        Ok(())
    }

    async fn download(&self, result: &ImageRef, dest: &Path) -> Result<(), CompositionError> {
        let bytes = fixtures::png_bytes(64, 64).map_err(|e| CompositionError::Parse(e.to_string()))?;
        tokio::fs::write(dest, bytes).await?;
        self.downloads.write().await.push(result.clone());
        Ok(())
    }
}
