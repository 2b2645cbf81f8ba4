//! Submit, poll and download with a fallback to the source photo.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::error::CompositionError;
use super::traits::CompositionApi;
use super::types::{CompositionResult, JobHandle, JobStatus, PollOptions};
use crate::media::ImageRef;
use crate::metrics::{COMPOSITIONS_TOTAL, COMPOSITION_FALLBACKS, POLL_ATTEMPTS};

/// Upper bound on a background remote cancel.
const ABANDON_TIMEOUT: Duration = Duration::from_secs(5);

/// Drives one composition job to completion.
///
/// Holds no per-run state and may be shared between sessions.
pub struct CompositionClient {
    api: Option<Arc<dyn CompositionApi>>,
    poll: PollOptions,
    output_dir: PathBuf,
}

impl CompositionClient {
    /// Create a client. `api == None` means degraded mode: every
    /// [`compose`](Self::compose) falls back immediately.
    pub fn new(
        api: Option<Arc<dyn CompositionApi>>,
        poll: PollOptions,
        output_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            api,
            poll,
            output_dir: output_dir.into(),
        }
    }

    /// Whether a remote API is wired in.
    pub fn is_configured(&self) -> bool {
        self.api.is_some()
    }

    pub fn poll_options(&self) -> PollOptions {
        self.poll
    }

    fn api(&self) -> Result<&Arc<dyn CompositionApi>, CompositionError> {
        self.api.as_ref().ok_or_else(|| {
            CompositionError::NotConfigured("no composition API credential".to_string())
        })
    }

    /// Submit a job. Returns as soon as the service assigned an id.
    pub async fn submit(
        &self,
        target: &ImageRef,
        source: &ImageRef,
    ) -> Result<JobHandle, CompositionError> {
        self.api()?.submit(target, source).await
    }

    /// Poll `handle` until it reaches a terminal state.
    ///
    /// Sleeps `poll_interval` between attempts and gives up with
    /// [`CompositionError::Timeout`] after `max_attempts` polls or once
    /// [`PollOptions::ceiling`] has elapsed, whichever comes first. A slow
    /// status call counts against the ceiling. Transient status errors
    /// consume an attempt. On cancellation or timeout the remote job is
    /// cancelled best-effort in the background.
    pub async fn await_result(
        &self,
        handle: &JobHandle,
        opts: &PollOptions,
        cancel: &CancellationToken,
    ) -> Result<ImageRef, CompositionError> {
        let api = self.api()?;
        let job_id = handle.id.as_str();
        let mut attempts = 0u32;

        let polled = tokio::time::timeout(
            opts.ceiling(),
            poll_until_terminal(api, job_id, opts, cancel, &mut attempts),
        )
        .await;

        let outcome = match polled {
            Ok(Some(outcome)) => outcome,
            Ok(None) | Err(_) => Err(CompositionError::Timeout {
                job_id: job_id.to_string(),
                attempts,
            }),
        };

        POLL_ATTEMPTS
            .with_label_values(&[])
            .observe(f64::from(attempts));
        if matches!(
            outcome,
            Err(CompositionError::Cancelled | CompositionError::Timeout { .. })
        ) {
            abandon(Arc::clone(api), job_id.to_string());
        }
        outcome
    }

    /// Compose `source` into `target`.
    ///
    /// Never fails for remote reasons: any error other than cancellation
    /// yields the source photo with [`CompositionPath::Fallback`](super::CompositionPath::Fallback).
    pub async fn compose(
        &self,
        target: &ImageRef,
        source: &ImageRef,
        cancel: &CancellationToken,
    ) -> Result<CompositionResult, CompositionError> {
        match self.compose_remote(target, source, cancel).await {
            Ok(result) => {
                COMPOSITIONS_TOTAL.with_label_values(&["remote"]).inc();
                Ok(result)
            }
            Err(CompositionError::Cancelled) => Err(CompositionError::Cancelled),
            Err(e) => {
                warn!(error = %e, kind = e.kind(), "Composition unavailable, using source photo");
                COMPOSITIONS_TOTAL.with_label_values(&["fallback"]).inc();
                COMPOSITION_FALLBACKS.with_label_values(&[e.kind()]).inc();
                Ok(CompositionResult::fallback(source.clone(), e.to_string()))
            }
        }
    }

    async fn compose_remote(
        &self,
        target: &ImageRef,
        source: &ImageRef,
        cancel: &CancellationToken,
    ) -> Result<CompositionResult, CompositionError> {
        let api = self.api()?;

        let handle = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(CompositionError::Cancelled),
            handle = api.submit(target, source) => handle?,
        };
        info!(job_id = %handle.id, api = api.name(), "Submitted composition job");

        let remote = self.await_result(&handle, &self.poll, cancel).await?;

        tokio::fs::create_dir_all(&self.output_dir).await?;
        let dest = self.output_dir.join(format!("{}.png", Uuid::new_v4()));
        tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(CompositionError::Cancelled),
            downloaded = api.download(&remote, &dest) => downloaded?,
        }

        info!(job_id = %handle.id, path = %dest.display(), "Composition job completed");
        Ok(CompositionResult::remote(ImageRef::Local(dest), handle.id))
    }

}

/// Poll until the job is terminal. `None` once `max_attempts` polls were
/// spent without an answer.
async fn poll_until_terminal(
    api: &Arc<dyn CompositionApi>,
    job_id: &str,
    opts: &PollOptions,
    cancel: &CancellationToken,
    attempts: &mut u32,
) -> Option<Result<ImageRef, CompositionError>> {
    for attempt in 1..=opts.max_attempts {
        *attempts = attempt;
        let polled = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Some(Err(CompositionError::Cancelled)),
            polled = api.status(job_id) => polled,
        };

        match polled {
            Ok(job) => match job.status {
                JobStatus::Succeeded => {
                    return Some(job.result_ref.ok_or_else(|| {
                        CompositionError::Parse(format!(
                            "job {} succeeded without a result",
                            job_id
                        ))
                    }));
                }
                JobStatus::Failed => {
                    return Some(Err(CompositionError::Failed {
                        job_id: job_id.to_string(),
                        reason: job.error.unwrap_or_else(|| "unknown".to_string()),
                    }));
                }
                JobStatus::Pending => {
                    debug!(job_id, attempt, "Composition job still pending");
                }
            },
            Err(e) if e.is_retryable() => {
                warn!(job_id, attempt, error = %e, "Transient error polling composition job");
            }
            Err(e) => return Some(Err(e)),
        }

        if attempt < opts.max_attempts {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Some(Err(CompositionError::Cancelled)),
                _ = tokio::time::sleep(opts.poll_interval) => {}
            }
        }
    }
    None
}

/// Cancel the remote job without holding up the caller.
fn abandon(api: Arc<dyn CompositionApi>, job_id: String) {
    tokio::spawn(async move {
        match tokio::time::timeout(ABANDON_TIMEOUT, api.cancel(&job_id)).await {
            Ok(Ok(())) => debug!(job_id = %job_id, "Remote job cancelled"),
            Ok(Err(e)) => debug!(job_id = %job_id, error = %e, "Remote cancel failed"),
            Err(_) => debug!(job_id = %job_id, "Remote cancel timed out"),
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::composition::CompositionPath;
    use crate::testing::MockCompositionApi;
    use std::time::{Duration, Instant};
    use tempfile::TempDir;

    fn fast_poll(max_attempts: u32) -> PollOptions {
        PollOptions {
            poll_interval: Duration::from_millis(10),
            max_attempts,
        }
    }

    fn client(api: &Arc<MockCompositionApi>, dir: &TempDir, poll: PollOptions) -> CompositionClient {
        let api: Arc<dyn CompositionApi> = api.clone();
        CompositionClient::new(Some(api), poll, dir.path())
    }

    fn images() -> (ImageRef, ImageRef) {
        (
            ImageRef::Local(PathBuf::from("/templates/golden.png")),
            ImageRef::Local(PathBuf::from("/sources/face.png")),
        )
    }

    #[tokio::test]
    async fn test_compose_remote_success() {
        let dir = TempDir::new().unwrap();
        let api = Arc::new(MockCompositionApi::new());
        api.set_pending_polls(2).await;

        let (target, source) = images();
        let result = client(&api, &dir, fast_poll(5))
            .compose(&target, &source, &CancellationToken::new())
            .await
            .unwrap();

        assert!(!result.is_fallback());
        let path = result.image.as_local().unwrap();
        assert!(path.starts_with(dir.path()));
        assert!(path.exists());
        assert_eq!(api.status_calls().await, 3);
        assert_eq!(api.submissions().await.len(), 1);
        assert_eq!(
            api.downloads().await,
            vec![ImageRef::Remote("mock://results/mock-job-1.png".to_string())]
        );
    }

    #[tokio::test]
    async fn test_compose_without_api_falls_back() {
        let dir = TempDir::new().unwrap();
        let client = CompositionClient::new(None, fast_poll(5), dir.path());
        let (target, source) = images();

        let result = client
            .compose(&target, &source, &CancellationToken::new())
            .await
            .unwrap();

        assert!(result.is_fallback());
        assert_eq!(result.image, source);
    }

    #[tokio::test]
    async fn test_compose_submit_error_falls_back() {
        let dir = TempDir::new().unwrap();
        let api = Arc::new(MockCompositionApi::new());
        api.set_submit_error(CompositionError::Io(std::io::Error::new(
            std::io::ErrorKind::ConnectionRefused,
            "connection refused",
        )))
        .await;

        let (target, source) = images();
        let result = client(&api, &dir, fast_poll(5))
            .compose(&target, &source, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(result.image, source);
        match result.path {
            CompositionPath::Fallback { reason } => assert!(reason.contains("connection refused")),
            other => panic!("expected fallback, got {:?}", other),
        }
        assert_eq!(api.status_calls().await, 0);
    }

    #[tokio::test]
    async fn test_compose_failed_job_falls_back() {
        let dir = TempDir::new().unwrap();
        let api = Arc::new(MockCompositionApi::new());
        api.fail_jobs("no face detected").await;

        let (target, source) = images();
        let result = client(&api, &dir, fast_poll(5))
            .compose(&target, &source, &CancellationToken::new())
            .await
            .unwrap();

        assert!(result.is_fallback());
        assert_eq!(result.image, source);
    }

    #[tokio::test]
    async fn test_await_result_times_out_within_ceiling() {
        let dir = TempDir::new().unwrap();
        let api = Arc::new(MockCompositionApi::new());
        api.never_finish().await;

        let poll = fast_poll(4);
        let client = client(&api, &dir, poll);
        let handle = JobHandle::new("job-slow");

        let started = Instant::now();
        let err = client
            .await_result(&handle, &poll, &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            CompositionError::Timeout { attempts: 4, .. }
        ));
        assert!(started.elapsed() < poll.ceiling() + Duration::from_millis(500));
        assert!((1..=4).contains(&api.status_calls().await));
        assert_eq!(
            api.wait_for_cancellations(1, Duration::from_secs(1)).await,
            vec!["job-slow".to_string()]
        );
    }

    #[tokio::test]
    async fn test_slow_status_calls_stay_within_ceiling() {
        let dir = TempDir::new().unwrap();
        let api = Arc::new(MockCompositionApi::new());
        api.never_finish().await;
        api.set_status_delay(Duration::from_millis(300)).await;
        api.set_cancel_delay(Duration::from_millis(300)).await;

        let poll = PollOptions {
            poll_interval: Duration::from_millis(10),
            max_attempts: 5,
        };
        let client = client(&api, &dir, poll);

        let started = Instant::now();
        let err = client
            .await_result(&JobHandle::new("job-stuck"), &poll, &CancellationToken::new())
            .await
            .unwrap_err();
        let elapsed = started.elapsed();

        assert!(matches!(err, CompositionError::Timeout { attempts: 1, .. }));
        assert!(elapsed < Duration::from_millis(250), "took {:?}", elapsed);
        assert_eq!(
            api.wait_for_cancellations(1, Duration::from_secs(2)).await,
            vec!["job-stuck".to_string()]
        );
    }

    #[tokio::test]
    async fn test_await_result_retries_transient_errors() {
        let dir = TempDir::new().unwrap();
        let api = Arc::new(MockCompositionApi::new());
        api.set_status_error(CompositionError::RateLimited).await;

        let poll = fast_poll(3);
        let result = client(&api, &dir, poll)
            .await_result(&JobHandle::new("job-1"), &poll, &CancellationToken::new())
            .await
            .unwrap();

        assert!(matches!(result, ImageRef::Remote(_)));
        assert_eq!(api.status_calls().await, 2);
    }

    #[tokio::test]
    async fn test_cancel_during_polling() {
        let dir = TempDir::new().unwrap();
        let api = Arc::new(MockCompositionApi::new());
        api.never_finish().await;

        let poll = PollOptions {
            poll_interval: Duration::from_millis(20),
            max_attempts: 1000,
        };
        let client = client(&api, &dir, poll);
        let cancel = CancellationToken::new();

        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(60)).await;
            trigger.cancel();
        });

        let (target, source) = images();
        let err = client.compose(&target, &source, &cancel).await.unwrap_err();

        assert!(matches!(err, CompositionError::Cancelled));
        assert_eq!(
            api.wait_for_cancellations(1, Duration::from_secs(1)).await.len(),
            1
        );
    }
}
