//! One user's pipeline session.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Instant;

use chrono::NaiveDate;
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::composition::{CompositionError, CompositionPath, CompositionResult};
use crate::events::PipelineEvent;
use crate::media::{GenerationRequest, ImageRef, MediaOrigin, MediaPicker, PickedMedia};
use crate::metrics::{
    PIPELINE_DURATION, PIPELINE_RUNS, QUOTA_REJECTIONS, STORE_WRITE_FAILURES, TICKETS_CREATED,
};
use crate::quota::{QuotaLedger, QuotaState, QuotaTier};
use crate::store::{ProfileBatch, StoreError, QUOTA_KEY, TICKETS_KEY};
use crate::ticket::{TicketDraw, TicketRecord, TicketStore};

use super::services::PipelineServices;
use super::types::{PipelineError, PipelineState, PipelineStatus, QuotaStatus};

#[derive(Debug)]
struct ActiveRun {
    id: u64,
    cancel: CancellationToken,
}

#[derive(Debug, Default)]
struct Session {
    state: PipelineState,
    media: Option<GenerationRequest>,
    run: Option<ActiveRun>,
    next_run_id: u64,
    last_composition: Option<CompositionPath>,
    last_ticket_id: Option<String>,
}

impl Session {
    fn is_active(&self, run_id: u64) -> bool {
        self.run.as_ref().is_some_and(|run| run.id == run_id)
    }
}

fn lock(session: &Mutex<Session>) -> MutexGuard<'_, Session> {
    session.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Frees the run slot when a run future is dropped before it finished.
struct RunGuard {
    session: Arc<Mutex<Session>>,
    run_id: u64,
}

impl Drop for RunGuard {
    fn drop(&mut self) {
        let mut session = lock(&self.session);
        if let Some(run) = session.run.take_if(|run| run.id == self.run_id) {
            run.cancel.cancel();
            session.media = None;
            session.state = PipelineState::Failed {
                reason: "interrupted".to_string(),
            };
        }
    }
}

/// Sequences media selection, gating, composition, capture and commit for
/// one user.
///
/// Owns the user's [`QuotaLedger`] and [`TicketStore`]; nothing else writes
/// them. Only one run may be in flight; a second
/// [`generate_ticket`](Self::generate_ticket) is rejected with
/// [`PipelineError::AlreadyInProgress`].
pub struct TicketPipeline {
    user_id: String,
    services: PipelineServices,
    quota: QuotaLedger,
    tickets: TicketStore,
    session: Arc<Mutex<Session>>,
}

impl TicketPipeline {
    /// Open a session, loading the user's quota and tickets.
    pub fn open(services: PipelineServices, user_id: impl Into<String>) -> Result<Self, PipelineError> {
        let user_id = user_id.into();
        let today = services.clock.today();
        let quota = QuotaLedger::load(Arc::clone(&services.store), user_id.clone(), today)?;
        let tickets = TicketStore::load(Arc::clone(&services.store), user_id.clone())?;

        debug!(user_id = %user_id, "Opened pipeline session");
        Ok(Self {
            user_id,
            services,
            quota,
            tickets,
            session: Arc::new(Mutex::new(Session::default())),
        })
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn state(&self) -> PipelineState {
        lock(&self.session).state.clone()
    }

    // =========================================================================
    // Media selection
    // =========================================================================

    /// Pick media with the session's picker and select it.
    pub async fn acquire_media(&self, origin: MediaOrigin) -> Result<GenerationRequest, PipelineError> {
        let picker = Arc::clone(&self.services.picker);
        self.acquire_media_from(picker.as_ref(), origin).await
    }

    /// Pick media with a caller-supplied picker and select it.
    pub async fn acquire_media_from(
        &self,
        picker: &dyn MediaPicker,
        origin: MediaOrigin,
    ) -> Result<GenerationRequest, PipelineError> {
        self.ensure_no_run()?;
        let picked = picker.pick(origin).await.map_err(|e| {
            debug!(user_id = %self.user_id, %origin, error = %e, "Media acquisition failed");
            PipelineError::from(e)
        })?;
        self.select_media(picked).await
    }

    /// Validate and normalize picked media; the session becomes
    /// `MediaSelected`.
    pub async fn select_media(&self, picked: PickedMedia) -> Result<GenerationRequest, PipelineError> {
        self.ensure_no_run()?;
        let request = self.services.normalizer.normalize(&picked).await?;

        {
            let mut session = lock(&self.session);
            if session.run.is_some() {
                return Err(PipelineError::AlreadyInProgress);
            }
            session.media = Some(request.clone());
            session.state = PipelineState::MediaSelected;
        }
        self.publish_state(PipelineState::MediaSelected);

        info!(
            user_id = %self.user_id,
            kind = request.media_kind.as_str(),
            width = request.width,
            height = request.height,
            "Media selected"
        );
        Ok(request)
    }

    fn ensure_no_run(&self) -> Result<(), PipelineError> {
        if lock(&self.session).run.is_some() {
            return Err(PipelineError::AlreadyInProgress);
        }
        Ok(())
    }

    // =========================================================================
    // Generation
    // =========================================================================

    /// Run the pipeline on the selected media.
    ///
    /// Composition problems never fail the run; the source photo stands in.
    /// On success the quota increment and the new ticket are committed
    /// together.
    pub async fn generate_ticket(&self) -> Result<TicketRecord, PipelineError> {
        let started = Instant::now();
        let (run_id, cancel, media) = self.begin_run()?;
        let _guard = RunGuard {
            session: Arc::clone(&self.session),
            run_id,
        };

        let result = self.run(run_id, &cancel, media).await;

        let outcome = match &result {
            Ok(_) => "done",
            Err(e) => e.kind(),
        };
        PIPELINE_RUNS.with_label_values(&[outcome]).inc();
        PIPELINE_DURATION
            .with_label_values(&[outcome])
            .observe(started.elapsed().as_secs_f64());
        result
    }

    fn begin_run(&self) -> Result<(u64, CancellationToken, GenerationRequest), PipelineError> {
        let (run_id, cancel, media) = {
            let mut session = lock(&self.session);
            if session.run.is_some() {
                return Err(PipelineError::AlreadyInProgress);
            }
            let media = session
                .media
                .clone()
                .ok_or(PipelineError::NoMediaSelected)?;

            session.next_run_id += 1;
            let run_id = session.next_run_id;
            let cancel = CancellationToken::new();
            session.run = Some(ActiveRun {
                id: run_id,
                cancel: cancel.clone(),
            });
            session.state = PipelineState::Gating;
            (run_id, cancel, media)
        };

        self.publish_state(PipelineState::Gating);
        Ok((run_id, cancel, media))
    }

    async fn run(
        &self,
        run_id: u64,
        cancel: &CancellationToken,
        media: GenerationRequest,
    ) -> Result<TicketRecord, PipelineError> {
        let today = self.services.clock.today();

        // Gating: before any network activity.
        let quota = self.quota.current(today).await;
        if !self.services.gate.can_start(&quota, today) {
            return Err(self.reject_quota(run_id, &quota));
        }

        // Composing
        self.advance(run_id, PipelineState::Composing)?;
        let draw = TicketDraw::random(&mut rand::rng());
        let target = self.services.composer.template_image(draw.template);
        let composition = match self
            .services
            .composition
            .compose(&target, &media.source_photo, cancel)
            .await
        {
            Ok(result) => result,
            Err(CompositionError::Cancelled) => return Err(PipelineError::Cancelled),
            Err(e) => CompositionResult::fallback(media.source_photo.clone(), e.to_string()),
        };
        self.record_composition(run_id, &composition);

        // Composed: hand the descriptor to the presentation layer and let it settle.
        self.advance(run_id, PipelineState::Composed)?;
        let descriptor = self.services.composer.compose(
            &media,
            &composition,
            draw.template,
            &draw.lucky_number,
            draw.message,
        );
        let view = match self.services.presenter.present(&descriptor).await {
            Ok(view) => view,
            Err(e) => return Err(self.fail(run_id, PipelineError::CaptureFailed(e))),
        };
        if let Err(e) = self.settle(view.painted, cancel).await {
            self.services.presenter.discard(&view.handle).await;
            return Err(e);
        }

        // Capturing
        if let Err(e) = self.advance(run_id, PipelineState::Capturing) {
            self.services.presenter.discard(&view.handle).await;
            return Err(e);
        }
        let image_ref = match self.services.capture.capture(&view.handle).await {
            Ok(image_ref) => image_ref,
            Err(e) => {
                warn!(user_id = %self.user_id, view = %view.handle, error = %e, "Ticket capture failed");
                self.services.presenter.discard(&view.handle).await;
                return Err(self.fail(run_id, PipelineError::CaptureFailed(e)));
            }
        };

        let record = TicketRecord::new(
            draw.lucky_number,
            image_ref,
            draw.message,
            media.media_kind,
            draw.template,
            self.services.clock.now(),
        );
        self.commit(run_id, cancel, record, today).await
    }

    fn reject_quota(&self, run_id: u64, quota: &QuotaState) -> PipelineError {
        let limit = self.services.gate.limit_for(quota);
        warn!(
            user_id = %self.user_id,
            count = quota.count,
            limit,
            tier = quota.tier.as_str(),
            "Daily quota exceeded"
        );
        QUOTA_REJECTIONS
            .with_label_values(&[quota.tier.as_str()])
            .inc();
        self.services.events.publish(PipelineEvent::QuotaRejected {
            user_id: self.user_id.clone(),
            count: quota.count,
            limit,
        });
        self.fail(
            run_id,
            PipelineError::QuotaExceeded {
                count: quota.count,
                limit,
            },
        )
    }

    fn record_composition(&self, run_id: u64, composition: &CompositionResult) {
        {
            let mut session = lock(&self.session);
            if session.is_active(run_id) {
                session.last_composition = Some(composition.path.clone());
            }
        }

        match &composition.path {
            CompositionPath::Remote { job_id } => {
                info!(user_id = %self.user_id, job_id = %job_id, "Composed remotely");
            }
            CompositionPath::Fallback { reason } => {
                info!(user_id = %self.user_id, reason = %reason, "Composition fell back to source photo");
            }
        }
        self.services
            .events
            .publish(PipelineEvent::CompositionCompleted {
                user_id: self.user_id.clone(),
                path: composition.path.clone(),
            });
    }

    /// Wait for the view to be painted, or a fixed delay when the presenter
    /// cannot signal it.
    async fn settle(
        &self,
        painted: Option<oneshot::Receiver<()>>,
        cancel: &CancellationToken,
    ) -> Result<(), PipelineError> {
        let config = &self.services.config;
        match painted {
            Some(painted) => {
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => return Err(PipelineError::Cancelled),
                    waited = tokio::time::timeout(config.paint_timeout(), painted) => match waited {
                        Ok(Ok(())) => debug!(user_id = %self.user_id, "View painted"),
                        Ok(Err(_)) => debug!(user_id = %self.user_id, "Presenter dropped the painted signal"),
                        Err(_) => warn!(
                            user_id = %self.user_id,
                            timeout_ms = config.paint_timeout().as_millis() as u64,
                            "View not painted in time, capturing anyway"
                        ),
                    },
                }
            }
            None => {
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => return Err(PipelineError::Cancelled),
                    _ = tokio::time::sleep(config.settle_delay()) => {}
                }
            }
        }
        Ok(())
    }

    /// Apply the quota increment and the new ticket as one write.
    async fn commit(
        &self,
        run_id: u64,
        cancel: &CancellationToken,
        record: TicketRecord,
        today: NaiveDate,
    ) -> Result<TicketRecord, PipelineError> {
        let next_quota = self.quota.preview_increment(today).await;
        let next_tickets = self.tickets.preview_append(record.clone()).await;

        // The write happens under the session lock: a concurrent clear()
        // either cancels before it or waits until it landed.
        let written = {
            let session = lock(&self.session);
            if session.is_active(run_id) && !cancel.is_cancelled() {
                Some(self.write_commit(&next_quota, &next_tickets))
            } else {
                None
            }
        };
        match written {
            None => {
                remove_image(&record.image_ref).await;
                return Err(PipelineError::Cancelled);
            }
            Some(Err(e)) => self.report_store_failure("commit", &e),
            Some(Ok(())) => {}
        }
        self.quota.replace(next_quota).await;
        self.tickets.replace(next_tickets).await;
        TICKETS_CREATED.inc();

        let finished = {
            let mut session = lock(&self.session);
            if session.is_active(run_id) {
                session.run = None;
                session.media = None;
                session.state = PipelineState::Done;
                session.last_ticket_id = Some(record.id.clone());
                true
            } else {
                false
            }
        };

        info!(
            user_id = %self.user_id,
            ticket_id = %record.id,
            lucky_number = %record.lucky_number,
            "Ticket created"
        );
        self.services.events.publish(PipelineEvent::TicketCreated {
            user_id: self.user_id.clone(),
            ticket_id: record.id.clone(),
        });
        if finished {
            self.publish_state(PipelineState::Done);
        }
        Ok(record)
    }

    fn write_commit(&self, quota: &QuotaState, tickets: &[TicketRecord]) -> Result<(), StoreError> {
        let mut batch = ProfileBatch::new();
        batch.stage(QUOTA_KEY, quota)?;
        batch.stage(TICKETS_KEY, &tickets)?;
        batch.commit(self.services.store.as_ref(), &self.user_id)
    }

    /// Move an active run to `state`; fails with `Cancelled` once the run
    /// was cleared.
    fn advance(&self, run_id: u64, state: PipelineState) -> Result<(), PipelineError> {
        {
            let mut session = lock(&self.session);
            let cancelled = session
                .run
                .as_ref()
                .is_none_or(|run| run.id != run_id || run.cancel.is_cancelled());
            if cancelled {
                return Err(PipelineError::Cancelled);
            }
            session.state = state.clone();
        }
        debug!(user_id = %self.user_id, state = state.as_str(), "Pipeline advanced");
        self.publish_state(state);
        Ok(())
    }

    /// End an active run in `Failed`, dropping its media.
    fn fail(&self, run_id: u64, err: PipelineError) -> PipelineError {
        let state = PipelineState::Failed {
            reason: err.kind().to_string(),
        };
        let failed = {
            let mut session = lock(&self.session);
            if session.is_active(run_id) {
                session.run = None;
                session.media = None;
                session.state = state.clone();
                true
            } else {
                false
            }
        };
        if failed {
            self.publish_state(state);
        }
        err
    }

    /// Reset to `Idle`, cancelling any run in flight. A cancelled run never
    /// commits.
    pub fn clear(&self) {
        let cancelled = {
            let mut session = lock(&self.session);
            let run = session.run.take();
            if let Some(run) = &run {
                run.cancel.cancel();
            }
            session.media = None;
            session.state = PipelineState::Idle;
            run.is_some()
        };

        if cancelled {
            info!(user_id = %self.user_id, "Cancelled in-flight run");
        }
        self.publish_state(PipelineState::Idle);
    }

    // =========================================================================
    // Tickets and quota
    // =========================================================================

    /// The user's tickets, most recent first.
    pub async fn tickets(&self) -> Vec<TicketRecord> {
        self.tickets.list().await
    }

    pub async fn ticket(&self, id: &str) -> Option<TicketRecord> {
        self.tickets.get(id).await
    }

    /// Delete a ticket and its image.
    pub async fn remove_ticket(&self, id: &str) -> Result<(), PipelineError> {
        let record = self
            .tickets
            .get(id)
            .await
            .ok_or_else(|| PipelineError::TicketNotFound(id.to_string()))?;

        match self.tickets.remove(id).await {
            Ok(_) => {}
            Err(StoreError::NotFound(id)) => return Err(PipelineError::TicketNotFound(id)),
            Err(e) => self.report_store_failure("remove", &e),
        }
        remove_image(&record.image_ref).await;

        info!(user_id = %self.user_id, ticket_id = %id, "Ticket deleted");
        self.services.events.publish(PipelineEvent::TicketDeleted {
            user_id: self.user_id.clone(),
            ticket_id: id.to_string(),
        });
        Ok(())
    }

    /// Today's quota for the user.
    pub async fn quota(&self) -> QuotaStatus {
        let today = self.services.clock.today();
        let state = self.quota.current(today).await;
        let gate = &self.services.gate;
        let enforced = gate.policy().enabled;
        let limit = gate.limit_for(&state);

        QuotaStatus {
            enforced,
            limit,
            remaining: enforced.then(|| limit.saturating_sub(state.count)),
            can_start: gate.can_start(&state, today),
            state,
        }
    }

    /// Change the user's subscription tier.
    pub async fn set_tier(&self, tier: QuotaTier) -> QuotaStatus {
        let today = self.services.clock.today();
        if let Err(e) = self.quota.set_tier(tier, today).await {
            self.report_store_failure("set_tier", &e);
        }
        info!(user_id = %self.user_id, tier = tier.as_str(), "Tier changed");
        self.quota().await
    }

    pub async fn status(&self) -> PipelineStatus {
        let quota = self.quota().await;
        let ticket_count = self.tickets.len().await;

        let session = lock(&self.session);
        PipelineStatus {
            user_id: self.user_id.clone(),
            state: session.state.clone(),
            media: session.media.clone(),
            quota,
            ticket_count,
            last_composition: session.last_composition.clone(),
            last_ticket_id: session.last_ticket_id.clone(),
        }
    }

    // =========================================================================
    // Helpers
    // =========================================================================

    fn publish_state(&self, state: PipelineState) {
        self.services.events.publish(PipelineEvent::StateChanged {
            user_id: self.user_id.clone(),
            state,
        });
    }

    fn report_store_failure(&self, operation: &'static str, err: &StoreError) {
        warn!(
            user_id = %self.user_id,
            operation,
            error = %err,
            "Profile store write failed, keeping in-memory state"
        );
        STORE_WRITE_FAILURES.with_label_values(&[operation]).inc();
        self.services.events.publish(PipelineEvent::StoreWriteFailed {
            user_id: self.user_id.clone(),
            error: err.to_string(),
        });
    }
}

async fn remove_image(image: &ImageRef) {
    if let Some(path) = image.as_local() {
        if let Err(e) = tokio::fs::remove_file(path).await {
            debug!(path = %path.display(), error = %e, "Could not remove ticket image");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quota::QuotaPolicy;
    use crate::testing::{fixtures, Harness};
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_generate_without_media() {
        let dir = TempDir::new().unwrap();
        let harness = Harness::new(dir.path());
        let pipeline = harness.open("user-1").unwrap();

        let err = pipeline.generate_ticket().await.unwrap_err();
        assert!(matches!(err, PipelineError::NoMediaSelected));
        assert_eq!(pipeline.state(), PipelineState::Idle);
    }

    #[tokio::test]
    async fn test_select_media_moves_to_media_selected() {
        let dir = TempDir::new().unwrap();
        let harness = Harness::new(dir.path());
        let pipeline = harness.open("user-1").unwrap();

        let photo = fixtures::write_png(&dir.path().join("face.png"), 80, 60).unwrap();
        let request = pipeline
            .select_media(fixtures::picked_photo(&photo))
            .await
            .unwrap();

        assert_eq!(request.width, 80);
        assert_eq!(pipeline.state(), PipelineState::MediaSelected);
        assert_eq!(pipeline.status().await.media, Some(request));
    }

    #[tokio::test]
    async fn test_quota_exceeded_leaves_no_trace() {
        let dir = TempDir::new().unwrap();
        let mut harness = Harness::new(dir.path());
        harness.services.gate = crate::quota::QuotaGate::new(QuotaPolicy::enforced());
        harness.seed_quota("user-1", 1, QuotaTier::Free).unwrap();
        let pipeline = harness.open("user-1").unwrap();
        harness.select_photo(&pipeline).await.unwrap();

        let err = pipeline.generate_ticket().await.unwrap_err();
        assert!(matches!(
            err,
            PipelineError::QuotaExceeded { count: 1, limit: 1 }
        ));
        assert_eq!(
            pipeline.state(),
            PipelineState::Failed {
                reason: "quota_exceeded".to_string()
            }
        );
        assert!(harness.api.submissions().await.is_empty());
        assert!(pipeline.tickets().await.is_empty());
    }

    #[tokio::test]
    async fn test_clear_resets_to_idle() {
        let dir = TempDir::new().unwrap();
        let harness = Harness::new(dir.path());
        let pipeline = harness.open("user-1").unwrap();
        harness.select_photo(&pipeline).await.unwrap();

        pipeline.clear();
        assert_eq!(pipeline.state(), PipelineState::Idle);
        assert!(matches!(
            pipeline.generate_ticket().await,
            Err(PipelineError::NoMediaSelected)
        ));
    }

    #[tokio::test]
    async fn test_quota_status() {
        let dir = TempDir::new().unwrap();
        let mut harness = Harness::new(dir.path());
        harness.services.gate = crate::quota::QuotaGate::new(QuotaPolicy::enforced());
        let pipeline = harness.open("user-1").unwrap();

        let status = pipeline.quota().await;
        assert!(status.enforced);
        assert_eq!(status.limit, 1);
        assert_eq!(status.remaining, Some(1));
        assert!(status.can_start);

        let status = pipeline.set_tier(QuotaTier::Premium).await;
        assert_eq!(status.limit, 3);
        assert_eq!(status.state.tier, QuotaTier::Premium);
    }

    #[tokio::test]
    async fn test_remove_unknown_ticket() {
        let dir = TempDir::new().unwrap();
        let harness = Harness::new(dir.path());
        let pipeline = harness.open("user-1").unwrap();

        let err = pipeline.remove_ticket("nope").await.unwrap_err();
        assert!(matches!(err, PipelineError::TicketNotFound(id) if id == "nope"));
    }

    #[tokio::test]
    async fn test_permission_denied_from_picker() {
        let dir = TempDir::new().unwrap();
        let harness = Harness::new(dir.path());
        let pipeline = harness.open("user-1").unwrap();

        let picker = crate::media::LocalFilePicker::photo(dir.path().join("x.png")).without_camera();
        let err = pipeline
            .acquire_media_from(&picker, MediaOrigin::Camera)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            PipelineError::PermissionDenied {
                origin: MediaOrigin::Camera
            }
        ));
        assert_eq!(pipeline.state(), PipelineState::Idle);
    }

    #[tokio::test]
    async fn test_acquire_media_uses_session_picker() {
        let dir = TempDir::new().unwrap();
        let mut harness = Harness::new(dir.path());
        let photo = fixtures::write_png(&dir.path().join("face.png"), 80, 60).unwrap();
        harness.services.picker = Arc::new(crate::media::LocalFilePicker::photo(photo));
        let pipeline = harness.open("user-1").unwrap();

        let request = pipeline.acquire_media(MediaOrigin::Gallery).await.unwrap();

        assert_eq!((request.width, request.height), (80, 60));
        assert_eq!(pipeline.state(), PipelineState::MediaSelected);
    }

    #[tokio::test]
    async fn test_dismissed_picker_leaves_session_idle() {
        let dir = TempDir::new().unwrap();
        let harness = Harness::new(dir.path());
        let pipeline = harness.open("user-1").unwrap();

        let err = pipeline
            .acquire_media(MediaOrigin::Gallery)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            PipelineError::Media(crate::media::MediaError::Cancelled)
        ));
        assert_eq!(pipeline.state(), PipelineState::Idle);
    }
}
