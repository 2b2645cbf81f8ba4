//! A fully wired pipeline on test doubles.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::capture::{ImageCapture, RasterTicketRenderer, TicketPresenter};
use crate::composition::{CompositionApi, CompositionClient};
use crate::events::EventBroadcaster;
use crate::media::{GenerationRequest, LocalFilePicker, MediaConfig, MediaNormalizer};
use crate::pipeline::{PipelineError, PipelineServices, TicketPipeline};
use crate::quota::{QuotaGate, QuotaState, QuotaTier};
use crate::store::{ProfileStore, StoreError, QUOTA_KEY};
use crate::ticket::TicketComposer;

use super::clock::FixedClock;
use super::fixtures;
use super::memory_store::MemoryProfileStore;
use super::mock_capture::{MockCapture, MockPresenter};
use super::mock_composition::MockCompositionApi;

/// Test doubles plus the [`PipelineServices`] built from them.
///
/// Timing is shortened (10 ms polls, 5 attempts, 10 ms settle delay) and
/// quota enforcement is off; tweak `services` before calling
/// [`open`](Self::open).
pub struct Harness {
    pub dir: PathBuf,
    pub store: Arc<MemoryProfileStore>,
    pub api: Arc<MockCompositionApi>,
    pub presenter: Arc<MockPresenter>,
    pub capture: Arc<MockCapture>,
    pub clock: Arc<FixedClock>,
    pub events: EventBroadcaster,
    pub services: PipelineServices,
}

impl Harness {
    /// Wire everything under `dir`.
    pub fn new(dir: &Path) -> Self {
        let store = Arc::new(MemoryProfileStore::new());
        let api = Arc::new(MockCompositionApi::new());
        let presenter = Arc::new(MockPresenter::new());
        let capture = Arc::new(MockCapture::new(dir.join("tickets")));
        let clock = Arc::new(FixedClock::on(fixtures::today()));
        let events = EventBroadcaster::new(64);
        let config = fixtures::fast_pipeline_config();

        let composition_api: Arc<dyn CompositionApi> = api.clone();
        let services = PipelineServices {
            store: store.clone(),
            composition: Arc::new(CompositionClient::new(
                Some(composition_api),
                config.poll_options(),
                dir.join("composed"),
            )),
            picker: Arc::new(LocalFilePicker::dismissed()),
            normalizer: Arc::new(MediaNormalizer::new(
                MediaConfig::default(),
                dir.join("sources"),
            )),
            composer: TicketComposer::new(dir.join("templates")),
            presenter: presenter.clone(),
            capture: capture.clone(),
            gate: QuotaGate::default(),
            clock: clock.clone(),
            events: events.clone(),
            config,
        };

        Self {
            dir: dir.to_path_buf(),
            store,
            api,
            presenter,
            capture,
            clock,
            events,
            services,
        }
    }

    /// Run without a composition credential.
    pub fn without_composition_api(mut self) -> Self {
        self.services.composition = Arc::new(CompositionClient::new(
            None,
            self.services.config.poll_options(),
            self.dir.join("composed"),
        ));
        self
    }

    /// Replace the mock presenter and capture with the raster renderer.
    pub fn with_raster_renderer(mut self) -> Self {
        let renderer = RasterTicketRenderer::new(self.dir.join("tickets"));
        let presenter: Arc<dyn TicketPresenter> = Arc::new(renderer.clone());
        let capture: Arc<dyn ImageCapture> = Arc::new(renderer);
        self.services.presenter = presenter;
        self.services.capture = capture;
        self
    }

    /// Open a session for `user_id`.
    pub fn open(&self, user_id: &str) -> Result<TicketPipeline, PipelineError> {
        TicketPipeline::open(self.services.clone(), user_id)
    }

    /// Store a quota counter for today.
    pub fn seed_quota(&self, user_id: &str, count: u32, tier: QuotaTier) -> Result<(), StoreError> {
        let state = QuotaState {
            date: fixtures::today(),
            count,
            tier,
        };
        let json =
            serde_json::to_string(&state).map_err(|e| StoreError::WriteFailed(e.to_string()))?;
        self.store.put(user_id, QUOTA_KEY, json)
    }

    /// Write a photo under the harness directory and select it.
    pub async fn select_photo(
        &self,
        pipeline: &TicketPipeline,
    ) -> Result<GenerationRequest, PipelineError> {
        let path = self.dir.join("photo.png");
        fixtures::write_png(&path, 120, 90).map_err(|e| {
            PipelineError::Media(crate::media::MediaError::Decode(e.to_string()))
        })?;
        pipeline.select_media(fixtures::picked_photo(&path)).await
    }
}
