//! Collaborators injected into a pipeline session.

use std::sync::Arc;

use crate::capture::{ImageCapture, TicketPresenter};
use crate::composition::CompositionClient;
use crate::events::EventBroadcaster;
use crate::media::{MediaNormalizer, MediaPicker};
use crate::quota::QuotaGate;
use crate::store::ProfileStore;
use crate::ticket::TicketComposer;

use super::clock::Clock;
use super::config::PipelineConfig;

/// Everything a [`TicketPipeline`](super::TicketPipeline) talks to.
///
/// Cheap to clone; one bundle is usually shared by every session.
#[derive(Clone)]
pub struct PipelineServices {
    pub store: Arc<dyn ProfileStore>,
    pub composition: Arc<CompositionClient>,
    pub picker: Arc<dyn MediaPicker>,
    pub normalizer: Arc<MediaNormalizer>,
    pub composer: TicketComposer,
    pub presenter: Arc<dyn TicketPresenter>,
    pub capture: Arc<dyn ImageCapture>,
    pub gate: QuotaGate,
    pub clock: Arc<dyn Clock>,
    pub events: EventBroadcaster,
    pub config: PipelineConfig,
}
