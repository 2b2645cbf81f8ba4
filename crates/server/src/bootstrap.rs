//! Wiring the pipeline services from configuration.

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{info, warn};

use luckyticket_core::capture::{ImageCapture, TicketPresenter};
use luckyticket_core::composition::CompositionApi;
use luckyticket_core::media::{LocalFilePicker, MediaNormalizer};
use luckyticket_core::{
    CompositionClient, Config, EventBroadcaster, HttpCompositionApi, PipelineServices, QuotaGate,
    RasterTicketRenderer, SqliteProfileStore, SystemClock, TicketComposer,
};

/// Build every pipeline collaborator from `config`.
///
/// A missing composition credential is not an error: the service starts in
/// degraded mode and every ticket uses the source photo.
pub fn build_services(config: &Config) -> Result<PipelineServices> {
    let storage = &config.storage;
    for dir in [
        storage.sources_dir(),
        storage.composed_dir(),
        storage.tickets_dir(),
        config.media.upload_dir.clone(),
    ] {
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create directory {:?}", dir))?;
    }

    let store = Arc::new(
        SqliteProfileStore::new(&config.database.path)
            .context("Failed to open profile store")?,
    );
    info!("Profile store initialized at {:?}", config.database.path);

    let api: Option<Arc<dyn CompositionApi>> = match HttpCompositionApi::new(&config.composition)
    {
        Ok(api) => {
            info!("Composition API at {}", config.composition.base_url);
            Some(Arc::new(api))
        }
        Err(e) => {
            warn!(error = %e, "Composition API unavailable, tickets will use the source photo");
            None
        }
    };
    let composition = Arc::new(CompositionClient::new(
        api,
        config.pipeline.poll_options(),
        storage.composed_dir(),
    ));

    let renderer = RasterTicketRenderer::new(storage.tickets_dir());
    let presenter: Arc<dyn TicketPresenter> = Arc::new(renderer.clone());
    let capture: Arc<dyn ImageCapture> = Arc::new(renderer);

    let mut picker = LocalFilePicker::dismissed();
    if !config.media.camera_enabled {
        picker = picker.without_camera();
    }

    if config.quota.enabled {
        info!(
            free_limit = config.quota.free_limit,
            premium_limit = config.quota.premium_limit,
            "Daily quota enforced"
        );
    } else {
        info!("Daily quota disabled");
    }

    Ok(PipelineServices {
        store,
        composition,
        picker: Arc::new(picker),
        normalizer: Arc::new(MediaNormalizer::new(
            config.media.clone(),
            storage.sources_dir(),
        )),
        composer: TicketComposer::new(storage.templates_dir.clone()),
        presenter,
        capture,
        gate: QuotaGate::new(config.quota.clone()),
        clock: Arc::new(SystemClock),
        events: EventBroadcaster::default(),
        config: config.pipeline.clone(),
    })
}
