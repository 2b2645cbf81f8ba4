//! Mock presenter and capture for testing.

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{oneshot, RwLock};

use crate::capture::{CaptureError, ImageCapture, PresentedView, TicketPresenter, ViewHandle};
use crate::media::ImageRef;
use crate::ticket::TicketViewDescriptor;

use super::fixtures;

/// Mock implementation of the TicketPresenter trait.
///
/// Records every presented descriptor and tracks which views are mounted.
/// By default it offers no painted signal, so the pipeline falls back to
/// the fixed settle delay.
#[derive(Debug, Default)]
pub struct MockPresenter {
    presented: Arc<RwLock<Vec<TicketViewDescriptor>>>,
    mounted: Arc<RwLock<HashSet<ViewHandle>>>,
    discarded: Arc<RwLock<Vec<ViewHandle>>>,
    signal_painted: Arc<RwLock<bool>>,
    next_error: Arc<RwLock<Option<CaptureError>>>,
}

impl MockPresenter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Offer a painted signal that fires as soon as the view is presented.
    pub async fn set_signal_painted(&self, signal: bool) {
        *self.signal_painted.write().await = signal;
    }

    /// Configure the next present to fail with the given error.
    pub async fn set_next_error(&self, error: CaptureError) {
        *self.next_error.write().await = Some(error);
    }

    pub async fn presented(&self) -> Vec<TicketViewDescriptor> {
        self.presented.read().await.clone()
    }

    pub async fn mounted_count(&self) -> usize {
        self.mounted.read().await.len()
    }

    pub async fn discarded(&self) -> Vec<ViewHandle> {
        self.discarded.read().await.clone()
    }
}

#[async_trait]
impl TicketPresenter for MockPresenter {
    async fn present(
        &self,
        descriptor: &TicketViewDescriptor,
    ) -> Result<PresentedView, CaptureError> {
        if let Some(err) = self.next_error.write().await.take() {
            return Err(err);
        }

        let handle = ViewHandle::new();
        self.presented.write().await.push(descriptor.clone());
        self.mounted.write().await.insert(handle.clone());

        if *self.signal_painted.read().await {
            let (tx, rx) = oneshot::channel();
            let _ = tx.send(());
            Ok(PresentedView {
                handle,
                painted: Some(rx),
            })
        } else {
            Ok(PresentedView::unsignalled(handle))
        }
    }

    async fn discard(&self, handle: &ViewHandle) {
        if self.mounted.write().await.remove(handle) {
            self.discarded.write().await.push(handle.clone());
        }
    }
}

/// Mock implementation of the ImageCapture trait.
///
/// Writes a small PNG per capture into its output directory.
#[derive(Debug)]
pub struct MockCapture {
    output_dir: PathBuf,
    captured: Arc<RwLock<Vec<ViewHandle>>>,
    next_error: Arc<RwLock<Option<CaptureError>>>,
    delay: Arc<RwLock<Duration>>,
}

impl MockCapture {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
            captured: Arc::new(RwLock::new(Vec::new())),
            next_error: Arc::new(RwLock::new(None)),
            delay: Arc::new(RwLock::new(Duration::ZERO)),
        }
    }

    /// Configure the next capture to fail with the given error.
    pub async fn set_next_error(&self, error: CaptureError) {
        *self.next_error.write().await = Some(error);
    }

    /// Simulated capture duration.
    pub async fn set_delay(&self, delay: Duration) {
        *self.delay.write().await = delay;
    }

    pub async fn captured(&self) -> Vec<ViewHandle> {
        self.captured.read().await.clone()
    }
}

#[async_trait]
impl ImageCapture for MockCapture {
    async fn capture(&self, handle: &ViewHandle) -> Result<ImageRef, CaptureError> {
        let delay = *self.delay.read().await;
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        if let Some(err) = self.next_error.write().await.take() {
            return Err(err);
        }

        tokio::fs::create_dir_all(&self.output_dir).await?;
        let dest = self.output_dir.join(format!("{}.png", handle));
        let bytes = fixtures::png_bytes(30, 45).map_err(|e| CaptureError::Render(e.to_string()))?;
        tokio::fs::write(&dest, bytes).await?;

        self.captured.write().await.push(handle.clone());
        Ok(ImageRef::Local(dest))
    }
}
