//! Trait definitions for the composition module.

use std::path::Path;

use async_trait::async_trait;

use super::error::CompositionError;
use super::types::{CompositionJob, JobHandle};
use crate::media::ImageRef;

/// A remote service that blends a face into a template image.
#[async_trait]
pub trait CompositionApi: Send + Sync {
    /// Returns the name of this implementation.
    fn name(&self) -> &str;

    /// Submit a job; returns as soon as the service assigned an id.
    async fn submit(
        &self,
        target: &ImageRef,
        source: &ImageRef,
    ) -> Result<JobHandle, CompositionError>;

    /// Observe the current status of a job.
    async fn status(&self, job_id: &str) -> Result<CompositionJob, CompositionError>;

    /// Ask the service to abandon a job. Best-effort.
    async fn cancel(&self, job_id: &str) -> Result<(), CompositionError>;

    /// Fetch a job result into `dest`.
    async fn download(&self, result: &ImageRef, dest: &Path) -> Result<(), CompositionError>;
}
