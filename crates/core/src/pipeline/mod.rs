//! The ticket generation pipeline.
//!
//! A [`TicketPipeline`] is one user's session. It walks
//! `Idle → MediaSelected → Gating → Composing → Composed → Capturing → Done`
//! and fails from `Gating`, `Composing` or `Capturing`. Only one run is in
//! flight per session, and the quota counter and ticket collection change
//! together, in one write, when a run commits.

mod clock;
mod config;
mod orchestrator;
mod services;
mod types;

pub use clock::{Clock, SystemClock};
pub use config::PipelineConfig;
pub use orchestrator::TicketPipeline;
pub use services::PipelineServices;
pub use types::{PipelineError, PipelineState, PipelineStatus, QuotaStatus};
