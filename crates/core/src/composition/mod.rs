//! Face composition against a remote asynchronous job API.
//!
//! [`CompositionClient`] submits a job, polls it to a terminal state and
//! downloads the result. When the remote service cannot produce a result it
//! falls back to the original source photo, so ticket creation never blocks
//! on the third-party dependency. Which path ran is reported in
//! [`CompositionResult::path`].
//!
//! # Example
//!
//! ```ignore
//! use luckyticket_core::composition::{CompositionClient, HttpCompositionApi, PollOptions};
//!
//! let api = HttpCompositionApi::new(&config.composition)?;
//! let client = CompositionClient::new(Some(Arc::new(api)), PollOptions::default(), "data/composed");
//!
//! let result = client.compose(&template, &photo, &cancel).await?;
//! if result.is_fallback() {
//!     println!("Remote composition unavailable, using the original photo");
//! }
//! ```

mod client;
mod config;
mod error;
mod http;
mod traits;
mod types;

pub use client::CompositionClient;
pub use config::CompositionConfig;
pub use error::CompositionError;
pub use http::HttpCompositionApi;
pub use traits::CompositionApi;
pub use types::{
    CompositionJob, CompositionPath, CompositionResult, JobHandle, JobStatus, PollOptions,
};
