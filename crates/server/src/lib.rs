pub mod api;
pub mod bootstrap;
pub mod metrics;
pub mod state;

pub use bootstrap::build_services;
pub use state::{AppState, SessionRegistry};
