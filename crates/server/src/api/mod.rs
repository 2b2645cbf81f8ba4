pub mod error;
pub mod handlers;
pub mod media;
pub mod middleware;
pub mod pipeline;
pub mod quota;
pub mod routes;
pub mod tickets;

pub use error::ApiError;
pub use routes::create_router;
