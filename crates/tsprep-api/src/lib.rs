//! HTTP surface: router, request/response schemas, error-to-status mapping.

pub mod routes;
pub mod state;

pub use routes::router;
pub use state::AppState;
