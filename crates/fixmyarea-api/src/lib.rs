//! HTTP surface: routing, extractors and the error-to-status mapping.

pub mod error;
pub mod extract;
pub mod response;
pub mod routes;
pub mod state;

pub use error::{ApiError, ApiResult};
pub use routes::router;
pub use state::AppState;
