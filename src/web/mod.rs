//! HTTP surface over the enrollment service.

pub mod enrollment;
pub mod error;
pub mod routes;
pub mod status;

pub use error::{ApiError, ApiErrorCode};
pub use routes::create_router;
