//! Client-facing operations and their JSON envelope

pub mod envelope;
pub mod service;

pub use envelope::{ApiResponse, Envelope, ErrorDetail};
pub use service::ReleaseService;
