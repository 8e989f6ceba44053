//! Depot HTTP API
//!
//! Thin axum layer over the upload pipeline and resolver: request parsing, caller
//! authentication, error rendering and application setup.

pub mod api_doc;
pub mod auth;
pub mod error;
pub mod handlers;
pub mod setup;
pub mod state;
pub mod telemetry;
mod utils;

pub use error::{ErrorResponse, HttpAppError};
pub use state::AppState;
