//! Depot Core Library
//!
//! Domain models, error types and configuration shared by every depot crate.

pub mod config;
pub mod error;
pub mod filesize;
pub mod models;
pub mod storage_types;

// Re-export commonly used types
pub use config::{ApiToken, Config, DepotConfig, UploadSettings};
pub use error::{AppError, ErrorMetadata, LogLevel};
pub use filesize::human_filesize;
pub use storage_types::StorageBackend;
