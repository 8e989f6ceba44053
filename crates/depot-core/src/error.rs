//! Error types module
//!
//! All failures that reach a client are unified under `AppError`. Each variant
//! self-describes its HTTP presentation through `ErrorMetadata`, so the API layer only
//! has to render whatever the metadata says.
//!
//! The `Database` variant and `From<sqlx::Error>` are gated behind the `sqlx` feature.

use std::io;

#[cfg(feature = "sqlx")]
use sqlx::Error as SqlxError;

/// Log level for error reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Expected errors such as policy rejections
    Debug,
    /// Recoverable issues
    Warn,
    /// Unexpected failures
    Error,
}

/// Metadata for error responses - defines how an error should be presented
pub trait ErrorMetadata {
    /// HTTP status code to return
    fn http_status_code(&self) -> u16;

    /// Machine-readable error code (e.g., "TOO_LARGE")
    fn error_code(&self) -> &'static str;

    /// Whether this error is recoverable (can be retried)
    fn is_recoverable(&self) -> bool;

    /// Suggested action for the client
    fn suggested_action(&self) -> Option<&'static str>;

    /// Client-facing message (may differ from internal error message)
    fn client_message(&self) -> String;

    /// Whether details should be hidden in production
    fn is_sensitive(&self) -> bool;

    /// Log level for this error
    fn log_level(&self) -> LogLevel;
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[cfg(feature = "sqlx")]
    #[error("Database error: {0}")]
    Database(#[source] SqlxError),

    #[cfg(not(feature = "sqlx"))]
    #[error("Database error: {0}")]
    Database(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("File missing: {0}")]
    FileMissing(String),

    #[error("Failed to fetch remote file: {0}")]
    FetchFailed(String),

    #[error("Extension not authorized: {extension}")]
    ExtensionNotAuthorized {
        extension: String,
        allowed: Vec<String>,
    },

    #[error("File too large: limit is {limit_kb}KB")]
    TooLarge { limit_kb: u64 },

    #[error("Image dimensions could not be determined")]
    DimensionsNotFound,

    #[error("Avatar uploads are disabled")]
    AvatarUploadsDisabled,

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid lookup key: {0}")]
    InvalidLookupKey(String),

    #[error("Unauthenticated: {0}")]
    Unauthenticated(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Internal error with source")]
    InternalWithSource {
        message: String,
        #[source]
        source: anyhow::Error,
    },
}

#[cfg(feature = "sqlx")]
impl From<SqlxError> for AppError {
    fn from(err: SqlxError) -> Self {
        AppError::Database(err)
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::InternalWithSource {
            message: err.to_string(),
            source: err,
        }
    }
}

impl From<io::Error> for AppError {
    fn from(err: io::Error) -> Self {
        AppError::Internal(format!("IO error: {}", err))
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::InvalidInput(format!("JSON parsing error: {}", err))
    }
}

/// Static metadata for each variant: (http_status, error_code, recoverable, suggested_action, sensitive, log_level).
fn app_error_static_metadata(
    err: &AppError,
) -> (
    u16,
    &'static str,
    bool,
    Option<&'static str>,
    bool,
    LogLevel,
) {
    match err {
        AppError::Database(_) => (
            500,
            "DATABASE_ERROR",
            true,
            Some("Retry after a short delay"),
            true,
            LogLevel::Error,
        ),
        AppError::Storage(_) => (
            500,
            "STORAGE_ERROR",
            true,
            Some("Retry after a short delay"),
            true,
            LogLevel::Error,
        ),
        AppError::FileMissing(_) => (
            400,
            "FILE_MISSING",
            false,
            Some("Attach a file or provide a URL"),
            false,
            LogLevel::Debug,
        ),
        AppError::FetchFailed(_) => (
            422,
            "FETCH_FAILED",
            false,
            Some("Check that the URL is publicly reachable"),
            true,
            LogLevel::Debug,
        ),
        AppError::ExtensionNotAuthorized { .. } => (
            422,
            "EXTENSION_NOT_AUTHORIZED",
            false,
            Some("Upload a file with an authorized extension"),
            false,
            LogLevel::Debug,
        ),
        AppError::TooLarge { .. } => (
            422,
            "TOO_LARGE",
            false,
            Some("Reduce file size and try again"),
            false,
            LogLevel::Debug,
        ),
        AppError::DimensionsNotFound => (
            422,
            "DIMENSIONS_NOT_FOUND",
            false,
            Some("Check image format and try a different file"),
            false,
            LogLevel::Debug,
        ),
        AppError::AvatarUploadsDisabled => (
            422,
            "AVATAR_UPLOADS_DISABLED",
            false,
            None,
            false,
            LogLevel::Debug,
        ),
        AppError::InvalidInput(_) => (
            400,
            "INVALID_INPUT",
            false,
            Some("Check request parameters and try again"),
            false,
            LogLevel::Debug,
        ),
        AppError::NotFound(_) => (
            404,
            "NOT_FOUND",
            false,
            Some("Verify the upload exists"),
            false,
            LogLevel::Debug,
        ),
        AppError::InvalidLookupKey(_) => (
            404,
            "INVALID_LOOKUP_KEY",
            false,
            Some("Use a 40 character hash or a short URL"),
            false,
            LogLevel::Debug,
        ),
        AppError::Unauthenticated(_) => (
            401,
            "UNAUTHENTICATED",
            false,
            Some("Check the bearer token"),
            false,
            LogLevel::Debug,
        ),
        AppError::Internal(_) | AppError::InternalWithSource { .. } => (
            500,
            "INTERNAL_ERROR",
            true,
            Some("Retry after a short delay"),
            true,
            LogLevel::Error,
        ),
    }
}

impl AppError {
    /// Get the error type name for detailed error responses
    pub fn error_type(&self) -> &str {
        match self {
            AppError::Database(_) => "Database",
            AppError::Storage(_) => "Storage",
            AppError::FileMissing(_) => "FileMissing",
            AppError::FetchFailed(_) => "FetchFailed",
            AppError::ExtensionNotAuthorized { .. } => "ExtensionNotAuthorized",
            AppError::TooLarge { .. } => "TooLarge",
            AppError::DimensionsNotFound => "DimensionsNotFound",
            AppError::AvatarUploadsDisabled => "AvatarUploadsDisabled",
            AppError::InvalidInput(_) => "InvalidInput",
            AppError::NotFound(_) => "NotFound",
            AppError::InvalidLookupKey(_) => "InvalidLookupKey",
            AppError::Unauthenticated(_) => "Unauthenticated",
            AppError::Internal(_) => "Internal",
            AppError::InternalWithSource { .. } => "Internal",
        }
    }

    /// Upload rejections the caller can act on. These render as an `errors` list.
    pub fn is_policy_violation(&self) -> bool {
        matches!(
            self,
            AppError::FetchFailed(_)
                | AppError::ExtensionNotAuthorized { .. }
                | AppError::TooLarge { .. }
                | AppError::DimensionsNotFound
                | AppError::AvatarUploadsDisabled
        )
    }

    /// Get detailed error information including error chain
    pub fn detailed_message(&self) -> String {
        use std::error::Error;

        let mut details = self.to_string();

        let mut source = self.source();
        let mut depth = 0;
        while let Some(err) = source {
            depth += 1;
            if depth > 5 {
                details.push_str("\n  ... (truncated)");
                break;
            }
            details.push_str(&format!("\n  Caused by: {}", err));
            source = err.source();
        }

        details
    }
}

impl ErrorMetadata for AppError {
    fn http_status_code(&self) -> u16 {
        app_error_static_metadata(self).0
    }

    fn error_code(&self) -> &'static str {
        app_error_static_metadata(self).1
    }

    fn is_recoverable(&self) -> bool {
        app_error_static_metadata(self).2
    }

    fn suggested_action(&self) -> Option<&'static str> {
        app_error_static_metadata(self).3
    }

    fn is_sensitive(&self) -> bool {
        app_error_static_metadata(self).4
    }

    fn log_level(&self) -> LogLevel {
        app_error_static_metadata(self).5
    }

    fn client_message(&self) -> String {
        match self {
            AppError::Database(_) => "Failed to access database".to_string(),
            AppError::Storage(_) => "Failed to access storage".to_string(),
            AppError::FileMissing(ref msg) => msg.clone(),
            AppError::FetchFailed(_) => {
                "Failed to download the file from the given URL.".to_string()
            }
            AppError::ExtensionNotAuthorized { allowed, .. } => format!(
                "Sorry, the file you are trying to upload is not authorized (authorized extensions: {}).",
                allowed.join(", ")
            ),
            AppError::TooLarge { limit_kb } => format!(
                "Sorry, the file you are trying to upload is too big (maximum size is {}KB).",
                limit_kb
            ),
            AppError::DimensionsNotFound => {
                "Sorry, we failed to determine the image's dimensions. Maybe your image is corrupted?"
                    .to_string()
            }
            AppError::AvatarUploadsDisabled => "Avatar uploads are not allowed.".to_string(),
            AppError::InvalidInput(ref msg) => msg.clone(),
            AppError::NotFound(ref msg) => msg.clone(),
            AppError::InvalidLookupKey(_) => "Upload not found".to_string(),
            AppError::Unauthenticated(ref msg) => msg.clone(),
            AppError::Internal(_) | AppError::InternalWithSource { .. } => {
                "Internal server error".to_string()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_metadata_database() {
        #[cfg(feature = "sqlx")]
        let err = AppError::from(sqlx::Error::PoolClosed);
        #[cfg(not(feature = "sqlx"))]
        let err = AppError::Database("pool closed".to_string());
        assert_eq!(err.http_status_code(), 500);
        assert_eq!(err.error_code(), "DATABASE_ERROR");
        assert!(err.is_recoverable());
        assert_eq!(err.client_message(), "Failed to access database");
        assert!(err.is_sensitive());
        assert_eq!(err.log_level(), LogLevel::Error);
    }

    #[test]
    fn test_missing_file_is_distinct_from_policy_violations() {
        let missing = AppError::FileMissing("No file or URL provided".to_string());
        let too_large = AppError::TooLarge { limit_kb: 1024 };
        let unauthenticated = AppError::Unauthenticated("Login required".to_string());

        assert_eq!(missing.http_status_code(), 400);
        assert_eq!(too_large.http_status_code(), 422);
        assert_eq!(unauthenticated.http_status_code(), 401);
        assert!(!missing.is_policy_violation());
        assert!(too_large.is_policy_violation());
    }

    #[test]
    fn test_too_large_message_names_limit_in_kb() {
        let err = AppError::TooLarge { limit_kb: 4096 };
        assert!(err.client_message().contains("4096KB"));
        assert_eq!(err.log_level(), LogLevel::Debug);
    }

    #[test]
    fn test_unauthorized_extension_lists_allowed() {
        let err = AppError::ExtensionNotAuthorized {
            extension: "exe".to_string(),
            allowed: vec!["jpg".to_string(), "png".to_string()],
        };
        assert_eq!(err.error_code(), "EXTENSION_NOT_AUTHORIZED");
        assert!(err.client_message().contains("jpg, png"));
    }

    #[test]
    fn test_fetch_failure_hides_reason_from_client() {
        let err = AppError::FetchFailed("Host resolves to a private address: 10.0.0.7".to_string());
        assert_eq!(err.error_code(), "FETCH_FAILED");
        assert!(!err.client_message().contains("10.0.0.7"));
        assert!(err.is_sensitive());
        assert!(err.detailed_message().contains("10.0.0.7"));
    }

    #[test]
    fn test_lookup_failures_are_not_found() {
        let invalid = AppError::InvalidLookupKey("zzz".to_string());
        let missing = AppError::NotFound("Upload not found".to_string());
        assert_eq!(invalid.http_status_code(), 404);
        assert_eq!(missing.http_status_code(), 404);
        assert!(!invalid.client_message().contains("zzz"));
    }

    #[test]
    fn test_detailed_message_includes_source_chain() {
        let err = AppError::from(anyhow::anyhow!("disk full").context("write failed"));
        let details = err.detailed_message();
        assert!(details.contains("Internal error with source"));
        assert!(details.contains("Caused by"));
    }
}
