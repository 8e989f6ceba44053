//! Pipeline and resolver errors, and their mapping onto `AppError`.

use depot_core::AppError;
use depot_storage::StorageError;

/// Reasons an upload is rejected or fails.
#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error("no file or URL provided")]
    FileMissing,

    #[error("failed to fetch {url}: {reason}")]
    FetchFailed { url: String, reason: String },

    #[error("extension {extension:?} is not authorized")]
    Unauthorized {
        extension: String,
        allowed: Vec<String>,
    },

    #[error("file exceeds {limit_kb}KB")]
    TooLarge { limit_kb: u64 },

    #[error("image dimensions could not be determined")]
    DimensionsNotFound,

    #[error("avatar uploads are disabled")]
    AvatarUploadsDisabled,

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Repository(AppError),
}

impl From<UploadError> for AppError {
    fn from(err: UploadError) -> Self {
        match err {
            UploadError::FileMissing => {
                AppError::FileMissing("A file or a URL is required".to_string())
            }
            UploadError::FetchFailed { reason, .. } => AppError::FetchFailed(reason),
            UploadError::Unauthorized { extension, allowed } => {
                AppError::ExtensionNotAuthorized { extension, allowed }
            }
            UploadError::TooLarge { limit_kb } => AppError::TooLarge { limit_kb },
            UploadError::DimensionsNotFound => AppError::DimensionsNotFound,
            UploadError::AvatarUploadsDisabled => AppError::AvatarUploadsDisabled,
            UploadError::Storage(err) => AppError::Storage(err.to_string()),
            UploadError::Repository(err) => err,
        }
    }
}

/// Reasons a lookup does not produce a file. All of them surface as not found.
#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    #[error("upload not found")]
    NotFound,

    #[error("invalid lookup key {0:?}")]
    InvalidLookupKey(String),

    #[error(transparent)]
    Repository(AppError),
}

impl From<ResolveError> for AppError {
    fn from(err: ResolveError) -> Self {
        match err {
            ResolveError::NotFound => AppError::NotFound("Upload not found".to_string()),
            ResolveError::InvalidLookupKey(key) => AppError::InvalidLookupKey(key),
            ResolveError::Repository(err) => err,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use depot_core::ErrorMetadata;

    #[test]
    fn test_upload_errors_map_to_distinct_statuses() {
        let missing: AppError = UploadError::FileMissing.into();
        let too_large: AppError = UploadError::TooLarge { limit_kb: 10 }.into();
        let storage: AppError =
            UploadError::Storage(StorageError::UploadFailed("disk".to_string())).into();

        assert_eq!(missing.http_status_code(), 400);
        assert_eq!(too_large.http_status_code(), 422);
        assert_eq!(storage.http_status_code(), 500);
    }

    #[test]
    fn test_resolve_errors_are_not_found() {
        let invalid: AppError = ResolveError::InvalidLookupKey("nope".to_string()).into();
        let missing: AppError = ResolveError::NotFound.into();
        assert_eq!(invalid.http_status_code(), 404);
        assert_eq!(missing.http_status_code(), 404);
    }
}
