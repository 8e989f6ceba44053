use axum::{
    extract::{Multipart, State},
    http::StatusCode,
    Json,
};
use depot_core::models::Upload;
use depot_core::AppError;
use depot_processing::{ContentAddresser, Sha1Digest};
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::auth::RequireUser;
use crate::error::{ErrorResponse, HttpAppError};
use crate::state::UploadState;
use crate::utils::multipart::UploadForm;

#[derive(Debug, Serialize, ToSchema)]
pub struct UploadResponse {
    pub id: Uuid,
    pub url: String,
    pub short_url: String,
    pub short_path: String,
    pub original_filename: String,
    pub filesize: i64,
    pub width: Option<i32>,
    pub height: Option<i32>,
    pub extension: Option<String>,
}

impl UploadResponse {
    fn from_upload(upload: Upload, digest: &Sha1Digest) -> Self {
        let extension = upload.extension.as_deref();
        Self {
            short_url: ContentAddresser::short_url(digest, extension),
            short_path: ContentAddresser::short_path(digest, extension),
            id: upload.id,
            url: upload.url,
            original_filename: upload.original_filename,
            filesize: upload.filesize,
            width: upload.width,
            height: upload.height,
            extension: upload.extension,
        }
    }
}

#[utoipa::path(
    post,
    path = "/uploads",
    tag = "uploads",
    request_body(content_type = "multipart/form-data", description = "`file` or `url`, plus `type`, `retain_hours`, `for_private_message`, `for_site_setting`"),
    responses(
        (status = 201, description = "Upload accepted", body = UploadResponse),
        (status = 400, description = "No file or URL given", body = ErrorResponse),
        (status = 401, description = "Authentication required", body = ErrorResponse),
        (status = 422, description = "Upload rejected", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
#[tracing::instrument(skip_all, fields(user_id = ?caller.user_id))]
pub async fn create_upload(
    State(uploads): State<UploadState>,
    RequireUser(caller): RequireUser,
    multipart: Multipart,
) -> Result<(StatusCode, Json<UploadResponse>), HttpAppError> {
    let request = UploadForm::from_multipart(multipart)
        .await?
        .into_request(caller)?;

    let upload = uploads.pipeline.accept(request).await?;

    let digest: Sha1Digest = upload
        .sha1
        .parse()
        .map_err(|e| AppError::Internal(format!("Stored hash is malformed: {}", e)))?;

    Ok((
        StatusCode::CREATED,
        Json(UploadResponse::from_upload(upload, &digest)),
    ))
}
