use axum::{extract::State, Json};
use depot_core::models::UploadMetadata;
use depot_processing::ShortUrlLookup;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::auth::RequireUser;
use crate::error::{ErrorResponse, HttpAppError, ValidatedJson};
use crate::state::UploadState;

#[derive(Debug, Deserialize, ToSchema)]
pub struct LookupUrlsRequest {
    pub short_urls: Vec<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ShortUrlLookupResponse {
    pub short_url: String,
    pub short_path: String,
    pub url: String,
}

impl From<ShortUrlLookup> for ShortUrlLookupResponse {
    fn from(lookup: ShortUrlLookup) -> Self {
        Self {
            short_url: lookup.short_url,
            short_path: lookup.short_path,
            url: lookup.url,
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct LookupMetadataRequest {
    /// Stored URL or `upload://` short URL
    pub url: String,
}

#[utoipa::path(
    post,
    path = "/uploads/lookup-urls",
    tag = "uploads",
    request_body = LookupUrlsRequest,
    responses(
        (status = 200, description = "Recognized short URLs, in request order", body = [ShortUrlLookupResponse]),
        (status = 400, description = "Malformed body", body = ErrorResponse),
        (status = 401, description = "Authentication required", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
pub async fn lookup_urls(
    State(uploads): State<UploadState>,
    RequireUser(_caller): RequireUser,
    ValidatedJson(body): ValidatedJson<LookupUrlsRequest>,
) -> Result<Json<Vec<ShortUrlLookupResponse>>, HttpAppError> {
    let found = uploads.resolver.lookup_urls(&body.short_urls).await?;
    tracing::debug!(
        requested = body.short_urls.len(),
        found = found.len(),
        "Short URL lookup"
    );
    Ok(Json(found.into_iter().map(Into::into).collect()))
}

#[utoipa::path(
    post,
    path = "/uploads/lookup-metadata",
    tag = "uploads",
    request_body = LookupMetadataRequest,
    responses(
        (status = 200, description = "Upload metadata", body = UploadMetadata),
        (status = 401, description = "Authentication required", body = ErrorResponse),
        (status = 404, description = "Upload not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
pub async fn lookup_metadata(
    State(uploads): State<UploadState>,
    RequireUser(_caller): RequireUser,
    ValidatedJson(body): ValidatedJson<LookupMetadataRequest>,
) -> Result<Json<UploadMetadata>, HttpAppError> {
    let metadata = uploads.resolver.lookup_metadata(&body.url).await?;
    Ok(Json(metadata))
}
