use axum::{
    body::Body,
    extract::{Path, State},
    http::{header, StatusCode},
    response::Response,
};
use depot_core::AppError;
use depot_processing::ResolvedUpload;
use percent_encoding::{utf8_percent_encode, NON_ALPHANUMERIC};

use crate::auth::CurrentCaller;
use crate::error::{ErrorResponse, HttpAppError};
use crate::state::UploadState;

#[utoipa::path(
    get,
    path = "/uploads/{site}/{key}",
    tag = "uploads",
    params(
        ("site" = String, Path, description = "Site name"),
        ("key" = String, Path, description = "`<sha1>` or `<sha1>.<ext>`")
    ),
    responses(
        (status = 200, description = "File contents", content_type = "application/octet-stream"),
        (status = 302, description = "Redirect to the object store"),
        (status = 404, description = "Upload not found", body = ErrorResponse)
    )
)]
pub async fn show_upload(
    State(uploads): State<UploadState>,
    CurrentCaller(caller): CurrentCaller,
    Path((site, key)): Path<(String, String)>,
) -> Result<Response, HttpAppError> {
    let resolved = uploads.resolver.show(&site, &key, &caller).await?;
    render(resolved)
}

#[utoipa::path(
    get,
    path = "/uploads/short-url/{short}",
    tag = "uploads",
    params(
        ("short" = String, Path, description = "Base58 short id, optionally with `.<ext>`")
    ),
    responses(
        (status = 200, description = "File contents", content_type = "application/octet-stream"),
        (status = 302, description = "Redirect to the object store"),
        (status = 404, description = "Upload not found", body = ErrorResponse)
    )
)]
pub async fn show_short_upload(
    State(uploads): State<UploadState>,
    CurrentCaller(caller): CurrentCaller,
    Path(short): Path<String>,
) -> Result<Response, HttpAppError> {
    let resolved = uploads.resolver.show_short(&short, &caller).await?;
    render(resolved)
}

fn render(resolved: ResolvedUpload) -> Result<Response, HttpAppError> {
    let response = match resolved {
        ResolvedUpload::File {
            data,
            filename,
            content_type,
            ..
        } => Response::builder()
            .status(StatusCode::OK)
            .header(header::CONTENT_TYPE, content_type)
            .header(header::CONTENT_DISPOSITION, content_disposition(&filename))
            .header(header::CACHE_CONTROL, "public, max-age=31536000, immutable")
            .body(Body::from(data)),
        ResolvedUpload::Redirect { location, .. } => Response::builder()
            .status(StatusCode::FOUND)
            .header(header::LOCATION, location)
            .header(header::CACHE_CONTROL, "no-store")
            .body(Body::empty()),
    };

    response.map_err(|e| {
        tracing::error!(error = %e, "Failed to build response");
        HttpAppError(AppError::Internal(e.to_string()))
    })
}

/// `attachment` disposition with an ASCII fallback name and the RFC 5987 encoded original.
fn content_disposition(filename: &str) -> String {
    let fallback: String = filename
        .chars()
        .map(|c| {
            if c.is_ascii() && !c.is_ascii_control() && c != '"' && c != '\\' {
                c
            } else {
                '_'
            }
        })
        .collect();
    format!(
        "attachment; filename=\"{}\"; filename*=UTF-8''{}",
        fallback,
        utf8_percent_encode(filename, NON_ALPHANUMERIC)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_disposition_escapes_names() {
        assert_eq!(
            content_disposition("logo.png"),
            "attachment; filename=\"logo.png\"; filename*=UTF-8''logo%2Epng"
        );
        assert_eq!(
            content_disposition("caf\u{e9} \"menu\".pdf"),
            "attachment; filename=\"caf_ _menu_.pdf\"; filename*=UTF-8''caf%C3%A9%20%22menu%22%2Epdf"
        );
    }
}
