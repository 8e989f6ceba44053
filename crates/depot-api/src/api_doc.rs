//! OpenAPI documentation, served at `/api/openapi.json`.

use utoipa::openapi::security::{Http, HttpAuthScheme, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::error;
use crate::handlers;
use depot_core::models;

pub fn get_openapi_spec() -> utoipa::openapi::OpenApi {
    ApiDoc::openapi()
}

/// Registers the `bearer_auth` scheme referenced by protected operations.
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(Http::new(HttpAuthScheme::Bearer)),
            );
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Depot API",
        version = "0.1.0",
        description = "Content-addressed upload storage. Files are deduplicated by SHA-1, validated against site upload policy and served from local disk or S3."
    ),
    paths(
        handlers::uploads::create_upload,
        handlers::download::show_upload,
        handlers::download::show_short_upload,
        handlers::lookup::lookup_urls,
        handlers::lookup::lookup_metadata,
        handlers::health::health_check,
    ),
    components(
        schemas(
            handlers::uploads::UploadResponse,
            handlers::lookup::LookupUrlsRequest,
            handlers::lookup::ShortUrlLookupResponse,
            handlers::lookup::LookupMetadataRequest,
            handlers::health::HealthResponse,
            models::UploadMetadata,
            error::ErrorResponse,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "uploads", description = "Upload, download and lookup operations"),
        (name = "health", description = "Service health")
    )
)]
pub struct ApiDoc;
