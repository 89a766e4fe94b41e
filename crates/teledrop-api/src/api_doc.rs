//! OpenAPI documentation, served at `/api/openapi.json` and rendered by RapiDoc at `/docs`.

use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::error;
use crate::handlers;
use teledrop_core::models;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(HttpBuilder::new().scheme(HttpAuthScheme::Bearer).build()),
            );
        }
    }
}

pub fn get_openapi_spec() -> utoipa::openapi::OpenApi {
    ApiDoc::openapi()
}

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Teledrop API",
        version = "0.1.0",
        description = "Chunked upload relay that stores files in a Telegram chat and serves them back through hotlink-protected URLs. Write routes accept a Bearer token or `auth_token` cookie when AUTH_TOKEN is configured."
    ),
    paths(
        // Uploads
        handlers::upload::put_chunk,
        handlers::upload::post_upload,
        // Files
        handlers::file::get_file,
        handlers::files::list_files,
        handlers::files::delete_file,
        handlers::files::clear_data,
        // Health
        handlers::health::health_check,
    ),
    components(
        schemas(
            models::ChunkAck,
            models::UploadResponse,
            models::FileListEntry,
            models::FileListResponse,
            models::FileMetadataRecord,
            handlers::files::ClearDataResponse,
            handlers::health::HealthCheckResponse,
            error::ErrorResponse,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "uploads", description = "Chunked and multipart uploads relayed to Telegram"),
        (name = "files", description = "Retrieval and gallery management"),
        (name = "health", description = "Service health")
    )
)]
pub struct ApiDoc;
