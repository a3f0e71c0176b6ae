//! # OpenAPI Specification Assembly
//!
//! Assembles the utoipa-documented routes into one OpenAPI document,
//! served at `/openapi.json`.

use axum::routing::get;
use axum::{Json, Router};
use utoipa::OpenApi;

use crate::state::AppState;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "kbridge API",
        version = "0.1.0",
        description = "Creates knowledge-base items from archival records, maps their statements to claims, and imports public items into the federated repository.",
        license(name = "AGPL-3.0-or-later")
    ),
    paths(
        crate::routes::items::create_wiki_item,
        crate::routes::items::copy_wikidata_item,
    ),
    components(schemas(
        crate::orchestration::OperationOutcome,
        crate::routes::items::CreateWikiItemRequest,
        crate::routes::items::CopyWikidataItemRequest,
        crate::routes::items::CopyWikidataItemResponse,
        crate::error::ErrorBody,
        crate::error::ErrorDetail,
    )),
    tags(
        (name = "items", description = "Item creation and federation import"),
    )
)]
pub struct ApiDoc;

/// Serves the OpenAPI JSON document at `/openapi.json`.
pub fn router() -> Router<AppState> {
    Router::new().route("/openapi.json", get(openapi_json))
}

async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}
