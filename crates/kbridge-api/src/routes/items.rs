//! # Item Routes
//!
//! | Method | Path                  | Handler               |
//! |--------|-----------------------|-----------------------|
//! | POST   | `/create_wiki_item`   | [`create_wiki_item`]   |
//! | POST   | `/copy_wikidata_item` | [`copy_wikidata_item`] |
//!
//! Both run under the per-request deadline from `AppConfig`. Item creation
//! reports its outcome even when the deadline cuts the statements short;
//! a copy that misses the deadline answers 504.

use std::future::Future;
use std::time::Duration;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use kbridge_core::{EntityDescription, ItemId, RepositoryTarget};
use serde::{Deserialize, Serialize};
use tokio::time::Instant;
use utoipa::ToSchema;

use crate::error::AppError;
use crate::extractors::{extract_validated_json, require_non_empty, Validate};
use crate::orchestration::{copy_public_item, create_item, ArchivalRecordRef, OperationOutcome};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/create_wiki_item", post(create_wiki_item))
        .route("/copy_wikidata_item", post(copy_wikidata_item))
}

// -- Request/Response DTOs ----------------------------------------------------

/// Request to create an item and its statements.
#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateWikiItemRequest {
    /// Labels, descriptions, aliases and statements of the new item.
    #[schema(value_type = Object)]
    pub data: EntityDescription,
    /// Target repository: `wikidata` (public) or `local` (federated).
    pub wiki_instance: String,
    /// Archival record id.
    pub ca_id: String,
    /// Archival table.
    pub table: String,
    /// Archival record type. Accepted, not used.
    #[serde(rename = "type")]
    pub record_type: String,
}

impl Validate for CreateWikiItemRequest {
    fn validate(&self) -> Result<(), String> {
        require_non_empty("ca_id", &self.ca_id)?;
        require_non_empty("table", &self.table)
    }
}

/// Request to copy a public item into the federation.
#[derive(Debug, Deserialize, ToSchema)]
pub struct CopyWikidataItemRequest {
    /// Public item id, `Q` followed by digits.
    pub qid: String,
    pub ca_id: String,
    pub table: String,
    #[serde(rename = "type")]
    pub record_type: String,
}

impl Validate for CopyWikidataItemRequest {
    fn validate(&self) -> Result<(), String> {
        ItemId::new(self.qid.as_str()).map_err(|e| e.to_string())?;
        require_non_empty("ca_id", &self.ca_id)?;
        require_non_empty("table", &self.table)
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CopyWikidataItemResponse {
    pub message: String,
}

// -- Handlers -----------------------------------------------------------------

async fn with_deadline<T>(
    state: &AppState,
    operation: &str,
    fut: impl Future<Output = T>,
) -> Result<T, AppError> {
    let limit = Duration::from_secs(state.config.request_timeout_secs);
    tokio::time::timeout(limit, fut)
        .await
        .map_err(|_| AppError::Timeout(format!("{operation} did not finish within {limit:?}")))
}

/// POST /create_wiki_item: create an item, record its id, attach statements.
#[utoipa::path(
    post,
    path = "/create_wiki_item",
    request_body = CreateWikiItemRequest,
    responses(
        (status = 200, description = "Outcome of the creation, including per-statement errors", body = OperationOutcome),
        (status = 400, description = "Malformed body or unknown wiki_instance", body = crate::error::ErrorBody),
        (status = 422, description = "Missing archival reference", body = crate::error::ErrorBody),
    ),
    tag = "items"
)]
pub async fn create_wiki_item(
    State(state): State<AppState>,
    body: Result<Json<CreateWikiItemRequest>, JsonRejection>,
) -> Result<Json<OperationOutcome>, AppError> {
    let req = extract_validated_json(body)?;
    let repository: RepositoryTarget = req
        .wiki_instance
        .parse()
        .map_err(|e: kbridge_core::ValidationError| AppError::BadRequest(e.to_string()))?;
    let record = ArchivalRecordRef {
        table: req.table,
        record_id: req.ca_id,
    };

    let deadline = Instant::now() + Duration::from_secs(state.config.request_timeout_secs);
    let outcome = create_item(&state.context, repository, &req.data, &record, deadline).await;
    Ok(Json(outcome))
}

/// POST /copy_wikidata_item: import a public item into the federation.
#[utoipa::path(
    post,
    path = "/copy_wikidata_item",
    request_body = CopyWikidataItemRequest,
    responses(
        (status = 200, description = "Item imported (or already present) and recorded", body = CopyWikidataItemResponse),
        (status = 400, description = "Malformed body", body = crate::error::ErrorBody),
        (status = 422, description = "Invalid qid or archival reference", body = crate::error::ErrorBody),
        (status = 502, description = "Knowledge base or archive failed", body = crate::error::ErrorBody),
        (status = 504, description = "Request deadline exceeded", body = crate::error::ErrorBody),
    ),
    tag = "items"
)]
pub async fn copy_wikidata_item(
    State(state): State<AppState>,
    body: Result<Json<CopyWikidataItemRequest>, JsonRejection>,
) -> Result<Json<CopyWikidataItemResponse>, AppError> {
    let req = extract_validated_json(body)?;
    let qid = ItemId::new(req.qid)?;
    let record = ArchivalRecordRef {
        table: req.table,
        record_id: req.ca_id,
    };

    let imported = with_deadline(
        &state,
        "copy_wikidata_item",
        copy_public_item(&state.context, &qid, &record),
    )
    .await??;
    tracing::info!(
        public = %qid,
        federated = %imported.id(),
        created = imported.created,
        "item copied"
    );

    Ok(Json(CopyWikidataItemResponse {
        message: format!(
            "{} {} added to local Wikibase",
            imported.label(),
            imported.id()
        ),
    }))
}
