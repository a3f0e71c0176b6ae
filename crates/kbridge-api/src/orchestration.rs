//! # Entity Creation Orchestration
//!
//! The two write operations of the service, above the statement pipeline:
//!
//! 1. **Create an item** in the selected repository from a client
//!    description. Entity creation is one call; if it fails nothing else
//!    happens and the outcome reports `changed = 0`. Otherwise the new id
//!    is written to the archival record and the statements run.
//!
//! 2. **Copy a public item** into the federation (import-or-fetch) and
//!    write the federated id to the archival record.
//!
//! Creation never fails the request: every failure after the payload has
//! been accepted is reported inside the [`OperationOutcome`]. The request
//! deadline bounds each step rather than the whole operation, so an item
//! that was created is always reported with `changed = 1`.

use kbridge_client::{IdentifierUpdate, ImportedEntity, KbApiError};
use kbridge_core::{EntityDescription, EntityTerms, ItemId, RepositoryTarget};
use serde::{Deserialize, Serialize};
use tokio::time::{timeout_at, Instant};
use utoipa::ToSchema;

use crate::pipeline::run_statements;
use crate::state::RepositoryContext;

/// Result of an entity-creation request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct OperationOutcome {
    /// 1 when the entity was created, 0 otherwise.
    pub changed: u8,
    /// Always empty.
    pub warnings: Vec<String>,
    /// One message per failed statement or top-level failure.
    pub errors: Vec<String>,
}

impl OperationOutcome {
    fn unchanged(error: String) -> Self {
        Self {
            changed: 0,
            warnings: Vec::new(),
            errors: vec![error],
        }
    }

    fn item_not_created(label: &str) -> Self {
        Self::unchanged(format!("Item for \"{label}\" not created."))
    }
}

/// The archival record an operation reports back to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchivalRecordRef {
    pub table: String,
    pub record_id: String,
}

/// Create an item in `repository` and attach its statements, giving up on
/// outstanding work at `deadline`.
pub async fn create_item(
    ctx: &RepositoryContext,
    repository: RepositoryTarget,
    description: &EntityDescription,
    record: &ArchivalRecordRef,
    deadline: Instant,
) -> OperationOutcome {
    let terms = match EntityTerms::from_description(description) {
        Ok(terms) => terms,
        Err(e) => {
            tracing::info!(%repository, error = %e, "item rejected");
            return OperationOutcome::unchanged(e.to_string());
        }
    };
    let label = terms.primary_label().to_string();
    let entity = match timeout_at(deadline, ctx.kb.create_entity(repository, &terms)).await {
        Ok(Ok(entity)) => entity,
        Ok(Err(e)) if e.is_validation() => return OperationOutcome::unchanged(e.to_string()),
        Ok(Err(e)) => {
            tracing::warn!(%repository, label = %label, error = %e, "item not created");
            return OperationOutcome::item_not_created(&label);
        }
        Err(_) => {
            tracing::warn!(%repository, label = %label, "item creation timed out");
            return OperationOutcome::item_not_created(&label);
        }
    };
    tracing::info!(%repository, entity = %entity.id, label = %label, "item created");

    let mut errors = Vec::new();
    let update = IdentifierUpdate::for_repository(
        repository,
        record.table.as_str(),
        record.record_id.as_str(),
        entity.id.as_str(),
    );
    let recording = ctx.archive.record_external_identifier(&update);
    let failure = match timeout_at(deadline, recording).await {
        Ok(Ok(())) => None,
        Ok(Err(e)) => Some(e.to_string()),
        Err(_) => Some("timed out".to_string()),
    };
    if let Some(cause) = failure {
        tracing::warn!(
            entity = %entity.id,
            table = %record.table,
            record = %record.record_id,
            error = %cause,
            "identifier not recorded"
        );
        errors.push(format!(
            "Identifier {} for \"{label}\" not recorded on {} record {}.",
            entity.id, record.table, record.record_id
        ));
    }

    let report = run_statements(ctx, &entity, &label, &description.statements, deadline).await;
    tracing::info!(
        entity = %entity.id,
        statements = description.statements.len(),
        created = report.created_count(),
        "statements processed"
    );
    errors.extend(report.errors());

    OperationOutcome {
        changed: 1,
        warnings: Vec::new(),
        errors,
    }
}

/// Import-or-fetch a public item into the federation and record the
/// federated id on the archival record.
pub async fn copy_public_item(
    ctx: &RepositoryContext,
    id: &ItemId,
    record: &ArchivalRecordRef,
) -> Result<ImportedEntity, KbApiError> {
    let imported = ctx.kb.import_entity(id).await?;
    let update = IdentifierUpdate::for_repository(
        RepositoryTarget::Federated,
        record.table.as_str(),
        record.record_id.as_str(),
        imported.id().as_str(),
    );
    ctx.archive.record_external_identifier(&update).await?;
    Ok(imported)
}
