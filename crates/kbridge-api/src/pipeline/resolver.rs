//! Reference resolution for `wikibase-item` statements.
//!
//! A reference is always a public-repository id. For an entity owned by
//! the public repository it is used as is, without an existence check; a
//! dangling id surfaces when the claim is submitted. For a federated owner
//! the referenced item is imported into the federation (or the earlier
//! import is fetched) and the federated copy becomes the claim value.

use kbridge_client::KbApiError;
use kbridge_core::{EntityHandle, ItemId, RepositoryTarget};

use crate::state::RepositoryContext;

/// Resolve `id` for a claim on an entity owned by `owner`.
pub async fn resolve_reference(
    ctx: &RepositoryContext,
    owner: RepositoryTarget,
    id: &ItemId,
) -> Result<EntityHandle, KbApiError> {
    match owner {
        RepositoryTarget::Public => Ok(EntityHandle::new(id.clone(), RepositoryTarget::Public)),
        RepositoryTarget::Federated => {
            let imported = ctx.kb.import_entity(id).await?;
            tracing::debug!(
                public = %id,
                federated = %imported.handle.id,
                created = imported.created,
                "resolved federated reference"
            );
            Ok(imported.handle)
        }
    }
}
