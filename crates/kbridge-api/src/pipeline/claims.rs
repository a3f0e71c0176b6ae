//! Claim construction and submission.

use kbridge_client::KbApiError;
use kbridge_core::{ClaimValue, EntityHandle, PropertyId, RepositoryTarget};

use crate::state::RepositoryContext;

/// Repository whose property definitions every claim is built against,
/// whichever repository owns the subject.
pub const CLAIM_REPOSITORY: RepositoryTarget = RepositoryTarget::Public;

/// A claim the knowledge base accepted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatedClaim {
    pub property: PropertyId,
    pub value: ClaimValue,
    pub statement_id: String,
}

/// Submit `property = value` on `subject` through [`CLAIM_REPOSITORY`].
///
/// No references or qualifiers are attached.
pub async fn build_claim(
    ctx: &RepositoryContext,
    subject: &EntityHandle,
    property: &PropertyId,
    value: ClaimValue,
) -> Result<CreatedClaim, KbApiError> {
    let statement_id = ctx
        .kb
        .submit_claim(CLAIM_REPOSITORY, subject, property, &value)
        .await?;
    Ok(CreatedClaim {
        property: property.clone(),
        value,
        statement_id,
    })
}
