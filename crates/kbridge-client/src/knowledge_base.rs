//! # Knowledge-Base Interface
//!
//! The [`KnowledgeBase`] trait is the seam between the statement pipeline
//! and the two repositories. [`HttpKnowledgeBase`] implements it against
//! the action APIs; [`crate::memory::InMemoryKnowledgeBase`] implements it
//! without a network.
//!
//! ## Federation import
//!
//! A public item is imported into the federation by copying its labels,
//! descriptions and aliases into a new federated item that also carries a
//! link statement (`federation_link_property = <public qid>`). Before
//! creating anything the federation is searched for that link statement, so
//! importing the same item twice yields the same federated entity.
//!
//! The search index lags behind writes, so a fresh import may not be found
//! by a search issued right after it. Each import therefore also remembers
//! the federated id it produced; a remembered id is confirmed with
//! `wbgetentities` and only searched for when the entity is gone. A per-qid
//! lock serializes concurrent imports of one item inside this process and is
//! dropped from the lock table once nobody holds or awaits it.

use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use kbridge_core::{ClaimValue, EntityHandle, EntityTerms, ItemId, PropertyId, RepositoryTarget};
use url::Url;

use crate::config::KbApiConfig;
use crate::error::KbApiError;
use crate::site::SiteClient;
use crate::wire::{claim_datavalue, datatype_of, new_item_data, WbEntity};

/// Imports remembered per process. Past this many the memo starts over and
/// the link search covers the forgotten ones.
const IMPORT_MEMO_CAPACITY: usize = 4096;

/// Result of an import-or-fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportedEntity {
    /// Federated entity, labelled with its primary label.
    pub handle: EntityHandle,
    /// `true` when this call created the federated entity.
    pub created: bool,
}

impl ImportedEntity {
    /// Federated identifier.
    pub fn id(&self) -> &ItemId {
        &self.handle.id
    }

    /// Primary label, or the id when the entity has none.
    pub fn label(&self) -> &str {
        self.handle
            .label
            .as_deref()
            .unwrap_or_else(|| self.handle.id.as_str())
    }
}

/// Operations the pipeline needs from the repository pair.
#[async_trait]
pub trait KnowledgeBase: Send + Sync {
    /// Short backend name for logs.
    fn backend_name(&self) -> &'static str;

    /// Look up an existing item.
    ///
    /// # Errors
    ///
    /// [`KbApiError::NotFound`] when the item does not exist.
    async fn resolve_entity(
        &self,
        repository: RepositoryTarget,
        id: &ItemId,
    ) -> Result<EntityHandle, KbApiError>;

    /// Import-or-fetch a public item into the federation.
    ///
    /// # Errors
    ///
    /// [`KbApiError::NotFound`] when `id` does not exist in the public
    /// repository.
    async fn import_entity(&self, id: &ItemId) -> Result<ImportedEntity, KbApiError>;

    /// Create a new item in `repository` in one call.
    async fn create_entity(
        &self,
        repository: RepositoryTarget,
        terms: &EntityTerms,
    ) -> Result<EntityHandle, KbApiError>;

    /// Add `property = value` to `subject`, with the property resolved in
    /// `claim_repository`. Returns the statement id.
    async fn submit_claim(
        &self,
        claim_repository: RepositoryTarget,
        subject: &EntityHandle,
        property: &PropertyId,
        value: &ClaimValue,
    ) -> Result<String, KbApiError>;
}

// -- HTTP implementation ------------------------------------------------------

/// [`KnowledgeBase`] backed by the two action APIs.
#[derive(Debug)]
pub struct HttpKnowledgeBase {
    public: SiteClient,
    federated: SiteClient,
    link_property: PropertyId,
    concept_base_uri: Url,
    import_locks: DashMap<ItemId, Arc<tokio::sync::Mutex<()>>>,
    /// Public id to the federated id an import produced or found.
    imported: DashMap<ItemId, ItemId>,
}

impl HttpKnowledgeBase {
    /// Build both site clients from configuration.
    pub fn new(config: &KbApiConfig) -> Result<Self, KbApiError> {
        Ok(Self {
            public: SiteClient::new(&config.public, config.timeout_secs)?,
            federated: SiteClient::new(&config.federated, config.timeout_secs)?,
            link_property: config.federation_link_property.clone(),
            concept_base_uri: config.concept_base_uri.clone(),
            import_locks: DashMap::new(),
            imported: DashMap::new(),
        })
    }

    /// Site client for a repository.
    pub fn site(&self, repository: RepositoryTarget) -> &SiteClient {
        match repository {
            RepositoryTarget::Public => &self.public,
            RepositoryTarget::Federated => &self.federated,
        }
    }

    fn handle_from(
        repository: RepositoryTarget,
        entity: &WbEntity,
    ) -> Result<EntityHandle, KbApiError> {
        let id = entity.id.clone().unwrap_or_default();
        let mut handle = EntityHandle::new(ItemId::new(id)?, repository);
        if let Some(label) = entity.label(kbridge_core::PRIMARY_LANGUAGE) {
            handle = handle.with_label(label);
        }
        Ok(handle)
    }

    async fn fetch(
        &self,
        repository: RepositoryTarget,
        id: &ItemId,
    ) -> Result<WbEntity, KbApiError> {
        self.site(repository)
            .get_entity(id)
            .await?
            .ok_or_else(|| KbApiError::NotFound {
                repository,
                id: id.to_string(),
            })
    }

    fn remember(&self, public: &ItemId, federated: &ItemId) {
        if self.imported.len() >= IMPORT_MEMO_CAPACITY {
            self.imported.clear();
        }
        self.imported.insert(public.clone(), federated.clone());
    }

    /// Body of [`KnowledgeBase::import_entity`], run under the per-qid lock.
    async fn import_or_fetch(&self, id: &ItemId) -> Result<ImportedEntity, KbApiError> {
        let known = self.imported.get(id).map(|entry| entry.value().clone());
        if let Some(known) = known {
            if let Some(entity) = self.federated.get_entity(&known).await? {
                tracing::debug!(public = %id, federated = %known, "item already imported");
                return Ok(ImportedEntity {
                    handle: Self::handle_from(RepositoryTarget::Federated, &entity)?,
                    created: false,
                });
            }
            tracing::warn!(public = %id, federated = %known, "imported item no longer exists");
            self.imported.remove(id);
        }

        let existing = self
            .federated
            .search_by_statement(&self.link_property, id.as_str())
            .await?;
        if let Some(existing) = existing {
            tracing::debug!(public = %id, federated = %existing, "item already imported");
            let entity = self.fetch(RepositoryTarget::Federated, &existing).await?;
            self.remember(id, &existing);
            return Ok(ImportedEntity {
                handle: Self::handle_from(RepositoryTarget::Federated, &entity)?,
                created: false,
            });
        }

        let source = self.fetch(RepositoryTarget::Public, id).await?;
        let terms = source.to_terms()?;
        let data = new_item_data(&terms, Some((&self.link_property, id.as_str())));
        let created = self.federated.create_item(&data).await?;
        let handle = Self::handle_from(RepositoryTarget::Federated, &created)?
            .with_label(terms.primary_label());
        self.remember(id, &handle.id);
        tracing::info!(public = %id, federated = %handle.id, "imported item into federation");
        Ok(ImportedEntity {
            handle,
            created: true,
        })
    }
}

#[async_trait]
impl KnowledgeBase for HttpKnowledgeBase {
    fn backend_name(&self) -> &'static str {
        "http"
    }

    async fn resolve_entity(
        &self,
        repository: RepositoryTarget,
        id: &ItemId,
    ) -> Result<EntityHandle, KbApiError> {
        let entity = self.fetch(repository, id).await?;
        Self::handle_from(repository, &entity)
    }

    async fn import_entity(&self, id: &ItemId) -> Result<ImportedEntity, KbApiError> {
        let lock = self
            .import_locks
            .entry(id.clone())
            .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(())))
            .clone();
        let guard = lock.lock().await;
        let result = self.import_or_fetch(id).await;
        drop(guard);
        drop(lock);
        self.import_locks
            .remove_if(id, |_, lock| Arc::strong_count(lock) == 1);
        result
    }

    async fn create_entity(
        &self,
        repository: RepositoryTarget,
        terms: &EntityTerms,
    ) -> Result<EntityHandle, KbApiError> {
        let created = self
            .site(repository)
            .create_item(&new_item_data(terms, None))
            .await?;
        Ok(Self::handle_from(repository, &created)?.with_label(terms.primary_label()))
    }

    async fn submit_claim(
        &self,
        claim_repository: RepositoryTarget,
        subject: &EntityHandle,
        property: &PropertyId,
        value: &ClaimValue,
    ) -> Result<String, KbApiError> {
        let expected = datatype_of(value);
        let actual = self
            .site(claim_repository)
            .property_datatype(property)
            .await?;
        if actual != expected {
            return Err(KbApiError::DatatypeMismatch {
                property: property.to_string(),
                expected: expected.to_string(),
                actual,
            });
        }
        let datavalue = claim_datavalue(value, self.concept_base_uri.as_str());
        self.site(subject.repository)
            .create_claim(&subject.id, property, &datavalue)
            .await
    }
}
