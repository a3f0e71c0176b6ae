//! In-memory knowledge base and archive for development and tests.
//!
//! [`InMemoryKnowledgeBase`] keeps both repositories in `DashMap`s and
//! applies the same rules as the HTTP backend: items must exist to be
//! referenced, a property's datatype must match the submitted value, and
//! importing a public item into the federation is idempotent.
//!
//! In open mode (see [`InMemoryKnowledgeBase::open`]) the public repository
//! behaves as if it held every item and property: unknown public items are
//! synthesised on lookup and a property takes the datatype of its first use.

use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use kbridge_core::{
    ClaimValue, EntityHandle, EntityTerms, ItemId, PropertyId, RepositoryTarget, TermMap,
    PRIMARY_LANGUAGE,
};
use parking_lot::{Mutex, RwLock};

use crate::archival::{ArchivalStore, IdentifierUpdate};
use crate::error::KbApiError;
use crate::knowledge_base::{ImportedEntity, KnowledgeBase};
use crate::wire::datatype_of;

/// A claim accepted by the in-memory backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedClaim {
    pub statement_id: String,
    pub subject: EntityHandle,
    pub claim_repository: RepositoryTarget,
    pub property: PropertyId,
    pub value: ClaimValue,
}

#[derive(Debug)]
struct Repository {
    items: DashMap<ItemId, EntityTerms>,
    next_id: AtomicU64,
}

impl Repository {
    fn new(first_id: u64) -> Self {
        Self {
            items: DashMap::new(),
            next_id: AtomicU64::new(first_id),
        }
    }

    fn insert_new(&self, terms: EntityTerms) -> ItemId {
        loop {
            let id = ItemId::from_number(self.next_id.fetch_add(1, Ordering::Relaxed));
            if let Entry::Vacant(slot) = self.items.entry(id.clone()) {
                slot.insert(terms);
                return id;
            }
        }
    }
}

/// [`KnowledgeBase`] held entirely in memory.
#[derive(Debug)]
pub struct InMemoryKnowledgeBase {
    public: Repository,
    federated: Repository,
    properties: DashMap<(RepositoryTarget, PropertyId), String>,
    /// Public id → federated id.
    links: DashMap<ItemId, ItemId>,
    claims: Mutex<Vec<RecordedClaim>>,
    unavailable: RwLock<HashSet<RepositoryTarget>>,
    open: bool,
}

impl Default for InMemoryKnowledgeBase {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryKnowledgeBase {
    /// Empty repositories; only seeded items and properties exist.
    pub fn new() -> Self {
        Self {
            public: Repository::new(100_000),
            federated: Repository::new(1),
            properties: DashMap::new(),
            links: DashMap::new(),
            claims: Mutex::new(Vec::new()),
            unavailable: RwLock::new(HashSet::new()),
            open: false,
        }
    }

    /// Empty repositories with an open-world public repository.
    pub fn open() -> Self {
        Self {
            open: true,
            ..Self::new()
        }
    }

    /// Add an item with a fixed id.
    pub fn seed_item(&self, repository: RepositoryTarget, id: ItemId, terms: EntityTerms) {
        self.repo(repository).items.insert(id, terms);
    }

    /// Register a property and its datatype.
    pub fn seed_property(
        &self,
        repository: RepositoryTarget,
        property: PropertyId,
        datatype: impl Into<String>,
    ) {
        let key = (repository, property);
        self.properties.insert(key, datatype.into());
    }

    /// Make every call touching `repository` fail (or succeed again).
    pub fn set_unavailable(&self, repository: RepositoryTarget, unavailable: bool) {
        let mut set = self.unavailable.write();
        if unavailable {
            set.insert(repository);
        } else {
            set.remove(&repository);
        }
    }

    /// Claims accepted so far, in submission order.
    pub fn claims(&self) -> Vec<RecordedClaim> {
        self.claims.lock().clone()
    }

    /// Terms of an item, if it exists.
    pub fn item(&self, repository: RepositoryTarget, id: &ItemId) -> Option<EntityTerms> {
        self.repo(repository).items.get(id).map(|t| t.clone())
    }

    /// Number of items in a repository.
    pub fn item_count(&self, repository: RepositoryTarget) -> usize {
        self.repo(repository).items.len()
    }

    fn repo(&self, repository: RepositoryTarget) -> &Repository {
        match repository {
            RepositoryTarget::Public => &self.public,
            RepositoryTarget::Federated => &self.federated,
        }
    }

    fn ensure_available(&self, repository: RepositoryTarget) -> Result<(), KbApiError> {
        if self.unavailable.read().contains(&repository) {
            return Err(KbApiError::Unavailable(repository.to_string()));
        }
        Ok(())
    }

    fn lookup(&self, repository: RepositoryTarget, id: &ItemId) -> Result<EntityTerms, KbApiError> {
        self.ensure_available(repository)?;
        if let Some(terms) = self.item(repository, id) {
            return Ok(terms);
        }
        if self.open && repository == RepositoryTarget::Public {
            let mut labels = TermMap::new();
            labels.insert(PRIMARY_LANGUAGE.to_string(), id.to_string());
            let terms = EntityTerms::new(labels, None, None)?;
            self.public.items.insert(id.clone(), terms.clone());
            return Ok(terms);
        }
        Err(KbApiError::NotFound {
            repository,
            id: id.to_string(),
        })
    }

    fn property_datatype(
        &self,
        repository: RepositoryTarget,
        property: &PropertyId,
        value: &ClaimValue,
    ) -> Result<String, KbApiError> {
        let key = (repository, property.clone());
        if let Some(datatype) = self.properties.get(&key) {
            return Ok(datatype.clone());
        }
        if self.open && repository == RepositoryTarget::Public {
            let datatype = datatype_of(value).to_string();
            self.properties.insert(key, datatype.clone());
            return Ok(datatype);
        }
        Err(KbApiError::NotFound {
            repository,
            id: property.to_string(),
        })
    }
}

#[async_trait]
impl KnowledgeBase for InMemoryKnowledgeBase {
    fn backend_name(&self) -> &'static str {
        "memory"
    }

    async fn resolve_entity(
        &self,
        repository: RepositoryTarget,
        id: &ItemId,
    ) -> Result<EntityHandle, KbApiError> {
        let terms = self.lookup(repository, id)?;
        Ok(EntityHandle::new(id.clone(), repository).with_label(terms.primary_label()))
    }

    async fn import_entity(&self, id: &ItemId) -> Result<ImportedEntity, KbApiError> {
        self.ensure_available(RepositoryTarget::Federated)?;
        let source = self.lookup(RepositoryTarget::Public, id)?;
        let label = source.primary_label().to_string();

        // The entry guard makes check-then-create atomic per public id.
        let (federated_id, created) = match self.links.entry(id.clone()) {
            Entry::Occupied(link) => (link.get().clone(), false),
            Entry::Vacant(slot) => {
                let new_id = self.federated.insert_new(source);
                slot.insert(new_id.clone());
                (new_id, true)
            }
        };
        if created {
            tracing::info!(
                public = %id,
                federated = %federated_id,
                "imported item into federation"
            );
        }
        Ok(ImportedEntity {
            handle: EntityHandle::new(federated_id, RepositoryTarget::Federated).with_label(label),
            created,
        })
    }

    async fn create_entity(
        &self,
        repository: RepositoryTarget,
        terms: &EntityTerms,
    ) -> Result<EntityHandle, KbApiError> {
        self.ensure_available(repository)?;
        let id = self.repo(repository).insert_new(terms.clone());
        Ok(EntityHandle::new(id, repository).with_label(terms.primary_label()))
    }

    async fn submit_claim(
        &self,
        claim_repository: RepositoryTarget,
        subject: &EntityHandle,
        property: &PropertyId,
        value: &ClaimValue,
    ) -> Result<String, KbApiError> {
        self.ensure_available(claim_repository)?;
        self.lookup(subject.repository, &subject.id)?;

        let expected = datatype_of(value);
        let actual = self.property_datatype(claim_repository, property, value)?;
        if actual != expected {
            return Err(KbApiError::DatatypeMismatch {
                property: property.to_string(),
                expected: expected.to_string(),
                actual,
            });
        }
        if let ClaimValue::Item(target) = value {
            self.lookup(target.repository, &target.id)?;
        }

        let mut claims = self.claims.lock();
        let statement_id = format!("{}${}", subject.id, claims.len() + 1);
        claims.push(RecordedClaim {
            statement_id: statement_id.clone(),
            subject: subject.clone(),
            claim_repository,
            property: property.clone(),
            value: value.clone(),
        });
        Ok(statement_id)
    }
}

/// [`ArchivalStore`] that keeps every update in memory.
#[derive(Debug, Default)]
pub struct InMemoryArchive {
    updates: Mutex<Vec<IdentifierUpdate>>,
    failing: std::sync::atomic::AtomicBool,
}

impl InMemoryArchive {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make subsequent writes fail (or succeed again).
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Updates recorded so far.
    pub fn updates(&self) -> Vec<IdentifierUpdate> {
        self.updates.lock().clone()
    }
}

#[async_trait]
impl ArchivalStore for InMemoryArchive {
    async fn record_external_identifier(
        &self,
        update: &IdentifierUpdate,
    ) -> Result<(), KbApiError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(KbApiError::Unavailable("archive".to_string()));
        }
        self.updates.lock().push(update.clone());
        Ok(())
    }
}
