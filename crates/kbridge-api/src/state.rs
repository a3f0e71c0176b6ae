//! # Application State
//!
//! [`AppState`] is cloned into every handler. It carries the
//! [`RepositoryContext`] (the knowledge-base and archive sessions every
//! pipeline stage receives explicitly) and the service configuration.

use std::sync::Arc;

use kbridge_client::{ArchivalStore, InMemoryArchive, InMemoryKnowledgeBase, KnowledgeBase};

/// Service configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Port to bind the HTTP server to.
    pub port: u16,
    /// Deadline for one whole API request, in seconds.
    pub request_timeout_secs: u64,
}

impl AppConfig {
    /// Load from `PORT` (default 8080) and `REQUEST_TIMEOUT_SECS` (default 120).
    pub fn from_env() -> Self {
        let env_parse = |var: &str| std::env::var(var).ok().and_then(|v| v.parse().ok());
        let defaults = Self::default();
        Self {
            port: env_parse("PORT")
                .and_then(|p: u64| u16::try_from(p).ok())
                .unwrap_or(defaults.port),
            request_timeout_secs: env_parse("REQUEST_TIMEOUT_SECS")
                .unwrap_or(defaults.request_timeout_secs),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            request_timeout_secs: 120,
        }
    }
}

/// Repository sessions shared by all requests.
///
/// Holds the site clients (with their CSRF tokens, write throttles and
/// import locks) behind the [`KnowledgeBase`] trait, and the archival
/// store. Pipeline functions take it by reference; nothing is global.
#[derive(Clone)]
pub struct RepositoryContext {
    pub kb: Arc<dyn KnowledgeBase>,
    pub archive: Arc<dyn ArchivalStore>,
}

impl std::fmt::Debug for RepositoryContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RepositoryContext")
            .field("kb", &self.kb.backend_name())
            .finish_non_exhaustive()
    }
}

impl RepositoryContext {
    pub fn new(kb: Arc<dyn KnowledgeBase>, archive: Arc<dyn ArchivalStore>) -> Self {
        Self { kb, archive }
    }

    /// Open-world in-memory repositories and archive.
    pub fn in_memory() -> Self {
        Self::new(
            Arc::new(InMemoryKnowledgeBase::open()),
            Arc::new(InMemoryArchive::new()),
        )
    }
}

/// Shared application state.
#[derive(Debug, Clone)]
pub struct AppState {
    pub context: RepositoryContext,
    pub config: AppConfig,
}

impl AppState {
    /// In-memory backend with default configuration.
    pub fn new() -> Self {
        Self::with_context(RepositoryContext::in_memory(), AppConfig::default())
    }

    pub fn with_context(context: RepositoryContext, config: AppConfig) -> Self {
        Self { context, config }
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}
