//! # kbridge-client -- Typed clients for the knowledge bases and the archive
//!
//! Provides typed access to:
//! - the **public** and **federated** knowledge-base action APIs, behind the
//!   [`KnowledgeBase`] trait ([`HttpKnowledgeBase`]);
//! - the **archival record system** GraphQL edit service, behind the
//!   [`ArchivalStore`] trait ([`ArchivalClient`]).
//!
//! In-memory implementations of both traits live in [`memory`].
//!
//! ## Architecture
//!
//! This crate is the only place that speaks the remote wire formats. The
//! API service works exclusively with `kbridge-core` types and the two
//! traits, so every pipeline stage can run against the in-memory backend.

pub mod archival;
pub mod config;
pub mod error;
pub mod knowledge_base;
pub mod memory;
pub(crate) mod retry;
pub mod site;
pub mod wire;

pub use archival::{ArchivalClient, ArchivalStore, IdentifierUpdate, LoggingArchive};
pub use config::{ArchiveConfig, ConfigError, KbApiConfig, SiteConfig};
pub use error::KbApiError;
pub use knowledge_base::{HttpKnowledgeBase, ImportedEntity, KnowledgeBase};
pub use memory::{InMemoryArchive, InMemoryKnowledgeBase, RecordedClaim};
pub use site::SiteClient;
