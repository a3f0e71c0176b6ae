#![deny(missing_docs)]

//! # kbridge-core: Foundational Types for kbridge
//!
//! This crate defines the types shared by the knowledge-base client and the
//! API service. It has no internal crate dependencies, only `serde`,
//! `serde_json`, `thiserror`, and `chrono` from the external ecosystem.
//!
//! ## Design Principles
//!
//! 1. **Newtype wrappers for identifiers.** [`ItemId`] and [`PropertyId`] are
//!    validated at construction. You cannot pass a property where an item is
//!    expected.
//!
//! 2. **Statements are decoded once.** A client-supplied
//!    [`StatementRecord`] is turned into a closed [`StatementValue`] at the
//!    pipeline boundary. Unsupported data types are a variant, not a
//!    fallthrough.
//!
//! 3. **Dates carry their precision.** [`normalize_date`] yields a
//!    [`CalendarPoint`] that knows whether it is year- or day-precise.

pub mod entity;
pub mod error;
pub mod identity;
pub mod temporal;

pub use entity::{
    AliasMap, ClaimValue, EntityDescription, EntityHandle, EntityTerms, StatementRecord,
    StatementValue, TermMap, DATA_TYPE_ITEM, DATA_TYPE_TIME, PRIMARY_LANGUAGE,
};
pub use error::ValidationError;
pub use identity::{ItemId, PropertyId, RepositoryTarget};
pub use temporal::{normalize_date, CalendarPoint, DatePrecision};
