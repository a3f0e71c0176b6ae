//! # Validation Errors
//!
//! Structured validation failures for identifiers, payloads, and raw
//! statement values, built with `thiserror`. Each variant carries the
//! offending input so the message can be surfaced to the caller verbatim.

use thiserror::Error;

/// Validation errors raised while decoding client-supplied data.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Item identifier does not match `Q<digits>`.
    #[error("invalid item ID: \"{0}\" (expected Q followed by digits)")]
    InvalidItemId(String),

    /// Property identifier does not match `P<digits>`.
    #[error("invalid property ID: \"{0}\" (expected P followed by digits)")]
    InvalidPropertyId(String),

    /// Repository name is not one of the known instances.
    #[error("unknown wiki instance: \"{0}\" (expected \"wikidata\" or \"local\")")]
    UnknownRepository(String),

    /// The labels map has no entry for the primary language.
    #[error("labels must contain a \"{0}\" label")]
    MissingPrimaryLabel(String),

    /// Raw time value matches none of the recognised date forms.
    #[error("invalid date format: \"{0}\"")]
    InvalidDateFormat(String),

    /// A statement's `data_value` does not have the shape its `data_type` requires.
    #[error("malformed {data_type} value for {property}: {reason}")]
    MalformedStatement {
        /// Property the statement targets.
        property: String,
        /// Declared data type tag.
        data_type: String,
        /// What was missing or wrong.
        reason: String,
    },
}
