//! Knowledge-base and archival client error types.

use kbridge_core::{RepositoryTarget, ValidationError};

/// Errors from knowledge-base and archival API calls.
#[derive(Debug, thiserror::Error)]
pub enum KbApiError {
    /// HTTP transport error.
    #[error("HTTP error calling {endpoint}: {source}")]
    Http {
        endpoint: String,
        source: reqwest::Error,
    },
    /// Remote API returned a non-2xx status.
    #[error("{endpoint} returned {status}: {body}")]
    ApiError {
        endpoint: String,
        status: u16,
        body: String,
    },
    /// Action API answered 200 with an `error` object.
    #[error("{endpoint} rejected the request ({code}): {info}")]
    Wikibase {
        endpoint: String,
        code: String,
        info: String,
    },
    /// Response deserialization failed.
    #[error("failed to deserialize response from {endpoint}: {source}")]
    Deserialization {
        endpoint: String,
        source: reqwest::Error,
    },
    /// Response parsed but lacked a field the operation depends on.
    #[error("unexpected response from {endpoint}: {reason}")]
    UnexpectedResponse { endpoint: String, reason: String },
    /// Property datatype disagrees with the value being submitted.
    #[error("property {property} has datatype {actual}, expected {expected}")]
    DatatypeMismatch {
        property: String,
        expected: String,
        actual: String,
    },
    /// Entity or property does not exist in the repository.
    #[error("{id} not found in {repository}")]
    NotFound {
        repository: RepositoryTarget,
        id: String,
    },
    /// Rejected locally before any call was made.
    #[error("invalid input: {0}")]
    Validation(#[from] ValidationError),
    /// Repository or archive marked unreachable (in-memory backend only).
    #[error("{0} is unavailable")]
    Unavailable(String),
    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(#[from] super::config::ConfigError),
}

impl KbApiError {
    /// `true` when the failure is the caller's input rather than a remote fault.
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }
}
