//! # Statement Pipeline
//!
//! Processes an entity's statements in input order, one claim attempt per
//! statement. Every statement ends in exactly one state:
//!
//! | Data type       | Success  | Failure                                   |
//! |-----------------|----------|-------------------------------------------|
//! | `wikibase-item` | Created  | any failure: "not created"                |
//! | `time`          | Created  | bad date, or claim rejected (names value) |
//! | anything else   | n/a      | "not implemented", nothing is submitted   |
//!
//! A failed statement never stops the ones after it. Statements still
//! pending when the request deadline passes fail as "not created" without
//! being attempted.

use kbridge_core::{
    normalize_date, ClaimValue, EntityHandle, PropertyId, StatementRecord, StatementValue,
    ValidationError,
};
use thiserror::Error;
use tokio::time::{timeout_at, Instant};

use super::claims::{build_claim, CreatedClaim};
use super::resolver::resolve_reference;
use crate::state::RepositoryContext;

/// Why a statement produced no claim. `Display` is the client-facing message.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StatementError {
    #[error("{data_type} not implemented.")]
    Unsupported { data_type: String },

    #[error("Statement for \"{label}\" \"{property}\" not created.")]
    ItemNotCreated { label: String, property: String },

    #[error("Statement for \"{label}\" \"{property}\" not created: invalid date format \"{raw}\".")]
    InvalidDate {
        label: String,
        property: String,
        raw: String,
    },

    #[error("Statement for \"{label}\" \"{property}\" not created: {reason}.")]
    Malformed {
        label: String,
        property: String,
        reason: String,
    },

    #[error("Statement for \"{label}\" \"{property}\" with value \"{value}\" not created.")]
    TimeNotCreated {
        label: String,
        property: String,
        value: String,
    },

    #[error("Statement for \"{label}\" \"{property}\" not created.")]
    DeadlineExceeded { label: String, property: String },
}

pub type StatementResult = Result<CreatedClaim, StatementError>;

/// Outcomes of one pipeline run, in statement order.
#[derive(Debug, Default)]
pub struct StatementReport {
    pub results: Vec<StatementResult>,
}

impl StatementReport {
    pub fn created_count(&self) -> usize {
        self.results.iter().filter(|r| r.is_ok()).count()
    }

    /// Client-facing messages of the failed statements.
    pub fn errors(&self) -> Vec<String> {
        self.results
            .iter()
            .filter_map(|r| r.as_ref().err())
            .map(ToString::to_string)
            .collect()
    }
}

/// Run every statement against `subject`, stopping work at `deadline`.
pub async fn run_statements(
    ctx: &RepositoryContext,
    subject: &EntityHandle,
    label: &str,
    statements: &[StatementRecord],
    deadline: Instant,
) -> StatementReport {
    let mut report = StatementReport::default();
    for record in statements {
        let expired = || StatementError::DeadlineExceeded {
            label: label.to_string(),
            property: record.property.clone(),
        };
        // `timeout_at` polls the statement once even past the deadline.
        let result = if Instant::now() >= deadline {
            Err(expired())
        } else {
            timeout_at(deadline, process_statement(ctx, subject, label, record))
                .await
                .unwrap_or_else(|_| Err(expired()))
        };
        match &result {
            Ok(claim) => tracing::info!(
                entity = %subject.id,
                repository = %subject.repository,
                property = %claim.property,
                value = %claim.value,
                statement = %claim.statement_id,
                "statement created"
            ),
            Err(e) => tracing::warn!(
                entity = %subject.id,
                repository = %subject.repository,
                property = %record.property,
                error = %e,
                "statement not created"
            ),
        }
        report.results.push(result);
    }
    report
}

/// Decode, resolve and submit one statement.
pub async fn process_statement(
    ctx: &RepositoryContext,
    subject: &EntityHandle,
    label: &str,
    record: &StatementRecord,
) -> StatementResult {
    let decoded = record.decode();
    if let Ok(StatementValue::Unsupported(data_type)) = decoded {
        return Err(StatementError::Unsupported { data_type });
    }

    let label = label.to_string();
    let property_text = record.property.clone();
    match (decoded, PropertyId::new(record.property.as_str())) {
        (Ok(StatementValue::ItemReference(target)), Ok(property)) => {
            let not_created = |cause: String| {
                tracing::debug!(
                    property = %property,
                    target = %target,
                    %cause,
                    "item statement failed"
                );
                StatementError::ItemNotCreated {
                    label: label.clone(),
                    property: property_text.clone(),
                }
            };
            let value = resolve_reference(ctx, subject.repository, &target)
                .await
                .map_err(|e| not_created(e.to_string()))?;
            build_claim(ctx, subject, &property, ClaimValue::Item(value))
                .await
                .map_err(|e| not_created(e.to_string()))
        }
        (Ok(StatementValue::Time(raw)), Ok(property)) => {
            let point = normalize_date(&raw).map_err(|_| StatementError::InvalidDate {
                label: label.clone(),
                property: property_text.clone(),
                raw: raw.clone(),
            })?;
            build_claim(ctx, subject, &property, ClaimValue::Time(point))
                .await
                .map_err(|e| {
                    tracing::debug!(property = %property, cause = %e, "time statement failed");
                    StatementError::TimeNotCreated {
                        label,
                        property: property_text,
                        value: point.to_string(),
                    }
                })
        }
        (decoded, property) if record.data_type == kbridge_core::DATA_TYPE_ITEM => {
            let cause = decoded.err().or(property.err()).map(|e| e.to_string());
            tracing::debug!(property = %property_text, ?cause, "item statement rejected");
            Err(StatementError::ItemNotCreated {
                label,
                property: property_text,
            })
        }
        (decoded, property) => Err(StatementError::Malformed {
            label,
            property: property_text,
            reason: malformed_reason(decoded.err().or(property.err())),
        }),
    }
}

fn malformed_reason(cause: Option<ValidationError>) -> String {
    match cause {
        Some(ValidationError::MalformedStatement { reason, .. }) => reason,
        Some(other) => other.to_string(),
        None => "unrecognised statement".to_string(),
    }
}
