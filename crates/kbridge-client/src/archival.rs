//! # Archival Record System Client
//!
//! Records the identifier of a newly created knowledge-base entity on the
//! archival record it describes. The write is a GraphQL `edit` mutation
//! whose table, record and bundle values travel as variables, so record
//! text never ends up inside the query document.

use std::time::Duration;

use async_trait::async_trait;
use kbridge_core::RepositoryTarget;
use serde::Serialize;
use serde_json::{json, Value};

use crate::config::{ArchiveConfig, ConfigError};
use crate::error::KbApiError;

/// Archival field holding a public-repository identifier.
pub const PUBLIC_ID_FIELD: &str = "authority_wikipedia";

/// Archival field holding a federated-repository identifier.
pub const FEDERATED_ID_FIELD: &str = "authority_wiki_data";

const EDIT_MUTATION: &str = "mutation RecordIdentifier($table: String!, $identifier: String!, \
$identifierType: String, $bundles: [Bundle]) { edit(table: $table, identifier: $identifier, \
identifierType: $identifierType, bundles: $bundles) { id changed errors { code message bundle } } }";

/// One field update on one archival record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IdentifierUpdate {
    pub table: String,
    pub record_id: String,
    pub field: String,
    pub value: String,
}

impl IdentifierUpdate {
    /// Update storing an identifier from `repository` in the matching field.
    pub fn for_repository(
        repository: RepositoryTarget,
        table: impl Into<String>,
        record_id: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        let field = match repository {
            RepositoryTarget::Public => PUBLIC_ID_FIELD,
            RepositoryTarget::Federated => FEDERATED_ID_FIELD,
        };
        Self {
            table: table.into(),
            record_id: record_id.into(),
            field: field.to_string(),
            value: value.into(),
        }
    }

    /// GraphQL request body: the fixed mutation plus variables.
    pub fn to_request(&self) -> Value {
        json!({
            "query": EDIT_MUTATION,
            "variables": {
                "table": self.table,
                "identifier": self.record_id,
                "identifierType": "id",
                "bundles": [{"name": self.field, "value": self.value, "replace": true}],
            },
        })
    }
}

/// Where entity identifiers are recorded.
#[async_trait]
pub trait ArchivalStore: Send + Sync {
    /// Replace the value of one field on one record.
    async fn record_external_identifier(&self, update: &IdentifierUpdate) -> Result<(), KbApiError>;
}

/// GraphQL client for the archival edit service.
#[derive(Debug, Clone)]
pub struct ArchivalClient {
    http: reqwest::Client,
    graphql_url: url::Url,
}

impl ArchivalClient {
    pub fn new(config: &ArchiveConfig) -> Result<Self, KbApiError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .default_headers({
                let mut headers = reqwest::header::HeaderMap::new();
                headers.insert(
                    reqwest::header::AUTHORIZATION,
                    reqwest::header::HeaderValue::from_str(&format!(
                        "Bearer {}",
                        config.token.as_str()
                    ))
                    .map_err(|_| {
                        KbApiError::Config(ConfigError::InvalidValue(
                            "ARCHIVE_TOKEN".to_string(),
                            "not a valid header value".to_string(),
                        ))
                    })?,
                );
                headers
            })
            .build()
            .map_err(|e| KbApiError::Http {
                endpoint: "client_init".into(),
                source: e,
            })?;
        Ok(Self {
            http,
            graphql_url: config.graphql_url.clone(),
        })
    }
}

#[async_trait]
impl ArchivalStore for ArchivalClient {
    async fn record_external_identifier(
        &self,
        update: &IdentifierUpdate,
    ) -> Result<(), KbApiError> {
        let endpoint = "archive edit";
        let resp = self
            .http
            .post(self.graphql_url.clone())
            .json(&update.to_request())
            .send()
            .await
            .map_err(|e| KbApiError::Http {
                endpoint: endpoint.into(),
                source: e,
            })?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(KbApiError::ApiError {
                endpoint: endpoint.into(),
                status: status.as_u16(),
                body,
            });
        }

        let body: Value = resp.json().await.map_err(|e| KbApiError::Deserialization {
            endpoint: endpoint.into(),
            source: e,
        })?;
        if let Some(message) = first_error(&body) {
            return Err(KbApiError::UnexpectedResponse {
                endpoint: endpoint.into(),
                reason: message,
            });
        }

        tracing::info!(
            table = %update.table,
            record = %update.record_id,
            field = %update.field,
            value = %update.value,
            "recorded identifier on archival record"
        );
        Ok(())
    }
}

/// First GraphQL-level or edit-level error message, if any.
fn first_error(body: &Value) -> Option<String> {
    let message = |e: &Value| {
        e.get("message")
            .and_then(Value::as_str)
            .unwrap_or("unknown error")
            .to_string()
    };
    body.get("errors")
        .and_then(Value::as_array)
        .and_then(|errs| errs.first())
        .map(message)
        .or_else(|| {
            body.pointer("/data/edit/errors")
                .and_then(Value::as_array)
                .and_then(|errs| errs.first())
                .map(message)
        })
}

/// Stand-in used when no archival endpoint is configured: logs the update.
#[derive(Debug, Clone, Default)]
pub struct LoggingArchive;

#[async_trait]
impl ArchivalStore for LoggingArchive {
    async fn record_external_identifier(
        &self,
        update: &IdentifierUpdate,
    ) -> Result<(), KbApiError> {
        tracing::warn!(
            table = %update.table,
            record = %update.record_id,
            field = %update.field,
            value = %update.value,
            "no archival endpoint configured, identifier not recorded"
        );
        Ok(())
    }
}
