//! Client for one knowledge-base instance's action API.
//!
//! Reads are `GET`s retried on transport failure. Writes are form `POST`s
//! carrying a CSRF token fetched once and cached until the server answers
//! `badtoken`; they are spaced by the site's write throttle and never
//! retried on transport failure.

use std::time::Duration;

use kbridge_core::{ItemId, PropertyId, RepositoryTarget};
use serde_json::Value;
use tokio::sync::Mutex;
use tokio::time::Instant;
use url::Url;

use crate::config::{ConfigError, SiteConfig};
use crate::error::KbApiError;
use crate::retry::retry_send;
use crate::wire::{item_id_from_title, WbEntity};

/// Connection to a single repository.
pub struct SiteClient {
    repository: RepositoryTarget,
    http: reqwest::Client,
    api_url: Url,
    csrf_token: Mutex<Option<String>>,
    put_throttle: Duration,
    last_write: Mutex<Option<Instant>>,
}

impl std::fmt::Debug for SiteClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SiteClient")
            .field("repository", &self.repository)
            .field("api_url", &self.api_url)
            .field("put_throttle", &self.put_throttle)
            .finish_non_exhaustive()
    }
}

impl SiteClient {
    /// Build a client from site settings.
    pub fn new(config: &SiteConfig, timeout_secs: u64) -> Result<Self, KbApiError> {
        let mut headers = reqwest::header::HeaderMap::new();
        if let Some(token) = &config.token {
            headers.insert(
                reqwest::header::AUTHORIZATION,
                reqwest::header::HeaderValue::from_str(&format!("Bearer {}", token.as_str()))
                    .map_err(|_| {
                        KbApiError::Config(ConfigError::InvalidValue(
                            format!("{} token", config.repository),
                            "not a valid header value".to_string(),
                        ))
                    })?,
            );
        }

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .default_headers(headers)
            .build()
            .map_err(|e| KbApiError::Http {
                endpoint: "client_init".into(),
                source: e,
            })?;

        Ok(Self {
            repository: config.repository,
            http,
            api_url: config.api_url.clone(),
            csrf_token: Mutex::new(None),
            put_throttle: Duration::from_secs(config.put_throttle_secs),
            last_write: Mutex::new(None),
        })
    }

    /// Repository this client talks to.
    pub fn repository(&self) -> RepositoryTarget {
        self.repository
    }

    /// Fetch an item's terms. `Ok(None)` when the item does not exist.
    pub async fn get_entity(&self, id: &ItemId) -> Result<Option<WbEntity>, KbApiError> {
        let endpoint = "wbgetentities";
        let body = self
            .read(
                endpoint,
                &[
                    ("action", "wbgetentities"),
                    ("ids", id.as_str()),
                    ("props", "labels|descriptions|aliases"),
                ],
            )
            .await?;
        let entity = Self::entity_from(endpoint, body, id.as_str())?;
        Ok((!entity.is_missing()).then_some(entity))
    }

    /// Datatype of a property, e.g. `wikibase-item` or `time`.
    pub async fn property_datatype(&self, property: &PropertyId) -> Result<String, KbApiError> {
        let endpoint = "wbgetentities";
        let body = self
            .read(
                endpoint,
                &[
                    ("action", "wbgetentities"),
                    ("ids", property.as_str()),
                    ("props", "datatype"),
                ],
            )
            .await?;
        let entity = Self::entity_from(endpoint, body, property.as_str())?;
        if entity.is_missing() {
            return Err(KbApiError::NotFound {
                repository: self.repository,
                id: property.to_string(),
            });
        }
        entity.datatype.ok_or_else(|| KbApiError::UnexpectedResponse {
            endpoint: endpoint.into(),
            reason: format!("{property} has no datatype"),
        })
    }

    /// First item carrying `property = value`, via the statement search index.
    pub async fn search_by_statement(
        &self,
        property: &PropertyId,
        value: &str,
    ) -> Result<Option<ItemId>, KbApiError> {
        let endpoint = "search";
        let query = format!("haswbstatement:{property}={value}");
        let body = self
            .read(
                endpoint,
                &[
                    ("action", "query"),
                    ("list", "search"),
                    ("srsearch", query.as_str()),
                    ("srnamespace", "*"),
                    ("srlimit", "1"),
                ],
            )
            .await?;
        Ok(body
            .pointer("/query/search")
            .and_then(Value::as_array)
            .and_then(|hits| hits.first())
            .and_then(|hit| hit.get("title"))
            .and_then(Value::as_str)
            .and_then(item_id_from_title))
    }

    /// Create an item from a `wbeditentity` data payload.
    pub async fn create_item(&self, data: &Value) -> Result<WbEntity, KbApiError> {
        let endpoint = "wbeditentity";
        let data = data.to_string();
        let body = self
            .write(
                endpoint,
                &[("action", "wbeditentity"), ("new", "item"), ("data", data.as_str())],
            )
            .await?;
        let entity = body
            .get("entity")
            .cloned()
            .ok_or_else(|| KbApiError::UnexpectedResponse {
                endpoint: endpoint.into(),
                reason: "no entity in response".into(),
            })?;
        serde_json::from_value::<WbEntity>(entity)
            .ok()
            .filter(|e| e.id.is_some())
            .ok_or_else(|| KbApiError::UnexpectedResponse {
                endpoint: endpoint.into(),
                reason: "created entity has no id".into(),
            })
    }

    /// Add a value claim to `entity`. Returns the new statement id.
    pub async fn create_claim(
        &self,
        entity: &ItemId,
        property: &PropertyId,
        datavalue: &Value,
    ) -> Result<String, KbApiError> {
        let endpoint = "wbcreateclaim";
        let value = datavalue.to_string();
        let body = self
            .write(
                endpoint,
                &[
                    ("action", "wbcreateclaim"),
                    ("entity", entity.as_str()),
                    ("property", property.as_str()),
                    ("snaktype", "value"),
                    ("value", value.as_str()),
                ],
            )
            .await?;
        body.pointer("/claim/id")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| KbApiError::UnexpectedResponse {
                endpoint: endpoint.into(),
                reason: "no claim id in response".into(),
            })
    }

    // -- Transport ------------------------------------------------------------

    async fn read(&self, endpoint: &str, params: &[(&str, &str)]) -> Result<Value, KbApiError> {
        let resp = retry_send(|| {
            self.http
                .get(self.api_url.clone())
                .query(&[("format", "json")])
                .query(params)
                .send()
        })
        .await
        .map_err(|e| KbApiError::Http {
            endpoint: endpoint.into(),
            source: e,
        })?;
        Self::parse(endpoint, resp).await
    }

    async fn write(&self, endpoint: &str, params: &[(&str, &str)]) -> Result<Value, KbApiError> {
        match self.write_once(endpoint, params).await {
            Err(KbApiError::Wikibase { code, .. }) if code == "badtoken" => {
                tracing::info!(repository = %self.repository, "CSRF token rejected, refreshing");
                *self.csrf_token.lock().await = None;
                self.write_once(endpoint, params).await
            }
            other => other,
        }
    }

    async fn write_once(
        &self,
        endpoint: &str,
        params: &[(&str, &str)],
    ) -> Result<Value, KbApiError> {
        let token = self.csrf_token().await?;
        self.throttle().await;

        let mut form: Vec<(&str, &str)> = params.to_vec();
        form.push(("format", "json"));
        form.push(("token", token.as_str()));

        let resp = self
            .http
            .post(self.api_url.clone())
            .form(&form)
            .send()
            .await
            .map_err(|e| KbApiError::Http {
                endpoint: endpoint.into(),
                source: e,
            })?;
        Self::parse(endpoint, resp).await
    }

    async fn csrf_token(&self) -> Result<String, KbApiError> {
        let mut cached = self.csrf_token.lock().await;
        if let Some(token) = cached.as_ref() {
            return Ok(token.clone());
        }
        let endpoint = "tokens";
        let body = self
            .read(
                endpoint,
                &[("action", "query"), ("meta", "tokens"), ("type", "csrf")],
            )
            .await?;
        let token = body
            .pointer("/query/tokens/csrftoken")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| KbApiError::UnexpectedResponse {
                endpoint: endpoint.into(),
                reason: "no csrftoken in response".into(),
            })?;
        *cached = Some(token.clone());
        Ok(token)
    }

    /// Wait until at least `put_throttle` has passed since the previous write.
    async fn throttle(&self) {
        let mut last = self.last_write.lock().await;
        if let Some(previous) = *last {
            let elapsed = previous.elapsed();
            if elapsed < self.put_throttle {
                let wait = self.put_throttle - elapsed;
                tracing::debug!(repository = %self.repository, ?wait, "throttling write");
                tokio::time::sleep(wait).await;
            }
        }
        *last = Some(Instant::now());
    }

    async fn parse(endpoint: &str, resp: reqwest::Response) -> Result<Value, KbApiError> {
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
        if let Some(error) = body.get("error") {
            let field = |name: &str| {
                error
                    .get(name)
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string()
            };
            return Err(KbApiError::Wikibase {
                endpoint: endpoint.into(),
                code: field("code"),
                info: field("info"),
            });
        }
        Ok(body)
    }

    fn entity_from(endpoint: &str, body: Value, id: &str) -> Result<WbEntity, KbApiError> {
        let raw = body
            .get("entities")
            .and_then(|entities| entities.get(id))
            .cloned()
            .ok_or_else(|| KbApiError::UnexpectedResponse {
                endpoint: endpoint.into(),
                reason: format!("{id} absent from entities"),
            })?;
        serde_json::from_value(raw).map_err(|e| KbApiError::UnexpectedResponse {
            endpoint: endpoint.into(),
            reason: e.to_string(),
        })
    }
}
