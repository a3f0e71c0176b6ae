//! Knowledge-base and archival client configuration.
//!
//! One [`SiteConfig`] per repository plus the federation settings. Defaults
//! point the public site at the production action API; the federated site
//! has no sensible default and must be configured. Override via environment
//! variables or explicit construction for staging/testing.

use kbridge_core::{PropertyId, RepositoryTarget};
use url::Url;
use zeroize::Zeroizing;

/// Connection settings for one knowledge-base instance.
///
/// Custom `Debug` implementation redacts the `token` field.
#[derive(Clone)]
pub struct SiteConfig {
    /// Which repository this site is.
    pub repository: RepositoryTarget,
    /// Full URL of the action API endpoint (`…/w/api.php`).
    pub api_url: Url,
    /// OAuth 2 bearer token for write access. `None` means read-only.
    pub token: Option<Zeroizing<String>>,
    /// Minimum delay between two write calls, in seconds.
    pub put_throttle_secs: u64,
}

impl std::fmt::Debug for SiteConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SiteConfig")
            .field("repository", &self.repository)
            .field("api_url", &self.api_url)
            .field("token", &self.token.as_ref().map(|_| "[REDACTED]"))
            .field("put_throttle_secs", &self.put_throttle_secs)
            .finish()
    }
}

/// Configuration for the public/federated repository pair.
#[derive(Debug, Clone)]
pub struct KbApiConfig {
    /// The public repository.
    pub public: SiteConfig,
    /// The federated repository.
    pub federated: SiteConfig,
    /// Federated property holding the public identifier of an imported item.
    pub federation_link_property: PropertyId,
    /// Concept URI prefix of the public repository, used for calendar models.
    /// Default: <http://www.wikidata.org/entity/>
    pub concept_base_uri: Url,
    /// Per-call HTTP timeout in seconds.
    pub timeout_secs: u64,
}

impl KbApiConfig {
    /// Load configuration from environment variables.
    ///
    /// Variables:
    /// - `KB_PUBLIC_API_URL` (default: `https://www.wikidata.org/w/api.php`)
    /// - `KB_PUBLIC_TOKEN` (optional)
    /// - `KB_PUBLIC_PUT_THROTTLE_SECS` (default: 0)
    /// - `KB_FEDERATED_API_URL` (required)
    /// - `KB_FEDERATED_TOKEN` (optional)
    /// - `KB_FEDERATED_PUT_THROTTLE_SECS` (default: 2)
    /// - `KB_FEDERATED_LINK_PROPERTY` (required)
    /// - `KB_CONCEPT_BASE_URI` (default: `http://www.wikidata.org/entity/`)
    /// - `KB_TIMEOUT_SECS` (default: 30)
    pub fn from_env() -> Result<Self, ConfigError> {
        let federated_url = std::env::var("KB_FEDERATED_API_URL")
            .map_err(|_| ConfigError::MissingVar("KB_FEDERATED_API_URL".to_string()))?;
        let link_property = std::env::var("KB_FEDERATED_LINK_PROPERTY")
            .map_err(|_| ConfigError::MissingVar("KB_FEDERATED_LINK_PROPERTY".to_string()))?;

        Ok(Self {
            public: SiteConfig {
                repository: RepositoryTarget::Public,
                api_url: env_url("KB_PUBLIC_API_URL", "https://www.wikidata.org/w/api.php")?,
                token: env_token("KB_PUBLIC_TOKEN"),
                put_throttle_secs: env_u64("KB_PUBLIC_PUT_THROTTLE_SECS", 0),
            },
            federated: SiteConfig {
                repository: RepositoryTarget::Federated,
                api_url: parse_url("KB_FEDERATED_API_URL", &federated_url)?,
                token: env_token("KB_FEDERATED_TOKEN"),
                put_throttle_secs: env_u64("KB_FEDERATED_PUT_THROTTLE_SECS", 2),
            },
            federation_link_property: PropertyId::new(link_property).map_err(|e| {
                ConfigError::InvalidValue("KB_FEDERATED_LINK_PROPERTY".to_string(), e.to_string())
            })?,
            concept_base_uri: env_url("KB_CONCEPT_BASE_URI", "http://www.wikidata.org/entity/")?,
            timeout_secs: env_u64("KB_TIMEOUT_SECS", 30),
        })
    }

    /// Create a configuration pointing both sites at local mock servers.
    ///
    /// Throttling is disabled so tests do not sleep.
    pub fn local_mock(public_base: &str, federated_base: &str) -> Result<Self, ConfigError> {
        let api = |var: &str, base: &str| {
            parse_url(var, &format!("{}/w/api.php", base.trim_end_matches('/')))
        };
        Ok(Self {
            public: SiteConfig {
                repository: RepositoryTarget::Public,
                api_url: api("public", public_base)?,
                token: Some(Zeroizing::new("public-token".to_string())),
                put_throttle_secs: 0,
            },
            federated: SiteConfig {
                repository: RepositoryTarget::Federated,
                api_url: api("federated", federated_base)?,
                token: Some(Zeroizing::new("federated-token".to_string())),
                put_throttle_secs: 0,
            },
            federation_link_property: PropertyId::new("P1")
                .map_err(|e| ConfigError::InvalidValue("link property".into(), e.to_string()))?,
            concept_base_uri: parse_url("concept", "http://www.wikidata.org/entity/")?,
            timeout_secs: 5,
        })
    }

    /// Settings for the given repository.
    pub fn site(&self, repository: RepositoryTarget) -> &SiteConfig {
        match repository {
            RepositoryTarget::Public => &self.public,
            RepositoryTarget::Federated => &self.federated,
        }
    }
}

/// Connection settings for the archival record system's GraphQL endpoint.
#[derive(Clone)]
pub struct ArchiveConfig {
    /// GraphQL edit endpoint.
    pub graphql_url: Url,
    /// Bearer token for the archival service.
    pub token: Zeroizing<String>,
    /// Per-call HTTP timeout in seconds.
    pub timeout_secs: u64,
}

impl std::fmt::Debug for ArchiveConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArchiveConfig")
            .field("graphql_url", &self.graphql_url)
            .field("token", &"[REDACTED]")
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl ArchiveConfig {
    /// Load from `ARCHIVE_GRAPHQL_URL` and `ARCHIVE_TOKEN` (both required)
    /// and `KB_TIMEOUT_SECS` (default: 30).
    pub fn from_env() -> Result<Self, ConfigError> {
        let raw = std::env::var("ARCHIVE_GRAPHQL_URL")
            .map_err(|_| ConfigError::MissingVar("ARCHIVE_GRAPHQL_URL".to_string()))?;
        let token = std::env::var("ARCHIVE_TOKEN")
            .map_err(|_| ConfigError::MissingVar("ARCHIVE_TOKEN".to_string()))?;
        Ok(Self {
            graphql_url: parse_url("ARCHIVE_GRAPHQL_URL", &raw)?,
            token: Zeroizing::new(token),
            timeout_secs: env_u64("KB_TIMEOUT_SECS", 30),
        })
    }
}

fn parse_url(var: &str, raw: &str) -> Result<Url, ConfigError> {
    Url::parse(raw).map_err(|e| ConfigError::InvalidUrl(var.to_string(), e.to_string()))
}

fn env_url(var: &str, default: &str) -> Result<Url, ConfigError> {
    let raw = std::env::var(var).unwrap_or_else(|_| default.to_string());
    parse_url(var, &raw)
}

fn env_token(var: &str) -> Option<Zeroizing<String>> {
    std::env::var(var)
        .ok()
        .filter(|t| !t.is_empty())
        .map(Zeroizing::new)
}

fn env_u64(var: &str, default: u64) -> u64 {
    std::env::var(var)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} environment variable is required")]
    MissingVar(String),
    #[error("invalid URL for {0}: {1}")]
    InvalidUrl(String, String),
    #[error("invalid value for {0}: {1}")]
    InvalidValue(String, String),
}
