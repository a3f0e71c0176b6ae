//! # Entity Payloads and Statements
//!
//! The client-supplied [`EntityDescription`], the validated
//! [`EntityTerms`] sent when creating an entity, and the decoding of each
//! [`StatementRecord`] into a closed [`StatementValue`].
//!
//! Also defines [`EntityHandle`] and [`ClaimValue`], the resolved forms the
//! claim builder consumes.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::identity::{ItemId, RepositoryTarget};
use crate::temporal::CalendarPoint;

/// Language whose label is mandatory and names the entity in messages.
pub const PRIMARY_LANGUAGE: &str = "en";

/// Language code → text.
pub type TermMap = BTreeMap<String, String>;

/// Language code → ordered aliases.
pub type AliasMap = BTreeMap<String, Vec<String>>;

/// Data type tag for item-reference statements.
pub const DATA_TYPE_ITEM: &str = "wikibase-item";

/// Data type tag for point-in-time statements.
pub const DATA_TYPE_TIME: &str = "time";

// -- Client payload -----------------------------------------------------------

/// Generic description of an entity as sent by the client.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EntityDescription {
    /// Labels by language. Must contain [`PRIMARY_LANGUAGE`].
    #[serde(default)]
    pub labels: TermMap,
    /// Optional descriptions by language.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub descriptions: Option<TermMap>,
    /// Optional aliases by language.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aliases: Option<AliasMap>,
    /// Statements to attach once the entity exists, in order.
    #[serde(default)]
    pub statements: Vec<StatementRecord>,
}

impl EntityDescription {
    /// The label in [`PRIMARY_LANGUAGE`], if present.
    pub fn primary_label(&self) -> Option<&str> {
        self.labels.get(PRIMARY_LANGUAGE).map(String::as_str)
    }
}

/// Labels, descriptions and aliases of an entity about to be created.
///
/// Only obtainable through [`EntityTerms::from_description`] (or
/// [`EntityTerms::new`]), which guarantees the primary label is present.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EntityTerms {
    labels: TermMap,
    #[serde(skip_serializing_if = "Option::is_none")]
    descriptions: Option<TermMap>,
    #[serde(skip_serializing_if = "Option::is_none")]
    aliases: Option<AliasMap>,
}

impl EntityTerms {
    /// Build terms from explicit maps.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::MissingPrimaryLabel`] when `labels` has no
    /// [`PRIMARY_LANGUAGE`] entry.
    pub fn new(
        labels: TermMap,
        descriptions: Option<TermMap>,
        aliases: Option<AliasMap>,
    ) -> Result<Self, ValidationError> {
        if !labels.contains_key(PRIMARY_LANGUAGE) {
            return Err(ValidationError::MissingPrimaryLabel(PRIMARY_LANGUAGE.to_string()));
        }
        Ok(Self {
            labels,
            descriptions,
            aliases,
        })
    }

    /// Extract the terms of a client description. Statements are not part
    /// of entity creation.
    ///
    /// # Errors
    ///
    /// Same as [`EntityTerms::new`].
    pub fn from_description(description: &EntityDescription) -> Result<Self, ValidationError> {
        Self::new(
            description.labels.clone(),
            description.descriptions.clone(),
            description.aliases.clone(),
        )
    }

    /// Labels by language.
    pub fn labels(&self) -> &TermMap {
        &self.labels
    }

    /// Descriptions by language, if any were given.
    pub fn descriptions(&self) -> Option<&TermMap> {
        self.descriptions.as_ref()
    }

    /// Aliases by language, if any were given.
    pub fn aliases(&self) -> Option<&AliasMap> {
        self.aliases.as_ref()
    }

    /// The mandatory primary label.
    pub fn primary_label(&self) -> &str {
        self.labels
            .get(PRIMARY_LANGUAGE)
            .map(String::as_str)
            .unwrap_or_default()
    }
}

// -- Statements ---------------------------------------------------------------

/// One statement as sent by the client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatementRecord {
    /// Property identifier of the claim's predicate (validated later).
    pub property: String,
    /// Tag selecting how `data_value` is interpreted.
    pub data_type: String,
    /// Value payload; its shape depends on `data_type`.
    #[serde(default)]
    pub data_value: serde_json::Value,
}

/// A statement's value after decoding its `data_type`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatementValue {
    /// Reference to an item, by its public-repository identifier.
    ItemReference(ItemId),
    /// Raw, not yet normalized time text.
    Time(String),
    /// Any other data type; carries the tag.
    Unsupported(String),
}

impl StatementRecord {
    /// Decode `data_value` according to `data_type`.
    ///
    /// - `wikibase-item` reads `data_value.value.id`;
    /// - `time` reads `data_value.value` as text;
    /// - any other tag is [`StatementValue::Unsupported`] without looking
    ///   at `data_value`.
    ///
    /// # Errors
    ///
    /// [`ValidationError::MalformedStatement`] when the expected field is
    /// absent or not a string, [`ValidationError::InvalidItemId`] when the
    /// referenced id is malformed.
    pub fn decode(&self) -> Result<StatementValue, ValidationError> {
        match self.data_type.as_str() {
            DATA_TYPE_ITEM => {
                let id = self
                    .data_value
                    .pointer("/value/id")
                    .and_then(serde_json::Value::as_str)
                    .ok_or_else(|| self.malformed("expected data_value.value.id to be a string"))?;
                Ok(StatementValue::ItemReference(ItemId::new(id)?))
            }
            DATA_TYPE_TIME => {
                let raw = self
                    .data_value
                    .get("value")
                    .and_then(serde_json::Value::as_str)
                    .ok_or_else(|| self.malformed("expected data_value.value to be a string"))?;
                Ok(StatementValue::Time(raw.to_string()))
            }
            other => Ok(StatementValue::Unsupported(other.to_string())),
        }
    }

    fn malformed(&self, reason: &str) -> ValidationError {
        ValidationError::MalformedStatement {
            property: self.property.clone(),
            data_type: self.data_type.clone(),
            reason: reason.to_string(),
        }
    }
}

// -- Resolved values ----------------------------------------------------------

/// Reference to an entity that exists (or is assumed to exist) in a
/// specific repository.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntityHandle {
    /// Identifier within `repository`.
    pub id: ItemId,
    /// Repository the identifier belongs to.
    pub repository: RepositoryTarget,
    /// Primary label, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

impl EntityHandle {
    /// A handle with no known label.
    pub fn new(id: ItemId, repository: RepositoryTarget) -> Self {
        Self {
            id,
            repository,
            label: None,
        }
    }

    /// Attach a label.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }
}

/// A fully resolved claim value, ready for submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClaimValue {
    /// An existing entity.
    Item(EntityHandle),
    /// A normalized calendar point.
    Time(CalendarPoint),
}

impl fmt::Display for ClaimValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Item(handle) => write!(f, "{}", handle.id),
            Self::Time(point) => write!(f, "{point}"),
        }
    }
}
