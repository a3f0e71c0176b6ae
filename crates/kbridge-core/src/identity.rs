//! # Identifier Newtypes
//!
//! Item and property identifiers as used by both knowledge-base instances,
//! plus the [`RepositoryTarget`] that says which instance an identifier
//! lives in. An [`ItemId`] alone does not say which repository it belongs
//! to: `Q5` in the public repository and `Q5` in the federated one are
//! different entities.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// `true` when `s` is `prefix` followed by one or more ASCII digits.
fn is_prefixed_number(s: &str, prefix: char) -> bool {
    let mut chars = s.chars();
    chars.next() == Some(prefix) && {
        let digits = chars.as_str();
        !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit())
    }
}

// ---------------------------------------------------------------------------
// Item identifiers
// ---------------------------------------------------------------------------

/// Identifier of an item entity (`Q<digits>`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ItemId(String);

impl ItemId {
    /// Create an item identifier, validating the `Q<digits>` format.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidItemId`] for anything else,
    /// including numbers that do not fit in a `u64`.
    pub fn new(value: impl Into<String>) -> Result<Self, ValidationError> {
        let s = value.into();
        if !is_prefixed_number(&s, 'Q') || s[1..].parse::<u64>().is_err() {
            return Err(ValidationError::InvalidItemId(s));
        }
        Ok(Self(s))
    }

    /// Build an identifier from its numeric part.
    pub fn from_number(n: u64) -> Self {
        Self(format!("Q{n}"))
    }

    /// Access the identifier string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The numeric part, as used by the `numeric-id` field of item datavalues.
    pub fn numeric_id(&self) -> u64 {
        // `new` and `from_number` only admit values that parse.
        self.0[1..].parse().unwrap_or_default()
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for ItemId {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<ItemId> for String {
    fn from(id: ItemId) -> Self {
        id.0
    }
}

// ---------------------------------------------------------------------------
// Property identifiers
// ---------------------------------------------------------------------------

/// Identifier of a property entity (`P<digits>`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PropertyId(String);

impl PropertyId {
    /// Create a property identifier, validating the `P<digits>` format.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidPropertyId`] for anything else.
    pub fn new(value: impl Into<String>) -> Result<Self, ValidationError> {
        let s = value.into();
        if !is_prefixed_number(&s, 'P') {
            return Err(ValidationError::InvalidPropertyId(s));
        }
        Ok(Self(s))
    }

    /// Access the identifier string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PropertyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for PropertyId {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<PropertyId> for String {
    fn from(id: PropertyId) -> Self {
        id.0
    }
}

// ---------------------------------------------------------------------------
// Repository target
// ---------------------------------------------------------------------------

/// Which knowledge-base instance an entity lives in or is being created in.
///
/// On the wire the public repository is `"wikidata"` and the federated one
/// is `"local"`; `"public"` and `"federated"` are accepted as aliases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum RepositoryTarget {
    /// The shared public repository.
    Public,
    /// The private federated instance.
    Federated,
}

impl RepositoryTarget {
    /// Canonical wire name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Public => "wikidata",
            Self::Federated => "local",
        }
    }
}

impl fmt::Display for RepositoryTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RepositoryTarget {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "wikidata" | "public" => Ok(Self::Public),
            "local" | "federated" => Ok(Self::Federated),
            other => Err(ValidationError::UnknownRepository(other.to_string())),
        }
    }
}

impl TryFrom<String> for RepositoryTarget {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<RepositoryTarget> for String {
    fn from(target: RepositoryTarget) -> Self {
        target.as_str().to_string()
    }
}
