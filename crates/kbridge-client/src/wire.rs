//! Action API wire shapes.
//!
//! Entities come back from `wbgetentities` with terms wrapped as
//! `{"language": .., "value": ..}` objects. Empty term sections may be
//! serialized as `[]` instead of `{}`; [`map_or_empty`] accepts both.
//! Outgoing datavalues and `wbeditentity` payloads are built here too.

use std::collections::BTreeMap;

use kbridge_core::{
    AliasMap, CalendarPoint, ClaimValue, EntityTerms, ItemId, PropertyId, TermMap,
    ValidationError, DATA_TYPE_ITEM, DATA_TYPE_TIME,
};
use serde::{Deserialize, Deserializer};
use serde_json::{json, Value};

/// Proleptic Gregorian calendar item in the public repository.
pub const GREGORIAN_CALENDAR: &str = "Q1985727";

/// A language-tagged term.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct WbTerm {
    pub language: String,
    pub value: String,
}

/// One entry of `wbgetentities.entities`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct WbEntity {
    #[serde(default)]
    pub id: Option<String>,
    /// Present (as `""`) when the entity does not exist.
    #[serde(default)]
    pub missing: Option<String>,
    #[serde(default, deserialize_with = "map_or_empty")]
    pub labels: BTreeMap<String, WbTerm>,
    #[serde(default, deserialize_with = "map_or_empty")]
    pub descriptions: BTreeMap<String, WbTerm>,
    #[serde(default, deserialize_with = "map_or_empty")]
    pub aliases: BTreeMap<String, Vec<WbTerm>>,
    /// Set on property entities only.
    #[serde(default)]
    pub datatype: Option<String>,
}

impl WbEntity {
    pub fn is_missing(&self) -> bool {
        self.missing.is_some()
    }

    pub fn label(&self, language: &str) -> Option<&str> {
        self.labels.get(language).map(|t| t.value.as_str())
    }

    /// Strip the term wrappers. Fails when the primary label is absent.
    pub fn to_terms(&self) -> Result<EntityTerms, ValidationError> {
        let labels: TermMap = self
            .labels
            .iter()
            .map(|(lang, t)| (lang.clone(), t.value.clone()))
            .collect();
        let descriptions: TermMap = self
            .descriptions
            .iter()
            .map(|(lang, t)| (lang.clone(), t.value.clone()))
            .collect();
        let aliases: AliasMap = self
            .aliases
            .iter()
            .map(|(lang, ts)| (lang.clone(), ts.iter().map(|t| t.value.clone()).collect()))
            .collect();
        EntityTerms::new(
            labels,
            (!descriptions.is_empty()).then_some(descriptions),
            (!aliases.is_empty()).then_some(aliases),
        )
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum MapOrList<T> {
    Map(BTreeMap<String, T>),
    List(Vec<serde::de::IgnoredAny>),
}

fn map_or_empty<'de, D, T>(deserializer: D) -> Result<BTreeMap<String, T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(match MapOrList::deserialize(deserializer)? {
        MapOrList::Map(m) => m,
        MapOrList::List(_) => BTreeMap::new(),
    })
}

/// The item id at the end of a search hit title (`Item:Q5` or `Q5`).
pub fn item_id_from_title(title: &str) -> Option<ItemId> {
    let local = title.rsplit(':').next().unwrap_or(title);
    ItemId::new(local).ok()
}

// -- Outgoing payloads --------------------------------------------------------

/// Datatype tag a property must carry to accept `value`.
pub fn datatype_of(value: &ClaimValue) -> &'static str {
    match value {
        ClaimValue::Item(_) => DATA_TYPE_ITEM,
        ClaimValue::Time(_) => DATA_TYPE_TIME,
    }
}

/// `value` argument of `wbcreateclaim` for a resolved claim value.
pub fn claim_datavalue(value: &ClaimValue, concept_base_uri: &str) -> Value {
    match value {
        ClaimValue::Item(handle) => item_datavalue(&handle.id),
        ClaimValue::Time(point) => time_datavalue(point, concept_base_uri),
    }
}

pub fn item_datavalue(id: &ItemId) -> Value {
    json!({
        "entity-type": "item",
        "numeric-id": id.numeric_id(),
        "id": id.as_str(),
    })
}

pub fn time_datavalue(point: &CalendarPoint, concept_base_uri: &str) -> Value {
    json!({
        "time": point.to_timestamp(),
        "timezone": 0,
        "before": 0,
        "after": 0,
        "precision": point.precision().code(),
        "calendarmodel": format!("{concept_base_uri}{GREGORIAN_CALENDAR}"),
    })
}

/// `data` argument of `wbeditentity` creating an item with `terms` and,
/// optionally, one string statement (the federation link).
pub fn new_item_data(terms: &EntityTerms, link: Option<(&PropertyId, &str)>) -> Value {
    let wrap = |map: &TermMap| -> Value {
        map.iter()
            .map(|(lang, text)| (lang.clone(), json!({"language": lang, "value": text})))
            .collect::<serde_json::Map<_, _>>()
            .into()
    };

    let mut data = serde_json::Map::new();
    data.insert("labels".into(), wrap(terms.labels()));
    if let Some(descriptions) = terms.descriptions() {
        data.insert("descriptions".into(), wrap(descriptions));
    }
    if let Some(aliases) = terms.aliases() {
        let wrapped: serde_json::Map<_, _> = aliases
            .iter()
            .map(|(lang, list)| {
                let entries: Vec<Value> = list
                    .iter()
                    .map(|text| json!({"language": lang, "value": text}))
                    .collect();
                (lang.clone(), Value::Array(entries))
            })
            .collect();
        data.insert("aliases".into(), wrapped.into());
    }
    if let Some((property, value)) = link {
        data.insert(
            "claims".into(),
            json!([{
                "mainsnak": {
                    "snaktype": "value",
                    "property": property.as_str(),
                    "datavalue": {"value": value, "type": "string"},
                },
                "type": "statement",
                "rank": "normal",
            }]),
        );
    }
    Value::Object(data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use kbridge_core::{EntityHandle, RepositoryTarget};

    #[test]
    fn entity_with_empty_list_sections_parses() {
        let e: WbEntity = serde_json::from_value(json!({
            "id": "Q5",
            "labels": {"en": {"language": "en", "value": "human"}},
            "descriptions": [],
            "aliases": []
        }))
        .unwrap();
        assert!(!e.is_missing());
        assert_eq!(e.label("en"), Some("human"));
        let terms = e.to_terms().unwrap();
        assert!(terms.descriptions().is_none());
        assert!(terms.aliases().is_none());
    }

    #[test]
    fn missing_entity_is_flagged() {
        let e: WbEntity = serde_json::from_value(json!({"id": "Q404", "missing": ""})).unwrap();
        assert!(e.is_missing());
    }

    #[test]
    fn to_terms_requires_english_label() {
        let e: WbEntity = serde_json::from_value(json!({
            "labels": {"de": {"language": "de", "value": "Mensch"}}
        }))
        .unwrap();
        assert!(e.to_terms().is_err());
    }

    #[test]
    fn title_parsing_handles_namespaces() {
        assert_eq!(item_id_from_title("Item:Q42").unwrap().as_str(), "Q42");
        assert_eq!(item_id_from_title("Q7").unwrap().as_str(), "Q7");
        assert!(item_id_from_title("Property:P1").is_none());
    }

    #[test]
    fn year_time_datavalue() {
        let v = time_datavalue(
            &CalendarPoint::year(2010),
            "http://www.wikidata.org/entity/",
        );
        assert_eq!(v["time"], "+2010-00-00T00:00:00Z");
        assert_eq!(v["precision"], 9);
        assert_eq!(
            v["calendarmodel"],
            "http://www.wikidata.org/entity/Q1985727"
        );
    }

    #[test]
    fn item_datavalue_carries_numeric_id() {
        let handle = EntityHandle::new(ItemId::new("Q42").unwrap(), RepositoryTarget::Public);
        let v = claim_datavalue(&ClaimValue::Item(handle), "unused");
        assert_eq!(v, json!({"entity-type": "item", "numeric-id": 42, "id": "Q42"}));
    }

    #[test]
    fn new_item_data_wraps_terms_and_link() {
        let e: WbEntity = serde_json::from_value(json!({
            "labels": {"en": {"language": "en", "value": "human"}},
            "aliases": {"en": [{"language": "en", "value": "person"}]}
        }))
        .unwrap();
        let terms = e.to_terms().unwrap();
        let link = PropertyId::new("P1").unwrap();
        let data = new_item_data(&terms, Some((&link, "Q5")));
        assert_eq!(data["labels"]["en"]["value"], "human");
        assert_eq!(data["aliases"]["en"][0]["value"], "person");
        assert!(data.get("descriptions").is_none());
        assert_eq!(data["claims"][0]["mainsnak"]["property"], "P1");
        assert_eq!(data["claims"][0]["mainsnak"]["datavalue"]["value"], "Q5");
    }
}
