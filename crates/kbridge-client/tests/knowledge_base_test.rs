//! Contract tests for HttpKnowledgeBase against the knowledge-base action API.
//!
//! Two wiremock servers stand in for the public and the federated
//! repository. Every request is a call to `/w/api.php`; the `action`
//! parameter selects the operation.
//!
//! ## Operations Tested
//!
//! | Method | Action | Test |
//! |--------|--------|------|
//! | GET    | `query&meta=tokens` | every write test |
//! | GET    | `query&list=search` | `import_*` |
//! | GET    | `wbgetentities` | `import_*`, `resolve_*`, `submit_claim_*` |
//! | POST   | `wbeditentity` | `import_*`, `create_entity_*` |
//! | POST   | `wbcreateclaim` | `submit_claim_*` |

use kbridge_client::{HttpKnowledgeBase, KbApiConfig, KbApiError, KnowledgeBase};
use kbridge_core::{
    CalendarPoint, ClaimValue, EntityHandle, EntityTerms, ItemId, PropertyId, RepositoryTarget,
    TermMap,
};
use serde_json::json;
use wiremock::matchers::{body_string_contains, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const API: &str = "/w/api.php";

fn kb(public: &MockServer, federated: &MockServer) -> HttpKnowledgeBase {
    let config = KbApiConfig::local_mock(&public.uri(), &federated.uri()).unwrap();
    HttpKnowledgeBase::new(&config).unwrap()
}

fn q(id: &str) -> ItemId {
    ItemId::new(id).unwrap()
}

fn p(id: &str) -> PropertyId {
    PropertyId::new(id).unwrap()
}

fn terms(label: &str) -> EntityTerms {
    let mut labels = TermMap::new();
    labels.insert("en".into(), label.into());
    EntityTerms::new(labels, None, None).unwrap()
}

async fn mount_token(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path(API))
        .and(query_param("meta", "tokens"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "batchcomplete": "",
            "query": {"tokens": {"csrftoken": "abc123+\\"}}
        })))
        .mount(server)
        .await;
}

async fn mount_entity(server: &MockServer, id: &str, body: serde_json::Value) {
    let mut entities = serde_json::Map::new();
    entities.insert(id.to_string(), body);
    Mock::given(method("GET"))
        .and(path(API))
        .and(query_param("action", "wbgetentities"))
        .and(query_param("ids", id))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "entities": entities,
            "success": 1
        })))
        .mount(server)
        .await;
}

async fn mount_search(server: &MockServer, hits: serde_json::Value) {
    Mock::given(method("GET"))
        .and(path(API))
        .and(query_param("list", "search"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "batchcomplete": "",
            "query": {"searchinfo": {"totalhits": 0}, "search": hits}
        })))
        .mount(server)
        .await;
}

/// Form fields of the last POST received by `server`.
async fn last_form(server: &MockServer) -> Vec<(String, String)> {
    let requests = server.received_requests().await.unwrap();
    let post = requests
        .iter()
        .rev()
        .find(|r| r.method.as_str() == "POST")
        .expect("a POST was received");
    url::form_urlencoded::parse(&post.body)
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect()
}

fn field<'a>(form: &'a [(String, String)], name: &str) -> &'a str {
    form.iter()
        .find(|(k, _)| k == name)
        .map(|(_, v)| v.as_str())
        .unwrap_or_default()
}

// ── Federation import ────────────────────────────────────────────────

#[tokio::test]
async fn import_creates_federated_item_with_link_statement() {
    let public = MockServer::start().await;
    let federated = MockServer::start().await;

    mount_search(&federated, json!([])).await;
    mount_entity(
        &public,
        "Q5",
        json!({
            "id": "Q5",
            "type": "item",
            "labels": {"en": {"language": "en", "value": "human"}},
            "descriptions": {"en": {"language": "en", "value": "common name of Homo sapiens"}},
            "aliases": []
        }),
    )
    .await;
    mount_token(&federated).await;
    Mock::given(method("POST"))
        .and(path(API))
        .and(body_string_contains("action=wbeditentity"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "entity": {
                "id": "Q12",
                "type": "item",
                "labels": {"en": {"language": "en", "value": "human"}}
            },
            "success": 1
        })))
        .expect(1)
        .mount(&federated)
        .await;

    let imported = kb(&public, &federated)
        .import_entity(&q("Q5"))
        .await
        .unwrap();
    assert!(imported.created);
    assert_eq!(imported.handle.id.as_str(), "Q12");
    assert_eq!(imported.handle.repository, RepositoryTarget::Federated);
    assert_eq!(imported.label(), "human");

    let form = last_form(&federated).await;
    assert_eq!(field(&form, "new"), "item");
    assert_eq!(field(&form, "token"), "abc123+\\");
    let data: serde_json::Value = serde_json::from_str(field(&form, "data")).unwrap();
    assert_eq!(data["labels"]["en"]["value"], "human");
    assert_eq!(
        data["descriptions"]["en"]["value"],
        "common name of Homo sapiens"
    );
    assert_eq!(data["claims"][0]["mainsnak"]["property"], "P1");
    assert_eq!(data["claims"][0]["mainsnak"]["datavalue"]["value"], "Q5");
}

#[tokio::test]
async fn import_fetches_existing_federated_item() {
    let public = MockServer::start().await;
    let federated = MockServer::start().await;

    mount_search(&federated, json!([{"ns": 120, "title": "Item:Q12", "pageid": 40}])).await;
    mount_entity(
        &federated,
        "Q12",
        json!({"id": "Q12", "labels": {"en": {"language": "en", "value": "human"}}}),
    )
    .await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&federated)
        .await;

    let imported = kb(&public, &federated)
        .import_entity(&q("Q5"))
        .await
        .unwrap();
    assert!(!imported.created);
    assert_eq!(imported.handle.id.as_str(), "Q12");
    assert_eq!(imported.label(), "human");
}

async fn mount_public_human(public: &MockServer) {
    mount_entity(
        public,
        "Q5",
        json!({
            "id": "Q5",
            "type": "item",
            "labels": {"en": {"language": "en", "value": "human"}}
        }),
    )
    .await;
}

async fn mount_federated_create(federated: &MockServer, expected: u64) {
    mount_token(federated).await;
    Mock::given(method("POST"))
        .and(path(API))
        .and(body_string_contains("action=wbeditentity"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "entity": {"id": "Q12", "labels": {"en": {"language": "en", "value": "human"}}},
            "success": 1
        })))
        .expect(expected)
        .mount(federated)
        .await;
}

async fn search_count(server: &MockServer) -> usize {
    let requests = server.received_requests().await.unwrap();
    requests
        .iter()
        .filter(|r| r.url.query().is_some_and(|q| q.contains("list=search")))
        .count()
}

#[tokio::test]
async fn import_twice_creates_once_while_search_lags() {
    let public = MockServer::start().await;
    let federated = MockServer::start().await;

    // The search index has not caught up with the first import.
    mount_search(&federated, json!([])).await;
    mount_public_human(&public).await;
    mount_federated_create(&federated, 1).await;
    mount_entity(
        &federated,
        "Q12",
        json!({"id": "Q12", "labels": {"en": {"language": "en", "value": "human"}}}),
    )
    .await;

    let kb = kb(&public, &federated);
    let first = kb.import_entity(&q("Q5")).await.unwrap();
    let second = kb.import_entity(&q("Q5")).await.unwrap();

    assert!(first.created);
    assert!(!second.created);
    assert_eq!(first.id(), second.id());
    assert_eq!(second.label(), "human");
    assert_eq!(search_count(&federated).await, 1);
}

#[tokio::test]
async fn import_recreates_when_remembered_item_is_gone() {
    let public = MockServer::start().await;
    let federated = MockServer::start().await;

    mount_search(&federated, json!([])).await;
    mount_public_human(&public).await;
    mount_federated_create(&federated, 2).await;
    mount_entity(&federated, "Q12", json!({"id": "Q12", "missing": ""})).await;

    let kb = kb(&public, &federated);
    assert!(kb.import_entity(&q("Q5")).await.unwrap().created);
    assert!(kb.import_entity(&q("Q5")).await.unwrap().created);
    assert_eq!(search_count(&federated).await, 2);
}

#[tokio::test]
async fn import_of_missing_public_item_is_not_found() {
    let public = MockServer::start().await;
    let federated = MockServer::start().await;

    mount_search(&federated, json!([])).await;
    mount_entity(&public, "Q404", json!({"id": "Q404", "missing": ""})).await;

    let err = kb(&public, &federated)
        .import_entity(&q("Q404"))
        .await
        .unwrap_err();
    match err {
        KbApiError::NotFound { repository, id } => {
            assert_eq!(repository, RepositoryTarget::Public);
            assert_eq!(id, "Q404");
        }
        other => panic!("expected NotFound, got: {other:?}"),
    }
}

// ── Entity lookup and creation ───────────────────────────────────────

#[tokio::test]
async fn resolve_entity_reports_missing_item() {
    let public = MockServer::start().await;
    let federated = MockServer::start().await;
    mount_entity(&public, "Q9", json!({"id": "Q9", "missing": ""})).await;

    let err = kb(&public, &federated)
        .resolve_entity(RepositoryTarget::Public, &q("Q9"))
        .await
        .unwrap_err();
    assert!(matches!(err, KbApiError::NotFound { .. }));
}

#[tokio::test]
async fn create_entity_posts_to_selected_repository() {
    let public = MockServer::start().await;
    let federated = MockServer::start().await;

    mount_token(&public).await;
    Mock::given(method("POST"))
        .and(path(API))
        .and(body_string_contains("action=wbeditentity"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "entity": {"id": "Q777", "labels": {"en": {"language": "en", "value": "Test"}}},
            "success": 1
        })))
        .expect(1)
        .mount(&public)
        .await;

    let handle = kb(&public, &federated)
        .create_entity(RepositoryTarget::Public, &terms("Test"))
        .await
        .unwrap();
    assert_eq!(handle.id.as_str(), "Q777");
    assert_eq!(handle.repository, RepositoryTarget::Public);
    assert_eq!(handle.label.as_deref(), Some("Test"));

    let data: serde_json::Value =
        serde_json::from_str(field(&last_form(&public).await, "data")).unwrap();
    assert!(data.get("claims").is_none());
}

#[tokio::test]
async fn create_entity_surfaces_api_error_object() {
    let public = MockServer::start().await;
    let federated = MockServer::start().await;

    mount_token(&public).await;
    Mock::given(method("POST"))
        .and(path(API))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "error": {
                "code": "modification-failed",
                "info": "Item Q1 already has label \"Test\" associated with language code en."
            }
        })))
        .mount(&public)
        .await;

    let err = kb(&public, &federated)
        .create_entity(RepositoryTarget::Public, &terms("Test"))
        .await
        .unwrap_err();
    match err {
        KbApiError::Wikibase { code, .. } => assert_eq!(code, "modification-failed"),
        other => panic!("expected Wikibase error, got: {other:?}"),
    }
}

#[tokio::test]
async fn rejected_token_is_refreshed_once() {
    let public = MockServer::start().await;
    let federated = MockServer::start().await;

    Mock::given(method("GET"))
        .and(query_param("meta", "tokens"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "query": {"tokens": {"csrftoken": "fresh+\\"}}
        })))
        .expect(2)
        .mount(&public)
        .await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "error": {"code": "badtoken", "info": "Invalid CSRF token."}
        })))
        .up_to_n_times(1)
        .with_priority(1)
        .mount(&public)
        .await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "entity": {"id": "Q8", "labels": {"en": {"language": "en", "value": "Test"}}},
            "success": 1
        })))
        .with_priority(2)
        .mount(&public)
        .await;

    let handle = kb(&public, &federated)
        .create_entity(RepositoryTarget::Public, &terms("Test"))
        .await
        .unwrap();
    assert_eq!(handle.id.as_str(), "Q8");
}

// ── Claim submission ─────────────────────────────────────────────────

#[tokio::test]
async fn submit_claim_sends_year_precision_time() {
    let public = MockServer::start().await;
    let federated = MockServer::start().await;

    mount_entity(
        &public,
        "P585",
        json!({"id": "P585", "type": "property", "datatype": "time"}),
    )
    .await;
    mount_token(&public).await;
    Mock::given(method("POST"))
        .and(path(API))
        .and(body_string_contains("action=wbcreateclaim"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "pageinfo": {"lastrevid": 10},
            "success": 1,
            "claim": {"id": "Q7$5627445f-43cb-ed6d-3adb-760e85bd17ee", "type": "statement"}
        })))
        .expect(1)
        .mount(&public)
        .await;

    let subject = EntityHandle::new(q("Q7"), RepositoryTarget::Public);
    let statement = kb(&public, &federated)
        .submit_claim(
            RepositoryTarget::Public,
            &subject,
            &p("P585"),
            &ClaimValue::Time(CalendarPoint::year(2010)),
        )
        .await
        .unwrap();
    assert_eq!(statement, "Q7$5627445f-43cb-ed6d-3adb-760e85bd17ee");

    let form = last_form(&public).await;
    assert_eq!(field(&form, "entity"), "Q7");
    assert_eq!(field(&form, "property"), "P585");
    assert_eq!(field(&form, "snaktype"), "value");
    let value: serde_json::Value = serde_json::from_str(field(&form, "value")).unwrap();
    assert_eq!(value["time"], "+2010-00-00T00:00:00Z");
    assert_eq!(value["precision"], 9);
    assert_eq!(
        value["calendarmodel"],
        "http://www.wikidata.org/entity/Q1985727"
    );
}

#[tokio::test]
async fn submit_claim_on_federated_subject_resolves_property_publicly() {
    let public = MockServer::start().await;
    let federated = MockServer::start().await;

    mount_entity(
        &public,
        "P31",
        json!({"id": "P31", "type": "property", "datatype": "wikibase-item"}),
    )
    .await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&public)
        .await;
    mount_token(&federated).await;
    Mock::given(method("POST"))
        .and(path(API))
        .and(body_string_contains("action=wbcreateclaim"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": 1,
            "claim": {"id": "Q3$abc"}
        })))
        .expect(1)
        .mount(&federated)
        .await;

    let subject = EntityHandle::new(q("Q3"), RepositoryTarget::Federated);
    let target = EntityHandle::new(q("Q12"), RepositoryTarget::Federated);
    kb(&public, &federated)
        .submit_claim(
            RepositoryTarget::Public,
            &subject,
            &p("P31"),
            &ClaimValue::Item(target),
        )
        .await
        .unwrap();

    let value: serde_json::Value =
        serde_json::from_str(field(&last_form(&federated).await, "value")).unwrap();
    assert_eq!(value, json!({"entity-type": "item", "numeric-id": 12, "id": "Q12"}));
}

#[tokio::test]
async fn submit_claim_rejects_datatype_mismatch_without_writing() {
    let public = MockServer::start().await;
    let federated = MockServer::start().await;

    mount_entity(&public, "P31", json!({"id": "P31", "datatype": "wikibase-item"})).await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&public)
        .await;

    let subject = EntityHandle::new(q("Q7"), RepositoryTarget::Public);
    let err = kb(&public, &federated)
        .submit_claim(
            RepositoryTarget::Public,
            &subject,
            &p("P31"),
            &ClaimValue::Time(CalendarPoint::year(1999)),
        )
        .await
        .unwrap_err();
    match err {
        KbApiError::DatatypeMismatch { expected, actual, .. } => {
            assert_eq!(expected, "time");
            assert_eq!(actual, "wikibase-item");
        }
        other => panic!("expected DatatypeMismatch, got: {other:?}"),
    }
}

#[tokio::test]
async fn server_error_maps_to_api_error() {
    let public = MockServer::start().await;
    let federated = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(API))
        .respond_with(ResponseTemplate::new(503).set_body_string("maintenance"))
        .mount(&public)
        .await;

    let err = kb(&public, &federated)
        .resolve_entity(RepositoryTarget::Public, &q("Q1"))
        .await
        .unwrap_err();
    match err {
        KbApiError::ApiError { status, body, .. } => {
            assert_eq!(status, 503);
            assert_eq!(body, "maintenance");
        }
        other => panic!("expected ApiError, got: {other:?}"),
    }
}
