use super::*;
use crate::integrations::LegacyResponse;
use crate::mapping::{FieldKind, FieldMap, FieldTarget};
use crate::storage::{FormRegistry, MappingStore, Storage};
use crate::test_support::MockLegacy;
use serde_json::json;

fn definition(field_map: FieldMap) -> MappingDefinition {
    MappingDefinition {
        form_id: 1,
        list_id: "3".to_string(),
        sync_type: SyncType::ContactSync,
        field_map,
    }
}

fn values(pairs: Value) -> Map<String, Value> {
    pairs.as_object().cloned().unwrap()
}

fn dispatcher_for(document: &str, legacy: Arc<MockLegacy>) -> SyncDispatcher {
    let storage = Arc::new(Storage::open_in_memory().unwrap());
    storage.register_form("contact_form", "Contact").unwrap();
    let form_id = storage.form_id("contact_form").unwrap().unwrap();
    storage.save_mapping(form_id, document).unwrap();
    SyncDispatcher::new(MappingResolver::new(storage.clone(), storage), legacy)
}

#[test]
fn test_empty_field_map_sends_only_list_parameters() {
    let payload = build_payload(&definition(FieldMap::new()), &values(json!({"mail": "x"})));

    assert_eq!(payload.keys().collect::<Vec<_>>(), vec!["status[3]", "p[3]"]);
    assert_eq!(payload.get("status[3]"), Some(&json!(1)));
    assert_eq!(payload.get("p[3]"), Some(&json!("3")));
}

#[test]
fn test_reserved_and_custom_fields_are_routed() {
    let mut field_map = FieldMap::new();
    field_map.insert("mail".to_string(), FieldTarget::text("Email"));
    field_map.insert("given".to_string(), FieldTarget::text("FIRSTNAME"));
    field_map.insert("company".to_string(), FieldTarget::text("acct_name"));
    field_map.insert("colour".to_string(), FieldTarget::text("COLOR"));

    let payload = build_payload(
        &definition(field_map),
        &values(json!({
            "mail": "ada@example.com",
            "given": [{"value": "Ada"}, {"value": "ignored"}],
            "company": "Engines Ltd",
            "colour": "blue"
        })),
    );

    assert_eq!(
        payload.keys().collect::<Vec<_>>(),
        vec![
            "email",
            "first_name",
            "customer_acct_name",
            "field[%COLOR%,0]",
            "status[3]",
            "p[3]",
        ]
    );
    assert_eq!(payload.get("first_name"), Some(&json!("Ada")));
}

#[test]
fn test_missing_values_are_sent_empty() {
    let mut field_map = FieldMap::new();
    field_map.insert("phone_number".to_string(), FieldTarget::text("phone"));

    let payload = build_payload(&definition(field_map), &Map::new());
    assert_eq!(payload.get("phone"), Some(&json!("")));
}

#[test]
fn test_unknown_kind_passes_value_through() {
    let mut field_map = FieldMap::new();
    field_map.insert(
        "tags".to_string(),
        FieldTarget {
            field: "12".to_string(),
            kind: FieldKind::Other("Checkbox".to_string()),
        },
    );

    let payload = build_payload(&definition(field_map), &values(json!({"tags": ["a", "b"]})));
    assert_eq!(payload.get("field[%12%,0]"), Some(&json!(["a", "b"])));
}

#[tokio::test]
async fn test_dispatch_sends_through_legacy_with_type_action() {
    let legacy = MockLegacy::accepting();
    let dispatcher = dispatcher_for(
        r#"{"list_id": 3, "type": "contact_add", "mapping": {"mail": {"field": "email", "kind": "Text Input"}}}"#,
        legacy.clone(),
    );

    let outcome = dispatcher
        .dispatch("contact_form", &values(json!({"mail": "ada@example.com"})))
        .await;

    assert!(outcome.is_delivered());
    let sent = legacy.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].1, "contact_add");
    assert_eq!(sent[0].0.get("email"), Some(&json!("ada@example.com")));
}

#[tokio::test]
async fn test_dispatch_with_empty_mapping_does_not_fail() {
    let legacy = MockLegacy::accepting();
    let dispatcher = dispatcher_for(r#"{"list_id": "8"}"#, legacy.clone());

    let outcome = dispatcher.dispatch("contact_form", &Map::new()).await;

    assert!(outcome.is_delivered());
    assert_eq!(legacy.sent()[0].0.len(), 2);
    assert_eq!(legacy.sent()[0].1, "contact_sync");
}

#[tokio::test]
async fn test_unknown_form_is_skipped_without_network() {
    let legacy = MockLegacy::accepting();
    let dispatcher = dispatcher_for(r#"{"list_id": "8"}"#, legacy.clone());

    let outcome = dispatcher.dispatch("other_form", &Map::new()).await;

    assert!(matches!(outcome, DispatchOutcome::Skipped(_)));
    assert!(legacy.sent().is_empty());
}

#[tokio::test]
async fn test_invalid_mapping_is_skipped_without_network() {
    let legacy = MockLegacy::accepting();
    let dispatcher = dispatcher_for("not json", legacy.clone());

    let outcome = dispatcher.dispatch("contact_form", &Map::new()).await;

    assert!(matches!(outcome, DispatchOutcome::Skipped(_)));
    assert!(legacy.sent().is_empty());
}

#[tokio::test]
async fn test_reply_outcomes() {
    let silent = MockLegacy::new(|_| {
        Ok(LegacyResponse {
            result_code: Some(json!(0)),
            result_message: None,
        })
    });
    let malformed = MockLegacy::new(|_| Err(LegacyResponse::parse("<html>").unwrap_err()));
    let offline = MockLegacy::new(|_| Err(SyncError::Transport("timed out".into())));

    let document = r#"{"list_id": "8"}"#;
    assert_eq!(
        dispatcher_for(document, silent).dispatch("contact_form", &Map::new()).await,
        DispatchOutcome::Rejected
    );
    assert_eq!(
        dispatcher_for(document, malformed).dispatch("contact_form", &Map::new()).await,
        DispatchOutcome::Rejected
    );
    assert_eq!(
        dispatcher_for(document, offline).dispatch("contact_form", &Map::new()).await,
        DispatchOutcome::TransportFailed
    );
}
