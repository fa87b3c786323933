use super::*;
use serde_json::json;
use yare::parameterized;

#[test]
fn test_payload_keeps_insertion_order_and_replaces_in_place() {
    let mut payload = SyncPayload::new();
    payload.insert("email", json!("a@example.com"));
    payload.insert("first_name", json!("Ada"));
    payload.insert("email", json!("b@example.com"));

    assert_eq!(payload.keys().collect::<Vec<_>>(), vec!["email", "first_name"]);
    assert_eq!(payload.get("email"), Some(&json!("b@example.com")));
}

#[test]
fn test_payload_form_pairs_render_scalars() {
    let mut payload = SyncPayload::new();
    payload.insert("status[3]", json!(1));
    payload.insert("field[%COLOR%,0]", json!(null));

    assert_eq!(
        payload.form_pairs(),
        vec![
            ("status[3]".to_string(), "1".to_string()),
            ("field[%COLOR%,0]".to_string(), String::new()),
        ]
    );
}

#[test]
fn test_legacy_response_parse() {
    let response =
        LegacyResponse::parse(r#"{"result_code": 1, "result_message": "Contact added"}"#)
            .unwrap();
    assert!(response.is_success());
    assert_eq!(response.result_message.as_deref(), Some("Contact added"));
}

#[test]
fn test_legacy_response_without_message_is_not_success() {
    let response = LegacyResponse::parse(r#"{"result_code": 0}"#).unwrap();
    assert!(!response.is_success());
}

#[test]
fn test_legacy_response_empty_and_malformed() {
    assert!(matches!(
        LegacyResponse::parse("  ").unwrap_err(),
        SyncError::Transport(_)
    ));
    assert!(matches!(
        LegacyResponse::parse("<html>").unwrap_err(),
        SyncError::Serialization(_)
    ));
}

#[parameterized(
    string = { json!("12"), Some("12") },
    padded = { json!(" 12 "), Some("12") },
    number = { json!(12), Some("12") },
    empty = { json!(""), None },
    null = { json!(null), None },
    object = { json!({"id": 1}), None },
)]
fn test_id_string(value: Value, expected: Option<&str>) {
    assert_eq!(id_string(&value).as_deref(), expected);
}

#[parameterized(
    equal_strings = { "7", "7", true },
    leading_zero = { "07", "7", true },
    different = { "7", "9", false },
    non_numeric = { "abc", "abc", true },
)]
fn test_same_id(a: &str, b: &str, expected: bool) {
    assert_eq!(same_id(a, b), expected);
}

#[parameterized(
    null = { json!(null), true },
    zero = { json!(0), true },
    zero_string = { json!("0"), true },
    empty_object = { json!({}), true },
    empty_array = { json!([]), true },
    id = { json!(5), false },
    object = { json!({"id": "5"}), false },
)]
fn test_is_blank(value: Value, expected: bool) {
    assert_eq!(is_blank(&value), expected);
}

#[test]
fn test_collection_missing_field_is_empty() {
    let body = json!({"lists": [{"id": "1"}], "meta": {"total": "1"}});
    assert_eq!(collection(&body, "lists").len(), 1);
    assert!(collection(&body, "contacts").is_empty());
    assert!(collection(&json!(null), "lists").is_empty());
}
