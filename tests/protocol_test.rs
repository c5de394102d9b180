//! Tests for the graphql-ws wire messages and the GraphQL response decoder.

use heise_feed::bus::protocol::{ClientMessage, DataPayload, EVENT_SUBSCRIPTION, ServerMessage};
use heise_feed::error::Error;
use heise_feed::graphql::{GraphqlError, decode_response};
use serde::Deserialize;
use serde_json::json;

#[test]
fn connection_init_wire_shape() {
    let msg = ClientMessage::ConnectionInit { payload: json!({}) };
    let wire: serde_json::Value = serde_json::from_str(&msg.to_text().unwrap()).unwrap();
    assert_eq!(wire, json!({ "type": "connection_init", "payload": {} }));
}

#[test]
fn start_carries_subscription_and_pattern() {
    let msg = ClientMessage::subscribe_events("1", "heise-feed:*");
    let wire: serde_json::Value = serde_json::from_str(&msg.to_text().unwrap()).unwrap();

    assert_eq!(wire["type"], "start");
    assert_eq!(wire["id"], "1");
    assert_eq!(wire["payload"]["query"], EVENT_SUBSCRIPTION);
    assert_eq!(wire["payload"]["variables"], json!({ "name": "heise-feed:*" }));
    assert_eq!(wire["payload"]["operationName"], "Events");
}

#[test]
fn stop_and_terminate_wire_shape() {
    let stop: serde_json::Value =
        serde_json::from_str(&ClientMessage::Stop { id: "1".into() }.to_text().unwrap()).unwrap();
    assert_eq!(stop, json!({ "type": "stop", "id": "1" }));

    let terminate: serde_json::Value =
        serde_json::from_str(&ClientMessage::ConnectionTerminate.to_text().unwrap()).unwrap();
    assert_eq!(terminate, json!({ "type": "connection_terminate" }));
}

#[test]
fn parses_control_messages() {
    assert_eq!(
        ServerMessage::parse(r#"{"type":"connection_ack"}"#).unwrap(),
        ServerMessage::ConnectionAck
    );
    assert_eq!(
        ServerMessage::parse(r#"{"type":"ka"}"#).unwrap(),
        ServerMessage::KeepAlive
    );
    assert_eq!(
        ServerMessage::parse(r#"{"type":"complete","id":"1"}"#).unwrap(),
        ServerMessage::Complete { id: "1".into() }
    );
    assert!(matches!(
        ServerMessage::parse(r#"{"type":"connection_error","payload":{"message":"nope"}}"#)
            .unwrap(),
        ServerMessage::ConnectionError { .. }
    ));
}

#[test]
fn unknown_message_type_fails_to_parse() {
    assert!(ServerMessage::parse(r#"{"type":"next","id":"1","payload":{}}"#).is_err());
}

#[test]
fn data_message_yields_event() {
    let raw = r#"{
        "type": "data",
        "id": "1",
        "payload": {
            "data": {
                "eventListener": {
                    "name": "heise-feed:start",
                    "data": null,
                    "time": "2020-01-01T00:00:00Z"
                }
            }
        }
    }"#;

    let ServerMessage::Data { payload, .. } = ServerMessage::parse(raw).unwrap() else {
        panic!("expected data message");
    };
    let event = payload.into_event().unwrap().expect("event present");
    assert_eq!(event.name, "heise-feed:start");
}

#[test]
fn data_without_event_is_skipped() {
    let payload = DataPayload {
        data: Some(json!({ "eventListener": null })),
        errors: Vec::new(),
    };
    assert!(payload.into_event().unwrap().is_none());
}

#[test]
fn data_errors_become_bus_errors() {
    let payload = DataPayload {
        data: None,
        errors: vec![json!({ "message": "unknown field" })],
    };
    match payload.into_event() {
        Err(Error::Bus(message)) => assert!(message.contains("unknown field")),
        other => panic!("expected bus error, got {other:?}"),
    }
}

#[derive(Debug, Deserialize)]
struct Emitted {
    emit: bool,
}

#[test]
fn decode_response_reads_data() {
    let decoded: Emitted = decode_response(json!({ "data": { "emit": true } })).unwrap();
    assert!(decoded.emit);
}

#[test]
fn decode_response_fails_on_errors_or_missing_data() {
    let errs = decode_response::<Emitted>(json!({
        "data": { "emit": true },
        "errors": [{ "message": "a" }, { "message": "b" }]
    }))
    .unwrap_err();
    assert!(matches!(errs, GraphqlError::Errors(ref m) if m.len() == 2));
    assert_eq!(errs.to_string(), "a; b");

    let missing = decode_response::<Emitted>(json!({})).unwrap_err();
    assert!(matches!(missing, GraphqlError::MissingData));
}
