//! Heartbeat filtering and reply correlation

mod common;

use common::{ScriptedConnection, ack, adapter, control, heartbeat};
use qrc_bridge::ErrorKind;
use serde_json::json;

#[test]
fn heartbeat_before_reply_is_skipped() {
    let replies = [heartbeat(), control(json!({"Name": "room.gain", "Position": 1.0}))];
    let (mut adapter, _) = adapter(ScriptedConnection::new(replies));

    let outcome = adapter.get_volume("room.gain");

    assert_eq!(outcome.value, "100");
    assert_eq!(outcome.attempts, 1);
    assert!(outcome.diagnostics.is_empty());
    assert_eq!(adapter.connection().pending(), 0);
}

#[test]
fn consecutive_heartbeats_fail_the_attempt() {
    let replies = [heartbeat(), heartbeat(), ack()];
    let (mut adapter, _) = adapter(ScriptedConnection::new(replies));

    let outcome = adapter.set_toggle("mic.mute", "false");

    assert!(outcome.is_success());
    assert_eq!(outcome.attempts, 2);
    assert_eq!(
        outcome.messages(),
        vec!["set_toggle - received consecutive EngineStatus notifications instead of a response"]
    );
}

#[test]
fn other_notifications_are_not_heartbeats() {
    let replies = [
        r#"{"jsonrpc":"2.0","method":"LoopPlayer.Status","params":{}}"#.to_string(),
        control(json!({"Name": "mic.mute", "Value": 1})),
    ];
    let (mut adapter, _) = adapter(ScriptedConnection::new(replies));

    let outcome = adapter.get_toggle("mic.mute");

    // Taken as the reply. It has no result, so the first read is unknown.
    assert_eq!(outcome.value, "true");
    assert_eq!(outcome.attempts, 2);
    assert_eq!(adapter.connection().pending(), 0);
}

#[test]
fn mismatched_reply_id_is_recorded_and_accepted() {
    let reply = r#"{"jsonrpc":"2.0","id":"00000000-0000-0000-0000-000000000000","result":true}"#;
    let (mut adapter, _) = adapter(ScriptedConnection::new([reply]));

    let outcome = adapter.set_volume("room.gain", "10");

    assert_eq!(outcome.into_result().unwrap(), "ok");
}

#[test]
fn mismatched_reply_id_leaves_a_diagnostic() {
    let reply = r#"{"jsonrpc":"2.0","id":"00000000-0000-0000-0000-000000000000","result":true}"#;
    let (mut adapter, _) = adapter(ScriptedConnection::new([reply]));

    let outcome = adapter.set_volume("room.gain", "10");

    let messages = outcome.messages();
    assert_eq!(messages.len(), 1);
    assert!(messages[0].contains("does not match request id"));
}

#[test]
fn malformed_reply_is_a_decode_error() {
    let (mut adapter, _) = adapter(ScriptedConnection::new(["{not json", "{not json", "{not json"]));

    let outcome = adapter.get_volume("room.gain");

    assert_eq!(outcome.error.as_ref().unwrap().kind(), ErrorKind::Decode);
    assert_eq!(outcome.attempts, 3);
}
