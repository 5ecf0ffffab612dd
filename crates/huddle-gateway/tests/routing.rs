//! Message router: protocol errors, chat, signaling relay.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

mod common;

use std::time::Duration;

use serde_json::json;

use huddle_gateway::infra::MessageStore;

use common::{Client, Harness};

async fn room_of_three() -> (Harness, Client, Client, Client) {
    let h = Harness::new();
    h.authority.meeting("r1", true, 10);
    h.authority.meeting("r2", true, 10);
    let (mut a, mut b, mut c) = (h.client(Some("a")), h.client(Some("b")), h.client(Some("c")));
    h.join(&a, "r1").await;
    h.join(&b, "r1").await;
    h.join(&c, "r2").await;
    a.drain();
    b.drain();
    c.drain();
    (h, a, b, c)
}

#[tokio::test]
async fn unparsable_frames_get_invalid_json() {
    let (h, mut a, mut b, _c) = room_of_three().await;

    for raw in ["{", "hello", r#"{"payload":{}}"#, r#"{"action":"chat-message","payload":"hi"}"#] {
        h.send(&a, raw).await;
        assert_eq!(a.only(), json!({"action": "error", "payload": "invalid-json"}), "raw={raw}");
    }

    assert_eq!(h.state.directory().room_of(a.conn.id()).as_deref(), Some("r1"));
    assert_eq!(h.count("r1"), 2);
    assert!(b.drain().is_empty());
}

#[tokio::test]
async fn invalid_json_before_join_changes_nothing() {
    let h = Harness::new();
    let mut a = h.client(None);
    h.send(&a, "][").await;
    assert_eq!(a.only()["payload"], "invalid-json");
    assert!(h.state.directory().room_of(a.conn.id()).is_none());
    assert!(a.conn.identity().is_none());
}

#[tokio::test]
async fn unknown_action_is_reported() {
    let (h, mut a, mut b, _c) = room_of_three().await;
    h.send(&a, r#"{"action":"kick","payload":{"target":"b"}}"#).await;
    assert_eq!(a.only(), json!({"action": "error", "payload": "unknown-action"}));
    assert!(b.drain().is_empty());
    assert_eq!(h.count("r1"), 2);
}

#[tokio::test]
async fn chat_is_persisted_once_and_stays_in_room() {
    let (h, mut a, mut b, mut c) = room_of_three().await;

    h.send(&a, r#"{"action":"chat-message","payload":{"text":"hi"}}"#).await;

    let stored = h.store.get_last("r1", 50).await.unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].content, "hi");
    assert_eq!(stored[0].room_id, "r1");
    assert_eq!(stored[0].sender_id, "a");
    assert_eq!(stored[0].kind, "chat");

    let got = b.only();
    assert_eq!(got["action"], "chat-message");
    assert_eq!(got["payload"]["content"], "hi");
    assert_eq!(got["payload"]["id"], stored[0].id.to_string());

    // sender sees its own message; other rooms see nothing
    assert_eq!(a.only()["payload"]["content"], "hi");
    assert!(c.drain().is_empty());
    assert!(h.store.get_last("r2", 50).await.unwrap().is_empty());
}

#[tokio::test]
async fn chat_is_broadcast_when_persisting_fails() {
    let (h, mut a, mut b, mut c) = room_of_three().await;
    h.store.fail_writes(true);

    h.send(&a, r#"{"action":"chat-message","payload":{"text":"lost?"}}"#).await;

    assert_eq!(b.only()["payload"]["content"], "lost?");
    assert_eq!(a.only()["payload"]["content"], "lost?");
    assert!(c.drain().is_empty());
    assert!(h.store.get_last("r1", 50).await.unwrap().is_empty());
}

#[tokio::test]
async fn chat_is_broadcast_when_persisting_times_out() {
    let (h, a, mut b, _c) = room_of_three().await;
    h.store.delay(Duration::from_millis(400));

    h.send(&a, r#"{"action":"chat-message","payload":{"text":"slow"}}"#).await;

    let got = b.only();
    assert_eq!(got["action"], "chat-message");
    assert_eq!(got["payload"]["content"], "slow");
}

#[tokio::test]
async fn chat_keeps_payload_sender_and_raw_content() {
    let (h, mut a, mut b, _c) = room_of_three().await;
    h.send(
        &a,
        r#"{"action":"chat-message","payload":{"text":"<i>x</i>","senderId":"alias","senderName":"Al","timestamp":"2024-01-02T03:04:05Z"}}"#,
    )
    .await;

    let got = b.only();
    assert_eq!(got["payload"]["content"], "<i>x</i>");
    assert_eq!(got["payload"]["senderId"], "alias");
    assert_eq!(got["payload"]["senderName"], "Al");
    assert_eq!(got["payload"]["timestamp"], "2024-01-02T03:04:05Z");
    a.drain();
}

#[tokio::test]
async fn chat_without_identity_is_anonymous() {
    let h = Harness::new();
    h.authority.meeting("r1", true, 10);
    let mut a = h.client(None);
    h.join(&a, "r1").await;
    a.drain();
    h.send(&a, r#"{"action":"chat-message","payload":{"text":"hey"}}"#).await;
    assert_eq!(a.only()["payload"]["senderId"], "anonymous");
}

#[tokio::test]
async fn chat_without_room_is_rejected() {
    let h = Harness::new();
    let mut a = h.client(Some("a"));
    h.send(&a, r#"{"action":"chat-message","payload":{"text":"hi"}}"#).await;
    assert_eq!(a.only(), json!({"action": "error", "payload": "no-room"}));
    assert_eq!(h.state.directory().room_count(), 0);
}

#[tokio::test]
async fn chat_can_name_the_room_in_the_payload() {
    let (h, _a, mut b, _c) = room_of_three().await;
    let mut outsider = h.client(Some("z"));

    h.send(&outsider, r#"{"action":"chat-message","payload":{"roomId":"r1","text":"knock"}}"#).await;

    assert_eq!(b.only()["payload"]["content"], "knock");
    assert!(outsider.drain().is_empty());
    assert_eq!(h.store.get_last("r1", 50).await.unwrap().len(), 1);
}

#[tokio::test]
async fn signals_are_relayed_verbatim_plus_from() {
    let (h, mut a, mut b, mut c) = room_of_three().await;

    h.send(
        &a,
        r#"{"action":"signal-offer","payload":{"sdp":"v=0","type":"offer","target":"b"}}"#,
    )
    .await;

    assert_eq!(
        b.only(),
        json!({"action": "signal-offer", "payload": {"sdp": "v=0", "type": "offer", "target": "b", "from": "a"}})
    );
    assert!(a.drain().is_empty());
    assert!(c.drain().is_empty());
}

#[tokio::test]
async fn every_signal_kind_is_relayed() {
    let (h, mut a, mut b, _c) = room_of_three().await;
    for action in ["signal-offer", "signal-answer", "signal-candidate"] {
        h.send(&a, &format!(r#"{{"action":"{action}","payload":{{"n":1}}}}"#)).await;
        let got = b.only();
        assert_eq!(got["action"], action);
        assert_eq!(got["payload"]["n"], 1);
        assert_eq!(got["payload"]["from"], "a");
    }
    assert!(a.drain().is_empty());
}

#[tokio::test]
async fn signal_without_room_is_rejected() {
    let h = Harness::new();
    let mut a = h.client(Some("a"));
    h.send(&a, r#"{"action":"signal-answer","payload":{"sdp":"x"}}"#).await;
    assert_eq!(a.only()["payload"], "no-room");
}

#[tokio::test]
async fn signal_payload_room_is_used_when_not_joined() {
    let (h, mut a, mut b, _c) = room_of_three().await;
    let mut outsider = h.client(Some("z"));
    h.send(&outsider, r#"{"action":"signal-candidate","payload":{"roomId":"r1","candidate":"c"}}"#).await;

    let got = b.only();
    assert_eq!(got["payload"]["roomId"], "r1");
    assert_eq!(got["payload"]["from"], "z");
    assert_eq!(a.only()["payload"]["candidate"], "c");
    assert!(outsider.drain().is_empty());
}

#[tokio::test]
async fn closed_member_does_not_block_broadcast() {
    let (h, a, mut b, _c) = room_of_three().await;
    let mut d = h.client(Some("d"));
    h.join(&d, "r1").await;
    d.drain();
    b.drain();
    drop(a.rx);

    h.send(&d, r#"{"action":"chat-message","payload":{"text":"still here"}}"#).await;
    assert_eq!(b.only()["payload"]["content"], "still here");
    assert_eq!(d.only()["payload"]["content"], "still here");
}
