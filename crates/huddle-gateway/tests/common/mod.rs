//! Shared fixtures: fake meeting authority, scriptable store, channel-backed
//! clients, config.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]
#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::extract::ws::Message;
use serde_json::Value;
use tokio::sync::mpsc;

use huddle_core::error::{HuddleError, Result};
use huddle_core::model::{MeetingInfo, Message as ChatMessage};
use huddle_gateway::app_state::AppState;
use huddle_gateway::config::{self, GatewayConfig};
use huddle_gateway::infra::{InMemoryMessageStore, MeetingAuthority, MessageStore};
use huddle_gateway::realtime::Connection;

/// In-process meeting authority with scriptable answers.
#[derive(Default)]
pub struct FakeAuthority {
    meetings: Mutex<HashMap<String, MeetingInfo>>,
    failing: AtomicBool,
    failing_reports: AtomicBool,
    delay: Mutex<Duration>,
    reports: Mutex<Vec<(String, usize)>>,
}

impl FakeAuthority {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn meeting(&self, room_id: &str, is_active: bool, max_participants: usize) {
        self.meetings.lock().unwrap().insert(
            room_id.to_string(),
            MeetingInfo {
                room_id: room_id.to_string(),
                is_active,
                max_participants,
                participant_count: 0,
            },
        );
    }

    pub fn fail(&self, on: bool) {
        self.failing.store(on, Ordering::SeqCst);
    }

    /// Make only participant-count reports fail.
    pub fn fail_reports(&self, on: bool) {
        self.failing_reports.store(on, Ordering::SeqCst);
    }

    pub fn delay(&self, d: Duration) {
        *self.delay.lock().unwrap() = d;
    }

    pub fn reports(&self) -> Vec<(String, usize)> {
        self.reports.lock().unwrap().clone()
    }

    /// Wait for the fire-and-forget report task to land.
    pub async fn wait_for_report(&self, room_id: &str, count: usize) -> bool {
        for _ in 0..50 {
            if self.reports().iter().any(|(r, c)| r == room_id && *c == count) {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        false
    }
}

#[async_trait]
impl MeetingAuthority for FakeAuthority {
    async fn get_meeting(&self, room_id: &str) -> Result<Option<MeetingInfo>> {
        let delay = *self.delay.lock().unwrap();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        if self.failing.load(Ordering::SeqCst) {
            return Err(HuddleError::Upstream("authority down".into()));
        }
        Ok(self.meetings.lock().unwrap().get(room_id).cloned())
    }

    async fn update_participant_count(&self, room_id: &str, count: usize) -> Result<()> {
        self.reports.lock().unwrap().push((room_id.to_string(), count));
        if self.failing.load(Ordering::SeqCst) || self.failing_reports.load(Ordering::SeqCst) {
            return Err(HuddleError::Upstream("authority down".into()));
        }
        Ok(())
    }
}

/// In-memory store with switchable write/read failures and a delay.
pub struct FakeStore {
    inner: InMemoryMessageStore,
    failing_writes: AtomicBool,
    failing_reads: AtomicBool,
    delay: Mutex<Duration>,
}

impl FakeStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            inner: InMemoryMessageStore::new(100),
            failing_writes: AtomicBool::new(false),
            failing_reads: AtomicBool::new(false),
            delay: Mutex::new(Duration::ZERO),
        })
    }

    pub fn fail_writes(&self, on: bool) {
        self.failing_writes.store(on, Ordering::SeqCst);
    }

    pub fn fail_reads(&self, on: bool) {
        self.failing_reads.store(on, Ordering::SeqCst);
    }

    /// Delay every call after this one; longer than the request timeout
    /// makes callers give up.
    pub fn delay(&self, d: Duration) {
        *self.delay.lock().unwrap() = d;
    }

    async fn pause(&self) {
        let delay = *self.delay.lock().unwrap();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }
}

#[async_trait]
impl MessageStore for FakeStore {
    async fn save(&self, message: ChatMessage) -> Result<ChatMessage> {
        self.pause().await;
        if self.failing_writes.load(Ordering::SeqCst) {
            return Err(HuddleError::Upstream("store down".into()));
        }
        self.inner.save(message).await
    }

    async fn get_last(&self, room_id: &str, limit: usize) -> Result<Vec<ChatMessage>> {
        self.pause().await;
        if self.failing_reads.load(Ordering::SeqCst) {
            return Err(HuddleError::Upstream("store down".into()));
        }
        self.inner.get_last(room_id, limit).await
    }

    async fn clear(&self, room_id: &str) -> Result<()> {
        self.inner.clear(room_id).await
    }
}

pub fn test_config() -> GatewayConfig {
    config::load_from_str(
        r#"
version: 1
gateway:
  send_timeout_ms: 50
authority:
  base_url: "http://authority.invalid"
  request_timeout_ms: 200
history:
  limit: 3
  max_per_room: 100
"#,
    )
    .unwrap()
}

pub struct Harness {
    pub state: AppState,
    pub authority: Arc<FakeAuthority>,
    pub store: Arc<FakeStore>,
}

impl Harness {
    pub fn new() -> Self {
        let authority = FakeAuthority::new();
        let store = FakeStore::new();
        let state = AppState::with_collaborators(test_config(), authority.clone(), store.clone());
        Self {
            state,
            authority,
            store,
        }
    }

    pub fn client(&self, identity: Option<&str>) -> Client {
        let (tx, rx) = mpsc::channel(64);
        Client {
            conn: Connection::new(identity.map(str::to_string), tx),
            rx,
        }
    }

    pub async fn send(&self, client: &Client, raw: &str) {
        self.state.router().handle_text(&client.conn, raw).await;
    }

    pub async fn join(&self, client: &Client, room_id: &str) {
        self.send(client, &format!(r#"{{"action":"join","payload":{{"roomId":"{room_id}"}}}}"#))
            .await;
    }

    pub fn count(&self, room_id: &str) -> usize {
        self.state.directory().count_in(room_id)
    }
}

/// A connection whose outbound queue is read directly by the test.
pub struct Client {
    pub conn: Connection,
    pub rx: mpsc::Receiver<Message>,
}

impl Client {
    /// Every frame queued so far, decoded.
    pub fn drain(&mut self) -> Vec<Value> {
        let mut out = Vec::new();
        while let Ok(msg) = self.rx.try_recv() {
            if let Message::Text(s) = msg {
                out.push(serde_json::from_str(&s).unwrap());
            }
        }
        out
    }

    pub fn actions(&mut self) -> Vec<String> {
        self.drain()
            .into_iter()
            .map(|v| v["action"].as_str().unwrap().to_string())
            .collect()
    }

    /// Exactly one queued frame.
    pub fn only(&mut self) -> Value {
        let mut frames = self.drain();
        assert_eq!(frames.len(), 1, "frames: {frames:?}");
        frames.remove(0)
    }
}
