use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};

use axum::extract::ws::Message;
use tokio::sync::mpsc;

/// Process-unique connection id.
pub type ConnId = u64;

static NEXT_CONN_ID: AtomicU64 = AtomicU64::new(1);

/// Handle to one client's outbound queue.
///
/// The transport owns the session; the room directory only keeps clones of
/// this handle while the connection is registered. Which room a connection is
/// in is answered by the directory, not stored here.
#[derive(Clone)]
pub struct Connection {
    inner: Arc<ConnInner>,
}

struct ConnInner {
    id: ConnId,
    identity: OnceLock<String>,
    tx: mpsc::Sender<Message>,
}

impl Connection {
    pub fn new(identity: Option<String>, tx: mpsc::Sender<Message>) -> Self {
        let cell = OnceLock::new();
        if let Some(identity) = identity.filter(|s| !s.is_empty()) {
            let _ = cell.set(identity);
        }
        Self {
            inner: Arc::new(ConnInner {
                id: NEXT_CONN_ID.fetch_add(1, Ordering::Relaxed),
                identity: cell,
                tx,
            }),
        }
    }

    pub fn id(&self) -> ConnId {
        self.inner.id
    }

    pub fn identity(&self) -> Option<&str> {
        self.inner.identity.get().map(String::as_str)
    }

    /// Set the identity if none is set yet. Returns false when one already was.
    pub fn assign_identity(&self, identity: String) -> bool {
        self.inner.identity.set(identity).is_ok()
    }

    pub fn is_open(&self) -> bool {
        !self.inner.tx.is_closed()
    }

    pub fn sender(&self) -> &mpsc::Sender<Message> {
        &self.inner.tx
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("id", &self.inner.id)
            .field("identity", &self.identity())
            .finish()
    }
}
