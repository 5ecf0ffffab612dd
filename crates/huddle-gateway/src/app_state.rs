//! Shared application state for the Huddle gateway.
//!
//! All realtime components are built here, once, and handed their
//! collaborators at construction: directory -> broadcaster -> admission
//! controller -> message router.

use std::sync::Arc;

use tokio::time::Duration;

use huddle_core::error::Result;

use crate::config::GatewayConfig;
use crate::dispatch::MessageRouter;
use crate::infra::{HttpMeetingAuthority, InMemoryMessageStore, MeetingAuthority, MessageStore};
use crate::realtime::{AdmissionController, AdmissionSettings, Broadcaster, RoomDirectory};

#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    cfg: GatewayConfig,
    directory: Arc<RoomDirectory>,
    router: Arc<MessageRouter>,
}

impl AppState {
    /// Build application state with the HTTP meeting authority and the
    /// in-memory message store.
    /// Returns Result so main can handle errors gracefully (no panic).
    pub fn new(cfg: GatewayConfig) -> Result<Self> {
        let authority = Arc::new(HttpMeetingAuthority::new(&cfg.authority)?);
        let store = Arc::new(InMemoryMessageStore::new(cfg.history.max_per_room));
        Ok(Self::with_collaborators(cfg, authority, store))
    }

    /// Build application state around the given collaborators.
    pub fn with_collaborators(
        cfg: GatewayConfig,
        authority: Arc<dyn MeetingAuthority>,
        store: Arc<dyn MessageStore>,
    ) -> Self {
        let remote_timeout = Duration::from_millis(cfg.authority.request_timeout_ms);

        let directory = Arc::new(RoomDirectory::new());
        let broadcaster = Arc::new(Broadcaster::new(
            Arc::clone(&directory),
            Duration::from_millis(cfg.gateway.send_timeout_ms),
        ));
        let admission = Arc::new(AdmissionController::new(
            Arc::clone(&directory),
            Arc::clone(&broadcaster),
            authority,
            Arc::clone(&store),
            AdmissionSettings {
                remote_timeout,
                history_limit: cfg.history.limit,
            },
        ));
        let router = Arc::new(MessageRouter::new(
            Arc::clone(&directory),
            broadcaster,
            admission,
            store,
            remote_timeout,
        ));

        Self {
            inner: Arc::new(AppStateInner {
                cfg,
                directory,
                router,
            }),
        }
    }

    pub fn cfg(&self) -> &GatewayConfig {
        &self.inner.cfg
    }

    pub fn directory(&self) -> Arc<RoomDirectory> {
        Arc::clone(&self.inner.directory)
    }

    pub fn router(&self) -> Arc<MessageRouter> {
        Arc::clone(&self.inner.router)
    }
}
