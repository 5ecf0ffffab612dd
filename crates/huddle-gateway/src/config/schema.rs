use serde::Deserialize;

use huddle_core::error::{HuddleError, Result};

use crate::infra::store::DEFAULT_HISTORY_LIMIT;

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GatewayConfig {
    pub version: u32,

    #[serde(default)]
    pub gateway: GatewaySection,

    pub authority: AuthoritySection,

    #[serde(default)]
    pub history: HistorySection,
}

impl GatewayConfig {
    pub fn validate(&self) -> Result<()> {
        if self.version != 1 {
            return Err(HuddleError::UnsupportedVersion);
        }

        self.gateway.validate()?;
        self.authority.validate()?;
        self.history.validate()?;

        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GatewaySection {
    #[serde(default = "default_listen")]
    pub listen: String,

    #[serde(default = "default_ping_interval_ms")]
    pub ping_interval_ms: u64,

    #[serde(default = "default_idle_timeout_ms")]
    pub idle_timeout_ms: u64,

    /// Per-connection outbound queue depth.
    #[serde(default = "default_outbound_queue")]
    pub outbound_queue: usize,

    /// Upper bound for one blocked send to one recipient.
    #[serde(default = "default_send_timeout_ms")]
    pub send_timeout_ms: u64,
}

impl Default for GatewaySection {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            ping_interval_ms: default_ping_interval_ms(),
            idle_timeout_ms: default_idle_timeout_ms(),
            outbound_queue: default_outbound_queue(),
            send_timeout_ms: default_send_timeout_ms(),
        }
    }
}

impl GatewaySection {
    pub fn validate(&self) -> Result<()> {
        if !(5000..=120000).contains(&self.ping_interval_ms) {
            return Err(HuddleError::BadRequest(
                "gateway.ping_interval_ms must be between 5000 and 120000".into(),
            ));
        }
        if !(10000..=600000).contains(&self.idle_timeout_ms) {
            return Err(HuddleError::BadRequest(
                "gateway.idle_timeout_ms must be between 10000 and 600000".into(),
            ));
        }
        if self.idle_timeout_ms <= self.ping_interval_ms {
            return Err(HuddleError::BadRequest(
                "gateway.idle_timeout_ms must be greater than ping_interval_ms".into(),
            ));
        }
        if !(1..=65536).contains(&self.outbound_queue) {
            return Err(HuddleError::BadRequest(
                "gateway.outbound_queue must be between 1 and 65536".into(),
            ));
        }
        if !(1..=30000).contains(&self.send_timeout_ms) {
            return Err(HuddleError::BadRequest(
                "gateway.send_timeout_ms must be between 1 and 30000".into(),
            ));
        }
        Ok(())
    }
}

fn default_listen() -> String {
    "0.0.0.0:8080".into()
}
fn default_ping_interval_ms() -> u64 {
    20000
}
fn default_idle_timeout_ms() -> u64 {
    60000
}
fn default_outbound_queue() -> usize {
    1024
}
fn default_send_timeout_ms() -> u64 {
    1500
}

/// Meeting authority endpoint.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AuthoritySection {
    pub base_url: String,

    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,

    /// Bearer token sent on every authority call, if set.
    #[serde(default)]
    pub service_token: Option<String>,
}

impl AuthoritySection {
    pub fn validate(&self) -> Result<()> {
        if !(self.base_url.starts_with("http://") || self.base_url.starts_with("https://")) {
            return Err(HuddleError::BadRequest(
                "authority.base_url must start with http:// or https://".into(),
            ));
        }
        if !(100..=60000).contains(&self.request_timeout_ms) {
            return Err(HuddleError::BadRequest(
                "authority.request_timeout_ms must be between 100 and 60000".into(),
            ));
        }
        Ok(())
    }
}

fn default_request_timeout_ms() -> u64 {
    5000
}

/// Chat history replay and retention.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HistorySection {
    /// Messages replayed to a joining connection.
    #[serde(default = "default_history_limit")]
    pub limit: usize,

    /// Messages retained per room by the in-memory store.
    #[serde(default = "default_max_per_room")]
    pub max_per_room: usize,
}

impl Default for HistorySection {
    fn default() -> Self {
        Self {
            limit: default_history_limit(),
            max_per_room: default_max_per_room(),
        }
    }
}

impl HistorySection {
    pub fn validate(&self) -> Result<()> {
        if !(1..=500).contains(&self.limit) {
            return Err(HuddleError::BadRequest(
                "history.limit must be between 1 and 500".into(),
            ));
        }
        if self.max_per_room < self.limit {
            return Err(HuddleError::BadRequest(
                "history.max_per_room must be at least history.limit".into(),
            ));
        }
        Ok(())
    }
}

fn default_history_limit() -> usize {
    DEFAULT_HISTORY_LIMIT
}
fn default_max_per_room() -> usize {
    1000
}
