//! Gateway config loader (strict parsing).

pub mod schema;

use std::fs;

use huddle_core::error::{HuddleError, Result};

pub use schema::{AuthoritySection, GatewayConfig, GatewaySection, HistorySection};

/// Env var overriding the config file path.
pub const CONFIG_PATH_ENV: &str = "HUDDLE_CONFIG";
pub const DEFAULT_CONFIG_PATH: &str = "huddle.yaml";

pub fn load_from_file(path: &str) -> Result<GatewayConfig> {
    let s = fs::read_to_string(path)
        .map_err(|e| HuddleError::Internal(format!("read config failed ({path}): {e}")))?;
    load_from_str(&s)
}

pub fn load_from_str(s: &str) -> Result<GatewayConfig> {
    let cfg: GatewayConfig = serde_yaml::from_str(s)
        .map_err(|e| HuddleError::BadRequest(format!("invalid yaml: {e}")))?;
    cfg.validate()?;
    Ok(cfg)
}

/// Path from `HUDDLE_CONFIG`, falling back to `huddle.yaml`.
pub fn config_path() -> String {
    std::env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string())
}
