//! Environment-driven configuration
//!
//! All deployment inputs come from the environment: broker coordinates,
//! channel identifiers, chain parameters, platform credentials, and the
//! wallet deep-link bases. `from_env` delegates to an injectable lookup
//! function so tests never have to mutate process-wide state.

use crate::error::{BridgeError, Result};

/// Deployment configuration for both the worker and the webhook receiver
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    /// Realtime broker URL (e.g. `nats://localhost:4222`)
    pub broker_url: String,

    /// Optional broker auth token
    pub broker_token: Option<String>,

    /// Channel identifiers the worker subscribes to
    pub channels: Vec<String>,

    /// Chain id the bridge is scoped to
    pub chain_id: u64,

    /// Chain RPC endpoint URL
    pub rpc_endpoint: String,

    /// Messaging credential for the push platform
    pub line_access_token: Option<String>,

    /// Pairing-protocol project identifier
    pub pairing_project_id: String,

    /// Deep-link base for the compact wallet surface
    pub wallet_url_compact: String,

    /// Deep-link base for the tall wallet surface
    pub wallet_url_tall: String,

    /// Explorer transaction URL base (tx id is appended)
    pub explorer_tx_base: String,

    /// Native currency symbol used in balance and status displays
    pub native_symbol: String,
}

fn default_channels() -> Vec<String> {
    vec!["line".to_string(), "kakao".to_string()]
}

fn default_chain_id() -> u64 {
    1001
}

fn default_explorer_tx_base() -> String {
    "https://baobab.klaytnscope.com/tx/".to_string()
}

fn default_native_symbol() -> String {
    "KAIA".to_string()
}

impl BridgeConfig {
    /// Load configuration from process environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup
    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let required = |key: &str| -> Result<String> {
            get(key)
                .filter(|v| !v.is_empty())
                .ok_or_else(|| {
                    BridgeError::Config(format!("Missing required environment variable: {}", key))
                })
        };

        let channels = match get("CHANNEL_IDS") {
            Some(ids) if !ids.is_empty() => ids
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
            _ => default_channels(),
        };

        let chain_id = match get("CHAIN_ID") {
            Some(id) if !id.is_empty() => id.parse::<u64>().map_err(|e| {
                BridgeError::Config(format!("Invalid CHAIN_ID '{}': {}", id, e))
            })?,
            _ => default_chain_id(),
        };

        Ok(Self {
            broker_url: required("BROKER_URL")?,
            broker_token: get("BROKER_TOKEN").filter(|v| !v.is_empty()),
            channels,
            chain_id,
            rpc_endpoint: required("RPC_ENDPOINT")?,
            line_access_token: get("LINE_CHANNEL_ACCESS_TOKEN").filter(|v| !v.is_empty()),
            pairing_project_id: required("WALLET_CONNECT_PROJECT_ID")?,
            wallet_url_compact: get("MINI_WALLET_URL_COMPACT").unwrap_or_default(),
            wallet_url_tall: get("MINI_WALLET_URL_TALL").unwrap_or_default(),
            explorer_tx_base: get("EXPLORER_TX_BASE")
                .filter(|v| !v.is_empty())
                .unwrap_or_else(default_explorer_tx_base),
            native_symbol: get("NATIVE_SYMBOL")
                .filter(|v| !v.is_empty())
                .unwrap_or_else(default_native_symbol),
        })
    }
}
