//! Core types for the chatbridge system
//!
//! Wire-facing types use camelCase JSON serialization to match the
//! messaging platforms' payload conventions.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Messaging platform originating an inbound webhook call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    Line,
    Kakao,
}

impl Provider {
    /// Broadcast channel name for this provider
    pub fn channel(&self) -> &'static str {
        match self {
            Provider::Line => "line",
            Provider::Kakao => "kakao",
        }
    }

    /// Broadcast event name carried on the provider channel
    pub fn webhook_event(&self) -> String {
        format!("{}:webhook", self.channel())
    }

    /// Whether this provider's webhook protocol requires an inline
    /// synchronous HTTP response body
    pub fn requires_sync_reply(&self) -> bool {
        matches!(self, Provider::Kakao)
    }

    /// Parse a channel name back into a provider
    pub fn from_channel(channel: &str) -> Option<Self> {
        match channel {
            "line" => Some(Provider::Line),
            "kakao" => Some(Provider::Kakao),
            _ => None,
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.channel())
    }
}

/// Wallet-app redirect metadata declared by the peer during pairing
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RedirectMetadata {
    /// Native deep-link scheme (e.g. `metamask://`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub native: Option<String>,

    /// Universal link
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub universal: Option<String>,
}

/// Read-only view of a live pairing session
///
/// Computed on demand from the session; never cached, because expiry
/// must be re-checked on every resolving call.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletInfo {
    /// Peer wallet display name
    pub peer_name: String,

    /// Redirect metadata, when the wallet declared any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub redirect: Option<RedirectMetadata>,

    /// Account addresses from the recognized chain namespace
    pub addresses: Vec<String>,
}

impl WalletInfo {
    /// First account address, or the empty string if none
    pub fn first_address(&self) -> &str {
        self.addresses.first().map(String::as_str).unwrap_or("")
    }
}

/// Text command recognized by the dispatcher
///
/// Identical across platforms. Unrecognized text falls back to `Help`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Connect,
    MyWallet,
    SendTx,
    Disconnect,
    Status,
    Help,
}

impl Command {
    /// Parse a command string; anything unrecognized is `Help`
    pub fn parse(text: &str) -> Self {
        match text.trim() {
            "/connect" => Command::Connect,
            "/my_wallet" => Command::MyWallet,
            "/send_tx" => Command::SendTx,
            "/disconnect" => Command::Disconnect,
            "/status" => Command::Status,
            _ => Command::Help,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Command::Connect => "/connect",
            Command::MyWallet => "/my_wallet",
            Command::SendTx => "/send_tx",
            Command::Disconnect => "/disconnect",
            Command::Status => "/status",
            Command::Help => "help",
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
