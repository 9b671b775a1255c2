//! Pairing-protocol capability
//!
//! The handshake by which a chat user's wallet app and the bot agree on a
//! session (topic) used for later signed requests. The protocol itself is
//! an external collaborator; this module specifies its seam: proposal
//! initiation, signed session requests, disconnect, and session lookup.

use crate::error::Result;
use crate::types::RedirectMetadata;
use async_trait::async_trait;
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Resolves once the remote wallet approves a pairing proposal
pub type ApprovalFuture = BoxFuture<'static, Result<SessionInfo>>;

/// Result of initiating a pairing proposal
///
/// The URI is presented to the user (rendered as a wallet chooser by the
/// messaging adapter); the approval future resolves with the session once
/// the wallet approves.
pub struct PairingProposal {
    /// Pairing URI to present to the user, when the protocol produced one
    pub uri: Option<String>,

    /// Resolves on remote approval
    pub approval: ApprovalFuture,
}

/// Capability set requested in a pairing proposal
///
/// Scoped to a single chain. The method and event lists are fixed by the
/// bridge (see `ConnectParams::for_chain`).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectParams {
    /// Chain identifier (e.g. `eip155:1001`)
    pub chain: String,

    /// Signing methods the session must support
    pub methods: Vec<String>,

    /// Wallet events the session subscribes to
    pub events: Vec<String>,
}

impl ConnectParams {
    /// The fixed capability set: one value-transfer-capable signing
    /// session on the given chain
    pub fn for_chain(chain_id: u64) -> Self {
        Self {
            chain: format!("eip155:{}", chain_id),
            methods: vec![
                "eth_sendTransaction".to_string(),
                "eth_signTransaction".to_string(),
                "eth_sign".to_string(),
                "personal_sign".to_string(),
                "eth_signTypedData".to_string(),
            ],
            events: vec!["chainChanged".to_string(), "accountsChanged".to_string()],
        }
    }
}

/// Accounts negotiated for one chain namespace
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NamespaceAccounts {
    /// Chain-namespace-qualified account identifiers
    /// (`namespace:chainId:address`)
    pub accounts: Vec<String>,
}

/// Metadata of an established pairing session
///
/// Owned by the pairing protocol; the bridge only ever stores the topic.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionInfo {
    /// Opaque session identifier
    pub topic: String,

    /// Expiry as Unix seconds
    pub expiry: u64,

    /// Peer wallet display name
    pub peer_name: String,

    /// Peer redirect metadata, when declared
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub redirect: Option<RedirectMetadata>,

    /// Negotiated accounts per chain namespace
    #[serde(default)]
    pub namespaces: HashMap<String, NamespaceAccounts>,
}

/// A signed request issued over an established session
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionRequest {
    pub topic: String,

    /// Chain identifier the request is scoped to (e.g. `eip155:1001`)
    pub chain: String,

    /// RPC method (e.g. `eth_sendTransaction`)
    pub method: String,

    /// Method parameters
    pub params: serde_json::Value,
}

/// Reason code sent with a session disconnect
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DisconnectReason {
    pub code: u32,
    pub message: String,
}

impl DisconnectReason {
    /// The standard "user disconnected" reason
    pub fn user_disconnected() -> Self {
        Self {
            code: 6000,
            message: "User disconnected.".to_string(),
        }
    }
}

/// Core trait for the pairing-protocol backend
#[async_trait]
pub trait PairingClient: Send + Sync {
    /// Initiate a pairing proposal with the given capability set
    async fn connect(&self, params: ConnectParams) -> Result<PairingProposal>;

    /// Issue a signed request over an established session
    async fn request(&self, request: SessionRequest) -> Result<serde_json::Value>;

    /// Disconnect a session with a reason code
    async fn disconnect(&self, topic: &str, reason: DisconnectReason) -> Result<()>;

    /// Look up a live session by topic
    ///
    /// Unknown topics and protocol-level lookup failures both resolve to
    /// `None`; the caller treats them uniformly as "no session".
    fn session(&self, topic: &str) -> Option<SessionInfo>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connect_params_for_chain() {
        let params = ConnectParams::for_chain(1001);
        assert_eq!(params.chain, "eip155:1001");
        assert_eq!(params.methods.len(), 5);
        assert!(params.methods.contains(&"eth_sendTransaction".to_string()));
        assert!(params.methods.contains(&"personal_sign".to_string()));
        assert_eq!(
            params.events,
            vec!["chainChanged".to_string(), "accountsChanged".to_string()]
        );
    }

    #[test]
    fn test_user_disconnected_reason() {
        let reason = DisconnectReason::user_disconnected();
        assert_eq!(reason.code, 6000);
        assert_eq!(reason.message, "User disconnected.");
    }

    #[test]
    fn test_session_request_serialization() {
        let request = SessionRequest {
            topic: "topic-1".to_string(),
            chain: "eip155:1001".to_string(),
            method: "eth_sendTransaction".to_string(),
            params: serde_json::json!([{"from": "0xabc"}]),
        };

        let json = serde_json::to_string(&request).unwrap();
        assert!(json.contains("\"topic\":\"topic-1\""));
        assert!(json.contains("\"method\":\"eth_sendTransaction\""));
    }

    #[test]
    fn test_session_info_defaults() {
        let json = r#"{"topic": "t", "expiry": 1700000000, "peerName": "MetaMask Wallet"}"#;
        let session: SessionInfo = serde_json::from_str(json).unwrap();
        assert!(session.redirect.is_none());
        assert!(session.namespaces.is_empty());
    }
}
