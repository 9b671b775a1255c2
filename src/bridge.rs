//! Wallet bridge: session resolution, pairing round trips, value transfer
//!
//! `WalletBridge` owns the session store and wraps the pairing-protocol
//! and chain capabilities. It is the one service object handlers share;
//! all per-user wallet state flows through it.

use crate::chain::{ChainQuery, TransactionRequest};
use crate::error::{BridgeError, Result};
use crate::pairing::{ConnectParams, DisconnectReason, PairingClient, PairingProposal, SessionRequest};
use crate::session::SessionStore;
use crate::types::WalletInfo;
use std::sync::Arc;

/// Safety margin applied to session expiry checks
///
/// A session within this margin of expiring is treated as already gone,
/// so a signed request never races its own session teardown.
pub const EXPIRY_MARGIN_MS: u64 = 1_000;

/// Chain namespace the bridge extracts account addresses from
const ACCOUNT_NAMESPACE: &str = "eip155";

/// A session is live iff its expiry is strictly beyond now plus the margin
fn session_is_live(expiry_secs: u64, now_ms: u64) -> bool {
    expiry_secs.saturating_mul(1_000) > now_ms + EXPIRY_MARGIN_MS
}

/// Address segment of a `namespace:chainId:address` account identifier
///
/// Malformed identifiers yield the empty string rather than an error.
fn account_address(account: &str) -> String {
    account.split(':').nth(2).unwrap_or("").to_string()
}

fn now_millis() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

/// Wallet-session bridging service
pub struct WalletBridge {
    pairing: Arc<dyn PairingClient>,
    sessions: SessionStore,
    chain: ChainQuery,
    chain_id: u64,
}

impl WalletBridge {
    pub fn new(pairing: Arc<dyn PairingClient>, chain: ChainQuery, chain_id: u64) -> Self {
        Self {
            pairing,
            sessions: SessionStore::new(),
            chain,
            chain_id,
        }
    }

    /// The chain query facade
    pub fn chain(&self) -> &ChainQuery {
        &self.chain
    }

    /// Chain identifier string for session requests (e.g. `eip155:1001`)
    pub fn chain_ref(&self) -> String {
        format!("eip155:{}", self.chain_id)
    }

    /// Record the session topic for a user (overwrites any previous one)
    pub async fn record_session(&self, user: &str, topic: &str) {
        self.sessions.set_topic(user, topic).await;
        tracing::info!(user = %user, topic = %topic, "Session recorded");
    }

    /// Current session topic for a user, if any
    pub async fn topic(&self, user: &str) -> Option<String> {
        self.sessions.get_topic(user).await
    }

    /// Resolve the user's wallet, applying expiry policy
    ///
    /// Returns `None` when the user has no topic, the session cannot be
    /// looked up, or the session expires within the safety margin. Lookup
    /// failures are never escalated. A stale topic mapping is left in
    /// place; it dies on disconnect or overwrite.
    pub async fn wallet_info(&self, user: &str) -> Option<WalletInfo> {
        let topic = self.sessions.get_topic(user).await?;
        let session = self.pairing.session(&topic)?;

        if !session_is_live(session.expiry, now_millis()) {
            tracing::debug!(user = %user, topic = %topic, "Session expired");
            return None;
        }

        let addresses = session
            .namespaces
            .get(ACCOUNT_NAMESPACE)
            .map(|ns| ns.accounts.iter().map(|a| account_address(a)).collect())
            .unwrap_or_default();

        Some(WalletInfo {
            peer_name: session.peer_name,
            redirect: session.redirect,
            addresses,
        })
    }

    /// Initiate a pairing proposal with the fixed capability set
    pub async fn initiate(&self) -> Result<PairingProposal> {
        self.pairing
            .connect(ConnectParams::for_chain(self.chain_id))
            .await
    }

    /// Submit a minimal native value transfer over an established session
    ///
    /// Queries gas price and gas estimate, then issues one signed
    /// send-transaction request. Every failure surfaces as `RequestFailed`
    /// so the caller can tell the user the transfer did not happen.
    pub async fn submit_value_transfer(
        &self,
        topic: &str,
        from: &str,
        to: &str,
        value: &str,
    ) -> Result<String> {
        let method = "eth_sendTransaction";
        let request_failed = |reason: String| BridgeError::RequestFailed {
            method: method.to_string(),
            reason,
        };

        let tx = TransactionRequest::value_transfer(from, to, value);
        let gas_price = self
            .chain
            .gas_price_hex()
            .await
            .map_err(|e| request_failed(e.to_string()))?;
        let gas_limit = self
            .chain
            .estimate_gas_hex(&tx)
            .await
            .map_err(|e| request_failed(e.to_string()))?;

        let result = self
            .pairing
            .request(SessionRequest {
                topic: topic.to_string(),
                chain: self.chain_ref(),
                method: method.to_string(),
                params: serde_json::json!([{
                    "from": tx.from,
                    "to": tx.to,
                    "data": tx.data,
                    "gasPrice": gas_price,
                    "gasLimit": gas_limit,
                    "value": tx.value,
                }]),
            })
            .await
            .map_err(|e| request_failed(e.to_string()))?;

        let tx_id = result
            .as_str()
            .map(str::to_owned)
            .unwrap_or_else(|| result.to_string());

        tracing::info!(topic = %topic, tx_id = %tx_id, "Value transfer submitted");
        Ok(tx_id)
    }

    /// Tear down the user's session and forget the mapping
    ///
    /// Disconnect is attempted first; its failure is logged and does not
    /// block removal of the local mapping.
    pub async fn disconnect_user(&self, user: &str) -> Result<()> {
        if let Some(topic) = self.sessions.get_topic(user).await {
            if let Err(e) = self
                .pairing
                .disconnect(&topic, DisconnectReason::user_disconnected())
                .await
            {
                tracing::warn!(
                    user = %user,
                    topic = %topic,
                    error = %e,
                    "Pairing disconnect failed; removing mapping anyway"
                );
            }
        }
        self.sessions.delete_topic(user).await;
        Ok(())
    }
}
