//! Shared test doubles for the integration tests

use async_trait::async_trait;
use chatbridge::chain::{BlockHeader, ChainRpc, TransactionRequest};
use chatbridge::dispatch::{MenuLink, Messenger};
use chatbridge::error::{BridgeError, Result};
use chatbridge::pairing::{
    ConnectParams, DisconnectReason, NamespaceAccounts, PairingClient, PairingProposal,
    SessionInfo, SessionRequest,
};
use chatbridge::types::RedirectMetadata;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// A session expiring one hour from now for the given topic
pub fn live_session(topic: &str, peer_name: &str, address: &str) -> SessionInfo {
    let now_secs = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_secs();

    SessionInfo {
        topic: topic.to_string(),
        expiry: now_secs + 3_600,
        peer_name: peer_name.to_string(),
        redirect: Some(RedirectMetadata {
            native: Some("metamask://".to_string()),
            universal: Some("https://metamask.app.link".to_string()),
        }),
        namespaces: HashMap::from([(
            "eip155".to_string(),
            NamespaceAccounts {
                accounts: vec![format!("eip155:1001:{}", address)],
            },
        )]),
    }
}

/// Scriptable pairing client with call counters
#[derive(Default)]
pub struct MockPairing {
    sessions: Arc<Mutex<HashMap<String, SessionInfo>>>,
    pub connect_calls: AtomicUsize,
    pub requests: Mutex<Vec<SessionRequest>>,
    pub disconnects: Mutex<Vec<(String, DisconnectReason)>>,
    proposal_uri: Mutex<Option<String>>,
    approval_session: Mutex<Option<SessionInfo>>,
    request_result: Mutex<Option<serde_json::Value>>,
}

impl MockPairing {
    pub fn new() -> Self {
        Self::default()
    }

    /// Script the next `connect` call: this URI, approval resolving to
    /// this session
    pub fn with_proposal(self, uri: &str, session: SessionInfo) -> Self {
        *self.proposal_uri.lock().unwrap() = Some(uri.to_string());
        *self.approval_session.lock().unwrap() = Some(session);
        self
    }

    /// Script the result of the next session request
    pub fn with_request_result(self, result: serde_json::Value) -> Self {
        *self.request_result.lock().unwrap() = Some(result);
        self
    }
}

#[async_trait]
impl PairingClient for MockPairing {
    async fn connect(&self, _params: ConnectParams) -> Result<PairingProposal> {
        self.connect_calls.fetch_add(1, Ordering::SeqCst);

        let uri = self.proposal_uri.lock().unwrap().clone();
        let session = self
            .approval_session
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| BridgeError::Pairing("no scripted approval".to_string()))?;

        // Approval also registers the session for later lookups, the way
        // a real client would
        let sessions = Arc::clone(&self.sessions);
        Ok(PairingProposal {
            uri,
            approval: Box::pin(async move {
                sessions
                    .lock()
                    .unwrap()
                    .insert(session.topic.clone(), session.clone());
                Ok(session)
            }),
        })
    }

    async fn request(&self, request: SessionRequest) -> Result<serde_json::Value> {
        let result = self
            .request_result
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| BridgeError::Pairing("no scripted request result".to_string()))?;
        self.requests.lock().unwrap().push(request);
        Ok(result)
    }

    async fn disconnect(&self, topic: &str, reason: DisconnectReason) -> Result<()> {
        self.sessions.lock().unwrap().remove(topic);
        self.disconnects
            .lock()
            .unwrap()
            .push((topic.to_string(), reason));
        Ok(())
    }

    fn session(&self, topic: &str) -> Option<SessionInfo> {
        self.sessions.lock().unwrap().get(topic).cloned()
    }
}

/// Fixed-value chain RPC with call counters
#[derive(Default)]
pub struct MockRpc {
    pub gas_price_calls: AtomicUsize,
    pub estimate_calls: AtomicUsize,
    pub balance_calls: AtomicUsize,
}

#[async_trait]
impl ChainRpc for MockRpc {
    async fn gas_price(&self) -> Result<u128> {
        self.gas_price_calls.fetch_add(1, Ordering::SeqCst);
        Ok(25_000_000_000)
    }

    async fn estimate_gas(&self, _tx: &TransactionRequest) -> Result<u64> {
        self.estimate_calls.fetch_add(1, Ordering::SeqCst);
        Ok(21_000)
    }

    async fn balance(&self, _address: &str) -> Result<u128> {
        self.balance_calls.fetch_add(1, Ordering::SeqCst);
        Ok(2_500_000_000_000_000_000)
    }

    async fn latest_block(&self) -> Result<BlockHeader> {
        Ok(BlockHeader {
            number: 123_456,
            timestamp: 1_700_000_000,
            base_fee_per_gas: 25_000_000_000,
        })
    }
}

/// Recorded outbound message
#[derive(Debug, Clone)]
pub struct SentMessage {
    pub to: String,
    pub text: String,
    pub links: Vec<MenuLink>,
}

/// Messenger that records every send
#[derive(Default)]
pub struct RecordingMessenger {
    sent: Mutex<Vec<SentMessage>>,
}

impl RecordingMessenger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> Vec<SentMessage> {
        self.sent.lock().unwrap().clone()
    }

    pub fn texts(&self) -> Vec<String> {
        self.sent().into_iter().map(|m| m.text).collect()
    }
}

/// Messenger whose first text send is rejected; later sends record
///
/// Models a transient platform delivery failure, letting tests observe
/// the dispatcher's fallback notice.
#[derive(Default)]
pub struct FailOnceMessenger {
    inner: RecordingMessenger,
    failed: AtomicBool,
}

impl FailOnceMessenger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn texts(&self) -> Vec<String> {
        self.inner.texts()
    }
}

#[async_trait]
impl Messenger for FailOnceMessenger {
    async fn send_text(&self, to: &str, text: &str) -> Result<()> {
        if !self.failed.swap(true, Ordering::SeqCst) {
            return Err(BridgeError::Messaging("delivery rejected".to_string()));
        }
        self.inner.send_text(to, text).await
    }

    async fn send_links(&self, to: &str, text: &str, links: &[MenuLink]) -> Result<()> {
        self.inner.send_links(to, text, links).await
    }
}

#[async_trait]
impl Messenger for RecordingMessenger {
    async fn send_text(&self, to: &str, text: &str) -> Result<()> {
        self.sent.lock().unwrap().push(SentMessage {
            to: to.to_string(),
            text: text.to_string(),
            links: vec![],
        });
        Ok(())
    }

    async fn send_links(&self, to: &str, text: &str, links: &[MenuLink]) -> Result<()> {
        self.sent.lock().unwrap().push(SentMessage {
            to: to.to_string(),
            text: text.to_string(),
            links: links.to_vec(),
        });
        Ok(())
    }
}
