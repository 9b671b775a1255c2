//! Command dispatch: parsed commands to wallet actions and replies
//!
//! The `Dispatcher` is platform-neutral: it speaks to the user through
//! the `Messenger` trait and to the wallet through `WalletBridge`. A
//! handler failure is contained here; the user gets a notice and the
//! dispatcher stays up.

use crate::bridge::WalletBridge;
use crate::config::BridgeConfig;
use crate::error::{BridgeError, Result};
use crate::types::{Command, WalletInfo};
use async_trait::async_trait;
use std::sync::Arc;
use urlencoding::encode;

/// Destination of the hard-coded value transfer
pub const ZERO_ADDRESS: &str = "0x0000000000000000000000000000000000000000";

/// Amount of the hard-coded value transfer, in hex base units
pub const TRANSFER_VALUE: &str = "0x1";

/// One tappable link presented alongside a message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MenuLink {
    pub label: String,
    pub uri: String,
}

impl MenuLink {
    pub fn new(label: impl Into<String>, uri: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            uri: uri.into(),
        }
    }
}

/// Outbound messaging capability
///
/// One implementation per delivery path: provider push APIs for
/// asynchronous sends, and the in-band reply body for platforms that
/// answer inside the webhook response.
#[async_trait]
pub trait Messenger: Send + Sync {
    /// Send a plain text message
    async fn send_text(&self, to: &str, text: &str) -> Result<()>;

    /// Send a text message with tappable links
    async fn send_links(&self, to: &str, text: &str, links: &[MenuLink]) -> Result<()>;
}

/// Deep-link builder for the supported wallet apps
#[derive(Debug, Clone)]
pub struct WalletLinks {
    compact_base: String,
    tall_base: String,
    explorer_tx_base: String,
}

impl WalletLinks {
    pub fn new(
        compact_base: impl Into<String>,
        tall_base: impl Into<String>,
        explorer_tx_base: impl Into<String>,
    ) -> Self {
        Self {
            compact_base: compact_base.into(),
            tall_base: tall_base.into(),
            explorer_tx_base: explorer_tx_base.into(),
        }
    }

    pub fn from_config(config: &BridgeConfig) -> Self {
        Self::new(
            config.wallet_url_compact.clone(),
            config.wallet_url_tall.clone(),
            config.explorer_tx_base.clone(),
        )
    }

    /// Wallet chooser links for a fresh pairing URI
    ///
    /// The URI is double-encoded for MetaMask: once inside the deep-link
    /// scheme, once more as the outer query parameter.
    pub fn chooser(&self, pairing_uri: &str) -> Vec<MenuLink> {
        let metamask_deep = format!("metamask://wc?uri={}", encode(pairing_uri));
        vec![
            MenuLink::new(
                "Metamask",
                format!(
                    "{}/open/wallet/?url={}",
                    self.compact_base,
                    encode(&metamask_deep)
                ),
            ),
            MenuLink::new(
                "Mini Wallet",
                format!("{}/wc/?uri={}", self.tall_base, encode(pairing_uri)),
            ),
        ]
    }

    /// Link that re-opens the connected wallet app for confirmation
    ///
    /// Unrecognized wallets get no link; the user opens the app manually.
    pub fn open_wallet(&self, wallet: &WalletInfo) -> String {
        match wallet.peer_name.as_str() {
            "MetaMask Wallet" => {
                let universal = wallet
                    .redirect
                    .as_ref()
                    .and_then(|r| r.universal.as_deref())
                    .unwrap_or("");
                format!("{}/open/wallet/?url={}", self.compact_base, encode(universal))
            }
            "Mini Wallet" => self.tall_base.clone(),
            _ => String::new(),
        }
    }

    /// Block-explorer URL for a transaction id
    pub fn explorer_tx(&self, tx_id: &str) -> String {
        format!("{}{}", self.explorer_tx_base, tx_id)
    }
}

/// Platform-neutral command dispatcher
pub struct Dispatcher {
    bridge: Arc<WalletBridge>,
    links: WalletLinks,
}

impl Dispatcher {
    pub fn new(bridge: Arc<WalletBridge>, links: WalletLinks) -> Self {
        Self { bridge, links }
    }

    /// Handle one inbound text message from a user
    ///
    /// Errors never escape: the user gets a failure notice and the error
    /// is logged. Transfer failures get a distinct notice so the user
    /// knows no money moved.
    pub async fn dispatch(&self, messenger: &dyn Messenger, user: &str, text: &str) {
        let command = Command::parse(text);
        tracing::info!(user = %user, command = %command, "Dispatching command");

        let outcome = match command {
            Command::Connect => self.handle_connect(messenger, user).await,
            Command::MyWallet => self.handle_my_wallet(messenger, user).await,
            Command::SendTx => self.handle_send_tx(messenger, user).await,
            Command::Disconnect => self.handle_disconnect(messenger, user).await,
            Command::Status => self.handle_status(messenger, user).await,
            Command::Help => self.handle_help(messenger, user).await,
        };

        if let Err(e) = outcome {
            tracing::warn!(user = %user, command = %command, error = %e, "Command failed");
            let notice = match e {
                BridgeError::RequestFailed { .. } => "Transaction failed, nothing was sent",
                _ => "Something went wrong, please try again",
            };
            if let Err(send_err) = messenger.send_text(user, notice).await {
                tracing::warn!(user = %user, error = %send_err, "Failure notice undeliverable");
            }
        }
    }

    async fn handle_connect(&self, messenger: &dyn Messenger, user: &str) -> Result<()> {
        if let Some(wallet) = self.bridge.wallet_info(user).await {
            let text = format!(
                "You have already connect {}\nYour address: {}\n\nDisconnect wallet firstly to connect a new one",
                wallet.peer_name,
                wallet.first_address()
            );
            return messenger.send_text(user, &text).await;
        }

        let proposal = self.bridge.initiate().await?;
        let Some(uri) = proposal.uri else {
            // No URI means nothing to show the user; pairing cannot proceed
            tracing::warn!(user = %user, "Pairing proposal produced no URI");
            return Ok(());
        };

        messenger
            .send_links(user, "Choose your wallet", &self.links.chooser(&uri))
            .await?;

        let session = proposal.approval.await?;
        self.bridge.record_session(user, &session.topic).await;

        let text = format!("{} connected successfully", session.peer_name);
        messenger.send_text(user, &text).await
    }

    async fn handle_my_wallet(&self, messenger: &dyn Messenger, user: &str) -> Result<()> {
        let Some(wallet) = self.bridge.wallet_info(user).await else {
            return messenger.send_text(user, "You didn't connect a wallet").await;
        };

        let address = wallet.first_address();
        let balance = self.bridge.chain().balance_display(address).await?;
        let text = format!(
            "Connected wallet: {}\nYour address: {}\nYour balance: {}",
            wallet.peer_name, address, balance
        );
        messenger.send_text(user, &text).await
    }

    async fn handle_send_tx(&self, messenger: &dyn Messenger, user: &str) -> Result<()> {
        let Some(wallet) = self.bridge.wallet_info(user).await else {
            return messenger
                .send_text(user, "Connect wallet to send transaction")
                .await;
        };

        let prompt = format!("Open {} and confirm transaction", wallet.peer_name);
        let open_link = self.links.open_wallet(&wallet);
        let links = if open_link.is_empty() {
            vec![]
        } else {
            vec![MenuLink::new("Open Wallet", open_link)]
        };
        messenger.send_links(user, &prompt, &links).await?;

        // wallet_info returned Some, so the topic is present
        let topic = self
            .bridge
            .topic(user)
            .await
            .ok_or_else(|| BridgeError::Pairing("session vanished mid-command".to_string()))?;

        let tx_id = self
            .bridge
            .submit_value_transfer(&topic, wallet.first_address(), ZERO_ADDRESS, TRANSFER_VALUE)
            .await?;

        let text = format!("Transaction result\n{}", self.links.explorer_tx(&tx_id));
        messenger.send_text(user, &text).await
    }

    async fn handle_disconnect(&self, messenger: &dyn Messenger, user: &str) -> Result<()> {
        if self.bridge.topic(user).await.is_none() {
            return messenger.send_text(user, "Nothing to disconnect").await;
        }

        self.bridge.disconnect_user(user).await?;
        messenger.send_text(user, "Wallet has been disconnected").await
    }

    async fn handle_status(&self, messenger: &dyn Messenger, user: &str) -> Result<()> {
        let summary = self.bridge.chain().block_summary().await?;
        messenger.send_text(user, &summary).await
    }

    async fn handle_help(&self, messenger: &dyn Messenger, user: &str) -> Result<()> {
        let text = "Hello! I can help you pair a wallet and move funds.\n\n\
                    /connect - pair a wallet\n\
                    /my_wallet - wallet address and balance\n\
                    /send_tx - send a test transaction\n\
                    /disconnect - unpair the wallet\n\
                    /status - current chain status";
        messenger.send_text(user, text).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::RedirectMetadata;

    fn links() -> WalletLinks {
        WalletLinks::new(
            "https://compact.example",
            "https://tall.example",
            "https://scope.example/tx/",
        )
    }

    #[test]
    fn test_chooser_links() {
        let chooser = links().chooser("wc:topic@2?relay=x");
        assert_eq!(chooser.len(), 2);

        assert_eq!(chooser[0].label, "Metamask");
        // Double encoding: the inner URI percent signs are re-encoded
        assert!(chooser[0]
            .uri
            .starts_with("https://compact.example/open/wallet/?url=metamask%3A%2F%2Fwc%3Furi%3D"));
        assert!(chooser[0].uri.contains("wc%253Atopic%25402"));

        assert_eq!(chooser[1].label, "Mini Wallet");
        assert_eq!(
            chooser[1].uri,
            "https://tall.example/wc/?uri=wc%3Atopic%402%3Frelay%3Dx"
        );
    }

    #[test]
    fn test_open_wallet_metamask() {
        let wallet = WalletInfo {
            peer_name: "MetaMask Wallet".to_string(),
            redirect: Some(RedirectMetadata {
                native: None,
                universal: Some("https://metamask.app.link".to_string()),
            }),
            addresses: vec![],
        };
        assert_eq!(
            links().open_wallet(&wallet),
            "https://compact.example/open/wallet/?url=https%3A%2F%2Fmetamask.app.link"
        );
    }

    #[test]
    fn test_open_wallet_mini() {
        let wallet = WalletInfo {
            peer_name: "Mini Wallet".to_string(),
            redirect: None,
            addresses: vec![],
        };
        assert_eq!(links().open_wallet(&wallet), "https://tall.example");
    }

    #[test]
    fn test_open_wallet_unknown_is_empty() {
        let wallet = WalletInfo {
            peer_name: "Rainbow".to_string(),
            redirect: None,
            addresses: vec![],
        };
        assert_eq!(links().open_wallet(&wallet), "");
    }

    #[test]
    fn test_explorer_tx() {
        assert_eq!(
            links().explorer_tx("0xdeadbeef"),
            "https://scope.example/tx/0xdeadbeef"
        );
    }
}
