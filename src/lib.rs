//! # chatbridge
//!
//! Chat-bot wallet bridge: pair a blockchain wallet from a messaging app,
//! inspect it, and submit a test value transfer.
//!
//! ## Overview
//!
//! `chatbridge` connects messaging-platform webhooks to a wallet pairing
//! protocol over a realtime broadcast broker. One edge receiver accepts
//! webhook calls from every platform, classifies each body to its
//! provider, and republishes it on that provider's channel; a worker
//! subscribes, parses commands, and drives the wallet session. Platforms
//! whose webhook call must carry the answer in its HTTP response are
//! served through a correlated return channel with a bounded wait.
//!
//! ## Quick Start
//!
//! ```rust
//! use chatbridge::broker::MemoryBroker;
//! use chatbridge::webhook::WebhookReceiver;
//! use std::sync::Arc;
//!
//! # async fn example() -> chatbridge::Result<()> {
//! // Edge receiver over an in-process broker
//! let broker = Arc::new(MemoryBroker::default());
//! let receiver = WebhookReceiver::new(broker);
//!
//! // An async-provider webhook is acknowledged immediately
//! let reply = receiver
//!     .handle(serde_json::json!({"destination": "U1", "events": []}))
//!     .await?;
//! assert_eq!(reply, serde_json::json!({}));
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! - **Broker** trait — broadcast transport (NATS, in-memory)
//! - **WebhookReceiver** — edge: classify, republish, bounded reply wait
//! - **EventRelay** — worker: channel subscriptions fanned into handlers
//! - **Dispatcher** — platform-neutral command handling
//! - **WalletBridge** — pairing sessions, balance, value transfer

pub mod bot;
pub mod bridge;
pub mod broker;
pub mod chain;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod pairing;
pub mod relay;
pub mod session;
pub mod types;
pub mod webhook;

// Re-export core types
pub use bot::BotService;
pub use bridge::WalletBridge;
pub use broker::{Broadcast, Broker, BrokerSubscription};
pub use chain::{ChainQuery, ChainRpc};
pub use config::BridgeConfig;
pub use dispatch::{Dispatcher, MenuLink, Messenger, WalletLinks};
pub use error::{BridgeError, Result};
pub use pairing::{PairingClient, PairingProposal, SessionInfo};
pub use relay::EventRelay;
pub use types::{Command, Provider, WalletInfo};
pub use webhook::WebhookReceiver;
