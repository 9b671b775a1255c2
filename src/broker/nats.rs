//! NATS broker backend
//!
//! Implements `Broker` over core NATS publish/subscribe. The broadcast
//! contract here needs no persistence or redelivery, so plain subjects
//! are enough: one subject per channel under a configurable prefix.

use super::{Broadcast, Broker, BrokerSubscription};
use crate::error::{BridgeError, Result};
use async_trait::async_trait;
use futures::StreamExt;
use std::time::Duration;

/// NATS broker configuration
#[derive(Debug, Clone)]
pub struct NatsBrokerConfig {
    /// Server URL (e.g. `nats://localhost:4222`)
    pub url: String,

    /// Optional auth token
    pub token: Option<String>,

    /// Subject prefix; channel `line` maps to subject `<prefix>.line`
    pub subject_prefix: String,

    /// Connection timeout in seconds
    pub connect_timeout_secs: u64,
}

impl Default for NatsBrokerConfig {
    fn default() -> Self {
        Self {
            url: "nats://localhost:4222".to_string(),
            token: None,
            subject_prefix: "chat".to_string(),
            connect_timeout_secs: 10,
        }
    }
}

impl NatsBrokerConfig {
    /// Build a config from the broker URL and optional token
    pub fn new(url: impl Into<String>, token: Option<String>) -> Self {
        Self {
            url: url.into(),
            token,
            ..Default::default()
        }
    }

    /// Full subject for a channel name
    pub fn subject(&self, channel: &str) -> String {
        format!("{}.{}", self.subject_prefix, channel)
    }
}

/// NATS broadcast broker
pub struct NatsBroker {
    client: async_nats::Client,
    config: NatsBrokerConfig,
}

impl NatsBroker {
    /// Connect to the NATS server
    pub async fn connect(config: NatsBrokerConfig) -> Result<Self> {
        let mut opts = async_nats::ConnectOptions::new()
            .connection_timeout(Duration::from_secs(config.connect_timeout_secs));

        if let Some(ref token) = config.token {
            opts = opts.token(token.clone());
        }

        let client = opts
            .connect(&config.url)
            .await
            .map_err(|e| BridgeError::Connection(format!("{}: {}", config.url, e)))?;

        tracing::info!(url = %config.url, "Connected to NATS");

        Ok(Self { client, config })
    }

    /// Get the configuration
    pub fn config(&self) -> &NatsBrokerConfig {
        &self.config
    }
}

#[async_trait]
impl Broker for NatsBroker {
    async fn publish(&self, channel: &str, message: &Broadcast) -> Result<()> {
        let payload = bytes::Bytes::from(serde_json::to_vec(message)?);

        self.client
            .publish(self.config.subject(channel), payload)
            .await
            .map_err(|e| BridgeError::Publish {
                channel: channel.to_string(),
                reason: e.to_string(),
            })?;

        // Flush so subscribe-before-publish ordering holds across processes
        self.client
            .flush()
            .await
            .map_err(|e| BridgeError::Publish {
                channel: channel.to_string(),
                reason: format!("flush failed: {}", e),
            })?;

        tracing::debug!(
            channel = %channel,
            event = %message.event,
            "Broadcast published"
        );
        Ok(())
    }

    async fn subscribe(&self, channel: &str) -> Result<Box<dyn BrokerSubscription>> {
        let subscriber = self
            .client
            .subscribe(self.config.subject(channel))
            .await
            .map_err(|e| BridgeError::Subscribe {
                channel: channel.to_string(),
                reason: e.to_string(),
            })?;

        tracing::info!(channel = %channel, "Subscribed");

        Ok(Box::new(NatsSubscription { subscriber }))
    }

    fn name(&self) -> &str {
        "nats"
    }
}

/// Subscription handle backed by a core NATS subscriber
pub struct NatsSubscription {
    subscriber: async_nats::Subscriber,
}

#[async_trait]
impl BrokerSubscription for NatsSubscription {
    async fn next(&mut self) -> Result<Option<Broadcast>> {
        loop {
            match self.subscriber.next().await {
                Some(message) => match serde_json::from_slice::<Broadcast>(&message.payload) {
                    Ok(broadcast) => return Ok(Some(broadcast)),
                    Err(e) => {
                        tracing::warn!(
                            subject = %message.subject,
                            error = %e,
                            "Dropping undecodable broadcast"
                        );
                        continue;
                    }
                },
                None => return Ok(None),
            }
        }
    }
}
