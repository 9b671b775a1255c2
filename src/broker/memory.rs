//! In-memory broker for testing and single-process use
//!
//! Backed by one tokio broadcast channel per channel name. Subscribers
//! only see messages published after they subscribe, matching the
//! realtime-broker semantics the system relies on.

use super::{Broadcast, Broker, BrokerSubscription};
use crate::error::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::{broadcast, RwLock};

const DEFAULT_CAPACITY: usize = 256;

/// In-memory broadcast broker
pub struct MemoryBroker {
    channels: RwLock<HashMap<String, broadcast::Sender<Broadcast>>>,
    capacity: usize,
}

impl MemoryBroker {
    /// Create a broker with a per-channel buffer capacity
    pub fn new(capacity: usize) -> Self {
        Self {
            channels: RwLock::new(HashMap::new()),
            capacity,
        }
    }

    async fn sender(&self, channel: &str) -> broadcast::Sender<Broadcast> {
        {
            let channels = self.channels.read().await;
            if let Some(tx) = channels.get(channel) {
                return tx.clone();
            }
        }

        let mut channels = self.channels.write().await;
        channels
            .entry(channel.to_string())
            .or_insert_with(|| broadcast::channel(self.capacity).0)
            .clone()
    }
}

impl Default for MemoryBroker {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

#[async_trait]
impl Broker for MemoryBroker {
    async fn publish(&self, channel: &str, message: &Broadcast) -> Result<()> {
        let tx = self.sender(channel).await;

        // A send error only means there are no subscribers right now;
        // broadcast delivery is fire-and-forget.
        let receivers = tx.send(message.clone()).unwrap_or(0);

        tracing::debug!(
            channel = %channel,
            event = %message.event,
            receivers,
            "Broadcast published"
        );
        Ok(())
    }

    async fn subscribe(&self, channel: &str) -> Result<Box<dyn BrokerSubscription>> {
        let rx = self.sender(channel).await.subscribe();
        Ok(Box::new(MemorySubscription { rx }))
    }

    fn name(&self) -> &str {
        "memory"
    }
}

/// Subscription handle backed by a tokio broadcast receiver
pub struct MemorySubscription {
    rx: broadcast::Receiver<Broadcast>,
}

#[async_trait]
impl BrokerSubscription for MemorySubscription {
    async fn next(&mut self) -> Result<Option<Broadcast>> {
        loop {
            match self.rx.recv().await {
                Ok(message) => return Ok(Some(message)),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "Subscriber lagged; messages dropped");
                    continue;
                }
                Err(broadcast::error::RecvError::Closed) => return Ok(None),
            }
        }
    }
}
