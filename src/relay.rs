//! Event relay: broker subscriptions fanned out to per-provider handlers
//!
//! The relay subscribes to the provider channels and hands each webhook
//! broadcast to the handler registered for that channel. Batched events
//! (one broadcast carrying many messages) are fanned out concurrently so
//! a slow command never blocks its siblings.

use crate::broker::{Broadcast, Broker};
use crate::error::Result;
use crate::types::Provider;
use futures::future::BoxFuture;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;

/// Channel carrying synchronous reply bodies back to the edge
pub const RETURN_CHANNEL: &str = "return";

/// Event name on the return channel
pub const RETURN_EVENT: &str = "return";

/// One inbound webhook event, unpacked from its broadcast envelope
#[derive(Debug, Clone)]
pub struct InboundEvent {
    pub provider: Provider,
    pub payload: serde_json::Value,

    /// Set when the edge is waiting on a synchronous reply
    pub correlation_id: Option<String>,
}

/// Handler invoked for each inbound event on a channel
pub type EventHandler = Arc<dyn Fn(InboundEvent) -> BoxFuture<'static, ()> + Send + Sync>;

/// Relays broker broadcasts into registered handlers
pub struct EventRelay {
    broker: Arc<dyn Broker>,
    handlers: RwLock<HashMap<String, EventHandler>>,
}

impl EventRelay {
    pub fn new(broker: Arc<dyn Broker>) -> Self {
        Self {
            broker,
            handlers: RwLock::new(HashMap::new()),
        }
    }

    /// Register the handler for a channel, replacing any previous one
    pub async fn on(&self, channel: &str, handler: EventHandler) {
        let mut handlers = self.handlers.write().await;
        handlers.insert(channel.to_string(), handler);
    }

    /// Publish a synchronous reply body on the return channel
    pub async fn send_reply(&self, correlation_id: &str, body: serde_json::Value) -> Result<()> {
        let message = Broadcast::new(RETURN_EVENT, body).with_correlation(correlation_id);
        self.broker.publish(RETURN_CHANNEL, &message).await
    }

    /// Subscribe to the given channels and start one relay loop per channel
    ///
    /// Subscription failures are fatal at startup. Channels with no known
    /// provider are skipped with a warning so one bad configuration entry
    /// does not take the worker down.
    pub async fn start(self: &Arc<Self>, channels: &[String]) -> Result<Vec<JoinHandle<()>>> {
        let mut tasks = Vec::new();

        for channel in channels {
            let Some(provider) = Provider::from_channel(channel) else {
                tracing::warn!(channel = %channel, "Unknown channel, skipping");
                continue;
            };

            let subscription = self.broker.subscribe(channel).await?;
            tracing::info!(channel = %channel, broker = %self.broker.name(), "Relay listening");

            let relay = Arc::clone(self);
            tasks.push(tokio::spawn(async move {
                relay.relay_loop(provider, subscription).await;
            }));
        }

        Ok(tasks)
    }

    async fn relay_loop(
        &self,
        provider: Provider,
        mut subscription: Box<dyn crate::broker::BrokerSubscription>,
    ) {
        let expected_event = provider.webhook_event();

        loop {
            let broadcast = match subscription.next().await {
                Ok(Some(broadcast)) => broadcast,
                Ok(None) => {
                    tracing::info!(provider = %provider, "Subscription closed, relay loop exiting");
                    return;
                }
                Err(e) => {
                    tracing::warn!(provider = %provider, error = %e, "Receive failed");
                    continue;
                }
            };

            if broadcast.event != expected_event {
                tracing::debug!(
                    provider = %provider,
                    event = %broadcast.event,
                    "Ignoring unrelated event"
                );
                continue;
            }

            let handler = {
                let handlers = self.handlers.read().await;
                handlers.get(provider.channel()).cloned()
            };
            let Some(handler) = handler else {
                tracing::warn!(provider = %provider, "No handler registered, dropping event");
                continue;
            };

            self.fan_out(provider, broadcast, handler);
        }
    }

    /// Spawn handler invocations for one broadcast
    ///
    /// A broadcast whose payload carries an `events` array is one
    /// webhook call batching several messages; each gets its own task.
    fn fan_out(&self, provider: Provider, broadcast: Broadcast, handler: EventHandler) {
        let correlation_id = broadcast.correlation_id;

        match broadcast.payload.get("events").and_then(|e| e.as_array()) {
            Some(events) => {
                for event in events.iter().cloned() {
                    let handler = Arc::clone(&handler);
                    let correlation_id = correlation_id.clone();
                    tokio::spawn(async move {
                        handler(InboundEvent {
                            provider,
                            payload: event,
                            correlation_id,
                        })
                        .await;
                    });
                }
            }
            None => {
                tokio::spawn(async move {
                    handler(InboundEvent {
                        provider,
                        payload: broadcast.payload,
                        correlation_id,
                    })
                    .await;
                });
            }
        }
    }
}
