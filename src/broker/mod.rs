//! Realtime broadcast broker: the wire between the edge receiver and the worker
//!
//! The broker moves `Broadcast` envelopes over named channels. Backends
//! implement `Broker` to provide transport-specific publish/subscribe;
//! the relay and the webhook receiver are written against the trait.

use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub mod memory;
pub mod nats;

pub use memory::MemoryBroker;
pub use nats::{NatsBroker, NatsBrokerConfig};

/// A single broadcast on a named channel
///
/// The envelope carries the event name (e.g. `line:webhook`, `return`),
/// an optional correlation id for synchronous request/response pairs,
/// and an arbitrary JSON payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Broadcast {
    /// Broadcast event name
    pub event: String,

    /// Correlation id linking a reply to the request that prompted it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correlation_id: Option<String>,

    /// Event payload, arbitrary JSON data
    pub payload: serde_json::Value,
}

impl Broadcast {
    /// Create a new broadcast with no correlation id
    pub fn new(event: impl Into<String>, payload: serde_json::Value) -> Self {
        Self {
            event: event.into(),
            correlation_id: None,
            payload,
        }
    }

    /// Attach a correlation id
    pub fn with_correlation(mut self, id: impl Into<String>) -> Self {
        self.correlation_id = Some(id.into());
        self
    }
}

/// Core trait for broadcast backends
#[async_trait]
pub trait Broker: Send + Sync {
    /// Publish a broadcast to a channel
    ///
    /// Delivery is fire-and-forget relative to subscribers: publishing to
    /// a channel nobody listens on succeeds.
    async fn publish(&self, channel: &str, message: &Broadcast) -> Result<()>;

    /// Subscribe to a channel, receiving broadcasts published after the
    /// subscription is established
    async fn subscribe(&self, channel: &str) -> Result<Box<dyn BrokerSubscription>>;

    /// Backend name (e.g. "nats", "memory")
    fn name(&self) -> &str;
}

/// Async subscription handle for receiving broadcasts
#[async_trait]
pub trait BrokerSubscription: Send + Sync {
    /// Receive the next broadcast; `None` once the channel is closed
    async fn next(&mut self) -> Result<Option<Broadcast>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_broadcast_serialization() {
        let msg = Broadcast::new("line:webhook", serde_json::json!({"events": []}));
        let json = serde_json::to_string(&msg).unwrap();
        assert!(json.contains("\"event\":\"line:webhook\""));
        assert!(!json.contains("correlationId"));

        let parsed: Broadcast = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.event, "line:webhook");
        assert!(parsed.correlation_id.is_none());
    }

    #[test]
    fn test_broadcast_with_correlation() {
        let msg = Broadcast::new("return", serde_json::json!({}))
            .with_correlation("req-1");
        let json = serde_json::to_string(&msg).unwrap();
        assert!(json.contains("\"correlationId\":\"req-1\""));

        let parsed: Broadcast = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.correlation_id.as_deref(), Some("req-1"));
    }
}
