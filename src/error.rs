//! Error types for chatbridge

use thiserror::Error;

/// Errors that can occur in the bridge
#[derive(Debug, Error)]
pub enum BridgeError {
    /// Broker connection failure
    #[error("Connection error: {0}")]
    Connection(String),

    /// Broadcast publish failure
    #[error("Failed to publish to channel '{channel}': {reason}")]
    Publish {
        channel: String,
        reason: String,
    },

    /// Broadcast subscribe failure
    #[error("Failed to subscribe to channel '{channel}': {reason}")]
    Subscribe {
        channel: String,
        reason: String,
    },

    /// Serialization/deserialization failure
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Inbound webhook payload matched no known provider
    ///
    /// Treated as a hard request failure: routing to the wrong channel
    /// would be worse than rejecting.
    #[error("Provider classification failed: {0}")]
    Classification(String),

    /// Pairing-protocol failure (connect, session request, disconnect)
    #[error("Pairing error: {0}")]
    Pairing(String),

    /// Chain RPC failure
    #[error("RPC error: {0}")]
    Rpc(String),

    /// A signed session request was rejected or could not be delivered
    ///
    /// Raised distinctly from other collaborator failures because it means
    /// the user must be told the transaction did not go through.
    #[error("Request '{method}' failed: {reason}")]
    RequestFailed {
        method: String,
        reason: String,
    },

    /// Outbound messaging failure
    #[error("Messaging error: {0}")]
    Messaging(String),
}

/// Result type alias for bridge operations
pub type Result<T> = std::result::Result<T, BridgeError>;
