//! Chain query facade
//!
//! Wraps the blockchain RPC capability the bridge needs: gas price, gas
//! estimation, balance, and the latest block. All operations are
//! single-shot calls with no retry at this layer. The RPC transport
//! itself is an external collaborator behind the `ChainRpc` trait.

use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// A minimal transaction shape for gas estimation and submission
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionRequest {
    pub from: String,
    pub to: String,

    /// Hex-encoded value in native base units
    pub value: String,

    /// Call data; `None` for a plain value transfer
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<String>,
}

impl TransactionRequest {
    /// A native value transfer with no call data
    pub fn value_transfer(
        from: impl Into<String>,
        to: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
            value: value.into(),
            data: None,
        }
    }
}

/// Summary of the latest block
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockHeader {
    pub number: u64,

    /// Unix seconds
    pub timestamp: u64,

    /// Base fee in native base units per gas
    pub base_fee_per_gas: u128,
}

/// Core trait for the chain RPC backend
#[async_trait]
pub trait ChainRpc: Send + Sync {
    /// Current gas price in base units
    async fn gas_price(&self) -> Result<u128>;

    /// Estimated gas for the given transaction shape
    async fn estimate_gas(&self, tx: &TransactionRequest) -> Result<u64>;

    /// Account balance in base units
    async fn balance(&self, address: &str) -> Result<u128>;

    /// Latest block header
    async fn latest_block(&self) -> Result<BlockHeader>;
}

/// High-level chain queries in the encodings the bridge needs
pub struct ChainQuery {
    rpc: Arc<dyn ChainRpc>,
    symbol: String,
}

impl ChainQuery {
    pub fn new(rpc: Arc<dyn ChainRpc>) -> Self {
        Self {
            rpc,
            symbol: "KAIA".to_string(),
        }
    }

    /// Override the native currency symbol used in displays
    pub fn with_symbol(mut self, symbol: impl Into<String>) -> Self {
        self.symbol = symbol.into();
        self
    }

    /// Current gas price as a hex-encoded integer string
    pub async fn gas_price_hex(&self) -> Result<String> {
        let price = self.rpc.gas_price().await?;
        Ok(format!("0x{:x}", price))
    }

    /// Estimated gas limit as a hex-encoded integer string
    pub async fn estimate_gas_hex(&self, tx: &TransactionRequest) -> Result<String> {
        let gas = self.rpc.estimate_gas(tx).await?;
        Ok(format!("0x{:x}", gas))
    }

    /// Account balance as a native-unit display string
    ///
    /// An empty address short-circuits to a zero display without querying.
    pub async fn balance_display(&self, address: &str) -> Result<String> {
        if address.is_empty() {
            return Ok(format!("0 {}", self.symbol));
        }
        let balance = self.rpc.balance(address).await?;
        Ok(format!("{:.2} {}", balance as f64 / 1e18, self.symbol))
    }

    /// One human-readable summary of the latest block
    pub async fn block_summary(&self) -> Result<String> {
        let block = self.rpc.latest_block().await?;
        let base_fee = block.base_fee_per_gas as f64 / 1e9;
        let when = chrono::DateTime::from_timestamp(block.timestamp as i64, 0)
            .map(|t| t.format("%Y-%m-%d %H:%M:%S UTC").to_string())
            .unwrap_or_default();

        Ok(format!(
            "Current {} Status⛓️\n\nBlock Number: {}\nTimestamp: {} ({})\nBase Fee: {} gkei",
            self.symbol, block.number, block.timestamp, when, base_fee
        ))
    }
}
