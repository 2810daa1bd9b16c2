use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::core::errors::WalletError;
use crate::core::wallet_info::{AddressSnapshot, SignedTransaction};

/// Defines the interface to the remote ledger.
#[async_trait]
pub trait LedgerClient: Send + Sync {
    /// Current balance, confirmed nonce and pending transactions of `address`.
    async fn address_snapshot(&self, address: &str) -> Result<AddressSnapshot, WalletError>;

    /// Submit a signed transaction, returning its hash.
    async fn broadcast(&self, tx: &SignedTransaction) -> Result<String, WalletError>;

    /// Look up a transaction by hash.
    async fn transaction(&self, hash: &str) -> Result<TransactionInfo, WalletError>;
}

/// Basic information about a transaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionInfo {
    pub hash: String,
    #[serde(default)]
    pub from: Option<String>,
    #[serde(default)]
    pub to: Option<String>,
    #[serde(default)]
    pub amount: Option<String>,
    #[serde(default)]
    pub fee: Option<String>,
    #[serde(default)]
    pub nonce: Option<u32>,
    #[serde(default)]
    pub block_hash: Option<String>,
    #[serde(default)]
    pub receive_time: Option<u64>,
}

impl TransactionInfo {
    pub fn is_confirmed(&self) -> bool {
        self.block_hash.as_deref().map_or(false, |h| !h.is_empty())
    }
}
