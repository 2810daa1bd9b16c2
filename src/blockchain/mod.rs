//! Remote ledger access.

pub mod client;
pub mod traits;

pub use client::HttpLedgerClient;
pub use traits::{LedgerClient, TransactionInfo};
