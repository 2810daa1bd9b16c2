// src/core/wallet_info.rs
use serde::{Deserialize, Serialize};

use crate::core::address::Address;
use crate::core::amount::Amount;

/// Persisted wallet record.
///
/// `data` holds the salted AES-GCM ciphertext of either a hex private key or a
/// base58 extended private key (HD root). HD roots have an empty `address`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredWalletRecord {
    pub name: String,
    #[serde(default)]
    pub address: String,
    #[serde(with = "hex_bytes")]
    pub data: Vec<u8>,
    #[serde(with = "hex_bytes")]
    pub iv: Vec<u8>,
    #[serde(default)]
    pub hint: String,
}

impl StoredWalletRecord {
    pub fn is_hd_root(&self) -> bool {
        self.address.is_empty()
    }

    /// Exported key string: `hint:iv:data`, hex encoded.
    pub fn export_key(&self) -> String {
        format!("{}:{}:{}", self.hint, hex::encode(&self.iv), hex::encode(&self.data))
    }
}

/// Encrypted one-time-code secret. At most one exists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredSecondFactor {
    #[serde(with = "hex_bytes")]
    pub data: Vec<u8>,
    #[serde(with = "hex_bytes")]
    pub iv: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Favorite {
    pub alias: String,
    pub address: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalletSummary {
    pub name: String,
    pub address: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingTx {
    pub amount: Amount,
    pub fee: Amount,
    pub nonce: u32,
}

/// Ledger view of one address, fetched fresh for every send attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddressSnapshot {
    pub balance: Amount,
    pub confirmed_nonce: i64,
    /// Ordered oldest first.
    pub pending: Vec<PendingTx>,
}

impl AddressSnapshot {
    /// Amount plus fee of every pending transaction, or `None` on overflow.
    pub fn pending_total(&self) -> Option<Amount> {
        self.pending.iter().try_fold(Amount::ZERO, |acc, tx| {
            acc.checked_add(tx.amount)?.checked_add(tx.fee)
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreparedTransaction {
    pub from: Address,
    pub to: Address,
    pub amount: Amount,
    pub fee: Amount,
    pub nonce: u32,
}

/// Signed transaction exactly as the ledger accepts it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedTransaction {
    pub signature: String,
    pub from: String,
    pub to: String,
    pub amount: String,
    pub fee: String,
    pub nonce: u32,
    pub recovery: u8,
}

impl SignedTransaction {
    pub fn new(tx: &PreparedTransaction, signature: &TxSignature) -> Self {
        Self {
            signature: hex::encode(signature.signature),
            from: tx.from.to_string(),
            to: tx.to.to_string(),
            amount: tx.amount.to_string(),
            fee: tx.fee.to_string(),
            nonce: tx.nonce,
            recovery: signature.recovery,
        }
    }
}

/// Compact recoverable ECDSA signature over the transaction digest.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TxSignature {
    pub signature: [u8; 64],
    pub recovery: u8,
}

/// Per-account view used by account listings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountSummary {
    pub index: u32,
    pub address: String,
    pub balance: Amount,
    pub pending_amount: Amount,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalletDetail {
    pub name: String,
    pub address: String,
    pub hint: String,
    pub balance: Option<Amount>,
    pub pending: Vec<PendingTx>,
}

pub(crate) mod hex_bytes {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let s = String::deserialize(deserializer)?;
        hex::decode(s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_persists_hex() {
        let record = StoredWalletRecord {
            name: "main".into(),
            address: String::new(),
            data: vec![0xde, 0xad],
            iv: vec![0x01],
            hint: "pet".into(),
        };
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["data"], "dead");
        assert_eq!(json["iv"], "01");
        assert!(record.is_hd_root());
        assert_eq!(record.export_key(), "pet:01:dead");
        let back: StoredWalletRecord = serde_json::from_value(json).unwrap();
        assert_eq!(back, record);
    }

    #[test]
    fn test_pending_total() {
        let snapshot = AddressSnapshot {
            balance: Amount::from_units(100),
            confirmed_nonce: 4,
            pending: vec![
                PendingTx { amount: Amount::from_units(10), fee: Amount::from_units(1), nonce: 5 },
                PendingTx { amount: Amount::from_units(3), fee: Amount::from_units(2), nonce: 6 },
            ],
        };
        assert_eq!(snapshot.pending_total(), Some(Amount::from_units(16)));
    }
}
