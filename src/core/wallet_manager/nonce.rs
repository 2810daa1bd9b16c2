//! Transaction preparation
//!
//! Picks the nonce and checks the spendable balance against a fresh ledger
//! snapshot. Nothing is persisted; the ledger is the source of truth.

use tracing::{debug, warn};

use super::WalletManager;
use crate::core::address::Address;
use crate::core::amount::Amount;
use crate::core::errors::WalletError;
use crate::core::wallet_info::{AddressSnapshot, PreparedTransaction};

/// Nonce for the next transaction: explicit override, else one past the last
/// pending nonce, else one past the confirmed nonce.
pub fn select_nonce(snapshot: &AddressSnapshot, explicit: Option<u32>) -> Result<u32, WalletError> {
    if let Some(nonce) = explicit {
        return Ok(nonce);
    }
    let base = match snapshot.pending.last() {
        Some(last) => i64::from(last.nonce),
        None => snapshot.confirmed_nonce,
    };
    base.checked_add(1)
        .and_then(|n| u32::try_from(n).ok())
        .ok_or_else(|| WalletError::AccountStateError(format!("nonce {} out of range", base)))
}

/// Balance minus amount and fee of every pending transaction.
pub fn spendable_balance(snapshot: &AddressSnapshot) -> Result<Amount, WalletError> {
    let committed = snapshot
        .pending_total()
        .ok_or_else(|| WalletError::AccountStateError("pending total overflows".to_string()))?;
    Ok(snapshot.balance.checked_sub(committed).unwrap_or(Amount::ZERO))
}

impl WalletManager {
    /// Build a transaction ready for signing.
    ///
    /// # Errors
    /// `InvalidSourceAddress` / `InvalidDestinationAddress` on decode failure,
    /// `AccountStateError` on a negative confirmed nonce, `InsufficientFunds`
    /// when amount plus fee exceeds the spendable balance, plus any ledger error.
    pub async fn prepare_transaction(
        &self,
        from: &str,
        to: &str,
        amount: Amount,
        fee: Amount,
        explicit_nonce: Option<u32>,
    ) -> Result<PreparedTransaction, WalletError> {
        let from_address: Address = from
            .parse()
            .map_err(|e| WalletError::InvalidSourceAddress(format!("{}: {}", from, e)))?;
        let to_address: Address = to
            .parse()
            .map_err(|e| WalletError::InvalidDestinationAddress(format!("{}: {}", to, e)))?;

        let snapshot = self.ledger.address_snapshot(from).await?;
        if snapshot.confirmed_nonce < 0 {
            warn!(address = %from, nonce = snapshot.confirmed_nonce, "ledger reports negative nonce");
            return Err(WalletError::AccountStateError(format!(
                "confirmed nonce {} is negative",
                snapshot.confirmed_nonce
            )));
        }

        let nonce = select_nonce(&snapshot, explicit_nonce)?;
        let spendable = spendable_balance(&snapshot)?;
        let needed = amount
            .checked_add(fee)
            .ok_or_else(|| WalletError::InvalidAmount("amount plus fee overflows".to_string()))?;
        if needed > spendable {
            return Err(WalletError::InsufficientFunds {
                needed: needed.to_string(),
                spendable: spendable.to_string(),
            });
        }

        debug!(%from, %to, nonce, %amount, %fee, %spendable, "transaction prepared");
        Ok(PreparedTransaction {
            from: from_address,
            to: to_address,
            amount,
            fee,
            nonce,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::wallet_info::PendingTx;
    use crate::core::wallet_manager::test_support::{manager, FakeLedger};
    use std::sync::Arc;

    fn units(n: u64) -> Amount {
        Amount::from_units(n)
    }

    fn snapshot(balance: u64, nonce: i64, pending: Vec<(u64, u64, u32)>) -> AddressSnapshot {
        AddressSnapshot {
            balance: units(balance),
            confirmed_nonce: nonce,
            pending: pending
                .into_iter()
                .map(|(amount, fee, nonce)| PendingTx { amount: units(amount), fee: units(fee), nonce })
                .collect(),
        }
    }

    fn addresses() -> (String, String) {
        (
            Address::from_public_key(&[2u8; 33]).to_string(),
            Address::from_public_key(&[3u8; 33]).to_string(),
        )
    }

    fn setup(snap: AddressSnapshot) -> (crate::core::wallet_manager::WalletManager, String, String) {
        let (from, to) = addresses();
        let ledger = Arc::new(FakeLedger::default());
        ledger.snapshots.lock().insert(from.clone(), snap);
        (manager(ledger), from, to)
    }

    #[test]
    fn test_nonce_selection() {
        assert_eq!(select_nonce(&snapshot(0, 4, vec![]), None).unwrap(), 5);
        assert_eq!(select_nonce(&snapshot(0, 4, vec![(1, 1, 5), (1, 1, 6)]), None).unwrap(), 7);
        assert_eq!(select_nonce(&snapshot(0, 4, vec![(1, 1, 5)]), Some(42)).unwrap(), 42);
    }

    #[test]
    fn test_spendable_subtracts_pending() {
        assert_eq!(spendable_balance(&snapshot(100, 4, vec![(10, 1, 5)])).unwrap(), units(89));
        assert_eq!(spendable_balance(&snapshot(5, 4, vec![(10, 1, 5)])).unwrap(), Amount::ZERO);
    }

    #[tokio::test]
    async fn test_pending_aware_send_fits() {
        let (manager, from, to) = setup(snapshot(100, 4, vec![(10, 1, 5)]));
        let tx = manager.prepare_transaction(&from, &to, units(80), units(1), None).await.unwrap();
        assert_eq!(tx.nonce, 6);
    }

    #[tokio::test]
    async fn test_pending_aware_send_too_large() {
        let (manager, from, to) = setup(snapshot(100, 4, vec![(10, 1, 5)]));
        let result = manager.prepare_transaction(&from, &to, units(90), units(1), None).await;
        assert!(matches!(result, Err(WalletError::InsufficientFunds { .. })));
    }

    #[tokio::test]
    async fn test_exact_spendable_is_allowed() {
        let (manager, from, to) = setup(snapshot(100, 0, vec![]));
        let tx = manager.prepare_transaction(&from, &to, units(99), units(1), None).await.unwrap();
        assert_eq!(tx.nonce, 1);
    }

    #[tokio::test]
    async fn test_negative_nonce_is_account_state_error() {
        let (manager, from, to) = setup(snapshot(100, -1, vec![]));
        let result = manager.prepare_transaction(&from, &to, units(1), units(1), None).await;
        assert!(matches!(result, Err(WalletError::AccountStateError(_))));
    }

    #[tokio::test]
    async fn test_bad_destination() {
        let (manager, from, _) = setup(snapshot(100, 0, vec![]));
        let result = manager.prepare_transaction(&from, "Hnope", units(1), units(1), None).await;
        assert!(matches!(result, Err(WalletError::InvalidDestinationAddress(_))));
    }

    #[tokio::test]
    async fn test_bad_source() {
        let (manager, _, to) = setup(snapshot(100, 0, vec![]));
        let result = manager.prepare_transaction("garbage", &to, units(1), units(1), None).await;
        assert!(matches!(result, Err(WalletError::InvalidSourceAddress(_))));
    }
}
