//! Account listings for HD wallets and hardware devices, plus device setup.

use tracing::{debug, info};

use super::WalletManager;
use crate::core::address::Address;
use crate::core::amount::Amount;
use crate::core::bip44::{derive_account, ExtendedPrivateKey};
use crate::core::errors::WalletError;
use crate::core::wallet_info::AccountSummary;

/// Largest listing window served in one call.
pub const MAX_ACCOUNT_WINDOW: u32 = 100;

fn check_window(start: u32, count: u32) -> Result<(), WalletError> {
    if count == 0 || count > MAX_ACCOUNT_WINDOW {
        return Err(WalletError::InvalidInput(format!(
            "count must be between 1 and {}",
            MAX_ACCOUNT_WINDOW
        )));
    }
    start
        .checked_add(count)
        .map(|_| ())
        .ok_or_else(|| WalletError::InvalidInput("account index out of range".to_string()))
}

impl WalletManager {
    async fn summarise(&self, start: u32, addresses: Vec<Address>) -> Result<Vec<AccountSummary>, WalletError> {
        let mut out = Vec::with_capacity(addresses.len());
        for (offset, address) in addresses.into_iter().enumerate() {
            let address = address.to_string();
            let snapshot = self.ledger.address_snapshot(&address).await?;
            let pending_amount = snapshot
                .pending
                .iter()
                .try_fold(Amount::ZERO, |acc, tx| acc.checked_add(tx.amount))
                .ok_or_else(|| WalletError::AccountStateError("pending total overflows".to_string()))?;
            out.push(AccountSummary {
                index: start + offset as u32,
                address,
                balance: snapshot.balance,
                pending_amount,
            });
        }
        Ok(out)
    }

    /// Accounts `start..start + count` of a stored HD root.
    pub async fn hd_accounts(
        &self,
        wallet: &str,
        passphrase: &str,
        start: u32,
        count: u32,
    ) -> Result<Vec<AccountSummary>, WalletError> {
        check_window(start, count)?;
        let record = self.wallets.find(wallet).await?;
        if !record.is_hd_root() {
            return Err(WalletError::InvalidInput(format!("wallet '{}' is not an HD root", wallet)));
        }
        let encoded = self.cipher.decrypt_string(passphrase, &record.iv, &record.data)?;
        let root = ExtendedPrivateKey::from_base58(&encoded).map_err(|_| WalletError::InvalidPassword)?;
        let addresses = (start..start + count)
            .map(|index| derive_account(&root, self.coin_type(), index).map(|pair| pair.address()))
            .collect::<Result<Vec<_>, _>>()?;
        debug!(wallet = %wallet, start, count, "listing HD accounts");
        self.summarise(start, addresses).await
    }

    pub async fn simple_device_accounts(&self, start: u32, count: u32) -> Result<Vec<AccountSummary>, WalletError> {
        check_window(start, count)?;
        let addresses = self.simple_device()?.addresses(start, count).await?;
        self.summarise(start, addresses).await
    }

    pub async fn gated_device_password_set(&self) -> Result<bool, WalletError> {
        self.gated_device()?.password_is_set().await
    }

    pub async fn gated_device_wallet_set(&self, password: &str) -> Result<bool, WalletError> {
        self.gated_device()?.wallet_is_set(password).await
    }

    pub async fn gated_device_accounts(
        &self,
        password: &str,
        start: u32,
        count: u32,
    ) -> Result<Vec<AccountSummary>, WalletError> {
        check_window(start, count)?;
        let addresses = self.gated_device()?.accounts(password, start, count).await?;
        self.summarise(start, addresses).await
    }

    pub async fn set_gated_device_password(&self, password: &str) -> Result<(), WalletError> {
        if password.is_empty() {
            return Err(WalletError::InvalidInput("device password must not be empty".to_string()));
        }
        self.gated_device()?.create_password(password).await
    }

    pub async fn create_gated_device_wallet(&self, name: &str, password: &str) -> Result<(), WalletError> {
        self.gated_device()?.create_wallet(name, password).await?;
        info!(wallet = %name, "device wallet ready");
        Ok(())
    }
}
