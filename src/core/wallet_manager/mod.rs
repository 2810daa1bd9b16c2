//! Wallet Manager Core Module
//!
//! Ties key custody, derivation, transaction preparation, signer dispatch and
//! submission together.
//!
//! ## Module Structure
//! - `lifecycle` - create, recover, import, list, delete wallets
//! - `accounts` - HD and hardware account listings
//! - `nonce` - transaction preparation (nonce and spendable balance)
//! - `signing` - signer dispatch
//! - `transactions` - the send flow and outcome normalisation
//! - `favorites` - saved destination addresses
//! - `second_factor` - one-time-code gate

pub mod accounts;
pub mod favorites;
pub mod lifecycle;
pub mod nonce;
pub mod second_factor;
pub mod signing;
pub mod transactions;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use tracing::info;

use crate::blockchain::{HttpLedgerClient, LedgerClient};
use crate::core::config::WalletConfig;
use crate::core::errors::WalletError;
use crate::hardware::{BridgeTransport, DeviceTransport, GatedDevice, SimpleDevice};
use crate::security::KeyCipher;
use crate::storage::{FavoriteStore, RecordStore, SecondFactorStore, SqliteStore, WalletStore};

pub use lifecycle::WalletImport;
pub use signing::SignerKind;
pub use transactions::{SecondFactorProof, SendOutcome, SendRequest};

/// Unix time source; injectable so one-time codes can be tested.
pub type Clock = Arc<dyn Fn() -> u64 + Send + Sync>;

/// Serialises prepare, sign and broadcast per source address.
#[derive(Default)]
pub struct AddressLocks {
    locks: Mutex<HashMap<String, Arc<AsyncMutex<()>>>>,
}

impl AddressLocks {
    pub async fn lock(&self, address: &str) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock();
            locks.retain(|key, lock| key == address || Arc::strong_count(lock) > 1);
            locks.entry(address.to_string()).or_default().clone()
        };
        lock.lock_owned().await
    }

    /// Number of addresses currently tracked.
    pub fn tracked(&self) -> usize {
        self.locks.lock().len()
    }
}

/// Entry point for every wallet operation.
pub struct WalletManager {
    pub config: WalletConfig,
    cipher: KeyCipher,
    wallets: WalletStore,
    favorites: FavoriteStore,
    second_factor: SecondFactorStore,
    ledger: Arc<dyn LedgerClient>,
    simple_device: Option<SimpleDevice>,
    gated_device: Option<GatedDevice>,
    address_locks: AddressLocks,
    clock: Clock,
}

impl WalletManager {
    pub fn new(
        config: WalletConfig,
        records: Arc<dyn RecordStore>,
        ledger: Arc<dyn LedgerClient>,
    ) -> Result<Self, WalletError> {
        config.validate()?;
        Ok(Self {
            cipher: KeyCipher::new(config.security.kdf.clone())?,
            wallets: WalletStore::new(records.clone()),
            favorites: FavoriteStore::new(records.clone()),
            second_factor: SecondFactorStore::new(records),
            ledger,
            simple_device: None,
            gated_device: None,
            address_locks: AddressLocks::default(),
            clock: Arc::new(crate::security::totp::now_unix),
            config,
        })
    }

    /// Production wiring: sqlite store, HTTP ledger client and any configured
    /// device bridges.
    pub async fn from_config(config: WalletConfig) -> Result<Self, WalletError> {
        let records = Arc::new(SqliteStore::connect(&config.storage.database_url).await?);
        let ledger = Arc::new(HttpLedgerClient::new(&config.ledger)?);
        let simple = config.device.simple_bridge.clone();
        let gated = config.device.gated_bridge.clone();

        let mut manager = Self::new(config, records, ledger)?;
        if let Some(command) = simple {
            manager = manager.with_simple_device(Arc::new(BridgeTransport::new(&command)?));
        }
        if let Some(command) = gated {
            manager = manager.with_gated_device(Arc::new(BridgeTransport::new(&command)?));
        }
        info!(
            simple_device = manager.simple_device.is_some(),
            gated_device = manager.gated_device.is_some(),
            "wallet manager ready"
        );
        Ok(manager)
    }

    fn device_timeout(&self) -> Duration {
        Duration::from_secs(self.config.device.timeout_secs)
    }

    pub fn with_simple_device(mut self, transport: Arc<dyn DeviceTransport>) -> Self {
        self.simple_device = Some(SimpleDevice::new(transport, self.device_timeout()));
        self
    }

    pub fn with_gated_device(mut self, transport: Arc<dyn DeviceTransport>) -> Self {
        self.gated_device = Some(GatedDevice::new(transport, self.device_timeout()));
        self
    }

    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_cipher(mut self, cipher: KeyCipher) -> Self {
        self.cipher = cipher;
        self
    }

    pub(crate) fn simple_device(&self) -> Result<&SimpleDevice, WalletError> {
        self.simple_device
            .as_ref()
            .ok_or_else(|| WalletError::DeviceUnavailable("no simple device bridge configured".to_string()))
    }

    pub(crate) fn gated_device(&self) -> Result<&GatedDevice, WalletError> {
        self.gated_device
            .as_ref()
            .ok_or_else(|| WalletError::DeviceUnavailable("no gated device bridge configured".to_string()))
    }

    pub(crate) fn coin_type(&self) -> u32 {
        self.config.derivation.coin_type
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_address_locks_serialize_same_address() {
        let locks = Arc::new(AddressLocks::default());
        let guard = locks.lock("Ha").await;
        let other = locks.lock("Hb").await;
        drop(other);

        let locks2 = locks.clone();
        let waiter = tokio::spawn(async move {
            let _g = locks2.lock("Ha").await;
        });
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!waiter.is_finished());
        drop(guard);
        waiter.await.unwrap();
    }

    #[tokio::test]
    async fn test_idle_address_locks_are_pruned() {
        let locks = AddressLocks::default();
        drop(locks.lock("Ha").await);
        let held = locks.lock("Hb").await;
        drop(locks.lock("Hc").await);
        assert_eq!(locks.tracked(), 2);

        drop(held);
        let _current = locks.lock("Hd").await;
        assert_eq!(locks.tracked(), 1);
    }
}
