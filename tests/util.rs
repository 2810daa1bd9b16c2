// tests/util.rs
// Shared test helpers for integration tests

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{json, Value};

use hd_hot_wallet::blockchain::{LedgerClient, TransactionInfo};
use hd_hot_wallet::core::address::Address;
use hd_hot_wallet::core::amount::Amount;
use hd_hot_wallet::core::config::WalletConfig;
use hd_hot_wallet::core::encoding::blake2b_256;
use hd_hot_wallet::core::errors::WalletError;
use hd_hot_wallet::core::wallet_info::{AddressSnapshot, PendingTx, SignedTransaction};
use hd_hot_wallet::core::wallet_manager::signing::sign_digest;
use hd_hot_wallet::core::WalletManager;
use hd_hot_wallet::hardware::{DeviceRequest, DeviceTransport};
use hd_hot_wallet::security::KdfConfig;
use hd_hot_wallet::storage::MemoryStore;

pub const PHRASE: &str =
    "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon about";

/// Defaults with a cheap KDF so tests do not spend seconds in Argon2.
pub fn fast_config() -> WalletConfig {
    let mut config = WalletConfig::default();
    config.security.kdf = KdfConfig { memory_kib: 64, iterations: 1, parallelism: 1 };
    config.device.timeout_secs = 5;
    config
}

pub fn manager(ledger: Arc<FakeLedger>) -> WalletManager {
    WalletManager::new(fast_config(), Arc::new(MemoryStore::new()), ledger).expect("manager")
}

pub fn funded(balance_units: u64, nonce: i64) -> AddressSnapshot {
    AddressSnapshot {
        balance: Amount::from_units(balance_units),
        confirmed_nonce: nonce,
        pending: vec![],
    }
}

pub fn some_address(seed: u8) -> String {
    Address::from_public_key(&[seed; 33]).to_string()
}

/// In-memory ledger. Accepted broadcasts become pending transactions of the
/// sender.
#[derive(Default)]
pub struct FakeLedger {
    pub snapshots: Mutex<HashMap<String, AddressSnapshot>>,
    pub broadcasts: Mutex<Vec<SignedTransaction>>,
    pub reject_broadcast: Mutex<Option<String>>,
}

impl FakeLedger {
    pub fn with_snapshot(address: &str, snapshot: AddressSnapshot) -> Arc<Self> {
        let ledger = Self::default();
        ledger.snapshots.lock().insert(address.to_string(), snapshot);
        Arc::new(ledger)
    }
}

#[async_trait]
impl LedgerClient for FakeLedger {
    async fn address_snapshot(&self, address: &str) -> Result<AddressSnapshot, WalletError> {
        Ok(self
            .snapshots
            .lock()
            .get(address)
            .cloned()
            .unwrap_or_else(|| funded(0, 0)))
    }

    async fn broadcast(&self, tx: &SignedTransaction) -> Result<String, WalletError> {
        if let Some(reason) = self.reject_broadcast.lock().clone() {
            return Err(WalletError::SubmissionFailed(reason));
        }
        let amount: Amount = tx.amount.parse()?;
        let fee: Amount = tx.fee.parse()?;
        self.snapshots
            .lock()
            .entry(tx.from.clone())
            .or_insert_with(|| funded(0, 0))
            .pending
            .push(PendingTx { amount, fee, nonce: tx.nonce });
        self.broadcasts.lock().push(tx.clone());
        Ok(format!("hash-{}", tx.nonce))
    }

    async fn transaction(&self, hash: &str) -> Result<TransactionInfo, WalletError> {
        Err(WalletError::NotFound(hash.to_string()))
    }
}

type Handler = Box<dyn Fn(&DeviceRequest) -> Result<Value, WalletError> + Send + Sync>;

/// Device transport answering through a closure. Requests whose method is
/// listed in `hang_on` never get an answer.
pub struct ScriptedDevice {
    handler: Handler,
    hang_on: Vec<&'static str>,
    pub seen: Mutex<Vec<&'static str>>,
}

impl ScriptedDevice {
    pub fn new(handler: impl Fn(&DeviceRequest) -> Result<Value, WalletError> + Send + Sync + 'static) -> Self {
        Self { handler: Box::new(handler), hang_on: Vec::new(), seen: Mutex::new(Vec::new()) }
    }

    pub fn hanging_on(mut self, method: &'static str) -> Self {
        self.hang_on.push(method);
        self
    }
}

#[async_trait]
impl DeviceTransport for ScriptedDevice {
    async fn exchange(&self, request: &DeviceRequest) -> Result<Value, WalletError> {
        self.seen.lock().push(request.method());
        if self.hang_on.contains(&request.method()) {
            std::future::pending::<()>().await;
        }
        (self.handler)(request)
    }
}

/// Key held by a fake device.
#[derive(Clone)]
pub struct DeviceKey {
    pub secret: secp256k1::SecretKey,
    pub public: [u8; 33],
}

impl DeviceKey {
    pub fn new(byte: u8) -> Self {
        let secret = secp256k1::SecretKey::from_slice(&[byte; 32]).expect("key");
        let public = secp256k1::PublicKey::from_secret_key(&secp256k1::Secp256k1::new(), &secret).serialize();
        Self { secret, public }
    }

    pub fn address(&self) -> Address {
        Address::from_public_key(&self.public)
    }

    /// BIP32 `xpub` string carrying this key.
    pub fn xpub(&self) -> String {
        let mut payload = Vec::with_capacity(78);
        payload.extend_from_slice(&[0x04, 0x88, 0xB2, 0x1E]);
        payload.push(3);
        payload.extend_from_slice(&[0u8; 4]);
        payload.extend_from_slice(&[0u8; 4]);
        payload.extend_from_slice(&[7u8; 32]);
        payload.extend_from_slice(&self.public);
        bs58::encode(payload).with_check().into_string()
    }

    pub fn sign_hex_digest(&self, digest_hex: &str) -> (String, u8) {
        let mut digest = [0u8; 32];
        digest.copy_from_slice(&hex::decode(digest_hex).expect("hex digest"));
        let signature = sign_digest(&self.secret, &digest).expect("sign");
        (hex::encode(signature.signature), signature.recovery)
    }
}

/// Device that derives `key` for account 0 and signs the encoded transaction.
pub fn simple_device(key: DeviceKey) -> ScriptedDevice {
    ScriptedDevice::new(move |request| match request {
        DeviceRequest::GetAddresses { .. } => Ok(json!({ "addresses": [key.address().to_string()] })),
        DeviceRequest::Sign { raw_tx_hex, .. } => {
            let encoded = hex::decode(raw_tx_hex).expect("hex tx");
            let (signature, recovery) = key.sign_hex_digest(&hex::encode(blake2b_256(&encoded)));
            Ok(json!({ "signature": signature, "recovery": recovery }))
        }
        other => Ok(json!({ "error": format!("unsupported {}", other.method()) })),
    })
}

/// Password-gated device holding `key` behind `password`.
pub fn gated_device(key: DeviceKey, password: &'static str) -> ScriptedDevice {
    ScriptedDevice::new(move |request| {
        let wrong = || -> Result<Value, WalletError> { Ok(json!({ "error": { "error": 23, "remain_attemp": "4" } })) };
        match request {
            DeviceRequest::CheckPasswordSetting => Ok(json!(true)),
            DeviceRequest::CheckWalletSetting { password: given } if given == password => Ok(json!(true)),
            DeviceRequest::GetExtendedKey { password: given, .. } if given == password => {
                Ok(json!({ "keys": [key.xpub()] }))
            }
            DeviceRequest::SignDigest { password: given, hash, .. } if given == password => {
                let (sig, recid) = key.sign_hex_digest(hash);
                Ok(json!({ "sig": sig, "recid": recid }))
            }
            DeviceRequest::CreatePassword { .. } | DeviceRequest::CreateWallet { .. } => Ok(json!(true)),
            _ => wrong(),
        }
    })
}
