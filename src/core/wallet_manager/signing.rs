//! Signer dispatch
//!
//! Four signer families share one flow: resolve the source address and key
//! material, then sign the blake2b-256 digest of the canonical encoding. Every
//! signature is checked by recovering its address before it leaves this module.
//!
//! ```text
//! SignerKind ──resolve_signer──> ResolvedSigner{source, material}
//!                                        │
//! PreparedTransaction ──encode──> bytes ─┴─sign_prepared──> TxSignature
//! ```

use secp256k1::ecdsa::{RecoverableSignature, RecoveryId};
use secp256k1::{Message, Secp256k1, SecretKey};
use tracing::{debug, info, warn};
use zeroize::Zeroizing;

use super::WalletManager;
use crate::core::address::Address;
use crate::core::bip44::{derive_account, Bip44Path, DerivedKeyPair, ExtendedPrivateKey};
use crate::core::encoding::{encode_transaction, transaction_digest};
use crate::core::errors::{codes, DeviceFailure, WalletError};
use crate::core::wallet_info::{PreparedTransaction, TxSignature};
use crate::security::secret::hex_to_secret;

/// Who signs a transaction.
pub enum SignerKind {
    /// Stored wallet holding a single encrypted private key.
    LocalKey {
        wallet: String,
        passphrase: Zeroizing<String>,
    },
    /// Stored HD root; signs with the key of `account`.
    LocalHdKey {
        wallet: String,
        passphrase: Zeroizing<String>,
        account: u32,
    },
    /// Device that signs the encoded transaction itself.
    SimpleDevice { account: u32, from: String },
    /// Password protected device that signs digests.
    GatedDevice {
        account: u32,
        from: String,
        password: Zeroizing<String>,
    },
}

impl SignerKind {
    pub fn label(&self) -> &'static str {
        match self {
            SignerKind::LocalKey { .. } => "local",
            SignerKind::LocalHdKey { .. } => "local-hd",
            SignerKind::SimpleDevice { .. } => "simple-device",
            SignerKind::GatedDevice { .. } => "gated-device",
        }
    }
}

impl std::fmt::Debug for SignerKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SignerKind::LocalKey { wallet, .. } => f.debug_struct("LocalKey").field("wallet", wallet).finish_non_exhaustive(),
            SignerKind::LocalHdKey { wallet, account, .. } => f
                .debug_struct("LocalHdKey")
                .field("wallet", wallet)
                .field("account", account)
                .finish_non_exhaustive(),
            SignerKind::SimpleDevice { account, from } => f
                .debug_struct("SimpleDevice")
                .field("account", account)
                .field("from", from)
                .finish(),
            SignerKind::GatedDevice { account, from, .. } => f
                .debug_struct("GatedDevice")
                .field("account", account)
                .field("from", from)
                .finish_non_exhaustive(),
        }
    }
}

pub(crate) enum SigningMaterial {
    Local(DerivedKeyPair),
    Simple { account: u32 },
    Gated { account: u32, password: Zeroizing<String> },
}

/// Signer whose source address is known and checked.
pub(crate) struct ResolvedSigner {
    pub source: Address,
    pub material: SigningMaterial,
}

/// Sign a digest with a local key.
pub fn sign_digest(secret: &SecretKey, digest: &[u8; 32]) -> Result<TxSignature, WalletError> {
    let secp = Secp256k1::signing_only();
    let message = Message::from_slice(digest)
        .map_err(|e| WalletError::CryptoError(format!("invalid digest: {}", e)))?;
    let (recovery, signature) = secp.sign_ecdsa_recoverable(&message, secret).serialize_compact();
    Ok(TxSignature {
        signature,
        recovery: recovery.to_i32() as u8,
    })
}

/// Address whose key produced `signature` over `digest`.
pub fn recover_address(digest: &[u8; 32], signature: &TxSignature) -> Result<Address, WalletError> {
    let secp = Secp256k1::verification_only();
    let recovery = RecoveryId::from_i32(i32::from(signature.recovery))
        .map_err(|e| WalletError::CryptoError(format!("invalid recovery id: {}", e)))?;
    let recoverable = RecoverableSignature::from_compact(&signature.signature, recovery)
        .map_err(|e| WalletError::CryptoError(format!("invalid signature: {}", e)))?;
    let message = Message::from_slice(digest)
        .map_err(|e| WalletError::CryptoError(format!("invalid digest: {}", e)))?;
    let public_key = secp
        .recover_ecdsa(&message, &recoverable)
        .map_err(|e| WalletError::CryptoError(format!("recovery failed: {}", e)))?;
    Ok(Address::from_public_key(&public_key.serialize()))
}

fn signed_by(digest: &[u8; 32], signature: &TxSignature, expected: &Address) -> bool {
    matches!(recover_address(digest, signature), Ok(address) if &address == expected)
}

impl WalletManager {
    /// Work out the source address and key material for `signer`.
    ///
    /// Local wallets fail with `InvalidPassword` when the passphrase does not
    /// open the record. Device signers fail with `InvalidSourceAddress` (simple)
    /// or device code 27 (gated) when `from` is not the device's account.
    pub(crate) async fn resolve_signer(&self, signer: &SignerKind) -> Result<ResolvedSigner, WalletError> {
        match signer {
            SignerKind::LocalKey { wallet, passphrase } => {
                let record = self.wallets.find(wallet).await?;
                if record.is_hd_root() {
                    return Err(WalletError::InvalidInput(format!(
                        "wallet '{}' is an HD root, choose an account",
                        wallet
                    )));
                }
                let hex_key = self.cipher.decrypt_string(passphrase, &record.iv, &record.data)?;
                let private_key = hex_to_secret(&hex_key).map_err(|_| WalletError::InvalidPassword)?;
                let pair = DerivedKeyPair::from_private_key(&private_key).map_err(|_| WalletError::InvalidPassword)?;
                let source = pair.address();
                if source.to_string() != record.address {
                    warn!(wallet = %wallet, "decrypted key does not match stored address");
                    return Err(WalletError::InvalidPassword);
                }
                Ok(ResolvedSigner { source, material: SigningMaterial::Local(pair) })
            }
            SignerKind::LocalHdKey { wallet, passphrase, account } => {
                let record = self.wallets.find(wallet).await?;
                if !record.is_hd_root() {
                    return Err(WalletError::InvalidInput(format!("wallet '{}' is not an HD root", wallet)));
                }
                let encoded = self.cipher.decrypt_string(passphrase, &record.iv, &record.data)?;
                let root = ExtendedPrivateKey::from_base58(&encoded).map_err(|_| WalletError::InvalidPassword)?;
                let pair = derive_account(&root, self.coin_type(), *account)?;
                Ok(ResolvedSigner { source: pair.address(), material: SigningMaterial::Local(pair) })
            }
            SignerKind::SimpleDevice { account, from } => {
                let source: Address = from
                    .parse()
                    .map_err(|e| WalletError::InvalidSourceAddress(format!("{}: {}", from, e)))?;
                let device = self
                    .simple_device()
                    .map_err(|e| WalletError::InvalidSourceAddress(e.to_string()))?;
                let device_address = device
                    .addresses(*account, 1)
                    .await
                    .map_err(|e| WalletError::InvalidSourceAddress(e.to_string()))?
                    .into_iter()
                    .next();
                if device_address != Some(source) {
                    return Err(WalletError::InvalidSourceAddress(format!(
                        "{} is not device account {}",
                        from, account
                    )));
                }
                Ok(ResolvedSigner { source, material: SigningMaterial::Simple { account: *account } })
            }
            SignerKind::GatedDevice { account, from, password } => {
                let invalid_source = || WalletError::Device(DeviceFailure::new(codes::DEVICE_INVALID_SOURCE));
                let source: Address = from.parse().map_err(|_| invalid_source())?;
                let device = self
                    .gated_device()
                    .map_err(|_| WalletError::Device(DeviceFailure::new(codes::DEVICE_NOT_FOUND)))?;
                if !device.wallet_is_set(password).await? {
                    return Err(WalletError::Device(DeviceFailure::new(codes::DEVICE_WALLET_NOT_SET)));
                }
                let accounts = device.accounts(password, *account, 1).await?;
                if accounts.first() != Some(&source) {
                    return Err(invalid_source());
                }
                Ok(ResolvedSigner {
                    source,
                    material: SigningMaterial::Gated {
                        account: *account,
                        password: password.clone(),
                    },
                })
            }
        }
    }

    /// Sign a prepared transaction with resolved material.
    pub(crate) async fn sign_prepared(
        &self,
        signer: &ResolvedSigner,
        tx: &PreparedTransaction,
    ) -> Result<TxSignature, WalletError> {
        let encoded = encode_transaction(tx)?;
        let digest = transaction_digest(&encoded);
        debug!(nonce = tx.nonce, digest = %hex::encode(digest), "signing transaction");

        match &signer.material {
            SigningMaterial::Local(pair) => {
                let signature = sign_digest(&pair.secret_key()?, &digest)?;
                if !signed_by(&digest, &signature, &signer.source) {
                    return Err(WalletError::KeyIntegrityError);
                }
                Ok(signature)
            }
            SigningMaterial::Simple { account } => {
                let signature = self.simple_device()?.sign(*account, &encoded).await?;
                if !signed_by(&digest, &signature, &signer.source) {
                    warn!(account, "device signature does not recover to the source address");
                    return Err(WalletError::HardwareSignFailure(
                        "signature does not match source address".to_string(),
                    ));
                }
                info!(account, "transaction signed by simple device");
                Ok(signature)
            }
            SigningMaterial::Gated { account, password } => {
                let path = Bip44Path::receive(self.coin_type(), *account);
                let signature = self.gated_device()?.sign_digest(password, &path, &digest).await?;
                if !signed_by(&digest, &signature, &signer.source) {
                    warn!(account, "gated device signature does not recover to the source address");
                    return Err(WalletError::Device(DeviceFailure::new(codes::DEVICE_SIGN_REJECTED)));
                }
                info!(account, "transaction signed by gated device");
                Ok(signature)
            }
        }
    }
}
