//! One-time-code gate in front of transaction submission.
//!
//! The base32 secret is stored encrypted under a passphrase. A wrong
//! passphrase makes verification return `false`, it is never reported apart.

use tracing::{debug, info};

use super::WalletManager;
use crate::core::errors::WalletError;
use crate::core::wallet_info::StoredSecondFactor;
use crate::security::totp::{self, GeneratedSecret};

const ISSUER: &str = "HD Wallet";

impl WalletManager {
    pub async fn second_factor_enabled(&self) -> Result<bool, WalletError> {
        Ok(self.second_factor.get().await?.is_some())
    }

    pub fn generate_second_factor_secret(&self, label: &str) -> Result<GeneratedSecret, WalletError> {
        totp::generate_secret(label, ISSUER)
    }

    /// Check a code against a plain secret, used to confirm a secret before
    /// enabling it.
    pub fn verify_second_factor_secret(&self, token: &str, secret: &str) -> Result<bool, WalletError> {
        let key = totp::decode_secret(secret)?;
        totp::verify_at(&key, token.trim(), (self.clock)())
    }

    pub async fn enable_second_factor(&self, secret: &str, passphrase: &str) -> Result<(), WalletError> {
        if passphrase.is_empty() {
            return Err(WalletError::InvalidInput("passphrase must not be empty".to_string()));
        }
        totp::decode_secret(secret)?;
        if self.second_factor_enabled().await? {
            return Err(WalletError::SecondFactorAlreadyEnabled);
        }
        let blob = self.cipher.encrypt(passphrase, secret.trim().as_bytes())?;
        self.second_factor
            .save(&StoredSecondFactor { data: blob.data, iv: blob.iv })
            .await?;
        info!("second factor enabled");
        Ok(())
    }

    pub async fn disable_second_factor(&self, passphrase: &str) -> Result<(), WalletError> {
        let record = self
            .second_factor
            .get()
            .await?
            .ok_or(WalletError::SecondFactorNotEnabled)?;
        self.cipher.decrypt(passphrase, &record.iv, &record.data)?;
        self.second_factor.clear().await?;
        info!("second factor disabled");
        Ok(())
    }

    /// `true` only when a secret is stored, the passphrase opens it and the
    /// token matches the current time step.
    pub async fn verify_second_factor(&self, token: &str, passphrase: &str) -> Result<bool, WalletError> {
        let Some(record) = self.second_factor.get().await? else {
            return Ok(false);
        };
        let secret = match self.cipher.decrypt_string(passphrase, &record.iv, &record.data) {
            Ok(secret) => secret,
            Err(_) => {
                debug!("second factor secret did not decrypt");
                return Ok(false);
            }
        };
        let key = match totp::decode_secret(&secret) {
            Ok(key) => key,
            Err(_) => return Ok(false),
        };
        totp::verify_at(&key, token.trim(), (self.clock)())
    }
}
