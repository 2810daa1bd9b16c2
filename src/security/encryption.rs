// src/security/encryption.rs
//! Passphrase-based encryption for stored key material.
//!
//! Key: Argon2id(passphrase, salt) -> 32 bytes. Cipher: AES-256-GCM.
//! Output: `iv` = 12-byte GCM nonce, `data` = salt(16) || ciphertext.
//! Any authentication failure surfaces as [`WalletError::InvalidPassword`].

use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Nonce};
use argon2::{Algorithm, Argon2, Params, Version};
use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use tracing::debug;
use zeroize::Zeroizing;

use crate::core::errors::WalletError;
use crate::security::secret::{vec_to_secret, SecretVec};

pub const IV_LEN: usize = 12;
pub const SALT_LEN: usize = 16;
const KEY_LEN: usize = 32;

/// Argon2id cost parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KdfConfig {
    #[serde(default = "KdfConfig::default_memory_kib")]
    pub memory_kib: u32,
    #[serde(default = "KdfConfig::default_iterations")]
    pub iterations: u32,
    #[serde(default = "KdfConfig::default_parallelism")]
    pub parallelism: u32,
}

impl KdfConfig {
    fn default_memory_kib() -> u32 { 19 * 1024 }
    fn default_iterations() -> u32 { 2 }
    fn default_parallelism() -> u32 { 1 }

    fn params(&self) -> Result<Params, WalletError> {
        Params::new(self.memory_kib, self.iterations, self.parallelism, Some(KEY_LEN))
            .map_err(|e| WalletError::ConfigError(format!("invalid KDF parameters: {}", e)))
    }

    pub fn validate(&self) -> Result<(), WalletError> {
        self.params().map(|_| ())
    }
}

impl Default for KdfConfig {
    fn default() -> Self {
        Self {
            memory_kib: Self::default_memory_kib(),
            iterations: Self::default_iterations(),
            parallelism: Self::default_parallelism(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncryptedBlob {
    pub iv: Vec<u8>,
    pub data: Vec<u8>,
}

/// Encrypts and decrypts secrets under a user passphrase.
#[derive(Debug, Clone)]
pub struct KeyCipher {
    kdf: KdfConfig,
}

impl KeyCipher {
    pub fn new(kdf: KdfConfig) -> Result<Self, WalletError> {
        kdf.validate()?;
        Ok(Self { kdf })
    }

    fn derive_key(&self, passphrase: &str, salt: &[u8]) -> Result<Zeroizing<[u8; KEY_LEN]>, WalletError> {
        let argon = Argon2::new(Algorithm::Argon2id, Version::V0x13, self.kdf.params()?);
        let mut key = Zeroizing::new([0u8; KEY_LEN]);
        argon
            .hash_password_into(passphrase.as_bytes(), salt, &mut key[..])
            .map_err(|e| WalletError::CryptoError(format!("key derivation failed: {}", e)))?;
        Ok(key)
    }

    pub fn encrypt(&self, passphrase: &str, plaintext: &[u8]) -> Result<EncryptedBlob, WalletError> {
        let mut salt = [0u8; SALT_LEN];
        let mut iv = [0u8; IV_LEN];
        OsRng.fill_bytes(&mut salt);
        OsRng.fill_bytes(&mut iv);

        let key = self.derive_key(passphrase, &salt)?;
        let cipher = Aes256Gcm::new_from_slice(&key[..])
            .map_err(|_| WalletError::CryptoError("invalid key length".to_string()))?;
        let ciphertext = cipher
            .encrypt(Nonce::from_slice(&iv), plaintext)
            .map_err(|_| WalletError::CryptoError("encryption failed".to_string()))?;

        let mut data = Vec::with_capacity(SALT_LEN + ciphertext.len());
        data.extend_from_slice(&salt);
        data.extend_from_slice(&ciphertext);
        debug!(len = data.len(), "encrypted secret");
        Ok(EncryptedBlob { iv: iv.to_vec(), data })
    }

    pub fn decrypt(&self, passphrase: &str, iv: &[u8], data: &[u8]) -> Result<SecretVec, WalletError> {
        if iv.len() != IV_LEN || data.len() <= SALT_LEN {
            return Err(WalletError::InvalidPassword);
        }
        let (salt, ciphertext) = data.split_at(SALT_LEN);
        let key = self.derive_key(passphrase, salt)?;
        let cipher = Aes256Gcm::new_from_slice(&key[..])
            .map_err(|_| WalletError::CryptoError("invalid key length".to_string()))?;
        cipher
            .decrypt(Nonce::from_slice(iv), ciphertext)
            .map(vec_to_secret)
            .map_err(|_| WalletError::InvalidPassword)
    }

    /// Decrypt and require UTF-8 plaintext.
    pub fn decrypt_string(&self, passphrase: &str, iv: &[u8], data: &[u8]) -> Result<Zeroizing<String>, WalletError> {
        let plain = self.decrypt(passphrase, iv, data)?;
        let text = std::str::from_utf8(&plain).map_err(|_| WalletError::InvalidPassword)?;
        Ok(Zeroizing::new(text.to_string()))
    }
}

#[cfg(test)]
pub(crate) fn test_cipher() -> KeyCipher {
    KeyCipher {
        kdf: KdfConfig { memory_kib: 64, iterations: 1, parallelism: 1 },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip() {
        let cipher = test_cipher();
        let blob = cipher.encrypt("correct horse", b"secret key").unwrap();
        assert_eq!(blob.iv.len(), IV_LEN);
        let plain = cipher.decrypt("correct horse", &blob.iv, &blob.data).unwrap();
        assert_eq!(plain.as_slice(), b"secret key");
    }

    #[test]
    fn test_wrong_passphrase_is_invalid_password() {
        let cipher = test_cipher();
        let blob = cipher.encrypt("right", b"payload").unwrap();
        assert!(matches!(
            cipher.decrypt("wrong", &blob.iv, &blob.data),
            Err(WalletError::InvalidPassword)
        ));
    }

    #[test]
    fn test_tampered_ciphertext_rejected() {
        let cipher = test_cipher();
        let mut blob = cipher.encrypt("pw", b"payload").unwrap();
        let last = blob.data.len() - 1;
        blob.data[last] ^= 0x01;
        assert!(matches!(cipher.decrypt("pw", &blob.iv, &blob.data), Err(WalletError::InvalidPassword)));
    }

    #[test]
    fn test_fresh_salt_and_iv_per_encryption() {
        let cipher = test_cipher();
        let a = cipher.encrypt("pw", b"same").unwrap();
        let b = cipher.encrypt("pw", b"same").unwrap();
        assert_ne!(a.iv, b.iv);
        assert_ne!(a.data, b.data);
    }

    #[test]
    fn test_truncated_input_rejected() {
        let cipher = test_cipher();
        assert!(matches!(cipher.decrypt("pw", &[0u8; 12], &[0u8; 4]), Err(WalletError::InvalidPassword)));
        assert!(matches!(cipher.decrypt("pw", &[0u8; 3], &[0u8; 40]), Err(WalletError::InvalidPassword)));
    }

    #[test]
    fn test_invalid_kdf_rejected() {
        let kdf = KdfConfig { memory_kib: 1, iterations: 0, parallelism: 1 };
        assert!(KeyCipher::new(kdf).is_err());
    }
}
