// src/security/mod.rs
//! Security-related functionality for the wallet
//!
//! Passphrase encryption of key material, zeroizing secret buffers and
//! time-based one-time codes.

pub mod encryption;
pub mod secret;
pub mod totp;

pub use encryption::{EncryptedBlob, KdfConfig, KeyCipher};
pub use secret::SecretVec;
