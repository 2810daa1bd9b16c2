//! BIP32/BIP44 HD key derivation
//!
//! Path format: m/44'/coin_type'/account'/change/address_index
//!
//! Curve arithmetic for the derivation engine runs on `k256`. Every derived
//! key is cross-checked against `secp256k1`, the library that later signs
//! with it: the public key is recomputed there and must match byte for byte.

use hmac::{Hmac, Mac};
use k256::elliptic_curve::sec1::ToEncodedPoint;
use k256::elliptic_curve::PrimeField;
use k256::{FieldBytes, NonZeroScalar, Scalar, SecretKey};
use sha2::Sha512;
use zeroize::Zeroizing;

use crate::core::address::Address;
use crate::core::errors::WalletError;

type HmacSha512 = Hmac<Sha512>;

const HARDENED: u32 = 0x8000_0000;
const XPRV_VERSION: [u8; 4] = [0x04, 0x88, 0xAD, 0xE4];
const XPUB_VERSION: [u8; 4] = [0x04, 0x88, 0xB2, 0x1E];
const EXTENDED_KEY_LEN: usize = 78;

/// Default coin type for account paths.
pub const DEFAULT_COIN_TYPE: u32 = 1397;

/// BIP44 derivation path structure
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bip44Path {
    pub coin_type: u32,
    pub account: u32,
    /// External/internal chain (0=external, 1=internal change)
    pub change: u32,
    pub address_index: u32,
}

impl Bip44Path {
    /// `m/44'/coin_type'/0'/0/address_index`
    pub fn receive(coin_type: u32, address_index: u32) -> Self {
        Self {
            coin_type,
            account: 0,
            change: 0,
            address_index,
        }
    }

    /// Generate complete derivation path indices
    pub fn to_derivation_path(&self) -> Vec<u32> {
        vec![
            HARDENED | 44,
            HARDENED | self.coin_type,
            HARDENED | self.account,
            self.change,
            self.address_index,
        ]
    }
}

impl std::fmt::Display for Bip44Path {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "m/44'/{}'/{}'/{}/{}",
            self.coin_type, self.account, self.change, self.address_index
        )
    }
}

/// BIP32 extended private key.
#[derive(Clone)]
pub struct ExtendedPrivateKey {
    depth: u8,
    chain_code: Zeroizing<[u8; 32]>,
    secret: SecretKey,
}

impl std::fmt::Debug for ExtendedPrivateKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExtendedPrivateKey")
            .field("depth", &self.depth)
            .finish_non_exhaustive()
    }
}

impl ExtendedPrivateKey {
    /// Create master key from BIP39 seed
    pub fn from_seed(seed: &[u8]) -> Result<Self, WalletError> {
        if !(16..=64).contains(&seed.len()) {
            return Err(WalletError::DerivationError(format!(
                "seed length {} outside 16..=64 bytes",
                seed.len()
            )));
        }
        let i = hmac_sha512(b"Bitcoin seed", &[seed])?;
        let secret = SecretKey::from_bytes(FieldBytes::from_slice(&i[..32])).map_err(|_| {
            WalletError::DerivationError("seed does not produce a valid master key".to_string())
        })?;
        let mut chain_code = Zeroizing::new([0u8; 32]);
        chain_code.copy_from_slice(&i[32..]);
        Ok(Self {
            depth: 0,
            chain_code,
            secret,
        })
    }

    pub fn depth(&self) -> u8 {
        self.depth
    }

    /// Compressed SEC1 public key.
    pub fn public_key(&self) -> [u8; 33] {
        let point = self.secret.public_key().to_encoded_point(true);
        let mut out = [0u8; 33];
        out.copy_from_slice(point.as_bytes());
        out
    }

    pub fn private_key_bytes(&self) -> Zeroizing<[u8; 32]> {
        let mut out = Zeroizing::new([0u8; 32]);
        out.copy_from_slice(&self.secret.to_bytes());
        out
    }

    /// BIP32 CKDpriv.
    pub fn derive_child(&self, index: u32) -> Result<Self, WalletError> {
        let depth = self.depth.checked_add(1).ok_or_else(|| {
            WalletError::DerivationError("maximum derivation depth reached".to_string())
        })?;
        let index_bytes = index.to_be_bytes();
        let i = if index & HARDENED != 0 {
            let private_key = self.private_key_bytes();
            hmac_sha512(&self.chain_code[..], &[&[0u8][..], &private_key[..], &index_bytes[..]])?
        } else {
            hmac_sha512(&self.chain_code[..], &[&self.public_key()[..], &index_bytes[..]])?
        };

        let tweak: Option<Scalar> =
            Scalar::from_repr(FieldBytes::clone_from_slice(&i[..32])).into();
        let tweak = tweak.ok_or_else(|| {
            WalletError::DerivationError(format!("child {} tweak out of range", index))
        })?;
        let child: Option<NonZeroScalar> =
            NonZeroScalar::new(tweak + *self.secret.to_nonzero_scalar()).into();
        let child = child.ok_or_else(|| {
            WalletError::DerivationError(format!("child {} is the zero key", index))
        })?;

        let mut chain_code = Zeroizing::new([0u8; 32]);
        chain_code.copy_from_slice(&i[32..]);
        Ok(Self {
            depth,
            chain_code,
            secret: SecretKey::from(child),
        })
    }

    pub fn derive_path(&self, indices: &[u32]) -> Result<Self, WalletError> {
        indices
            .iter()
            .try_fold(self.clone(), |key, index| key.derive_child(*index))
    }

    /// Serialize a master key as a base58check `xprv` string.
    pub fn to_base58(&self) -> Result<Zeroizing<String>, WalletError> {
        if self.depth != 0 {
            return Err(WalletError::DerivationError(
                "only master keys are serialized".to_string(),
            ));
        }
        let mut payload = Zeroizing::new(Vec::with_capacity(EXTENDED_KEY_LEN));
        payload.extend_from_slice(&XPRV_VERSION);
        payload.push(0); // depth
        payload.extend_from_slice(&[0u8; 4]); // parent fingerprint
        payload.extend_from_slice(&[0u8; 4]); // child number
        payload.extend_from_slice(&self.chain_code[..]);
        payload.push(0);
        payload.extend_from_slice(&self.private_key_bytes()[..]);
        Ok(Zeroizing::new(bs58::encode(payload.as_slice()).with_check().into_string()))
    }

    /// Parse a base58check `xprv` string.
    pub fn from_base58(encoded: &str) -> Result<Self, WalletError> {
        let payload = Zeroizing::new(
            bs58::decode(encoded.trim())
                .with_check(None)
                .into_vec()
                .map_err(|e| WalletError::DerivationError(format!("invalid extended key: {}", e)))?,
        );
        if payload.len() != EXTENDED_KEY_LEN || payload[..4] != XPRV_VERSION || payload[45] != 0 {
            return Err(WalletError::DerivationError(
                "not an extended private key".to_string(),
            ));
        }
        let secret = SecretKey::from_bytes(FieldBytes::from_slice(&payload[46..78]))
            .map_err(|_| WalletError::DerivationError("invalid private key in xprv".to_string()))?;
        let mut chain_code = Zeroizing::new([0u8; 32]);
        chain_code.copy_from_slice(&payload[13..45]);
        Ok(Self {
            depth: payload[4],
            chain_code,
            secret,
        })
    }
}

/// Key pair for one account, already integrity checked.
pub struct DerivedKeyPair {
    pub private_key: Zeroizing<[u8; 32]>,
    pub public_key: [u8; 33],
}

impl DerivedKeyPair {
    /// Build a pair from raw private key bytes, computing the public key with
    /// the signing library.
    pub fn from_private_key(private_key: &[u8]) -> Result<Self, WalletError> {
        let secp = secp256k1::Secp256k1::signing_only();
        let secret = secp256k1::SecretKey::from_slice(private_key)
            .map_err(|e| WalletError::CryptoError(format!("invalid private key: {}", e)))?;
        let public_key = secp256k1::PublicKey::from_secret_key(&secp, &secret).serialize();
        let mut bytes = Zeroizing::new([0u8; 32]);
        bytes.copy_from_slice(&secret.secret_bytes());
        Ok(Self {
            private_key: bytes,
            public_key,
        })
    }

    pub fn address(&self) -> Address {
        Address::from_public_key(&self.public_key)
    }

    pub fn secret_key(&self) -> Result<secp256k1::SecretKey, WalletError> {
        secp256k1::SecretKey::from_slice(&self.private_key[..])
            .map_err(|e| WalletError::CryptoError(format!("invalid private key: {}", e)))
    }
}

/// Derive the key pair for `account_index` under `root`.
pub fn derive_account(
    root: &ExtendedPrivateKey,
    coin_type: u32,
    account_index: u32,
) -> Result<DerivedKeyPair, WalletError> {
    let path = Bip44Path::receive(coin_type, account_index);
    let child = root.derive_path(&path.to_derivation_path())?;
    verify_key_integrity(&child.private_key_bytes(), &child.public_key())
}

/// Recompute the public key with `secp256k1` and compare it to the one the
/// derivation engine produced.
pub fn verify_key_integrity(
    private_key: &[u8; 32],
    engine_public_key: &[u8; 33],
) -> Result<DerivedKeyPair, WalletError> {
    let pair = DerivedKeyPair::from_private_key(private_key)
        .map_err(|_| WalletError::KeyIntegrityError)?;
    if &pair.public_key != engine_public_key {
        return Err(WalletError::KeyIntegrityError);
    }
    Ok(pair)
}

/// Compressed public key carried by a base58check `xpub` string.
pub fn parse_extended_public_key(encoded: &str) -> Result<[u8; 33], WalletError> {
    let payload = bs58::decode(encoded.trim())
        .with_check(None)
        .into_vec()
        .map_err(|e| WalletError::DerivationError(format!("invalid extended key: {}", e)))?;
    if payload.len() != EXTENDED_KEY_LEN || payload[..4] != XPUB_VERSION {
        return Err(WalletError::DerivationError(
            "not an extended public key".to_string(),
        ));
    }
    let key = &payload[45..78];
    k256::PublicKey::from_sec1_bytes(key)
        .map_err(|_| WalletError::DerivationError("invalid public key in xpub".to_string()))?;
    let mut out = [0u8; 33];
    out.copy_from_slice(key);
    Ok(out)
}

pub fn address_from_extended_public_key(encoded: &str) -> Result<Address, WalletError> {
    parse_extended_public_key(encoded).map(|key| Address::from_public_key(&key))
}

fn hmac_sha512(key: &[u8], parts: &[&[u8]]) -> Result<Zeroizing<[u8; 64]>, WalletError> {
    let mut mac = HmacSha512::new_from_slice(key)
        .map_err(|e| WalletError::CryptoError(format!("HMAC initialization failed: {}", e)))?;
    for part in parts {
        mac.update(part);
    }
    let mut out = Zeroizing::new([0u8; 64]);
    out.copy_from_slice(&mac.finalize().into_bytes());
    Ok(out)
}
