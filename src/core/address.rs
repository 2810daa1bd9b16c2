//! Account addresses.
//!
//! An address is the last 20 bytes of `blake2b-256(compressed public key)`.
//! Its string form is `"H" + base58(bytes) + checksum`, where the checksum is
//! the first four characters of `base58(blake2b-256(bytes))`.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::core::encoding::blake2b_256;

pub const ADDRESS_LEN: usize = 20;
const PREFIX: char = 'H';
const CHECKSUM_LEN: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Address([u8; ADDRESS_LEN]);

/// Why an address string could not be decoded.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AddressError {
    #[error("address must start with '{}'", PREFIX)]
    MissingPrefix,
    #[error("address is too short")]
    TooShort,
    #[error("address is not valid base58")]
    InvalidBase58,
    #[error("address must decode to {} bytes, got {0}", ADDRESS_LEN)]
    InvalidLength(usize),
    #[error("address checksum mismatch")]
    ChecksumMismatch,
}

impl Address {
    pub fn from_bytes(bytes: [u8; ADDRESS_LEN]) -> Self {
        Address(bytes)
    }

    pub fn from_public_key(public_key: &[u8]) -> Self {
        let hash = blake2b_256(public_key);
        let mut bytes = [0u8; ADDRESS_LEN];
        bytes.copy_from_slice(&hash[32 - ADDRESS_LEN..]);
        Address(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; ADDRESS_LEN] {
        &self.0
    }

    fn checksum(bytes: &[u8]) -> String {
        let encoded = bs58::encode(blake2b_256(bytes)).into_string();
        encoded.chars().take(CHECKSUM_LEN).collect()
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{}{}",
            PREFIX,
            bs58::encode(self.0).into_string(),
            Self::checksum(&self.0)
        )
    }
}

impl FromStr for Address {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let body = s.strip_prefix(PREFIX).ok_or(AddressError::MissingPrefix)?;
        if body.len() <= CHECKSUM_LEN || !body.is_ascii() {
            return Err(AddressError::TooShort);
        }
        let (encoded, checksum) = body.split_at(body.len() - CHECKSUM_LEN);
        let bytes = bs58::decode(encoded)
            .into_vec()
            .map_err(|_| AddressError::InvalidBase58)?;
        if bytes.len() != ADDRESS_LEN {
            return Err(AddressError::InvalidLength(bytes.len()));
        }
        if Self::checksum(&bytes) != checksum {
            return Err(AddressError::ChecksumMismatch);
        }
        let mut out = [0u8; ADDRESS_LEN];
        out.copy_from_slice(&bytes);
        Ok(Address(out))
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Address {
        Address::from_public_key(&[2u8; 33])
    }

    #[test]
    fn test_string_round_trip() {
        let address = sample();
        let text = address.to_string();
        assert!(text.starts_with('H'));
        assert_eq!(text.parse::<Address>().unwrap(), address);
    }

    #[test]
    fn test_rejects_missing_prefix() {
        let text = sample().to_string();
        assert_eq!(text[1..].parse::<Address>(), Err(AddressError::MissingPrefix));
    }

    #[test]
    fn test_rejects_bad_checksum() {
        let mut text = sample().to_string();
        let last = text.pop().unwrap();
        text.push(if last == '1' { '2' } else { '1' });
        assert_eq!(text.parse::<Address>(), Err(AddressError::ChecksumMismatch));
    }

    #[test]
    fn test_rejects_wrong_length() {
        let short = format!("H{}", bs58::encode([1u8; 10]).into_string());
        let checksum = Address::checksum(&[1u8; 10]);
        assert_eq!(
            format!("{}{}", short, checksum).parse::<Address>(),
            Err(AddressError::InvalidLength(10))
        );
    }

    #[test]
    fn test_rejects_non_base58() {
        assert_eq!("H0OIl00000".parse::<Address>(), Err(AddressError::InvalidBase58));
    }

    #[test]
    fn test_address_is_hash_suffix() {
        let public_key = [3u8; 33];
        let hash = blake2b_256(&public_key);
        assert_eq!(Address::from_public_key(&public_key).as_bytes()[..], hash[12..]);
    }
}
