//! Aliases for secret buffers that must be zeroized on drop.
use zeroize::Zeroizing;

/// Decrypted key material; zeroed when dropped.
pub type SecretVec = Zeroizing<Vec<u8>>;

pub fn vec_to_secret(v: Vec<u8>) -> SecretVec {
    Zeroizing::new(v)
}

/// Decode a hex secret without leaving an unzeroized copy behind.
pub fn hex_to_secret(hex_str: &str) -> Result<SecretVec, hex::FromHexError> {
    hex::decode(hex_str.trim()).map(Zeroizing::new)
}
