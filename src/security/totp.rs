//! Time-based one-time codes (RFC 6238): HMAC-SHA1, 30 second step, 6 digits.
//!
//! Verification accepts the current step only; there is no drift window.

use base32::Alphabet;
use hmac::{Hmac, Mac};
use rand::rngs::OsRng;
use rand::RngCore;
use sha1::Sha1;
use subtle::ConstantTimeEq;
use url::Url;
use zeroize::Zeroizing;

use crate::core::errors::WalletError;

type HmacSha1 = Hmac<Sha1>;

pub const STEP_SECS: u64 = 30;
pub const DIGITS: u32 = 6;
const SECRET_LEN: usize = 20;
const BASE32: Alphabet = Alphabet::RFC4648 { padding: false };

/// A new secret and the provisioning URI for authenticator apps.
#[derive(Debug, Clone)]
pub struct GeneratedSecret {
    pub secret: Zeroizing<String>,
    pub uri: String,
}

/// Decode a base32 secret, tolerant of spaces, lower case and padding.
pub fn decode_secret(secret: &str) -> Result<Zeroizing<Vec<u8>>, WalletError> {
    let cleaned: String = secret
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '=')
        .map(|c| c.to_ascii_uppercase())
        .collect();
    if cleaned.is_empty() {
        return Err(WalletError::CryptoError("empty one-time secret".to_string()));
    }
    base32::decode(BASE32, &cleaned)
        .map(Zeroizing::new)
        .ok_or_else(|| WalletError::CryptoError("one-time secret is not valid base32".to_string()))
}

pub fn generate_secret(label: &str, issuer: &str) -> Result<GeneratedSecret, WalletError> {
    let mut bytes = Zeroizing::new([0u8; SECRET_LEN]);
    OsRng.fill_bytes(&mut bytes[..]);
    let secret = Zeroizing::new(base32::encode(BASE32, &bytes[..]));
    let uri = provisioning_uri(label, &secret, issuer)?;
    Ok(GeneratedSecret { secret, uri })
}

/// `otpauth://totp/<label>?secret=..&issuer=..` for authenticator apps.
pub fn provisioning_uri(label: &str, secret: &str, issuer: &str) -> Result<String, WalletError> {
    let mut uri = Url::parse("otpauth://totp/")
        .map_err(|e| WalletError::CryptoError(format!("provisioning URI: {}", e)))?;
    uri.path_segments_mut()
        .map_err(|_| WalletError::CryptoError("provisioning URI has no path".to_string()))?
        .clear()
        .push(label);
    uri.query_pairs_mut()
        .append_pair("secret", secret)
        .append_pair("issuer", issuer);
    Ok(uri.into())
}

pub fn time_step(unix_secs: u64) -> u64 {
    unix_secs / STEP_SECS
}

/// HOTP value for `counter` (RFC 4226 dynamic truncation).
pub fn code_at_step(secret: &[u8], counter: u64) -> Result<String, WalletError> {
    let mut mac = HmacSha1::new_from_slice(secret)
        .map_err(|e| WalletError::CryptoError(format!("HMAC initialization failed: {}", e)))?;
    mac.update(&counter.to_be_bytes());
    let digest = mac.finalize().into_bytes();
    let offset = (digest[digest.len() - 1] & 0x0f) as usize;
    let binary = (u32::from(digest[offset] & 0x7f) << 24)
        | (u32::from(digest[offset + 1]) << 16)
        | (u32::from(digest[offset + 2]) << 8)
        | u32::from(digest[offset + 3]);
    let code = binary % 10u32.pow(DIGITS);
    Ok(format!("{:0width$}", code, width = DIGITS as usize))
}

pub fn code_at(secret: &[u8], unix_secs: u64) -> Result<String, WalletError> {
    code_at_step(secret, time_step(unix_secs))
}

/// True only when `token` is the code of the step containing `unix_secs`.
pub fn verify_at(secret: &[u8], token: &str, unix_secs: u64) -> Result<bool, WalletError> {
    let token = token.trim();
    if token.len() != DIGITS as usize || !token.bytes().all(|b| b.is_ascii_digit()) {
        return Ok(false);
    }
    let expected = code_at(secret, unix_secs)?;
    Ok(bool::from(expected.as_bytes().ct_eq(token.as_bytes())))
}

pub fn now_unix() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    // RFC 6238 appendix B seed for SHA1
    const RFC_SECRET: &[u8] = b"12345678901234567890";

    #[test]
    fn test_rfc6238_vectors() {
        // Eight-digit reference values truncated to six digits.
        assert_eq!(code_at(RFC_SECRET, 59).unwrap(), "287082");
        assert_eq!(code_at(RFC_SECRET, 1111111109).unwrap(), "081804");
        assert_eq!(code_at(RFC_SECRET, 1234567890).unwrap(), "005924");
        assert_eq!(code_at(RFC_SECRET, 2000000000).unwrap(), "279037");
    }

    #[test]
    fn test_same_step_accepts_other_steps_reject() {
        let now = 1_700_000_010;
        let token = code_at(RFC_SECRET, now).unwrap();
        assert!(verify_at(RFC_SECRET, &token, now).unwrap());
        assert!(verify_at(RFC_SECRET, &token, now + 5).unwrap());
        assert!(!verify_at(RFC_SECRET, &token, now + STEP_SECS).unwrap());
        assert!(!verify_at(RFC_SECRET, &token, now - STEP_SECS).unwrap());
    }

    #[test]
    fn test_malformed_tokens_rejected() {
        assert!(!verify_at(RFC_SECRET, "12345", 59).unwrap());
        assert!(!verify_at(RFC_SECRET, "abcdef", 59).unwrap());
    }

    #[test]
    fn test_generated_secret_decodes() {
        let generated = generate_secret("my wallet", "HD Wallet").unwrap();
        assert_eq!(decode_secret(&generated.secret).unwrap().len(), SECRET_LEN);
        assert!(generated.uri.starts_with("otpauth://totp/my%20wallet?secret="));
        assert!(generated.uri.ends_with("&issuer=HD+Wallet"));
    }

    #[test]
    fn test_provisioning_uri_escapes_label_and_issuer() {
        let uri = provisioning_uri("alice@example.com/main", "GEZDGNBV", "A&B").unwrap();
        assert_eq!(uri, "otpauth://totp/alice@example.com%2Fmain?secret=GEZDGNBV&issuer=A%26B");
        let parsed = Url::parse(&uri).unwrap();
        let pairs: Vec<(String, String)> = parsed.query_pairs().into_owned().collect();
        assert_eq!(pairs[1], ("issuer".to_string(), "A&B".to_string()));
    }

    #[test]
    fn test_decode_secret_is_lenient() {
        let encoded = base32::encode(BASE32, RFC_SECRET);
        let spaced = format!("{} ", encoded.to_lowercase());
        assert_eq!(decode_secret(&spaced).unwrap().as_slice(), RFC_SECRET);
        assert!(decode_secret("").is_err());
    }
}
