//! Hardware signer support
//!
//! Devices are reached through a [`DeviceTransport`]: one JSON request in, one
//! JSON reply out. Two device families are supported:
//! - [`SimpleDevice`]: hashes and signs the canonical transaction bytes itself.
//! - [`GatedDevice`]: password protected, signs a digest and reports rich
//!   error codes (remaining attempts, reset, lockout).

pub mod bridge;
pub mod gated;
pub mod simple;

use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::core::errors::WalletError;
use crate::core::wallet_info::TxSignature;

pub use bridge::BridgeTransport;
pub use gated::GatedDevice;
pub use simple::SimpleDevice;

/// Requests understood by device bridges.
#[derive(Clone, Serialize)]
#[serde(tag = "method", content = "params", rename_all = "camelCase")]
pub enum DeviceRequest {
    #[serde(rename_all = "camelCase")]
    GetAddresses { start_index: u32, count: u32 },
    #[serde(rename_all = "camelCase")]
    Sign { index: u32, raw_tx_hex: String },
    CheckPasswordSetting,
    #[serde(rename_all = "camelCase")]
    CheckWalletSetting { password: String },
    #[serde(rename_all = "camelCase")]
    GetExtendedKey { password: String, start_index: u32, count: u32 },
    #[serde(rename_all = "camelCase")]
    SignDigest { password: String, path: String, hash: String },
    #[serde(rename_all = "camelCase")]
    CreatePassword { password: String },
    #[serde(rename_all = "camelCase")]
    CreateWallet { name: String, password: String },
}

impl DeviceRequest {
    pub fn method(&self) -> &'static str {
        match self {
            DeviceRequest::GetAddresses { .. } => "getAddresses",
            DeviceRequest::Sign { .. } => "sign",
            DeviceRequest::CheckPasswordSetting => "checkPasswordSetting",
            DeviceRequest::CheckWalletSetting { .. } => "checkWalletSetting",
            DeviceRequest::GetExtendedKey { .. } => "getExtendedKey",
            DeviceRequest::SignDigest { .. } => "signDigest",
            DeviceRequest::CreatePassword { .. } => "createPassword",
            DeviceRequest::CreateWallet { .. } => "createWallet",
        }
    }
}

// Passwords ride inside requests, so only the method name is printed.
impl std::fmt::Debug for DeviceRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("DeviceRequest").field(&self.method()).finish()
    }
}

/// Request/response channel to a hardware device.
#[async_trait]
pub trait DeviceTransport: Send + Sync {
    /// Send one request and wait for its reply. Transport problems are
    /// reported as [`WalletError::DeviceUnavailable`].
    async fn exchange(&self, request: &DeviceRequest) -> Result<Value, WalletError>;
}

/// Run one exchange under a deadline. On expiry the pending call is dropped.
pub async fn exchange_with_timeout(
    transport: &dyn DeviceTransport,
    request: &DeviceRequest,
    timeout: Duration,
) -> Result<Value, WalletError> {
    debug!(method = request.method(), "device request");
    match tokio::time::timeout(timeout, transport.exchange(request)).await {
        Ok(result) => result,
        Err(_) => {
            warn!(method = request.method(), timeout_secs = timeout.as_secs(), "device timed out");
            Err(WalletError::TimeoutError(format!(
                "device did not answer {} within {:?}",
                request.method(),
                timeout
            )))
        }
    }
}

/// Parse a compact signature (hex) and recovery id as returned by a device.
pub(crate) fn parse_signature(signature: Option<&Value>, recovery: Option<&Value>) -> Option<TxSignature> {
    let bytes = hex::decode(signature?.as_str()?.trim_start_matches("0x")).ok()?;
    let recovery = match recovery? {
        Value::Number(n) => n.as_u64()?,
        Value::String(s) => s.parse().ok()?,
        _ => return None,
    };
    if bytes.len() != 64 || recovery > 3 {
        return None;
    }
    let mut signature = [0u8; 64];
    signature.copy_from_slice(&bytes);
    Some(TxSignature { signature, recovery: recovery as u8 })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_wire_shape() {
        let request = DeviceRequest::GetExtendedKey {
            password: "pw".into(),
            start_index: 2,
            count: 5,
        };
        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            json!({"method": "getExtendedKey", "params": {"password": "pw", "startIndex": 2, "count": 5}})
        );
        assert_eq!(
            serde_json::to_value(DeviceRequest::CheckPasswordSetting).unwrap(),
            json!({"method": "checkPasswordSetting"})
        );
    }

    #[test]
    fn test_parse_signature() {
        let sig = json!("ab".repeat(64));
        assert!(parse_signature(Some(&sig), Some(&json!(1))).is_some());
        assert!(parse_signature(Some(&sig), Some(&json!("0"))).is_some());
        assert!(parse_signature(Some(&sig), Some(&json!(4))).is_none());
        assert!(parse_signature(Some(&json!("abcd")), Some(&json!(0))).is_none());
        assert!(parse_signature(None, Some(&json!(0))).is_none());
    }

    #[test]
    fn test_debug_hides_password() {
        let request = DeviceRequest::CreatePassword { password: "hunter2".into() };
        assert!(!format!("{:?}", request).contains("hunter2"));
    }

    struct Silent;

    #[async_trait]
    impl DeviceTransport for Silent {
        async fn exchange(&self, _request: &DeviceRequest) -> Result<Value, WalletError> {
            std::future::pending().await
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_is_enforced() {
        let result = exchange_with_timeout(
            &Silent,
            &DeviceRequest::CheckPasswordSetting,
            Duration::from_secs(5),
        )
        .await;
        assert!(matches!(result, Err(WalletError::TimeoutError(_))));
    }
}
