//! Password-gated hardware signer.
//!
//! Every call may fail with a device error code, sent either as
//! `{"error": n}` or `{"error": {"error": n, "remain_attemp": "k"}}`. Codes are
//! passed through untouched. Code 26 means the device wiped its wallet; after
//! that the driver refuses everything except creating a new wallet.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tracing::{info, warn};

use super::{exchange_with_timeout, parse_signature, DeviceRequest, DeviceTransport};
use crate::core::address::Address;
use crate::core::bip44::{address_from_extended_public_key, Bip44Path};
use crate::core::errors::{codes, DeviceFailure, WalletError};
use crate::core::wallet_info::TxSignature;

pub struct GatedDevice {
    transport: Arc<dyn DeviceTransport>,
    timeout: Duration,
    reset: AtomicBool,
}

/// Device error carried by a reply, if any.
fn reply_failure(reply: &Value) -> Option<DeviceFailure> {
    let error = reply.get("error")?;
    match error {
        Value::Number(n) => Some(DeviceFailure::new(n.as_u64()? as u32)),
        Value::Object(inner) => {
            let code = inner.get("error")?.as_u64()? as u32;
            let remaining_attempts = inner.get("remain_attemp").map(|v| match v {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            });
            Some(DeviceFailure { code, remaining_attempts })
        }
        _ => None,
    }
}

fn reply_bool(reply: &Value) -> Option<bool> {
    reply.as_bool().or_else(|| reply.get("result").and_then(Value::as_bool))
}

impl GatedDevice {
    pub fn new(transport: Arc<dyn DeviceTransport>, timeout: Duration) -> Self {
        Self {
            transport,
            timeout,
            reset: AtomicBool::new(false),
        }
    }

    pub fn is_reset(&self) -> bool {
        self.reset.load(Ordering::SeqCst)
    }

    /// One round trip. Unreachable devices report 20, timeouts and malformed
    /// replies report `stage_code`, device errors pass through.
    async fn call(&self, request: DeviceRequest, stage_code: u32) -> Result<Value, WalletError> {
        let creating = matches!(request, DeviceRequest::CreateWallet { .. });
        if self.is_reset() && !creating {
            return Err(WalletError::DeviceReset);
        }
        let reply = match exchange_with_timeout(self.transport.as_ref(), &request, self.timeout).await {
            Ok(reply) => reply,
            Err(WalletError::DeviceUnavailable(reason)) => {
                warn!(method = request.method(), %reason, "gated device unavailable");
                return Err(WalletError::Device(DeviceFailure::new(codes::DEVICE_NOT_FOUND)));
            }
            Err(e) => {
                warn!(method = request.method(), "gated device call failed: {}", e);
                return Err(WalletError::Device(DeviceFailure::new(stage_code)));
            }
        };
        if let Some(failure) = reply_failure(&reply) {
            if failure.code == codes::DEVICE_RESET {
                warn!("gated device reports its wallet was reset");
                self.reset.store(true, Ordering::SeqCst);
                return Err(WalletError::DeviceReset);
            }
            warn!(method = request.method(), code = failure.code, "gated device error");
            return Err(WalletError::Device(failure));
        }
        Ok(reply)
    }

    pub async fn password_is_set(&self) -> Result<bool, WalletError> {
        let reply = self
            .call(DeviceRequest::CheckPasswordSetting, codes::DEVICE_WALLET_CHECK_FAILED)
            .await?;
        reply_bool(&reply).ok_or(WalletError::Device(DeviceFailure::new(codes::DEVICE_WALLET_CHECK_FAILED)))
    }

    pub async fn wallet_is_set(&self, password: &str) -> Result<bool, WalletError> {
        let reply = self
            .call(
                DeviceRequest::CheckWalletSetting { password: password.to_string() },
                codes::DEVICE_WALLET_CHECK_FAILED,
            )
            .await?;
        reply_bool(&reply).ok_or(WalletError::Device(DeviceFailure::new(codes::DEVICE_WALLET_CHECK_FAILED)))
    }

    /// Extended public keys of accounts `start..start + count`.
    pub async fn extended_keys(&self, password: &str, start: u32, count: u32) -> Result<Vec<String>, WalletError> {
        let reply = self
            .call(
                DeviceRequest::GetExtendedKey {
                    password: password.to_string(),
                    start_index: start,
                    count,
                },
                codes::DEVICE_ACCOUNT_LIST_FAILED,
            )
            .await?;
        let keys = reply
            .get("keys")
            .or(Some(&reply))
            .and_then(Value::as_array)
            .ok_or(WalletError::Device(DeviceFailure::new(codes::DEVICE_ACCOUNT_LIST_FAILED)))?;
        keys.iter()
            .map(|k| {
                k.as_str()
                    .map(str::to_string)
                    .ok_or(WalletError::Device(DeviceFailure::new(codes::DEVICE_ACCOUNT_LIST_FAILED)))
            })
            .collect()
    }

    pub async fn accounts(&self, password: &str, start: u32, count: u32) -> Result<Vec<Address>, WalletError> {
        self.extended_keys(password, start, count)
            .await?
            .iter()
            .map(|xpub| {
                address_from_extended_public_key(xpub)
                    .map_err(|_| WalletError::Device(DeviceFailure::new(codes::DEVICE_ACCOUNT_LIST_FAILED)))
            })
            .collect()
    }

    /// Sign a 32-byte digest with the key at `path`.
    pub async fn sign_digest(&self, password: &str, path: &Bip44Path, digest: &[u8; 32]) -> Result<TxSignature, WalletError> {
        let reply = self
            .call(
                DeviceRequest::SignDigest {
                    password: password.to_string(),
                    path: path.to_string(),
                    hash: hex::encode(digest),
                },
                codes::DEVICE_SIGN_REJECTED,
            )
            .await?;
        parse_signature(reply.get("sig"), reply.get("recid"))
            .ok_or(WalletError::Device(DeviceFailure::new(codes::DEVICE_SIGN_REJECTED)))
    }

    pub async fn create_password(&self, password: &str) -> Result<(), WalletError> {
        self.call(
            DeviceRequest::CreatePassword { password: password.to_string() },
            codes::DEVICE_PASSWORD_NOT_SET,
        )
        .await?;
        info!("gated device password set");
        Ok(())
    }

    /// Create (or recreate) the device wallet. Clears a previous reset.
    pub async fn create_wallet(&self, name: &str, password: &str) -> Result<(), WalletError> {
        self.call(
            DeviceRequest::CreateWallet {
                name: name.to_string(),
                password: password.to_string(),
            },
            codes::DEVICE_WALLET_NOT_SET,
        )
        .await?;
        self.reset.store(false, Ordering::SeqCst);
        info!(wallet = %name, "gated device wallet created");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use serde_json::json;

    struct Scripted(Mutex<Vec<Result<Value, WalletError>>>);

    #[async_trait]
    impl DeviceTransport for Scripted {
        async fn exchange(&self, _request: &DeviceRequest) -> Result<Value, WalletError> {
            self.0.lock().remove(0)
        }
    }

    fn device(replies: Vec<Result<Value, WalletError>>) -> GatedDevice {
        GatedDevice::new(Arc::new(Scripted(Mutex::new(replies))), Duration::from_secs(1))
    }

    #[test]
    fn test_reply_failure_shapes() {
        assert_eq!(reply_failure(&json!({"error": 29})), Some(DeviceFailure::new(29)));
        assert_eq!(
            reply_failure(&json!({"error": {"error": 23, "remain_attemp": "7"}})),
            Some(DeviceFailure { code: 23, remaining_attempts: Some("7".into()) })
        );
        assert_eq!(reply_failure(&json!(true)), None);
    }

    #[tokio::test]
    async fn test_wrong_password_keeps_attempts() {
        let device = device(vec![Ok(json!({"error": {"error": 23, "remain_attemp": "4"}}))]);
        match device.wallet_is_set("bad").await {
            Err(WalletError::Device(failure)) => {
                assert_eq!(failure.code, 23);
                assert_eq!(failure.remaining_attempts.as_deref(), Some("4"));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_reset_poisons_until_wallet_created() {
        let device = device(vec![Ok(json!({"error": 26})), Ok(json!({"result": true})), Ok(json!(true))]);
        assert!(matches!(device.wallet_is_set("pw").await, Err(WalletError::DeviceReset)));
        assert!(matches!(device.wallet_is_set("pw").await, Err(WalletError::DeviceReset)));
        device.create_wallet("fresh", "pw").await.unwrap();
        assert!(device.wallet_is_set("pw").await.unwrap());
    }

    #[tokio::test]
    async fn test_unavailable_is_device_not_found() {
        let device = device(vec![Err(WalletError::DeviceUnavailable("unplugged".into()))]);
        match device.password_is_set().await {
            Err(WalletError::Device(failure)) => assert_eq!(failure.code, codes::DEVICE_NOT_FOUND),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_stage_code_on_timeout() {
        let device = device(vec![Err(WalletError::TimeoutError("slow".into()))]);
        match device.sign_digest("pw", &Bip44Path::receive(1397, 0), &[0u8; 32]).await {
            Err(WalletError::Device(failure)) => assert_eq!(failure.code, codes::DEVICE_SIGN_REJECTED),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_malformed_xpub_is_account_list_failure() {
        let device = device(vec![Ok(json!(["not-an-xpub"]))]);
        match device.accounts("pw", 0, 1).await {
            Err(WalletError::Device(failure)) => assert_eq!(failure.code, codes::DEVICE_ACCOUNT_LIST_FAILED),
            other => panic!("unexpected {:?}", other),
        }
    }
}
