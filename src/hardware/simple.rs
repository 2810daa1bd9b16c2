//! Simple hardware signer.
//!
//! The device derives its own accounts and receives the canonical transaction
//! bytes; it hashes and signs on-device and answers `{signature, recovery}`.

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tracing::{info, warn};

use super::{exchange_with_timeout, parse_signature, DeviceRequest, DeviceTransport};
use crate::core::address::Address;
use crate::core::errors::WalletError;
use crate::core::wallet_info::TxSignature;

pub struct SimpleDevice {
    transport: Arc<dyn DeviceTransport>,
    timeout: Duration,
}

impl SimpleDevice {
    pub fn new(transport: Arc<dyn DeviceTransport>, timeout: Duration) -> Self {
        Self { transport, timeout }
    }

    /// Addresses of accounts `start..start + count`.
    pub async fn addresses(&self, start: u32, count: u32) -> Result<Vec<Address>, WalletError> {
        let reply = exchange_with_timeout(
            self.transport.as_ref(),
            &DeviceRequest::GetAddresses { start_index: start, count },
            self.timeout,
        )
        .await?;
        if let Some(error) = reply.get("error") {
            return Err(WalletError::DeviceUnavailable(format!("device refused address request: {}", error)));
        }
        let list = reply
            .get("addresses")
            .or(Some(&reply))
            .and_then(Value::as_array)
            .ok_or_else(|| WalletError::DeviceUnavailable("malformed address reply".to_string()))?;
        list.iter()
            .map(|entry| {
                entry
                    .as_str()
                    .and_then(|s| s.parse::<Address>().ok())
                    .ok_or_else(|| WalletError::DeviceUnavailable(format!("device returned bad address {}", entry)))
            })
            .collect()
    }

    /// Ask the device to sign the encoded transaction for `account`.
    /// Every failure here, including a timeout, is a signing failure.
    pub async fn sign(&self, account: u32, encoded_tx: &[u8]) -> Result<TxSignature, WalletError> {
        let request = DeviceRequest::Sign {
            index: account,
            raw_tx_hex: hex::encode(encoded_tx),
        };
        let reply = exchange_with_timeout(self.transport.as_ref(), &request, self.timeout)
            .await
            .map_err(|e| WalletError::HardwareSignFailure(e.to_string()))?;
        match parse_signature(reply.get("signature"), reply.get("recovery")) {
            Some(signature) => {
                info!(account, "device signed transaction");
                Ok(signature)
            }
            None => {
                warn!(account, "device returned no usable signature");
                Err(WalletError::HardwareSignFailure(
                    "device returned no usable signature".to_string(),
                ))
            }
        }
    }
}
