// HTTP client for the ledger's REST API.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, error, info};

use super::traits::{LedgerClient, TransactionInfo};
use crate::core::amount::Amount;
use crate::core::config::LedgerConfig;
use crate::core::errors::WalletError;
use crate::core::wallet_info::{AddressSnapshot, PendingTx, SignedTransaction};

#[derive(Debug, Deserialize)]
struct AddressResponse {
    balance: Amount,
    nonce: i64,
    #[serde(default)]
    pendings: Vec<PendingResponse>,
}

#[derive(Debug, Deserialize)]
struct PendingResponse {
    amount: Amount,
    fee: Amount,
    nonce: u32,
}

#[derive(Debug, Clone)]
pub struct HttpLedgerClient {
    http: reqwest::Client,
    api_base: String,
}

impl HttpLedgerClient {
    pub fn new(config: &LedgerConfig) -> Result<Self, WalletError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| WalletError::ConfigError(format!("HTTP client: {}", e)))?;
        Ok(Self {
            http,
            api_base: format!(
                "{}/api/{}",
                config.base_url.trim_end_matches('/'),
                config.api_version
            ),
        })
    }

    async fn get_json(&self, path: &str) -> Result<Value, WalletError> {
        let url = format!("{}/{}", self.api_base, path);
        debug!(%url, "ledger GET");
        let response = self.http.get(&url).send().await?;
        let status = response.status();
        let body: Value = response.json().await?;
        if !status.is_success() {
            return Err(WalletError::NetworkError(format!(
                "GET {} returned {}: {}",
                path,
                status,
                error_message(&body)
            )));
        }
        Ok(body)
    }
}

/// Pull a readable message out of the ledger's error envelope
/// `{status, timestamp, error, message}`.
fn error_message(body: &Value) -> String {
    body.get("message")
        .and_then(Value::as_str)
        .or_else(|| body.get("error").and_then(Value::as_str))
        .map(str::to_string)
        .unwrap_or_else(|| body.to_string())
}

#[async_trait]
impl LedgerClient for HttpLedgerClient {
    async fn address_snapshot(&self, address: &str) -> Result<AddressSnapshot, WalletError> {
        let body = self.get_json(&format!("address/{}", address)).await?;
        let parsed: AddressResponse = serde_json::from_value(body)?;
        Ok(AddressSnapshot {
            balance: parsed.balance,
            confirmed_nonce: parsed.nonce,
            pending: parsed
                .pendings
                .into_iter()
                .map(|p| PendingTx { amount: p.amount, fee: p.fee, nonce: p.nonce })
                .collect(),
        })
    }

    async fn broadcast(&self, tx: &SignedTransaction) -> Result<String, WalletError> {
        let url = format!("{}/tx", self.api_base);
        info!(from = %tx.from, to = %tx.to, nonce = tx.nonce, "broadcasting transaction");
        let response = self.http.post(&url).json(tx).send().await?;
        let status = response.status();
        let body: Value = response.json().await?;

        match body.get("txHash").and_then(Value::as_str) {
            Some(hash) if status.is_success() => {
                info!(tx_hash = %hash, "transaction accepted");
                Ok(hash.to_string())
            }
            _ => {
                let message = error_message(&body);
                error!(%status, %message, "transaction rejected by ledger");
                Err(WalletError::SubmissionFailed(message))
            }
        }
    }

    async fn transaction(&self, hash: &str) -> Result<TransactionInfo, WalletError> {
        let body = self.get_json(&format!("tx/{}", hash)).await?;
        Ok(serde_json::from_value(body)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_error_message_prefers_message() {
        let body = json!({"status": 400, "timestamp": 1, "error": "Bad Request", "message": "nonce too low"});
        assert_eq!(error_message(&body), "nonce too low");
        assert_eq!(error_message(&json!({"error": "boom"})), "boom");
    }

    #[test]
    fn test_api_base() {
        let config = LedgerConfig {
            base_url: "http://localhost:2442/".into(),
            api_version: "v1".into(),
            timeout_secs: 5,
        };
        let client = HttpLedgerClient::new(&config).unwrap();
        assert_eq!(client.api_base, "http://localhost:2442/api/v1");
    }
}
