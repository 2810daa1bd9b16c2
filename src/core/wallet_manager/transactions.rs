//! Send flow
//!
//! second factor → parse → resolve signer → lock source → prepare → sign →
//! broadcast. Every failure is folded into a [`SendOutcome`] carrying the
//! numeric case from the failure table.

use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};
use zeroize::Zeroizing;

use super::signing::SignerKind;
use super::WalletManager;
use crate::blockchain::TransactionInfo;
use crate::core::address::Address;
use crate::core::amount::Amount;
use crate::core::errors::{FailureCase, WalletError};
use crate::core::wallet_info::SignedTransaction;

/// One-time code plus the passphrase that unlocks the stored secret.
pub struct SecondFactorProof {
    pub token: String,
    pub passphrase: Zeroizing<String>,
}

#[derive(Debug)]
pub struct SendRequest {
    pub signer: SignerKind,
    pub to: String,
    /// Decimal string, at most 9 fractional digits.
    pub amount: String,
    pub fee: String,
    pub nonce: Option<u32>,
    pub second_factor: Option<SecondFactorProof>,
}

impl std::fmt::Debug for SecondFactorProof {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecondFactorProof").finish_non_exhaustive()
    }
}

/// Result handed back to the caller of [`WalletManager::send`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SendOutcome {
    pub res: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub case: Option<FailureCase>,
    #[serde(rename = "txHash", default, skip_serializing_if = "Option::is_none")]
    pub tx_hash: Option<String>,
}

impl SendOutcome {
    pub fn success(tx_hash: String) -> Self {
        Self { res: true, case: None, tx_hash: Some(tx_hash) }
    }

    pub fn failure(err: &WalletError) -> Self {
        Self { res: false, case: Some(err.failure_case()), tx_hash: None }
    }
}

fn parse_amount(raw: &str) -> Result<Amount, WalletError> {
    raw.parse()
}

impl WalletManager {
    /// Prepare, sign and submit one transaction. Never returns an error; the
    /// failure is described by the outcome's `case`.
    pub async fn send(&self, request: SendRequest) -> SendOutcome {
        let signer = request.signer.label();
        match self.try_send(&request).await {
            Ok(hash) => {
                info!(signer, to = %request.to, tx_hash = %hash, "transaction submitted");
                SendOutcome::success(hash)
            }
            Err(err) => {
                let outcome = SendOutcome::failure(&err);
                match &err {
                    WalletError::SubmissionFailed(_) | WalletError::NetworkError(_) => {
                        error!(signer, to = %request.to, "send failed, check the address history before resending: {}", err)
                    }
                    _ => warn!(signer, to = %request.to, case = ?outcome.case, "send refused: {}", err),
                }
                outcome
            }
        }
    }

    /// The same flow as [`send`](Self::send), keeping the typed error.
    pub async fn try_send(&self, request: &SendRequest) -> Result<String, WalletError> {
        if self.second_factor_enabled().await? {
            let accepted = match &request.second_factor {
                Some(proof) => self.verify_second_factor(&proof.token, &proof.passphrase).await?,
                None => false,
            };
            if !accepted {
                return Err(WalletError::SecondFactorRejected);
            }
        }

        let amount = parse_amount(&request.amount)?;
        let fee = parse_amount(&request.fee)?;
        let to: Address = request
            .to
            .parse()
            .map_err(|e| WalletError::InvalidDestinationAddress(format!("{}: {}", request.to, e)))?;

        let signer = self.resolve_signer(&request.signer).await?;
        let from = signer.source.to_string();
        let _guard = self.address_locks.lock(&from).await;

        let prepared = self
            .prepare_transaction(&from, &to.to_string(), amount, fee, request.nonce)
            .await?;
        let signature = self.sign_prepared(&signer, &prepared).await?;
        let signed = SignedTransaction::new(&prepared, &signature);
        self.ledger.broadcast(&signed).await
    }

    /// Look a transaction up on the ledger by hash.
    pub async fn transaction_status(&self, hash: &str) -> Result<TransactionInfo, WalletError> {
        self.ledger.transaction(hash).await
    }
}
