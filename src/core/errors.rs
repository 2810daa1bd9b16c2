//! Wallet error type and the numeric failure table handed back to callers.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Failure code reported through a send/sign outcome.
///
/// Most failures are a bare number. The gated device additionally reports the
/// remaining password attempts, passed through verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FailureCase {
    Code(u32),
    Attempts { error: u32, remain_attemp: String },
}

impl FailureCase {
    pub fn code(&self) -> u32 {
        match self {
            FailureCase::Code(code) => *code,
            FailureCase::Attempts { error, .. } => *error,
        }
    }
}

/// Numeric failure codes shared with the UI layer.
pub mod codes {
    pub const INVALID_PASSWORD: u32 = 1;
    pub const INVALID_SOURCE_ADDRESS: u32 = 1;
    pub const INVALID_DESTINATION: u32 = 2;
    pub const SEND_FAILED: u32 = 3;
    pub const DEVICE_SIGN_FAILED: u32 = 4;
    pub const SECOND_FACTOR_REJECTED: u32 = 5;

    pub const DEVICE_NOT_FOUND: u32 = 20;
    pub const DEVICE_PASSWORD_NOT_SET: u32 = 21;
    pub const DEVICE_WALLET_NOT_SET: u32 = 22;
    pub const DEVICE_WRONG_PASSWORD: u32 = 23;
    pub const DEVICE_RESET: u32 = 26;
    pub const DEVICE_INVALID_SOURCE: u32 = 27;
    pub const DEVICE_SIGN_REJECTED: u32 = 28;
    pub const DEVICE_LOCKOUT_WARNING: u32 = 29;
    pub const DEVICE_ACCOUNT_LIST_FAILED: u32 = 30;
    pub const DEVICE_WALLET_CHECK_FAILED: u32 = 32;
}

/// Error reply from the gated device, kept exactly as the device sent it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceFailure {
    pub code: u32,
    pub remaining_attempts: Option<String>,
}

impl DeviceFailure {
    pub fn new(code: u32) -> Self {
        Self { code, remaining_attempts: None }
    }

    pub fn case(&self) -> FailureCase {
        match &self.remaining_attempts {
            Some(remaining) => FailureCase::Attempts {
                error: self.code,
                remain_attemp: remaining.clone(),
            },
            None => FailureCase::Code(self.code),
        }
    }
}

impl std::fmt::Display for DeviceFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.remaining_attempts {
            Some(remaining) => write!(f, "device error {} ({} attempts left)", self.code, remaining),
            None => write!(f, "device error {}", self.code),
        }
    }
}

/// Custom error type for wallet operations.
#[derive(Debug, Error)]
pub enum WalletError {
    #[error("Wallet name already in use: {0}")]
    DuplicateName(String),

    #[error("Wallet address already in use: {0}")]
    DuplicateAddress(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid mnemonic: {0}")]
    InvalidMnemonic(String),

    #[error("Unsupported wordlist: {0}")]
    AmbiguousWordlist(String),

    #[error("Key derivation error: {0}")]
    DerivationError(String),

    /// Derived key failed the cross-library public key comparison.
    #[error("Derived key failed integrity check")]
    KeyIntegrityError,

    #[error("Invalid source address: {0}")]
    InvalidSourceAddress(String),

    #[error("Invalid destination address: {0}")]
    InvalidDestinationAddress(String),

    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Account state error: {0}")]
    AccountStateError(String),

    #[error("Insufficient funds: need {needed}, spendable {spendable}")]
    InsufficientFunds { needed: String, spendable: String },

    #[error("Invalid password")]
    InvalidPassword,

    #[error("Hardware signing failed: {0}")]
    HardwareSignFailure(String),

    #[error("Hardware device failure: {0}")]
    Device(DeviceFailure),

    #[error("Hardware wallet was reset")]
    DeviceReset,

    #[error("Hardware device unavailable: {0}")]
    DeviceUnavailable(String),

    #[error("Second factor code rejected")]
    SecondFactorRejected,

    #[error("Second factor already enabled")]
    SecondFactorAlreadyEnabled,

    #[error("Second factor not enabled")]
    SecondFactorNotEnabled,

    #[error("Transaction submission failed: {0}")]
    SubmissionFailed(String),

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Timeout error: {0}")]
    TimeoutError(String),

    #[error("Storage error: {0}")]
    StorageError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Crypto error: {0}")]
    CryptoError(String),
}

impl WalletError {
    /// Network hiccups and timeouts are worth a retry; nothing else is.
    pub fn is_retryable(&self) -> bool {
        matches!(self, WalletError::NetworkError(_) | WalletError::TimeoutError(_))
    }

    /// Map onto the numeric failure table.
    ///
    /// Device-specific stages convert their own errors before they get here,
    /// so a bare timeout or transport error lands in the generic send bucket.
    pub fn failure_case(&self) -> FailureCase {
        use codes::*;
        match self {
            WalletError::InvalidPassword
            | WalletError::NotFound(_)
            | WalletError::InvalidMnemonic(_)
            | WalletError::DerivationError(_)
            | WalletError::KeyIntegrityError
            | WalletError::CryptoError(_) => FailureCase::Code(INVALID_PASSWORD),
            WalletError::InvalidSourceAddress(_) => FailureCase::Code(INVALID_SOURCE_ADDRESS),
            WalletError::InvalidDestinationAddress(_) => FailureCase::Code(INVALID_DESTINATION),
            WalletError::HardwareSignFailure(_) => FailureCase::Code(DEVICE_SIGN_FAILED),
            WalletError::SecondFactorRejected => FailureCase::Code(SECOND_FACTOR_REJECTED),
            WalletError::Device(failure) => failure.case(),
            WalletError::DeviceReset => FailureCase::Code(DEVICE_RESET),
            _ => FailureCase::Code(SEND_FAILED),
        }
    }
}

impl From<std::io::Error> for WalletError {
    fn from(err: std::io::Error) -> Self {
        WalletError::StorageError(err.to_string())
    }
}

impl From<serde_json::Error> for WalletError {
    fn from(err: serde_json::Error) -> Self {
        WalletError::SerializationError(err.to_string())
    }
}

impl From<sqlx::Error> for WalletError {
    fn from(err: sqlx::Error) -> Self {
        WalletError::StorageError(err.to_string())
    }
}

impl From<reqwest::Error> for WalletError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            WalletError::TimeoutError(err.to_string())
        } else {
            WalletError::NetworkError(err.to_string())
        }
    }
}

impl From<hex::FromHexError> for WalletError {
    fn from(err: hex::FromHexError) -> Self {
        WalletError::SerializationError(format!("invalid hex: {}", err))
    }
}
