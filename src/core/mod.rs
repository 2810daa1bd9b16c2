pub mod address;
pub mod amount;
pub mod bip44;
pub mod config;
pub mod encoding;
pub mod errors;
pub mod mnemonic;
pub mod wallet_info;
pub mod wallet_manager;

pub use address::Address;
pub use amount::Amount;
pub use errors::{FailureCase, WalletError};
pub use wallet_manager::WalletManager;
