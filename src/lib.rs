// src/lib.rs
//! HD hot wallet: key custody, derivation, transaction preparation and
//! signer dispatch for an account/nonce ledger.

pub mod blockchain;
pub mod cli;
pub mod core;
pub mod hardware;
pub mod security;
pub mod storage;
