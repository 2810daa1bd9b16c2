//! Canonical transaction encoding and the signing digest.
//!
//! The byte layout is the protobuf wire format of
//! `{1: from bytes, 2: to bytes, 3: amount uint64, 4: fee uint64, 5: nonce uint32}`.
//! Every field is always written, in field order, so the encoding of a given
//! transaction is unique and every signer hashes the same bytes.

use blake2::digest::consts::U32;
use blake2::{Blake2b, Digest};
use protobuf::CodedOutputStream;

use crate::core::errors::WalletError;
use crate::core::wallet_info::PreparedTransaction;

type Blake2b256 = Blake2b<U32>;

const FIELD_FROM: u32 = 1;
const FIELD_TO: u32 = 2;
const FIELD_AMOUNT: u32 = 3;
const FIELD_FEE: u32 = 4;
const FIELD_NONCE: u32 = 5;

pub fn blake2b_256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Blake2b256::new();
    hasher.update(data);
    hasher.finalize().into()
}

fn write_fields(os: &mut CodedOutputStream<'_>, tx: &PreparedTransaction) -> protobuf::Result<()> {
    os.write_bytes(FIELD_FROM, tx.from.as_bytes())?;
    os.write_bytes(FIELD_TO, tx.to.as_bytes())?;
    os.write_uint64(FIELD_AMOUNT, tx.amount.units())?;
    os.write_uint64(FIELD_FEE, tx.fee.units())?;
    os.write_uint32(FIELD_NONCE, tx.nonce)?;
    os.flush()
}

pub fn encode_transaction(tx: &PreparedTransaction) -> Result<Vec<u8>, WalletError> {
    let mut buf = Vec::with_capacity(64);
    {
        let mut os = CodedOutputStream::vec(&mut buf);
        write_fields(&mut os, tx)
            .map_err(|e| WalletError::SerializationError(format!("transaction encoding: {}", e)))?;
    }
    Ok(buf)
}

pub fn transaction_digest(encoded: &[u8]) -> [u8; 32] {
    blake2b_256(encoded)
}
