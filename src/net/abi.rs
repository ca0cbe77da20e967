//! Minimal Solidity ABI helpers for the view calls the stake sources make.

use crate::stake::{Address, StakeAmount};
use once_cell::sync::Lazy;
use sha3::{Digest, Keccak256};
use thiserror::Error;

/// Width of one ABI word.
pub const WORD_BYTES: usize = 32;

/// `getStake(address,uint256)` selector.
pub static GET_STAKE_FOR_VALIDATOR: Lazy<[u8; 4]> =
    Lazy::new(|| selector("getStake(address,uint256)"));
/// `getStake(address)` selector.
pub static GET_STAKE: Lazy<[u8; 4]> = Lazy::new(|| selector("getStake(address)"));
/// `delegations(address)` selector.
pub static DELEGATIONS: Lazy<[u8; 4]> = Lazy::new(|| selector("delegations(address)"));

/// Errors raised while decoding call results.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AbiError {
    #[error("return data too short: {0} bytes")]
    /// Fewer than 32 bytes returned.
    Short(usize),
    #[error("uint256 does not fit in 128 bits")]
    /// The returned word has non-zero high bytes.
    Overflow,
}

/// First four bytes of the Keccak-256 hash of a canonical signature.
pub fn selector(signature: &str) -> [u8; 4] {
    let digest = Keccak256::digest(signature.as_bytes());
    let mut out = [0u8; 4];
    out.copy_from_slice(&digest[..4]);
    out
}

/// Left-pads an address to one word.
pub fn encode_address(address: &Address) -> [u8; WORD_BYTES] {
    let mut word = [0u8; WORD_BYTES];
    word[12..].copy_from_slice(address.as_bytes());
    word
}

/// Big-endian uint256 word.
pub fn encode_uint(value: u128) -> [u8; WORD_BYTES] {
    let mut word = [0u8; WORD_BYTES];
    word[16..].copy_from_slice(&value.to_be_bytes());
    word
}

/// Concatenates a selector with its argument words.
pub fn encode_call(selector: [u8; 4], args: &[[u8; WORD_BYTES]]) -> Vec<u8> {
    let mut data = Vec::with_capacity(4 + args.len() * WORD_BYTES);
    data.extend_from_slice(&selector);
    for word in args {
        data.extend_from_slice(word);
    }
    data
}

/// Decodes the first returned word as an amount.
pub fn decode_amount(data: &[u8]) -> Result<StakeAmount, AbiError> {
    if data.len() < WORD_BYTES {
        return Err(AbiError::Short(data.len()));
    }
    let (high, low) = data[..WORD_BYTES].split_at(16);
    if high.iter().any(|b| *b != 0) {
        return Err(AbiError::Overflow);
    }
    let mut buf = [0u8; 16];
    buf.copy_from_slice(low);
    Ok(StakeAmount::from_base_units(u128::from_be_bytes(buf)))
}
