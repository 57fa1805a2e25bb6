//! bn254 scalar field helpers
//!
//! every hash, commitment, label, nullifier and secret in the protocol is
//! an element of the snark scalar field. on the wire they travel as
//! 32-byte big-endian padded hex.

use alloy::primitives::{Address, U256};
use ark_bn254::Fr;
use ark_ff::{BigInteger, PrimeField};
use num_bigint::BigUint;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FieldError {
    #[error("invalid hex: {0}")]
    BadHex(String),
    #[error("value out of field: {0}")]
    OutOfField(String),
}

pub type Result<T> = std::result::Result<T, FieldError>;

/// snark scalar field modulus as a big integer
pub fn modulus() -> BigUint {
    BigUint::from_bytes_be(&Fr::MODULUS.to_bytes_be())
}

/// encode a field element as 0x-prefixed lowercase hex, padded to 32 bytes
pub fn to_fixed_hex(x: &Fr) -> String {
    let bytes = fr_to_bytes_be(x);
    format!("0x{}", hex::encode(bytes))
}

/// decode a 0x-prefixed (or bare) hex string into a field element
///
/// rejects malformed hex, values longer than 32 bytes and values at or
/// above the field modulus.
pub fn fr_from_hex(s: &str) -> Result<Fr> {
    let stripped = s.strip_prefix("0x").unwrap_or(s);
    if stripped.is_empty() {
        return Err(FieldError::BadHex("empty".into()));
    }
    // tolerate odd nibble counts by left-padding
    let padded = if stripped.len() % 2 == 1 {
        format!("0{stripped}")
    } else {
        stripped.to_string()
    };
    let bytes = hex::decode(&padded).map_err(|e| FieldError::BadHex(e.to_string()))?;
    if bytes.len() > 32 {
        return Err(FieldError::OutOfField(format!("{} bytes", bytes.len())));
    }
    let value = BigUint::from_bytes_be(&bytes);
    if value >= modulus() {
        return Err(FieldError::OutOfField(s.to_string()));
    }
    Ok(Fr::from_be_bytes_mod_order(&bytes))
}

/// big-endian 32-byte encoding of a field element
pub fn fr_to_bytes_be(x: &Fr) -> [u8; 32] {
    let raw = x.into_bigint().to_bytes_be();
    let mut out = [0u8; 32];
    out[32 - raw.len()..].copy_from_slice(&raw);
    out
}

/// strict conversion of an on-chain word into a field element
///
/// fails when the word is not a canonical field encoding. use
/// [`reduce_u256`] where the protocol mandates reduction instead.
pub fn fr_from_u256(x: U256) -> Result<Fr> {
    let bytes = x.to_be_bytes::<32>();
    if BigUint::from_bytes_be(&bytes) >= modulus() {
        return Err(FieldError::OutOfField(x.to_string()));
    }
    Ok(Fr::from_be_bytes_mod_order(&bytes))
}

/// reduce an on-chain word into the field
pub fn reduce_u256(x: U256) -> Fr {
    Fr::from_be_bytes_mod_order(&x.to_be_bytes::<32>())
}

pub fn fr_to_u256(x: &Fr) -> U256 {
    U256::from_be_bytes(fr_to_bytes_be(x))
}

/// interpret a 20-byte address as a field element
pub fn fr_from_address(a: Address) -> Fr {
    Fr::from_be_bytes_mod_order(a.as_slice())
}
