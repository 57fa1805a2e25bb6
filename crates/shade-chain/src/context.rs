//! context hash
//!
//! `context = keccak256(abi.encode((processooor, data), scope)) mod p`
//! binds a withdrawal proof to the exact processor and relay payload it
//! was produced for. the reduction into the field is mandatory: the raw
//! digest need not be a valid field element.

use alloy::primitives::{keccak256, U256};
use alloy::sol_types::SolValue;
use ark_bn254::Fr;
use ark_ff::PrimeField;

use crate::types::Withdrawal;

/// compute the field-reduced context for a withdrawal under a scope
pub fn calculate_context(withdrawal: &Withdrawal, scope: U256) -> Fr {
    let encoded = (
        (withdrawal.processooor, withdrawal.data.clone()),
        scope,
    )
        .abi_encode();
    let digest = keccak256(&encoded);
    Fr::from_be_bytes_mod_order(digest.as_slice())
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::{address, Bytes};

    fn sample() -> Withdrawal {
        Withdrawal::new(
            address!("0x3333333333333333333333333333333333333333"),
            Bytes::from(vec![1u8, 2, 3, 4]),
        )
    }

    #[test]
    fn test_context_deterministic() {
        let scope = U256::from(77u64);
        assert_eq!(
            calculate_context(&sample(), scope),
            calculate_context(&sample(), scope)
        );
    }

    #[test]
    fn test_context_binds_every_input() {
        let scope = U256::from(77u64);
        let base = calculate_context(&sample(), scope);

        // different scope
        assert_ne!(base, calculate_context(&sample(), U256::from(78u64)));

        // tampered data
        let mut tampered = sample();
        tampered.data = Bytes::from(vec![1u8, 2, 3, 5]);
        assert_ne!(base, calculate_context(&tampered, scope));

        // different processor
        let mut other = sample();
        other.processooor = address!("0x4444444444444444444444444444444444444444");
        assert_ne!(base, calculate_context(&other, scope));
    }

    #[test]
    fn test_context_is_reduced() {
        // round-tripping through the canonical encoding is the identity
        // exactly when the value is below the modulus
        let context = calculate_context(&sample(), U256::MAX);
        let bytes = shade_core::field::fr_to_bytes_be(&context);
        assert_eq!(Fr::from_be_bytes_mod_order(&bytes), context);
    }
}
