//! the commitment model
//!
//! a commitment is a shielded note `Poseidon3(value, label, precommitment)`
//! inserted into the pool's state tree. its precommitment hash
//! `Poseidon2(nullifier, secret)` is revealed on deposit and becomes the
//! nullifier hash revealed when the note is spent.

use alloy::primitives::U256;
use ark_bn254::Fr;
use ark_ff::Zero;
use thiserror::Error;

use crate::field::{fr_from_u256, FieldError};
use crate::poseidon::{hash_precommitment, poseidon3};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CommitmentError {
    #[error("{0} must be non-zero")]
    ZeroInput(&'static str),
    #[error(transparent)]
    Field(#[from] FieldError),
}

pub type Result<T> = std::result::Result<T, CommitmentError>;

/// (nullifier, secret) pair plus its hash, created before a deposit or a
/// withdrawal child commitment; the preimages stay private until spend
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Precommitment {
    pub nullifier: Fr,
    pub secret: Fr,
    pub hash: Fr,
}

impl Precommitment {
    pub fn new(nullifier: Fr, secret: Fr) -> Result<Self> {
        if nullifier.is_zero() {
            return Err(CommitmentError::ZeroInput("nullifier"));
        }
        if secret.is_zero() {
            return Err(CommitmentError::ZeroInput("secret"));
        }
        Ok(Self {
            nullifier,
            secret,
            hash: hash_precommitment(nullifier, secret),
        })
    }
}

/// what the commitment hash opens to
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CommitmentPreimage {
    pub value: U256,
    pub label: Fr,
    pub precommitment: Precommitment,
}

/// a complete shielded note
///
/// `nullifier_hash` equals the precommitment hash by construction: it is
/// the value revealed when this note is spent.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Commitment {
    pub hash: Fr,
    pub nullifier_hash: Fr,
    pub preimage: CommitmentPreimage,
}

impl Commitment {
    /// build the commitment for `(value, label)` under the given secrets
    pub fn compute(value: U256, label: Fr, nullifier: Fr, secret: Fr) -> Result<Self> {
        if label.is_zero() {
            return Err(CommitmentError::ZeroInput("label"));
        }
        let precommitment = Precommitment::new(nullifier, secret)?;
        let value_fr = fr_from_u256(value)?;
        let hash = poseidon3(value_fr, label, precommitment.hash);
        Ok(Self {
            hash,
            nullifier_hash: precommitment.hash,
            preimage: CommitmentPreimage {
                value,
                label,
                precommitment,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::fr_from_address;
    use crate::poseidon::poseidon2;
    use proptest::prelude::*;

    fn sample() -> Commitment {
        Commitment::compute(
            U256::from(10u64).pow(U256::from(18u64)),
            Fr::from(3u64),
            Fr::from(7u64),
            Fr::from(11u64),
        )
        .unwrap()
    }

    #[test]
    fn test_zero_inputs_rejected() {
        let v = U256::from(1u64);
        let one = Fr::from(1u64);
        assert!(Commitment::compute(v, Fr::zero(), one, one).is_err());
        assert!(Commitment::compute(v, one, Fr::zero(), one).is_err());
        assert!(Commitment::compute(v, one, one, Fr::zero()).is_err());
        // zero value is a legal note (full withdrawal remainder)
        assert!(Commitment::compute(U256::ZERO, one, one, one).is_ok());
    }

    #[test]
    fn test_hash_composition() {
        // the s1 vector: value 10^18, label from an address-derived poseidon,
        // nullifier 7, secret 11
        let value = U256::from(10u64).pow(U256::from(18u64));
        let depositor = fr_from_address(
            "0x9F2db792a6F2dAdf25D894cEd791080950bDE56f".parse().unwrap(),
        );
        let label = poseidon3(depositor, Fr::from(0x12345u64), Fr::from(1u64));
        let commitment =
            Commitment::compute(value, label, Fr::from(7u64), Fr::from(11u64)).unwrap();

        let expected_pre = poseidon2(Fr::from(7u64), Fr::from(11u64));
        assert_eq!(commitment.preimage.precommitment.hash, expected_pre);
        assert_eq!(commitment.nullifier_hash, expected_pre);
        assert_eq!(
            commitment.hash,
            poseidon3(crate::field::fr_from_u256(value).unwrap(), label, expected_pre)
        );
    }

    #[test]
    fn test_determinism() {
        assert_eq!(sample(), sample());
    }

    proptest! {
        /// changing any single input changes the hash; the nullifier hash
        /// only moves with the (nullifier, secret) pair
        #[test]
        fn prop_sensitivity(
            value in 1u128..,
            label in 1u64..,
            nullifier in 1u64..,
            secret in 1u64..,
            delta in 1u64..1000,
        ) {
            let base = Commitment::compute(
                U256::from(value),
                Fr::from(label),
                Fr::from(nullifier),
                Fr::from(secret),
            ).unwrap();

            let bumped_value = Commitment::compute(
                U256::from(value) + U256::from(delta),
                Fr::from(label),
                Fr::from(nullifier),
                Fr::from(secret),
            ).unwrap();
            prop_assert_ne!(base.hash, bumped_value.hash);
            // value does not enter the nullifier hash
            prop_assert_eq!(base.nullifier_hash, bumped_value.nullifier_hash);

            let bumped_label = Commitment::compute(
                U256::from(value),
                Fr::from(label) + Fr::from(delta),
                Fr::from(nullifier),
                Fr::from(secret),
            ).unwrap();
            prop_assert_ne!(base.hash, bumped_label.hash);
            prop_assert_eq!(base.nullifier_hash, bumped_label.nullifier_hash);

            let bumped_nullifier = Commitment::compute(
                U256::from(value),
                Fr::from(label),
                Fr::from(nullifier) + Fr::from(delta),
                Fr::from(secret),
            ).unwrap();
            prop_assert_ne!(base.hash, bumped_nullifier.hash);
            prop_assert_ne!(base.nullifier_hash, bumped_nullifier.nullifier_hash);
        }
    }
}
