//! canonical public-signal layouts
//!
//! the circuit interface is a hidden contract: prover inputs, on-chain
//! calldata and relayer parsing all derive from the single ordering
//! defined here. `assert_signal_order` runs at relayer startup so a
//! permutation can never reach production silently.

use ark_bn254::Fr;

use crate::error::{ProofError, Result};

/// withdrawal circuit public signals, in wire order
pub const WITHDRAWAL_SIGNAL_ORDER: [&str; 8] = [
    "newCommitmentHash",
    "existingNullifierHash",
    "withdrawnValue",
    "stateRoot",
    "stateTreeDepth",
    "ASPRoot",
    "ASPTreeDepth",
    "context",
];

/// ragequit (commitment) circuit public signals, in wire order
pub const RAGEQUIT_SIGNAL_ORDER: [&str; 4] =
    ["commitmentHash", "nullifierHash", "value", "label"];

/// parsed withdrawal public signals
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WithdrawalPublicSignals {
    pub new_commitment_hash: Fr,
    pub existing_nullifier_hash: Fr,
    pub withdrawn_value: Fr,
    pub state_root: Fr,
    pub state_tree_depth: Fr,
    pub asp_root: Fr,
    pub asp_tree_depth: Fr,
    pub context: Fr,
}

impl WithdrawalPublicSignals {
    pub fn to_array(&self) -> [Fr; 8] {
        [
            self.new_commitment_hash,
            self.existing_nullifier_hash,
            self.withdrawn_value,
            self.state_root,
            self.state_tree_depth,
            self.asp_root,
            self.asp_tree_depth,
            self.context,
        ]
    }

    pub fn from_array(signals: &[Fr; 8]) -> Self {
        Self {
            new_commitment_hash: signals[0],
            existing_nullifier_hash: signals[1],
            withdrawn_value: signals[2],
            state_root: signals[3],
            state_tree_depth: signals[4],
            asp_root: signals[5],
            asp_tree_depth: signals[6],
            context: signals[7],
        }
    }

    /// parse from wire hex, rejecting malformed or out-of-field entries
    pub fn from_hex(signals: &[String]) -> Result<Self> {
        if signals.len() != 8 {
            return Err(ProofError::BadField(format!(
                "expected 8 public signals, got {}",
                signals.len()
            )));
        }
        let mut parsed = [Fr::from(0u64); 8];
        for (slot, raw) in parsed.iter_mut().zip(signals.iter()) {
            *slot = shade_core::fr_from_hex(raw)?;
        }
        Ok(Self::from_array(&parsed))
    }
}

/// startup self-check: a round trip through the array layout must land
/// every signal back in its named slot
pub fn assert_signal_order() {
    let sample = WithdrawalPublicSignals {
        new_commitment_hash: Fr::from(1u64),
        existing_nullifier_hash: Fr::from(2u64),
        withdrawn_value: Fr::from(3u64),
        state_root: Fr::from(4u64),
        state_tree_depth: Fr::from(5u64),
        asp_root: Fr::from(6u64),
        asp_tree_depth: Fr::from(7u64),
        context: Fr::from(8u64),
    };
    let array = sample.to_array();
    for (i, expected) in (1u64..=8).enumerate() {
        assert_eq!(
            array[i],
            Fr::from(expected),
            "public signal {} out of order",
            WITHDRAWAL_SIGNAL_ORDER[i]
        );
    }
    assert_eq!(WithdrawalPublicSignals::from_array(&array), sample);
}

#[cfg(test)]
mod tests {
    use super::*;
    use shade_core::to_fixed_hex;

    #[test]
    fn test_signal_order_holds() {
        assert_signal_order();
    }

    #[test]
    fn test_hex_roundtrip() {
        let sample = WithdrawalPublicSignals {
            new_commitment_hash: Fr::from(10u64),
            existing_nullifier_hash: Fr::from(20u64),
            withdrawn_value: Fr::from(30u64),
            state_root: Fr::from(40u64),
            state_tree_depth: Fr::from(2u64),
            asp_root: Fr::from(50u64),
            asp_tree_depth: Fr::from(1u64),
            context: Fr::from(60u64),
        };
        let hexes: Vec<String> = sample.to_array().iter().map(to_fixed_hex).collect();
        assert_eq!(WithdrawalPublicSignals::from_hex(&hexes).unwrap(), sample);
    }

    #[test]
    fn test_wrong_arity_rejected() {
        assert!(WithdrawalPublicSignals::from_hex(&vec!["0x1".into(); 7]).is_err());
    }
}
