//! proof calldata packing
//!
//! the verifier contract consumes `piB` with each row swapped —
//! `[b01, b00], [b11, b10]` — an endianness convention of the on-chain
//! pairing precompile wrapper, not a mathematical one. emitting the rows
//! unswapped produces well-formed calldata that never verifies, so the
//! swap lives here, at the single serialization boundary, with a
//! known-answer test pinning it.

use alloy::primitives::U256;
use ark_bn254::{Fq, G1Affine, G2Affine};
use ark_ff::{BigInteger, PrimeField};

use shade_core::fr_to_u256;
use shade_prover::{RagequitProof, WithdrawalProof};

use crate::types::{RagequitProofCalldata, WithdrawalProofCalldata};

fn fq_to_u256(x: &Fq) -> U256 {
    let raw = x.into_bigint().to_bytes_be();
    let mut bytes = [0u8; 32];
    bytes[32 - raw.len()..].copy_from_slice(&raw);
    U256::from_be_bytes(bytes)
}

fn g1_words(p: &G1Affine) -> [U256; 2] {
    [fq_to_u256(&p.x), fq_to_u256(&p.y)]
}

/// g2 point with the per-row swap applied
fn g2_words_swapped(p: &G2Affine) -> [[U256; 2]; 2] {
    [
        [fq_to_u256(&p.x.c1), fq_to_u256(&p.x.c0)],
        [fq_to_u256(&p.y.c1), fq_to_u256(&p.y.c0)],
    ]
}

pub fn pack_withdrawal_proof(proof: &WithdrawalProof) -> WithdrawalProofCalldata {
    WithdrawalProofCalldata {
        pA: g1_words(&proof.proof.a),
        pB: g2_words_swapped(&proof.proof.b),
        pC: g1_words(&proof.proof.c),
        pubSignals: proof
            .public_signals
            .to_array()
            .map(|signal| fr_to_u256(&signal)),
    }
}

pub fn pack_ragequit_proof(proof: &RagequitProof) -> RagequitProofCalldata {
    RagequitProofCalldata {
        pA: g1_words(&proof.proof.a),
        pB: g2_words_swapped(&proof.proof.b),
        pC: g1_words(&proof.proof.c),
        pubSignals: proof.public_signals.map(|signal| fr_to_u256(&signal)),
    }
}
