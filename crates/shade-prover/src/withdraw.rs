//! withdrawal circuit and proving service
//!
//! the circuit proves, without revealing the parent note: membership of
//! the parent commitment in the state tree, membership of its label in
//! the association set, correctness of the revealed nullifier hash, and
//! correctness of the remainder commitment for the withdrawn amount.

use ark_bn254::{Bn254, Fr};
use ark_crypto_primitives::snark::SNARK;
use ark_ff::Zero;
use ark_groth16::Groth16;
use ark_r1cs_std::alloc::AllocVar;
use ark_r1cs_std::boolean::Boolean;
use ark_r1cs_std::eq::EqGadget;
use ark_r1cs_std::fields::fp::FpVar;
use ark_relations::r1cs::{ConstraintSynthesizer, ConstraintSystemRef, SynthesisError};
use num_bigint::BigUint;

use shade_core::poseidon::{poseidon2, poseidon3};
use shade_core::tree::MerkleProof;
use shade_core::MAX_TREE_DEPTH;

use crate::artifacts::ArtifactStore;
use crate::error::{ProofError, Result};
use crate::gadgets::{enforce_bit_width, lean_imt_root, PoseidonGadget};
use crate::signals::WithdrawalPublicSignals;

/// on-chain values are at most 128 bits; the range checks below rule out
/// wrap-around in the remainder subtraction
const VALUE_BITS: usize = 128;

/// everything the prover needs for one withdrawal
#[derive(Clone, Debug)]
pub struct WithdrawalInput {
    pub withdrawn_value: Fr,
    pub context: Fr,
    pub label: Fr,
    pub existing_value: Fr,
    pub existing_nullifier: Fr,
    pub existing_secret: Fr,
    pub new_nullifier: Fr,
    pub new_secret: Fr,
    /// inclusion of the parent commitment in the state tree
    pub state_proof: MerkleProof,
    /// inclusion of the label in the asp tree
    pub asp_proof: MerkleProof,
}

/// groth16 proof plus the canonical eight public signals
#[derive(Clone, Debug)]
pub struct WithdrawalProof {
    pub proof: ark_groth16::Proof<Bn254>,
    pub public_signals: WithdrawalPublicSignals,
}

#[derive(Clone)]
pub struct WithdrawCircuit {
    pub signals: WithdrawalPublicSignals,
    pub label: Fr,
    pub existing_value: Fr,
    pub existing_nullifier: Fr,
    pub existing_secret: Fr,
    pub new_nullifier: Fr,
    pub new_secret: Fr,
    pub state_siblings: Vec<Fr>,
    pub state_index: usize,
    pub asp_siblings: Vec<Fr>,
    pub asp_index: usize,
}

impl WithdrawCircuit {
    /// shape-only instance for key generation
    pub fn blank() -> Self {
        Self {
            signals: WithdrawalPublicSignals::from_array(&[Fr::zero(); 8]),
            label: Fr::zero(),
            existing_value: Fr::zero(),
            existing_nullifier: Fr::zero(),
            existing_secret: Fr::zero(),
            new_nullifier: Fr::zero(),
            new_secret: Fr::zero(),
            state_siblings: vec![Fr::zero(); MAX_TREE_DEPTH],
            state_index: 0,
            asp_siblings: vec![Fr::zero(); MAX_TREE_DEPTH],
            asp_index: 0,
        }
    }
}

impl ConstraintSynthesizer<Fr> for WithdrawCircuit {
    fn generate_constraints(self, cs: ConstraintSystemRef<Fr>) -> std::result::Result<(), SynthesisError> {
        // public inputs, allocated in the canonical signal order
        let new_commitment_hash =
            FpVar::new_input(cs.clone(), || Ok(self.signals.new_commitment_hash))?;
        let existing_nullifier_hash =
            FpVar::new_input(cs.clone(), || Ok(self.signals.existing_nullifier_hash))?;
        let withdrawn_value = FpVar::new_input(cs.clone(), || Ok(self.signals.withdrawn_value))?;
        let state_root = FpVar::new_input(cs.clone(), || Ok(self.signals.state_root))?;
        let state_tree_depth =
            FpVar::new_input(cs.clone(), || Ok(self.signals.state_tree_depth))?;
        let asp_root = FpVar::new_input(cs.clone(), || Ok(self.signals.asp_root))?;
        let asp_tree_depth = FpVar::new_input(cs.clone(), || Ok(self.signals.asp_tree_depth))?;
        let context = FpVar::new_input(cs.clone(), || Ok(self.signals.context))?;

        // context carries no other constraint; square it so it stays part
        // of the proven statement
        let _context_bound = &context * &context;

        // private witnesses
        let label = FpVar::new_witness(cs.clone(), || Ok(self.label))?;
        let existing_value = FpVar::new_witness(cs.clone(), || Ok(self.existing_value))?;
        let existing_nullifier =
            FpVar::new_witness(cs.clone(), || Ok(self.existing_nullifier))?;
        let existing_secret = FpVar::new_witness(cs.clone(), || Ok(self.existing_secret))?;
        let new_nullifier = FpVar::new_witness(cs.clone(), || Ok(self.new_nullifier))?;
        let new_secret = FpVar::new_witness(cs.clone(), || Ok(self.new_secret))?;

        let state_siblings = alloc_siblings(&cs, &self.state_siblings)?;
        let state_bits = alloc_index_bits(&cs, self.state_index)?;
        let asp_siblings = alloc_siblings(&cs, &self.asp_siblings)?;
        let asp_bits = alloc_index_bits(&cs, self.asp_index)?;

        let h2 = PoseidonGadget::new(2)?;
        let h3 = PoseidonGadget::new(3)?;

        // the revealed nullifier hash opens the parent precommitment
        let existing_precommitment =
            h2.hash(&[existing_nullifier.clone(), existing_secret.clone()])?;
        existing_nullifier_hash.enforce_equal(&existing_precommitment)?;

        // parent commitment sits in the state tree
        let existing_commitment = h3.hash(&[
            existing_value.clone(),
            label.clone(),
            existing_precommitment,
        ])?;
        let folded_state_root = lean_imt_root(
            &existing_commitment,
            &state_bits,
            &state_siblings,
            &state_tree_depth,
            &h2,
        )?;
        folded_state_root.enforce_equal(&state_root)?;

        // the label is vouched for by the association set
        let folded_asp_root =
            lean_imt_root(&label, &asp_bits, &asp_siblings, &asp_tree_depth, &h2)?;
        folded_asp_root.enforce_equal(&asp_root)?;

        // withdrawn <= existing, both range-bound so the subtraction
        // cannot wrap
        enforce_bit_width(&existing_value, VALUE_BITS)?;
        enforce_bit_width(&withdrawn_value, VALUE_BITS)?;
        let remaining = &existing_value - &withdrawn_value;
        enforce_bit_width(&remaining, VALUE_BITS)?;

        // remainder note inherits the label under fresh secrets
        let new_precommitment = h2.hash(&[new_nullifier, new_secret])?;
        let new_commitment = h3.hash(&[remaining, label, new_precommitment])?;
        new_commitment_hash.enforce_equal(&new_commitment)?;

        Ok(())
    }
}

fn alloc_siblings(
    cs: &ConstraintSystemRef<Fr>,
    siblings: &[Fr],
) -> std::result::Result<Vec<FpVar<Fr>>, SynthesisError> {
    siblings
        .iter()
        .map(|s| FpVar::new_witness(cs.clone(), || Ok(*s)))
        .collect()
}

fn alloc_index_bits(
    cs: &ConstraintSystemRef<Fr>,
    index: usize,
) -> std::result::Result<Vec<Boolean<Fr>>, SynthesisError> {
    (0..MAX_TREE_DEPTH)
        .map(|i| Boolean::new_witness(cs.clone(), || Ok((index >> i) & 1 == 1)))
        .collect()
}

/// assemble the circuit and public signals from a withdrawal input
fn build_circuit(input: &WithdrawalInput) -> Result<WithdrawCircuit> {
    if to_biguint(input.withdrawn_value) > to_biguint(input.existing_value) {
        return Err(ProofError::GenerationFailed(
            "withdrawn value exceeds existing value".into(),
        ));
    }

    // the merkle proofs must open to the claimed preimage
    let existing_precommitment = poseidon2(input.existing_nullifier, input.existing_secret);
    let existing_commitment =
        poseidon3(input.existing_value, input.label, existing_precommitment);
    if input.state_proof.leaf != existing_commitment {
        return Err(ProofError::GenerationFailed(
            "state proof does not open to the parent commitment".into(),
        ));
    }
    if input.asp_proof.leaf != input.label {
        return Err(ProofError::GenerationFailed(
            "asp proof does not open to the label".into(),
        ));
    }

    let remaining = input.existing_value - input.withdrawn_value;
    let new_commitment_hash = poseidon3(
        remaining,
        input.label,
        poseidon2(input.new_nullifier, input.new_secret),
    );

    let signals = WithdrawalPublicSignals {
        new_commitment_hash,
        existing_nullifier_hash: existing_precommitment,
        withdrawn_value: input.withdrawn_value,
        state_root: input.state_proof.root,
        state_tree_depth: Fr::from(input.state_proof.actual_depth as u64),
        asp_root: input.asp_proof.root,
        asp_tree_depth: Fr::from(input.asp_proof.actual_depth as u64),
        context: input.context,
    };

    Ok(WithdrawCircuit {
        signals,
        label: input.label,
        existing_value: input.existing_value,
        existing_nullifier: input.existing_nullifier,
        existing_secret: input.existing_secret,
        new_nullifier: input.new_nullifier,
        new_secret: input.new_secret,
        state_siblings: input.state_proof.padded_siblings(MAX_TREE_DEPTH),
        state_index: input.state_proof.index,
        asp_siblings: input.asp_proof.padded_siblings(MAX_TREE_DEPTH),
        asp_index: input.asp_proof.index,
    })
}

/// produce a withdrawal proof under the loaded proving key
pub fn prove_withdrawal(
    artifacts: &ArtifactStore,
    input: &WithdrawalInput,
) -> Result<WithdrawalProof> {
    let circuit = build_circuit(input)?;
    let signals = circuit.signals;
    let proof = Groth16::<Bn254>::prove(
        &artifacts.withdraw().proving_key,
        circuit,
        &mut rand::thread_rng(),
    )
    .map_err(|e| ProofError::GenerationFailed(e.to_string()))?;
    Ok(WithdrawalProof {
        proof,
        public_signals: signals,
    })
}

/// groth16 verification against the loaded verification key
pub fn verify_withdrawal(artifacts: &ArtifactStore, proof: &WithdrawalProof) -> Result<bool> {
    Groth16::<Bn254>::verify_with_processed_vk(
        &artifacts.withdraw().prepared,
        &proof.public_signals.to_array(),
        &proof.proof,
    )
    .map_err(|e| ProofError::VerificationFailed(e.to_string()))
}

fn to_biguint(x: Fr) -> BigUint {
    use ark_ff::{BigInteger, PrimeField};
    BigUint::from_bytes_be(&x.into_bigint().to_bytes_be())
}
