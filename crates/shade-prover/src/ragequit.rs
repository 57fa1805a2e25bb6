//! commitment circuit and ragequit proving service
//!
//! ragequit lets the original depositor exit without association-set
//! approval: the proof opens the commitment in public, revealing value
//! and label alongside the nullifier hash.

use ark_bn254::{Bn254, Fr};
use ark_crypto_primitives::snark::SNARK;
use ark_ff::Zero;
use ark_groth16::Groth16;
use ark_r1cs_std::alloc::AllocVar;
use ark_r1cs_std::eq::EqGadget;
use ark_r1cs_std::fields::fp::FpVar;
use ark_relations::r1cs::{ConstraintSynthesizer, ConstraintSystemRef, SynthesisError};

use shade_core::poseidon::{poseidon2, poseidon3};

use crate::artifacts::ArtifactStore;
use crate::error::{ProofError, Result};
use crate::gadgets::PoseidonGadget;

/// preimage of the note being surrendered
#[derive(Clone, Copy, Debug)]
pub struct RagequitInput {
    pub value: Fr,
    pub label: Fr,
    pub nullifier: Fr,
    pub secret: Fr,
}

/// groth16 proof plus `[commitmentHash, nullifierHash, value, label]`
#[derive(Clone, Debug)]
pub struct RagequitProof {
    pub proof: ark_groth16::Proof<Bn254>,
    pub public_signals: [Fr; 4],
}

#[derive(Clone)]
pub struct CommitmentCircuit {
    pub commitment_hash: Fr,
    pub nullifier_hash: Fr,
    pub value: Fr,
    pub label: Fr,
    pub nullifier: Fr,
    pub secret: Fr,
}

impl CommitmentCircuit {
    pub fn blank() -> Self {
        Self {
            commitment_hash: Fr::zero(),
            nullifier_hash: Fr::zero(),
            value: Fr::zero(),
            label: Fr::zero(),
            nullifier: Fr::zero(),
            secret: Fr::zero(),
        }
    }
}

impl ConstraintSynthesizer<Fr> for CommitmentCircuit {
    fn generate_constraints(
        self,
        cs: ConstraintSystemRef<Fr>,
    ) -> std::result::Result<(), SynthesisError> {
        let commitment_hash = FpVar::new_input(cs.clone(), || Ok(self.commitment_hash))?;
        let nullifier_hash = FpVar::new_input(cs.clone(), || Ok(self.nullifier_hash))?;
        let value = FpVar::new_input(cs.clone(), || Ok(self.value))?;
        let label = FpVar::new_input(cs.clone(), || Ok(self.label))?;

        let nullifier = FpVar::new_witness(cs.clone(), || Ok(self.nullifier))?;
        let secret = FpVar::new_witness(cs.clone(), || Ok(self.secret))?;

        let h2 = PoseidonGadget::new(2)?;
        let h3 = PoseidonGadget::new(3)?;

        let precommitment = h2.hash(&[nullifier, secret])?;
        nullifier_hash.enforce_equal(&precommitment)?;

        let commitment = h3.hash(&[value, label, precommitment])?;
        commitment_hash.enforce_equal(&commitment)?;

        Ok(())
    }
}

/// produce a commitment proof for ragequit
pub fn prove_ragequit(artifacts: &ArtifactStore, input: &RagequitInput) -> Result<RagequitProof> {
    let precommitment = poseidon2(input.nullifier, input.secret);
    let commitment_hash = poseidon3(input.value, input.label, precommitment);
    let circuit = CommitmentCircuit {
        commitment_hash,
        nullifier_hash: precommitment,
        value: input.value,
        label: input.label,
        nullifier: input.nullifier,
        secret: input.secret,
    };

    let proof = Groth16::<Bn254>::prove(
        &artifacts.commitment().proving_key,
        circuit,
        &mut rand::thread_rng(),
    )
    .map_err(|e| ProofError::GenerationFailed(e.to_string()))?;

    Ok(RagequitProof {
        proof,
        public_signals: [commitment_hash, precommitment, input.value, input.label],
    })
}

pub fn verify_ragequit(artifacts: &ArtifactStore, proof: &RagequitProof) -> Result<bool> {
    Groth16::<Bn254>::verify_with_processed_vk(
        &artifacts.commitment().prepared,
        &proof.public_signals,
        &proof.proof,
    )
    .map_err(|e| ProofError::VerificationFailed(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ark_crypto_primitives::snark::CircuitSpecificSetupSNARK;
    use ark_relations::r1cs::ConstraintSystem;

    fn sample() -> RagequitInput {
        RagequitInput {
            value: Fr::from(1_000_000u64),
            label: Fr::from(0xA11CEu64),
            nullifier: Fr::from(7u64),
            secret: Fr::from(11u64),
        }
    }

    #[test]
    fn test_constraints_satisfied() {
        let input = sample();
        let circuit = CommitmentCircuit {
            commitment_hash: poseidon3(
                input.value,
                input.label,
                poseidon2(input.nullifier, input.secret),
            ),
            nullifier_hash: poseidon2(input.nullifier, input.secret),
            value: input.value,
            label: input.label,
            nullifier: input.nullifier,
            secret: input.secret,
        };
        let cs = ConstraintSystem::<Fr>::new_ref();
        circuit.generate_constraints(cs.clone()).unwrap();
        assert!(cs.is_satisfied().unwrap());
    }

    #[test]
    fn test_roundtrip_and_tamper() {
        let (pk, vk) =
            Groth16::<Bn254>::setup(CommitmentCircuit::blank(), &mut rand::thread_rng()).unwrap();
        let artifacts = ArtifactStore::from_keys_for_tests(pk, vk);

        let proof = prove_ragequit(&artifacts, &sample()).unwrap();
        assert!(verify_ragequit(&artifacts, &proof).unwrap());
        assert_eq!(proof.public_signals[2], Fr::from(1_000_000u64));

        let mut tampered = proof.clone();
        tampered.public_signals[3] += Fr::from(1u64);
        assert!(!verify_ragequit(&artifacts, &tampered).unwrap());
    }
}
