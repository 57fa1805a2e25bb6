//! shade prover
//!
//! groth16 proving and verification for the two pool circuits: the
//! withdrawal circuit (membership in the state tree and the association
//! set, nullifier disclosure, remainder commitment) and the commitment
//! circuit backing ragequit. the in-circuit poseidon shares its constants
//! with the native hasher in shade-core, so both sides of every equation
//! hash identically.

pub mod artifacts;
pub mod error;
pub mod gadgets;
pub mod ragequit;
pub mod signals;
pub mod withdraw;

pub use artifacts::{ArtifactBackend, ArtifactStore};
pub use error::ProofError;
pub use ragequit::{prove_ragequit, verify_ragequit, RagequitInput, RagequitProof};
pub use signals::{WithdrawalPublicSignals, RAGEQUIT_SIGNAL_ORDER, WITHDRAWAL_SIGNAL_ORDER};
pub use withdraw::{prove_withdrawal, verify_withdrawal, WithdrawalInput, WithdrawalProof};
