//! shade core
//!
//! commitment/nullifier state machine for a shielded privacy pool:
//! poseidon hashing over the bn254 scalar field, deterministic key
//! derivation from a mnemonic, the deposit/withdrawal commitment model
//! and the lean incremental merkle tree both pool trees are built on.
//!
//! everything in this crate is pure and synchronous; proving, chain i/o
//! and relayer policy live in the sibling crates.

pub mod asp;
pub mod commitment;
pub mod field;
pub mod keys;
pub mod poseidon;
pub mod recover;
pub mod tree;

pub use commitment::{Commitment, CommitmentPreimage, Precommitment};
pub use field::{fr_from_hex, fr_from_u256, fr_to_u256, reduce_u256, to_fixed_hex};
pub use keys::MasterKeys;
pub use tree::{LeanImt, MerkleProof};

/// fixed circuit depth both inclusion proofs are padded to
pub const MAX_TREE_DEPTH: usize = 32;
