//! association set provider state
//!
//! the asp tree holds the labels the provider vouches for. removal never
//! shrinks the tree: the label's leaf is overwritten with `Poseidon1(0)`,
//! so proofs against historical roots stay checkable while new roots
//! exclude the label. beside the tree sits an append-only log of published
//! roots.

use ark_bn254::Fr;
use ark_ff::Zero;
use thiserror::Error;

use crate::poseidon::poseidon1;
use crate::tree::{LeanImt, MerkleProof, TreeError};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AspError {
    #[error("label not present in association set")]
    UnknownLabel,
    #[error("ipfs cid length {0} outside [32, 64]")]
    BadCid(usize),
    #[error(transparent)]
    Tree(#[from] TreeError),
}

pub type Result<T> = std::result::Result<T, AspError>;

/// the association set tree: labels approved by the provider
#[derive(Clone, Debug, Default)]
pub struct AspTree {
    tree: LeanImt,
}

impl AspTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_labels(labels: impl IntoIterator<Item = Fr>) -> Self {
        Self {
            tree: LeanImt::from_leaves(labels),
        }
    }

    pub fn root(&self) -> Fr {
        self.tree.root()
    }

    pub fn approve(&mut self, label: Fr) {
        self.tree.insert(label);
    }

    /// canonical delete: overwrite the label's leaf with `Poseidon1(0)`
    pub fn revoke(&mut self, label: &Fr) -> Result<()> {
        let index = self.tree.index_of(label).ok_or(AspError::UnknownLabel)?;
        self.tree.update(index, poseidon1(Fr::zero()))?;
        Ok(())
    }

    pub fn prove_membership(&self, label: &Fr) -> Result<MerkleProof> {
        let index = self.tree.index_of(label).ok_or(AspError::UnknownLabel)?;
        Ok(self.tree.generate_proof(index)?)
    }

    pub fn tree(&self) -> &LeanImt {
        &self.tree
    }
}

/// one published asp root
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AspRootEntry {
    pub root: Fr,
    pub ipfs_cid: String,
    pub timestamp: u64,
    pub index: u64,
}

/// append-only log of published asp roots
#[derive(Clone, Debug, Default)]
pub struct AspLog {
    entries: Vec<AspRootEntry>,
}

impl AspLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn publish(&mut self, root: Fr, ipfs_cid: String, timestamp: u64) -> Result<&AspRootEntry> {
        let len = ipfs_cid.len();
        if !(32..=64).contains(&len) {
            return Err(AspError::BadCid(len));
        }
        let index = self.entries.len() as u64;
        self.entries.push(AspRootEntry {
            root,
            ipfs_cid,
            timestamp,
            index,
        });
        Ok(self.entries.last().expect("just pushed"))
    }

    pub fn latest(&self) -> Option<&AspRootEntry> {
        self.entries.last()
    }

    pub fn by_index(&self, index: u64) -> Option<&AspRootEntry> {
        self.entries.get(index as usize)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CID: &str = "QmYwAPJzv5CZsnAzt8auVZRnQRMvQBjTC1vUvMpKgDxyzy";

    #[test]
    fn test_revocation_changes_root_once() {
        let labels = [Fr::from(10u64), Fr::from(20u64), Fr::from(30u64)];
        let mut asp = AspTree::from_labels(labels);
        let before = asp.root();

        asp.revoke(&Fr::from(20u64)).unwrap();
        assert_ne!(asp.root(), before);

        // the revoked label is gone; a second revoke fails
        assert!(matches!(
            asp.revoke(&Fr::from(20u64)),
            Err(AspError::UnknownLabel)
        ));

        // unrelated membership still proves against the new root
        let proof = asp.prove_membership(&Fr::from(30u64)).unwrap();
        assert_eq!(proof.compute_root(), asp.root());
    }

    #[test]
    fn test_log_is_append_only() {
        let mut log = AspLog::new();
        assert!(log.latest().is_none());

        log.publish(Fr::from(1u64), CID.into(), 1_000).unwrap();
        log.publish(Fr::from(2u64), CID.into(), 2_000).unwrap();

        assert_eq!(log.len(), 2);
        assert_eq!(log.latest().unwrap().index, 1);
        assert_eq!(log.by_index(0).unwrap().root, Fr::from(1u64));
        assert!(log.by_index(2).is_none());
    }

    #[test]
    fn test_cid_length_bounds() {
        let mut log = AspLog::new();
        assert!(matches!(
            log.publish(Fr::from(1u64), "short".into(), 0),
            Err(AspError::BadCid(5))
        ));
        assert!(log.publish(Fr::from(1u64), "a".repeat(64), 0).is_ok());
        assert!(log.publish(Fr::from(1u64), "a".repeat(65), 0).is_err());
    }
}
