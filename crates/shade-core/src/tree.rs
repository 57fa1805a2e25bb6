//! lean incremental merkle tree
//!
//! the tree both pool trees are built on: two-child nodes hash
//! `Poseidon2(left, right)`, a right-most node without a sibling promotes
//! unchanged, and depth grows as the size crosses powers of two. every
//! level is cached so append and positional update touch only the path
//! to the root.

use ark_bn254::Fr;
use ark_ff::Zero;
use thiserror::Error;

use crate::poseidon::poseidon2;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TreeError {
    #[error("leaf index {0} not found")]
    NotFound(usize),
}

pub type Result<T> = std::result::Result<T, TreeError>;

/// inclusion proof for a single leaf
///
/// `siblings` is minimal: levels where the path node has no sibling are
/// skipped, and bit `i` of `index` gives the path direction at the i-th
/// kept level. `actual_depth == siblings.len()`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MerkleProof {
    pub leaf: Fr,
    pub index: usize,
    pub siblings: Vec<Fr>,
    pub root: Fr,
    pub actual_depth: usize,
}

impl MerkleProof {
    /// right-pad the sibling list with zero elements up to `max_depth`,
    /// the shape the circuit consumes
    pub fn padded_siblings(&self, max_depth: usize) -> Vec<Fr> {
        let mut padded = self.siblings.clone();
        padded.resize(max_depth, Fr::zero());
        padded
    }

    /// recompute the root from the leaf and sibling path
    ///
    /// accepts both minimal and padded sibling lists; levels at or above
    /// `actual_depth` are ignored.
    pub fn compute_root(&self) -> Fr {
        let mut node = self.leaf;
        for (level, sibling) in self.siblings.iter().take(self.actual_depth).enumerate() {
            node = if (self.index >> level) & 1 == 1 {
                poseidon2(*sibling, node)
            } else {
                poseidon2(node, *sibling)
            };
        }
        node
    }
}

/// lean incremental merkle tree over field elements
#[derive(Clone, Debug, Default)]
pub struct LeanImt {
    /// levels[0] is the leaf layer; levels[depth] holds the root
    levels: Vec<Vec<Fr>>,
}

impl LeanImt {
    pub fn new() -> Self {
        Self { levels: Vec::new() }
    }

    pub fn from_leaves(leaves: impl IntoIterator<Item = Fr>) -> Self {
        let mut tree = Self::new();
        for leaf in leaves {
            tree.insert(leaf);
        }
        tree
    }

    pub fn size(&self) -> usize {
        self.levels.first().map_or(0, Vec::len)
    }

    /// ceil(log2(size)); 0 for the empty and single-leaf tree
    pub fn depth(&self) -> usize {
        self.levels.len().saturating_sub(1)
    }

    /// zero for the empty tree, the lone leaf for size one
    pub fn root(&self) -> Fr {
        self.levels.last().and_then(|l| l.first()).copied().unwrap_or_else(Fr::zero)
    }

    pub fn leaves(&self) -> &[Fr] {
        self.levels.first().map_or(&[], Vec::as_slice)
    }

    pub fn index_of(&self, leaf: &Fr) -> Option<usize> {
        self.leaves().iter().position(|l| l == leaf)
    }

    /// append a leaf, updating the right spine only
    pub fn insert(&mut self, leaf: Fr) {
        let new_size = self.size() + 1;
        let depth = ceil_log2(new_size);
        while self.levels.len() < depth + 1 {
            self.levels.push(Vec::new());
        }

        let mut node = leaf;
        let mut index = new_size - 1;
        for level in 0..depth {
            set_node(&mut self.levels[level], index, node);
            if index & 1 == 1 {
                node = poseidon2(self.levels[level][index - 1], node);
            }
            index >>= 1;
        }
        set_node(&mut self.levels[depth], 0, node);
    }

    /// replace the leaf at `index`, re-folding the affected path
    pub fn update(&mut self, index: usize, leaf: Fr) -> Result<()> {
        if index >= self.size() {
            return Err(TreeError::NotFound(index));
        }

        let depth = self.depth();
        let mut node = leaf;
        let mut idx = index;
        for level in 0..depth {
            set_node(&mut self.levels[level], idx, node);
            if idx & 1 == 1 {
                node = poseidon2(self.levels[level][idx - 1], node);
            } else if idx + 1 < self.levels[level].len() {
                node = poseidon2(node, self.levels[level][idx + 1]);
            }
            idx >>= 1;
        }
        set_node(&mut self.levels[depth], 0, node);
        Ok(())
    }

    /// minimal inclusion proof for the leaf at `index`
    pub fn generate_proof(&self, index: usize) -> Result<MerkleProof> {
        if index >= self.size() {
            return Err(TreeError::NotFound(index));
        }

        let mut siblings = Vec::new();
        let mut packed_index = 0usize;
        let mut idx = index;
        for level in 0..self.depth() {
            let sibling_idx = idx ^ 1;
            if sibling_idx < self.levels[level].len() {
                packed_index |= (idx & 1) << siblings.len();
                siblings.push(self.levels[level][sibling_idx]);
            }
            idx >>= 1;
        }

        let actual_depth = siblings.len();
        Ok(MerkleProof {
            leaf: self.levels[0][index],
            index: packed_index,
            siblings,
            root: self.root(),
            actual_depth,
        })
    }
}

fn set_node(level: &mut Vec<Fr>, index: usize, node: Fr) {
    if index < level.len() {
        level[index] = node;
    } else {
        debug_assert_eq!(index, level.len());
        level.push(node);
    }
}

fn ceil_log2(n: usize) -> usize {
    if n <= 1 {
        0
    } else {
        (usize::BITS - (n - 1).leading_zeros()) as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::poseidon::poseidon1;
    use crate::MAX_TREE_DEPTH;
    use proptest::prelude::*;

    fn leaves(n: u64) -> Vec<Fr> {
        (1..=n).map(Fr::from).collect()
    }

    #[test]
    fn test_empty_tree() {
        let tree = LeanImt::new();
        assert_eq!(tree.root(), Fr::zero());
        assert_eq!(tree.depth(), 0);
        assert_eq!(tree.size(), 0);
        assert!(tree.generate_proof(0).is_err());
    }

    #[test]
    fn test_single_leaf_root_is_leaf() {
        let leaf = Fr::from(42u64);
        let tree = LeanImt::from_leaves([leaf]);
        assert_eq!(tree.root(), leaf);
        assert_eq!(tree.depth(), 0);

        let proof = tree.generate_proof(0).unwrap();
        assert!(proof.siblings.is_empty());
        assert_eq!(proof.actual_depth, 0);
        assert_eq!(proof.compute_root(), leaf);
        // padding an empty sibling list yields all zeros
        assert!(proof
            .padded_siblings(MAX_TREE_DEPTH)
            .iter()
            .all(|s| s.is_zero()));
    }

    #[test]
    fn test_odd_node_promotes_unhashed() {
        // three leaves: root = H(H(a, b), c), the lone c promotes at level 0
        let (a, b, c) = (Fr::from(1u64), Fr::from(2u64), Fr::from(3u64));
        let tree = LeanImt::from_leaves([a, b, c]);
        assert_eq!(tree.depth(), 2);
        assert_eq!(tree.root(), poseidon2(poseidon2(a, b), c));

        // c's proof skips the sibling-less level
        let proof = tree.generate_proof(2).unwrap();
        assert_eq!(proof.siblings, vec![poseidon2(a, b)]);
        assert_eq!(proof.actual_depth, 1);
        assert_eq!(proof.index, 1);
        assert_eq!(proof.compute_root(), tree.root());
    }

    #[test]
    fn test_depth_growth() {
        let mut tree = LeanImt::new();
        let expected = [0usize, 0, 1, 2, 2, 3, 3, 3, 3, 4];
        for (i, want) in expected.iter().enumerate().skip(1) {
            tree.insert(Fr::from(i as u64));
            assert_eq!(tree.size(), i);
            assert_eq!(tree.depth(), *want, "depth after {} inserts", i);
        }
    }

    #[test]
    fn test_sixteen_leaves_all_proofs_verify() {
        let tree = LeanImt::from_leaves(leaves(16));
        for i in 0..16 {
            let proof = tree.generate_proof(i).unwrap();
            assert_eq!(proof.compute_root(), tree.root(), "proof for index {}", i);
            assert!(proof.actual_depth <= MAX_TREE_DEPTH);
        }

        // a 17th leaf moves the root deterministically
        let root_before = tree.root();
        let mut grown = tree.clone();
        grown.insert(Fr::from(17u64));
        assert_ne!(grown.root(), root_before);
        let mut again = LeanImt::from_leaves(leaves(17));
        assert_eq!(again.root(), grown.root());
        again.insert(Fr::from(18u64));
        assert_ne!(again.root(), grown.root());
    }

    #[test]
    fn test_update_refolds_root() {
        let mut tree = LeanImt::from_leaves(leaves(5));
        let reference = {
            let mut l = leaves(5);
            l[3] = Fr::from(99u64);
            LeanImt::from_leaves(l)
        };
        tree.update(3, Fr::from(99u64)).unwrap();
        assert_eq!(tree.root(), reference.root());
        assert!(tree.update(5, Fr::from(1u64)).is_err());
    }

    #[test]
    fn test_label_removal_keeps_unrelated_proofs_valid() {
        // overwrite index 1 with Poseidon1(0) as the asp tree does on
        // removal; a regenerated proof for an unrelated index must verify
        // against the new root
        let mut tree = LeanImt::from_leaves(leaves(8));
        tree.update(1, poseidon1(Fr::zero())).unwrap();

        let proof = tree.generate_proof(5).unwrap();
        assert_eq!(proof.compute_root(), tree.root());

        // a proof generated against the old root no longer matches
        let stale = LeanImt::from_leaves(leaves(8)).generate_proof(5).unwrap();
        assert_ne!(stale.root, tree.root());
    }

    #[test]
    fn test_index_of() {
        let tree = LeanImt::from_leaves(leaves(4));
        assert_eq!(tree.index_of(&Fr::from(3u64)), Some(2));
        assert_eq!(tree.index_of(&Fr::from(9u64)), None);
    }

    proptest! {
        /// every proof of every tree recomputes to the tree root, with and
        /// without fixed-depth padding
        #[test]
        fn prop_proofs_verify(seeds in proptest::collection::vec(1u64..u64::MAX, 1..40)) {
            let tree = LeanImt::from_leaves(seeds.iter().copied().map(Fr::from));
            for i in 0..tree.size() {
                let proof = tree.generate_proof(i).unwrap();
                prop_assert_eq!(proof.compute_root(), tree.root());

                let padded = MerkleProof {
                    siblings: proof.padded_siblings(MAX_TREE_DEPTH),
                    ..proof.clone()
                };
                prop_assert_eq!(padded.compute_root(), tree.root());
            }
        }

        /// incremental insertion matches bulk construction
        #[test]
        fn prop_insert_matches_rebuild(seeds in proptest::collection::vec(1u64..u64::MAX, 2..32)) {
            let mut incremental = LeanImt::new();
            for s in &seeds {
                incremental.insert(Fr::from(*s));
            }
            let bulk = LeanImt::from_leaves(seeds.iter().copied().map(Fr::from));
            prop_assert_eq!(incremental.root(), bulk.root());
            prop_assert_eq!(incremental.depth(), bulk.depth());
        }
    }
}
