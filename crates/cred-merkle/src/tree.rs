//! # Merkle Tree Builder and Proof Generator
//!
//! ## Algorithm
//!
//! 1. Encode every address to a leaf and apply the [`DuplicatePolicy`].
//! 2. Sort leaves byte-wise ascending. The root therefore depends only on
//!    the *set* of addresses, not on the order they were supplied in.
//! 3. Combine adjacent pairs bottom-up: `parent = H(min(a, b) || max(a, b))`.
//!    An unpaired last node is promoted to the next level unchanged.
//! 4. Stop at one node: the root.
//!
//! All levels are retained, so extracting a proof is a walk up the stored
//! levels with no rehashing.
//!
//! ## Proof Shape
//!
//! A proof lists one sibling per level at which the target's lineage had a
//! partner. Levels where it was the promoted odd node contribute nothing,
//! so a proof has at most `ceil(log2(n))` elements and may have fewer.
//!
//! ## Security Invariant
//!
//! An empty address set is an error, never a zero-hash root. A duplicated
//! address is either rejected outright or dropped by explicit opt-in policy;
//! it never silently produces a tree whose leaf count disagrees with the
//! caller's list.

use std::collections::HashSet;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use cred_core::{Address, DistributionError, HashAlgorithm, NodeHash};

use crate::leaf::leaf_hash;
use crate::proof::MerkleProof;

// ---------------------------------------------------------------------------
// Duplicate policy
// ---------------------------------------------------------------------------

/// What to do when the same address appears more than once in the input.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DuplicatePolicy {
    /// Fail with [`DistributionError::DuplicateLeaf`] naming the first
    /// duplicated address and the total redundant count.
    #[default]
    Reject,
    /// Keep the first occurrence, drop the rest, and report how many were
    /// dropped.
    FirstOccurrence,
}

impl DuplicatePolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Reject => "reject",
            Self::FirstOccurrence => "first-occurrence",
        }
    }
}

impl std::fmt::Display for DuplicatePolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An unrecognized duplicate policy name.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown duplicate policy {0:?}; expected \"reject\" or \"first-occurrence\"")]
pub struct ParsePolicyError(pub String);

impl FromStr for DuplicatePolicy {
    type Err = ParsePolicyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "reject" => Ok(Self::Reject),
            "first-occurrence" | "first" | "dedup" => Ok(Self::FirstOccurrence),
            _ => Err(ParsePolicyError(s.to_string())),
        }
    }
}

/// Summary of a successful build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildReport {
    /// Number of distinct leaves in the tree.
    pub leaf_count: usize,
    /// Redundant input entries dropped under [`DuplicatePolicy::FirstOccurrence`].
    pub duplicates_dropped: usize,
}

// ---------------------------------------------------------------------------
// Tree
// ---------------------------------------------------------------------------

/// Sorted-pair hash of two nodes.
fn node_hash(algorithm: HashAlgorithm, a: &NodeHash, b: &NodeHash) -> NodeHash {
    let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
    algorithm.digest_concat(&[lo.as_bytes(), hi.as_bytes()])
}

/// A fully materialized sorted-pair Merkle tree.
///
/// Immutable once built. `levels[0]` holds the sorted leaves and the last
/// level holds only the root.
#[derive(Debug, Clone)]
pub struct MerkleTree {
    algorithm: HashAlgorithm,
    levels: Vec<Vec<NodeHash>>,
    root: NodeHash,
}

impl MerkleTree {
    /// Build a tree over normalized addresses.
    ///
    /// # Errors
    ///
    /// - [`DistributionError::EmptyCampaign`] if `addresses` is empty.
    /// - [`DistributionError::DuplicateLeaf`] if an address repeats and the
    ///   policy is [`DuplicatePolicy::Reject`].
    pub fn build(
        algorithm: HashAlgorithm,
        addresses: &[Address],
        policy: DuplicatePolicy,
    ) -> Result<(Self, BuildReport), DistributionError> {
        if addresses.is_empty() {
            return Err(DistributionError::EmptyCampaign);
        }

        let mut seen: HashSet<Address> = HashSet::with_capacity(addresses.len());
        let mut first_duplicate: Option<Address> = None;
        let mut duplicates = 0usize;
        let mut leaves = Vec::with_capacity(addresses.len());
        for address in addresses {
            if seen.insert(*address) {
                leaves.push(leaf_hash(algorithm, address));
            } else {
                duplicates += 1;
                first_duplicate.get_or_insert(*address);
            }
        }

        if let Some(address) = first_duplicate {
            match policy {
                DuplicatePolicy::Reject => {
                    return Err(DistributionError::DuplicateLeaf {
                        address,
                        duplicates,
                    });
                }
                DuplicatePolicy::FirstOccurrence => {
                    tracing::warn!(
                        duplicates,
                        first = %address,
                        "dropped duplicate addresses from eligible set"
                    );
                }
            }
        }

        let tree = Self::from_leaves(algorithm, leaves);
        let report = BuildReport {
            leaf_count: tree.leaf_count(),
            duplicates_dropped: duplicates,
        };
        tracing::debug!(
            algorithm = %algorithm,
            leaves = report.leaf_count,
            root = %tree.root,
            "built merkle tree"
        );
        Ok((tree, report))
    }

    /// Parse address text and build.
    ///
    /// Every entry is parsed before anything is hashed. The first malformed
    /// entry aborts the build with [`DistributionError::InvalidAddress`].
    pub fn from_text<S: AsRef<str>>(
        algorithm: HashAlgorithm,
        inputs: &[S],
        policy: DuplicatePolicy,
    ) -> Result<(Self, BuildReport), DistributionError> {
        let addresses = inputs
            .iter()
            .map(|s| Address::parse(s.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;
        Self::build(algorithm, &addresses, policy)
    }

    /// Build from distinct leaves. Callers guarantee `leaves` is non-empty.
    fn from_leaves(algorithm: HashAlgorithm, mut leaves: Vec<NodeHash>) -> Self {
        leaves.sort_unstable();

        let mut levels = Vec::new();
        let mut current = leaves;
        while current.len() > 1 {
            let next: Vec<NodeHash> = current
                .chunks(2)
                .map(|pair| match pair {
                    [a, b] => node_hash(algorithm, a, b),
                    _ => pair[0],
                })
                .collect();
            levels.push(std::mem::replace(&mut current, next));
        }
        let root = current[0];
        levels.push(current);

        Self {
            algorithm,
            levels,
            root,
        }
    }

    /// The root commitment.
    pub fn root(&self) -> NodeHash {
        self.root
    }

    pub fn algorithm(&self) -> HashAlgorithm {
        self.algorithm
    }

    /// Sorted leaves.
    pub fn leaves(&self) -> &[NodeHash] {
        &self.levels[0]
    }

    pub fn leaf_count(&self) -> usize {
        self.levels[0].len()
    }

    /// Number of hashing levels above the leaves. A single-leaf tree has
    /// depth 0.
    pub fn depth(&self) -> usize {
        self.levels.len() - 1
    }

    /// Position of the address's leaf in the sorted leaf list.
    pub fn position_of(&self, address: &Address) -> Option<usize> {
        let leaf = leaf_hash(self.algorithm, address);
        self.leaves().binary_search(&leaf).ok()
    }

    /// Whether the address is a member.
    pub fn contains(&self, address: &Address) -> bool {
        self.position_of(address).is_some()
    }

    /// Extract the membership proof for `address`.
    ///
    /// Byte-identical on every call for the same tree and address.
    ///
    /// # Errors
    ///
    /// [`DistributionError::NotEligible`] if the address is not in the tree.
    pub fn proof_for(&self, address: &Address) -> Result<MerkleProof, DistributionError> {
        let index = self
            .position_of(address)
            .ok_or(DistributionError::NotEligible { address: *address })?;
        Ok(MerkleProof {
            algorithm: self.algorithm,
            address: *address,
            leaf: self.levels[0][index],
            siblings: self.siblings_at(index),
        })
    }

    fn siblings_at(&self, index: usize) -> Vec<NodeHash> {
        let mut siblings = Vec::with_capacity(self.depth());
        let mut pos = index;
        for level in &self.levels {
            if let Some(sibling) = level.get(pos ^ 1) {
                siblings.push(*sibling);
            }
            pos /= 2;
        }
        siblings
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::verify::verify;

    fn addr(i: u32) -> Address {
        let mut bytes = [0u8; 20];
        bytes[16..].copy_from_slice(&i.to_be_bytes());
        bytes[0] = 0xc0;
        Address::from_bytes(bytes)
    }

    fn addrs(n: u32) -> Vec<Address> {
        (0..n).map(addr).collect()
    }

    fn a() -> Address {
        Address::parse("0x1111111111111111111111111111111111111111").unwrap()
    }
    fn b() -> Address {
        Address::parse("0x2222222222222222222222222222222222222222").unwrap()
    }
    fn c() -> Address {
        Address::parse("0x3333333333333333333333333333333333333333").unwrap()
    }
    fn d() -> Address {
        Address::parse("0x4444444444444444444444444444444444444444").unwrap()
    }

    fn h(s: &str) -> NodeHash {
        NodeHash::from_hex(s).unwrap()
    }

    // -----------------------------------------------------------------------
    // Known vectors
    // -----------------------------------------------------------------------

    #[test]
    fn keccak_three_member_root_known_vector() {
        let (tree, report) =
            MerkleTree::build(HashAlgorithm::Keccak256, &[a(), b(), c()], DuplicatePolicy::Reject)
                .unwrap();
        assert_eq!(report.leaf_count, 3);
        assert_eq!(report.duplicates_dropped, 0);
        assert_eq!(
            tree.leaves(),
            &[
                h("2ab0a4443bbea3fbe4d0e1503d11ff1367842fb0c8b28a5c8550f27599a40751"),
                h("37d95e0aa71e34defa88b4c43498bc8b90207e31ad0ef4aa6f5bea78bd25a1ab"),
                h("e2c07404b8c1df4c46226425cac68c28d27a766bbddce62309f36724839b22c0"),
            ]
        );
        assert_eq!(
            tree.root(),
            h("a3dc0caeeda43f1ad4cba774bb2ec839ee022f55ace0aadd7fb3a930914d2210")
        );
        assert_eq!(tree.depth(), 2);
    }

    #[test]
    fn sha256_three_member_root_known_vector() {
        let (tree, _) =
            MerkleTree::build(HashAlgorithm::Sha256, &[a(), b(), c()], DuplicatePolicy::Reject)
                .unwrap();
        assert_eq!(
            tree.root(),
            h("b6c1f90a68e36e7967e470cebab5fc7d17ed8d91a90669dd71a13ac9d6a4ef46")
        );
    }

    #[test]
    fn keccak_two_member_root_known_vector() {
        let (tree, _) =
            MerkleTree::build(HashAlgorithm::Keccak256, &[b(), a()], DuplicatePolicy::Reject)
                .unwrap();
        assert_eq!(
            tree.root(),
            h("4beda981c9d34f2dd099131be6049a1d87676d227e63f4a409ee629043314b4f")
        );
    }

    #[test]
    fn proof_for_paired_member_known_vector() {
        let (tree, _) =
            MerkleTree::build(HashAlgorithm::Keccak256, &[a(), b(), c()], DuplicatePolicy::Reject)
                .unwrap();
        let proof = tree.proof_for(&b()).unwrap();
        assert_eq!(
            proof.siblings,
            vec![
                h("37d95e0aa71e34defa88b4c43498bc8b90207e31ad0ef4aa6f5bea78bd25a1ab"),
                h("e2c07404b8c1df4c46226425cac68c28d27a766bbddce62309f36724839b22c0"),
            ]
        );
        assert!(verify(HashAlgorithm::Keccak256, &b(), &tree.root(), &proof.siblings));
    }

    #[test]
    fn proof_for_promoted_member_skips_unpaired_level() {
        let (tree, _) =
            MerkleTree::build(HashAlgorithm::Keccak256, &[a(), b(), c()], DuplicatePolicy::Reject)
                .unwrap();
        // A's leaf sorts last and is promoted unchanged past level 0.
        let proof = tree.proof_for(&a()).unwrap();
        assert_eq!(
            proof.siblings,
            vec![h("ef4543ce2d789940175a4aedf2e5c40c63566bd38b24fc36eda4f26787d5d191")]
        );
        assert!(verify(HashAlgorithm::Keccak256, &a(), &tree.root(), &proof.siblings));
    }

    // -----------------------------------------------------------------------
    // Construction errors and edge cases
    // -----------------------------------------------------------------------

    #[test]
    fn empty_set_is_rejected() {
        let err = MerkleTree::build(HashAlgorithm::Keccak256, &[], DuplicatePolicy::Reject)
            .unwrap_err();
        assert_eq!(err, DistributionError::EmptyCampaign);
    }

    #[test]
    fn single_member_root_is_its_leaf() {
        let (tree, _) =
            MerkleTree::build(HashAlgorithm::Keccak256, &[a()], DuplicatePolicy::Reject).unwrap();
        assert_eq!(tree.root(), leaf_hash(HashAlgorithm::Keccak256, &a()));
        assert_eq!(tree.depth(), 0);
        let proof = tree.proof_for(&a()).unwrap();
        assert!(proof.siblings.is_empty());
        assert!(verify(HashAlgorithm::Keccak256, &a(), &tree.root(), &proof.siblings));
    }

    #[test]
    fn duplicates_rejected_by_default_with_count() {
        let input = vec![a(), b(), a(), c(), a(), b()];
        let err = MerkleTree::build(HashAlgorithm::Keccak256, &input, DuplicatePolicy::default())
            .unwrap_err();
        assert_eq!(
            err,
            DistributionError::DuplicateLeaf {
                address: a(),
                duplicates: 3,
            }
        );
    }

    #[test]
    fn duplicates_detected_after_normalization() {
        let err = MerkleTree::from_text(
            HashAlgorithm::Keccak256,
            &[
                "0xabababababababababababababababababababab",
                "ABABABABABABABABABABABABABABABABABABABAB",
            ],
            DuplicatePolicy::Reject,
        )
        .unwrap_err();
        assert_eq!(err.code(), "DUPLICATE_LEAF");
    }

    #[test]
    fn first_occurrence_policy_drops_and_reports() {
        let input = vec![a(), b(), a(), c(), a()];
        let (tree, report) =
            MerkleTree::build(HashAlgorithm::Keccak256, &input, DuplicatePolicy::FirstOccurrence)
                .unwrap();
        assert_eq!(report.leaf_count, 3);
        assert_eq!(report.duplicates_dropped, 2);
        let (clean, _) =
            MerkleTree::build(HashAlgorithm::Keccak256, &[a(), b(), c()], DuplicatePolicy::Reject)
                .unwrap();
        assert_eq!(tree.root(), clean.root());
    }

    #[test]
    fn malformed_text_aborts_build() {
        let err = MerkleTree::from_text(
            HashAlgorithm::Keccak256,
            &["0x1111111111111111111111111111111111111111", "0xnope"],
            DuplicatePolicy::Reject,
        )
        .unwrap_err();
        assert_eq!(err.code(), "INVALID_ADDRESS");
    }

    #[test]
    fn non_member_is_not_eligible() {
        let (tree, _) =
            MerkleTree::build(HashAlgorithm::Keccak256, &[a(), b(), c()], DuplicatePolicy::Reject)
                .unwrap();
        assert!(!tree.contains(&d()));
        assert_eq!(
            tree.proof_for(&d()).unwrap_err(),
            DistributionError::NotEligible { address: d() }
        );
    }

    #[test]
    fn hashing_domain_changes_root() {
        let k = MerkleTree::build(HashAlgorithm::Keccak256, &addrs(5), DuplicatePolicy::Reject)
            .unwrap()
            .0;
        let s = MerkleTree::build(HashAlgorithm::Sha256, &addrs(5), DuplicatePolicy::Reject)
            .unwrap()
            .0;
        assert_ne!(k.root(), s.root());
    }

    #[test]
    fn every_member_verifies_across_sizes() {
        for size in [1u32, 2, 3, 4, 5, 7, 8, 9, 15, 16, 17, 31, 32, 33, 100] {
            let members = addrs(size);
            let (tree, _) =
                MerkleTree::build(HashAlgorithm::Keccak256, &members, DuplicatePolicy::Reject)
                    .unwrap();
            let max_len = (size as f64).log2().ceil() as usize;
            for m in &members {
                let proof = tree.proof_for(m).unwrap();
                assert!(
                    proof.siblings.len() <= max_len,
                    "size {size}: proof of {} exceeds {max_len}",
                    proof.siblings.len()
                );
                assert!(
                    verify(HashAlgorithm::Keccak256, m, &tree.root(), &proof.siblings),
                    "size {size}: proof for {m} failed"
                );
            }
        }
    }

    #[test]
    fn power_of_two_proofs_are_full_length() {
        let members = addrs(16);
        let (tree, _) =
            MerkleTree::build(HashAlgorithm::Sha256, &members, DuplicatePolicy::Reject).unwrap();
        for m in &members {
            assert_eq!(tree.proof_for(m).unwrap().siblings.len(), 4);
        }
    }

    #[test]
    fn proof_regeneration_is_byte_identical() {
        let members = addrs(11);
        let (t1, _) =
            MerkleTree::build(HashAlgorithm::Keccak256, &members, DuplicatePolicy::Reject).unwrap();
        let mut reversed = members.clone();
        reversed.reverse();
        let (t2, _) =
            MerkleTree::build(HashAlgorithm::Keccak256, &reversed, DuplicatePolicy::Reject)
                .unwrap();
        for m in &members {
            assert_eq!(t1.proof_for(m).unwrap(), t2.proof_for(m).unwrap());
        }
    }

    #[test]
    fn duplicate_policy_parses() {
        assert_eq!("reject".parse::<DuplicatePolicy>().unwrap(), DuplicatePolicy::Reject);
        assert_eq!(
            "FIRST_OCCURRENCE".parse::<DuplicatePolicy>().unwrap(),
            DuplicatePolicy::FirstOccurrence
        );
        let err = "ignore".parse::<DuplicatePolicy>().unwrap_err();
        assert_eq!(err, ParsePolicyError("ignore".into()));
        assert!(err.to_string().contains("first-occurrence"));
    }

    // -----------------------------------------------------------------------
    // Properties
    // -----------------------------------------------------------------------

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        fn address_set() -> impl Strategy<Value = Vec<Address>> {
            proptest::collection::hash_set(proptest::array::uniform20(any::<u8>()), 1..48)
                .prop_map(|set| set.into_iter().map(Address::from_bytes).collect())
        }

        proptest! {
            #[test]
            fn root_is_independent_of_input_order(
                (original, shuffled) in address_set()
                    .prop_flat_map(|v| (Just(v.clone()), Just(v).prop_shuffle()))
            ) {
                let (t1, _) = MerkleTree::build(HashAlgorithm::Keccak256, &original, DuplicatePolicy::Reject).unwrap();
                let (t2, _) = MerkleTree::build(HashAlgorithm::Keccak256, &shuffled, DuplicatePolicy::Reject).unwrap();
                prop_assert_eq!(t1.root(), t2.root());
            }

            #[test]
            fn every_member_proof_is_sound(members in address_set()) {
                let (tree, _) = MerkleTree::build(HashAlgorithm::Sha256, &members, DuplicatePolicy::Reject).unwrap();
                for m in &members {
                    let proof = tree.proof_for(m).unwrap();
                    prop_assert!(verify(HashAlgorithm::Sha256, m, &tree.root(), &proof.siblings));
                }
            }

            #[test]
            fn outsiders_are_not_eligible(
                members in address_set(),
                outsider in proptest::array::uniform20(any::<u8>()),
            ) {
                let outsider = Address::from_bytes(outsider);
                prop_assume!(!members.contains(&outsider));
                let (tree, _) = MerkleTree::build(HashAlgorithm::Keccak256, &members, DuplicatePolicy::Reject).unwrap();
                let is_not_eligible = matches!(
                    tree.proof_for(&outsider),
                    Err(DistributionError::NotEligible { .. })
                );
                prop_assert!(is_not_eligible);
            }
        }
    }
}
