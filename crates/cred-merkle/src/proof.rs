//! # Membership Proofs
//!
//! [`MerkleProof`] is what a claimant hands to a verifier: the address, the
//! hashing domain, and the ordered sibling hashes from leaf to root. Proofs
//! are cheap to regenerate from a campaign's address list and are never
//! persisted.

use serde::{Deserialize, Serialize};

use cred_core::{Address, HashAlgorithm, NodeHash};

use crate::verify;

/// A sorted-pair membership proof.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MerkleProof {
    /// Hashing domain of the tree this proof was cut from.
    pub algorithm: HashAlgorithm,
    /// The member being proven.
    pub address: Address,
    /// The member's leaf. Informational; verification recomputes it from
    /// `address`.
    pub leaf: NodeHash,
    /// Sibling hashes ordered from the leaf level upwards.
    pub siblings: Vec<NodeHash>,
}

impl MerkleProof {
    /// Verify against `root` with the independent verifier.
    pub fn verify(&self, root: &NodeHash) -> bool {
        verify::verify(self.algorithm, &self.address, root, &self.siblings)
    }

    /// Number of sibling hashes.
    pub fn len(&self) -> usize {
        self.siblings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.siblings.is_empty()
    }

    /// Siblings as `0x`-prefixed hex, the `bytes32[]` form contracts take.
    pub fn sibling_hex(&self) -> Vec<String> {
        self.siblings.iter().map(NodeHash::to_hex).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::{DuplicatePolicy, MerkleTree};

    fn members() -> Vec<Address> {
        (1u8..=6).map(|i| Address::from_bytes([i; 20])).collect()
    }

    #[test]
    fn proof_verifies_against_its_root_only() {
        let (tree, _) =
            MerkleTree::build(HashAlgorithm::Keccak256, &members(), DuplicatePolicy::Reject)
                .unwrap();
        let proof = tree.proof_for(&members()[3]).unwrap();
        assert!(proof.verify(&tree.root()));

        let (other, _) =
            MerkleTree::build(HashAlgorithm::Keccak256, &members()[..5], DuplicatePolicy::Reject)
                .unwrap();
        assert!(!proof.verify(&other.root()));
    }

    #[test]
    fn json_shape_uses_hex_strings() {
        let (tree, _) =
            MerkleTree::build(HashAlgorithm::Keccak256, &members(), DuplicatePolicy::Reject)
                .unwrap();
        let proof = tree.proof_for(&members()[0]).unwrap();
        let json = serde_json::to_value(&proof).unwrap();
        assert_eq!(json["algorithm"], "keccak256");
        assert_eq!(json["address"], members()[0].to_hex());
        let siblings = json["siblings"].as_array().unwrap();
        assert_eq!(siblings.len(), proof.len());
        assert!(siblings[0].as_str().unwrap().starts_with("0x"));

        let back: MerkleProof = serde_json::from_value(json).unwrap();
        assert_eq!(back, proof);
    }

    #[test]
    fn sibling_hex_matches_siblings() {
        let (tree, _) =
            MerkleTree::build(HashAlgorithm::Sha256, &members(), DuplicatePolicy::Reject).unwrap();
        let proof = tree.proof_for(&members()[5]).unwrap();
        let parsed: Vec<NodeHash> = proof
            .sibling_hex()
            .iter()
            .map(|s| NodeHash::from_hex(s).unwrap())
            .collect();
        assert_eq!(parsed, proof.siblings);
    }
}
