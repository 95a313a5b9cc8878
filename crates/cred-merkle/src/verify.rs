//! # Proof Verifier
//!
//! Recomputes a root from an address and a sibling path and compares it to
//! a claimed root. It deliberately shares nothing with `tree.rs` except the
//! raw hash function: the pair ordering is re-derived here over raw bytes,
//! and the leaf is re-derived from the address. A local pre-submission check
//! therefore cannot inherit a generator bug.
//!
//! ## Contract
//!
//! Pure. Any mismatch returns `false`. Only [`verify_hex`] can fail, and only
//! when its input is not shaped like a proof at all.

use cred_core::{Address, DistributionError, HashAlgorithm, NodeHash, HASH_LEN};

/// Longest proof accepted. A sorted-pair tree deep enough to need more
/// siblings would have more than 2^64 leaves.
pub const MAX_PROOF_LEN: usize = 64;

/// Fold `siblings` onto `leaf` with the sorted-pair rule.
pub fn compute_root(algorithm: HashAlgorithm, leaf: &NodeHash, siblings: &[NodeHash]) -> NodeHash {
    let mut acc: [u8; HASH_LEN] = *leaf.as_bytes();
    for sibling in siblings {
        let s = sibling.as_bytes();
        let next = if acc[..] <= s[..] {
            algorithm.digest_concat(&[&acc, s])
        } else {
            algorithm.digest_concat(&[s, &acc])
        };
        acc = *next.as_bytes();
    }
    NodeHash::from_bytes(acc)
}

/// Whether `leaf` is committed under `root` via `siblings`.
pub fn verify_leaf(
    algorithm: HashAlgorithm,
    leaf: &NodeHash,
    root: &NodeHash,
    siblings: &[NodeHash],
) -> bool {
    siblings.len() <= MAX_PROOF_LEN && compute_root(algorithm, leaf, siblings) == *root
}

/// Whether `address` is committed under `root` via `siblings`.
pub fn verify(
    algorithm: HashAlgorithm,
    address: &Address,
    root: &NodeHash,
    siblings: &[NodeHash],
) -> bool {
    let leaf = algorithm.digest(address.as_bytes());
    verify_leaf(algorithm, &leaf, root, siblings)
}

/// Verify proof material supplied as text.
///
/// # Errors
///
/// - [`DistributionError::InvalidAddress`] if `address` does not parse.
/// - [`DistributionError::MalformedProof`] if `root` or any sibling is not
///   32 bytes of hex, or the proof is longer than [`MAX_PROOF_LEN`].
///
/// A well-formed proof that does not match returns `Ok(false)`.
pub fn verify_hex<S: AsRef<str>>(
    algorithm: HashAlgorithm,
    address: &str,
    root: &str,
    siblings: &[S],
) -> Result<bool, DistributionError> {
    let address = Address::parse(address)?;
    let root = NodeHash::from_hex(root)?;
    if siblings.len() > MAX_PROOF_LEN {
        return Err(DistributionError::MalformedProof(format!(
            "proof has {} elements, maximum is {MAX_PROOF_LEN}",
            siblings.len()
        )));
    }
    let siblings = siblings
        .iter()
        .map(|s| NodeHash::from_hex(s.as_ref()))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(verify(algorithm, &address, &root, &siblings))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::{DuplicatePolicy, MerkleTree};

    fn members(n: u8) -> Vec<Address> {
        (0..n)
            .map(|i| {
                let mut b = [0x5a; 20];
                b[19] = i;
                Address::from_bytes(b)
            })
            .collect()
    }

    fn tree(n: u8) -> MerkleTree {
        MerkleTree::build(HashAlgorithm::Keccak256, &members(n), DuplicatePolicy::Reject)
            .unwrap()
            .0
    }

    #[test]
    fn scenario_b_in_abc() {
        let root = "0xa3dc0caeeda43f1ad4cba774bb2ec839ee022f55ace0aadd7fb3a930914d2210";
        let proof = [
            "0x37d95e0aa71e34defa88b4c43498bc8b90207e31ad0ef4aa6f5bea78bd25a1ab",
            "0xe2c07404b8c1df4c46226425cac68c28d27a766bbddce62309f36724839b22c0",
        ];
        assert!(verify_hex(
            HashAlgorithm::Keccak256,
            "0x2222222222222222222222222222222222222222",
            root,
            &proof
        )
        .unwrap());
        // D is not a member; B's proof says nothing about it.
        assert!(!verify_hex(
            HashAlgorithm::Keccak256,
            "0x4444444444444444444444444444444444444444",
            root,
            &proof
        )
        .unwrap());
    }

    #[test]
    fn sibling_order_within_proof_matters() {
        let t = tree(8);
        let m = members(8)[2];
        let mut siblings = t.proof_for(&m).unwrap().siblings;
        siblings.swap(0, 1);
        assert!(!verify(HashAlgorithm::Keccak256, &m, &t.root(), &siblings));
    }

    #[test]
    fn wrong_root_fails() {
        let t = tree(5);
        let m = members(5)[0];
        let proof = t.proof_for(&m).unwrap();
        let other = tree(6).root();
        assert!(!verify(HashAlgorithm::Keccak256, &m, &other, &proof.siblings));
    }

    #[test]
    fn wrong_hashing_domain_fails() {
        let t = tree(4);
        let m = members(4)[1];
        let proof = t.proof_for(&m).unwrap();
        assert!(!verify(HashAlgorithm::Sha256, &m, &t.root(), &proof.siblings));
    }

    #[test]
    fn truncated_and_extended_proofs_fail() {
        let t = tree(9);
        let m = members(9)[4];
        let siblings = t.proof_for(&m).unwrap().siblings;
        assert!(!verify(HashAlgorithm::Keccak256, &m, &t.root(), &siblings[..siblings.len() - 1]));
        let mut longer = siblings.clone();
        longer.push(t.root());
        assert!(!verify(HashAlgorithm::Keccak256, &m, &t.root(), &longer));
    }

    #[test]
    fn inner_node_cannot_pose_as_member() {
        let t = tree(4);
        let m = members(4)[0];
        let siblings = t.proof_for(&m).unwrap().siblings;
        let idx = t.position_of(&m).unwrap();
        let inner = compute_root(HashAlgorithm::Keccak256, &t.leaves()[idx], &siblings[..1]);

        // Raw leaf verification cannot tell an interior node from a leaf.
        assert!(verify_leaf(HashAlgorithm::Keccak256, &inner, &t.root(), &siblings[1..]));
        // Address verification always rehashes from 20 bytes, so it can.
        let forged = Address::from_bytes([0xee; 20]);
        assert!(!verify(HashAlgorithm::Keccak256, &forged, &t.root(), &siblings[1..]));
    }

    #[test]
    fn empty_proof_only_verifies_single_member_root() {
        let single = tree(1);
        let m = members(1)[0];
        assert!(verify(HashAlgorithm::Keccak256, &m, &single.root(), &[]));
        assert!(!verify(HashAlgorithm::Keccak256, &m, &tree(2).root(), &[]));
    }

    #[test]
    fn malformed_shapes_are_errors() {
        let addr = "0x5a5a5a5a5a5a5a5a5a5a5a5a5a5a5a5a5a5a5a00";
        let root = tree(2).root().to_hex();
        assert_eq!(
            verify_hex::<&str>(HashAlgorithm::Keccak256, "0xzz", &root, &[])
                .unwrap_err()
                .code(),
            "INVALID_ADDRESS"
        );
        assert_eq!(
            verify_hex::<&str>(HashAlgorithm::Keccak256, addr, "0x1234", &[])
                .unwrap_err()
                .code(),
            "MALFORMED_PROOF"
        );
        assert_eq!(
            verify_hex(HashAlgorithm::Keccak256, addr, &root, &["not-a-hash"])
                .unwrap_err()
                .code(),
            "MALFORMED_PROOF"
        );
        let too_long = vec![root.clone(); MAX_PROOF_LEN + 1];
        assert_eq!(
            verify_hex(HashAlgorithm::Keccak256, addr, &root, &too_long)
                .unwrap_err()
                .code(),
            "MALFORMED_PROOF"
        );
    }

    #[test]
    fn overlong_proof_is_false_not_panic() {
        let t = tree(2);
        let m = members(2)[0];
        let siblings = vec![t.root(); MAX_PROOF_LEN + 1];
        assert!(!verify(HashAlgorithm::Keccak256, &m, &t.root(), &siblings));
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn any_single_bit_flip_breaks_the_proof(
                size in 2u8..64,
                member_seed in any::<prop::sample::Index>(),
                sibling_seed in any::<prop::sample::Index>(),
                bit in 0usize..256,
            ) {
                let all = members(size);
                let t = tree(size);
                let m = all[member_seed.index(all.len())];
                let mut siblings = t.proof_for(&m).unwrap().siblings;
                prop_assume!(!siblings.is_empty());
                let i = sibling_seed.index(siblings.len());
                siblings[i] = siblings[i].with_bit_flipped(bit);
                prop_assert!(!verify(HashAlgorithm::Keccak256, &m, &t.root(), &siblings));
            }

            #[test]
            fn flipped_root_rejects_valid_proof(size in 1u8..40, bit in 0usize..256) {
                let all = members(size);
                let t = tree(size);
                let proof = t.proof_for(&all[0]).unwrap();
                let bad_root = t.root().with_bit_flipped(bit);
                prop_assert!(!verify(HashAlgorithm::Keccak256, &all[0], &bad_root, &proof.siblings));
            }

            #[test]
            fn random_forged_proofs_fail(
                forged in proptest::collection::vec(proptest::array::uniform32(any::<u8>()), 0..8),
                outsider in proptest::array::uniform20(any::<u8>()),
            ) {
                let t = tree(16);
                let outsider = Address::from_bytes(outsider);
                prop_assume!(!t.contains(&outsider));
                let siblings: Vec<NodeHash> = forged.into_iter().map(NodeHash::from_bytes).collect();
                prop_assert!(!verify(HashAlgorithm::Keccak256, &outsider, &t.root(), &siblings));
            }
        }
    }
}
