//! # cred-merkle: Sorted-Pair Merkle Trees
//!
//! Builds the commitment that a distribution campaign publishes, and the
//! membership proofs recipients present when claiming.
//!
//! - **Leaf** (`leaf.rs`): `H(address_bytes)`, nothing else mixed in.
//! - **Tree** (`tree.rs`): leaves sorted byte-wise, pairs hashed as
//!   `H(min(a, b) || max(a, b))`, odd node promoted unchanged.
//! - **Proof** (`proof.rs`): the sibling path for one member, extracted from
//!   a built tree.
//! - **Verifier** (`verify.rs`): folds a proof back to a root. It shares no
//!   code with the builder beyond the raw hash function, so a builder bug
//!   cannot hide behind its own verifier.
//!
//! The pair rule is the one EVM `MerkleProof.verify` contracts use, so
//! proofs produced here can be submitted to such a contract as-is.

pub mod leaf;
pub mod proof;
pub mod tree;
pub mod verify;

pub use leaf::{encode_leaf, leaf_hash};
pub use proof::MerkleProof;
pub use tree::{BuildReport, DuplicatePolicy, MerkleTree, ParsePolicyError};
pub use verify::{compute_root, verify, verify_hex, verify_leaf, MAX_PROOF_LEN};
