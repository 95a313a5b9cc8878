//! # Tree Subcommand
//!
//! Offline Merkle operations over an address-list file. Nothing is stored;
//! the same file always yields the same root and proofs.
//!
//! ## Subcommands
//!
//! - `build`: Compute the root (and optionally write the leaf list).
//! - `prove`: Print the proof for one address.
//! - `verify`: Check a proof against a root. Exit code 1 if it does not
//!   verify.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use serde::Serialize;

use cred_core::{HashAlgorithm, NodeHash};
use cred_merkle::{DuplicatePolicy, MerkleTree};

use crate::read_address_file;

/// Arguments for the `cred tree` subcommand.
#[derive(Args, Debug)]
pub struct TreeArgs {
    #[command(subcommand)]
    pub command: TreeCommand,
}

/// Tree subcommands.
#[derive(Subcommand, Debug)]
pub enum TreeCommand {
    /// Build a tree and print its root.
    Build {
        /// Address-list file.
        #[arg(long)]
        input: PathBuf,
        /// Hashing domain.
        #[arg(long, default_value = "keccak256")]
        algorithm: HashAlgorithm,
        /// Duplicate handling: `reject` or `first-occurrence`.
        #[arg(long, default_value = "reject")]
        duplicates: DuplicatePolicy,
        /// Write root, leaves and counts as JSON to this file.
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Print the membership proof for one address.
    Prove {
        /// Address-list file.
        #[arg(long)]
        input: PathBuf,
        /// Address to prove.
        #[arg(long)]
        address: String,
        /// Hashing domain.
        #[arg(long, default_value = "keccak256")]
        algorithm: HashAlgorithm,
        /// Duplicate handling: `reject` or `first-occurrence`.
        #[arg(long, default_value = "reject")]
        duplicates: DuplicatePolicy,
    },

    /// Verify a proof against a root.
    Verify {
        /// Claimed member.
        #[arg(long)]
        address: String,
        /// Root as 32-byte hex.
        #[arg(long)]
        root: String,
        /// Sibling hashes, comma-separated, leaf level first. Omit for a
        /// single-member tree.
        #[arg(long, value_delimiter = ',')]
        proof: Vec<String>,
        /// Hashing domain.
        #[arg(long, default_value = "keccak256")]
        algorithm: HashAlgorithm,
    },
}

/// Tree description written by `build --out`.
#[derive(Debug, Serialize)]
struct TreeDocument {
    algorithm: HashAlgorithm,
    root: NodeHash,
    leaf_count: usize,
    depth: usize,
    duplicates_dropped: usize,
    leaves: Vec<NodeHash>,
}

/// Execute the tree subcommand.
pub fn run_tree(args: &TreeArgs) -> Result<u8> {
    match &args.command {
        TreeCommand::Build {
            input,
            algorithm,
            duplicates,
            out,
        } => cmd_build(input, *algorithm, *duplicates, out.as_deref()),
        TreeCommand::Prove {
            input,
            address,
            algorithm,
            duplicates,
        } => cmd_prove(input, address, *algorithm, *duplicates),
        TreeCommand::Verify {
            address,
            root,
            proof,
            algorithm,
        } => cmd_verify(address, root, proof, *algorithm),
    }
}

fn load_tree(
    input: &Path,
    algorithm: HashAlgorithm,
    duplicates: DuplicatePolicy,
) -> Result<(MerkleTree, cred_merkle::BuildReport)> {
    let addresses = read_address_file(input)?;
    MerkleTree::from_text(algorithm, &addresses, duplicates)
        .with_context(|| format!("failed to build tree from {}", input.display()))
}

fn cmd_build(
    input: &Path,
    algorithm: HashAlgorithm,
    duplicates: DuplicatePolicy,
    out: Option<&Path>,
) -> Result<u8> {
    let (tree, report) = load_tree(input, algorithm, duplicates)?;

    if let Some(out) = out {
        let doc = TreeDocument {
            algorithm,
            root: tree.root(),
            leaf_count: tree.leaf_count(),
            depth: tree.depth(),
            duplicates_dropped: report.duplicates_dropped,
            leaves: tree.leaves().to_vec(),
        };
        std::fs::write(out, serde_json::to_string_pretty(&doc)?)
            .with_context(|| format!("failed to write {}", out.display()))?;
    }

    println!("OK: root {}", tree.root());
    println!("  Algorithm: {algorithm}");
    println!("  Leaves: {}", tree.leaf_count());
    println!("  Depth: {}", tree.depth());
    if report.duplicates_dropped > 0 {
        println!("  Duplicates dropped: {}", report.duplicates_dropped);
    }
    Ok(0)
}

fn cmd_prove(
    input: &Path,
    address: &str,
    algorithm: HashAlgorithm,
    duplicates: DuplicatePolicy,
) -> Result<u8> {
    let (tree, _) = load_tree(input, algorithm, duplicates)?;
    let address = cred_core::Address::parse(address)?;
    let proof = tree.proof_for(&address)?;
    println!("{}", serde_json::to_string_pretty(&proof)?);
    Ok(0)
}

fn cmd_verify(address: &str, root: &str, proof: &[String], algorithm: HashAlgorithm) -> Result<u8> {
    if cred_merkle::verify_hex(algorithm, address, root, proof)? {
        println!("OK: {address} is committed under {root}");
        Ok(0)
    } else {
        println!("INVALID: proof does not verify against {root}");
        Ok(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ROOT_ABC: &str = "0xa3dc0caeeda43f1ad4cba774bb2ec839ee022f55ace0aadd7fb3a930914d2210";

    fn write_abc(dir: &Path) -> PathBuf {
        let path = dir.join("members.csv");
        std::fs::write(
            &path,
            "# address,name\n\
             0x3333333333333333333333333333333333333333,carol\n\
             0x1111111111111111111111111111111111111111,alice\n\
             0x2222222222222222222222222222222222222222,bob\n",
        )
        .unwrap();
        path
    }

    #[test]
    fn build_writes_tree_document() {
        let dir = tempfile::tempdir().unwrap();
        let input = write_abc(dir.path());
        let out = dir.path().join("tree.json");
        let code = cmd_build(&input, HashAlgorithm::Keccak256, DuplicatePolicy::Reject, Some(&out))
            .unwrap();
        assert_eq!(code, 0);

        let doc: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&out).unwrap()).unwrap();
        assert_eq!(doc["root"], ROOT_ABC);
        assert_eq!(doc["leaf_count"], 3);
        assert_eq!(doc["leaves"].as_array().unwrap().len(), 3);
    }

    #[test]
    fn build_rejects_duplicates_by_default() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("dup.txt");
        std::fs::write(
            &input,
            "0x1111111111111111111111111111111111111111\n1111111111111111111111111111111111111111\n",
        )
        .unwrap();
        assert!(cmd_build(&input, HashAlgorithm::Keccak256, DuplicatePolicy::Reject, None).is_err());
        assert_eq!(
            cmd_build(&input, HashAlgorithm::Keccak256, DuplicatePolicy::FirstOccurrence, None)
                .unwrap(),
            0
        );
    }

    #[test]
    fn prove_non_member_fails() {
        let dir = tempfile::tempdir().unwrap();
        let input = write_abc(dir.path());
        let err = cmd_prove(
            &input,
            "0x4444444444444444444444444444444444444444",
            HashAlgorithm::Keccak256,
            DuplicatePolicy::Reject,
        )
        .unwrap_err();
        assert!(err.to_string().contains("not eligible"));
    }

    #[test]
    fn verify_exit_codes() {
        let proof = vec![
            "0x37d95e0aa71e34defa88b4c43498bc8b90207e31ad0ef4aa6f5bea78bd25a1ab".to_string(),
            "0xe2c07404b8c1df4c46226425cac68c28d27a766bbddce62309f36724839b22c0".to_string(),
        ];
        let b = "0x2222222222222222222222222222222222222222";
        let d = "0x4444444444444444444444444444444444444444";
        assert_eq!(cmd_verify(b, ROOT_ABC, &proof, HashAlgorithm::Keccak256).unwrap(), 0);
        assert_eq!(cmd_verify(d, ROOT_ABC, &proof, HashAlgorithm::Keccak256).unwrap(), 1);
        assert!(cmd_verify(b, "0xdead", &proof, HashAlgorithm::Keccak256).is_err());
    }
}
