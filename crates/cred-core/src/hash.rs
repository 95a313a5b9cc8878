//! # Node Hashes and Hashing Domains
//!
//! Defines [`NodeHash`], the 32-byte value of every leaf and interior node,
//! and [`HashAlgorithm`], the tag selecting which hash function produced it.
//!
//! ## Hashing Domain
//!
//! Keccak-256 is the default. It is what EVM verifying contracts use for
//! sorted-pair Merkle proofs, so a root built here can be published to such
//! a contract unchanged. SHA-256 is available for campaigns verified off
//! chain. Switching algorithm changes every leaf, so a campaign records the
//! algorithm it was built with and never changes it.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256};
use sha3::Keccak256;
use thiserror::Error;

use crate::error::DistributionError;

/// Width of a node hash in bytes.
pub const HASH_LEN: usize = 32;

/// The hash function used for leaves and interior nodes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HashAlgorithm {
    /// Keccak-256 (pre-standard SHA-3 padding), as used by the EVM.
    #[default]
    Keccak256,
    /// SHA-256.
    Sha256,
}

impl HashAlgorithm {
    /// Returns the algorithm identifier string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Keccak256 => "keccak256",
            Self::Sha256 => "sha256",
        }
    }

    /// Hash a byte string.
    pub fn digest(&self, data: &[u8]) -> NodeHash {
        self.digest_concat(&[data])
    }

    /// Hash the concatenation of `parts`, in the order given.
    ///
    /// Ordering of pair inputs is the caller's rule; this function does
    /// not sort.
    pub fn digest_concat(&self, parts: &[&[u8]]) -> NodeHash {
        let bytes: [u8; HASH_LEN] = match self {
            Self::Keccak256 => {
                let mut hasher = Keccak256::new();
                for part in parts {
                    hasher.update(part);
                }
                hasher.finalize().into()
            }
            Self::Sha256 => {
                let mut hasher = Sha256::new();
                for part in parts {
                    hasher.update(part);
                }
                hasher.finalize().into()
            }
        };
        NodeHash(bytes)
    }
}

impl fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An unrecognized hash algorithm name.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown hash algorithm {0:?}; expected \"keccak256\" or \"sha256\"")]
pub struct ParseAlgorithmError(pub String);

impl FromStr for HashAlgorithm {
    type Err = ParseAlgorithmError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "keccak256" | "keccak-256" | "keccak" => Ok(Self::Keccak256),
            "sha256" | "sha-256" => Ok(Self::Sha256),
            _ => Err(ParseAlgorithmError(s.to_string())),
        }
    }
}

/// A 32-byte leaf or interior node value.
///
/// `Ord` is byte-wise lexicographic. The sorted-pair rule and leaf sorting
/// both rely on it.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeHash([u8; HASH_LEN]);

impl NodeHash {
    /// Wrap raw hash bytes.
    pub fn from_bytes(bytes: [u8; HASH_LEN]) -> Self {
        Self(bytes)
    }

    /// Access the raw bytes.
    pub fn as_bytes(&self) -> &[u8; HASH_LEN] {
        &self.0
    }

    /// Parse a 64-digit hex string, with or without `0x`.
    ///
    /// # Errors
    ///
    /// Returns [`DistributionError::MalformedProof`] for anything that is
    /// not exactly 32 bytes of hex.
    pub fn from_hex(s: &str) -> Result<Self, DistributionError> {
        let trimmed = s.trim();
        let body = trimmed
            .strip_prefix("0x")
            .or_else(|| trimmed.strip_prefix("0X"))
            .unwrap_or(trimmed);
        if body.len() != HASH_LEN * 2 {
            return Err(DistributionError::MalformedProof(format!(
                "hash must be {} hex digits, got {} in {s:?}",
                HASH_LEN * 2,
                body.len()
            )));
        }
        let mut bytes = [0u8; HASH_LEN];
        hex::decode_to_slice(body, &mut bytes).map_err(|e| {
            DistributionError::MalformedProof(format!("hash {s:?} is not hexadecimal: {e}"))
        })?;
        Ok(Self(bytes))
    }

    /// Render as `0x` + 64 lowercase hex digits.
    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }

    /// Copy with a single bit inverted. Used to build tampered fixtures.
    pub fn with_bit_flipped(&self, bit: usize) -> Self {
        let mut bytes = self.0;
        let idx = (bit / 8) % HASH_LEN;
        bytes[idx] ^= 1 << (bit % 8);
        Self(bytes)
    }
}

impl fmt::Display for NodeHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for NodeHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeHash({})", self.to_hex())
    }
}

impl Serialize for NodeHash {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for NodeHash {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::from_hex(&s).map_err(serde::de::Error::custom)
    }
}
