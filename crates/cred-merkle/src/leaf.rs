//! # Leaf Encoder
//!
//! A leaf is the hash of the 20 normalized address bytes. No salt, index or
//! campaign data is mixed in, so one address has the same leaf in every
//! campaign that uses the same [`HashAlgorithm`].

use cred_core::{Address, DistributionError, HashAlgorithm, NodeHash};

/// Hash an already-normalized address into its leaf.
pub fn leaf_hash(algorithm: HashAlgorithm, address: &Address) -> NodeHash {
    algorithm.digest(address.as_bytes())
}

/// Normalize address text and hash it.
///
/// # Errors
///
/// [`DistributionError::InvalidAddress`] if the text is not an address.
/// Nothing is hashed in that case.
pub fn encode_leaf(
    algorithm: HashAlgorithm,
    input: &str,
) -> Result<(Address, NodeHash), DistributionError> {
    let address = Address::parse(input)?;
    Ok((address, leaf_hash(algorithm, &address)))
}
