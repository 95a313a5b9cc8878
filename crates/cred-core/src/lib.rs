//! # cred-core: Foundational Types for Credential Distribution
//!
//! Value types shared by every crate in the workspace. `cred-core` depends
//! on nothing internal.
//!
//! ## Key Design Principles
//!
//! 1. **Normalized addresses.** An [`Address`] only exists in its canonical
//!    20-byte form. Every accepted textual spelling of the same recipient
//!    parses to identical bytes, so it hashes to an identical leaf.
//!
//! 2. **Tagged hashing domain.** [`HashAlgorithm`] travels with every tree
//!    and campaign. Keccak-256 is the default so roots and proofs agree with
//!    EVM verifying contracts; SHA-256 is an explicit opt-in.
//!
//! 3. **Typed errors.** [`DistributionError`] separates "you are not
//!    eligible" from "the system is broken". Each variant carries a stable
//!    machine code.
//!
//! 4. **UTC-only timestamps.** [`Timestamp`] is UTC with seconds precision.
//!
//! ## Crate Policy
//!
//! - No dependencies on other `cred-*` crates.
//! - No `unsafe` code.
//! - No `panic!()` or `.unwrap()` outside tests.

pub mod address;
pub mod error;
pub mod hash;
pub mod identity;
pub mod temporal;

pub use address::{Address, ADDRESS_LEN};
pub use error::DistributionError;
pub use hash::{HashAlgorithm, NodeHash, ParseAlgorithmError, HASH_LEN};
pub use identity::{CampaignId, TxRef};
pub use temporal::{Timestamp, TimestampError};
