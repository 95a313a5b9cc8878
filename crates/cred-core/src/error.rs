//! # Error Types
//!
//! [`DistributionError`] is the single error taxonomy for tree building,
//! proof handling, campaign tracking and claim orchestration. It is
//! `Clone + PartialEq` so a failed claim attempt can carry its cause and
//! tests can compare outcomes directly.
//!
//! ## Design
//!
//! - Construction errors (`InvalidAddress`, `EmptyCampaign`, `DuplicateLeaf`)
//!   reject the whole input. No partial tree is ever built.
//! - `NotEligible` and `AlreadyClaimed` are expected user-facing outcomes,
//!   not system faults.
//! - `ConfirmationTimeout` and `ClaimInProgress` are retryable by explicit
//!   re-invocation. `ExternalVerificationFailed` is not: the usual cause is
//!   a stale root, and resubmitting the same proof will fail the same way.

use thiserror::Error;

use crate::address::Address;
use crate::hash::NodeHash;
use crate::identity::{CampaignId, TxRef};

/// Errors raised by the credential distribution core.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DistributionError {
    /// Address text failed normalization.
    #[error("invalid address {input:?}: {reason}")]
    InvalidAddress {
        /// The rejected input, verbatim.
        input: String,
        /// What was wrong with it.
        reason: String,
    },

    /// No eligible addresses were supplied.
    #[error("campaign has no eligible addresses")]
    EmptyCampaign,

    /// The eligible set contains the same address more than once.
    #[error("address {address} appears more than once ({duplicates} redundant entries in input)")]
    DuplicateLeaf {
        /// First address found to be duplicated.
        address: Address,
        /// Total number of redundant entries across the whole input.
        duplicates: usize,
    },

    /// The address is not a member of the campaign's eligible set.
    #[error("address {address} is not eligible")]
    NotEligible {
        /// The address that was looked up.
        address: Address,
    },

    /// The address has already claimed in this campaign.
    #[error("address {address} already claimed in transaction {tx_ref}")]
    AlreadyClaimed {
        /// The claiming address.
        address: Address,
        /// The confirmed transaction on record.
        tx_ref: TxRef,
    },

    /// No campaign with this identifier exists.
    #[error("{0} not found")]
    CampaignNotFound(CampaignId),

    /// The verifying contract did not confirm within the configured bound.
    #[error("verifying contract did not confirm within {waited_ms} ms")]
    ConfirmationTimeout {
        /// How long the orchestrator waited.
        waited_ms: u64,
    },

    /// The verifying contract rejected the submission.
    #[error("verifying contract rejected the claim: {reason}")]
    ExternalVerificationFailed {
        /// Rejection reason, surfaced verbatim.
        reason: String,
    },

    /// Another attempt for the same (campaign, address) is still running.
    #[error("a claim for {address} is already in progress")]
    ClaimInProgress {
        /// The contended address.
        address: Address,
    },

    /// A proof, root or hash had the wrong shape.
    #[error("malformed proof input: {0}")]
    MalformedProof(String),

    /// A campaign's stored address list no longer rebuilds to its root.
    #[error("stored eligible set rebuilds to {actual}, campaign committed to {expected}")]
    RootMismatch {
        /// Root recorded when the campaign was created.
        expected: NodeHash,
        /// Root rebuilt from the stored address list.
        actual: NodeHash,
    },

    /// Campaign parameters other than the address list are unusable.
    #[error("invalid campaign: {0}")]
    InvalidCampaign(String),

    /// The persistence collaborator failed.
    #[error("store error: {0}")]
    Store(String),
}

impl DistributionError {
    /// Stable machine-readable code for logs and API bodies.
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidAddress { .. } => "INVALID_ADDRESS",
            Self::EmptyCampaign => "EMPTY_CAMPAIGN",
            Self::DuplicateLeaf { .. } => "DUPLICATE_LEAF",
            Self::NotEligible { .. } => "NOT_ELIGIBLE",
            Self::AlreadyClaimed { .. } => "ALREADY_CLAIMED",
            Self::CampaignNotFound(_) => "CAMPAIGN_NOT_FOUND",
            Self::ConfirmationTimeout { .. } => "CONFIRMATION_TIMEOUT",
            Self::ExternalVerificationFailed { .. } => "EXTERNAL_VERIFICATION_FAILED",
            Self::ClaimInProgress { .. } => "CLAIM_IN_PROGRESS",
            Self::MalformedProof(_) => "MALFORMED_PROOF",
            Self::RootMismatch { .. } => "ROOT_MISMATCH",
            Self::InvalidCampaign(_) => "INVALID_CAMPAIGN",
            Self::Store(_) => "STORE_ERROR",
        }
    }

    /// Whether the caller may re-invoke the operation and expect a
    /// different outcome.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::ConfirmationTimeout { .. } | Self::ClaimInProgress { .. } | Self::Store(_)
        )
    }
}
