//! # Claim Attempt Typestate Machine
//!
//! ## States
//!
//! - `Start` → caller asked to claim for (campaign, address).
//! - `ProofGenerated` → membership proof extracted from the campaign tree.
//! - `Submitted` → proof handed to the verifying contract, awaiting its answer.
//! - `Confirmed` → contract accepted; terminal success.
//! - `Failed` → terminal; precondition failure, proof problem, rejection or
//!   timeout.
//!
//! ## Allowed Transitions
//!
//! ```text
//! Start ──proof_generated()──▶ ProofGenerated ──submitted()──▶ Submitted ──confirmed()──▶ Confirmed
//!   │                               │                             │
//!   └────────── fail() ─────────────┴────────── fail() ───────────┴──▶ Failed
//! ```
//!
//! There is no transition out of `Failed`. Retrying means starting a new
//! attempt, which keeps every external submission traceable to an explicit
//! caller action.
//!
//! ## Compile-Time Safety Example
//!
//! ```compile_fail
//! use cred_core::{Address, CampaignId, TxRef};
//! use cred_state::claim::*;
//!
//! let attempt = ClaimAttempt::<Start>::new(CampaignId::new(), Address::from_bytes([1; 20]));
//! // ERROR: no method named `confirmed` found for `ClaimAttempt<Start>`
//! let _ = attempt.confirmed(TxRef::new("0x01"));
//! ```

use serde::{Deserialize, Serialize};

use cred_core::{Address, CampaignId, DistributionError, Timestamp, TxRef};
use cred_merkle::MerkleProof;

// ─── State Types ────────────────────────────────────────────────────

/// Claim requested, nothing computed yet.
#[derive(Debug, Clone)]
pub struct Start;

/// Proof extracted for the claimant.
#[derive(Debug, Clone)]
pub struct ProofGenerated {
    proof: MerkleProof,
}

/// Proof submitted to the verifying contract.
#[derive(Debug, Clone)]
pub struct Submitted {
    proof: MerkleProof,
    submitted_at: Timestamp,
}

/// Contract confirmed the claim.
#[derive(Debug, Clone)]
pub struct Confirmed {
    tx_ref: TxRef,
    confirmed_at: Timestamp,
}

/// Attempt ended without a confirmed claim.
#[derive(Debug, Clone)]
pub struct Failed {
    error: DistributionError,
    failed_from: DynClaimState,
}

// ─── Sealed Trait ───────────────────────────────────────────────────

mod private {
    pub trait Sealed {}
    impl Sealed for super::Start {}
    impl Sealed for super::ProofGenerated {}
    impl Sealed for super::Submitted {}
    impl Sealed for super::Confirmed {}
    impl Sealed for super::Failed {}
}

/// Marker trait for the five claim states. Sealed.
pub trait ClaimState: private::Sealed + std::fmt::Debug {
    /// Runtime tag for this state.
    fn kind() -> DynClaimState;

    /// Canonical state name (e.g., "SUBMITTED").
    fn name() -> &'static str {
        Self::kind().name()
    }

    fn is_terminal() -> bool {
        Self::kind().is_terminal()
    }

    /// Transaction reference, present only once confirmed.
    fn tx_ref(&self) -> Option<&TxRef> {
        None
    }

    /// Failure cause, present only once failed.
    fn failure(&self) -> Option<&DistributionError> {
        None
    }
}

impl ClaimState for Start {
    fn kind() -> DynClaimState {
        DynClaimState::Start
    }
}
impl ClaimState for ProofGenerated {
    fn kind() -> DynClaimState {
        DynClaimState::ProofGenerated
    }
}
impl ClaimState for Submitted {
    fn kind() -> DynClaimState {
        DynClaimState::Submitted
    }
}
impl ClaimState for Confirmed {
    fn kind() -> DynClaimState {
        DynClaimState::Confirmed
    }
    fn tx_ref(&self) -> Option<&TxRef> {
        Some(&self.tx_ref)
    }
}
impl ClaimState for Failed {
    fn kind() -> DynClaimState {
        DynClaimState::Failed
    }
    fn failure(&self) -> Option<&DistributionError> {
        Some(&self.error)
    }
}

// ─── Transition Record ──────────────────────────────────────────────

/// One recorded state change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClaimTransition {
    /// State before the transition.
    pub from_state: DynClaimState,
    /// State after the transition.
    pub to_state: DynClaimState,
    /// When the transition occurred (UTC).
    pub timestamp: Timestamp,
    /// What happened, for the audit trail.
    pub detail: Option<String>,
}

// ─── The Claim Attempt ──────────────────────────────────────────────

/// A single claim attempt for one address in one campaign.
#[derive(Debug, Clone)]
pub struct ClaimAttempt<S: ClaimState> {
    /// Campaign being claimed from.
    pub campaign_id: CampaignId,
    /// Claimant.
    pub address: Address,
    /// When the attempt began.
    pub started_at: Timestamp,
    transition_log: Vec<ClaimTransition>,
    state: S,
}

impl<S: ClaimState> ClaimAttempt<S> {
    pub fn state_name(&self) -> &'static str {
        S::name()
    }

    pub fn is_terminal(&self) -> bool {
        S::is_terminal()
    }

    /// Access the transition log.
    pub fn transition_log(&self) -> &[ClaimTransition] {
        &self.transition_log
    }

    fn transition_to<T: ClaimState>(mut self, state: T, detail: Option<String>) -> ClaimAttempt<T> {
        self.transition_log.push(ClaimTransition {
            from_state: S::kind(),
            to_state: T::kind(),
            timestamp: Timestamp::now(),
            detail,
        });
        ClaimAttempt {
            campaign_id: self.campaign_id,
            address: self.address,
            started_at: self.started_at,
            transition_log: self.transition_log,
            state,
        }
    }

    fn fail_with(self, error: DistributionError) -> ClaimAttempt<Failed> {
        let detail = Some(format!("{}: {error}", error.code()));
        let failed_from = S::kind();
        self.transition_to(Failed { error, failed_from }, detail)
    }
}

// ─── State-Specific Impl Blocks ─────────────────────────────────────

impl ClaimAttempt<Start> {
    /// Open a new attempt. Creation is not itself a transition.
    pub fn new(campaign_id: CampaignId, address: Address) -> Self {
        Self {
            campaign_id,
            address,
            started_at: Timestamp::now(),
            transition_log: Vec::new(),
            state: Start,
        }
    }

    /// START → PROOF_GENERATED.
    pub fn proof_generated(self, proof: MerkleProof) -> ClaimAttempt<ProofGenerated> {
        let detail = Some(format!("proof with {} siblings", proof.len()));
        self.transition_to(ProofGenerated { proof }, detail)
    }

    /// START → FAILED. Precondition failures (not eligible, already
    /// claimed, unknown campaign).
    pub fn fail(self, error: DistributionError) -> ClaimAttempt<Failed> {
        self.fail_with(error)
    }
}

impl ClaimAttempt<ProofGenerated> {
    pub fn proof(&self) -> &MerkleProof {
        &self.state.proof
    }

    /// PROOF_GENERATED → SUBMITTED.
    pub fn submitted(self) -> ClaimAttempt<Submitted> {
        let proof = self.state.proof.clone();
        self.transition_to(
            Submitted {
                proof,
                submitted_at: Timestamp::now(),
            },
            Some("submitted to verifying contract".to_string()),
        )
    }

    /// PROOF_GENERATED → FAILED. Local verification rejected the proof.
    pub fn fail(self, error: DistributionError) -> ClaimAttempt<Failed> {
        self.fail_with(error)
    }
}

impl ClaimAttempt<Submitted> {
    pub fn proof(&self) -> &MerkleProof {
        &self.state.proof
    }

    pub fn submitted_at(&self) -> Timestamp {
        self.state.submitted_at
    }

    /// SUBMITTED → CONFIRMED.
    pub fn confirmed(self, tx_ref: TxRef) -> ClaimAttempt<Confirmed> {
        let detail = Some(format!("confirmed in {tx_ref}"));
        self.transition_to(
            Confirmed {
                tx_ref,
                confirmed_at: Timestamp::now(),
            },
            detail,
        )
    }

    /// SUBMITTED → FAILED. Revert, rejection or timeout.
    pub fn fail(self, error: DistributionError) -> ClaimAttempt<Failed> {
        self.fail_with(error)
    }
}

impl ClaimAttempt<Confirmed> {
    pub fn tx_ref(&self) -> &TxRef {
        &self.state.tx_ref
    }

    pub fn confirmed_at(&self) -> Timestamp {
        self.state.confirmed_at
    }
}

impl ClaimAttempt<Failed> {
    pub fn error(&self) -> &DistributionError {
        &self.state.error
    }

    /// The state the attempt was in when it failed.
    pub fn failed_from(&self) -> DynClaimState {
        self.state.failed_from
    }

    pub fn into_error(self) -> DistributionError {
        self.state.error
    }
}

// ─── DynClaimAttempt: Runtime State ────────────────────────────────

/// Runtime representation of a claim state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DynClaimState {
    Start,
    ProofGenerated,
    Submitted,
    Confirmed,
    Failed,
}

impl DynClaimState {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Start => "START",
            Self::ProofGenerated => "PROOF_GENERATED",
            Self::Submitted => "SUBMITTED",
            Self::Confirmed => "CONFIRMED",
            Self::Failed => "FAILED",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Confirmed | Self::Failed)
    }
}

impl std::fmt::Display for DynClaimState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Serializable failure cause.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClaimFailure {
    /// Machine code from [`DistributionError::code`].
    pub code: String,
    /// Human-readable message.
    pub message: String,
    /// Whether re-invoking the claim may succeed.
    pub retryable: bool,
}

impl From<&DistributionError> for ClaimFailure {
    fn from(error: &DistributionError) -> Self {
        Self {
            code: error.code().to_string(),
            message: error.to_string(),
            retryable: error.is_retryable(),
        }
    }
}

/// Serializable snapshot of a claim attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DynClaimAttempt {
    pub campaign_id: CampaignId,
    pub address: Address,
    pub started_at: Timestamp,
    pub state: DynClaimState,
    pub tx_ref: Option<TxRef>,
    pub failure: Option<ClaimFailure>,
    pub transition_log: Vec<ClaimTransition>,
}

impl DynClaimAttempt {
    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }
}

impl<S: ClaimState> From<ClaimAttempt<S>> for DynClaimAttempt {
    fn from(attempt: ClaimAttempt<S>) -> Self {
        Self {
            campaign_id: attempt.campaign_id,
            address: attempt.address,
            started_at: attempt.started_at,
            state: S::kind(),
            tx_ref: attempt.state.tx_ref().cloned(),
            failure: attempt.state.failure().map(ClaimFailure::from),
            transition_log: attempt.transition_log,
        }
    }
}

// ─── Tests ──────────────────────────────────────────────────────────
