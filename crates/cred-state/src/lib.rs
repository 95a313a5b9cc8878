//! # cred-state: Claim Attempt State Machine
//!
//! One claim attempt moves through
//! `START → PROOF_GENERATED → SUBMITTED → CONFIRMED | FAILED`, and any
//! non-terminal state may fail. Each state is a distinct type carrying the
//! data that only exists in that state: a `Submitted` attempt always has a
//! proof, a `Confirmed` attempt always has a transaction reference, and a
//! `Failed` attempt always has a cause.
//!
//! [`DynClaimAttempt`] is the serializable snapshot of an attempt for API
//! responses and logs. It is produced from a typed attempt and never
//! transitions on its own.

pub mod claim;

pub use claim::{
    ClaimAttempt, ClaimFailure, ClaimState, ClaimTransition, Confirmed, DynClaimAttempt,
    DynClaimState, Failed, ProofGenerated, Start, Submitted,
};
