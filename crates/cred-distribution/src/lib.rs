//! # cred-distribution: Campaigns and Claims
//!
//! Binds Merkle roots to distribution campaigns and drives claims through
//! an external verifying contract.
//!
//! - **Campaign** (`campaign.rs`): the immutable campaign record and claim
//!   records.
//! - **Store** (`store.rs`, `file_store.rs`): the persistence contract, with
//!   an in-memory and a JSON-file implementation.
//! - **Tracker** (`tracker.rs`): campaign creation, eligibility, proof
//!   generation, idempotent claim marking, administrative correction.
//! - **Contract** (`contract.rs`): the verifying contract interface and an
//!   in-process implementation.
//! - **Orchestrator** (`orchestrator.rs`): one claim attempt end to end,
//!   plus on-chain reconciliation.
//! - **Config** (`config.rs`): environment-driven settings.
//!
//! ## Consistency Rule
//!
//! The verifying contract is authoritative. The local claimed flag is set
//! only from a confirmed transaction reference, never speculatively, and
//! only an explicit administrative call clears it.

pub mod campaign;
pub mod config;
pub mod contract;
pub mod file_store;
pub mod orchestrator;
pub mod store;
pub mod tracker;

pub use campaign::{Campaign, CampaignSummary, ClaimRecord, ClaimStatus, NewCampaign};
pub use config::{ConfigError, DistributionConfig};
pub use contract::{
    ClaimSubmission, ContractError, ContractReceipt, LocalVerifyingContract, VerifyingContract,
};
pub use file_store::FileStore;
pub use orchestrator::{ClaimOrchestrator, ClaimOutcome, ReconcileOutcome};
pub use store::{CampaignStore, MarkOutcome, MemoryStore};
pub use tracker::CampaignTracker;
