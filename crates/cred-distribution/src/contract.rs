//! # Verifying Contract Interface
//!
//! The external party that independently checks a membership proof
//! against the root it holds and records the claim. The orchestrator is
//! generic over [`VerifyingContract`], so a chain client, a mock, or the
//! in-process [`LocalVerifyingContract`] plug in the same way.
//!
//! Calls are async because a real contract sits behind a network; the
//! orchestrator bounds each call with a timeout.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};

use cred_core::{Address, HashAlgorithm, NodeHash, TxRef};

/// What is sent to the verifying contract for one claim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClaimSubmission {
    /// Contract the campaign targets.
    pub contract: Address,
    /// Address the claim is made for.
    pub claimant: Address,
    /// Sibling hashes, leaf level first.
    pub proof: Vec<NodeHash>,
}

/// Confirmation returned by the verifying contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractReceipt {
    pub tx_ref: TxRef,
    pub block_number: u64,
}

/// Failures reported by a verifying contract.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ContractError {
    /// The contract ran and refused the claim.
    #[error("reverted: {0}")]
    Reverted(String),
    /// The contract could not be reached or did not answer coherently.
    #[error("unavailable: {0}")]
    Unavailable(String),
}

/// An external contract that verifies proofs against its stored root.
pub trait VerifyingContract: Send + Sync {
    /// Verify `submission.proof` for `submission.claimant` and, if it is
    /// valid and unclaimed, record the claim.
    fn verify_and_claim(
        &self,
        submission: ClaimSubmission,
    ) -> impl Future<Output = Result<ContractReceipt, ContractError>> + Send;

    /// Transaction that recorded a claim for `claimant`, if any.
    fn claim_status(
        &self,
        contract: &Address,
        claimant: &Address,
    ) -> impl Future<Output = Result<Option<TxRef>, ContractError>> + Send;
}

/// In-process verifying contract.
///
/// Holds one published root per contract address and verifies proofs
/// exactly as an on-chain verifier would. Claims are keyed by root, so
/// republishing a new root under the same contract starts a fresh ledger.
/// Transaction references are derived deterministically from the root and
/// claimant.
#[derive(Debug)]
pub struct LocalVerifyingContract {
    roots: DashMap<Address, (NodeHash, HashAlgorithm)>,
    claimed: DashMap<(NodeHash, Address), TxRef>,
    next_block: AtomicU64,
}

impl Default for LocalVerifyingContract {
    fn default() -> Self {
        Self::new()
    }
}

impl LocalVerifyingContract {
    pub fn new() -> Self {
        Self {
            roots: DashMap::new(),
            claimed: DashMap::new(),
            next_block: AtomicU64::new(1),
        }
    }

    /// Publish (or replace) the root held by `contract`.
    pub fn publish_root(&self, contract: Address, root: NodeHash, algorithm: HashAlgorithm) {
        tracing::debug!(contract = %contract, root = %root, "root published");
        self.roots.insert(contract, (root, algorithm));
    }

    pub fn root_of(&self, contract: &Address) -> Option<NodeHash> {
        self.roots.get(contract).map(|r| r.value().0)
    }

    fn claim_now(&self, submission: &ClaimSubmission) -> Result<ContractReceipt, ContractError> {
        let (root, algorithm) = self
            .roots
            .get(&submission.contract)
            .map(|r| *r.value())
            .ok_or_else(|| {
                ContractError::Reverted(format!("no root published for {}", submission.contract))
            })?;

        if !cred_merkle::verify(algorithm, &submission.claimant, &root, &submission.proof) {
            return Err(ContractError::Reverted("invalid proof".to_string()));
        }

        match self.claimed.entry((root, submission.claimant)) {
            Entry::Occupied(_) => Err(ContractError::Reverted("already claimed".to_string())),
            Entry::Vacant(slot) => {
                let tx = algorithm.digest_concat(&[
                    root.as_bytes().as_slice(),
                    submission.claimant.as_bytes().as_slice(),
                ]);
                let tx_ref = TxRef::new(tx.to_hex());
                slot.insert(tx_ref.clone());
                Ok(ContractReceipt {
                    tx_ref,
                    block_number: self.next_block.fetch_add(1, Ordering::SeqCst),
                })
            }
        }
    }
}

impl VerifyingContract for LocalVerifyingContract {
    async fn verify_and_claim(
        &self,
        submission: ClaimSubmission,
    ) -> Result<ContractReceipt, ContractError> {
        self.claim_now(&submission)
    }

    async fn claim_status(
        &self,
        contract: &Address,
        claimant: &Address,
    ) -> Result<Option<TxRef>, ContractError> {
        let Some(root) = self.root_of(contract) else {
            return Ok(None);
        };
        Ok(self
            .claimed
            .get(&(root, *claimant))
            .map(|t| t.value().clone()))
    }
}
