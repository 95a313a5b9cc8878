//! # Claim Orchestrator
//!
//! Drives one claim attempt:
//!
//! ```text
//! START ──► PROOF_GENERATED ──► SUBMITTED ──► CONFIRMED
//!   │              │                 │
//!   └──────────────┴─────────────────┴──────► FAILED
//! ```
//!
//! - Preconditions (eligible, not already claimed) are checked at `START`.
//! - The generated proof is checked with the independent verifier before
//!   anything leaves the process.
//! - The wait on the verifying contract is the only suspension point and
//!   is bounded by the configured confirmation timeout.
//! - The tracker is marked only after the contract confirms. A revert,
//!   timeout or unreachable contract never touches local claim state.
//! - Nothing is retried. A failed attempt is terminal; the caller starts
//!   a new one.
//!
//! A second attempt for a pair while one is still running fails at once
//! with `ClaimInProgress`, so a slow confirmation can never be raced by a
//! duplicate submission from this process.

use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};

use cred_core::{Address, CampaignId, DistributionError, TxRef};
use cred_state::{ClaimAttempt, Confirmed, Failed, Start};

use crate::campaign::ClaimRecord;
use crate::contract::{ClaimSubmission, ContractError, VerifyingContract};
use crate::tracker::CampaignTracker;

/// Terminal result of [`ClaimOrchestrator::claim`].
pub type ClaimOutcome = Result<ClaimAttempt<Confirmed>, ClaimAttempt<Failed>>;

/// Result of comparing local claim state with the verifying contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "record", rename_all = "snake_case")]
pub enum ReconcileOutcome {
    /// Both sides agree the pair is claimed.
    InSync(ClaimRecord),
    /// The contract had a claim the tracker had missed; it is now recorded.
    Repaired(ClaimRecord),
    /// Neither side has a claim.
    Unclaimed,
    /// The tracker has a claim the contract does not know. Left in place
    /// for an operator to correct.
    Diverged(ClaimRecord),
}

/// Coordinates the tracker and a verifying contract.
pub struct ClaimOrchestrator<C> {
    tracker: Arc<CampaignTracker>,
    contract: Arc<C>,
    confirmation_timeout: Duration,
    in_flight: DashMap<(CampaignId, Address), ()>,
}

impl<C> std::fmt::Debug for ClaimOrchestrator<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClaimOrchestrator")
            .field("confirmation_timeout", &self.confirmation_timeout)
            .field("in_flight", &self.in_flight.len())
            .finish()
    }
}

/// Removes the in-flight marker when the attempt ends, however it ends.
struct InFlightGuard<'a> {
    in_flight: &'a DashMap<(CampaignId, Address), ()>,
    key: (CampaignId, Address),
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.in_flight.remove(&self.key);
    }
}

impl<C: VerifyingContract> ClaimOrchestrator<C> {
    /// The confirmation timeout is taken from the tracker's configuration.
    pub fn new(tracker: Arc<CampaignTracker>, contract: Arc<C>) -> Self {
        let confirmation_timeout = tracker.config().confirmation_timeout;
        Self {
            tracker,
            contract,
            confirmation_timeout,
            in_flight: DashMap::new(),
        }
    }

    pub fn with_confirmation_timeout(mut self, timeout: Duration) -> Self {
        self.confirmation_timeout = timeout;
        self
    }

    pub fn tracker(&self) -> &Arc<CampaignTracker> {
        &self.tracker
    }

    pub fn contract(&self) -> &Arc<C> {
        &self.contract
    }

    fn enter(&self, id: CampaignId, address: Address) -> Option<InFlightGuard<'_>> {
        match self.in_flight.entry((id, address)) {
            Entry::Occupied(_) => None,
            Entry::Vacant(slot) => {
                slot.insert(());
                Some(InFlightGuard {
                    in_flight: &self.in_flight,
                    key: (id, address),
                })
            }
        }
    }

    /// Run one claim attempt for `address` in campaign `id`.
    pub async fn claim(&self, id: CampaignId, address: Address) -> ClaimOutcome {
        let outcome = self.run(id, address).await;
        let label = match &outcome {
            Ok(_) => "confirmed",
            Err(failed) => failed.error().code(),
        };
        metrics::counter!("cred_claims_total", "outcome" => label).increment(1);
        outcome
    }

    async fn run(&self, id: CampaignId, address: Address) -> ClaimOutcome {
        let attempt = ClaimAttempt::<Start>::new(id, address);
        let Some(_guard) = self.enter(id, address) else {
            tracing::warn!(campaign = %id, address = %address, "claim already in progress");
            return Err(attempt.fail(DistributionError::ClaimInProgress { address }));
        };

        let campaign = match self.tracker.get_campaign(&id) {
            Ok(c) => c,
            Err(e) => return Err(attempt.fail(e)),
        };
        match self.tracker.claim_status(&id, &address) {
            Ok(status) if !status.eligible => {
                return Err(attempt.fail(DistributionError::NotEligible { address }));
            }
            Ok(status) => {
                if let Some(tx_ref) = status.tx_ref {
                    return Err(attempt.fail(DistributionError::AlreadyClaimed { address, tx_ref }));
                }
            }
            Err(e) => return Err(attempt.fail(e)),
        }

        let proof = match self.tracker.generate_proof(&id, &address) {
            Ok(p) => p,
            Err(e) => return Err(attempt.fail(e)),
        };
        let attempt = attempt.proof_generated(proof);

        if !attempt.proof().verify(&campaign.root) {
            tracing::error!(
                campaign = %id,
                address = %address,
                root = %campaign.root,
                "generated proof failed local verification"
            );
            return Err(attempt.fail(DistributionError::MalformedProof(format!(
                "proof for {address} does not verify against {}",
                campaign.root
            ))));
        }

        let submission = ClaimSubmission {
            contract: campaign.target_contract,
            claimant: address,
            proof: attempt.proof().siblings.clone(),
        };
        let attempt = attempt.submitted();
        tracing::info!(
            campaign = %id,
            address = %address,
            contract = %campaign.target_contract,
            proof_len = submission.proof.len(),
            "claim submitted"
        );

        let started = Instant::now();
        let response =
            tokio::time::timeout(self.confirmation_timeout, self.contract.verify_and_claim(submission))
                .await;
        metrics::histogram!("cred_claim_confirmation_seconds").record(started.elapsed().as_secs_f64());

        let receipt = match response {
            Ok(Ok(receipt)) => receipt,
            Ok(Err(e)) => {
                tracing::warn!(campaign = %id, address = %address, error = %e, "verifying contract refused claim");
                return Err(attempt.fail(external_failure(e)));
            }
            Err(_) => {
                let waited_ms = u64::try_from(self.confirmation_timeout.as_millis()).unwrap_or(u64::MAX);
                tracing::warn!(campaign = %id, address = %address, waited_ms, "claim confirmation timed out");
                return Err(attempt.fail(DistributionError::ConfirmationTimeout { waited_ms }));
            }
        };

        let attempt = attempt.confirmed(receipt.tx_ref.clone());
        if let Err(e) = self.tracker.mark_claimed(&id, &address, receipt.tx_ref.clone()) {
            // Confirmed on chain regardless; reconcile repairs the local flag.
            tracing::error!(
                campaign = %id,
                address = %address,
                tx = %receipt.tx_ref,
                error = %e,
                "claim confirmed but local record failed"
            );
        }
        tracing::info!(
            campaign = %id,
            address = %address,
            tx = %receipt.tx_ref,
            block = receipt.block_number,
            "claim confirmed"
        );
        Ok(attempt)
    }

    /// Bring the tracker's record for one pair in line with the contract.
    ///
    /// Only ever sets the claimed flag, and only with the contract's
    /// transaction reference. A local claim the contract does not know is
    /// reported as [`ReconcileOutcome::Diverged`] and left alone.
    pub async fn reconcile(
        &self,
        id: CampaignId,
        address: Address,
    ) -> Result<ReconcileOutcome, DistributionError> {
        let campaign = self.tracker.get_campaign(&id)?;
        let local = self.tracker.claim_status(&id, &address)?;

        let onchain: Option<TxRef> = match tokio::time::timeout(
            self.confirmation_timeout,
            self.contract.claim_status(&campaign.target_contract, &address),
        )
        .await
        {
            Ok(Ok(tx)) => tx,
            Ok(Err(e)) => return Err(external_failure(e)),
            Err(_) => {
                return Err(DistributionError::ConfirmationTimeout {
                    waited_ms: u64::try_from(self.confirmation_timeout.as_millis())
                        .unwrap_or(u64::MAX),
                })
            }
        };

        let local_record = match (local.tx_ref, local.claimed_at) {
            (Some(tx_ref), Some(claimed_at)) => Some(ClaimRecord {
                campaign_id: id,
                address,
                tx_ref,
                claimed_at,
            }),
            _ => None,
        };

        let outcome = match (local_record, onchain) {
            (Some(record), Some(_)) => ReconcileOutcome::InSync(record),
            (None, None) => ReconcileOutcome::Unclaimed,
            (None, Some(tx_ref)) => {
                let record = self.tracker.mark_claimed(&id, &address, tx_ref)?;
                tracing::info!(campaign = %id, address = %address, tx = %record.tx_ref, "claim repaired from contract");
                ReconcileOutcome::Repaired(record)
            }
            (Some(record), None) => {
                tracing::error!(
                    campaign = %id,
                    address = %address,
                    tx = %record.tx_ref,
                    "local claim has no confirmed counterpart on the verifying contract"
                );
                ReconcileOutcome::Diverged(record)
            }
        };
        Ok(outcome)
    }
}

fn external_failure(error: ContractError) -> DistributionError {
    let reason = match error {
        ContractError::Reverted(reason) => reason,
        ContractError::Unavailable(reason) => format!("verifying contract unavailable: {reason}"),
    };
    DistributionError::ExternalVerificationFailed { reason }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::future::Future;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use cred_state::DynClaimState;

    use crate::campaign::NewCampaign;
    use crate::config::DistributionConfig;
    use crate::contract::{ContractReceipt, LocalVerifyingContract};
    use crate::store::MemoryStore;

    const A: &str = "0x1111111111111111111111111111111111111111";
    const B: &str = "0x2222222222222222222222222222222222222222";
    const C: &str = "0x3333333333333333333333333333333333333333";
    const D: &str = "0x4444444444444444444444444444444444444444";
    const CONTRACT: &str = "0x000000000000000000000000000000000000c1a1";

    fn addr(s: &str) -> Address {
        Address::parse(s).unwrap()
    }

    fn tracker_with_abc() -> (Arc<CampaignTracker>, CampaignId) {
        let tracker = Arc::new(CampaignTracker::new(
            Arc::new(MemoryStore::new()),
            DistributionConfig::default(),
        ));
        let campaign = tracker
            .create_campaign(NewCampaign {
                title: "Workshop attendance".into(),
                target_contract: CONTRACT.into(),
                addresses: vec![A.into(), B.into(), C.into()],
                metadata_uri: String::new(),
                algorithm: None,
            })
            .unwrap();
        (tracker, campaign.id)
    }

    fn local_setup() -> (ClaimOrchestrator<LocalVerifyingContract>, CampaignId) {
        let (tracker, id) = tracker_with_abc();
        let contract = Arc::new(LocalVerifyingContract::new());
        let campaign = tracker.get_campaign(&id).unwrap();
        contract.publish_root(campaign.target_contract, campaign.root, campaign.algorithm);
        (ClaimOrchestrator::new(tracker, contract), id)
    }

    /// Contract that answers with a fixed script and counts submissions.
    struct ScriptedContract {
        reply: Result<ContractReceipt, ContractError>,
        delay: Duration,
        onchain: Option<TxRef>,
        calls: AtomicUsize,
    }

    impl ScriptedContract {
        fn new(reply: Result<ContractReceipt, ContractError>) -> Self {
            Self {
                reply,
                delay: Duration::ZERO,
                onchain: None,
                calls: AtomicUsize::new(0),
            }
        }

        fn confirming(tx: &str) -> Self {
            Self::new(Ok(ContractReceipt {
                tx_ref: TxRef::new(tx),
                block_number: 7,
            }))
        }
    }

    impl VerifyingContract for ScriptedContract {
        fn verify_and_claim(
            &self,
            _submission: ClaimSubmission,
        ) -> impl Future<Output = Result<ContractReceipt, ContractError>> + Send {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let reply = self.reply.clone();
            let delay = self.delay;
            async move {
                tokio::time::sleep(delay).await;
                reply
            }
        }

        fn claim_status(
            &self,
            _contract: &Address,
            _claimant: &Address,
        ) -> impl Future<Output = Result<Option<TxRef>, ContractError>> + Send {
            let onchain = self.onchain.clone();
            async move { Ok(onchain) }
        }
    }

    #[tokio::test]
    async fn claim_b_then_reclaim_is_already_claimed() {
        let (orch, id) = local_setup();

        let confirmed = orch.claim(id, addr(B)).await.unwrap();
        assert_eq!(confirmed.state_name(), "CONFIRMED");
        let states: Vec<DynClaimState> = confirmed
            .transition_log()
            .iter()
            .map(|t| t.to_state)
            .collect();
        assert_eq!(
            states,
            vec![
                DynClaimState::ProofGenerated,
                DynClaimState::Submitted,
                DynClaimState::Confirmed
            ]
        );

        let status = orch.tracker().claim_status(&id, &addr(B)).unwrap();
        assert_eq!(status.tx_ref.as_ref(), Some(confirmed.tx_ref()));

        let again = orch.claim(id, addr(B)).await.unwrap_err();
        assert_eq!(
            again.error(),
            &DistributionError::AlreadyClaimed {
                address: addr(B),
                tx_ref: confirmed.tx_ref().clone()
            }
        );
        assert_eq!(again.failed_from(), DynClaimState::Start);
        assert_eq!(orch.tracker().claims(&id).unwrap().len(), 1);
    }

    #[tokio::test]
    async fn ineligible_and_unknown_fail_at_start() {
        let (orch, id) = local_setup();
        let d = orch.claim(id, addr(D)).await.unwrap_err();
        assert_eq!(d.error(), &DistributionError::NotEligible { address: addr(D) });
        assert_eq!(d.failed_from(), DynClaimState::Start);

        let missing = CampaignId::new();
        let nf = orch.claim(missing, addr(A)).await.unwrap_err();
        assert_eq!(nf.error(), &DistributionError::CampaignNotFound(missing));
    }

    #[tokio::test]
    async fn revert_never_marks_claimed() {
        let (tracker, id) = tracker_with_abc();
        let contract = Arc::new(ScriptedContract::new(Err(ContractError::Reverted(
            "root mismatch".into(),
        ))));
        let orch = ClaimOrchestrator::new(Arc::clone(&tracker), Arc::clone(&contract));

        let failed = orch.claim(id, addr(A)).await.unwrap_err();
        assert_eq!(
            failed.error(),
            &DistributionError::ExternalVerificationFailed {
                reason: "root mismatch".into()
            }
        );
        assert_eq!(failed.failed_from(), DynClaimState::Submitted);
        assert!(!tracker.claim_status(&id, &addr(A)).unwrap().claimed);
        assert_eq!(contract.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn unavailable_contract_is_external_failure() {
        let (tracker, id) = tracker_with_abc();
        let contract = Arc::new(ScriptedContract::new(Err(ContractError::Unavailable(
            "connection refused".into(),
        ))));
        let orch = ClaimOrchestrator::new(Arc::clone(&tracker), contract);
        let failed = orch.claim(id, addr(C)).await.unwrap_err();
        assert_eq!(failed.error().code(), "EXTERNAL_VERIFICATION_FAILED");
        assert!(failed.error().to_string().contains("connection refused"));
        assert!(!tracker.claim_status(&id, &addr(C)).unwrap().claimed);
    }

    #[tokio::test]
    async fn slow_confirmation_times_out() {
        let (tracker, id) = tracker_with_abc();
        let mut scripted = ScriptedContract::confirming("0xlate");
        scripted.delay = Duration::from_secs(30);
        let orch = ClaimOrchestrator::new(Arc::clone(&tracker), Arc::new(scripted))
            .with_confirmation_timeout(Duration::from_millis(20));

        let failed = orch.claim(id, addr(B)).await.unwrap_err();
        assert_eq!(
            failed.error(),
            &DistributionError::ConfirmationTimeout { waited_ms: 20 }
        );
        assert!(failed.error().is_retryable());
        assert!(!tracker.claim_status(&id, &addr(B)).unwrap().claimed);
    }

    #[tokio::test]
    async fn concurrent_attempt_is_refused_while_one_is_pending() {
        let (tracker, id) = tracker_with_abc();
        let mut scripted = ScriptedContract::confirming("0xslow");
        scripted.delay = Duration::from_millis(200);
        let contract = Arc::new(scripted);
        let orch = Arc::new(ClaimOrchestrator::new(tracker, Arc::clone(&contract)));

        let first = {
            let orch = Arc::clone(&orch);
            tokio::spawn(async move { orch.claim(id, addr(A)).await })
        };
        tokio::time::sleep(Duration::from_millis(50)).await;
        let second = orch.claim(id, addr(A)).await.unwrap_err();
        assert_eq!(
            second.error(),
            &DistributionError::ClaimInProgress { address: addr(A) }
        );

        let first = first.await.unwrap().unwrap();
        assert_eq!(first.tx_ref(), &TxRef::new("0xslow"));
        assert_eq!(contract.calls.load(Ordering::SeqCst), 1);

        // Guard released: the next attempt reaches the precondition check.
        let third = orch.claim(id, addr(A)).await.unwrap_err();
        assert_eq!(third.error().code(), "ALREADY_CLAIMED");
    }

    #[tokio::test]
    async fn reconcile_repairs_missing_local_record() {
        let (tracker, id) = tracker_with_abc();
        let mut scripted = ScriptedContract::confirming("0xunused");
        scripted.onchain = Some(TxRef::new("0xchain"));
        let orch = ClaimOrchestrator::new(Arc::clone(&tracker), Arc::new(scripted));

        match orch.reconcile(id, addr(C)).await.unwrap() {
            ReconcileOutcome::Repaired(record) => assert_eq!(record.tx_ref, TxRef::new("0xchain")),
            other => panic!("expected repair, got {other:?}"),
        }
        assert!(matches!(
            orch.reconcile(id, addr(C)).await.unwrap(),
            ReconcileOutcome::InSync(_)
        ));
    }

    #[tokio::test]
    async fn reconcile_reports_divergence_without_clearing() {
        let (tracker, id) = tracker_with_abc();
        tracker.mark_claimed(&id, &addr(A), TxRef::new("0xlocal")).unwrap();
        let orch = ClaimOrchestrator::new(
            Arc::clone(&tracker),
            Arc::new(ScriptedContract::confirming("0xunused")),
        );

        assert!(matches!(
            orch.reconcile(id, addr(A)).await.unwrap(),
            ReconcileOutcome::Diverged(_)
        ));
        assert!(tracker.claim_status(&id, &addr(A)).unwrap().claimed);
        assert_eq!(
            orch.reconcile(id, addr(B)).await.unwrap(),
            ReconcileOutcome::Unclaimed
        );
    }

    #[tokio::test]
    async fn reconcile_after_local_claim_is_in_sync() {
        let (orch, id) = local_setup();
        orch.claim(id, addr(C)).await.unwrap();
        assert!(matches!(
            orch.reconcile(id, addr(C)).await.unwrap(),
            ReconcileOutcome::InSync(_)
        ));
    }
}
