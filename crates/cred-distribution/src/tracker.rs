//! # Campaign State Tracker
//!
//! Registry from campaign id to {root, eligible set, claim records}, over a
//! pluggable [`CampaignStore`].
//!
//! ## Index Cache
//!
//! Each campaign gets an in-memory index: a hash set of members for O(1)
//! eligibility checks, and the built tree for proof extraction. Campaigns
//! are immutable, so an index never goes stale. When an index is built
//! from a stored campaign, the rebuilt root must equal the stored root;
//! otherwise the campaign is refused with `RootMismatch`, because every
//! proof it produced would fail on chain.
//!
//! ## Claim Marking
//!
//! `mark_claimed` is the only write path for claim state and goes through
//! the store's compare-and-set. Repeated or concurrent calls for a pair
//! all return the single record that won.

use std::collections::HashSet;
use std::sync::Arc;

use dashmap::DashMap;

use cred_core::{Address, CampaignId, DistributionError, TxRef};
use cred_merkle::{DuplicatePolicy, MerkleProof, MerkleTree};

use crate::campaign::{Campaign, CampaignSummary, ClaimRecord, ClaimStatus, NewCampaign};
use crate::config::DistributionConfig;
use crate::store::{CampaignStore, MarkOutcome};

struct CampaignIndex {
    members: HashSet<Address>,
    tree: MerkleTree,
}

impl CampaignIndex {
    fn new(tree: MerkleTree, addresses: &[Address]) -> Self {
        Self {
            members: addresses.iter().copied().collect(),
            tree,
        }
    }
}

/// Campaign registry and claim bookkeeping.
pub struct CampaignTracker {
    store: Arc<dyn CampaignStore>,
    config: DistributionConfig,
    indexes: DashMap<CampaignId, Arc<CampaignIndex>>,
}

impl std::fmt::Debug for CampaignTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CampaignTracker")
            .field("config", &self.config)
            .field("cached_indexes", &self.indexes.len())
            .finish()
    }
}

impl CampaignTracker {
    pub fn new(store: Arc<dyn CampaignStore>, config: DistributionConfig) -> Self {
        Self {
            store,
            config,
            indexes: DashMap::new(),
        }
    }

    pub fn config(&self) -> &DistributionConfig {
        &self.config
    }

    /// Create and persist a campaign.
    ///
    /// # Errors
    ///
    /// - `InvalidCampaign` for an empty title, a zero target contract, or a
    ///   target contract already bound to another campaign. A contract holds
    ///   exactly one root, so a second campaign on it would orphan the first.
    /// - `InvalidAddress` for the first malformed address (or contract).
    /// - `EmptyCampaign` / `DuplicateLeaf` from tree construction.
    ///
    /// Nothing is stored unless every check passes.
    pub fn create_campaign(&self, new: NewCampaign) -> Result<Campaign, DistributionError> {
        let title = new.title.trim();
        if title.is_empty() {
            return Err(DistributionError::InvalidCampaign(
                "title must not be empty".to_string(),
            ));
        }
        let target_contract = Address::parse(&new.target_contract)?;
        if target_contract.is_zero() {
            return Err(DistributionError::InvalidCampaign(
                "target contract must not be the zero address".to_string(),
            ));
        }

        let mut addresses = new
            .addresses
            .iter()
            .map(|s| Address::parse(s))
            .collect::<Result<Vec<_>, _>>()?;
        let algorithm = new.algorithm.unwrap_or(self.config.hash_algorithm);
        let (tree, report) =
            MerkleTree::build(algorithm, &addresses, self.config.duplicate_policy)?;

        let mut seen = HashSet::with_capacity(addresses.len());
        addresses.retain(|a| seen.insert(*a));

        let campaign = Campaign {
            id: CampaignId::new(),
            title: title.to_string(),
            target_contract,
            root: tree.root(),
            algorithm,
            addresses,
            metadata_uri: new.metadata_uri,
            created_at: cred_core::Timestamp::now(),
            duplicates_dropped: report.duplicates_dropped,
        };
        self.store.insert_campaign(campaign.clone())?;
        self.indexes.insert(
            campaign.id,
            Arc::new(CampaignIndex {
                members: seen,
                tree,
            }),
        );

        tracing::info!(
            campaign = %campaign.id,
            root = %campaign.root,
            members = campaign.member_count(),
            algorithm = %algorithm,
            duplicates_dropped = report.duplicates_dropped,
            "campaign created"
        );
        Ok(campaign)
    }

    pub fn get_campaign(&self, id: &CampaignId) -> Result<Arc<Campaign>, DistributionError> {
        self.store
            .campaign(id)?
            .ok_or(DistributionError::CampaignNotFound(*id))
    }

    /// Summaries of every campaign, oldest first.
    pub fn list_campaigns(&self) -> Result<Vec<CampaignSummary>, DistributionError> {
        let mut summaries: Vec<CampaignSummary> =
            self.store.campaigns()?.iter().map(|c| c.summary()).collect();
        summaries.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(summaries)
    }

    fn index(&self, id: &CampaignId) -> Result<Arc<CampaignIndex>, DistributionError> {
        if let Some(index) = self.indexes.get(id) {
            return Ok(Arc::clone(index.value()));
        }

        let campaign = self.get_campaign(id)?;
        let (tree, _) = MerkleTree::build(
            campaign.algorithm,
            &campaign.addresses,
            DuplicatePolicy::Reject,
        )?;
        if tree.root() != campaign.root {
            tracing::error!(
                campaign = %id,
                expected = %campaign.root,
                actual = %tree.root(),
                "stored eligible set does not rebuild to the published root"
            );
            return Err(DistributionError::RootMismatch {
                expected: campaign.root,
                actual: tree.root(),
            });
        }

        let index = Arc::new(CampaignIndex::new(tree, &campaign.addresses));
        Ok(Arc::clone(
            self.indexes.entry(*id).or_insert(index).value(),
        ))
    }

    /// Whether `address` is in the campaign's eligible set.
    pub fn is_eligible(&self, id: &CampaignId, address: &Address) -> Result<bool, DistributionError> {
        Ok(self.index(id)?.members.contains(address))
    }

    /// Membership proof for `address`.
    ///
    /// # Errors
    ///
    /// `CampaignNotFound` if the campaign does not exist, `NotEligible` if
    /// it does and the address is not a member.
    pub fn generate_proof(
        &self,
        id: &CampaignId,
        address: &Address,
    ) -> Result<MerkleProof, DistributionError> {
        self.index(id)?.tree.proof_for(address)
    }

    /// Eligibility plus claim state for one pair.
    pub fn claim_status(
        &self,
        id: &CampaignId,
        address: &Address,
    ) -> Result<ClaimStatus, DistributionError> {
        let eligible = self.is_eligible(id, address)?;
        let record = self.store.claim(id, address)?;
        Ok(ClaimStatus::new(*id, *address, eligible, record.as_ref()))
    }

    pub fn claims(&self, id: &CampaignId) -> Result<Vec<ClaimRecord>, DistributionError> {
        self.get_campaign(id)?;
        self.store.claims(id)
    }

    /// Record a confirmed claim. Idempotent.
    ///
    /// The first confirmed transaction for a pair wins. Later calls return
    /// that record unchanged, even if they carry a different reference.
    pub fn mark_claimed(
        &self,
        id: &CampaignId,
        address: &Address,
        tx_ref: TxRef,
    ) -> Result<ClaimRecord, DistributionError> {
        if !self.is_eligible(id, address)? {
            return Err(DistributionError::NotEligible { address: *address });
        }

        let outcome = self
            .store
            .mark_claimed_if_unclaimed(ClaimRecord::new(*id, *address, tx_ref.clone()))?;
        match &outcome {
            MarkOutcome::Recorded(record) => {
                tracing::info!(campaign = %id, address = %address, tx = %record.tx_ref, "claim recorded");
            }
            MarkOutcome::Existing(record) if record.tx_ref != tx_ref => {
                tracing::warn!(
                    campaign = %id,
                    address = %address,
                    recorded = %record.tx_ref,
                    ignored = %tx_ref,
                    "claim already recorded under a different transaction"
                );
            }
            MarkOutcome::Existing(_) => {
                tracing::debug!(campaign = %id, address = %address, "claim already recorded");
            }
        }
        Ok(outcome.into_record())
    }

    /// Clear a claim record. Administrative correction.
    ///
    /// Returns the cleared record, or `None` if the pair was not claimed.
    pub fn revoke_claim(
        &self,
        id: &CampaignId,
        address: &Address,
        reason: &str,
    ) -> Result<Option<ClaimRecord>, DistributionError> {
        self.get_campaign(id)?;
        let cleared = self.store.clear_claim(id, address)?;
        if let Some(record) = &cleared {
            tracing::warn!(
                campaign = %id,
                address = %address,
                tx = %record.tx_ref,
                reason,
                "claim record cleared by administrative correction"
            );
        }
        Ok(cleared)
    }
}
