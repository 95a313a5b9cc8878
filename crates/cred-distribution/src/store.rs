//! # Persistence Contract
//!
//! [`CampaignStore`] is the read/write contract the tracker needs from a
//! durable store. Any backend that honours two rules will do:
//!
//! - Campaigns are insert-once. A second insert under the same id fails.
//! - A target contract holds one root, so it is bound to at most one
//!   campaign. Inserting a campaign whose contract is already bound fails,
//!   and the check is atomic with the insert.
//! - [`CampaignStore::mark_claimed_if_unclaimed`] is an atomic
//!   compare-and-set: of any number of concurrent calls for one pair,
//!   exactly one writes and every call returns the record that won.
//!
//! Implementations must not hold locks across `.await`; the trait is
//! synchronous so they cannot.

use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use cred_core::{Address, CampaignId, DistributionError};

use crate::campaign::{Campaign, ClaimRecord};

/// Result of a conditional claim write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MarkOutcome {
    /// No record existed; this one was written.
    Recorded(ClaimRecord),
    /// A record already existed and was left untouched.
    Existing(ClaimRecord),
}

impl MarkOutcome {
    pub fn record(&self) -> &ClaimRecord {
        match self {
            Self::Recorded(r) | Self::Existing(r) => r,
        }
    }

    pub fn into_record(self) -> ClaimRecord {
        match self {
            Self::Recorded(r) | Self::Existing(r) => r,
        }
    }
}

/// Storage backend for campaigns and claim records.
pub trait CampaignStore: Send + Sync {
    /// Insert a new campaign. Fails if the id already exists or the target
    /// contract is bound to another campaign.
    fn insert_campaign(&self, campaign: Campaign) -> Result<(), DistributionError>;

    fn campaign(&self, id: &CampaignId) -> Result<Option<Arc<Campaign>>, DistributionError>;

    fn campaigns(&self) -> Result<Vec<Arc<Campaign>>, DistributionError>;

    fn claim(
        &self,
        id: &CampaignId,
        address: &Address,
    ) -> Result<Option<ClaimRecord>, DistributionError>;

    /// All claim records for a campaign, ordered by address.
    fn claims(&self, id: &CampaignId) -> Result<Vec<ClaimRecord>, DistributionError>;

    /// Write `record` only if no record exists for its pair.
    fn mark_claimed_if_unclaimed(
        &self,
        record: ClaimRecord,
    ) -> Result<MarkOutcome, DistributionError>;

    /// Remove the record for a pair. Administrative correction only.
    fn clear_claim(
        &self,
        id: &CampaignId,
        address: &Address,
    ) -> Result<Option<ClaimRecord>, DistributionError>;
}

/// Rejection for a target contract that already holds another campaign's root.
pub(crate) fn contract_bound(contract: &Address, owner: &CampaignId) -> DistributionError {
    DistributionError::InvalidCampaign(format!(
        "target contract {contract} already holds the root of {owner}"
    ))
}

// ─── In-memory backend ──────────────────────────────────────────────

/// DashMap-backed store. Per-key atomicity comes from the entry API.
#[derive(Debug, Default)]
pub struct MemoryStore {
    campaigns: DashMap<CampaignId, Arc<Campaign>>,
    contracts: DashMap<Address, CampaignId>,
    claims: DashMap<(CampaignId, Address), ClaimRecord>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CampaignStore for MemoryStore {
    fn insert_campaign(&self, campaign: Campaign) -> Result<(), DistributionError> {
        // Contract entry first, then campaign entry; the only place both are held.
        let binding = match self.contracts.entry(campaign.target_contract) {
            Entry::Occupied(bound) => {
                return Err(contract_bound(&campaign.target_contract, bound.get()))
            }
            Entry::Vacant(binding) => binding,
        };
        match self.campaigns.entry(campaign.id) {
            Entry::Occupied(_) => Err(DistributionError::InvalidCampaign(format!(
                "{} already exists",
                campaign.id
            ))),
            Entry::Vacant(slot) => {
                binding.insert(campaign.id);
                slot.insert(Arc::new(campaign));
                Ok(())
            }
        }
    }

    fn campaign(&self, id: &CampaignId) -> Result<Option<Arc<Campaign>>, DistributionError> {
        Ok(self.campaigns.get(id).map(|c| Arc::clone(c.value())))
    }

    fn campaigns(&self) -> Result<Vec<Arc<Campaign>>, DistributionError> {
        Ok(self
            .campaigns
            .iter()
            .map(|c| Arc::clone(c.value()))
            .collect())
    }

    fn claim(
        &self,
        id: &CampaignId,
        address: &Address,
    ) -> Result<Option<ClaimRecord>, DistributionError> {
        Ok(self.claims.get(&(*id, *address)).map(|r| r.value().clone()))
    }

    fn claims(&self, id: &CampaignId) -> Result<Vec<ClaimRecord>, DistributionError> {
        let mut records: Vec<ClaimRecord> = self
            .claims
            .iter()
            .filter(|r| r.key().0 == *id)
            .map(|r| r.value().clone())
            .collect();
        records.sort_by(|a, b| a.address.cmp(&b.address));
        Ok(records)
    }

    fn mark_claimed_if_unclaimed(
        &self,
        record: ClaimRecord,
    ) -> Result<MarkOutcome, DistributionError> {
        match self.claims.entry((record.campaign_id, record.address)) {
            Entry::Occupied(existing) => Ok(MarkOutcome::Existing(existing.get().clone())),
            Entry::Vacant(slot) => {
                slot.insert(record.clone());
                Ok(MarkOutcome::Recorded(record))
            }
        }
    }

    fn clear_claim(
        &self,
        id: &CampaignId,
        address: &Address,
    ) -> Result<Option<ClaimRecord>, DistributionError> {
        Ok(self.claims.remove(&(*id, *address)).map(|(_, r)| r))
    }
}
