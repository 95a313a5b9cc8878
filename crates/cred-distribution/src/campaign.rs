//! # Campaign and Claim Records
//!
//! A [`Campaign`] is created once and never edited. Its address list and
//! root are fixed together: changing membership means creating a new
//! campaign, since any change to the list changes the root and invalidates
//! every outstanding proof.
//!
//! A [`ClaimRecord`] exists only for a confirmed claim. Its transaction
//! reference is mandatory, so "claimed" without a confirmed external
//! transaction is unrepresentable.

use serde::{Deserialize, Serialize};

use cred_core::{Address, CampaignId, HashAlgorithm, NodeHash, Timestamp, TxRef};

/// Parameters for creating a campaign.
///
/// Addresses are taken as text and normalized during creation, so
/// ingestion sources (pasted lists, CSV exports, ledger snapshots) only
/// need to reduce to strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewCampaign {
    /// Human-readable title.
    pub title: String,
    /// Contract where proofs are verified.
    pub target_contract: String,
    /// Eligible addresses in any accepted textual form.
    pub addresses: Vec<String>,
    /// Opaque pointer to what is being distributed.
    #[serde(default)]
    pub metadata_uri: String,
    /// Hashing domain override. `None` uses the tracker's default.
    #[serde(default)]
    pub algorithm: Option<HashAlgorithm>,
}

/// A published distribution campaign.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Campaign {
    pub id: CampaignId,
    pub title: String,
    pub target_contract: Address,
    /// Merkle root over `addresses`.
    pub root: NodeHash,
    /// Hashing domain the root was built with.
    pub algorithm: HashAlgorithm,
    /// Normalized, distinct eligible addresses in first-seen order.
    pub addresses: Vec<Address>,
    pub metadata_uri: String,
    pub created_at: Timestamp,
    /// Redundant input entries dropped at creation, if the duplicate
    /// policy allowed dropping them.
    #[serde(default)]
    pub duplicates_dropped: usize,
}

impl Campaign {
    pub fn member_count(&self) -> usize {
        self.addresses.len()
    }

    pub fn summary(&self) -> CampaignSummary {
        CampaignSummary {
            id: self.id,
            title: self.title.clone(),
            target_contract: self.target_contract,
            root: self.root,
            algorithm: self.algorithm,
            member_count: self.member_count(),
            metadata_uri: self.metadata_uri.clone(),
            created_at: self.created_at,
        }
    }
}

/// Campaign without its address list, for listings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CampaignSummary {
    pub id: CampaignId,
    pub title: String,
    pub target_contract: Address,
    pub root: NodeHash,
    pub algorithm: HashAlgorithm,
    pub member_count: usize,
    pub metadata_uri: String,
    pub created_at: Timestamp,
}

/// A confirmed claim for one (campaign, address) pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClaimRecord {
    pub campaign_id: CampaignId,
    pub address: Address,
    /// Transaction that confirmed the claim on the verifying contract.
    pub tx_ref: TxRef,
    pub claimed_at: Timestamp,
}

impl ClaimRecord {
    pub fn new(campaign_id: CampaignId, address: Address, tx_ref: TxRef) -> Self {
        Self {
            campaign_id,
            address,
            tx_ref,
            claimed_at: Timestamp::now(),
        }
    }
}

/// Eligibility and claim state for one (campaign, address) pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClaimStatus {
    pub campaign_id: CampaignId,
    pub address: Address,
    /// Member of the campaign's eligible set.
    pub eligible: bool,
    pub claimed: bool,
    pub tx_ref: Option<TxRef>,
    pub claimed_at: Option<Timestamp>,
}

impl ClaimStatus {
    pub(crate) fn new(
        campaign_id: CampaignId,
        address: Address,
        eligible: bool,
        record: Option<&ClaimRecord>,
    ) -> Self {
        Self {
            campaign_id,
            address,
            eligible,
            claimed: record.is_some(),
            tx_ref: record.map(|r| r.tx_ref.clone()),
            claimed_at: record.map(|r| r.claimed_at),
        }
    }
}
