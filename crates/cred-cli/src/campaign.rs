//! # Campaign Subcommand
//!
//! Campaign administration against a JSON [`FileStore`] in a local state
//! directory (`--state-dir`, `CRED_STATE_DIR`, default `.cred`).
//!
//! ## Subcommands
//!
//! - `create`: Create a campaign from an address-list file.
//! - `show`: Show one campaign.
//! - `list`: List campaigns.
//! - `eligible`: Eligibility and claim state for an address. Exit code 1
//!   if not eligible.
//! - `prove`: Print the proof for an address.
//! - `claims`: List confirmed claims.
//! - `mark-claimed`: Record a claim confirmed out of band.
//! - `revoke`: Clear a claim record (administrative correction).
//!
//! Claims are normally recorded by the claim orchestrator after the
//! verifying contract confirms. `mark-claimed` exists for importing claims
//! confirmed elsewhere and always requires the transaction reference.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Args, Subcommand};

use cred_core::{Address, CampaignId, HashAlgorithm, TxRef};
use cred_distribution::{CampaignTracker, DistributionConfig, FileStore, NewCampaign};
use cred_merkle::DuplicatePolicy;

use crate::read_address_file;

/// Arguments for the `cred campaign` subcommand.
#[derive(Args, Debug)]
pub struct CampaignArgs {
    /// Directory holding campaign and claim documents.
    #[arg(long, env = "CRED_STATE_DIR", default_value = ".cred", global = true)]
    pub state_dir: PathBuf,

    #[command(subcommand)]
    pub command: CampaignCommand,
}

/// Campaign subcommands.
#[derive(Subcommand, Debug)]
pub enum CampaignCommand {
    /// Create a campaign from an address-list file.
    Create {
        /// Campaign title.
        #[arg(long)]
        title: String,
        /// Verifying contract address.
        #[arg(long)]
        contract: String,
        /// Address-list file.
        #[arg(long)]
        input: PathBuf,
        /// Opaque metadata pointer stored with the campaign.
        #[arg(long, default_value = "")]
        metadata_uri: String,
        /// Hashing domain. Defaults to `CRED_HASH_ALGORITHM` or keccak256.
        #[arg(long)]
        algorithm: Option<HashAlgorithm>,
        /// Duplicate handling. Defaults to `CRED_DUPLICATE_POLICY` or reject.
        #[arg(long)]
        duplicates: Option<DuplicatePolicy>,
    },

    /// Show one campaign.
    Show {
        /// Campaign identifier.
        #[arg(long)]
        id: String,
        /// Also print every eligible address.
        #[arg(long)]
        addresses: bool,
    },

    /// List campaigns.
    List,

    /// Show eligibility and claim state for an address.
    Eligible {
        #[arg(long)]
        id: String,
        #[arg(long)]
        address: String,
    },

    /// Print the membership proof for an address.
    Prove {
        #[arg(long)]
        id: String,
        #[arg(long)]
        address: String,
    },

    /// List confirmed claims.
    Claims {
        #[arg(long)]
        id: String,
    },

    /// Record a claim confirmed by the verifying contract.
    MarkClaimed {
        #[arg(long)]
        id: String,
        #[arg(long)]
        address: String,
        /// Confirming transaction reference.
        #[arg(long)]
        tx: String,
    },

    /// Clear a claim record.
    Revoke {
        #[arg(long)]
        id: String,
        #[arg(long)]
        address: String,
        /// Why the record is being cleared. Logged.
        #[arg(long)]
        reason: String,
    },
}

/// Execute the campaign subcommand.
pub fn run_campaign(args: &CampaignArgs) -> Result<u8> {
    let config = DistributionConfig::from_env().context("invalid CRED_* environment")?;
    let dir = args.state_dir.as_path();

    match &args.command {
        CampaignCommand::Create {
            title,
            contract,
            input,
            metadata_uri,
            algorithm,
            duplicates,
        } => {
            let mut config = config;
            if let Some(policy) = duplicates {
                config.duplicate_policy = *policy;
            }
            let new = NewCampaign {
                title: title.clone(),
                target_contract: contract.clone(),
                addresses: read_address_file(input)?,
                metadata_uri: metadata_uri.clone(),
                algorithm: *algorithm,
            };
            cmd_create(dir, config, new)
        }
        CampaignCommand::Show { id, addresses } => cmd_show(dir, config, id, *addresses),
        CampaignCommand::List => cmd_list(dir, config),
        CampaignCommand::Eligible { id, address } => cmd_eligible(dir, config, id, address),
        CampaignCommand::Prove { id, address } => cmd_prove(dir, config, id, address),
        CampaignCommand::Claims { id } => cmd_claims(dir, config, id),
        CampaignCommand::MarkClaimed { id, address, tx } => {
            cmd_mark_claimed(dir, config, id, address, tx)
        }
        CampaignCommand::Revoke {
            id,
            address,
            reason,
        } => cmd_revoke(dir, config, id, address, reason),
    }
}

fn open_tracker(state_dir: &Path, config: DistributionConfig) -> Result<CampaignTracker> {
    let store = FileStore::open(state_dir)
        .with_context(|| format!("failed to open state directory {}", state_dir.display()))?;
    Ok(CampaignTracker::new(Arc::new(store), config))
}

fn parse_pair(id: &str, address: &str) -> Result<(CampaignId, Address)> {
    Ok((parse_id(id)?, Address::parse(address)?))
}

fn parse_id(id: &str) -> Result<CampaignId> {
    id.parse()
        .with_context(|| format!("invalid campaign id: {id}"))
}

fn cmd_create(state_dir: &Path, config: DistributionConfig, new: NewCampaign) -> Result<u8> {
    let tracker = open_tracker(state_dir, config)?;
    let campaign = tracker.create_campaign(new)?;

    println!("OK: created {}", campaign.id);
    println!("  Root: {}", campaign.root);
    println!("  Algorithm: {}", campaign.algorithm);
    println!("  Members: {}", campaign.member_count());
    if campaign.duplicates_dropped > 0 {
        println!("  Duplicates dropped: {}", campaign.duplicates_dropped);
    }
    Ok(0)
}

fn cmd_show(state_dir: &Path, config: DistributionConfig, id: &str, addresses: bool) -> Result<u8> {
    let tracker = open_tracker(state_dir, config)?;
    let campaign = tracker.get_campaign(&parse_id(id)?)?;

    println!("Campaign: {}", campaign.id);
    println!("  Title: {}", campaign.title);
    println!("  Contract: {}", campaign.target_contract);
    println!("  Root: {}", campaign.root);
    println!("  Algorithm: {}", campaign.algorithm);
    println!("  Members: {}", campaign.member_count());
    println!("  Metadata: {}", campaign.metadata_uri);
    println!("  Created: {}", campaign.created_at);
    if addresses {
        for a in &campaign.addresses {
            println!("    {a}");
        }
    }
    Ok(0)
}

fn cmd_list(state_dir: &Path, config: DistributionConfig) -> Result<u8> {
    let tracker = open_tracker(state_dir, config)?;
    let summaries = tracker.list_campaigns()?;
    if summaries.is_empty() {
        println!("No campaigns found.");
        return Ok(0);
    }
    println!("Campaigns ({}):", summaries.len());
    for s in &summaries {
        println!("  {} {} members={} root={}", s.id, s.title, s.member_count, s.root);
    }
    Ok(0)
}

fn cmd_eligible(state_dir: &Path, config: DistributionConfig, id: &str, address: &str) -> Result<u8> {
    let tracker = open_tracker(state_dir, config)?;
    let (id, address) = parse_pair(id, address)?;
    let status = tracker.claim_status(&id, &address)?;

    println!("Address: {address}");
    println!("  Eligible: {}", status.eligible);
    println!("  Claimed: {}", status.claimed);
    if let Some(tx) = &status.tx_ref {
        println!("  Transaction: {tx}");
    }
    Ok(if status.eligible { 0 } else { 1 })
}

fn cmd_prove(state_dir: &Path, config: DistributionConfig, id: &str, address: &str) -> Result<u8> {
    let tracker = open_tracker(state_dir, config)?;
    let (id, address) = parse_pair(id, address)?;
    let proof = tracker.generate_proof(&id, &address)?;
    println!("{}", serde_json::to_string_pretty(&proof)?);
    Ok(0)
}

fn cmd_claims(state_dir: &Path, config: DistributionConfig, id: &str) -> Result<u8> {
    let tracker = open_tracker(state_dir, config)?;
    let claims = tracker.claims(&parse_id(id)?)?;
    if claims.is_empty() {
        println!("No claims recorded.");
        return Ok(0);
    }
    println!("Claims ({}):", claims.len());
    for c in &claims {
        println!("  {} tx={} at {}", c.address, c.tx_ref, c.claimed_at);
    }
    Ok(0)
}

fn cmd_mark_claimed(
    state_dir: &Path,
    config: DistributionConfig,
    id: &str,
    address: &str,
    tx: &str,
) -> Result<u8> {
    let tracker = open_tracker(state_dir, config)?;
    let (id, address) = parse_pair(id, address)?;
    let record = tracker.mark_claimed(&id, &address, TxRef::new(tx))?;
    println!("OK: {address} claimed in {}", record.tx_ref);
    Ok(0)
}

fn cmd_revoke(
    state_dir: &Path,
    config: DistributionConfig,
    id: &str,
    address: &str,
    reason: &str,
) -> Result<u8> {
    let tracker = open_tracker(state_dir, config)?;
    let (id, address) = parse_pair(id, address)?;
    match tracker.revoke_claim(&id, &address, reason)? {
        Some(record) => println!("OK: cleared claim {} for {address}", record.tx_ref),
        None => println!("OK: {address} had no claim record"),
    }
    Ok(0)
}
