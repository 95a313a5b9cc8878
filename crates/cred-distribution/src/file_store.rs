//! # JSON File Store
//!
//! Durable [`CampaignStore`] over a directory of JSON documents:
//!
//! ```text
//! <root>/campaigns/<uuid>.json
//! <root>/claims/<uuid>/<0xaddress>.json
//! ```
//!
//! One document per claim, so marking a pair never rewrites another pair's
//! record.
//!
//! Writes go to a temporary file in the same directory and are renamed into
//! place, so a crash never leaves a half-written document. A process-wide
//! mutex serializes writers, which makes the check-then-write of
//! `mark_claimed_if_unclaimed` and the contract binding check of
//! `insert_campaign` atomic for every caller sharing this store. Separate
//! processes sharing one directory are not coordinated.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde::Serialize;

use cred_core::{Address, CampaignId, DistributionError};

use crate::campaign::{Campaign, ClaimRecord};
use crate::store::{contract_bound, CampaignStore, MarkOutcome};

/// Directory-backed campaign store.
#[derive(Debug)]
pub struct FileStore {
    root: PathBuf,
    write_lock: Mutex<()>,
}

impl FileStore {
    /// Open (creating if needed) a store rooted at `root`.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, DistributionError> {
        let root = root.into();
        for sub in ["campaigns", "claims"] {
            let dir = root.join(sub);
            fs::create_dir_all(&dir).map_err(|e| io_error(&dir, e))?;
        }
        Ok(Self {
            root,
            write_lock: Mutex::new(()),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn campaign_path(&self, id: &CampaignId) -> PathBuf {
        self.root
            .join("campaigns")
            .join(format!("{}.json", id.as_uuid()))
    }

    fn claims_dir(&self, id: &CampaignId) -> PathBuf {
        self.root.join("claims").join(id.as_uuid().to_string())
    }

    fn claim_path(&self, id: &CampaignId, address: &Address) -> PathBuf {
        self.claims_dir(id).join(format!("{}.json", address.to_hex()))
    }
}

fn io_error(path: &Path, e: std::io::Error) -> DistributionError {
    DistributionError::Store(format!("{}: {e}", path.display()))
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>, DistributionError> {
    match fs::read(path) {
        Ok(bytes) => serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(|e| DistributionError::Store(format!("{}: {e}", path.display()))),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(io_error(path, e)),
    }
}

fn write_json_atomic<T: Serialize>(path: &Path, value: &T) -> Result<(), DistributionError> {
    let json = serde_json::to_vec_pretty(value)
        .map_err(|e| DistributionError::Store(format!("serialize {}: {e}", path.display())))?;
    let dir = path
        .parent()
        .ok_or_else(|| DistributionError::Store(format!("{} has no parent", path.display())))?;
    fs::create_dir_all(dir).map_err(|e| io_error(dir, e))?;
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, json).map_err(|e| io_error(&tmp, e))?;
    fs::rename(&tmp, path).map_err(|e| io_error(path, e))
}

fn json_files(dir: &Path) -> Result<Vec<PathBuf>, DistributionError> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(io_error(dir, e)),
    };
    let mut paths = Vec::new();
    for entry in entries {
        let path = entry.map_err(|e| io_error(dir, e))?.path();
        if path.extension().is_some_and(|ext| ext == "json") {
            paths.push(path);
        }
    }
    paths.sort();
    Ok(paths)
}

impl CampaignStore for FileStore {
    fn insert_campaign(&self, campaign: Campaign) -> Result<(), DistributionError> {
        let _guard = self.write_lock.lock();
        let path = self.campaign_path(&campaign.id);
        if path.exists() {
            return Err(DistributionError::InvalidCampaign(format!(
                "{} already exists",
                campaign.id
            )));
        }
        if let Some(owner) = self
            .campaigns()?
            .iter()
            .find(|c| c.target_contract == campaign.target_contract)
        {
            return Err(contract_bound(&campaign.target_contract, &owner.id));
        }
        write_json_atomic(&path, &campaign)
    }

    fn campaign(&self, id: &CampaignId) -> Result<Option<Arc<Campaign>>, DistributionError> {
        Ok(read_json::<Campaign>(&self.campaign_path(id))?.map(Arc::new))
    }

    fn campaigns(&self) -> Result<Vec<Arc<Campaign>>, DistributionError> {
        let mut out = Vec::new();
        for path in json_files(&self.root.join("campaigns"))? {
            if let Some(c) = read_json::<Campaign>(&path)? {
                out.push(Arc::new(c));
            }
        }
        Ok(out)
    }

    fn claim(
        &self,
        id: &CampaignId,
        address: &Address,
    ) -> Result<Option<ClaimRecord>, DistributionError> {
        read_json(&self.claim_path(id, address))
    }

    fn claims(&self, id: &CampaignId) -> Result<Vec<ClaimRecord>, DistributionError> {
        let mut out = Vec::new();
        for path in json_files(&self.claims_dir(id))? {
            if let Some(r) = read_json::<ClaimRecord>(&path)? {
                out.push(r);
            }
        }
        out.sort_by(|a, b| a.address.cmp(&b.address));
        Ok(out)
    }

    fn mark_claimed_if_unclaimed(
        &self,
        record: ClaimRecord,
    ) -> Result<MarkOutcome, DistributionError> {
        let _guard = self.write_lock.lock();
        let path = self.claim_path(&record.campaign_id, &record.address);
        if let Some(existing) = read_json::<ClaimRecord>(&path)? {
            return Ok(MarkOutcome::Existing(existing));
        }
        write_json_atomic(&path, &record)?;
        Ok(MarkOutcome::Recorded(record))
    }

    fn clear_claim(
        &self,
        id: &CampaignId,
        address: &Address,
    ) -> Result<Option<ClaimRecord>, DistributionError> {
        let _guard = self.write_lock.lock();
        let path = self.claim_path(id, address);
        let existing = read_json::<ClaimRecord>(&path)?;
        if existing.is_some() {
            fs::remove_file(&path).map_err(|e| io_error(&path, e))?;
        }
        Ok(existing)
    }
}
