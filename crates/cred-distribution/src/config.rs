//! Distribution configuration.
//!
//! Hashing domain, duplicate handling and the confirmation bound, loaded
//! from environment variables or built explicitly for tests.

use std::time::Duration;

use cred_core::HashAlgorithm;
use cred_merkle::DuplicatePolicy;

/// Default bound on waiting for the verifying contract.
pub const DEFAULT_CONFIRMATION_TIMEOUT: Duration = Duration::from_secs(60);

/// Settings shared by the tracker and orchestrator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DistributionConfig {
    /// Hashing domain for new campaigns that do not choose one.
    pub hash_algorithm: HashAlgorithm,
    /// What to do with repeated addresses at campaign creation.
    pub duplicate_policy: DuplicatePolicy,
    /// How long a submitted claim may wait for confirmation.
    pub confirmation_timeout: Duration,
}

impl Default for DistributionConfig {
    fn default() -> Self {
        Self {
            hash_algorithm: HashAlgorithm::default(),
            duplicate_policy: DuplicatePolicy::default(),
            confirmation_timeout: DEFAULT_CONFIRMATION_TIMEOUT,
        }
    }
}

impl DistributionConfig {
    /// Load configuration from environment variables.
    ///
    /// Variables:
    /// - `CRED_HASH_ALGORITHM` (`keccak256` | `sha256`, default: `keccak256`)
    /// - `CRED_DUPLICATE_POLICY` (`reject` | `first-occurrence`, default: `reject`)
    /// - `CRED_CONFIRMATION_TIMEOUT_SECS` (default: 60, must be > 0)
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(raw) = lookup("CRED_HASH_ALGORITHM") {
            config.hash_algorithm = raw.parse().map_err(|_| ConfigError::Invalid {
                var: "CRED_HASH_ALGORITHM",
                value: raw.clone(),
                expected: "keccak256 or sha256",
            })?;
        }

        if let Some(raw) = lookup("CRED_DUPLICATE_POLICY") {
            config.duplicate_policy = raw.parse().map_err(|_| ConfigError::Invalid {
                var: "CRED_DUPLICATE_POLICY",
                value: raw.clone(),
                expected: "reject or first-occurrence",
            })?;
        }

        if let Some(raw) = lookup("CRED_CONFIRMATION_TIMEOUT_SECS") {
            let secs: u64 = raw
                .trim()
                .parse()
                .ok()
                .filter(|s| *s > 0)
                .ok_or_else(|| ConfigError::Invalid {
                    var: "CRED_CONFIRMATION_TIMEOUT_SECS",
                    value: raw.clone(),
                    expected: "a positive number of seconds",
                })?;
            config.confirmation_timeout = Duration::from_secs(secs);
        }

        Ok(config)
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid value {value:?} for {var}: expected {expected}")]
    Invalid {
        var: &'static str,
        value: String,
        expected: &'static str,
    },
}
