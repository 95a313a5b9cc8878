//! # Application State
//!
//! Shared state handed to every handler: the campaign tracker, the
//! verifying contract, the claim orchestrator wired to both, and the
//! Prometheus handle when a recorder is installed.
//!
//! The service runs against [`LocalVerifyingContract`]. Every campaign's
//! root is published to it at creation, and on startup for campaigns
//! already in the store.

use std::sync::Arc;

use metrics_exporter_prometheus::PrometheusHandle;

use cred_core::DistributionError;
use cred_distribution::{
    CampaignStore, CampaignTracker, ClaimOrchestrator, DistributionConfig, LocalVerifyingContract,
    MemoryStore,
};

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub tracker: Arc<CampaignTracker>,
    pub contract: Arc<LocalVerifyingContract>,
    pub orchestrator: Arc<ClaimOrchestrator<LocalVerifyingContract>>,
    pub metrics: Option<PrometheusHandle>,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("tracker", &self.tracker)
            .field("orchestrator", &self.orchestrator)
            .field("metrics", &self.metrics.is_some())
            .finish()
    }
}

impl AppState {
    /// In-memory state with default configuration.
    pub fn new() -> Self {
        Self::build(
            Arc::new(MemoryStore::new()),
            DistributionConfig::default(),
        )
    }

    /// State over an existing store. Roots of stored campaigns are
    /// published to the verifying contract.
    pub fn with_store(
        store: Arc<dyn CampaignStore>,
        config: DistributionConfig,
    ) -> Result<Self, DistributionError> {
        let state = Self::build(store, config);
        for campaign in state.tracker.list_campaigns()? {
            state
                .contract
                .publish_root(campaign.target_contract, campaign.root, campaign.algorithm);
        }
        Ok(state)
    }

    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics = Some(handle);
        self
    }

    fn build(store: Arc<dyn CampaignStore>, config: DistributionConfig) -> Self {
        let tracker = Arc::new(CampaignTracker::new(store, config));
        let contract = Arc::new(LocalVerifyingContract::new());
        let orchestrator = Arc::new(ClaimOrchestrator::new(
            Arc::clone(&tracker),
            Arc::clone(&contract),
        ));
        Self {
            tracker,
            contract,
            orchestrator,
            metrics: None,
        }
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}
