//! # Campaign Routes
//!
//! ## Endpoints
//!
//! - `POST /v1/campaigns`: Create a campaign and publish its root.
//! - `GET  /v1/campaigns`: List campaign summaries.
//! - `GET  /v1/campaigns/{id}`: Full campaign, including the address list.
//! - `GET  /v1/campaigns/{id}/eligibility/{address}`: Eligibility and claim state.
//! - `GET  /v1/campaigns/{id}/proofs/{address}`: Membership proof.
//! - `POST /v1/campaigns/{id}/claims`: Run a claim attempt.
//! - `GET  /v1/campaigns/{id}/claims`: Confirmed claim records.
//! - `POST /v1/campaigns/{id}/reconcile/{address}`: Re-sync one pair with the contract.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};

use cred_core::{Address, CampaignId, HashAlgorithm, NodeHash};
use cred_distribution::{
    Campaign, CampaignSummary, ClaimRecord, ClaimStatus, NewCampaign, ReconcileOutcome,
};
use cred_state::DynClaimAttempt;

use crate::error::AppError;
use crate::extractors::{address, campaign_id, extract_json};
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request / Response types
// ---------------------------------------------------------------------------

/// Body of a claim request.
#[derive(Debug, Deserialize)]
pub struct ClaimRequest {
    pub address: String,
}

/// A membership proof in the form a contract call takes.
#[derive(Debug, Serialize, Deserialize)]
pub struct ProofResponse {
    pub campaign_id: CampaignId,
    pub address: Address,
    pub algorithm: HashAlgorithm,
    pub root: NodeHash,
    pub leaf: NodeHash,
    /// Sibling hashes from the leaf level up, as `0x` hex.
    pub proof: Vec<String>,
}

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/v1/campaigns", post(create_campaign).get(list_campaigns))
        .route("/v1/campaigns/{id}", get(get_campaign))
        .route(
            "/v1/campaigns/{id}/eligibility/{address}",
            get(eligibility),
        )
        .route("/v1/campaigns/{id}/proofs/{address}", get(proof))
        .route("/v1/campaigns/{id}/claims", post(claim).get(list_claims))
        .route(
            "/v1/campaigns/{id}/reconcile/{address}",
            post(reconcile),
        )
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// POST /v1/campaigns: Create a campaign.
///
/// The new root is published to the verifying contract before the
/// response is sent, so claims can be submitted immediately.
async fn create_campaign(
    State(state): State<AppState>,
    body: Result<Json<NewCampaign>, JsonRejection>,
) -> Result<(StatusCode, Json<Campaign>), AppError> {
    let new = extract_json(body)?;
    let campaign = state.tracker.create_campaign(new)?;
    state
        .contract
        .publish_root(campaign.target_contract, campaign.root, campaign.algorithm);
    Ok((StatusCode::CREATED, Json(campaign)))
}

async fn list_campaigns(
    State(state): State<AppState>,
) -> Result<Json<Vec<CampaignSummary>>, AppError> {
    Ok(Json(state.tracker.list_campaigns()?))
}

async fn get_campaign(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Campaign>, AppError> {
    let campaign = state.tracker.get_campaign(&campaign_id(&id)?)?;
    Ok(Json(Campaign::clone(&campaign)))
}

async fn eligibility(
    State(state): State<AppState>,
    Path((id, addr)): Path<(String, String)>,
) -> Result<Json<ClaimStatus>, AppError> {
    let status = state
        .tracker
        .claim_status(&campaign_id(&id)?, &address(&addr)?)?;
    Ok(Json(status))
}

/// GET /v1/campaigns/{id}/proofs/{address}: Membership proof.
///
/// 403 `NOT_ELIGIBLE` if the address is not a member, 404
/// `CAMPAIGN_NOT_FOUND` if the campaign does not exist.
async fn proof(
    State(state): State<AppState>,
    Path((id, addr)): Path<(String, String)>,
) -> Result<Json<ProofResponse>, AppError> {
    let id = campaign_id(&id)?;
    let addr = address(&addr)?;
    let campaign = state.tracker.get_campaign(&id)?;
    let proof = state.tracker.generate_proof(&id, &addr)?;
    Ok(Json(ProofResponse {
        campaign_id: id,
        address: addr,
        algorithm: proof.algorithm,
        root: campaign.root,
        leaf: proof.leaf,
        proof: proof.sibling_hex(),
    }))
}

/// POST /v1/campaigns/{id}/claims: Run one claim attempt.
///
/// Success returns the confirmed attempt with its transition log. A
/// failed attempt returns the error's status with the attempt record in
/// `error.details`.
async fn claim(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Result<Json<ClaimRequest>, JsonRejection>,
) -> Result<Json<DynClaimAttempt>, AppError> {
    let id = campaign_id(&id)?;
    let req = extract_json(body)?;
    let addr = address(&req.address)?;
    match state.orchestrator.claim(id, addr).await {
        Ok(confirmed) => Ok(Json(DynClaimAttempt::from(confirmed))),
        Err(failed) => {
            let error = failed.error().clone();
            Err(AppError::ClaimFailed {
                error,
                attempt: Box::new(DynClaimAttempt::from(failed)),
            })
        }
    }
}

async fn list_claims(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Vec<ClaimRecord>>, AppError> {
    Ok(Json(state.tracker.claims(&campaign_id(&id)?)?))
}

async fn reconcile(
    State(state): State<AppState>,
    Path((id, addr)): Path<(String, String)>,
) -> Result<Json<ReconcileOutcome>, AppError> {
    let outcome = state
        .orchestrator
        .reconcile(campaign_id(&id)?, address(&addr)?)
        .await?;
    Ok(Json(outcome))
}
