//! # Stateless Proof Verification
//!
//! `POST /v1/proofs/verify` checks a proof against a caller-supplied
//! root with the independent verifier. No campaign lookup is involved, so
//! a claimant can check material before spending on a contract call.

use axum::extract::rejection::JsonRejection;
use axum::routing::post;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};

use cred_core::HashAlgorithm;

use crate::error::AppError;
use crate::extractors::extract_json;
use crate::state::AppState;

/// Request body for proof verification.
#[derive(Debug, Deserialize)]
pub struct VerifyRequest {
    /// Hashing domain. Defaults to keccak256.
    #[serde(default)]
    pub algorithm: HashAlgorithm,
    pub address: String,
    pub root: String,
    #[serde(default)]
    pub proof: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct VerifyResponse {
    pub valid: bool,
}

pub fn router() -> Router<AppState> {
    Router::new().route("/v1/proofs/verify", post(verify))
}

/// POST /v1/proofs/verify
///
/// A well-formed proof that does not match returns `{"valid": false}`.
/// Malformed input returns 422.
async fn verify(
    body: Result<Json<VerifyRequest>, JsonRejection>,
) -> Result<Json<VerifyResponse>, AppError> {
    let req = extract_json(body)?;
    let valid = cred_merkle::verify_hex(req.algorithm, &req.address, &req.root, &req.proof)?;
    Ok(Json(VerifyResponse { valid }))
}
