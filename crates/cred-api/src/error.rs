//! # API Error Types
//!
//! Maps [`DistributionError`] to HTTP status codes with a structured JSON
//! body. The body's `code` is the domain error code, so clients can tell
//! "not eligible" from "already claimed" without parsing messages.
//! Internal failures are logged and returned without detail.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use cred_core::DistributionError;
use cred_state::DynClaimAttempt;

/// Structured JSON error response body.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

/// Inner error detail.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorDetail {
    /// Machine-readable error code (e.g., "NOT_ELIGIBLE").
    pub code: String,
    /// Human-readable error message.
    pub message: String,
    /// Additional context. For failed claims, the full attempt record.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

/// Application-level error type that implements [`IntoResponse`].
#[derive(Error, Debug)]
pub enum AppError {
    /// A domain operation failed.
    #[error(transparent)]
    Domain(#[from] DistributionError),

    /// A claim attempt ended in `FAILED`.
    #[error("{error}")]
    ClaimFailed {
        error: DistributionError,
        attempt: Box<DynClaimAttempt>,
    },

    /// Request body or path could not be parsed (400).
    #[error("bad request: {0}")]
    BadRequest(String),
}

/// HTTP status for a domain error.
pub fn status_for(error: &DistributionError) -> StatusCode {
    match error {
        DistributionError::InvalidAddress { .. }
        | DistributionError::EmptyCampaign
        | DistributionError::DuplicateLeaf { .. }
        | DistributionError::InvalidCampaign(_)
        | DistributionError::MalformedProof(_) => StatusCode::UNPROCESSABLE_ENTITY,
        DistributionError::NotEligible { .. } => StatusCode::FORBIDDEN,
        DistributionError::AlreadyClaimed { .. } | DistributionError::ClaimInProgress { .. } => {
            StatusCode::CONFLICT
        }
        DistributionError::CampaignNotFound(_) => StatusCode::NOT_FOUND,
        DistributionError::ConfirmationTimeout { .. } => StatusCode::GATEWAY_TIMEOUT,
        DistributionError::ExternalVerificationFailed { .. } => StatusCode::BAD_GATEWAY,
        DistributionError::RootMismatch { .. } | DistributionError::Store(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

impl AppError {
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            Self::Domain(e) | Self::ClaimFailed { error: e, .. } => (status_for(e), e.code()),
            Self::BadRequest(_) => (StatusCode::BAD_REQUEST, "BAD_REQUEST"),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();

        // Never expose internal error messages to clients.
        let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!(error = %self, code, "internal server error");
            "An internal error occurred".to_string()
        } else {
            self.to_string()
        };

        let details = match &self {
            Self::ClaimFailed { attempt, .. } => serde_json::to_value(attempt).ok(),
            _ => None,
        };

        let body = ErrorBody {
            error: ErrorDetail {
                code: code.to_string(),
                message,
                details,
            },
        };
        (status, Json(body)).into_response()
    }
}
