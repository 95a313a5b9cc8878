//! # Extraction Helpers
//!
//! JSON bodies and path segments are extracted leniently by axum and
//! checked here, so rejections come back in the same error body as every
//! other failure.

use axum::extract::rejection::JsonRejection;
use axum::Json;

use cred_core::{Address, CampaignId};

use crate::error::AppError;

/// Extract a JSON body, mapping deserialization errors to [`AppError::BadRequest`].
pub fn extract_json<T>(result: Result<Json<T>, JsonRejection>) -> Result<T, AppError> {
    result
        .map(|Json(v)| v)
        .map_err(|err| AppError::BadRequest(err.body_text()))
}

/// Parse a campaign id path segment (bare UUID or `campaign:<uuid>`).
pub fn campaign_id(raw: &str) -> Result<CampaignId, AppError> {
    raw.parse()
        .map_err(|e| AppError::BadRequest(format!("invalid campaign id {raw:?}: {e}")))
}

/// Parse an address path segment. Malformed input is a domain
/// `INVALID_ADDRESS`, not a generic bad request.
pub fn address(raw: &str) -> Result<Address, AppError> {
    Ok(Address::parse(raw)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn campaign_id_accepts_both_forms() {
        let id = CampaignId::new();
        assert_eq!(campaign_id(&id.as_uuid().to_string()).unwrap(), id);
        assert_eq!(campaign_id(&id.to_string()).unwrap(), id);
        assert!(matches!(campaign_id("nope"), Err(AppError::BadRequest(_))));
    }

    #[test]
    fn address_errors_stay_typed() {
        assert!(matches!(address("0x12"), Err(AppError::Domain(_))));
        assert!(address("0x1111111111111111111111111111111111111111").is_ok());
    }
}
