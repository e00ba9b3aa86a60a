//! Custom Axum extractors

use axum::extract::{FromRequestParts, Path};
use axum::http::request::Parts;
use axum::http::HeaderMap;
use govboard_core::model::{Principal, PrincipalKind, ValidationError};
use uuid::Uuid;

use super::error::ApiError;

pub const WALLET_HEADER: &str = "x-wallet-address";
pub const ASSET_UNITS_HEADER: &str = "x-asset-units";

/// The calling wallet, from `x-wallet-address` (stake address) and
/// `x-asset-units` (comma-separated NFT units the wallet holds). Both are
/// optional; a request without them is anonymous.
pub struct Caller(pub Principal);

impl<S> FromRequestParts<S> for Caller
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self(principal_from_headers(&parts.headers)?))
    }
}

fn header_str<'a>(headers: &'a HeaderMap, name: &'static str) -> Result<Option<&'a str>, ValidationError> {
    match headers.get(name) {
        None => Ok(None),
        Some(value) => value
            .to_str()
            .map(|v| Some(v.trim()).filter(|v| !v.is_empty()))
            .map_err(|_| ValidationError::InvalidFormat {
                field: name,
                reason: "must be visible ASCII",
            }),
    }
}

pub fn principal_from_headers(headers: &HeaderMap) -> Result<Principal, ValidationError> {
    let stake_address = match header_str(headers, WALLET_HEADER)? {
        Some(address) => {
            PrincipalKind::Wallet.validate(address)?;
            Some(address.to_string())
        }
        None => None,
    };

    let mut asset_units = Vec::new();
    if let Some(units) = header_str(headers, ASSET_UNITS_HEADER)? {
        for unit in units.split(',').map(str::trim).filter(|u| !u.is_empty()) {
            let unit = unit.to_ascii_lowercase();
            PrincipalKind::Nft.validate(&unit)?;
            asset_units.push(unit);
        }
    }

    Ok(Principal {
        stake_address,
        asset_units,
    })
}

/// Extract and validate a UUID from path
pub struct ValidUuid(pub Uuid);

impl<S> FromRequestParts<S> for ValidUuid
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(id): Path<String> = Path::from_request_parts(parts, state)
            .await
            .map_err(|_| ApiError::Validation(ValidationError::Empty { field: "id" }))?;

        let uuid = Uuid::parse_str(&id).map_err(|_| {
            ApiError::Validation(ValidationError::InvalidFormat {
                field: "id",
                reason: "invalid UUID format",
            })
        })?;

        Ok(Self(uuid))
    }
}

/// Check `Authorization: Bearer <token>` against the configured ingest token.
/// Passes when no token is configured.
pub fn require_bearer(headers: &HeaderMap, expected: Option<&str>) -> Result<(), ApiError> {
    let Some(expected) = expected else {
        return Ok(());
    };
    let presented = headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "));
    if presented == Some(expected) {
        Ok(())
    } else {
        Err(ApiError::Unauthorized("missing or invalid bearer token".into()))
    }
}
