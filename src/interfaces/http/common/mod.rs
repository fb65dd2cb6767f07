//! Response envelope, pagination and error mapping shared by all handlers

pub mod validated_json;

pub use validated_json::ValidatedJson;

use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::LedgerAnchor;
use crate::shared::{DomainError, ErrorKind, PageRequest, PaginatedResult};

/// Uniform JSON envelope: `{success, data?, error?, code?}`
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Stable error kind, e.g. `insufficient_funds`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            code: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
            code: None,
        }
    }

    pub fn error_with_code(message: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            code: Some(code.into()),
            ..Self::error(message)
        }
    }
}

/// Empty payload for operations without return data
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct EmptyData {}

/// Error half of every handler result
pub type ApiError<T> = (StatusCode, Json<ApiResponse<T>>);

pub type ApiResult<T> = Result<Json<ApiResponse<T>>, ApiError<T>>;

pub fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::InvalidInput => StatusCode::BAD_REQUEST,
        ErrorKind::ResourceUnavailable | ErrorKind::InvalidState | ErrorKind::Conflict => {
            StatusCode::CONFLICT
        }
        ErrorKind::InsufficientFunds => StatusCode::PAYMENT_REQUIRED,
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::Unauthorized => StatusCode::UNAUTHORIZED,
        ErrorKind::Forbidden => StatusCode::FORBIDDEN,
        ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Map a domain error to its status code and envelope.
pub fn domain_error<T>(e: DomainError) -> ApiError<T> {
    let kind = e.kind();
    let status = status_for(kind);
    if status.is_server_error() {
        tracing::error!(error = %e, "Request failed");
    } else {
        tracing::debug!(error = %e, code = kind.as_str(), "Request rejected");
    }
    (
        status,
        Json(ApiResponse::error_with_code(e.to_string(), kind.as_str())),
    )
}

pub fn ok<T>(data: T) -> ApiResult<T> {
    Ok(Json(ApiResponse::success(data)))
}

/// Query parameters for list endpoints
#[derive(Debug, Deserialize, ToSchema, utoipa::IntoParams)]
pub struct PaginationParams {
    /// Page number (1-based). Default: 1
    #[serde(default = "default_page")]
    pub page: u32,
    /// Items per page (1–100). Default: 50
    #[serde(default = "default_limit")]
    pub limit: u32,
}

fn default_page() -> u32 {
    1
}

fn default_limit() -> u32 {
    50
}

impl Default for PaginationParams {
    fn default() -> Self {
        Self {
            page: default_page(),
            limit: default_limit(),
        }
    }
}

impl From<&PaginationParams> for PageRequest {
    fn from(p: &PaginationParams) -> Self {
        PageRequest::new(p.page, p.limit)
    }
}

/// Page of items with metadata
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct PaginatedResponse<T> {
    pub items: Vec<T>,
    /// Total number of items across all pages
    pub total: u64,
    pub page: u32,
    pub limit: u32,
    pub total_pages: u32,
}

impl<T> PaginatedResponse<T> {
    pub fn from_page<D>(page: PaginatedResult<D>, f: impl FnMut(D) -> T) -> Self {
        Self {
            items: page.items.into_iter().map(f).collect(),
            total: page.total,
            page: page.page,
            limit: page.limit,
            total_pages: page.total_pages,
        }
    }
}

/// Provenance fields, present only when the record was anchored
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct AnchorDto {
    pub blockchain_tx_hash: String,
    pub block_number: u64,
    pub endorsing_orgs: Vec<String>,
}

impl From<LedgerAnchor> for AnchorDto {
    fn from(a: LedgerAnchor) -> Self {
        Self {
            blockchain_tx_hash: a.blockchain_tx_hash,
            block_number: a.block_number,
            endorsing_orgs: a.endorsing_orgs,
        }
    }
}

// ── Tests ──────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_kinds_map_to_statuses() {
        let cases = [
            (DomainError::InvalidAmount("x".into()), StatusCode::BAD_REQUEST),
            (
                DomainError::InsufficientFunds {
                    available: 50,
                    required: 60,
                },
                StatusCode::PAYMENT_REQUIRED,
            ),
            (
                DomainError::SpotUnavailable {
                    spot_id: "S1".into(),
                    status: "reserved".into(),
                },
                StatusCode::CONFLICT,
            ),
            (DomainError::not_found("Reservation", "r1"), StatusCode::NOT_FOUND),
            (DomainError::Forbidden("no".into()), StatusCode::FORBIDDEN),
            (DomainError::Storage("db".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, expected) in cases {
            let (status, _) = domain_error::<()>(err);
            assert_eq!(status, expected);
        }
    }

    #[test]
    fn error_body_carries_code() {
        let (_, Json(body)) = domain_error::<()>(DomainError::InsufficientFunds {
            available: 50,
            required: 60,
        });
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["success"], false);
        assert_eq!(json["code"], "insufficient_funds");
    }

    #[test]
    fn pagination_is_clamped() {
        let p = PaginationParams { page: 0, limit: 500 };
        let req = PageRequest::from(&p);
        assert_eq!(req.page, 1);
        assert_eq!(req.limit, 100);
    }
}
