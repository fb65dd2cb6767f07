//! Payment HTTP handlers

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::{Extension, Json};

use super::dto::*;
use crate::application::WalletLedger;
use crate::interfaces::http::common::{
    domain_error, ok, ApiError, ApiResponse, ApiResult, PaginatedResponse, PaginationParams,
    ValidatedJson,
};
use crate::interfaces::http::middleware::AuthenticatedUser;
use crate::shared::money::cents_from_decimal;
use crate::shared::PageRequest;

#[derive(Clone)]
pub struct PaymentAppState {
    pub ledger: Arc<WalletLedger>,
}

#[utoipa::path(
    post,
    path = "/api/v1/payments",
    tag = "Payments",
    security(("bearer_auth" = [])),
    request_body = CreatePaymentRequest,
    responses(
        (status = 201, description = "Wallet debited", body = ApiResponse<PaymentDto>),
        (status = 400, description = "Invalid amount or payment type"),
        (status = 402, description = "Insufficient funds")
    )
)]
pub async fn create_payment(
    State(state): State<PaymentAppState>,
    Extension(user): Extension<AuthenticatedUser>,
    ValidatedJson(request): ValidatedJson<CreatePaymentRequest>,
) -> Result<(StatusCode, Json<ApiResponse<PaymentDto>>), ApiError<PaymentDto>> {
    let request = request.into_request().map_err(domain_error)?;
    let payment = state
        .ledger
        .process_payment(&user.user_id, request)
        .await
        .map_err(domain_error)?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(payment.into()))))
}

#[utoipa::path(
    post,
    path = "/api/v1/payments/{id}/refund",
    tag = "Payments",
    security(("bearer_auth" = [])),
    params(("id" = String, Path, description = "Payment ID")),
    request_body = RefundRequest,
    responses(
        (status = 201, description = "Refund issued", body = ApiResponse<PaymentDto>),
        (status = 400, description = "Amount exceeds what is refundable"),
        (status = 403, description = "Admin role required"),
        (status = 409, description = "Payment is not refundable")
    )
)]
pub async fn refund_payment(
    State(state): State<PaymentAppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(id): Path<String>,
    ValidatedJson(request): ValidatedJson<RefundRequest>,
) -> Result<(StatusCode, Json<ApiResponse<PaymentDto>>), ApiError<PaymentDto>> {
    user.caller().ensure_admin().map_err(domain_error)?;
    let amount = request
        .amount
        .map(cents_from_decimal)
        .transpose()
        .map_err(domain_error)?;
    let refund = state
        .ledger
        .refund_payment(&id, amount, request.reason)
        .await
        .map_err(domain_error)?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(refund.into()))))
}

#[utoipa::path(
    get,
    path = "/api/v1/payments",
    tag = "Payments",
    security(("bearer_auth" = [])),
    params(PaginationParams),
    responses(
        (status = 200, description = "Caller's payments, newest first", body = ApiResponse<PaginatedResponse<PaymentDto>>)
    )
)]
pub async fn list_payments(
    State(state): State<PaymentAppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Query(params): Query<PaginationParams>,
) -> ApiResult<PaginatedResponse<PaymentDto>> {
    let payments = state
        .ledger
        .payments_for_user(&user.user_id, PageRequest::from(&params))
        .await
        .map_err(domain_error)?;
    ok(PaginatedResponse::from_page(payments, PaymentDto::from))
}

#[utoipa::path(
    get,
    path = "/api/v1/payments/{id}",
    tag = "Payments",
    security(("bearer_auth" = [])),
    params(("id" = String, Path, description = "Payment ID")),
    responses(
        (status = 200, description = "Payment details", body = ApiResponse<PaymentDto>),
        (status = 404, description = "Payment not found")
    )
)]
pub async fn get_payment(
    State(state): State<PaymentAppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(id): Path<String>,
) -> ApiResult<PaymentDto> {
    let payment = state
        .ledger
        .payment(&user.caller(), &id)
        .await
        .map_err(domain_error)?;
    ok(payment.into())
}

#[utoipa::path(
    get,
    path = "/api/v1/payments/{id}/receipt",
    tag = "Payments",
    security(("bearer_auth" = [])),
    params(("id" = String, Path, description = "Payment ID")),
    responses(
        (status = 200, description = "Receipt with ledger entry and refunds", body = ApiResponse<ReceiptDto>),
        (status = 404, description = "Payment not found")
    )
)]
pub async fn payment_receipt(
    State(state): State<PaymentAppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(id): Path<String>,
) -> ApiResult<ReceiptDto> {
    let receipt = state
        .ledger
        .receipt(&user.caller(), &id)
        .await
        .map_err(domain_error)?;
    ok(receipt.into())
}
