//! Wallet HTTP handlers

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::{Extension, Json};

use super::dto::*;
use crate::application::WalletLedger;
use crate::interfaces::http::common::{
    domain_error, ok, ApiError, ApiResponse, ApiResult, PaginatedResponse, ValidatedJson,
};
use crate::interfaces::http::middleware::AuthenticatedUser;
use crate::shared::money::cents_from_decimal;
use crate::shared::PageRequest;

#[derive(Clone)]
pub struct WalletAppState {
    pub ledger: Arc<WalletLedger>,
}

#[utoipa::path(
    get,
    path = "/api/v1/wallet",
    tag = "Wallet",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Caller's wallet", body = ApiResponse<WalletDto>)
    )
)]
pub async fn get_wallet(
    State(state): State<WalletAppState>,
    Extension(user): Extension<AuthenticatedUser>,
) -> ApiResult<WalletDto> {
    let wallet = state
        .ledger
        .wallet_for_user(&user.user_id)
        .await
        .map_err(domain_error)?;
    ok(wallet.into())
}

#[utoipa::path(
    post,
    path = "/api/v1/wallet/funds",
    tag = "Wallet",
    security(("bearer_auth" = [])),
    request_body = AddFundsRequest,
    responses(
        (status = 201, description = "Deposit recorded", body = ApiResponse<TransactionDto>),
        (status = 400, description = "Amount not positive or above the deposit limit")
    )
)]
pub async fn add_funds(
    State(state): State<WalletAppState>,
    Extension(user): Extension<AuthenticatedUser>,
    ValidatedJson(request): ValidatedJson<AddFundsRequest>,
) -> Result<(StatusCode, Json<ApiResponse<TransactionDto>>), ApiError<TransactionDto>> {
    let amount = cents_from_decimal(request.amount).map_err(domain_error)?;
    let tx = state
        .ledger
        .add_funds(&user.user_id, amount, request.description)
        .await
        .map_err(domain_error)?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(tx.into()))))
}

#[utoipa::path(
    get,
    path = "/api/v1/wallet/transactions",
    tag = "Wallet",
    security(("bearer_auth" = [])),
    params(TransactionListParams),
    responses(
        (status = 200, description = "Ledger entries, newest first", body = ApiResponse<PaginatedResponse<TransactionDto>>)
    )
)]
pub async fn list_transactions(
    State(state): State<WalletAppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Query(params): Query<TransactionListParams>,
) -> ApiResult<PaginatedResponse<TransactionDto>> {
    let filter = params.filter().map_err(domain_error)?;
    let page = PageRequest::new(params.page.unwrap_or(1), params.limit.unwrap_or(50));
    let txs = state
        .ledger
        .transactions(&user.user_id, &filter, page)
        .await
        .map_err(domain_error)?;
    ok(PaginatedResponse::from_page(txs, TransactionDto::from))
}

#[utoipa::path(
    get,
    path = "/api/v1/wallet/transactions/{id}",
    tag = "Wallet",
    security(("bearer_auth" = [])),
    params(("id" = String, Path, description = "Transaction ID")),
    responses(
        (status = 200, description = "Ledger entry", body = ApiResponse<TransactionDto>),
        (status = 404, description = "Transaction not found")
    )
)]
pub async fn get_transaction(
    State(state): State<WalletAppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(id): Path<String>,
) -> ApiResult<TransactionDto> {
    let tx = state
        .ledger
        .transaction(&user.caller(), &id)
        .await
        .map_err(domain_error)?;
    ok(tx.into())
}

#[utoipa::path(
    get,
    path = "/api/v1/wallet/spending",
    tag = "Wallet",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Spending and refund totals", body = ApiResponse<SpendingDto>)
    )
)]
pub async fn spending_summary(
    State(state): State<WalletAppState>,
    Extension(user): Extension<AuthenticatedUser>,
) -> ApiResult<SpendingDto> {
    let summary = state
        .ledger
        .spending(&user.user_id)
        .await
        .map_err(domain_error)?;
    ok(SpendingDto::new(summary, state.ledger.currency()))
}

#[utoipa::path(
    get,
    path = "/api/v1/wallet/reconcile",
    tag = "Wallet",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Balance recomputed from the ledger", body = ApiResponse<ReconciliationDto>)
    )
)]
pub async fn reconcile_wallet(
    State(state): State<WalletAppState>,
    Extension(user): Extension<AuthenticatedUser>,
) -> ApiResult<ReconciliationDto> {
    let report = state
        .ledger
        .reconcile(&user.user_id)
        .await
        .map_err(domain_error)?;
    ok(report.into())
}
