//! Reservation HTTP handlers

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::{Extension, Json};

use super::dto::*;
use crate::application::ReservationService;
use crate::domain::ReservationStatus;
use crate::interfaces::http::common::{
    domain_error, ok, ApiError, ApiResponse, ApiResult, PaginatedResponse, PaginationParams,
    ValidatedJson,
};
use crate::interfaces::http::middleware::AuthenticatedUser;
use crate::shared::PageRequest;

#[derive(Clone)]
pub struct ReservationAppState {
    pub reservations: Arc<ReservationService>,
}

#[utoipa::path(
    post,
    path = "/api/v1/parking/reservations",
    tag = "Reservations",
    security(("bearer_auth" = [])),
    request_body = CreateReservationRequest,
    responses(
        (status = 201, description = "Reservation confirmed and paid", body = ApiResponse<ReservationDto>),
        (status = 400, description = "Invalid time range"),
        (status = 402, description = "Insufficient funds"),
        (status = 409, description = "Spot is not available")
    )
)]
pub async fn create_reservation(
    State(state): State<ReservationAppState>,
    Extension(user): Extension<AuthenticatedUser>,
    ValidatedJson(request): ValidatedJson<CreateReservationRequest>,
) -> Result<(StatusCode, Json<ApiResponse<ReservationDto>>), ApiError<ReservationDto>> {
    let reservation = state
        .reservations
        .create(
            &user.caller(),
            &request.spot_id,
            request.start_time,
            request.end_time,
        )
        .await
        .map_err(domain_error)?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(reservation.into())),
    ))
}

#[utoipa::path(
    post,
    path = "/api/v1/parking/reservations/{id}/check-in",
    tag = "Reservations",
    security(("bearer_auth" = [])),
    params(("id" = String, Path, description = "Reservation ID")),
    request_body(content = CheckInRequest, description = "Optional QR credential"),
    responses(
        (status = 200, description = "Checked in", body = ApiResponse<ReservationDto>),
        (status = 400, description = "Outside the check-in window"),
        (status = 409, description = "Reservation is not confirmed")
    )
)]
pub async fn check_in(
    State(state): State<ReservationAppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(id): Path<String>,
    body: Option<Json<CheckInRequest>>,
) -> ApiResult<ReservationDto> {
    let qr_code = body.and_then(|Json(b)| b.qr_code);
    let reservation = state
        .reservations
        .check_in(&user.caller(), &id, qr_code.as_deref())
        .await
        .map_err(domain_error)?;
    ok(reservation.into())
}

#[utoipa::path(
    post,
    path = "/api/v1/parking/reservations/{id}/check-out",
    tag = "Reservations",
    security(("bearer_auth" = [])),
    params(("id" = String, Path, description = "Reservation ID")),
    responses(
        (status = 200, description = "Checked out and settled", body = ApiResponse<ReservationDto>),
        (status = 409, description = "Reservation is not active")
    )
)]
pub async fn check_out(
    State(state): State<ReservationAppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(id): Path<String>,
) -> ApiResult<ReservationDto> {
    let reservation = state
        .reservations
        .check_out(&user.caller(), &id)
        .await
        .map_err(domain_error)?;
    ok(reservation.into())
}

#[utoipa::path(
    post,
    path = "/api/v1/parking/reservations/{id}/extend",
    tag = "Reservations",
    security(("bearer_auth" = [])),
    params(("id" = String, Path, description = "Reservation ID")),
    request_body = ExtendReservationRequest,
    responses(
        (status = 200, description = "Extended, difference charged", body = ApiResponse<ReservationDto>),
        (status = 400, description = "New end time does not extend the booking"),
        (status = 402, description = "Insufficient funds"),
        (status = 409, description = "Overlaps another booking or wrong status")
    )
)]
pub async fn extend_reservation(
    State(state): State<ReservationAppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(id): Path<String>,
    ValidatedJson(request): ValidatedJson<ExtendReservationRequest>,
) -> ApiResult<ReservationDto> {
    let reservation = state
        .reservations
        .extend(&user.caller(), &id, request.new_end_time)
        .await
        .map_err(domain_error)?;
    ok(reservation.into())
}

#[utoipa::path(
    post,
    path = "/api/v1/parking/reservations/{id}/cancel",
    tag = "Reservations",
    security(("bearer_auth" = [])),
    params(("id" = String, Path, description = "Reservation ID")),
    responses(
        (status = 200, description = "Cancelled, refund applied per policy", body = ApiResponse<ReservationDto>),
        (status = 409, description = "Reservation already finished")
    )
)]
pub async fn cancel_reservation(
    State(state): State<ReservationAppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(id): Path<String>,
) -> ApiResult<ReservationDto> {
    let reservation = state
        .reservations
        .cancel(&user.caller(), &id)
        .await
        .map_err(domain_error)?;
    ok(reservation.into())
}

#[utoipa::path(
    get,
    path = "/api/v1/parking/reservations",
    tag = "Reservations",
    security(("bearer_auth" = [])),
    params(ReservationListParams),
    responses(
        (status = 200, description = "Caller's reservations, newest first", body = ApiResponse<PaginatedResponse<ReservationDto>>)
    )
)]
pub async fn list_reservations(
    State(state): State<ReservationAppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Query(params): Query<ReservationListParams>,
) -> ApiResult<PaginatedResponse<ReservationDto>> {
    let status: Option<ReservationStatus> = params
        .status
        .as_deref()
        .map(str::parse)
        .transpose()
        .map_err(domain_error)?;
    let page = PageRequest::new(params.page.unwrap_or(1), params.limit.unwrap_or(50));
    let reservations = state
        .reservations
        .list_for_caller(&user.caller(), status, page)
        .await
        .map_err(domain_error)?;
    ok(PaginatedResponse::from_page(reservations, ReservationDto::from))
}

#[utoipa::path(
    get,
    path = "/api/v1/parking/reservations/active",
    tag = "Reservations",
    security(("bearer_auth" = [])),
    params(PaginationParams),
    responses(
        (status = 200, description = "Pending, confirmed and active reservations", body = ApiResponse<PaginatedResponse<ReservationDto>>)
    )
)]
pub async fn active_reservations(
    State(state): State<ReservationAppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Query(params): Query<PaginationParams>,
) -> ApiResult<PaginatedResponse<ReservationDto>> {
    let reservations = state
        .reservations
        .active(&user.caller(), PageRequest::from(&params))
        .await
        .map_err(domain_error)?;
    ok(PaginatedResponse::from_page(reservations, ReservationDto::from))
}

#[utoipa::path(
    get,
    path = "/api/v1/parking/reservations/history",
    tag = "Reservations",
    security(("bearer_auth" = [])),
    params(PaginationParams),
    responses(
        (status = 200, description = "Completed and cancelled reservations", body = ApiResponse<PaginatedResponse<ReservationDto>>)
    )
)]
pub async fn reservation_history(
    State(state): State<ReservationAppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Query(params): Query<PaginationParams>,
) -> ApiResult<PaginatedResponse<ReservationDto>> {
    let reservations = state
        .reservations
        .history(&user.caller(), PageRequest::from(&params))
        .await
        .map_err(domain_error)?;
    ok(PaginatedResponse::from_page(reservations, ReservationDto::from))
}

#[utoipa::path(
    get,
    path = "/api/v1/parking/reservations/{id}",
    tag = "Reservations",
    security(("bearer_auth" = [])),
    params(("id" = String, Path, description = "Reservation ID")),
    responses(
        (status = 200, description = "Reservation details", body = ApiResponse<ReservationDto>),
        (status = 403, description = "Reservation belongs to another user"),
        (status = 404, description = "Reservation not found")
    )
)]
pub async fn get_reservation(
    State(state): State<ReservationAppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(id): Path<String>,
) -> ApiResult<ReservationDto> {
    let reservation = state
        .reservations
        .get(&user.caller(), &id)
        .await
        .map_err(domain_error)?;
    ok(reservation.into())
}
