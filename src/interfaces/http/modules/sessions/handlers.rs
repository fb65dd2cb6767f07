//! Charging session HTTP handlers

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::{Extension, Json};

use super::dto::*;
use crate::application::ChargingService;
use crate::domain::SessionStatus;
use crate::interfaces::http::common::{
    domain_error, ok, ApiError, ApiResponse, ApiResult, PaginatedResponse, PaginationParams,
    ValidatedJson,
};
use crate::interfaces::http::middleware::AuthenticatedUser;
use crate::shared::money::kwh_from_wh;
use crate::shared::PageRequest;

#[derive(Clone)]
pub struct SessionAppState {
    pub charging: Arc<ChargingService>,
}

#[utoipa::path(
    post,
    path = "/api/v1/charging/sessions",
    tag = "Charging Sessions",
    security(("bearer_auth" = [])),
    request_body = StartSessionRequest,
    responses(
        (status = 201, description = "Session started", body = ApiResponse<SessionDto>),
        (status = 404, description = "Station not found"),
        (status = 409, description = "Station is not available")
    )
)]
pub async fn start_session(
    State(state): State<SessionAppState>,
    Extension(user): Extension<AuthenticatedUser>,
    ValidatedJson(request): ValidatedJson<StartSessionRequest>,
) -> Result<(StatusCode, Json<ApiResponse<SessionDto>>), ApiError<SessionDto>> {
    let session = state
        .charging
        .start(&user.caller(), &request.station_id)
        .await
        .map_err(domain_error)?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(session.into()))))
}

#[utoipa::path(
    put,
    path = "/api/v1/charging/sessions/{id}/progress",
    tag = "Charging Sessions",
    security(("bearer_auth" = [])),
    params(("id" = String, Path, description = "Session ID")),
    request_body = ProgressRequest,
    responses(
        (status = 200, description = "Progress recorded", body = ApiResponse<SessionDto>),
        (status = 400, description = "Energy went backwards"),
        (status = 409, description = "Session already ended")
    )
)]
pub async fn update_progress(
    State(state): State<SessionAppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(id): Path<String>,
    ValidatedJson(request): ValidatedJson<ProgressRequest>,
) -> ApiResult<SessionDto> {
    let (energy_wh, current_cost) = request.to_units().map_err(domain_error)?;
    let session = state
        .charging
        .update_progress(&user.caller(), &id, energy_wh, current_cost)
        .await
        .map_err(domain_error)?;
    ok(session.into())
}

#[utoipa::path(
    post,
    path = "/api/v1/charging/sessions/{id}/stop",
    tag = "Charging Sessions",
    security(("bearer_auth" = [])),
    params(("id" = String, Path, description = "Session ID")),
    responses(
        (status = 200, description = "Session completed and billed", body = ApiResponse<SessionDto>),
        (status = 402, description = "Insufficient funds"),
        (status = 409, description = "Session already ended")
    )
)]
pub async fn stop_session(
    State(state): State<SessionAppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(id): Path<String>,
) -> ApiResult<SessionDto> {
    let session = state
        .charging
        .stop(&user.caller(), &id)
        .await
        .map_err(domain_error)?;
    ok(session.into())
}

#[utoipa::path(
    post,
    path = "/api/v1/charging/sessions/{id}/cancel",
    tag = "Charging Sessions",
    security(("bearer_auth" = [])),
    params(("id" = String, Path, description = "Session ID")),
    responses(
        (status = 200, description = "Session cancelled", body = ApiResponse<SessionDto>),
        (status = 409, description = "Session already ended")
    )
)]
pub async fn cancel_session(
    State(state): State<SessionAppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(id): Path<String>,
) -> ApiResult<SessionDto> {
    let session = state
        .charging
        .cancel(&user.caller(), &id)
        .await
        .map_err(domain_error)?;
    ok(session.into())
}

#[utoipa::path(
    get,
    path = "/api/v1/charging/sessions",
    tag = "Charging Sessions",
    security(("bearer_auth" = [])),
    params(SessionListParams),
    responses(
        (status = 200, description = "Caller's sessions", body = ApiResponse<PaginatedResponse<SessionDto>>)
    )
)]
pub async fn list_sessions(
    State(state): State<SessionAppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Query(params): Query<SessionListParams>,
) -> ApiResult<PaginatedResponse<SessionDto>> {
    let status: Option<SessionStatus> = params
        .status
        .as_deref()
        .map(str::parse)
        .transpose()
        .map_err(domain_error)?;
    let page = PageRequest::new(params.page.unwrap_or(1), params.limit.unwrap_or(50));
    let sessions = state
        .charging
        .list_for_caller(&user.caller(), status, page)
        .await
        .map_err(domain_error)?;
    ok(PaginatedResponse::from_page(sessions, SessionDto::from))
}

#[utoipa::path(
    get,
    path = "/api/v1/charging/sessions/active",
    tag = "Charging Sessions",
    security(("bearer_auth" = [])),
    params(PaginationParams),
    responses(
        (status = 200, description = "Sessions still starting or charging", body = ApiResponse<PaginatedResponse<SessionDto>>)
    )
)]
pub async fn active_sessions(
    State(state): State<SessionAppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Query(params): Query<PaginationParams>,
) -> ApiResult<PaginatedResponse<SessionDto>> {
    let sessions = state
        .charging
        .active(&user.caller(), PageRequest::from(&params))
        .await
        .map_err(domain_error)?;
    ok(PaginatedResponse::from_page(sessions, SessionDto::from))
}

#[utoipa::path(
    get,
    path = "/api/v1/charging/sessions/history",
    tag = "Charging Sessions",
    security(("bearer_auth" = [])),
    params(PaginationParams),
    responses(
        (status = 200, description = "Completed and cancelled sessions", body = ApiResponse<PaginatedResponse<SessionDto>>)
    )
)]
pub async fn session_history(
    State(state): State<SessionAppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Query(params): Query<PaginationParams>,
) -> ApiResult<PaginatedResponse<SessionDto>> {
    let sessions = state
        .charging
        .history(&user.caller(), PageRequest::from(&params))
        .await
        .map_err(domain_error)?;
    ok(PaginatedResponse::from_page(sessions, SessionDto::from))
}

#[utoipa::path(
    get,
    path = "/api/v1/charging/sessions/{id}",
    tag = "Charging Sessions",
    security(("bearer_auth" = [])),
    params(("id" = String, Path, description = "Session ID")),
    responses(
        (status = 200, description = "Session details", body = ApiResponse<SessionDto>),
        (status = 403, description = "Session belongs to another user"),
        (status = 404, description = "Session not found")
    )
)]
pub async fn get_session(
    State(state): State<SessionAppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(id): Path<String>,
) -> ApiResult<SessionDto> {
    let session = state
        .charging
        .get(&user.caller(), &id)
        .await
        .map_err(domain_error)?;
    ok(session.into())
}

#[utoipa::path(
    get,
    path = "/api/v1/charging/stats/energy",
    tag = "Charging Sessions",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Total energy over completed sessions", body = ApiResponse<EnergyStatsDto>)
    )
)]
pub async fn energy_stats(
    State(state): State<SessionAppState>,
    Extension(user): Extension<AuthenticatedUser>,
) -> ApiResult<EnergyStatsDto> {
    let wh = state
        .charging
        .total_energy(&user.caller())
        .await
        .map_err(domain_error)?;
    ok(EnergyStatsDto {
        total_energy_kwh: kwh_from_wh(wh),
    })
}
