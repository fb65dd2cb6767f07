//! Charging station HTTP handlers

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::{Extension, Json};

use super::dto::*;
use crate::application::{CatalogService, ChargingService};
use crate::interfaces::http::common::{
    domain_error, ok, ApiError, ApiResponse, ApiResult, EmptyData, PaginatedResponse,
    PaginationParams, ValidatedJson,
};
use crate::interfaces::http::middleware::AuthenticatedUser;
use crate::interfaces::http::modules::sessions::SessionDto;
use crate::interfaces::http::modules::spots::SetStatusRequest;
use crate::shared::PageRequest;

#[derive(Clone)]
pub struct StationAppState {
    pub catalog: Arc<CatalogService>,
    pub charging: Arc<ChargingService>,
}

#[utoipa::path(
    get,
    path = "/api/v1/charging/stations",
    tag = "Charging Stations",
    security(("bearer_auth" = [])),
    params(StationSearchParams),
    responses(
        (status = 200, description = "Matching stations", body = ApiResponse<PaginatedResponse<StationDto>>)
    )
)]
pub async fn list_stations(
    State(state): State<StationAppState>,
    Query(params): Query<StationSearchParams>,
) -> ApiResult<PaginatedResponse<StationDto>> {
    let filter = params.filter().map_err(domain_error)?;
    let page = PageRequest::from(&params.pagination());
    let stations = state
        .catalog
        .search_stations(&filter, page)
        .await
        .map_err(domain_error)?;
    ok(PaginatedResponse::from_page(stations, StationDto::from))
}

#[utoipa::path(
    get,
    path = "/api/v1/charging/stations/{id}",
    tag = "Charging Stations",
    security(("bearer_auth" = [])),
    params(("id" = String, Path, description = "Station ID")),
    responses(
        (status = 200, description = "Station details", body = ApiResponse<StationDto>),
        (status = 404, description = "Station not found")
    )
)]
pub async fn get_station(
    State(state): State<StationAppState>,
    Path(id): Path<String>,
) -> ApiResult<StationDto> {
    let station = state.catalog.get_station(&id).await.map_err(domain_error)?;
    ok(station.into())
}

#[utoipa::path(
    post,
    path = "/api/v1/charging/stations",
    tag = "Charging Stations",
    security(("bearer_auth" = [])),
    request_body = CreateStationRequest,
    responses(
        (status = 201, description = "Station created", body = ApiResponse<StationDto>),
        (status = 403, description = "Admin role required")
    )
)]
pub async fn create_station(
    State(state): State<StationAppState>,
    Extension(user): Extension<AuthenticatedUser>,
    ValidatedJson(request): ValidatedJson<CreateStationRequest>,
) -> Result<(StatusCode, Json<ApiResponse<StationDto>>), ApiError<StationDto>> {
    let new_station = request.into_new_station().map_err(domain_error)?;
    let station = state
        .catalog
        .create_station(&user.caller(), new_station)
        .await
        .map_err(domain_error)?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(station.into()))))
}

#[utoipa::path(
    put,
    path = "/api/v1/charging/stations/{id}",
    tag = "Charging Stations",
    security(("bearer_auth" = [])),
    params(("id" = String, Path, description = "Station ID")),
    request_body = UpdateStationRequest,
    responses(
        (status = 200, description = "Station updated", body = ApiResponse<StationDto>),
        (status = 404, description = "Station not found")
    )
)]
pub async fn update_station(
    State(state): State<StationAppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(id): Path<String>,
    ValidatedJson(request): ValidatedJson<UpdateStationRequest>,
) -> ApiResult<StationDto> {
    let changes = request.into_changes().map_err(domain_error)?;
    let station = state
        .catalog
        .update_station(&user.caller(), &id, changes)
        .await
        .map_err(domain_error)?;
    ok(station.into())
}

#[utoipa::path(
    put,
    path = "/api/v1/charging/stations/{id}/status",
    tag = "Charging Stations",
    security(("bearer_auth" = [])),
    params(("id" = String, Path, description = "Station ID")),
    request_body = SetStatusRequest,
    responses(
        (status = 200, description = "Status changed", body = ApiResponse<StationDto>),
        (status = 409, description = "Station is in use")
    )
)]
pub async fn set_station_status(
    State(state): State<StationAppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(id): Path<String>,
    ValidatedJson(request): ValidatedJson<SetStatusRequest>,
) -> ApiResult<StationDto> {
    let status = request.status.parse().map_err(domain_error)?;
    let station = state
        .catalog
        .set_station_status(&user.caller(), &id, status)
        .await
        .map_err(domain_error)?;
    ok(station.into())
}

#[utoipa::path(
    delete,
    path = "/api/v1/charging/stations/{id}",
    tag = "Charging Stations",
    security(("bearer_auth" = [])),
    params(("id" = String, Path, description = "Station ID")),
    responses(
        (status = 200, description = "Station deleted", body = ApiResponse<EmptyData>),
        (status = 409, description = "Station is in use")
    )
)]
pub async fn delete_station(
    State(state): State<StationAppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(id): Path<String>,
) -> ApiResult<EmptyData> {
    state
        .catalog
        .delete_station(&user.caller(), &id)
        .await
        .map_err(domain_error)?;
    ok(EmptyData {})
}

#[utoipa::path(
    get,
    path = "/api/v1/charging/stations/{id}/sessions",
    tag = "Charging Stations",
    security(("bearer_auth" = [])),
    params(("id" = String, Path, description = "Station ID"), PaginationParams),
    responses(
        (status = 200, description = "Sessions on the station", body = ApiResponse<PaginatedResponse<SessionDto>>),
        (status = 403, description = "Admin role required")
    )
)]
pub async fn station_sessions(
    State(state): State<StationAppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(id): Path<String>,
    Query(params): Query<PaginationParams>,
) -> ApiResult<PaginatedResponse<SessionDto>> {
    let page = state
        .charging
        .for_station(&user.caller(), &id, PageRequest::from(&params))
        .await
        .map_err(domain_error)?;
    ok(PaginatedResponse::from_page(page, SessionDto::from))
}
