//! Parking spot HTTP handlers

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::{Extension, Json};

use super::dto::*;
use crate::application::{CatalogService, ReservationService};
use crate::interfaces::http::common::{
    domain_error, ok, ApiError, ApiResponse, ApiResult, EmptyData, PaginatedResponse,
    PaginationParams, ValidatedJson,
};
use crate::interfaces::http::middleware::AuthenticatedUser;
use crate::interfaces::http::modules::reservations::ReservationDto;
use crate::shared::PageRequest;

#[derive(Clone)]
pub struct SpotAppState {
    pub catalog: Arc<CatalogService>,
    pub reservations: Arc<ReservationService>,
}

#[utoipa::path(
    get,
    path = "/api/v1/parking/spots",
    tag = "Parking Spots",
    security(("bearer_auth" = [])),
    params(SpotSearchParams),
    responses(
        (status = 200, description = "Matching spots", body = ApiResponse<PaginatedResponse<SpotDto>>),
        (status = 400, description = "Invalid filter")
    )
)]
pub async fn list_spots(
    State(state): State<SpotAppState>,
    Query(params): Query<SpotSearchParams>,
) -> ApiResult<PaginatedResponse<SpotDto>> {
    let filter = params.filter().map_err(domain_error)?;
    let page = PageRequest::from(&params.pagination());
    let spots = state
        .catalog
        .search_spots(&filter, page)
        .await
        .map_err(domain_error)?;
    ok(PaginatedResponse::from_page(spots, SpotDto::from))
}

#[utoipa::path(
    get,
    path = "/api/v1/parking/spots/{id}",
    tag = "Parking Spots",
    security(("bearer_auth" = [])),
    params(("id" = String, Path, description = "Spot ID")),
    responses(
        (status = 200, description = "Spot details", body = ApiResponse<SpotDto>),
        (status = 404, description = "Spot not found")
    )
)]
pub async fn get_spot(
    State(state): State<SpotAppState>,
    Path(id): Path<String>,
) -> ApiResult<SpotDto> {
    let spot = state.catalog.get_spot(&id).await.map_err(domain_error)?;
    ok(spot.into())
}

#[utoipa::path(
    post,
    path = "/api/v1/parking/spots",
    tag = "Parking Spots",
    security(("bearer_auth" = [])),
    request_body = CreateSpotRequest,
    responses(
        (status = 201, description = "Spot created", body = ApiResponse<SpotDto>),
        (status = 403, description = "Admin role required")
    )
)]
pub async fn create_spot(
    State(state): State<SpotAppState>,
    Extension(user): Extension<AuthenticatedUser>,
    ValidatedJson(request): ValidatedJson<CreateSpotRequest>,
) -> Result<(StatusCode, Json<ApiResponse<SpotDto>>), ApiError<SpotDto>> {
    let new_spot = request.into_new_spot().map_err(domain_error)?;
    let spot = state
        .catalog
        .create_spot(&user.caller(), new_spot)
        .await
        .map_err(domain_error)?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(spot.into()))))
}

#[utoipa::path(
    put,
    path = "/api/v1/parking/spots/{id}",
    tag = "Parking Spots",
    security(("bearer_auth" = [])),
    params(("id" = String, Path, description = "Spot ID")),
    request_body = UpdateSpotRequest,
    responses(
        (status = 200, description = "Spot updated", body = ApiResponse<SpotDto>),
        (status = 403, description = "Admin role required"),
        (status = 404, description = "Spot not found")
    )
)]
pub async fn update_spot(
    State(state): State<SpotAppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(id): Path<String>,
    ValidatedJson(request): ValidatedJson<UpdateSpotRequest>,
) -> ApiResult<SpotDto> {
    let changes = request.into_changes().map_err(domain_error)?;
    let spot = state
        .catalog
        .update_spot(&user.caller(), &id, changes)
        .await
        .map_err(domain_error)?;
    ok(spot.into())
}

#[utoipa::path(
    put,
    path = "/api/v1/parking/spots/{id}/status",
    tag = "Parking Spots",
    security(("bearer_auth" = [])),
    params(("id" = String, Path, description = "Spot ID")),
    request_body = SetStatusRequest,
    responses(
        (status = 200, description = "Status changed", body = ApiResponse<SpotDto>),
        (status = 400, description = "Status not settable by operators"),
        (status = 409, description = "Spot is held by a reservation")
    )
)]
pub async fn set_spot_status(
    State(state): State<SpotAppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(id): Path<String>,
    ValidatedJson(request): ValidatedJson<SetStatusRequest>,
) -> ApiResult<SpotDto> {
    let status = request.status.parse().map_err(domain_error)?;
    let spot = state
        .catalog
        .set_spot_status(&user.caller(), &id, status)
        .await
        .map_err(domain_error)?;
    ok(spot.into())
}

#[utoipa::path(
    delete,
    path = "/api/v1/parking/spots/{id}",
    tag = "Parking Spots",
    security(("bearer_auth" = [])),
    params(("id" = String, Path, description = "Spot ID")),
    responses(
        (status = 200, description = "Spot deleted", body = ApiResponse<EmptyData>),
        (status = 409, description = "Spot has live reservations")
    )
)]
pub async fn delete_spot(
    State(state): State<SpotAppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(id): Path<String>,
) -> ApiResult<EmptyData> {
    state
        .catalog
        .delete_spot(&user.caller(), &id)
        .await
        .map_err(domain_error)?;
    ok(EmptyData {})
}

#[utoipa::path(
    get,
    path = "/api/v1/parking/spots/{id}/bookings",
    tag = "Parking Spots",
    security(("bearer_auth" = [])),
    params(("id" = String, Path, description = "Spot ID"), PaginationParams),
    responses(
        (status = 200, description = "Reservations on the spot", body = ApiResponse<PaginatedResponse<ReservationDto>>),
        (status = 403, description = "Admin role required")
    )
)]
pub async fn spot_bookings(
    State(state): State<SpotAppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(id): Path<String>,
    Query(params): Query<PaginationParams>,
) -> ApiResult<PaginatedResponse<ReservationDto>> {
    let page = state
        .reservations
        .for_spot(&user.caller(), &id, PageRequest::from(&params))
        .await
        .map_err(domain_error)?;
    ok(PaginatedResponse::from_page(page, ReservationDto::from))
}
