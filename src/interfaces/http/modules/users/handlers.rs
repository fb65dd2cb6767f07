//! User management HTTP handlers

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::Extension;

use super::dto::{ActivityDto, UpdateUserRequest};
use crate::application::IdentityService;
use crate::interfaces::http::common::{
    domain_error, ok, ApiResponse, ApiResult, PaginatedResponse, PaginationParams, ValidatedJson,
};
use crate::interfaces::http::middleware::AuthenticatedUser;
use crate::interfaces::http::modules::auth::UserInfo;
use crate::shared::PageRequest;

#[derive(Clone)]
pub struct UserAppState {
    pub identity: Arc<IdentityService>,
}

#[utoipa::path(
    get,
    path = "/api/v1/users",
    tag = "Users",
    security(("bearer_auth" = [])),
    params(PaginationParams),
    responses(
        (status = 200, description = "All users", body = ApiResponse<PaginatedResponse<UserInfo>>),
        (status = 403, description = "Admin role required")
    )
)]
pub async fn list_users(
    State(state): State<UserAppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Query(params): Query<PaginationParams>,
) -> ApiResult<PaginatedResponse<UserInfo>> {
    let users = state
        .identity
        .list_users(&user.caller(), PageRequest::from(&params))
        .await
        .map_err(domain_error)?;
    ok(PaginatedResponse::from_page(users, UserInfo::from))
}

#[utoipa::path(
    get,
    path = "/api/v1/users/{id}",
    tag = "Users",
    security(("bearer_auth" = [])),
    params(("id" = String, Path, description = "User ID")),
    responses(
        (status = 200, description = "User record", body = ApiResponse<UserInfo>),
        (status = 403, description = "Another user's record"),
        (status = 404, description = "User not found")
    )
)]
pub async fn get_user(
    State(state): State<UserAppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(id): Path<String>,
) -> ApiResult<UserInfo> {
    let found = state
        .identity
        .get_user(&user.caller(), &id)
        .await
        .map_err(domain_error)?;
    ok(found.into())
}

#[utoipa::path(
    put,
    path = "/api/v1/users/{id}",
    tag = "Users",
    security(("bearer_auth" = [])),
    params(("id" = String, Path, description = "User ID")),
    request_body = UpdateUserRequest,
    responses(
        (status = 200, description = "User updated", body = ApiResponse<UserInfo>),
        (status = 400, description = "Invalid phone number"),
        (status = 403, description = "Another user's record"),
        (status = 404, description = "User not found")
    )
)]
pub async fn update_user(
    State(state): State<UserAppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(id): Path<String>,
    ValidatedJson(request): ValidatedJson<UpdateUserRequest>,
) -> ApiResult<UserInfo> {
    let updated = state
        .identity
        .update_user(&user.caller(), &id, request.into())
        .await
        .map_err(domain_error)?;
    ok(updated.into())
}

#[utoipa::path(
    delete,
    path = "/api/v1/users/{id}",
    tag = "Users",
    security(("bearer_auth" = [])),
    params(("id" = String, Path, description = "User ID")),
    responses(
        (status = 200, description = "User deactivated", body = ApiResponse<UserInfo>),
        (status = 403, description = "Another user's record"),
        (status = 404, description = "User not found"),
        (status = 409, description = "Already deactivated")
    )
)]
pub async fn deactivate_user(
    State(state): State<UserAppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(id): Path<String>,
) -> ApiResult<UserInfo> {
    let deactivated = state
        .identity
        .deactivate_user(&user.caller(), &id)
        .await
        .map_err(domain_error)?;
    ok(deactivated.into())
}

#[utoipa::path(
    get,
    path = "/api/v1/users/{id}/history",
    tag = "Users",
    security(("bearer_auth" = [])),
    params(("id" = String, Path, description = "User ID"), PaginationParams),
    responses(
        (status = 200, description = "Account activity, newest first", body = ApiResponse<PaginatedResponse<ActivityDto>>),
        (status = 403, description = "Another user's record"),
        (status = 404, description = "User not found")
    )
)]
pub async fn user_history(
    State(state): State<UserAppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(id): Path<String>,
    Query(params): Query<PaginationParams>,
) -> ApiResult<PaginatedResponse<ActivityDto>> {
    let history = state
        .identity
        .user_history(&user.caller(), &id, PageRequest::from(&params))
        .await
        .map_err(domain_error)?;
    ok(PaginatedResponse::from_page(history, ActivityDto::from))
}
