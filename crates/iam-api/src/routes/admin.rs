//! 관리자 API.
//!
//! 계정 목록 조회, 역할 변경, 정지/해제/삭제, 세션 무효화 엔드포인트.
//! 모든 라우트는 admin 이상 역할을 요구하며, 인증 파이프라인이
//! 토큰/상태/역할을 순서대로 검사합니다.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, get, post, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::error;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use iam_core::domain::{AccountSummary, Role};

use crate::auth::RequireAdmin;
use crate::error::{reject, storage_error, ApiErrorResponse, ApiResult};
use crate::services::{RoleChangeError, TransitionError};
use crate::state::AppState;

/// 목록 조회 파라미터.
#[derive(Debug, Deserialize, IntoParams)]
pub struct ListUsersQuery {
    /// 페이지 크기 (기본 50, 최대 200)
    pub limit: Option<i64>,
    /// 시작 오프셋
    pub offset: Option<i64>,
}

/// 계정 목록 응답.
#[derive(Debug, Serialize, ToSchema)]
pub struct UsersListResponse {
    pub users: Vec<AccountSummary>,
    pub total: usize,
}

/// 역할 변경 요청.
#[derive(Debug, Deserialize, ToSchema)]
pub struct ChangeRoleRequest {
    /// 요청 역할 ("user" | "moderator" | "admin" | "superadmin")
    pub role: String,
}

/// 단일 계정 응답.
#[derive(Debug, Serialize, ToSchema)]
pub struct UserResponse {
    pub user: AccountSummary,
}

/// 세션 무효화 응답.
#[derive(Debug, Serialize, ToSchema)]
pub struct RevokeSessionsResponse {
    pub message: String,
}

fn map_role_change_error(err: RoleChangeError) -> (StatusCode, Json<ApiErrorResponse>) {
    let message = err.to_string();
    match err {
        RoleChangeError::Forbidden => reject(StatusCode::FORBIDDEN, "ROLE_FORBIDDEN", message),
        RoleChangeError::NotFound => reject(StatusCode::NOT_FOUND, "ACCOUNT_NOT_FOUND", message),
        RoleChangeError::Storage(e) => {
            error!(error = %e, "Role change failed");
            storage_error()
        }
    }
}

fn map_transition_error(err: TransitionError) -> (StatusCode, Json<ApiErrorResponse>) {
    let message = err.to_string();
    match err {
        TransitionError::InvalidTransition => {
            reject(StatusCode::CONFLICT, "INVALID_TRANSITION", message)
        }
        TransitionError::NotFound => reject(StatusCode::NOT_FOUND, "ACCOUNT_NOT_FOUND", message),
        TransitionError::Storage(e) => {
            error!(error = %e, "Status transition failed");
            storage_error()
        }
    }
}

/// 계정 목록 조회.
///
/// GET /api/v1/admin/users
#[utoipa::path(
    get,
    path = "/api/v1/admin/users",
    tag = "admin",
    security(("bearer_auth" = [])),
    params(ListUsersQuery),
    responses(
        (status = 200, description = "계정 목록", body = UsersListResponse),
        (status = 401, description = "인증 실패", body = ApiErrorResponse),
        (status = 403, description = "권한 부족", body = ApiErrorResponse)
    )
)]
pub async fn list_users(
    State(state): State<Arc<AppState>>,
    RequireAdmin(_ctx): RequireAdmin,
    Query(query): Query<ListUsersQuery>,
) -> ApiResult<Json<UsersListResponse>> {
    let limit = query.limit.unwrap_or(50).clamp(1, 200);
    let offset = query.offset.unwrap_or(0).max(0);

    let users = state
        .accounts
        .list_accounts(limit, offset)
        .await
        .map_err(|e| {
            error!(error = %e, "Account listing failed");
            storage_error()
        })?;

    let total = users.len();
    Ok(Json(UsersListResponse { users, total }))
}

/// 계정 역할 변경.
///
/// 알 수 없는 역할 문자열은 부여 거부로 처리합니다 (fail-closed).
/// PUT /api/v1/admin/users/{id}/role
#[utoipa::path(
    put,
    path = "/api/v1/admin/users/{id}/role",
    tag = "admin",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "대상 계정 ID")),
    request_body = ChangeRoleRequest,
    responses(
        (status = 200, description = "역할 변경됨", body = UserResponse),
        (status = 403, description = "권한 상승 시도 거부", body = ApiErrorResponse),
        (status = 404, description = "계정 없음", body = ApiErrorResponse)
    )
)]
pub async fn change_role(
    State(state): State<Arc<AppState>>,
    RequireAdmin(ctx): RequireAdmin,
    Path(id): Path<Uuid>,
    Json(payload): Json<ChangeRoleRequest>,
) -> ApiResult<Json<UserResponse>> {
    // 알 수 없는 역할 리터럴은 절대 부여하지 않음
    let Some(requested) = Role::parse(&payload.role) else {
        return Err(reject(
            StatusCode::FORBIDDEN,
            "ROLE_FORBIDDEN",
            "알 수 없는 역할입니다",
        ));
    };

    let user = state
        .accounts
        .change_role(ctx.role, id, requested)
        .await
        .map_err(map_role_change_error)?;

    Ok(Json(UserResponse { user }))
}

/// 계정 정지.
///
/// POST /api/v1/admin/users/{id}/suspend
#[utoipa::path(
    post,
    path = "/api/v1/admin/users/{id}/suspend",
    tag = "admin",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "대상 계정 ID")),
    responses(
        (status = 200, description = "정지됨", body = UserResponse),
        (status = 404, description = "계정 없음", body = ApiErrorResponse),
        (status = 409, description = "허용되지 않는 전이", body = ApiErrorResponse)
    )
)]
pub async fn suspend_user(
    State(state): State<Arc<AppState>>,
    RequireAdmin(_ctx): RequireAdmin,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<UserResponse>> {
    let user = state
        .accounts
        .suspend(id)
        .await
        .map_err(map_transition_error)?;

    Ok(Json(UserResponse { user }))
}

/// 계정 정지 해제.
///
/// POST /api/v1/admin/users/{id}/reactivate
#[utoipa::path(
    post,
    path = "/api/v1/admin/users/{id}/reactivate",
    tag = "admin",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "대상 계정 ID")),
    responses(
        (status = 200, description = "해제됨", body = UserResponse),
        (status = 404, description = "계정 없음", body = ApiErrorResponse),
        (status = 409, description = "허용되지 않는 전이", body = ApiErrorResponse)
    )
)]
pub async fn reactivate_user(
    State(state): State<Arc<AppState>>,
    RequireAdmin(_ctx): RequireAdmin,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<UserResponse>> {
    let user = state
        .accounts
        .reactivate(id)
        .await
        .map_err(map_transition_error)?;

    Ok(Json(UserResponse { user }))
}

/// 계정 삭제 (종결, 복구 불가).
///
/// DELETE /api/v1/admin/users/{id}
#[utoipa::path(
    delete,
    path = "/api/v1/admin/users/{id}",
    tag = "admin",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "대상 계정 ID")),
    responses(
        (status = 200, description = "삭제됨", body = UserResponse),
        (status = 404, description = "계정 없음", body = ApiErrorResponse),
        (status = 409, description = "이미 삭제됨", body = ApiErrorResponse)
    )
)]
pub async fn delete_user(
    State(state): State<Arc<AppState>>,
    RequireAdmin(_ctx): RequireAdmin,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<UserResponse>> {
    let user = state
        .accounts
        .delete(id)
        .await
        .map_err(map_transition_error)?;

    Ok(Json(UserResponse { user }))
}

/// 계정의 모든 세션 무효화.
///
/// token_version 증가로 발급된 모든 토큰이 다음 검증부터 거부됩니다.
/// POST /api/v1/admin/users/{id}/revoke-sessions
#[utoipa::path(
    post,
    path = "/api/v1/admin/users/{id}/revoke-sessions",
    tag = "admin",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "대상 계정 ID")),
    responses(
        (status = 200, description = "세션 무효화됨", body = RevokeSessionsResponse),
        (status = 404, description = "계정 없음", body = ApiErrorResponse)
    )
)]
pub async fn revoke_sessions(
    State(state): State<Arc<AppState>>,
    RequireAdmin(_ctx): RequireAdmin,
    Path(id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    state
        .accounts
        .revoke_sessions(id)
        .await
        .map_err(map_transition_error)?;

    Ok(Json(RevokeSessionsResponse {
        message: "모든 세션이 무효화되었습니다".to_string(),
    }))
}

/// 관리자 라우터 생성.
pub fn admin_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/users", get(list_users))
        .route("/users/{id}/role", put(change_role))
        .route("/users/{id}/suspend", post(suspend_user))
        .route("/users/{id}/reactivate", post(reactivate_user))
        .route("/users/{id}", delete(delete_user))
        .route("/users/{id}/revoke-sessions", post(revoke_sessions))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_change_error_codes() {
        let (status, body) = map_role_change_error(RoleChangeError::Forbidden);
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body.code, "ROLE_FORBIDDEN");

        let (status, body) = map_role_change_error(RoleChangeError::NotFound);
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body.code, "ACCOUNT_NOT_FOUND");
    }

    #[test]
    fn test_transition_error_codes() {
        let (status, body) = map_transition_error(TransitionError::InvalidTransition);
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body.code, "INVALID_TRANSITION");

        let (status, body) = map_transition_error(TransitionError::NotFound);
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body.code, "ACCOUNT_NOT_FOUND");
    }
}
