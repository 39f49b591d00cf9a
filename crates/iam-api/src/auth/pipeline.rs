//! 요청 인증 파이프라인.
//!
//! 요청이 비즈니스 로직에 도달하기 전에 통과하는 검사를
//! 명시적인 순서의 단계로 구성합니다. 각 단계는 실패 시 즉시 중단하며
//! (short-circuit), HTTP 프레임워크 없이도 단계 계약을 테스트할 수 있습니다.
//!
//! # 단계 순서
//!
//! 1. Bearer 토큰 추출 - 없으면 `TokenRequired`
//! 2. 서명/만료 검증 - `TokenExpired` / `TokenMalformed` / `TokenInvalid`
//! 3. 계정 조회 + token_version 비교 - 불일치면 `TokenRevoked`
//! 4. 계정 상태 확인 - `active`가 아니면 `AccountNotActive`
//! 5. 요구 역할 확인 (라우트가 선언한 경우) - `InsufficientRole`
//! 6. 성공 시 `AuthContext`를 요청에 부착

use std::sync::Arc;

use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use async_trait::async_trait;
use tracing::error;
use uuid::Uuid;

use iam_core::domain::{AccountStatus, Role};

use crate::auth::jwt::{decode_token, TokenError};
use crate::error::ApiErrorResponse;
use crate::state::AppState;

/// 인증 판정에 필요한 계정 필드.
#[derive(Debug, Clone)]
pub struct AuthAccount {
    pub id: Uuid,
    pub role: Role,
    pub status: AccountStatus,
    pub token_version: i32,
}

/// 파이프라인의 계정 조회 seam.
///
/// 운영 환경에서는 `PgPool`이 구현하고, 테스트에서는 인메모리 맵으로
/// 대체합니다.
#[async_trait]
pub trait AccountDirectory: Send + Sync {
    /// 인증 대상 계정을 조회합니다.
    async fn find_for_auth(&self, account_id: Uuid) -> Result<Option<AuthAccount>, sqlx::Error>;
}

/// 파이프라인 통과 후 요청에 부착되는 식별 정보.
#[derive(Debug, Clone, Copy)]
pub struct AuthContext {
    /// 인증된 계정 ID
    pub account_id: Uuid,
    /// 저장소 기준 현재 역할 (토큰 발급 시점 역할이 아님)
    pub role: Role,
}

/// 인증 파이프라인 거부 사유.
#[derive(Debug, thiserror::Error)]
pub enum AuthFailure {
    #[error("인증 토큰이 필요합니다")]
    TokenRequired,
    #[error("토큰이 만료되었습니다")]
    TokenExpired,
    #[error("잘못된 토큰 형식")]
    TokenMalformed,
    #[error("유효하지 않은 토큰")]
    TokenInvalid,
    #[error("무효화된 토큰입니다")]
    TokenRevoked,
    #[error("활성 상태의 계정이 아닙니다")]
    AccountNotActive,
    #[error("권한이 부족합니다")]
    InsufficientRole,
    #[error("저장소 조회 실패")]
    Storage,
}

impl IntoResponse for AuthFailure {
    fn into_response(self) -> Response {
        let (status, code) = match &self {
            AuthFailure::TokenRequired => (StatusCode::UNAUTHORIZED, "AUTH_TOKEN_REQUIRED"),
            AuthFailure::TokenExpired => (StatusCode::UNAUTHORIZED, "AUTH_TOKEN_EXPIRED"),
            AuthFailure::TokenMalformed => (StatusCode::UNAUTHORIZED, "AUTH_TOKEN_MALFORMED"),
            AuthFailure::TokenInvalid => (StatusCode::UNAUTHORIZED, "AUTH_TOKEN_INVALID"),
            AuthFailure::TokenRevoked => (StatusCode::UNAUTHORIZED, "AUTH_TOKEN_REVOKED"),
            AuthFailure::AccountNotActive => (StatusCode::FORBIDDEN, "ACCOUNT_NOT_ACTIVE"),
            AuthFailure::InsufficientRole => (StatusCode::FORBIDDEN, "ROLE_INSUFFICIENT"),
            AuthFailure::Storage => (StatusCode::INTERNAL_SERVER_ERROR, "STORAGE_ERROR"),
        };

        let body = Json(ApiErrorResponse::new(code, self.to_string()));
        (status, body).into_response()
    }
}

/// 인증 파이프라인.
///
/// 서명 키는 기동 시 설정에서 받아 보관합니다 (전역 상태 없음).
#[derive(Clone)]
pub struct AuthPipeline {
    secret: String,
}

impl AuthPipeline {
    /// 새 파이프라인 생성.
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
        }
    }

    /// 파이프라인 실행.
    ///
    /// # Arguments
    ///
    /// * `auth_header` - `Authorization` 헤더 값
    /// * `directory` - 계정 조회 seam
    /// * `required_role` - 라우트가 요구하는 최소 역할 (없으면 생략)
    pub async fn run(
        &self,
        auth_header: Option<&str>,
        directory: &dyn AccountDirectory,
        required_role: Option<Role>,
    ) -> Result<AuthContext, AuthFailure> {
        // 1. Bearer 토큰 추출
        let token = extract_bearer(auth_header).ok_or(AuthFailure::TokenRequired)?;

        // 2. 서명 및 만료 검증 (token_version은 저장소 조회가 필요하므로 3단계)
        let claims = decode_token(token, &self.secret)
            .map_err(|e| match e {
                TokenError::Expired => AuthFailure::TokenExpired,
                TokenError::SignatureInvalid => AuthFailure::TokenInvalid,
                TokenError::Malformed | TokenError::EncodingFailed(_) => {
                    AuthFailure::TokenMalformed
                }
            })?
            .claims;
        let account_id = claims.account_id().ok_or(AuthFailure::TokenMalformed)?;

        // 3. 계정 조회 + token_version 비교
        let account = directory
            .find_for_auth(account_id)
            .await
            .map_err(|e| {
                error!(account_id = %account_id, error = %e, "Account lookup failed");
                AuthFailure::Storage
            })?
            .ok_or(AuthFailure::TokenInvalid)?;

        if account.token_version != claims.tv {
            return Err(AuthFailure::TokenRevoked);
        }

        // 4. 계정 상태 확인
        if account.status != AccountStatus::Active {
            return Err(AuthFailure::AccountNotActive);
        }

        // 5. 요구 역할 확인 (저장소 기준 현재 역할 사용)
        if let Some(required) = required_role {
            if !account.role.authorizes(required) {
                return Err(AuthFailure::InsufficientRole);
            }
        }

        // 6. 식별 정보 부착
        Ok(AuthContext {
            account_id: account.id,
            role: account.role,
        })
    }
}

/// Authorization 헤더에서 Bearer 토큰 추출.
fn extract_bearer(auth_header: Option<&str>) -> Option<&str> {
    auth_header?.strip_prefix("Bearer ").filter(|t| !t.is_empty())
}

/// 인증된 요청 추출기.
///
/// # 사용 예시
///
/// ```rust,ignore
/// async fn protected_handler(
///     RequireAuth(ctx): RequireAuth,
/// ) -> impl IntoResponse {
///     format!("account: {}", ctx.account_id)
/// }
/// ```
#[derive(Debug, Clone)]
pub struct RequireAuth(pub AuthContext);

impl FromRequestParts<Arc<AppState>> for RequireAuth {
    type Rejection = AuthFailure;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|h| h.to_str().ok());

        state
            .pipeline
            .run(header, &state.db_pool, None)
            .await
            .map(RequireAuth)
    }
}

/// Admin 이상 역할을 요구하는 추출기.
#[derive(Debug, Clone)]
pub struct RequireAdmin(pub AuthContext);

impl FromRequestParts<Arc<AppState>> for RequireAdmin {
    type Rejection = AuthFailure;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|h| h.to_str().ok());

        state
            .pipeline
            .run(header, &state.db_pool, Some(Role::Admin))
            .await
            .map(RequireAdmin)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    use crate::auth::jwt::{create_token, Claims};

    const SECRET: &str = "pipeline-test-secret-key-minimum-32-chars!!";

    /// 테스트용 인메모리 계정 디렉토리.
    struct MapDirectory(HashMap<Uuid, AuthAccount>);

    #[async_trait]
    impl AccountDirectory for MapDirectory {
        async fn find_for_auth(
            &self,
            account_id: Uuid,
        ) -> Result<Option<AuthAccount>, sqlx::Error> {
            Ok(self.0.get(&account_id).cloned())
        }
    }

    /// 항상 실패하는 디렉토리.
    struct BrokenDirectory;

    #[async_trait]
    impl AccountDirectory for BrokenDirectory {
        async fn find_for_auth(&self, _: Uuid) -> Result<Option<AuthAccount>, sqlx::Error> {
            Err(sqlx::Error::PoolClosed)
        }
    }

    fn directory_with(account: AuthAccount) -> MapDirectory {
        let mut map = HashMap::new();
        map.insert(account.id, account);
        MapDirectory(map)
    }

    fn active_account(role: Role) -> AuthAccount {
        AuthAccount {
            id: Uuid::new_v4(),
            role,
            status: AccountStatus::Active,
            token_version: 1,
        }
    }

    fn bearer_for(account: &AuthAccount) -> String {
        let claims = Claims::new(account.id, account.role, account.token_version, 60);
        format!("Bearer {}", create_token(&claims, SECRET).unwrap())
    }

    #[tokio::test]
    async fn test_missing_token_is_rejected_first() {
        let pipeline = AuthPipeline::new(SECRET);
        let directory = MapDirectory(HashMap::new());

        let result = pipeline.run(None, &directory, None).await;
        assert!(matches!(result, Err(AuthFailure::TokenRequired)));

        // Bearer 접두사가 없는 헤더도 토큰 없음으로 처리
        let result = pipeline.run(Some("Basic abc"), &directory, None).await;
        assert!(matches!(result, Err(AuthFailure::TokenRequired)));
    }

    #[tokio::test]
    async fn test_garbage_token_is_malformed() {
        let pipeline = AuthPipeline::new(SECRET);
        let directory = MapDirectory(HashMap::new());

        let result = pipeline
            .run(Some("Bearer not.a.token"), &directory, None)
            .await;
        assert!(matches!(result, Err(AuthFailure::TokenMalformed)));
    }

    #[tokio::test]
    async fn test_wrong_signature_is_invalid() {
        let pipeline = AuthPipeline::new(SECRET);
        let account = active_account(Role::User);
        let claims = Claims::new(account.id, account.role, account.token_version, 60);
        let token = create_token(&claims, "other-secret-key-for-testing-minimum-32ch").unwrap();
        let directory = directory_with(account);

        let result = pipeline
            .run(Some(&format!("Bearer {}", token)), &directory, None)
            .await;
        assert!(matches!(result, Err(AuthFailure::TokenInvalid)));
    }

    #[tokio::test]
    async fn test_version_mismatch_is_revoked() {
        let pipeline = AuthPipeline::new(SECRET);
        let mut account = active_account(Role::User);
        let header = bearer_for(&account);

        // 전체 세션 무효화: token_version 증가
        account.token_version += 1;
        let directory = directory_with(account.clone());

        let result = pipeline.run(Some(&header), &directory, None).await;
        assert!(matches!(result, Err(AuthFailure::TokenRevoked)));

        // 증가 이후 새로 발급한 토큰은 통과
        let fresh = bearer_for(&account);
        let result = pipeline.run(Some(&fresh), &directory, None).await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_unknown_account_is_invalid() {
        let pipeline = AuthPipeline::new(SECRET);
        let account = active_account(Role::User);
        let header = bearer_for(&account);
        let directory = MapDirectory(HashMap::new());

        let result = pipeline.run(Some(&header), &directory, None).await;
        assert!(matches!(result, Err(AuthFailure::TokenInvalid)));
    }

    #[tokio::test]
    async fn test_non_active_account_is_rejected() {
        let pipeline = AuthPipeline::new(SECRET);

        for status in [
            AccountStatus::Pending,
            AccountStatus::Suspended,
            AccountStatus::Deleted,
        ] {
            let mut account = active_account(Role::Admin);
            account.status = status;
            let header = bearer_for(&account);
            let directory = directory_with(account);

            let result = pipeline.run(Some(&header), &directory, None).await;
            assert!(
                matches!(result, Err(AuthFailure::AccountNotActive)),
                "status {:?} should be rejected",
                status
            );
        }
    }

    #[tokio::test]
    async fn test_insufficient_role() {
        let pipeline = AuthPipeline::new(SECRET);
        let account = active_account(Role::Moderator);
        let header = bearer_for(&account);
        let directory = directory_with(account);

        let result = pipeline
            .run(Some(&header), &directory, Some(Role::Admin))
            .await;
        assert!(matches!(result, Err(AuthFailure::InsufficientRole)));
    }

    #[tokio::test]
    async fn test_success_attaches_current_role() {
        let pipeline = AuthPipeline::new(SECRET);
        let account = active_account(Role::Superadmin);
        let header = bearer_for(&account);
        let expected_id = account.id;
        let directory = directory_with(account);

        let ctx = pipeline
            .run(Some(&header), &directory, Some(Role::Admin))
            .await
            .unwrap();
        assert_eq!(ctx.account_id, expected_id);
        assert_eq!(ctx.role, Role::Superadmin);
    }

    #[tokio::test]
    async fn test_storage_failure_is_opaque() {
        let pipeline = AuthPipeline::new(SECRET);
        let account = active_account(Role::User);
        let header = bearer_for(&account);

        let result = pipeline.run(Some(&header), &BrokenDirectory, None).await;
        assert!(matches!(result, Err(AuthFailure::Storage)));
    }

    #[test]
    fn test_rejection_status_codes() {
        let cases = [
            (AuthFailure::TokenRequired, StatusCode::UNAUTHORIZED),
            (AuthFailure::TokenExpired, StatusCode::UNAUTHORIZED),
            (AuthFailure::TokenMalformed, StatusCode::UNAUTHORIZED),
            (AuthFailure::TokenInvalid, StatusCode::UNAUTHORIZED),
            (AuthFailure::TokenRevoked, StatusCode::UNAUTHORIZED),
            (AuthFailure::AccountNotActive, StatusCode::FORBIDDEN),
            (AuthFailure::InsufficientRole, StatusCode::FORBIDDEN),
            (AuthFailure::Storage, StatusCode::INTERNAL_SERVER_ERROR),
        ];

        for (failure, expected) in cases {
            assert_eq!(failure.into_response().status(), expected);
        }
    }
}
