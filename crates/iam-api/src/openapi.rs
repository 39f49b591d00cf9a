//! OpenAPI 문서화 설정.
//!
//! utoipa를 사용하여 REST API의 OpenAPI 3.0 스펙을 생성합니다.
//! Swagger UI는 `/swagger-ui` 경로에서 사용 가능합니다.
//!
//! 새로운 엔드포인트를 추가할 때:
//!
//! 1. 응답/요청 타입에 `#[derive(ToSchema)]` 추가
//! 2. 핸들러에 `#[utoipa::path(...)]` 어노테이션 추가
//! 3. 이 파일의 `components(schemas(...))` 및 `paths(...)` 섹션에 추가

use axum::Router;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};
use utoipa_swagger_ui::SwaggerUi;

use iam_core::domain::{AccountStatus, AccountSummary, Role};

use crate::error::ApiErrorResponse;
use crate::routes::{
    AckResponse, ChangeRoleRequest, ComponentHealth, ComponentStatus, EmailRequest,
    HealthResponse, LoginRequest, PasswordResetConfirmRequest, RegisterRequest, RegisterResponse,
    RevokeSessionsResponse, UserResponse, UsersListResponse, VerifyRequest, VerifyResponse,
};
use crate::services::TokenGrant;

/// Bearer 토큰 보안 스키마 등록.
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

/// IAM API 문서.
///
/// 모든 엔드포인트와 스키마를 포함하는 OpenAPI 3.0 스펙입니다.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "IAM Service API",
        version = "0.1.0",
        description = r#"
# 계정/인증 REST API

계정 가입, 이메일 검증, 로그인, 토큰 관리, 역할 기반 계정 관리를 위한 REST API입니다.

## 인증

보호된 엔드포인트는 JWT Bearer 토큰 인증이 필요합니다.
`Authorization: Bearer <token>` 헤더를 포함하세요.

## 에러 형식

모든 에러는 HTTP 상태와 별개의 안정적인 `code` 필드를 포함합니다.
클라이언트는 메시지가 아닌 `code`로 분기해야 합니다.
"#,
        license(name = "MIT", url = "https://opensource.org/licenses/MIT")
    ),
    servers(
        (url = "http://localhost:3000", description = "로컬 개발 서버"),
    ),
    tags(
        (name = "health", description = "헬스 체크 - 서버 상태 확인"),
        (name = "auth", description = "인증 - 가입/검증/로그인/토큰/비밀번호 재설정"),
        (name = "admin", description = "관리자 - 계정 관리 (admin 이상)")
    ),
    modifiers(&SecurityAddon),
    components(
        schemas(
            // ===== Common =====
            ApiErrorResponse,
            Role,
            AccountStatus,
            AccountSummary,

            // ===== Health =====
            HealthResponse,
            ComponentHealth,
            ComponentStatus,

            // ===== Auth =====
            RegisterRequest,
            RegisterResponse,
            VerifyRequest,
            VerifyResponse,
            LoginRequest,
            EmailRequest,
            PasswordResetConfirmRequest,
            AckResponse,
            TokenGrant,

            // ===== Admin =====
            ChangeRoleRequest,
            UserResponse,
            UsersListResponse,
            RevokeSessionsResponse,
        )
    ),
    paths(
        // ===== Health =====
        crate::routes::health::health_check,
        crate::routes::health::health_ready,

        // ===== Auth =====
        crate::routes::auth::register,
        crate::routes::auth::verify,
        crate::routes::auth::resend_verification,
        crate::routes::auth::login,
        crate::routes::auth::refresh_token,
        crate::routes::auth::request_password_reset,
        crate::routes::auth::confirm_password_reset,

        // ===== Admin =====
        crate::routes::admin::list_users,
        crate::routes::admin::change_role,
        crate::routes::admin::suspend_user,
        crate::routes::admin::reactivate_user,
        crate::routes::admin::delete_user,
        crate::routes::admin::revoke_sessions,
    )
)]
pub struct ApiDoc;

/// Swagger UI 라우터 생성.
pub fn swagger_ui_router<S>() -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    SwaggerUi::new("/swagger-ui")
        .url("/api-docs/openapi.json", ApiDoc::openapi())
        .into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_openapi_spec_builds() {
        let spec = ApiDoc::openapi();
        assert!(!spec.paths.paths.is_empty());
    }

    #[test]
    fn test_swagger_ui_router_creates() {
        let _router: Router<()> = swagger_ui_router();
    }
}
