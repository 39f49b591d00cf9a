//! 인증 API.
//!
//! 가입, 이메일 검증, 로그인, 토큰 갱신, 비밀번호 재설정 엔드포인트.
//!
//! # 에러 응답
//!
//! 모든 실패는 HTTP 상태와 별개의 안정적인 에러 코드를 담은
//! 공통 envelope으로 반환됩니다. 계정 열거를 막기 위해 존재하지 않는
//! 계정과 잘못된 자격증명은 같은 코드로 응답합니다.

use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::post,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::error;
use utoipa::ToSchema;
use validator::Validate;

use iam_core::domain::AccountSummary;

use crate::auth::RequireAuth;
use crate::error::{reject, storage_error, ApiErrorResponse, ApiResult};
use crate::services::{
    ActivateError, LoginError, PasswordResetError, RegisterError, TokenGrant, VerificationError,
};
use crate::state::AppState;

// =============================================================================
// 요청/응답 타입
// =============================================================================

/// 가입 요청.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct RegisterRequest {
    /// 사용자 이름 (3~32자)
    #[validate(length(min = 3, max = 32, message = "사용자 이름은 3~32자여야 합니다"))]
    pub username: String,
    /// 이메일 주소
    #[validate(email(message = "유효한 이메일 주소가 아닙니다"))]
    pub email: String,
    /// 비밀번호 (강도 검사는 서비스 계층에서 수행)
    pub password: String,
}

/// 가입 응답.
#[derive(Debug, Serialize, ToSchema)]
pub struct RegisterResponse {
    /// 생성된 계정 요약 (`pending` 상태)
    pub account: AccountSummary,
}

/// 이메일 검증 요청.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct VerifyRequest {
    /// 가입에 사용한 이메일
    #[validate(email(message = "유효한 이메일 주소가 아닙니다"))]
    pub email: String,
    /// 수신한 검증 코드
    #[validate(length(min = 1, message = "검증 코드가 비어 있습니다"))]
    pub code: String,
}

/// 이메일 검증 응답.
#[derive(Debug, Serialize, ToSchema)]
pub struct VerifyResponse {
    /// 활성화된 계정 요약
    pub account: AccountSummary,
}

/// 로그인 요청.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct LoginRequest {
    /// 사용자 이름 또는 이메일
    #[validate(length(min = 1, message = "아이디가 비어 있습니다"))]
    pub identifier: String,
    /// 비밀번호
    #[validate(length(min = 1, message = "비밀번호가 비어 있습니다"))]
    pub password: String,
}

/// 이메일만 받는 요청 (재전송, 재설정 요청).
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct EmailRequest {
    /// 대상 이메일
    #[validate(email(message = "유효한 이메일 주소가 아닙니다"))]
    pub email: String,
}

/// 비밀번호 재설정 확정 요청.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct PasswordResetConfirmRequest {
    /// 대상 이메일
    #[validate(email(message = "유효한 이메일 주소가 아닙니다"))]
    pub email: String,
    /// 수신한 재설정 코드
    #[validate(length(min = 1, message = "검증 코드가 비어 있습니다"))]
    pub code: String,
    /// 새 비밀번호
    pub new_password: String,
}

/// 단순 확인 응답.
#[derive(Debug, Serialize, ToSchema)]
pub struct AckResponse {
    pub message: String,
}

impl AckResponse {
    fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

// =============================================================================
// 에러 매핑
// =============================================================================

fn validation_rejection(errors: validator::ValidationErrors) -> (StatusCode, Json<ApiErrorResponse>) {
    let details = serde_json::to_value(&errors).unwrap_or(serde_json::Value::Null);
    (
        StatusCode::BAD_REQUEST,
        Json(ApiErrorResponse::with_details(
            "VALIDATION_ERROR",
            "입력값이 올바르지 않습니다",
            details,
        )),
    )
}

fn map_register_error(err: RegisterError) -> (StatusCode, Json<ApiErrorResponse>) {
    let message = err.to_string();
    match err {
        RegisterError::UsernameTaken => reject(StatusCode::BAD_REQUEST, "USERNAME_TAKEN", message),
        RegisterError::EmailTaken => reject(StatusCode::BAD_REQUEST, "EMAIL_TAKEN", message),
        RegisterError::WeakPassword(_) => {
            reject(StatusCode::BAD_REQUEST, "WEAK_PASSWORD", message)
        }
        RegisterError::Internal => {
            reject(StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR", message)
        }
        RegisterError::Storage(e) => {
            error!(error = %e, "Registration failed");
            storage_error()
        }
    }
}

fn map_verification_error(err: VerificationError) -> (StatusCode, Json<ApiErrorResponse>) {
    let message = err.to_string();
    match err {
        // 코드 부재와 불일치는 구분하지 않음
        VerificationError::NotFound | VerificationError::Mismatch => reject(
            StatusCode::BAD_REQUEST,
            "VERIFICATION_CODE_INVALID",
            "검증 코드가 올바르지 않습니다",
        ),
        VerificationError::Expired => {
            reject(StatusCode::BAD_REQUEST, "VERIFICATION_CODE_EXPIRED", message)
        }
        VerificationError::AlreadyConsumed => {
            reject(StatusCode::BAD_REQUEST, "VERIFICATION_CODE_CONSUMED", message)
        }
        VerificationError::RateLimited { retry_after_secs } => (
            StatusCode::TOO_MANY_REQUESTS,
            Json(ApiErrorResponse::with_details(
                "VERIFICATION_RATE_LIMITED",
                message,
                serde_json::json!({ "retry_after_secs": retry_after_secs }),
            )),
        ),
        VerificationError::Storage(e) => {
            error!(error = %e, "Verification workflow failed");
            storage_error()
        }
    }
}

fn map_activate_error(err: ActivateError) -> (StatusCode, Json<ApiErrorResponse>) {
    match err {
        ActivateError::Verification(e) => map_verification_error(e),
        ActivateError::InvalidTransition => reject(
            StatusCode::CONFLICT,
            "INVALID_TRANSITION",
            "활성화할 수 없는 계정 상태입니다",
        ),
        ActivateError::Storage(e) => {
            error!(error = %e, "Account activation failed");
            storage_error()
        }
    }
}

fn map_login_error(err: LoginError) -> (StatusCode, Json<ApiErrorResponse>) {
    let message = err.to_string();
    match err {
        LoginError::InvalidCredentials => {
            reject(StatusCode::UNAUTHORIZED, "AUTH_INVALID_CREDENTIALS", message)
        }
        LoginError::AccountNotActive => {
            reject(StatusCode::FORBIDDEN, "ACCOUNT_NOT_ACTIVE", message)
        }
        LoginError::Internal => {
            reject(StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR", message)
        }
        LoginError::Storage(e) => {
            error!(error = %e, "Login failed");
            storage_error()
        }
    }
}

fn map_reset_error(err: PasswordResetError) -> (StatusCode, Json<ApiErrorResponse>) {
    let message = err.to_string();
    match err {
        PasswordResetError::Verification(e) => map_verification_error(e),
        PasswordResetError::WeakPassword(_) => {
            reject(StatusCode::BAD_REQUEST, "WEAK_PASSWORD", message)
        }
        PasswordResetError::Internal => {
            reject(StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR", message)
        }
        PasswordResetError::Storage(e) => {
            error!(error = %e, "Password reset failed");
            storage_error()
        }
    }
}

// =============================================================================
// 핸들러
// =============================================================================

/// 계정 가입.
///
/// POST /api/v1/auth/register
#[utoipa::path(
    post,
    path = "/api/v1/auth/register",
    tag = "auth",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "계정 생성됨 (pending)", body = RegisterResponse),
        (status = 400, description = "입력 오류 / 중복 / 약한 비밀번호", body = ApiErrorResponse)
    )
)]
pub async fn register(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<RegisterRequest>,
) -> ApiResult<impl IntoResponse> {
    payload.validate().map_err(validation_rejection)?;

    let account = state
        .accounts
        .register(&payload.username, &payload.email, &payload.password)
        .await
        .map_err(map_register_error)?;

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            account: AccountSummary::from(&account),
        }),
    ))
}

/// 이메일 검증 코드 상환 및 계정 활성화.
///
/// POST /api/v1/auth/verify
#[utoipa::path(
    post,
    path = "/api/v1/auth/verify",
    tag = "auth",
    request_body = VerifyRequest,
    responses(
        (status = 200, description = "계정 활성화됨", body = VerifyResponse),
        (status = 400, description = "코드 불일치/만료/소진", body = ApiErrorResponse),
        (status = 409, description = "활성화 불가 상태", body = ApiErrorResponse)
    )
)]
pub async fn verify(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<VerifyRequest>,
) -> ApiResult<Json<VerifyResponse>> {
    payload.validate().map_err(validation_rejection)?;

    let account = state
        .accounts
        .activate(&payload.email, &payload.code)
        .await
        .map_err(map_activate_error)?;

    Ok(Json(VerifyResponse {
        account: AccountSummary::from(&account),
    }))
}

/// 이메일 검증 코드 재전송.
///
/// 계정 존재 여부를 노출하지 않기 위해 항상 202를 반환합니다
/// (쿨다운 초과 시에만 429).
/// POST /api/v1/auth/verify/resend
#[utoipa::path(
    post,
    path = "/api/v1/auth/verify/resend",
    tag = "auth",
    request_body = EmailRequest,
    responses(
        (status = 202, description = "재전송 처리됨", body = AckResponse),
        (status = 429, description = "쿨다운 초과", body = ApiErrorResponse)
    )
)]
pub async fn resend_verification(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<EmailRequest>,
) -> ApiResult<impl IntoResponse> {
    payload.validate().map_err(validation_rejection)?;

    state
        .accounts
        .resend_verification(&payload.email)
        .await
        .map_err(map_verification_error)?;

    Ok((
        StatusCode::ACCEPTED,
        Json(AckResponse::new("검증 코드가 재전송되었습니다")),
    ))
}

/// 로그인.
///
/// POST /api/v1/auth/login
#[utoipa::path(
    post,
    path = "/api/v1/auth/login",
    tag = "auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "토큰 발급", body = TokenGrant),
        (status = 401, description = "자격증명 불일치", body = ApiErrorResponse),
        (status = 403, description = "비활성 계정", body = ApiErrorResponse)
    )
)]
pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<LoginRequest>,
) -> ApiResult<Json<TokenGrant>> {
    payload.validate().map_err(validation_rejection)?;

    let grant = state
        .accounts
        .login(&payload.identifier, &payload.password)
        .await
        .map_err(map_login_error)?;

    Ok(Json(grant))
}

/// 토큰 갱신.
///
/// 전체 인증 파이프라인을 통과한 뒤 현재 역할/token_version으로
/// 새 토큰을 발급합니다. 만료·무효화된 토큰으로는 갱신할 수 없습니다.
/// POST /api/v1/auth/token/refresh
#[utoipa::path(
    post,
    path = "/api/v1/auth/token/refresh",
    tag = "auth",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "새 토큰 발급", body = TokenGrant),
        (status = 401, description = "토큰 만료/무효/철회", body = ApiErrorResponse)
    )
)]
pub async fn refresh_token(
    State(state): State<Arc<AppState>>,
    RequireAuth(ctx): RequireAuth,
) -> ApiResult<Json<TokenGrant>> {
    let grant = state
        .accounts
        .refresh(ctx.account_id)
        .await
        .map_err(map_login_error)?;

    Ok(Json(grant))
}

/// 비밀번호 재설정 코드 요청.
///
/// 계정 존재 여부와 무관하게 동일한 202를 반환합니다.
/// POST /api/v1/auth/password-reset/request
#[utoipa::path(
    post,
    path = "/api/v1/auth/password-reset/request",
    tag = "auth",
    request_body = EmailRequest,
    responses(
        (status = 202, description = "요청 처리됨", body = AckResponse),
        (status = 429, description = "쿨다운 초과", body = ApiErrorResponse)
    )
)]
pub async fn request_password_reset(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<EmailRequest>,
) -> ApiResult<impl IntoResponse> {
    payload.validate().map_err(validation_rejection)?;

    state
        .accounts
        .request_password_reset(&payload.email)
        .await
        .map_err(map_verification_error)?;

    Ok((
        StatusCode::ACCEPTED,
        Json(AckResponse::new(
            "계정이 존재하면 재설정 코드가 전송됩니다",
        )),
    ))
}

/// 재설정 코드 상환 및 비밀번호 교체.
///
/// 성공 시 기존 세션은 모두 무효화됩니다.
/// POST /api/v1/auth/password-reset/confirm
#[utoipa::path(
    post,
    path = "/api/v1/auth/password-reset/confirm",
    tag = "auth",
    request_body = PasswordResetConfirmRequest,
    responses(
        (status = 200, description = "비밀번호 변경됨", body = AckResponse),
        (status = 400, description = "코드 오류 / 약한 비밀번호", body = ApiErrorResponse)
    )
)]
pub async fn confirm_password_reset(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<PasswordResetConfirmRequest>,
) -> ApiResult<Json<AckResponse>> {
    payload.validate().map_err(validation_rejection)?;

    state
        .accounts
        .confirm_password_reset(&payload.email, &payload.code, &payload.new_password)
        .await
        .map_err(map_reset_error)?;

    Ok(Json(AckResponse::new(
        "비밀번호가 변경되었습니다. 다시 로그인하세요",
    )))
}

/// 인증 라우터 생성.
pub fn auth_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/register", post(register))
        .route("/verify", post(verify))
        .route("/verify/resend", post(resend_verification))
        .route("/login", post(login))
        .route("/token/refresh", post(refresh_token))
        .route("/password-reset/request", post(request_password_reset))
        .route("/password-reset/confirm", post(confirm_password_reset))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_request_validation() {
        let valid = RegisterRequest {
            username: "alice".to_string(),
            email: "a@x.com".to_string(),
            password: "Passw0rd!".to_string(),
        };
        assert!(valid.validate().is_ok());

        let short_username = RegisterRequest {
            username: "al".to_string(),
            email: "a@x.com".to_string(),
            password: "Passw0rd!".to_string(),
        };
        assert!(short_username.validate().is_err());

        let bad_email = RegisterRequest {
            username: "alice".to_string(),
            email: "not-an-email".to_string(),
            password: "Passw0rd!".to_string(),
        };
        assert!(bad_email.validate().is_err());
    }

    #[test]
    fn test_verification_error_codes() {
        let (status, body) = map_verification_error(VerificationError::NotFound);
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body.code, "VERIFICATION_CODE_INVALID");

        // 불일치도 같은 코드 (코드 존재 여부 비노출)
        let (_, body) = map_verification_error(VerificationError::Mismatch);
        assert_eq!(body.code, "VERIFICATION_CODE_INVALID");

        let (status, body) = map_verification_error(VerificationError::Expired);
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body.code, "VERIFICATION_CODE_EXPIRED");

        let (status, body) =
            map_verification_error(VerificationError::RateLimited { retry_after_secs: 42 });
        assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(body.code, "VERIFICATION_RATE_LIMITED");
        assert_eq!(body.details.as_ref().unwrap()["retry_after_secs"], 42);
    }

    #[test]
    fn test_login_error_codes() {
        let (status, body) = map_login_error(LoginError::InvalidCredentials);
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body.code, "AUTH_INVALID_CREDENTIALS");

        let (status, body) = map_login_error(LoginError::AccountNotActive);
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body.code, "ACCOUNT_NOT_ACTIVE");
    }

    #[test]
    fn test_storage_errors_are_opaque() {
        let (status, body) = map_register_error(RegisterError::Storage(sqlx::Error::PoolClosed));
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body.code, "STORAGE_ERROR");
        // 내부 사정이 메시지에 노출되지 않음
        assert!(!body.message.contains("Pool"));
    }
}
