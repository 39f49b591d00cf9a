//! 통합 API 에러 응답 타입.
//!
//! 모든 엔드포인트는 HTTP 상태와 별개의 안정적인 기계 판독 코드
//! (`AUTH_TOKEN_EXPIRED`, `ROLE_INSUFFICIENT` 등)를 담은
//! 동일한 에러 envelope을 반환합니다. 클라이언트는 메시지 문구가 아닌
//! `code` 필드로 분기해야 합니다.

use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;

/// 통합 API 에러 응답.
///
/// # 예시
///
/// ```json
/// {
///   "code": "AUTH_INVALID_CREDENTIALS",
///   "message": "아이디 또는 비밀번호가 올바르지 않습니다",
///   "timestamp": 1738300800
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ApiErrorResponse {
    /// 에러 코드 (예: "USERNAME_TAKEN", "AUTH_TOKEN_EXPIRED")
    pub code: String,
    /// 사람이 읽을 수 있는 에러 메시지
    pub message: String,
    /// 추가 에러 상세 정보 (선택적, 예: 필드별 검증 실패)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
    /// 에러 발생 타임스탬프 (Unix timestamp)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<i64>,
}

impl ApiErrorResponse {
    /// 기본 에러 생성 (타임스탬프 포함).
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            details: None,
            timestamp: Some(chrono::Utc::now().timestamp()),
        }
    }

    /// 상세 정보 포함 에러 생성.
    pub fn with_details(
        code: impl Into<String>,
        message: impl Into<String>,
        details: Value,
    ) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            details: Some(details),
            timestamp: Some(chrono::Utc::now().timestamp()),
        }
    }

    /// 에러 코드 반환.
    pub fn code(&self) -> &str {
        &self.code
    }
}

impl std::fmt::Display for ApiErrorResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

impl std::error::Error for ApiErrorResponse {}

/// API 핸들러 Result 타입 별칭.
pub type ApiResult<T> = Result<T, (StatusCode, Json<ApiErrorResponse>)>;

/// `(상태, envelope)` 거부 응답 생성 헬퍼.
pub fn reject(
    status: StatusCode,
    code: &str,
    message: impl Into<String>,
) -> (StatusCode, Json<ApiErrorResponse>) {
    (status, Json(ApiErrorResponse::new(code, message)))
}

/// 내부 사정을 노출하지 않는 저장소 에러 응답.
///
/// 원인은 호출 측에서 `tracing::error!`로 기록하고,
/// 클라이언트에는 일반화된 500만 반환합니다.
pub fn storage_error() -> (StatusCode, Json<ApiErrorResponse>) {
    reject(
        StatusCode::INTERNAL_SERVER_ERROR,
        "STORAGE_ERROR",
        "일시적인 오류가 발생했습니다. 잠시 후 다시 시도하세요",
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_error_response_new() {
        let error = ApiErrorResponse::new("TEST_ERROR", "Test message");
        assert_eq!(error.code, "TEST_ERROR");
        assert_eq!(error.message, "Test message");
        assert!(error.timestamp.is_some());
        assert!(error.details.is_none());
    }

    #[test]
    fn test_with_details_serialization() {
        let details = serde_json::json!({"field": "username", "reason": "too short"});
        let error = ApiErrorResponse::with_details("VALIDATION_ERROR", "Invalid input", details);

        let json = serde_json::to_string(&error).unwrap();
        assert!(json.contains(r#""code":"VALIDATION_ERROR""#));
        assert!(json.contains(r#""field":"username""#));
    }

    #[test]
    fn test_details_omitted_when_none() {
        let error = ApiErrorResponse::new("NOT_FOUND", "missing");
        let json = serde_json::to_string(&error).unwrap();
        assert!(!json.contains("details"));
    }

    #[test]
    fn test_reject_helper() {
        let (status, body) = reject(StatusCode::CONFLICT, "INVALID_TRANSITION", "already deleted");
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body.code, "INVALID_TRANSITION");
    }
}
