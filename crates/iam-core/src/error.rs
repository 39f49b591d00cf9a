//! 계정 서비스의 에러 타입.
//!
//! 이 모듈은 서비스 전반에서 사용되는 에러 분류를 정의합니다.
//! 경계(route 계층)에서 HTTP 상태와 기계 판독 가능한 코드로 변환됩니다.

use thiserror::Error;

/// 핵심 서비스 에러.
#[derive(Debug, Error)]
pub enum IamError {
    /// 설정 에러
    #[error("설정 에러: {0}")]
    Config(String),

    /// 입력 검증 에러
    #[error("잘못된 입력: {0}")]
    Validation(String),

    /// 유일성/상태 충돌
    #[error("충돌: {0}")]
    Conflict(String),

    /// 인증 에러 (자격증명/토큰)
    #[error("인증 에러: {0}")]
    Auth(String),

    /// 인가 에러 (역할/권한)
    #[error("권한 에러: {0}")]
    Authorization(String),

    /// 찾을 수 없음
    #[error("찾을 수 없음: {0}")]
    NotFound(String),

    /// 요청 한도 초과
    #[error("요청 한도 초과: {0}")]
    RateLimit(String),

    /// 직렬화 에러
    #[error("직렬화 에러: {0}")]
    Serialization(String),

    /// 데이터베이스/트랜잭션 에러
    #[error("데이터베이스 에러: {0}")]
    Database(String),

    /// 내부 에러
    #[error("내부 에러: {0}")]
    Internal(String),
}

/// 계정 서비스 작업을 위한 Result 타입.
pub type IamResult<T> = Result<T, IamError>;

impl IamError {
    /// 클라이언트 귀책 에러인지 확인합니다 (4xx 계열).
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            IamError::Validation(_)
                | IamError::Conflict(_)
                | IamError::Auth(_)
                | IamError::Authorization(_)
                | IamError::NotFound(_)
                | IamError::RateLimit(_)
        )
    }

    /// 재시도 가능한 에러인지 확인합니다.
    pub fn is_retryable(&self) -> bool {
        matches!(self, IamError::Database(_) | IamError::RateLimit(_))
    }
}

impl From<serde_json::Error> for IamError {
    fn from(err: serde_json::Error) -> Self {
        IamError::Serialization(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_error_classification() {
        assert!(IamError::Validation("too short".to_string()).is_client_error());
        assert!(IamError::Conflict("username".to_string()).is_client_error());
        assert!(!IamError::Database("connection reset".to_string()).is_client_error());
        assert!(!IamError::Internal("bug".to_string()).is_client_error());
    }

    #[test]
    fn test_retryable_classification() {
        assert!(IamError::Database("deadlock".to_string()).is_retryable());
        assert!(!IamError::Auth("bad token".to_string()).is_retryable());
    }
}
