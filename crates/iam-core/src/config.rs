//! 설정 관리.
//!
//! 이 모듈은 애플리케이션 설정을 정의하고 관리합니다.
//! 서명 키를 포함한 모든 설정은 기동 시 한 번 로드되어
//! 명시적으로 각 컴포넌트에 전달됩니다 (숨은 전역 상태 없음).

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{IamError, IamResult};

/// 애플리케이션 설정.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AppConfig {
    /// 서버 설정
    #[serde(default)]
    pub server: ServerConfig,
    /// 데이터베이스 설정
    #[serde(default)]
    pub database: DatabaseConfig,
    /// 인증/토큰 설정
    #[serde(default)]
    pub auth: AuthConfig,
    /// 검증 코드 설정
    #[serde(default)]
    pub verification: VerificationConfig,
    /// 로깅 설정
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            database: DatabaseConfig::default(),
            auth: AuthConfig::default(),
            verification: VerificationConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

/// 서버 설정.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    /// 바인딩할 호스트
    pub host: String,
    /// 리스닝할 포트
    pub port: u16,
    /// 요청 타임아웃 (초)
    pub request_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3000,
            request_timeout_secs: 30,
        }
    }
}

/// 데이터베이스 설정.
///
/// 접속 URL은 `DATABASE_URL` 환경 변수에서 읽습니다.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    /// 최대 연결 수
    pub max_connections: u32,
    /// 연결 타임아웃 (초)
    pub connection_timeout_secs: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            max_connections: 10,
            connection_timeout_secs: 30,
        }
    }
}

/// 인증/토큰 설정.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AuthConfig {
    /// JWT 서명 비밀 키 (HS256).
    ///
    /// 운영 환경에서는 반드시 `IAM__AUTH__JWT_SECRET`으로 교체해야 합니다.
    pub jwt_secret: String,
    /// Access Token 만료 시간 (분)
    pub token_ttl_minutes: i64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: "development-secret-change-in-production-min-32ch".to_string(),
            token_ttl_minutes: 60,
        }
    }
}

/// 검증 코드 설정.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct VerificationConfig {
    /// 코드 자릿수
    pub code_length: usize,
    /// 코드 유효 시간 (초)
    pub validity_secs: i64,
    /// 동일 (계정, 용도) 쌍의 재발급 최소 간격 (초)
    pub cooldown_secs: i64,
}

impl Default for VerificationConfig {
    fn default() -> Self {
        Self {
            code_length: 6,
            validity_secs: 15 * 60,
            cooldown_secs: 60,
        }
    }
}

/// 로깅 설정.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// 로그 레벨
    pub level: String,
    /// 로그 형식 (pretty, json, compact)
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

impl AppConfig {
    /// 파일과 환경 변수에서 설정을 로드합니다.
    ///
    /// 환경 변수는 `IAM` 접두사와 `__` 구분자를 사용해
    /// 파일 값을 오버라이드합니다 (예: `IAM__SERVER__PORT=8080`).
    pub fn load<P: AsRef<Path>>(path: P) -> IamResult<Self> {
        let builder = config::Config::builder()
            .add_source(config::File::from(path.as_ref()).required(false))
            .add_source(
                config::Environment::with_prefix("IAM")
                    .separator("__")
                    .try_parsing(true),
            );

        let loaded = builder
            .build()
            .map_err(|e| IamError::Config(e.to_string()))?;
        loaded
            .try_deserialize()
            .map_err(|e| IamError::Config(e.to_string()))
    }

    /// 기본 경로에서 설정을 로드합니다.
    pub fn load_default() -> IamResult<Self> {
        Self::load("config/default.toml")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_sane() {
        let config = AppConfig::default();
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.verification.code_length, 6);
        assert_eq!(config.verification.validity_secs, 900);
        assert!(config.verification.cooldown_secs > 0);
        assert!(config.auth.token_ttl_minutes > 0);
    }

    #[test]
    fn test_load_missing_file_falls_back_to_defaults() {
        let config = AppConfig::load("does/not/exist.toml").unwrap();
        assert_eq!(config.server.host, "127.0.0.1");
    }
}
