//! JWT 토큰 처리.
//!
//! Access Token 생성/검증 로직.
//!
//! 토큰은 발급 시점의 역할과 token_version을 담은 서명된 클레임 집합이며,
//! 서버는 발급한 토큰을 따로 저장하지 않습니다. 전체 세션 무효화는
//! 계정의 token_version 증가로 이루어지고, 버전 비교는 저장소 조회가
//! 필요하므로 인증 파이프라인이 담당합니다 (이 모듈은 서명/만료만 검증).

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, TokenData, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use iam_core::domain::Role;

/// JWT Access Token 페이로드.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject - 계정 ID
    pub sub: String,
    /// 발급 시점의 역할
    pub role: Role,
    /// 발급 시점의 token_version
    pub tv: i32,
    /// Issued At - 토큰 발급 시간 (Unix timestamp)
    pub iat: i64,
    /// Expiration - 토큰 만료 시간 (Unix timestamp)
    pub exp: i64,
    /// JWT ID - 토큰 고유 식별자
    pub jti: String,
}

impl Claims {
    /// 새로운 Claims 생성.
    ///
    /// # Arguments
    ///
    /// * `account_id` - 계정 ID
    /// * `role` - 발급 시점 역할
    /// * `token_version` - 발급 시점 token_version
    /// * `ttl_minutes` - 만료 시간 (분)
    pub fn new(account_id: Uuid, role: Role, token_version: i32, ttl_minutes: i64) -> Self {
        let now = Utc::now();
        Self {
            sub: account_id.to_string(),
            role,
            tv: token_version,
            iat: now.timestamp(),
            exp: (now + Duration::minutes(ttl_minutes)).timestamp(),
            jti: Uuid::new_v4().to_string(),
        }
    }

    /// subject를 계정 ID로 파싱.
    pub fn account_id(&self) -> Option<Uuid> {
        Uuid::parse_str(&self.sub).ok()
    }
}

/// JWT 토큰 에러.
#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    #[error("토큰 인코딩 실패: {0}")]
    EncodingFailed(#[source] jsonwebtoken::errors::Error),
    #[error("토큰이 만료되었습니다")]
    Expired,
    #[error("서명이 유효하지 않습니다")]
    SignatureInvalid,
    #[error("잘못된 토큰 형식")]
    Malformed,
}

/// Access Token 생성.
///
/// # Arguments
///
/// * `claims` - JWT 페이로드
/// * `secret` - HS256 서명 비밀 키
pub fn create_token(claims: &Claims, secret: &str) -> Result<String, TokenError> {
    encode(
        &Header::default(),
        claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(TokenError::EncodingFailed)
}

/// JWT 토큰 디코딩 및 검증.
///
/// 서명과 만료(`now < exp`)를 검증합니다. 만료 판정에 leeway를 두지 않아
/// 결정적으로 동작합니다. token_version 비교는 수행하지 않습니다.
pub fn decode_token(token: &str, secret: &str) -> Result<TokenData<Claims>, TokenError> {
    let mut validation = Validation::default();
    validation.validate_exp = true;
    validation.leeway = 0;

    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )
    .map_err(|e| match e.kind() {
        jsonwebtoken::errors::ErrorKind::ExpiredSignature => TokenError::Expired,
        jsonwebtoken::errors::ErrorKind::InvalidSignature => TokenError::SignatureInvalid,
        _ => TokenError::Malformed,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEST_SECRET: &str = "test-secret-key-for-jwt-testing-minimum-32-chars";

    #[test]
    fn test_create_and_decode_token() {
        let account_id = Uuid::new_v4();
        let claims = Claims::new(account_id, Role::Moderator, 3, 60);

        let token = create_token(&claims, TEST_SECRET).unwrap();
        assert!(!token.is_empty());

        let decoded = decode_token(&token, TEST_SECRET).unwrap();
        assert_eq!(decoded.claims.sub, account_id.to_string());
        assert_eq!(decoded.claims.account_id(), Some(account_id));
        assert_eq!(decoded.claims.role, Role::Moderator);
        assert_eq!(decoded.claims.tv, 3);
    }

    #[test]
    fn test_expired_token() {
        let mut claims = Claims::new(Uuid::new_v4(), Role::User, 1, 60);
        claims.exp = claims.iat - 60;

        let token = create_token(&claims, TEST_SECRET).unwrap();
        let result = decode_token(&token, TEST_SECRET);
        assert!(matches!(result, Err(TokenError::Expired)));
    }

    #[test]
    fn test_wrong_secret_is_signature_invalid() {
        let claims = Claims::new(Uuid::new_v4(), Role::User, 1, 60);
        let token = create_token(&claims, TEST_SECRET).unwrap();

        let result = decode_token(&token, "another-secret-key-for-testing-minimum-32ch");
        assert!(matches!(result, Err(TokenError::SignatureInvalid)));
    }

    #[test]
    fn test_garbage_token_is_malformed() {
        let result = decode_token("not.a.token", TEST_SECRET);
        assert!(matches!(result, Err(TokenError::Malformed)));

        let result = decode_token("", TEST_SECRET);
        assert!(matches!(result, Err(TokenError::Malformed)));
    }

    #[test]
    fn test_tokens_have_unique_jti() {
        let a = Claims::new(Uuid::new_v4(), Role::User, 1, 60);
        let b = Claims::new(Uuid::new_v4(), Role::User, 1, 60);
        assert_ne!(a.jti, b.jti);
    }
}
