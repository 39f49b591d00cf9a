//! 인증 및 권한 부여.
//!
//! JWT 기반 인증, Argon2 비밀번호 처리, 요청 인증 파이프라인을 제공합니다.
//!
//! # 구성 요소
//!
//! - [`Claims`]: JWT 페이로드 (역할 + token_version 포함)
//! - [`AuthPipeline`]: 순서가 명시된 요청 인증 파이프라인
//! - [`RequireAuth`] / [`RequireAdmin`]: Axum 추출기
//! - 비밀번호 해싱/검증/강도 검사 함수
//!
//! 역할 계층 자체는 `iam_core::domain::Role`에 정의되어 있습니다.

mod jwt;
mod password;
mod pipeline;

pub use jwt::{create_token, decode_token, Claims, TokenError};
pub use password::{
    hash_password, validate_password_strength, verify_password, PasswordError,
};
pub use pipeline::{
    AccountDirectory, AuthAccount, AuthContext, AuthFailure, AuthPipeline, RequireAdmin,
    RequireAuth,
};
