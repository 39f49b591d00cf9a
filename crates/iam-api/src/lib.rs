//! 계정/인증 REST API 서버.
//!
//! 이 크레이트는 다음을 제공합니다:
//! - Axum 기반 REST API
//! - JWT 인증 및 역할 기반 접근 제어
//! - 트랜잭션 기반 계정 라이프사이클 관리
//! - 검증 코드 워크플로우 (이메일/SMS)
//! - 헬스 체크 엔드포인트
//!
//! # 모듈 구성
//!
//! - [`state`]: 애플리케이션 공유 상태 (AppState)
//! - [`routes`]: REST API 엔드포인트
//! - [`auth`]: JWT, 비밀번호 처리, 인증 파이프라인
//! - [`services`]: 계정 라이프사이클 / 검증 워크플로우
//! - [`repository`]: 데이터베이스 접근 계층
//! - [`openapi`]: OpenAPI 문서 및 Swagger UI

pub mod auth;
pub mod error;
pub mod openapi;
pub mod repository;
pub mod routes;
pub mod services;
pub mod state;

pub use auth::{
    create_token, decode_token, hash_password, verify_password, AuthContext, AuthFailure,
    AuthPipeline, Claims, RequireAdmin, RequireAuth,
};
pub use error::{ApiErrorResponse, ApiResult};
pub use routes::create_api_router;
pub use services::{AccountService, TokenGrant, VerificationService};
pub use state::AppState;
