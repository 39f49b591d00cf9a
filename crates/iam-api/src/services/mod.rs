//! 서비스 계층.
//!
//! 계정 라이프사이클과 검증 워크플로우를 제공합니다.
//! 라우트 핸들러는 이 계층만 호출하며, 저장소 접근과 트랜잭션 경계는
//! 서비스가 소유합니다.

pub mod accounts;
pub mod verification;

pub use accounts::{
    AccountService, ActivateError, LoginError, PasswordResetError, RegisterError, RoleChangeError,
    TokenGrant, TransitionError,
};
pub use verification::{VerificationError, VerificationService};
