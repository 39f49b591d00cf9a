//! Repository pattern for database operations.
//!
//! 데이터베이스 접근 로직을 서비스 계층에서 분리하여 관리합니다.
//! 모든 Repository는 static methods 패턴을 사용하며, 트랜잭션에
//! 참여하는 메서드는 `&mut PgConnection`을, 단건 조회는 `&PgPool`을
//! 받습니다.

pub mod accounts;
pub mod verification_codes;

pub use accounts::{AccountRepository, UniqueConflict};
pub use verification_codes::VerificationCodeRepository;

/// 유일성 제약 위반 여부 판별 후 충돌 종류 반환.
///
/// PostgreSQL은 unique index 위반 시 에러의 constraint 필드에
/// 인덱스 이름을 담아 보고합니다. 마이그레이션의 인덱스 이름과
/// 여기의 매핑은 함께 유지되어야 합니다.
pub fn unique_conflict(err: &sqlx::Error) -> Option<UniqueConflict> {
    let db = err.as_database_error()?;
    if !db.is_unique_violation() {
        return None;
    }

    match db.constraint() {
        Some("accounts_username_live_idx") => Some(UniqueConflict::Username),
        Some("accounts_email_live_idx") => Some(UniqueConflict::Email),
        _ => None,
    }
}

/// 일시적(재시도 가능) 저장소 에러인지 확인.
///
/// serialization failure(40001)와 deadlock(40P01)은 한 번 재시도합니다.
pub fn is_transient(err: &sqlx::Error) -> bool {
    err.as_database_error()
        .and_then(|db| db.code())
        .map(|code| code == "40001" || code == "40P01")
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_non_database_errors_are_not_conflicts() {
        assert!(unique_conflict(&sqlx::Error::PoolClosed).is_none());
        assert!(unique_conflict(&sqlx::Error::RowNotFound).is_none());
    }

    #[test]
    fn test_non_database_errors_are_not_transient() {
        assert!(!is_transient(&sqlx::Error::PoolClosed));
        assert!(!is_transient(&sqlx::Error::RowNotFound));
    }
}
