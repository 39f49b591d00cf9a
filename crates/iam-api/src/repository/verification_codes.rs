//! 검증 코드 저장소.
//!
//! (계정, 용도) 쌍의 살아있는 코드 조회/교체/소비를 처리합니다.
//! 상환 경합은 행 잠금(`FOR UPDATE`)으로 해소하므로 모든 메서드는
//! 호출 측 트랜잭션 안에서 실행됩니다.

use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgConnection};
use uuid::Uuid;

use iam_core::domain::{VerificationCode, VerificationPurpose};

/// verification_codes 테이블의 데이터베이스 표현.
#[derive(Debug, FromRow)]
struct CodeRow {
    id: Uuid,
    account_id: Uuid,
    purpose: String,
    code: String,
    expires_at: DateTime<Utc>,
    consumed: bool,
    created_at: DateTime<Utc>,
}

impl CodeRow {
    fn into_domain(self) -> Result<VerificationCode, sqlx::Error> {
        let purpose = VerificationPurpose::parse(&self.purpose).ok_or_else(|| {
            sqlx::Error::Decode(format!("알 수 없는 purpose 값: {}", self.purpose).into())
        })?;

        Ok(VerificationCode {
            id: self.id,
            account_id: self.account_id,
            purpose,
            code: self.code,
            expires_at: self.expires_at,
            consumed: self.consumed,
            created_at: self.created_at,
        })
    }
}

/// 검증 코드 저장소.
pub struct VerificationCodeRepository;

impl VerificationCodeRepository {
    /// (계정, 용도) 쌍의 가장 최근 코드를 행 잠금과 함께 조회.
    ///
    /// 소비된 행도 포함해 최신 1건을 반환합니다. 경쟁하는 상환 시도 중
    /// 패자가 `AlreadyConsumed`를 구분해 받을 수 있어야 하기 때문입니다.
    pub async fn find_latest_for_update(
        conn: &mut PgConnection,
        account_id: Uuid,
        purpose: VerificationPurpose,
    ) -> Result<Option<VerificationCode>, sqlx::Error> {
        let row = sqlx::query_as::<_, CodeRow>(
            r#"
            SELECT id, account_id, purpose, code, expires_at, consumed, created_at
            FROM verification_codes
            WHERE account_id = $1 AND purpose = $2
            ORDER BY created_at DESC
            LIMIT 1
            FOR UPDATE
            "#,
        )
        .bind(account_id)
        .bind(purpose.as_str())
        .fetch_optional(conn)
        .await?;

        row.map(CodeRow::into_domain).transpose()
    }

    /// 미소비 코드를 행 잠금과 함께 조회 (발급 시 쿨다운/교체 판정용).
    pub async fn find_live_for_update(
        conn: &mut PgConnection,
        account_id: Uuid,
        purpose: VerificationPurpose,
    ) -> Result<Option<VerificationCode>, sqlx::Error> {
        let row = sqlx::query_as::<_, CodeRow>(
            r#"
            SELECT id, account_id, purpose, code, expires_at, consumed, created_at
            FROM verification_codes
            WHERE account_id = $1 AND purpose = $2 AND NOT consumed
            FOR UPDATE
            "#,
        )
        .bind(account_id)
        .bind(purpose.as_str())
        .fetch_optional(conn)
        .await?;

        row.map(CodeRow::into_domain).transpose()
    }

    /// 새 코드 삽입.
    ///
    /// 같은 쌍의 미소비 코드가 남아 있으면 partial unique index 위반으로
    /// 실패하므로, 호출 측은 먼저 [`Self::delete_live`]로 교체해야 합니다.
    pub async fn insert(
        conn: &mut PgConnection,
        code: &VerificationCode,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO verification_codes
                (id, account_id, purpose, code, expires_at, consumed, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(code.id)
        .bind(code.account_id)
        .bind(code.purpose.as_str())
        .bind(&code.code)
        .bind(code.expires_at)
        .bind(code.consumed)
        .bind(code.created_at)
        .execute(conn)
        .await?;
        Ok(())
    }

    /// (계정, 용도) 쌍의 미소비 코드 삭제 (교체용).
    pub async fn delete_live(
        conn: &mut PgConnection,
        account_id: Uuid,
        purpose: VerificationPurpose,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            "DELETE FROM verification_codes WHERE account_id = $1 AND purpose = $2 AND NOT consumed",
        )
        .bind(account_id)
        .bind(purpose.as_str())
        .execute(conn)
        .await?;

        Ok(result.rows_affected())
    }

    /// 계정의 모든 미소비 코드 삭제 (계정 삭제 시).
    pub async fn delete_live_for_account(
        conn: &mut PgConnection,
        account_id: Uuid,
    ) -> Result<u64, sqlx::Error> {
        let result =
            sqlx::query("DELETE FROM verification_codes WHERE account_id = $1 AND NOT consumed")
                .bind(account_id)
                .execute(conn)
                .await?;

        Ok(result.rows_affected())
    }

    /// 코드 소비 처리.
    ///
    /// 이미 소비된 행이면 `false`를 반환합니다.
    pub async fn mark_consumed(conn: &mut PgConnection, id: Uuid) -> Result<bool, sqlx::Error> {
        let result =
            sqlx::query("UPDATE verification_codes SET consumed = TRUE WHERE id = $1 AND NOT consumed")
                .bind(id)
                .execute(conn)
                .await?;

        Ok(result.rows_affected() == 1)
    }
}
