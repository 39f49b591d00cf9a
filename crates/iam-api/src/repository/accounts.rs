//! 계정 저장소.
//!
//! 계정 생성, 조회, 상태/역할/토큰 버전 갱신을 위한 데이터베이스 작업을
//! 처리합니다. 상태를 바꾸는 메서드는 모두 호출 측 트랜잭션 안에서
//! 실행되도록 `&mut PgConnection`을 받습니다.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgConnection, PgPool};
use uuid::Uuid;

use iam_core::domain::{Account, AccountStatus, Role};

use crate::auth::{AccountDirectory, AuthAccount};

/// accounts 테이블의 데이터베이스 표현.
///
/// role/status는 TEXT로 저장되며 도메인 enum으로 변환 시
/// 알 수 없는 값은 디코딩 에러로 처리합니다 (fail-closed).
#[derive(Debug, FromRow)]
struct AccountRow {
    id: Uuid,
    username: String,
    email: String,
    password_hash: String,
    role: String,
    status: String,
    token_version: i32,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl AccountRow {
    fn into_domain(self) -> Result<Account, sqlx::Error> {
        let role = Role::parse(&self.role).ok_or_else(|| decode_error("role", &self.role))?;
        let status =
            AccountStatus::parse(&self.status).ok_or_else(|| decode_error("status", &self.status))?;

        Ok(Account {
            id: self.id,
            username: self.username,
            email: self.email,
            password_hash: self.password_hash,
            role,
            status,
            token_version: self.token_version,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

/// 인증 파이프라인용 축소 row.
#[derive(Debug, FromRow)]
struct AuthRow {
    id: Uuid,
    role: String,
    status: String,
    token_version: i32,
}

fn decode_error(column: &str, value: &str) -> sqlx::Error {
    sqlx::Error::Decode(format!("알 수 없는 {} 값: {}", column, value).into())
}

/// 유일성 충돌 종류.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UniqueConflict {
    /// username 중복
    Username,
    /// email 중복
    Email,
}

const ACCOUNT_COLUMNS: &str =
    "id, username, email, password_hash, role, status, token_version, created_at, updated_at";

/// 계정 저장소.
pub struct AccountRepository;

impl AccountRepository {
    /// 새 계정 생성 (`pending` 상태, 기본 역할).
    ///
    /// username/email 유일성 위반은 sqlx 에러로 올라오며
    /// 호출 측이 [`crate::repository::unique_conflict`]로 분류합니다.
    pub async fn create(
        conn: &mut PgConnection,
        id: Uuid,
        username: &str,
        email: &str,
        password_hash: &str,
    ) -> Result<Account, sqlx::Error> {
        let row = sqlx::query_as::<_, AccountRow>(
            r#"
            INSERT INTO accounts (id, username, email, password_hash)
            VALUES ($1, $2, $3, $4)
            RETURNING id, username, email, password_hash, role, status,
                      token_version, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(username)
        .bind(email)
        .bind(password_hash)
        .fetch_one(conn)
        .await?;

        row.into_domain()
    }

    /// ID로 계정 조회 (삭제 포함).
    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Account>, sqlx::Error> {
        let row = sqlx::query_as::<_, AccountRow>(&format!(
            "SELECT {} FROM accounts WHERE id = $1",
            ACCOUNT_COLUMNS
        ))
        .bind(id)
        .fetch_optional(pool)
        .await?;

        row.map(AccountRow::into_domain).transpose()
    }

    /// username 또는 email로 비삭제 계정 조회.
    ///
    /// 이메일은 저장 시 소문자로 정규화되므로 소문자 변형으로도 비교합니다.
    pub async fn find_by_identifier(
        pool: &PgPool,
        identifier: &str,
    ) -> Result<Option<Account>, sqlx::Error> {
        let row = sqlx::query_as::<_, AccountRow>(&format!(
            r#"
            SELECT {}
            FROM accounts
            WHERE (username = $1 OR email = $2) AND status <> 'deleted'
            "#,
            ACCOUNT_COLUMNS
        ))
        .bind(identifier)
        .bind(identifier.to_lowercase())
        .fetch_optional(pool)
        .await?;

        row.map(AccountRow::into_domain).transpose()
    }

    /// email로 비삭제 계정 조회.
    pub async fn find_by_email(pool: &PgPool, email: &str) -> Result<Option<Account>, sqlx::Error> {
        let row = sqlx::query_as::<_, AccountRow>(&format!(
            "SELECT {} FROM accounts WHERE email = $1 AND status <> 'deleted'",
            ACCOUNT_COLUMNS
        ))
        .bind(email.to_lowercase())
        .fetch_optional(pool)
        .await?;

        row.map(AccountRow::into_domain).transpose()
    }

    /// 상태 전이를 위해 행 잠금과 함께 계정 조회.
    pub async fn find_for_update(
        conn: &mut PgConnection,
        id: Uuid,
    ) -> Result<Option<Account>, sqlx::Error> {
        let row = sqlx::query_as::<_, AccountRow>(&format!(
            "SELECT {} FROM accounts WHERE id = $1 FOR UPDATE",
            ACCOUNT_COLUMNS
        ))
        .bind(id)
        .fetch_optional(conn)
        .await?;

        row.map(AccountRow::into_domain).transpose()
    }

    /// 비삭제 계정 목록 조회 (생성 시간 오름차순).
    pub async fn list(
        pool: &PgPool,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Account>, sqlx::Error> {
        let rows = sqlx::query_as::<_, AccountRow>(&format!(
            r#"
            SELECT {}
            FROM accounts
            WHERE status <> 'deleted'
            ORDER BY created_at ASC
            LIMIT $1 OFFSET $2
            "#,
            ACCOUNT_COLUMNS
        ))
        .bind(limit)
        .bind(offset)
        .fetch_all(pool)
        .await?;

        rows.into_iter().map(AccountRow::into_domain).collect()
    }

    /// 계정 상태 갱신.
    pub async fn update_status(
        conn: &mut PgConnection,
        id: Uuid,
        status: AccountStatus,
    ) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE accounts SET status = $2, updated_at = now() WHERE id = $1")
            .bind(id)
            .bind(status.as_str())
            .execute(conn)
            .await?;
        Ok(())
    }

    /// 계정 역할 갱신.
    pub async fn update_role(
        conn: &mut PgConnection,
        id: Uuid,
        role: Role,
    ) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE accounts SET role = $2, updated_at = now() WHERE id = $1")
            .bind(id)
            .bind(role.as_str())
            .execute(conn)
            .await?;
        Ok(())
    }

    /// token_version 증가 - 발급된 모든 토큰을 한 번에 무효화.
    ///
    /// 갱신된 행이 있으면 `true`를 반환합니다.
    pub async fn bump_token_version(
        conn: &mut PgConnection,
        id: Uuid,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE accounts
            SET token_version = token_version + 1, updated_at = now()
            WHERE id = $1 AND status <> 'deleted'
            "#,
        )
        .bind(id)
        .execute(conn)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    /// 비밀번호 해시 교체 + token_version 증가 (기존 세션 전체 무효화).
    pub async fn update_password(
        conn: &mut PgConnection,
        id: Uuid,
        password_hash: &str,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            UPDATE accounts
            SET password_hash = $2, token_version = token_version + 1, updated_at = now()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(password_hash)
        .execute(conn)
        .await?;
        Ok(())
    }
}

#[async_trait]
impl AccountDirectory for PgPool {
    async fn find_for_auth(&self, account_id: Uuid) -> Result<Option<AuthAccount>, sqlx::Error> {
        let row = sqlx::query_as::<_, AuthRow>(
            "SELECT id, role, status, token_version FROM accounts WHERE id = $1",
        )
        .bind(account_id)
        .fetch_optional(self)
        .await?;

        row.map(|r| {
            let role = Role::parse(&r.role).ok_or_else(|| decode_error("role", &r.role))?;
            let status =
                AccountStatus::parse(&r.status).ok_or_else(|| decode_error("status", &r.status))?;
            Ok(AuthAccount {
                id: r.id,
                role,
                status,
                token_version: r.token_version,
            })
        })
        .transpose()
    }
}
