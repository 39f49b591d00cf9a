//! 계정 라이프사이클 서비스.
//!
//! 계정 상태 머신과 여러 단계로 이루어진 변경 작업을 소유합니다.
//! 모든 다단계 변경(가입+코드 발급, 활성화+상환, 역할 변경, 상태 전이,
//! 비밀번호 재설정)은 하나의 트랜잭션으로 실행됩니다. 어느 단계든
//! 실패하면 아무것도 저장되지 않으며, 중간 상태는 외부에서 관찰될 수
//! 없습니다. 일시적 저장소 실패(직렬화 실패, 데드락)는 한 번 재시도합니다.

use sqlx::PgPool;
use tracing::{error, info};
use uuid::Uuid;

use iam_core::config::AuthConfig;
use iam_core::domain::{Account, AccountStatus, AccountSummary, Role, VerificationCode, VerificationPurpose};

use crate::auth::{create_token, hash_password, validate_password_strength, verify_password, Claims};
use crate::repository::{
    is_transient, unique_conflict, AccountRepository, UniqueConflict, VerificationCodeRepository,
};
use crate::services::verification::{VerificationError, VerificationService};

/// 로그인/갱신 성공 시 발급되는 토큰.
#[derive(Debug, Clone, serde::Serialize, utoipa::ToSchema)]
pub struct TokenGrant {
    /// Access Token (JWT)
    pub access_token: String,
    /// 토큰 타입 (항상 "Bearer")
    pub token_type: String,
    /// 만료까지 남은 시간 (초)
    pub expires_in: i64,
}

/// 가입 에러.
#[derive(Debug, thiserror::Error)]
pub enum RegisterError {
    #[error("이미 사용 중인 사용자 이름입니다")]
    UsernameTaken,
    #[error("이미 사용 중인 이메일입니다")]
    EmailTaken,
    #[error("{0}")]
    WeakPassword(String),
    #[error("내부 에러")]
    Internal,
    #[error("저장소 에러: {0}")]
    Storage(#[from] sqlx::Error),
}

impl RegisterError {
    fn is_transient(&self) -> bool {
        matches!(self, RegisterError::Storage(e) if is_transient(e))
    }
}

impl From<VerificationError> for RegisterError {
    fn from(err: VerificationError) -> Self {
        match err {
            VerificationError::Storage(e) => RegisterError::Storage(e),
            // 방금 만든 계정에는 기존 코드가 없으므로 그 외 변형은 도달 불가
            other => RegisterError::Storage(sqlx::Error::Protocol(other.to_string())),
        }
    }
}

/// 활성화 에러.
#[derive(Debug, thiserror::Error)]
pub enum ActivateError {
    #[error(transparent)]
    Verification(#[from] VerificationError),
    #[error("활성화할 수 없는 계정 상태입니다")]
    InvalidTransition,
    #[error("저장소 에러: {0}")]
    Storage(#[from] sqlx::Error),
}

impl ActivateError {
    fn is_transient(&self) -> bool {
        match self {
            ActivateError::Storage(e) => is_transient(e),
            ActivateError::Verification(VerificationError::Storage(e)) => is_transient(e),
            _ => false,
        }
    }
}

/// 로그인/토큰 발급 에러.
#[derive(Debug, thiserror::Error)]
pub enum LoginError {
    #[error("아이디 또는 비밀번호가 올바르지 않습니다")]
    InvalidCredentials,
    #[error("활성 상태의 계정이 아닙니다")]
    AccountNotActive,
    #[error("내부 에러")]
    Internal,
    #[error("저장소 에러: {0}")]
    Storage(#[from] sqlx::Error),
}

/// 역할 변경 에러.
#[derive(Debug, thiserror::Error)]
pub enum RoleChangeError {
    #[error("역할을 변경할 권한이 없습니다")]
    Forbidden,
    #[error("계정을 찾을 수 없습니다")]
    NotFound,
    #[error("저장소 에러: {0}")]
    Storage(#[from] sqlx::Error),
}

impl RoleChangeError {
    fn is_transient(&self) -> bool {
        matches!(self, RoleChangeError::Storage(e) if is_transient(e))
    }
}

/// 상태 전이 에러.
#[derive(Debug, thiserror::Error)]
pub enum TransitionError {
    #[error("허용되지 않는 상태 전이입니다")]
    InvalidTransition,
    #[error("계정을 찾을 수 없습니다")]
    NotFound,
    #[error("저장소 에러: {0}")]
    Storage(#[from] sqlx::Error),
}

impl TransitionError {
    fn is_transient(&self) -> bool {
        matches!(self, TransitionError::Storage(e) if is_transient(e))
    }
}

/// 비밀번호 재설정 에러.
#[derive(Debug, thiserror::Error)]
pub enum PasswordResetError {
    #[error(transparent)]
    Verification(#[from] VerificationError),
    #[error("{0}")]
    WeakPassword(String),
    #[error("내부 에러")]
    Internal,
    #[error("저장소 에러: {0}")]
    Storage(#[from] sqlx::Error),
}

/// 계정 라이프사이클 서비스.
#[derive(Clone)]
pub struct AccountService {
    pool: PgPool,
    auth: AuthConfig,
    verification: VerificationService,
}

impl AccountService {
    /// 새 서비스 생성.
    pub fn new(pool: PgPool, auth: AuthConfig, verification: VerificationService) -> Self {
        Self {
            pool,
            auth,
            verification,
        }
    }

    /// 계정 가입.
    ///
    /// 비밀번호 강도 검사, 해싱, `pending` 계정 생성, 이메일 검증 코드
    /// 발급까지 하나의 트랜잭션으로 수행합니다. 코드 전달은 커밋 이후에
    /// 일어나며 실패해도 가입은 유지됩니다.
    pub async fn register(
        &self,
        username: &str,
        email: &str,
        password: &str,
    ) -> Result<Account, RegisterError> {
        validate_password_strength(password)
            .map_err(|msg| RegisterError::WeakPassword(msg.to_string()))?;

        let username = username.trim().to_string();
        let email = email.trim().to_lowercase();

        // 해싱은 느린 연산이므로 트랜잭션 밖에서 수행
        let password_hash = hash_password(password).map_err(|e| {
            error!(error = %e, "Password hashing failed");
            RegisterError::Internal
        })?;

        let (account, code) = match self.register_once(&username, &email, &password_hash).await {
            Err(e) if e.is_transient() => {
                self.register_once(&username, &email, &password_hash).await?
            }
            other => other?,
        };

        self.verification.deliver(&account.email, &code).await;
        info!(account_id = %account.id, username = %account.username, "Account registered");

        Ok(account)
    }

    async fn register_once(
        &self,
        username: &str,
        email: &str,
        password_hash: &str,
    ) -> Result<(Account, VerificationCode), RegisterError> {
        let mut tx = self.pool.begin().await?;

        let account =
            AccountRepository::create(&mut tx, Uuid::new_v4(), username, email, password_hash)
                .await
                .map_err(|e| match unique_conflict(&e) {
                    Some(UniqueConflict::Username) => RegisterError::UsernameTaken,
                    Some(UniqueConflict::Email) => RegisterError::EmailTaken,
                    None => RegisterError::Storage(e),
                })?;

        let code = self
            .verification
            .issue_in_tx(&mut tx, account.id, VerificationPurpose::Email)
            .await?;

        tx.commit().await?;
        Ok((account, code))
    }

    /// 이메일 검증 코드로 계정 활성화.
    ///
    /// 코드 상환과 `pending -> active` 전이를 같은 트랜잭션으로 수행합니다.
    pub async fn activate(&self, email: &str, code: &str) -> Result<Account, ActivateError> {
        // 존재하지 않는 계정은 코드 불일치와 구분되지 않아야 함
        let account = AccountRepository::find_by_email(&self.pool, email)
            .await?
            .ok_or(ActivateError::Verification(VerificationError::NotFound))?;

        match self.activate_once(account.id, code).await {
            Err(e) if e.is_transient() => self.activate_once(account.id, code).await,
            other => other,
        }
    }

    async fn activate_once(
        &self,
        account_id: Uuid,
        code: &str,
    ) -> Result<Account, ActivateError> {
        let mut tx = self.pool.begin().await?;

        let account = AccountRepository::find_for_update(&mut tx, account_id)
            .await?
            .ok_or(ActivateError::Verification(VerificationError::NotFound))?;

        self.verification
            .redeem_in_tx(&mut tx, account.id, VerificationPurpose::Email, code)
            .await?;

        if !account.status.can_transition(AccountStatus::Active) {
            return Err(ActivateError::InvalidTransition);
        }
        AccountRepository::update_status(&mut tx, account.id, AccountStatus::Active).await?;

        tx.commit().await?;
        info!(account_id = %account.id, "Account activated");

        Ok(Account {
            status: AccountStatus::Active,
            ..account
        })
    }

    /// 로그인.
    ///
    /// username 또는 email로 조회하며, 존재하지 않는 계정과 잘못된
    /// 비밀번호는 같은 `InvalidCredentials`로 응답합니다 (계정 열거 방지).
    pub async fn login(&self, identifier: &str, password: &str) -> Result<TokenGrant, LoginError> {
        let account = AccountRepository::find_by_identifier(&self.pool, identifier.trim()).await?;

        let Some(account) = account else {
            // 응답 시간으로 계정 존재가 드러나지 않도록 해시 비용을 동일하게 소모
            let _ = hash_password(password);
            return Err(LoginError::InvalidCredentials);
        };

        if verify_password(password, &account.password_hash).is_err() {
            return Err(LoginError::InvalidCredentials);
        }

        if account.status != AccountStatus::Active {
            return Err(LoginError::AccountNotActive);
        }

        self.grant_token(&account)
    }

    /// 유효한 토큰을 가진 계정에 새 토큰 발급.
    ///
    /// 인증 파이프라인 통과 후 호출되며, 현재 역할과 token_version으로
    /// 재발급합니다.
    pub async fn refresh(&self, account_id: Uuid) -> Result<TokenGrant, LoginError> {
        let account = AccountRepository::find_by_id(&self.pool, account_id)
            .await?
            .ok_or(LoginError::InvalidCredentials)?;

        if account.status != AccountStatus::Active {
            return Err(LoginError::AccountNotActive);
        }

        self.grant_token(&account)
    }

    fn grant_token(&self, account: &Account) -> Result<TokenGrant, LoginError> {
        let claims = Claims::new(
            account.id,
            account.role,
            account.token_version,
            self.auth.token_ttl_minutes,
        );
        let access_token = create_token(&claims, &self.auth.jwt_secret).map_err(|e| {
            error!(account_id = %account.id, error = %e, "Token issuance failed");
            LoginError::Internal
        })?;

        Ok(TokenGrant {
            access_token,
            token_type: "Bearer".to_string(),
            expires_in: self.auth.token_ttl_minutes * 60,
        })
    }

    /// 역할 변경.
    ///
    /// 행위자가 대상의 현재 역할과 요청 역할 모두를 엄격히 상회할 때만
    /// 허용하며, 거부 시 아무것도 변경하지 않습니다 (fail-closed).
    pub async fn change_role(
        &self,
        actor_role: Role,
        target_id: Uuid,
        requested: Role,
    ) -> Result<AccountSummary, RoleChangeError> {
        match self.change_role_once(actor_role, target_id, requested).await {
            Err(e) if e.is_transient() => {
                self.change_role_once(actor_role, target_id, requested).await
            }
            other => other,
        }
    }

    async fn change_role_once(
        &self,
        actor_role: Role,
        target_id: Uuid,
        requested: Role,
    ) -> Result<AccountSummary, RoleChangeError> {
        let mut tx = self.pool.begin().await?;

        let target = AccountRepository::find_for_update(&mut tx, target_id)
            .await?
            .ok_or(RoleChangeError::NotFound)?;
        if target.status == AccountStatus::Deleted {
            return Err(RoleChangeError::NotFound);
        }

        if !Role::can_assign(actor_role, target.role, requested) {
            return Err(RoleChangeError::Forbidden);
        }

        AccountRepository::update_role(&mut tx, target.id, requested).await?;
        tx.commit().await?;

        info!(
            target_id = %target.id,
            from = %target.role,
            to = %requested,
            "Account role changed"
        );

        Ok(AccountSummary {
            role: requested,
            ..AccountSummary::from(&target)
        })
    }

    /// 계정의 모든 세션 무효화.
    ///
    /// token_version을 원자적으로 증가시킵니다. 발급된 토큰을 열거하지
    /// 않고도 다음 검증 시점부터 모두 `TokenRevoked`가 됩니다.
    pub async fn revoke_sessions(&self, account_id: Uuid) -> Result<(), TransitionError> {
        let mut conn = self.pool.acquire().await?;
        if !AccountRepository::bump_token_version(&mut conn, account_id).await? {
            return Err(TransitionError::NotFound);
        }

        info!(account_id = %account_id, "All sessions revoked");
        Ok(())
    }

    /// 계정 정지 (`active -> suspended`).
    pub async fn suspend(&self, account_id: Uuid) -> Result<AccountSummary, TransitionError> {
        self.transition(account_id, AccountStatus::Suspended).await
    }

    /// 계정 정지 해제 (`suspended -> active`).
    pub async fn reactivate(&self, account_id: Uuid) -> Result<AccountSummary, TransitionError> {
        self.transition(account_id, AccountStatus::Active).await
    }

    /// 계정 삭제 (종결 상태, 복구 불가).
    ///
    /// 미소비 검증 코드는 같은 트랜잭션에서 함께 제거됩니다
    /// (코드 수명은 계정 수명에 묶임).
    pub async fn delete(&self, account_id: Uuid) -> Result<AccountSummary, TransitionError> {
        self.transition(account_id, AccountStatus::Deleted).await
    }

    async fn transition(
        &self,
        account_id: Uuid,
        to: AccountStatus,
    ) -> Result<AccountSummary, TransitionError> {
        match self.transition_once(account_id, to).await {
            Err(e) if e.is_transient() => self.transition_once(account_id, to).await,
            other => other,
        }
    }

    async fn transition_once(
        &self,
        account_id: Uuid,
        to: AccountStatus,
    ) -> Result<AccountSummary, TransitionError> {
        let mut tx = self.pool.begin().await?;

        let account = AccountRepository::find_for_update(&mut tx, account_id)
            .await?
            .ok_or(TransitionError::NotFound)?;

        if !account.status.can_transition(to) {
            return Err(TransitionError::InvalidTransition);
        }

        AccountRepository::update_status(&mut tx, account.id, to).await?;
        if to == AccountStatus::Deleted {
            VerificationCodeRepository::delete_live_for_account(&mut tx, account.id).await?;
        }

        tx.commit().await?;
        info!(account_id = %account.id, from = %account.status, to = %to, "Account status changed");

        Ok(AccountSummary {
            status: to,
            ..AccountSummary::from(&account)
        })
    }

    /// 비밀번호 재설정 코드 발급 요청.
    ///
    /// 계정 존재 여부와 무관하게 호출 측 응답은 동일해야 하므로,
    /// 계정이 없으면 조용히 성공으로 처리합니다.
    pub async fn request_password_reset(&self, email: &str) -> Result<(), VerificationError> {
        let Some(account) = AccountRepository::find_by_email(&self.pool, email).await? else {
            info!("Password reset requested for unknown email");
            return Ok(());
        };

        self.verification
            .issue(account.id, VerificationPurpose::PasswordReset, &account.email)
            .await?;
        Ok(())
    }

    /// 재설정 코드 상환 후 비밀번호 교체.
    ///
    /// 상환, 해시 교체, token_version 증가(기존 세션 전체 무효화)를
    /// 하나의 트랜잭션으로 수행합니다.
    pub async fn confirm_password_reset(
        &self,
        email: &str,
        code: &str,
        new_password: &str,
    ) -> Result<(), PasswordResetError> {
        validate_password_strength(new_password)
            .map_err(|msg| PasswordResetError::WeakPassword(msg.to_string()))?;

        let account = AccountRepository::find_by_email(&self.pool, email)
            .await?
            .ok_or(PasswordResetError::Verification(VerificationError::NotFound))?;

        let password_hash = hash_password(new_password).map_err(|e| {
            error!(error = %e, "Password hashing failed");
            PasswordResetError::Internal
        })?;

        let mut tx = self.pool.begin().await?;

        AccountRepository::find_for_update(&mut tx, account.id)
            .await?
            .ok_or(PasswordResetError::Verification(VerificationError::NotFound))?;

        self.verification
            .redeem_in_tx(&mut tx, account.id, VerificationPurpose::PasswordReset, code)
            .await?;
        AccountRepository::update_password(&mut tx, account.id, &password_hash).await?;

        tx.commit().await?;
        info!(account_id = %account.id, "Password reset completed");
        Ok(())
    }

    /// 이메일 검증 코드 재전송.
    ///
    /// `pending` 계정에만 새 코드를 발급하며, 그 외에는 조용히 성공으로
    /// 처리합니다 (계정 존재/상태 노출 방지). 쿨다운은 발급 경로와 동일하게
    /// 적용됩니다.
    pub async fn resend_verification(&self, email: &str) -> Result<(), VerificationError> {
        let Some(account) = AccountRepository::find_by_email(&self.pool, email).await? else {
            return Ok(());
        };
        if account.status != AccountStatus::Pending {
            return Ok(());
        }

        self.verification
            .issue(account.id, VerificationPurpose::Email, &account.email)
            .await?;
        Ok(())
    }

    /// 비삭제 계정 목록 조회.
    pub async fn list_accounts(
        &self,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<AccountSummary>, sqlx::Error> {
        let accounts = AccountRepository::list(&self.pool, limit, offset).await?;
        Ok(accounts.iter().map(AccountSummary::from).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn sample_account(role: Role, status: AccountStatus) -> Account {
        Account {
            id: Uuid::new_v4(),
            username: "alice".to_string(),
            email: "a@x.com".to_string(),
            password_hash: "$argon2id$...".to_string(),
            role,
            status,
            token_version: 1,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_token_grant_carries_current_role_and_version() {
        let config = AuthConfig::default();
        let service = AccountService {
            pool: PgPool::connect_lazy("postgres://localhost/unused").unwrap(),
            auth: config.clone(),
            verification: VerificationService::new(
                PgPool::connect_lazy("postgres://localhost/unused").unwrap(),
                iam_core::config::VerificationConfig::default(),
                std::sync::Arc::new(iam_notification::LogSender::new()),
            ),
        };

        let mut account = sample_account(Role::Moderator, AccountStatus::Active);
        account.token_version = 7;

        let grant = service.grant_token(&account).unwrap();
        assert_eq!(grant.token_type, "Bearer");
        assert_eq!(grant.expires_in, config.token_ttl_minutes * 60);

        let decoded =
            crate::auth::decode_token(&grant.access_token, &config.jwt_secret).unwrap();
        assert_eq!(decoded.claims.tv, 7);
        assert_eq!(decoded.claims.role, Role::Moderator);
        assert_eq!(decoded.claims.account_id(), Some(account.id));
    }

    #[test]
    fn test_register_error_from_verification_storage() {
        let err = RegisterError::from(VerificationError::Storage(sqlx::Error::PoolClosed));
        assert!(matches!(err, RegisterError::Storage(_)));
    }
}
