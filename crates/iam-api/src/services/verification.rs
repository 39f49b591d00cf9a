//! 검증 코드 워크플로우.
//!
//! (계정, 용도) 쌍별 상태 머신 `none -> issued -> consumed`
//! (또는 `issued -> expired`, 상환 시점에 lazy 판정)을 구현합니다.
//!
//! 발급은 기존 미소비 코드를 교체하며(누적 아님), 같은 쌍에 대한
//! 재발급은 저장소에 기록된 마지막 발급 시간 기준 쿨다운을 따릅니다.
//! 전달(이메일/SMS)은 커밋 이후에 수행되고, 전달 실패는 발급을
//! 롤백하지 않습니다.

use std::sync::Arc;

use chrono::{Duration, Utc};
use rand::{rngs::OsRng, Rng};
use sqlx::{PgConnection, PgPool};
use tracing::warn;
use uuid::Uuid;

use iam_core::config::VerificationConfig;
use iam_core::domain::{VerificationCode, VerificationPurpose};
use iam_notification::{DeliveryChannel, VerificationMessage, VerificationSender};

use crate::repository::VerificationCodeRepository;

/// 검증 워크플로우 에러.
#[derive(Debug, thiserror::Error)]
pub enum VerificationError {
    #[error("검증 코드를 찾을 수 없습니다")]
    NotFound,
    #[error("검증 코드가 만료되었습니다")]
    Expired,
    #[error("이미 사용된 검증 코드입니다")]
    AlreadyConsumed,
    #[error("검증 코드가 일치하지 않습니다")]
    Mismatch,
    #[error("재발급 한도 초과: {retry_after_secs}초 후 다시 시도하세요")]
    RateLimited { retry_after_secs: i64 },
    #[error("저장소 에러: {0}")]
    Storage(#[from] sqlx::Error),
}

/// 고정 길이 숫자 코드 생성.
///
/// OS 난수원(`OsRng`)을 사용합니다.
pub(crate) fn generate_code(length: usize) -> String {
    let mut rng = OsRng;
    (0..length)
        .map(|_| char::from(b'0' + rng.gen_range(0..10u8)))
        .collect()
}

/// 검증 코드 워크플로우.
#[derive(Clone)]
pub struct VerificationService {
    pool: PgPool,
    config: VerificationConfig,
    sender: Arc<dyn VerificationSender>,
}

impl VerificationService {
    /// 새 워크플로우 생성.
    pub fn new(
        pool: PgPool,
        config: VerificationConfig,
        sender: Arc<dyn VerificationSender>,
    ) -> Self {
        Self {
            pool,
            config,
            sender,
        }
    }

    /// 호출 측 트랜잭션 안에서 코드 발급.
    ///
    /// 쿨다운 검사와 기존 미소비 코드 교체를 포함합니다.
    /// 전달은 포함하지 않으므로 커밋 후 [`Self::deliver`]를 호출해야 합니다.
    pub async fn issue_in_tx(
        &self,
        conn: &mut PgConnection,
        account_id: Uuid,
        purpose: VerificationPurpose,
    ) -> Result<VerificationCode, VerificationError> {
        let now = Utc::now();

        // 마지막 발급 시간 기준 쿨다운 (소비 여부와 무관)
        if let Some(latest) =
            VerificationCodeRepository::find_latest_for_update(conn, account_id, purpose).await?
        {
            let elapsed = (now - latest.created_at).num_seconds();
            if elapsed < self.config.cooldown_secs {
                return Err(VerificationError::RateLimited {
                    retry_after_secs: self.config.cooldown_secs - elapsed,
                });
            }
        }

        // 기존 미소비 코드는 교체 (누적 금지)
        VerificationCodeRepository::delete_live(conn, account_id, purpose).await?;

        let code = VerificationCode {
            id: Uuid::new_v4(),
            account_id,
            purpose,
            code: generate_code(self.config.code_length),
            expires_at: now + Duration::seconds(self.config.validity_secs),
            consumed: false,
            created_at: now,
        };

        // 같은 쌍의 최초 발급이 경합하면 한쪽이 live index 위반으로 지는데,
        // 이는 쿨다운 위반과 동일하게 취급한다
        if let Err(e) = VerificationCodeRepository::insert(conn, &code).await {
            let live_index_violation = e
                .as_database_error()
                .map(|db| db.constraint() == Some("verification_codes_live_idx"))
                .unwrap_or(false);
            if live_index_violation {
                return Err(VerificationError::RateLimited {
                    retry_after_secs: self.config.cooldown_secs,
                });
            }
            return Err(e.into());
        }

        Ok(code)
    }

    /// 코드 발급 (자체 트랜잭션) 후 전달.
    pub async fn issue(
        &self,
        account_id: Uuid,
        purpose: VerificationPurpose,
        recipient: &str,
    ) -> Result<VerificationCode, VerificationError> {
        let mut tx = self.pool.begin().await?;
        let code = self.issue_in_tx(&mut tx, account_id, purpose).await?;
        tx.commit().await?;

        self.deliver(recipient, &code).await;
        Ok(code)
    }

    /// 커밋된 코드를 수신자에게 전달.
    ///
    /// 전달 실패는 경고 로그만 남깁니다. 코드는 유효하게 남아 있으며
    /// 재전송 경로가 발급을 재사용합니다.
    pub async fn deliver(&self, recipient: &str, code: &VerificationCode) {
        let message = VerificationMessage {
            recipient: recipient.to_string(),
            channel: DeliveryChannel::for_purpose(code.purpose),
            purpose: code.purpose,
            code: code.code.clone(),
            expires_at: code.expires_at,
        };

        if let Err(e) = self.sender.send(&message).await {
            warn!(
                account_id = %code.account_id,
                purpose = %code.purpose,
                sender = self.sender.name(),
                error = %e,
                "Verification delivery failed; code remains redeemable"
            );
        }
    }

    /// 호출 측 트랜잭션 안에서 코드 상환.
    ///
    /// 행 잠금 하에서 존재 -> 만료 -> 소비 여부 -> 일치 순으로 검사하고
    /// 같은 트랜잭션에서 소비 처리합니다. 경쟁하는 상환 시도는 정확히
    /// 하나만 성공하며 패자는 `AlreadyConsumed`를 받습니다.
    pub async fn redeem_in_tx(
        &self,
        conn: &mut PgConnection,
        account_id: Uuid,
        purpose: VerificationPurpose,
        supplied: &str,
    ) -> Result<(), VerificationError> {
        let code =
            VerificationCodeRepository::find_latest_for_update(conn, account_id, purpose)
                .await?
                .ok_or(VerificationError::NotFound)?;

        if code.is_expired() {
            return Err(VerificationError::Expired);
        }
        if code.consumed {
            return Err(VerificationError::AlreadyConsumed);
        }
        if code.code != supplied {
            return Err(VerificationError::Mismatch);
        }

        if !VerificationCodeRepository::mark_consumed(conn, code.id).await? {
            return Err(VerificationError::AlreadyConsumed);
        }

        Ok(())
    }
}
