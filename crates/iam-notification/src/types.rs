//! 전달 타입 및 trait 정의.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use iam_core::domain::VerificationPurpose;

/// 전달 채널.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryChannel {
    /// 이메일
    Email,
    /// SMS
    Sms,
}

impl DeliveryChannel {
    /// 용도에 대응하는 기본 채널.
    ///
    /// 이메일 검증과 비밀번호 재설정은 이메일로,
    /// SMS 검증은 SMS로 전달합니다.
    pub fn for_purpose(purpose: VerificationPurpose) -> Self {
        match purpose {
            VerificationPurpose::Email | VerificationPurpose::PasswordReset => {
                DeliveryChannel::Email
            }
            VerificationPurpose::Sms => DeliveryChannel::Sms,
        }
    }
}

/// 전달할 검증 메시지.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerificationMessage {
    /// 수신자 (이메일 주소 또는 전화번호)
    pub recipient: String,
    /// 전달 채널
    pub channel: DeliveryChannel,
    /// 코드 용도
    pub purpose: VerificationPurpose,
    /// 검증 코드 값
    pub code: String,
    /// 코드 만료 시간
    pub expires_at: DateTime<Utc>,
}

/// 전달 작업용 Result 타입.
pub type DeliveryResult<T> = Result<T, DeliveryError>;

/// 전달 에러.
#[derive(Debug, thiserror::Error)]
pub enum DeliveryError {
    #[error("전송 실패: {0}")]
    SendFailed(String),

    #[error("잘못된 수신자: {0}")]
    InvalidRecipient(String),

    #[error("잘못된 설정: {0}")]
    InvalidConfig(String),
}

/// 검증 코드 전송기 trait.
///
/// 이메일/SMS 게이트웨이 구현이 이 trait 뒤에 연결됩니다.
#[async_trait]
pub trait VerificationSender: Send + Sync {
    /// 검증 메시지를 전송합니다.
    async fn send(&self, message: &VerificationMessage) -> DeliveryResult<()>;

    /// 전송기가 활성화되어 있는지 확인합니다.
    fn is_enabled(&self) -> bool;

    /// 전송기 이름을 반환합니다.
    fn name(&self) -> &str;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_for_purpose() {
        assert_eq!(
            DeliveryChannel::for_purpose(VerificationPurpose::Email),
            DeliveryChannel::Email
        );
        assert_eq!(
            DeliveryChannel::for_purpose(VerificationPurpose::PasswordReset),
            DeliveryChannel::Email
        );
        assert_eq!(
            DeliveryChannel::for_purpose(VerificationPurpose::Sms),
            DeliveryChannel::Sms
        );
    }
}
