//! 로그 기반 전송기.
//!
//! 개발/테스트 환경용 전송기로, 코드를 실제로 전송하는 대신
//! tracing 로그로 기록합니다. 코드 값 자체는 로그에 남기지 않습니다.

use async_trait::async_trait;
use tracing::info;

use crate::types::{DeliveryResult, VerificationMessage, VerificationSender};

/// tracing 로그로 기록하는 전송기.
#[derive(Debug, Clone, Default)]
pub struct LogSender {
    enabled: bool,
}

impl LogSender {
    /// 새 로그 전송기를 생성합니다.
    pub fn new() -> Self {
        Self { enabled: true }
    }
}

#[async_trait]
impl VerificationSender for LogSender {
    async fn send(&self, message: &VerificationMessage) -> DeliveryResult<()> {
        info!(
            recipient = %message.recipient,
            channel = ?message.channel,
            purpose = %message.purpose,
            expires_at = %message.expires_at,
            "Verification message dispatched"
        );
        Ok(())
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn name(&self) -> &str {
        "log"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use iam_core::domain::VerificationPurpose;

    use crate::types::DeliveryChannel;

    #[tokio::test]
    async fn test_log_sender_always_succeeds() {
        let sender = LogSender::new();
        let message = VerificationMessage {
            recipient: "a@x.com".to_string(),
            channel: DeliveryChannel::Email,
            purpose: VerificationPurpose::Email,
            code: "123456".to_string(),
            expires_at: Utc::now(),
        };

        assert!(sender.send(&message).await.is_ok());
        assert!(sender.is_enabled());
        assert_eq!(sender.name(), "log");
    }
}
