//! 검증 코드 도메인 모델.
//!
//! 검증 코드는 하나의 계정과 하나의 용도에 묶인 일회용 비밀값입니다.
//! (계정, 용도) 쌍당 미소비·미만료 코드는 최대 1개만 존재하며,
//! 상환은 정확히 한 번만 성공합니다. 만료는 상환 시점에 lazy하게 판정합니다.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// 검증 코드 용도.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[cfg_attr(feature = "utoipa-support", derive(utoipa::ToSchema))]
pub enum VerificationPurpose {
    /// 이메일 소유 확인 (가입 활성화)
    Email,
    /// SMS 채널 소유 확인
    Sms,
    /// 비밀번호 재설정
    PasswordReset,
}

impl VerificationPurpose {
    /// 문자열에서 용도 파싱.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "email" => Some(VerificationPurpose::Email),
            "sms" => Some(VerificationPurpose::Sms),
            "password_reset" => Some(VerificationPurpose::PasswordReset),
            _ => None,
        }
    }

    /// 문자열로 변환.
    pub fn as_str(&self) -> &'static str {
        match self {
            VerificationPurpose::Email => "email",
            VerificationPurpose::Sms => "sms",
            VerificationPurpose::PasswordReset => "password_reset",
        }
    }
}

impl std::fmt::Display for VerificationPurpose {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// 검증 코드 레코드.
///
/// 소비된 행은 감사 목적으로 `consumed = true` 상태로 보존됩니다.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerificationCode {
    /// 고유 ID
    pub id: Uuid,
    /// 소유 계정 ID
    pub account_id: Uuid,
    /// 용도
    pub purpose: VerificationPurpose,
    /// 코드 값 (고정 길이 숫자)
    pub code: String,
    /// 만료 시간
    pub expires_at: DateTime<Utc>,
    /// 소비 여부
    pub consumed: bool,
    /// 발급 시간
    pub created_at: DateTime<Utc>,
}

impl VerificationCode {
    /// 주어진 시점 기준 만료 여부.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    /// 현재 시점 기준 만료 여부.
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }
}
