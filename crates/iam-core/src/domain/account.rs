//! 계정 도메인 모델 및 상태 머신.
//!
//! 계정 상태는 `pending -> active <-> suspended` 흐름을 따르며,
//! `deleted`는 어떤 비삭제 상태에서도 도달 가능한 종결 상태입니다.
//! 상태와 token_version은 라이프사이클 서비스를 통해서만 변경됩니다.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::role::Role;

/// 계정 상태.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(feature = "utoipa-support", derive(utoipa::ToSchema))]
pub enum AccountStatus {
    /// 가입 직후 - 이메일 검증 대기
    Pending,
    /// 활성 - 로그인 및 토큰 발급 가능
    Active,
    /// 정지 - 관리자 조치로 차단됨
    Suspended,
    /// 삭제됨 - 종결 상태, 복구 불가
    Deleted,
}

impl AccountStatus {
    /// 상태 전이 허용 여부 확인.
    ///
    /// 허용되는 전이:
    /// - `pending -> active` (검증 코드 상환)
    /// - `active -> suspended`, `suspended -> active` (관리자 조치)
    /// - 비삭제 상태 -> `deleted` (종결)
    ///
    /// 동일 상태로의 전이는 허용하지 않습니다.
    pub fn can_transition(&self, to: AccountStatus) -> bool {
        use AccountStatus::*;
        match (self, to) {
            (Pending, Active) => true,
            (Active, Suspended) => true,
            (Suspended, Active) => true,
            (Pending, Deleted) | (Active, Deleted) | (Suspended, Deleted) => true,
            _ => false,
        }
    }

    /// 문자열에서 상태 파싱.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(AccountStatus::Pending),
            "active" => Some(AccountStatus::Active),
            "suspended" => Some(AccountStatus::Suspended),
            "deleted" => Some(AccountStatus::Deleted),
            _ => None,
        }
    }

    /// 문자열로 변환.
    pub fn as_str(&self) -> &'static str {
        match self {
            AccountStatus::Pending => "pending",
            AccountStatus::Active => "active",
            AccountStatus::Suspended => "suspended",
            AccountStatus::Deleted => "deleted",
        }
    }
}

impl std::fmt::Display for AccountStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// 계정 레코드.
///
/// `password_hash`는 검증 용도로만 보관하며 절대 직렬화되지 않습니다.
#[derive(Debug, Clone, Serialize)]
pub struct Account {
    /// 고유 계정 ID
    pub id: Uuid,
    /// 사용자 이름 (비삭제 계정 간 유일)
    pub username: String,
    /// 이메일 주소 (비삭제 계정 간 유일)
    pub email: String,
    /// Argon2 PHC 형식 비밀번호 해시
    #[serde(skip_serializing)]
    pub password_hash: String,
    /// 역할
    pub role: Role,
    /// 계정 상태
    pub status: AccountStatus,
    /// 토큰 버전 - 증가 시 기존 토큰 전체 무효화
    pub token_version: i32,
    /// 생성 시간
    pub created_at: DateTime<Utc>,
    /// 마지막 수정 시간
    pub updated_at: DateTime<Utc>,
}

/// 외부 노출용 계정 요약.
///
/// API 응답에 사용되며 비밀번호 해시와 토큰 버전을 포함하지 않습니다.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "utoipa-support", derive(utoipa::ToSchema))]
pub struct AccountSummary {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub role: Role,
    pub status: AccountStatus,
    pub created_at: DateTime<Utc>,
}

impl From<&Account> for AccountSummary {
    fn from(account: &Account) -> Self {
        Self {
            id: account.id,
            username: account.username.clone(),
            email: account.email.clone(),
            role: account.role,
            status: account.status,
            created_at: account.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transition_matrix() {
        use AccountStatus::*;

        // 허용되는 전이
        assert!(Pending.can_transition(Active));
        assert!(Active.can_transition(Suspended));
        assert!(Suspended.can_transition(Active));
        assert!(Pending.can_transition(Deleted));
        assert!(Active.can_transition(Deleted));
        assert!(Suspended.can_transition(Deleted));

        // 거부되는 전이
        assert!(!Pending.can_transition(Suspended));
        assert!(!Suspended.can_transition(Pending));
        assert!(!Active.can_transition(Pending));
        assert!(!Active.can_transition(Active));
    }

    #[test]
    fn test_deleted_is_terminal() {
        use AccountStatus::*;
        for to in [Pending, Active, Suspended, Deleted] {
            assert!(!Deleted.can_transition(to));
        }
    }

    #[test]
    fn test_status_roundtrip() {
        use AccountStatus::*;
        for status in [Pending, Active, Suspended, Deleted] {
            assert_eq!(AccountStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(AccountStatus::parse("banned"), None);
    }

    #[test]
    fn test_password_hash_never_serialized() {
        let account = Account {
            id: Uuid::new_v4(),
            username: "alice".to_string(),
            email: "a@x.com".to_string(),
            password_hash: "$argon2id$v=19$secret".to_string(),
            role: Role::User,
            status: AccountStatus::Pending,
            token_version: 1,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };

        let json = serde_json::to_string(&account).unwrap();
        assert!(!json.contains("argon2id"));
        assert!(!json.contains("password_hash"));

        let summary = AccountSummary::from(&account);
        let json = serde_json::to_string(&summary).unwrap();
        assert!(!json.contains("token_version"));
        assert!(json.contains("alice"));
    }
}
