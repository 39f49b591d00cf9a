//! 역할 계층 및 권한 비교.
//!
//! 역할은 엄격한 전순서(`user < moderator < admin < superadmin`)를 이루며,
//! 상위 역할은 하위 역할의 모든 권한을 암묵적으로 포함합니다.
//! 권한 판정은 항상 정수 rank 비교로만 수행합니다.

use serde::{Deserialize, Serialize};

/// 사용자 역할.
///
/// 계정 생성 시 기본값은 `User`이며, 역할 변경은
/// 대상과 요청 역할 모두를 엄격히 상회하는 행위자만 수행할 수 있습니다.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(feature = "utoipa-support", derive(utoipa::ToSchema))]
pub enum Role {
    /// 일반 사용자 - 기본 역할
    User,
    /// 중재자 - 콘텐츠 관리 권한
    Moderator,
    /// 관리자 - 계정 관리 권한
    Admin,
    /// 최상위 관리자
    Superadmin,
}

impl Role {
    /// 전체 역할 목록 (rank 오름차순).
    pub const ALL: [Role; 4] = [Role::User, Role::Moderator, Role::Admin, Role::Superadmin];

    /// 역할의 우선순위 rank 반환 (높을수록 더 많은 권한).
    pub fn rank(&self) -> u8 {
        match self {
            Role::User => 10,
            Role::Moderator => 50,
            Role::Admin => 100,
            Role::Superadmin => 200,
        }
    }

    /// 요구 역할 이상인지 확인.
    ///
    /// `self`의 rank가 `required`의 rank 이상이면 true.
    pub fn authorizes(&self, required: Role) -> bool {
        self.rank() >= required.rank()
    }

    /// 역할 변경 허용 여부 확인.
    ///
    /// 행위자가 대상의 현재 역할과 요청 역할 **모두**를 엄격히 상회할 때만
    /// 허용합니다. 자신과 같거나 높은 역할은 부여할 수 없고,
    /// 동급/상급 계정은 수정할 수 없습니다 (권한 상승 방지).
    pub fn can_assign(actor: Role, current_target: Role, requested: Role) -> bool {
        actor.rank() > current_target.rank() && actor.rank() > requested.rank()
    }

    /// 문자열에서 역할 파싱.
    ///
    /// 알 수 없는 문자열은 `None`을 반환하며, 호출 측은 이를
    /// 권한 거부로 처리해야 합니다 (fail-closed).
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "user" => Some(Role::User),
            "moderator" => Some(Role::Moderator),
            "admin" => Some(Role::Admin),
            "superadmin" => Some(Role::Superadmin),
            _ => None,
        }
    }

    /// 문자열로 변환.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Moderator => "moderator",
            Role::Admin => "admin",
            Role::Superadmin => "superadmin",
        }
    }
}

impl Default for Role {
    fn default() -> Self {
        Role::User
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_role_order_is_total() {
        // rank는 엄격한 전순서를 이룸
        assert!(Role::User.rank() < Role::Moderator.rank());
        assert!(Role::Moderator.rank() < Role::Admin.rank());
        assert!(Role::Admin.rank() < Role::Superadmin.rank());
    }

    #[test]
    fn test_authorizes() {
        // 상위 역할은 하위 역할의 요구사항을 충족
        assert!(Role::Superadmin.authorizes(Role::Admin));
        assert!(Role::Admin.authorizes(Role::Moderator));
        assert!(Role::Admin.authorizes(Role::User));
        assert!(Role::User.authorizes(Role::User));

        // 하위 역할은 상위 요구사항을 충족하지 못함
        assert!(!Role::User.authorizes(Role::Moderator));
        assert!(!Role::Moderator.authorizes(Role::Admin));
        assert!(!Role::Admin.authorizes(Role::Superadmin));
    }

    #[test]
    fn test_can_assign_requires_strict_dominance() {
        // admin은 user를 moderator로 올릴 수 있음
        assert!(Role::can_assign(Role::Admin, Role::User, Role::Moderator));

        // admin은 자신과 같은 역할을 부여할 수 없음
        assert!(!Role::can_assign(Role::Admin, Role::User, Role::Admin));

        // admin은 자신을 넘는 역할을 부여할 수 없음
        assert!(!Role::can_assign(Role::Admin, Role::User, Role::Superadmin));

        // admin은 동급 계정을 수정할 수 없음
        assert!(!Role::can_assign(Role::Admin, Role::Admin, Role::User));

        // superadmin은 admin을 강등할 수 있음
        assert!(Role::can_assign(Role::Superadmin, Role::Admin, Role::User));
    }

    #[test]
    fn test_parse_fails_closed() {
        assert_eq!(Role::parse("admin"), Some(Role::Admin));
        assert_eq!(Role::parse("SUPERADMIN"), Some(Role::Superadmin));
        assert_eq!(Role::parse("root"), None);
        assert_eq!(Role::parse(""), None);
    }

    #[test]
    fn test_role_serialization() {
        let json = serde_json::to_string(&Role::Moderator).unwrap();
        assert_eq!(json, "\"moderator\"");

        let parsed: Role = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, Role::Moderator);
    }

    fn any_role() -> impl Strategy<Value = Role> {
        proptest::sample::select(Role::ALL.to_vec())
    }

    proptest! {
        /// 행위자가 요청 역할 또는 현재 역할 이하이면 항상 거부.
        #[test]
        fn can_assign_never_escalates(
            actor in any_role(),
            current in any_role(),
            requested in any_role(),
        ) {
            if actor.rank() <= requested.rank() || actor.rank() <= current.rank() {
                prop_assert!(!Role::can_assign(actor, current, requested));
            }
        }

        /// 허용된 변경에서 행위자는 양쪽 모두를 엄격히 상회.
        #[test]
        fn can_assign_implies_dominance(
            actor in any_role(),
            current in any_role(),
            requested in any_role(),
        ) {
            if Role::can_assign(actor, current, requested) {
                prop_assert!(actor.rank() > current.rank());
                prop_assert!(actor.rank() > requested.rank());
            }
        }
    }
}
