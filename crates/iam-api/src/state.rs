//! 모든 핸들러에서 공유되는 애플리케이션 상태.
//!
//! AppState는 모든 API 핸들러에서 공유되는 상태를 관리합니다.
//! Arc로 래핑되어 여러 요청 간에 안전하게 공유되며, 서명 키와 설정은
//! 기동 시 한 번 로드되어 이후 읽기 전용입니다.

use std::sync::Arc;

use sqlx::PgPool;

use iam_core::config::AppConfig;
use iam_notification::VerificationSender;

use crate::auth::AuthPipeline;
use crate::services::{AccountService, VerificationService};

/// 애플리케이션 공유 상태.
///
/// Axum의 State extractor를 통해 핸들러에 주입됩니다.
#[derive(Clone)]
pub struct AppState {
    /// 데이터베이스 연결 풀 (PostgreSQL)
    pub db_pool: PgPool,

    /// 애플리케이션 설정 (기동 후 읽기 전용)
    pub config: AppConfig,

    /// 요청 인증 파이프라인
    pub pipeline: AuthPipeline,

    /// 계정 라이프사이클 서비스
    pub accounts: AccountService,

    /// 서버 시작 시간 (업타임 계산용)
    pub started_at: chrono::DateTime<chrono::Utc>,

    /// API 버전
    pub version: String,
}

impl AppState {
    /// 새로운 AppState 생성.
    ///
    /// # Arguments
    ///
    /// * `db_pool` - 데이터베이스 연결 풀
    /// * `config` - 로드된 애플리케이션 설정
    /// * `sender` - 검증 코드 전송기 (이메일/SMS 게이트웨이)
    pub fn new(db_pool: PgPool, config: AppConfig, sender: Arc<dyn VerificationSender>) -> Self {
        let verification =
            VerificationService::new(db_pool.clone(), config.verification.clone(), sender);
        let accounts =
            AccountService::new(db_pool.clone(), config.auth.clone(), verification);
        let pipeline = AuthPipeline::new(&config.auth.jwt_secret);

        Self {
            db_pool,
            config,
            pipeline,
            accounts,
            started_at: chrono::Utc::now(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }

    /// 데이터베이스 연결 상태 확인.
    pub async fn is_db_healthy(&self) -> bool {
        sqlx::query("SELECT 1").execute(&self.db_pool).await.is_ok()
    }

    /// 서버 업타임 (초).
    pub fn uptime_secs(&self) -> i64 {
        (chrono::Utc::now() - self.started_at).num_seconds()
    }
}
