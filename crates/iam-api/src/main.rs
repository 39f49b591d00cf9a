//! 계정/인증 API 서버.
//!
//! Axum 기반 REST API 서버를 시작합니다.
//! 가입, 이메일 검증, 로그인, 토큰 관리, 관리자 계정 관리 엔드포인트를
//! 제공합니다.
//!
//! # 환경변수
//!
//! - `DATABASE_URL`: PostgreSQL 접속 URL (필수)
//! - `IAM__SERVER__HOST`, `IAM__SERVER__PORT`: 바인딩 주소
//! - `IAM__AUTH__JWT_SECRET`: JWT 서명 키 (운영 환경 필수)
//! - `RUST_LOG`: 로그 레벨 필터

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use sqlx::postgres::PgPoolOptions;
use tower_http::cors::CorsLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use iam_api::openapi::swagger_ui_router;
use iam_api::routes::create_api_router;
use iam_api::state::AppState;
use iam_core::config::{AppConfig, AuthConfig};
use iam_core::logging::init_logging;
use iam_notification::LogSender;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // .env 파일 로드 (없으면 무시)
    dotenvy::dotenv().ok();

    let config = AppConfig::load_default().context("설정 로드 실패")?;

    init_logging(&config.logging).context("로깅 초기화 실패")?;

    if config.auth.jwt_secret == AuthConfig::default().jwt_secret {
        warn!("기본 JWT 시크릿을 사용 중입니다. 운영 환경에서는 반드시 IAM__AUTH__JWT_SECRET을 설정하세요");
    }

    // 데이터베이스 연결 및 마이그레이션
    let database_url =
        std::env::var("DATABASE_URL").context("DATABASE_URL 환경변수가 필요합니다")?;

    let db_pool = PgPoolOptions::new()
        .max_connections(config.database.max_connections)
        .acquire_timeout(Duration::from_secs(config.database.connection_timeout_secs))
        .connect(&database_url)
        .await
        .context("데이터베이스 연결 실패")?;

    sqlx::migrate!("./migrations")
        .run(&db_pool)
        .await
        .context("마이그레이션 실패")?;
    info!("Database connected and migrated");

    // 검증 코드 전송기 - 이메일/SMS 게이트웨이 연동 전까지 로그 전송기 사용
    let sender = Arc::new(LogSender::new());

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .context("서버 주소 파싱 실패")?;
    let request_timeout = Duration::from_secs(config.server.request_timeout_secs);

    let state = Arc::new(AppState::new(db_pool, config, sender));

    let app = create_api_router()
        .merge(swagger_ui_router())
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(request_timeout))
        .layer(CorsLayer::permissive());

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("바인딩 실패: {}", addr))?;
    info!(%addr, "IAM API server started");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("서버 실행 실패")?;

    info!("Server stopped");
    Ok(())
}

/// 종료 시그널 대기 (Ctrl+C / SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Ctrl+C 핸들러 설치 실패");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("SIGTERM 핸들러 설치 실패")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Ctrl+C received, shutting down"),
        _ = terminate => info!("SIGTERM received, shutting down"),
    }
}
