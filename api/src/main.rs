//! Crypto Registry API Server
//!
//! # Startup
//!
//! ```text
//! .env / 환경변수 ──▶ Config::validate ──▶ init_tracing
//!                                              │
//!                                              ▼
//!            connect_repository ──▶ ping ──▶ Server::run
//!                                              │
//!                         Ctrl+C / SIGTERM ────┘ (CancellationToken)
//! ```
//!
//! 설정 오류, 스토리지 연결 실패, 서버 오류, shutdown 시간 초과는
//! 모두 non-zero exit.

use anyhow::Context;
use tokio_util::sync::CancellationToken;

use crypto_api::{
    config::Config,
    db,
    logging::init_tracing,
    server::{build_router, spawn_signal_watcher, Server},
    AppState,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 환경변수 로드
    dotenvy::dotenv().ok();

    let config = Config::from_env().context("failed to load config")?;
    config.validate().context("invalid config")?;

    init_tracing(&config.log)?;
    tracing::info!("Starting crypto registry API server");
    tracing::info!(
        storage = ?config.storage.storage_type,
        datasource = %config.storage.data_source,
        error_policy = ?config.error_policy,
        "Configuration loaded"
    );

    let repo = db::connect_repository(&config.storage)
        .await
        .context("failed to open storage")?;
    repo.ping().await.context("storage is not reachable")?;
    tracing::info!("Storage connected");

    let state = AppState::new(repo.clone(), config.error_policy);
    let router = build_router(state, &config.server);

    let shutdown = CancellationToken::new();
    let watcher = spawn_signal_watcher(shutdown.clone());

    let close_timeout = config.server.shutdown_timeout;
    let server = Server::new(config.server, router);
    let handle = tokio::spawn(server.run(shutdown.clone()));

    let result = handle.await.context("server task panicked")?;

    // 서버가 스스로 멈춘 경우 signal watcher도 정리
    shutdown.cancel();
    if let Err(e) = watcher.await {
        tracing::warn!(error = %e, "signal watcher task failed");
    }

    if tokio::time::timeout(close_timeout, repo.close()).await.is_err() {
        tracing::warn!(timeout = ?close_timeout, "storage did not close in time");
    }

    result.context("server stopped")?;
    tracing::info!("Bye");
    Ok(())
}
