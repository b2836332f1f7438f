//! Crypto Registry API Library
//!
//! # Overview
//!
//! 암호화폐 레코드(이름, 식별자, 가격, 제작자 목록)를 HTTP로 노출하는
//! CRUD 서비스와 companion client.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │                         API                              │
//! │                                                          │
//! │  ┌──────────┐  ┌─────────┐  ┌─────────┐  ┌─────────┐    │
//! │  │  Server  │─▶│ Routes  │─▶│   DB    │  │  Types  │    │
//! │  │lifecycle │  │(handler)│  │ (repo)  │  │         │    │
//! │  └──────────┘  └─────────┘  └────┬────┘  └─────────┘    │
//! │                                  │                       │
//! └──────────────────────────────────┼───────────────────────┘
//!                                    │
//!                                    ▼
//!                  ┌──────────────────────────────────┐
//!                  │ PostgreSQL (cryptocurrencies,    │
//!                  │             authors)             │
//!                  └──────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - `config`: 환경 설정 관리
//! - `error`: 에러 타입 및 처리
//! - `routes`: HTTP 엔드포인트 핸들러
//! - `middleware`: 요청 로깅
//! - `server`: 라우터 구성, graceful shutdown
//! - `db`: repository (PostgreSQL, in-memory)
//! - `logging`: tracing subscriber 설정
//! - `client`: companion HTTP client
//! - `types`: 도메인 타입 정의
//!
//! ## Usage
//!
//! ```rust,ignore
//! use crypto_api::{config::Config, db, AppState};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::from_env()?;
//!     let repo = db::connect_repository(&config.storage).await?;
//!     let state = AppState::new(repo, config.error_policy);
//!
//!     // ... 서버 시작
//!     Ok(())
//! }
//! ```

use std::sync::Arc;

pub mod client;
pub mod config;
pub mod db;
pub mod error;
pub mod logging;
pub mod middleware;
pub mod routes;
pub mod server;
pub mod types;

// Re-exports for convenience
pub use client::CryptoClient;
pub use config::{Config, ErrorPolicy};
pub use db::{CryptoRepository, Database, MemoryRepository};
pub use error::{ApiError, StorageError};
pub use server::{Server, ServerState};
pub use types::{Author, Cryptocurrency};

/// 핸들러 공유 상태
#[derive(Clone)]
pub struct AppState {
    pub repo: Arc<dyn CryptoRepository>,
    pub error_policy: ErrorPolicy,
}

impl AppState {
    pub fn new(repo: Arc<dyn CryptoRepository>, error_policy: ErrorPolicy) -> Self {
        Self { repo, error_policy }
    }
}
