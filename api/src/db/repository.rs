//! Repository Pattern Implementation
//!
//! # Interview Q&A
//!
//! Q: Repository 패턴이란?
//! A: 데이터 접근 로직을 추상화하는 패턴
//!
//!    장점:
//!    - 라우트 핸들러와 SQL 분리
//!    - 테스트 시 in-memory 구현으로 교체 가능
//!    - 다른 스토리지 엔진으로 교체 시 영향 최소화
//!
//!    ```rust,ignore
//!    // 핸들러
//!    let cryptos = state.repo.get_all().await;
//!
//!    // PostgreSQL 구현: db::Database
//!    // 메모리 구현:     db::MemoryRepository
//!    ```
//!
//! Q: 여러 statement를 쓰는 작업(add/update)이 트랜잭션이 아닌 이유는?
//! A: 기존 동작 유지
//!    - author insert 도중 실패하면 crypto row와 일부 author가 남음
//!    - 호출자는 StorageError로 실패를 알 수 있음
//!
//! Q: 동시 요청은?
//! A: 요청 단위 락 없음. 같은 crypto_id에 대한 update/delete가 동시에
//!    오면 순서 보장 없이 섞일 수 있음.

use std::sync::Arc;

use async_trait::async_trait;

use super::{Database, MemoryRepository};
use crate::config::{StorageConfig, StorageType};
use crate::error::{Fetch, StorageError};
use crate::types::Cryptocurrency;

/// Cryptocurrency Repository 인터페이스
///
/// 모든 작업은 재시도 없이 스토리지 I/O가 끝날 때까지 대기함.
#[async_trait]
pub trait CryptoRepository: Send + Sync {
    /// 전체 조회: crypto 쿼리 1번 + author 쿼리 1번, 메모리에서 join
    ///
    /// 실패 시 그때까지 읽은 목록을 `Partial::fetched`로 돌려줌.
    async fn get_all(&self) -> Fetch<Vec<Cryptocurrency>>;

    /// crypto_id 완전 일치 조회. 없으면 `StorageError::NotFound`
    /// (fetched는 zero-valued 객체)
    async fn get_by_id(&self, crypto_id: &str) -> Fetch<Cryptocurrency>;

    /// crypto row insert 후 author row를 순서대로 insert (원자적이지 않음)
    async fn add(&self, crypto: &Cryptocurrency) -> Result<(), StorageError>;

    /// `old_crypto_id` row의 모든 필드 갱신 후 author set 교체
    ///
    /// author 삭제는 **새** crypto_id 기준. 이름이 바뀌면 기존 id의
    /// author row는 orphan으로 남음.
    async fn update(&self, old_crypto_id: &str, crypto: &Cryptocurrency) -> Result<(), StorageError>;

    /// crypto row만 삭제 (author row는 cascade 되지 않음)
    async fn remove(&self, crypto_id: &str) -> Result<(), StorageError>;

    /// 스토리지 liveness 확인
    async fn ping(&self) -> Result<(), StorageError>;

    /// 커넥션 반환 (프로세스 종료 직전 호출)
    async fn close(&self) {}
}

/// 설정된 스토리지 엔진으로 repository 생성
pub async fn connect_repository(
    config: &StorageConfig,
) -> Result<Arc<dyn CryptoRepository>, StorageError> {
    match config.storage_type {
        StorageType::Postgres => {
            let db = Database::connect(config.connect_options()?).await?;
            Ok(Arc::new(db))
        }
        StorageType::Memory => Ok(Arc::new(MemoryRepository::new())),
    }
}
