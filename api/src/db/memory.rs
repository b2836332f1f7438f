//! In-memory Repository
//!
//! PostgreSQL 스키마와 같은 statement 단위 동작을 흉내내는 저장소.
//! 테스트용 fake이자 `STORAGE_TYPE=memory` 실행 모드.
//!
//! - crypto row: crypto_id unique (위반 시 Conflict)
//! - author row: FK 강제 없음, crypto 삭제 시 cascade 없음
//! - add/update는 statement를 순서대로 실행, 중간 실패 시 앞선 변경 유지

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::models::{attach_author, AuthorRow, CryptoRow};
use super::CryptoRepository;
use crate::error::{Fetch, Partial, StorageError};
use crate::types::{Author, Cryptocurrency};

#[derive(Debug, Default)]
struct Tables {
    cryptocurrencies: Vec<CryptoRow>,
    authors: Vec<AuthorRow>,
}

pub struct MemoryRepository {
    tables: RwLock<Tables>,
    /// false면 모든 작업이 `StorageError::Unavailable`로 실패 (장애 시뮬레이션)
    available: AtomicBool,
}

impl Default for MemoryRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self {
            tables: RwLock::new(Tables::default()),
            available: AtomicBool::new(true),
        }
    }

    /// 초기 데이터를 add 순서대로 넣은 저장소
    pub fn with_cryptos(cryptos: impl IntoIterator<Item = Cryptocurrency>) -> Self {
        let mut tables = Tables::default();
        for crypto in cryptos {
            tables.cryptocurrencies.push(CryptoRow::from(&crypto));
            tables
                .authors
                .extend(crypto.authors.iter().map(|a| AuthorRow::new(&crypto.crypto_id, a)));
        }

        Self {
            tables: RwLock::new(tables),
            available: AtomicBool::new(true),
        }
    }

    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// 특정 crypto_id로 저장된 author row 조회 (orphan row 포함)
    pub async fn authors_of(&self, crypto_id: &str) -> Vec<Author> {
        let tables = self.tables.read().await;
        tables
            .authors
            .iter()
            .filter(|row| row.cryptoid == crypto_id)
            .map(AuthorRow::author)
            .collect()
    }

    fn check_available(&self) -> Result<(), StorageError> {
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(StorageError::Unavailable)
        }
    }
}

#[async_trait]
impl CryptoRepository for MemoryRepository {
    async fn get_all(&self) -> Fetch<Vec<Cryptocurrency>> {
        if let Err(err) = self.check_available() {
            return Err(Partial::new(Vec::new(), err));
        }

        let tables = self.tables.read().await;
        let mut cryptos: Vec<Cryptocurrency> =
            tables.cryptocurrencies.iter().cloned().map(Into::into).collect();
        for row in &tables.authors {
            attach_author(&mut cryptos, row);
        }

        Ok(cryptos)
    }

    async fn get_by_id(&self, crypto_id: &str) -> Fetch<Cryptocurrency> {
        if let Err(err) = self.check_available() {
            return Err(Partial::new(Cryptocurrency::default(), err));
        }

        let tables = self.tables.read().await;
        let Some(row) = tables.cryptocurrencies.iter().find(|r| r.cryptoid == crypto_id) else {
            let err = StorageError::NotFound { crypto_id: crypto_id.to_string() };
            return Err(Partial::new(Cryptocurrency::default(), err));
        };

        let mut crypto: Cryptocurrency = row.clone().into();
        for author in tables.authors.iter().filter(|a| a.cryptoid == crypto_id) {
            crypto.authors.push(author.author());
        }

        Ok(crypto)
    }

    async fn add(&self, crypto: &Cryptocurrency) -> Result<(), StorageError> {
        self.check_available()?;

        let mut tables = self.tables.write().await;
        if tables.cryptocurrencies.iter().any(|r| r.cryptoid == crypto.crypto_id) {
            return Err(StorageError::Conflict { crypto_id: crypto.crypto_id.clone() });
        }

        tables.cryptocurrencies.push(CryptoRow::from(crypto));
        for author in &crypto.authors {
            tables.authors.push(AuthorRow::new(&crypto.crypto_id, author));
        }
        Ok(())
    }

    async fn update(&self, old_crypto_id: &str, crypto: &Cryptocurrency) -> Result<(), StorageError> {
        self.check_available()?;

        let mut tables = self.tables.write().await;

        // rename 대상 id가 다른 row에 이미 있으면 unique 위반
        let renamed_onto_existing = crypto.crypto_id != old_crypto_id
            && tables.cryptocurrencies.iter().any(|r| r.cryptoid == crypto.crypto_id);
        let target_exists = tables.cryptocurrencies.iter().any(|r| r.cryptoid == old_crypto_id);
        if renamed_onto_existing && target_exists {
            return Err(StorageError::Conflict { crypto_id: crypto.crypto_id.clone() });
        }

        // UPDATE ... WHERE cryptoid = old (0 row 갱신도 에러 아님)
        for row in tables.cryptocurrencies.iter_mut().filter(|r| r.cryptoid == old_crypto_id) {
            *row = CryptoRow::from(crypto);
        }

        // NOTE: 새 crypto_id 기준 삭제. rename 시 old_crypto_id의 author는 남음
        tables.authors.retain(|a| a.cryptoid != crypto.crypto_id);
        for author in &crypto.authors {
            tables.authors.push(AuthorRow::new(&crypto.crypto_id, author));
        }
        Ok(())
    }

    async fn remove(&self, crypto_id: &str) -> Result<(), StorageError> {
        self.check_available()?;

        let mut tables = self.tables.write().await;
        tables.cryptocurrencies.retain(|r| r.cryptoid != crypto_id);
        Ok(())
    }

    async fn ping(&self) -> Result<(), StorageError> {
        self.check_available()
    }
}
