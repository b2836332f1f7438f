//! Database Module
//!
//! # Interview Q&A
//!
//! Q: 왜 두 테이블을 JOIN 쿼리 대신 애플리케이션에서 합치는가?
//! A: 기존 동작 유지
//!    - crypto 전체 쿼리 1번 + author 전체 쿼리 1번 (N+1 아님)
//!    - crypto row는 stream으로 읽어서, 중간 실패 시 앞서 읽은 row를 보존
//!
//! Q: 커넥션 풀은 어떻게 관리하는가?
//! A: SQLx의 PgPool 사용
//!    - 최소/최대 커넥션 수 설정
//!    - 커넥션 재사용 (오버헤드 감소)
//!    - 타임아웃 처리
//!
//! # Schema
//!
//! `api/sql/schema.sql` 참고. 서비스는 마이그레이션을 실행하지 않음.

mod memory;
mod models;
mod repository;

pub use memory::MemoryRepository;
pub use models::{AuthorRow, CryptoRow};
pub use repository::{connect_repository, CryptoRepository};

use async_trait::async_trait;
use futures::StreamExt;
use sqlx::{
    postgres::{PgConnectOptions, PgPoolOptions},
    PgPool,
};

use crate::error::{Fetch, Partial, StorageError};
use crate::types::{Author, Cryptocurrency};
use models::attach_author;

// ============ SQL ============

const SELECT_CRYPTOS: &str = "SELECT name, cryptoid, price FROM cryptos.cryptocurrencies";
const SELECT_CRYPTO_BY_ID: &str =
    "SELECT name, cryptoid, price FROM cryptos.cryptocurrencies WHERE cryptoid = $1";
const SELECT_AUTHORS: &str = "SELECT cryptoid, firstname, lastname FROM cryptos.authors";
const SELECT_AUTHORS_BY_ID: &str =
    "SELECT cryptoid, firstname, lastname FROM cryptos.authors WHERE cryptoid = $1";
const INSERT_CRYPTO: &str =
    "INSERT INTO cryptos.cryptocurrencies (name, cryptoid, price) VALUES ($1, $2, $3)";
const INSERT_AUTHOR: &str =
    "INSERT INTO cryptos.authors (cryptoid, firstname, lastname) VALUES ($1, $2, $3)";
const UPDATE_CRYPTO: &str =
    "UPDATE cryptos.cryptocurrencies SET name = $1, cryptoid = $2, price = $3 WHERE cryptoid = $4";
const DELETE_AUTHORS: &str = "DELETE FROM cryptos.authors WHERE cryptoid = $1";
const DELETE_CRYPTO: &str = "DELETE FROM cryptos.cryptocurrencies WHERE cryptoid = $1";

/// PostgreSQL repository
pub struct Database {
    pool: PgPool,
}

impl Database {
    /// 데이터베이스 연결
    ///
    /// # Connection Pool Settings
    ///
    /// - max_connections: 10 (트래픽에 따라 조정)
    /// - min_connections: 1 (idle 시 최소 유지)
    /// - acquire_timeout: 3초 (커넥션 획득 대기)
    pub async fn connect(options: PgConnectOptions) -> Result<Self, StorageError> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .min_connections(1)
            .acquire_timeout(std::time::Duration::from_secs(3))
            .connect_with(options)
            .await
            .map_err(StorageError::Connection)?;

        Ok(Self { pool })
    }

    /// 특정 crypto_id로 저장된 author row 조회
    ///
    /// crypto row 존재 여부와 무관하게 조회됨 (orphan row 확인용).
    pub async fn authors_of(&self, crypto_id: &str) -> Result<Vec<Author>, StorageError> {
        let rows = sqlx::query_as::<_, AuthorRow>(SELECT_AUTHORS_BY_ID)
            .bind(crypto_id)
            .fetch_all(&self.pool)
            .await
            .map_err(StorageError::query("querying authors from DB"))?;

        Ok(rows.iter().map(AuthorRow::author).collect())
    }

    async fn insert_authors(&self, crypto: &Cryptocurrency) -> Result<(), StorageError> {
        for author in &crypto.authors {
            sqlx::query(INSERT_AUTHOR)
                .bind(&crypto.crypto_id)
                .bind(&author.firstname)
                .bind(&author.lastname)
                .execute(&self.pool)
                .await
                .map_err(StorageError::query("inserting author in DB"))?;
        }
        Ok(())
    }
}

/// unique 제약 위반은 Conflict로, 나머지는 Query로 분류
fn classify_write_error<'a>(
    crypto_id: &'a str,
    context: &'static str,
) -> impl FnOnce(sqlx::Error) -> StorageError + 'a {
    move |err| match &err {
        sqlx::Error::Database(db_err) if db_err.is_unique_violation() => StorageError::Conflict {
            crypto_id: crypto_id.to_string(),
        },
        _ => StorageError::Query { context, source: err },
    }
}

#[async_trait]
impl CryptoRepository for Database {
    async fn get_all(&self) -> Fetch<Vec<Cryptocurrency>> {
        let mut cryptos: Vec<Cryptocurrency> = Vec::new();

        let mut crypto_rows = sqlx::query_as::<_, CryptoRow>(SELECT_CRYPTOS).fetch(&self.pool);
        while let Some(row) = crypto_rows.next().await {
            match row {
                Ok(row) => cryptos.push(row.into()),
                Err(e) => {
                    let err = StorageError::query("querying cryptos from DB")(e);
                    return Err(Partial::new(cryptos, err));
                }
            }
        }
        // author 쿼리 전에 커넥션 반환
        drop(crypto_rows);

        let mut author_rows = sqlx::query_as::<_, AuthorRow>(SELECT_AUTHORS).fetch(&self.pool);
        while let Some(row) = author_rows.next().await {
            match row {
                Ok(row) => attach_author(&mut cryptos, &row),
                Err(e) => {
                    let err = StorageError::query("querying authors from DB")(e);
                    return Err(Partial::new(cryptos, err));
                }
            }
        }

        Ok(cryptos)
    }

    async fn get_by_id(&self, crypto_id: &str) -> Fetch<Cryptocurrency> {
        let row = sqlx::query_as::<_, CryptoRow>(SELECT_CRYPTO_BY_ID)
            .bind(crypto_id)
            .fetch_optional(&self.pool)
            .await;

        let mut crypto: Cryptocurrency = match row {
            Ok(Some(row)) => row.into(),
            Ok(None) => {
                let err = StorageError::NotFound { crypto_id: crypto_id.to_string() };
                return Err(Partial::new(Cryptocurrency::default(), err));
            }
            Err(e) => {
                let err = StorageError::query("querying cryptos from DB")(e);
                return Err(Partial::new(Cryptocurrency::default(), err));
            }
        };

        let mut author_rows = sqlx::query_as::<_, AuthorRow>(SELECT_AUTHORS_BY_ID)
            .bind(crypto_id)
            .fetch(&self.pool);
        while let Some(row) = author_rows.next().await {
            match row {
                Ok(row) => attach_author(std::slice::from_mut(&mut crypto), &row),
                Err(e) => {
                    let err = StorageError::query("querying authors from DB")(e);
                    return Err(Partial::new(crypto, err));
                }
            }
        }

        Ok(crypto)
    }

    async fn add(&self, crypto: &Cryptocurrency) -> Result<(), StorageError> {
        sqlx::query(INSERT_CRYPTO)
            .bind(&crypto.name)
            .bind(&crypto.crypto_id)
            .bind(crypto.price)
            .execute(&self.pool)
            .await
            .map_err(classify_write_error(&crypto.crypto_id, "inserting crypto in DB"))?;

        self.insert_authors(crypto).await
    }

    async fn update(&self, old_crypto_id: &str, crypto: &Cryptocurrency) -> Result<(), StorageError> {
        sqlx::query(UPDATE_CRYPTO)
            .bind(&crypto.name)
            .bind(&crypto.crypto_id)
            .bind(crypto.price)
            .bind(old_crypto_id)
            .execute(&self.pool)
            .await
            .map_err(classify_write_error(&crypto.crypto_id, "updating crypto in DB"))?;

        // NOTE: 새 crypto_id 기준 삭제. rename 시 old_crypto_id의 author는 남음
        sqlx::query(DELETE_AUTHORS)
            .bind(&crypto.crypto_id)
            .execute(&self.pool)
            .await
            .map_err(StorageError::query("deleting authors in DB"))?;

        self.insert_authors(crypto).await
    }

    async fn remove(&self, crypto_id: &str) -> Result<(), StorageError> {
        sqlx::query(DELETE_CRYPTO)
            .bind(crypto_id)
            .execute(&self.pool)
            .await
            .map_err(StorageError::query("deleting crypto in DB"))?;
        Ok(())
    }

    async fn ping(&self) -> Result<(), StorageError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(StorageError::query("pinging DB"))?;
        Ok(())
    }

    async fn close(&self) {
        self.pool.close().await;
    }
}
