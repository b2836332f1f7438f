//! Database Models
//!
//! Row shapes of the two tables and the in-memory join that turns them
//! back into `Cryptocurrency` values.

use sqlx::FromRow;

use crate::types::{Author, Cryptocurrency};

/// `cryptos.cryptocurrencies` row
#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct CryptoRow {
    pub name: String,
    /// natural key (PRIMARY KEY)
    pub cryptoid: String,
    pub price: f64,
}

/// `cryptos.authors` row
///
/// cryptoid는 관례상 FK. repository가 강제하지 않음
#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct AuthorRow {
    pub cryptoid: String,
    pub firstname: String,
    pub lastname: String,
}

impl From<CryptoRow> for Cryptocurrency {
    fn from(row: CryptoRow) -> Self {
        Cryptocurrency {
            name: row.name,
            crypto_id: row.cryptoid,
            price: row.price,
            authors: Vec::new(),
        }
    }
}

impl From<&Cryptocurrency> for CryptoRow {
    fn from(crypto: &Cryptocurrency) -> Self {
        CryptoRow {
            name: crypto.name.clone(),
            cryptoid: crypto.crypto_id.clone(),
            price: crypto.price,
        }
    }
}

impl AuthorRow {
    pub fn new(crypto_id: &str, author: &Author) -> Self {
        AuthorRow {
            cryptoid: crypto_id.to_string(),
            firstname: author.firstname.clone(),
            lastname: author.lastname.clone(),
        }
    }

    pub fn author(&self) -> Author {
        Author::new(&self.firstname, &self.lastname)
    }
}

/// author row 하나를 같은 crypto_id를 가진 모든 항목에 붙임
///
/// 매칭되는 항목이 없으면 (삭제 후 남은 orphan row) 조용히 버려짐.
pub(crate) fn attach_author(cryptos: &mut [Cryptocurrency], row: &AuthorRow) {
    for crypto in cryptos.iter_mut().filter(|c| c.crypto_id == row.cryptoid) {
        crypto.authors.push(row.author());
    }
}
