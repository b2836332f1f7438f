//! Common Types Module
//!
//! 애플리케이션 전반에서 사용되는 도메인 타입 정의
//!
//! # Wire Format
//!
//! ```json
//! {
//!   "name": "Bitcoin",
//!   "crypto_id": "BTC",
//!   "price": 45000.3,
//!   "authors": [{ "firstname": "Satoshi", "lastname": "Nakamoto" }]
//! }
//! ```
//!
//! 필드 이름은 클라이언트와의 계약이므로 변경 금지.
//! 누락된 필드는 zero value로 디코딩됨 (빈 문자열, 0, 빈 배열).

use serde::{Deserialize, Serialize};

/// 암호화폐 레코드
///
/// `crypto_id`가 유일한 키 (조회/수정/삭제 모두 이 값 기준).
/// 중복 방지는 스토리지 스키마가 담당함.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Cryptocurrency {
    pub name: String,
    pub crypto_id: String,
    pub price: f64,
    /// 스토어가 돌려준 순서를 그대로 유지
    pub authors: Vec<Author>,
}

/// 암호화폐 제작자
///
/// 독립적인 식별자가 없음. 소유한 Cryptocurrency의 author set의
/// 일부로만 생성/삭제됨.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(default)]
pub struct Author {
    pub firstname: String,
    pub lastname: String,
}

impl Cryptocurrency {
    pub fn new(name: &str, crypto_id: &str, price: f64, authors: Vec<Author>) -> Self {
        Self {
            name: name.to_string(),
            crypto_id: crypto_id.to_string(),
            price,
            authors,
        }
    }

    /// 정렬된 author 목록 (순서 무관 비교용)
    pub fn author_set(&self) -> Vec<Author> {
        let mut authors = self.authors.clone();
        authors.sort();
        authors
    }
}

impl Author {
    pub fn new(firstname: &str, lastname: &str) -> Self {
        Self {
            firstname: firstname.to_string(),
            lastname: lastname.to_string(),
        }
    }
}
