//! API Routes Module
//!
//! 모든 HTTP 엔드포인트 정의
//!
//! # Routes
//! - `GET    /api/cryptos`             - 전체 조회
//! - `GET    /api/cryptos/:crypto_id`  - 단건 조회
//! - `POST   /api/cryptos`             - 생성
//! - `PUT    /api/cryptos/:crypto_id`  - 수정 (전체 목록 응답)
//! - `DELETE /api/cryptos/:crypto_id`  - 삭제 (남은 목록 응답)
//! - `GET    /api/health`              - 헬스 체크

pub mod cryptos;
pub mod health;

use axum::{
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Serialize;

use crate::{config::ErrorPolicy, error::ApiError, AppState};

pub const ALL_CRYPTOS_URL: &str = "/api/cryptos";
pub const SINGLE_CRYPTO_URL: &str = "/api/cryptos/:crypto_id";
pub const HEALTH_CHECK_URL: &str = "/api/health";

/// 미들웨어/상태 주입 전의 라우터
pub fn api_router() -> Router<AppState> {
    Router::new()
        .route(
            ALL_CRYPTOS_URL,
            get(cryptos::get_all).post(cryptos::add),
        )
        .route(
            SINGLE_CRYPTO_URL,
            get(cryptos::get_by_crypto_id)
                .put(cryptos::update)
                .delete(cryptos::remove),
        )
        .route(HEALTH_CHECK_URL, get(health::health_check))
}

/// 실패한 작업의 응답 결정
///
/// - Permissive: 200 + best-effort body (에러는 이미 로그로 남김)
/// - Strict: 에러를 HTTP 상태 코드로 변환
pub(crate) fn fallback<T, E>(policy: ErrorPolicy, best_effort: T, err: E) -> Response
where
    T: Serialize,
    E: Into<ApiError>,
{
    match policy {
        ErrorPolicy::Permissive => Json(best_effort).into_response(),
        ErrorPolicy::Strict => err.into().into_response(),
    }
}
