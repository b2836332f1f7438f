//! Error Handling Module
//!
//! Storage errors carry the operation that failed; the HTTP layer decides
//! whether they become status codes or only log lines (see `ErrorPolicy`).
//! Uses thiserror for domain errors and integrates with tracing for structured logging.

use std::fmt;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

// ============ Storage ============

/// 스토리지 에러
///
/// 커넥션, 쿼리, row 디코딩, statement 실행 실패를 모두 포함.
/// 재시도 없이 즉시 호출자에게 전달됨.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("unable to open db connection: {0}")]
    Connection(#[source] sqlx::Error),

    #[error("invalid storage settings: {0}")]
    Config(#[from] crate::config::ConfigError),

    /// 단일 row 조회에서 결과 없음
    #[error("cryptocurrency with crypto_id={crypto_id} not found")]
    NotFound { crypto_id: String },

    /// unique key (crypto_id) 충돌
    #[error("cryptocurrency with crypto_id={crypto_id} already exists")]
    Conflict { crypto_id: String },

    #[error("an error occurred while {context}: {source}")]
    Query {
        context: &'static str,
        #[source]
        source: sqlx::Error,
    },

    #[error("storage is unreachable")]
    Unavailable,
}

impl StorageError {
    /// `map_err`용 헬퍼: sqlx 에러에 작업 컨텍스트를 붙임
    pub(crate) fn query(context: &'static str) -> impl FnOnce(sqlx::Error) -> StorageError {
        move |source| StorageError::Query { context, source }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, StorageError::NotFound { .. })
    }
}

/// 실패 직전까지 읽은 값을 함께 돌려주는 에러
///
/// permissive 정책에서는 `fetched`를 그대로 응답 본문으로 사용함.
#[derive(Debug, Error)]
#[error("{source}")]
pub struct Partial<T: fmt::Debug> {
    pub fetched: T,
    #[source]
    pub source: StorageError,
}

impl<T: fmt::Debug> Partial<T> {
    pub fn new(fetched: T, source: StorageError) -> Self {
        Self { fetched, source }
    }
}

/// 읽기 작업 결과: 성공 값 또는 (부분 결과 + 에러)
pub type Fetch<T> = Result<T, Partial<T>>;

// ============ HTTP ============

/// API 에러 타입
///
/// # Design Decision
///
/// strict 정책에서만 클라이언트에 노출됨
/// - 클라이언트 에러: 4xx (잘못된 body, 없는 리소스, 키 충돌)
/// - 서버 에러: 5xx (스토리지 장애)
///
/// 민감한 내부 정보는 클라이언트에 노출하지 않음
#[derive(Debug, Error)]
pub enum ApiError {
    // ============ 400 Bad Request ============
    #[error("Invalid request body: {0}")]
    BadRequest(String),

    // ============ 404 Not Found ============
    #[error("Resource not found: {0}")]
    NotFound(String),

    // ============ 409 Conflict ============
    #[error("Resource already exists: {0}")]
    Conflict(String),

    // ============ 500 Internal Server Error ============
    #[error("Database error: {0}")]
    DatabaseError(String),

    // ============ 503 Service Unavailable ============
    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),
}

/// API 에러 응답 구조
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message, details) = match &self {
            ApiError::BadRequest(msg) => (
                StatusCode::BAD_REQUEST,
                "BAD_REQUEST",
                "Invalid request body".to_string(),
                Some(msg.clone()),
            ),
            ApiError::NotFound(resource) => (
                StatusCode::NOT_FOUND,
                "NOT_FOUND",
                format!("{} not found", resource),
                None,
            ),
            ApiError::Conflict(resource) => (
                StatusCode::CONFLICT,
                "CONFLICT",
                format!("{} already exists", resource),
                None,
            ),
            ApiError::DatabaseError(_) => {
                // 내부 에러는 클라이언트에 상세 정보 노출 안 함
                tracing::error!(error = %self, "database error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "DATABASE_ERROR",
                    "Database error occurred".to_string(),
                    None,
                )
            }
            ApiError::ServiceUnavailable(service) => (
                StatusCode::SERVICE_UNAVAILABLE,
                "SERVICE_UNAVAILABLE",
                format!("{} is currently unavailable", service),
                None,
            ),
        };

        let body = ErrorResponse {
            error: message,
            code: code.to_string(),
            details,
        };

        (status, Json(body)).into_response()
    }
}

/// StorageError를 ApiError로 변환
impl From<StorageError> for ApiError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound { crypto_id } => {
                ApiError::NotFound(format!("Cryptocurrency {}", crypto_id))
            }
            StorageError::Conflict { crypto_id } => {
                ApiError::Conflict(format!("Cryptocurrency {}", crypto_id))
            }
            StorageError::Unavailable => ApiError::ServiceUnavailable("Storage".to_string()),
            other => ApiError::DatabaseError(other.to_string()),
        }
    }
}

impl<T: fmt::Debug> From<Partial<T>> for ApiError {
    fn from(err: Partial<T>) -> Self {
        err.source.into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_error_status_mapping() {
        let cases = [
            (
                StorageError::NotFound { crypto_id: "BTC".into() },
                StatusCode::NOT_FOUND,
            ),
            (
                StorageError::Conflict { crypto_id: "BTC".into() },
                StatusCode::CONFLICT,
            ),
            (StorageError::Unavailable, StatusCode::SERVICE_UNAVAILABLE),
            (
                StorageError::Query {
                    context: "querying cryptos",
                    source: sqlx::Error::RowNotFound,
                },
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (err, expected) in cases {
            let response = ApiError::from(err).into_response();
            assert_eq!(response.status(), expected);
        }
    }

    #[test]
    fn test_partial_keeps_fetched_value() {
        let partial = Partial::new(vec![1, 2], StorageError::Unavailable);

        assert_eq!(partial.to_string(), "storage is unreachable");
        assert_eq!(partial.fetched, vec![1, 2]);
    }

    #[test]
    fn test_query_error_carries_context() {
        let err = StorageError::query("inserting author")(sqlx::Error::PoolTimedOut);
        assert!(err.to_string().starts_with("an error occurred while inserting author"));
        assert!(!err.is_not_found());
    }
}
