//! Cryptocurrency Endpoints
//!
//! CRUD over the repository. Every handler runs exactly the repository
//! calls of its route and answers with JSON; how failures surface depends
//! on the configured `ErrorPolicy`.

use axum::{
    body::Bytes,
    extract::{Path, State},
    response::{IntoResponse, Response},
    Json,
};

use super::fallback;
use crate::{config::ErrorPolicy, error::ApiError, types::Cryptocurrency, AppState};

// ============ Handlers ============

/// GET /api/cryptos
///
/// 전체 목록. 조회 실패 시 (permissive) 실패 전까지 읽은 목록 응답
pub async fn get_all(State(state): State<AppState>) -> Response {
    match state.repo.get_all().await {
        Ok(cryptos) => Json(cryptos).into_response(),
        Err(err) => {
            tracing::error!(error = %err, "an error occurred while getting all cryptos from repository");
            fallback(state.error_policy, err.fetched, err.source)
        }
    }
}

/// GET /api/cryptos/:crypto_id
///
/// 없는 id는 (permissive) zero-valued 객체로 응답
///
/// ```json
/// { "name": "", "crypto_id": "", "price": 0.0, "authors": [] }
/// ```
pub async fn get_by_crypto_id(
    State(state): State<AppState>,
    Path(crypto_id): Path<String>,
) -> Response {
    match state.repo.get_by_id(&crypto_id).await {
        Ok(crypto) => Json(crypto).into_response(),
        Err(err) => {
            tracing::error!(
                error = %err,
                crypto_id = %crypto_id,
                "an error occurred while getting crypto from repository"
            );
            fallback(state.error_policy, err.fetched, err.source)
        }
    }
}

/// POST /api/cryptos
///
/// body를 저장하고 그대로 echo
pub async fn add(State(state): State<AppState>, body: Bytes) -> Response {
    let crypto = match decode_crypto(state.error_policy, &body) {
        Ok(crypto) => crypto,
        Err(err) => return err.into_response(),
    };

    if let Err(err) = state.repo.add(&crypto).await {
        tracing::error!(
            error = %err,
            crypto_id = %crypto.crypto_id,
            "an error occurred while adding crypto to repository"
        );
        return fallback(state.error_policy, crypto, err);
    }

    Json(crypto).into_response()
}

/// PUT /api/cryptos/:crypto_id
///
/// path의 crypto_id로 찾은 항목을 body로 교체한 뒤 전체 목록 응답
pub async fn update(
    State(state): State<AppState>,
    Path(crypto_id): Path<String>,
    body: Bytes,
) -> Response {
    let new_crypto = match decode_crypto(state.error_policy, &body) {
        Ok(crypto) => crypto,
        Err(err) => return err.into_response(),
    };

    if let Err(err) = state.repo.update(&crypto_id, &new_crypto).await {
        tracing::error!(
            error = %err,
            crypto_id = %crypto_id,
            "an error occurred while updating crypto in repository"
        );
        if state.error_policy == ErrorPolicy::Strict {
            return ApiError::from(err).into_response();
        }
    }

    get_all(State(state)).await
}

/// DELETE /api/cryptos/:crypto_id
///
/// 삭제 후 남은 전체 목록 응답
pub async fn remove(State(state): State<AppState>, Path(crypto_id): Path<String>) -> Response {
    if let Err(err) = state.repo.remove(&crypto_id).await {
        tracing::error!(
            error = %err,
            crypto_id = %crypto_id,
            "an error occurred while deleting crypto from repository"
        );
        if state.error_policy == ErrorPolicy::Strict {
            return ApiError::from(err).into_response();
        }
    }

    get_all(State(state)).await
}

// ============ Helpers ============

/// 요청 body를 Cryptocurrency로 디코딩
///
/// permissive 정책에서는 잘못된 JSON도 zero-valued 객체로 진행
fn decode_crypto(policy: ErrorPolicy, body: &[u8]) -> Result<Cryptocurrency, ApiError> {
    match serde_json::from_slice::<Cryptocurrency>(body) {
        Ok(crypto) => Ok(crypto),
        Err(err) => {
            tracing::error!(error = %err, "an error occurred while decoding crypto");
            match policy {
                ErrorPolicy::Permissive => Ok(Cryptocurrency::default()),
                ErrorPolicy::Strict => Err(ApiError::BadRequest(err.to_string())),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Author;

    #[test]
    fn test_decode_valid_body() {
        let body = br#"{"name":"Bitcoin","crypto_id":"BTC","price":45000.3,"authors":[{"firstname":"Satoshi","lastname":"Nakamoto"}]}"#;

        let crypto = decode_crypto(ErrorPolicy::Strict, body).unwrap();
        assert_eq!(crypto.crypto_id, "BTC");
        assert_eq!(crypto.authors, vec![Author::new("Satoshi", "Nakamoto")]);
    }

    #[test]
    fn test_decode_malformed_body_by_policy() {
        let body = b"{not json";

        let crypto = decode_crypto(ErrorPolicy::Permissive, body).unwrap();
        assert_eq!(crypto, Cryptocurrency::default());

        let err = decode_crypto(ErrorPolicy::Strict, body).unwrap_err();
        assert!(matches!(err, ApiError::BadRequest(_)));
    }

    #[test]
    fn test_decode_empty_body_is_zero_value() {
        assert_eq!(
            decode_crypto(ErrorPolicy::Permissive, b"").unwrap(),
            Cryptocurrency::default()
        );
    }
}
