//! Companion HTTP Client
//!
//! 서버 API를 감싼 얇은 typed client. `crypto-client` 데모 바이너리와
//! 통합 테스트에서 사용.

use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use thiserror::Error;

use crate::config::ClientConfig;
use crate::types::Cryptocurrency;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("an error occurred while making {method} request to {url}: {source}")]
    Request {
        method: &'static str,
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("an error occurred while decoding response from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: reqwest::Error,
    },
}

pub struct CryptoClient {
    http: Client,
    base_url: String,
}

impl CryptoClient {
    pub fn new(config: &ClientConfig) -> Result<Self, reqwest::Error> {
        let mut builder = Client::builder().timeout(config.timeout);
        if config.disable_keep_alives {
            builder = builder.pool_max_idle_per_host(0);
        }

        Ok(Self {
            http: builder.build()?,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    /// GET /api/health → 상태 코드 그대로 반환
    pub async fn health_check(&self) -> Result<StatusCode, ClientError> {
        let url = self.url("/api/health");
        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|source| ClientError::Request { method: "GET", url, source })?;

        Ok(response.status())
    }

    pub async fn get_cryptos(&self) -> Result<Vec<Cryptocurrency>, ClientError> {
        let url = self.url("/api/cryptos");
        let request = self.http.get(&url);
        self.send_json("GET", url, request).await
    }

    /// 없는 id면 서버가 zero-valued 객체로 응답 (permissive 정책)
    pub async fn get_crypto(&self, crypto_id: &str) -> Result<Cryptocurrency, ClientError> {
        let url = self.crypto_url(crypto_id);
        let request = self.http.get(&url);
        self.send_json("GET", url, request).await
    }

    pub async fn post_crypto(&self, crypto: &Cryptocurrency) -> Result<Cryptocurrency, ClientError> {
        let url = self.url("/api/cryptos");
        let request = self.http.post(&url).json(crypto);
        self.send_json("POST", url, request).await
    }

    /// `crypto.crypto_id` 경로로 PUT, 갱신 후 전체 목록 반환
    pub async fn put_crypto(&self, crypto: &Cryptocurrency) -> Result<Vec<Cryptocurrency>, ClientError> {
        let url = self.crypto_url(&crypto.crypto_id);
        let request = self.http.put(&url).json(crypto);
        self.send_json("PUT", url, request).await
    }

    pub async fn delete_crypto(&self, crypto_id: &str) -> Result<Vec<Cryptocurrency>, ClientError> {
        let url = self.crypto_url(crypto_id);
        let request = self.http.delete(&url);
        self.send_json("DELETE", url, request).await
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn crypto_url(&self, crypto_id: &str) -> String {
        format!("{}/api/cryptos/{}", self.base_url, crypto_id)
    }

    async fn send_json<T: DeserializeOwned>(
        &self,
        method: &'static str,
        url: String,
        request: reqwest::RequestBuilder,
    ) -> Result<T, ClientError> {
        let response = match request.send().await {
            Ok(response) => response,
            Err(source) => return Err(ClientError::Request { method, url, source }),
        };

        tracing::debug!(method, url = %url, status = response.status().as_u16(), "server response");

        response
            .json::<T>()
            .await
            .map_err(|source| ClientError::Decode { url, source })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_urls_strip_trailing_slash() {
        let config = ClientConfig {
            base_url: "http://localhost:8080/".to_string(),
            ..ClientConfig::default()
        };
        let client = CryptoClient::new(&config).unwrap();

        assert_eq!(client.url("/api/health"), "http://localhost:8080/api/health");
        assert_eq!(client.crypto_url("BTC"), "http://localhost:8080/api/cryptos/BTC");
    }
}
