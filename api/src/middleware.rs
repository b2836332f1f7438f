//! Request logging middleware.
//!
//! Each request runs inside a `request` span carrying its id, method, uri
//! and remote address, so anything a handler logs is tied to the request
//! that caused it.

use std::net::SocketAddr;
use std::time::Instant;

use axum::{
    extract::{ConnectInfo, Request},
    middleware::Next,
    response::Response,
};
use tracing::Instrument;
use uuid::Uuid;

pub async fn request_logger(request: Request, next: Next) -> Response {
    let request_id = Uuid::new_v4();
    let span = tracing::info_span!(
        "request",
        request_id = %request_id,
        method = %request.method(),
        uri = %request.uri(),
        remote = %remote_addr(&request),
    );

    async move {
        let start = Instant::now();
        tracing::info!("Starting handling request...");

        let response = next.run(request).await;

        tracing::info!(
            status_code = response.status().as_u16(),
            took_ms = start.elapsed().as_millis() as u64,
            "Finished handling request..."
        );
        response
    }
    .instrument(span)
    .await
}

/// X-Real-IP 헤더 우선, 없으면 소켓 주소
fn remote_addr(request: &Request) -> String {
    if let Some(real_ip) = request
        .headers()
        .get("x-real-ip")
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
    {
        return real_ip.to_string();
    }

    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;

    #[test]
    fn test_remote_addr_prefers_real_ip_header() {
        let mut request = Request::builder()
            .uri("/api/cryptos")
            .header("x-real-ip", "10.0.0.7")
            .body(Body::empty())
            .unwrap();
        request
            .extensions_mut()
            .insert(ConnectInfo(SocketAddr::from(([127, 0, 0, 1], 5555))));

        assert_eq!(remote_addr(&request), "10.0.0.7");
    }

    #[test]
    fn test_remote_addr_falls_back_to_socket() {
        let mut request = Request::builder().uri("/").body(Body::empty()).unwrap();
        assert_eq!(remote_addr(&request), "unknown");

        request
            .extensions_mut()
            .insert(ConnectInfo(SocketAddr::from(([127, 0, 0, 1], 5555))));
        assert_eq!(remote_addr(&request), "127.0.0.1:5555");
    }
}
