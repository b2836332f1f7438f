//! Health Check Endpoint
//!
//! # Interview Q&A
//!
//! Q: Health check 엔드포인트는 왜 필요한가?
//! A: 3가지 용도
//!    1. 로드밸런서 헬스체크 (ALB, nginx)
//!    2. 컨테이너 HEALTHCHECK (`crypto-healthcheck` 바이너리)
//!    3. 모니터링 시스템 연동
//!
//! Q: DB 연결 상태도 체크하는 이유는?
//! A: "깊은 헬스체크"(deep health check) 패턴
//!    - 단순 200 OK: 프로세스 살아있음
//!    - DB 체크: 실제 서비스 가능 상태
//!    - 데이터는 읽거나 쓰지 않음 (ping만 수행)

use axum::{extract::State, http::StatusCode};

use crate::AppState;

/// GET /api/health
///
/// 스토리지 ping 성공 시 200, 실패 시 503. body 없음
pub async fn health_check(State(state): State<AppState>) -> StatusCode {
    let started = std::time::Instant::now();

    match state.repo.ping().await {
        Ok(()) => {
            tracing::debug!(latency_ms = started.elapsed().as_millis() as u64, "storage is reachable");
            StatusCode::OK
        }
        Err(err) => {
            tracing::warn!(error = %err, "storage ping failed");
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}
