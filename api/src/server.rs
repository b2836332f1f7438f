//! Server Lifecycle
//!
//! # States
//!
//! ```text
//!  Initialized ──bind──▶ Listening ──cancel──▶ Draining ──drained──▶ Stopped
//!                           │                      │
//!                           └──bind/serve error────┴──window expired──▶ Stopped (fatal)
//! ```
//!
//! # Interview Q&A
//!
//! Q: graceful shutdown은 어떻게 동작하는가?
//! A: CancellationToken이 취소되면
//!    1. accept loop 종료, listener close (새 연결 거부)
//!    2. 각 연결에 hyper graceful shutdown 전달 (keep-alive 해제, idle 연결 즉시 종료)
//!    3. in-flight 요청은 `shutdown_timeout` 동안 완료 대기
//!    4. 시간 초과 시 남은 연결 task를 abort (핸들러 future drop) → `ShutdownTimeout`
//!
//! Q: 왜 `axum::serve` 대신 직접 accept loop를 도는가?
//! A: `axum::serve`는 연결 task를 detach해서 spawn함. serve future를 drop해도
//!    진행 중인 핸들러는 계속 돌고 응답까지 보냄. 연결 task를 `JoinSet`으로
//!    들고 있어야 시간 초과 시 abort 가능.
//!
//! Q: read/write/idle timeout은?
//! A: read: 요청 body 수신 제한 (RequestBodyTimeoutLayer)
//!    write: 핸들러 응답 제한 (TimeoutLayer, 초과 시 408)
//!    idle: 설정/로그만 하고 연결 단위로는 적용하지 않음

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{ConnectInfo, Request},
    middleware, Router,
};
use hyper::{body::Incoming, server::conn::http1, service::service_fn};
use hyper_util::rt::TokioIo;
use thiserror::Error;
use tokio::{
    net::{TcpListener, TcpStream},
    sync::watch,
    task::{JoinHandle, JoinSet},
};
use tokio_util::sync::CancellationToken;
use tower::{ServiceBuilder, ServiceExt};
use tower_http::timeout::{RequestBodyTimeoutLayer, TimeoutLayer};

use crate::{config::ServerConfig, middleware::request_logger, routes, AppState};

/// accept 실패 (fd 고갈 등) 후 재시도 전 대기
const ACCEPT_ERROR_BACKOFF: Duration = Duration::from_millis(100);

/// 서버 생명주기 상태
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerState {
    Initialized,
    Listening,
    Draining,
    Stopped,
}

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("failed to listen on {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("server error: {0}")]
    Io(#[from] std::io::Error),

    #[error("couldn't gracefully shutdown the server within {0:?}")]
    ShutdownTimeout(Duration),
}

/// 라우터 + 요청 단위 미들웨어 + 상태 주입
pub fn build_router(state: AppState, config: &ServerConfig) -> Router {
    routes::api_router()
        .layer(
            ServiceBuilder::new()
                .layer(middleware::from_fn(request_logger))
                .layer(TimeoutLayer::new(config.write_timeout))
                .layer(RequestBodyTimeoutLayer::new(config.read_timeout)),
        )
        .with_state(state)
}

/// HTTP 서버
pub struct Server {
    config: ServerConfig,
    router: Router,
    state: Arc<watch::Sender<ServerState>>,
}

impl Server {
    pub fn new(config: ServerConfig, router: Router) -> Self {
        let (state, _) = watch::channel(ServerState::Initialized);
        Self {
            config,
            router,
            state: Arc::new(state),
        }
    }

    /// 상태 변화 구독
    pub fn subscribe(&self) -> watch::Receiver<ServerState> {
        self.state.subscribe()
    }

    pub fn state(&self) -> ServerState {
        *self.state.borrow()
    }

    /// `0.0.0.0:{port}`에 bind 후 `shutdown`이 취소될 때까지 서비스
    pub async fn run(self, shutdown: CancellationToken) -> Result<(), ServerError> {
        let addr = SocketAddr::from(([0, 0, 0, 0], self.config.port));

        let listener = match TcpListener::bind(addr).await {
            Ok(listener) => listener,
            Err(source) => {
                self.state.send_replace(ServerState::Stopped);
                return Err(ServerError::Bind { addr, source });
            }
        };

        self.serve(listener, shutdown).await
    }

    /// 이미 bind된 listener로 서비스 (테스트에서 임의 포트 사용)
    pub async fn serve(self, listener: TcpListener, shutdown: CancellationToken) -> Result<(), ServerError> {
        let local_addr = listener.local_addr()?;
        tracing::info!(
            addr = %local_addr,
            read_timeout = ?self.config.read_timeout,
            write_timeout = ?self.config.write_timeout,
            idle_timeout = ?self.config.idle_timeout,
            "Starting and listening"
        );
        self.state.send_replace(ServerState::Listening);

        let mut connections = JoinSet::new();
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                accepted = listener.accept() => match accepted {
                    Ok((stream, remote)) => {
                        connections.spawn(serve_connection(
                            stream,
                            remote,
                            self.router.clone(),
                            shutdown.clone(),
                        ));
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "Failed to accept connection");
                        tokio::time::sleep(ACCEPT_ERROR_BACKOFF).await;
                    }
                },
                Some(joined) = connections.join_next(), if !connections.is_empty() => {
                    log_join_error(joined);
                }
            }
        }

        drop(listener);
        self.state.send_replace(ServerState::Draining);
        tracing::info!(
            open_connections = connections.len(),
            "Shutdown requested, draining in-flight requests"
        );

        let grace = self.config.shutdown_timeout;
        let drained = tokio::time::timeout(grace, async {
            while let Some(joined) = connections.join_next().await {
                log_join_error(joined);
            }
        })
        .await;

        let result = match drained {
            Ok(()) => Ok(()),
            Err(_) => {
                tracing::warn!(
                    open_connections = connections.len(),
                    "Shutdown window expired, aborting remaining connections"
                );
                connections.abort_all();
                while connections.join_next().await.is_some() {}
                Err(ServerError::ShutdownTimeout(grace))
            }
        };

        self.state.send_replace(ServerState::Stopped);
        match &result {
            Ok(()) => tracing::info!("Server gracefully shutdown"),
            Err(err) => tracing::error!(error = %err, "Server stopped with error"),
        }
        result
    }
}

/// 연결 하나를 HTTP/1.1로 서비스
///
/// `shutdown`이 취소되면 keep-alive를 끊고 진행 중인 요청만 마저 처리함.
async fn serve_connection(stream: TcpStream, remote: SocketAddr, router: Router, shutdown: CancellationToken) {
    let service = service_fn(move |mut request: Request<Incoming>| {
        request.extensions_mut().insert(ConnectInfo(remote));
        router.clone().oneshot(request)
    });

    let conn = http1::Builder::new().serve_connection(TokioIo::new(stream), service);
    tokio::pin!(conn);

    let mut draining = false;
    let result = loop {
        tokio::select! {
            res = conn.as_mut() => break res,
            _ = shutdown.cancelled(), if !draining => {
                draining = true;
                conn.as_mut().graceful_shutdown();
            }
        }
    };

    if let Err(e) = result {
        tracing::debug!(remote = %remote, error = %e, "Connection closed with error");
    }
}

fn log_join_error(joined: Result<(), tokio::task::JoinError>) {
    if let Err(e) = joined {
        if e.is_panic() {
            tracing::error!(error = %e, "Connection task panicked");
        }
    }
}

/// Ctrl+C / SIGTERM 수신 시 `token` 취소
///
/// 부모가 먼저 token을 취소하면 signal 대기 없이 종료
pub fn spawn_signal_watcher(token: CancellationToken) -> JoinHandle<()> {
    tokio::spawn(async move {
        let ctrl_c = async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!("Failed to install Ctrl+C handler: {}", e);
                std::future::pending::<()>().await;
            }
        };

        #[cfg(unix)]
        let terminate = async {
            match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
                Ok(mut stream) => {
                    stream.recv().await;
                }
                Err(e) => {
                    tracing::error!("Failed to install SIGTERM handler: {}", e);
                    std::future::pending::<()>().await;
                }
            }
        };

        #[cfg(not(unix))]
        let terminate = std::future::pending::<()>();

        tokio::select! {
            _ = ctrl_c => {
                tracing::info!("Received Ctrl+C, exiting gracefully...");
            }
            _ = terminate => {
                tracing::info!("Received SIGTERM, exiting gracefully...");
            }
            _ = token.cancelled() => return,
        }

        token.cancel();
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use tokio::sync::Notify;

    use crate::config::ErrorPolicy;
    use crate::db::{CryptoRepository, MemoryRepository};
    use crate::error::{Fetch, Partial, StorageError};
    use crate::types::Cryptocurrency;

    /// get_all이 `delay`만큼 걸리는 저장소
    struct SlowRepository {
        delay: Duration,
        started: Notify,
        completed: AtomicUsize,
    }

    impl SlowRepository {
        fn new(delay: Duration) -> Arc<Self> {
            Arc::new(Self {
                delay,
                started: Notify::new(),
                completed: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl CryptoRepository for SlowRepository {
        async fn get_all(&self) -> Fetch<Vec<Cryptocurrency>> {
            self.started.notify_one();
            tokio::time::sleep(self.delay).await;
            self.completed.fetch_add(1, Ordering::SeqCst);
            Ok(Vec::new())
        }

        async fn get_by_id(&self, _crypto_id: &str) -> Fetch<Cryptocurrency> {
            Err(Partial::new(Cryptocurrency::default(), StorageError::Unavailable))
        }

        async fn add(&self, _crypto: &Cryptocurrency) -> Result<(), StorageError> {
            Ok(())
        }

        async fn update(&self, _old: &str, _crypto: &Cryptocurrency) -> Result<(), StorageError> {
            Ok(())
        }

        async fn remove(&self, _crypto_id: &str) -> Result<(), StorageError> {
            Ok(())
        }

        async fn ping(&self) -> Result<(), StorageError> {
            Ok(())
        }
    }

    fn test_server(shutdown_timeout: Duration) -> Server {
        server_with(Arc::new(MemoryRepository::new()), shutdown_timeout)
    }

    fn server_with(repo: Arc<dyn CryptoRepository>, shutdown_timeout: Duration) -> Server {
        let state = AppState::new(repo, ErrorPolicy::Permissive);
        let config = ServerConfig {
            shutdown_timeout,
            ..ServerConfig::default()
        };
        let router = build_router(state, &config);
        Server::new(config, router)
    }

    #[tokio::test]
    async fn test_lifecycle_reaches_stopped_after_cancel() {
        let server = test_server(Duration::from_secs(5));
        let mut states = server.subscribe();
        assert_eq!(server.state(), ServerState::Initialized);

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let token = CancellationToken::new();
        let handle = tokio::spawn(server.serve(listener, token.clone()));

        states.wait_for(|s| *s == ServerState::Listening).await.unwrap();
        token.cancel();

        handle.await.unwrap().unwrap();
        assert_eq!(*states.borrow(), ServerState::Stopped);
    }

    #[tokio::test]
    async fn test_bind_failure_is_reported() {
        let taken = std::net::TcpListener::bind("0.0.0.0:0").unwrap();
        let port = taken.local_addr().unwrap().port();

        let mut server = test_server(Duration::from_secs(1));
        server.config.port = port;
        let states = server.subscribe();

        let err = server.run(CancellationToken::new()).await.unwrap_err();
        assert!(matches!(err, ServerError::Bind { .. }));
        assert_eq!(*states.borrow(), ServerState::Stopped);
    }

    #[tokio::test]
    async fn test_signal_watcher_exits_on_parent_cancel() {
        let token = CancellationToken::new();
        let watcher = spawn_signal_watcher(token.clone());

        token.cancel();
        watcher.await.unwrap();
    }

    /// 서버를 임의 포트로 띄우고 (주소, 상태 구독, cancel token, serve handle) 반환
    async fn start(
        server: Server,
    ) -> (
        SocketAddr,
        watch::Receiver<ServerState>,
        CancellationToken,
        JoinHandle<Result<(), ServerError>>,
    ) {
        let mut states = server.subscribe();
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let token = CancellationToken::new();
        let handle = tokio::spawn(server.serve(listener, token.clone()));
        states.wait_for(|s| *s == ServerState::Listening).await.unwrap();
        (addr, states, token, handle)
    }

    #[tokio::test]
    async fn test_in_flight_request_completes_during_drain() {
        let repo = SlowRepository::new(Duration::from_millis(300));
        let (addr, mut states, token, handle) =
            start(server_with(repo.clone(), Duration::from_secs(5))).await;

        let request = tokio::spawn(reqwest::get(format!("http://{addr}/api/cryptos")));
        repo.started.notified().await;
        token.cancel();

        states.wait_for(|s| *s == ServerState::Draining).await.unwrap();

        let response = request.await.unwrap().unwrap();
        assert_eq!(response.status(), reqwest::StatusCode::OK);
        handle.await.unwrap().unwrap();
        assert_eq!(repo.completed.load(Ordering::SeqCst), 1);
        assert_eq!(*states.borrow(), ServerState::Stopped);
    }

    #[tokio::test]
    async fn test_shutdown_window_expiry_aborts_requests() {
        let repo = SlowRepository::new(Duration::from_secs(2));
        let (addr, states, token, handle) =
            start(server_with(repo.clone(), Duration::from_millis(200))).await;

        let request = tokio::spawn(reqwest::get(format!("http://{addr}/api/cryptos")));
        repo.started.notified().await;
        token.cancel();

        let err = handle.await.unwrap().unwrap_err();
        assert!(matches!(err, ServerError::ShutdownTimeout(d) if d == Duration::from_millis(200)));
        assert_eq!(*states.borrow(), ServerState::Stopped);

        // 연결이 끊겨 응답을 받지 못함
        assert!(request.await.unwrap().is_err());

        // 핸들러가 drop되어 끝까지 실행되지 않음
        tokio::time::sleep(Duration::from_millis(2500)).await;
        assert_eq!(repo.completed.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_idle_keep_alive_connection_does_not_hold_drain() {
        let (addr, _states, token, handle) = start(test_server(Duration::from_secs(5))).await;

        // keep-alive 연결을 열어둔 채로 둠
        let client = reqwest::Client::new();
        let response = client.get(format!("http://{addr}/api/health")).send().await.unwrap();
        assert_eq!(response.status(), reqwest::StatusCode::OK);

        token.cancel();
        let result = tokio::time::timeout(Duration::from_secs(1), handle).await;
        result.expect("drain should not wait for idle connections").unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_new_connections_refused_after_shutdown() {
        let (addr, _states, token, handle) = start(test_server(Duration::from_secs(5))).await;

        token.cancel();
        handle.await.unwrap().unwrap();

        assert!(TcpStream::connect(addr).await.is_err());
    }
}
