//! Configuration Module
//!
//! # Interview Q&A
//!
//! Q: 환경변수 vs 설정 파일, 어떤 방식을 선택했고 왜인가?
//! A: 환경변수를 선택 (`.env` 파일은 dotenvy로 로드)
//!    - Docker/K8s 배포 시 환경별 설정 분리 용이
//!    - 민감 정보(DB 비밀번호 등)를 코드에 포함하지 않음
//!
//! Q: 설정 검증은 어떻게 하는가?
//! A: 두 단계
//!    1. from_env(): 값 파싱 실패 → `ConfigError::Invalid`
//!    2. validate(): 빈 값/0 값 → `ConfigError::Missing`
//!    - 앱 시작 시점에 모든 설정 검증 (fail-fast)

use std::{env, fmt, str::FromStr, time::Duration};

use sqlx::postgres::{PgConnectOptions, PgSslMode};
use thiserror::Error;

/// 설정 로드/검증 에러
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("validate {section} settings: {field} missing")]
    Missing {
        section: &'static str,
        field: &'static str,
    },

    #[error("invalid value for {key}: {value:?}")]
    Invalid { key: &'static str, value: String },
}

// ============ Server ============

/// HTTP 서버 설정
#[derive(Debug, Clone, PartialEq)]
pub struct ServerConfig {
    pub port: u16,
    /// 요청 body 수신 제한 시간
    pub read_timeout: Duration,
    /// 핸들러 응답 완료 제한 시간
    pub write_timeout: Duration,
    pub idle_timeout: Duration,
    /// graceful shutdown 시 in-flight 요청 대기 시간
    pub shutdown_timeout: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            read_timeout: Duration::from_secs(15),
            write_timeout: Duration::from_secs(15),
            idle_timeout: Duration::from_secs(45),
            shutdown_timeout: Duration::from_secs(10),
        }
    }
}

impl ServerConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let missing = |field| ConfigError::Missing { section: "Server", field };

        if self.port == 0 {
            return Err(missing("Port"));
        }
        if self.read_timeout.is_zero() {
            return Err(missing("ReadTimeout"));
        }
        if self.write_timeout.is_zero() {
            return Err(missing("WriteTimeout"));
        }
        if self.idle_timeout.is_zero() {
            return Err(missing("IdleTimeout"));
        }
        if self.shutdown_timeout.is_zero() {
            return Err(missing("ShutdownTimeout"));
        }
        Ok(())
    }
}

// ============ Storage ============

/// 스토리지 엔진 선택
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageType {
    Postgres,
    /// 프로세스 내 메모리 저장소 (개발/테스트용)
    Memory,
}

impl FromStr for StorageType {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "postgres" | "postgresql" => Ok(Self::Postgres),
            "memory" => Ok(Self::Memory),
            _ => Err(()),
        }
    }
}

/// PostgreSQL 접속 정보
#[derive(Clone, PartialEq)]
pub struct DataSource {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub dbname: String,
    pub sslmode: String,
}

impl Default for DataSource {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 5432,
            user: "postgres".to_string(),
            password: "postgres".to_string(),
            dbname: "postgres".to_string(),
            sslmode: "disable".to_string(),
        }
    }
}

impl DataSource {
    /// 접속 옵션. 비밀번호 등 특수문자는 URL 조립 없이 그대로 전달됨
    pub fn connect_options(&self) -> Result<PgConnectOptions, ConfigError> {
        let ssl_mode = self.sslmode.parse::<PgSslMode>().map_err(|_| ConfigError::Invalid {
            key: "DB_SSLMODE",
            value: self.sslmode.clone(),
        })?;

        Ok(PgConnectOptions::new()
            .host(&self.host)
            .port(self.port)
            .username(&self.user)
            .password(&self.password)
            .database(&self.dbname)
            .ssl_mode(ssl_mode))
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let missing = |field| ConfigError::Missing { section: "DataSource", field };

        if self.host.is_empty() {
            return Err(missing("Host"));
        }
        if self.port == 0 {
            return Err(missing("Port"));
        }
        if self.user.is_empty() {
            return Err(missing("User"));
        }
        if self.password.is_empty() {
            return Err(missing("Password"));
        }
        if self.dbname.is_empty() {
            return Err(missing("Database name"));
        }
        if self.sslmode.is_empty() {
            return Err(missing("SSL Mode"));
        }
        Ok(())
    }
}

// 로그에 비밀번호가 찍히지 않도록 직접 구현
impl fmt::Debug for DataSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DataSource")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &"***")
            .field("dbname", &self.dbname)
            .field("sslmode", &self.sslmode)
            .finish()
    }
}

impl fmt::Display for DataSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "postgres://{}:***@{}:{}/{}?sslmode={}",
            self.user, self.host, self.port, self.dbname, self.sslmode
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StorageConfig {
    pub storage_type: StorageType,
    pub data_source: DataSource,
    /// 설정되면 data_source 대신 그대로 사용
    pub database_url: Option<String>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            storage_type: StorageType::Postgres,
            data_source: DataSource::default(),
            database_url: None,
        }
    }
}

impl StorageConfig {
    /// `DATABASE_URL`이 있으면 그 URL을, 없으면 data_source를 사용
    pub fn connect_options(&self) -> Result<PgConnectOptions, ConfigError> {
        match &self.database_url {
            // URL에 비밀번호가 섞여 있으므로 에러에 원문을 남기지 않음
            Some(url) => url.parse::<PgConnectOptions>().map_err(|_| ConfigError::Invalid {
                key: "DATABASE_URL",
                value: "***".to_string(),
            }),
            None => self.data_source.connect_options(),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.storage_type == StorageType::Memory {
            return Ok(());
        }
        if self.database_url.is_none() {
            self.data_source.validate()?;
        }
        self.connect_options().map(|_| ())
    }
}

// ============ Logger ============

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogOutput {
    Stdout,
    Stderr,
}

/// 로거 설정 (`logging::init_tracing`에 전달됨)
#[derive(Debug, Clone, PartialEq)]
pub struct LogConfig {
    /// 이 레벨 이상만 출력. RUST_LOG가 있으면 RUST_LOG 우선
    pub level: tracing::Level,
    pub format: LogFormat,
    pub output: LogOutput,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: tracing::Level::INFO,
            format: LogFormat::Text,
            output: LogOutput::Stdout,
        }
    }
}

// ============ API ============

/// 핸들러 실패 처리 정책
///
/// - `Permissive`: 에러는 로그만 남기고 200 + best-effort body 응답
/// - `Strict`: 에러 종류별 HTTP 상태 코드 (400/404/409/500)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ErrorPolicy {
    #[default]
    Permissive,
    Strict,
}

// ============ Application ============

/// 서버 애플리케이션 설정
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Config {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub log: LogConfig,
    pub error_policy: ErrorPolicy,
}

impl Config {
    /// 환경변수에서 설정 로드
    ///
    /// # Environment Variables (모두 옵션, 기본값 제공)
    ///
    /// - `PORT`, `SERVER_READ_TIMEOUT_SECS`, `SERVER_WRITE_TIMEOUT_SECS`,
    ///   `SERVER_IDLE_TIMEOUT_SECS`, `SERVER_SHUTDOWN_TIMEOUT_SECS`
    /// - `STORAGE_TYPE`: postgres | memory
    /// - `DB_HOST`, `DB_PORT`, `DB_USER`, `DB_PASSWORD`, `DB_NAME`, `DB_SSLMODE`
    /// - `DATABASE_URL`: 있으면 DB_* 대신 사용
    /// - `LOG_LEVEL`, `LOG_FORMAT` (text | json), `LOG_OUTPUT` (stdout | stderr)
    /// - `API_ERROR_POLICY`: permissive | strict
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// 임의의 key 조회 함수로 설정 구성 (테스트에서 환경변수 대신 사용)
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Config::default();

        let server = ServerConfig {
            port: parse_or(&lookup, "PORT", defaults.server.port)?,
            read_timeout: secs_or(&lookup, "SERVER_READ_TIMEOUT_SECS", defaults.server.read_timeout)?,
            write_timeout: secs_or(&lookup, "SERVER_WRITE_TIMEOUT_SECS", defaults.server.write_timeout)?,
            idle_timeout: secs_or(&lookup, "SERVER_IDLE_TIMEOUT_SECS", defaults.server.idle_timeout)?,
            shutdown_timeout: secs_or(
                &lookup,
                "SERVER_SHUTDOWN_TIMEOUT_SECS",
                defaults.server.shutdown_timeout,
            )?,
        };

        let ds = defaults.storage.data_source;
        let storage = StorageConfig {
            storage_type: parse_with(&lookup, "STORAGE_TYPE", defaults.storage.storage_type, |s| {
                s.parse().ok()
            })?,
            data_source: DataSource {
                host: lookup("DB_HOST").unwrap_or(ds.host),
                port: parse_or(&lookup, "DB_PORT", ds.port)?,
                user: lookup("DB_USER").unwrap_or(ds.user),
                password: lookup("DB_PASSWORD").unwrap_or(ds.password),
                dbname: lookup("DB_NAME").unwrap_or(ds.dbname),
                sslmode: lookup("DB_SSLMODE").unwrap_or(ds.sslmode),
            },
            database_url: lookup("DATABASE_URL").filter(|url| !url.is_empty()),
        };

        let log = LogConfig {
            level: parse_with(&lookup, "LOG_LEVEL", defaults.log.level, |s| s.parse().ok())?,
            format: parse_with(&lookup, "LOG_FORMAT", defaults.log.format, |s| {
                match s.to_lowercase().as_str() {
                    "text" => Some(LogFormat::Text),
                    "json" => Some(LogFormat::Json),
                    _ => None,
                }
            })?,
            output: parse_with(&lookup, "LOG_OUTPUT", defaults.log.output, |s| {
                match s.to_lowercase().as_str() {
                    "stdout" | "/dev/stdout" => Some(LogOutput::Stdout),
                    "stderr" | "/dev/stderr" => Some(LogOutput::Stderr),
                    _ => None,
                }
            })?,
        };

        let error_policy = parse_with(&lookup, "API_ERROR_POLICY", defaults.error_policy, |s| {
            match s.to_lowercase().as_str() {
                "permissive" => Some(ErrorPolicy::Permissive),
                "strict" => Some(ErrorPolicy::Strict),
                _ => None,
            }
        })?;

        Ok(Config {
            server,
            storage,
            log,
            error_policy,
        })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.server.validate()?;
        self.storage.validate()
    }
}

// ============ Client ============

/// companion client 설정
#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
    /// 서버 주소 (예: http://localhost:8080)
    pub base_url: String,
    pub timeout: Duration,
    pub disable_keep_alives: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080".to_string(),
            timeout: Duration::from_secs(15),
            disable_keep_alives: false,
        }
    }
}

impl ClientConfig {
    /// `CLIENT_BASE_URL`, `CLIENT_TIMEOUT_SECS`, `CLIENT_DISABLE_KEEP_ALIVES`
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = ClientConfig::default();

        Ok(ClientConfig {
            base_url: lookup("CLIENT_BASE_URL").unwrap_or(defaults.base_url),
            timeout: secs_or(&lookup, "CLIENT_TIMEOUT_SECS", defaults.timeout)?,
            disable_keep_alives: parse_or(
                &lookup,
                "CLIENT_DISABLE_KEEP_ALIVES",
                defaults.disable_keep_alives,
            )?,
        })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let missing = |field| ConfigError::Missing { section: "Client", field };

        if self.base_url.is_empty() {
            return Err(missing("Endpoints"));
        }
        if self.timeout.is_zero() {
            return Err(missing("Timeout"));
        }
        Ok(())
    }
}

// ============ Helpers ============

fn parse_with<F, T, P>(lookup: &F, key: &'static str, default: T, parse: P) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    P: Fn(&str) -> Option<T>,
{
    match lookup(key) {
        Some(raw) => parse(raw.trim()).ok_or(ConfigError::Invalid { key, value: raw }),
        None => Ok(default),
    }
}

fn parse_or<F, T>(lookup: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    parse_with(lookup, key, default, |s| s.parse().ok())
}

fn secs_or<F>(lookup: &F, key: &'static str, default: Duration) -> Result<Duration, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    parse_with(lookup, key, default, |s| s.parse().ok().map(Duration::from_secs))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_default_config() {
        // 환경변수 없이 기본값으로 설정 생성
        let config = Config::from_lookup(|_| None).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.shutdown_timeout, Duration::from_secs(10));
        assert_eq!(config.error_policy, ErrorPolicy::Permissive);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_overrides_from_lookup() {
        let config = Config::from_lookup(lookup_from(&[
            ("PORT", "9090"),
            ("SERVER_SHUTDOWN_TIMEOUT_SECS", "3"),
            ("STORAGE_TYPE", "memory"),
            ("LOG_FORMAT", "JSON"),
            ("LOG_LEVEL", "debug"),
            ("API_ERROR_POLICY", "strict"),
        ]))
        .unwrap();

        assert_eq!(config.server.port, 9090);
        assert_eq!(config.server.shutdown_timeout, Duration::from_secs(3));
        assert_eq!(config.storage.storage_type, StorageType::Memory);
        assert_eq!(config.log.format, LogFormat::Json);
        assert_eq!(config.log.level, tracing::Level::DEBUG);
        assert_eq!(config.error_policy, ErrorPolicy::Strict);
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        let err = Config::from_lookup(lookup_from(&[("PORT", "eighty")])).unwrap_err();
        assert_eq!(
            err,
            ConfigError::Invalid { key: "PORT", value: "eighty".to_string() }
        );

        let err = Config::from_lookup(lookup_from(&[("STORAGE_TYPE", "mysql")])).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "STORAGE_TYPE", .. }));

        let err = Config::from_lookup(lookup_from(&[("LOG_OUTPUT", "/var/log/x")])).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "LOG_OUTPUT", .. }));
    }

    #[test]
    fn test_validation_reports_missing_fields() {
        let config = Config::from_lookup(lookup_from(&[("SERVER_READ_TIMEOUT_SECS", "0")])).unwrap();
        assert_eq!(
            config.validate().unwrap_err().to_string(),
            "validate Server settings: ReadTimeout missing"
        );

        let config = Config::from_lookup(lookup_from(&[("DB_HOST", "")])).unwrap();
        assert_eq!(
            config.validate().unwrap_err(),
            ConfigError::Missing { section: "DataSource", field: "Host" }
        );
    }

    #[test]
    fn test_memory_storage_skips_data_source_validation() {
        let config = Config::from_lookup(lookup_from(&[
            ("STORAGE_TYPE", "memory"),
            ("DB_PASSWORD", ""),
        ]))
        .unwrap();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_connect_options() {
        let storage = StorageConfig::default();
        let options = storage.connect_options().unwrap();
        assert_eq!(options.get_host(), "localhost");
        assert_eq!(options.get_port(), 5432);
        assert_eq!(options.get_username(), "postgres");
        assert_eq!(options.get_database(), Some("postgres"));

        // Display/Debug는 비밀번호를 가림
        assert!(!storage.data_source.to_string().contains(":postgres@"));
        assert!(format!("{:?}", storage.data_source).contains("password: \"***\""));

        let config = Config::from_lookup(lookup_from(&[("DATABASE_URL", "postgres://u:p@db/x")])).unwrap();
        let options = config.storage.connect_options().unwrap();
        assert_eq!(options.get_host(), "db");
        assert_eq!(options.get_database(), Some("x"));
    }

    #[test]
    fn test_password_with_url_delimiters() {
        let config = Config::from_lookup(lookup_from(&[
            ("DB_PASSWORD", "pa/ss#1?@x"),
            ("DB_HOST", "db.internal"),
            ("DB_PORT", "6543"),
        ]))
        .unwrap();
        assert!(config.validate().is_ok());

        let options = config.storage.connect_options().unwrap();
        assert_eq!(options.get_host(), "db.internal");
        assert_eq!(options.get_port(), 6543);
        assert_eq!(options.get_database(), Some("postgres"));
    }

    #[test]
    fn test_bad_sslmode_and_url_are_rejected() {
        let config = Config::from_lookup(lookup_from(&[("DB_SSLMODE", "sometimes")])).unwrap();
        assert!(matches!(
            config.validate().unwrap_err(),
            ConfigError::Invalid { key: "DB_SSLMODE", .. }
        ));

        let config = Config::from_lookup(lookup_from(&[("DATABASE_URL", "postgres://u:p@db:notaport/x")])).unwrap();
        assert_eq!(
            config.validate().unwrap_err(),
            ConfigError::Invalid { key: "DATABASE_URL", value: "***".to_string() }
        );
    }

    #[test]
    fn test_client_config() {
        let config = ClientConfig::from_lookup(lookup_from(&[
            ("CLIENT_BASE_URL", "http://api:8080"),
            ("CLIENT_DISABLE_KEEP_ALIVES", "true"),
        ]))
        .unwrap();

        assert_eq!(config.base_url, "http://api:8080");
        assert!(config.disable_keep_alives);
        assert_eq!(config.timeout, Duration::from_secs(15));
        assert!(config.validate().is_ok());

        let empty = ClientConfig { base_url: String::new(), ..ClientConfig::default() };
        assert!(empty.validate().is_err());
    }
}
