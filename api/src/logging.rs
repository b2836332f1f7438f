//! Tracing setup
//!
//! `LogConfig`의 level/format/output으로 전역 subscriber를 한 번 설치.
//! RUST_LOG가 설정되어 있으면 level보다 우선함.
//!
//! ```text
//! RUST_LOG=crypto_api=debug,sqlx=warn crypto-api
//! LOG_FORMAT=json LOG_OUTPUT=stderr crypto-api
//! ```

use anyhow::{anyhow, Result};
use tracing_subscriber::{
    filter::LevelFilter,
    fmt::writer::BoxMakeWriter,
    EnvFilter,
};

use crate::config::{LogConfig, LogFormat, LogOutput};

pub fn init_tracing(config: &LogConfig) -> Result<()> {
    let filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::from_level(config.level).into())
        .from_env_lossy();

    let writer = match config.output {
        LogOutput::Stdout => BoxMakeWriter::new(std::io::stdout),
        LogOutput::Stderr => BoxMakeWriter::new(std::io::stderr),
    };

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer);

    match config.format {
        LogFormat::Text => builder.try_init(),
        LogFormat::Json => builder.json().try_init(),
    }
    .map_err(|err| anyhow!(err))
}
