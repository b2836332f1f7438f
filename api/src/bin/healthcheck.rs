//! Container healthcheck probe
//!
//! `GET http://localhost:{port}/api/health` 응답이 200이면 exit 0,
//! 그 외 상태 코드나 연결 실패는 exit 1.

use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;

#[derive(Parser, Debug)]
#[command(name = "crypto-healthcheck", about = "Probe the crypto API health endpoint")]
struct Args {
    /// Port the API server listens on
    #[arg(long, default_value_t = 8080)]
    port: u16,

    /// Request timeout in seconds
    #[arg(long, default_value_t = 5)]
    timeout_secs: u64,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    let url = format!("http://localhost:{}/api/health", args.port);

    let client = match reqwest::Client::builder()
        .timeout(Duration::from_secs(args.timeout_secs))
        .build()
    {
        Ok(client) => client,
        Err(e) => {
            eprintln!("failed to build http client: {e}");
            return ExitCode::FAILURE;
        }
    };

    match client.get(&url).send().await {
        Ok(response) if response.status() == reqwest::StatusCode::OK => ExitCode::SUCCESS,
        Ok(response) => {
            eprintln!("{url} responded with {}", response.status());
            ExitCode::FAILURE
        }
        Err(e) => {
            eprintln!("{url} unreachable: {e}");
            ExitCode::FAILURE
        }
    }
}
