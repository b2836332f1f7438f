//! Companion client demo
//!
//! 실행 중인 서버를 상대로 각 엔드포인트를 한 번씩 호출하고 결과를 로그로 남김.
//!
//! ```text
//! CLIENT_BASE_URL=http://localhost:8080 crypto-client
//! ```

use anyhow::Context;

use crypto_api::{
    config::{ClientConfig, LogConfig},
    logging::init_tracing,
    Author, CryptoClient, Cryptocurrency,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing(&LogConfig::default())?;

    let config = ClientConfig::from_env().context("failed to load client config")?;
    config.validate().context("invalid client config")?;
    let client = CryptoClient::new(&config).context("failed to build http client")?;

    let status = client.health_check().await?;
    tracing::info!(status = status.as_u16(), "Health check");

    let cryptos = client.get_cryptos().await?;
    tracing::info!(count = cryptos.len(), "All cryptos: {:?}", cryptos);

    let btc = client.get_crypto("BTC").await?;
    tracing::info!("BTC: {:?}", btc);

    let ltc = client.get_crypto("LTC").await?;
    tracing::info!("LTC: {:?}", ltc);

    let lacho = Cryptocurrency::new(
        "LachoCoin",
        "LCN",
        1.54,
        vec![Author::new("Lachezar", "Bogomilov")],
    );
    let created = client.post_crypto(&lacho).await?;
    tracing::info!("Created: {:?}", created);

    let bitcoin = Cryptocurrency::new(
        "Bitcoin",
        "BTC",
        45000.3,
        vec![Author::new("Satoshi", "Nakamoto")],
    );
    let cryptos = client.put_crypto(&bitcoin).await?;
    tracing::info!(count = cryptos.len(), "After update: {:?}", cryptos);

    let cryptos = client.delete_crypto("LCN").await?;
    tracing::info!(count = cryptos.len(), "After delete: {:?}", cryptos);

    Ok(())
}
