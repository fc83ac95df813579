use todo_service::adapters::HttpTransport;
use todo_service::config::ServerConfig;
use todo_service::storage::SqliteStorage;
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    #[cfg(feature = "tracing")]
    tracing_subscriber::fmt()
        .with_env_filter(std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()))
        .init();
    let config = ServerConfig::from_env()?;
    let storage = Arc::new(SqliteStorage::new(&config.database_url, config.max_connections).await?);
    let http_transport = HttpTransport::new(storage);
    http_transport.serve(&config.bind_addr).await?;
    Ok(())
}
