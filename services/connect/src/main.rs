use std::sync::Arc;

use anyhow::Result;
use common::{
    cache::{RedisConfig, RedisPool},
    database::{self, DatabaseConfig},
};
use connect::{
    AppState,
    config::AppConfig,
    repositories::PgUserDirectory,
    token_store::{MemoryTokenStore, RedisTokenStore, TokenStore, TokenStoreKind},
};
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("Starting connect service");

    let config = AppConfig::from_env()?;

    // Initialize database connection pool
    let db_config = DatabaseConfig::from_env()?;
    let pool = database::init_pool(&db_config)?;
    database::health_check(&pool).await?;
    sqlx::migrate!("./migrations").run(&pool).await?;
    info!("Database connection successful");

    let tokens: Arc<dyn TokenStore> = match config.token_store {
        TokenStoreKind::Memory => Arc::new(MemoryTokenStore::new()),
        TokenStoreKind::Redis => {
            let redis_pool = RedisPool::new(&RedisConfig::from_env())?;
            redis_pool.health_check().await?;
            Arc::new(RedisTokenStore::new(redis_pool))
        }
    };

    let enabled: Vec<_> = config.providers.iter().map(|p| p.id.to_string()).collect();
    info!("Enabled providers: {}", enabled.join(", "));

    let bind_address = config.bind_address.clone();
    let state = AppState::new(config, tokens, Arc::new(PgUserDirectory::new(pool)))?;

    // Start the web server
    let app = connect::create_router(state);

    let listener = TcpListener::bind(&bind_address).await?;
    info!("Connect service listening on {}", bind_address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
    }
    info!("Shutting down");
}
