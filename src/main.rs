//! # Kisan Market server
//!
//! Loads configuration from the environment, opens the configured store and
//! serves the marketplace API.
//!
//! ## Stores
//!
//! - `STORE=postgres` (default): PostgreSQL via SQLx, migrations applied at start
//! - `STORE=memory`: everything in process, lost on restart

use std::sync::Arc;

use tracing::info;

use kisan_market::config::{AppConfig, StoreKind};
use kisan_market::store::{MarketStore, MemoryStore, PgStore};
use kisan_market::{create_app, db, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "kisan_market=debug,tower_http=debug".into()),
        )
        .init();

    info!("Starting Kisan Market service");

    let config = AppConfig::from_env()?;

    let store: Arc<dyn MarketStore> = match config.store {
        StoreKind::Postgres => Arc::new(PgStore::new(db::connect(&config).await?)),
        StoreKind::Memory => {
            info!("Using in-memory store; data will not survive a restart");
            Arc::new(MemoryStore::new())
        }
    };

    let bind_addr = config.bind_addr.clone();
    let app = create_app(AppState::new(store, config));

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!("Listening on {}", bind_addr);

    axum::serve(listener, app).await?;
    Ok(())
}
