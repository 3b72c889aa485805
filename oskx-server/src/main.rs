//! Open Skill Exchange Server
//!
//! Transaction engine for a points-based skill bartering platform:
//! exchange lifecycle, escrowed points, ratings, notifications, and a
//! real-time relay.

mod api;
mod config;
mod server;
mod shutdown;
mod state;

use clap::Parser;
use compact_str::CompactString;
use config::file::StorageBackend;
use config::{ConfigLoader, get_database_url};
use oskx_core::entities::UserRecord;
use oskx_core::store::{MemoryStore, PgStore, Store};
use server::{build_router, run_server};
use sqlx::postgres::PgPoolOptions;
use state::AppState;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Open Skill Exchange - points-based skill bartering engine
#[derive(Parser, Debug)]
#[command(name = "oskx-server")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to the configuration file
    #[arg(short, long, default_value = "./oskx-config.toml")]
    config: PathBuf,

    /// Override the listen address (e.g., 0.0.0.0:3000)
    #[arg(short, long)]
    listen: Option<SocketAddr>,

    /// Run database migrations on startup (postgres backend only)
    #[arg(long, default_value = "false")]
    migrate: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let args = Args::parse();

    tracing::info!("Starting oskx-server v{}", env!("CARGO_PKG_VERSION"));

    let config_loader = ConfigLoader::new(&args.config, args.listen);
    let config = config_loader.load().map_err(|e| {
        tracing::error!("Failed to load configuration: {}", e);
        e
    })?;

    let listen_addr = config.server.listen;
    tracing::info!("Configuration loaded from {:?}", args.config);

    let mut db_pool = None;
    let store: Arc<dyn Store> = match config.storage.backend {
        StorageBackend::Memory => {
            tracing::info!("Using in-memory storage backend");
            Arc::new(MemoryStore::new())
        }
        StorageBackend::Postgres => {
            let database_url = get_database_url().map_err(|e| {
                tracing::error!("DATABASE_URL environment variable not set");
                e
            })?;

            tracing::info!("Connecting to database...");
            let pool = PgPoolOptions::new()
                .max_connections(config.storage.max_connections)
                .connect(&database_url)
                .await
                .map_err(|e| {
                    tracing::error!("Failed to connect to database: {}", e);
                    e
                })?;
            tracing::info!("Database connection established");

            if args.migrate {
                tracing::info!("Running database migrations...");
                sqlx::migrate!("../migrations").run(&pool).await.map_err(|e| {
                    tracing::error!("Failed to run migrations: {}", e);
                    e
                })?;
                tracing::info!("Migrations completed successfully");
            }

            db_pool = Some(pool.clone());
            Arc::new(PgStore::new(pool))
        }
    };

    seed_users(store.as_ref(), &config).await?;

    let state = AppState::new(store);
    let router = build_router(state);

    tracing::info!("Starting HTTP server on {}", listen_addr);
    let result = run_server(router, listen_addr).await;

    if let Some(pool) = db_pool {
        tracing::info!("Closing database connections...");
        pool.close().await;
    }
    tracing::info!("Server shutdown complete");

    result.map_err(Into::into)
}

/// Insert the configured seed users. Inserts are idempotent, so existing
/// users (and their balances) are left untouched.
async fn seed_users(
    store: &dyn Store,
    config: &config::file::FileConfig,
) -> anyhow::Result<()> {
    for user in &config.seed.users {
        store
            .insert_user(&UserRecord {
                user_id: user.user_id,
                display_name: CompactString::from(user.display_name.as_str()),
                points_balance: user.points_balance,
                average_rating: None,
            })
            .await?;
        tracing::info!(user_id = %user.user_id, name = %user.display_name, "Seeded user");
    }
    Ok(())
}

/// Initialize the tracing subscriber with environment-based filtering.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,sqlx=warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}
