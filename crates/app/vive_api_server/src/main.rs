//! ViveMedellin API server binary.
//!
//! Serves the REST API over PostgreSQL when a database URL is configured and
//! over the in-memory store otherwise.

use std::net::SocketAddr;
use std::sync::Arc;

use clap::Parser;
use sqlx::postgres::PgPoolOptions;
use tracing::{error, info, warn};
use vive_api::AppState;
use vive_api::config::ApiConfig;
use vive_core::store::{MemoryStore, PgStore};

/// CLI arguments for the API server. Flags override the environment.
#[derive(Parser, Debug)]
#[command(name = "vive_api_server", about = "ViveMedellin API server")]
struct Args {
    /// Port to listen on; replaces the port of `BIND_ADDR`.
    #[arg(long)]
    port: Option<u16>,

    /// PostgreSQL connection URL. Without one the in-memory store is used.
    #[arg(long, env = "DATABASE_URL")]
    database_url: Option<String>,

    /// Maximum number of database connections in the pool.
    #[arg(long, default_value_t = 5)]
    max_connections: u32,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,vive_api=debug,vive_core=debug".into()),
        )
        .init();

    let args = Args::parse();

    let mut config = ApiConfig::from_env()
        .inspect_err(|e| error!(error = %e, "invalid configuration"))?;
    if let Some(port) = args.port {
        let mut addr: SocketAddr = config.bind_addr.parse()?;
        addr.set_port(port);
        config.bind_addr = addr.to_string();
    }
    if args.database_url.is_some() {
        config.database_url = args.database_url;
    }

    let state = match config.database_url.clone() {
        Some(url) => {
            info!(max_connections = args.max_connections, "connecting to PostgreSQL");
            let pool = PgPoolOptions::new()
                .max_connections(args.max_connections)
                .acquire_timeout(std::time::Duration::from_secs(30))
                .connect(&url)
                .await?;

            info!("running database migrations");
            vive_api::migrate(&pool).await?;

            AppState::new(config.clone(), Arc::new(PgStore::new(pool)))
        }
        None => {
            warn!("DATABASE_URL not set, using the in-memory store; data is lost on exit");
            AppState::new(config.clone(), Arc::new(MemoryStore::new()))
        }
    }
    .inspect_err(|e| error!(error = %e, "failed to initialise application state"))?;

    let app = vive_api::router(state);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    info!(addr = %listener.local_addr()?, "REST API listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("shutdown signal received");
        })
        .await?;

    Ok(())
}
