//! homeflow-ingest - Website event ingestion service
//!
//! Accepts lead submissions and valuation requests from public tenant
//! websites, queues them durably, and ingests them with exactly-once
//! effects. Batch processing is triggered by an external scheduler via
//! the operational API.

use anyhow::Result;
use clap::Parser;
use homeflow_common::config;
use homeflow_common::db::init::init_database;
use homeflow_ingest::{build_router, db, AppState};
use tracing::info;

#[derive(Debug, Parser)]
#[command(name = "homeflow-ingest", about = "Homeflow website event ingestion service")]
struct Args {
    /// Root folder holding the database (overrides HOMEFLOW_ROOT and config file)
    #[arg(long)]
    root_folder: Option<String>,

    /// HTTP port (overrides the http_port setting)
    #[arg(long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    // Build identification logged immediately after tracing init, before
    // any database work can delay startup feedback
    info!(
        "Starting Homeflow Ingestion (homeflow-ingest) v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    let args = Args::parse();

    let root_folder = config::resolve_root_folder(args.root_folder.as_deref());
    config::ensure_root_folder(&root_folder)?;

    let db_path = config::database_path(&root_folder);
    info!("Database path: {}", db_path.display());

    let pool = init_database(&db_path).await?;

    let port = match args.port {
        Some(port) => i64::from(port),
        None => db::settings::get_i64(&pool, "http_port", 5830).await?,
    };

    let state = AppState::new(pool);
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(format!("127.0.0.1:{}", port)).await?;
    info!("homeflow-ingest listening on http://127.0.0.1:{}", port);
    info!("Health check: http://127.0.0.1:{}/health", port);

    axum::serve(listener, app).await?;

    Ok(())
}
