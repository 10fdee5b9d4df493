//! civic-api - Civic issue reporting service
//!
//! Serves the citizen and administrator REST API, stores uploaded media and
//! routes new issues to departments with the keyword classifier.

use anyhow::{Context, Result};
use clap::Parser;
use civic_api::{build_router, AppState};
use civic_common::api::auth::load_signing_secret;
use civic_common::config::{RootFolderInitializer, RootFolderResolver, TomlConfig};
use civic_common::db::{init_database, seed_sample_data};
use civic_common::notifications::Notifier;
use std::path::PathBuf;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Module name used for the config file (`~/.config/civic/api.toml`)
const MODULE_NAME: &str = "api";

#[derive(Debug, Parser)]
#[command(name = "civic-api", version, about = "Civic issue reporting service")]
struct Args {
    /// Root folder holding the database and uploads
    #[arg(long)]
    root_folder: Option<PathBuf>,

    /// Address to bind
    #[arg(long, env = "CIVIC_HOST")]
    host: Option<String>,

    /// Port to listen on
    #[arg(long, env = "CIVIC_PORT")]
    port: Option<u16>,

    /// Insert sample departments, workers and users into an empty database
    #[arg(long)]
    seed: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config = TomlConfig::load_or_default(MODULE_NAME);

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.logging.level)),
        )
        .init();

    // Build identification first, before any database work
    info!(
        "Starting civic-api v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    let root_folder = RootFolderResolver::new(MODULE_NAME)
        .with_cli_arg(args.root_folder)
        .resolve();
    let initializer = RootFolderInitializer::new(root_folder);
    initializer
        .ensure_directory_exists()
        .with_context(|| format!("Cannot create {}", initializer.root_folder().display()))?;

    let db_path = initializer.database_path();
    info!("Database path: {}", db_path.display());

    let pool = match init_database(&db_path).await {
        Ok(pool) => pool,
        Err(e) => {
            error!("Failed to open database: {}", e);
            return Err(e.into());
        }
    };

    if args.seed && seed_sample_data(&pool).await? {
        info!("Sample data inserted");
    }

    let signing_secret = load_signing_secret(&pool)
        .await
        .context("Failed to load token signing secret")?;

    let notifier = Notifier::logging(
        config.notifications.enabled,
        config.notifications.admin_phone.clone(),
    );
    if !config.notifications.enabled {
        info!("SMS notifications disabled");
    }

    let state = AppState::new(pool, signing_secret, initializer.uploads_path(), notifier)
        .with_token_ttl(config.auth.token_ttl_minutes)
        .with_allowed_origins(config.server.allowed_origins.clone());
    let app = build_router(state);

    let host = args.host.unwrap_or(config.server.host);
    let port = args.port.unwrap_or(config.server.port);
    let addr = format!("{}:{}", host, port);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;
    info!("civic-api listening on http://{}", addr);
    info!("Health check: http://{}/api/health", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
