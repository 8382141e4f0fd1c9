//! # Gatehouse API Server
//!
//! Account lifecycle service: registration, sessions, profile and password
//! management, deactivation, password recovery and a contact form.
//!
//! ## Usage
//!
//! ```bash
//! gatehouse-api            # same as `serve`
//! gatehouse-api serve
//! gatehouse-api migrate
//! gatehouse-api seed
//! ```

use anyhow::Context;
use clap::{Parser, Subcommand};
use gatehouse_api::{
    app::{build_router, AppState},
    config::Config,
    seed,
};
use gatehouse_shared::{
    auth::credential::CredentialStore,
    db::{
        migrations::{applied_migrations, ensure_database_exists, run_migrations},
        pool::create_pool,
    },
    store::postgres::PgStore,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Gatehouse account service
#[derive(Parser)]
#[command(name = "gatehouse-api")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP server
    Serve,

    /// Create the database if needed and apply pending migrations
    Migrate,

    /// Create the demo and admin accounts
    Seed,
}

fn init_tracing(config: &Config) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "gatehouse_api=debug,gatehouse_shared=debug,tower_http=debug".into());

    let registry = tracing_subscriber::registry().with(filter);
    if config.logging.json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = Config::load().context("Failed to load configuration")?;
    init_tracing(&config);

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(config).await,
        Command::Migrate => migrate(config).await,
        Command::Seed => seed_accounts(config).await,
    }
}

async fn serve(config: Config) -> anyhow::Result<()> {
    tracing::info!("Gatehouse API v{} starting...", env!("CARGO_PKG_VERSION"));

    let address = config.bind_address();
    let state = AppState::build(config).await?;
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&address)
        .await
        .with_context(|| format!("Failed to bind {}", address))?;
    tracing::info!("Server listening on http://{}", address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        return;
    }
    tracing::info!("Shutdown signal received, exiting...");
}

async fn migrate(config: Config) -> anyhow::Result<()> {
    if config.database.is_memory() {
        anyhow::bail!("The in-memory store has no migrations; set database.url to a PostgreSQL URL");
    }

    ensure_database_exists(&config.database.url).await?;
    let pool = create_pool(config.database.clone()).await?;
    run_migrations(&pool).await?;

    let applied = applied_migrations(&pool).await?;
    tracing::info!(applied, "Database is up to date");
    Ok(())
}

async fn seed_accounts(config: Config) -> anyhow::Result<()> {
    if config.database.is_memory() {
        anyhow::bail!("Seeding the in-memory store has no lasting effect; set database.url to a PostgreSQL URL");
    }

    let pool = create_pool(config.database.clone()).await?;
    let store = PgStore::new(pool);
    let credentials = CredentialStore::new(config.credential)?;

    let created = seed::seed(&store, &credentials).await?;
    tracing::info!(created, "Seeding finished");
    Ok(())
}
