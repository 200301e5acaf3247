use std::{path::PathBuf, sync::Arc};

use anyhow::Context;
use clap::{Args as ClapArgs, Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use democracy_core::database::postgres;
use democracy_server::{
    create_app,
    infra::{
        config::{Config, ConfigLoad, ConfigLoader},
        startup::{ProdStartupHooks, StartupHooks, Stores, build_state},
    },
};

/// CLI entry point
#[derive(Parser, Debug)]
#[command(name = "democracy-server")]
#[command(about = "Admin service for Democracy user profiles and identity accounts")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    #[command(flatten)]
    serve: ServeArgs,
}

#[derive(ClapArgs, Debug, Clone)]
struct ServeArgs {
    /// Path to a TOML configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Server port (overrides config)
    #[arg(short, long, env = "SERVER_PORT")]
    port: Option<u16>,

    /// Server host (overrides config)
    #[arg(long, env = "SERVER_HOST")]
    host: Option<String>,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(subcommand)]
    Db(DbCommand),
}

#[derive(Debug, Subcommand)]
enum DbCommand {
    /// Apply database migrations and exit
    Migrate,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = load_runtime_config(&cli.serve)?;

    if let Some(Command::Db(DbCommand::Migrate)) = cli.command {
        return run_db_migrate(&config).await;
    }

    run_server(config).await
}

fn load_runtime_config(args: &ServeArgs) -> anyhow::Result<Arc<Config>> {
    let mut loader = ConfigLoader::new();
    if let Some(path) = args.config.clone() {
        loader = loader.with_config_path(path);
    }
    let ConfigLoad {
        mut config,
        warnings,
    } = loader.load().context("failed to load configuration")?;

    if let Some(port) = args.port {
        config.server.port = port;
    }
    if let Some(host) = args.host.clone() {
        config.server.host = host;
    }

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    if config.metadata.env_file_loaded {
        info!("loaded .env file");
    }
    if let Some(path) = &config.metadata.config_path {
        info!(path = %path.display(), "configuration file loaded");
    }

    for warning in &warnings.items {
        match &warning.hint {
            Some(hint) => {
                warn!(message = %warning.message, hint = %hint, "configuration warning")
            }
            None => warn!(message = %warning.message, "configuration warning"),
        }
    }

    Ok(Arc::new(config))
}

async fn run_db_migrate(config: &Config) -> anyhow::Result<()> {
    let url = config
        .database
        .url
        .as_deref()
        .context("DATABASE_URL is required to run migrations")?;
    let pool = postgres::connect(url, config.database.max_connections)
        .await
        .context("failed to connect to PostgreSQL for migration")?;
    postgres::migrate(&pool)
        .await
        .context("database migration failed")?;
    info!("Database migrations applied successfully");
    Ok(())
}

async fn run_server(config: Arc<Config>) -> anyhow::Result<()> {
    info!(
        photos.dir = %config.storage.photos_dir.display(),
        photos.max_bytes = config.storage.max_photo_bytes,
        dev_mode = config.dev_mode,
        "storage configuration in effect"
    );

    let stores = Stores::connect(&config).await?;
    let state = build_state(config.clone(), stores);
    ProdStartupHooks
        .run(&state)
        .await
        .context("startup hooks failed")?;

    let app = create_app(state);
    let addr = config.bind_address();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!(%addr, "Democracy server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(error = %err, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
