//! session-gate - Token authentication service
//!
//! This is the main entry point for the session-gate application.

use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tokio::signal;
use tracing::{error, info};

use session_gate::auth::{AuthConfig, AuthManager, TokenCodec};
use session_gate::config::Config;
use session_gate::database::SqliteDatabase;
use session_gate::models::{ADMIN_ROLE, DEFAULT_ROLE};
use session_gate::server::{AppState, Server};
use session_gate::store::{self, MemoryStore};
use session_gate::telemetry::init_tracing;

/// session-gate - Token authentication service
#[derive(Parser, Debug)]
#[command(name = "session-gate")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the configuration file
    #[arg(short, long, env = "SESSION_GATE_CONFIG")]
    config: Option<String>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP server (default)
    Serve,

    /// Create a user in the identity database
    CreateUser {
        username: String,
        email: String,

        /// Password for the new user
        #[arg(long, env = "SESSION_GATE_USER_PASSWORD")]
        password: String,

        /// Grant the admin role
        #[arg(long)]
        admin: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let config = load_config(&args)?;
    config
        .validate()
        .map_err(|e| anyhow::anyhow!("Invalid configuration: {}", e))?;

    init_tracing(&config.logging)?;

    info!(
        version = env!("CARGO_PKG_VERSION"),
        "Starting session-gate"
    );

    let database = Arc::new(SqliteDatabase::new(&config.database.path).await?);
    info!(path = %config.database.path, "Database initialized");

    let leeway = i64::try_from(config.auth.leeway_secs)
        .ok()
        .and_then(chrono::Duration::try_seconds)
        .context("auth.leeway_secs is out of range")?;
    let codec = TokenCodec::new(config.auth.jwt_secret.as_bytes(), &config.auth.issuer)
        .with_leeway(leeway);

    match args.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(config, database, codec).await,
        Command::CreateUser {
            username,
            email,
            password,
            admin,
        } => {
            // Registration never touches session state
            let auth_manager = AuthManager::new(
                database,
                Arc::new(MemoryStore::new()),
                codec,
                AuthConfig::from(&config.auth),
            );
            let role = if admin { ADMIN_ROLE } else { DEFAULT_ROLE };
            let user = auth_manager
                .register_with_role(&username, &email, &password, role)
                .await?;
            info!(id = user.id, username = %user.username, role = %user.role, "User created");
            Ok(())
        }
    }
}

async fn serve(
    config: Config,
    database: Arc<SqliteDatabase>,
    codec: TokenCodec,
) -> anyhow::Result<()> {
    let store = store::connect(&config.store).await?;
    info!(backend = %store.name(), "Session store connected");

    let auth_manager = Arc::new(AuthManager::new(
        database,
        Arc::clone(&store),
        codec,
        AuthConfig::from(&config.auth),
    ));
    info!(
        issuer = %config.auth.issuer,
        access_ttl_secs = config.auth.access_token_ttl_secs,
        refresh_ttl_secs = config.auth.refresh_token_ttl_secs,
        "Authentication manager initialized"
    );

    let state = AppState {
        auth_manager,
        store,
        cookie_secure: config.auth.cookie_secure,
    };

    let server = Server::new(config.server.clone(), state);

    info!(
        host = %config.server.host,
        port = %config.server.port,
        "Starting HTTP server"
    );

    let result = server.run(shutdown_signal()).await;

    info!("session-gate shutdown complete");

    result.map_err(Into::into)
}

/// Load configuration from file or environment
fn load_config(args: &Args) -> anyhow::Result<Config> {
    match &args.config {
        Some(path) => {
            // Use eprintln! since tracing is not yet initialized
            eprintln!("Loading configuration from file: {}", path);
            Config::from_file(path).map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))
        }
        None => {
            eprintln!("Loading configuration from environment variables");
            Config::from_env().map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))
        }
    }
}

/// Create a future that resolves when a shutdown signal is received
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating graceful shutdown");
        }
    }
}
