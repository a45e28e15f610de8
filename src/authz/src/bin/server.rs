//! # Authorization Decision Server
//!
//! Standalone HTTP server deciding calls on protected models from an
//! in-memory directory.
//!
//! ## Configuration
//!
//! Environment variables:
//! - `PORT` - HTTP server port (default: 8080)
//! - `AUTHZ_CONFIG` - TOML file with an `[authorization]` table and `[[models]]` declarations
//! - `AUTHZ_SEED` - JSON file with principals, roles and resources
//! - `AUTHZ_GUEST_ACCESS`, `AUTHZ_ADMIN_ROLE`, `AUTHZ_FAIL_OPEN` - overrides
//! - `RUST_LOG` - Log level (default: info)

use anyhow::{bail, Context, Result};
use modelguard_authz::{
    http::{router, AppState},
    AuthorizationBinding, AuthorizationConfig, Collaborators, DirectorySeed, InMemoryDirectory,
    ModelDeclaration, ModelRegistry,
};
use serde::Deserialize;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Contents of the `AUTHZ_CONFIG` file
#[derive(Debug, Default, Deserialize)]
struct ServerConfig {
    #[serde(default)]
    authorization: AuthorizationConfig,

    #[serde(default)]
    models: Vec<ModelDeclaration>,
}

fn load_server_config() -> Result<ServerConfig> {
    let Ok(path) = std::env::var("AUTHZ_CONFIG") else {
        bail!("AUTHZ_CONFIG must point to a TOML file declaring at least one protected model");
    };

    let raw = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read config file {}", path))?;
    let config: ServerConfig = toml::from_str(&raw)
        .with_context(|| format!("Failed to parse config file {}", path))?;

    info!("Loaded configuration from {}", path);
    Ok(config)
}

fn load_seed() -> Result<DirectorySeed> {
    match std::env::var("AUTHZ_SEED") {
        Ok(path) => DirectorySeed::from_file(&path)
            .with_context(|| format!("Failed to load seed file {}", path)),
        Err(_) => {
            warn!("AUTHZ_SEED not set, starting with an empty directory");
            Ok(DirectorySeed::default())
        }
    }
}

/// Graceful shutdown handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
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
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C signal");
        }
        _ = terminate => {
            info!("Received SIGTERM signal");
        }
    }

    info!("Starting graceful shutdown");
}

/// Main server entrypoint
#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing subscriber
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting authorization server v{}", modelguard_authz::VERSION);

    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(8080);

    let ServerConfig { authorization, models } = load_server_config()?;
    let authorization = authorization.apply_env_overrides()?;
    let registry = Arc::new(ModelRegistry::from_declarations(models)?);

    let directory = Arc::new(InMemoryDirectory::from_seed(load_seed()?).await);
    let binding = AuthorizationBinding::attach(
        authorization,
        registry,
        Collaborators::from_directory(directory),
    )?;

    // Seeded role records are raw; bring their ACLs in line before serving
    let summary = binding.roles().migrate_stale_roles().await?;
    info!(
        examined = summary.examined,
        migrated = summary.migrated.len(),
        "Seeded role ACLs synchronized"
    );

    let app = router(AppState::new(Arc::new(binding)));
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind HTTP server on {}", addr))?;

    info!("Starting HTTP server on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server error")?;

    info!("Server shut down gracefully");
    Ok(())
}
