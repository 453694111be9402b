//! catalog-server - REST API server binary.

use std::net::SocketAddr;

use catalog_core::CatalogConfig;
use catalog_server::{create_catalog, create_server, import_seed, AppState};
use tokio::signal;
use tracing::{error, info, warn, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Wait for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "failed to install Ctrl+C handler");
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
                error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

/// Load configuration from `CATALOG_CONFIG` if set, otherwise from the environment.
fn load_config() -> Result<CatalogConfig, Box<dyn std::error::Error>> {
    match std::env::var("CATALOG_CONFIG") {
        Ok(path) => {
            info!(path = %path, "loading configuration file");
            Ok(CatalogConfig::from_file(path)?)
        }
        Err(_) => Ok(CatalogConfig::from_env()),
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(
            EnvFilter::from_default_env()
                .add_directive(Level::INFO.into())
                .add_directive("catalog_server=debug".parse()?),
        )
        .init();

    let config = load_config()?;

    let host = std::env::var("CATALOG_HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
    let port: u16 = std::env::var("CATALOG_PORT")
        .unwrap_or_else(|_| "8080".to_string())
        .parse()
        .map_err(|e| format!("CATALOG_PORT must be a valid port number: {}", e))?;

    // Connect the backend
    let catalog = create_catalog(&config).await?;
    info!(store = %catalog.provider(), "catalog ready");

    // Seed failures are logged; the server still starts
    match import_seed(&catalog, &config.seed).await {
        Ok(Some(report)) => info!(
            imported = report.imported(),
            skipped = report.skipped,
            "seed data imported"
        ),
        Ok(None) => {}
        Err(e) => warn!(error = %e, "seed import failed"),
    }

    let environment =
        std::env::var("CATALOG_ENVIRONMENT").unwrap_or_else(|_| "dev".to_string());
    let state = AppState::new(catalog).with_environment(environment);
    let app = create_server(state.clone());

    // Start server
    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
    info!("Starting catalog-server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    // Serve with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            shutdown_signal().await;
            info!("Shutdown signal received, draining requests...");
        })
        .await?;

    state.catalog().close().await?;

    info!("Server stopped cleanly");
    Ok(())
}
