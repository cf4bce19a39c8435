//! Standalone REST API server binary.
//!
//! ## Purpose
//! Runs the REST API server on its own.
//!
//! ## Intended use
//! Useful for development and debugging when only the REST surface is
//! wanted; the workspace's main `indent-run` binary is the normal entry
//! point.

use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Main entry point for the indent REST API server.
///
/// # Environment Variables
/// - `INDENT_REST_ADDR`: server address (default: "0.0.0.0:3000")
/// - `INDENT_DATA_DIR`: workbook directory (default: "./indent_data")
/// - `INDENT_LOG_SHEET` / `INDENT_REFERENCE_SHEET`: worksheet names
/// - `INDENT_HISTORY_WINDOW_DAYS`: default trailing history window
///
/// # Errors
/// Returns an error if:
/// - the logging/tracing configuration cannot be initialised,
/// - the workbook directory or a worksheet is missing,
/// - the server address cannot be bound, or
/// - the HTTP server fails while running.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("api_rest=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let addr = std::env::var("INDENT_REST_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".into());

    tracing::info!("-- Starting indent REST API on {}", addr);

    let cfg = Arc::new(api_rest::config_from_env()?);
    if !cfg.data_dir().exists() {
        anyhow::bail!(
            "Workbook directory does not exist: {}",
            cfg.data_dir().display()
        );
    }

    let state = api_rest::build_state(cfg)?;
    let app = api_rest::app(state);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
