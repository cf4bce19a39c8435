use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Main entry point for the indent application.
///
/// Starts the REST server that backs the indent form and history views.
///
/// # Environment Variables
/// - `INDENT_REST_ADDR`: REST server address (default: "0.0.0.0:3000")
/// - `INDENT_DATA_DIR`: workbook directory (default: "./indent_data")
/// - `INDENT_LOG_SHEET` / `INDENT_REFERENCE_SHEET`: worksheet names
/// - `INDENT_HISTORY_WINDOW_DAYS`: default trailing history window
///
/// # Returns
/// * `Ok(())` - If the server starts and runs successfully
/// * `Err(anyhow::Error)` - If startup or runtime fails
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("indent=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let rest_addr = std::env::var("INDENT_REST_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".into());

    tracing::info!("++ Starting indent REST on {}", rest_addr);

    // Configuration problems (missing workbook directory or worksheet) are
    // fatal: better to refuse to start than to fail on the first request.
    let cfg = Arc::new(api_rest::config_from_env()?);
    if !cfg.data_dir().exists() {
        anyhow::bail!(
            "Workbook directory does not exist: {}",
            cfg.data_dir().display()
        );
    }

    let state = api_rest::build_state(cfg)?;
    let app = api_rest::app(state);

    let listener = tokio::net::TcpListener::bind(&rest_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
