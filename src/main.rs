use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use api_rest::AppState;
use ybocs_core::{ClinicService, CoreConfig};

/// Main entry point for the Y-BOCS clinic service
///
/// Serves the REST API (with Swagger UI at `/swagger-ui`) on `YBOCS_REST_ADDR`.
///
/// # Environment Variables
/// - `YBOCS_REST_ADDR`: REST server address (default: "0.0.0.0:3000")
/// - `YBOCS_DATA_DIR`: Directory holding symptom files and the results ledger (default: "data")
/// - `YBOCS_CREDENTIALS_FILE`: Credential document (default: "users.yaml")
/// - `RUST_LOG`: tracing filter
///
/// A `.env` file in the working directory is loaded first if present.
///
/// # Returns
/// * `Ok(())` - If the server starts and shuts down cleanly
/// * `Err(anyhow::Error)` - If configuration, binding or serving fails
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("ybocs_core=info".parse()?)
                .add_directive("api_rest=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let rest_addr = std::env::var("YBOCS_REST_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".into());

    let cfg = CoreConfig::from_values(
        std::env::var("YBOCS_DATA_DIR").ok(),
        std::env::var("YBOCS_CREDENTIALS_FILE").ok(),
    )?;
    tracing::info!(
        data_dir = %cfg.data_dir().display(),
        credentials = %cfg.credentials_file().display(),
        "configuration resolved"
    );

    let service = ClinicService::new(&cfg);
    if service.credentials().list()?.is_empty() {
        tracing::warn!("no accounts found; create an administrator with `ybocs create-account`");
    }

    let app = api_rest::router(AppState::new(service));

    tracing::info!("++ Starting Y-BOCS REST on {}", rest_addr);
    let listener = tokio::net::TcpListener::bind(&rest_addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("-- Y-BOCS REST stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
}
