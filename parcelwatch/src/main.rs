use parcelwatch::config::AppConfig;
use parcelwatch::logging::init_logging;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    let config = AppConfig::from_env()?;
    let _log_guard = init_logging(config.log_dir.as_deref())?;

    let shutdown = CancellationToken::new();
    tokio::spawn({
        let shutdown = shutdown.clone();
        async move {
            match tokio::signal::ctrl_c().await {
                Ok(()) => {
                    info!("Shutdown requested");
                    shutdown.cancel();
                }
                Err(e) => error!(error = %e, "Failed to listen for Ctrl-C"),
            }
        }
    });

    parcelwatch::app::run(config, shutdown).await?;

    info!("parcelwatch stopped");
    Ok(())
}
