//! NoiseNullifier - Main Entry Point

use api::{config::BridgeConfig, init_logging, run_server};
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_logging();

    info!("=== NoiseNullifier v{} ===", env!("CARGO_PKG_VERSION"));
    info!("Bridging PagerDuty acknowledgments to Alertmanager silences");

    // Missing secrets stop the process before anything is served
    let config = BridgeConfig::from_env()?;
    run_server(config).await?;

    Ok(())
}
