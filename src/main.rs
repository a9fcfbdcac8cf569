//! Direct-library demo entrypoint: runs a full load using configuration
//! read from the environment, without going through `ctgov-cli`'s argument
//! parsing. `ctgov-cli` is the supported command-line surface; this binary
//! exists for scripted/one-shot invocations that only ever do one thing.

use ctgov_client::{ApiClient, ClientConfig};
use ctgov_connector::{build_pool, ConnectorConfig, PgConnector};
use ctgov_orchestrator::{run_etl, CancellationFlag, LoadType, OrchestratorConfig};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    env_logger::init();

    if let Err(e) = run().await {
        log::error!("{e}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let connector_config = ConnectorConfig::from_env()?;
    let pool = build_pool(&connector_config).await?;
    let mut connector = PgConnector::new(pool);

    let client = ApiClient::new(ClientConfig::from_env())?;
    let orchestrator_config = OrchestratorConfig::from_env();
    let cancel = CancellationFlag::new();

    let metrics = run_etl(&mut connector, &client, LoadType::Full, &orchestrator_config, &cancel).await?;
    log::info!("full load complete: {metrics:?}");
    Ok(())
}
