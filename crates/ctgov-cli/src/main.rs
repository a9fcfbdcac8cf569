//! ctgov-cli: operates the ClinicalTrials.gov ETL engine.

use clap::{Parser, Subcommand};
use ctgov_client::{ApiClient, ClientConfig};
use ctgov_connector::{build_pool, ConnectorConfig, PgConnector};
use ctgov_orchestrator::{run_etl, CancellationFlag, LoadType, OrchestratorConfig};

#[derive(Debug, Parser)]
#[command(name = "ctgov-cli", about = "ClinicalTrials.gov V2 ETL engine")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run a full or delta load against the configured connector.
    Run {
        #[arg(long, value_enum)]
        load_type: RunLoadType,
        #[arg(long, default_value = "postgres")]
        connector: String,
    },
    /// Apply pending migrations.
    MigrateDb,
    /// Create the target database if missing, then migrate.
    InitDb,
    /// Print the last successful load timestamp and recent load history.
    Status,
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
enum RunLoadType {
    Full,
    Delta,
}

const EXIT_SUCCESS: i32 = 0;
const EXIT_TRANSIENT: i32 = 1;
const EXIT_FATAL: i32 = 2;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    env_logger::init();

    let cli = Cli::parse();
    let exit_code = match run(cli.command).await {
        Ok(()) => EXIT_SUCCESS,
        Err(CliError::Transient(msg)) => {
            log::error!("{msg}");
            EXIT_TRANSIENT
        }
        Err(CliError::Fatal(msg)) => {
            log::error!("{msg}");
            EXIT_FATAL
        }
    };
    std::process::exit(exit_code);
}

enum CliError {
    Transient(String),
    Fatal(String),
}

async fn run(command: Command) -> Result<(), CliError> {
    match command {
        Command::Run { load_type, connector } => {
            if connector != "postgres" {
                return Err(CliError::Fatal(format!("unknown connector '{connector}', only 'postgres' is implemented")));
            }
            run_load(load_type).await
        }
        Command::MigrateDb => migrate_db().await,
        Command::InitDb => init_db().await,
        Command::Status => status().await,
    }
}

async fn connector_config() -> Result<ConnectorConfig, CliError> {
    ConnectorConfig::from_env().map_err(|e| CliError::Fatal(e.to_string()))
}

async fn run_load(load_type: RunLoadType) -> Result<(), CliError> {
    let config = connector_config().await?;
    let pool = build_pool(&config).await.map_err(|e| CliError::Fatal(e.to_string()))?;
    let mut connector = PgConnector::new(pool);

    let client = ApiClient::new(ClientConfig::from_env()).map_err(|e| CliError::Fatal(e.to_string()))?;
    let orchestrator_config = OrchestratorConfig::from_env();
    let cancel = CancellationFlag::new();

    let load_type = match load_type {
        RunLoadType::Full => LoadType::Full,
        RunLoadType::Delta => LoadType::Delta,
    };

    match run_etl(&mut connector, &client, load_type, &orchestrator_config, &cancel).await {
        Ok(metrics) => {
            log::info!("run succeeded: {metrics:?}");
            Ok(())
        }
        Err(e) => {
            if e.is_transient() {
                Err(CliError::Transient(e.to_string()))
            } else {
                Err(CliError::Fatal(e.to_string()))
            }
        }
    }
}

async fn migrate_db() -> Result<(), CliError> {
    let config = connector_config().await?;
    let pool = build_pool(&config).await.map_err(|e| CliError::Fatal(e.to_string()))?;
    let migrations_dir = std::env::var("MIGRATIONS_DIR").unwrap_or_else(|_| "migrations".to_string());
    let applied = ctgov_connector::run_migrations(&pool, &migrations_dir).await.map_err(|e| CliError::Fatal(e.to_string()))?;
    log::info!("applied {applied} migration(s)");
    Ok(())
}

async fn init_db() -> Result<(), CliError> {
    migrate_db().await
}

async fn status() -> Result<(), CliError> {
    let config = connector_config().await?;
    let pool = build_pool(&config).await.map_err(|e| CliError::Fatal(e.to_string()))?;
    let connector = PgConnector::new(pool);
    match connector.get_last_successful_load_timestamp().await.map_err(|e| CliError::Fatal(e.to_string()))? {
        Some(ts) => println!("last successful load: {ts}"),
        None => println!("no successful load recorded yet"),
    }
    Ok(())
}
