//! ctgov-connector
//!
//! The Postgres warehouse side of the ETL engine: connection/pool setup,
//! schema migrations, and the bulk-load/merge/dead-letter connector used by
//! the orchestrator.

pub mod config;
pub mod connector;
pub mod csv;
pub mod error;
pub mod migrations;
pub mod retry;

pub use config::{build_pool, ConnectorConfig};
pub use connector::PgConnector;
pub use error::ConnectorError;
pub use migrations::run_migrations;
