//! End-to-end runs of `run_etl` against a mock ClinicalTrials.gov server
//! and a real Postgres instance. Skipped unless `DATABASE_URL` is set.

use ctgov_client::{ApiClient, ClientConfig};
use ctgov_connector::{run_migrations, ConnectorConfig, PgConnector};
use ctgov_orchestrator::{run_etl, CancellationFlag, LoadType, OrchestratorConfig};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn skip_without_database_url() -> Option<String> {
    match std::env::var("DATABASE_URL") {
        Ok(url) if !url.is_empty() => Some(url),
        _ => {
            eprintln!("DATABASE_URL not set; skipping integration test");
            None
        }
    }
}

async fn fresh_pool(url: &str) -> sqlx::Pool<sqlx::Postgres> {
    let config = ConnectorConfig { url: url.to_string(), min_connections: 1, max_connections: 4 };
    let pool = ctgov_connector::build_pool(&config).await.expect("connect");
    run_migrations(&pool, "../../migrations").await.expect("migrate");
    pool
}

fn minimal_study(nct_id: &str) -> serde_json::Value {
    serde_json::json!({
        "protocolSection": {
            "identificationModule": {"nctId": nct_id, "briefTitle": format!("Trial {nct_id}")},
            "statusModule": {"overallStatus": "RECRUITING", "lastUpdatePostDateStruct": {"date": "2024-05-01"}},
            "conditionsModule": {"conditions": ["Asthma"]}
        }
    })
}

#[tokio::test]
async fn full_load_with_one_malformed_record_routes_it_to_the_dead_letter_queue() -> Result<(), Box<dyn std::error::Error>> {
    let Some(db_url) = skip_without_database_url() else { return Ok(()) };
    let pool = fresh_pool(&db_url).await;
    sqlx::query("DELETE FROM raw_studies WHERE nct_id LIKE 'NCT_IT_%'").execute(&pool).await?;
    sqlx::query("DELETE FROM dead_letter_queue WHERE nct_id LIKE 'NCT_IT_%'").execute(&pool).await?;

    let server = MockServer::start().await;
    let malformed = serde_json::json!({"protocolSection": {"identificationModule": {}}});
    Mock::given(method("GET"))
        .and(path("/studies"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "studies": [minimal_study("NCT_IT_001"), malformed, minimal_study("NCT_IT_002")],
        })))
        .mount(&server)
        .await;

    let client = ApiClient::new(ClientConfig { base_url: format!("{}/studies", server.uri()), ..Default::default() })?;
    let mut connector = PgConnector::new(pool.clone());
    let config = OrchestratorConfig { batch_size_rows: 5000 };
    let cancel = CancellationFlag::new();

    let metrics = run_etl(&mut connector, &client, LoadType::Full, &config, &cancel).await?;

    assert_eq!(metrics.studies_fetched, 3);
    assert_eq!(metrics.studies_valid, 2);
    assert_eq!(metrics.studies_invalid, 1);

    let studies_count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM studies WHERE nct_id LIKE 'NCT_IT_%'").fetch_one(&pool).await?;
    assert_eq!(studies_count.0, 2);

    let dlq_count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM dead_letter_queue WHERE nct_id IS NULL").fetch_one(&pool).await?;
    assert!(dlq_count.0 >= 1);
    Ok(())
}

#[tokio::test]
async fn rerunning_a_full_load_is_idempotent() -> Result<(), Box<dyn std::error::Error>> {
    let Some(db_url) = skip_without_database_url() else { return Ok(()) };
    let pool = fresh_pool(&db_url).await;
    sqlx::query("DELETE FROM raw_studies WHERE nct_id = 'NCT_IT_IDEMPOTENT'").execute(&pool).await?;

    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/studies"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "studies": [minimal_study("NCT_IT_IDEMPOTENT")],
        })))
        .mount(&server)
        .await;

    let config = OrchestratorConfig { batch_size_rows: 5000 };
    for _ in 0..2 {
        let client = ApiClient::new(ClientConfig { base_url: format!("{}/studies", server.uri()), ..Default::default() })?;
        let mut connector = PgConnector::new(pool.clone());
        run_etl(&mut connector, &client, LoadType::Full, &config, &CancellationFlag::new()).await?;
    }

    let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM studies WHERE nct_id = 'NCT_IT_IDEMPOTENT'").fetch_one(&pool).await?;
    assert_eq!(count.0, 1);
    Ok(())
}
