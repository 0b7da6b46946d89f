//! AthenaBackend behaviour that does not need AWS.

use dbcli_athena::*;
use dbcli_core::{format_status, BackendError, Config, DatabaseBackend, QueryStats};

fn backend(database: Option<&str>) -> AthenaBackend {
    let args = AwsArgs {
        region: Some("us-west-2".into()),
        ..AwsArgs::default()
    };
    AthenaBackend::new(AwsConfig::resolve(&args, "default", &Config::default()), database, None)
}

#[tokio::test]
async fn connect_switches_catalog_and_database() {
    let b = backend(Some("sales"));
    b.connect(Some("lake.events")).await.unwrap();
    assert_eq!(b.catalog(), "lake");
    assert_eq!(b.database().as_deref(), Some("events"));

    // A bare name keeps the current catalog.
    b.connect(Some("clicks")).await.unwrap();
    assert_eq!(b.catalog(), "lake");
    assert_eq!(b.database().as_deref(), Some("clicks"));
    b.close().await;
}

#[tokio::test]
async fn close_drops_the_client() {
    let b = backend(None);
    b.connect(None).await.unwrap();
    b.close().await;
    assert!(matches!(
        b.execute("SELECT 1").await.unwrap_err(),
        BackendError::NotConnected
    ));
}

#[test]
fn status_line_combines_rows_and_statistics() {
    let b = backend(None);
    let stats = QueryStats {
        execution_time_ms: 87,
        bytes_scanned: 1536,
        ..QueryStats::default()
    };
    assert_eq!(
        format_status(Some(2), Some(&stats), &b),
        "2 rows in set\nExecution time: 87 ms, Data scanned: 1.5 KB, Approximate cost: $0.00"
    );
}

/// Requires AWS credentials, network access and a results bucket.
///
/// Run with: `cargo test real_athena_query -- --ignored`
///
/// - `ATHENA_TEST_S3_STAGING_DIR=s3://<your-bucket>/results/`
/// - AWS credentials configured via env vars or `~/.aws`
#[tokio::test]
#[ignore]
async fn real_athena_query() {
    let args = AwsArgs {
        s3_staging_dir: std::env::var("ATHENA_TEST_S3_STAGING_DIR").ok(),
        ..AwsArgs::default()
    };
    let b = AthenaBackend::new(
        AwsConfig::resolve(&args, "default", &Config::default()),
        Some("default"),
        None,
    );
    b.connect(None).await.unwrap();

    let result = b.execute("SELECT 1 AS test_column").await.expect("query failed");
    assert_eq!(result.headers(), Some(vec!["test_column".to_string()]));
    assert_eq!(result.rows, vec![vec![Some("1".to_string())]]);
    let stats = result.stats.expect("athena reports statistics");
    assert!(stats.query_id.is_some());
}
