//! Tests that need a live cluster are `#[ignore]`d.
//!
//! Run with: `cargo test -p dbcli-redshift -- --ignored` after exporting
//! `REDSHIFT_HOST`, `REDSHIFT_USER` and either `REDSHIFT_PASSWORD` or AWS
//! credentials allowed to call `GetClusterCredentials`.

use dbcli_core::{Config, DatabaseBackend};
use dbcli_redshift::*;

#[test]
fn config_file_feeds_the_backend() {
    let config = Config::parse(
        r#"
[redshift_profile.default]
host = "warehouse.xyz.eu-west-1.redshift.amazonaws.com"
port = 5439
database = "analytics"
user = "IAM:reporter"
sslmode = "require"
region = "eu-west-1"
"#,
    )
    .unwrap();
    let cfg = RedshiftConfig::resolve(&RedshiftArgs::default(), &config).unwrap();
    let backend = RedshiftBackend::new(cfg);

    assert!(backend.uses_iam());
    assert_eq!(backend.user(), Some("reporter"));
    assert_eq!(backend.database().as_deref(), Some("analytics"));
    assert_eq!(backend.config().sslmode, "require");
    assert_eq!(
        cluster_identifier(backend.config().host.as_deref()).unwrap(),
        "warehouse"
    );
}

#[tokio::test]
#[ignore]
async fn real_cluster_round_trip() {
    let cfg = RedshiftConfig::resolve(&RedshiftArgs::default(), &Config::default()).unwrap();
    let backend = RedshiftBackend::new(cfg);
    backend.connect(None).await.expect("connect");

    let result = backend.execute("SELECT 1 AS one, NULL AS nothing").await.unwrap();
    assert_eq!(
        result.headers(),
        Some(vec!["one".to_string(), "nothing".to_string()])
    );
    assert_eq!(result.rows, vec![vec![Some("1".to_string()), None]]);

    assert!(!backend.databases().await.unwrap().is_empty());
    for table in backend.tables().await.unwrap() {
        assert!(table.contains('.'));
    }
    backend.close().await;
}
