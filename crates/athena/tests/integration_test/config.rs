//! Profile resolution against a full config file.

use std::env;
use std::sync::Mutex;

use dbcli_athena::*;
use dbcli_core::Config;

static ENV_LOCK: Mutex<()> = Mutex::new(());

const RC: &str = r#"
[main]
table_format = "psql"

[aws_profile.default]
region = "us-east-1"
s3_staging_dir = "s3://default-bucket/athena/"

[aws_profile.prod]
aws_access_key_id = "AKIAPROD"
aws_secret_access_key = "prod-secret"
region = "eu-central-1"
work_group = "analysts"
timeout_seconds = 300
"#;

#[test]
fn named_profile_selects_its_section() {
    let _lock = ENV_LOCK.lock().unwrap();
    env::remove_var("AWS_REGION");
    env::remove_var("AWS_DEFAULT_REGION");

    let config = Config::parse(RC).unwrap();
    let prod = AwsConfig::resolve(&AwsArgs::default(), "prod", &config);
    assert_eq!(prod.region.as_deref(), Some("eu-central-1"));
    assert_eq!(prod.work_group.as_deref(), Some("analysts"));
    assert_eq!(prod.timeout_seconds, 300);
    assert!(prod.has_static_credentials());
    assert!(prod.s3_staging_dir.is_none());

    let default = AwsConfig::resolve(&AwsArgs::default(), "default", &config);
    assert_eq!(default.s3_staging_dir.as_deref(), Some("s3://default-bucket/athena/"));
    assert!(!default.has_static_credentials());
    assert_eq!(default.timeout_seconds, 0);
}

#[test]
fn command_line_region_beats_profile_and_env() {
    let _lock = ENV_LOCK.lock().unwrap();
    env::set_var("AWS_REGION", "ap-northeast-1");

    let config = Config::parse(RC).unwrap();
    let args = AwsArgs {
        region: Some("sa-east-1".into()),
        ..AwsArgs::default()
    };
    let cfg = AwsConfig::resolve(&args, "prod", &config);
    assert_eq!(cfg.region.as_deref(), Some("sa-east-1"));

    env::remove_var("AWS_REGION");
}
