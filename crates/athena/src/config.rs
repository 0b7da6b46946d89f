use dbcli_core::config::{first_env, get_bool, get_int, get_val, Config, ProfileSection, Setting};
use serde::{Deserialize, Serialize};

/// Catalog used when the database argument does not name one.
pub const DEFAULT_CATALOG: &str = "AwsDataCatalog";

/// Minutes a cached result stays reusable when reuse is enabled.
pub const DEFAULT_RESULT_REUSE_MINUTES: i64 = 60;

/// Connection settings given on the command line. `None` defers to the
/// config file and then to the ambient AWS configuration.
#[derive(Debug, Clone, Default)]
pub struct AwsArgs {
    pub aws_access_key_id: Option<String>,
    pub aws_secret_access_key: Option<String>,
    pub region: Option<String>,
    pub s3_staging_dir: Option<String>,
    pub work_group: Option<String>,
    pub result_reuse_enable: Option<bool>,
    pub result_reuse_minutes: Option<i64>,
}

// ── AwsConfig ───────────────────────────────────────────────────

/// Resolved Athena connection settings.
///
/// Precedence is command line, then `[aws_profile.<profile>]`, then the
/// ambient AWS configuration (env vars, `~/.aws/config`). A profile that is
/// missing from the config file is assumed to live in the regular AWS
/// config, where the SDK will find it.
#[derive(Clone, Serialize, Deserialize)]
pub struct AwsConfig {
    pub profile: String,
    pub aws_access_key_id: Option<String>,
    pub aws_secret_access_key: Option<String>,
    /// `None` lets the SDK default chain pick the region.
    pub region: Option<String>,
    pub s3_staging_dir: Option<String>,
    pub work_group: Option<String>,
    /// IAM role to assume before querying (config file only).
    pub role_arn: Option<String>,
    pub result_reuse_enable: bool,
    pub result_reuse_minutes: i64,
    /// Abort queries running longer than this (0 = wait indefinitely).
    pub timeout_seconds: u64,
}

impl AwsConfig {
    pub fn resolve(args: &AwsArgs, profile: &str, config: &Config) -> Self {
        let section = config
            .profile("aws_profile", profile)
            .unwrap_or_default();
        Self::resolve_with_section(args, profile, &section)
    }

    pub fn resolve_with_section(args: &AwsArgs, profile: &str, section: &ProfileSection) -> Self {
        let cli = |v: &Option<String>| v.as_deref().map(Setting::from);
        let file = |key: &str| section.get(key);

        let region_arg = cli(&args.region);
        let region = get_val(&[region_arg.as_ref(), file("region")])
            .or_else(|| first_env(&["AWS_REGION", "AWS_DEFAULT_REGION"]));

        let reuse_arg = args.result_reuse_enable.map(Setting::Bool);
        let minutes_arg = args.result_reuse_minutes.map(Setting::Int);

        let key_arg = cli(&args.aws_access_key_id);
        let secret_arg = cli(&args.aws_secret_access_key);
        let staging_arg = cli(&args.s3_staging_dir);
        let work_group_arg = cli(&args.work_group);

        Self {
            profile: profile.to_string(),
            aws_access_key_id: get_val(&[key_arg.as_ref(), file("aws_access_key_id")]),
            aws_secret_access_key: get_val(&[secret_arg.as_ref(), file("aws_secret_access_key")]),
            region,
            s3_staging_dir: get_val(&[staging_arg.as_ref(), file("s3_staging_dir")]),
            work_group: get_val(&[work_group_arg.as_ref(), file("work_group")]),
            role_arn: get_val(&[file("role_arn")]),
            result_reuse_enable: get_bool(&[reuse_arg.as_ref(), file("result_reuse_enable")]),
            result_reuse_minutes: get_int(
                &[minutes_arg.as_ref(), file("result_reuse_minutes")],
                DEFAULT_RESULT_REUSE_MINUTES,
            ),
            timeout_seconds: get_int(&[file("timeout_seconds")], 0).max(0) as u64,
        }
    }

    pub fn has_static_credentials(&self) -> bool {
        self.aws_access_key_id.is_some() && self.aws_secret_access_key.is_some()
    }
}

impl std::fmt::Debug for AwsConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AwsConfig")
            .field("profile", &self.profile)
            .field("aws_access_key_id", &self.aws_access_key_id)
            .field(
                "aws_secret_access_key",
                &self.aws_secret_access_key.as_ref().map(|_| "***"),
            )
            .field("region", &self.region)
            .field("s3_staging_dir", &self.s3_staging_dir)
            .field("work_group", &self.work_group)
            .field("role_arn", &self.role_arn)
            .field("result_reuse_enable", &self.result_reuse_enable)
            .field("result_reuse_minutes", &self.result_reuse_minutes)
            .finish()
    }
}

/// Split `catalog.database` on the first dot.
pub fn split_catalog(database: &str) -> (Option<&str>, &str) {
    match database.split_once('.') {
        Some((catalog, db)) => (Some(catalog), db),
        None => (None, database),
    }
}

// ── Tests ────────────────────────────────────────────────────────
