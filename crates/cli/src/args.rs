//! Command-line flags for both binaries.

use clap::{ArgAction, Parser};
use dbcli_athena::AwsArgs;
use dbcli_redshift::RedshiftArgs;

use crate::factory::BackendOptions;
use crate::format::TableFormat;

pub const ATHENACLIRC: &str = "~/.athenacli/athenaclirc";
pub const REDSHIFTCLIRC: &str = "~/.redshiftcli/redshiftclirc";

/// Settings shared by both front ends once flags are parsed.
#[derive(Debug, Clone)]
pub struct Launch {
    pub rc_file: String,
    pub execute: Option<String>,
    pub table_format: TableFormat,
    pub backend: BackendOptions,
}

#[derive(Parser, Debug)]
#[command(
    name = "athenacli",
    version,
    about = "An Athena terminal client with auto-completion and syntax highlighting."
)]
pub struct AthenaCliArgs {
    /// Execute a query (or a file of queries, or `-` for stdin) and quit.
    #[arg(short = 'e', long)]
    pub execute: Option<String>,

    /// AWS region.
    #[arg(short = 'r', long)]
    pub region: Option<String>,

    #[arg(long)]
    pub aws_access_key_id: Option<String>,

    #[arg(long)]
    pub aws_secret_access_key: Option<String>,

    /// S3 location for query results.
    #[arg(long)]
    pub s3_staging_dir: Option<String>,

    /// Athena work group.
    #[arg(long)]
    pub work_group: Option<String>,

    /// Reuse previous query results when possible.
    #[arg(long)]
    pub result_reuse_enable: bool,

    /// Maximum age of reusable results, in minutes.
    #[arg(long)]
    pub result_reuse_minutes: Option<i64>,

    /// Read settings from `[aws_profile.<name>]`.
    #[arg(long, default_value = "default")]
    pub profile: String,

    /// Location of the config file.
    #[arg(long, default_value = ATHENACLIRC)]
    pub athenaclirc: String,

    /// Output format for `--execute`.
    #[arg(long, value_enum, default_value_t = TableFormat::Csv)]
    pub table_format: TableFormat,

    /// Database to use, optionally as `catalog.database`.
    pub database: Option<String>,
}

impl AthenaCliArgs {
    pub fn into_launch(self) -> Launch {
        Launch {
            rc_file: self.athenaclirc,
            execute: self.execute,
            table_format: self.table_format,
            backend: BackendOptions {
                database: self.database,
                aws_profile: self.profile,
                athena: AwsArgs {
                    aws_access_key_id: self.aws_access_key_id,
                    aws_secret_access_key: self.aws_secret_access_key,
                    region: self.region,
                    s3_staging_dir: self.s3_staging_dir,
                    work_group: self.work_group,
                    result_reuse_enable: self.result_reuse_enable.then_some(true),
                    result_reuse_minutes: self.result_reuse_minutes,
                },
                redshift: RedshiftArgs::default(),
            },
        }
    }
}

// `-h` is the host, as in psql; help is long-only.
#[derive(Parser, Debug)]
#[command(
    name = "redshiftcli",
    version,
    about = "A Redshift terminal client with auto-completion.",
    disable_help_flag = true
)]
pub struct RedshiftCliArgs {
    #[arg(long, action = ArgAction::Help)]
    help: Option<bool>,

    /// Cluster endpoint.
    #[arg(short = 'h', long)]
    pub host: Option<String>,

    #[arg(short = 'p', long)]
    pub port: Option<u16>,

    /// User name; prefix with `IAM:` for temporary cluster credentials.
    #[arg(short = 'U', long)]
    pub user: Option<String>,

    #[arg(short = 'W', long)]
    pub password: Option<String>,

    #[arg(long)]
    pub sslmode: Option<String>,

    /// AWS profile used for IAM authentication.
    #[arg(long)]
    pub aws_profile: Option<String>,

    /// AWS region used for IAM authentication.
    #[arg(long)]
    pub region: Option<String>,

    /// Execute a query (or a file of queries, or `-` for stdin) and quit.
    #[arg(short = 'e', long)]
    pub execute: Option<String>,

    /// Location of the config file.
    #[arg(long, default_value = REDSHIFTCLIRC)]
    pub redshiftclirc: String,

    /// Output format for `--execute`.
    #[arg(long, value_enum, default_value_t = TableFormat::Csv)]
    pub table_format: TableFormat,

    /// Database to connect to.
    pub database: Option<String>,
}

impl RedshiftCliArgs {
    pub fn into_launch(self) -> Launch {
        Launch {
            rc_file: self.redshiftclirc,
            execute: self.execute,
            table_format: self.table_format,
            backend: BackendOptions {
                database: self.database.clone(),
                aws_profile: self.aws_profile.clone().unwrap_or_default(),
                athena: AwsArgs::default(),
                redshift: RedshiftArgs {
                    host: self.host,
                    port: self.port,
                    database: self.database,
                    user: self.user,
                    password: self.password,
                    sslmode: self.sslmode,
                    aws_profile: self.aws_profile,
                    region: self.region,
                },
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn both_parsers_are_well_formed() {
        AthenaCliArgs::command().debug_assert();
        RedshiftCliArgs::command().debug_assert();
    }

    #[test]
    fn athena_flags_map_onto_aws_args() {
        let args = AthenaCliArgs::parse_from([
            "athenacli",
            "-r",
            "eu-west-1",
            "--s3-staging-dir",
            "s3://bucket/out/",
            "--result-reuse-enable",
            "--result-reuse-minutes",
            "30",
            "--profile",
            "prod",
            "lake.sales",
        ]);
        let launch = args.into_launch();
        assert_eq!(launch.rc_file, ATHENACLIRC);
        assert_eq!(launch.table_format, TableFormat::Csv);
        assert_eq!(launch.backend.database.as_deref(), Some("lake.sales"));
        assert_eq!(launch.backend.aws_profile, "prod");
        let aws = launch.backend.athena;
        assert_eq!(aws.region.as_deref(), Some("eu-west-1"));
        assert_eq!(aws.s3_staging_dir.as_deref(), Some("s3://bucket/out/"));
        assert_eq!(aws.result_reuse_enable, Some(true));
        assert_eq!(aws.result_reuse_minutes, Some(30));
    }

    #[test]
    fn reuse_flag_absent_leaves_config_in_charge() {
        let launch = AthenaCliArgs::parse_from(["athenacli"]).into_launch();
        assert_eq!(launch.backend.athena.result_reuse_enable, None);
        assert_eq!(launch.backend.database, None);
    }

    #[test]
    fn redshift_short_h_is_host() {
        let args = RedshiftCliArgs::parse_from([
            "redshiftcli",
            "-h",
            "cluster.example.com",
            "-p",
            "5440",
            "-U",
            "IAM:alice",
            "--table-format",
            "json",
            "analytics",
        ]);
        let launch = args.into_launch();
        assert_eq!(launch.table_format, TableFormat::Json);
        let rs = launch.backend.redshift;
        assert_eq!(rs.host.as_deref(), Some("cluster.example.com"));
        assert_eq!(rs.port, Some(5440));
        assert_eq!(rs.user.as_deref(), Some("IAM:alice"));
        assert_eq!(rs.database.as_deref(), Some("analytics"));
    }

    #[test]
    fn redshift_help_is_long_only() {
        let err = RedshiftCliArgs::try_parse_from(["redshiftcli", "--help"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::DisplayHelp);
        let err = RedshiftCliArgs::try_parse_from(["redshiftcli", "-h"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::InvalidValue);
    }

    #[test]
    fn unknown_table_format_is_rejected() {
        let err = AthenaCliArgs::try_parse_from(["athenacli", "--table-format", "xml"])
            .unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::InvalidValue);
    }
}
