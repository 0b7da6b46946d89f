//! Backend selection.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use dbcli_athena::{AthenaBackend, AwsArgs, AwsConfig};
use dbcli_core::{BackendError, Config, DatabaseBackend};
use dbcli_redshift::{RedshiftArgs, RedshiftBackend, RedshiftConfig};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    Athena,
    Redshift,
}

impl BackendKind {
    pub const ALL: [BackendKind; 2] = [BackendKind::Athena, BackendKind::Redshift];

    pub fn name(self) -> &'static str {
        match self {
            BackendKind::Athena => "Athena",
            BackendKind::Redshift => "Redshift",
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for BackendKind {
    type Err = BackendError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "athena" => Ok(BackendKind::Athena),
            "redshift" => Ok(BackendKind::Redshift),
            _ => Err(BackendError::UnsupportedBackend {
                name: s.to_string(),
                supported: BackendKind::ALL
                    .iter()
                    .map(|k| k.name().to_lowercase())
                    .collect::<Vec<_>>()
                    .join(", "),
            }),
        }
    }
}

/// Everything either backend may need from the command line.
#[derive(Debug, Clone, Default)]
pub struct BackendOptions {
    pub database: Option<String>,
    pub aws_profile: String,
    pub athena: AwsArgs,
    pub redshift: RedshiftArgs,
}

/// Build an unconnected backend of `kind`.
pub fn create_backend(
    kind: BackendKind,
    options: &BackendOptions,
    config: &Config,
) -> Result<Arc<dyn DatabaseBackend>, BackendError> {
    match kind {
        BackendKind::Athena => {
            let profile = if options.aws_profile.is_empty() {
                "default"
            } else {
                options.aws_profile.as_str()
            };
            let aws = AwsConfig::resolve(&options.athena, profile, config);
            debug!(config = ?aws, "Resolved Athena settings");
            Ok(Arc::new(AthenaBackend::new(
                aws,
                options.database.as_deref(),
                None,
            )))
        }
        BackendKind::Redshift => {
            let mut args = options.redshift.clone();
            if args.database.is_none() {
                args.database = options.database.clone();
            }
            let redshift = RedshiftConfig::resolve(&args, config)
                .map_err(|e| BackendError::Config(e.to_string()))?;
            debug!(config = ?redshift, "Resolved Redshift settings");
            Ok(Arc::new(RedshiftBackend::new(redshift)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_parse_case_insensitively() {
        assert_eq!("ATHENA".parse::<BackendKind>().unwrap(), BackendKind::Athena);
        assert_eq!(" redshift ".parse::<BackendKind>().unwrap(), BackendKind::Redshift);
    }

    #[test]
    fn unknown_kind_lists_supported() {
        let err = "mysql".parse::<BackendKind>().unwrap_err();
        assert_eq!(
            err.to_string(),
            "Unsupported backend type: mysql. Supported types: athena, redshift"
        );
    }

    #[test]
    fn athena_backend_gets_database_and_name() {
        let options = BackendOptions {
            database: Some("lake.sales".into()),
            ..BackendOptions::default()
        };
        let backend = create_backend(BackendKind::Athena, &options, &Config::default()).unwrap();
        assert_eq!(backend.name(), "Athena");
        assert_eq!(backend.database().as_deref(), Some("sales"));
    }

    #[test]
    fn redshift_backend_takes_positional_database() {
        let options = BackendOptions {
            database: Some("analytics".into()),
            redshift: RedshiftArgs {
                host: Some("rs.example.com".into()),
                port: Some(5439),
                ..RedshiftArgs::default()
            },
            ..BackendOptions::default()
        };
        let backend =
            create_backend(BackendKind::Redshift, &options, &Config::default()).unwrap();
        assert_eq!(backend.name(), "Redshift");
        assert_eq!(backend.database().as_deref(), Some("analytics"));
        assert!(!backend.escapes_identifiers());
    }

    #[test]
    fn bad_redshift_config_is_a_config_error() {
        let config = Config::parse("[redshift_profile.default]\nport = \"abc\"\n").unwrap();
        let err = create_backend(BackendKind::Redshift, &BackendOptions::default(), &config)
            .err()
            .unwrap();
        assert!(matches!(err, BackendError::Config(_)));
    }
}
