use dbcli_core::config::{first_env, get_int, get_val, Config, ProfileSection, Setting};
use dbcli_core::ConfigError;
use serde::{Deserialize, Serialize};

pub const DEFAULT_PORT: u16 = 5439;
pub const DEFAULT_DATABASE: &str = "dev";
pub const DEFAULT_SSLMODE: &str = "prefer";
pub const DEFAULT_REGION: &str = "us-east-1";

/// Connection settings given on the command line.
#[derive(Debug, Clone, Default)]
pub struct RedshiftArgs {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub database: Option<String>,
    pub user: Option<String>,
    pub password: Option<String>,
    pub sslmode: Option<String>,
    pub aws_profile: Option<String>,
    pub region: Option<String>,
}

/// Resolved Redshift connection settings.
///
/// Each field is taken from the command line, then the
/// `[redshift_profile.default]` section (or `[main]` when that section is
/// absent), then the environment, then a built-in default.
#[derive(Clone, Serialize, Deserialize)]
pub struct RedshiftConfig {
    pub host: Option<String>,
    pub port: u16,
    pub database: String,
    pub user: Option<String>,
    pub password: Option<String>,
    pub sslmode: String,
    pub aws_profile: String,
    pub region: String,
    /// Seconds to wait for the server when connecting.
    pub connect_timeout: Option<u64>,
}

impl RedshiftConfig {
    pub fn resolve(args: &RedshiftArgs, config: &Config) -> Result<Self, ConfigError> {
        let section = config
            .profile("redshift_profile", "default")
            .filter(|profile| !profile.is_empty())
            .or_else(|| config.section("main"))
            .unwrap_or_default();
        Self::resolve_with_section(args, &section)
    }

    pub fn resolve_with_section(
        args: &RedshiftArgs,
        section: &ProfileSection,
    ) -> Result<Self, ConfigError> {
        let pick = |arg: &Option<String>, key: &str, env_keys: &[&str]| {
            let arg = arg.as_deref().map(Setting::from);
            get_val(&[arg.as_ref(), section.get(key)]).or_else(|| first_env(env_keys))
        };

        let port_arg = args.port.map(|p| Setting::Int(i64::from(p)));
        let port = match get_val(&[port_arg.as_ref(), section.get("port")])
            .or_else(|| first_env(&["REDSHIFT_PORT", "PGPORT"]))
        {
            Some(raw) => raw
                .trim()
                .parse::<u16>()
                .map_err(|_| ConfigError::Invalid(format!("invalid port '{raw}'")))?,
            None => DEFAULT_PORT,
        };

        let connect_timeout = get_int(&[section.get("connect_timeout")], 0);

        Ok(Self {
            host: pick(&args.host, "host", &["REDSHIFT_HOST", "PGHOST"]),
            port,
            database: pick(&args.database, "database", &["REDSHIFT_DATABASE", "PGDATABASE"])
                .unwrap_or_else(|| DEFAULT_DATABASE.to_string()),
            user: pick(&args.user, "user", &["REDSHIFT_USER", "PGUSER", "USER"]),
            password: pick(&args.password, "password", &["REDSHIFT_PASSWORD", "PGPASSWORD"]),
            sslmode: pick(&args.sslmode, "sslmode", &["PGSSLMODE"])
                .unwrap_or_else(|| DEFAULT_SSLMODE.to_string()),
            aws_profile: pick(&args.aws_profile, "aws_profile", &["AWS_PROFILE"])
                .unwrap_or_else(|| "default".to_string()),
            region: pick(&args.region, "region", &["AWS_DEFAULT_REGION"])
                .unwrap_or_else(|| DEFAULT_REGION.to_string()),
            connect_timeout: (connect_timeout > 0).then_some(connect_timeout as u64),
        })
    }
}

impl std::fmt::Debug for RedshiftConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedshiftConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database", &self.database)
            .field("user", &self.user)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .field("sslmode", &self.sslmode)
            .field("aws_profile", &self.aws_profile)
            .field("region", &self.region)
            .finish()
    }
}
