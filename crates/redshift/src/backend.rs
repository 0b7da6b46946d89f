//! Amazon Redshift over the PostgreSQL wire protocol.
//!
//! Statements go through the simple-query protocol, so every value arrives
//! in its text form and DDL runs outside any transaction.

use std::sync::RwLock;
use std::time::Duration;

use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_types::region::Region;
use dbcli_core::{BackendError, Column, DatabaseBackend, PromptContext, ResultSet};
use sqlx::postgres::{PgConnectOptions, PgPoolOptions, PgRow, PgSslMode};
use sqlx::{Column as _, Executor, PgPool, Row, TypeInfo};
use tokio::sync::Mutex;
use tracing::{debug, error, info};

use crate::config::{RedshiftConfig, DEFAULT_DATABASE};
use crate::error::RedshiftError;

pub const DATABASES_QUERY: &str =
    "SELECT datname FROM pg_database WHERE datistemplate = false ORDER BY datname";

pub const TABLES_QUERY: &str = "
    SELECT schemaname, tablename
    FROM pg_tables
    WHERE schemaname NOT IN ('pg_catalog', 'information_schema', 'pg_internal')
    UNION ALL
    SELECT schemaname, viewname
    FROM pg_views
    WHERE schemaname NOT IN ('pg_catalog', 'information_schema', 'pg_internal')
    ORDER BY 1, 2";

pub const TABLE_COLUMNS_QUERY: &str = "
    SELECT c.table_schema, c.table_name, c.column_name
    FROM information_schema.columns c
    WHERE c.table_schema NOT IN ('pg_catalog', 'information_schema', 'pg_internal')
      AND (
        EXISTS (
            SELECT 1 FROM pg_tables t
            WHERE c.table_schema = t.schemaname
              AND c.table_name = t.tablename
        )
        OR EXISTS (
            SELECT 1 FROM pg_views v
            WHERE c.table_schema = v.schemaname
              AND c.table_name = v.viewname
        )
      )
    ORDER BY c.table_schema, c.table_name, c.ordinal_position";

const IAM_PREFIX: &str = "IAM:";
const IAM_CREDENTIALS_SECONDS: i32 = 3600;

/// Who to log in as, after `IAM:` handling.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Login {
    user: Option<String>,
    password: Option<String>,
    use_iam: bool,
}

impl Login {
    fn from_config(config: &RedshiftConfig) -> Self {
        let (user, prefixed) = match config.user.as_deref() {
            Some(u) => match u.strip_prefix(IAM_PREFIX) {
                Some(stripped) => (Some(stripped.to_string()), true),
                None => (Some(u.to_string()), false),
            },
            None => (None, false),
        };
        let use_iam = prefixed || (config.password.is_none() && user.is_some());
        Self {
            user,
            password: config.password.clone(),
            use_iam,
        }
    }
}

/// First DNS label of the cluster endpoint.
pub fn cluster_identifier(host: Option<&str>) -> Result<&str, RedshiftError> {
    host.and_then(|h| h.split('.').next())
        .filter(|id| !id.is_empty())
        .ok_or(RedshiftError::MissingClusterIdentifier)
}

/// [`DatabaseBackend`] over Amazon Redshift.
pub struct RedshiftBackend {
    config: RedshiftConfig,
    login: Login,
    database: RwLock<Option<String>>,
    pool: Mutex<Option<PgPool>>,
}

impl RedshiftBackend {
    pub fn new(config: RedshiftConfig) -> Self {
        let login = Login::from_config(&config);
        Self {
            database: RwLock::new(Some(config.database.clone())),
            config,
            login,
            pool: Mutex::new(None),
        }
    }

    pub fn config(&self) -> &RedshiftConfig {
        &self.config
    }

    pub fn uses_iam(&self) -> bool {
        self.login.use_iam
    }

    pub fn user(&self) -> Option<&str> {
        self.login.user.as_deref()
    }

    fn set_database(&self, database: String) {
        match self.database.write() {
            Ok(mut guard) => *guard = Some(database),
            Err(poisoned) => *poisoned.into_inner() = Some(database),
        }
    }

    async fn pool(&self) -> Result<PgPool, BackendError> {
        self.pool.lock().await.clone().ok_or(BackendError::NotConnected)
    }

    /// Exchange IAM identity for temporary database credentials.
    async fn iam_credentials(&self, database: &str) -> Result<(String, String), RedshiftError> {
        let cluster_id = cluster_identifier(self.config.host.as_deref())?;
        let db_user = self.login.user.clone().unwrap_or_default();
        info!(cluster_id = %cluster_id, "Getting IAM credentials for Redshift cluster");

        let sdk_config = aws_config::defaults(BehaviorVersion::latest())
            .profile_name(&self.config.aws_profile)
            .region(Region::new(self.config.region.clone()))
            .load()
            .await;
        let client = aws_sdk_redshift::Client::new(&sdk_config);

        let resp = client
            .get_cluster_credentials()
            .db_user(&db_user)
            .db_name(database)
            .cluster_identifier(cluster_id)
            .duration_seconds(IAM_CREDENTIALS_SECONDS)
            .auto_create(false)
            .send()
            .await
            .map_err(|e| {
                error!(error = %e, "Failed to get IAM credentials");
                RedshiftError::Iam(e.to_string())
            })?;

        let user = resp.db_user().unwrap_or(&db_user).to_string();
        let password = resp
            .db_password()
            .ok_or_else(|| RedshiftError::Iam("no password in response".into()))?
            .to_string();
        info!(user = %user, "Obtained IAM credentials");
        Ok((user, password))
    }

    async fn open_pool(&self, database: &str) -> Result<PgPool, RedshiftError> {
        let (user, password) = match (&self.login.password, self.login.use_iam) {
            (None, true) => {
                let (u, p) = self.iam_credentials(database).await?;
                (Some(u), Some(p))
            }
            (password, _) => (self.login.user.clone(), password.clone()),
        };

        let mut options = PgConnectOptions::new()
            .port(self.config.port)
            .database(database)
            .ssl_mode(parse_ssl_mode(&self.config.sslmode))
            .application_name("redshiftcli");
        if let Some(host) = &self.config.host {
            options = options.host(host);
        }
        if let Some(user) = &user {
            options = options.username(user);
        }
        if let Some(password) = &password {
            options = options.password(password);
        }

        let mut pool_options = PgPoolOptions::new().max_connections(1);
        if let Some(seconds) = self.config.connect_timeout {
            pool_options = pool_options.acquire_timeout(Duration::from_secs(seconds));
        }
        let pool = pool_options.connect_with(options).await?;

        debug!(
            user = ?user,
            host = ?self.config.host,
            port = self.config.port,
            database = %database,
            "Connected to Redshift"
        );
        Ok(pool)
    }

    async fn fetch(&self, sql: &str) -> Result<Vec<PgRow>, BackendError> {
        let pool = self.pool().await?;
        sqlx::raw_sql(sql)
            .fetch_all(&pool)
            .await
            .map_err(|e| RedshiftError::from(e).into())
    }
}

fn parse_ssl_mode(mode: &str) -> PgSslMode {
    mode.parse().unwrap_or_else(|_| {
        debug!(sslmode = %mode, "Unknown sslmode, using prefer");
        PgSslMode::Prefer
    })
}

fn row_cells(row: &PgRow) -> Vec<Option<String>> {
    (0..row.len())
        .map(|i| row.try_get_unchecked::<Option<String>, _>(i).ok().flatten())
        .collect()
}

fn row_columns(row: &PgRow) -> Vec<Column> {
    row.columns()
        .iter()
        .map(|c| Column::new(c.name(), c.type_info().name()))
        .collect()
}

/// `schema.table` from the first two cells of a metadata row.
fn qualified_name(cells: &[Option<String>]) -> Option<String> {
    match cells {
        [Some(schema), Some(table), ..] => Some(format!("{schema}.{table}")),
        _ => None,
    }
}

#[async_trait]
impl DatabaseBackend for RedshiftBackend {
    fn name(&self) -> &'static str {
        "Redshift"
    }

    fn database(&self) -> Option<String> {
        match self.database.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    async fn connect(&self, database: Option<&str>) -> Result<(), BackendError> {
        let db_name = database
            .map(str::to_string)
            .or_else(|| self.database())
            .filter(|d| !d.is_empty())
            .unwrap_or_else(|| DEFAULT_DATABASE.to_string());

        let pool = self.open_pool(&db_name).await.map_err(|e| {
            error!(error = %e, "Failed to connect to Redshift");
            BackendError::from(e)
        })?;

        self.set_database(db_name);
        if let Some(previous) = self.pool.lock().await.replace(pool) {
            previous.close().await;
        }
        Ok(())
    }

    async fn close(&self) {
        if let Some(pool) = self.pool.lock().await.take() {
            pool.close().await;
        }
    }

    async fn execute(&self, sql: &str) -> Result<ResultSet, BackendError> {
        let rows = self.fetch(sql).await?;

        let columns = match rows.first() {
            Some(first) => Some(row_columns(first)),
            None => {
                // No rows: ask the server whether the statement has a result shape.
                let pool = self.pool().await?;
                match (&pool).describe(sql).await {
                    Ok(described) if !described.columns().is_empty() => Some(
                        described
                            .columns()
                            .iter()
                            .map(|c| Column::new(c.name(), c.type_info().name()))
                            .collect(),
                    ),
                    _ => None,
                }
            }
        };

        Ok(ResultSet {
            columns,
            rows: rows.iter().map(row_cells).collect(),
            stats: None,
        })
    }

    async fn databases(&self) -> Result<Vec<String>, BackendError> {
        Ok(self.execute(DATABASES_QUERY).await?.first_column())
    }

    async fn tables(&self) -> Result<Vec<String>, BackendError> {
        let rows = self.fetch(TABLES_QUERY).await?;
        Ok(rows
            .iter()
            .filter_map(|row| qualified_name(&row_cells(row)))
            .collect())
    }

    async fn table_columns(&self) -> Result<Vec<(String, String)>, BackendError> {
        let rows = self.fetch(TABLE_COLUMNS_QUERY).await?;
        Ok(rows
            .iter()
            .filter_map(|row| {
                let cells = row_cells(row);
                let table = qualified_name(&cells)?;
                let column = cells.get(2).cloned().flatten()?;
                Some((table, column))
            })
            .collect())
    }

    fn escapes_identifiers(&self) -> bool {
        false
    }

    fn prompt_context(&self) -> PromptContext {
        PromptContext {
            database: self.database(),
            host: self.config.host.clone(),
            port: Some(self.config.port),
            user: self.login.user.clone(),
            ..PromptContext::default()
        }
    }
}
