use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use dbcli_core::{humanize_size, BackendError, DatabaseBackend, PromptContext, QueryStats, ResultSet};
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::client::{AthenaClient, ExecutionTarget};
use crate::config::{split_catalog, AwsConfig, DEFAULT_CATALOG};

/// Athena charges $5 per TiB scanned.
const COST_PER_TIB: f64 = 5.0;
const TIB: f64 = 1024.0 * 1024.0 * 1024.0 * 1024.0;

#[derive(Debug, Clone)]
struct Location {
    catalog: String,
    database: Option<String>,
}

impl Location {
    fn parse(database: Option<&str>, catalog: Option<&str>) -> Self {
        match database.filter(|d| !d.is_empty()) {
            Some(db) => {
                let (named_catalog, db) = split_catalog(db);
                Self {
                    catalog: named_catalog
                        .or(catalog)
                        .unwrap_or(DEFAULT_CATALOG)
                        .to_string(),
                    database: Some(db.to_string()),
                }
            }
            None => Self {
                catalog: catalog.unwrap_or(DEFAULT_CATALOG).to_string(),
                database: None,
            },
        }
    }
}

/// [`DatabaseBackend`] over AWS Athena.
pub struct AthenaBackend {
    config: AwsConfig,
    location: RwLock<Location>,
    client: Mutex<Option<Arc<AthenaClient>>>,
}

impl AthenaBackend {
    pub fn new(config: AwsConfig, database: Option<&str>, catalog: Option<&str>) -> Self {
        Self {
            location: RwLock::new(Location::parse(database, catalog)),
            config,
            client: Mutex::new(None),
        }
    }

    pub fn config(&self) -> &AwsConfig {
        &self.config
    }

    pub fn catalog(&self) -> String {
        self.location_snapshot().catalog
    }

    fn location_snapshot(&self) -> Location {
        match self.location.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    fn set_location(&self, location: Location) {
        match self.location.write() {
            Ok(mut guard) => *guard = location,
            Err(poisoned) => *poisoned.into_inner() = location,
        }
    }

    fn target(&self) -> ExecutionTarget {
        let location = self.location_snapshot();
        ExecutionTarget {
            catalog: location.catalog,
            database: location.database,
            work_group: self.config.work_group.clone(),
            output_location: self.config.s3_staging_dir.clone(),
            result_reuse_minutes: self
                .config
                .result_reuse_enable
                .then_some(self.config.result_reuse_minutes),
            timeout_seconds: self.config.timeout_seconds,
        }
    }

    async fn client(&self) -> Result<Arc<AthenaClient>, BackendError> {
        self.client
            .lock()
            .await
            .clone()
            .ok_or(BackendError::NotConnected)
    }

    pub async fn cancel_query(&self, query_id: &str) -> Result<(), BackendError> {
        Ok(self.client().await?.cancel_query(query_id).await?)
    }

    pub async fn query_status(&self, query_id: &str) -> Result<QueryStats, BackendError> {
        Ok(self.client().await?.query_status(query_id).await?)
    }
}

#[async_trait]
impl DatabaseBackend for AthenaBackend {
    fn name(&self) -> &'static str {
        "Athena"
    }

    fn database(&self) -> Option<String> {
        self.location_snapshot().database
    }

    async fn connect(&self, database: Option<&str>) -> Result<(), BackendError> {
        if let Some(db) = database {
            let current = self.catalog();
            let location = Location::parse(Some(db), Some(&current));
            info!(catalog = %location.catalog, database = ?location.database, "Switching Athena database");
            self.set_location(location);
        }

        debug!(config = ?self.config, "Building Athena client");
        let fresh = Arc::new(AthenaClient::connect(&self.config).await);
        *self.client.lock().await = Some(fresh);
        Ok(())
    }

    async fn close(&self) {
        self.client.lock().await.take();
    }

    async fn execute(&self, sql: &str) -> Result<ResultSet, BackendError> {
        let client = self.client().await?;
        Ok(client.execute(sql, &self.target()).await?)
    }

    fn format_statistics(&self, stats: &QueryStats) -> String {
        let cost = stats.bytes_scanned as f64 / TIB * COST_PER_TIB;
        format!(
            "\nExecution time: {} ms, Data scanned: {}, Approximate cost: ${:.2}",
            stats.execution_time_ms,
            humanize_size(stats.bytes_scanned),
            cost
        )
    }

    fn supports_special_command(&self, command: &str) -> bool {
        command == "output_location"
    }

    fn prompt_context(&self) -> PromptContext {
        PromptContext {
            database: self.database(),
            region: self.config.region.clone(),
            ..PromptContext::default()
        }
    }
}
