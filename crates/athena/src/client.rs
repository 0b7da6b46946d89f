//! AWS Athena query execution client.
//!
//! Provides [`AthenaClient`] for executing SQL statements against AWS Athena,
//! with exponential-backoff polling, optional timeout enforcement, paginated
//! result fetching and header-row detection.

use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use aws_config::BehaviorVersion;
use aws_credential_types::provider::SharedCredentialsProvider;
use aws_credential_types::Credentials;
use aws_sdk_athena::config::Region;
use aws_sdk_athena::types::{
    QueryExecution, QueryExecutionContext, QueryExecutionState, ResultConfiguration,
    ResultReuseByAgeConfiguration, ResultReuseConfiguration,
};
use dbcli_core::{BackendError, Column, QueryStats, ResultSet};
use tracing::{debug, error, info, warn};

use crate::config::AwsConfig;

/// Page size for `GetQueryResults` (the API maximum).
const RESULT_PAGE_SIZE: i32 = 1000;

// ---------------------------------------------------------------------------
// Error
// ---------------------------------------------------------------------------

/// Errors that can occur during Athena operations.
#[derive(Debug, thiserror::Error)]
pub enum AthenaError {
    /// The query execution failed on the Athena side.
    #[error("Query {query_id} failed: {reason}")]
    QueryFailed { query_id: String, reason: String },

    /// The query was cancelled (either by the user or by Athena).
    #[error("Query {query_id} was cancelled")]
    QueryCancelled { query_id: String },

    /// The query exceeded the configured timeout.
    #[error("Query {query_id} timed out after {seconds}s")]
    QueryTimeout { query_id: String, seconds: u64 },

    /// An AWS SDK error (stringified).
    #[error("AWS SDK error: {0}")]
    AwsSdk(String),

    /// Failed to interpret Athena result data.
    #[error("Parse error: {0}")]
    ParseError(String),
}

impl From<AthenaError> for BackendError {
    fn from(err: AthenaError) -> Self {
        match err {
            AthenaError::AwsSdk(msg) => BackendError::Connection(msg),
            other => BackendError::Query(other.to_string()),
        }
    }
}

/// Where and how statements run. Changes with `USE`/`\u`.
#[derive(Debug, Clone)]
pub struct ExecutionTarget {
    pub catalog: String,
    pub database: Option<String>,
    pub work_group: Option<String>,
    pub output_location: Option<String>,
    /// `Some(minutes)` enables result reuse for that age.
    pub result_reuse_minutes: Option<i64>,
    pub timeout_seconds: u64,
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// Thin wrapper over the SDK client that runs one statement to completion.
pub struct AthenaClient {
    client: aws_sdk_athena::Client,
}

impl AthenaClient {
    /// Build a client from resolved settings.
    ///
    /// Static keys take priority; otherwise the named profile is handed to
    /// the SDK's default chain. A configured `role_arn` is assumed on top of
    /// whichever credentials were found.
    pub async fn connect(config: &AwsConfig) -> Self {
        let mut loader = aws_config::defaults(BehaviorVersion::latest());
        if let Some(region) = &config.region {
            loader = loader.region(Region::new(region.clone()));
        }
        match (&config.aws_access_key_id, &config.aws_secret_access_key) {
            (Some(key_id), Some(secret)) => {
                loader = loader.credentials_provider(Credentials::new(
                    key_id,
                    secret,
                    None,
                    None,
                    "athenacli",
                ));
            }
            _ => {
                if !config.profile.is_empty() {
                    loader = loader.profile_name(&config.profile);
                }
            }
        }
        let mut sdk_config = loader.load().await;

        if let Some(role_arn) = &config.role_arn {
            info!(role_arn = %role_arn, "Assuming role for Athena access");
            let provider = aws_config::sts::AssumeRoleProvider::builder(role_arn)
                .session_name("athenacli")
                .configure(&sdk_config)
                .build()
                .await;
            sdk_config = sdk_config
                .to_builder()
                .credentials_provider(SharedCredentialsProvider::new(provider))
                .build();
        }

        info!(
            region = ?sdk_config.region().map(|r| r.to_string()),
            profile = %config.profile,
            "AthenaClient initialised"
        );

        Self {
            client: aws_sdk_athena::Client::new(&sdk_config),
        }
    }

    // -----------------------------------------------------------------------
    // Public API
    // -----------------------------------------------------------------------

    /// Execute a statement and return its parsed results.
    ///
    /// This performs the full lifecycle:
    /// 1. Start query execution
    /// 2. Poll until completion (with exponential backoff)
    /// 3. Page through the results on success
    pub async fn execute(
        &self,
        sql: &str,
        target: &ExecutionTarget,
    ) -> Result<ResultSet, AthenaError> {
        info!(sql = %sql, "Starting Athena query");

        let query_id = self.start_query(sql, target).await?;
        info!(query_id = %query_id, "Query execution started");

        let execution = self.poll_until_complete(&query_id, target.timeout_seconds).await?;
        let stats = extract_stats(&query_id, &execution);

        let (columns, rows) = self.fetch_results(&query_id).await?;

        debug!(
            columns = columns.len(),
            rows = rows.len(),
            query_id = %query_id,
            "Fetched Athena results"
        );

        Ok(ResultSet {
            columns: if columns.is_empty() { None } else { Some(columns) },
            rows,
            stats: Some(stats),
        })
    }

    /// Cancel a running Athena query.
    pub async fn cancel_query(&self, query_id: &str) -> Result<(), AthenaError> {
        info!(query_id = %query_id, "Cancelling query");

        self.client
            .stop_query_execution()
            .query_execution_id(query_id)
            .send()
            .await
            .map_err(|e| AthenaError::AwsSdk(e.to_string()))?;

        info!(query_id = %query_id, "Query cancellation requested");
        Ok(())
    }

    /// Get the current statistics for an existing query execution.
    pub async fn query_status(&self, query_id: &str) -> Result<QueryStats, AthenaError> {
        let execution = self.get_execution(query_id).await?;
        Ok(extract_stats(query_id, &execution))
    }

    // -----------------------------------------------------------------------
    // Private helpers
    // -----------------------------------------------------------------------

    async fn start_query(&self, sql: &str, target: &ExecutionTarget) -> Result<String, AthenaError> {
        let mut ctx = QueryExecutionContext::builder().catalog(&target.catalog);
        if let Some(db) = target.database.as_deref().filter(|d| !d.is_empty()) {
            ctx = ctx.database(db);
        }

        let mut request = self
            .client
            .start_query_execution()
            .query_string(sql)
            .query_execution_context(ctx.build());

        if let Some(location) = &target.output_location {
            request = request.result_configuration(
                ResultConfiguration::builder()
                    .output_location(location)
                    .build(),
            );
        }
        if let Some(work_group) = &target.work_group {
            request = request.work_group(work_group);
        }
        if let Some(minutes) = target.result_reuse_minutes {
            request = request.result_reuse_configuration(
                ResultReuseConfiguration::builder()
                    .result_reuse_by_age_configuration(
                        ResultReuseByAgeConfiguration::builder()
                            .enabled(true)
                            .max_age_in_minutes(minutes.clamp(1, i32::MAX as i64) as i32)
                            .build(),
                    )
                    .build(),
            );
        }

        let resp = request
            .send()
            .await
            .map_err(|e| AthenaError::AwsSdk(e.to_string()))?;

        resp.query_execution_id()
            .map(str::to_string)
            .ok_or_else(|| AthenaError::AwsSdk("No query execution ID returned".into()))
    }

    async fn get_execution(&self, query_id: &str) -> Result<QueryExecution, AthenaError> {
        let resp = self
            .client
            .get_query_execution()
            .query_execution_id(query_id)
            .send()
            .await
            .map_err(|e| AthenaError::AwsSdk(e.to_string()))?;

        resp.query_execution()
            .cloned()
            .ok_or_else(|| AthenaError::AwsSdk("No query execution in response".into()))
    }

    /// Poll [`GetQueryExecution`] with exponential backoff until the query
    /// reaches a terminal state (SUCCEEDED, FAILED, CANCELLED) or the
    /// timeout, if any, is exceeded.
    async fn poll_until_complete(
        &self,
        query_id: &str,
        timeout_seconds: u64,
    ) -> Result<QueryExecution, AthenaError> {
        let start = Instant::now();
        let timeout = (timeout_seconds > 0).then(|| Duration::from_secs(timeout_seconds));
        let mut backoff = Backoff::default();

        loop {
            let execution = self.get_execution(query_id).await?;
            let state = execution
                .status()
                .and_then(|s| s.state())
                .cloned()
                .unwrap_or(QueryExecutionState::Queued);

            debug!(
                query_id = %query_id,
                state = ?state,
                elapsed_ms = start.elapsed().as_millis() as u64,
                "Polling query status"
            );

            match state {
                QueryExecutionState::Succeeded => return Ok(execution),

                QueryExecutionState::Failed => {
                    let reason = execution
                        .status()
                        .and_then(|s| s.state_change_reason())
                        .unwrap_or("unknown")
                        .to_string();

                    error!(query_id = %query_id, reason = %reason, "Query failed");
                    return Err(AthenaError::QueryFailed {
                        query_id: query_id.to_string(),
                        reason,
                    });
                }

                QueryExecutionState::Cancelled => {
                    warn!(query_id = %query_id, "Query was cancelled");
                    return Err(AthenaError::QueryCancelled {
                        query_id: query_id.to_string(),
                    });
                }

                // Queued | Running | unknown future variant
                _ => {}
            }

            if let Some(limit) = timeout {
                if start.elapsed() > limit {
                    warn!(query_id = %query_id, timeout_seconds, "Query timed out, cancelling");
                    // Best-effort cancel; the timeout is what gets reported.
                    let _ = self.cancel_query(query_id).await;
                    return Err(AthenaError::QueryTimeout {
                        query_id: query_id.to_string(),
                        seconds: timeout_seconds,
                    });
                }
            }

            tokio::time::sleep(backoff.next_delay()).await;
        }
    }

    /// Fetch every page of results.
    async fn fetch_results(
        &self,
        query_id: &str,
    ) -> Result<(Vec<Column>, Vec<Vec<Option<String>>>), AthenaError> {
        let mut columns: Vec<Column> = Vec::new();
        let mut rows: Vec<Vec<Option<String>>> = Vec::new();
        let mut next_token: Option<String> = None;
        let mut is_first_page = true;

        loop {
            let mut request = self
                .client
                .get_query_results()
                .query_execution_id(query_id)
                .max_results(RESULT_PAGE_SIZE);
            if let Some(token) = &next_token {
                request = request.next_token(token);
            }

            let page = request
                .send()
                .await
                .map_err(|e| AthenaError::AwsSdk(e.to_string()))?;

            let result_set = page
                .result_set()
                .ok_or_else(|| AthenaError::ParseError("No ResultSet in response".into()))?;

            if columns.is_empty() {
                if let Some(meta) = result_set.result_set_metadata() {
                    columns = meta
                        .column_info()
                        .iter()
                        .map(|ci| Column::new(ci.name(), ci.r#type()))
                        .collect();
                }
            }

            let page_rows: Vec<Vec<Option<String>>> = result_set
                .rows()
                .iter()
                .map(|row| {
                    row.data()
                        .iter()
                        .map(|datum| datum.var_char_value().map(str::to_string))
                        .collect()
                })
                .collect();

            let skip = usize::from(is_first_page && is_header_echo(page_rows.first(), &columns));
            rows.extend(page_rows.into_iter().skip(skip));

            is_first_page = false;
            next_token = page.next_token().map(str::to_string);
            if next_token.is_none() {
                break;
            }
        }

        Ok((columns, rows))
    }
}

/// SELECT results repeat the column names as their first row; SHOW and
/// DDL results do not.
pub(crate) fn is_header_echo(first: Option<&Vec<Option<String>>>, columns: &[Column]) -> bool {
    match first {
        Some(row) if !columns.is_empty() && row.len() == columns.len() => row
            .iter()
            .zip(columns)
            .all(|(cell, col)| cell.as_deref() == Some(col.name.as_str())),
        _ => false,
    }
}

fn extract_stats(query_id: &str, execution: &QueryExecution) -> QueryStats {
    let stats = execution.statistics();
    QueryStats {
        query_id: Some(query_id.to_string()),
        execution_time_ms: stats
            .and_then(|s| s.engine_execution_time_in_millis())
            .unwrap_or(0)
            .max(0) as u64,
        bytes_scanned: stats
            .and_then(|s| s.data_scanned_in_bytes())
            .unwrap_or(0)
            .max(0) as u64,
        output_location: execution
            .result_configuration()
            .and_then(|rc| rc.output_location())
            .map(str::to_string),
    }
}

/// Polling delay: 200ms growing by 1.5x up to 2s, plus up to 99ms jitter.
#[derive(Debug)]
struct Backoff {
    delay_ms: u64,
}

impl Backoff {
    const INITIAL_MS: u64 = 200;
    const MAX_MS: u64 = 2000;
    const FACTOR: f64 = 1.5;

    fn next_delay(&mut self) -> Duration {
        // Jitter without rand: nanosecond fraction of the current time.
        let jitter_ms = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .subsec_nanos() as u64
            % 100;
        let sleep = Duration::from_millis(self.delay_ms + jitter_ms);
        self.delay_ms = ((self.delay_ms as f64 * Self::FACTOR) as u64).min(Self::MAX_MS);
        sleep
    }
}

impl Default for Backoff {
    fn default() -> Self {
        Self {
            delay_ms: Self::INITIAL_MS,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests: parsing logic only, no AWS calls
// ---------------------------------------------------------------------------
