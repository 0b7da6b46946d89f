//! Backend abstraction shared by the Athena and Redshift clients.
//!
//! A [`DatabaseBackend`] owns its connection and exposes a small, uniform
//! surface: run a statement, list metadata for completion, and describe
//! itself for the prompt and the status line.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::BackendError;

pub const DATABASES_QUERY: &str = "SHOW DATABASES";
pub const TABLES_QUERY: &str = "SHOW TABLES";

/// Columns of every relation in `schema`, ordered for completion.
pub fn table_columns_query(schema: &str) -> String {
    format!(
        "SELECT table_name, column_name FROM information_schema.columns \
         WHERE table_schema = '{}' \
         ORDER BY table_name, ordinal_position",
        schema.replace('\'', "''")
    )
}

/// Column definition of a result set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    /// Engine type name (e.g. "varchar", "int8"). Empty when unknown.
    pub data_type: String,
}

impl Column {
    pub fn new(name: impl Into<String>, data_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data_type: data_type.into(),
        }
    }
}

/// Execution statistics reported by the engine, when it reports any.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryStats {
    pub query_id: Option<String>,
    pub execution_time_ms: u64,
    pub bytes_scanned: u64,
    /// Where the engine persisted the result (Athena writes results to S3).
    pub output_location: Option<String>,
}

/// Outcome of a single statement.
///
/// `columns` is `None` for statements that do not produce a result set
/// (DDL, most DML). Cells are `None` for SQL NULL.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResultSet {
    pub columns: Option<Vec<Column>>,
    pub rows: Vec<Vec<Option<String>>>,
    pub stats: Option<QueryStats>,
}

impl ResultSet {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn has_result_set(&self) -> bool {
        self.columns.is_some()
    }

    pub fn headers(&self) -> Option<Vec<String>> {
        self.columns
            .as_ref()
            .map(|cols| cols.iter().map(|c| c.name.clone()).collect())
    }

    /// First column of every row, skipping NULLs.
    pub fn first_column(&self) -> Vec<String> {
        self.rows
            .iter()
            .filter_map(|row| row.first().cloned().flatten())
            .collect()
    }
}

/// Values substituted into the prompt template.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PromptContext {
    pub database: Option<String>,
    pub region: Option<String>,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub user: Option<String>,
}

#[async_trait]
pub trait DatabaseBackend: Send + Sync {
    /// Short engine name used in messages ("Athena", "Redshift").
    fn name(&self) -> &'static str;

    /// Current database / schema.
    fn database(&self) -> Option<String>;

    /// (Re)connect, optionally switching database. On success the previous
    /// connection is replaced.
    async fn connect(&self, database: Option<&str>) -> Result<(), BackendError>;

    async fn close(&self);

    /// Run a single statement.
    async fn execute(&self, sql: &str) -> Result<ResultSet, BackendError>;

    async fn databases(&self) -> Result<Vec<String>, BackendError> {
        Ok(self.execute(DATABASES_QUERY).await?.first_column())
    }

    async fn tables(&self) -> Result<Vec<String>, BackendError> {
        Ok(self.execute(TABLES_QUERY).await?.first_column())
    }

    async fn table_columns(&self) -> Result<Vec<(String, String)>, BackendError> {
        let schema = self.database().unwrap_or_default();
        let result = self.execute(&table_columns_query(&schema)).await?;
        Ok(result
            .rows
            .into_iter()
            .filter_map(|row| {
                let mut cells = row.into_iter();
                match (cells.next().flatten(), cells.next().flatten()) {
                    (Some(table), Some(column)) => Some((table, column)),
                    _ => None,
                }
            })
            .collect())
    }

    /// Backend-specific suffix for the status line.
    fn format_statistics(&self, _stats: &QueryStats) -> String {
        String::new()
    }

    fn supports_special_command(&self, _command: &str) -> bool {
        false
    }

    /// Whether completion names must be quoted before insertion.
    fn escapes_identifiers(&self) -> bool {
        true
    }

    fn prompt_context(&self) -> PromptContext {
        PromptContext {
            database: self.database(),
            ..PromptContext::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct ScriptedBackend {
        database: Mutex<Option<String>>,
        executed: Mutex<Vec<String>>,
    }

    impl ScriptedBackend {
        fn new() -> Self {
            Self {
                database: Mutex::new(Some("sales".into())),
                executed: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl DatabaseBackend for ScriptedBackend {
        fn name(&self) -> &'static str {
            "Scripted"
        }

        fn database(&self) -> Option<String> {
            self.database.lock().unwrap().clone()
        }

        async fn connect(&self, database: Option<&str>) -> Result<(), BackendError> {
            if let Some(db) = database {
                *self.database.lock().unwrap() = Some(db.to_string());
            }
            Ok(())
        }

        async fn close(&self) {}

        async fn execute(&self, sql: &str) -> Result<ResultSet, BackendError> {
            self.executed.lock().unwrap().push(sql.to_string());
            let rows = if sql == DATABASES_QUERY {
                vec![vec![Some("sales".into())], vec![None], vec![Some("ops".into())]]
            } else {
                vec![
                    vec![Some("orders".into()), Some("id".into())],
                    vec![Some("orders".into()), None],
                    vec![Some("orders".into()), Some("total".into())],
                ]
            };
            Ok(ResultSet {
                columns: Some(vec![Column::new("name", "varchar")]),
                rows,
                stats: None,
            })
        }
    }

    #[tokio::test]
    async fn default_databases_skips_nulls() {
        let backend = ScriptedBackend::new();
        assert_eq!(backend.databases().await.unwrap(), vec!["sales", "ops"]);
    }

    #[tokio::test]
    async fn default_table_columns_uses_current_schema() {
        let backend = ScriptedBackend::new();
        let cols = backend.table_columns().await.unwrap();
        assert_eq!(
            cols,
            vec![
                ("orders".to_string(), "id".to_string()),
                ("orders".to_string(), "total".to_string()),
            ]
        );
        let executed = backend.executed.lock().unwrap();
        assert!(executed[0].contains("table_schema = 'sales'"));
    }

    #[test]
    fn table_columns_query_escapes_quotes() {
        let sql = table_columns_query("o'brien");
        assert!(sql.contains("'o''brien'"));
        assert!(sql.contains("ORDER BY table_name, ordinal_position"));
    }

    #[test]
    fn defaults_are_conservative() {
        let backend = ScriptedBackend::new();
        assert!(!backend.supports_special_command("output_location"));
        assert!(backend.escapes_identifiers());
        assert_eq!(backend.format_statistics(&QueryStats::default()), "");
        assert_eq!(backend.prompt_context().database.as_deref(), Some("sales"));
    }
}
