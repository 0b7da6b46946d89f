//! In-memory backend for unit tests.

use std::sync::Mutex;

use async_trait::async_trait;
use dbcli_core::{BackendError, Column, DatabaseBackend, QueryStats, ResultSet};

pub struct FakeBackend {
    database: Mutex<Option<String>>,
    executed: Mutex<Vec<String>>,
    pub fail_columns: bool,
}

impl FakeBackend {
    pub fn new(database: &str) -> Self {
        Self {
            database: Mutex::new(Some(database.to_string())),
            executed: Mutex::new(Vec::new()),
            fail_columns: false,
        }
    }

    pub fn executed(&self) -> Vec<String> {
        self.executed.lock().unwrap().clone()
    }
}

#[async_trait]
impl DatabaseBackend for FakeBackend {
    fn name(&self) -> &'static str {
        "Fake"
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
        if sql.starts_with("fail") {
            return Err(BackendError::Query("boom".into()));
        }
        let n = self.executed.lock().unwrap().len();
        Ok(ResultSet {
            columns: Some(vec![Column::new("col", "varchar")]),
            rows: vec![vec![Some("1".into())]],
            stats: Some(QueryStats {
                query_id: Some(format!("q-{n}")),
                output_location: Some(format!("s3://results/q-{n}.csv")),
                ..QueryStats::default()
            }),
        })
    }

    async fn databases(&self) -> Result<Vec<String>, BackendError> {
        Ok(vec!["ops".into(), "sales".into()])
    }

    async fn tables(&self) -> Result<Vec<String>, BackendError> {
        Ok(vec!["orders".into(), "Customer Events".into()])
    }

    async fn table_columns(&self) -> Result<Vec<(String, String)>, BackendError> {
        if self.fail_columns {
            return Err(BackendError::Query("no access".into()));
        }
        Ok(vec![
            ("orders".into(), "id".into()),
            ("orders".into(), "total".into()),
            ("Customer Events".into(), "user_id".into()),
        ])
    }

    fn supports_special_command(&self, command: &str) -> bool {
        command == "output_location"
    }
}
