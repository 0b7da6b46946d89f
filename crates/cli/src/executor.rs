//! Statement execution on top of a [`DatabaseBackend`].

use std::sync::Arc;
use std::time::{Duration, Instant};

use dbcli_core::{format_status, rows_status, BackendError, DatabaseBackend};
use tracing::{debug, info};

use crate::format::{TableFormat, UnknownFormat};
use crate::special::{CommandError, SessionState, SpecialCommand, COMMANDS};

const EXPANDED_SUFFIX: &str = "\\G";

/// Follow-up the REPL has to take after a statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Quit,
    Rehash,
    DatabaseChanged(String),
}

/// One rendered-to-be result.
#[derive(Debug, Clone, Default)]
pub struct QueryOutput {
    pub title: Option<String>,
    pub headers: Option<Vec<String>>,
    pub rows: Vec<Vec<Option<String>>>,
    pub status: Option<String>,
    pub expanded: bool,
    pub elapsed: Duration,
    pub action: Option<Action>,
}

impl QueryOutput {
    fn status(status: impl Into<String>) -> Self {
        Self {
            status: Some(status.into()),
            ..Self::default()
        }
    }

    fn table(headers: &[&str], rows: Vec<Vec<Option<String>>>) -> Self {
        Self {
            status: Some(rows_status(Some(rows.len()))),
            headers: Some(headers.iter().map(|h| h.to_string()).collect()),
            rows,
            ..Self::default()
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ExecError {
    #[error(transparent)]
    Backend(#[from] BackendError),

    #[error(transparent)]
    Command(#[from] CommandError),

    #[error(transparent)]
    Format(#[from] UnknownFormat),
}

/// Split `text` into statements on `;`, ignoring semicolons inside string
/// literals, quoted identifiers, comments and dollar-quoted bodies. Each
/// statement keeps its terminating `;`.
pub fn split_statements(text: &str) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    let mut statements = Vec::new();
    let mut current = String::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        let next = chars.get(i + 1).copied();
        match c {
            '\'' | '"' | '`' => {
                current.push(c);
                i += 1;
                while i < chars.len() {
                    let d = chars[i];
                    current.push(d);
                    i += 1;
                    if d == c {
                        // Doubled quote is an escaped quote.
                        if chars.get(i) == Some(&c) {
                            current.push(c);
                            i += 1;
                        } else {
                            break;
                        }
                    }
                }
            }
            '-' if next == Some('-') => {
                while i < chars.len() && chars[i] != '\n' {
                    current.push(chars[i]);
                    i += 1;
                }
            }
            '/' if next == Some('*') => {
                current.push_str("/*");
                i += 2;
                while i < chars.len() {
                    if chars[i] == '*' && chars.get(i + 1) == Some(&'/') {
                        current.push_str("*/");
                        i += 2;
                        break;
                    }
                    current.push(chars[i]);
                    i += 1;
                }
            }
            '$' => match dollar_tag(&chars, i) {
                Some(tag) => {
                    current.push_str(&tag);
                    i += tag.chars().count();
                    let tag_chars: Vec<char> = tag.chars().collect();
                    while i < chars.len() {
                        if chars[i..].starts_with(&tag_chars) {
                            current.push_str(&tag);
                            i += tag_chars.len();
                            break;
                        }
                        current.push(chars[i]);
                        i += 1;
                    }
                }
                None => {
                    current.push(c);
                    i += 1;
                }
            },
            ';' => {
                current.push(c);
                finish_statement(&mut statements, &mut current);
                i += 1;
            }
            _ => {
                current.push(c);
                i += 1;
            }
        }
    }
    finish_statement(&mut statements, &mut current);
    statements
}

fn finish_statement(statements: &mut Vec<String>, current: &mut String) {
    let statement = current.trim();
    if !statement.is_empty() && statement != ";" {
        statements.push(statement.to_string());
    }
    current.clear();
}

/// `$tag$` opening at `start`, if there is one.
fn dollar_tag(chars: &[char], start: usize) -> Option<String> {
    if start > 0 {
        let prev = chars[start - 1];
        if prev.is_alphanumeric() || prev == '_' || prev == '$' {
            return None;
        }
    }
    let mut end = start + 1;
    while end < chars.len() && (chars[end].is_alphanumeric() || chars[end] == '_') {
        end += 1;
    }
    if chars.get(end) != Some(&'$') {
        return None;
    }
    if chars.get(start + 1).is_some_and(|c| c.is_ascii_digit()) {
        return None;
    }
    Some(chars[start..=end].iter().collect())
}

/// Runs statements and special commands, mirroring the backend's database.
pub struct SqlExecutor {
    backend: Arc<dyn DatabaseBackend>,
    database: Option<String>,
    pub state: SessionState,
}

impl SqlExecutor {
    pub fn new(backend: Arc<dyn DatabaseBackend>, state: SessionState) -> Self {
        Self {
            database: backend.database(),
            backend,
            state,
        }
    }

    pub fn backend(&self) -> Arc<dyn DatabaseBackend> {
        Arc::clone(&self.backend)
    }

    pub fn database(&self) -> Option<&str> {
        self.database.as_deref()
    }

    pub async fn connect(&mut self, database: Option<&str>) -> Result<(), BackendError> {
        self.backend.connect(database).await?;
        self.database = self.backend.database();
        Ok(())
    }

    /// Run every statement in `text`. Results come back in order; a failing
    /// statement is the last entry, and nothing after a quit is run.
    pub async fn run(&mut self, text: &str) -> Vec<Result<QueryOutput, ExecError>> {
        if text.trim().is_empty() {
            return vec![Ok(QueryOutput::default())];
        }
        let mut results = Vec::new();
        for statement in split_statements(text) {
            let result = self.run_statement(&statement).await;
            let stop = match &result {
                Ok(output) => output.action == Some(Action::Quit),
                Err(_) => true,
            };
            results.push(result);
            if stop {
                break;
            }
        }
        results
    }

    /// Run a single statement as produced by [`split_statements`].
    pub async fn run_statement(&mut self, statement: &str) -> Result<QueryOutput, ExecError> {
        let mut sql = statement.trim().trim_end_matches(';').trim_end();
        let mut expanded = self.state.expanded;
        if let Some(stripped) = sql.strip_suffix(EXPANDED_SUFFIX) {
            expanded = true;
            sql = stripped.trim_end();
        }
        if sql.is_empty() {
            return Ok(QueryOutput {
                expanded,
                ..QueryOutput::default()
            });
        }

        let started = Instant::now();
        let mut output = match SpecialCommand::parse(sql)? {
            Some(command) => {
                debug!(command = ?command, "Running special command");
                self.run_special(command).await?
            }
            None => self.run_query(sql).await?,
        };
        output.elapsed = started.elapsed();
        output.expanded = expanded;
        Ok(output)
    }

    async fn run_query(&mut self, sql: &str) -> Result<QueryOutput, ExecError> {
        let result = self.backend.execute(sql).await?;
        self.database = self.backend.database();

        if self.backend.supports_special_command("output_location") {
            self.state.output_location = result
                .stats
                .as_ref()
                .and_then(|s| s.output_location.clone());
        }

        let rows_len = result.has_result_set().then_some(result.rows.len());
        let status = format_status(rows_len, result.stats.as_ref(), self.backend.as_ref());
        if !result.has_result_set() {
            debug!("No rows in result.");
        }
        Ok(QueryOutput {
            headers: result.headers(),
            rows: result.rows,
            status: Some(status),
            ..QueryOutput::default()
        })
    }

    async fn run_special(&mut self, command: SpecialCommand) -> Result<QueryOutput, ExecError> {
        let output = match command {
            SpecialCommand::Help => QueryOutput {
                status: None,
                ..QueryOutput::table(
                    &["Command", "Shortcut", "Description"],
                    COMMANDS
                        .iter()
                        .map(|(c, s, d)| {
                            vec![Some(c.to_string()), Some(s.to_string()), Some(d.to_string())]
                        })
                        .collect(),
                )
            },
            SpecialCommand::Quit => QueryOutput {
                action: Some(Action::Quit),
                ..QueryOutput::default()
            },
            SpecialCommand::ListDatabases => {
                let names = self.databases().await?;
                QueryOutput::table(&["Database"], single_column(names))
            }
            SpecialCommand::ListTables(pattern) => {
                let mut names = self.tables().await?;
                if let Some(pattern) = pattern {
                    let needle = pattern.to_lowercase();
                    names.retain(|n| n.to_lowercase().contains(&needle));
                }
                QueryOutput::table(&["Table"], single_column(names))
            }
            SpecialCommand::UseDatabase(db) => {
                self.connect(Some(&db)).await?;
                info!(database = %db, "Changed database");
                QueryOutput {
                    action: Some(Action::DatabaseChanged(db.clone())),
                    ..QueryOutput::status(format!("You are now connected to database \"{db}\""))
                }
            }
            SpecialCommand::TableFormat(None) => QueryOutput::status(format!(
                "Current table format: {}. Valid formats: {}",
                self.state.table_format,
                TableFormat::names().join(", ")
            )),
            SpecialCommand::TableFormat(Some(name)) => {
                self.state.table_format = TableFormat::parse_name(&name)?;
                QueryOutput::status(format!("Changed table format to {}", self.state.table_format))
            }
            SpecialCommand::Timing => {
                self.state.timing = !self.state.timing;
                QueryOutput::status(format!("Timing is {}.", on_off(self.state.timing)))
            }
            SpecialCommand::Expanded => {
                self.state.expanded = !self.state.expanded;
                QueryOutput::status(format!(
                    "Expanded display is {}.",
                    on_off(self.state.expanded)
                ))
            }
            SpecialCommand::Rehash => QueryOutput {
                action: Some(Action::Rehash),
                ..QueryOutput::default()
            },
            SpecialCommand::OutputLocation => {
                if !self.backend.supports_special_command("output_location") {
                    QueryOutput::status(format!(
                        "{} does not support output_location",
                        self.backend.name()
                    ))
                } else {
                    match &self.state.output_location {
                        Some(location) => QueryOutput::status(location.clone()),
                        None => QueryOutput::status("No output location yet. Run a query first."),
                    }
                }
            }
        };
        Ok(output)
    }

    pub async fn databases(&self) -> Result<Vec<String>, BackendError> {
        self.backend.databases().await
    }

    pub async fn tables(&self) -> Result<Vec<String>, BackendError> {
        self.backend.tables().await
    }

    pub async fn table_columns(&self) -> Result<Vec<(String, String)>, BackendError> {
        self.backend.table_columns().await
    }
}

fn single_column(values: Vec<String>) -> Vec<Vec<Option<String>>> {
    values.into_iter().map(|v| vec![Some(v)]).collect()
}

fn on_off(flag: bool) -> &'static str {
    if flag {
        "on"
    } else {
        "off"
    }
}

/// Statements that change or remove data and deserve a confirmation.
pub fn is_destructive(text: &str) -> bool {
    split_statements(text).iter().any(|statement| {
        let lower = statement.to_lowercase();
        let words: Vec<&str> = lower.split_whitespace().take(2).collect();
        match words.as_slice() {
            ["drop" | "delete" | "truncate" | "alter" | "update", ..] => true,
            ["insert", "overwrite"] => true,
            _ => false,
        }
    })
}
