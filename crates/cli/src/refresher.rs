//! Background rebuild of the completion metadata.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use dbcli_core::DatabaseBackend;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::completer::SqlCompleter;
use crate::special::command_names;

pub const REFRESH_STARTED: &str = "Auto-completion refresh started in the background.";
pub const REFRESH_RESTARTED: &str = "Auto-completion refresh restarted.";

pub type RefreshCallback = Box<dyn FnOnce(SqlCompleter) + Send>;

/// Steps of a refresh, run in this order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Refresher {
    Databases,
    Schemata,
    Tables,
    SpecialCommands,
}

pub const REFRESHERS: [Refresher; 4] = [
    Refresher::Databases,
    Refresher::Schemata,
    Refresher::Tables,
    Refresher::SpecialCommands,
];

impl Refresher {
    pub fn name(self) -> &'static str {
        match self {
            Refresher::Databases => "databases",
            Refresher::Schemata => "schemata",
            Refresher::Tables => "tables",
            Refresher::SpecialCommands => "special_commands",
        }
    }

    async fn apply(self, completer: &mut SqlCompleter, backend: &dyn DatabaseBackend) {
        match self {
            Refresher::Databases => match backend.databases().await {
                Ok(names) => completer.extend_database_names(names),
                Err(e) => warn!(error = %e, "Could not list databases for completion"),
            },
            Refresher::Schemata => {
                let database = backend.database();
                completer.extend_schemata(database.as_deref());
                completer.set_dbname(database.as_deref());
            }
            Refresher::Tables => {
                let escape = backend.escapes_identifiers();
                match backend.tables().await {
                    Ok(tables) => completer.extend_relations(tables, escape),
                    Err(e) => {
                        warn!(error = %e, "Could not list tables for completion");
                        return;
                    }
                }
                match backend.table_columns().await {
                    Ok(columns) => completer.extend_columns(columns, escape),
                    Err(e) => warn!(error = %e, "Could not list columns for completion"),
                }
            }
            Refresher::SpecialCommands => completer.extend_special_commands(command_names()),
        }
    }
}

/// Runs at most one refresh at a time; a request during a refresh restarts it.
#[derive(Default)]
pub struct CompletionRefresher {
    restart: Arc<AtomicBool>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl CompletionRefresher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_refreshing(&self) -> bool {
        match self.task.lock() {
            Ok(task) => task.as_ref().is_some_and(|t| !t.is_finished()),
            Err(_) => false,
        }
    }

    /// Start (or restart) a refresh. Must be called inside a tokio runtime.
    pub fn refresh(
        &self,
        backend: Arc<dyn DatabaseBackend>,
        callbacks: Vec<RefreshCallback>,
    ) -> &'static str {
        if self.is_refreshing() {
            self.restart.store(true, Ordering::SeqCst);
            return REFRESH_RESTARTED;
        }

        self.restart.store(false, Ordering::SeqCst);
        let restart = Arc::clone(&self.restart);
        let handle = tokio::spawn(async move {
            let completer = build_completer(backend.as_ref(), &restart).await;
            for callback in callbacks {
                callback(completer.clone());
            }
        });
        if let Ok(mut task) = self.task.lock() {
            *task = Some(handle);
        }
        REFRESH_STARTED
    }
}

async fn build_completer(backend: &dyn DatabaseBackend, restart: &AtomicBool) -> SqlCompleter {
    'refresh: loop {
        let mut completer = SqlCompleter::new();
        for refresher in REFRESHERS {
            refresher.apply(&mut completer, backend).await;
            if restart.swap(false, Ordering::SeqCst) {
                debug!(step = refresher.name(), "Completion refresh restarting");
                continue 'refresh;
            }
        }
        return completer;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeBackend;
    use tokio::sync::oneshot;

    fn capture() -> (RefreshCallback, oneshot::Receiver<SqlCompleter>) {
        let (tx, rx) = oneshot::channel();
        let callback: RefreshCallback = Box::new(move |completer| {
            let _ = tx.send(completer);
        });
        (callback, rx)
    }

    #[test]
    fn refreshers_run_in_order() {
        let names: Vec<&str> = REFRESHERS.iter().map(|r| r.name()).collect();
        assert_eq!(names, ["databases", "schemata", "tables", "special_commands"]);
    }

    #[tokio::test]
    async fn refresh_populates_a_new_completer() {
        let refresher = CompletionRefresher::new();
        let (callback, rx) = capture();
        let msg = refresher.refresh(Arc::new(FakeBackend::new("sales")), vec![callback]);
        assert_eq!(msg, REFRESH_STARTED);

        let completer = rx.await.unwrap();
        assert_eq!(completer.databases(), ["ops", "sales"]);
        assert_eq!(completer.schemata(), ["sales"]);
        assert_eq!(
            completer.columns("orders"),
            Some(&["*".to_string(), "id".to_string(), "total".to_string()][..])
        );
        // Escaping backend: names with spaces are quoted.
        assert!(completer.columns("`Customer Events`").is_some());
        assert!(completer.special_commands().contains(&"\\dt".to_string()));
    }

    #[tokio::test]
    async fn second_request_while_running_restarts() {
        let refresher = CompletionRefresher::new();
        let backend: Arc<dyn DatabaseBackend> = Arc::new(FakeBackend::new("sales"));
        let (first, rx) = capture();

        // On a current-thread runtime the spawned task has not run yet.
        assert_eq!(refresher.refresh(Arc::clone(&backend), vec![first]), REFRESH_STARTED);
        assert_eq!(refresher.refresh(Arc::clone(&backend), vec![]), REFRESH_RESTARTED);

        let completer = rx.await.unwrap();
        assert!(!completer.completions("ord").is_empty());
        assert!(!refresher.restart.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn column_failure_still_keeps_tables() {
        let mut backend = FakeBackend::new("sales");
        backend.fail_columns = true;
        let refresher = CompletionRefresher::new();
        let (callback, rx) = capture();
        refresher.refresh(Arc::new(backend), vec![callback]);

        let completer = rx.await.unwrap();
        assert_eq!(completer.columns("orders"), Some(&["*".to_string()][..]));
    }
}
