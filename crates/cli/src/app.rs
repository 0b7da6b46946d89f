//! Startup sequence, one-shot execution and the interactive loop shared by
//! `athenacli` and `redshiftcli`.

use std::fs;
use std::io::{self, Read};
use std::path::Path;
use std::process::ExitCode;
use std::sync::{Arc, RwLock};

use anyhow::{bail, Context, Result};
use chrono::Local;
use dbcli_core::config::{
    expand_home, load_config, load_dotenv, path_exists, write_default_config,
};
use dbcli_core::{DatabaseBackend, MainSettings};
use rustyline::error::ReadlineError;
use rustyline::history::DefaultHistory;
use rustyline::{CompletionType, Config as EditorConfig, EditMode, Editor};
use tracing::{debug, error, info, warn};

use crate::args::Launch;
use crate::completer::{ReplHelper, SqlCompleter};
use crate::executor::{is_destructive, split_statements, Action, QueryOutput, SqlExecutor};
use crate::factory::{create_backend, BackendKind};
use crate::format::{render, TableFormat};
use crate::logging::init_logging;
use crate::prompt::{continuation_prompt, render_prompt, ATHENA_PROMPT, REDSHIFT_PROMPT};
use crate::refresher::{CompletionRefresher, RefreshCallback};
use crate::special::{SessionState, SpecialCommand};
use crate::terminal::{Colors, Terminal};

/// What distinguishes one front end from the other.
#[derive(Debug)]
pub struct Client {
    pub bin: &'static str,
    pub kind: BackendKind,
    pub default_rc: &'static str,
    pub default_config: &'static str,
    pub default_prompt: &'static str,
    pub first_run_hint: &'static str,
}

pub const ATHENA_CLIENT: Client = Client {
    bin: "athenacli",
    kind: BackendKind::Athena,
    default_rc: crate::args::ATHENACLIRC,
    default_config: include_str!("../config/athenaclirc"),
    default_prompt: ATHENA_PROMPT,
    first_run_hint: "Please change it accordingly, and run athenacli again.",
};

pub const REDSHIFT_CLIENT: Client = Client {
    bin: "redshiftcli",
    kind: BackendKind::Redshift,
    default_rc: crate::args::REDSHIFTCLIRC,
    default_config: include_str!("../config/redshiftclirc"),
    default_prompt: REDSHIFT_PROMPT,
    first_run_hint: "Please configure your Redshift connection details and run redshiftcli again.",
};

/// Run a front end to completion.
pub async fn run(client: &'static Client, launch: Launch) -> ExitCode {
    load_dotenv();

    // First run: write the defaults and let the user fill them in.
    if launch.rc_file == client.default_rc && !path_exists(&launch.rc_file) {
        return first_run(client, &launch.rc_file);
    }

    let config = load_config(client.default_config, &launch.rc_file);
    let main = config.main();
    init_logging(&main.log_file, &main.log_level);
    info!(bin = client.bin, config = ?config.filename, "Starting");

    let terminal = Terminal::new(Colors::from_settings(&config.colors()));

    let backend = match connect(client, &launch, &config).await {
        Ok(backend) => backend,
        Err(e) => {
            error!(error = %e, "Connection failed");
            let _ = terminal.print_error(&e.to_string());
            let _ = terminal.print_error(&format!(
                "There was an error while connecting to {backend}. It could be caused due to\n\
                 missing/incomplete configuration. Please verify the configuration in {rc}\n\
                 and run {bin} again.\n\n\
                 For more details about the error, you can check the log file: {log}",
                backend = client.kind,
                rc = launch.rc_file,
                bin = client.bin,
                log = main.log_file,
            ));
            return ExitCode::from(1);
        }
    };

    let table_format = TableFormat::parse_name(&main.table_format).unwrap_or_else(|e| {
        warn!(error = %e, "Falling back to ascii table format");
        TableFormat::Ascii
    });
    let state = SessionState {
        timing: main.timing,
        table_format,
        ..SessionState::default()
    };

    let mut app = App::new(client, main, terminal, SqlExecutor::new(backend, state));
    let result = match launch.execute {
        Some(arg) => app.run_execute(&arg, launch.table_format).await,
        None => app.run_cli().await,
    };
    app.executor.backend().close().await;

    match result {
        Ok(code) => code,
        Err(e) => {
            error!(error = %e, "Fatal error");
            let _ = app.terminal.print_error(&format!("{e:#}"));
            ExitCode::from(1)
        }
    }
}

fn first_run(client: &Client, rc_file: &str) -> ExitCode {
    match write_default_config(client.default_config, rc_file, false) {
        Ok(path) => {
            println!("Welcome to {}!", client.bin);
            println!();
            println!("It seems this is your first time to run {},", client.bin);
            println!("we generated a default config file for you");
            println!("    {}", path.display());
            println!("{}", client.first_run_hint);
        }
        Err(e) => eprintln!("Unable to write default config to {rc_file}: {e}"),
    }
    ExitCode::from(1)
}

async fn connect(
    client: &Client,
    launch: &Launch,
    config: &dbcli_core::Config,
) -> Result<Arc<dyn DatabaseBackend>> {
    let backend = create_backend(client.kind, &launch.backend, config)?;
    let database = backend.database();
    backend.connect(database.as_deref()).await?;
    debug!(backend = backend.name(), database = ?backend.database(), "Connected");
    Ok(backend)
}

/// `-e` accepts `-` (stdin), a path to a file of statements, or SQL text.
fn read_execute_arg(arg: &str) -> Result<String> {
    if arg == "-" {
        if Terminal::stdin_is_tty() {
            bail!("No query to execute on stdin");
        }
        let mut query = String::new();
        io::stdin()
            .read_to_string(&mut query)
            .context("Failed to read query from stdin")?;
        return Ok(query);
    }
    if Path::new(arg).is_file() {
        return fs::read_to_string(arg).with_context(|| format!("Failed to read {arg}"));
    }
    Ok(arg.to_string())
}

/// Whether a line is complete on its own in multi-line mode.
fn ends_statement(buffer: &str) -> bool {
    let trimmed = buffer.trim();
    trimmed.is_empty()
        || trimmed.ends_with(';')
        || trimmed.ends_with("\\G")
        || trimmed.starts_with('\\')
        || matches!(SpecialCommand::parse(trimmed), Ok(Some(_)))
}

pub struct App {
    client: &'static Client,
    main: MainSettings,
    terminal: Terminal,
    executor: SqlExecutor,
    completer: Arc<RwLock<SqlCompleter>>,
    refresher: CompletionRefresher,
    query_history: Vec<String>,
}

impl App {
    pub fn new(
        client: &'static Client,
        main: MainSettings,
        terminal: Terminal,
        executor: SqlExecutor,
    ) -> Self {
        Self {
            client,
            main,
            terminal,
            executor,
            completer: Arc::new(RwLock::new(SqlCompleter::new())),
            refresher: CompletionRefresher::new(),
            query_history: Vec::new(),
        }
    }

    /// One-shot mode: results only, no status or timing.
    async fn run_execute(&mut self, arg: &str, table_format: TableFormat) -> Result<ExitCode> {
        let query = match read_execute_arg(arg) {
            Ok(query) => query,
            Err(e) => {
                self.terminal.print_error(&format!("{e:#}"))?;
                return Ok(ExitCode::from(1));
            }
        };
        self.executor.state.table_format = table_format;

        for result in self.executor.run(&query).await {
            match result {
                Ok(output) => {
                    if output.action == Some(Action::Quit) {
                        break;
                    }
                    if let Some(title) = &output.title {
                        self.terminal.print(title)?;
                    }
                    if let Some(headers) = &output.headers {
                        self.terminal.print(&render(
                            headers,
                            &output.rows,
                            table_format,
                            output.expanded,
                        ))?;
                    }
                }
                Err(e) => {
                    error!(error = %e, "Statement failed");
                    self.terminal.print_error(&e.to_string())?;
                    return Ok(ExitCode::from(1));
                }
            }
        }
        Ok(ExitCode::SUCCESS)
    }

    async fn run_cli(&mut self) -> Result<ExitCode> {
        let mut editor = self.build_editor()?;
        let history_path = self.main.history_file.as_deref().map(expand_home);
        if let Some(path) = &history_path {
            if let Err(e) = editor.load_history(path) {
                debug!(path = %path.display(), error = %e, "No history loaded");
            }
        }

        self.refresh_completions();
        if !self.main.less_chatty {
            self.terminal
                .print(&format!("{} {}", self.client.bin, env!("CARGO_PKG_VERSION")))?;
        }

        loop {
            let text = match self.read_statement(&mut editor)? {
                Some(text) => text,
                None => break,
            };
            if text.trim().is_empty() {
                continue;
            }
            let _ = editor.add_history_entry(text.trim());

            if self.main.destructive_warning
                && is_destructive(&text)
                && !self.terminal.confirm_destructive()?
            {
                self.terminal.print_status("Wise choice!")?;
                continue;
            }

            if self.run_interactive(&text).await? {
                break;
            }
        }

        if let Some(path) = &history_path {
            if let Some(parent) = path.parent() {
                let _ = fs::create_dir_all(parent);
            }
            if let Err(e) = editor.save_history(path) {
                warn!(path = %path.display(), error = %e, "Could not save history");
            }
        }
        if !self.main.less_chatty {
            self.terminal.print("Goodbye!")?;
        }
        Ok(ExitCode::SUCCESS)
    }

    fn build_editor(&self) -> Result<Editor<ReplHelper, DefaultHistory>> {
        let edit_mode = if self.main.key_bindings.eq_ignore_ascii_case("vi") {
            EditMode::Vi
        } else {
            EditMode::Emacs
        };
        let config = EditorConfig::builder()
            .edit_mode(edit_mode)
            .completion_type(CompletionType::List)
            .auto_add_history(false)
            .build();
        let mut editor = Editor::with_config(config)?;
        editor.set_helper(Some(
            ReplHelper::new(Arc::clone(&self.completer))
                .with_prompt_color(self.terminal.prompt_color()),
        ));
        Ok(editor)
    }

    fn prompt(&self) -> String {
        let template = self
            .main
            .prompt
            .as_deref()
            .unwrap_or(self.client.default_prompt);
        render_prompt(
            template,
            &self.executor.backend().prompt_context(),
            Local::now(),
        )
    }

    /// Read one statement. `None` means end of input.
    fn read_statement(
        &self,
        editor: &mut Editor<ReplHelper, DefaultHistory>,
    ) -> Result<Option<String>> {
        let prompt = self.prompt();
        let continuation = continuation_prompt(&self.main.prompt_continuation, &prompt);
        let mut buffer = String::new();

        loop {
            let current = if buffer.is_empty() { &prompt } else { &continuation };
            let line = tokio::task::block_in_place(|| editor.readline(current));
            match line {
                Ok(line) => {
                    if !buffer.is_empty() {
                        buffer.push('\n');
                    }
                    buffer.push_str(&line);
                    if !self.main.multi_line || ends_statement(&buffer) {
                        return Ok(Some(buffer));
                    }
                }
                // Ctrl-C drops the pending input.
                Err(ReadlineError::Interrupted) => return Ok(Some(String::new())),
                Err(ReadlineError::Eof) if !buffer.is_empty() => return Ok(Some(buffer)),
                Err(ReadlineError::Eof) => return Ok(None),
                Err(e) => return Err(e.into()),
            }
        }
    }

    /// Run and print every statement. Returns `true` when the user quit.
    async fn run_interactive(&mut self, text: &str) -> Result<bool> {
        self.query_history.push(text.to_string());
        for statement in split_statements(text) {
            let output = match self.executor.run_statement(&statement).await {
                Ok(output) => output,
                Err(e) => {
                    error!(error = %e, "Statement failed");
                    self.terminal.print_error(&e.to_string())?;
                    break;
                }
            };
            match &output.action {
                Some(Action::Quit) => return Ok(true),
                Some(Action::Rehash) => {
                    let msg = self.refresh_completions();
                    self.terminal.print_status(msg)?;
                    continue;
                }
                Some(Action::DatabaseChanged(db)) => {
                    debug!(database = %db, "Database changed, refreshing completions");
                    self.refresh_completions();
                }
                None => {}
            }
            self.print_output(&output)?;
        }
        Ok(false)
    }

    fn print_output(&self, output: &QueryOutput) -> Result<()> {
        if let Some(title) = &output.title {
            self.terminal.print(title)?;
        }
        if let Some(headers) = &output.headers {
            self.terminal.print(&render(
                headers,
                &output.rows,
                self.executor.state.table_format,
                output.expanded,
            ))?;
        }
        if let Some(status) = &output.status {
            self.terminal.print_status(status)?;
        }
        if self.executor.state.timing {
            self.terminal
                .print_status(&format!("Time: {:.3}s", output.elapsed.as_secs_f64()))?;
        }
        Ok(())
    }

    fn refresh_completions(&self) -> &'static str {
        let target = Arc::clone(&self.completer);
        let callback: RefreshCallback = Box::new(move |completer| match target.write() {
            Ok(mut current) => *current = completer,
            Err(poisoned) => *poisoned.into_inner() = completer,
        });
        self.refresher
            .refresh(self.executor.backend(), vec![callback])
    }

    pub fn query_history(&self) -> &[String] {
        &self.query_history
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn multi_line_terminators() {
        assert!(ends_statement("select 1;"));
        assert!(ends_statement("select *\nfrom t\\G"));
        assert!(ends_statement("\\dt"));
        assert!(ends_statement("quit"));
        assert!(ends_statement("   "));
        assert!(!ends_statement("select *\nfrom t"));
    }

    #[test]
    fn execute_arg_reads_files_or_passes_sql_through() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("q.sql");
        fs::write(&file, "select 1;\nselect 2;").unwrap();
        assert_eq!(
            read_execute_arg(file.to_str().unwrap()).unwrap(),
            "select 1;\nselect 2;"
        );
        assert_eq!(read_execute_arg("select 3").unwrap(), "select 3");
    }

    fn app() -> App {
        let backend = Arc::new(crate::testing::FakeBackend::new("sales"));
        App::new(
            &ATHENA_CLIENT,
            MainSettings::default(),
            Terminal::new(Colors::default()),
            SqlExecutor::new(backend, SessionState::default()),
        )
    }

    #[tokio::test]
    async fn interactive_run_stops_at_quit() {
        let mut app = app();
        assert!(!app.run_interactive("select 1;").await.unwrap());
        assert!(app.run_interactive("select 2; \\q").await.unwrap());
        assert_eq!(app.query_history(), ["select 1;", "select 2; \\q"]);
    }

    #[tokio::test]
    async fn interactive_errors_stop_the_batch() {
        let mut app = app();
        assert!(!app.run_interactive("fail now; \\q").await.unwrap());
    }

    #[tokio::test]
    async fn use_switches_database_and_refreshes() {
        let mut app = app();
        app.run_interactive("use ops").await.unwrap();
        assert_eq!(app.executor.database(), Some("ops"));
        assert_eq!(app.prompt(), "(none):ops> ");
    }

    #[test]
    fn redshift_main_section_applies_over_embedded_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let rc = dir.path().join("redshiftclirc");
        fs::write(&rc, "[main]\nhost = \"main-host\"\ndatabase = \"analytics\"\n").unwrap();

        let config = load_config(REDSHIFT_CLIENT.default_config, rc.to_str().unwrap());
        let resolved =
            dbcli_redshift::RedshiftConfig::resolve(&Default::default(), &config).unwrap();
        assert_eq!(resolved.host.as_deref(), Some("main-host"));
        assert_eq!(resolved.database, "analytics");
    }

    #[tokio::test]
    async fn one_shot_prints_results_before_a_failure() {
        let mut app = app();
        let code = app
            .run_execute("select 1; fail here; select 2", TableFormat::Csv)
            .await
            .unwrap();
        assert_eq!(code, ExitCode::from(1));
    }

    #[test]
    fn embedded_configs_parse() {
        for client in [&ATHENA_CLIENT, &REDSHIFT_CLIENT] {
            let config = dbcli_core::Config::parse(client.default_config).unwrap();
            let main = config.main();
            assert!(TableFormat::parse_name(&main.table_format).is_ok());
            assert!(main.prompt.is_some());
        }
    }
}
