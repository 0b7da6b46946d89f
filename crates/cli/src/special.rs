//! Backslash and keyword commands handled by the client itself.

use crate::format::TableFormat;

/// Commands that never reach the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpecialCommand {
    Help,
    Quit,
    ListDatabases,
    ListTables(Option<String>),
    UseDatabase(String),
    TableFormat(Option<String>),
    Timing,
    Expanded,
    Rehash,
    OutputLocation,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CommandError {
    #[error("Unknown command: {0}. Type \\? for help.")]
    Unknown(String),

    #[error("{0}")]
    Usage(String),
}

/// `(command, shortcut, description)` rows for `\?`.
pub const COMMANDS: &[(&str, &str, &str)] = &[
    ("help", "\\?", "Show this help."),
    ("quit", "\\q", "Quit."),
    ("exit", "\\q", "Quit."),
    ("show databases", "\\l", "List databases."),
    ("\\dt", "\\dt [pattern]", "List tables, optionally filtered by pattern."),
    ("use", "\\u <database>", "Change to a new database."),
    ("tableformat", "\\T [format]", "Show or change the table format."),
    ("\\timing", "\\t", "Toggle timing of commands."),
    ("\\x", "\\x", "Toggle expanded output."),
    ("rehash", "\\#", "Refresh auto-completions."),
    ("output_location", "\\o", "Show the output location of the last query."),
];

/// Names offered by the completer.
pub fn command_names() -> Vec<String> {
    let mut names: Vec<String> = COMMANDS
        .iter()
        .flat_map(|&(name, shortcut, _)| {
            let shortcut = shortcut.split_whitespace().next().unwrap_or(shortcut);
            [name.to_string(), shortcut.to_string()]
        })
        .collect();
    names.sort();
    names.dedup();
    names
}

impl SpecialCommand {
    /// `Ok(None)` means the text is ordinary SQL.
    pub fn parse(sql: &str) -> Result<Option<Self>, CommandError> {
        let trimmed = sql.trim();
        let (head, rest) = match trimmed.split_once(char::is_whitespace) {
            Some((head, rest)) => (head, rest.trim()),
            None => (trimmed, ""),
        };
        let arg = (!rest.is_empty()).then(|| rest.to_string());

        if head.starts_with('\\') {
            // Backslash shortcuts are case-sensitive: \t and \T differ.
            let command = match head {
                "\\?" => Self::Help,
                "\\q" => Self::Quit,
                "\\l" => Self::ListDatabases,
                "\\dt" => Self::ListTables(arg),
                "\\u" => Self::UseDatabase(required(arg, "\\u <database>")?),
                "\\T" => Self::TableFormat(arg),
                "\\timing" | "\\t" => Self::Timing,
                "\\x" => Self::Expanded,
                "\\#" => Self::Rehash,
                "\\o" => Self::OutputLocation,
                other => return Err(CommandError::Unknown(other.to_string())),
            };
            return Ok(Some(command));
        }

        let lower = trimmed.to_lowercase();
        let words: Vec<&str> = lower.split_whitespace().collect();
        let command = match words.as_slice() {
            ["help"] => Self::Help,
            ["quit"] | ["exit"] => Self::Quit,
            ["show", "databases"] => Self::ListDatabases,
            ["use", ..] => Self::UseDatabase(required(arg, "use <database>")?),
            ["tableformat", ..] => Self::TableFormat(arg),
            ["rehash"] => Self::Rehash,
            ["output_location"] => Self::OutputLocation,
            _ => return Ok(None),
        };
        Ok(Some(command))
    }
}

fn required(arg: Option<String>, usage: &str) -> Result<String, CommandError> {
    arg.map(|a| a.trim_matches(|c| c == '`' || c == '"').to_string())
        .filter(|a| !a.is_empty())
        .ok_or_else(|| CommandError::Usage(format!("Usage: {usage}")))
}

/// Client-side toggles that special commands flip.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionState {
    pub timing: bool,
    pub expanded: bool,
    pub table_format: TableFormat,
    pub output_location: Option<String>,
}

impl Default for SessionState {
    fn default() -> Self {
        Self {
            timing: true,
            expanded: false,
            table_format: TableFormat::Ascii,
            output_location: None,
        }
    }
}
