//! Prefix completion over keywords and database metadata.

use std::borrow::Cow;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::{Arc, RwLock};

use crossterm::style::{Color, Stylize};
use rustyline::completion::{Completer, Pair};
use rustyline::highlight::Highlighter;
use rustyline::hint::Hinter;
use rustyline::validate::Validator;
use rustyline::{Context, Helper};

pub const KEYWORDS: &[&str] = &[
    "ALL", "ALTER", "AND", "ARRAY", "AS", "ASC", "BETWEEN", "BIGINT", "BOOLEAN", "BY", "CASE",
    "CAST", "CHAR", "COLUMN", "COLUMNS", "COUNT", "CREATE", "CROSS", "CURRENT_DATE",
    "CURRENT_TIMESTAMP", "DATABASE", "DATABASES", "DATE", "DECIMAL", "DELETE", "DESC",
    "DESCRIBE", "DISTINCT", "DOUBLE", "DROP", "ELSE", "END", "EXCEPT", "EXISTS", "EXPLAIN",
    "EXTERNAL", "FALSE", "FROM", "FULL", "GROUP", "HAVING", "IF", "IN", "INNER", "INSERT", "INT",
    "INTEGER", "INTERSECT", "INTERVAL", "INTO", "IS", "JOIN", "LEFT", "LIKE", "LIMIT", "LOCATION",
    "MAP", "MSCK", "NOT", "NULL", "OFFSET", "ON", "OR", "ORDER", "OUTER", "OVER", "OVERWRITE",
    "PARTITION", "PARTITIONED", "REPAIR", "REPLACE", "RIGHT", "ROW", "SCHEMA", "SCHEMAS",
    "SELECT", "SET", "SHOW", "SMALLINT", "STRING", "STRUCT", "TABLE", "TABLES", "TBLPROPERTIES",
    "THEN", "TIMESTAMP", "TINYINT", "TRUE", "TRUNCATE", "UNION", "UNNEST", "UPDATE", "USE",
    "USING", "VALUES", "VARCHAR", "VIEW", "VIEWS", "WHEN", "WHERE", "WITH",
];

#[derive(Debug, Clone)]
pub struct SqlCompleter {
    keywords: Vec<String>,
    databases: Vec<String>,
    schemata: Vec<String>,
    dbname: String,
    /// database -> relation -> columns (`*` first).
    relations: HashMap<String, BTreeMap<String, Vec<String>>>,
    special_commands: Vec<String>,
    all_completions: BTreeSet<String>,
}

impl Default for SqlCompleter {
    fn default() -> Self {
        Self::new()
    }
}

impl SqlCompleter {
    pub fn new() -> Self {
        let keywords: Vec<String> = KEYWORDS.iter().map(|k| k.to_string()).collect();
        Self {
            all_completions: keywords.iter().cloned().collect(),
            keywords,
            databases: Vec::new(),
            schemata: Vec::new(),
            dbname: String::new(),
            relations: HashMap::new(),
            special_commands: Vec::new(),
        }
    }

    /// Backtick-quote names that would not survive unquoted.
    pub fn escape_name(&self, name: &str) -> String {
        let plain = name
            .chars()
            .next()
            .is_some_and(|c| c.is_ascii_lowercase() || c == '_')
            && name
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_' || c == '$');
        let upper = name.to_uppercase();
        if !plain || self.keywords.iter().any(|k| *k == upper) {
            format!("`{name}`")
        } else {
            name.to_string()
        }
    }

    pub fn extend_database_names(&mut self, names: impl IntoIterator<Item = String>) {
        for name in names {
            self.all_completions.insert(name.clone());
            self.databases.push(name);
        }
    }

    pub fn extend_schemata(&mut self, schema: Option<&str>) {
        let Some(schema) = schema else { return };
        let schema = self.escape_name(schema);
        self.relations.entry(schema.clone()).or_default();
        self.all_completions.insert(schema.clone());
        self.schemata.push(schema);
    }

    pub fn set_dbname(&mut self, dbname: Option<&str>) {
        self.dbname = dbname.map(|d| self.escape_name(d)).unwrap_or_default();
    }

    /// Add relation names, escaping them when `escape` is set.
    pub fn extend_relations(&mut self, names: impl IntoIterator<Item = String>, escape: bool) {
        let names: Vec<String> = names
            .into_iter()
            .map(|n| if escape { self.escape_name(&n) } else { n })
            .collect();
        let db = self.relations.entry(self.dbname.clone()).or_default();
        for name in names {
            db.insert(name.clone(), vec!["*".to_string()]);
            self.all_completions.insert(name);
        }
    }

    /// Add `(relation, column)` pairs for relations already known.
    pub fn extend_columns(
        &mut self,
        columns: impl IntoIterator<Item = (String, String)>,
        escape: bool,
    ) {
        let columns: Vec<(String, String)> = columns
            .into_iter()
            .map(|(rel, col)| {
                if escape {
                    (self.escape_name(&rel), self.escape_name(&col))
                } else {
                    (rel, col)
                }
            })
            .collect();
        let db = self.relations.entry(self.dbname.clone()).or_default();
        for (rel, col) in columns {
            if let Some(cols) = db.get_mut(&rel) {
                cols.push(col.clone());
            }
            self.all_completions.insert(col);
        }
    }

    pub fn extend_special_commands(&mut self, names: impl IntoIterator<Item = String>) {
        for name in names {
            self.all_completions.insert(name.clone());
            self.special_commands.push(name);
        }
    }

    pub fn databases(&self) -> &[String] {
        &self.databases
    }

    pub fn schemata(&self) -> &[String] {
        &self.schemata
    }

    pub fn special_commands(&self) -> &[String] {
        &self.special_commands
    }

    pub fn columns(&self, relation: &str) -> Option<&[String]> {
        self.relations
            .get(&self.dbname)
            .and_then(|db| db.get(relation))
            .map(Vec::as_slice)
    }

    /// Sorted, de-duplicated candidates starting with `word` (any case).
    pub fn completions(&self, word: &str) -> Vec<String> {
        let needle = word.to_lowercase();
        // BTreeSet keeps them sorted and unique.
        self.all_completions
            .iter()
            .filter(|c| c.to_lowercase().starts_with(&needle))
            .cloned()
            .collect()
    }
}

/// Start of the word that ends at `pos`.
pub fn word_start(line: &str, pos: usize) -> usize {
    line[..pos]
        .char_indices()
        .rev()
        .take_while(|(_, c)| {
            c.is_alphanumeric() || matches!(*c, '_' | '.' | '\\' | '`' | '$' | '#' | '?')
        })
        .last()
        .map(|(i, _)| i)
        .unwrap_or(pos)
}

/// rustyline glue; the completer is swapped wholesale after a refresh.
pub struct ReplHelper {
    completer: Arc<RwLock<SqlCompleter>>,
    prompt_color: Option<Color>,
}

impl ReplHelper {
    pub fn new(completer: Arc<RwLock<SqlCompleter>>) -> Self {
        Self {
            completer,
            prompt_color: None,
        }
    }

    pub fn with_prompt_color(mut self, color: Option<Color>) -> Self {
        self.prompt_color = color;
        self
    }
}

impl Completer for ReplHelper {
    type Candidate = Pair;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &Context<'_>,
    ) -> rustyline::Result<(usize, Vec<Pair>)> {
        let start = word_start(line, pos);
        let word = &line[start..pos];
        if word.is_empty() {
            return Ok((pos, Vec::new()));
        }
        let candidates = match self.completer.read() {
            Ok(completer) => completer.completions(word),
            Err(poisoned) => poisoned.into_inner().completions(word),
        };
        Ok((
            start,
            candidates
                .into_iter()
                .map(|c| Pair {
                    display: c.clone(),
                    replacement: c,
                })
                .collect(),
        ))
    }
}

impl Hinter for ReplHelper {
    type Hint = String;
}

impl Highlighter for ReplHelper {
    fn highlight_prompt<'b, 's: 'b, 'p: 'b>(
        &'s self,
        prompt: &'p str,
        _default: bool,
    ) -> Cow<'b, str> {
        match self.prompt_color {
            Some(color) => Cow::Owned(prompt.with(color).to_string()),
            None => Cow::Borrowed(prompt),
        }
    }
}

impl Validator for ReplHelper {}

impl Helper for ReplHelper {}
