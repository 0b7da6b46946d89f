//! Config file handling shared by both clients.
//!
//! Each client ships an embedded default file and lets the user override it
//! with `~/.<client>/<client>rc`. Files are TOML; later files win on a
//! per-key basis (tables are merged recursively).

use std::collections::BTreeMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, error, warn};

use crate::error::ConfigError;

/// Load .env file (silently ignores if missing).
pub fn load_dotenv() {
    dotenvy::dotenv().ok();
}

pub fn env_opt(key: &str) -> Option<String> {
    env::var(key).ok().filter(|s| !s.is_empty())
}

/// First non-empty value among the given env vars.
pub fn first_env(keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|k| env_opt(k))
}

/// Expand a leading `~` to the user's home directory.
pub fn expand_home(path: &str) -> PathBuf {
    if path == "~" {
        return dirs::home_dir().unwrap_or_else(|| PathBuf::from(path));
    }
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    PathBuf::from(path)
}

// ── Settings values ─────────────────────────────────────────────

/// A loosely-typed config value.
///
/// Profile sections are hand-edited, so `result_reuse_enable = "yes"` and
/// `port = "5439"` must be accepted as readily as their typed forms.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Setting {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl Setting {
    pub fn as_text(&self) -> Option<String> {
        match self {
            Setting::Text(s) if s.is_empty() => None,
            Setting::Text(s) => Some(s.clone()),
            Setting::Int(i) => Some(i.to_string()),
            Setting::Float(f) => Some(f.to_string()),
            Setting::Bool(b) => Some(b.to_string()),
        }
    }

    pub fn as_bool(&self) -> bool {
        match self {
            Setting::Bool(b) => *b,
            Setting::Int(i) => *i != 0,
            Setting::Float(f) => *f != 0.0,
            Setting::Text(s) => matches!(s.to_lowercase().as_str(), "true" | "1" | "yes" | "on"),
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Setting::Int(i) => Some(*i),
            Setting::Text(s) => s.trim().parse().ok(),
            Setting::Float(f) if f.fract() == 0.0 => Some(*f as i64),
            _ => None,
        }
    }
}

impl From<&str> for Setting {
    fn from(s: &str) -> Self {
        Setting::Text(s.to_string())
    }
}

impl From<bool> for Setting {
    fn from(b: bool) -> Self {
        Setting::Bool(b)
    }
}

impl From<i64> for Setting {
    fn from(i: i64) -> Self {
        Setting::Int(i)
    }
}

/// Key/value pairs of a named section such as `[aws_profile.default]`.
pub type ProfileSection = BTreeMap<String, Setting>;

/// First present, non-empty value rendered as text.
pub fn get_val(vals: &[Option<&Setting>]) -> Option<String> {
    vals.iter().flatten().find_map(|v| v.as_text())
}

/// First present value interpreted as a boolean; `false` when none is present.
pub fn get_bool(vals: &[Option<&Setting>]) -> bool {
    vals.iter().flatten().next().map(|v| v.as_bool()).unwrap_or(false)
}

/// First value that parses as an integer, else `default`.
pub fn get_int(vals: &[Option<&Setting>], default: i64) -> i64 {
    vals.iter()
        .flatten()
        .find_map(|v| v.as_int())
        .unwrap_or(default)
}

// ── [main] and [colors] ─────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MainSettings {
    #[serde(default)]
    pub log_file: String,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default = "default_true")]
    pub timing: bool,
    #[serde(default)]
    pub multi_line: bool,
    #[serde(default = "default_key_bindings")]
    pub key_bindings: String,
    #[serde(default)]
    pub prompt: Option<String>,
    #[serde(default = "default_prompt_continuation")]
    pub prompt_continuation: String,
    #[serde(default = "default_true")]
    pub destructive_warning: bool,
    #[serde(default = "default_table_format")]
    pub table_format: String,
    #[serde(default)]
    pub history_file: Option<String>,
    #[serde(default)]
    pub less_chatty: bool,
}

fn default_log_level() -> String {
    "INFO".to_string()
}

fn default_true() -> bool {
    true
}

fn default_key_bindings() -> String {
    "emacs".to_string()
}

fn default_prompt_continuation() -> String {
    "-> ".to_string()
}

fn default_table_format() -> String {
    "ascii".to_string()
}

impl Default for MainSettings {
    fn default() -> Self {
        Self {
            log_file: String::new(),
            log_level: default_log_level(),
            timing: true,
            multi_line: false,
            key_bindings: default_key_bindings(),
            prompt: None,
            prompt_continuation: default_prompt_continuation(),
            destructive_warning: true,
            table_format: default_table_format(),
            history_file: None,
            less_chatty: false,
        }
    }
}

/// Colour names understood by crossterm ("red", "dark_grey", ...).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColorSettings {
    #[serde(default = "default_prompt_color")]
    pub prompt: String,
    #[serde(default = "default_error_color")]
    pub error: String,
    #[serde(default = "default_status_color")]
    pub status: String,
}

fn default_prompt_color() -> String {
    "green".to_string()
}

fn default_error_color() -> String {
    "red".to_string()
}

fn default_status_color() -> String {
    "dark_grey".to_string()
}

impl Default for ColorSettings {
    fn default() -> Self {
        Self {
            prompt: default_prompt_color(),
            error: default_error_color(),
            status: default_status_color(),
        }
    }
}

// ── Config ──────────────────────────────────────────────────────

/// Merged view over one or more config files.
#[derive(Debug, Clone, Default)]
pub struct Config {
    table: toml::Table,
    /// Last file that contributed to this config.
    pub filename: Option<PathBuf>,
}

impl Config {
    pub fn parse(contents: &str) -> Result<Self, ConfigError> {
        let table: toml::Table = contents.parse().map_err(|e: toml::de::Error| {
            ConfigError::Parse {
                path: "<inline>".to_string(),
                reason: e.message().to_string(),
            }
        })?;
        Ok(Self {
            table,
            filename: None,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    /// Overlay `other` onto `self`; values in `other` win.
    pub fn merge(&mut self, other: Config) {
        merge_tables(&mut self.table, other.table);
        if other.filename.is_some() {
            self.filename = other.filename;
        }
    }

    pub fn main(&self) -> MainSettings {
        self.typed_section("main")
    }

    pub fn colors(&self) -> ColorSettings {
        self.typed_section("colors")
    }

    /// A top-level section such as `[main]`, read as loose key/value pairs.
    pub fn section(&self, name: &str) -> Option<ProfileSection> {
        let value = self.table.get(name)?;
        section_from_value(name, value)
    }

    /// A named profile such as `[aws_profile.default]`.
    pub fn profile(&self, kind: &str, name: &str) -> Option<ProfileSection> {
        let value = self.table.get(kind)?.as_table()?.get(name)?;
        section_from_value(&format!("{kind}.{name}"), value)
    }

    fn typed_section<T: Default + for<'de> Deserialize<'de>>(&self, name: &str) -> T {
        match self.table.get(name) {
            Some(value) => value.clone().try_into().unwrap_or_else(|e| {
                warn!(section = %name, error = %e, "Invalid config section, using defaults");
                T::default()
            }),
            None => T::default(),
        }
    }
}

fn section_from_value(name: &str, value: &toml::Value) -> Option<ProfileSection> {
    match value.clone().try_into::<ProfileSection>() {
        Ok(section) => Some(section),
        Err(e) => {
            warn!(section = %name, error = %e, "Ignoring malformed config section");
            None
        }
    }
}

fn merge_tables(base: &mut toml::Table, overlay: toml::Table) {
    for (key, value) in overlay {
        match (base.get_mut(&key), value) {
            (Some(toml::Value::Table(existing)), toml::Value::Table(incoming)) => {
                merge_tables(existing, incoming);
            }
            (_, value) => {
                base.insert(key, value);
            }
        }
    }
}

/// Read a single config file. Unreadable or malformed files are logged and
/// yield `None` so the caller can fall back to the remaining files.
pub fn read_config_file(path: &str) -> Option<Config> {
    let expanded = expand_home(path);
    let contents = match fs::read_to_string(&expanded) {
        Ok(c) => c,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!(path = %expanded.display(), "Config file not found");
            return None;
        }
        Err(e) => {
            warn!(
                path = %expanded.display(),
                error = %e,
                "You don't have permission to read config file"
            );
            return None;
        }
    };
    match Config::parse(&contents) {
        Ok(mut config) => {
            config.filename = Some(expanded);
            Some(config)
        }
        Err(e) => {
            let err = match e {
                ConfigError::Parse { reason, .. } => ConfigError::Parse {
                    path: expanded.display().to_string(),
                    reason,
                },
                other => other,
            };
            error!("{}", err);
            error!("Using successfully parsed config values.");
            None
        }
    }
}

/// Read and merge config files in order.
pub fn read_config_files(files: &[&str]) -> Config {
    let mut config = Config::default();
    for file in files {
        if let Some(cfg) = read_config_file(file) {
            if !cfg.is_empty() {
                config.merge(cfg);
            }
        }
    }
    config
}

/// Build the effective config: the embedded defaults overlaid with the
/// user's file, if any.
pub fn load_config(default_contents: &str, user_file: &str) -> Config {
    let mut config = match Config::parse(default_contents) {
        Ok(cfg) => cfg,
        Err(e) => {
            error!(error = %e, "Embedded default config is invalid");
            Config::default()
        }
    };
    if let Some(user) = read_config_file(user_file) {
        config.merge(user);
    }
    config
}

/// Write the embedded default config to `destination` unless a file is
/// already there (or `overwrite` is set).
pub fn write_default_config(
    contents: &str,
    destination: &str,
    overwrite: bool,
) -> Result<PathBuf, ConfigError> {
    let dest = expand_home(destination);
    if let Some(parent) = dest.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    if !overwrite && dest.exists() {
        return Ok(dest);
    }
    fs::write(&dest, contents)?;
    debug!(path = %dest.display(), "Wrote default config");
    Ok(dest)
}

pub fn path_exists(path: &str) -> bool {
    Path::new(&expand_home(path)).exists()
}

// ── Tests ────────────────────────────────────────────────────────
