use thiserror::Error;

/// Errors surfaced through the [`DatabaseBackend`](crate::DatabaseBackend) seam.
#[derive(Error, Debug)]
pub enum BackendError {
    #[error("Not connected to database")]
    NotConnected,

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("{0}")]
    Query(String),

    #[error("Credential error: {0}")]
    Credentials(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Unsupported backend type: {name}. Supported types: {supported}")]
    UnsupportedBackend { name: String, supported: String },
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Unable to parse config file '{path}': {reason}")]
    Parse { path: String, reason: String },

    #[error("Invalid config: {0}")]
    Invalid(String),
}
