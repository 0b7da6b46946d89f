//! Amazon Redshift backend for `redshiftcli`.

pub mod backend;
pub mod config;
pub mod error;

pub use backend::{cluster_identifier, RedshiftBackend};
pub use config::{RedshiftArgs, RedshiftConfig};
pub use error::RedshiftError;
