//! AWS Athena backend for `athenacli`.

pub mod backend;
pub mod client;
pub mod config;

pub use backend::AthenaBackend;
pub use client::{AthenaClient, AthenaError, ExecutionTarget};
pub use config::{split_catalog, AwsArgs, AwsConfig, DEFAULT_CATALOG};
