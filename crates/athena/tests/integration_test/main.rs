//! Integration tests for dbcli-athena.
//!
//! Everything here runs offline. Tests marked with `#[ignore]` talk to AWS
//! and must be run explicitly.

mod backend;
mod config;
