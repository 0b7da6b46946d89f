pub mod backend;
pub mod config;
pub mod error;
pub mod status;

pub use backend::{Column, DatabaseBackend, PromptContext, QueryStats, ResultSet};
pub use config::{Config, MainSettings, ProfileSection, Setting};
pub use error::*;
pub use status::{format_status, humanize_size, rows_status};
