//! Parsing and validation of `evetrace.toml` configuration files.
//!
//! This crate reads the optional configuration file and produces a
//! strongly-typed [`EvetraceConfig`]. Every section is optional.

#![warn(missing_docs)]

pub mod error;
pub mod loader;
pub mod types;

pub use error::ConfigError;
pub use loader::{discover_config, load_config, load_config_from_str, CONFIG_FILE_NAME};
pub use types::*;
