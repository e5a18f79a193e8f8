//! Configuration file loading and validation.

use crate::error::ConfigError;
use crate::types::EvetraceConfig;
use evetrace_sim::spi::ADDRESS_MAX;
use std::path::Path;

/// File name looked up in the working directory.
pub const CONFIG_FILE_NAME: &str = "evetrace.toml";

/// Loads and validates a configuration file.
pub fn load_config(path: &Path) -> Result<EvetraceConfig, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    load_config_from_str(&content)
}

/// Parses and validates an `evetrace.toml` configuration from a string.
///
/// Useful for testing without filesystem dependencies.
pub fn load_config_from_str(content: &str) -> Result<EvetraceConfig, ConfigError> {
    let config: EvetraceConfig = toml::from_str(content)?;
    validate_config(&config)?;
    Ok(config)
}

/// Loads `explicit` if given, else `<dir>/evetrace.toml` if it exists, else
/// the defaults.
pub fn discover_config(explicit: Option<&Path>, dir: &Path) -> Result<EvetraceConfig, ConfigError> {
    if let Some(path) = explicit {
        return load_config(path);
    }
    let candidate = dir.join(CONFIG_FILE_NAME);
    if candidate.is_file() {
        load_config(&candidate)
    } else {
        Ok(EvetraceConfig::default())
    }
}

/// Validates that addresses fit the device memory map and paths are usable.
fn validate_config(config: &EvetraceConfig) -> Result<(), ConfigError> {
    if config.output.directory.as_os_str().is_empty() {
        return Err(ConfigError::EmptyPath("output.directory"));
    }
    for (key, address) in [
        ("coproc.write_address", config.coproc.write_address),
        ("display_list.write_address", config.display_list.write_address),
    ] {
        if address > ADDRESS_MAX {
            return Err(ConfigError::AddressOutOfRange {
                key,
                address,
                max: ADDRESS_MAX,
            });
        }
    }
    Ok(())
}
