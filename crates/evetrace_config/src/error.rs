//! Error types for configuration loading and validation.

use std::path::PathBuf;

/// Errors that can occur when loading or validating an `evetrace.toml` configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("failed to read {}: {source}", path.display())]
    Read {
        /// File that was being read.
        path: PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: std::io::Error,
    },

    /// The TOML content could not be parsed into the configuration schema.
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),

    /// A write address lies beyond the 22-bit device memory space.
    #[error("{key} = {address:#x} is outside the 22-bit address space (max {max:#x})")]
    AddressOutOfRange {
        /// Dotted key of the offending setting.
        key: &'static str,
        /// Configured address.
        address: u32,
        /// Highest valid address.
        max: u32,
    },

    /// A path setting is empty.
    #[error("{0} must not be empty")]
    EmptyPath(&'static str),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_address_out_of_range() {
        let err = ConfigError::AddressOutOfRange {
            key: "coproc.write_address",
            address: 0x40_0000,
            max: 0x3F_FFFF,
        };
        assert_eq!(
            format!("{err}"),
            "coproc.write_address = 0x400000 is outside the 22-bit address space (max 0x3fffff)"
        );
    }

    #[test]
    fn display_empty_path() {
        let err = ConfigError::EmptyPath("output.directory");
        assert_eq!(format!("{err}"), "output.directory must not be empty");
    }

    #[test]
    fn display_read_error_names_file() {
        let err = ConfigError::Read {
            path: PathBuf::from("conf/evetrace.toml"),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "file not found"),
        };
        assert_eq!(format!("{err}"), "failed to read conf/evetrace.toml: file not found");
    }

    #[test]
    fn parse_error_from_toml() {
        let toml_err = toml::from_str::<toml::Table>("key = ").unwrap_err();
        let err = ConfigError::from(toml_err);
        assert!(format!("{err}").starts_with("failed to parse configuration:"));
    }
}
