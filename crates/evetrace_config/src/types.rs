//! Configuration types deserialized from `evetrace.toml`.

use serde::Deserialize;
use std::path::PathBuf;

/// Start of the co-processor command FIFO (`RAM_CMD`).
pub const RAM_CMD: u32 = *evetrace_sim::spi::COMMAND_FIFO.start();
/// Start of display-list memory (`RAM_DL`).
pub const RAM_DL: u32 = 0x30_0000;

/// The top-level configuration parsed from `evetrace.toml`.
#[derive(Debug, Default, Deserialize)]
pub struct EvetraceConfig {
    /// Trace header settings.
    #[serde(default)]
    pub trace: TraceConfig,
    /// Where generated traces are written.
    #[serde(default)]
    pub output: OutputConfig,
    /// Co-processor scenario settings.
    #[serde(default)]
    pub coproc: CoprocConfig,
    /// Display-list scenario settings.
    #[serde(default)]
    pub display_list: DisplayListConfig,
}

/// Trace header settings.
#[derive(Debug, Default, Deserialize)]
pub struct TraceConfig {
    /// Fixed `$date` value. The current time is used when absent.
    #[serde(default)]
    pub date: Option<String>,
}

/// Output settings.
#[derive(Debug, Deserialize)]
pub struct OutputConfig {
    /// Directory receiving the generated `.vcd` files.
    #[serde(default = "default_directory")]
    pub directory: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: default_directory(),
        }
    }
}

fn default_directory() -> PathBuf {
    PathBuf::from(".")
}

/// Co-processor scenario settings.
#[derive(Debug, Deserialize)]
pub struct CoprocConfig {
    /// Address the command stream is written to.
    #[serde(default = "default_coproc_address")]
    pub write_address: u32,
}

impl Default for CoprocConfig {
    fn default() -> Self {
        Self {
            write_address: RAM_CMD,
        }
    }
}

fn default_coproc_address() -> u32 {
    RAM_CMD
}

/// Display-list scenario settings.
#[derive(Debug, Deserialize)]
pub struct DisplayListConfig {
    /// Address the display list is written to.
    #[serde(default = "default_display_list_address")]
    pub write_address: u32,
}

impl Default for DisplayListConfig {
    fn default() -> Self {
        Self {
            write_address: RAM_DL,
        }
    }
}

fn default_display_list_address() -> u32 {
    RAM_DL
}
