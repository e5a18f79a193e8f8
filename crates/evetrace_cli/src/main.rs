//! evetrace CLI: generates SPI waveform traces of FT8xx display controller
//! traffic.
//!
//! Provides `evetrace generate` for writing the demonstration traces and
//! `evetrace list` for printing the command catalogues.

#![warn(missing_docs)]

mod generate;
mod list;
mod scenarios;

use std::process;

use clap::{Parser, Subcommand, ValueEnum};

/// evetrace, the FT8xx SPI waveform generator.
#[derive(Parser, Debug)]
#[command(name = "evetrace", version, about = "FT8xx SPI waveform generator")]
pub struct Cli {
    /// Suppress all output except errors.
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Enable verbose (debug-level) output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to a custom `evetrace.toml` configuration file.
    #[arg(long, global = true)]
    pub config: Option<String>,

    /// The subcommand to run.
    #[command(subcommand)]
    pub command: Command,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Write demonstration traces.
    Generate(GenerateArgs),
    /// Print a command catalogue.
    List(ListArgs),
}

/// Arguments for the `evetrace generate` subcommand.
#[derive(Parser, Debug)]
pub struct GenerateArgs {
    /// Scenarios to generate. All of them when omitted.
    #[arg(value_enum)]
    pub scenarios: Vec<Scenario>,

    /// Directory receiving the `.vcd` files.
    #[arg(short, long)]
    pub output_dir: Option<String>,

    /// Fixed `$date` header value, for reproducible traces.
    #[arg(long)]
    pub date: Option<String>,
}

/// Arguments for the `evetrace list` subcommand.
#[derive(Parser, Debug)]
pub struct ListArgs {
    /// Which catalogue to print.
    #[arg(value_enum)]
    pub catalogue: Catalogue,

    /// Output format.
    #[arg(short, long, value_enum, default_value_t = ReportFormat::Text)]
    pub format: ReportFormat,
}

/// A demonstration trace.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum Scenario {
    /// Every host command.
    HostCommands,
    /// Malformed host commands.
    HostErrors,
    /// Co-processor commands streamed into the command FIFO.
    Coproc,
    /// Every display-list command.
    DisplayList,
    /// Reads and writes of every register.
    Registers,
}

/// A command catalogue.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum Catalogue {
    /// Host commands.
    Host,
    /// Co-processor commands.
    Coproc,
    /// Display-list commands.
    DisplayList,
    /// Registers and their aliases.
    Registers,
}

/// Catalogue output format.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum ReportFormat {
    /// Human-readable terminal output.
    Text,
    /// Machine-readable JSON output.
    Json,
}

/// Global settings derived from CLI flags.
pub struct GlobalArgs {
    /// Whether to suppress non-error output.
    pub quiet: bool,
    /// Whether to print verbose/debug information.
    pub verbose: bool,
    /// Optional path to a custom config file.
    pub config: Option<String>,
}

impl GlobalArgs {
    /// Log level implied by `--quiet` and `--verbose`.
    fn log_level(&self) -> log::LevelFilter {
        if self.quiet {
            log::LevelFilter::Error
        } else if self.verbose {
            log::LevelFilter::Debug
        } else {
            log::LevelFilter::Warn
        }
    }
}

fn main() {
    let cli = Cli::parse();
    let global = GlobalArgs {
        quiet: cli.quiet,
        verbose: cli.verbose,
        config: cli.config,
    };

    // RUST_LOG, when set, overrides the flag-derived level
    env_logger::Builder::new()
        .filter_level(global.log_level())
        .parse_default_env()
        .init();

    let result = match cli.command {
        Command::Generate(ref args) => generate::run(args, &global),
        Command::List(ref args) => list::run(args),
    };

    match result {
        Ok(code) => process::exit(code),
        Err(e) => {
            eprintln!("error: {e}");
            process::exit(1);
        }
    }
}
