//! `evetrace generate`: write demonstration traces.
//!
//! Loads `evetrace.toml` (explicit `--config`, else the current directory,
//! else defaults), then plays each requested scenario into its own `.vcd`
//! file in the output directory.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use evetrace_config::EvetraceConfig;
use evetrace_sim::{SpiEngine, TraceHeader};

use crate::scenarios::Addresses;
use crate::{GenerateArgs, GlobalArgs, Scenario};

/// Runs the `evetrace generate` command.
///
/// Returns exit code 0 once every trace is written.
pub fn run(args: &GenerateArgs, global: &GlobalArgs) -> Result<i32, Box<dyn std::error::Error>> {
    let cwd = std::env::current_dir()?;
    let config = evetrace_config::discover_config(global.config.as_deref().map(Path::new), &cwd)?;

    let out_dir = args
        .output_dir
        .as_ref()
        .map_or_else(|| config.output.directory.clone(), PathBuf::from);
    let header = resolve_header(args.date.as_deref(), &config);
    let scenarios = if args.scenarios.is_empty() {
        Scenario::ALL.to_vec()
    } else {
        args.scenarios.clone()
    };

    let written = generate_all(&scenarios, &out_dir, &header, addresses(&config), global.quiet)?;
    if !global.quiet {
        eprintln!("   Wrote {} trace(s) to {}", written.len(), out_dir.display());
    }
    Ok(0)
}

/// `--date` wins over the configured date; otherwise the trace is stamped now.
fn resolve_header(date: Option<&str>, config: &EvetraceConfig) -> TraceHeader {
    match date.or(config.trace.date.as_deref()) {
        Some(date) => TraceHeader::with_date(date),
        None => TraceHeader::now(),
    }
}

fn addresses(config: &EvetraceConfig) -> Addresses {
    Addresses {
        coproc: config.coproc.write_address,
        display_list: config.display_list.write_address,
    }
}

/// Writes one trace per scenario into `dir`, creating it if needed.
///
/// Returns the paths written, in order.
pub fn generate_all(
    scenarios: &[Scenario],
    dir: &Path,
    header: &TraceHeader,
    addresses: Addresses,
    quiet: bool,
) -> Result<Vec<PathBuf>, Box<dyn std::error::Error>> {
    std::fs::create_dir_all(dir)?;
    let mut written = Vec::with_capacity(scenarios.len());
    for &scenario in scenarios {
        let path = dir.join(scenario.file_name());
        if !quiet {
            eprintln!("   Generating {}", path.display());
        }
        let file = File::create(&path)
            .map_err(|e| format!("cannot create {}: {e}", path.display()))?;
        let mut engine = SpiEngine::new(BufWriter::new(file), header)?;
        scenario.play(&mut engine, addresses)?;
        let end = engine.now();
        engine.finish()?.flush()?;
        log::info!("{} written, {} ticks", path.display(), end.ticks());
        written.push(path);
    }
    Ok(written)
}
