//! `evetrace list`: print a command catalogue.

use std::io::{self, Write};

use evetrace_commands::{
    Field, COPROC_COMMANDS, DISPLAY_LIST_COMMANDS, HOST_COMMANDS, REGISTERS, REGISTER_ALIASES,
};
use evetrace_common::BitRange;
use serde_json::json;

use crate::{Catalogue, ListArgs, ReportFormat};

/// Runs the `evetrace list` command, printing to stdout.
pub fn run(args: &ListArgs) -> Result<i32, Box<dyn std::error::Error>> {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    write_catalogue(&mut out, args.catalogue, args.format)?;
    out.flush()?;
    Ok(0)
}

/// Writes `catalogue` to `out` in `format`.
pub fn write_catalogue(out: &mut impl Write, catalogue: Catalogue, format: ReportFormat) -> io::Result<()> {
    match format {
        ReportFormat::Text => write_text(out, catalogue),
        ReportFormat::Json => {
            let value = match catalogue {
                Catalogue::Host => serde_json::to_value(HOST_COMMANDS),
                Catalogue::Coproc => serde_json::to_value(COPROC_COMMANDS),
                Catalogue::DisplayList => serde_json::to_value(DISPLAY_LIST_COMMANDS),
                Catalogue::Registers => Ok(json!({
                    "registers": REGISTERS,
                    "aliases": REGISTER_ALIASES
                        .iter()
                        .map(|(alias, target)| json!({ "alias": alias, "register": target }))
                        .collect::<Vec<_>>(),
                })),
            }
            .map_err(io::Error::other)?;
            let text = serde_json::to_string_pretty(&value).map_err(io::Error::other)?;
            writeln!(out, "{text}")
        }
    }
}

fn bits(range: BitRange) -> String {
    if range.msb == range.lsb {
        format!("[{}]", range.msb)
    } else {
        format!("[{}:{}]", range.msb, range.lsb)
    }
}

fn fields(fields: &[Field]) -> String {
    fields
        .iter()
        .map(|f| format!("{}{}", f.name, bits(f.range)))
        .collect::<Vec<_>>()
        .join(" ")
}

fn write_text(out: &mut impl Write, catalogue: Catalogue) -> io::Result<()> {
    match catalogue {
        Catalogue::Host => {
            for c in HOST_COMMANDS {
                writeln!(out, "{:<14} {:#04x}  {}", c.name, c.opcode, fields(c.fields))?;
            }
        }
        Catalogue::Coproc => {
            for c in COPROC_COMMANDS {
                let params: Vec<String> = c
                    .params
                    .iter()
                    .map(|p| format!("{}:{}", p.name, p.kind.label()))
                    .collect();
                writeln!(out, "{:<20} {:#010x}  {}", c.name, c.opcode, params.join(" "))?;
            }
        }
        Catalogue::DisplayList => {
            for c in DISPLAY_LIST_COMMANDS {
                writeln!(
                    out,
                    "{:<20} {:#04x}{}  {}",
                    c.name,
                    c.opcode,
                    bits(c.opcode_bits),
                    fields(c.fields)
                )?;
            }
        }
        Catalogue::Registers => {
            for r in REGISTERS {
                writeln!(
                    out,
                    "{:<24} {:#08x}  {:>3} bits  {}  reset {:#x}",
                    r.name,
                    r.address,
                    r.bits,
                    r.access.label(),
                    r.reset
                )?;
            }
            for (alias, target) in REGISTER_ALIASES {
                writeln!(out, "{alias:<24} -> {target}")?;
            }
        }
    }
    Ok(())
}
