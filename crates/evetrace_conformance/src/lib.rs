//! Conformance test helpers for evetrace.
//!
//! Reads generated VCD text back into a structured [`Trace`] and decodes the
//! SPI traffic it carries: each chip-select-low window becomes a [`Frame`]
//! of MOSI/MISO bytes sampled on rising clock edges, and frames that open
//! with the device's address echo decode further into [`MemoryAccess`]es.

#![warn(missing_docs)]

use std::collections::HashMap;

use evetrace_common::{to_bytes, ByteOrder, Level};
use evetrace_sim::spi::{ADDRESS_ECHO, WRITE_FLAG};
use evetrace_sim::{AccessMode, SpiEngine, TraceHeader};

/// Errors found while reading trace text.
#[derive(Debug, thiserror::Error)]
pub enum ReadError {
    /// A header section is missing or malformed.
    #[error("line {line}: malformed header: {text}")]
    Header {
        /// 1-based line number.
        line: usize,
        /// Offending line.
        text: String,
    },
    /// A value change refers to an undeclared symbol or has a bad level.
    #[error("line {line}: bad value change `{token}`")]
    Change {
        /// 1-based line number.
        line: usize,
        /// Offending token.
        token: String,
    },
    /// A timestamp does not parse or is not strictly increasing.
    #[error("line {line}: bad timestamp `{text}`")]
    Timestamp {
        /// 1-based line number.
        line: usize,
        /// Offending line.
        text: String,
    },
    /// Something follows the end marker.
    #[error("line {line}: data after the end marker")]
    AfterEnd {
        /// 1-based line number.
        line: usize,
    },
    /// One of the four SPI wires is not declared.
    #[error("signal {0} not declared")]
    MissingSignal(&'static str),
}

/// A declared signal.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Var {
    /// One-character identifier used in value changes.
    pub symbol: char,
    /// Signal name.
    pub name: String,
}

/// One `#<time> <changes>` line.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Record {
    /// Timestamp in ticks.
    pub time: u64,
    /// Changes in the order written.
    pub changes: Vec<(char, Level)>,
}

/// A parsed trace.
#[derive(Clone, Debug, Default)]
pub struct Trace {
    /// Contents of `$date`.
    pub date: String,
    /// Contents of `$timescale`.
    pub timescale: String,
    /// Name of the module scope.
    pub scope: String,
    /// Declared signals, in order.
    pub vars: Vec<Var>,
    /// Value-change records.
    pub records: Vec<Record>,
    /// Timestamp of the closing bare marker, if present.
    pub end: Option<u64>,
}

/// Bytes exchanged during one chip-select-low window.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Frame {
    /// Time chip-select went low.
    pub start: u64,
    /// Time chip-select went high again.
    pub end: u64,
    /// Bytes sent by the host.
    pub mosi: Vec<u8>,
    /// Bytes sent by the device.
    pub miso: Vec<u8>,
}

/// A decoded memory transaction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MemoryAccess {
    /// Direction.
    pub mode: AccessMode,
    /// Start address.
    pub address: u32,
    /// Data-phase bytes on MOSI.
    pub mosi: Vec<u8>,
    /// Data-phase bytes on MISO.
    pub miso: Vec<u8>,
}

fn section<'a>(line: &'a str, keyword: &str) -> Option<&'a str> {
    line.strip_prefix(keyword)?.strip_suffix("$end").map(str::trim)
}

/// Parses VCD text as written by the recorder.
pub fn parse_trace(text: &str) -> Result<Trace, ReadError> {
    let mut trace = Trace::default();
    let mut lines = text.lines().enumerate().map(|(i, l)| (i + 1, l.trim()));

    for (line, text) in lines.by_ref() {
        let header = || ReadError::Header { line, text: text.to_string() };
        if text == "$enddefinitions $end" {
            break;
        } else if let Some(date) = section(text, "$date") {
            trace.date = date.to_string();
        } else if let Some(ts) = section(text, "$timescale") {
            trace.timescale = ts.to_string();
        } else if let Some(scope) = section(text, "$scope module") {
            trace.scope = scope.to_string();
        } else if let Some(var) = section(text, "$var") {
            let parts: Vec<&str> = var.split_whitespace().collect();
            let [_, "1", symbol, name] = parts.as_slice() else {
                return Err(header());
            };
            let mut chars = symbol.chars();
            let (Some(symbol), None) = (chars.next(), chars.next()) else {
                return Err(header());
            };
            trace.vars.push(Var { symbol, name: name.to_string() });
        } else if text != "$upscope $end" && !text.is_empty() {
            return Err(header());
        }
    }

    for (line, text) in lines {
        if text.is_empty() {
            continue;
        }
        if trace.end.is_some() {
            return Err(ReadError::AfterEnd { line });
        }
        let bad_time = || ReadError::Timestamp { line, text: text.to_string() };
        let mut tokens = text.split_whitespace();
        let time: u64 = tokens
            .next()
            .and_then(|t| t.strip_prefix('#'))
            .and_then(|t| t.parse().ok())
            .ok_or_else(bad_time)?;
        if trace.records.last().is_some_and(|r| r.time >= time) {
            return Err(bad_time());
        }

        let mut changes = Vec::new();
        for token in tokens {
            let mut chars = token.chars();
            let change = match (chars.next().and_then(Level::from_char), chars.next(), chars.next()) {
                (Some(level), Some(symbol), None) if trace.vars.iter().any(|v| v.symbol == symbol) => {
                    (symbol, level)
                }
                _ => {
                    return Err(ReadError::Change { line, token: token.to_string() });
                }
            };
            changes.push(change);
        }
        if changes.is_empty() {
            trace.end = Some(time);
        } else {
            trace.records.push(Record { time, changes });
        }
    }
    Ok(trace)
}

impl Trace {
    fn symbol(&self, name: &'static str) -> Result<char, ReadError> {
        self.vars
            .iter()
            .find(|v| v.name == name)
            .map(|v| v.symbol)
            .ok_or(ReadError::MissingSignal(name))
    }

    /// Level of every signal after replaying the records up to and including
    /// `time`.
    pub fn levels_at(&self, time: u64) -> HashMap<String, Level> {
        let mut by_symbol = HashMap::new();
        for record in self.records.iter().take_while(|r| r.time <= time) {
            by_symbol.extend(record.changes.iter().copied());
        }
        self.vars
            .iter()
            .filter_map(|v| by_symbol.get(&v.symbol).map(|l| (v.name.clone(), *l)))
            .collect()
    }

    /// Decodes every chip-select-low window.
    ///
    /// Data is sampled on each rising clock edge while chip-select is low;
    /// a trailing partial byte is dropped.
    pub fn frames(&self) -> Result<Vec<Frame>, ReadError> {
        let (cs, clk, mosi, miso) = (
            self.symbol("CS")?,
            self.symbol("CLK")?,
            self.symbol("MOSI")?,
            self.symbol("MISO")?,
        );

        let mut levels: HashMap<char, Level> = HashMap::new();
        let mut frames = Vec::new();
        let mut current: Option<(u64, Vec<bool>, Vec<bool>)> = None;

        for record in &self.records {
            let was_clk = levels.get(&clk).copied();
            levels.extend(record.changes.iter().copied());
            let level = |s: char| levels.get(&s).copied().unwrap_or(Level::Low);

            match (level(cs), current.take()) {
                (Level::Low, None) => current = Some((record.time, Vec::new(), Vec::new())),
                (Level::Low, Some(open)) => current = Some(open),
                (Level::High, Some((start, out, inp))) => frames.push(Frame {
                    start,
                    end: record.time,
                    mosi: pack(&out),
                    miso: pack(&inp),
                }),
                (Level::High, None) => {}
            }

            if let Some((_, out, inp)) = current.as_mut() {
                if was_clk == Some(Level::Low) && level(clk) == Level::High {
                    out.push(level(mosi).is_high());
                    inp.push(level(miso).is_high());
                }
            }
        }
        Ok(frames)
    }
}

fn pack(bits: &[bool]) -> Vec<u8> {
    bits.chunks_exact(8)
        .map(|byte| byte.iter().fold(0u8, |acc, &b| (acc << 1) | u8::from(b)))
        .collect()
}

impl Frame {
    /// Decodes the frame as a memory transaction.
    ///
    /// Returns `None` for frames the device did not answer with its address
    /// echo, such as host commands.
    pub fn memory(&self) -> Option<MemoryAccess> {
        let echo = to_bytes(u64::from(ADDRESS_ECHO), 3, ByteOrder::Big);
        if self.mosi.len() < 3 || self.miso.get(..3) != Some(echo.as_slice()) {
            return None;
        }
        let raw = self.mosi[..3]
            .iter()
            .fold(0u32, |acc, &b| (acc << 8) | u32::from(b));
        let (mode, skip) = if raw & WRITE_FLAG != 0 {
            (AccessMode::Write, 3)
        } else {
            (AccessMode::Read, 4)
        };
        Some(MemoryAccess {
            mode,
            address: raw & !WRITE_FLAG,
            mosi: self.mosi.get(skip..).unwrap_or_default().to_vec(),
            miso: self.miso.get(skip..).unwrap_or_default().to_vec(),
        })
    }
}

/// Date written into traces built by [`record`].
pub const FIXED_DATE: &str = "2018-09-01 00:00:00";

/// Runs `drive` on a fresh engine and returns the finished trace text.
pub fn record(drive: impl FnOnce(&mut SpiEngine<Vec<u8>>)) -> String {
    let mut engine = SpiEngine::new(Vec::new(), &TraceHeader::with_date(FIXED_DATE))
        .expect("writing to memory cannot fail");
    drive(&mut engine);
    let bytes = engine.finish().expect("writing to memory cannot fail");
    String::from_utf8(bytes).expect("traces are ASCII")
}

/// Runs `drive`, then parses the trace and decodes its frames.
pub fn record_frames(drive: impl FnOnce(&mut SpiEngine<Vec<u8>>)) -> (Trace, Vec<Frame>) {
    let trace = parse_trace(&record(drive)).expect("recorder output parses");
    let frames = trace.frames().expect("SPI wires declared");
    (trace, frames)
}

/// Like [`record_frames`], keeping only memory transactions.
pub fn record_accesses(drive: impl FnOnce(&mut SpiEngine<Vec<u8>>)) -> Vec<MemoryAccess> {
    let (_, frames) = record_frames(drive);
    frames.iter().filter_map(Frame::memory).collect()
}
