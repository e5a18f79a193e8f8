//! Value Change Dump output of the traced SPI signals.
//!
//! [`VcdRecorder`] owns the traced [`Signal`]s and the trace's logical clock.
//! Signal levels are set at the current timestamp; when the clock advances,
//! every signal that changed is written as one sparse `#<time> <changes>`
//! record, so timestamps without transitions never appear in the output.

use std::io::Write;

use evetrace_common::Level;

use crate::error::TraceError;
use crate::signal::{Signal, SignalId};
use crate::time::{LogicalTime, FRAME_GAP};

/// Header values written at the top of every trace.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TraceHeader {
    /// Contents of the `$date` section.
    pub date: String,
    /// Name of the single module scope holding the signals.
    pub scope: String,
}

impl TraceHeader {
    /// A header dated with the current local time.
    pub fn now() -> Self {
        Self::with_date(chrono::Local::now().format("%Y-%m-%d %H:%M:%S%.6f").to_string())
    }

    /// A header with a fixed date, for reproducible traces.
    pub fn with_date(date: impl Into<String>) -> Self {
        Self {
            date: date.into(),
            scope: "spi".into(),
        }
    }
}

/// VCD writer for a fixed set of single-bit signals.
///
/// The header is written by [`open`](Self::open). After that, write failures
/// are remembered rather than returned: the first I/O error stops all further
/// output and is reported by [`close`](Self::close).
pub struct VcdRecorder<W: Write> {
    writer: W,
    signals: Vec<Signal>,
    now: LogicalTime,
    error: Option<std::io::Error>,
}

impl<W: Write> VcdRecorder<W> {
    /// Writes the trace header for `signals` (in the given order) and starts
    /// recording at time zero.
    ///
    /// # Panics
    ///
    /// Panics if two signals share a symbol.
    pub fn open(mut writer: W, signals: Vec<Signal>, header: &TraceHeader) -> Result<Self, TraceError> {
        for (i, s) in signals.iter().enumerate() {
            assert!(
                signals[..i].iter().all(|prev| prev.symbol() != s.symbol()),
                "duplicate signal symbol '{}'",
                s.symbol()
            );
        }

        writeln!(writer, "$date {} $end", header.date)?;
        writeln!(writer, "$timescale 1 ns $end")?;
        writeln!(writer, "$scope module {} $end", header.scope)?;
        for s in &signals {
            writeln!(writer, "$var wire 1 {} {} $end", s.symbol(), s.name())?;
        }
        writeln!(writer, "$upscope $end")?;
        writeln!(writer, "$enddefinitions $end")?;
        writer.flush()?;

        Ok(Self {
            writer,
            signals,
            now: LogicalTime::ZERO,
            error: None,
        })
    }

    /// The current timestamp.
    pub fn now(&self) -> LogicalTime {
        self.now
    }

    /// Drives signal `id` to `level` at the current timestamp.
    pub fn set(&mut self, id: SignalId, level: Level) {
        self.signals[id.as_raw() as usize].set_value(level);
    }

    /// Moves the clock to `time`, first dumping the changes made at the
    /// current timestamp.
    ///
    /// # Panics
    ///
    /// Panics if `time` is earlier than the current timestamp.
    pub fn advance_to(&mut self, time: LogicalTime) {
        let next = self.now.advance_to(time);
        if next > self.now {
            self.flush_change_dump();
            self.now = next;
        }
    }

    /// Moves the clock `ticks` forward.
    pub fn advance_by(&mut self, ticks: u64) {
        self.advance_to(self.now.after(ticks));
    }

    fn flush_change_dump(&mut self) {
        let changes: Vec<String> = self
            .signals
            .iter_mut()
            .filter_map(Signal::sample_if_changed)
            .collect();
        if !changes.is_empty() {
            let line = format!("{} {}", self.now, changes.join(" "));
            self.emit(&line);
        }
    }

    fn emit(&mut self, line: &str) {
        if self.error.is_some() {
            return;
        }
        if let Err(e) = writeln!(self.writer, "{line}") {
            self.error = Some(e);
        }
    }

    /// Ends the trace two clock periods after the current time, writes the
    /// final timestamp marker and flushes the sink.
    ///
    /// Returns the sink, or the first I/O error hit while recording.
    pub fn close(mut self) -> Result<W, TraceError> {
        self.advance_by(FRAME_GAP);
        let marker = self.now.to_string();
        self.emit(&marker);
        if let Some(e) = self.error.take() {
            return Err(e.into());
        }
        self.writer.flush()?;
        log::debug!("trace closed at {}", self.now);
        Ok(self.writer)
    }
}
