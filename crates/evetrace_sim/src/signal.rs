//! Single-bit traced signals with change detection.
//!
//! A [`Signal`] remembers both the level it is currently driven to and the
//! level it last reported to the trace, so the recorder can emit only the
//! transitions.

use evetrace_common::Level;

/// Index of a signal within the recorder that owns it.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct SignalId(u32);

impl SignalId {
    /// Creates a `SignalId` from a raw index.
    pub const fn from_raw(index: u32) -> Self {
        Self(index)
    }

    /// Returns the raw index.
    pub fn as_raw(self) -> u32 {
        self.0
    }
}

/// A named single-bit wire identified in the trace by a one-character symbol.
#[derive(Clone, Debug)]
pub struct Signal {
    name: String,
    symbol: char,
    level: Level,
    reported: Option<Level>,
}

impl Signal {
    /// Creates a low signal that has never been reported.
    ///
    /// Because nothing has been reported yet, the first
    /// [`sample_if_changed`](Self::sample_if_changed) always yields a value.
    pub fn new(name: impl Into<String>, symbol: char) -> Self {
        Self {
            name: name.into(),
            symbol,
            level: Level::Low,
            reported: None,
        }
    }

    /// The human-readable signal name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The trace identifier of this signal.
    pub fn symbol(&self) -> char {
        self.symbol
    }

    /// Drives the signal to `level`. Nothing is reported until sampled.
    pub fn set_value(&mut self, level: Level) {
        self.level = level;
    }

    /// Returns the `<level><symbol>` token if the level changed since the last
    /// report, and makes the current level the new baseline.
    pub fn sample_if_changed(&mut self) -> Option<String> {
        if self.reported == Some(self.level) {
            return None;
        }
        self.reported = Some(self.level);
        Some(format!("{}{}", self.level, self.symbol))
    }
}
