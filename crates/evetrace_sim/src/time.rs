//! Logical trace time and the symbolic SPI clock.
//!
//! Traces are not tied to a physical clock rate: one tick is one `ns` in the
//! trace's declared timescale, and the SPI clock half-period is a single
//! tick. All time advancement in a trace goes through [`LogicalTime`], which
//! refuses to move backwards.

use std::fmt;

/// Half of the SPI clock period (`T`), in ticks.
pub const HALF_PERIOD: u64 = 1;
/// Full SPI clock period (`2T`), in ticks.
pub const CLOCK_PERIOD: u64 = 2 * HALF_PERIOD;
/// Time chip-select is held high between framed transfers (two clock periods).
pub const FRAME_GAP: u64 = 2 * CLOCK_PERIOD;

/// A monotonic logical timestamp in ticks.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LogicalTime(u64);

impl LogicalTime {
    /// Time zero, the start of every trace.
    pub const ZERO: LogicalTime = LogicalTime(0);

    /// Creates a timestamp from a raw tick count.
    pub fn from_ticks(ticks: u64) -> Self {
        Self(ticks)
    }

    /// Returns the raw tick count.
    pub fn ticks(self) -> u64 {
        self.0
    }

    /// Returns the timestamp `ticks` later than `self`.
    pub fn after(self, ticks: u64) -> Self {
        Self(self.0 + ticks)
    }

    /// Moves to `later`.
    ///
    /// # Panics
    ///
    /// Panics if `later` is earlier than `self`.
    pub fn advance_to(self, later: LogicalTime) -> Self {
        assert!(
            later >= self,
            "cannot advance backwards: {} -> {}",
            self.0,
            later.0
        );
        later
    }
}

impl fmt::Display for LogicalTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}
