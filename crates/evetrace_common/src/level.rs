//! Two-state logic level of a single wire.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The logic level driven on a single-bit wire.
///
/// The SPI model only ever drives wires fully low or fully high, so unlike a
/// 4-state HDL value there is no unknown or high-impedance state.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default, Serialize, Deserialize)]
#[repr(u8)]
pub enum Level {
    /// Logic low (0).
    #[default]
    Low = 0,
    /// Logic high (1).
    High = 1,
}

impl Level {
    /// Returns the level of bit `bit` of `byte`.
    pub fn of_bit(byte: u8, bit: u8) -> Self {
        Self::from(byte & (1 << bit) != 0)
    }

    /// Converts a trace value character to a [`Level`].
    ///
    /// Accepts '0' and '1' only.
    pub fn from_char(c: char) -> Option<Self> {
        match c {
            '0' => Some(Level::Low),
            '1' => Some(Level::High),
            _ => None,
        }
    }

    /// Returns `true` for [`Level::High`].
    pub fn is_high(self) -> bool {
        self == Level::High
    }
}

impl From<bool> for Level {
    fn from(high: bool) -> Self {
        if high {
            Level::High
        } else {
            Level::Low
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Level::Low => write!(f, "0"),
            Level::High => write!(f, "1"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Level::*;
    use super::*;

    #[test]
    fn display() {
        assert_eq!(format!("{Low}"), "0");
        assert_eq!(format!("{High}"), "1");
    }

    #[test]
    fn from_bool() {
        assert_eq!(Level::from(true), High);
        assert_eq!(Level::from(false), Low);
    }

    #[test]
    fn of_bit_msb_and_lsb() {
        assert_eq!(Level::of_bit(0x80, 7), High);
        assert_eq!(Level::of_bit(0x80, 0), Low);
        assert_eq!(Level::of_bit(0x01, 0), High);
        assert_eq!(Level::of_bit(0x42, 6), High);
        assert_eq!(Level::of_bit(0x42, 5), Low);
    }

    #[test]
    fn from_char_valid() {
        assert_eq!(Level::from_char('0'), Some(Low));
        assert_eq!(Level::from_char('1'), Some(High));
    }

    #[test]
    fn from_char_invalid() {
        assert_eq!(Level::from_char('x'), None);
        assert_eq!(Level::from_char('z'), None);
        assert_eq!(Level::from_char('2'), None);
    }

    #[test]
    fn default_is_low() {
        assert_eq!(Level::default(), Low);
    }

    #[test]
    fn serde_roundtrip() {
        let json = serde_json::to_string(&High).unwrap();
        let back: Level = serde_json::from_str(&json).unwrap();
        assert_eq!(back, High);
    }
}
