//! Command catalogues of the FT8xx (EVE) display controllers.
//!
//! Every command family is a static table of descriptors consumed by one
//! generic encoder per family:
//!
//! - [`host`]: three-byte host commands framed outside memory transactions
//! - [`coproc`]: co-processor commands streamed into the command FIFO
//! - [`display_list`]: single-word display-list commands
//! - [`register`]: memory-mapped registers, read and written as 32-bit words
//!
//! Names are looked up case-insensitively, with or without the `CMD_` or
//! `REG_` prefix.

#![warn(missing_docs)]

pub mod arg;
pub mod coproc;
pub mod display_list;
pub mod error;
pub mod host;
pub mod register;

use evetrace_common::BitRange;
use serde::Serialize;

pub use arg::Arg;
pub use coproc::{CoprocCommand, CoprocWriter, Param, ParamKind, COPROC_COMMANDS};
pub use display_list::{DisplayListCommand, DisplayListWriter, DISPLAY_LIST_COMMANDS};
pub use error::CommandError;
pub use host::{HostCommand, HOST_COMMANDS};
pub use register::{Access, Register, REGISTERS, REGISTER_ALIASES};

/// A named bit field within a packed command word.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct Field {
    /// Field name.
    pub name: &'static str,
    /// Bits occupied by the field.
    pub range: BitRange,
}

impl Field {
    /// A field spanning `[lsb, msb]`.
    pub const fn new(name: &'static str, msb: u8, lsb: u8) -> Self {
        Self {
            name,
            range: BitRange::new(msb, lsb),
        }
    }

    /// A single-bit field.
    pub const fn bit(name: &'static str, n: u8) -> Self {
        Self {
            name,
            range: BitRange::bit(n),
        }
    }
}

/// Returns `true` if `query` names the catalogue entry `name`.
///
/// Both sides are compared upper-cased with `prefix` stripped.
pub(crate) fn name_matches(name: &str, prefix: &str, query: &str) -> bool {
    let query = query.trim().to_ascii_uppercase();
    let query = query.strip_prefix(prefix).unwrap_or(&query);
    name.strip_prefix(prefix).unwrap_or(name) == query
}

/// Checks that exactly `expected` values were supplied for `command`.
pub(crate) fn check_count(command: &str, expected: usize, found: usize) -> Result<(), CommandError> {
    if expected == found {
        Ok(())
    } else {
        Err(CommandError::ArgumentCount {
            command: command.to_string(),
            expected: expected.to_string(),
            found,
        })
    }
}
