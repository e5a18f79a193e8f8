//! Trace error types.
//!
//! Caller mistakes (backwards time, out-of-range addresses, mismatched
//! buffers) are panics, not errors. [`TraceError`] only covers failures of
//! the output sink.

use std::io;

/// Errors that can occur while writing a trace.
#[derive(Debug, thiserror::Error)]
pub enum TraceError {
    /// An I/O error occurred while writing trace data.
    #[error("trace I/O error: {0}")]
    Io(#[from] io::Error),
}
