//! SPI waveform engine for traces of FT8xx (EVE) display controller traffic.
//!
//! This crate turns byte-level host activity into a Value Change Dump of the
//! four SPI wires. It knows nothing about individual commands; it only frames
//! memory transactions and host commands the way the device expects them.
//!
//! # Architecture
//!
//! A [`VcdRecorder`] owns the traced [`Signal`]s and a monotonic
//! [`LogicalTime`]. The [`SpiEngine`] sits on top of it, bit-banging bytes
//! and tracking the open memory transaction so that contiguous accesses are
//! merged into one burst.
//!
//! # Usage
//!
//! ```
//! use evetrace_sim::{AccessMode, SpiEngine, TraceHeader};
//!
//! let mut engine = SpiEngine::new(Vec::new(), &TraceHeader::with_date("doc"))?;
//! engine.frame_host_command(&[0x00, 0x00, 0x00]);
//! {
//!     let mut tx = engine.transaction(AccessMode::Write, 0x30_8000);
//!     tx.transfer(&[0x00, 0xff, 0xff, 0xff], None);
//! }
//! let trace = String::from_utf8(engine.finish()?).unwrap();
//! assert!(trace.starts_with("$date doc $end"));
//! # Ok::<(), evetrace_sim::TraceError>(())
//! ```
//!
//! # Modules
//!
//! - `error`: Trace error types
//! - `time`: Logical time and clock constants
//! - `signal`: Single-bit signals with change detection
//! - `waveform`: VCD recording
//! - `spi`: SPI transaction engine

#![warn(missing_docs)]

pub mod error;
pub mod signal;
pub mod spi;
pub mod time;
pub mod waveform;

pub use error::TraceError;
pub use signal::{Signal, SignalId};
pub use spi::{next_address, AccessMode, SpiEngine, TransactionGuard};
pub use time::{LogicalTime, CLOCK_PERIOD, FRAME_GAP, HALF_PERIOD};
pub use waveform::{TraceHeader, VcdRecorder};
