//! Shared foundational types used across the evetrace workspace.
//!
//! This crate provides the two-state wire [`Level`] and the stateless
//! bit-field codec used to pack command fields and serialize them into the
//! byte sequences clocked onto the SPI bus.

#![warn(missing_docs)]

pub mod bits;
pub mod level;

pub use bits::{encode_text, extract_bits, pack_fields, pad_to_word, to_bytes, BitRange, ByteOrder};
pub use level::Level;
