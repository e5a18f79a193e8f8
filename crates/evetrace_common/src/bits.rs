//! Bit-field packing and fixed-width integer serialization.
//!
//! Everything here is pure and never fails for in-range arguments. Values
//! wider than their declared field or byte width are truncated, mirroring how
//! hardware registers drop out-of-range bits on write.

use serde::Serialize;

/// An inclusive bit range `[lsb, msb]` within a word, counting from bit 0.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub struct BitRange {
    /// Most significant bit of the range.
    pub msb: u8,
    /// Least significant bit of the range.
    pub lsb: u8,
}

impl BitRange {
    /// Creates the range `[lsb, msb]`.
    ///
    /// # Panics
    ///
    /// Panics if `lsb > msb` or `msb >= 64`.
    pub const fn new(msb: u8, lsb: u8) -> Self {
        assert!(lsb <= msb, "bit range lsb above msb");
        assert!(msb < 64, "bit range beyond 64 bits");
        Self { msb, lsb }
    }

    /// Creates the single-bit range `[n:n]`.
    pub const fn bit(n: u8) -> Self {
        Self::new(n, n)
    }

    /// Masks `value` to the range width and shifts it into position.
    pub fn place(self, value: u64) -> u64 {
        extract_bits(value, self.msb, self.lsb)
    }
}

/// Byte order used when serializing an integer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum ByteOrder {
    /// Most significant byte first.
    Big,
    /// Least significant byte first.
    Little,
}

fn low_mask(width: u32) -> u64 {
    if width >= 64 {
        u64::MAX
    } else {
        (1u64 << width) - 1
    }
}

/// Masks `value` to `msb - lsb + 1` bits and shifts the result left by `lsb`.
///
/// The result can be OR-combined with other fields of the same word.
///
/// # Panics
///
/// Panics if `lsb > msb` or `msb >= 64`.
pub fn extract_bits(value: u64, msb: u8, lsb: u8) -> u64 {
    assert!(lsb <= msb, "bit range [{msb}:{lsb}] is inverted");
    assert!(msb < 64, "bit {msb} is outside a 64-bit word");
    let width = u32::from(msb - lsb + 1);
    (value & low_mask(width)) << lsb
}

/// ORs together every `(value, range)` contribution into one word.
///
/// Overlapping ranges are not detected; their bits simply OR together.
pub fn pack_fields(fields: &[(u64, BitRange)]) -> u64 {
    fields
        .iter()
        .fold(0, |word, &(value, range)| word | range.place(value))
}

/// Serializes the low `count` bytes of `value` in the given byte order.
///
/// Bits above `8 * count` are dropped, so `to_bytes(v, k, o)` equals
/// `to_bytes(v mod 2^(8k), k, o)`.
///
/// # Panics
///
/// Panics if `count` is 0 or greater than 8.
pub fn to_bytes(value: u64, count: usize, order: ByteOrder) -> Vec<u8> {
    assert!(
        (1..=8).contains(&count),
        "cannot serialize into {count} bytes"
    );
    let byte_at = |i: usize| (value >> (8 * i)) as u8;
    match order {
        ByteOrder::Big => (0..count).rev().map(byte_at).collect(),
        ByteOrder::Little => (0..count).map(byte_at).collect(),
    }
}

/// Encodes `text` as UTF-8 followed by a single NUL byte.
pub fn encode_text(text: &str) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(text.len() + 1);
    bytes.extend_from_slice(text.as_bytes());
    bytes.push(0);
    bytes
}

/// Appends zero bytes until the length is a multiple of 4.
pub fn pad_to_word(bytes: &mut Vec<u8>) {
    let rem = bytes.len() % 4;
    if rem != 0 {
        bytes.resize(bytes.len() + 4 - rem, 0);
    }
}
