//! Dynamically typed command arguments.

use std::fmt;

/// One argument of a co-processor command.
///
/// Integers are truncated to the width of the parameter they fill, so both
/// signed and unsigned values are accepted.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Arg {
    /// An integer, colour or pointer.
    Int(i64),
    /// A string, sent as NUL-terminated UTF-8.
    Text(String),
    /// A raw byte blob.
    Bytes(Vec<u8>),
}

impl Arg {
    /// A short description of the argument kind, for error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Arg::Int(_) => "an integer",
            Arg::Text(_) => "text",
            Arg::Bytes(_) => "bytes",
        }
    }
}

impl From<i64> for Arg {
    fn from(v: i64) -> Self {
        Arg::Int(v)
    }
}

impl From<i32> for Arg {
    fn from(v: i32) -> Self {
        Arg::Int(v.into())
    }
}

impl From<u32> for Arg {
    fn from(v: u32) -> Self {
        Arg::Int(v.into())
    }
}

impl From<&str> for Arg {
    fn from(s: &str) -> Self {
        Arg::Text(s.to_string())
    }
}

impl From<String> for Arg {
    fn from(s: String) -> Self {
        Arg::Text(s)
    }
}

impl From<Vec<u8>> for Arg {
    fn from(b: Vec<u8>) -> Self {
        Arg::Bytes(b)
    }
}

impl From<&[u8]> for Arg {
    fn from(b: &[u8]) -> Self {
        Arg::Bytes(b.to_vec())
    }
}

impl fmt::Display for Arg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Arg::Int(v) => write!(f, "{v}"),
            Arg::Text(s) => write!(f, "{s:?}"),
            Arg::Bytes(b) => write!(f, "<{} bytes>", b.len()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conversions() {
        assert_eq!(Arg::from(-1i32), Arg::Int(-1));
        assert_eq!(Arg::from(0xffff_ffffu32), Arg::Int(0xffff_ffff));
        assert_eq!(Arg::from("hi"), Arg::Text("hi".into()));
        assert_eq!(Arg::from(&[1u8, 2][..]), Arg::Bytes(vec![1, 2]));
    }

    #[test]
    fn display() {
        assert_eq!(Arg::Int(42).to_string(), "42");
        assert_eq!(Arg::from("ok").to_string(), "\"ok\"");
        assert_eq!(Arg::Bytes(vec![0; 3]).to_string(), "<3 bytes>");
    }

    #[test]
    fn kind_names() {
        assert_eq!(Arg::Int(0).kind(), "an integer");
        assert_eq!(Arg::from("").kind(), "text");
        assert_eq!(Arg::Bytes(Vec::new()).kind(), "bytes");
    }
}
