//! Co-processor commands.
//!
//! A co-processor command is a 32-bit little-endian opcode followed by its
//! parameters, zero-padded to a multiple of four bytes. The whole catalogue is
//! described by [`CoprocCommand`] descriptors; [`CoprocCommand::encode`] is the
//! only encoder.

use std::borrow::Cow;
use std::io::Write;

use evetrace_common::{encode_text, extract_bits, pad_to_word, to_bytes, ByteOrder};
use evetrace_sim::{AccessMode, SpiEngine, TransactionGuard};
use serde::Serialize;

use crate::arg::Arg;
use crate::error::CommandError;
use crate::name_matches;

/// How a parameter is laid out on the wire.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ParamKind {
    /// Two bytes, little-endian.
    Int16,
    /// Four bytes, little-endian.
    Int32,
    /// An RGB colour: bits `[23:0]` sent as four bytes.
    Color,
    /// NUL-terminated UTF-8.
    Text,
    /// A raw byte blob.
    Bytes,
    /// A byte blob preceded by its length as four bytes.
    CountedBytes,
    /// Any number of trailing four-byte integers. Only valid last.
    Variadic,
}

impl ParamKind {
    /// Short label used in listings.
    pub fn label(self) -> &'static str {
        match self {
            ParamKind::Int16 => "int16",
            ParamKind::Int32 => "int32",
            ParamKind::Color => "color",
            ParamKind::Text => "text",
            ParamKind::Bytes => "bytes",
            ParamKind::CountedBytes => "counted_bytes",
            ParamKind::Variadic => "int32...",
        }
    }
}

/// One parameter of a co-processor command.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct Param {
    /// Parameter name.
    pub name: &'static str,
    /// Wire layout.
    pub kind: ParamKind,
    /// Value used when the argument is omitted. Only set on trailing
    /// result slots that the co-processor overwrites.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<i64>,
}

impl Param {
    const fn of(name: &'static str, kind: ParamKind) -> Self {
        Self { name, kind, default: None }
    }

    /// A 16-bit integer.
    pub const fn int16(name: &'static str) -> Self {
        Self::of(name, ParamKind::Int16)
    }

    /// A 32-bit integer.
    pub const fn int32(name: &'static str) -> Self {
        Self::of(name, ParamKind::Int32)
    }

    /// A 32-bit result slot, zero when omitted.
    pub const fn result(name: &'static str) -> Self {
        Self { name, kind: ParamKind::Int32, default: Some(0) }
    }

    /// A 24-bit colour.
    pub const fn color(name: &'static str) -> Self {
        Self::of(name, ParamKind::Color)
    }

    /// A NUL-terminated string.
    pub const fn text(name: &'static str) -> Self {
        Self::of(name, ParamKind::Text)
    }

    /// A byte blob.
    pub const fn bytes(name: &'static str) -> Self {
        Self::of(name, ParamKind::Bytes)
    }

    /// A byte blob preceded by its length.
    pub const fn counted_bytes(name: &'static str) -> Self {
        Self::of(name, ParamKind::CountedBytes)
    }

    /// Trailing 32-bit integers.
    pub const fn variadic(name: &'static str) -> Self {
        Self::of(name, ParamKind::Variadic)
    }
}

/// Descriptor of one co-processor command.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct CoprocCommand {
    /// Command name.
    pub name: &'static str,
    /// 32-bit opcode.
    pub opcode: u32,
    /// Parameters in wire order.
    pub params: &'static [Param],
}

const fn i16s<const N: usize>(names: [&'static str; N]) -> [Param; N] {
    let mut params = [Param::int16(""); N];
    let mut i = 0;
    while i < N {
        params[i] = Param::int16(names[i]);
        i += 1;
    }
    params
}

const fn i32s<const N: usize>(names: [&'static str; N]) -> [Param; N] {
    let mut params = [Param::int32(""); N];
    let mut i = 0;
    while i < N {
        params[i] = Param::int32(names[i]);
        i += 1;
    }
    params
}

/// Every co-processor command of the FT80x/FT81x/BT81x families.
pub const COPROC_COMMANDS: &[CoprocCommand] = &[
    CoprocCommand { name: "CMD_DLSTART", opcode: 0xFFFF_FF00, params: &[] },
    CoprocCommand { name: "CMD_SWAP", opcode: 0xFFFF_FF01, params: &[] },
    CoprocCommand { name: "CMD_COLDSTART", opcode: 0xFFFF_FF32, params: &[] },
    CoprocCommand { name: "CMD_INTERRUPT", opcode: 0xFFFF_FF02, params: &i32s(["ms"]) },
    CoprocCommand { name: "CMD_APPEND", opcode: 0xFFFF_FF1E, params: &i32s(["ptr", "num"]) },
    CoprocCommand {
        name: "CMD_REGREAD",
        opcode: 0xFFFF_FF19,
        params: &[Param::int32("ptr"), Param::result("result")],
    },
    CoprocCommand {
        name: "CMD_MEMWRITE",
        opcode: 0xFFFF_FF1A,
        params: &[Param::int32("ptr"), Param::counted_bytes("data")],
    },
    CoprocCommand {
        name: "CMD_INFLATE",
        opcode: 0xFFFF_FF22,
        params: &[Param::int32("ptr"), Param::bytes("data")],
    },
    CoprocCommand {
        name: "CMD_LOADIMAGE",
        opcode: 0xFFFF_FF24,
        params: &[Param::int32("ptr"), Param::int32("options"), Param::bytes("data")],
    },
    CoprocCommand { name: "CMD_MEDIAFIFO", opcode: 0xFFFF_FF39, params: &i32s(["ptr", "size"]) },
    CoprocCommand {
        name: "CMD_PLAYVIDEO",
        opcode: 0xFFFF_FF3A,
        params: &[Param::int32("opts"), Param::bytes("data")],
    },
    CoprocCommand { name: "CMD_VIDEOSTART", opcode: 0xFFFF_FF40, params: &[] },
    CoprocCommand { name: "CMD_VIDEOFRAME", opcode: 0xFFFF_FF41, params: &i32s(["dst", "ptr"]) },
    CoprocCommand {
        name: "CMD_MEMCRC",
        opcode: 0xFFFF_FF18,
        params: &[Param::int32("ptr"), Param::int32("num"), Param::result("result")],
    },
    CoprocCommand { name: "CMD_MEMZERO", opcode: 0xFFFF_FF1C, params: &i32s(["ptr", "num"]) },
    CoprocCommand {
        name: "CMD_MEMSET",
        opcode: 0xFFFF_FF1B,
        params: &i32s(["ptr", "value", "num"]),
    },
    CoprocCommand {
        name: "CMD_MEMCPY",
        opcode: 0xFFFF_FF1D,
        params: &i32s(["dest", "src", "num"]),
    },
    CoprocCommand {
        name: "CMD_BUTTON",
        opcode: 0xFFFF_FF0D,
        params: &[
            Param::int16("x"),
            Param::int16("y"),
            Param::int16("w"),
            Param::int16("h"),
            Param::int16("font"),
            Param::int16("options"),
            Param::text("s"),
        ],
    },
    CoprocCommand {
        name: "CMD_CLOCK",
        opcode: 0xFFFF_FF14,
        params: &i16s(["x", "y", "r", "options", "h", "m", "s", "ms"]),
    },
    CoprocCommand { name: "CMD_FGCOLOR", opcode: 0xFFFF_FF0A, params: &[Param::color("c")] },
    CoprocCommand { name: "CMD_BGCOLOR", opcode: 0xFFFF_FF09, params: &[Param::color("c")] },
    CoprocCommand { name: "CMD_GRADCOLOR", opcode: 0xFFFF_FF34, params: &[Param::color("c")] },
    CoprocCommand {
        name: "CMD_GAUGE",
        opcode: 0xFFFF_FF13,
        params: &i16s(["x", "y", "r", "options", "major", "minor", "val", "range"]),
    },
    CoprocCommand {
        name: "CMD_GRADIENT",
        opcode: 0xFFFF_FF0B,
        params: &[
            Param::int16("x0"),
            Param::int16("y0"),
            Param::color("rgb0"),
            Param::int16("x1"),
            Param::int16("y1"),
            Param::color("rgb1"),
        ],
    },
    CoprocCommand {
        name: "CMD_GRADIENTA",
        opcode: 0xFFFF_FF57,
        params: &[
            Param::int16("x0"),
            Param::int16("y0"),
            Param::int32("argb0"),
            Param::int16("x1"),
            Param::int16("y1"),
            Param::int32("argb1"),
        ],
    },
    CoprocCommand {
        name: "CMD_KEYS",
        opcode: 0xFFFF_FF0E,
        params: &[
            Param::int16("x"),
            Param::int16("y"),
            Param::int16("w"),
            Param::int16("h"),
            Param::int16("font"),
            Param::int16("options"),
            Param::text("s"),
        ],
    },
    CoprocCommand {
        name: "CMD_PROGRESS",
        opcode: 0xFFFF_FF0F,
        params: &i16s(["x", "y", "w", "h", "options", "val", "range"]),
    },
    CoprocCommand {
        name: "CMD_SCROLLBAR",
        opcode: 0xFFFF_FF11,
        params: &i16s(["x", "y", "w", "h", "options", "val", "size", "range"]),
    },
    CoprocCommand {
        name: "CMD_SLIDER",
        opcode: 0xFFFF_FF10,
        params: &i16s(["x", "y", "w", "h", "options", "val", "range"]),
    },
    CoprocCommand {
        name: "CMD_DIAL",
        opcode: 0xFFFF_FF2D,
        params: &i16s(["x", "y", "r", "options", "val"]),
    },
    CoprocCommand {
        name: "CMD_TOGGLE",
        opcode: 0xFFFF_FF12,
        params: &[
            Param::int16("x"),
            Param::int16("y"),
            Param::int16("w"),
            Param::int16("font"),
            Param::int16("options"),
            Param::int16("state"),
            Param::text("s"),
        ],
    },
    CoprocCommand {
        name: "CMD_TEXT",
        opcode: 0xFFFF_FF0C,
        params: &[
            Param::int16("x"),
            Param::int16("y"),
            Param::int16("font"),
            Param::int16("options"),
            Param::text("s"),
            Param::variadic("args"),
        ],
    },
    CoprocCommand { name: "CMD_SETBASE", opcode: 0xFFFF_FF38, params: &i32s(["b"]) },
    CoprocCommand {
        name: "CMD_NUMBER",
        opcode: 0xFFFF_FF2E,
        params: &[
            Param::int16("x"),
            Param::int16("y"),
            Param::int16("font"),
            Param::int16("options"),
            Param::int32("n"),
        ],
    },
    CoprocCommand { name: "CMD_LOADIDENTITY", opcode: 0xFFFF_FF26, params: &[] },
    CoprocCommand { name: "CMD_SETMATRIX", opcode: 0xFFFF_FF2A, params: &[] },
    CoprocCommand {
        name: "CMD_GETMATRIX",
        opcode: 0xFFFF_FF33,
        params: &[
            Param::result("a"),
            Param::result("b"),
            Param::result("c"),
            Param::result("d"),
            Param::result("e"),
            Param::result("f"),
        ],
    },
    CoprocCommand { name: "CMD_GETPTR", opcode: 0xFFFF_FF23, params: &[Param::result("result")] },
    CoprocCommand {
        name: "CMD_GETPROPS",
        opcode: 0xFFFF_FF25,
        params: &[Param::result("ptr"), Param::result("width"), Param::result("height")],
    },
    CoprocCommand { name: "CMD_SCALE", opcode: 0xFFFF_FF28, params: &i32s(["sx", "sy"]) },
    CoprocCommand { name: "CMD_ROTATE", opcode: 0xFFFF_FF29, params: &i32s(["a"]) },
    CoprocCommand {
        name: "CMD_ROTATEAROUND",
        opcode: 0xFFFF_FF51,
        params: &i32s(["x", "y", "a", "s"]),
    },
    CoprocCommand { name: "CMD_TRANSLATE", opcode: 0xFFFF_FF27, params: &i32s(["tx", "ty"]) },
    CoprocCommand { name: "CMD_CALIBRATE", opcode: 0xFFFF_FF15, params: &[Param::result("result")] },
    CoprocCommand { name: "CMD_SETROTATE", opcode: 0xFFFF_FF36, params: &i32s(["r"]) },
    CoprocCommand {
        name: "CMD_SPINNER",
        opcode: 0xFFFF_FF16,
        params: &i16s(["x", "y", "style", "scale"]),
    },
    CoprocCommand { name: "CMD_SCREENSAVER", opcode: 0xFFFF_FF2F, params: &[] },
    CoprocCommand {
        name: "CMD_SKETCH",
        opcode: 0xFFFF_FF30,
        params: &[
            Param::int16("x"),
            Param::int16("y"),
            Param::int16("w"),
            Param::int16("h"),
            Param::int32("ptr"),
            Param::int16("format"),
        ],
    },
    CoprocCommand {
        name: "CMD_CSKETCH",
        opcode: 0xFFFF_FF35,
        params: &[
            Param::int16("x"),
            Param::int16("y"),
            Param::int16("w"),
            Param::int16("h"),
            Param::int32("ptr"),
            Param::int16("format"),
            Param::int16("freq"),
        ],
    },
    CoprocCommand { name: "CMD_STOP", opcode: 0xFFFF_FF17, params: &[] },
    CoprocCommand { name: "CMD_SETFONT", opcode: 0xFFFF_FF2B, params: &i32s(["font", "ptr"]) },
    CoprocCommand {
        name: "CMD_SETFONT2",
        opcode: 0xFFFF_FF3B,
        params: &i32s(["font", "ptr", "firstchar"]),
    },
    CoprocCommand { name: "CMD_SETSCRATCH", opcode: 0xFFFF_FF3C, params: &i32s(["handle"]) },
    CoprocCommand { name: "CMD_ROMFONT", opcode: 0xFFFF_FF3F, params: &i32s(["font", "romslot"]) },
    CoprocCommand { name: "CMD_RESETFONTS", opcode: 0xFFFF_FF52, params: &[] },
    CoprocCommand {
        name: "CMD_TRACK",
        opcode: 0xFFFF_FF2C,
        params: &i16s(["x", "y", "w", "h", "tag"]),
    },
    CoprocCommand { name: "CMD_SNAPSHOT", opcode: 0xFFFF_FF1F, params: &i32s(["ptr"]) },
    CoprocCommand {
        name: "CMD_SNAPSHOT2",
        opcode: 0xFFFF_FF37,
        params: &[
            Param::int32("fmt"),
            Param::int32("ptr"),
            Param::int16("x"),
            Param::int16("y"),
            Param::int16("w"),
            Param::int16("h"),
        ],
    },
    CoprocCommand {
        name: "CMD_SETBITMAP",
        opcode: 0xFFFF_FF43,
        params: &[
            Param::int32("source"),
            Param::int16("fmt"),
            Param::int16("width"),
            Param::int16("height"),
        ],
    },
    CoprocCommand { name: "CMD_LOGO", opcode: 0xFFFF_FF31, params: &[] },
    CoprocCommand { name: "CMD_FLASHERASE", opcode: 0xFFFF_FF44, params: &[] },
    CoprocCommand { name: "CMD_FLASHWRITE", opcode: 0xFFFF_FF45, params: &i32s(["ptr", "num"]) },
    CoprocCommand {
        name: "CMD_FLASHREAD",
        opcode: 0xFFFF_FF46,
        params: &i32s(["dest", "src", "num"]),
    },
    CoprocCommand { name: "CMD_APPENDF", opcode: 0xFFFF_FF59, params: &i32s(["ptr", "num"]) },
    CoprocCommand {
        name: "CMD_FLASHUPDATE",
        opcode: 0xFFFF_FF47,
        params: &i32s(["dest", "src", "num"]),
    },
    CoprocCommand { name: "CMD_FLASHDETACH", opcode: 0xFFFF_FF48, params: &[] },
    CoprocCommand { name: "CMD_FLASHATTACH", opcode: 0xFFFF_FF49, params: &[] },
    CoprocCommand { name: "CMD_FLASHFAST", opcode: 0xFFFF_FF4A, params: &[Param::result("result")] },
    CoprocCommand { name: "CMD_FLASHSPIDESEL", opcode: 0xFFFF_FF4B, params: &[] },
    CoprocCommand { name: "CMD_FLASHSPITX", opcode: 0xFFFF_FF4C, params: &i32s(["num"]) },
    CoprocCommand { name: "CMD_FLASHSPIRX", opcode: 0xFFFF_FF4D, params: &i32s(["ptr", "num"]) },
    CoprocCommand { name: "CMD_CLEARCACHE", opcode: 0xFFFF_FF4F, params: &[] },
    CoprocCommand { name: "CMD_FLASHSOURCE", opcode: 0xFFFF_FF4E, params: &i32s(["ptr"]) },
    CoprocCommand { name: "CMD_VIDEOSTARTF", opcode: 0xFFFF_FF5F, params: &[] },
    CoprocCommand {
        name: "CMD_ANIMSTART",
        opcode: 0xFFFF_FF53,
        params: &i32s(["ch", "aoptr", "loop"]),
    },
    CoprocCommand { name: "CMD_ANIMSTOP", opcode: 0xFFFF_FF54, params: &i32s(["ch"]) },
    CoprocCommand {
        name: "CMD_ANIMXY",
        opcode: 0xFFFF_FF55,
        params: &[Param::int32("ch"), Param::int16("x"), Param::int16("y")],
    },
    CoprocCommand { name: "CMD_ANIMDRAW", opcode: 0xFFFF_FF56, params: &i32s(["ch"]) },
    CoprocCommand {
        name: "CMD_ANIMFRAME",
        opcode: 0xFFFF_FF5A,
        params: &[
            Param::int16("x"),
            Param::int16("y"),
            Param::int32("aoptr"),
            Param::int32("frame"),
        ],
    },
    CoprocCommand { name: "CMD_SYNC", opcode: 0xFFFF_FF42, params: &[] },
    CoprocCommand {
        name: "CMD_BITMAP_TRANSFORM",
        opcode: 0xFFFF_FF21,
        params: &[
            Param::int32("x0"),
            Param::int32("y0"),
            Param::int32("x1"),
            Param::int32("y1"),
            Param::int32("x2"),
            Param::int32("y2"),
            Param::int32("tx0"),
            Param::int32("ty0"),
            Param::int32("tx1"),
            Param::int32("ty1"),
            Param::int32("tx2"),
            Param::int32("ty2"),
            Param { name: "result", kind: ParamKind::Int16, default: Some(0) },
        ],
    },
];

/// Looks up a co-processor command by name.
pub fn find(name: &str) -> Option<&'static CoprocCommand> {
    COPROC_COMMANDS.iter().find(|c| name_matches(c.name, "CMD_", name))
}

impl CoprocCommand {
    /// Accepted argument count, as shown in error messages.
    pub fn arity(&self) -> String {
        let variadic = self.params.iter().any(|p| p.kind == ParamKind::Variadic);
        let fixed = self
            .params
            .iter()
            .filter(|p| p.kind != ParamKind::Variadic)
            .count();
        let required = self
            .params
            .iter()
            .filter(|p| p.kind != ParamKind::Variadic && p.default.is_none())
            .count();
        if variadic {
            format!("{required}+")
        } else if required == fixed {
            format!("{fixed}")
        } else {
            format!("{required}..={fixed}")
        }
    }

    fn count_error(&self, found: usize) -> CommandError {
        CommandError::ArgumentCount {
            command: self.name.to_string(),
            expected: self.arity(),
            found,
        }
    }

    fn kind_error(&self, param: &Param, expected: &'static str) -> CommandError {
        CommandError::ArgumentKind {
            command: self.name.to_string(),
            param: param.name.to_string(),
            expected,
        }
    }

    fn int_arg(&self, param: &Param, arg: &Arg) -> Result<u64, CommandError> {
        match arg {
            Arg::Int(v) => Ok(*v as u64),
            _ => Err(self.kind_error(param, "an integer")),
        }
    }

    /// Encodes the command with `args`, one per parameter in order.
    ///
    /// Omitted trailing result slots are sent as zero. A variadic parameter
    /// takes every remaining argument. The result is padded to a multiple of
    /// four bytes.
    pub fn encode(&self, args: &[Arg]) -> Result<Vec<u8>, CommandError> {
        let mut out = to_bytes(u64::from(self.opcode), 4, ByteOrder::Little);
        let mut rest = args.iter();

        for param in self.params {
            if param.kind == ParamKind::Variadic {
                for arg in rest.by_ref() {
                    let v = self.int_arg(param, arg)?;
                    out.extend(to_bytes(v, 4, ByteOrder::Little));
                }
                continue;
            }

            let arg = match (rest.next(), param.default) {
                (Some(arg), _) => Cow::Borrowed(arg),
                (None, Some(default)) => Cow::Owned(Arg::Int(default)),
                (None, None) => return Err(self.count_error(args.len())),
            };
            match param.kind {
                ParamKind::Int16 => out.extend(to_bytes(self.int_arg(param, &arg)?, 2, ByteOrder::Little)),
                ParamKind::Int32 => out.extend(to_bytes(self.int_arg(param, &arg)?, 4, ByteOrder::Little)),
                ParamKind::Color => {
                    let rgb = extract_bits(self.int_arg(param, &arg)?, 23, 0);
                    out.extend(to_bytes(rgb, 4, ByteOrder::Little));
                }
                ParamKind::Text => match &*arg {
                    Arg::Text(s) => out.extend(encode_text(s)),
                    _ => return Err(self.kind_error(param, "text")),
                },
                ParamKind::Bytes => match &*arg {
                    Arg::Bytes(b) => out.extend_from_slice(b),
                    _ => return Err(self.kind_error(param, "bytes")),
                },
                ParamKind::CountedBytes => match &*arg {
                    Arg::Bytes(b) => {
                        out.extend(to_bytes(b.len() as u64, 4, ByteOrder::Little));
                        out.extend_from_slice(b);
                    }
                    _ => return Err(self.kind_error(param, "bytes")),
                },
                ParamKind::Variadic => unreachable!("handled above"),
            }
        }

        if rest.next().is_some() {
            return Err(self.count_error(args.len()));
        }
        pad_to_word(&mut out);
        Ok(out)
    }
}

/// Streams co-processor commands into device memory, normally the command
/// FIFO.
///
/// The writer holds one write transaction open for its whole lifetime; the
/// engine tracks the FIFO write pointer across commands. Dropping the writer
/// ends the transaction.
pub struct CoprocWriter<'a, W: Write> {
    tx: TransactionGuard<'a, W>,
    sent: usize,
}

impl<'a, W: Write> CoprocWriter<'a, W> {
    /// Opens a write transaction at `address`.
    pub fn new(engine: &'a mut SpiEngine<W>, address: u32) -> Self {
        Self {
            tx: engine.transaction(AccessMode::Write, address),
            sent: 0,
        }
    }

    /// Encodes and sends `command`.
    pub fn send(&mut self, command: &CoprocCommand, args: &[Arg]) -> Result<(), CommandError> {
        let bytes = command.encode(args)?;
        log::trace!(
            "{} ({} bytes) at {:#08x}",
            command.name,
            bytes.len(),
            self.tx.address()
        );
        self.tx.transfer(&bytes, None);
        self.sent += 1;
        Ok(())
    }

    /// Looks up `name` and sends it.
    pub fn command(&mut self, name: &str, args: &[Arg]) -> Result<(), CommandError> {
        let command = find(name).ok_or_else(|| CommandError::UnknownCommand(name.to_string()))?;
        self.send(command, args)
    }

    /// The address the next command is written to.
    pub fn address(&self) -> u32 {
        self.tx.address()
    }

    /// Number of commands sent so far.
    pub fn sent(&self) -> usize {
        self.sent
    }
}
