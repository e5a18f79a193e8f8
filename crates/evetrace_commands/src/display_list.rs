//! Display-list commands.
//!
//! Every display-list command is one 32-bit word sent little-endian. The
//! opcode normally occupies bits `[31:24]`; `VERTEX2F` and `VERTEX2II` use a
//! two-bit opcode in `[31:30]` to leave room for their coordinates.

use std::io::Write;

use evetrace_common::{pack_fields, to_bytes, BitRange, ByteOrder};
use evetrace_sim::{AccessMode, SpiEngine, TransactionGuard};
use serde::Serialize;

use crate::error::CommandError;
use crate::{check_count, name_matches, Field};

const OPCODE_BYTE: BitRange = BitRange::new(31, 24);
const OPCODE_VERTEX: BitRange = BitRange::new(31, 30);

/// Descriptor of one display-list command.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct DisplayListCommand {
    /// Command name.
    pub name: &'static str,
    /// Opcode value, placed at `opcode_bits`.
    pub opcode: u8,
    /// Bits holding the opcode.
    pub opcode_bits: BitRange,
    /// Parameter fields.
    pub fields: &'static [Field],
}

/// Every display-list command of the FT80x/FT81x/BT81x families.
pub const DISPLAY_LIST_COMMANDS: &[DisplayListCommand] = &[
    DisplayListCommand {
        name: "ALPHA_FUNC",
        opcode: 0x09,
        opcode_bits: OPCODE_BYTE,
        fields: &[Field::new("func", 10, 8), Field::new("ref", 7, 0)],
    },
    DisplayListCommand {
        name: "BEGIN",
        opcode: 0x1f,
        opcode_bits: OPCODE_BYTE,
        fields: &[Field::new("prim", 3, 0)],
    },
    DisplayListCommand {
        name: "BITMAP_HANDLE",
        opcode: 0x05,
        opcode_bits: OPCODE_BYTE,
        fields: &[Field::new("handle", 4, 0)],
    },
    DisplayListCommand {
        name: "BITMAP_LAYOUT",
        opcode: 0x07,
        opcode_bits: OPCODE_BYTE,
        fields: &[
            Field::new("format", 23, 19),
            Field::new("linestride", 18, 9),
            Field::new("height", 8, 0),
        ],
    },
    DisplayListCommand {
        name: "BITMAP_LAYOUT_H",
        opcode: 0x28,
        opcode_bits: OPCODE_BYTE,
        fields: &[Field::new("linestride", 3, 2), Field::new("height", 1, 0)],
    },
    DisplayListCommand {
        name: "BITMAP_SIZE",
        opcode: 0x08,
        opcode_bits: OPCODE_BYTE,
        fields: &[
            Field::bit("filter", 20),
            Field::bit("wrapx", 19),
            Field::bit("wrapy", 18),
            Field::new("width", 17, 9),
            Field::new("height", 8, 0),
        ],
    },
    DisplayListCommand {
        name: "BITMAP_SIZE_H",
        opcode: 0x29,
        opcode_bits: OPCODE_BYTE,
        fields: &[Field::new("width", 3, 2), Field::new("height", 1, 0)],
    },
    DisplayListCommand {
        name: "BITMAP_SOURCE",
        opcode: 0x01,
        opcode_bits: OPCODE_BYTE,
        fields: &[Field::new("addr", 21, 0)],
    },
    DisplayListCommand {
        name: "BITMAP_SWIZZLE",
        opcode: 0x2f,
        opcode_bits: OPCODE_BYTE,
        fields: &[
            Field::new("r", 11, 9),
            Field::new("g", 8, 6),
            Field::new("b", 5, 3),
            Field::new("a", 2, 0),
        ],
    },
    DisplayListCommand {
        name: "BITMAP_TRANSFORM_A",
        opcode: 0x15,
        opcode_bits: OPCODE_BYTE,
        fields: &[Field::bit("p", 17), Field::new("v", 16, 0)],
    },
    DisplayListCommand {
        name: "BITMAP_TRANSFORM_B",
        opcode: 0x16,
        opcode_bits: OPCODE_BYTE,
        fields: &[Field::bit("p", 17), Field::new("v", 16, 0)],
    },
    DisplayListCommand {
        name: "BITMAP_TRANSFORM_C",
        opcode: 0x17,
        opcode_bits: OPCODE_BYTE,
        fields: &[Field::new("c", 23, 0)],
    },
    DisplayListCommand {
        name: "BITMAP_TRANSFORM_D",
        opcode: 0x18,
        opcode_bits: OPCODE_BYTE,
        fields: &[Field::bit("p", 17), Field::new("v", 16, 0)],
    },
    DisplayListCommand {
        name: "BITMAP_TRANSFORM_E",
        opcode: 0x19,
        opcode_bits: OPCODE_BYTE,
        fields: &[Field::bit("p", 17), Field::new("v", 16, 0)],
    },
    DisplayListCommand {
        name: "BITMAP_TRANSFORM_F",
        opcode: 0x1a,
        opcode_bits: OPCODE_BYTE,
        fields: &[Field::new("f", 23, 0)],
    },
    DisplayListCommand {
        name: "BLEND_FUNC",
        opcode: 0x0b,
        opcode_bits: OPCODE_BYTE,
        fields: &[Field::new("src", 5, 3), Field::new("dst", 2, 0)],
    },
    DisplayListCommand {
        name: "CALL",
        opcode: 0x1d,
        opcode_bits: OPCODE_BYTE,
        fields: &[Field::new("dest", 15, 0)],
    },
    DisplayListCommand {
        name: "CELL",
        opcode: 0x06,
        opcode_bits: OPCODE_BYTE,
        fields: &[Field::new("cell", 6, 0)],
    },
    DisplayListCommand {
        name: "CLEAR",
        opcode: 0x26,
        opcode_bits: OPCODE_BYTE,
        fields: &[Field::bit("c", 2), Field::bit("s", 1), Field::bit("t", 0)],
    },
    DisplayListCommand {
        name: "CLEAR_COLOR_A",
        opcode: 0x0f,
        opcode_bits: OPCODE_BYTE,
        fields: &[Field::new("alpha", 7, 0)],
    },
    DisplayListCommand {
        name: "CLEAR_COLOR_RGB",
        opcode: 0x02,
        opcode_bits: OPCODE_BYTE,
        fields: &[
            Field::new("red", 23, 16),
            Field::new("green", 15, 8),
            Field::new("blue", 7, 0),
        ],
    },
    DisplayListCommand {
        name: "CLEAR_STENCIL",
        opcode: 0x11,
        opcode_bits: OPCODE_BYTE,
        fields: &[Field::new("s", 7, 0)],
    },
    DisplayListCommand {
        name: "CLEAR_TAG",
        opcode: 0x12,
        opcode_bits: OPCODE_BYTE,
        fields: &[Field::new("t", 7, 0)],
    },
    DisplayListCommand {
        name: "COLOR_A",
        opcode: 0x10,
        opcode_bits: OPCODE_BYTE,
        fields: &[Field::new("alpha", 7, 0)],
    },
    DisplayListCommand {
        name: "COLOR_MASK",
        opcode: 0x20,
        opcode_bits: OPCODE_BYTE,
        fields: &[
            Field::bit("r", 3),
            Field::bit("g", 2),
            Field::bit("b", 1),
            Field::bit("a", 0),
        ],
    },
    DisplayListCommand {
        name: "COLOR_RGB",
        opcode: 0x04,
        opcode_bits: OPCODE_BYTE,
        fields: &[
            Field::new("red", 23, 16),
            Field::new("green", 15, 8),
            Field::new("blue", 7, 0),
        ],
    },
    DisplayListCommand { name: "DISPLAY", opcode: 0x00, opcode_bits: OPCODE_BYTE, fields: &[] },
    DisplayListCommand { name: "END", opcode: 0x21, opcode_bits: OPCODE_BYTE, fields: &[] },
    DisplayListCommand {
        name: "JUMP",
        opcode: 0x1e,
        opcode_bits: OPCODE_BYTE,
        fields: &[Field::new("dest", 15, 0)],
    },
    DisplayListCommand {
        name: "LINE_WIDTH",
        opcode: 0x0e,
        opcode_bits: OPCODE_BYTE,
        fields: &[Field::new("width", 11, 0)],
    },
    DisplayListCommand {
        name: "MACRO",
        opcode: 0x25,
        opcode_bits: OPCODE_BYTE,
        fields: &[Field::bit("m", 0)],
    },
    DisplayListCommand { name: "NOP", opcode: 0x2d, opcode_bits: OPCODE_BYTE, fields: &[] },
    DisplayListCommand {
        name: "PALETTE_SOURCE",
        opcode: 0x2a,
        opcode_bits: OPCODE_BYTE,
        fields: &[Field::new("addr", 21, 0)],
    },
    DisplayListCommand {
        name: "POINT_SIZE",
        opcode: 0x0d,
        opcode_bits: OPCODE_BYTE,
        fields: &[Field::new("size", 12, 0)],
    },
    DisplayListCommand { name: "RESTORE_CONTEXT", opcode: 0x23, opcode_bits: OPCODE_BYTE, fields: &[] },
    DisplayListCommand { name: "RETURN", opcode: 0x24, opcode_bits: OPCODE_BYTE, fields: &[] },
    DisplayListCommand { name: "SAVE_CONTEXT", opcode: 0x22, opcode_bits: OPCODE_BYTE, fields: &[] },
    DisplayListCommand {
        name: "SCISSOR_SIZE",
        opcode: 0x1c,
        opcode_bits: OPCODE_BYTE,
        fields: &[Field::new("width", 23, 12), Field::new("height", 11, 0)],
    },
    DisplayListCommand {
        name: "SCISSOR_XY",
        opcode: 0x1b,
        opcode_bits: OPCODE_BYTE,
        fields: &[Field::new("x", 21, 11), Field::new("y", 10, 0)],
    },
    DisplayListCommand {
        name: "STENCIL_FUNC",
        opcode: 0x0a,
        opcode_bits: OPCODE_BYTE,
        fields: &[
            Field::new("func", 19, 16),
            Field::new("ref", 15, 8),
            Field::new("mask", 7, 0),
        ],
    },
    DisplayListCommand {
        name: "STENCIL_MASK",
        opcode: 0x13,
        opcode_bits: OPCODE_BYTE,
        fields: &[Field::new("mask", 7, 0)],
    },
    DisplayListCommand {
        name: "STENCIL_OP",
        opcode: 0x0c,
        opcode_bits: OPCODE_BYTE,
        fields: &[Field::new("sfail", 5, 3), Field::new("spass", 2, 0)],
    },
    DisplayListCommand {
        name: "TAG",
        opcode: 0x03,
        opcode_bits: OPCODE_BYTE,
        fields: &[Field::new("s", 7, 0)],
    },
    DisplayListCommand {
        name: "TAG_MASK",
        opcode: 0x14,
        opcode_bits: OPCODE_BYTE,
        fields: &[Field::bit("mask", 0)],
    },
    DisplayListCommand {
        name: "VERTEX2F",
        opcode: 0b01,
        opcode_bits: OPCODE_VERTEX,
        fields: &[Field::new("x", 29, 15), Field::new("y", 14, 0)],
    },
    DisplayListCommand {
        name: "VERTEX2II",
        opcode: 0b10,
        opcode_bits: OPCODE_VERTEX,
        fields: &[
            Field::new("x", 29, 21),
            Field::new("y", 20, 12),
            Field::new("handle", 11, 7),
            Field::new("cell", 6, 0),
        ],
    },
    DisplayListCommand {
        name: "VERTEX_FORMAT",
        opcode: 0x27,
        opcode_bits: OPCODE_BYTE,
        fields: &[Field::new("frac", 2, 0)],
    },
    DisplayListCommand {
        name: "VERTEX_TRANSLATE_X",
        opcode: 0x2b,
        opcode_bits: OPCODE_BYTE,
        fields: &[Field::new("x", 16, 0)],
    },
    DisplayListCommand {
        name: "VERTEX_TRANSLATE_Y",
        opcode: 0x2c,
        opcode_bits: OPCODE_BYTE,
        fields: &[Field::new("y", 16, 0)],
    },
];

/// Looks up a display-list command by name.
pub fn find(name: &str) -> Option<&'static DisplayListCommand> {
    DISPLAY_LIST_COMMANDS
        .iter()
        .find(|c| name_matches(c.name, "", name))
}

impl DisplayListCommand {
    /// Packs the command word, one value per field in declaration order.
    pub fn encode(&self, values: &[u64]) -> Result<u32, CommandError> {
        check_count(self.name, self.fields.len(), values.len())?;
        let mut packed = vec![(u64::from(self.opcode), self.opcode_bits)];
        packed.extend(values.iter().zip(self.fields).map(|(&v, f)| (v, f.range)));
        Ok(pack_fields(&packed) as u32)
    }
}

/// Writes display-list words into device memory.
///
/// Like [`CoprocWriter`](crate::CoprocWriter), the writer holds one write
/// transaction for its lifetime and ends it when dropped.
pub struct DisplayListWriter<'a, W: Write> {
    tx: TransactionGuard<'a, W>,
}

impl<'a, W: Write> DisplayListWriter<'a, W> {
    /// Opens a write transaction at `address`.
    pub fn new(engine: &'a mut SpiEngine<W>, address: u32) -> Self {
        Self {
            tx: engine.transaction(AccessMode::Write, address),
        }
    }

    /// Encodes and sends `command`.
    pub fn send(&mut self, command: &DisplayListCommand, values: &[u64]) -> Result<(), CommandError> {
        let word = command.encode(values)?;
        log::trace!("{} {word:#010x}", command.name);
        self.tx
            .transfer(&to_bytes(u64::from(word), 4, ByteOrder::Little), None);
        Ok(())
    }

    /// Looks up `name` and sends it.
    pub fn command(&mut self, name: &str, values: &[u64]) -> Result<(), CommandError> {
        let command = find(name).ok_or_else(|| CommandError::UnknownCommand(name.to_string()))?;
        self.send(command, values)
    }

    /// The address the next word is written to.
    pub fn address(&self) -> u32 {
        self.tx.address()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use evetrace_sim::TraceHeader;

    fn word(name: &str, values: &[u64]) -> u32 {
        find(name).unwrap().encode(values).unwrap()
    }

    #[test]
    fn opcodes_are_unique_per_width() {
        let mut seen = std::collections::HashSet::new();
        for c in DISPLAY_LIST_COMMANDS {
            assert!(seen.insert((c.opcode, c.opcode_bits)), "{}", c.name);
        }
    }

    #[test]
    fn fields_stay_below_opcode() {
        for c in DISPLAY_LIST_COMMANDS {
            for f in c.fields {
                assert!(f.range.msb < c.opcode_bits.lsb, "{}.{}", c.name, f.name);
            }
        }
    }

    #[test]
    fn display_is_zero() {
        assert_eq!(word("DISPLAY", &[]), 0);
    }

    #[test]
    fn alpha_func() {
        assert_eq!(word("alpha_func", &[1, 10]), 0x0900_010a);
    }

    #[test]
    fn clear_color_rgb_channels() {
        assert_eq!(word("CLEAR_COLOR_RGB", &[0x11, 0x22, 0x33]), 0x0211_2233);
    }

    #[test]
    fn vertex2f_uses_two_bit_opcode() {
        assert_eq!(word("VERTEX2F", &[0x1100, 0x2200]), 0x4000_0000 | (0x1100 << 15) | 0x2200);
    }

    #[test]
    fn vertex2ii_fields() {
        let w = word("VERTEX2II", &[100, 200, 3, 4]);
        assert_eq!(w >> 30, 0b10);
        assert_eq!((w >> 21) & 0x1ff, 100);
        assert_eq!((w >> 12) & 0x1ff, 200);
        assert_eq!((w >> 7) & 0x1f, 3);
        assert_eq!(w & 0x7f, 4);
    }

    #[test]
    fn translate_y_has_own_opcode() {
        assert_eq!(word("VERTEX_TRANSLATE_X", &[100]) >> 24, 0x2b);
        assert_eq!(word("VERTEX_TRANSLATE_Y", &[100]) >> 24, 0x2c);
    }

    #[test]
    fn jump_truncates_destination() {
        assert_eq!(word("JUMP", &[0x308030]), 0x1e00_8030);
    }

    #[test]
    fn wrong_field_count() {
        assert!(matches!(
            find("BEGIN").unwrap().encode(&[]),
            Err(CommandError::ArgumentCount { found: 0, .. })
        ));
    }

    #[test]
    fn writer_sends_little_endian_words() {
        let mut engine = SpiEngine::new(Vec::new(), &TraceHeader::with_date("t")).unwrap();
        {
            let mut w = DisplayListWriter::new(&mut engine, 0x30_0000);
            w.command("CLEAR", &[1, 1, 1]).unwrap();
            w.command("DISPLAY", &[]).unwrap();
            assert_eq!(w.address(), 0x30_0008);
            assert!(w.command("POLYGON", &[]).is_err());
        }
        assert_eq!(engine.transactions_opened(), 1);
        assert_eq!(engine.active_transaction(), None);
    }
}
