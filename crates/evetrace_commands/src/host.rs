//! Host commands.
//!
//! A host command is a three-byte frame `[opcode, parameter, 0x00]` sent with
//! its own chip-select cycle. The parameter byte packs the command's fields;
//! commands without fields send zero.

use std::io::Write;

use evetrace_common::pack_fields;
use evetrace_sim::SpiEngine;
use serde::Serialize;

use crate::error::CommandError;
use crate::{check_count, name_matches, Field};

/// Descriptor of one host command.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct HostCommand {
    /// Command name.
    pub name: &'static str,
    /// First byte of the frame.
    pub opcode: u8,
    /// Fields packed into the second byte.
    pub fields: &'static [Field],
}

/// Every host command of the FT80x/FT81x/BT81x families.
pub const HOST_COMMANDS: &[HostCommand] = &[
    HostCommand { name: "ACTIVE", opcode: 0x00, fields: &[] },
    HostCommand { name: "STANDBY", opcode: 0x41, fields: &[] },
    HostCommand { name: "SLEEP", opcode: 0x42, fields: &[] },
    HostCommand { name: "PWRDOWN", opcode: 0x43, fields: &[] },
    HostCommand { name: "PWRDOWN2", opcode: 0x50, fields: &[] },
    HostCommand { name: "PD_ROMS", opcode: 0x49, fields: &[Field::new("roms", 7, 3)] },
    HostCommand { name: "CLKEXT", opcode: 0x44, fields: &[] },
    HostCommand { name: "CLKINT", opcode: 0x48, fields: &[] },
    HostCommand {
        name: "CLKSEL",
        opcode: 0x61,
        fields: &[Field::new("pll", 7, 6), Field::new("freq", 5, 0)],
    },
    HostCommand {
        name: "CLKSEL2",
        opcode: 0x62,
        fields: &[Field::new("pll", 7, 6), Field::new("freq", 5, 0)],
    },
    HostCommand { name: "RST_PULSE", opcode: 0x68, fields: &[] },
    HostCommand {
        name: "PINDRIVE",
        opcode: 0x70,
        fields: &[Field::new("pin", 7, 2), Field::new("strength", 1, 0)],
    },
    HostCommand {
        name: "PIN_PD_STATE",
        opcode: 0x71,
        fields: &[Field::new("pin", 7, 2), Field::new("setting", 1, 0)],
    },
];

/// Looks up a host command by name.
pub fn find(name: &str) -> Option<&'static HostCommand> {
    HOST_COMMANDS.iter().find(|c| name_matches(c.name, "", name))
}

/// Builds a host command frame from explicit bytes.
pub fn raw_frame(opcode: u8, parameter: u8, trailer: u8) -> [u8; 3] {
    [opcode, parameter, trailer]
}

impl HostCommand {
    /// Encodes the frame, one value per field in declaration order.
    ///
    /// Values wider than their field are truncated.
    pub fn encode(&self, values: &[u64]) -> Result<[u8; 3], CommandError> {
        check_count(self.name, self.fields.len(), values.len())?;
        let packed: Vec<(u64, _)> = values
            .iter()
            .zip(self.fields)
            .map(|(&v, f)| (v, f.range))
            .collect();
        Ok(raw_frame(self.opcode, pack_fields(&packed) as u8, 0x00))
    }

    /// Encodes the command and frames it on `engine`.
    pub fn send<W: Write>(&self, engine: &mut SpiEngine<W>, values: &[u64]) -> Result<(), CommandError> {
        let frame = self.encode(values)?;
        log::trace!("host {} {:02x?}", self.name, frame);
        engine.frame_host_command(&frame);
        Ok(())
    }
}

/// Sends the host command `name` with `values`.
pub fn send<W: Write>(engine: &mut SpiEngine<W>, name: &str, values: &[u64]) -> Result<(), CommandError> {
    find(name)
        .ok_or_else(|| CommandError::UnknownCommand(name.to_string()))?
        .send(engine, values)
}

#[cfg(test)]
mod tests {
    use super::*;
    use evetrace_sim::TraceHeader;

    #[test]
    fn catalogue_has_every_command() {
        assert_eq!(HOST_COMMANDS.len(), 13);
        let mut opcodes: Vec<u8> = HOST_COMMANDS.iter().map(|c| c.opcode).collect();
        opcodes.sort_unstable();
        opcodes.dedup();
        assert_eq!(opcodes.len(), 13);
    }

    #[test]
    fn active_is_all_zero() {
        assert_eq!(find("active").unwrap().encode(&[]).unwrap(), [0, 0, 0]);
    }

    #[test]
    fn clksel_packs_fields() {
        let frame = find("CLKSEL2").unwrap().encode(&[1, 4]).unwrap();
        assert_eq!(frame, [0x62, 0x44, 0x00]);
    }

    #[test]
    fn pd_roms_shifts_into_top_bits() {
        let frame = find("pd_roms").unwrap().encode(&[0x05]).unwrap();
        assert_eq!(frame, [0x49, 0x28, 0x00]);
    }

    #[test]
    fn pindrive_and_pin_pd_state() {
        assert_eq!(
            find("PINDRIVE").unwrap().encode(&[0x0a, 1]).unwrap(),
            [0x70, 0x29, 0x00]
        );
        assert_eq!(
            find("PIN_PD_STATE").unwrap().encode(&[0x10, 2]).unwrap(),
            [0x71, 0x42, 0x00]
        );
    }

    #[test]
    fn oversized_field_truncates() {
        // freq is 6 bits wide
        let frame = find("CLKSEL").unwrap().encode(&[0, 0x7f]).unwrap();
        assert_eq!(frame[1], 0x3f);
    }

    #[test]
    fn wrong_value_count() {
        let err = find("CLKSEL").unwrap().encode(&[1]).unwrap_err();
        assert!(matches!(err, CommandError::ArgumentCount { expected, found: 1, .. } if expected == "2"));
    }

    #[test]
    fn unknown_name() {
        let mut engine = SpiEngine::new(Vec::new(), &TraceHeader::with_date("t")).unwrap();
        assert!(matches!(
            send(&mut engine, "BOGUS", &[]),
            Err(CommandError::UnknownCommand(_))
        ));
        assert_eq!(engine.now().ticks(), 1);
    }

    #[test]
    fn send_frames_on_engine() {
        let mut engine = SpiEngine::new(Vec::new(), &TraceHeader::with_date("t")).unwrap();
        send(&mut engine, "standby", &[]).unwrap();
        // 24 bits, idle settle, frame gap
        assert_eq!(engine.now().ticks(), 1 + 48 + 1 + 4);
        assert_eq!(engine.transactions_opened(), 0);
    }

    #[test]
    fn raw_frame_keeps_bytes() {
        assert_eq!(raw_frame(0x44, 0x00, 0x01), [0x44, 0x00, 0x01]);
    }

    #[test]
    fn serializes_to_json() {
        let json = serde_json::to_value(find("CLKSEL").unwrap()).unwrap();
        assert_eq!(json["opcode"], 0x61);
        assert_eq!(json["fields"][1]["name"], "freq");
        assert_eq!(json["fields"][1]["range"]["msb"], 5);
    }
}
