//! Demonstration command sequences.
//!
//! Each scenario drives one engine through a fixed sequence covering a whole
//! command family, for checking protocol decoders against known traffic.

use std::io::Write;

use evetrace_commands::{host, register, Arg, CommandError, CoprocWriter, DisplayListWriter};
use evetrace_sim::SpiEngine;

use crate::Scenario;

/// PNG data of a one-pixel red image.
pub const RED_DOT_PNG: [u8; 69] = [
    137, 80, 78, 71, 13, 10, 26, 10, 0, 0, 0, 13, 73, 72, 68, 82, 0, 0, 0, 1, 0, 0, 0, 1, 8, 2,
    0, 0, 0, 144, 119, 83, 222, 0, 0, 0, 12, 73, 68, 65, 84, 120, 156, 99, 248, 247, 227, 7, 0,
    5, 230, 2, 239, 238, 216, 252, 77, 0, 0, 0, 0, 73, 69, 78, 68, 174, 66, 96, 130,
];

/// zlib stream of the same image.
pub const RED_DOT_ZLIB: [u8; 10] = [120, 156, 187, 255, 31, 0, 2, 191, 1, 223];

/// Target addresses of the memory-writing scenarios.
#[derive(Clone, Copy, Debug)]
pub struct Addresses {
    /// Where co-processor commands are written.
    pub coproc: u32,
    /// Where display-list words are written.
    pub display_list: u32,
}

impl Scenario {
    /// Every scenario, in generation order.
    pub const ALL: [Scenario; 5] = [
        Scenario::HostCommands,
        Scenario::HostErrors,
        Scenario::Coproc,
        Scenario::DisplayList,
        Scenario::Registers,
    ];

    /// Output file name.
    pub fn file_name(self) -> &'static str {
        match self {
            Scenario::HostCommands => "hostcmd.vcd",
            Scenario::HostErrors => "hostcmd_err.vcd",
            Scenario::Coproc => "coproc.vcd",
            Scenario::DisplayList => "displist.vcd",
            Scenario::Registers => "ramreg.vcd",
        }
    }

    /// Plays the scenario on `engine`.
    pub fn play<W: Write>(self, engine: &mut SpiEngine<W>, addresses: Addresses) -> Result<(), CommandError> {
        match self {
            Scenario::HostCommands => host_commands(engine),
            Scenario::HostErrors => host_errors(engine),
            Scenario::Coproc => coproc(engine, addresses.coproc),
            Scenario::DisplayList => display_list(engine, addresses.display_list),
            Scenario::Registers => registers(engine),
        }
    }
}

fn host_commands<W: Write>(engine: &mut SpiEngine<W>) -> Result<(), CommandError> {
    let sequence: &[(&str, &[u64])] = &[
        ("ACTIVE", &[]),
        ("STANDBY", &[]),
        ("SLEEP", &[]),
        ("PWRDOWN", &[]),
        ("PWRDOWN2", &[]),
        ("PD_ROMS", &[0x05]),
        ("CLKEXT", &[]),
        ("CLKINT", &[]),
        ("CLKSEL", &[0, 0]),
        ("CLKSEL2", &[1, 4]),
        ("RST_PULSE", &[]),
        ("PINDRIVE", &[0x0a, 1]),
        ("PIN_PD_STATE", &[0x10, 2]),
    ];
    for (name, values) in sequence {
        host::send(engine, name, values)?;
    }
    Ok(())
}

fn host_errors<W: Write>(engine: &mut SpiEngine<W>) -> Result<(), CommandError> {
    // reserved clock selections
    host::send(engine, "CLKSEL", &[0, 1])?;
    host::send(engine, "CLKSEL", &[0, 4])?;
    // non-zero parameter and trailing bytes
    engine.frame_host_command(&host::raw_frame(0x44, 0x01, 0x00));
    engine.frame_host_command(&host::raw_frame(0x44, 0x00, 0x01));
    // frame longer than three bytes
    engine.frame_host_command(&[0x44, 0x00, 0x00, 0x01, 0x02]);
    Ok(())
}

fn ints(values: &[i64]) -> Vec<Arg> {
    values.iter().copied().map(Arg::Int).collect()
}

fn with_text(values: &[i64], text: &str) -> Vec<Arg> {
    let mut args = ints(values);
    args.push(Arg::from(text));
    args
}

fn coproc<W: Write>(engine: &mut SpiEngine<W>, address: u32) -> Result<(), CommandError> {
    let mut w = CoprocWriter::new(engine, address);
    w.command("CMD_DLSTART", &[])?;
    w.command("CMD_SWAP", &[])?;
    w.command("CMD_COLDSTART", &[])?;
    w.command("CMD_INTERRUPT", &ints(&[500]))?;
    w.command("CMD_APPEND", &ints(&[0, 40]))?;
    w.command("CMD_REGREAD", &ints(&[0x30_2008, 0]))?;
    w.command("CMD_MEMWRITE", &[Arg::Int(0x30_20d4), Arg::Bytes(vec![0, 0, 0, 100])])?;
    w.command("CMD_INFLATE", &[Arg::Int(0x8000), Arg::from(&RED_DOT_ZLIB[..])])?;
    w.command("CMD_LOADIMAGE", &[Arg::Int(0), Arg::Int(0), Arg::from(&RED_DOT_PNG[..])])?;
    w.command("CMD_MEDIAFIFO", &ints(&[0x10_0000 - 65536, 65536]))?;
    w.command("CMD_VIDEOSTART", &[])?;
    w.command("CMD_VIDEOFRAME", &ints(&[4, 0]))?;
    w.command("CMD_MEMCRC", &ints(&[0, 1024, 0]))?;
    w.command("CMD_MEMZERO", &ints(&[0, 1024]))?;
    w.command("CMD_MEMSET", &ints(&[0, 0xff, 1024]))?;
    w.command("CMD_MEMCPY", &ints(&[0x8000, 0, 1024]))?;
    w.command("CMD_BUTTON", &with_text(&[10, 10, 140, 100, 31, 0], "Press!"))?;
    w.command("CMD_CLOCK", &ints(&[80, 60, 50, 0, 8, 15, 0, 0]))?;
    w.command("CMD_FGCOLOR", &ints(&[0x70_3800]))?;
    w.command("CMD_BGCOLOR", &ints(&[0x40_2000]))?;
    w.command("CMD_GRADCOLOR", &ints(&[0xff_0000]))?;
    w.command("CMD_GAUGE", &ints(&[80, 60, 50, 0, 5, 4, 30, 100]))?;
    w.command("CMD_GRADIENT", &ints(&[0, 0, 0x00_00ff, 160, 0, 0xff_0000]))?;
    w.command("CMD_KEYS", &with_text(&[10, 10, 140, 30, 26, 0], "12345"))?;
    w.command("CMD_PROGRESS", &ints(&[20, 50, 120, 12, 0, 50, 100]))?;
    w.command("CMD_SCROLLBAR", &ints(&[20, 50, 120, 8, 0, 10, 40, 100]))?;
    w.command("CMD_SLIDER", &ints(&[20, 50, 120, 8, 0, 50, 100]))?;
    w.command("CMD_DIAL", &ints(&[80, 60, 55, 0, 0x8000]))?;
    w.command("CMD_TOGGLE", &with_text(&[60, 20, 33, 27, 0, 0], "no\u{ff}yes"))?;
    w.command("CMD_TEXT", &with_text(&[0, 0, 31, 0], "Text!"))?;
    w.command("CMD_SETBASE", &ints(&[16]))?;
    w.command("CMD_NUMBER", &ints(&[20, 60, 31, 0, 42]))?;
    w.command("CMD_LOADIDENTITY", &[])?;
    w.command("CMD_SETMATRIX", &[])?;
    w.command("CMD_GETMATRIX", &[])?;
    w.command("CMD_GETPTR", &ints(&[0]))?;
    w.command("CMD_GETPROPS", &[])?;
    w.command("CMD_SCALE", &ints(&[2 * 65536, 2 * 65536]))?;
    w.command("CMD_ROTATE", &ints(&[10 * 65536 / 360]))?;
    w.command("CMD_TRANSLATE", &ints(&[20 * 65536, 0]))?;
    w.command("CMD_CALIBRATE", &[])?;
    w.command("CMD_SETROTATE", &ints(&[2]))?;
    w.command("CMD_SPINNER", &ints(&[80, 60, 0, 0]))?;
    w.command("CMD_SCREENSAVER", &[])?;
    w.command("CMD_SKETCH", &ints(&[0, 0, 480, 272, 0, 1]))?;
    w.command("CMD_STOP", &[])?;
    w.command("CMD_SETFONT", &ints(&[7, 1000]))?;
    w.command("CMD_SETFONT2", &ints(&[20, 100_000, 32]))?;
    w.command("CMD_SETSCRATCH", &ints(&[31]))?;
    w.command("CMD_ROMFONT", &ints(&[1, 31]))?;
    w.command("CMD_TRACK", &ints(&[60 * 16, 50 * 16, 40, 12, 1]))?;
    w.command("CMD_SNAPSHOT", &ints(&[0]))?;
    w.command("CMD_SNAPSHOT2", &ints(&[7, 0, 0, 0, 32, 32]))?;
    w.command("CMD_SETBITMAP", &ints(&[0, 7, 32, 32]))?;
    w.command("CMD_LOGO", &[])?;
    w.command("CMD_CSKETCH", &ints(&[100, 100, 24, 48, 0, 1, 0]))?;
    // BT81x additions
    w.command("CMD_FLASHATTACH", &[])?;
    w.command("CMD_FLASHFAST", &[])?;
    w.command("CMD_FLASHREAD", &ints(&[0, 4096, 256]))?;
    w.command("CMD_FLASHSOURCE", &ints(&[4096]))?;
    w.command("CMD_APPENDF", &ints(&[4096, 64]))?;
    w.command("CMD_CLEARCACHE", &[])?;
    w.command("CMD_RESETFONTS", &[])?;
    w.command("CMD_ROTATEAROUND", &ints(&[80, 60, 0x4000, 65536]))?;
    w.command("CMD_GRADIENTA", &ints(&[0, 0, 0x8000_00ff, 160, 0, 0xffff_0000]))?;
    w.command("CMD_ANIMSTART", &ints(&[1, 4096, 0]))?;
    w.command("CMD_ANIMXY", &ints(&[1, 80, 60]))?;
    w.command("CMD_ANIMDRAW", &ints(&[1]))?;
    w.command("CMD_ANIMFRAME", &ints(&[80, 60, 4096, 3]))?;
    w.command("CMD_ANIMSTOP", &ints(&[1]))?;
    w.command("CMD_SYNC", &[])?;
    w.command("CMD_FLASHDETACH", &[])?;
    log::debug!("{} co-processor commands, FIFO at {:#08x}", w.sent(), w.address());
    Ok(())
}

fn display_list<W: Write>(engine: &mut SpiEngine<W>, address: u32) -> Result<(), CommandError> {
    let sequence: &[(&str, &[u64])] = &[
        ("ALPHA_FUNC", &[1, 10]),
        ("BEGIN", &[3]),
        ("BITMAP_HANDLE", &[4]),
        ("BITMAP_LAYOUT", &[2, 32, 32]),
        ("BITMAP_LAYOUT_H", &[1, 1]),
        ("BITMAP_SIZE", &[1, 1, 1, 100, 100]),
        ("BITMAP_SIZE_H", &[1, 1]),
        ("BITMAP_SOURCE", &[0x1234]),
        ("BITMAP_SWIZZLE", &[0, 1, 2, 3]),
        ("BITMAP_TRANSFORM_A", &[0, 0x1000]),
        ("BITMAP_TRANSFORM_B", &[1, 0x1000]),
        ("BITMAP_TRANSFORM_C", &[0x10_0000]),
        ("BITMAP_TRANSFORM_D", &[0, 0x1020]),
        ("BITMAP_TRANSFORM_E", &[1, 0x1020]),
        ("BITMAP_TRANSFORM_F", &[0x10_2030]),
        ("BLEND_FUNC", &[1, 2]),
        ("CALL", &[0x1234]),
        ("CELL", &[12]),
        ("CLEAR", &[1, 0, 0]),
        ("CLEAR_COLOR_A", &[0xaa]),
        ("CLEAR_COLOR_RGB", &[0x11, 0x22, 0x33]),
        ("CLEAR_STENCIL", &[0x55]),
        ("CLEAR_TAG", &[0xaa]),
        ("COLOR_A", &[0xaa]),
        ("COLOR_MASK", &[1, 0, 1, 0]),
        ("COLOR_RGB", &[0x11, 0x22, 0x33]),
        ("DISPLAY", &[]),
        ("END", &[]),
        ("JUMP", &[0x30_8030]),
        ("LINE_WIDTH", &[16]),
        ("MACRO", &[1]),
        ("NOP", &[]),
        ("PALETTE_SOURCE", &[0x1234]),
        ("POINT_SIZE", &[30]),
        ("RESTORE_CONTEXT", &[]),
        ("RETURN", &[]),
        ("SAVE_CONTEXT", &[]),
        ("SCISSOR_SIZE", &[20, 30]),
        ("SCISSOR_XY", &[100, 200]),
        ("STENCIL_FUNC", &[1, 2, 3]),
        ("STENCIL_MASK", &[123]),
        ("STENCIL_OP", &[1, 2]),
        ("TAG", &[100]),
        ("TAG_MASK", &[1]),
        ("VERTEX2F", &[0x1100, 0x2200]),
        ("VERTEX2II", &[100, 200, 3, 4]),
        ("VERTEX_FORMAT", &[1]),
        ("VERTEX_TRANSLATE_X", &[100]),
        ("VERTEX_TRANSLATE_Y", &[100]),
    ];
    let mut w = DisplayListWriter::new(engine, address);
    for (name, values) in sequence {
        w.command(name, values)?;
    }
    Ok(())
}

/// Register accesses: `Some(value)` writes, `None` reads the reset value.
const REGISTER_SEQUENCE: &[(&str, Option<u64>)] = &[
    ("REG_ID", None),
    ("REG_FRAMES", None),
    ("REG_CLOCK", None),
    ("REG_FREQUENCY", Some(10_000_000)),
    ("REG_RENDERMODE", Some(1)),
    ("REG_SNAPY", Some(4)),
    ("REG_SNAPSHOT", Some(1)),
    ("REG_SNAPFORMAT", Some(10)),
    ("REG_CPURESET", Some(4)),
    ("REG_TAP_CRC", None),
    ("REG_TAP_MASK", Some(0x0fff_ffff)),
    ("REG_HCYCLE", Some(0x224)),
    ("REG_HOFFSET", Some(0x02b)),
    ("REG_HSIZE", Some(0x1e0)),
    ("REG_HSYNC0", Some(0x000)),
    ("REG_HSYNC1", Some(0x029)),
    ("REG_VCYCLE", Some(0x124)),
    ("REG_VOFFSET", Some(0x00c)),
    ("REG_VSIZE", Some(0x110)),
    ("REG_VSYNC0", Some(0x000)),
    ("REG_VSYNC1", Some(0x00a)),
    ("REG_DLSWAP", Some(0)),
    ("REG_ROTATE", Some(0)),
    ("REG_OUTBITS", Some(0)),
    ("REG_DITHER", Some(1)),
    ("REG_SWIZZLE", Some(0)),
    ("REG_CSPREAD", Some(1)),
    ("REG_PCLK_POL", Some(0)),
    ("REG_PCLK", Some(0)),
    ("REG_TAG_X", Some(0)),
    ("REG_TAG_Y", Some(0)),
    ("REG_TAG", None),
    ("REG_VOL_PB", Some(0xff)),
    ("REG_VOL_SOUND", Some(0xff)),
    ("REG_SOUND", Some(0)),
    ("REG_PLAY", Some(0)),
    ("REG_GPIO_DIR", Some(0x80)),
    ("REG_GPIO", Some(0)),
    ("REG_GPIOX_DIR", Some(0x8000)),
    ("REG_GPIOX", Some(0x0080)),
    ("REG_INT_FLAGS", None),
    ("REG_INT_EN", Some(0)),
    ("REG_INT_MASK", Some(0xff)),
    ("REG_PLAYBACK_START", Some(0)),
    ("REG_PLAYBACK_LENGTH", Some(0)),
    ("REG_PLAYBACK_READPTR", None),
    ("REG_PLAYBACK_FREQ", Some(8000)),
    ("REG_PLAYBACK_FORMAT", Some(0)),
    ("REG_PLAYBACK_LOOP", Some(1)),
    ("REG_PLAYBACK_PLAY", Some(1)),
    ("REG_PWM_HZ", Some(250)),
    ("REG_PWM_DUTY", Some(128)),
    ("REG_MACRO_0", Some(0)),
    ("REG_MACRO_1", Some(0)),
    ("REG_CMD_READ", Some(0)),
    ("REG_CMD_WRITE", None),
    ("REG_CMD_DL", Some(0)),
    ("REG_TOUCH_MODE", Some(3)),
    ("REG_TOUCH_ADC_MODE", Some(1)),
    ("REG_CTOUCH_EXTENDED", Some(1)),
    ("REG_TOUCH_CHARGE", Some(9000)),
    ("REG_TOUCH_SETTLE", Some(3)),
    ("REG_TOUCH_OVERSAMPLE", Some(7)),
    ("REG_TOUCH_RZTHRESH", Some(0xffff)),
    ("REG_TOUCH_RAW_XY", None),
    ("REG_CTOUCH_TOUCH1_XY", None),
    ("REG_TOUCH_RZ", None),
    ("REG_CTOUCH_TOUCH4_Y", None),
    ("REG_TOUCH_SCREEN_XY", None),
    ("REG_CTOUCH_TOUCH0_XY", None),
    ("REG_TOUCH_TAG_XY", None),
    ("REG_TOUCH_TAG", None),
    ("REG_TOUCH_TAG1_XY", None),
    ("REG_TOUCH_TAG1", None),
    ("REG_TOUCH_TAG2_XY", None),
    ("REG_TOUCH_TAG2", None),
    ("REG_TOUCH_TAG3_XY", None),
    ("REG_TOUCH_TAG3", None),
    ("REG_TOUCH_TAG4_XY", None),
    ("REG_TOUCH_TAG4", None),
    ("REG_TOUCH_TRANSFORM_A", Some(0x0001_0000)),
    ("REG_TOUCH_TRANSFORM_B", Some(0)),
    ("REG_TOUCH_TRANSFORM_C", Some(0)),
    ("REG_TOUCH_TRANSFORM_D", Some(0)),
    ("REG_TOUCH_TRANSFORM_E", Some(0x0001_0000)),
    ("REG_TOUCH_TRANSFORM_F", Some(0)),
    ("REG_TOUCH_CONFIG", Some(0x0381)),
    ("REG_CTOUCH_TOUCH4_X", None),
    ("REG_BIST_EN", Some(0)),
    ("REG_TRIM", Some(0)),
    ("REG_ANA_COMP", Some(0)),
    ("REG_SPI_WIDTH", Some(0)),
    ("REG_TOUCH_DIRECT_XY", None),
    ("REG_CTOUCH_TOUCH2_XY", None),
    ("REG_TOUCH_DIRECT_Z1Z2", None),
    ("REG_CTOUCH_TOUCH3_XY", None),
];

fn registers<W: Write>(engine: &mut SpiEngine<W>) -> Result<(), CommandError> {
    for &(name, value) in REGISTER_SEQUENCE {
        match value {
            Some(v) => register::write(engine, name, v)?,
            None => register::read(engine, name, None)?,
        }
    }
    let datestamp = register::find("REG_DATESTAMP")
        .ok_or_else(|| CommandError::UnknownRegister("REG_DATESTAMP".to_string()))?;
    datestamp.read_words(engine, &[0x0123_4567, 0x89ab_cdef, 0x0123_4567, 0x89ab_cdef])?;
    register::write(engine, "REG_CMDB_SPACE", 0xffc)?;
    register::write(engine, "REG_CMDB_WRITE", 0)?;
    register::write(engine, "REG_ADAPTIVE_FRAMERATE", 1)?;
    register::write(engine, "REG_PLAYBACK_PAUSE", 0)?;
    register::write(engine, "REG_FLASH_STATUS", 2)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use evetrace_sim::TraceHeader;

    const ADDRESSES: Addresses = Addresses {
        coproc: 0x30_8000,
        display_list: 0x30_0000,
    };

    fn play(scenario: Scenario) -> SpiEngine<Vec<u8>> {
        let mut engine = SpiEngine::new(Vec::new(), &TraceHeader::with_date("t")).unwrap();
        scenario.play(&mut engine, ADDRESSES).unwrap();
        engine
    }

    #[test]
    fn every_scenario_plays() {
        for scenario in Scenario::ALL {
            let engine = play(scenario);
            let out = String::from_utf8(engine.finish().unwrap()).unwrap();
            assert!(out.contains("$enddefinitions $end"), "{scenario:?}");
        }
    }

    #[test]
    fn file_names_are_distinct() {
        let mut names: Vec<&str> = Scenario::ALL.iter().map(|s| s.file_name()).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), 5);
    }

    #[test]
    fn host_scenarios_never_open_memory_transactions() {
        assert_eq!(play(Scenario::HostCommands).transactions_opened(), 0);
        assert_eq!(play(Scenario::HostErrors).transactions_opened(), 0);
    }

    #[test]
    fn coproc_is_one_burst() {
        assert_eq!(play(Scenario::Coproc).transactions_opened(), 1);
    }

    #[test]
    fn display_list_is_one_burst() {
        let engine = play(Scenario::DisplayList);
        assert_eq!(engine.transactions_opened(), 1);
        assert_eq!(engine.active_transaction(), None);
    }

    #[test]
    fn every_register_is_visited() {
        let visited: Vec<&str> = REGISTER_SEQUENCE.iter().map(|(n, _)| *n).collect();
        for r in evetrace_commands::REGISTERS {
            let aliased = evetrace_commands::REGISTER_ALIASES
                .iter()
                .any(|(_, target)| *target == r.name);
            let tail = ["REG_DATESTAMP", "REG_CMDB_SPACE", "REG_CMDB_WRITE", "REG_ADAPTIVE_FRAMERATE", "REG_PLAYBACK_PAUSE", "REG_FLASH_STATUS"];
            assert!(
                visited.contains(&r.name) || aliased || tail.contains(&r.name),
                "{}",
                r.name
            );
        }
    }

    #[test]
    fn register_sequence_respects_access() {
        for &(name, value) in REGISTER_SEQUENCE {
            let r = register::find(name).unwrap();
            match value {
                Some(_) => assert_ne!(r.access, evetrace_commands::Access::ReadOnly, "{name}"),
                None => assert_ne!(r.access, evetrace_commands::Access::WriteOnly, "{name}"),
            }
        }
    }
}
