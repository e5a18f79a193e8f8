//! Memory-mapped registers.
//!
//! Registers are 32-bit words in the register file at `0x302000`. Values are
//! masked to the register width and sent little-endian. A read clocks out
//! `ff ff ff ff` on MOSI while the device answers on MISO; when no response
//! is given the register's reset value is used.
//!
//! Consecutive accesses continue the open burst: reading `REG_DATESTAMP`
//! issues a single address phase for all four words.

use std::io::Write;
use std::ops::RangeInclusive;

use evetrace_common::{extract_bits, to_bytes, ByteOrder};
use evetrace_sim::{AccessMode, SpiEngine};
use serde::Serialize;

use crate::error::CommandError;
use crate::name_matches;

/// Address window of the register file.
pub const REGISTER_FILE: RangeInclusive<u32> = 0x30_2000..=0x30_2FFF;

/// Host access allowed on a register.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Access {
    /// Status registers updated by the device.
    ReadOnly,
    /// Configuration registers.
    ReadWrite,
    /// Registers that consume what is written (`REG_CMDB_WRITE`).
    WriteOnly,
}

impl Access {
    /// Short label used in listings.
    pub fn label(self) -> &'static str {
        match self {
            Access::ReadOnly => "r/o",
            Access::ReadWrite => "r/w",
            Access::WriteOnly => "w/o",
        }
    }
}

/// Descriptor of one register.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct Register {
    /// Register name.
    pub name: &'static str,
    /// Address of the first word.
    pub address: u32,
    /// Width in bits; registers wider than 32 bits span several words.
    pub bits: u16,
    /// Allowed host access.
    pub access: Access,
    /// Value after reset.
    pub reset: u64,
}

const fn reg(name: &'static str, address: u32, bits: u16, access: Access, reset: u64) -> Register {
    Register { name, address, bits, access, reset }
}

/// Every register of the FT81x/BT81x register file.
pub const REGISTERS: &[Register] = &[
    reg("REG_ID", 0x30_2000, 8, Access::ReadOnly, 0x7c),
    reg("REG_FRAMES", 0x30_2004, 32, Access::ReadOnly, 0),
    reg("REG_CLOCK", 0x30_2008, 32, Access::ReadOnly, 0),
    reg("REG_FREQUENCY", 0x30_200C, 28, Access::ReadWrite, 60_000_000),
    reg("REG_RENDERMODE", 0x30_2010, 1, Access::ReadWrite, 0),
    reg("REG_SNAPY", 0x30_2014, 11, Access::ReadWrite, 0),
    reg("REG_SNAPSHOT", 0x30_2018, 1, Access::ReadWrite, 0),
    reg("REG_SNAPFORMAT", 0x30_201C, 6, Access::ReadWrite, 0x20),
    reg("REG_CPURESET", 0x30_2020, 3, Access::ReadWrite, 2),
    reg("REG_TAP_CRC", 0x30_2024, 32, Access::ReadOnly, 0),
    reg("REG_TAP_MASK", 0x30_2028, 32, Access::ReadWrite, 0xffffffff),
    reg("REG_HCYCLE", 0x30_202C, 12, Access::ReadWrite, 0x224),
    reg("REG_HOFFSET", 0x30_2030, 12, Access::ReadWrite, 0x2b),
    reg("REG_HSIZE", 0x30_2034, 12, Access::ReadWrite, 0x1e0),
    reg("REG_HSYNC0", 0x30_2038, 12, Access::ReadWrite, 0),
    reg("REG_HSYNC1", 0x30_203C, 12, Access::ReadWrite, 0x29),
    reg("REG_VCYCLE", 0x30_2040, 12, Access::ReadWrite, 0x124),
    reg("REG_VOFFSET", 0x30_2044, 12, Access::ReadWrite, 0xc),
    reg("REG_VSIZE", 0x30_2048, 12, Access::ReadWrite, 0x110),
    reg("REG_VSYNC0", 0x30_204C, 10, Access::ReadWrite, 0),
    reg("REG_VSYNC1", 0x30_2050, 10, Access::ReadWrite, 0xa),
    reg("REG_DLSWAP", 0x30_2054, 2, Access::ReadWrite, 0),
    reg("REG_ROTATE", 0x30_2058, 3, Access::ReadWrite, 0),
    reg("REG_OUTBITS", 0x30_205C, 9, Access::ReadWrite, 0x1b6),
    reg("REG_DITHER", 0x30_2060, 1, Access::ReadWrite, 1),
    reg("REG_SWIZZLE", 0x30_2064, 4, Access::ReadWrite, 0),
    reg("REG_CSPREAD", 0x30_2068, 1, Access::ReadWrite, 1),
    reg("REG_PCLK_POL", 0x30_206C, 1, Access::ReadWrite, 1),
    reg("REG_PCLK", 0x30_2070, 8, Access::ReadWrite, 0),
    reg("REG_TAG_X", 0x30_2074, 11, Access::ReadWrite, 0),
    reg("REG_TAG_Y", 0x30_2078, 11, Access::ReadWrite, 0),
    reg("REG_TAG", 0x30_207C, 8, Access::ReadOnly, 0),
    reg("REG_VOL_PB", 0x30_2080, 8, Access::ReadWrite, 0xff),
    reg("REG_VOL_SOUND", 0x30_2084, 8, Access::ReadWrite, 0xff),
    reg("REG_SOUND", 0x30_2088, 16, Access::ReadWrite, 0),
    reg("REG_PLAY", 0x30_208C, 1, Access::ReadWrite, 0),
    reg("REG_GPIO_DIR", 0x30_2090, 8, Access::ReadWrite, 0x80),
    reg("REG_GPIO", 0x30_2094, 8, Access::ReadWrite, 0),
    reg("REG_GPIOX_DIR", 0x30_2098, 16, Access::ReadWrite, 0x8000),
    reg("REG_GPIOX", 0x30_209C, 16, Access::ReadWrite, 0x80),
    reg("REG_INT_FLAGS", 0x30_20A8, 8, Access::ReadOnly, 0),
    reg("REG_INT_EN", 0x30_20AC, 1, Access::ReadWrite, 0),
    reg("REG_INT_MASK", 0x30_20B0, 8, Access::ReadWrite, 0xff),
    reg("REG_PLAYBACK_START", 0x30_20B4, 20, Access::ReadWrite, 0),
    reg("REG_PLAYBACK_LENGTH", 0x30_20B8, 20, Access::ReadWrite, 0),
    reg("REG_PLAYBACK_READPTR", 0x30_20BC, 20, Access::ReadOnly, 0),
    reg("REG_PLAYBACK_FREQ", 0x30_20C0, 16, Access::ReadWrite, 8000),
    reg("REG_PLAYBACK_FORMAT", 0x30_20C4, 2, Access::ReadWrite, 0),
    reg("REG_PLAYBACK_LOOP", 0x30_20C8, 1, Access::ReadWrite, 0),
    reg("REG_PLAYBACK_PLAY", 0x30_20CC, 1, Access::ReadWrite, 0),
    reg("REG_PWM_HZ", 0x30_20D0, 14, Access::ReadWrite, 250),
    reg("REG_PWM_DUTY", 0x30_20D4, 8, Access::ReadWrite, 128),
    reg("REG_MACRO_0", 0x30_20D8, 32, Access::ReadWrite, 0),
    reg("REG_MACRO_1", 0x30_20DC, 32, Access::ReadWrite, 0),
    reg("REG_CMD_READ", 0x30_20F8, 12, Access::ReadWrite, 0),
    reg("REG_CMD_WRITE", 0x30_20FC, 12, Access::ReadOnly, 0),
    reg("REG_CMD_DL", 0x30_2100, 13, Access::ReadWrite, 0),
    reg("REG_TOUCH_MODE", 0x30_2104, 2, Access::ReadWrite, 3),
    reg("REG_TOUCH_ADC_MODE", 0x30_2108, 1, Access::ReadWrite, 1),
    reg("REG_TOUCH_CHARGE", 0x30_210C, 16, Access::ReadWrite, 9000),
    reg("REG_TOUCH_SETTLE", 0x30_2110, 4, Access::ReadWrite, 3),
    reg("REG_TOUCH_OVERSAMPLE", 0x30_2114, 4, Access::ReadWrite, 7),
    reg("REG_TOUCH_RZTHRESH", 0x30_2118, 16, Access::ReadWrite, 0xffff),
    reg("REG_TOUCH_RAW_XY", 0x30_211C, 32, Access::ReadOnly, 0),
    reg("REG_TOUCH_RZ", 0x30_2120, 16, Access::ReadOnly, 0),
    reg("REG_TOUCH_SCREEN_XY", 0x30_2124, 32, Access::ReadOnly, 0),
    reg("REG_TOUCH_TAG_XY", 0x30_2128, 32, Access::ReadOnly, 0),
    reg("REG_TOUCH_TAG", 0x30_212C, 8, Access::ReadOnly, 0),
    reg("REG_TOUCH_TAG1_XY", 0x30_2130, 32, Access::ReadOnly, 0),
    reg("REG_TOUCH_TAG1", 0x30_2134, 8, Access::ReadOnly, 0),
    reg("REG_TOUCH_TAG2_XY", 0x30_2138, 32, Access::ReadOnly, 0),
    reg("REG_TOUCH_TAG2", 0x30_213C, 8, Access::ReadOnly, 0),
    reg("REG_TOUCH_TAG3_XY", 0x30_2140, 32, Access::ReadOnly, 0),
    reg("REG_TOUCH_TAG3", 0x30_2144, 8, Access::ReadOnly, 0),
    reg("REG_TOUCH_TAG4_XY", 0x30_2148, 32, Access::ReadOnly, 0),
    reg("REG_TOUCH_TAG4", 0x30_214C, 8, Access::ReadOnly, 0),
    reg("REG_TOUCH_TRANSFORM_A", 0x30_2150, 32, Access::ReadWrite, 0x10000),
    reg("REG_TOUCH_TRANSFORM_B", 0x30_2154, 32, Access::ReadWrite, 0),
    reg("REG_TOUCH_TRANSFORM_C", 0x30_2158, 32, Access::ReadWrite, 0),
    reg("REG_TOUCH_TRANSFORM_D", 0x30_215C, 32, Access::ReadWrite, 0),
    reg("REG_TOUCH_TRANSFORM_E", 0x30_2160, 32, Access::ReadWrite, 0x10000),
    reg("REG_TOUCH_TRANSFORM_F", 0x30_2164, 32, Access::ReadWrite, 0),
    reg("REG_TOUCH_CONFIG", 0x30_2168, 16, Access::ReadWrite, 0x381),
    reg("REG_CTOUCH_TOUCH4_X", 0x30_216C, 16, Access::ReadOnly, 0),
    reg("REG_BIST_EN", 0x30_2174, 1, Access::ReadWrite, 0),
    reg("REG_TRIM", 0x30_2180, 5, Access::ReadWrite, 0),
    reg("REG_ANA_COMP", 0x30_2184, 8, Access::ReadWrite, 0),
    reg("REG_SPI_WIDTH", 0x30_2188, 3, Access::ReadWrite, 0),
    reg("REG_TOUCH_DIRECT_XY", 0x30_218C, 32, Access::ReadOnly, 0),
    reg("REG_TOUCH_DIRECT_Z1Z2", 0x30_2190, 32, Access::ReadOnly, 0),
    reg("REG_DATESTAMP", 0x30_2564, 128, Access::ReadOnly, 0),
    reg("REG_CMDB_SPACE", 0x30_2574, 12, Access::ReadWrite, 0xffc),
    reg("REG_CMDB_WRITE", 0x30_2578, 32, Access::WriteOnly, 0),
    reg("REG_ADAPTIVE_FRAMERATE", 0x30_257C, 1, Access::ReadWrite, 1),
    reg("REG_PLAYBACK_PAUSE", 0x30_25EC, 1, Access::ReadWrite, 0),
    reg("REG_FLASH_STATUS", 0x30_25F0, 2, Access::ReadWrite, 0),
];

/// Alternative names for registers whose meaning depends on the touch engine.
pub const REGISTER_ALIASES: &[(&str, &str)] = &[
    ("REG_CTOUCH_EXTENDED", "REG_TOUCH_ADC_MODE"),
    ("REG_EHOST_TOUCH_X", "REG_TOUCH_CHARGE"),
    ("REG_EHOST_TOUCH_ID", "REG_TOUCH_OVERSAMPLE"),
    ("REG_EHOST_TOUCH_Y", "REG_TOUCH_RZTHRESH"),
    ("REG_CTOUCH_TOUCH1_XY", "REG_TOUCH_RAW_XY"),
    ("REG_CTOUCH_TOUCH4_Y", "REG_TOUCH_RZ"),
    ("REG_CTOUCH_TOUCH0_XY", "REG_TOUCH_SCREEN_XY"),
    ("REG_CTOUCH_TOUCH2_XY", "REG_TOUCH_DIRECT_XY"),
    ("REG_CTOUCH_TOUCH3_XY", "REG_TOUCH_DIRECT_Z1Z2"),
];

/// Looks up a register by name or alias.
pub fn find(name: &str) -> Option<&'static Register> {
    let target = REGISTER_ALIASES
        .iter()
        .find(|(alias, _)| name_matches(alias, "REG_", name))
        .map_or(name, |(_, target)| *target);
    REGISTERS.iter().find(|r| name_matches(r.name, "REG_", target))
}

impl Register {
    /// Number of 32-bit words the register occupies.
    pub fn words(&self) -> usize {
        usize::from(self.bits).div_ceil(32)
    }

    fn word_bits(&self, index: usize) -> u8 {
        let remaining = usize::from(self.bits) - 32 * index;
        remaining.min(32) as u8
    }

    fn word_address(&self, index: usize) -> u32 {
        let address = self.address + 4 * index as u32;
        assert!(
            REGISTER_FILE.contains(&address),
            "{} at {address:#x} is outside the register file",
            self.name
        );
        address
    }

    fn check_words(&self, found: usize) -> Result<(), CommandError> {
        if found == self.words() {
            Ok(())
        } else {
            Err(CommandError::WordCount {
                register: self.name.to_string(),
                expected: self.words(),
                found,
            })
        }
    }

    /// Writes `value`, masked to the register width.
    ///
    /// # Panics
    ///
    /// Panics if the register lies outside [`REGISTER_FILE`].
    pub fn write<W: Write>(&self, engine: &mut SpiEngine<W>, value: u64) -> Result<(), CommandError> {
        self.write_words(engine, &[value])
    }

    /// Writes every word of a multi-word register.
    pub fn write_words<W: Write>(&self, engine: &mut SpiEngine<W>, words: &[u64]) -> Result<(), CommandError> {
        if self.access == Access::ReadOnly {
            return Err(CommandError::NotWritable(self.name.to_string()));
        }
        self.check_words(words.len())?;
        for (i, &word) in words.iter().enumerate() {
            let value = extract_bits(word, self.word_bits(i) - 1, 0);
            log::trace!("write {} = {value:#x}", self.name);
            engine.begin_transaction(AccessMode::Write, self.word_address(i));
            engine.transfer_data(&to_bytes(value, 4, ByteOrder::Little), None);
        }
        Ok(())
    }

    /// Reads the register, answering with `response` or the reset value.
    ///
    /// A multi-word register read without a response answers zero in every
    /// word after the first word's reset value.
    pub fn read<W: Write>(&self, engine: &mut SpiEngine<W>, response: Option<u64>) -> Result<(), CommandError> {
        let mut words = vec![0; self.words()];
        words[0] = response.unwrap_or(self.reset);
        self.read_words(engine, &words)
    }

    /// Reads every word of the register, answering with `words`.
    pub fn read_words<W: Write>(&self, engine: &mut SpiEngine<W>, words: &[u64]) -> Result<(), CommandError> {
        if self.access == Access::WriteOnly {
            return Err(CommandError::NotReadable(self.name.to_string()));
        }
        self.check_words(words.len())?;
        for (i, &word) in words.iter().enumerate() {
            let value = extract_bits(word, self.word_bits(i) - 1, 0);
            log::trace!("read {} -> {value:#x}", self.name);
            engine.begin_transaction(AccessMode::Read, self.word_address(i));
            engine.transfer_data(&[0xFF; 4], Some(&to_bytes(value, 4, ByteOrder::Little)));
        }
        Ok(())
    }
}

fn lookup(name: &str) -> Result<&'static Register, CommandError> {
    find(name).ok_or_else(|| CommandError::UnknownRegister(name.to_string()))
}

/// Writes `value` to the register `name`.
pub fn write<W: Write>(engine: &mut SpiEngine<W>, name: &str, value: u64) -> Result<(), CommandError> {
    lookup(name)?.write(engine, value)
}

/// Reads the register `name`, answering with `response` or the reset value.
pub fn read<W: Write>(engine: &mut SpiEngine<W>, name: &str, response: Option<u64>) -> Result<(), CommandError> {
    lookup(name)?.read(engine, response)
}
