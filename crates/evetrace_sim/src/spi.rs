//! SPI transaction engine for the EVE memory protocol.
//!
//! [`SpiEngine`] bit-bangs bytes onto the four SPI wires of a
//! [`VcdRecorder`] and layers the EVE host memory protocol on top of it:
//!
//! - a memory transaction opens with chip-select low and a 3-byte address,
//!   bit 23 set for writes; reads are followed by one dummy byte
//! - the data phase is open-ended; the engine tracks the address the device
//!   will use for the next byte
//! - a transaction whose mode and address match the active one is reused
//!   without re-framing, so contiguous accesses become a single burst
//! - host commands are framed on their own and never join a memory burst
//!
//! Wrong inputs (addresses beyond 22 bits, mismatched MOSI/MISO buffers,
//! data transfers outside a transaction) are programming errors and panic.

use std::io::Write;
use std::ops::RangeInclusive;

use evetrace_common::{to_bytes, ByteOrder, Level};

use crate::error::TraceError;
use crate::signal::{Signal, SignalId};
use crate::time::{LogicalTime, CLOCK_PERIOD, FRAME_GAP, HALF_PERIOD};
use crate::waveform::{TraceHeader, VcdRecorder};

/// Highest addressable byte of the 22-bit memory space.
pub const ADDRESS_MAX: u32 = 0x3F_FFFF;
/// Bit set in the transmitted address to request a write.
pub const WRITE_FLAG: u32 = 0x80_0000;
/// What the device shifts out on MISO while the address is clocked in.
pub const ADDRESS_ECHO: u32 = 0x00_4A43;
/// Byte clocked out by the host after a read address.
pub const DUMMY_BYTE: u8 = 0xFF;
/// What the device shifts out on MISO during the dummy byte.
pub const DUMMY_ECHO: u8 = 0x42;

/// Circular co-processor command FIFO (`RAM_CMD`).
pub const COMMAND_FIFO: RangeInclusive<u32> = 0x30_8000..=0x30_8FFF;
/// Size of [`COMMAND_FIFO`] in bytes.
pub const COMMAND_FIFO_SIZE: u32 = 0x1000;
/// Streaming command register (`REG_CMDB_WRITE`); every write lands here.
pub const STREAMING_WRITE_REGISTER: u32 = 0x30_2578;

/// Direction of a memory transaction.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AccessMode {
    /// Host reads device memory.
    Read,
    /// Host writes device memory.
    Write,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct Transaction {
    mode: AccessMode,
    address: u32,
}

/// The four SPI wires, in trace declaration order.
#[derive(Clone, Copy, Debug)]
struct SpiLines {
    cs: SignalId,
    clk: SignalId,
    mosi: SignalId,
    miso: SignalId,
}

impl SpiLines {
    const DEFAULT: SpiLines = SpiLines {
        cs: SignalId::from_raw(0),
        clk: SignalId::from_raw(1),
        mosi: SignalId::from_raw(2),
        miso: SignalId::from_raw(3),
    };

    fn signals() -> Vec<Signal> {
        vec![
            Signal::new("CS", 's'),
            Signal::new("CLK", 'c'),
            Signal::new("MOSI", 'o'),
            Signal::new("MISO", 'i'),
        ]
    }
}

/// Returns the address following a data phase of `len` bytes at `address`.
///
/// The command FIFO wraps within its window and the streaming register is
/// never left; everything else advances linearly and wraps at the top of the
/// 22-bit memory space.
pub fn next_address(address: u32, len: usize) -> u32 {
    // usize is at most 64 bits wide
    let len = len as u64;
    let wrap = |base: u32, size: u64| {
        let offset = (u64::from(address - base) + len) % size;
        // offset < size <= 2^22
        base + offset as u32
    };
    if COMMAND_FIFO.contains(&address) {
        wrap(*COMMAND_FIFO.start(), u64::from(COMMAND_FIFO_SIZE))
    } else if address == STREAMING_WRITE_REGISTER {
        address
    } else {
        wrap(0, u64::from(ADDRESS_MAX) + 1)
    }
}

/// Drives the CS/CLK/MOSI/MISO wires of one trace.
pub struct SpiEngine<W: Write> {
    recorder: VcdRecorder<W>,
    lines: SpiLines,
    active: Option<Transaction>,
    transactions_opened: usize,
}

impl<W: Write> SpiEngine<W> {
    /// Opens a trace on `writer` with the bus idle: chip-select, MOSI and
    /// MISO high, clock low.
    pub fn new(writer: W, header: &TraceHeader) -> Result<Self, TraceError> {
        let recorder = VcdRecorder::open(writer, SpiLines::signals(), header)?;
        let mut engine = Self {
            recorder,
            lines: SpiLines::DEFAULT,
            active: None,
            transactions_opened: 0,
        };
        engine.idle_lines();
        engine.recorder.advance_by(HALF_PERIOD);
        Ok(engine)
    }

    /// The current trace timestamp.
    pub fn now(&self) -> LogicalTime {
        self.recorder.now()
    }

    /// Mode and address of the open memory transaction, if any.
    pub fn active_transaction(&self) -> Option<(AccessMode, u32)> {
        self.active.map(|t| (t.mode, t.address))
    }

    /// Number of address phases issued so far.
    pub fn transactions_opened(&self) -> usize {
        self.transactions_opened
    }

    fn idle_lines(&mut self) {
        let SpiLines { cs, clk, mosi, miso } = self.lines;
        self.recorder.set(cs, Level::High);
        self.recorder.set(clk, Level::Low);
        self.recorder.set(mosi, Level::High);
        self.recorder.set(miso, Level::High);
    }

    /// Clocks `mosi` out and `miso` in, most significant bit first.
    ///
    /// MISO defaults to all ones. Each bit takes one clock period: data is set
    /// with the clock low, then the clock rises half a period later. Both data
    /// lines return high for half a period once the last bit is out.
    ///
    /// # Panics
    ///
    /// Panics if `miso` is given with a different length than `mosi`.
    pub fn serialize_bytes(&mut self, mosi: &[u8], miso: Option<&[u8]>) {
        if let Some(miso) = miso {
            assert_eq!(
                mosi.len(),
                miso.len(),
                "MOSI and MISO buffers differ in length"
            );
        }
        let SpiLines { clk, mosi: mosi_line, miso: miso_line, .. } = self.lines;
        for (i, &out) in mosi.iter().enumerate() {
            let inp = miso.map_or(0xFF, |m| m[i]);
            for bit in (0..8).rev() {
                self.recorder.set(clk, Level::Low);
                self.recorder.set(mosi_line, Level::of_bit(out, bit));
                self.recorder.set(miso_line, Level::of_bit(inp, bit));
                self.recorder.advance_by(HALF_PERIOD);
                self.recorder.set(clk, Level::High);
                self.recorder.advance_by(HALF_PERIOD);
            }
        }
        self.recorder.set(mosi_line, Level::High);
        self.recorder.set(miso_line, Level::High);
        self.recorder.advance_by(HALF_PERIOD);
    }

    /// Opens a memory transaction at `address`, unless the same transaction is
    /// already open.
    ///
    /// Returns `true` if a new address phase was sent, `false` on reuse.
    ///
    /// # Panics
    ///
    /// Panics if `address` exceeds [`ADDRESS_MAX`].
    pub fn begin_transaction(&mut self, mode: AccessMode, address: u32) -> bool {
        assert!(
            address <= ADDRESS_MAX,
            "address {address:#x} outside the 22-bit memory space"
        );
        let wanted = Transaction { mode, address };
        if self.active == Some(wanted) {
            log::trace!("reusing {mode:?} transaction at {address:#08x}");
            return false;
        }

        self.end_transaction();
        self.recorder.set(self.lines.cs, Level::Low);
        self.active = Some(wanted);
        self.transactions_opened += 1;
        log::debug!("{mode:?} transaction at {address:#08x} opened at {}", self.now());

        let wire_address = match mode {
            AccessMode::Write => address | WRITE_FLAG,
            AccessMode::Read => address,
        };
        let echo = to_bytes(u64::from(ADDRESS_ECHO), 3, ByteOrder::Big);
        self.serialize_bytes(&to_bytes(u64::from(wire_address), 3, ByteOrder::Big), Some(echo.as_slice()));
        if mode == AccessMode::Read {
            self.serialize_bytes(&[DUMMY_BYTE], Some(&[DUMMY_ECHO]));
        }
        true
    }

    /// Closes the open memory transaction, if any: chip-select high, bus idle,
    /// then two clock periods of gap.
    pub fn end_transaction(&mut self) {
        if let Some(t) = self.active.take() {
            log::debug!("{:?} transaction closed at {}", t.mode, self.now());
            self.idle_lines();
            self.recorder.advance_by(2 * CLOCK_PERIOD);
        }
    }

    /// Sends a data phase within the open transaction and moves the tracked
    /// address past it (see [`next_address`]).
    ///
    /// # Panics
    ///
    /// Panics if no transaction is open, or on mismatched buffer lengths.
    pub fn transfer_data(&mut self, mosi: &[u8], miso: Option<&[u8]>) {
        let Some(active) = self.active else {
            panic!("data transfer outside a memory transaction");
        };
        self.serialize_bytes(mosi, miso);
        self.active = Some(Transaction {
            address: next_address(active.address, mosi.len()),
            ..active
        });
    }

    /// Opens (or reuses) a transaction that is closed when the returned guard
    /// is dropped.
    pub fn transaction(&mut self, mode: AccessMode, address: u32) -> TransactionGuard<'_, W> {
        self.begin_transaction(mode, address);
        TransactionGuard { engine: self, mode, address }
    }

    /// Frames `bytes` as a standalone host command: chip-select low, bytes
    /// out, chip-select high, then two clock periods of gap.
    ///
    /// An open memory transaction is closed first, so the next memory access
    /// always sends a fresh address phase, even at the address the closed
    /// burst would have continued at.
    pub fn frame_host_command(&mut self, bytes: &[u8]) {
        self.end_transaction();
        self.recorder.set(self.lines.cs, Level::Low);
        self.serialize_bytes(bytes, None);
        self.recorder.set(self.lines.cs, Level::High);
        self.recorder.advance_by(FRAME_GAP);
    }

    /// Closes any open transaction and the trace, returning the sink.
    pub fn finish(mut self) -> Result<W, TraceError> {
        self.end_transaction();
        self.recorder.close()
    }
}

/// A memory transaction that ends when dropped.
///
/// Obtained from [`SpiEngine::transaction`]. The guard holds the engine
/// borrowed for its whole life, so its transaction stays the open one and the
/// guard tracks the data address itself.
pub struct TransactionGuard<'a, W: Write> {
    engine: &'a mut SpiEngine<W>,
    mode: AccessMode,
    address: u32,
}

impl<W: Write> TransactionGuard<'_, W> {
    /// Sends a data phase; see [`SpiEngine::transfer_data`].
    pub fn transfer(&mut self, mosi: &[u8], miso: Option<&[u8]>) {
        self.engine.transfer_data(mosi, miso);
        self.address = next_address(self.address, mosi.len());
        debug_assert_eq!(
            self.engine.active_transaction(),
            Some((self.mode, self.address))
        );
    }

    /// The address the next data byte goes to.
    pub fn address(&self) -> u32 {
        self.address
    }
}

impl<W: Write> Drop for TransactionGuard<'_, W> {
    fn drop(&mut self) {
        self.engine.end_transaction();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine() -> SpiEngine<Vec<u8>> {
        SpiEngine::new(Vec::new(), &TraceHeader::with_date("test")).unwrap()
    }

    /// Chip-select level changes, in trace order.
    fn chip_select_changes(records: &[String]) -> Vec<&str> {
        records
            .iter()
            .flat_map(|r| r.split(' ').skip(1))
            .filter(|t| t.ends_with('s'))
            .collect()
    }

    fn records(output: Vec<u8>) -> Vec<String> {
        String::from_utf8(output)
            .unwrap()
            .lines()
            .filter(|l| l.starts_with('#'))
            .map(str::to_string)
            .collect()
    }

    #[test]
    fn construction_dumps_idle_bus() {
        let e = engine();
        assert_eq!(e.now().ticks(), 1);
        let out = records(e.finish().unwrap());
        assert_eq!(out, vec!["#0 1s 0c 1o 1i", "#5"]);
    }

    #[test]
    fn serialize_one_byte_timing() {
        let mut e = engine();
        e.serialize_bytes(&[0xA5], None);
        // 8 bits of one clock period each, plus half a period of idle
        assert_eq!(e.now().ticks(), 1 + 8 * CLOCK_PERIOD + HALF_PERIOD);
    }

    #[test]
    fn serialize_msb_first() {
        let mut e = engine();
        e.serialize_bytes(&[0x80], Some(&[0x01]));
        let out = records(e.finish().unwrap());
        assert_eq!(out[1], "#1 0i");
        assert_eq!(out[2], "#2 1c");
        assert_eq!(out[3], "#3 0c 0o");
        // last bit: MISO goes high with the falling clock at tick 15
        assert!(out.contains(&"#15 0c 1i".to_string()));
    }

    #[test]
    #[should_panic(expected = "differ in length")]
    fn mismatched_buffers_panic() {
        let mut e = engine();
        e.serialize_bytes(&[1, 2], Some(&[1]));
    }

    #[test]
    fn write_transaction_sends_flagged_address() {
        let mut e = engine();
        assert!(e.begin_transaction(AccessMode::Write, 0x30_2000));
        assert_eq!(e.active_transaction(), Some((AccessMode::Write, 0x30_2000)));
        // three address bytes only
        assert_eq!(e.now().ticks(), 1 + 24 * CLOCK_PERIOD + HALF_PERIOD);
        let out = records(e.finish().unwrap());
        assert!(out[1].starts_with("#1 0s"));
        assert_eq!(chip_select_changes(&out), vec!["1s", "0s", "1s"]);
    }

    #[test]
    fn read_transaction_adds_dummy_byte() {
        let mut e = engine();
        e.begin_transaction(AccessMode::Read, 0x30_2000);
        let address_phase = 24 * CLOCK_PERIOD + HALF_PERIOD;
        let dummy = 8 * CLOCK_PERIOD + HALF_PERIOD;
        assert_eq!(e.now().ticks(), 1 + address_phase + dummy);
    }

    #[test]
    fn same_transaction_is_reused() {
        let mut e = engine();
        assert!(e.begin_transaction(AccessMode::Write, 0x1000));
        let t = e.now();
        assert!(!e.begin_transaction(AccessMode::Write, 0x1000));
        assert_eq!(e.now(), t);
        assert_eq!(e.transactions_opened(), 1);
    }

    #[test]
    fn mode_change_reframes() {
        let mut e = engine();
        e.begin_transaction(AccessMode::Write, 0x1000);
        assert!(e.begin_transaction(AccessMode::Read, 0x1000));
        assert_eq!(e.transactions_opened(), 2);
    }

    #[test]
    fn contiguous_access_continues_burst() {
        let mut e = engine();
        e.begin_transaction(AccessMode::Read, 0x30_2000);
        e.transfer_data(&[0xFF; 4], Some(&[0x7c, 0, 0, 0]));
        assert!(!e.begin_transaction(AccessMode::Read, 0x30_2004));
        assert_eq!(e.transactions_opened(), 1);
    }

    #[test]
    fn end_transaction_idles_bus() {
        let mut e = engine();
        e.begin_transaction(AccessMode::Write, 0);
        let t = e.now();
        e.end_transaction();
        assert_eq!(e.active_transaction(), None);
        assert_eq!(e.now(), t.after(2 * CLOCK_PERIOD));
        // idle end is a no-op
        e.end_transaction();
        assert_eq!(e.now(), t.after(2 * CLOCK_PERIOD));
        let out = records(e.finish().unwrap());
        assert!(out.contains(&format!("{t} 1s 0c")));
    }

    #[test]
    #[should_panic(expected = "22-bit")]
    fn address_out_of_range_panics() {
        let mut e = engine();
        e.begin_transaction(AccessMode::Write, 0x40_0000);
    }

    #[test]
    #[should_panic(expected = "outside a memory transaction")]
    fn transfer_without_transaction_panics() {
        let mut e = engine();
        e.transfer_data(&[0], None);
    }

    #[test]
    fn linear_address_advance() {
        let mut e = engine();
        e.begin_transaction(AccessMode::Write, 0x1000);
        e.transfer_data(&[0; 6], None);
        assert_eq!(e.active_transaction(), Some((AccessMode::Write, 0x1006)));
    }

    #[test]
    fn command_fifo_wraps() {
        assert_eq!(next_address(0x30_8FFC, 8), 0x30_8004);
        assert_eq!(next_address(0x30_8000, 4), 0x30_8004);
        assert_eq!(next_address(0x30_8FFC, 4), 0x30_8000);
    }

    #[test]
    fn linear_advance_wraps_at_top_of_memory() {
        assert_eq!(next_address(0x3F_FFFC, 8), 0x4);
        assert_eq!(next_address(0x3F_FFFC, 4), 0);
        assert_eq!(next_address(0x1000, 0), 0x1000);

        let mut e = engine();
        e.begin_transaction(AccessMode::Write, 0x3F_FFFC);
        e.transfer_data(&[0; 8], None);
        assert!(!e.begin_transaction(AccessMode::Write, 0x4));
    }

    #[test]
    fn streaming_register_holds() {
        let mut e = engine();
        e.begin_transaction(AccessMode::Write, STREAMING_WRITE_REGISTER);
        e.transfer_data(&[1, 2, 3, 4], None);
        assert_eq!(
            e.active_transaction(),
            Some((AccessMode::Write, STREAMING_WRITE_REGISTER))
        );
        assert!(!e.begin_transaction(AccessMode::Write, STREAMING_WRITE_REGISTER));
    }

    #[test]
    fn guard_ends_transaction_on_drop() {
        let mut e = engine();
        {
            let mut guard = e.transaction(AccessMode::Write, 0x30_8000);
            guard.transfer(&[0, 0xff, 0xff, 0xff], None);
            assert_eq!(guard.address(), 0x30_8004);
        }
        assert_eq!(e.active_transaction(), None);
        let out = records(e.finish().unwrap());
        assert_eq!(chip_select_changes(&out), vec!["1s", "0s", "1s"]);
    }

    #[test]
    fn guard_address_follows_fifo_wrap() {
        let mut e = engine();
        {
            let mut guard = e.transaction(AccessMode::Write, 0x30_8FF8);
            assert_eq!(guard.address(), 0x30_8FF8);
            guard.transfer(&[0; 4], None);
            assert_eq!(guard.address(), 0x30_8FFC);
            guard.transfer(&[0; 8], None);
            assert_eq!(guard.address(), 0x30_8004);
        }
        assert_eq!(e.transactions_opened(), 1);
    }

    #[test]
    fn guard_reuses_open_transaction() {
        let mut e = engine();
        e.begin_transaction(AccessMode::Write, 0x1000);
        e.transfer_data(&[0; 4], None);
        let mut guard = e.transaction(AccessMode::Write, 0x1004);
        guard.transfer(&[0; 2], None);
        assert_eq!(guard.address(), 0x1006);
        drop(guard);
        assert_eq!(e.transactions_opened(), 1);
    }

    #[test]
    fn guard_ends_transaction_on_unwind() {
        let mut e = engine();
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let mut guard = e.transaction(AccessMode::Write, 0x1000);
            guard.transfer(&[1, 2], Some(&[1]));
        }));
        assert!(result.is_err());
        assert_eq!(e.active_transaction(), None);
    }

    #[test]
    fn host_command_frame() {
        let mut e = engine();
        e.frame_host_command(&[0x00, 0x00, 0x00]);
        assert_eq!(
            e.now().ticks(),
            1 + 24 * CLOCK_PERIOD + HALF_PERIOD + FRAME_GAP
        );
        assert_eq!(e.transactions_opened(), 0);
        let out = records(e.finish().unwrap());
        assert_eq!(chip_select_changes(&out), vec!["1s", "0s", "1s"]);
    }

    #[test]
    fn host_command_closes_memory_transaction() {
        let mut e = engine();
        e.begin_transaction(AccessMode::Write, 0x1000);
        e.transfer_data(&[0; 4], None);
        e.frame_host_command(&[0x44, 0, 0]);
        assert_eq!(e.active_transaction(), None);
        // the continuing address still needs a new address phase
        assert!(e.begin_transaction(AccessMode::Write, 0x1004));
        assert_eq!(e.transactions_opened(), 2);
    }

    #[test]
    fn finish_closes_open_transaction() {
        let mut e = engine();
        e.begin_transaction(AccessMode::Write, 0);
        let out = records(e.finish().unwrap());
        let tail: Vec<&str> = out.iter().rev().take(2).map(String::as_str).collect();
        // chip-select rises, then the end marker two frame gaps later
        assert!(tail[1].ends_with("1s 0c"));
        assert!(tail[0].starts_with('#') && !tail[0].contains(' '));
    }
}
