//! Decoded memory transactions: address phase, reuse and the
//! auto-increment windows.

use evetrace_commands::{register, CoprocWriter};
use evetrace_conformance::{record_accesses, record_frames};
use evetrace_sim::AccessMode;

#[test]
fn write_address_phase() {
    let (_, frames) = record_frames(|engine| {
        engine.begin_transaction(AccessMode::Write, 0x30_8000);
        engine.transfer_data(&[0xaa], None);
    });
    assert_eq!(frames.len(), 1);
    assert_eq!(frames[0].mosi, vec![0xb0, 0x80, 0x00, 0xaa]);
    assert_eq!(frames[0].miso, vec![0x00, 0x4a, 0x43, 0xff]);
}

#[test]
fn read_address_phase_has_dummy_byte() {
    let (_, frames) = record_frames(|engine| {
        register::read(engine, "REG_ID", None).unwrap();
    });
    assert_eq!(frames[0].mosi, vec![0x30, 0x20, 0x00, 0xff, 0xff, 0xff, 0xff, 0xff]);
    assert_eq!(frames[0].miso, vec![0x00, 0x4a, 0x43, 0x42, 0x7c, 0x00, 0x00, 0x00]);
    let access = frames[0].memory().unwrap();
    assert_eq!(access.mode, AccessMode::Read);
    assert_eq!(access.address, 0x30_2000);
    assert_eq!(access.miso, vec![0x7c, 0, 0, 0]);
}

#[test]
fn contiguous_register_writes_are_one_burst() {
    let accesses = record_accesses(|engine| {
        register::write(engine, "REG_HCYCLE", 0x224).unwrap();
        register::write(engine, "REG_HOFFSET", 0x2b).unwrap();
        register::write(engine, "REG_HSIZE", 0x1e0).unwrap();
    });
    assert_eq!(accesses.len(), 1);
    assert_eq!(accesses[0].address, 0x30_202c);
    assert_eq!(
        accesses[0].mosi,
        vec![0x24, 0x02, 0, 0, 0x2b, 0, 0, 0, 0xe0, 0x01, 0, 0]
    );
}

#[test]
fn gap_or_direction_change_reframes() {
    let accesses = record_accesses(|engine| {
        register::write(engine, "REG_HCYCLE", 1).unwrap();
        register::write(engine, "REG_VCYCLE", 2).unwrap();
        register::read(engine, "REG_VOFFSET", Some(3)).unwrap();
    });
    let summary: Vec<(AccessMode, u32)> = accesses.iter().map(|a| (a.mode, a.address)).collect();
    assert_eq!(
        summary,
        vec![
            (AccessMode::Write, 0x30_202c),
            (AccessMode::Write, 0x30_2040),
            (AccessMode::Read, 0x30_2044),
        ]
    );
}

#[test]
fn register_values_are_masked() {
    let accesses = record_accesses(|engine| {
        register::write(engine, "REG_PCLK_POL", 0xff).unwrap();
        register::write(engine, "REG_FREQUENCY", 0xffff_ffff).unwrap();
    });
    assert_eq!(accesses[0].mosi, vec![0x01, 0, 0, 0]);
    assert_eq!(accesses[1].mosi, vec![0xff, 0xff, 0xff, 0x0f]);
}

#[test]
fn datestamp_is_one_read_burst() {
    let accesses = record_accesses(|engine| {
        let datestamp = register::find("REG_DATESTAMP").unwrap();
        datestamp
            .read_words(engine, &[0x0123_4567, 0x89ab_cdef, 0x0123_4567, 0x89ab_cdef])
            .unwrap();
    });
    assert_eq!(accesses.len(), 1);
    assert_eq!(accesses[0].address, 0x30_2564);
    assert_eq!(accesses[0].mosi, vec![0xff; 16]);
    assert_eq!(&accesses[0].miso[..8], &[0x67, 0x45, 0x23, 0x01, 0xef, 0xcd, 0xab, 0x89]);
}

#[test]
fn streaming_register_holds_its_address() {
    let accesses = record_accesses(|engine| {
        register::write(engine, "REG_CMDB_WRITE", 0xffff_ff00).unwrap();
        register::write(engine, "REG_CMDB_WRITE", 0xffff_ff01).unwrap();
        assert_eq!(engine.active_transaction(), Some((AccessMode::Write, 0x30_2578)));
    });
    assert_eq!(accesses.len(), 1);
    assert_eq!(accesses[0].mosi, vec![0x00, 0xff, 0xff, 0xff, 0x01, 0xff, 0xff, 0xff]);
}

#[test]
fn command_fifo_wraps() {
    let accesses = record_accesses(|engine| {
        let mut writer = CoprocWriter::new(engine, 0x30_8ff8);
        writer.command("CMD_DLSTART", &[]).unwrap();
        writer.command("CMD_SWAP", &[]).unwrap();
        writer.command("CMD_STOP", &[]).unwrap();
        assert_eq!(writer.address(), 0x30_8004);
    });
    assert_eq!(accesses.len(), 1);
    assert_eq!(accesses[0].address, 0x30_8ff8);
    assert_eq!(accesses[0].mosi.len(), 12);
}

#[test]
fn write_after_wrap_continues_burst() {
    let accesses = record_accesses(|engine| {
        engine.begin_transaction(AccessMode::Write, 0x30_8ffc);
        engine.transfer_data(&[1, 2, 3, 4], None);
        assert!(!engine.begin_transaction(AccessMode::Write, 0x30_8000));
        engine.transfer_data(&[5, 6, 7, 8], None);
    });
    assert_eq!(accesses.len(), 1);
    assert_eq!(accesses[0].mosi, vec![1, 2, 3, 4, 5, 6, 7, 8]);
}

#[test]
fn host_command_closes_open_transaction() {
    let (_, frames) = record_frames(|engine| {
        engine.begin_transaction(AccessMode::Write, 0x30_0000);
        engine.transfer_data(&[0; 4], None);
        engine.frame_host_command(&[0x00, 0x00, 0x00]);
        assert_eq!(engine.active_transaction(), None);
        assert!(engine.begin_transaction(AccessMode::Write, 0x30_0004));
        engine.transfer_data(&[0; 4], None);
        assert_eq!(engine.transactions_opened(), 2);
    });
    assert_eq!(frames.len(), 3);
    assert!(frames[0].memory().is_some());
    assert!(frames[1].memory().is_none());
    // second address phase at the continuing address
    assert_eq!(&frames[2].mosi[..3], &[0xb0, 0x00, 0x04]);
    assert_eq!(frames[2].memory().unwrap().address, 0x30_0004);
}
