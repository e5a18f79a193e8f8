//! End-to-end checks of the trace text: header layout, exact timing of a
//! host command, and the closing marker.

use evetrace_conformance::{parse_trace, record, record_frames, FIXED_DATE};
use evetrace_sim::{AccessMode, FRAME_GAP};

fn body(text: &str) -> Vec<&str> {
    text.lines()
        .skip_while(|l| *l != "$enddefinitions $end")
        .skip(1)
        .collect()
}

#[test]
fn header_declares_four_wires() {
    let text = record(|_| {});
    let header: Vec<&str> = text.lines().take(9).collect();
    assert_eq!(
        header,
        vec![
            format!("$date {FIXED_DATE} $end").as_str(),
            "$timescale 1 ns $end",
            "$scope module spi $end",
            "$var wire 1 s CS $end",
            "$var wire 1 c CLK $end",
            "$var wire 1 o MOSI $end",
            "$var wire 1 i MISO $end",
            "$upscope $end",
            "$enddefinitions $end",
        ]
    );
}

#[test]
fn empty_session_is_idle_bus_and_marker() {
    let text = record(|_| {});
    assert_eq!(body(&text), vec!["#0 1s 0c 1o 1i", "#5"]);
}

#[test]
fn host_active_exact_waveform() {
    let text = record(|engine| engine.frame_host_command(&[0x00, 0x00, 0x00]));

    let mut expected = vec!["#0 1s 0c 1o 1i".to_string(), "#1 0s 0o".to_string()];
    for bit in 0..24u64 {
        if bit > 0 {
            expected.push(format!("#{} 0c", 1 + 2 * bit));
        }
        expected.push(format!("#{} 1c", 2 + 2 * bit));
    }
    expected.push("#49 1o".to_string());
    expected.push("#50 1s".to_string());
    expected.push("#58".to_string());

    assert_eq!(body(&text), expected);
}

#[test]
fn host_active_elapsed_time() {
    let (trace, frames) = record_frames(|engine| engine.frame_host_command(&[0x00, 0x00, 0x00]));
    assert_eq!(frames.len(), 1);
    let frame = &frames[0];
    assert_eq!(frame.mosi, vec![0x00, 0x00, 0x00]);
    assert_eq!(frame.miso, vec![0xff, 0xff, 0xff]);
    // 24 bits of 2T, then T of idle settle
    assert_eq!(frame.end - frame.start, 24 * 2 + 1);
    assert_eq!(trace.end, Some(frame.end + 2 * FRAME_GAP));
}

#[test]
fn timestamps_strictly_increase() {
    let text = record(|engine| {
        engine.frame_host_command(&[0x44, 0x00, 0x00]);
        engine.begin_transaction(AccessMode::Write, 0x30_2000);
        engine.transfer_data(&[1, 2, 3, 4], None);
        engine.begin_transaction(AccessMode::Read, 0x30_2000);
        engine.transfer_data(&[0xff; 4], Some(&[0x7c, 0, 0, 0]));
    });
    let trace = parse_trace(&text).unwrap();
    assert!(trace.records.windows(2).all(|w| w[0].time < w[1].time));
    assert!(trace.records.iter().all(|r| !r.changes.is_empty()));
    assert!(trace.end.unwrap() > trace.records.last().unwrap().time);
}

#[test]
fn close_marker_follows_last_transaction() {
    let (trace, frames) = record_frames(|engine| {
        engine.begin_transaction(AccessMode::Write, 0x30_0000);
        engine.transfer_data(&[0, 0, 0, 0], None);
    });
    let last = frames.last().unwrap();
    assert_eq!(trace.end, Some(last.end + 2 * FRAME_GAP));
}

#[test]
fn bus_idles_after_every_frame() {
    let (trace, frames) = record_frames(|engine| {
        engine.frame_host_command(&[0x68, 0x00, 0x00]);
        engine.begin_transaction(AccessMode::Read, 0x30_2000);
        engine.transfer_data(&[0xff; 4], Some(&[0x00, 0x00, 0x00, 0x00]));
    });
    for frame in &frames {
        let levels = trace.levels_at(frame.end);
        assert!(levels["CS"].is_high());
        assert!(levels["MOSI"].is_high());
        assert!(levels["MISO"].is_high());
    }
}

#[test]
fn file_backed_trace_reads_back() {
    use std::io::Write;

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("hostcmd.vcd");
    let file = std::io::BufWriter::new(std::fs::File::create(&path).unwrap());
    let mut engine =
        evetrace_sim::SpiEngine::new(file, &evetrace_sim::TraceHeader::with_date(FIXED_DATE)).unwrap();
    engine.frame_host_command(&[0x42, 0x00, 0x00]);
    engine.finish().unwrap().flush().unwrap();

    let trace = parse_trace(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(trace.date, FIXED_DATE);
    let frames = trace.frames().unwrap();
    assert_eq!(frames.len(), 1);
    assert_eq!(frames[0].mosi, vec![0x42, 0x00, 0x00]);
    assert_eq!(trace.end, Some(58));
}
