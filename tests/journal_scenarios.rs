//! End-to-end scenarios over the journal data plane: a writer and reader
//! sharing real page files on disk, no mocking of the mmap or the frame
//! codec.

use jtrade_core::journal::{Page, Reader, Writer};
use jtrade_core::location::{Locator, Location, Mode, Module};
use jtrade_core::model::MsgType;

fn loc(name: &str) -> Location {
    Location::new(Mode::Backtest, Module::System, "scenarios", name)
}

#[test]
fn single_page_echo_preserves_order_and_exact_gen_times() {
    let tmp = tempfile::tempdir().unwrap();
    let locator = Locator::new(tmp.path());
    let location = loc("echo");
    let writer = Writer::open(locator.clone(), location.clone(), 1, false, None).unwrap();

    for (trigger, gen_time, payload) in [(1i64, 1000i64, b"one"), (2, 2000, b"two"), (3, 3000, b"thr")] {
        let open = writer.open_frame(trigger, MsgType::Bar.as_i32(), payload.len() as u32).unwrap();
        writer.payload_mut(&open).copy_from_slice(payload);
        writer.close_frame(payload.len(), gen_time);
    }
    drop(writer);

    let mut reader = Reader::new(locator);
    reader.join(location, 1, 0).unwrap();

    let mut seen = Vec::new();
    while reader.data_available() {
        let gen_time = reader.current_frame().unwrap().header.gen_time;
        let payload = reader.payload().unwrap().to_vec();
        seen.push((gen_time, payload));
        reader.next();
    }

    assert_eq!(seen.len(), 3);
    assert_eq!(seen[0], (1000, b"one".to_vec()));
    assert_eq!(seen[1], (2000, b"two".to_vec()));
    assert_eq!(seen[2], (3000, b"thr".to_vec()));
    assert!(!reader.data_available());
}

#[test]
fn page_rollover_delivers_every_frame_across_two_pages() {
    let tmp = tempfile::tempdir().unwrap();
    let locator = Locator::new(tmp.path());
    let location = loc("rollover");
    let writer = Writer::open(locator.clone(), location.clone(), 1, false, None).unwrap();

    // 500_000 bytes per frame against a 1 MiB system page (usable_border =
    // 1_048_540): two fit on page 1, the third forces a PageEnd + rollover.
    let payload_len = 500_000usize;
    for i in 0u8..3 {
        let open = writer.open_frame(i as i64, MsgType::Bar.as_i32(), payload_len as u32).unwrap();
        writer.payload_mut(&open).fill(i);
        writer.close_frame(payload_len, 1000 + i as i64);
    }
    drop(writer);

    assert!(Page::exists(&locator, &location, 1, 2), "third frame should have rolled onto page 2");

    let mut reader = Reader::new(locator);
    reader.join(location, 1, 0).unwrap();

    let mut frames = Vec::new();
    while reader.data_available() {
        let header = reader.current_frame().unwrap().header;
        let marker = reader.payload().unwrap()[0];
        frames.push((header.gen_time, marker));
        reader.next();
    }

    assert_eq!(frames, vec![(1000, 0), (1001, 1), (1002, 2)], "PageEnd must never surface as a delivered frame");
}

#[test]
fn multi_stream_merge_orders_by_gen_time_not_join_order() {
    let tmp = tempfile::tempdir().unwrap();
    let locator = Locator::new(tmp.path());
    let location = loc("merge");

    let writer_a = Writer::open(locator.clone(), location.clone(), 1, false, None).unwrap();
    let writer_b = Writer::open(locator.clone(), location.clone(), 2, false, None).unwrap();

    writer_a.open_frame(1, MsgType::Bar.as_i32(), 0).unwrap();
    writer_a.close_frame(0, 100);
    writer_a.open_frame(3, MsgType::Bar.as_i32(), 0).unwrap();
    writer_a.close_frame(0, 300);

    writer_b.open_frame(2, MsgType::Bar.as_i32(), 0).unwrap();
    writer_b.close_frame(0, 200);
    writer_b.open_frame(4, MsgType::Bar.as_i32(), 0).unwrap();
    writer_b.close_frame(0, 400);

    drop(writer_a);
    drop(writer_b);

    let mut reader = Reader::new(locator);
    reader.join(location.clone(), 1, 0).unwrap();
    reader.join(location, 2, 0).unwrap();

    let mut seen = Vec::new();
    while reader.data_available() {
        let frame = reader.current_frame().unwrap();
        seen.push((frame.header.gen_time, frame.key.1));
        reader.next();
    }

    assert_eq!(seen, vec![(100, 1), (200, 2), (300, 1), (400, 2)]);
}
