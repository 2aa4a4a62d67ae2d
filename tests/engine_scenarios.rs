//! Scenarios that cross the journal/reactor/executor seam: order routing and
//! termination propagation, driven against the real primitives rather than
//! fakes.

use std::collections::HashMap;
use std::os::fd::AsRawFd;

use jtrade_core::engine::td_location;
use jtrade_core::executor::Executor;
use jtrade_core::ids::hash_account_dest;
use jtrade_core::journal::{CurrentFrame, FixedBytes, Reader, Writer};
use jtrade_core::location::{Locator, Location, Mode, Module};
use jtrade_core::model::{Direction, InstrumentKey, MsgType, OffsetFlag, OrderInput};
use jtrade_core::observer::eventfd::EventFd;
use jtrade_core::observer::ObserveHelper;
use jtrade_core::reactor::{self, EventEngine};
use jtrade_core::time::Nanos;

#[test]
fn insert_order_routes_under_td_location_and_account_recovers_from_order_id() {
    let tmp = tempfile::tempdir().unwrap();
    let locator = Locator::new(tmp.path());
    let mode = Mode::Backtest;
    let td_loc = td_location(mode);

    let institution = "X";
    let account = "Y";
    let dest = hash_account_dest(institution, account);

    let cp_loc = Location::new(mode, Module::Strategy, "cp", "main");
    let md_req_writer = Writer::open(locator.clone(), cp_loc, 0, false, None).unwrap();
    let mut executor = Executor::new(md_req_writer, td_loc.uid).unwrap();

    let account_writer = Writer::open(locator.clone(), td_loc.clone(), dest, false, None).unwrap();
    executor.register_account(institution, account, account_writer);

    let instrument = InstrumentKey::new("CME", "ESZ4");
    let order_id = executor
        .insert_order(institution, account, instrument, 100.0, 5, Direction::Long, OffsetFlag::Open, 1)
        .unwrap();

    assert_ne!(order_id, 0);
    assert_eq!((order_id >> 32) as u32 ^ td_loc.uid, dest, "order_id must recover the account hash under td_location");

    let mut reader = Reader::new(locator);
    reader.join(td_loc, dest, 0).unwrap();
    assert!(reader.data_available());

    let payload = reader.payload().unwrap();
    let input = OrderInput::from_bytes(payload);
    assert_eq!(input.volume, 5);
    assert_eq!(input.order_id, order_id);
    assert!(input.insert_time > 0);
}

/// Minimal `EventEngine` standing in for MD/TD/CP, just enough to exercise
/// `reactor::run`'s produce loop and `stop()` interaction.
struct RecordingEngine {
    reader: Reader,
    observe: ObserveHelper,
    writers: HashMap<u32, Writer>,
    live: bool,
    now_event_time: Nanos,
    reacted: Vec<i32>,
}

impl EventEngine for RecordingEngine {
    fn on_setup(&mut self) {}

    fn react(&mut self, frame: CurrentFrame, _payload: &[u8]) {
        self.reacted.push(frame.header.msg_type);
        if reactor::is_termination(frame.header.msg_type) {
            self.stop();
        }
    }

    fn reader(&self) -> &Reader {
        &self.reader
    }

    fn reader_mut(&mut self) -> &mut Reader {
        &mut self.reader
    }

    fn reader_and_observe(&mut self) -> (&mut Reader, &ObserveHelper) {
        (&mut self.reader, &self.observe)
    }

    fn is_live(&self) -> bool {
        self.live
    }

    fn stop(&mut self) {
        self.live = false;
    }

    fn now_event_time(&self) -> Nanos {
        self.now_event_time
    }

    fn advance_event_time(&mut self, gen_time: Nanos) {
        self.now_event_time = gen_time;
    }

    fn writers(&self) -> &HashMap<u32, Writer> {
        &self.writers
    }
}

#[test]
fn termination_frame_stops_the_reactor_as_the_final_delivered_frame() {
    let tmp = tempfile::tempdir().unwrap();
    let locator = Locator::new(tmp.path());
    let location = Location::new(Mode::Backtest, Module::System, "scenarios", "termination");
    let dest = 1;

    // The writer and the test's ObserveHelper must watch the same eventfd;
    // `EventFd::borrowed` lets the writer post to it without taking ownership,
    // so the owning handle here controls its lifetime.
    let wakeup_owner = EventFd::create().unwrap();
    let wakeup_fd = wakeup_owner.as_raw_fd();
    let writer = Writer::open(locator.clone(), location.clone(), dest, false, Some(EventFd::borrowed(wakeup_fd))).unwrap();

    writer.mark(1, MsgType::Bar).unwrap();
    writer.mark(2, MsgType::Bar).unwrap();
    writer.mark(3, MsgType::Termination).unwrap();
    drop(writer);

    let mut reader = Reader::new(locator);
    reader.join(location, dest, 0).unwrap();

    let observe = ObserveHelper::new().unwrap();
    observe.add_target(wakeup_fd).unwrap();

    let mut engine = RecordingEngine {
        reader,
        observe,
        writers: HashMap::new(),
        live: true,
        now_event_time: 0,
        reacted: Vec::new(),
    };

    let rc = reactor::run(&mut engine);

    assert_eq!(rc, 0);
    assert!(!engine.is_live());
    assert_eq!(engine.reacted, vec![MsgType::Bar.as_i32(), MsgType::Bar.as_i32(), MsgType::Termination.as_i32()]);
}
