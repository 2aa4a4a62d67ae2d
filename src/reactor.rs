//! Reactor: turns a [`Reader`]'s lazy merged sequence into dispatched, typed
//! events (spec §4.6). `EventEngine` is the trait every engine role
//! implements; [`run`] drives the produce loop against any of them.

use std::collections::HashMap;

use crate::journal::{CurrentFrame, Reader, Writer};
use crate::model::tags::{is_tag, MsgType};
use crate::observer::ObserveHelper;
use crate::time::Nanos;

pub use crate::model::tags::{is_tag as is, over_max_tag as is_custom};

/// Contract every MD/TD/CP role implements (spec §4.6).
///
/// `reader_and_observe` exists only so [`run`] can call
/// `ObserveHelper::data_available(&mut Reader)` through the trait: returning
/// both borrows from one `&mut self` method lets each concrete engine split
/// its own disjoint fields, which the borrow checker cannot do across two
/// separate trait methods on an opaque `&mut E`.
pub trait EventEngine {
    /// One-time setup (open writers, join streams) before the first `react()`.
    fn on_setup(&mut self);

    /// Declare filters/handlers, then dispatch `frame`'s payload. Called once
    /// per delivered frame by the produce loop.
    fn react(&mut self, frame: CurrentFrame, payload: &[u8]);

    /// Called once per outer loop iteration, before checking for new data —
    /// a hook for periodic housekeeping that doesn't wait on the reader.
    fn on_active(&mut self) {}

    fn reader(&self) -> &Reader;
    fn reader_mut(&mut self) -> &mut Reader;
    fn reader_and_observe(&mut self) -> (&mut Reader, &ObserveHelper);

    fn has_data(&mut self) -> bool {
        self.reader_mut().data_available()
    }

    fn current_frame(&self) -> Option<CurrentFrame> {
        self.reader().current_frame()
    }

    fn current_payload(&self) -> Option<&[u8]> {
        self.reader().payload()
    }

    fn advance_reader(&mut self) {
        self.reader_mut().next();
    }

    fn is_live(&self) -> bool;
    fn stop(&mut self);

    /// The largest `gen_time` observed so far — the strategy's logical clock
    /// (spec §4.6).
    fn now_event_time(&self) -> Nanos;
    fn advance_event_time(&mut self, gen_time: Nanos);

    /// Exclusive upper bound on `gen_time`; `Nanos::MAX` for a live/unbounded
    /// run, a fixed cutoff for replay/backtest.
    fn end_time(&self) -> Nanos {
        Nanos::MAX
    }

    fn writers(&self) -> &HashMap<u32, Writer>;

    fn get_writer(&self, dest_id: u32) -> Option<&Writer> {
        self.writers().get(&dest_id)
    }
}

/// The produce loop (spec §4.6):
/// ```text
/// while continual and live:
///     on_active()
///     while ObserveHelper.data_available():
///         while live and reader.data_available():
///             frame = reader.current_frame()
///             if frame.gen_time > end_time: stop; return
///             now_event_time = max(now_event_time, frame.gen_time)
///             subscriber.on_next(frame)
///             reader.next()
/// ```
/// Single-threaded, cooperative: `react()` runs to completion before the next
/// frame is delivered (spec §4.6 concurrency contract).
pub fn run<E: EventEngine>(engine: &mut E) -> i32 {
    engine.on_setup();
    while engine.is_live() {
        engine.on_active();
        loop {
            let woke = {
                let (reader, observe) = engine.reader_and_observe();
                observe.data_available(reader)
            };
            if !woke {
                break;
            }
            while engine.is_live() && engine.has_data() {
                let Some(frame) = engine.current_frame() else { break };
                if frame.header.gen_time > engine.end_time() {
                    engine.stop();
                    return 0;
                }
                engine.advance_event_time(frame.header.gen_time);
                let payload = engine.current_payload().map(|p| p.to_vec()).unwrap_or_default();
                engine.react(frame, &payload);
                engine.advance_reader();
            }
            if !engine.is_live() {
                break;
            }
        }
    }
    0
}

/// One-shot variant of [`run`] for tests: process at most one delivered frame.
pub fn step<E: EventEngine>(engine: &mut E) -> bool {
    if !engine.has_data() {
        return false;
    }
    let Some(frame) = engine.current_frame() else { return false };
    engine.advance_event_time(frame.header.gen_time);
    let payload = engine.current_payload().map(|p| p.to_vec()).unwrap_or_default();
    engine.react(frame, &payload);
    engine.advance_reader();
    true
}

/// Recognize the `Termination` control frame, the one tag every engine role
/// reacts to identically (spec §4.7, §5).
pub fn is_termination(msg_type: i32) -> bool {
    is_tag(msg_type, MsgType::Termination)
}
