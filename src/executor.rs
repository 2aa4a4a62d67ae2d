//! Executor: the strategy-facing surface for order entry, account requests,
//! subscriptions, and timers (spec §4.7.3).
//!
//! Owned by the CP engine, handed to `Strategy` callbacks as a `&mut`
//! reference rather than via a back-pointer — the source's Executor/Engine
//! pair is cyclic; here ownership runs one way (spec §9 Open Question).

use std::collections::HashMap;

use crate::error::{BrokerNotReady, CoreError};
use crate::ids::hash_account_dest;
use crate::journal::{FixedBytes, Writer};
use crate::model::tags::MsgType;
use crate::model::trading::{AccountReq, OrderCancel, OrderInput};
use crate::model::{Direction, InstrumentKey, MdSubscribe, OffsetFlag};
use crate::observer::eventfd::EventFd;
use crate::time::Nanos;

/// A periodic or one-shot wakeup registered via [`Executor::add_timer`] /
/// [`Executor::add_time_interval`] (spec §5: "configuration may provide a
/// periodic wakeup via an engine-owned eventfd").
pub struct Timer {
    pub id: u32,
    pub fire_at: Nanos,
    pub interval: Option<Nanos>,
}

/// Order/account entry point exposed to strategies (spec §4.7.3). Holds one
/// writer per TD account plus the shared `MD_REQ` writer; account uid ->
/// writer lookups drive both `insert_order`/`cancel_order` and routing
/// `AccountReq`.
pub struct Executor {
    td_writers: HashMap<u32, Writer>,
    md_req_writer: Writer,
    td_location_uid: u32,
    timers: Vec<Timer>,
    next_timer_id: u32,
    timer_wakeup: EventFd,
}

impl Executor {
    pub fn new(md_req_writer: Writer, td_location_uid: u32) -> std::io::Result<Self> {
        Ok(Self {
            td_writers: HashMap::new(),
            md_req_writer,
            td_location_uid,
            timers: Vec::new(),
            next_timer_id: 0,
            timer_wakeup: EventFd::create()?,
        })
    }

    pub fn register_account(&mut self, institution: &str, account: &str, writer: Writer) {
        self.td_writers.insert(hash_account_dest(institution, account), writer);
    }

    /// Writers keyed by destination id, for `EventEngine::writers()`/`get_writer`.
    pub fn writers(&self) -> &HashMap<u32, Writer> {
        &self.td_writers
    }

    fn writer_for(&self, institution: &str, account: &str) -> Result<&Writer, CoreError> {
        let dest = hash_account_dest(institution, account);
        self.td_writers
            .get(&dest)
            .ok_or(CoreError::BrokerNotReady(BrokerNotReady { account_uid: dest }))
    }

    /// Open an `OrderInput` frame on the target account's stream, stamp
    /// `order_id = writer.current_frame_uid()` and `insert_time = now`, close
    /// (spec §4.7.3). Returns the minted `order_id`.
    pub fn insert_order(
        &self,
        institution: &str,
        account: &str,
        instrument: InstrumentKey,
        price: f64,
        volume: i64,
        direction: Direction,
        offset: OffsetFlag,
        price_type: i32,
    ) -> Result<u64, CoreError> {
        let writer = self.writer_for(institution, account)?;
        let now = crate::time::now_in_nano();
        let open = writer.open_frame(now, MsgType::OrderInput.as_i32(), std::mem::size_of::<OrderInput>() as u32)?;
        let order_id = open.frame_uid();
        let input = OrderInput {
            order_id,
            instrument,
            institution: crate::model::fixed_str::FixedStr::new(institution),
            account: crate::model::fixed_str::FixedStr::new(account),
            price,
            volume,
            direction,
            offset,
            price_type,
            insert_time: now,
        };
        writer.payload_mut(&open).copy_from_slice(input.as_bytes());
        writer.close_frame(std::mem::size_of::<OrderInput>(), crate::time::now_in_nano());
        Ok(order_id)
    }

    /// `cancel_order(order_id)` recovers the account uid from the id's upper
    /// 32 bits (spec §4.7.3: `(order_id >> 32) xor td_location_uid`).
    pub fn cancel_order(&self, order_id: u64, instrument: InstrumentKey) -> Result<(), CoreError> {
        let account_uid = ((order_id >> 32) as u32) ^ self.td_location_uid;
        let writer = self
            .td_writers
            .get(&account_uid)
            .ok_or(CoreError::BrokerNotReady(BrokerNotReady { account_uid }))?;
        let cancel = OrderCancel {
            order_id,
            instrument,
            insert_time: crate::time::now_in_nano(),
        };
        writer.write_fixed(crate::time::now_in_nano(), MsgType::OrderCancel, &cancel)
    }

    pub fn req_account_info(&self, institution: &str, account: &str) -> Result<(), CoreError> {
        let writer = self.writer_for(institution, account)?;
        let req = AccountReq {
            institution: crate::model::fixed_str::FixedStr::new(institution),
            account: crate::model::fixed_str::FixedStr::new(account),
            req_time: crate::time::now_in_nano(),
        };
        writer.write_fixed(crate::time::now_in_nano(), MsgType::AccountReq, &req)
    }

    /// Publish an `MDSubscribe` onto the shared `MD_REQ` stream.
    pub fn subscribe(&self, id: u32, instruments: Vec<InstrumentKey>) -> Result<(), CoreError> {
        let sub = MdSubscribe { id, instruments };
        self.md_req_writer.write_unfixed(crate::time::now_in_nano(), MsgType::MdSubscribe, &sub.encode())
    }

    /// One-shot wakeup at `fire_at` (spec §5). Delivered as an ordinary event
    /// on the reactor's next loop iteration once `fire_at` has passed.
    pub fn add_timer(&mut self, fire_at: Nanos) -> u32 {
        let id = self.next_timer_id;
        self.next_timer_id += 1;
        self.timers.push(Timer { id, fire_at, interval: None });
        id
    }

    /// Recurring wakeup every `interval` nanoseconds, first firing at
    /// `now + interval`.
    pub fn add_time_interval(&mut self, interval: Nanos) -> u32 {
        let id = self.next_timer_id;
        self.next_timer_id += 1;
        let fire_at = crate::time::now_in_nano() + interval;
        self.timers.push(Timer { id, fire_at, interval: Some(interval) });
        id
    }

    /// Eventfd backing the timer queue, enrolled with the engine's
    /// `ObserveHelper` at setup.
    pub fn timer_wakeup_fd(&self) -> std::os::fd::RawFd {
        std::os::fd::AsRawFd::as_raw_fd(&self.timer_wakeup)
    }

    /// Drain every timer whose `fire_at` has passed, rescheduling recurring
    /// ones, and return their ids for the engine to dispatch as synthetic
    /// events.
    pub fn poll_timers(&mut self, now: Nanos) -> Vec<u32> {
        let mut fired = Vec::new();
        for timer in &mut self.timers {
            if timer.fire_at <= now {
                fired.push(timer.id);
                match timer.interval {
                    Some(interval) => timer.fire_at = now + interval,
                    None => timer.fire_at = Nanos::MAX,
                }
            }
        }
        self.timers.retain(|t| t.fire_at != Nanos::MAX);
        fired
    }
}
