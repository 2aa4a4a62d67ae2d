//! TD engine (spec §4.7.2): subscribes to each configured TD account's order
//! stream (published by CP under TD's own location, keyed by account hash —
//! this is what makes `order_id >> 32 xor td_location_uid` recover the
//! account, spec §3.1/§8), routes to the account's broker adapter only while
//! its state is `Ready`, and publishes every response onto the single shared
//! `TD_RESPONSE` stream.

use std::collections::HashMap;

use crate::bootstrap::FdsMap;
use crate::ids::{hash_account_dest, hash_role_tag, RoleTag};
use crate::journal::{CurrentFrame, FixedBytes, Reader, Writer};
use crate::location::{Locator, Location};
use crate::model::control::{BrokerState, TradingStart};
use crate::model::tags::MsgType;
use crate::model::trading::{AccountReq, OrderCancel, OrderInput};
use crate::model::BrokerStateUpdate;
use crate::model::fixed_str::FixedStr;
use crate::observer::ObserveHelper;
use crate::reactor::EventEngine;
use crate::time::Nanos;

/// External collaborator that actually talks to a broker's trading gateway
/// (out of scope per spec's non-goals).
pub trait TradeService {
    fn start(&mut self);
    fn insert_order(&mut self, input: &OrderInput);
    fn cancel_order(&mut self, cancel: &OrderCancel);
    fn req_account_info(&mut self, req: &AccountReq);
}

struct Account {
    institution: String,
    account: String,
    service: Box<dyn TradeService>,
    state: BrokerState,
}

pub struct TdEngine {
    reader: Reader,
    observe: ObserveHelper,
    response_writer: Writer,
    /// Always empty: TD owns no per-destination writers of its own, only the
    /// shared `response_writer`. Kept so `writers()`/`get_writer()` have
    /// something to borrow from without a dedicated static.
    no_writers: HashMap<u32, Writer>,
    accounts: HashMap<u32, Account>,
    location: Location,
    fds: FdsMap,
    live: bool,
    now_event_time: Nanos,
}

impl TdEngine {
    pub fn new(locator: Locator, location: Location, response_writer: Writer, fds: FdsMap) -> std::io::Result<Self> {
        Ok(Self {
            reader: Reader::new(locator),
            observe: ObserveHelper::new()?,
            response_writer,
            no_writers: HashMap::new(),
            accounts: HashMap::new(),
            location,
            fds,
            live: true,
            now_event_time: 0,
        })
    }

    pub fn register_account(&mut self, institution: &str, account: &str, service: Box<dyn TradeService>) {
        let dest = hash_account_dest(institution, account);
        self.accounts.insert(
            dest,
            Account {
                institution: institution.to_string(),
                account: account.to_string(),
                service,
                state: BrokerState::Pending,
            },
        );
    }

    /// Called by a broker adapter when connection/login state changes.
    /// Updates the local map and publishes a `BrokerStateUpdate` onto
    /// `TD_RESPONSE` so CP observes the transition (spec §4.7.3).
    pub fn set_broker_state(&mut self, account_uid: u32, state: BrokerState) {
        let Some(entry) = self.accounts.get_mut(&account_uid) else { return };
        entry.state = state;
        let update = BrokerStateUpdate {
            institution: FixedStr::new(&entry.institution),
            account: FixedStr::new(&entry.account),
            state,
            update_time: crate::time::now_in_nano(),
        };
        if let Err(e) = self.response_writer.write_fixed(crate::time::now_in_nano(), MsgType::BrokerStateUpdate, &update) {
            tracing::warn!(error = %e, "failed to publish BrokerStateUpdate");
        }
    }

    fn account_uid_of(&self, order_id: u64) -> u32 {
        ((order_id >> 32) as u32) ^ self.location.uid
    }
}

impl EventEngine for TdEngine {
    fn on_setup(&mut self) {
        let dests: Vec<u32> = self.accounts.keys().copied().collect();
        for dest in dests {
            if let Err(e) = self.reader.join(self.location.clone(), dest, 0) {
                tracing::error!(error = %e, dest, "td engine failed to join an account's order stream");
            }
        }
        self.observe.add_customer(&self.reader, &self.fds);
    }

    fn react(&mut self, frame: CurrentFrame, payload: &[u8]) {
        let Some(tag) = MsgType::from_i32(frame.header.msg_type) else {
            return;
        };
        match tag {
            MsgType::OrderInput if payload.len() == std::mem::size_of::<OrderInput>() => {
                let input = OrderInput::from_bytes(payload);
                let account_uid = self.account_uid_of(input.order_id);
                self.route(account_uid, |entry| entry.service.insert_order(&input));
            }
            MsgType::OrderCancel if payload.len() == std::mem::size_of::<OrderCancel>() => {
                let cancel = OrderCancel::from_bytes(payload);
                let account_uid = self.account_uid_of(cancel.order_id);
                self.route(account_uid, |entry| entry.service.cancel_order(&cancel));
            }
            MsgType::AccountReq if payload.len() == std::mem::size_of::<AccountReq>() => {
                let req = AccountReq::from_bytes(payload);
                let account_uid = hash_account_dest(req.institution.as_str(), req.account.as_str());
                self.route(account_uid, |entry| entry.service.req_account_info(&req));
            }
            MsgType::TradingStart if payload.len() == std::mem::size_of::<TradingStart>() => {
                for entry in self.accounts.values_mut() {
                    entry.service.start();
                }
            }
            MsgType::Termination => self.stop(),
            _ => {}
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
        self.now_event_time = self.now_event_time.max(gen_time);
    }

    fn writers(&self) -> &HashMap<u32, Writer> {
        &self.no_writers
    }
}

impl TdEngine {
    /// Route to `account_uid`'s trade service only while its broker state is
    /// `Ready` (spec §4.7.2); otherwise log and drop (spec §4.8).
    fn route(&mut self, account_uid: u32, f: impl FnOnce(&mut Account)) {
        match self.accounts.get_mut(&account_uid) {
            Some(entry) if entry.state == BrokerState::Ready => f(entry),
            Some(_) => tracing::debug!(account_uid, "broker not ready, dropping request"),
            None => tracing::warn!(account_uid, "request for unknown account"),
        }
    }
}
