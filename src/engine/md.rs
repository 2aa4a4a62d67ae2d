//! MD engine (spec §4.7.1): subscribes to the MD-request stream, dispatches to
//! per-account data-service adapters, and owns one writer per MD account.

use std::collections::HashMap;

use crate::bootstrap::FdsMap;
use crate::ids::{hash_account_dest, hash_role_tag, RoleTag};
use crate::journal::{CurrentFrame, FixedBytes, Reader, Writer};
use crate::location::{Locator, Location};
use crate::model::control::TradingStart;
use crate::model::tags::MsgType;
use crate::model::{InstrumentKey, MdSubscribe};
use crate::observer::ObserveHelper;
use crate::reactor::EventEngine;
use crate::time::Nanos;

/// External collaborator that actually talks to a broker's market-data feed
/// (out of scope per spec's non-goals; this is the seam an adapter plugs
/// into). `MdEngine` only forwards `TradingStart`/`MDSubscribe`.
pub trait DataService {
    fn start(&mut self, begin_time: Nanos);
    fn on_subscribe(&mut self, instruments: &[InstrumentKey]);
}

pub struct MdEngine {
    reader: Reader,
    observe: ObserveHelper,
    writers: HashMap<u32, Writer>,
    services: HashMap<u32, Box<dyn DataService>>,
    location: Location,
    request_location: Location,
    fds: FdsMap,
    live: bool,
    now_event_time: Nanos,
}

impl MdEngine {
    pub fn new(locator: Locator, location: Location, fds: FdsMap) -> std::io::Result<Self> {
        let request_location = super::cp_location(location.mode);
        Ok(Self {
            reader: Reader::new(locator),
            observe: ObserveHelper::new()?,
            writers: HashMap::new(),
            services: HashMap::new(),
            location,
            request_location,
            fds,
            live: true,
            now_event_time: 0,
        })
    }

    /// Bind an MD account to its outgoing writer (target directory = MD
    /// location, spec §4.7.1) and the data-service adapter that feeds it.
    pub fn register_account(&mut self, institution: &str, account: &str, writer: Writer, service: Box<dyn DataService>) {
        let dest = hash_account_dest(institution, account);
        self.writers.insert(dest, writer);
        self.services.insert(dest, service);
    }
}

impl EventEngine for MdEngine {
    fn on_setup(&mut self) {
        let dest = hash_role_tag(RoleTag::MdReq);
        if let Err(e) = self.reader.join(self.request_location.clone(), dest, 0) {
            tracing::error!(error = %e, "md engine failed to join MD-request stream");
        }
        self.observe.add_customer(&self.reader, &self.fds);
    }

    fn react(&mut self, frame: CurrentFrame, payload: &[u8]) {
        let Some(tag) = MsgType::from_i32(frame.header.msg_type) else {
            return;
        };
        match tag {
            MsgType::TradingStart if payload.len() == std::mem::size_of::<TradingStart>() => {
                let start = TradingStart::from_bytes(payload);
                for service in self.services.values_mut() {
                    service.start(start.begin_time);
                }
            }
            MsgType::MdSubscribe => {
                let sub = MdSubscribe::decode(payload);
                match self.services.get_mut(&sub.id) {
                    Some(service) => service.on_subscribe(&sub.instruments),
                    None => tracing::debug!(id = sub.id, "MDSubscribe for unregistered data service"),
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
        &self.writers
    }
}
