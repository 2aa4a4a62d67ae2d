//! CP (compute) engine (spec §4.7.3): hosts the user `Strategy`, joins every
//! MD account's data stream and the shared `TD_RESPONSE` stream, maintains
//! the `Book`, and exposes order entry through the `Executor`.

use std::collections::HashMap;

use crate::book::Book;
use crate::bootstrap::FdsMap;
use crate::executor::Executor;
use crate::ids::{hash_account_dest, hash_role_tag, RoleTag};
use crate::journal::{CurrentFrame, FixedBytes, Reader, Writer};
use crate::location::{Locator, Location};
use crate::model::control::TradingDay;
use crate::model::tags::{over_max_tag, MsgType};
use crate::model::trading::{Asset, AssetMargin, Order, Trade};
use crate::model::{Bar, BrokerStateUpdate, Deregister, Direction, Entrust, PositionBook, Quote, Transaction};
use crate::observer::ObserveHelper;
use crate::reactor::EventEngine;
use crate::strategy::Strategy;
use crate::time::Nanos;

pub struct CpEngine {
    reader: Reader,
    observe: ObserveHelper,
    book: Book,
    executor: Executor,
    strategy: Box<dyn Strategy>,
    md_location: Location,
    td_location: Location,
    md_account_dests: Vec<u32>,
    fds: FdsMap,
    trading_day_fold: u32,
    live: bool,
    now_event_time: Nanos,
}

impl CpEngine {
    pub fn new(
        locator: Locator,
        mode: crate::location::Mode,
        md_accounts: &[(String, String)],
        executor: Executor,
        strategy: Box<dyn Strategy>,
        fds: FdsMap,
    ) -> std::io::Result<Self> {
        let md_account_dests = md_accounts.iter().map(|(inst, acc)| hash_account_dest(inst, acc)).collect();
        Ok(Self {
            reader: Reader::new(locator),
            observe: ObserveHelper::new()?,
            book: Book::new(),
            executor,
            strategy,
            md_location: super::md_location(mode),
            td_location: super::td_location(mode),
            md_account_dests,
            fds,
            trading_day_fold: 0,
            live: true,
            now_event_time: 0,
        })
    }

    pub fn executor_mut(&mut self) -> &mut Executor {
        &mut self.executor
    }

    /// `frame.header.dest` distinguishes which MD account a Bar/Quote/Entrust/
    /// Transaction came from — every MD account writer shares one `md_location`
    /// (spec §4.7.1), so the destination id, not the source location uid, is
    /// the account discriminator ("source JID" in spec §4.7.3).
    fn source_account(frame: &CurrentFrame) -> u32 {
        frame.header.dest
    }
}

impl EventEngine for CpEngine {
    fn on_setup(&mut self) {
        for &dest in &self.md_account_dests {
            if let Err(e) = self.reader.join(self.md_location.clone(), dest, 0) {
                tracing::error!(error = %e, dest, "cp engine failed to join an MD account stream");
            }
        }
        let td_response = hash_role_tag(RoleTag::TdResponse);
        if let Err(e) = self.reader.join(self.td_location.clone(), td_response, 0) {
            tracing::error!(error = %e, "cp engine failed to join TD_RESPONSE stream");
        }
        if let Err(e) = self.observe.add_target(self.executor.timer_wakeup_fd()) {
            tracing::error!(error = %e, "cp engine failed to enroll timer wakeup");
        }
        self.observe.add_customer(&self.reader, &self.fds);
        self.strategy.pre_start(&mut self.executor);
    }

    fn on_active(&mut self) {
        let now = crate::time::now_in_nano();
        for id in self.executor.poll_timers(now) {
            self.strategy.on_timer(&mut self.executor, id);
        }
    }

    fn react(&mut self, frame: CurrentFrame, payload: &[u8]) {
        let raw = frame.header.msg_type;
        let Some(tag) = MsgType::from_i32(raw) else {
            if over_max_tag(raw) {
                self.strategy.on_custom_data(&mut self.executor, raw, payload);
            }
            return;
        };
        match tag {
            MsgType::TradingDay if payload.len() == std::mem::size_of::<TradingDay>() => {
                let day = TradingDay::from_bytes(payload);
                self.trading_day_fold += 1;
                let fold = self.md_account_dests.len().max(1) as u32;
                if self.trading_day_fold % fold == 0 {
                    self.strategy.on_trading_day(&mut self.executor, day.trading_day);
                }
            }
            MsgType::Bar if payload.len() == std::mem::size_of::<Bar>() => {
                let bar = Bar::from_bytes(payload);
                self.book.mark_to_bar(bar.instrument.hash, bar.close);
                self.strategy.on_bar(&mut self.executor, Self::source_account(&frame), &bar);
            }
            MsgType::Quote if payload.len() == std::mem::size_of::<Quote>() => {
                let quote = Quote::from_bytes(payload);
                self.strategy.on_quote(&mut self.executor, Self::source_account(&frame), &quote);
            }
            MsgType::Entrust if payload.len() == std::mem::size_of::<Entrust>() => {
                let entrust = Entrust::from_bytes(payload);
                self.strategy.on_entrust(&mut self.executor, Self::source_account(&frame), &entrust);
            }
            MsgType::Transaction if payload.len() == std::mem::size_of::<Transaction>() => {
                let transaction = Transaction::from_bytes(payload);
                self.strategy.on_transaction(&mut self.executor, Self::source_account(&frame), &transaction);
            }
            MsgType::Trade if payload.len() == std::mem::size_of::<Trade>() => {
                let trade = Trade::from_bytes(payload);
                self.book.apply_trade(trade);
                self.strategy.on_trade(&mut self.executor, &trade);
            }
            MsgType::Order if payload.len() == std::mem::size_of::<Order>() => {
                let order = Order::from_bytes(payload);
                self.book.record_order(order);
                self.strategy.on_order(&mut self.executor, &order);
            }
            MsgType::Asset if payload.len() == std::mem::size_of::<Asset>() => {
                let asset = Asset::from_bytes(payload);
                let old = self.book.replace_asset(asset);
                self.strategy.on_asset(&mut self.executor, old, asset);
            }
            MsgType::AssetMargin if payload.len() == std::mem::size_of::<AssetMargin>() => {
                let margin = AssetMargin::from_bytes(payload);
                let old = self.book.replace_asset_margin(margin.instrument.hash, margin);
                self.strategy.on_asset_margin(&mut self.executor, old, margin);
            }
            MsgType::PositionBook => {
                let snapshot = PositionBook::decode(payload);
                self.book.replace_positions(Direction::Long, snapshot.long.clone());
                self.book.replace_positions(Direction::Short, snapshot.short.clone());
                self.strategy.on_position_book(&mut self.executor, &snapshot);
            }
            MsgType::BrokerStateUpdate if payload.len() == std::mem::size_of::<BrokerStateUpdate>() => {
                let update = BrokerStateUpdate::from_bytes(payload);
                self.strategy.on_broker_state(&mut self.executor, update.institution.as_str(), update.account.as_str(), update.state);
            }
            MsgType::Deregister if payload.len() == std::mem::size_of::<Deregister>() => {
                let deregister = Deregister::from_bytes(payload);
                self.strategy.on_deregister(&mut self.executor, &deregister);
            }
            MsgType::Termination => self.stop(),
            _ => tracing::trace!(raw, "unhandled or malformed frame"),
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
        self.executor.writers()
    }
}
