//! Strategy callback surface hosted by the CP engine (spec §4.7.3, §9).

use crate::model::{Asset, AssetMargin, Bar, BrokerState, Deregister, Entrust, Order, PositionBook, Quote, Trade, Transaction};

/// Implemented by user strategies. Every method has a default no-op body —
/// a strategy overrides only the events it cares about.
pub trait Strategy {
    fn pre_start(&mut self, executor: &mut crate::executor::Executor) {
        let _ = executor;
    }

    fn on_trading_day(&mut self, executor: &mut crate::executor::Executor, trading_day: u32) {
        let (_, _) = (executor, trading_day);
    }

    fn on_bar(&mut self, executor: &mut crate::executor::Executor, source: u32, bar: &Bar) {
        let (_, _, _) = (executor, source, bar);
    }

    fn on_quote(&mut self, executor: &mut crate::executor::Executor, source: u32, quote: &Quote) {
        let (_, _, _) = (executor, source, quote);
    }

    fn on_entrust(&mut self, executor: &mut crate::executor::Executor, source: u32, entrust: &Entrust) {
        let (_, _, _) = (executor, source, entrust);
    }

    fn on_transaction(&mut self, executor: &mut crate::executor::Executor, source: u32, transaction: &Transaction) {
        let (_, _, _) = (executor, source, transaction);
    }

    fn on_order(&mut self, executor: &mut crate::executor::Executor, order: &Order) {
        let (_, _) = (executor, order);
    }

    fn on_trade(&mut self, executor: &mut crate::executor::Executor, trade: &Trade) {
        let (_, _) = (executor, trade);
    }

    /// `old` is the Book's pre-sync snapshot, `new` the authoritative value
    /// just applied (spec §4.7.3: "notify strategy with old-vs-new pair").
    fn on_asset(&mut self, executor: &mut crate::executor::Executor, old: Option<Asset>, new: Asset) {
        let (_, _, _) = (executor, old, new);
    }

    fn on_asset_margin(&mut self, executor: &mut crate::executor::Executor, old: Option<AssetMargin>, new: AssetMargin) {
        let (_, _, _) = (executor, old, new);
    }

    fn on_position_book(&mut self, executor: &mut crate::executor::Executor, book: &PositionBook) {
        let (_, _) = (executor, book);
    }

    fn on_broker_state(&mut self, executor: &mut crate::executor::Executor, institution: &str, account: &str, state: BrokerState) {
        let (_, _, _, _) = (executor, institution, account, state);
    }

    fn on_deregister(&mut self, executor: &mut crate::executor::Executor, deregister: &Deregister) {
        let (_, _) = (executor, deregister);
    }

    fn on_timer(&mut self, executor: &mut crate::executor::Executor, timer_id: u32) {
        let (_, _) = (executor, timer_id);
    }

    fn on_custom_data(&mut self, executor: &mut crate::executor::Executor, msg_type: i32, payload: &[u8]) {
        let (_, _, _) = (executor, msg_type, payload);
    }
}
