//! Book: the compute engine's in-memory aggregate of positions, orders,
//! trades, and account state (spec §3.4). Nothing here touches disk — it is
//! rebuilt from the journal stream on every engine start.

use std::collections::HashMap;

use crate::model::{Asset, AssetMargin, Direction, Instrument, Order, OrderInput, Position, Trade};

/// Two maps — one per direction — keyed by instrument hash, mirroring the
/// producer-side `InstrumentKey::hash` (spec §3.4).
#[derive(Debug, Default, Clone)]
pub struct Positions {
    pub long: HashMap<u32, Position>,
    pub short: HashMap<u32, Position>,
}

impl Positions {
    fn map_mut(&mut self, direction: Direction) -> &mut HashMap<u32, Position> {
        match direction {
            Direction::Long => &mut self.long,
            Direction::Short => &mut self.short,
        }
    }

    fn map(&self, direction: Direction) -> &HashMap<u32, Position> {
        match direction {
            Direction::Long => &self.long,
            Direction::Short => &self.short,
        }
    }
}

/// In-memory aggregate maintained by the compute engine (spec §3.4). One
/// `Book` per account.
#[derive(Debug, Default, Clone)]
pub struct Book {
    pub positions: Positions,
    pub orders: HashMap<u64, Order>,
    pub trades: HashMap<u64, Trade>,
    pub order_inputs: HashMap<u64, OrderInput>,
    pub commissions: HashMap<u32, f64>,
    pub instruments: HashMap<u32, Instrument>,
    pub asset: Option<Asset>,
    pub asset_margins: HashMap<u32, AssetMargin>,
}

impl Book {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_order_input(&mut self, order_id: u64, input: OrderInput) {
        self.order_inputs.insert(order_id, input);
    }

    pub fn record_order(&mut self, order: Order) {
        self.orders.insert(order.order_id, order);
    }

    pub fn register_instrument(&mut self, instrument: Instrument) {
        self.instruments.insert(instrument.key.hash, instrument);
    }

    /// Apply a fill: update the matching Position's volume and weighted-average
    /// cost (spec §3.4): `new_cost = (old_volume·old_cost + trade_volume·trade_price)
    /// / (old_volume+trade_volume)`, `new_volume = old_volume + trade_volume`.
    pub fn apply_trade(&mut self, trade: Trade) {
        let hash = trade.instrument.hash;
        let positions = self.positions.map_mut(trade.direction);
        let position = positions.entry(hash).or_insert(Position {
            instrument: trade.instrument,
            direction: trade.direction,
            volume: 0,
            cost_price: 0.0,
            unrealized_pnl: 0.0,
            update_time: trade.trade_time,
            trading_day: 0,
        });

        let old_volume = position.volume;
        let trade_volume = trade.volume;
        let new_volume = old_volume + trade_volume;
        position.cost_price = if new_volume == 0 {
            0.0
        } else {
            (position.cost_price * old_volume as f64 + trade.price * trade_volume as f64) / new_volume as f64
        };
        position.volume = new_volume;
        position.update_time = trade.trade_time;

        self.trades.insert(trade.trade_id, trade);
    }

    /// On a Bar, mark every position in the same instrument to market (spec
    /// §3.4): `unrealized_pnl = volume · (close − cost_price) · sign(direction)`.
    pub fn mark_to_bar(&mut self, instrument_hash: u32, close: f64) {
        if let Some(position) = self.positions.long.get_mut(&instrument_hash) {
            position.unrealized_pnl = position.volume as f64 * (close - position.cost_price) * Direction::Long.sign();
        }
        if let Some(position) = self.positions.short.get_mut(&instrument_hash) {
            position.unrealized_pnl = position.volume as f64 * (close - position.cost_price) * Direction::Short.sign();
        }
    }

    /// `asset.avail + sum(position.cost_price·volume + position.unrealized_pnl)`
    /// across every open position (spec §3.4).
    pub fn asset_price(&self) -> f64 {
        let avail = self.asset.as_ref().map(|a| a.avail).unwrap_or(0.0);
        let position_value: f64 = self
            .positions
            .long
            .values()
            .chain(self.positions.short.values())
            .map(|p| p.cost_price * p.volume as f64 + p.unrealized_pnl)
            .sum();
        avail + position_value
    }

    /// Replace the account-level balance snapshot (spec §4.7.3: Asset sync-reset).
    /// Returns the prior value for the caller to diff old-vs-new.
    pub fn replace_asset(&mut self, new: Asset) -> Option<Asset> {
        self.asset.replace(new)
    }

    /// Replace one instrument's margin snapshot (spec §4.7.3: AssetMargin sync-reset).
    pub fn replace_asset_margin(&mut self, instrument_hash: u32, new: AssetMargin) -> Option<AssetMargin> {
        self.asset_margins.insert(instrument_hash, new)
    }

    /// Sync-reset a direction's positions from an authoritative snapshot
    /// (spec §4.7.3: Asset/AssetMargin/PositionBook frames reconcile the
    /// Book). Returns the replaced map for the caller to diff old-vs-new.
    pub fn replace_positions(&mut self, direction: Direction, snapshot: HashMap<u32, Position>) -> HashMap<u32, Position> {
        std::mem::replace(self.positions.map_mut(direction), snapshot)
    }

    pub fn position(&self, instrument_hash: u32, direction: Direction) -> Option<&Position> {
        self.positions.map(direction).get(&instrument_hash)
    }
}
