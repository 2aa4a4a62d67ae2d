//! Tests for [`crate::book::Book`] against the invariants in spec §3.4, §8 (S6).

use crate::book::Book;
use crate::model::trading::OffsetFlag;
use crate::model::{Asset, Direction, InstrumentKey, Trade};

fn trade(instrument: InstrumentKey, volume: i64, price: f64, trade_id: u64) -> Trade {
    Trade {
        trade_id,
        order_id: 1,
        instrument,
        price,
        volume,
        direction: Direction::Long,
        offset: OffsetFlag::Open,
        trade_time: 1,
    }
}

#[test]
fn position_update_on_trade_matches_weighted_average_cost() {
    let mut book = Book::new();
    let instrument = InstrumentKey::new("CME", "ESZ4");

    book.apply_trade(trade(instrument, 10, 100.0, 1));
    let position = book.position(instrument.hash, Direction::Long).unwrap();
    assert_eq!(position.volume, 10);
    assert_eq!(position.cost_price, 100.0);

    book.apply_trade(trade(instrument, 10, 120.0, 2));
    let position = book.position(instrument.hash, Direction::Long).unwrap();
    assert_eq!(position.volume, 20);
    assert_eq!(position.cost_price, 110.0);
}

#[test]
fn unrealized_pnl_follows_bar_close() {
    let mut book = Book::new();
    let instrument = InstrumentKey::new("CME", "ESZ4");
    book.apply_trade(trade(instrument, 10, 100.0, 1));
    book.apply_trade(trade(instrument, 10, 120.0, 2));

    book.mark_to_bar(instrument.hash, 130.0);
    let position = book.position(instrument.hash, Direction::Long).unwrap();
    assert_eq!(position.unrealized_pnl, 400.0);
}

#[test]
fn asset_price_sums_avail_plus_position_value() {
    let mut book = Book::new();
    book.asset = Some(Asset {
        institution: Default::default(),
        account: Default::default(),
        avail: 1_000.0,
        margin: 0.0,
        frozen_margin: 0.0,
        close_profit: 0.0,
        position_profit: 0.0,
        update_time: 0,
    });
    let instrument = InstrumentKey::new("CME", "ESZ4");
    book.apply_trade(trade(instrument, 10, 100.0, 1));
    book.mark_to_bar(instrument.hash, 105.0);

    // avail(1000) + cost(100*10) + unrealized(10*(105-100))
    assert_eq!(book.asset_price(), 1_000.0 + 1_000.0 + 50.0);
}
