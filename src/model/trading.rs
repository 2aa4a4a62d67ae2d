//! Trading request/response message families (spec §3.3).

use crate::journal::FixedBytes;
use crate::time::Nanos;

use super::control::{ACCOUNT_LEN, INSTITUTION_LEN};
use super::fixed_str::FixedStr;
use super::market::{Direction, InstrumentKey};

/// Where a trade nets against existing exposure.
#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OffsetFlag {
    Open = 0,
    Close = 1,
    CloseToday = 2,
    CloseYesterday = 3,
}

impl OffsetFlag {
    pub fn from_i32(v: i32) -> Option<Self> {
        use OffsetFlag::*;
        Some(match v {
            0 => Open,
            1 => Close,
            2 => CloseToday,
            3 => CloseYesterday,
            _ => return None,
        })
    }
}

#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderStatus {
    Unknown = 0,
    Submitted = 1,
    PartialFilled = 2,
    Filled = 3,
    Cancelled = 4,
    Rejected = 5,
}

/// Outbound new-order request (spec §3.3, §4.7.3). `order_id` is zero until
/// [`crate::journal::Writer::current_frame_uid`] stamps it during
/// `Executor::insert_order`.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct OrderInput {
    pub order_id: u64,
    pub instrument: InstrumentKey,
    pub institution: FixedStr<INSTITUTION_LEN>,
    pub account: FixedStr<ACCOUNT_LEN>,
    pub price: f64,
    pub volume: i64,
    pub direction: Direction,
    pub offset: OffsetFlag,
    pub price_type: i32,
    pub insert_time: Nanos,
}
unsafe impl FixedBytes for OrderInput {}

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct OrderCancel {
    pub order_id: u64,
    pub instrument: InstrumentKey,
    pub insert_time: Nanos,
}
unsafe impl FixedBytes for OrderCancel {}

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct AccountReq {
    pub institution: FixedStr<INSTITUTION_LEN>,
    pub account: FixedStr<ACCOUNT_LEN>,
    pub req_time: Nanos,
}
unsafe impl FixedBytes for AccountReq {}

/// Broker-acknowledged order state (spec §3.3, §3.4).
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct Order {
    pub order_id: u64,
    pub instrument: InstrumentKey,
    pub price: f64,
    pub volume: i64,
    pub volume_traded: i64,
    pub volume_left: i64,
    pub direction: Direction,
    pub offset: OffsetFlag,
    pub status: OrderStatus,
    pub insert_time: Nanos,
    pub update_time: Nanos,
}
unsafe impl FixedBytes for Order {}

/// A fill (spec §3.4: applying one of these updates the matching Position).
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct Trade {
    pub trade_id: u64,
    pub order_id: u64,
    pub instrument: InstrumentKey,
    pub price: f64,
    pub volume: i64,
    pub direction: Direction,
    pub offset: OffsetFlag,
    pub trade_time: Nanos,
}
unsafe impl FixedBytes for Trade {}

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct OrderActionResp {
    pub order_id: u64,
    pub error_id: i32,
    pub error_msg: FixedStr<64>,
    pub action_time: Nanos,
}
unsafe impl FixedBytes for OrderActionResp {}

/// Account-level balance snapshot. `asset_price` is *not* stored here — it is
/// a derived quantity over this plus the Book's positions (spec §3.4).
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct Asset {
    pub institution: FixedStr<INSTITUTION_LEN>,
    pub account: FixedStr<ACCOUNT_LEN>,
    pub avail: f64,
    pub margin: f64,
    pub frozen_margin: f64,
    pub close_profit: f64,
    pub position_profit: f64,
    pub update_time: Nanos,
}
unsafe impl FixedBytes for Asset {}

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct AssetMargin {
    pub institution: FixedStr<INSTITUTION_LEN>,
    pub account: FixedStr<ACCOUNT_LEN>,
    pub instrument: InstrumentKey,
    pub margin: f64,
    pub update_time: Nanos,
}
unsafe impl FixedBytes for AssetMargin {}

/// One side's exposure in a single instrument (spec §3.4).
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct Position {
    pub instrument: InstrumentKey,
    pub direction: Direction,
    pub volume: i64,
    pub cost_price: f64,
    pub unrealized_pnl: f64,
    pub update_time: Nanos,
    pub trading_day: u32,
}
unsafe impl FixedBytes for Position {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn order_input_bytes_round_trip() {
        let input = OrderInput {
            order_id: 0,
            instrument: InstrumentKey::new("CME", "ESZ4"),
            institution: FixedStr::new("X"),
            account: FixedStr::new("Y"),
            price: 100.5,
            volume: 5,
            direction: Direction::Long,
            offset: OffsetFlag::Open,
            price_type: 0,
            insert_time: 42,
        };
        let bytes = input.as_bytes().to_vec();
        let back = OrderInput::from_bytes(&bytes);
        assert_eq!(back.volume, 5);
        assert_eq!(back.insert_time, 42);
        assert_eq!(back.account.as_str(), "Y");
    }
}
