//! `HistoryOrder`/`HistoryTrade`: UNFIXED, paged replay of an account's past
//! orders/trades (supplemented feature, SPEC_FULL §6), tagged with
//! [`HistoryDataType`] so a consumer can tell a real record from a page or
//! stream terminator.

use super::control::HistoryDataType;
use super::trading::{Order, Trade};

use crate::journal::FixedBytes;

#[derive(Debug, Clone)]
pub struct HistoryOrder {
    pub data_type: HistoryDataType,
    pub order: Option<Order>,
}

impl HistoryOrder {
    pub fn encode(&self) -> Vec<u8> {
        encode_tagged(self.data_type, self.order.as_ref().map(|o| o.as_bytes()))
    }

    pub fn decode(buf: &[u8]) -> Self {
        let (data_type, payload) = decode_tagged(buf);
        Self {
            data_type,
            order: payload.map(Order::from_bytes),
        }
    }
}

#[derive(Debug, Clone)]
pub struct HistoryTrade {
    pub data_type: HistoryDataType,
    pub trade: Option<Trade>,
}

impl HistoryTrade {
    pub fn encode(&self) -> Vec<u8> {
        encode_tagged(self.data_type, self.trade.as_ref().map(|t| t.as_bytes()))
    }

    pub fn decode(buf: &[u8]) -> Self {
        let (data_type, payload) = decode_tagged(buf);
        Self {
            data_type,
            trade: payload.map(Trade::from_bytes),
        }
    }
}

fn encode_tagged(data_type: HistoryDataType, payload: Option<&[u8]>) -> Vec<u8> {
    let mut out = vec![data_type as i32 as u8];
    match payload {
        Some(bytes) => {
            out.push(1);
            out.extend_from_slice(bytes);
        }
        None => out.push(0),
    }
    out
}

fn decode_tagged(buf: &[u8]) -> (HistoryDataType, Option<&[u8]>) {
    let data_type = HistoryDataType::from_i32(buf[0] as i32).expect("unknown HistoryDataType tag");
    let present = buf[1] != 0;
    (data_type, if present { Some(&buf[2..]) } else { None })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::market::{Direction, InstrumentKey};
    use crate::model::trading::{OffsetFlag, OrderStatus};

    #[test]
    fn page_end_carries_no_order() {
        let msg = HistoryOrder {
            data_type: HistoryDataType::PageEnd,
            order: None,
        };
        let back = HistoryOrder::decode(&msg.encode());
        assert_eq!(back.data_type, HistoryDataType::PageEnd);
        assert!(back.order.is_none());
    }

    #[test]
    fn normal_record_round_trips_the_order() {
        let order = Order {
            order_id: 5,
            instrument: InstrumentKey::new("CME", "ESZ4"),
            price: 100.0,
            volume: 1,
            volume_traded: 1,
            volume_left: 0,
            direction: Direction::Long,
            offset: OffsetFlag::Open,
            status: OrderStatus::Filled,
            insert_time: 1,
            update_time: 2,
        };
        let msg = HistoryOrder {
            data_type: HistoryDataType::Normal,
            order: Some(order),
        };
        let back = HistoryOrder::decode(&msg.encode());
        assert_eq!(back.order.unwrap().order_id, 5);
    }
}
