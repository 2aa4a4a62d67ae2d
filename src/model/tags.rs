//! Wire-visible message tag table (spec §6.1). Dense discriminants assigned from
//! `PageEnd = 0`; the exact enumeration order is a cross-process contract and must
//! never be reordered — appending is fine, reordering is a wire break.

/// `msg_type` discriminant carried in every frame header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(i32)]
pub enum MsgType {
    PageEnd = 0,
    OrderInput = 1,
    Bar = 2,
    MdSubscribe = 3,
    OrderCancel = 4,
    TradingDay = 5,
    Quote = 6,
    Entrust = 7,
    Transaction = 8,
    OrderActionResp = 9,
    Trade = 10,
    Asset = 11,
    AssetMargin = 12,
    Deregister = 13,
    BrokerStateUpdate = 14,
    TradingStart = 15,
    TradingStop = 16,
    InstrumentKey = 17,
    Instrument = 18,
    Position = 19,
    AccountReq = 20,
    PositionBook = 21,
    Order = 22,
    HistoryOrder = 23,
    HistoryTrade = 24,
    RequestHistoryOrderError = 25,
    RequestHistoryTradeError = 26,
    Termination = 27,
}

/// First tag value reserved for user-defined custom events (spec §6.1).
pub const TAG_MAX_SIZE: i32 = 28;

impl MsgType {
    pub fn as_i32(self) -> i32 {
        self as i32
    }

    /// Recover a well-known tag, or `None` for a value in the custom-tag range
    /// (`>= TAG_MAX_SIZE`) or an out-of-table negative value.
    pub fn from_i32(value: i32) -> Option<Self> {
        use MsgType::*;
        let tag = match value {
            0 => PageEnd,
            1 => OrderInput,
            2 => Bar,
            3 => MdSubscribe,
            4 => OrderCancel,
            5 => TradingDay,
            6 => Quote,
            7 => Entrust,
            8 => Transaction,
            9 => OrderActionResp,
            10 => Trade,
            11 => Asset,
            12 => AssetMargin,
            13 => Deregister,
            14 => BrokerStateUpdate,
            15 => TradingStart,
            16 => TradingStop,
            17 => InstrumentKey,
            18 => Instrument,
            19 => Position,
            20 => AccountReq,
            21 => PositionBook,
            22 => Order,
            23 => HistoryOrder,
            24 => HistoryTrade,
            25 => RequestHistoryOrderError,
            26 => RequestHistoryTradeError,
            27 => Termination,
            _ => return None,
        };
        Some(tag)
    }
}

/// `true` iff `msg_type` is a user-defined custom event, routed to
/// `Strategy::on_custom_data` (spec §4.7.3, §6.1).
pub fn over_max_tag(msg_type: i32) -> bool {
    msg_type >= TAG_MAX_SIZE
}

/// Filter helper mirroring the source's `is<Tag>` template (spec §4.6): `true` iff
/// the frame's `msg_type` equals exactly this tag.
pub fn is_tag(msg_type: i32, tag: MsgType) -> bool {
    msg_type == tag.as_i32()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_every_known_tag() {
        for v in 0..=27 {
            let tag = MsgType::from_i32(v).unwrap();
            assert_eq!(tag.as_i32(), v);
        }
    }

    #[test]
    fn custom_tags_are_not_recognized_by_from_i32() {
        assert!(MsgType::from_i32(TAG_MAX_SIZE).is_none());
        assert!(over_max_tag(TAG_MAX_SIZE));
        assert!(over_max_tag(9999));
        assert!(!over_max_tag(MsgType::Trade.as_i32()));
    }
}
