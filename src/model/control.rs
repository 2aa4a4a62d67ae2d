//! Control-plane messages: session lifecycle, broker state, deregistration
//! (spec §3.3).

use crate::journal::FixedBytes;
use crate::time::Nanos;

use super::fixed_str::FixedStr;

pub const INSTITUTION_LEN: usize = 16;
pub const ACCOUNT_LEN: usize = 24;

/// Broker connection lifecycle (supplemented feature, SPEC_FULL §6: the
/// distilled spec only names the `Ready` state; the full state machine is
/// carried so `BrokerStateUpdate` round-trips meaningfully).
#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BrokerState {
    Pending = 0,
    Idle = 1,
    DisConnected = 2,
    Connected = 3,
    LoggedIn = 4,
    LoginFailed = 5,
    Ready = 6,
}

impl BrokerState {
    pub fn from_i32(v: i32) -> Option<Self> {
        use BrokerState::*;
        let s = match v {
            0 => Pending,
            1 => Idle,
            2 => DisConnected,
            3 => Connected,
            4 => LoggedIn,
            5 => LoginFailed,
            6 => Ready,
            _ => return None,
        };
        Some(s)
    }
}

/// Sent by CP to begin a trading session; every reactor seeds
/// `now_event_time = begin_time` on receipt (spec §5).
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct TradingStart {
    pub begin_time: Nanos,
}
unsafe impl FixedBytes for TradingStart {}

/// Calendar day in `YYYYMMDD` form, folded across MD accounts by CP (spec §4.7.3).
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct TradingDay {
    pub trading_day: u32,
}
unsafe impl FixedBytes for TradingDay {}

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct BrokerStateUpdate {
    pub institution: FixedStr<INSTITUTION_LEN>,
    pub account: FixedStr<ACCOUNT_LEN>,
    pub state: BrokerState,
    pub update_time: Nanos,
}
unsafe impl FixedBytes for BrokerStateUpdate {}

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct Deregister {
    pub institution: FixedStr<INSTITUTION_LEN>,
    pub account: FixedStr<ACCOUNT_LEN>,
}
unsafe impl FixedBytes for Deregister {}

/// Resynchronizes a late-joining engine's [`crate::time::TimeBase`] (SPEC_FULL
/// §5.6). Carried as a custom tag (`>= TAG_MAX_SIZE`) since the canonical tag
/// table (spec §6.1) reserves no slot for it.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct TimeReset {
    pub observed_system_ns: Nanos,
}
unsafe impl FixedBytes for TimeReset {}

/// Join scope for [`crate::journal::Reader::join`] (supplemented feature,
/// SPEC_FULL §6): the spec's `join(location, dest, from_time)` is `CHANNEL`;
/// the rest are carried for forward compatibility with the original source's
/// broader subscription modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JoinMode(pub u32);

impl JoinMode {
    pub const CHANNEL: JoinMode = JoinMode(1 << 0);
    pub const WRITE: JoinMode = JoinMode(1 << 1);
    pub const READ: JoinMode = JoinMode(1 << 2);
    pub const PUBLIC: JoinMode = JoinMode(1 << 3);
    pub const SYNC: JoinMode = JoinMode(1 << 4);
    pub const ALL: JoinMode = JoinMode(0b1_1111);

    pub fn contains(self, other: JoinMode) -> bool {
        self.0 & other.0 == other.0
    }
}

impl std::ops::BitOr for JoinMode {
    type Output = JoinMode;
    fn bitor(self, rhs: JoinMode) -> JoinMode {
        JoinMode(self.0 | rhs.0)
    }
}

/// Paging marker for `HistoryOrder`/`HistoryTrade` streams (supplemented
/// feature, SPEC_FULL §6).
#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistoryDataType {
    Normal = 0,
    PageEnd = 1,
    TotalEnd = 2,
}

impl HistoryDataType {
    pub fn from_i32(v: i32) -> Option<Self> {
        match v {
            0 => Some(HistoryDataType::Normal),
            1 => Some(HistoryDataType::PageEnd),
            2 => Some(HistoryDataType::TotalEnd),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn join_mode_all_contains_every_bit() {
        assert!(JoinMode::ALL.contains(JoinMode::CHANNEL));
        assert!(JoinMode::ALL.contains(JoinMode::PUBLIC));
        assert!(!JoinMode::CHANNEL.contains(JoinMode::WRITE));
    }

    #[test]
    fn broker_state_round_trips() {
        for v in 0..=6 {
            assert_eq!(BrokerState::from_i32(v).unwrap() as i32, v);
        }
        assert!(BrokerState::from_i32(7).is_none());
    }
}
