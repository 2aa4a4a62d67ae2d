//! Core data model: the message families carried on the journal bus and their
//! framing contract (spec §3.3).

pub mod control;
pub mod fixed_str;
pub mod history;
pub mod market;
pub mod position_book;
pub mod subscribe;
pub mod tags;
pub mod trading;

pub use control::{BrokerState, BrokerStateUpdate, Deregister, HistoryDataType, JoinMode, TimeReset, TradingDay, TradingStart};
pub use history::{HistoryOrder, HistoryTrade};
pub use market::{Bar, Direction, Entrust, Instrument, InstrumentKey, Quote, Transaction};
pub use position_book::PositionBook;
pub use subscribe::MdSubscribe;
pub use tags::MsgType;
pub use trading::{AccountReq, Asset, AssetMargin, OffsetFlag, Order, OrderActionResp, OrderCancel, OrderInput, OrderStatus, Position, Trade};
