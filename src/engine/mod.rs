//! Engine roles: MD, TD, CP (spec §4.7). Each wraps a [`crate::journal::Reader`],
//! an [`crate::observer::ObserveHelper`], and a set of [`crate::journal::Writer`]s,
//! and implements [`crate::reactor::EventEngine`] so [`crate::reactor::run`] can
//! drive any of them with the same produce loop.

pub mod cp;
pub mod md;
pub mod td;

use crate::location::{Location, Mode, Module};

/// Well-known identity each role binds to so the other roles can join its
/// streams without a separate location-discovery protocol (spec §6.2 only
/// specifies descriptor, not location, exchange — this is the simplification
/// recorded in DESIGN.md).
pub fn md_location(mode: Mode) -> Location {
    Location::new(mode, Module::Md, "md", "main")
}

pub fn td_location(mode: Mode) -> Location {
    Location::new(mode, Module::Td, "td", "main")
}

/// Where order entry (`OrderInput`/`OrderCancel`/`AccountReq`) and `MDSubscribe`
/// requests are published — CP's own identity, joined by both MD and TD.
pub fn cp_location(mode: Mode) -> Location {
    Location::new(mode, Module::Strategy, "cp", "main")
}
