//! Bootstrapping: configuration loading and cross-process descriptor sharing
//! (spec §6.2).

pub mod config;
pub mod fds;

pub use config::{wakeup_keys, AccountConfig, Config, StrategyConfig, SystemConfig};
pub use fds::{send_fd_set, write_fallback_file, FdsMap};
