//! Wakeup aggregator (spec §4.5): blocks a consumer until at least one of its
//! subscribed streams has new data, without polling.

pub mod epoll;
pub mod eventfd;

use std::collections::HashMap;

use crate::journal::Reader;

/// Enrolls every counter a [`Reader`]'s joined streams publish, and blocks on the
/// aggregate. In the compile-time `hp` (high-performance / polling) build mode
/// this degrades to a pure non-blocking [`Reader::data_available`] spin, matching
/// the source's `#ifndef HP` guard.
pub struct ObserveHelper {
    epoll: epoll::Epoll,
    interrupt: eventfd::EventFd,
    enrolled: HashMap<String, ()>,
}

impl ObserveHelper {
    pub fn new() -> std::io::Result<Self> {
        let epoll = epoll::Epoll::create()?;
        let interrupt = eventfd::EventFd::create()?;
        epoll.add_target(std::os::fd::AsRawFd::as_raw_fd(&interrupt))?;
        Ok(Self {
            epoll,
            interrupt,
            enrolled: HashMap::new(),
        })
    }

    /// Enroll an externally-owned target descriptor (e.g. a periodic timer
    /// eventfd, or the engine's own interrupt sender) directly, bypassing the
    /// name→fd map.
    pub fn add_target(&self, fd: std::os::fd::RawFd) -> std::io::Result<()> {
        self.epoll.add_target(fd)
    }

    /// Enroll every counter corresponding to a journal `reader` has joined, by
    /// looking each `(location_uid, dest_id)` key up in the bootstrap-published
    /// name→fd map (spec §6.2).
    pub fn add_customer(&mut self, reader: &Reader, fds: &super::bootstrap::fds::FdsMap) {
        for (location_uid, dest_id) in reader.joined_keys() {
            let key = format!("{location_uid}_{dest_id}");
            if self.enrolled.contains_key(&key) {
                continue;
            }
            if let Some(fd) = fds.get(&key) {
                if self.epoll.add_target(fd).is_ok() {
                    self.enrolled.insert(key, ());
                }
            } else {
                tracing::debug!(key, "no wakeup descriptor published for stream yet");
            }
        }
    }

    /// A cross-process interrupt: post to unblock a consumer promptly even with
    /// nothing new to read (spec §5, used to propagate `stop()`/Termination).
    pub fn interrupt_fd(&self) -> std::os::fd::RawFd {
        std::os::fd::AsRawFd::as_raw_fd(&self.interrupt)
    }

    /// Block until at least one subscribed stream has new data, then re-sort the
    /// reader and return `true`. In `hp` mode, degrades to a non-blocking check.
    #[cfg(not(feature = "hp"))]
    pub fn data_available(&self, reader: &mut Reader) -> bool {
        match self.epoll.wait(-1) {
            Ok(n) if n > 0 => {
                reader.sort();
                true
            }
            _ => false,
        }
    }

    #[cfg(feature = "hp")]
    pub fn data_available(&self, reader: &mut Reader) -> bool {
        reader.data_available()
    }
}
