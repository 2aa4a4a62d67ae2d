//! Multi-stream time-ordered merge (spec §4.4): presents a dynamic set of
//! `(location, destination)` journals as a single cursor ordered by `gen_time`.

use std::collections::HashMap;

use crate::error::JournalError;
use crate::location::{Locator, Location};
use crate::model::control::JoinMode;
use crate::time::Nanos;

use super::frame::FrameHeader;
use super::journal::Journal;

/// Stable key for a joined stream: `(location_uid, destination_id)`.
pub type StreamKey = (u32, u32);

/// The frame at the reader's current cursor, together with which stream it
/// came from (callers recover the originating JID from `key.0`).
#[derive(Debug, Clone, Copy)]
pub struct CurrentFrame {
    pub key: StreamKey,
    pub header: FrameHeader,
}

/// Owns one read-mode [`Journal`] per joined stream and merges them by
/// `gen_time` (spec §4.4). The "sort" is a linear scan over joined streams;
/// ties are broken by join order, matching the spec's documented tie-break.
pub struct Reader {
    locator: Locator,
    streams: HashMap<StreamKey, Journal>,
    order: Vec<StreamKey>,
    current: Option<StreamKey>,
}

impl Reader {
    pub fn new(locator: Locator) -> Self {
        Self {
            locator,
            streams: HashMap::new(),
            order: Vec::new(),
            current: None,
        }
    }

    /// Open a Journal in read mode and seek it to `from_time` (`0` means
    /// start). Idempotent per key (spec §4.4).
    pub fn join(&mut self, location: Location, dest_id: u32, from_time: Nanos) -> Result<(), JournalError> {
        self.join_with_mode(location, dest_id, from_time, JoinMode::CHANNEL)
    }

    /// As [`Self::join`], but records the requested scope (supplemented
    /// feature, SPEC_FULL §6) — the merge behavior itself doesn't vary by
    /// mode today, only the bootstrap-time subscription breadth does, so this
    /// is accepted and currently ignored beyond bookkeeping.
    pub fn join_with_mode(
        &mut self,
        location: Location,
        dest_id: u32,
        from_time: Nanos,
        _mode: JoinMode,
    ) -> Result<(), JournalError> {
        let key = (location.uid, dest_id);
        if self.streams.contains_key(&key) {
            return Ok(());
        }
        let mut journal = Journal::open(self.locator.clone(), location, dest_id, false, false)?;
        journal.seek_to_time(from_time);
        self.streams.insert(key, journal);
        self.order.push(key);
        self.current = None;
        Ok(())
    }

    /// Remove every stream whose location matches `location_uid`.
    pub fn disjoin(&mut self, location_uid: u32) {
        self.order.retain(|k| k.0 != location_uid);
        self.streams.retain(|k, _| k.0 != location_uid);
        self.current = None;
    }

    /// Remove a single stream.
    pub fn disjoin_channel(&mut self, location_uid: u32, dest_id: u32) {
        let key = (location_uid, dest_id);
        self.order.retain(|k| *k != key);
        self.streams.remove(&key);
        if self.current == Some(key) {
            self.current = None;
        }
    }

    pub fn joined_keys(&self) -> impl Iterator<Item = StreamKey> + '_ {
        self.order.iter().copied()
    }

    /// Linear scan: among joined streams with a committed frame available,
    /// pick the smallest `gen_time`; ties keep join order (spec §4.4).
    pub fn sort(&mut self) {
        let mut best: Option<(StreamKey, Nanos)> = None;
        for key in &self.order {
            let Some(journal) = self.streams.get_mut(key) else { continue };
            journal.skip_page_ends();
            if !journal.has_data() {
                continue;
            }
            let gen_time = journal.current_frame().expect("has_data implies a frame").gen_time;
            if best.map(|(_, best_time)| gen_time < best_time).unwrap_or(true) {
                best = Some((*key, gen_time));
            }
        }
        self.current = best.map(|(key, _)| key);
    }

    /// `true` iff the smallest-`gen_time` stream has a committed, non-sentinel
    /// frame (spec §4.4, §4.5 polling-mode fallback).
    pub fn data_available(&mut self) -> bool {
        self.sort();
        self.current.is_some()
    }

    /// View of the frame at the merged cursor, if any (spec §4.4).
    pub fn current_frame(&self) -> Option<CurrentFrame> {
        let key = self.current?;
        let journal = self.streams.get(&key)?;
        let header = journal.current_frame()?;
        Some(CurrentFrame { key, header })
    }

    /// Borrowed payload bytes of the frame at the merged cursor.
    pub fn payload(&self) -> Option<&[u8]> {
        let key = self.current?;
        let journal = self.streams.get(&key)?;
        let header = journal.current_frame()?;
        let page = journal.page()?;
        Some(super::frame::payload(page.bytes(), journal.current_frame_offset(), header.payload_len() as usize))
    }

    /// Advance the current stream by one frame, then re-sort (spec §4.4).
    pub fn next(&mut self) {
        let Some(key) = self.current else { return };
        if let Some(journal) = self.streams.get_mut(&key) {
            journal.next();
        }
        self.sort();
    }

    /// Seek every joined stream to `t` (spec §4.4).
    pub fn seek_to_time(&mut self, t: Nanos) {
        for journal in self.streams.values_mut() {
            journal.seek_to_time(t);
        }
        self.sort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::journal::writer::Writer;
    use crate::location::{Mode, Module};
    use crate::model::tags::MsgType;

    fn loc(group: &str, name: &str) -> Location {
        Location::new(Mode::Backtest, Module::System, group, name)
    }

    #[test]
    fn single_stream_yields_frames_in_commit_order() {
        let tmp = tempfile::tempdir().unwrap();
        let locator = Locator::new(tmp.path());
        let location = loc("g", "n");
        let writer = Writer::open(locator.clone(), location.clone(), 1, false, None).unwrap();
        for (trigger, gen) in [(1, 1000), (2, 2000), (3, 3000)] {
            writer.mark(trigger, MsgType::TradingStart).unwrap();
            let _ = gen; // gen_time is stamped by close_frame as "now", not controlled here
        }
        drop(writer);

        let mut reader = Reader::new(locator);
        reader.join(location, 1, 0).unwrap();
        let mut seen = 0;
        while reader.data_available() {
            reader.next();
            seen += 1;
        }
        assert_eq!(seen, 3);
    }

    #[test]
    fn merges_two_streams_by_gen_time() {
        let tmp = tempfile::tempdir().unwrap();
        let locator = Locator::new(tmp.path());
        let location = loc("g", "n");

        let writer_a = Writer::open(locator.clone(), location.clone(), 1, false, None).unwrap();
        let writer_b = Writer::open(locator.clone(), location.clone(), 2, false, None).unwrap();
        writer_a.mark(1, MsgType::TradingStart).unwrap();
        writer_b.mark(1, MsgType::TradingStart).unwrap();
        writer_a.mark(1, MsgType::TradingStart).unwrap();
        drop(writer_a);
        drop(writer_b);

        let mut reader = Reader::new(locator);
        reader.join(location.clone(), 1, 0).unwrap();
        reader.join(location, 2, 0).unwrap();

        let mut gen_times = Vec::new();
        while reader.data_available() {
            gen_times.push(reader.current_frame().unwrap().header.gen_time);
            reader.next();
        }
        assert_eq!(gen_times.len(), 3);
        assert!(gen_times.windows(2).all(|w| w[0] <= w[1]));
    }
}
