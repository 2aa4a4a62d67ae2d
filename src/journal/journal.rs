//! Single append-only (location, destination) stream (spec §4.2).

use crate::error::JournalError;
use crate::location::{Locator, Location};
use crate::time::Nanos;

use super::frame::{self, FrameHeader};
use super::page::{Page, PAGE_HEADER_LEN};

/// Binds `(location, destination, is_writing, lazy)` and tracks the current page
/// and frame cursor. Writing uses this internally via [`crate::journal::Writer`];
/// reading consumers never mutate anything but their own cursor.
pub struct Journal {
    locator: Locator,
    location: Location,
    dest_id: u32,
    is_writing: bool,
    lazy: bool,
    page_id: u32,
    page: Option<Page>,
    cursor: usize,
    /// Ordinal of the frame at `cursor` within the current page. Reset to 0 on
    /// every page load, incremented by [`Journal::next`] when it doesn't roll
    /// over. Folded into `Writer::current_frame_uid` (spec §4.3).
    frame_ordinal: u64,
    /// Writer-only scratch: the payload length promised by the most recent
    /// `open_frame`, checked against the actual length passed to `close_frame`.
    pending_len: usize,
}

impl Journal {
    pub fn open(
        locator: Locator,
        location: Location,
        dest_id: u32,
        is_writing: bool,
        lazy: bool,
    ) -> Result<Self, JournalError> {
        let mut journal = Self {
            locator,
            location,
            dest_id,
            is_writing,
            lazy,
            page_id: 1,
            page: None,
            cursor: PAGE_HEADER_LEN,
            frame_ordinal: 0,
            pending_len: 0,
        };
        if is_writing {
            journal.load_page(1)?;
            journal.resume_cursor();
        } else {
            journal.try_load_page(1);
        }
        Ok(journal)
    }

    pub fn location(&self) -> &Location {
        &self.location
    }

    pub fn dest_id(&self) -> u32 {
        self.dest_id
    }

    pub fn page(&self) -> Option<&Page> {
        self.page.as_ref()
    }

    pub fn page_mut(&mut self) -> Option<&mut Page> {
        self.page.as_mut()
    }

    pub fn page_id(&self) -> u32 {
        self.page_id
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    fn load_page(&mut self, page_id: u32) -> Result<(), JournalError> {
        let page = Page::load(&self.locator, &self.location, self.dest_id, page_id, self.is_writing, self.lazy)?;
        self.page_id = page_id;
        self.cursor = PAGE_HEADER_LEN;
        self.frame_ordinal = 0;
        self.page = Some(page);
        Ok(())
    }

    /// Best-effort load, used by readers: a missing page just means "no data yet".
    fn try_load_page(&mut self, page_id: u32) -> bool {
        if !Page::exists(&self.locator, &self.location, self.dest_id, page_id) && !self.is_writing {
            self.page = None;
            return false;
        }
        match self.load_page(page_id) {
            Ok(()) => true,
            Err(e) => {
                tracing::debug!(error = %e, "page not yet available");
                self.page = None;
                false
            }
        }
    }

    /// A writer that was already mid-page on a previous run resumes at its
    /// recorded `last_frame_position`'s *next* frame rather than the page start.
    fn resume_cursor(&mut self) {
        let Some(page) = &self.page else { return };
        let last = page.header().last_frame_position as usize;
        if last == PAGE_HEADER_LEN {
            return; // freshly initialized page, nothing written yet
        }
        let header = frame::read(page.bytes(), last);
        self.cursor = last + header.length as usize;
    }

    /// View of the next unread frame, if the current page has one available.
    pub fn current_frame(&self) -> Option<FrameHeader> {
        let page = self.page.as_ref()?;
        if self.cursor + frame::FRAME_HEADER_LEN > page.bytes().len() {
            return None;
        }
        Some(frame::read(page.bytes(), self.cursor))
    }

    pub fn current_frame_offset(&self) -> usize {
        self.cursor
    }

    /// `true` iff the frame at the cursor is committed and carries real payload
    /// (not a `PageEnd`/sentinel) (spec §4.4).
    pub fn has_data(&self) -> bool {
        self.current_frame().map(|f| f.has_data()).unwrap_or(false)
    }

    /// Silently advance past any committed `PageEnd` sentinel(s) sitting at the
    /// cursor, loading the next page as needed, so callers never observe one as
    /// "current" (spec §4.4, §8: `PageEnd` is committed but carries no data —
    /// without this, a reader parked on a page boundary would see `has_data()
    /// == false` forever instead of rolling onto the next page).
    pub fn skip_page_ends(&mut self) {
        while let Some(header) = self.current_frame() {
            if header.is_committed() && !header.has_data() {
                self.next();
            } else {
                break;
            }
        }
    }

    /// Advance past the current frame: if it is `PageEnd`, load the next page;
    /// otherwise move the cursor forward by `length` bytes (spec §4.2).
    pub fn next(&mut self) {
        let Some(header) = self.current_frame() else { return };
        if !header.is_committed() {
            return; // nothing to advance past yet
        }
        if crate::model::tags::MsgType::from_i32(header.msg_type) == Some(crate::model::tags::MsgType::PageEnd) {
            let next_id = self.page_id + 1;
            if self.is_writing || Page::exists(&self.locator, &self.location, self.dest_id, next_id) {
                if self.load_page(next_id).is_err() {
                    self.page = None;
                }
            } else {
                // Writer hasn't created the next page yet: advertise no data.
                self.page = None;
            }
        } else {
            self.cursor += header.length as usize;
            self.frame_ordinal += 1;
        }
    }

    pub fn frame_ordinal(&self) -> u64 {
        self.frame_ordinal
    }

    pub(crate) fn set_pending_len(&mut self, len: usize) {
        self.pending_len = len;
    }

    pub(crate) fn pending_len(&self) -> usize {
        self.pending_len
    }

    pub fn locator(&self) -> &Locator {
        &self.locator
    }

    /// Writer-only: close out onto `page_id + 1`, creating it fresh. Called after
    /// a `PageEnd` sentinel has been written to the current page (spec §4.3).
    pub(crate) fn roll_to_next_page(&mut self) -> Result<(), JournalError> {
        self.load_page(self.page_id + 1)
    }

    /// Binary-search-by-scan pages by `begin_time`, load the chosen one, and
    /// advance until `frame.gen_time > t` (spec §4.2, §4.1 `find_page_id`).
    pub fn seek_to_time(&mut self, t: Nanos) {
        let target_page = self.find_page_id(t);
        if self.load_page(target_page).is_err() {
            self.page = None;
            return;
        }
        if t == 0 {
            return;
        }
        loop {
            self.skip_page_ends();
            if !self.has_data() {
                break;
            }
            if let Some(h) = self.current_frame() {
                if h.gen_time > t {
                    break;
                }
            }
            self.next();
            if self.page.is_none() {
                break;
            }
        }
    }

    /// Scan existing page files from latest to earliest, returning the first
    /// whose `begin_time < t`; else the earliest page; else page 1 if none exist
    /// (spec §4.1).
    fn find_page_id(&self, t: Nanos) -> u32 {
        let ids = self.locator.list_page_ids(&self.location, self.dest_id);
        if ids.is_empty() {
            return 1;
        }
        if t == 0 {
            return ids[0];
        }
        for &id in ids.iter().rev() {
            if let Ok(page) = Page::load(&self.locator, &self.location, self.dest_id, id, false, true) {
                if page.begin_time() < t {
                    return id;
                }
            }
        }
        ids[0]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::location::{Mode, Module};

    fn setup(tmp: &std::path::Path) -> (Locator, Location) {
        (Locator::new(tmp), Location::new(Mode::Backtest, Module::System, "g", "n"))
    }

    #[test]
    fn new_writer_journal_starts_right_after_the_page_header() {
        let tmp = tempfile::tempdir().unwrap();
        let (locator, location) = setup(tmp.path());
        let journal = Journal::open(locator, location, 1, true, false).unwrap();
        assert_eq!(journal.cursor(), PAGE_HEADER_LEN);
        assert_eq!(journal.page_id(), 1);
    }

    #[test]
    fn reader_on_nonexistent_journal_has_no_data() {
        let tmp = tempfile::tempdir().unwrap();
        let (locator, location) = setup(tmp.path());
        let journal = Journal::open(locator, location, 1, false, false).unwrap();
        assert!(!journal.has_data());
    }
}
