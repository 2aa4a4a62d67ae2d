//! Producer: allocates frames in the current page of its journal, publishes
//! payload bytes, and notifies waiters (spec §4.3).

use std::time::{Duration, Instant};

use lock_api::RawMutex as _;
use parking_lot::Mutex;

use crate::error::{CoreError, JournalError, ProtocolViolation, TimeoutError};
use crate::location::{Locator, Location};
use crate::model::tags::MsgType;
use crate::observer::eventfd::EventFd;
use crate::time::Nanos;

use super::frame;
use super::journal::Journal;
use super::page::PAGE_HEADER_LEN;

const WRITER_LOCK_TIMEOUT: Duration = Duration::from_secs(30);

const PAGE_ID_MASK: u32 = 0xFFFF_0000;
const FRAME_ID_MASK: u32 = 0x0000_FFFF;

/// A frame opened for writing: the byte offset its header starts at within the
/// current page, the payload length the caller promised in `open_frame`, and
/// the frame's uid computed at the instant it was opened (spec §4.7.3:
/// `OrderInput.order_id` must be this value, stamped into the payload before
/// `close_frame` — by the time the frame is closed, `frame_ordinal` has moved
/// on to the next frame).
pub struct OpenFrame {
    offset: usize,
    promised_len: u32,
    frame_uid: u64,
}

impl OpenFrame {
    pub fn frame_uid(&self) -> u64 {
        self.frame_uid
    }
}

/// Exclusive producer for one `(source, destination)` journal stream (spec §3.5,
/// §4.3). `Writer` is `Send + Sync`: multiple threads may share a handle, but the
/// internal mutex serializes their calls into the same underlying page.
pub struct Writer {
    frame_id_base: u64,
    journal: Mutex<Journal>,
    writer_start_time_hash: u32,
    wakeup: Option<EventFd>,
    journal_name: String,
}

impl Writer {
    pub fn open(
        locator: Locator,
        location: Location,
        dest_id: u32,
        lazy: bool,
        wakeup: Option<EventFd>,
    ) -> Result<Self, JournalError> {
        let journal_name = format!("{}/{:08x}", location.name, dest_id);
        let frame_id_base = u64::from(location.uid ^ dest_id) << 32;
        let mut journal = Journal::open(locator, location, dest_id, true, lazy)?;
        journal.seek_to_time(crate::time::now_in_nano());
        Ok(Self {
            frame_id_base,
            journal: Mutex::new(journal),
            writer_start_time_hash: crate::time::nano_hashed(crate::time::now_in_nano()),
            wakeup,
            journal_name,
        })
    }

    /// Acquire the writer mutex with a bounded spin+timeout (spec §4.3: 30s,
    /// fatal on expiry — a stuck producer must crash so the supervisor restarts
    /// it, spec §4.8).
    fn acquire(&self) -> Result<(), TimeoutError> {
        let start = Instant::now();
        let raw = unsafe { self.journal.raw() };
        while !raw.try_lock() {
            if start.elapsed() > WRITER_LOCK_TIMEOUT {
                return Err(TimeoutError {
                    journal: self.journal_name.clone(),
                    waited_secs: start.elapsed().as_secs_f64(),
                });
            }
            std::thread::yield_now();
        }
        Ok(())
    }

    /// # Safety contract
    /// Only call while `self.journal`'s raw mutex is held by the current thread
    /// (i.e. between a successful [`Self::acquire`] and the matching `unlock`).
    unsafe fn journal_mut(&self) -> &mut Journal {
        &mut *self.journal.data_ptr()
    }

    fn release(&self) {
        unsafe { self.journal.raw().unlock() };
    }

    pub fn current_frame_uid(&self) -> u64 {
        let journal = self.journal.lock();
        self.frame_uid_of(&journal)
    }

    fn frame_uid_of(&self, journal: &Journal) -> u64 {
        let page_part = (journal.page_id() << 16) & PAGE_ID_MASK;
        let frame_part = (journal.frame_ordinal() as u32) & FRAME_ID_MASK;
        let lower = (page_part | frame_part) ^ self.writer_start_time_hash;
        self.frame_id_base | lower as u64
    }

    pub fn location(&self) -> Location {
        self.journal.lock().location().clone()
    }

    pub fn dest_id(&self) -> u32 {
        self.journal.lock().dest_id()
    }

    /// Roll onto a fresh page: stamp a `PageEnd` sentinel at the cursor, then
    /// load `page_id + 1`.
    /// # Safety contract
    /// Caller must hold the writer's raw lock.
    fn close_page(&self, journal: &mut Journal, trigger_time: Nanos) -> Result<(), JournalError> {
        let offset = journal.current_frame_offset();
        let location_uid = journal.location().uid;
        let dest_id = journal.dest_id();
        let gen_time = crate::time::now_in_nano();
        {
            let page = journal.page_mut().expect("writer always has a page");
            let bytes = page.bytes_mut();
            frame::set_header_length(bytes, offset, frame::FRAME_HEADER_LEN as u32);
            frame::set_trigger_time(bytes, offset, trigger_time);
            frame::set_msg_type(bytes, offset, MsgType::PageEnd.as_i32());
            frame::set_source(bytes, offset, location_uid);
            frame::set_dest(bytes, offset, dest_id);
            frame::set_gen_time(bytes, offset, gen_time);
            frame::set_length(bytes, offset, frame::FRAME_HEADER_LEN as u32);
            page.set_last_frame_position(offset as u64);
        }
        journal.roll_to_next_page()
    }

    /// Open a frame of `payload_len` bytes, rolling the page over first if it
    /// would not fit (spec §4.3). Returns a handle used by `close_frame`/the
    /// payload accessor.
    pub fn open_frame(&self, trigger_time: Nanos, msg_type: i32, payload_len: u32) -> Result<OpenFrame, CoreError> {
        self.acquire()?;
        let journal = unsafe { self.journal_mut() };

        let needed = frame::FRAME_HEADER_LEN + payload_len as usize;
        let page_size = journal.page().expect("writer always has a page").header().page_size;
        let capacity = page_size as usize - PAGE_HEADER_LEN;
        if needed > capacity {
            self.release();
            return Err(CoreError::Protocol(ProtocolViolation::FrameExceedsPage {
                length: needed as u32,
                page_size,
            }));
        }

        let border = journal.page().expect("writer always has a page").usable_border();
        if journal.cursor() + needed > border {
            if let Err(e) = self.close_page(journal, trigger_time) {
                self.release();
                return Err(CoreError::Journal(e));
            }
        }

        let offset = journal.cursor();
        let location_uid = journal.location().uid;
        let dest_id = journal.dest_id();
        let frame_uid = self.frame_uid_of(journal);
        {
            let page = journal.page_mut().expect("writer always has a page");
            let bytes = page.bytes_mut();
            frame::set_header_length(bytes, offset, frame::FRAME_HEADER_LEN as u32);
            frame::set_trigger_time(bytes, offset, trigger_time);
            frame::set_msg_type(bytes, offset, msg_type);
            frame::set_source(bytes, offset, location_uid);
            frame::set_dest(bytes, offset, dest_id);
        }
        journal.set_pending_len(payload_len as usize);

        Ok(OpenFrame {
            offset,
            promised_len: payload_len,
            frame_uid,
        })
    }

    /// Mutable view over the payload bytes of a still-open frame.
    pub fn payload_mut<'a>(&'a self, open: &OpenFrame) -> &'a mut [u8] {
        let journal = unsafe { self.journal_mut() };
        let page = journal.page_mut().expect("writer always has a page");
        frame::payload_mut(page.bytes_mut(), open.offset, open.promised_len as usize)
    }

    /// Commit the frame: lay down the zero sentinel after the payload, store
    /// `gen_time` then `length` (the actual release store, spec §4.3, §5), update
    /// the page header, advance the cursor, release the mutex, and post the
    /// wakeup.
    pub fn close_frame(&self, actual_len: usize, gen_time: Nanos) {
        let journal = unsafe { self.journal_mut() };
        debug_assert!(actual_len <= journal.pending_len());

        let offset = journal.current_frame_offset();
        let next_offset = offset + frame::FRAME_HEADER_LEN + actual_len;
        {
            let page = journal.page_mut().expect("writer always has a page");
            let bytes = page.bytes_mut();
            frame::zero(bytes, next_offset);
            frame::set_gen_time(bytes, offset, gen_time);
            frame::set_length(bytes, offset, (frame::FRAME_HEADER_LEN + actual_len) as u32);
            page.set_last_frame_position(offset as u64);
        }
        journal.set_pending_len(0);
        journal.next();
        self.release();

        if let Some(wakeup) = &self.wakeup {
            if let Err(e) = wakeup.post() {
                tracing::warn!(journal = %self.journal_name, error = %e, "failed to post wakeup");
            }
        }
    }

    /// Compose `open_frame` + copy + `close_frame` for a fixed-size value.
    pub fn write_fixed<T: bytemuck_like::FixedBytes>(
        &self,
        trigger_time: Nanos,
        msg_type: MsgType,
        value: &T,
    ) -> Result<(), CoreError> {
        let bytes = value.as_bytes();
        let open = self.open_frame(trigger_time, msg_type.as_i32(), bytes.len() as u32)?;
        self.payload_mut(&open).copy_from_slice(bytes);
        self.close_frame(bytes.len(), crate::time::now_in_nano());
        Ok(())
    }

    /// Compose `open_frame` + copy + `close_frame` for an UNFIXED value that has
    /// already been serialized to a compact byte string (spec §3.3).
    pub fn write_unfixed(&self, trigger_time: Nanos, msg_type: MsgType, encoded: &[u8]) -> Result<(), CoreError> {
        let open = self.open_frame(trigger_time, msg_type.as_i32(), encoded.len() as u32)?;
        self.payload_mut(&open).copy_from_slice(encoded);
        self.close_frame(encoded.len(), crate::time::now_in_nano());
        Ok(())
    }

    /// Write a payload-less control frame (spec §4.3: TradingStart, Termination,
    /// ...).
    pub fn mark(&self, trigger_time: Nanos, msg_type: MsgType) -> Result<(), CoreError> {
        self.open_frame(trigger_time, msg_type.as_i32(), 0)?;
        self.close_frame(0, crate::time::now_in_nano());
        Ok(())
    }

    /// Copy a foreign frame verbatim (used by re-publishers, spec §4.3).
    pub fn copy_frame(&self, header: &frame::FrameHeader, src_bytes: &[u8], src_offset: usize) -> Result<(), CoreError> {
        self.acquire()?;
        let journal = unsafe { self.journal_mut() };
        let total_len = header.length as usize;
        let border = journal.page().expect("writer always has a page").usable_border();
        if journal.cursor() + total_len > border {
            if let Err(e) = self.close_page(journal, crate::time::now_in_nano()) {
                self.release();
                return Err(CoreError::Journal(e));
            }
        }
        let offset = journal.cursor();
        {
            let page = journal.page_mut().expect("writer always has a page");
            let bytes = page.bytes_mut();
            frame::copy(bytes, offset, src_bytes, src_offset, total_len);
            let next_offset = offset + total_len;
            frame::zero(bytes, next_offset);
            page.set_last_frame_position(offset as u64);
        }
        journal.next();
        self.release();
        if let Some(wakeup) = &self.wakeup {
            let _ = wakeup.post();
        }
        Ok(())
    }
}

/// Minimal "plain old data as bytes" trait, standing in for a derive macro the
/// data model crate would normally provide for every FIXED message type (spec
/// §3.3).
pub mod bytemuck_like {
    /// Implemented by every FIXED (memcpy'able) message type.
    ///
    /// # Safety
    /// Implementors must be `#[repr(C)]` (or otherwise have a stable, padding-free
    /// byte layout) with no padding bytes that would leak uninitialized memory
    /// across the journal to another process.
    pub unsafe trait FixedBytes: Sized {
        fn as_bytes(&self) -> &[u8] {
            unsafe { std::slice::from_raw_parts((self as *const Self) as *const u8, std::mem::size_of::<Self>()) }
        }

        fn from_bytes(bytes: &[u8]) -> Self
        where
            Self: Copy,
        {
            assert_eq!(bytes.len(), std::mem::size_of::<Self>());
            unsafe { std::ptr::read_unaligned(bytes.as_ptr() as *const Self) }
        }
    }
}
