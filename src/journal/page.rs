//! Page codec: fixed-size mmap'd journal pages (spec §4.1).

use std::fs::OpenOptions;
use std::path::PathBuf;

use memmap2::{Mmap, MmapMut};

use crate::error::JournalError;
use crate::location::{Locator, Location, Module};
use crate::time::Nanos;

use super::frame;

/// On-disk journal format version. Bumping this invalidates every existing page.
pub const JOURNAL_VERSION: u32 = 1;

pub mod offset {
    pub const VERSION: usize = 0;
    pub const PAGE_HEADER_LENGTH: usize = 4;
    pub const PAGE_SIZE: usize = 8;
    pub const FRAME_HEADER_LENGTH: usize = 12;
    pub const LAST_FRAME_POSITION: usize = 16;
}

/// Total size of a page header, in bytes.
pub const PAGE_HEADER_LEN: usize = 24;

const MIB: u64 = 1024 * 1024;

/// Page size selected by module (spec §3.2).
pub fn page_size_for(module: Module) -> u32 {
    match module {
        Module::Md => (128 * MIB) as u32,
        Module::Td | Module::Strategy => (16 * MIB) as u32,
        Module::System => MIB as u32,
    }
}

#[derive(Debug, Clone, Copy)]
pub struct PageHeaderFields {
    pub version: u32,
    pub page_header_length: u32,
    pub page_size: u32,
    pub frame_header_length: u32,
    pub last_frame_position: u64,
}

fn read_header(bytes: &[u8]) -> PageHeaderFields {
    PageHeaderFields {
        version: u32::from_le_bytes(bytes[offset::VERSION..offset::VERSION + 4].try_into().unwrap()),
        page_header_length: u32::from_le_bytes(
            bytes[offset::PAGE_HEADER_LENGTH..offset::PAGE_HEADER_LENGTH + 4].try_into().unwrap(),
        ),
        page_size: u32::from_le_bytes(bytes[offset::PAGE_SIZE..offset::PAGE_SIZE + 4].try_into().unwrap()),
        frame_header_length: u32::from_le_bytes(
            bytes[offset::FRAME_HEADER_LENGTH..offset::FRAME_HEADER_LENGTH + 4].try_into().unwrap(),
        ),
        last_frame_position: u64::from_le_bytes(
            bytes[offset::LAST_FRAME_POSITION..offset::LAST_FRAME_POSITION + 8].try_into().unwrap(),
        ),
    }
}

fn write_header(bytes: &mut [u8], fields: &PageHeaderFields) {
    bytes[offset::VERSION..offset::VERSION + 4].copy_from_slice(&fields.version.to_le_bytes());
    bytes[offset::PAGE_HEADER_LENGTH..offset::PAGE_HEADER_LENGTH + 4]
        .copy_from_slice(&fields.page_header_length.to_le_bytes());
    bytes[offset::PAGE_SIZE..offset::PAGE_SIZE + 4].copy_from_slice(&fields.page_size.to_le_bytes());
    bytes[offset::FRAME_HEADER_LENGTH..offset::FRAME_HEADER_LENGTH + 4]
        .copy_from_slice(&fields.frame_header_length.to_le_bytes());
    bytes[offset::LAST_FRAME_POSITION..offset::LAST_FRAME_POSITION + 8]
        .copy_from_slice(&fields.last_frame_position.to_le_bytes());
}

fn set_last_frame_position(bytes: &mut [u8], position: u64) {
    bytes[offset::LAST_FRAME_POSITION..offset::LAST_FRAME_POSITION + 8].copy_from_slice(&position.to_le_bytes());
}

enum Backing {
    Writable(MmapMut),
    ReadOnly(Mmap),
}

impl Backing {
    fn as_slice(&self) -> &[u8] {
        match self {
            Backing::Writable(m) => &m[..],
            Backing::ReadOnly(m) => &m[..],
        }
    }

    fn as_mut_slice(&mut self) -> &mut [u8] {
        match self {
            Backing::Writable(m) => &mut m[..],
            Backing::ReadOnly(_) => panic!("page is not open for writing"),
        }
    }
}

/// One mmap'd page file, exclusively owned for writes by its producer and shared
/// read-only by any number of consumers (spec §3.5).
pub struct Page {
    backing: Backing,
    path: PathBuf,
    dest_id: u32,
    page_id: u32,
    lazy: bool,
}

impl Page {
    pub fn page_id(&self) -> u32 {
        self.page_id
    }

    pub fn dest_id(&self) -> u32 {
        self.dest_id
    }

    pub fn header(&self) -> PageHeaderFields {
        read_header(self.backing.as_slice())
    }

    pub fn bytes(&self) -> &[u8] {
        self.backing.as_slice()
    }

    pub fn bytes_mut(&mut self) -> &mut [u8] {
        self.backing.as_mut_slice()
    }

    pub fn set_last_frame_position(&mut self, position: u64) {
        set_last_frame_position(self.backing.as_mut_slice(), position);
    }

    /// First byte past the last position a frame header may start at, leaving
    /// room for the closing sentinel header (spec §3.2 invariants).
    pub fn usable_border(&self) -> usize {
        self.header().page_size as usize - frame::FRAME_HEADER_LEN
    }

    pub fn begin_time(&self) -> Nanos {
        frame::read(self.bytes(), PAGE_HEADER_LEN).gen_time
    }

    pub fn end_time(&self) -> Nanos {
        let pos = self.header().last_frame_position as usize;
        frame::read(self.bytes(), pos).gen_time
    }

    pub fn exists(locator: &Locator, location: &Location, dest_id: u32, page_id: u32) -> bool {
        locator.page_path(location, dest_id, page_id).is_file()
    }

    /// Load (creating if absent, write mode only) the page file, memory-map it,
    /// and validate or initialize its header (spec §4.1).
    pub fn load(
        locator: &Locator,
        location: &Location,
        dest_id: u32,
        page_id: u32,
        write_mode: bool,
        lazy: bool,
    ) -> Result<Self, JournalError> {
        let page_size = page_size_for(location.module);
        locator.ensure_journal_dir(location).map_err(|e| JournalError::MappingFailed {
            path: locator.journal_dir(location),
            message: e.to_string(),
        })?;
        let path = locator.page_path(location, dest_id, page_id);

        let file = OpenOptions::new()
            .read(true)
            .write(write_mode)
            .create(write_mode)
            .open(&path)
            .map_err(|e| JournalError::MappingFailed {
                path: path.clone(),
                message: e.to_string(),
            })?;

        let len = file.metadata().map_err(|e| JournalError::MappingFailed {
            path: path.clone(),
            message: e.to_string(),
        })?.len();

        if write_mode {
            if len < page_size as u64 {
                file.set_len(page_size as u64).map_err(|e| JournalError::MappingFailed {
                    path: path.clone(),
                    message: e.to_string(),
                })?;
            }
        } else if len < page_size as u64 {
            return Err(JournalError::ShortFile {
                path,
                required: page_size as u64,
                found: len,
            });
        }

        let mut backing = if write_mode {
            let mmap = unsafe { MmapMut::map_mut(&file) }.map_err(|e| JournalError::MappingFailed {
                path: path.clone(),
                message: e.to_string(),
            })?;
            Backing::Writable(mmap)
        } else {
            let mmap = unsafe { Mmap::map(&file) }.map_err(|e| JournalError::MappingFailed {
                path: path.clone(),
                message: e.to_string(),
            })?;
            Backing::ReadOnly(mmap)
        };

        hint_residency(&backing, lazy);

        let fresh = read_header(backing.as_slice()).last_frame_position == 0;
        if fresh && write_mode {
            write_header(
                backing.as_mut_slice(),
                &PageHeaderFields {
                    version: JOURNAL_VERSION,
                    page_header_length: PAGE_HEADER_LEN as u32,
                    page_size,
                    frame_header_length: frame::FRAME_HEADER_LEN as u32,
                    last_frame_position: PAGE_HEADER_LEN as u64,
                },
            );
        }

        let header = read_header(backing.as_slice());
        if header.version != JOURNAL_VERSION {
            return Err(JournalError::VersionMismatch {
                path,
                required: JOURNAL_VERSION,
                found: header.version,
            });
        }
        if header.page_header_length != PAGE_HEADER_LEN as u32 {
            return Err(JournalError::HeaderLengthMismatch {
                path,
                required: PAGE_HEADER_LEN as u32,
                found: header.page_header_length,
            });
        }
        if header.page_size != page_size {
            return Err(JournalError::PageSizeMismatch {
                path,
                required: page_size,
                found: header.page_size,
            });
        }

        tracing::debug!(path = %path.display(), page_size, "loaded journal page");

        Ok(Self {
            backing,
            path,
            dest_id,
            page_id,
            lazy,
        })
    }
}

/// `lazy = false` hints the OS to fault the mapping in and favor random access;
/// `lazy = true` leaves paging entirely to the OS (spec §4.1). Only meaningful for
/// producers — the spec treats `lazy = true` for writers as undefined behavior
/// (§9 open question), so we only ever pass `false` from `Writer`.
fn hint_residency(backing: &Backing, lazy: bool) {
    if lazy {
        return;
    }
    let slice = backing.as_slice();
    if slice.is_empty() {
        return;
    }
    unsafe {
        libc::madvise(
            slice.as_ptr() as *mut libc::c_void,
            slice.len(),
            libc::MADV_WILLNEED,
        );
    }
}

impl Drop for Page {
    fn drop(&mut self) {
        if let Backing::Writable(m) = &self.backing {
            if let Err(e) = m.flush() {
                tracing::warn!(path = %self.path.display(), error = %e, "failed to flush page on release");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::location::Mode;

    fn loc(tmp: &std::path::Path) -> (Locator, Location) {
        (Locator::new(tmp), Location::new(Mode::Backtest, Module::System, "g", "n"))
    }

    #[test]
    fn fresh_page_initializes_header() {
        let tmp = tempfile::tempdir().unwrap();
        let (locator, location) = loc(tmp.path());
        let page = Page::load(&locator, &location, 1, 1, true, false).unwrap();
        let h = page.header();
        assert_eq!(h.version, JOURNAL_VERSION);
        assert_eq!(h.page_header_length, PAGE_HEADER_LEN as u32);
        assert_eq!(h.page_size, page_size_for(Module::System));
        assert_eq!(h.last_frame_position, PAGE_HEADER_LEN as u64);
    }

    #[test]
    fn version_mismatch_is_fatal() {
        let tmp = tempfile::tempdir().unwrap();
        let (locator, location) = loc(tmp.path());
        {
            let _p = Page::load(&locator, &location, 1, 1, true, false).unwrap();
        }
        let path = locator.page_path(&location, 1, 1);
        let bytes = std::fs::read(&path).unwrap();
        let mut bytes = bytes;
        bytes[offset::VERSION..offset::VERSION + 4].copy_from_slice(&999u32.to_le_bytes());
        std::fs::write(&path, bytes).unwrap();

        let err = Page::load(&locator, &location, 1, 1, false, false).unwrap_err();
        assert!(matches!(err, JournalError::VersionMismatch { .. }));
    }

    #[test]
    fn reader_on_short_file_is_hard_error() {
        let tmp = tempfile::tempdir().unwrap();
        let (locator, location) = loc(tmp.path());
        locator.ensure_journal_dir(&location).unwrap();
        let path = locator.page_path(&location, 1, 1);
        std::fs::write(&path, [0u8; 10]).unwrap();
        let err = Page::load(&locator, &location, 1, 1, false, false).unwrap_err();
        assert!(matches!(err, JournalError::ShortFile { .. }));
    }
}
