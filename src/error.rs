//! Error kinds for the journal data plane, wakeup plane, and bootstrap (spec §7).
//!
//! Each kind gets its own enum with a hand-written `Display`, matching the teacher's
//! `EventTimeError`/`BookError`/`MarketRegistryError` style rather than a derive
//! macro. `CoreError` is the union returned by library code; `anyhow::Result` is
//! reserved for the binary/bootstrap boundary.

use std::fmt;
use std::path::PathBuf;

/// Malformed or incomplete configuration. Fatal at startup.
#[derive(Debug, Clone)]
pub enum ConfigError {
    MissingField { field: &'static str },
    InvalidMode { value: String },
    UnknownAccount { institution: String, account: String },
    Io { path: PathBuf, message: String },
    Parse { message: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingField { field } => write!(f, "missing required config field: {field}"),
            Self::InvalidMode { value } => write!(f, "invalid system.mode: {value}"),
            Self::UnknownAccount { institution, account } => {
                write!(f, "no configured account for {institution}/{account}")
            }
            Self::Io { path, message } => write!(f, "cannot read config {}: {}", path.display(), message),
            Self::Parse { message } => write!(f, "cannot parse config: {message}"),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Violation of the page/frame on-disk contract, mapping failure, or a descriptor
/// lookup miss for a required stream. Fatal (spec §4.8, §7).
#[derive(Debug, Clone)]
pub enum JournalError {
    MappingFailed { path: PathBuf, message: String },
    UnmapFailed { path: PathBuf, message: String },
    VersionMismatch { path: PathBuf, required: u32, found: u32 },
    HeaderLengthMismatch { path: PathBuf, required: u32, found: u32 },
    PageSizeMismatch { path: PathBuf, required: u32, found: u32 },
    ShortFile { path: PathBuf, required: u64, found: u64 },
    MissingDescriptor { key: String },
}

impl fmt::Display for JournalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MappingFailed { path, message } => {
                write!(f, "unable to load page for {}: {}", path.display(), message)
            }
            Self::UnmapFailed { path, message } => {
                write!(f, "unable to release page {}: {}", path.display(), message)
            }
            Self::VersionMismatch { path, required, found } => write!(
                f,
                "{} version mismatch, required {}, found {}",
                path.display(),
                required,
                found
            ),
            Self::HeaderLengthMismatch { path, required, found } => write!(
                f,
                "{} header length mismatch, required {}, found {}",
                path.display(),
                required,
                found
            ),
            Self::PageSizeMismatch { path, required, found } => write!(
                f,
                "{} page size mismatch, required {}, found {}",
                path.display(),
                required,
                found
            ),
            Self::ShortFile { path, required, found } => write!(
                f,
                "{} is shorter than page size: required {}, found {}",
                path.display(),
                required,
                found
            ),
            Self::MissingDescriptor { key } => write!(f, "no wakeup descriptor published for {key}"),
        }
    }
}

impl std::error::Error for JournalError {}

/// Routing attempt for an account whose broker state is not Ready. Recovered
/// locally: log and drop (spec §4.7.2, §7).
#[derive(Debug, Clone)]
pub struct BrokerNotReady {
    pub account_uid: u32,
}

impl fmt::Display for BrokerNotReady {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "broker for account {:08x} is not ready", self.account_uid)
    }
}

impl std::error::Error for BrokerNotReady {}

/// Writer mutex acquisition timeout (spec §4.3: 30s bound). Fatal — must crash the
/// writer so the supervisor restarts it.
#[derive(Debug, Clone)]
pub struct TimeoutError {
    pub journal: String,
    pub waited_secs: f64,
}

impl fmt::Display for TimeoutError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "cannot lock writer for {} after {:.1}s",
            self.journal, self.waited_secs
        )
    }
}

impl std::error::Error for TimeoutError {}

/// A frame with a length exceeding the page, or a sentinel header with nonzero
/// length, or any other wire-contract breakage discovered by a reader.
#[derive(Debug, Clone)]
pub enum ProtocolViolation {
    FrameExceedsPage { length: u32, page_size: u32 },
    HeaderLengthMismatch { expected: u32, found: u32 },
    NonZeroSentinel { offset: u64 },
}

impl fmt::Display for ProtocolViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FrameExceedsPage { length, page_size } => {
                write!(f, "frame length {length} exceeds page size {page_size}")
            }
            Self::HeaderLengthMismatch { expected, found } => {
                write!(f, "frame header_length mismatch: expected {expected}, found {found}")
            }
            Self::NonZeroSentinel { offset } => {
                write!(f, "sentinel header at offset {offset} has nonzero length")
            }
        }
    }
}

impl std::error::Error for ProtocolViolation {}

/// Union of the failure domains a library call can surface.
#[derive(Debug)]
pub enum CoreError {
    Config(ConfigError),
    Journal(JournalError),
    BrokerNotReady(BrokerNotReady),
    Timeout(TimeoutError),
    Protocol(ProtocolViolation),
}

impl fmt::Display for CoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(e) => write!(f, "{e}"),
            Self::Journal(e) => write!(f, "{e}"),
            Self::BrokerNotReady(e) => write!(f, "{e}"),
            Self::Timeout(e) => write!(f, "{e}"),
            Self::Protocol(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for CoreError {}

impl From<ConfigError> for CoreError {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}
impl From<JournalError> for CoreError {
    fn from(e: JournalError) -> Self {
        Self::Journal(e)
    }
}
impl From<BrokerNotReady> for CoreError {
    fn from(e: BrokerNotReady) -> Self {
        Self::BrokerNotReady(e)
    }
}
impl From<TimeoutError> for CoreError {
    fn from(e: TimeoutError) -> Self {
        Self::Timeout(e)
    }
}
impl From<ProtocolViolation> for CoreError {
    fn from(e: ProtocolViolation) -> Self {
        Self::Protocol(e)
    }
}

pub type CoreResult<T> = Result<T, CoreError>;
