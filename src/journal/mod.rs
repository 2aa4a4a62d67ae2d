//! Journal data plane (spec §3-4.4): page/frame codec, single-stream journal,
//! producer, and multi-stream merge reader.

pub mod frame;
mod journal;
pub mod page;
pub mod reader;
pub mod writer;

pub use frame::FrameHeader;
pub use journal::Journal;
pub use page::Page;
pub use reader::{CurrentFrame, Reader, StreamKey};
pub use writer::bytemuck_like::FixedBytes;
pub use writer::{OpenFrame, Writer};
