//! A single per-journal wakeup counter (spec §4.5): a thin wrapper over Linux
//! `eventfd(2)`. The writer increments it on every `close_frame`; a consumer's
//! epoll-class aggregator blocks on a set of these.

use std::io;
use std::os::fd::{AsRawFd, RawFd};

/// An eventfd-backed counter. `post()` increments it by one; the consumer side
/// only ever reads it indirectly, through [`super::epoll::Epoll::wait`].
#[derive(Debug)]
pub struct EventFd {
    fd: RawFd,
    owned: bool,
}

impl EventFd {
    /// Create a fresh counter, initial value 0, non-semaphore mode (reads drain
    /// the full accumulated count, matching the original source's plain
    /// `eventfd(0, 0)`).
    pub fn create() -> io::Result<Self> {
        let fd = unsafe { libc::eventfd(0, libc::EFD_CLOEXEC) };
        if fd < 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(Self { fd, owned: true })
    }

    /// Wrap a descriptor received from the bootstrap process (inherited or
    /// delivered over `SCM_RIGHTS`, spec §6.2). The wrapper owns and closes it.
    pub fn from_raw(fd: RawFd) -> Self {
        Self { fd, owned: true }
    }

    /// Wrap a descriptor without taking ownership (it will not be closed when
    /// this wrapper drops) — used when the same fd is shared by reference.
    pub fn borrowed(fd: RawFd) -> Self {
        Self { fd, owned: false }
    }

    /// Increment the counter by one. Called strictly after the frame's `length`
    /// store has landed (spec §4.3, §5: the post happens-after the commit).
    pub fn post(&self) -> io::Result<()> {
        let value: u64 = 1;
        let n = unsafe { libc::write(self.fd, &value as *const u64 as *const libc::c_void, 8) };
        if n != 8 {
            return Err(io::Error::last_os_error());
        }
        Ok(())
    }

    /// Drain the accumulated count. Used by a consumer after `epoll_wait` fires.
    pub fn drain(&self) -> io::Result<u64> {
        let mut value: u64 = 0;
        let n = unsafe { libc::read(self.fd, &mut value as *mut u64 as *mut libc::c_void, 8) };
        if n != 8 {
            return Err(io::Error::last_os_error());
        }
        Ok(value)
    }
}

impl AsRawFd for EventFd {
    fn as_raw_fd(&self) -> RawFd {
        self.fd
    }
}

impl Drop for EventFd {
    fn drop(&mut self) {
        if self.owned && self.fd >= 0 {
            unsafe {
                libc::close(self.fd);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn post_then_drain_observes_the_increment() {
        let efd = EventFd::create().unwrap();
        efd.post().unwrap();
        efd.post().unwrap();
        assert_eq!(efd.drain().unwrap(), 2);
    }
}
