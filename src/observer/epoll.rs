//! Multi-source wait aggregator (spec §4.5, §5): a thin wrapper over Linux
//! `epoll(7)` that blocks a consumer on any number of eventfd-class counters at
//! once.

use std::io;
use std::os::fd::{AsRawFd, RawFd};

const MAX_EVENTS: usize = 10;

pub struct Epoll {
    epfd: RawFd,
}

impl Epoll {
    pub fn create() -> io::Result<Self> {
        let epfd = unsafe { libc::epoll_create1(libc::EPOLL_CLOEXEC) };
        if epfd < 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(Self { epfd })
    }

    /// Enroll a target descriptor for readability (`EPOLLIN`) notifications.
    pub fn add_target(&self, fd: RawFd) -> io::Result<()> {
        let mut ev = libc::epoll_event {
            events: libc::EPOLLIN as u32,
            u64: fd as u64,
        };
        let rc = unsafe { libc::epoll_ctl(self.epfd, libc::EPOLL_CTL_ADD, fd, &mut ev) };
        if rc < 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(())
    }

    /// Block until at least one enrolled target is readable (or `timeout_ms`
    /// elapses, `-1` for no timeout). Returns the number of ready descriptors;
    /// `0` on timeout.
    pub fn wait(&self, timeout_ms: i32) -> io::Result<usize> {
        let mut events: [libc::epoll_event; MAX_EVENTS] = unsafe { std::mem::zeroed() };
        let n = unsafe { libc::epoll_wait(self.epfd, events.as_mut_ptr(), MAX_EVENTS as i32, timeout_ms) };
        if n < 0 {
            let err = io::Error::last_os_error();
            if err.kind() == io::ErrorKind::Interrupted {
                return Ok(0);
            }
            return Err(err);
        }
        Ok(n as usize)
    }
}

impl AsRawFd for Epoll {
    fn as_raw_fd(&self) -> RawFd {
        self.epfd
    }
}

impl Drop for Epoll {
    fn drop(&mut self) {
        unsafe {
            libc::close(self.epfd);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observer::eventfd::EventFd;

    #[test]
    fn wait_returns_once_a_target_is_posted() {
        let epoll = Epoll::create().unwrap();
        let efd = EventFd::create().unwrap();
        epoll.add_target(efd.as_raw_fd()).unwrap();
        efd.post().unwrap();
        let ready = epoll.wait(1_000).unwrap();
        assert_eq!(ready, 1);
    }

    #[test]
    fn wait_times_out_with_nothing_posted() {
        let epoll = Epoll::create().unwrap();
        let efd = EventFd::create().unwrap();
        epoll.add_target(efd.as_raw_fd()).unwrap();
        let ready = epoll.wait(20).unwrap();
        assert_eq!(ready, 0);
    }
}
