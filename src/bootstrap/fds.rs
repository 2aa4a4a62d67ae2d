//! Descriptor bootstrap (spec §6.2): parses the `FDS` environment variable (or,
//! if inheritance isn't available, receives the same descriptors one by one
//! over a Unix-domain socket via `SCM_RIGHTS`) into a `name -> fd` map that
//! every `Writer` and `ObserveHelper` consults at startup.

use std::collections::HashMap;
use std::io;
use std::os::fd::RawFd;
use std::os::unix::net::UnixStream;
use std::path::Path;

use crate::error::JournalError;

/// `name -> fd` map published by the bootstrap supervisor, keyed by
/// `"<location_uid>_<dest_id>"` (spec §6.2).
#[derive(Debug, Clone, Default)]
pub struct FdsMap {
    map: HashMap<String, RawFd>,
}

impl FdsMap {
    pub fn get(&self, key: &str) -> Option<RawFd> {
        self.map.get(key).copied()
    }

    pub fn insert(&mut self, key: impl Into<String>, fd: RawFd) {
        self.map.insert(key.into(), fd);
    }

    /// Parse the `FDS` environment variable: `"name1:fd1:name2:fd2:..."`
    /// (spec §6.2). Missing or malformed entries are skipped with a warning —
    /// a genuinely required key's absence surfaces later as a
    /// `JournalError::MissingDescriptor` when something tries to use it.
    pub fn from_env() -> Self {
        let mut fds = Self::default();
        let Ok(raw) = std::env::var("FDS") else {
            tracing::debug!("no FDS environment variable set");
            return fds;
        };
        let parts: Vec<&str> = raw.split(':').collect();
        for pair in parts.chunks_exact(2) {
            let (name, fd_str) = (pair[0], pair[1]);
            match fd_str.parse::<RawFd>() {
                Ok(fd) => fds.insert(name, fd),
                Err(_) => tracing::warn!(name, fd_str, "malformed FDS entry"),
            }
        }
        fds
    }

    /// Fallback path (spec §6.2): `path` contains the socket path on its first
    /// line and the colon-separated name list on its second; descriptors
    /// arrive over that socket one at a time via `SCM_RIGHTS`, in the same
    /// order as the name list.
    pub fn from_fallback_file(path: impl AsRef<Path>) -> Result<Self, JournalError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| JournalError::MappingFailed {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        let mut lines = contents.lines();
        let socket_path = lines.next().ok_or_else(|| JournalError::MappingFailed {
            path: path.to_path_buf(),
            message: "fallback file missing socket path line".to_string(),
        })?;
        let names: Vec<&str> = lines.next().map(|l| l.split(':').collect()).unwrap_or_default();

        let stream = UnixStream::connect(socket_path).map_err(|e| JournalError::MappingFailed {
            path: path.to_path_buf(),
            message: format!("cannot connect to descriptor socket {socket_path}: {e}"),
        })?;

        let mut fds = Self::default();
        for name in names {
            let fd = recv_one_fd(&stream).map_err(|e| JournalError::MappingFailed {
                path: path.to_path_buf(),
                message: format!("failed to receive descriptor for {name}: {e}"),
            })?;
            fds.insert(name, fd);
        }
        Ok(fds)
    }
}

/// Receive a single descriptor over `stream`'s ancillary data (`SCM_RIGHTS`).
/// One dummy byte of regular payload accompanies each descriptor, matching the
/// sender's one-fd-per-message protocol.
fn recv_one_fd(stream: &UnixStream) -> std::io::Result<RawFd> {
    use std::os::fd::AsRawFd;

    let mut payload = [0u8; 1];
    let mut iov = libc::iovec {
        iov_base: payload.as_mut_ptr() as *mut libc::c_void,
        iov_len: payload.len(),
    };

    let mut cmsg_buf = [0u8; unsafe_cmsg_space()];
    let mut msg: libc::msghdr = unsafe { std::mem::zeroed() };
    msg.msg_iov = &mut iov;
    msg.msg_iovlen = 1;
    msg.msg_control = cmsg_buf.as_mut_ptr() as *mut libc::c_void;
    msg.msg_controllen = cmsg_buf.len();

    let n = unsafe { libc::recvmsg(stream.as_raw_fd(), &mut msg, 0) };
    if n < 0 {
        return Err(std::io::Error::last_os_error());
    }

    let cmsg = unsafe { libc::CMSG_FIRSTHDR(&msg) };
    if cmsg.is_null() {
        return Err(std::io::Error::new(std::io::ErrorKind::InvalidData, "no ancillary data in SCM_RIGHTS message"));
    }
    let data = unsafe { libc::CMSG_DATA(cmsg) } as *const RawFd;
    Ok(unsafe { *data })
}

/// Send a single descriptor down `stream`'s ancillary data (`SCM_RIGHTS`),
/// mirroring [`recv_one_fd`]'s one-fd-per-message protocol.
pub fn send_one_fd(stream: &UnixStream, fd: RawFd) -> io::Result<()> {
    use std::os::fd::AsRawFd;

    let payload = [0u8; 1];
    let mut iov = libc::iovec {
        iov_base: payload.as_ptr() as *mut libc::c_void,
        iov_len: payload.len(),
    };

    let mut cmsg_buf = [0u8; unsafe_cmsg_space()];
    let mut msg: libc::msghdr = unsafe { std::mem::zeroed() };
    msg.msg_iov = &mut iov;
    msg.msg_iovlen = 1;
    msg.msg_control = cmsg_buf.as_mut_ptr() as *mut libc::c_void;
    msg.msg_controllen = cmsg_buf.len();

    let cmsg = unsafe { libc::CMSG_FIRSTHDR(&msg) };
    if cmsg.is_null() {
        return Err(io::Error::new(std::io::ErrorKind::Other, "no room for ancillary data"));
    }
    unsafe {
        (*cmsg).cmsg_level = libc::SOL_SOCKET;
        (*cmsg).cmsg_type = libc::SCM_RIGHTS;
        (*cmsg).cmsg_len = libc::CMSG_LEN(std::mem::size_of::<RawFd>() as u32) as usize;
        let data = libc::CMSG_DATA(cmsg) as *mut RawFd;
        *data = fd;
    }

    let n = unsafe { libc::sendmsg(stream.as_raw_fd(), &msg, 0) };
    if n < 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(())
}

/// Send every fd in `ordered`, one `SCM_RIGHTS` message each, in the exact
/// order a connecting [`FdsMap::from_fallback_file`] expects (its name list).
pub fn send_fd_set(stream: &UnixStream, ordered: &[RawFd]) -> io::Result<()> {
    for &fd in ordered {
        send_one_fd(stream, fd)?;
    }
    Ok(())
}

/// Write the descriptor-socket fallback file (spec §6.2): first line the
/// socket path, second line the colon-separated name list, in the same order
/// `send_fd_set` will deliver descriptors.
pub fn write_fallback_file(path: impl AsRef<Path>, socket_path: impl AsRef<Path>, names: &[String]) -> io::Result<()> {
    let contents = format!("{}\n{}\n", socket_path.as_ref().display(), names.join(":"));
    std::fs::write(path, contents)
}

/// `CMSG_SPACE(sizeof(int))`, computed at compile time since `libc::CMSG_SPACE`
/// is not itself `const fn`.
const fn unsafe_cmsg_space() -> usize {
    // Matches glibc's CMSG_SPACE expansion for a single `int` payload on
    // 64-bit Linux: align(sizeof(cmsghdr)) + align(sizeof(int)).
    let align = std::mem::size_of::<usize>();
    let hdr = (std::mem::size_of::<libc::cmsghdr>() + align - 1) & !(align - 1);
    let data = (std::mem::size_of::<libc::c_int>() + align - 1) & !(align - 1);
    hdr + data
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_env_parses_name_fd_pairs() {
        std::env::set_var("FDS", "1_2:5:3_4:7");
        let fds = FdsMap::from_env();
        assert_eq!(fds.get("1_2"), Some(5));
        assert_eq!(fds.get("3_4"), Some(7));
        std::env::remove_var("FDS");
    }

    #[test]
    fn from_env_is_empty_when_unset() {
        std::env::remove_var("FDS");
        let fds = FdsMap::from_env();
        assert_eq!(fds.get("anything"), None);
    }
}
