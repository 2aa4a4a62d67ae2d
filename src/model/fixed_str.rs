//! Fixed-capacity inline string, used wherever a FIXED message needs a text field
//! without introducing heap indirection (spec §3.3: FIXED types are memcpy'able).

use std::fmt;

/// A UTF-8 string truncated to at most `N` bytes and stored inline. `#[repr(C)]`
/// so it can sit directly inside a FIXED message struct.
#[repr(C)]
#[derive(Clone, Copy)]
pub struct FixedStr<const N: usize> {
    bytes: [u8; N],
    len: u8,
}

impl<const N: usize> FixedStr<N> {
    pub fn new(s: &str) -> Self {
        let mut bytes = [0u8; N];
        let src = s.as_bytes();
        let len = src.len().min(N);
        bytes[..len].copy_from_slice(&src[..len]);
        Self { bytes, len: len as u8 }
    }

    pub fn as_str(&self) -> &str {
        std::str::from_utf8(&self.bytes[..self.len as usize]).unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

impl<const N: usize> Default for FixedStr<N> {
    fn default() -> Self {
        Self { bytes: [0u8; N], len: 0 }
    }
}

impl<const N: usize> fmt::Debug for FixedStr<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self.as_str(), f)
    }
}

impl<const N: usize> PartialEq for FixedStr<N> {
    fn eq(&self, other: &Self) -> bool {
        self.as_str() == other.as_str()
    }
}
impl<const N: usize> Eq for FixedStr<N> {}

impl<const N: usize> std::hash::Hash for FixedStr<N> {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.as_str().hash(state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_short_strings() {
        let s: FixedStr<16> = FixedStr::new("CME");
        assert_eq!(s.as_str(), "CME");
    }

    #[test]
    fn truncates_overlong_strings_without_panicking() {
        let s: FixedStr<4> = FixedStr::new("ABCDEFGH");
        assert_eq!(s.as_str(), "ABCD");
    }
}
