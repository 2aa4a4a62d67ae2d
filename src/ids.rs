//! Stable 32-bit hashing for identifiers (spec §3.1).
//!
//! A plain FNV-1a is used throughout: it is small, has no external dependency, and
//! — unlike `std::hash::Hash` / `DefaultHasher` — is guaranteed stable across Rust
//! versions and process restarts, which matters because these hashes are persisted
//! on disk as frame `source`/`dest` fields and compared across cooperating
//! processes built at different times.

const FNV_OFFSET_BASIS: u32 = 0x811c_9dc5;
const FNV_PRIME: u32 = 0x0100_0193;

/// FNV-1a over raw bytes.
pub fn hash_32(bytes: &[u8]) -> u32 {
    let mut hash = FNV_OFFSET_BASIS;
    for &b in bytes {
        hash ^= b as u32;
        hash = hash.wrapping_mul(FNV_PRIME);
    }
    hash
}

/// FNV-1a over a string's UTF-8 bytes.
pub fn hash_str_32(s: impl AsRef<[u8]>) -> u32 {
    hash_32(s.as_ref())
}

/// `hash_instrument` (spec §3.1): u32 hash of (exchange_id, instrument_id).
pub fn hash_instrument(exchange_id: &str, instrument_id: &str) -> u32 {
    hash_str_32(instrument_id) ^ hash_str_32(exchange_id)
}

/// `hash_product`: u32 hash of (exchange_id, product_id).
pub fn hash_product(exchange_id: &str, product_id: &str) -> u32 {
    hash_str_32(product_id) ^ hash_str_32(exchange_id)
}

/// Destination id for a broker stream: stable hash of (institution, account).
pub fn hash_account_dest(institution: &str, account: &str) -> u32 {
    hash_str_32(institution) ^ hash_str_32(account)
}

/// Fixed role-tag destination ids (spec §3.1, §6.1): MD request stream and the
/// single shared TD response stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i8)]
pub enum RoleTag {
    MdReq = 0,
    TdResponse = 1,
}

/// Stable hash of a single-byte role discriminant, mirroring the original
/// source's `JIDUtil::build(Flag)` which hashes the raw enum byte.
pub fn hash_role_tag(tag: RoleTag) -> u32 {
    hash_32(&[tag as u8])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_is_deterministic() {
        assert_eq!(hash_str_32("CME"), hash_str_32("CME"));
        assert_ne!(hash_str_32("CME"), hash_str_32("CBOT"));
    }

    #[test]
    fn instrument_hash_depends_on_both_fields() {
        let a = hash_instrument("CME", "ESZ4");
        let b = hash_instrument("CBOT", "ESZ4");
        let c = hash_instrument("CME", "NQZ4");
        assert_ne!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn role_tags_are_distinct() {
        assert_ne!(hash_role_tag(RoleTag::MdReq), hash_role_tag(RoleTag::TdResponse));
    }
}
