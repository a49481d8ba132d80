// src/hash.rs
// =============================================================================
// The 16-byte content hash shared by the router and the downloader.
//
// - The router uses the low 8 bytes (little-endian) to pick a shard
// - The downloader uses all 16 bytes as the key of its dedup trie and as
//   the record format of its hash log
//
// MD5 is used for distribution and dedup only, never for security.
// =============================================================================

use md5::{Digest, Md5};
use std::fmt;

/// Length in bytes of every content hash.
pub const HASH_LEN: usize = 16;

/// MD5 digest of some content.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContentHash([u8; HASH_LEN]);

impl ContentHash {
    /// Hashes raw bytes.
    pub fn of(bytes: &[u8]) -> Self {
        let digest = Md5::digest(bytes);
        let mut raw = [0u8; HASH_LEN];
        raw.copy_from_slice(&digest);
        Self(raw)
    }

    pub const fn from_bytes(raw: [u8; HASH_LEN]) -> Self {
        Self(raw)
    }

    pub fn as_bytes(&self) -> &[u8; HASH_LEN] {
        &self.0
    }

    /// Byte at `index`, or None past the end of the hash.
    pub fn byte(&self, index: usize) -> Option<u8> {
        self.0.get(index).copied()
    }

    /// First 8 bytes packed least-significant byte first.
    pub fn low64(&self) -> u64 {
        let mut low = [0u8; 8];
        low.copy_from_slice(&self.0[..8]);
        u64::from_le_bytes(low)
    }
}

impl fmt::Debug for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContentHash(")?;
        for byte in &self.0 {
            write!(f, "{byte:02x}")?;
        }
        write!(f, ")")
    }
}
