// src/dedup/mod.rs
// =============================================================================
// Content deduplication for downloaded assets.
//
// Submodules:
// - trie: the in-memory set of content hashes (DedupTrie)
// - hashlog: loading the trie from disk and appending new digests
// =============================================================================

mod hashlog;
mod trie;

use crate::hash::ContentHash;
use thiserror::Error;

pub use hashlog::{load as load_hash_log, HashLog, HASH_LOG_FILE};
pub use trie::DedupTrie;

/// Failures that mean the dedup state can no longer be trusted.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TrieError {
    /// Two keys needed more than 16 bytes to diverge.
    #[error("dedup trie ran out of key bytes at depth {depth} while filing {key:?}")]
    DepthExhausted { key: ContentHash, depth: usize },

    /// The hash log does not hold a whole number of digests.
    #[error("hash log ends with a partial record of {trailing} bytes")]
    TruncatedLog { trailing: usize },
}
