// src/dedup/hashlog.rs
// =============================================================================
// The on-disk hash log that lets the dedup trie survive restarts.
//
// Format: raw 16-byte digests, back to back, no delimiters, append-only.
//
// At startup the whole file is read and every digest is fed into a fresh
// DedupTrie. While running, each newly stored asset appends its digest.
// =============================================================================

use super::{DedupTrie, TrieError};
use crate::hash::{ContentHash, HASH_LEN};
use anyhow::{Context, Result};
use std::io::ErrorKind;
use std::path::Path;
use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;

/// File name of the hash log inside the downloader's data directory.
pub const HASH_LOG_FILE: &str = "hashes.ash";

/// Rebuilds a trie from the hash log at `path`.
///
/// Returns the trie and the number of digests read. A missing file is an
/// empty log; a file whose size is not a multiple of 16 is rejected.
pub async fn load(path: &Path) -> Result<(DedupTrie, usize)> {
    let raw = match tokio::fs::read(path).await {
        Ok(raw) => raw,
        Err(err) if err.kind() == ErrorKind::NotFound => Vec::new(),
        Err(err) => {
            return Err(err).with_context(|| format!("reading hash log {}", path.display()))
        }
    };

    rebuild(&raw).with_context(|| format!("loading hash log {}", path.display()))
}

fn rebuild(raw: &[u8]) -> Result<(DedupTrie, usize), TrieError> {
    let records = raw.chunks_exact(HASH_LEN);
    let trailing = records.remainder().len();
    if trailing != 0 {
        return Err(TrieError::TruncatedLog { trailing });
    }

    let mut trie = DedupTrie::new();
    let mut count = 0;
    for record in records {
        let mut digest = [0u8; HASH_LEN];
        digest.copy_from_slice(record);
        trie.test_and_insert(ContentHash::from_bytes(digest))?;
        count += 1;
    }

    Ok((trie, count))
}

/// Append handle on the hash log.
pub struct HashLog {
    file: File,
}

impl HashLog {
    /// Opens (creating if needed) the log for appending.
    pub async fn open(path: &Path) -> Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .await
            .with_context(|| format!("opening hash log {}", path.display()))?;
        Ok(Self { file })
    }

    pub async fn append(&mut self, hash: &ContentHash) -> std::io::Result<()> {
        self.file.write_all(hash.as_bytes()).await?;
        self.file.flush().await
    }
}
