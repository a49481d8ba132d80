// src/downloader/writer.rs
// =============================================================================
// The asset writer: the only owner of the dedup trie and the hash log.
//
// For each downloaded body:
// 1. hash it (md5)
// 2. ask the trie whether it has been stored before
// 3. if new: write it as NNNNN.ext, then append the hash to hashes.ash
//
// Numbering continues from the number of hashes found at startup, so a
// restarted downloader never overwrites earlier files.
// =============================================================================

use super::fetch::FetchedAsset;
use crate::dedup::{load_hash_log, DedupTrie, HashLog, TrieError, HASH_LOG_FILE};
use crate::hash::ContentHash;
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tokio::sync::mpsc;
use tracing::{debug, error, info};

pub struct AssetWriter {
    trie: DedupTrie,
    hash_log: HashLog,
    output_dir: PathBuf,
    stored: usize,
}

impl AssetWriter {
    /// Rebuilds the trie from `data_dir/hashes.ash` and opens it for appends.
    pub async fn open(data_dir: &Path) -> Result<Self> {
        tokio::fs::create_dir_all(data_dir)
            .await
            .with_context(|| format!("creating data directory {}", data_dir.display()))?;

        let log_path = data_dir.join(HASH_LOG_FILE);
        let (trie, stored) = load_hash_log(&log_path).await?;
        let hash_log = HashLog::open(&log_path).await?;
        if trie.is_empty() {
            info!("no content hashes on disk");
        } else {
            info!(known = trie.len(), nodes = trie.node_count(), "loaded content hashes");
        }

        Ok(Self {
            trie,
            hash_log,
            output_dir: data_dir.to_path_buf(),
            stored,
        })
    }

    /// Number of assets stored so far, including earlier runs.
    pub fn stored(&self) -> usize {
        self.stored
    }

    /// Stores assets until the channel closes. A trie error ends the run:
    /// the dedup state can no longer be trusted.
    pub async fn run(mut self, mut assets: mpsc::Receiver<FetchedAsset>) -> Result<()> {
        while let Some(asset) = assets.recv().await {
            self.store(asset).await?;
        }
        info!(stored = self.stored(), "asset writer drained");
        Ok(())
    }

    /// Returns Ok(true) when the asset was new and got written.
    pub async fn store(&mut self, asset: FetchedAsset) -> Result<bool, TrieError> {
        let hash = ContentHash::of(&asset.content);
        if self.trie.contains(&hash)? {
            debug!(url = %asset.url, ?hash, "duplicate content skipped");
            return Ok(false);
        }
        self.trie.test_and_insert(hash)?;

        let path = self
            .output_dir
            .join(format!("{:05}.{}", self.stored, asset.extension));
        self.stored += 1;

        if let Err(err) = tokio::fs::write(&path, &asset.content).await {
            error!(path = %path.display(), error = %err, "failed to write asset");
        }
        if let Err(err) = self.hash_log.append(&hash).await {
            error!(error = %err, "failed to append to hash log");
        }

        debug!(url = %asset.url, path = %path.display(), "stored asset");
        Ok(true)
    }
}
