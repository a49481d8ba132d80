// src/router/bucket.rs
// =============================================================================
// Which shard owns a URL.
//
// bucket = low64(md5(url bytes)) % shard_count
//
// The mapping is deterministic for a fixed shard count, so the same URL
// always lands on the same shard and that shard's seen-set dedups it.
// Changing the shard count reshuffles ownership.
// =============================================================================

use crate::hash::ContentHash;

/// Shard index for `item` among `shards` shards. `shards` must be non-zero.
pub fn bucket_for(item: &str, shards: usize) -> usize {
    let hash = ContentHash::of(item.as_bytes()).low64();
    (hash % shards as u64) as usize
}

/// Per-shard pending lists.
#[derive(Debug)]
pub struct Buckets {
    lists: Vec<Vec<String>>,
}

impl Buckets {
    pub fn new(shards: usize) -> Self {
        Self {
            lists: vec![Vec::new(); shards],
        }
    }

    /// Files every item of `batch` under its shard.
    pub fn add(&mut self, batch: Vec<String>) {
        let shards = self.lists.len();
        for item in batch {
            self.lists[bucket_for(&item, shards)].push(item);
        }
    }

    /// Total number of items waiting across all buckets.
    pub fn pending(&self) -> usize {
        self.lists.iter().map(Vec::len).sum()
    }

    #[cfg(test)]
    pub fn get(&self, shard: usize) -> &[String] {
        &self.lists[shard]
    }

    /// Empties every bucket, returning the lists in shard order.
    pub fn take_all(&mut self) -> Vec<Vec<String>> {
        self.lists.iter_mut().map(std::mem::take).collect()
    }
}
