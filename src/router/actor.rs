// src/router/actor.rs
// =============================================================================
// The hash router: one task that owns the per-shard buckets.
//
// Loop:
// - a batch arrives   -> bucket it (memory only, never waits on the network)
// - the ticker fires  -> flush every non-empty bucket to its shard
// - shutdown          -> take the batches already queued, flush once, stop
//
// Delivery is best effort. A shard that errors or answers non-200 loses
// that bucket's list; nothing is retried and the sender is never told.
// A flush blocks new batches for as long as the HTTP calls take, bounded by
// the client timeout.
// =============================================================================

use super::bucket::Buckets;
use anyhow::{anyhow, Result};
use reqwest::{Client, StatusCode};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use url::Url;

const BATCH_CHANNEL_CAPACITY: usize = 64;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RouterError {
    #[error("hash router has shut down")]
    Closed,
}

/// Cloneable sender side of a running HashRouter.
#[derive(Debug, Clone)]
pub struct RouterHandle {
    batches: mpsc::Sender<Vec<String>>,
}

impl RouterHandle {
    pub async fn accept(&self, batch: Vec<String>) -> Result<(), RouterError> {
        self.batches.send(batch).await.map_err(|_| RouterError::Closed)
    }
}

pub struct HashRouter {
    shards: Vec<Url>,
    buckets: Buckets,
    client: Client,
}

impl HashRouter {
    /// `shards` are the reservoir URLs; their order fixes the bucket numbers.
    pub fn new(shards: Vec<Url>, client: Client) -> Result<Self> {
        if shards.is_empty() {
            return Err(anyhow!("the router needs at least one shard"));
        }
        let buckets = Buckets::new(shards.len());
        Ok(Self {
            shards,
            buckets,
            client,
        })
    }

    pub fn accept(&mut self, batch: Vec<String>) {
        self.buckets.add(batch);
    }

    pub fn pending(&self) -> usize {
        self.buckets.pending()
    }

    /// Sends each non-empty bucket to its shard. Failed buckets are dropped.
    pub async fn flush(&mut self) {
        for (shard, batch) in self.shards.iter().zip(self.buckets.take_all()) {
            if batch.is_empty() {
                continue;
            }

            match deliver(&self.client, shard, &batch).await {
                Ok(()) => debug!(%shard, count = batch.len(), "delivered batch"),
                Err(err) => warn!(%shard, dropped = batch.len(), error = %err, "delivery failed"),
            }
        }
    }

    /// Starts the router on its own task, flushing every `flush_every`.
    pub fn spawn(
        self,
        flush_every: Duration,
        shutdown: CancellationToken,
    ) -> (RouterHandle, JoinHandle<()>) {
        let (batches, inbox) = mpsc::channel(BATCH_CHANNEL_CAPACITY);
        let task = tokio::spawn(self.run(inbox, flush_every, shutdown));
        (RouterHandle { batches }, task)
    }

    async fn run(
        mut self,
        mut inbox: mpsc::Receiver<Vec<String>>,
        flush_every: Duration,
        shutdown: CancellationToken,
    ) {
        let mut ticker = tokio::time::interval(flush_every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = ticker.tick() => self.flush().await,
                batch = inbox.recv() => match batch {
                    Some(batch) => self.accept(batch),
                    None => break,
                },
            }
        }

        // Batches already queued were acknowledged with a 200.
        inbox.close();
        while let Ok(batch) = inbox.try_recv() {
            self.accept(batch);
        }

        info!(pending = self.pending(), "draining router");
        self.flush().await;
    }
}

async fn deliver(client: &Client, shard: &Url, batch: &[String]) -> Result<()> {
    let response = client.post(shard.clone()).json(batch).send().await?;
    if response.status() != StatusCode::OK {
        return Err(anyhow!("shard answered HTTP {}", response.status()));
    }
    Ok(())
}

// -----------------------------------------------------------------------------
// BEGINNER NOTES:
//
// 1. What is tokio::time::interval?
//    - A ticker that completes once per period
//    - The first tick completes immediately
//    - MissedTickBehavior::Delay: if a flush ran long, wait a full period
//      after it instead of firing a burst of catch-up ticks
//
// 2. Why zip shards with take_all()?
//    - Bucket i always belongs to shard i
//    - zip pairs them up without indexing
//
// 3. Why inbox.close() before try_recv()?
//    - close() stops new sends but keeps what is already buffered
//    - try_recv() then drains the buffer without waiting
// -----------------------------------------------------------------------------
