// src/frontier/mod.rs
// =============================================================================
// A frontier shard: the not-yet-fetched URLs owned by one instance.
//
// Submodules:
// - queue: FIFO ring buffer of URLs
// - store: the single-owner actor (queue + seen-set + current offer)
// - persist: recovery at startup and the PersistenceWriter actor
// - server: the /api/reservoir HTTP endpoint
//
// Startup order matters:
// 1. recover() reads strings.txt and n.txt
// 2. PersistenceWriter::open() resets n.txt (the store re-emits the total)
// 3. the store and writer tasks start, then the listener
// =============================================================================

mod persist;
mod queue;
mod server;
mod store;

pub use server::routes;

use anyhow::{ensure, Context, Result};
use persist::{recover, PersistenceWriter};
use store::{FrontierStore, StoreHandle};
use std::net::SocketAddr;
use std::path::PathBuf;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Back-pressure bound between a store and its writer.
const LOG_CHANNEL_CAPACITY: usize = 1024;

/// Everything a frontier shard needs to run.
#[derive(Debug, Clone)]
pub struct FrontierConfig {
    pub listen: SocketAddr,
    pub data_dir: PathBuf,
    pub max_offer: usize,
}

/// A running store/writer pair.
pub struct FrontierShard {
    handle: StoreHandle,
    store_task: JoinHandle<()>,
    writer_task: JoinHandle<()>,
    shutdown: CancellationToken,
}

impl FrontierShard {
    /// Recovers state from `data_dir` and starts both actors.
    pub async fn start(
        data_dir: &std::path::Path,
        max_offer: usize,
        shutdown: CancellationToken,
    ) -> Result<Self> {
        let recovered = recover(data_dir).await?;
        let writer = PersistenceWriter::open(data_dir).await?;

        let (log, records) = mpsc::channel(LOG_CHANNEL_CAPACITY);
        let writer_task = tokio::spawn(writer.run(records));
        let (handle, store_task) =
            FrontierStore::new(recovered, max_offer, log).spawn(shutdown.clone());

        Ok(Self {
            handle,
            store_task,
            writer_task,
            shutdown,
        })
    }

    pub fn handle(&self) -> StoreHandle {
        self.handle.clone()
    }

    /// Stops the store and waits until the writer has flushed everything.
    pub async fn shutdown(self) -> Result<()> {
        self.shutdown.cancel();
        self.store_task.await.context("frontier store task failed")?;
        self.writer_task.await.context("persistence writer task failed")?;
        Ok(())
    }
}

/// Runs a frontier shard until `shutdown` is cancelled.
pub async fn run(config: FrontierConfig, shutdown: CancellationToken) -> Result<()> {
    ensure!(config.max_offer > 0, "max offer must be at least 1");
    let shard = FrontierShard::start(&config.data_dir, config.max_offer, shutdown.clone()).await?;
    let listener = crate::http::bind(config.listen).await?;

    info!(max_offer = config.max_offer, data_dir = %config.data_dir.display(), "start");
    let served = crate::http::serve(listener, routes(shard.handle()), shutdown.clone()).await;

    // Whatever stopped the listener, the store must still drain.
    shutdown.cancel();
    shard.shutdown().await?;
    info!("end");
    served
}

#[cfg(test)]
mod tests {
    use super::persist::{COUNTER_FILE, ITEMS_FILE};
    use super::*;

    fn batch(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn test_state_survives_restart() {
        let dir = tempfile::tempdir().unwrap();

        let shard = FrontierShard::start(dir.path(), 2, CancellationToken::new())
            .await
            .unwrap();
        let handle = shard.handle();
        handle.submit(batch(&["a", "b", "c", "d", "e"])).await.unwrap();
        assert!(handle.retrieve().await.unwrap().is_empty());
        assert_eq!(handle.retrieve().await.unwrap(), batch(&["a", "b"]));
        shard.shutdown().await.unwrap();

        // a and b were handed out; c and d sit in the undelivered offer.
        let recovered = recover(dir.path()).await.unwrap();
        assert_eq!(recovered.items, batch(&["a", "b", "c", "d", "e"]));
        assert_eq!(recovered.discarded, 2);

        let shard = FrontierShard::start(dir.path(), 2, CancellationToken::new())
            .await
            .unwrap();
        let handle = shard.handle();
        assert_eq!(handle.retrieve().await.unwrap(), batch(&["c", "d"]));

        // Everything ever accepted is still seen.
        handle.submit(batch(&["a", "e", "f"])).await.unwrap();
        assert_eq!(handle.retrieve().await.unwrap(), batch(&["e"]));
        assert_eq!(handle.retrieve().await.unwrap(), batch(&["f"]));
        shard.shutdown().await.unwrap();

        let recovered = recover(dir.path()).await.unwrap();
        assert_eq!(recovered.items, batch(&["a", "b", "c", "d", "e", "f"]));
        assert_eq!(recovered.discarded, 6);
        assert_eq!(
            std::fs::read_to_string(dir.path().join(COUNTER_FILE)).unwrap(),
            "6"
        );
    }

    #[tokio::test]
    async fn test_crash_reserves_last_offer() {
        // n.txt lags strings.txt: the last offer was delivered but its
        // Discard never hit the disk. It must be offered again.
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(ITEMS_FILE), "a\nb\nc\n").unwrap();
        std::fs::write(dir.path().join(COUNTER_FILE), "1").unwrap();

        let shard = FrontierShard::start(dir.path(), 10, CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(shard.handle().retrieve().await.unwrap(), batch(&["b", "c"]));
        shard.shutdown().await.unwrap();

        assert_eq!(recover(dir.path()).await.unwrap().discarded, 3);
    }

    #[tokio::test]
    async fn test_start_fails_on_unusable_data_dir() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("not-a-directory");
        std::fs::write(&file, "x").unwrap();

        let result = FrontierShard::start(&file, 10, CancellationToken::new()).await;
        assert!(result.is_err());
    }
}
