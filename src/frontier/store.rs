// src/frontier/store.rs
// =============================================================================
// The frontier store: one task that owns a shard's queue, seen-set and
// current offer. Nobody else touches that state; HTTP handlers talk to it
// through a StoreHandle, which just sends messages over a channel.
//
// Message handling (one message per turn):
// - Submit(batch)    novel URLs are marked seen, queued and logged
// - Retrieve(reply)  the held offer is delivered; once delivered it is
//                    counted as discarded and a fresh offer is popped
//
// So a Retrieve always answers with the offer built by the previous turn.
// The very first Retrieve gets the offer built from the recovered queue.
//
// If the process crashes after an offer was delivered but before the
// Discard record reached n.txt, that offer is served again after restart.
// The shard is at-least-once for offers by construction.
// =============================================================================

use super::persist::{LogRecord, Recovered};
use super::queue::FrontierQueue;
use std::collections::HashSet;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

const REQUEST_CHANNEL_CAPACITY: usize = 64;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("frontier store has shut down")]
    Closed,
}

#[derive(Debug)]
enum StoreRequest {
    Submit(Vec<String>),
    Retrieve(oneshot::Sender<Vec<String>>),
}

/// Cheap, cloneable way to reach a running FrontierStore.
#[derive(Debug, Clone)]
pub struct StoreHandle {
    requests: mpsc::Sender<StoreRequest>,
}

impl StoreHandle {
    /// Hands a batch to the store. Returns once the store has it queued,
    /// not once it is on disk.
    pub async fn submit(&self, batch: Vec<String>) -> Result<(), StoreError> {
        self.requests
            .send(StoreRequest::Submit(batch))
            .await
            .map_err(|_| StoreError::Closed)
    }

    /// Takes the current offer.
    pub async fn retrieve(&self) -> Result<Vec<String>, StoreError> {
        let (reply, offer) = oneshot::channel();
        self.requests
            .send(StoreRequest::Retrieve(reply))
            .await
            .map_err(|_| StoreError::Closed)?;
        offer.await.map_err(|_| StoreError::Closed)
    }
}

/// Queue + seen-set + offer for one shard.
pub struct FrontierStore {
    queue: FrontierQueue<String>,
    seen: HashSet<String>,
    offer: Vec<String>,
    max_offer: usize,
    discarded: u64,
    log: mpsc::Sender<LogRecord>,
}

impl FrontierStore {
    /// Builds the store from recovered state. Every recovered item counts as
    /// seen; only the ones past the discard counter are queued.
    pub fn new(recovered: Recovered, max_offer: usize, log: mpsc::Sender<LogRecord>) -> Self {
        let mut queue = FrontierQueue::new();
        queue.extend(recovered.pending().iter().cloned());
        let discarded = recovered.discarded;
        let seen: HashSet<String> = recovered.items.into_iter().collect();

        let mut store = Self {
            queue,
            seen,
            offer: Vec::new(),
            max_offer,
            discarded,
            log,
        };
        store.refill_offer();
        store
    }

    pub fn queue_len(&self) -> usize {
        self.queue.len()
    }

    pub fn seen_len(&self) -> usize {
        self.seen.len()
    }

    /// Starts the store on its own task.
    pub fn spawn(self, shutdown: CancellationToken) -> (StoreHandle, JoinHandle<()>) {
        let (requests, inbox) = mpsc::channel(REQUEST_CHANNEL_CAPACITY);
        let task = tokio::spawn(self.run(inbox, shutdown));
        (StoreHandle { requests }, task)
    }

    async fn run(mut self, mut inbox: mpsc::Receiver<StoreRequest>, shutdown: CancellationToken) {
        // The writer opened n.txt at 0; carry the recovered total forward.
        if self.discarded != 0 {
            self.log(LogRecord::Discard(self.discarded)).await;
        }

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                request = inbox.recv() => match request {
                    Some(request) => self.handle(request).await,
                    None => break,
                },
            }
        }

        // Submits already queued were acknowledged to their callers, so they
        // still get recorded. Pending retrievals are dropped unanswered.
        inbox.close();
        while let Ok(request) = inbox.try_recv() {
            if let StoreRequest::Submit(batch) = request {
                self.submit(batch).await;
            }
        }

        info!(
            queued = self.queue_len(),
            seen = self.seen_len(),
            discarded = self.discarded,
            "frontier store stopped"
        );
        // Dropping self closes the log channel and lets the writer drain.
    }

    async fn handle(&mut self, request: StoreRequest) {
        match request {
            StoreRequest::Submit(batch) => self.submit(batch).await,
            StoreRequest::Retrieve(reply) => self.retrieve(reply).await,
        }
    }

    async fn submit(&mut self, batch: Vec<String>) {
        let offered = batch.len();
        let mut novel = Vec::new();
        for item in batch {
            if self.seen.contains(&item) {
                continue;
            }
            self.seen.insert(item.clone());
            self.queue.push(item.clone());
            novel.push(item);
        }

        debug!(
            offered,
            novel = novel.len(),
            queued = self.queue.len(),
            capacity = self.queue.capacity(),
            "submit"
        );
        if !novel.is_empty() {
            self.log(LogRecord::Items(novel)).await;
        }
    }

    async fn retrieve(&mut self, reply: oneshot::Sender<Vec<String>>) {
        let offer = std::mem::take(&mut self.offer);
        let delivered = offer.len() as u64;
        if let Err(offer) = reply.send(offer) {
            // Nobody is waiting any more; keep the offer for the next caller.
            self.offer = offer;
            return;
        }

        if delivered != 0 {
            self.discarded += delivered;
            self.log(LogRecord::Discard(delivered)).await;
        }
        self.refill_offer();
        debug!(delivered, next = self.offer.len(), queued = self.queue.len(), "retrieve");
    }

    fn refill_offer(&mut self) {
        if self.queue.is_empty() {
            self.offer = Vec::new();
            return;
        }
        let mut offer = Vec::with_capacity(self.max_offer.min(self.queue.len()));
        while offer.len() < self.max_offer {
            match self.queue.pop() {
                Some(item) => offer.push(item),
                None => break,
            }
        }
        self.offer = offer;
    }

    async fn log(&self, record: LogRecord) {
        if self.log.send(record).await.is_err() {
            error!("persistence writer is gone; log record dropped");
        }
    }
}

// -----------------------------------------------------------------------------
// BEGINNER NOTES:
//
// 1. Why an actor instead of a Mutex?
//    - Only one task ever touches the queue, the seen-set and the offer
//    - Everyone else sends a message, so there is nothing to lock
//    - Messages are handled one at a time, in the order they arrived
//
// 2. What is a oneshot channel?
//    - A channel that carries exactly one value
//    - Retrieve sends the store a oneshot Sender; the store answers through it
//    - If the caller gave up, send() hands the value back to us as Err(value)
//
// 3. What does std::mem::take do?
//    - Moves the value out and leaves Default::default() (an empty Vec) behind
//    - Lets us give away the offer without cloning it
//
// 4. Why does tokio::select! need a CancellationToken?
//    - select! waits on several futures and runs whichever finishes first
//    - cancelled() finishes when anyone calls cancel() on a clone of the token
// -----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn recovered(items: &[&str], discarded: u64) -> Recovered {
        Recovered {
            items: items.iter().map(|s| s.to_string()).collect(),
            discarded,
        }
    }

    fn batch(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    async fn drain_log(mut log: mpsc::Receiver<LogRecord>) -> Vec<LogRecord> {
        let mut records = Vec::new();
        while let Some(record) = log.recv().await {
            records.push(record);
        }
        records
    }

    #[test]
    fn test_new_seeds_seen_and_queue() {
        let (tx, _rx) = mpsc::channel(8);
        let store = FrontierStore::new(recovered(&["a", "b", "c", "d"], 1), 2, tx);
        // b, c went into the first offer; d is still queued.
        assert_eq!(store.offer, batch(&["b", "c"]));
        assert_eq!(store.queue_len(), 1);
        assert_eq!(store.seen_len(), 4);
    }

    #[tokio::test]
    async fn test_retrieve_scenario_and_log() {
        let (log_tx, log_rx) = mpsc::channel(64);
        let store = FrontierStore::new(recovered(&["a", "b", "c"], 2), 10, log_tx);
        let shutdown = CancellationToken::new();
        let (handle, task) = store.spawn(shutdown.clone());

        assert_eq!(handle.retrieve().await.unwrap(), batch(&["c"]));
        assert_eq!(handle.retrieve().await.unwrap(), Vec::<String>::new());

        handle.submit(batch(&["b", "c", "d", "e"])).await.unwrap();
        assert_eq!(handle.retrieve().await.unwrap(), Vec::<String>::new());
        assert_eq!(handle.retrieve().await.unwrap(), batch(&["d", "e"]));
        assert_eq!(handle.retrieve().await.unwrap(), Vec::<String>::new());

        handle
            .submit(batch(&["f", "g", "h", "i", "j", "k", "l", "m", "n", "o", "p", "q"]))
            .await
            .unwrap();
        assert_eq!(handle.retrieve().await.unwrap().len(), 0);
        assert_eq!(handle.retrieve().await.unwrap().len(), 10);
        assert_eq!(handle.retrieve().await.unwrap().len(), 2);

        shutdown.cancel();
        task.await.unwrap();

        assert_eq!(
            drain_log(log_rx).await,
            vec![
                LogRecord::Discard(2),
                LogRecord::Discard(1),
                LogRecord::Items(batch(&["d", "e"])),
                LogRecord::Discard(2),
                LogRecord::Items(batch(&[
                    "f", "g", "h", "i", "j", "k", "l", "m", "n", "o", "p", "q"
                ])),
                LogRecord::Discard(10),
                LogRecord::Discard(2),
            ]
        );
    }

    #[tokio::test]
    async fn test_duplicate_submits_do_not_grow_queue() {
        let (log_tx, log_rx) = mpsc::channel(64);
        let store = FrontierStore::new(Recovered::default(), 100, log_tx);
        let shutdown = CancellationToken::new();
        let (handle, task) = store.spawn(shutdown.clone());

        for _ in 0..5 {
            handle.submit(batch(&["x", "y", "x"])).await.unwrap();
        }
        // First retrieve returns the empty startup offer, second the queue.
        assert!(handle.retrieve().await.unwrap().is_empty());
        assert_eq!(handle.retrieve().await.unwrap(), batch(&["x", "y"]));

        shutdown.cancel();
        task.await.unwrap();
        assert_eq!(drain_log(log_rx).await, vec![
            LogRecord::Items(batch(&["x", "y"])),
            LogRecord::Discard(2),
        ]);
    }

    #[tokio::test]
    async fn test_abandoned_retrieve_keeps_offer() {
        let (log_tx, log_rx) = mpsc::channel(64);
        let mut store = FrontierStore::new(recovered(&["a"], 0), 10, log_tx);

        let (reply, offer) = oneshot::channel();
        drop(offer);
        store.retrieve(reply).await;
        assert_eq!(store.offer, batch(&["a"]));
        assert_eq!(store.discarded, 0);

        let (reply, offer) = oneshot::channel();
        store.retrieve(reply).await;
        assert_eq!(offer.await.unwrap(), batch(&["a"]));
        assert_eq!(store.discarded, 1);

        drop(store);
        assert_eq!(drain_log(log_rx).await, vec![LogRecord::Discard(1)]);
    }

    #[tokio::test]
    async fn test_shutdown_closes_handle() {
        let (log_tx, _log_rx) = mpsc::channel(64);
        let store = FrontierStore::new(Recovered::default(), 10, log_tx);
        let shutdown = CancellationToken::new();
        let (handle, task) = store.spawn(shutdown.clone());

        shutdown.cancel();
        task.await.unwrap();
        assert_eq!(handle.retrieve().await, Err(StoreError::Closed));
        assert_eq!(handle.submit(batch(&["late"])).await, Err(StoreError::Closed));
    }
}
