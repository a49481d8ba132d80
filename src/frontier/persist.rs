// src/frontier/persist.rs
// =============================================================================
// Durable state for one frontier shard.
//
// Two files live in the shard's data directory:
// - strings.txt  every URL the shard ever accepted, one per line, in order
// - n.txt        how many of those URLs have been handed out (decimal)
//
// Startup (recover):
// 1. Read strings.txt into a list
// 2. Read n.txt as D (missing file = 0)
// 3. Everything in the list is "seen"; only list[D..] goes back in the queue
//
// While running (PersistenceWriter):
// - Items records are appended to strings.txt
// - Discard records bump a running total that overwrites n.txt
//
// The counter rewrite is not atomic with the append, so a crash between the
// two can leave n.txt slightly behind or ahead. That gap is accepted.
// =============================================================================

use anyhow::{Context, Result};
use std::io::{ErrorKind, SeekFrom};
use std::path::{Path, PathBuf};
use tokio::fs::{File, OpenOptions};
use tokio::io::{AsyncSeekExt, AsyncWriteExt};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

pub const ITEMS_FILE: &str = "strings.txt";
pub const COUNTER_FILE: &str = "n.txt";

/// A mutation the store wants on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogRecord {
    /// Newly accepted items, in acceptance order.
    Items(Vec<String>),
    /// Number of items just handed out to a consumer.
    Discard(u64),
}

/// State read back from disk at startup.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Recovered {
    /// Every item ever accepted, oldest first.
    pub items: Vec<String>,
    /// How many leading items were already handed out.
    pub discarded: u64,
}

impl Recovered {
    /// Items that still need to be offered.
    pub fn pending(&self) -> &[String] {
        let start = usize::try_from(self.discarded).unwrap_or(usize::MAX);
        self.items.get(start..).unwrap_or(&[])
    }
}

/// Reads the items and counter files from `data_dir`.
pub async fn recover(data_dir: &Path) -> Result<Recovered> {
    let items_path = data_dir.join(ITEMS_FILE);
    let items = match read_optional(&items_path).await? {
        Some(content) => parse_items(&content),
        None => Vec::new(),
    };

    let counter_path = data_dir.join(COUNTER_FILE);
    let discarded = match read_optional(&counter_path).await? {
        Some(content) => content
            .trim()
            .parse::<u64>()
            .with_context(|| format!("malformed discard counter in {}", counter_path.display()))?,
        None => 0,
    };

    if discarded > items.len() as u64 {
        warn!(
            discarded,
            items = items.len(),
            "discard counter is ahead of the items file; nothing will be re-queued"
        );
    }

    info!(items = items.len(), discarded, "recovered frontier state");
    Ok(Recovered { items, discarded })
}

async fn read_optional(path: &Path) -> Result<Option<String>> {
    match tokio::fs::read_to_string(path).await {
        Ok(content) => Ok(Some(content)),
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
        Err(err) => Err(err).with_context(|| format!("reading {}", path.display())),
    }
}

// One item per line; surrounding whitespace and blank lines are ignored.
fn parse_items(content: &str) -> Vec<String> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

/// Writes LogRecords for one store until the record channel closes.
pub struct PersistenceWriter {
    items: File,
    counter: File,
    counter_path: PathBuf,
    discarded: u64,
}

impl PersistenceWriter {
    /// Opens both files. Failing here is fatal: the shard must not serve
    /// traffic it cannot record.
    ///
    /// The counter file is reset to 0; the store re-emits the recovered
    /// total as its first Discard record.
    pub async fn open(data_dir: &Path) -> Result<Self> {
        tokio::fs::create_dir_all(data_dir)
            .await
            .with_context(|| format!("creating data directory {}", data_dir.display()))?;

        let items_path = data_dir.join(ITEMS_FILE);
        let items = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&items_path)
            .await
            .with_context(|| format!("opening {}", items_path.display()))?;

        let counter_path = data_dir.join(COUNTER_FILE);
        let counter = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&counter_path)
            .await
            .with_context(|| format!("opening {}", counter_path.display()))?;

        let mut writer = Self {
            items,
            counter,
            counter_path,
            discarded: 0,
        };
        writer
            .write_counter()
            .await
            .with_context(|| format!("initialising {}", writer.counter_path.display()))?;
        Ok(writer)
    }

    /// Applies records until every sender is gone.
    pub async fn run(mut self, mut records: mpsc::Receiver<LogRecord>) {
        while let Some(record) = records.recv().await {
            self.apply(record).await;
        }
        info!(discarded = self.discarded, "persistence writer drained");
    }

    async fn apply(&mut self, record: LogRecord) {
        match record {
            LogRecord::Items(items) => {
                if let Err(err) = self.append_items(&items).await {
                    error!(error = %err, lost = items.len(), "failed to append items");
                }
            }
            LogRecord::Discard(0) => {}
            LogRecord::Discard(delta) => {
                self.discarded += delta;
                if let Err(err) = self.write_counter().await {
                    error!(
                        error = %err,
                        path = %self.counter_path.display(),
                        "failed to rewrite discard counter"
                    );
                }
            }
        }
    }

    async fn append_items(&mut self, items: &[String]) -> std::io::Result<()> {
        let mut lines = String::with_capacity(items.iter().map(|item| item.len() + 1).sum());
        for item in items {
            lines.push_str(item);
            lines.push('\n');
        }
        self.items.write_all(lines.as_bytes()).await?;
        self.items.flush().await?;
        debug!(count = items.len(), "appended items");
        Ok(())
    }

    // Overwrite in place, then cut off whatever a longer old value left behind.
    async fn write_counter(&mut self) -> std::io::Result<()> {
        let total = self.discarded.to_string();
        self.counter.seek(SeekFrom::Start(0)).await?;
        self.counter.write_all(total.as_bytes()).await?;
        self.counter.flush().await?;
        self.counter.set_len(total.len() as u64).await?;
        Ok(())
    }
}

// -----------------------------------------------------------------------------
// BEGINNER NOTES:
//
// 1. Why tokio::fs instead of std::fs?
//    - std::fs blocks the thread until the disk answers
//    - tokio::fs runs the blocking call on a helper thread, so other tasks
//      keep running meanwhile
//
// 2. What is ErrorKind::NotFound used for?
//    - A missing file on first start is normal, not an error
//    - Matching on the error kind lets us treat it as "empty"
//
// 3. Why seek + set_len when rewriting n.txt?
//    - Writing "9" over "10" would leave "90" on disk
//    - set_len cuts the file to exactly what we just wrote
//
// 4. What does .with_context(|| ...) add?
//    - anyhow wraps the I/O error with a message naming the file
//    - The closure only runs when there is an error
// -----------------------------------------------------------------------------
