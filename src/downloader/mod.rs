// src/downloader/mod.rs
// =============================================================================
// The downloader: fetches asset URLs and stores each distinct body once.
//
// Submodules:
// - fetch: concurrent download workers + Content-Type -> extension
// - writer: dedup trie + hash log + numbered output files
// - server: the /api/downloader endpoint
//
// Pipeline:  HTTP POST -> url queue -> fetch workers -> asset queue -> writer
//
// Shutdown runs left to right: the listener stops, the workers fetch what is
// left in the url queue, and the writer drains the asset queue. A writer that
// fails (a trie error) cancels the token itself and the role exits 1.
// =============================================================================

mod fetch;
mod server;
mod writer;

use fetch::run_fetchers;
use server::routes;
use writer::AssetWriter;

use anyhow::{Context, Result};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

const URL_QUEUE_CAPACITY: usize = 256;
const ASSET_QUEUE_CAPACITY: usize = 16;

#[derive(Debug, Clone)]
pub struct DownloaderConfig {
    pub listen: SocketAddr,
    pub data_dir: PathBuf,
    pub workers: usize,
    pub request_timeout: Duration,
}

/// Runs the downloader until `shutdown` is cancelled and the pipeline drains.
pub async fn run(config: DownloaderConfig, shutdown: CancellationToken) -> Result<()> {
    let writer = AssetWriter::open(&config.data_dir).await?;
    let client = crate::http::client(config.request_timeout)?;
    let listener = crate::http::bind(config.listen).await?;

    let (url_tx, url_rx) = mpsc::channel(URL_QUEUE_CAPACITY);
    let (asset_tx, asset_rx) = mpsc::channel(ASSET_QUEUE_CAPACITY);
    let writer_task = watch_writer(tokio::spawn(writer.run(asset_rx)), shutdown.clone());
    let fetch_task = tokio::spawn(run_fetchers(
        client,
        url_rx,
        asset_tx,
        config.workers,
        shutdown.clone(),
    ));

    info!(workers = config.workers, data_dir = %config.data_dir.display(), "start");
    let served = crate::http::serve(listener, routes(url_tx), shutdown.clone()).await;

    shutdown.cancel();
    fetch_task.await.context("fetch workers failed")?;
    writer_task.await.context("asset writer watcher failed")??;
    info!("end");
    served
}

/// Cancels `shutdown` as soon as the writer stops with an error.
fn watch_writer(
    writer: JoinHandle<Result<()>>,
    shutdown: CancellationToken,
) -> JoinHandle<Result<()>> {
    tokio::spawn(async move {
        let result = writer
            .await
            .context("asset writer task failed")
            .and_then(|result| result);
        if let Err(err) = &result {
            error!("asset writer stopped, shutting down: {err:#}");
            shutdown.cancel();
        }
        result
    })
}
