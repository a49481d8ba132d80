// src/router/mod.rs
// =============================================================================
// The hash router: spreads newly discovered URLs over the frontier shards.
//
// Submodules:
// - bucket: URL -> shard index (md5 low 64 bits mod shard count)
// - actor: the single-owner task that buckets and flushes
// - server: the /api/reservoir endpoint (POST accept, GET proxy)
// =============================================================================

mod actor;
mod bucket;
mod server;

use actor::HashRouter;
use server::routes;

use anyhow::{ensure, Context, Result};
use std::net::SocketAddr;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Everything the router process needs to run.
#[derive(Debug, Clone)]
pub struct RouterConfig {
    pub listen: SocketAddr,
    /// `host:port` of every shard; the order fixes bucket numbers.
    pub shards: Vec<String>,
    pub flush_interval: Duration,
    pub request_timeout: Duration,
}

/// Runs the router until `shutdown` is cancelled, then drains once.
pub async fn run(config: RouterConfig, shutdown: CancellationToken) -> Result<()> {
    ensure!(
        config.flush_interval > Duration::ZERO,
        "flush interval must be greater than zero"
    );
    let shards = config
        .shards
        .iter()
        .map(|address| crate::http::reservoir_url(address))
        .collect::<Result<Vec<_>>>()?;
    let client = crate::http::client(config.request_timeout)?;

    let router = HashRouter::new(shards.clone(), client.clone())?;
    let (handle, task) = router.spawn(config.flush_interval, shutdown.clone());
    let listener = crate::http::bind(config.listen).await?;

    info!(shards = shards.len(), flush_interval = ?config.flush_interval, "start");
    let served = crate::http::serve(listener, routes(handle, shards, client), shutdown.clone()).await;

    shutdown.cancel();
    task.await.context("router task failed")?;
    info!("end");
    served
}
