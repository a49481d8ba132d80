// src/main.rs
// =============================================================================
// Entry point: one binary that runs as a frontier shard, the hash router, or
// the asset downloader.
//
// What happens here:
// 1. Parse command-line arguments using clap
// 2. Set up tracing (RUST_LOG, or info / debug with --verbose)
// 3. Hook SIGINT/SIGTERM to a shared CancellationToken
// 4. Run the chosen role until it has drained
// 5. Exit 0 on a clean stop, 1 on a fatal error
// =============================================================================

mod cli;        // src/cli.rs - command-line parsing
mod dedup;      // src/dedup/ - content-hash trie and its on-disk log
mod downloader; // src/downloader/ - fetch workers and the asset writer
mod frontier;   // src/frontier/ - one shard of the URL frontier
mod hash;       // src/hash.rs - md5 content hashes
mod http;       // src/http.rs - shared server/client plumbing
mod router;     // src/router/ - URL -> shard routing
mod shutdown;   // src/shutdown.rs - signal handling

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Role};
use tokio_util::sync::CancellationToken;
use tracing::error;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let exit_code = match run(cli.command.into()).await {
        Ok(()) => 0,
        Err(e) => {
            error!("fatal: {e:#}");
            1
        }
    };

    std::process::exit(exit_code);
}

async fn run(role: Role) -> Result<()> {
    let shutdown = CancellationToken::new();
    shutdown::cancel_on_signal(shutdown.clone());

    match role {
        Role::Frontier(config) => frontier::run(config, shutdown).await,
        Role::Router(config) => router::run(config, shutdown).await,
        Role::Downloader(config) => downloader::run(config, shutdown).await,
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
