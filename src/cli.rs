// src/cli.rs
// =============================================================================
// Command-line interface, built with clap's derive API.
//
// One binary, three process roles. Each role is a subcommand:
//   dcrawler frontier   <listen> --data-dir DIR
//   dcrawler router     <listen> <shard>...
//   dcrawler downloader <listen> --data-dir DIR
//
// Every option can also come from a DCRAWLER_* environment variable, which is
// how a deployment usually passes the shard list.
// =============================================================================

use crate::downloader::DownloaderConfig;
use crate::frontier::FrontierConfig;
use crate::router::RouterConfig;
use clap::{Parser, Subcommand};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(
    name = "dcrawler",
    version,
    about = "Distributed web crawler backend: frontier shards, hash router, asset downloader"
)]
pub struct Cli {
    /// Log at debug level (RUST_LOG overrides this)
    #[arg(short, long, global = true, env = "DCRAWLER_VERBOSE")]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run one frontier shard (FIFO of URLs not yet crawled)
    ///
    /// Example: dcrawler frontier 0.0.0.0:8001 --data-dir ./shard-1
    Frontier {
        /// Address to listen on, e.g. 0.0.0.0:8001
        #[arg(env = "DCRAWLER_LISTEN")]
        listen: SocketAddr,

        /// Directory holding strings.txt and n.txt
        #[arg(long, env = "DCRAWLER_DATA_DIR", default_value = ".")]
        data_dir: PathBuf,

        /// Most URLs handed out by one GET
        #[arg(long, env = "DCRAWLER_MAX_OFFER", default_value_t = 32)]
        max_offer: usize,
    },

    /// Run the hash router in front of the frontier shards
    ///
    /// Example: dcrawler router 0.0.0.0:8000 10.0.0.1:8001 10.0.0.2:8001
    Router {
        /// Address to listen on
        #[arg(env = "DCRAWLER_LISTEN")]
        listen: SocketAddr,

        /// Shard addresses (host:port). Order decides which shard owns a URL,
        /// so every router in a deployment must list them identically.
        #[arg(
            required = true,
            env = "DCRAWLER_RESERVOIR_ADDRESSES",
            value_delimiter = ' '
        )]
        shards: Vec<String>,

        /// Seconds between bucket flushes
        #[arg(long, env = "DCRAWLER_FLUSH_INTERVAL", default_value_t = 10)]
        flush_interval_secs: u64,

        /// Timeout for each call to a shard, in seconds
        #[arg(long, env = "DCRAWLER_TIMEOUT", default_value_t = 5)]
        timeout_secs: u64,
    },

    /// Run the asset downloader (fetch, dedup by content, store)
    ///
    /// Example: dcrawler downloader 0.0.0.0:8100 --data-dir ./assets
    Downloader {
        /// Address to listen on
        #[arg(env = "DCRAWLER_LISTEN")]
        listen: SocketAddr,

        /// Directory for stored assets and hashes.ash
        #[arg(long, env = "DCRAWLER_DATA_DIR", default_value = ".")]
        data_dir: PathBuf,

        /// Concurrent downloads
        #[arg(long, env = "DCRAWLER_WORKERS", default_value_t = 5)]
        workers: usize,

        /// Timeout for each download, in seconds
        #[arg(long, env = "DCRAWLER_TIMEOUT", default_value_t = 5)]
        timeout_secs: u64,
    },
}

/// A parsed subcommand, ready to hand to its role's `run`.
#[derive(Debug, Clone)]
pub enum Role {
    Frontier(FrontierConfig),
    Router(RouterConfig),
    Downloader(DownloaderConfig),
}

impl From<Commands> for Role {
    fn from(command: Commands) -> Self {
        match command {
            Commands::Frontier {
                listen,
                data_dir,
                max_offer,
            } => Role::Frontier(FrontierConfig {
                listen,
                data_dir,
                max_offer,
            }),
            Commands::Router {
                listen,
                shards,
                flush_interval_secs,
                timeout_secs,
            } => Role::Router(RouterConfig {
                listen,
                shards,
                flush_interval: Duration::from_secs(flush_interval_secs),
                request_timeout: Duration::from_secs(timeout_secs),
            }),
            Commands::Downloader {
                listen,
                data_dir,
                workers,
                timeout_secs,
            } => Role::Downloader(DownloaderConfig {
                listen,
                data_dir,
                workers,
                request_timeout: Duration::from_secs(timeout_secs),
            }),
        }
    }
}


// -----------------------------------------------------------------------------
// BEGINNER NOTES:
//
// 1. Why parse into SocketAddr and PathBuf instead of String?
//    - clap calls FromStr for us, so a bad address fails at parse time
//      with a usage message instead of deep inside the server.
//
// 2. What does `env = "..."` do?
//    - If the flag is missing, clap reads that environment variable.
//    - The command line still wins when both are given.
//
// 3. Why a separate Role enum?
//    - The subcommand holds CLI shapes (seconds as u64); the config structs
//      hold what the core wants (Duration). `From` is the one place that
//      converts between them.
// -----------------------------------------------------------------------------
