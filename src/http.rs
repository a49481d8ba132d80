// src/http.rs
// =============================================================================
// HTTP plumbing shared by all three process roles.
//
// - Endpoint paths and how to turn a shard address into a URL
// - The reqwest client every outgoing call goes through
// - Binding and serving an axum app until the shutdown token fires
// - JSON body decoding with the status codes the endpoints promise
// =============================================================================

use anyhow::{anyhow, Context, Result};
use axum::http::StatusCode;
use axum::Router;
use serde::de::DeserializeOwned;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use url::Url;

/// Path served by frontier shards and the router.
pub const RESERVOIR_PATH: &str = "/api/reservoir";
/// Path served by the downloader.
pub const DOWNLOADER_PATH: &str = "/api/downloader";

/// Builds the reservoir URL for a `host:port` shard address.
pub fn reservoir_url(address: &str) -> Result<Url> {
    let url = Url::parse(&format!("http://{address}{RESERVOIR_PATH}"))
        .map_err(|e| anyhow!("Invalid shard address '{}': {}", address, e))?;

    // Something like "host:port/extra" parses but would change the path.
    if url.path() != RESERVOIR_PATH || url.host().is_none() {
        return Err(anyhow!("Invalid shard address '{}'", address));
    }
    Ok(url)
}

/// HTTP client with a single request timeout covering connect and transfer.
pub fn client(timeout: Duration) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(timeout)
        .connect_timeout(timeout)
        .build()
        .context("building HTTP client")
}

/// Binds the listening socket. Failing to bind is a startup error.
pub async fn bind(listen: SocketAddr) -> Result<TcpListener> {
    TcpListener::bind(listen)
        .await
        .with_context(|| format!("failed to bind {listen}"))
}

/// Serves `app` until `shutdown` is cancelled and in-flight requests finish.
pub async fn serve(listener: TcpListener, app: Router, shutdown: CancellationToken) -> Result<()> {
    let address = listener.local_addr().context("reading listener address")?;
    info!(%address, "listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await
        .context("server shutdown")?;
    info!(%address, "listener closed");
    Ok(())
}

/// Decodes a JSON request body. A body that does not decode never reaches
/// the actors; the caller answers 500.
pub fn decode_body<T: DeserializeOwned>(body: &[u8]) -> Result<T, StatusCode> {
    serde_json::from_slice(body).map_err(|err| {
        warn!(error = %err, "rejecting malformed request body");
        StatusCode::INTERNAL_SERVER_ERROR
    })
}

// -----------------------------------------------------------------------------
// BEGINNER NOTES:
//
// 1. What is DeserializeOwned?
//    - A serde bound meaning "can be built from JSON without borrowing it"
//    - decode_body works for Vec<String> and for a single String
//
// 2. Why with_graceful_shutdown?
//    - axum stops accepting connections when the future completes
//    - Requests already in flight still get their answer
//
// 3. Why build one reqwest::Client and clone it?
//    - The client holds the connection pool
//    - Clones share that pool, so connections to a shard get reused
// -----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reservoir_url() {
        let url = reservoir_url("127.0.0.1:8080").unwrap();
        assert_eq!(url.as_str(), "http://127.0.0.1:8080/api/reservoir");
    }

    #[test]
    fn test_reservoir_url_hostname() {
        let url = reservoir_url("shard-2.internal:9000").unwrap();
        assert_eq!(url.host_str(), Some("shard-2.internal"));
        assert_eq!(url.port(), Some(9000));
    }

    #[test]
    fn test_reservoir_url_rejects_paths() {
        assert!(reservoir_url("127.0.0.1:8080/other").is_err());
        assert!(reservoir_url("").is_err());
    }

    #[test]
    fn test_decode_body() {
        let batch: Vec<String> = decode_body(br#"["a","b"]"#).unwrap();
        assert_eq!(batch, vec!["a", "b"]);

        let err = decode_body::<Vec<String>>(b"{not json").unwrap_err();
        assert_eq!(err, StatusCode::INTERNAL_SERVER_ERROR);
    }
}
