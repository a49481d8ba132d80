// src/downloader/fetch.rs
// =============================================================================
// Fetch workers: pull URLs off the downloader's queue, GET them, and hand the
// bytes (plus a file extension guessed from Content-Type) to the writer.
//
// Up to `workers` downloads run at once. Failed downloads are logged and
// skipped. On shutdown the queue is closed and drained: every URL that was
// accepted still gets fetched.
// =============================================================================

use anyhow::{anyhow, Result};
use futures::stream::{self, StreamExt};
use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Content-Type substrings and the extension stored for each.
/// Checked in order; the first match wins.
const EXTENSIONS: [(&str, &str); 16] = [
    ("text/html", "html"),
    ("text/css", "css"),
    ("application/javascript", "js"),
    ("text/plain", "txt"),
    ("image/bmp", "bmp"),
    ("image/gif", "gif"),
    ("image/x-icon", "x-icon"),
    ("image/jpeg", "jpeg"),
    ("image/png", "png"),
    ("video/webm", "webm"),
    ("audio/webm", "weba"),
    ("audio/wav", "wav"),
    ("video/mp4", "mp4"),
    ("video/x-msvideo", "avi"),
    ("video/mpeg", "mpeg"),
    ("video/ogg", "ogg"),
];

const FALLBACK_EXTENSION: &str = "other";

/// A downloaded body waiting to be deduplicated and stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedAsset {
    pub url: String,
    pub extension: &'static str,
    pub content: Vec<u8>,
}

pub fn extension_for(content_type: &str) -> &'static str {
    EXTENSIONS
        .iter()
        .find(|(pattern, _)| content_type.contains(pattern))
        .map(|(_, extension)| *extension)
        .unwrap_or(FALLBACK_EXTENSION)
}

/// Downloads every URL from `urls` until the queue closes. Once `shutdown`
/// fires the queue stops taking URLs, and the ones already in it (each was
/// answered with a 200) are still downloaded.
pub async fn run_fetchers(
    client: Client,
    urls: mpsc::Receiver<String>,
    assets: mpsc::Sender<FetchedAsset>,
    workers: usize,
    shutdown: CancellationToken,
) {
    let incoming = stream::unfold((urls, shutdown), |(mut urls, shutdown)| async move {
        let next = next_url(&mut urls, &shutdown).await;
        next.map(|url| (url, (urls, shutdown)))
    });

    incoming
        .for_each_concurrent(workers.max(1), |url| {
            let client = client.clone();
            let assets = assets.clone();
            async move {
                match fetch(&client, &url).await {
                    Ok(asset) => {
                        debug!(url = %asset.url, bytes = asset.content.len(), "fetched");
                        if assets.send(asset).await.is_err() {
                            warn!(%url, "asset writer is gone; download discarded");
                        }
                    }
                    Err(err) => warn!(%url, error = %err, "download failed"),
                }
            }
        })
        .await;
}

async fn next_url(urls: &mut mpsc::Receiver<String>, shutdown: &CancellationToken) -> Option<String> {
    if !shutdown.is_cancelled() {
        tokio::select! {
            url = urls.recv() => return url,
            _ = shutdown.cancelled() => {}
        }
    }
    urls.close();
    urls.recv().await
}

async fn fetch(client: &Client, url: &str) -> Result<FetchedAsset> {
    let response = client.get(url).send().await?;
    if !response.status().is_success() {
        return Err(anyhow!("HTTP {}", response.status()));
    }

    let extension = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .map(extension_for)
        .unwrap_or(FALLBACK_EXTENSION);
    let content = response.bytes().await?.to_vec();

    Ok(FetchedAsset {
        url: url.to_string(),
        extension,
        content,
    })
}

// -----------------------------------------------------------------------------
// BEGINNER NOTES:
//
// 1. What is stream::unfold?
//    - Turns "call this async fn again and again" into a Stream
//    - Each call returns Some((item, next_state)) or None to end the stream
//
// 2. for_each_concurrent vs buffer_unordered
//    - Both run up to N futures at once
//    - for_each_concurrent is for futures that return nothing; here each
//      worker sends its result on a channel instead
//
// 3. Why &'static str for the extension?
//    - Every extension comes from the EXTENSIONS table, which lives for the
//      whole program, so no String allocation is needed
// -----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::header;
    use axum::routing::get;
    use axum::Router;
    use std::time::Duration;

    #[test]
    fn test_extension_for_known_types() {
        assert_eq!(extension_for("text/html; charset=utf-8"), "html");
        assert_eq!(extension_for("image/png"), "png");
        assert_eq!(extension_for("audio/webm"), "weba");
        assert_eq!(extension_for("video/x-msvideo"), "avi");
    }

    #[test]
    fn test_extension_for_unknown_types() {
        assert_eq!(extension_for("application/pdf"), "other");
        assert_eq!(extension_for(""), "other");
    }

    #[tokio::test]
    async fn test_fetchers_download_until_queue_closes() {
        let app = Router::new()
            .route("/page", get(|| async { ([(header::CONTENT_TYPE, "text/html")], "<p>hi</p>") }))
            .route("/logo", get(|| async { ([(header::CONTENT_TYPE, "image/png")], vec![1u8, 2, 3]) }))
            .route("/missing", get(|| async { axum::http::StatusCode::NOT_FOUND }));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap();
        tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });

        let (url_tx, url_rx) = mpsc::channel(8);
        let (asset_tx, mut asset_rx) = mpsc::channel(8);
        let client = crate::http::client(Duration::from_secs(5)).unwrap();
        let fetchers = tokio::spawn(run_fetchers(
            client,
            url_rx,
            asset_tx,
            2,
            CancellationToken::new(),
        ));

        for path in ["page", "logo", "missing"] {
            url_tx.send(format!("http://{address}/{path}")).await.unwrap();
        }
        drop(url_tx);
        fetchers.await.unwrap();

        let mut assets = Vec::new();
        while let Some(asset) = asset_rx.recv().await {
            assets.push(asset);
        }
        assets.sort_by(|a, b| a.url.cmp(&b.url));

        assert_eq!(assets.len(), 2);
        assert_eq!(assets[0].extension, "png");
        assert_eq!(assets[0].content, vec![1, 2, 3]);
        assert_eq!(assets[1].extension, "html");
        assert_eq!(assets[1].content, b"<p>hi</p>".to_vec());
    }

    #[tokio::test]
    async fn test_queued_urls_are_fetched_after_shutdown() {
        let app = Router::new().route(
            "/asset/:id",
            get(|axum::extract::Path(id): axum::extract::Path<u32>| async move {
                ([(header::CONTENT_TYPE, "text/plain")], format!("asset {id}"))
            }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap();
        tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });

        let (url_tx, url_rx) = mpsc::channel(8);
        let (asset_tx, mut asset_rx) = mpsc::channel(8);
        for id in 0..4 {
            url_tx.send(format!("http://{address}/asset/{id}")).await.unwrap();
        }

        let shutdown = CancellationToken::new();
        shutdown.cancel();
        let client = crate::http::client(Duration::from_secs(5)).unwrap();
        tokio::time::timeout(
            Duration::from_secs(10),
            run_fetchers(client, url_rx, asset_tx, 2, shutdown),
        )
        .await
        .expect("fetchers should finish the queued URLs and stop");

        // The queue no longer takes new URLs.
        assert!(url_tx.send("http://late.test/".to_string()).await.is_err());

        let mut bodies = Vec::new();
        while let Some(asset) = asset_rx.recv().await {
            bodies.push(String::from_utf8(asset.content).unwrap());
        }
        bodies.sort();
        assert_eq!(bodies, vec!["asset 0", "asset 1", "asset 2", "asset 3"]);
    }

    #[tokio::test]
    async fn test_fetchers_stop_on_shutdown() {
        let (_url_tx, url_rx) = mpsc::channel::<String>(8);
        let (asset_tx, _asset_rx) = mpsc::channel(8);
        let shutdown = CancellationToken::new();
        let fetchers = tokio::spawn(run_fetchers(
            Client::new(),
            url_rx,
            asset_tx,
            2,
            shutdown.clone(),
        ));

        shutdown.cancel();
        tokio::time::timeout(Duration::from_secs(5), fetchers)
            .await
            .expect("fetchers should stop once cancelled")
            .unwrap();
    }
}
