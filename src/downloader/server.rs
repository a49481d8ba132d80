// src/downloader/server.rs
// =============================================================================
//   POST /api/downloader   JSON string (one URL) -> queued for download
//   anything else                                -> 404
// =============================================================================

use crate::http::{decode_body, DOWNLOADER_PATH};
use axum::body::Bytes;
use axum::extract::{DefaultBodyLimit, State};
use axum::http::{Method, StatusCode};
use axum::routing::any;
use axum::Router;
use tokio::sync::mpsc;
use tracing::warn;

pub fn routes(urls: mpsc::Sender<String>) -> Router {
    Router::new()
        .route(DOWNLOADER_PATH, any(downloader))
        .layer(DefaultBodyLimit::disable())
        .with_state(urls)
}

async fn downloader(
    State(urls): State<mpsc::Sender<String>>,
    method: Method,
    body: Bytes,
) -> StatusCode {
    if method != Method::POST {
        return StatusCode::NOT_FOUND;
    }

    let url: String = match decode_body(&body) {
        Ok(url) => url,
        Err(status) => return status,
    };

    match urls.send(url).await {
        Ok(()) => StatusCode::OK,
        Err(_) => {
            warn!("download queue is closed");
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}
