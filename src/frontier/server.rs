// src/frontier/server.rs
// =============================================================================
// The shard's single HTTP endpoint, dispatched on method:
//
//   POST /api/reservoir   JSON array of URLs  -> Submit   (200, or 500 on bad JSON)
//   GET  /api/reservoir                       -> Retrieve (JSON array)
//   anything else                             -> 404
//
// HEAD is a 404 too. Answering it like a GET would consume an offer without
// ever sending it.
// =============================================================================

use super::store::StoreHandle;
use crate::http::{decode_body, RESERVOIR_PATH};
use axum::body::Bytes;
use axum::extract::{DefaultBodyLimit, State};
use axum::http::{Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::any;
use axum::{Json, Router};
use tracing::warn;

pub fn routes(store: StoreHandle) -> Router {
    Router::new()
        .route(RESERVOIR_PATH, any(reservoir))
        // Batches have no size cap; the router may forward a busy bucket in one POST.
        .layer(DefaultBodyLimit::disable())
        .with_state(store)
}

async fn reservoir(State(store): State<StoreHandle>, method: Method, body: Bytes) -> Response {
    match method {
        Method::POST => submit(&store, &body).await,
        Method::GET => retrieve(&store).await,
        _ => StatusCode::NOT_FOUND.into_response(),
    }
}

async fn submit(store: &StoreHandle, body: &[u8]) -> Response {
    let batch: Vec<String> = match decode_body(body) {
        Ok(batch) => batch,
        Err(status) => return status.into_response(),
    };

    match store.submit(batch).await {
        Ok(()) => StatusCode::OK.into_response(),
        Err(err) => {
            warn!(error = %err, "submit refused");
            StatusCode::SERVICE_UNAVAILABLE.into_response()
        }
    }
}

async fn retrieve(store: &StoreHandle) -> Response {
    match store.retrieve().await {
        Ok(offer) => Json(offer).into_response(),
        Err(err) => {
            warn!(error = %err, "retrieve refused");
            StatusCode::SERVICE_UNAVAILABLE.into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frontier::persist::Recovered;
    use crate::frontier::store::FrontierStore;
    use std::net::SocketAddr;
    use tokio::sync::mpsc;
    use tokio_util::sync::CancellationToken;

    // Serves a store seeded with `items` on an ephemeral port.
    async fn start(items: &[&str]) -> (SocketAddr, CancellationToken) {
        let (log_tx, mut log_rx) = mpsc::channel(64);
        tokio::spawn(async move { while log_rx.recv().await.is_some() {} });

        let recovered = Recovered {
            items: items.iter().map(|s| s.to_string()).collect(),
            discarded: 0,
        };
        let shutdown = CancellationToken::new();
        let (handle, _task) = FrontierStore::new(recovered, 10, log_tx).spawn(shutdown.clone());

        let listener = crate::http::bind("127.0.0.1:0".parse().unwrap()).await.unwrap();
        let address = listener.local_addr().unwrap();
        tokio::spawn(crate::http::serve(listener, routes(handle), shutdown.clone()));
        (address, shutdown)
    }

    fn url(address: SocketAddr) -> String {
        format!("http://{address}{RESERVOIR_PATH}")
    }

    #[tokio::test]
    async fn test_get_returns_json_offer() {
        let (address, shutdown) = start(&["asd", "qwe"]).await;
        let response = reqwest::get(url(address)).await.unwrap();

        assert_eq!(response.status(), reqwest::StatusCode::OK);
        assert_eq!(
            response.headers().get("content-type").unwrap(),
            "application/json"
        );
        let offer: Vec<String> = response.json().await.unwrap();
        assert_eq!(offer, vec!["asd", "qwe"]);
        shutdown.cancel();
    }

    #[tokio::test]
    async fn test_get_empty_offer() {
        let (address, shutdown) = start(&[]).await;
        let offer: Vec<String> = reqwest::get(url(address)).await.unwrap().json().await.unwrap();
        assert!(offer.is_empty());
        shutdown.cancel();
    }

    #[tokio::test]
    async fn test_post_then_get() {
        let (address, shutdown) = start(&[]).await;
        let client = reqwest::Client::new();

        let response = client
            .post(url(address))
            .json(&["asd", "qwe"])
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), reqwest::StatusCode::OK);

        // The first GET hands out the (empty) startup offer.
        let first: Vec<String> = client.get(url(address)).send().await.unwrap().json().await.unwrap();
        let second: Vec<String> = client.get(url(address)).send().await.unwrap().json().await.unwrap();
        assert!(first.is_empty());
        assert_eq!(second, vec!["asd", "qwe"]);
        shutdown.cancel();
    }

    #[tokio::test]
    async fn test_post_larger_than_two_megabytes() {
        let (address, shutdown) = start(&[]).await;
        let client = reqwest::Client::new();
        let urls: Vec<String> = (0..40_000)
            .map(|i| format!("https://site.test/a/fairly/long/path/segment/{i:08}"))
            .collect();
        let body = serde_json::to_vec(&urls).unwrap();
        assert!(body.len() > 2 * 1024 * 1024);

        let response = client.post(url(address)).body(body).send().await.unwrap();
        assert_eq!(response.status(), reqwest::StatusCode::OK);

        let first: Vec<String> = client.get(url(address)).send().await.unwrap().json().await.unwrap();
        let second: Vec<String> = client.get(url(address)).send().await.unwrap().json().await.unwrap();
        assert!(first.is_empty());
        assert_eq!(second, urls[..10].to_vec());
        shutdown.cancel();
    }

    #[tokio::test]
    async fn test_post_empty_batch() {
        let (address, shutdown) = start(&[]).await;
        let response = reqwest::Client::new()
            .post(url(address))
            .body("[]")
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), reqwest::StatusCode::OK);
        shutdown.cancel();
    }

    #[tokio::test]
    async fn test_malformed_post_is_500() {
        let (address, shutdown) = start(&["kept"]).await;
        let client = reqwest::Client::new();
        let response = client
            .post(url(address))
            .body(r#"{"not":"an array"}"#)
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), reqwest::StatusCode::INTERNAL_SERVER_ERROR);

        let offer: Vec<String> = client.get(url(address)).send().await.unwrap().json().await.unwrap();
        assert_eq!(offer, vec!["kept"]);
        shutdown.cancel();
    }

    #[tokio::test]
    async fn test_other_methods_are_404() {
        let (address, shutdown) = start(&["kept"]).await;
        let client = reqwest::Client::new();

        for method in [reqwest::Method::HEAD, reqwest::Method::PUT, reqwest::Method::DELETE] {
            let response = client.request(method, url(address)).send().await.unwrap();
            assert_eq!(response.status(), reqwest::StatusCode::NOT_FOUND);
        }

        // None of those consumed the offer.
        let offer: Vec<String> = client.get(url(address)).send().await.unwrap().json().await.unwrap();
        assert_eq!(offer, vec!["kept"]);
        shutdown.cancel();
    }
}
