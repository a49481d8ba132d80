// src/router/server.rs
// =============================================================================
// The router's /api/reservoir endpoint. Same shape as a shard's:
//
//   POST  JSON array of URLs -> queued for bucketing (200, 500 on bad JSON)
//   GET   proxied to a randomly chosen shard; status, headers and body are
//         streamed back as the shard sent them
//   other -> 404
// =============================================================================

use super::actor::RouterHandle;
use crate::http::{decode_body, RESERVOIR_PATH};
use axum::body::{Body, Bytes};
use axum::extract::{DefaultBodyLimit, State};
use axum::http::{HeaderMap, HeaderName, HeaderValue, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::any;
use axum::Router;
use rand::Rng;
use std::sync::Arc;
use tracing::warn;
use url::Url;

// Connection-level headers that must not be copied onto our own response.
const HOP_BY_HOP: [&str; 4] = ["connection", "keep-alive", "transfer-encoding", "upgrade"];

#[derive(Clone)]
struct RouterState {
    router: RouterHandle,
    shards: Arc<Vec<Url>>,
    client: reqwest::Client,
}

pub fn routes(router: RouterHandle, shards: Vec<Url>, client: reqwest::Client) -> Router {
    let state = RouterState {
        router,
        shards: Arc::new(shards),
        client,
    };
    Router::new()
        .route(RESERVOIR_PATH, any(reservoir))
        .layer(DefaultBodyLimit::disable())
        .with_state(state)
}

async fn reservoir(State(state): State<RouterState>, method: Method, body: Bytes) -> Response {
    match method {
        Method::POST => accept(&state, &body).await,
        Method::GET => proxy_retrieve(&state).await,
        _ => StatusCode::NOT_FOUND.into_response(),
    }
}

async fn accept(state: &RouterState, body: &[u8]) -> Response {
    let batch: Vec<String> = match decode_body(body) {
        Ok(batch) => batch,
        Err(status) => return status.into_response(),
    };

    match state.router.accept(batch).await {
        Ok(()) => StatusCode::OK.into_response(),
        Err(err) => {
            warn!(error = %err, "accept refused");
            StatusCode::SERVICE_UNAVAILABLE.into_response()
        }
    }
}

async fn proxy_retrieve(state: &RouterState) -> Response {
    if state.shards.is_empty() {
        return StatusCode::BAD_GATEWAY.into_response();
    }
    let index = rand::thread_rng().gen_range(0..state.shards.len());
    let shard = &state.shards[index];

    let upstream = match state.client.get(shard.clone()).send().await {
        Ok(upstream) => upstream,
        Err(err) => {
            warn!(%shard, error = %err, "proxied retrieve failed");
            return StatusCode::BAD_GATEWAY.into_response();
        }
    };

    let status = StatusCode::from_u16(upstream.status().as_u16()).unwrap_or(StatusCode::BAD_GATEWAY);
    let mut headers = HeaderMap::new();
    for (name, value) in upstream.headers() {
        if HOP_BY_HOP.contains(&name.as_str()) {
            continue;
        }
        // reqwest and axum sit on different `http` versions; go through bytes.
        if let (Ok(name), Ok(value)) = (
            HeaderName::from_bytes(name.as_str().as_bytes()),
            HeaderValue::from_bytes(value.as_bytes()),
        ) {
            headers.append(name, value);
        }
    }

    (status, headers, Body::from_stream(upstream.bytes_stream())).into_response()
}
