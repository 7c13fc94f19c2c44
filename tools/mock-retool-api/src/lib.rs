//! Mock Retool management API used by integration tests and local smoke runs.

pub mod store;

use anyhow::{Context, Result};
use axum::{
    Router,
    body::Bytes,
    extract::{Query, State},
    http::{HeaderMap, Method, StatusCode, Uri, header::AUTHORIZATION},
    response::{IntoResponse, Response},
    routing::any,
};
use parking_lot::Mutex;
use serde_json::Value;
use std::{net::SocketAddr, sync::Arc, time::Duration};
use tokio::{net::TcpListener, task::JoinHandle};
use tokio_util::sync::CancellationToken;

use crate::store::{Failure, Store};

pub const DEFAULT_ADDR: &str = "127.0.0.1:9200";
const API_PREFIX: &str = "/api/v2/";

#[derive(Clone)]
struct MockState {
    token: Arc<str>,
    store: Arc<Mutex<Store>>,
}

pub fn router(token: impl Into<String>) -> Router {
    let state = MockState {
        token: Arc::from(token.into()),
        store: Arc::new(Mutex::new(Store::seeded())),
    };
    Router::new()
        .route("/api/v2/*rest", any(handle))
        .with_state(state)
}

async fn handle(
    State(state): State<MockState>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    Query(query): Query<Vec<(String, String)>>,
    body: Bytes,
) -> Response {
    let presented = headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "));
    if presented != Some(&*state.token) {
        tracing::warn!(%method, path = uri.path(), "rejected request without valid token");
        return Failure::new(StatusCode::UNAUTHORIZED, "Unauthorized")
            .into_reply()
            .into_response();
    }

    let segments = match decode_segments(uri.path()) {
        Ok(segments) => segments,
        Err(failure) => return failure.into_reply().into_response(),
    };
    let body = if body.iter().all(u8::is_ascii_whitespace) {
        None
    } else {
        match serde_json::from_slice::<Value>(&body) {
            Ok(value) => Some(value),
            Err(err) => {
                return Failure::new(StatusCode::BAD_REQUEST, format!("invalid JSON body: {err}"))
                    .into_reply()
                    .into_response();
            }
        }
    };

    let reply = state.store.lock().handle(&method, &segments, &query, body);
    tracing::info!(%method, path = uri.path(), "handled");
    reply.into_response()
}

/// Splits the raw path so that `%2F` inside an id stays inside one segment.
fn decode_segments(path: &str) -> Result<Vec<String>, Failure> {
    let rest = path.strip_prefix(API_PREFIX).unwrap_or_default();
    rest.split('/')
        .filter(|s| !s.is_empty())
        .map(|raw| {
            urlencoding::decode(raw)
                .map(|s| s.into_owned())
                .map_err(|_| Failure::new(StatusCode::BAD_REQUEST, "path is not valid UTF-8"))
        })
        .collect()
}

pub struct MockHandle {
    pub addr: SocketAddr,
    ct: CancellationToken,
    task: JoinHandle<()>,
}

impl MockHandle {
    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub async fn shutdown(mut self) {
        self.ct.cancel();
        // Pooled client connections can hold graceful shutdown open.
        if tokio::time::timeout(Duration::from_secs(2), &mut self.task)
            .await
            .is_err()
        {
            self.task.abort();
        }
    }
}

impl Drop for MockHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Binds `addr` (port 0 picks a free port) and serves until shut down.
pub async fn spawn(addr: SocketAddr, token: impl Into<String>) -> Result<MockHandle> {
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("bind mock api on {addr}"))?;
    let addr = listener.local_addr().context("read bound address")?;
    let app = router(token);
    let ct = CancellationToken::new();
    let task = tokio::spawn({
        let ct = ct.clone();
        async move {
            tracing::info!(%addr, "mock retool api listening");
            if let Err(err) = axum::serve(listener, app)
                .with_graceful_shutdown(async move { ct.cancelled().await })
                .await
            {
                tracing::error!(%err, "mock retool api terminated");
            }
        }
    });
    Ok(MockHandle { addr, ct, task })
}
