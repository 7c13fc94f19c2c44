use axum::{
    Router,
    extract::State,
    http::{HeaderMap, HeaderValue, StatusCode},
    response::IntoResponse,
    routing::get,
};
use axum_server::tls_rustls::RustlsConfig;
use once_cell::sync::Lazy;
use prometheus::{
    Encoder, HistogramVec, IntCounterVec, IntGauge, TextEncoder, register_histogram_vec,
    register_int_counter_vec, register_int_gauge,
};
use std::{net::SocketAddr, path::PathBuf, time::Duration};
use tokio::net::TcpListener;
use tracing::{error, info, warn};

pub static TOOL_CALLS: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "retool_tool_calls_total",
        "Tool calls by tool name and outcome code",
        &["tool", "outcome"]
    )
    .expect("register retool_tool_calls_total")
});

pub static TOOL_LATENCY: Lazy<HistogramVec> = Lazy::new(|| {
    register_histogram_vec!(
        "retool_tool_latency_ms",
        "Wall-clock latency of tool calls in ms",
        &["tool"],
        vec![5.0, 25.0, 100.0, 250.0, 1000.0, 2500.0, 10000.0, 30000.0]
    )
    .expect("register retool_tool_latency_ms")
});

pub static UPSTREAM_REQUESTS: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "retool_upstream_requests_total",
        "Requests sent to the Retool API by method and status class",
        &["method", "status_class"]
    )
    .expect("register retool_upstream_requests_total")
});

pub static INFLIGHT_CALLS: Lazy<IntGauge> = Lazy::new(|| {
    register_int_gauge!("retool_inflight_calls", "Tool calls currently executing")
        .expect("register retool_inflight_calls")
});

/// Holds the in-flight gauge up for as long as it lives.
pub struct InflightGuard;

impl InflightGuard {
    pub fn new() -> Self {
        INFLIGHT_CALLS.inc();
        InflightGuard
    }
}

impl Default for InflightGuard {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for InflightGuard {
    fn drop(&mut self) {
        INFLIGHT_CALLS.dec();
    }
}

pub fn record_tool_call(tool: &str, outcome: &str, elapsed: Duration) {
    TOOL_CALLS.with_label_values(&[tool, outcome]).inc();
    TOOL_LATENCY
        .with_label_values(&[tool])
        .observe(elapsed.as_secs_f64() * 1000.0);
}

/// `status` is `None` when no response arrived (timeout, refused connection).
pub fn record_upstream(method: &str, status: Option<u16>) {
    UPSTREAM_REQUESTS
        .with_label_values(&[method, status_class(status)])
        .inc();
}

fn status_class(status: Option<u16>) -> &'static str {
    match status {
        Some(200..=299) => "2xx",
        Some(300..=399) => "3xx",
        Some(400..=499) => "4xx",
        Some(500..=599) => "5xx",
        Some(_) => "other",
        None => "transport",
    }
}

#[derive(Clone, Debug)]
pub struct TlsConfig {
    pub cert_path: PathBuf,
    pub key_path: PathBuf,
}

#[derive(Clone, Debug)]
pub struct MetricsServerConfig {
    pub addr: SocketAddr,
    pub auth_token: Option<String>,
    pub allow_insecure: bool,
    pub tls: Option<TlsConfig>,
}

#[derive(Clone)]
struct MetricsState {
    auth_token: Option<String>,
}

fn router(auth_token: Option<String>) -> Router {
    Router::new()
        .route("/metrics", get(metrics_handler))
        .with_state(MetricsState { auth_token })
}

pub async fn spawn_metrics_server(config: MetricsServerConfig) {
    let MetricsServerConfig {
        addr,
        auth_token,
        allow_insecure,
        tls,
    } = config;
    if !allow_insecure && tls.is_none() {
        warn!(%addr, "metrics server skipped: TLS required but not configured");
        return;
    }

    let app = router(auth_token);

    tokio::spawn(async move {
        if let Some(tls_cfg) = tls {
            match RustlsConfig::from_pem_file(&tls_cfg.cert_path, &tls_cfg.key_path).await {
                Ok(rustls_config) => {
                    info!(%addr, "metrics server (TLS) starting");
                    if let Err(err) = axum_server::bind_rustls(addr, rustls_config)
                        .serve(app.into_make_service())
                        .await
                    {
                        error!(%addr, %err, "metrics server terminated");
                    }
                }
                Err(err) => {
                    error!(%addr, %err, "failed to load TLS config");
                }
            }
        } else {
            info!(%addr, "metrics server (HTTP) starting");
            match TcpListener::bind(addr).await {
                Ok(listener) => {
                    if let Err(err) = axum::serve(listener, app.into_make_service()).await {
                        error!(%addr, %err, "metrics server terminated");
                    }
                }
                Err(err) => {
                    error!(%addr, %err, "failed to bind metrics listener");
                }
            }
        }
    });
}

async fn metrics_handler(
    State(state): State<MetricsState>,
    headers: HeaderMap,
) -> axum::response::Response {
    if let Some(token) = &state.auth_token {
        if !is_authorized(headers.get(http::header::AUTHORIZATION), token) {
            return StatusCode::UNAUTHORIZED.into_response();
        }
    }

    let encoder = TextEncoder::new();
    let mut buf = Vec::new();
    if let Err(err) = encoder.encode(&prometheus::gather(), &mut buf) {
        error!(%err, "failed to encode metrics");
        return (StatusCode::INTERNAL_SERVER_ERROR, "metrics encoding failed").into_response();
    }

    let content_type = HeaderValue::from_str(encoder.format_type())
        .unwrap_or(HeaderValue::from_static("text/plain"));
    ([(http::header::CONTENT_TYPE, content_type)], buf).into_response()
}

fn is_authorized(header: Option<&HeaderValue>, token: &str) -> bool {
    match header
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
    {
        Some(presented) => presented.trim() == token,
        None => false,
    }
}
