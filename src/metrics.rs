//! Prometheus metrics for the concept graph CLI.
//!
//! Exposes:
//! - `concept_graph_command_duration_seconds` (histogram)
//! - `concept_graph_command_total` (counter with status)
//! - `concept_graph_command_inflight` (gauge)
//! - `concept_graph_graph_elements` (histogram of nodes/edges per written graph)
//! - `concept_graph_extraction_units_total` (counter with outcome)
//! - `concept_graph_merge_duration_seconds` (histogram)
//! - `concept_graph_dropped_edges_total` (counter)
//! - `concept_graph_cache_evictions_total` (counter)
//! - process metrics via `process` collector

use std::convert::Infallible;
use std::net::SocketAddr;
use std::time::Duration;

use bytes::Bytes;
use http_body_util::Full;
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use once_cell::sync::Lazy;
use prometheus::process_collector::ProcessCollector;
use prometheus::{
    default_registry, register_histogram, register_histogram_vec, register_int_counter,
    register_int_counter_vec, register_int_gauge_vec, Encoder, Histogram, HistogramVec,
    IntCounter, IntCounterVec, IntGaugeVec, TextEncoder,
};
use tokio::net::TcpListener;
use tracing::{error, info, warn};

static PROCESS_COLLECTOR: Lazy<()> = Lazy::new(|| {
    if let Err(err) = default_registry().register(Box::new(ProcessCollector::for_self())) {
        warn!("Failed to register process collector: {}", err);
    }
});

static COMMAND_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    // paths/analyze on small graphs finish in milliseconds, extract over a
    // corpus with per-unit timeouts can take minutes: 1ms .. ~6min.
    let buckets =
        prometheus::exponential_buckets(0.001, 2.5, 15).expect("failed to create histogram buckets");
    register_histogram_vec!(
        "concept_graph_command_duration_seconds",
        "Wall time of one extract/merge/analyze/paths run in seconds",
        &["command"],
        buckets
    )
    .expect("failed to register command duration histogram")
});

static COMMAND_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "concept_graph_command_total",
        "Graph command runs by command and status (ok/error)",
        &["command", "status"]
    )
    .expect("failed to register command counter")
});

static COMMAND_INFLIGHT: Lazy<IntGaugeVec> = Lazy::new(|| {
    register_int_gauge_vec!(
        "concept_graph_command_inflight",
        "Graph commands currently running",
        &["command"]
    )
    .expect("failed to register inflight gauge")
});

static GRAPH_ELEMENTS: Lazy<HistogramVec> = Lazy::new(|| {
    // 1 .. 65536 elements
    let buckets =
        prometheus::exponential_buckets(1.0, 2.0, 17).expect("failed to create histogram buckets");
    register_histogram_vec!(
        "concept_graph_graph_elements",
        "Nodes and edges in each graph a command wrote or analysed",
        &["command", "element"],
        buckets
    )
    .expect("failed to register graph size histogram")
});

static EXTRACTION_UNITS: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "concept_graph_extraction_units_total",
        "Extraction units processed by outcome",
        &["outcome"]
    )
    .expect("failed to register extraction unit counter")
});

static MERGE_DURATION: Lazy<Histogram> = Lazy::new(|| {
    let buckets =
        prometheus::exponential_buckets(0.0005, 2.0, 16).expect("failed to create histogram buckets");
    register_histogram!(
        "concept_graph_merge_duration_seconds",
        "Graph merge duration in seconds",
        buckets
    )
    .expect("failed to register merge duration histogram")
});

static DROPPED_EDGES: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "concept_graph_dropped_edges_total",
        "Edges dropped during merge for referencing missing nodes"
    )
    .expect("failed to register dropped edge counter")
});

static CACHE_EVICTIONS: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "concept_graph_cache_evictions_total",
        "Consolidated graphs evicted from the result cache"
    )
    .expect("failed to register cache eviction counter")
});

/// How a single extraction unit ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitOutcome {
    Ok,
    Failed,
    Timeout,
}

impl UnitOutcome {
    pub fn as_str(self) -> &'static str {
        match self {
            UnitOutcome::Ok => "ok",
            UnitOutcome::Failed => "failed",
            UnitOutcome::Timeout => "timeout",
        }
    }
}

/// Ensure collectors are registered.
fn init_collectors() {
    Lazy::force(&PROCESS_COLLECTOR);
    Lazy::force(&COMMAND_DURATION);
    Lazy::force(&COMMAND_TOTAL);
    Lazy::force(&COMMAND_INFLIGHT);
    Lazy::force(&GRAPH_ELEMENTS);
    Lazy::force(&EXTRACTION_UNITS);
    Lazy::force(&MERGE_DURATION);
    Lazy::force(&DROPPED_EDGES);
    Lazy::force(&CACHE_EVICTIONS);
}

/// Increment inflight gauge for a command.
pub fn record_command_start(command: &'static str) {
    init_collectors();
    COMMAND_INFLIGHT.with_label_values(&[command]).inc();
}

/// Record command completion with duration and status.
pub fn record_command_result(command: &'static str, duration: Duration, success: bool) {
    init_collectors();
    COMMAND_INFLIGHT.with_label_values(&[command]).dec();
    COMMAND_DURATION
        .with_label_values(&[command])
        .observe(duration.as_secs_f64());
    COMMAND_TOTAL
        .with_label_values(&[command, if success { "ok" } else { "error" }])
        .inc();
}

/// Record the size of the graph a command produced or read.
pub fn record_graph_size(command: &'static str, nodes: usize, edges: usize) {
    init_collectors();
    GRAPH_ELEMENTS
        .with_label_values(&[command, "nodes"])
        .observe(nodes as f64);
    GRAPH_ELEMENTS
        .with_label_values(&[command, "edges"])
        .observe(edges as f64);
}

pub fn record_extraction_unit(outcome: UnitOutcome) {
    EXTRACTION_UNITS.with_label_values(&[outcome.as_str()]).inc();
}

/// Record one merge pass and the edges it had to drop.
pub fn record_merge(duration: Duration, dropped_edges: usize) {
    MERGE_DURATION.observe(duration.as_secs_f64());
    DROPPED_EDGES.inc_by(dropped_edges as u64);
}

pub fn record_cache_eviction() {
    CACHE_EVICTIONS.inc();
}

fn plain_response(status: StatusCode, body: impl Into<Bytes>) -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::new(body.into()));
    *response.status_mut() = status;
    response
}

async fn metrics_response() -> Result<Response<Full<Bytes>>, Infallible> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();

    if let Err(err) = encoder.encode(&metric_families, &mut buffer) {
        error!("Failed to encode metrics: {}", err);
        return Ok(plain_response(
            StatusCode::INTERNAL_SERVER_ERROR,
            "encode error",
        ));
    }

    let mut response = plain_response(StatusCode::OK, buffer);
    if let Ok(content_type) = encoder.format_type().parse::<hyper::header::HeaderValue>() {
        response
            .headers_mut()
            .insert(hyper::header::CONTENT_TYPE, content_type);
    }
    Ok(response)
}

async fn handle_request(req: Request<Incoming>) -> Result<Response<Full<Bytes>>, Infallible> {
    match req.uri().path() {
        "/metrics" => metrics_response().await,
        _ => Ok(plain_response(StatusCode::NOT_FOUND, Bytes::new())),
    }
}

async fn serve(addr: SocketAddr) -> anyhow::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    info!(%addr, "Prometheus metrics endpoint started");

    loop {
        let (stream, peer) = listener.accept().await?;
        let service = service_fn(handle_request);
        let io = TokioIo::new(stream);

        tokio::spawn(async move {
            if let Err(err) = http1::Builder::new().serve_connection(io, service).await {
                warn!(?peer, "Metrics connection error: {}", err);
            }
        });
    }
}

/// Spawn the metrics HTTP endpoint on the given address.
pub fn spawn_metrics_server(addr: SocketAddr) {
    init_collectors();
    tokio::spawn(async move {
        if let Err(err) = serve(addr).await {
            error!(%addr, "Metrics server failed: {}", err);
        }
    });
}
