use lazy_static::lazy_static;
use prometheus::{Counter, Encoder, Histogram, HistogramOpts, Opts, Registry, TextEncoder};
use tracing::error;

lazy_static! {
    pub static ref REGISTRY: Registry = Registry::new();
    pub static ref REPORTS_RECEIVED_TOTAL: Counter = Counter::with_opts(Opts::new(
        "status_reports_received_total",
        "Total status reports received over HTTP"
    ))
    .unwrap();
    pub static ref REPORTS_STORED_TOTAL: Counter = Counter::with_opts(Opts::new(
        "status_reports_stored_total",
        "Total status reports written to the store"
    ))
    .unwrap();
    pub static ref REPORTS_REJECTED_TOTAL: Counter = Counter::with_opts(Opts::new(
        "status_reports_rejected_total",
        "Total status reports rejected by validation"
    ))
    .unwrap();
    pub static ref LOOKUPS_TOTAL: Counter = Counter::with_opts(Opts::new(
        "status_lookups_total",
        "Total latest-status lookups"
    ))
    .unwrap();
    pub static ref LOOKUPS_NOT_FOUND_TOTAL: Counter = Counter::with_opts(Opts::new(
        "status_lookups_not_found_total",
        "Total lookups for serial numbers without any report"
    ))
    .unwrap();
    pub static ref STORE_FAILURES_TOTAL: Counter = Counter::with_opts(Opts::new(
        "status_store_failures_total",
        "Total failed store operations"
    ))
    .unwrap();
    pub static ref STORE_LATENCY_SECONDS: Histogram = Histogram::with_opts(
        HistogramOpts::new(
            "status_store_latency_seconds",
            "Time taken by a single store query"
        )
        .buckets(vec![
            0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0
        ])
    )
    .unwrap();
}

pub fn init_metrics() {
    REGISTRY
        .register(Box::new(REPORTS_RECEIVED_TOTAL.clone()))
        .unwrap();
    REGISTRY
        .register(Box::new(REPORTS_STORED_TOTAL.clone()))
        .unwrap();
    REGISTRY
        .register(Box::new(REPORTS_REJECTED_TOTAL.clone()))
        .unwrap();
    REGISTRY.register(Box::new(LOOKUPS_TOTAL.clone())).unwrap();
    REGISTRY
        .register(Box::new(LOOKUPS_NOT_FOUND_TOTAL.clone()))
        .unwrap();
    REGISTRY
        .register(Box::new(STORE_FAILURES_TOTAL.clone()))
        .unwrap();
    REGISTRY
        .register(Box::new(STORE_LATENCY_SECONDS.clone()))
        .unwrap();
}

pub fn gather_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        error!("Failed to encode metrics: {}", e);
        return String::new();
    }
    String::from_utf8(buffer).unwrap_or_default()
}
