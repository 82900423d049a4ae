use std::net::SocketAddr;

// ── RED metrics (request-driven) ────────────────────────────────

/// Counter: total API requests. Labels: route, status.
pub const REQUESTS_TOTAL: &str = "seatd_requests_total";

/// Histogram: request latency in seconds. Labels: route.
pub const REQUEST_DURATION_SECONDS: &str = "seatd_request_duration_seconds";

// ── Domain metrics ──────────────────────────────────────────────

/// Counter: reservations admitted.
pub const RESERVATIONS_CREATED_TOTAL: &str = "seatd_reservations_created_total";

/// Counter: reservations refused. Labels: reason.
pub const ADMISSIONS_REJECTED_TOTAL: &str = "seatd_admissions_rejected_total";

/// Gauge: tables in the floor plan.
pub const TABLES_LOADED: &str = "seatd_tables_loaded";

/// Histogram: WAL append + fsync duration in seconds.
pub const WAL_APPEND_DURATION_SECONDS: &str = "seatd_wal_append_duration_seconds";

/// Install Prometheus metrics exporter on the given port. No-op if port is None.
pub fn init(port: Option<u16>) -> Result<(), Box<dyn std::error::Error>> {
    let Some(port) = port else { return Ok(()) };
    let addr: SocketAddr = ([0, 0, 0, 0], port).into();
    metrics_exporter_prometheus::PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()?;
    tracing::info!("metrics endpoint: http://0.0.0.0:{port}/metrics");
    Ok(())
}
