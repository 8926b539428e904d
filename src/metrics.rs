//! Request and upstream metrics
//!
//! The macros are no-ops until a recorder is installed, so handlers record
//! unconditionally and the exporter is only started when an address is configured.

use std::net::SocketAddr;
use tracing::{info, warn};

pub const SEARCH_REQUESTS: &str = "semun_api_search_requests_total";
pub const SEARCH_ERRORS: &str = "semun_api_search_errors_total";
pub const SEARCH_DURATION: &str = "semun_api_undl_request_duration_seconds";
pub const SEARCH_RECORDS: &str = "semun_api_undl_records_returned";
pub const GRAPH_REQUESTS: &str = "semun_api_graph_requests_total";
pub const GRAPH_ERRORS: &str = "semun_api_graph_errors_total";
pub const GRAPH_DURATION: &str = "semun_api_graph_query_duration_seconds";

pub fn init_metrics(addr: &str) {
    let addr: SocketAddr = match addr.parse() {
        Ok(addr) => addr,
        Err(e) => {
            warn!("Invalid metrics addr '{}': {}; metrics exporter disabled", addr, e);
            return;
        }
    };
    let builder = metrics_exporter_prometheus::PrometheusBuilder::new().with_http_listener(addr);
    match builder.install() {
        Ok(()) => info!("Prometheus exporter listening on http://{}/metrics", addr),
        Err(e) => warn!("Prometheus exporter install failed (possibly already installed): {}", e),
    }
}

pub struct SearchMetrics;

impl SearchMetrics {
    pub fn record_success(duration_secs: f64, records: usize) {
        ::metrics::counter!(SEARCH_REQUESTS).increment(1);
        ::metrics::histogram!(SEARCH_DURATION).record(duration_secs);
        ::metrics::histogram!(SEARCH_RECORDS).record(records as f64);
    }

    pub fn record_error() {
        ::metrics::counter!(SEARCH_REQUESTS).increment(1);
        ::metrics::counter!(SEARCH_ERRORS).increment(1);
    }
}

pub struct GraphMetrics;

impl GraphMetrics {
    pub fn record_success(duration_secs: f64) {
        ::metrics::counter!(GRAPH_REQUESTS).increment(1);
        ::metrics::histogram!(GRAPH_DURATION).record(duration_secs);
    }

    pub fn record_error() {
        ::metrics::counter!(GRAPH_REQUESTS).increment(1);
        ::metrics::counter!(GRAPH_ERRORS).increment(1);
    }
}
