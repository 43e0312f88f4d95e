//! Crawl and export metrics.
//!
//! The `metrics` macros are no-ops until [`init_metrics`] installs a recorder.

use std::net::SocketAddr;
use tracing::{info, warn};

/// Installs the Prometheus exporter listening on `addr`.
pub fn init_metrics(addr: &str) {
    let addr: SocketAddr = match addr.parse() {
        Ok(addr) => addr,
        Err(e) => {
            warn!("Invalid metrics address '{}': {}", addr, e);
            return;
        }
    };
    let builder = metrics_exporter_prometheus::PrometheusBuilder::new().with_http_listener(addr);
    match builder.install() {
        Ok(()) => info!("Prometheus exporter listening on http://{}/metrics", addr),
        Err(e) => warn!("Prometheus exporter install failed (possibly already installed): {}", e),
    }
}

pub struct CrawlMetrics;

impl CrawlMetrics {
    pub fn record_fetch_success(duration_secs: f64, body_bytes: usize) {
        ::metrics::counter!("olx_pages_fetched_total").increment(1);
        ::metrics::histogram!("olx_fetch_duration_seconds").record(duration_secs);
        ::metrics::histogram!("olx_page_bytes").record(body_bytes as f64);
    }

    pub fn record_fetch_error() {
        ::metrics::counter!("olx_fetch_errors_total").increment(1);
    }

    pub fn record_page(accepted: usize, dropped: usize, parse_failures: usize) {
        ::metrics::counter!("olx_ads_accepted_total").increment(accepted as u64);
        ::metrics::counter!("olx_ads_dropped_total").increment(dropped as u64);
        ::metrics::counter!("olx_ad_parse_failures_total").increment(parse_failures as u64);
    }

    pub fn record_unit_finished(terminal: &'static str) {
        ::metrics::counter!("olx_units_finished_total", "terminal" => terminal).increment(1);
    }
}

pub struct ExportMetrics;

impl ExportMetrics {
    pub fn record_flush(rows: usize, row_errors: usize) {
        ::metrics::counter!("olx_rows_exported_total").increment(rows as u64);
        ::metrics::counter!("olx_row_errors_total").increment(row_errors as u64);
    }

    pub fn record_flush_failure() {
        ::metrics::counter!("olx_export_failures_total").increment(1);
    }
}
