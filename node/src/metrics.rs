//! Prometheus metrics for the spamdb node.
//!
//! Counters and gauges covering reports, reads and the day window, plus a
//! report latency histogram. The [`NodeMetrics`] struct owns a dedicated
//! [`Registry`] that [`NodeMetrics::encode_text`] renders into the
//! Prometheus text exposition format.

use prometheus::{
    register_histogram_with_registry, register_int_counter_with_registry,
    register_int_gauge_with_registry, Encoder, Histogram, HistogramOpts, IntCounter, IntGauge,
    Opts, Registry, TextEncoder,
};

/// Central collection of all node-level Prometheus metrics.
pub struct NodeMetrics {
    /// The Prometheus registry that owns every metric below.
    pub registry: Registry,

    // ── Counters ────────────────────────────────────────────────────────
    /// Reports written to a daily log and counted.
    pub reports_accepted: IntCounter,
    /// Reports refused for any reason, including a full log.
    pub reports_rejected: IntCounter,
    /// Reports refused because today's log was full.
    pub reports_capacity_exceeded: IntCounter,
    /// Daily logs reset for a new day.
    pub day_rotations: IntCounter,
    /// Point queries served.
    pub queries: IntCounter,
    /// Window downloads served.
    pub downloads: IntCounter,
    /// Numbers returned across all downloads.
    pub downloaded_numbers: IntCounter,

    // ── Gauges ──────────────────────────────────────────────────────────
    /// Day slots with a bound log, across all countries.
    pub provisioned_slots: IntGauge,

    // ── Histograms ──────────────────────────────────────────────────────
    /// Time spent handling one report, in microseconds.
    pub report_time_us: Histogram,
}

impl NodeMetrics {
    /// Create a fresh set of metrics, all registered under a new
    /// [`Registry`].
    pub fn new() -> Self {
        let registry = Registry::new();

        // Counters
        let reports_accepted = register_int_counter_with_registry!(
            Opts::new("spamdb_reports_accepted_total", "Total reports recorded"),
            registry
        )
        .expect("failed to register reports_accepted counter");

        let reports_rejected = register_int_counter_with_registry!(
            Opts::new("spamdb_reports_rejected_total", "Total reports refused"),
            registry
        )
        .expect("failed to register reports_rejected counter");

        let reports_capacity_exceeded = register_int_counter_with_registry!(
            Opts::new(
                "spamdb_reports_capacity_exceeded_total",
                "Total reports refused because the daily log was full"
            ),
            registry
        )
        .expect("failed to register reports_capacity_exceeded counter");

        let day_rotations = register_int_counter_with_registry!(
            Opts::new(
                "spamdb_day_rotations_total",
                "Total daily logs reset for a new day"
            ),
            registry
        )
        .expect("failed to register day_rotations counter");

        let queries = register_int_counter_with_registry!(
            Opts::new("spamdb_queries_total", "Total number queries served"),
            registry
        )
        .expect("failed to register queries counter");

        let downloads = register_int_counter_with_registry!(
            Opts::new("spamdb_downloads_total", "Total window downloads served"),
            registry
        )
        .expect("failed to register downloads counter");

        let downloaded_numbers = register_int_counter_with_registry!(
            Opts::new(
                "spamdb_downloaded_numbers_total",
                "Total numbers returned by downloads"
            ),
            registry
        )
        .expect("failed to register downloaded_numbers counter");

        // Gauges
        let provisioned_slots = register_int_gauge_with_registry!(
            Opts::new(
                "spamdb_provisioned_slots",
                "Day slots with a bound log across all countries"
            ),
            registry
        )
        .expect("failed to register provisioned_slots gauge");

        // Histograms: exponential buckets covering 1 µs → ~16 ms.
        let report_time_us = register_histogram_with_registry!(
            HistogramOpts::new(
                "spamdb_report_time_us",
                "Report handling time in microseconds"
            )
            .buckets(prometheus::exponential_buckets(1.0, 2.0, 15).unwrap()),
            registry
        )
        .expect("failed to register report_time_us histogram");

        Self {
            registry,
            reports_accepted,
            reports_rejected,
            reports_capacity_exceeded,
            day_rotations,
            queries,
            downloads,
            downloaded_numbers,
            provisioned_slots,
            report_time_us,
        }
    }

    /// Render every metric in the Prometheus text format.
    pub fn encode_text(&self) -> String {
        let mut buf = Vec::new();
        let families = self.registry.gather();
        if let Err(e) = TextEncoder::new().encode(&families, &mut buf) {
            tracing::warn!(error = %e, "failed to encode metrics");
        }
        String::from_utf8_lossy(&buf).into_owned()
    }
}

impl Default for NodeMetrics {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_show_up_in_text_output() {
        let metrics = NodeMetrics::new();
        metrics.reports_accepted.inc();
        metrics.provisioned_slots.set(60);
        let text = metrics.encode_text();
        assert!(text.contains("spamdb_reports_accepted_total 1"));
        assert!(text.contains("spamdb_provisioned_slots 60"));
    }
}
