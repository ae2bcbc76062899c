//! Prometheus-backed metrics registry and snapshot helpers.
//!
//! # Design
//! - Encapsulates collector registration to keep the public API small.
//! - Exposes counters for the bus methods (`get`/`set`/`delete`/`reset`/...)
//!   and the notification engine, plus gauges for the readers-writer
//!   discipline's queue depth.

use std::convert::TryFrom;
use std::time::Duration;

use anyhow::{Context, Result};
use prometheus::{Encoder, IntCounter, IntCounterVec, IntGauge, Opts, Registry, TextEncoder};
use serde::Serialize;

/// Prometheus-backed metrics registry shared across services.
#[derive(Clone)]
pub struct Metrics {
    inner: std::sync::Arc<MetricsInner>,
}

struct MetricsInner {
    registry: Registry,
    http_requests_total: IntCounterVec,
    bus_requests_total: IntCounterVec,
    events_emitted_total: IntCounterVec,
    value_check_failures_total: IntCounterVec,
    volatile_writes_total: IntCounter,
    pending_writers: IntGauge,
    active_readers: IntGauge,
    description_reload_latency_ms: IntGauge,
    description_reload_failures_total: IntCounter,
    app_uninstall_purges_total: IntCounter,
}

/// Snapshot of selected gauges and counters for health reporting.
#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    /// Writers currently queued behind the readers-writer gate.
    pub pending_writers: i64,
    /// Readers currently holding the readers-writer gate.
    pub active_readers: i64,
    /// Latest latency (ms) spent reloading the description catalogue.
    pub description_reload_latency_ms: i64,
    /// Total description reload failures observed.
    pub description_reload_failures_total: u64,
    /// Total volatile-kind writes served without touching the document store.
    pub volatile_writes_total: u64,
    /// Total app-uninstall purges handled.
    pub app_uninstall_purges_total: u64,
}

impl Metrics {
    /// Construct a new metrics registry with the standard collectors registered.
    ///
    /// # Errors
    ///
    /// Returns an error if any of the Prometheus collectors cannot be
    /// registered.
    pub fn new() -> Result<Self> {
        let registry = Registry::new();

        let http_requests_total = IntCounterVec::new(
            Opts::new("http_requests_total", "Total HTTP requests received"),
            &["route", "code"],
        )?;
        let bus_requests_total = IntCounterVec::new(
            Opts::new("bus_requests_total", "Settings bus requests by method and outcome"),
            &["method", "outcome"],
        )?;
        let events_emitted_total = IntCounterVec::new(
            Opts::new("events_emitted_total", "Subscription notifications emitted by phase"),
            &["phase"],
        )?;
        let value_check_failures_total = IntCounterVec::new(
            Opts::new("value_check_failures_total", "Value-check rejections by reason"),
            &["reason"],
        )?;
        let volatile_writes_total = IntCounter::with_opts(Opts::new(
            "volatile_writes_total",
            "Writes served entirely from the in-memory volatile map",
        ))?;
        let pending_writers = IntGauge::with_opts(Opts::new(
            "pending_writers",
            "Writers currently queued behind the readers-writer gate",
        ))?;
        let active_readers = IntGauge::with_opts(Opts::new(
            "active_readers",
            "Readers currently holding the readers-writer gate",
        ))?;
        let description_reload_latency_ms = IntGauge::with_opts(Opts::new(
            "description_reload_latency_ms",
            "Time taken to reload the description catalogue (ms)",
        ))?;
        let description_reload_failures_total = IntCounter::with_opts(Opts::new(
            "description_reload_failures_total",
            "Description catalogue reload failures",
        ))?;
        let app_uninstall_purges_total = IntCounter::with_opts(Opts::new(
            "app_uninstall_purges_total",
            "Per-app settings and description purges handled on uninstall",
        ))?;

        registry.register(Box::new(http_requests_total.clone()))?;
        registry.register(Box::new(bus_requests_total.clone()))?;
        registry.register(Box::new(events_emitted_total.clone()))?;
        registry.register(Box::new(value_check_failures_total.clone()))?;
        registry.register(Box::new(volatile_writes_total.clone()))?;
        registry.register(Box::new(pending_writers.clone()))?;
        registry.register(Box::new(active_readers.clone()))?;
        registry.register(Box::new(description_reload_latency_ms.clone()))?;
        registry.register(Box::new(description_reload_failures_total.clone()))?;
        registry.register(Box::new(app_uninstall_purges_total.clone()))?;

        Ok(Self {
            inner: std::sync::Arc::new(MetricsInner {
                registry,
                http_requests_total,
                bus_requests_total,
                events_emitted_total,
                value_check_failures_total,
                volatile_writes_total,
                pending_writers,
                active_readers,
                description_reload_latency_ms,
                description_reload_failures_total,
                app_uninstall_purges_total,
            }),
        })
    }

    /// Increment the HTTP request counter for the given route and status code.
    pub fn inc_http_request(&self, route: &str, status: u16) {
        self.inner
            .http_requests_total
            .with_label_values(&[route, &status.to_string()])
            .inc();
    }

    /// Increment the bus request counter for a method and outcome (`ok` or an error kind).
    pub fn inc_bus_request(&self, method: &str, outcome: &str) {
        self.inner.bus_requests_total.with_label_values(&[method, outcome]).inc();
    }

    /// Increment the notification counter for a delivery phase (`early` or `late`).
    pub fn inc_event(&self, phase: &str) {
        self.inner.events_emitted_total.with_label_values(&[phase]).inc();
    }

    /// Increment the value-check failure counter for a rejection reason.
    pub fn inc_value_check_failure(&self, reason: &str) {
        self.inner.value_check_failures_total.with_label_values(&[reason]).inc();
    }

    /// Increment the volatile-write counter.
    pub fn inc_volatile_write(&self) {
        self.inner.volatile_writes_total.inc();
    }

    /// Set the gauge tracking writers queued behind the readers-writer gate.
    pub fn set_pending_writers(&self, count: i64) {
        self.inner.pending_writers.set(count);
    }

    /// Set the gauge tracking readers currently holding the readers-writer gate.
    pub fn set_active_readers(&self, count: i64) {
        self.inner.active_readers.set(count);
    }

    /// Record the observed latency for reloading the description catalogue.
    pub fn observe_description_reload_latency(&self, duration: Duration) {
        self.inner.description_reload_latency_ms.set(Self::duration_to_ms(duration));
    }

    /// Increment the description reload failure counter.
    pub fn inc_description_reload_failure(&self) {
        self.inner.description_reload_failures_total.inc();
    }

    /// Increment the app-uninstall purge counter.
    pub fn inc_app_uninstall_purge(&self) {
        self.inner.app_uninstall_purges_total.inc();
    }

    /// Render the metrics registry using the Prometheus text exposition format.
    ///
    /// # Errors
    ///
    /// Returns an error if the metrics cannot be encoded or if the encoded
    /// buffer is not valid UTF-8.
    pub fn render(&self) -> Result<String> {
        let encoder = TextEncoder::new();
        let metric_families = self.inner.registry.gather();
        let mut buffer = Vec::new();
        encoder
            .encode(&metric_families, &mut buffer)
            .context("failed to encode Prometheus metrics")?;
        String::from_utf8(buffer).context("metrics output was not valid UTF-8")
    }

    /// Take a point-in-time snapshot of the most relevant gauges and counters.
    #[must_use]
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            pending_writers: self.inner.pending_writers.get(),
            active_readers: self.inner.active_readers.get(),
            description_reload_latency_ms: self.inner.description_reload_latency_ms.get(),
            description_reload_failures_total: self.inner.description_reload_failures_total.get(),
            volatile_writes_total: self.inner.volatile_writes_total.get(),
            app_uninstall_purges_total: self.inner.app_uninstall_purges_total.get(),
        }
    }

    /// Convert a duration to milliseconds saturating at `i64::MAX`.
    pub(crate) fn duration_to_ms(duration: Duration) -> i64 {
        i64::try_from(duration.as_millis()).unwrap_or(i64::MAX)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn duration_to_ms_saturates_on_large_values() {
        let duration = Duration::from_secs(u64::MAX / 2);
        assert_eq!(Metrics::duration_to_ms(duration), i64::MAX);
    }

    #[test]
    fn metrics_snapshot_reflects_updates() -> Result<()> {
        let metrics = Metrics::new()?;
        metrics.inc_http_request("/bus", 200);
        metrics.inc_bus_request("setSystemSettings", "ok");
        metrics.inc_event("early");
        metrics.inc_value_check_failure("range");
        metrics.inc_volatile_write();
        metrics.set_pending_writers(1);
        metrics.set_active_readers(3);
        metrics.observe_description_reload_latency(Duration::from_millis(45));
        metrics.inc_description_reload_failure();
        metrics.inc_app_uninstall_purge();

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.pending_writers, 1);
        assert_eq!(snapshot.active_readers, 3);
        assert_eq!(snapshot.description_reload_latency_ms, 45);
        assert_eq!(snapshot.description_reload_failures_total, 1);
        assert_eq!(snapshot.volatile_writes_total, 1);
        assert_eq!(snapshot.app_uninstall_purges_total, 1);

        let rendered = metrics.render()?;
        assert!(rendered.contains("bus_requests_total"));
        assert!(rendered.contains("value_check_failures_total"));
        assert!(rendered.contains("description_reload_failures_total"));
        Ok(())
    }
}
