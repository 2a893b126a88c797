//! Prometheus metrics for migration runs
//!
//! Instruments are created through an OpenTelemetry meter provider whose
//! reader exports into a private Prometheus registry; [`render`] produces the
//! text exposition format from that registry.

use once_cell::sync::Lazy;
use opentelemetry::{
    metrics::{Counter, Histogram, MeterProvider as _},
    KeyValue,
};
use opentelemetry_sdk::metrics::SdkMeterProvider;
use prometheus::{Encoder, Registry, TextEncoder};
use std::time::Duration;

pub static METRICS: Lazy<Option<MigrationMetrics>> = Lazy::new(|| match MigrationMetrics::init() {
    Ok(metrics) => Some(metrics),
    Err(e) => {
        log::warn!("migration metrics disabled: {e}");
        None
    }
});

/// Instruments recorded by the runner and the manager
pub struct MigrationMetrics {
    registry: Registry,
    // Dropping the provider would stop collection.
    _provider: SdkMeterProvider,
    pub migrations_applied: Counter<u64>,
    pub migrations_rolled_back: Counter<u64>,
    pub failures: Counter<u64>,
    pub duration: Histogram<f64>,
}

impl MigrationMetrics {
    /// # Errors
    ///
    /// Returns a description of the failure if the Prometheus exporter
    /// cannot be built.
    pub fn init() -> Result<Self, String> {
        let registry = Registry::new();
        let exporter = opentelemetry_prometheus::exporter()
            .with_registry(registry.clone())
            .build()
            .map_err(|e| format!("failed to build prometheus exporter: {e}"))?;
        let provider = SdkMeterProvider::builder().with_reader(exporter).build();
        let meter = provider.meter("driftguard");

        let migrations_applied = meter
            .u64_counter("driftguard_migrations_applied_total")
            .with_description("Migrations applied and committed")
            .build();

        let migrations_rolled_back = meter
            .u64_counter("driftguard_migrations_rolled_back_total")
            .with_description("Migrations rolled back and committed")
            .build();

        let failures = meter
            .u64_counter("driftguard_migration_failures_total")
            .with_description("Failed migration operations")
            .build();

        let duration = meter
            .f64_histogram("driftguard_migration_duration_seconds")
            .with_description("Time spent applying or rolling back a single migration")
            .with_unit("s")
            .build();

        Ok(Self {
            registry,
            _provider: provider,
            migrations_applied,
            migrations_rolled_back,
            failures,
            duration,
        })
    }

    pub fn record_applied(&self, name: &str, elapsed: Duration) {
        let attrs = [KeyValue::new("migration", name.to_string())];
        self.migrations_applied.add(1, &attrs);
        self.duration.record(
            elapsed.as_secs_f64(),
            &[attrs[0].clone(), KeyValue::new("direction", "up")],
        );
    }

    pub fn record_rolled_back(&self, name: &str, elapsed: Duration) {
        let attrs = [KeyValue::new("migration", name.to_string())];
        self.migrations_rolled_back.add(1, &attrs);
        self.duration.record(
            elapsed.as_secs_f64(),
            &[attrs[0].clone(), KeyValue::new("direction", "down")],
        );
    }

    pub fn record_failure(&self, operation: &'static str) {
        self.failures.add(1, &[KeyValue::new("operation", operation)]);
    }

    /// Prometheus text exposition of everything recorded so far
    pub fn render(&self) -> String {
        let mut buf = Vec::new();
        if let Err(e) = TextEncoder::new().encode(&self.registry.gather(), &mut buf) {
            log::warn!("failed to encode metrics: {e}");
            return String::new();
        }
        String::from_utf8_lossy(&buf).into_owned()
    }
}

/// Render the process-wide metrics, or an empty string if they are disabled
pub fn render() -> String {
    METRICS.as_ref().map(MigrationMetrics::render).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_includes_recorded_series() {
        let metrics = MigrationMetrics::init().unwrap();
        metrics.record_applied("create_users", Duration::from_millis(12));
        metrics.record_rolled_back("create_users", Duration::from_millis(3));
        metrics.record_failure("migrate");

        let text = metrics.render();
        assert!(text.contains("driftguard_migrations_applied_total"));
        assert!(text.contains("driftguard_migrations_rolled_back_total"));
        assert!(text.contains("driftguard_migration_failures_total"));
        assert!(text.contains("driftguard_migration_duration_seconds"));
        assert!(text.contains("create_users"));
    }
}
