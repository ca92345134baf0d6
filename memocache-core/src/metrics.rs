use std::time::Duration;

use crate::error::Result;
use crate::stats::StatsSnapshot;

/// Outcome of a single cache operation, passed to [`MetricsExporter::record_cache_operation`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CacheOperation {
    Hit,
    Miss,
    Set,
    Delete,
    Eviction,
}

/// Contract for a metrics backend (Prometheus, OpenTelemetry, and similar).
/// This crate ships no concrete exporter — only the trait a caller's own
/// adapter implements and hands to a [`crate::cache::Cache`] via
/// [`crate::cache::CacheBuilder::metrics`]. Every method returns a failure
/// indicator the cache logs (via `tracing::warn`) and otherwise ignores, per
/// the external-interfaces contract: a broken metrics backend must never
/// affect cache correctness.
pub trait MetricsExporter: Send + Sync {
    fn export_stats(&self, snapshot: &StatsSnapshot, labels: &[(&str, &str)]) -> Result<()>;
    fn record_cache_operation(
        &self,
        op: CacheOperation,
        duration: Duration,
        labels: &[(&str, &str)],
    ) -> Result<()>;
    fn increment_counter(&self, name: &str, labels: &[(&str, &str)]) -> Result<()>;
    fn record_histogram(&self, name: &str, value: f64, labels: &[(&str, &str)]) -> Result<()>;
    fn set_gauge(&self, name: &str, value: f64, labels: &[(&str, &str)]) -> Result<()>;
    fn close(&self) -> Result<()>;
}
