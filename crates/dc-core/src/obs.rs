// obs.rs — Observability context threaded explicitly through the pipeline.
//
// Spec §9 ("Global singletons → explicit context struct"): rather than a
// global metrics registry or tracer provider, callers construct one
// `ObsCtx` and pass it down. Metrics recording is a trait so the
// Prometheus-backed implementation is only pulled in behind the `metrics`
// feature (spec §9 "Optional dependencies → feature-gated ... never call
// through a nullable handle without a guard") — `NoopMetrics` is always
// available and is the default.

use std::sync::Arc;

/// Counters and histograms named in the observability contract (spec
/// §6.5). Implementations must never panic — a metrics backend going down
/// must not take the pipeline down with it.
pub trait Metrics: Send + Sync {
    fn targets_processed(&self, pipeline: &str, status: &str);
    fn files_downloaded(&self, pipeline: &str, strategy: &str);
    fn bytes_downloaded(&self, pipeline: &str, bytes: u64);
    fn errors(&self, pipeline: &str, error_type: &str);
    fn download_duration(&self, pipeline: &str, strategy: &str, seconds: f64);
    fn pipeline_active(&self, pipeline: &str, active: i64);
}

/// Default no-op implementation — used whenever the `metrics` feature is
/// not compiled in, or no exporter is configured.
#[derive(Default, Clone, Copy)]
pub struct NoopMetrics;

impl Metrics for NoopMetrics {
    fn targets_processed(&self, _pipeline: &str, _status: &str) {}
    fn files_downloaded(&self, _pipeline: &str, _strategy: &str) {}
    fn bytes_downloaded(&self, _pipeline: &str, _bytes: u64) {}
    fn errors(&self, _pipeline: &str, _error_type: &str) {}
    fn download_duration(&self, _pipeline: &str, _strategy: &str, _seconds: f64) {}
    fn pipeline_active(&self, _pipeline: &str, _active: i64) {}
}

#[cfg(feature = "metrics")]
pub mod prometheus_metrics {
    use super::Metrics;
    use prometheus::{CounterVec, HistogramVec, IntGauge, Opts, Registry};

    /// Prometheus-backed implementation of the metric contract in spec
    /// §6.5. Bound to `:9090` by the CLI when `DC_METRICS_SERVER=1`.
    pub struct PrometheusMetrics {
        registry: Registry,
        targets_processed: CounterVec,
        files_downloaded: CounterVec,
        bytes_downloaded: CounterVec,
        errors: CounterVec,
        download_duration: HistogramVec,
        pipeline_active: IntGauge,
    }

    impl PrometheusMetrics {
        pub fn new() -> prometheus::Result<Self> {
            let registry = Registry::new();
            let targets_processed = CounterVec::new(
                Opts::new("dc_targets_processed_total", "targets processed"),
                &["pipeline", "status"],
            )?;
            let files_downloaded = CounterVec::new(
                Opts::new("dc_files_downloaded_total", "files downloaded"),
                &["pipeline", "strategy"],
            )?;
            let bytes_downloaded = CounterVec::new(
                Opts::new("dc_bytes_downloaded_total", "bytes downloaded"),
                &["pipeline"],
            )?;
            let errors = CounterVec::new(Opts::new("dc_errors_total", "errors"), &["pipeline", "error_type"])?;
            let download_duration = HistogramVec::new(
                prometheus::HistogramOpts::new("dc_download_duration_seconds", "download duration"),
                &["pipeline", "strategy"],
            )?;
            let pipeline_active = IntGauge::new("dc_pipeline_active", "active pipeline runs")?;

            registry.register(Box::new(targets_processed.clone()))?;
            registry.register(Box::new(files_downloaded.clone()))?;
            registry.register(Box::new(bytes_downloaded.clone()))?;
            registry.register(Box::new(errors.clone()))?;
            registry.register(Box::new(download_duration.clone()))?;
            registry.register(Box::new(pipeline_active.clone()))?;

            Ok(Self {
                registry,
                targets_processed,
                files_downloaded,
                bytes_downloaded,
                errors,
                download_duration,
                pipeline_active,
            })
        }

        pub fn registry(&self) -> &Registry {
            &self.registry
        }
    }

    impl Metrics for PrometheusMetrics {
        fn targets_processed(&self, pipeline: &str, status: &str) {
            self.targets_processed.with_label_values(&[pipeline, status]).inc();
        }
        fn files_downloaded(&self, pipeline: &str, strategy: &str) {
            self.files_downloaded.with_label_values(&[pipeline, strategy]).inc();
        }
        fn bytes_downloaded(&self, pipeline: &str, bytes: u64) {
            self.bytes_downloaded.with_label_values(&[pipeline]).inc_by(bytes as f64);
        }
        fn errors(&self, pipeline: &str, error_type: &str) {
            self.errors.with_label_values(&[pipeline, error_type]).inc();
        }
        fn download_duration(&self, pipeline: &str, strategy: &str, seconds: f64) {
            self.download_duration.with_label_values(&[pipeline, strategy]).observe(seconds);
        }
        fn pipeline_active(&self, _pipeline: &str, active: i64) {
            self.pipeline_active.set(active);
        }
    }
}

/// Observability context threaded explicitly through the pipeline (spec
/// §9). Tests construct a fresh one with `ObsCtx::noop()`.
#[derive(Clone)]
pub struct ObsCtx {
    pub pipeline: String,
    metrics: Arc<dyn Metrics>,
}

impl ObsCtx {
    pub fn new(pipeline: impl Into<String>, metrics: Arc<dyn Metrics>) -> Self {
        Self {
            pipeline: pipeline.into(),
            metrics,
        }
    }

    pub fn noop(pipeline: impl Into<String>) -> Self {
        Self::new(pipeline, Arc::new(NoopMetrics))
    }

    pub fn metrics(&self) -> &dyn Metrics {
        self.metrics.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn noop_metrics_never_panics() {
        let ctx = ObsCtx::noop("classifier");
        ctx.metrics().targets_processed("classifier", "ok");
        ctx.metrics().files_downloaded("acquire", "http");
        ctx.metrics().bytes_downloaded("acquire", 1024);
        ctx.metrics().errors("acquire", "blocked_url");
        ctx.metrics().download_duration("acquire", "http", 0.5);
        ctx.metrics().pipeline_active("acquire", 1);
    }
}
