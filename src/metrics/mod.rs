//! Prometheus metrics for keyword lookups and jobs
//!
//! This module provides metrics tracking for:
//! - Lookups: outcome by source (api, cache, fallback), API latency
//! - Jobs: submissions, completions, jobs currently running
//!
//! # Usage
//!
//! Call `init_metrics()` at application startup to register all metrics.
//! If initialization fails, metrics operations become no-ops.

use prometheus::{
    register_counter, register_counter_vec, register_gauge, register_histogram, Counter,
    CounterVec, Encoder, Gauge, Histogram, TextEncoder,
};
use std::sync::OnceLock;

// ============================================================================
// Metrics Storage
// ============================================================================

/// Container for lookup metrics
struct LookupMetrics {
    lookups: CounterVec,
    fallbacks: CounterVec,
    api_duration: Histogram,
}

/// Container for job metrics
struct JobMetrics {
    submitted: Counter,
    completed: Counter,
    running: Gauge,
    keywords: Counter,
}

static LOOKUP_METRICS: OnceLock<LookupMetrics> = OnceLock::new();

static JOB_METRICS: OnceLock<JobMetrics> = OnceLock::new();

/// Outcome of the one registration attempt
static METRICS_INIT: OnceLock<Result<(), String>> = OnceLock::new();

// ============================================================================
// Initialization
// ============================================================================

/// Initialize all Prometheus metrics
///
/// Call once at startup. Later calls register nothing and return the
/// outcome of the first attempt.
pub fn init_metrics() -> Result<(), Box<dyn std::error::Error>> {
    METRICS_INIT
        .get_or_init(|| register_all().map_err(|e| e.to_string()))
        .clone()
        .map_err(Into::into)
}

fn register_all() -> Result<(), Box<dyn std::error::Error>> {
    let lookup = LookupMetrics {
        lookups: register_counter_vec!(
            "searchvol_lookups_total",
            "Keyword lookups by result source",
            &["source"]
        )?,
        fallbacks: register_counter_vec!(
            "searchvol_lookup_fallbacks_total",
            "Lookups that fell back to zero volume, by failure kind",
            &["kind"]
        )?,
        api_duration: register_histogram!(
            "searchvol_api_request_duration_seconds",
            "Keyword tool request duration in seconds",
            vec![0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0]
        )?,
    };

    let jobs = JobMetrics {
        submitted: register_counter!("searchvol_jobs_submitted_total", "Jobs submitted")?,
        completed: register_counter!("searchvol_jobs_completed_total", "Jobs completed")?,
        running: register_gauge!("searchvol_jobs_running", "Jobs currently running")?,
        keywords: register_counter!(
            "searchvol_job_keywords_total",
            "Keywords scheduled across all jobs"
        )?,
    };

    LOOKUP_METRICS
        .set(lookup)
        .map_err(|_| "Lookup metrics already initialized")?;
    JOB_METRICS
        .set(jobs)
        .map_err(|_| "Job metrics already initialized")?;

    tracing::info!("Prometheus metrics initialized successfully");
    Ok(())
}

/// Check if metrics have been initialized
pub fn metrics_initialized() -> bool {
    LOOKUP_METRICS.get().is_some() && JOB_METRICS.get().is_some()
}

// ============================================================================
// Helper Functions
// ============================================================================

/// Encode all metrics to Prometheus text format
pub fn encode_metrics() -> Result<String, Box<dyn std::error::Error>> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    Ok(String::from_utf8(buffer)?)
}

/// Record a lookup served from `source` (`api`, `cache` or `fallback`)
pub fn record_lookup(source: &str) {
    if let Some(m) = LOOKUP_METRICS.get() {
        m.lookups.with_label_values(&[source]).inc();
    }
}

/// Record a lookup that fell back to zero volume
pub fn record_fallback(kind: &str) {
    let Some(m) = LOOKUP_METRICS.get() else {
        return;
    };

    m.lookups.with_label_values(&["fallback"]).inc();
    m.fallbacks.with_label_values(&[kind]).inc();
}

/// Histogram timer guard that records duration on drop
pub struct MetricsTimer {
    timer: Option<prometheus::HistogramTimer>,
}

impl MetricsTimer {
    fn new(timer: prometheus::HistogramTimer) -> Self {
        Self { timer: Some(timer) }
    }

    /// Create a no-op timer when metrics are not initialized
    fn noop() -> Self {
        Self { timer: None }
    }
}

impl Drop for MetricsTimer {
    fn drop(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.stop_and_record();
        }
    }
}

/// Start timing one keyword tool request
pub fn start_api_timer() -> MetricsTimer {
    match LOOKUP_METRICS.get() {
        Some(m) => MetricsTimer::new(m.api_duration.start_timer()),
        None => MetricsTimer::noop(),
    }
}

/// Record a job submission with its keyword count
pub fn record_job_submitted(keywords: usize) {
    let Some(m) = JOB_METRICS.get() else {
        return;
    };

    m.submitted.inc();
    m.running.inc();
    m.keywords.inc_by(keywords as f64);
}

/// Record a job reaching `completed`
pub fn record_job_completed() {
    let Some(m) = JOB_METRICS.get() else {
        return;
    };

    m.completed.inc();
    m.running.dec();
}

// ============================================================================
// Tests
// ============================================================================
