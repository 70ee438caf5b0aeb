//! Prometheus metrics for bundle and transaction submission

use prometheus::{Encoder, Histogram, HistogramOpts, IntCounter, IntCounterVec, Opts, Registry, TextEncoder};
use std::time::Instant;

pub struct Metrics {
    registry: Registry,

    pub bundles_submitted: IntCounter,
    pub bundles_confirmed: IntCounter,
    pub bundles_failed: IntCounter,
    /// Bundle verdicts labelled by the signal that settled them
    pub bundle_outcomes: IntCounterVec,
    pub transactions_sent: IntCounter,
    pub transactions_confirmed: IntCounter,

    pub bundle_confirm_latency: Histogram,
    pub transaction_confirm_latency: Histogram,
}

impl Metrics {
    pub fn new() -> anyhow::Result<Self> {
        let registry = Registry::new();

        let bundles_submitted = IntCounter::with_opts(Opts::new(
            "bundles_submitted_total",
            "Bundles handed to the block engine",
        ))?;
        let bundles_confirmed = IntCounter::with_opts(Opts::new(
            "bundles_confirmed_total",
            "Bundles reported as landed",
        ))?;
        let bundles_failed = IntCounter::with_opts(Opts::new(
            "bundles_failed_total",
            "Bundles that were not confirmed",
        ))?;
        let bundle_outcomes = IntCounterVec::new(
            Opts::new("bundle_outcomes_total", "Bundle verdicts by source"),
            &["outcome"],
        )?;
        let transactions_sent = IntCounter::with_opts(Opts::new(
            "transactions_sent_total",
            "Standalone transactions sent to the ledger",
        ))?;
        let transactions_confirmed = IntCounter::with_opts(Opts::new(
            "transactions_confirmed_total",
            "Standalone transactions confirmed",
        ))?;

        let bundle_confirm_latency = Histogram::with_opts(
            HistogramOpts::new("bundle_confirm_latency_seconds", "Time to a bundle verdict")
                .buckets(vec![0.5, 1.0, 2.0, 4.0, 6.0, 10.0, 15.0, 20.0]),
        )?;
        let transaction_confirm_latency = Histogram::with_opts(
            HistogramOpts::new(
                "transaction_confirm_latency_seconds",
                "Send-to-confirm latency of standalone transactions",
            )
            .buckets(vec![0.5, 1.0, 2.0, 5.0, 10.0, 30.0, 60.0, 90.0]),
        )?;

        registry.register(Box::new(bundles_submitted.clone()))?;
        registry.register(Box::new(bundles_confirmed.clone()))?;
        registry.register(Box::new(bundles_failed.clone()))?;
        registry.register(Box::new(bundle_outcomes.clone()))?;
        registry.register(Box::new(transactions_sent.clone()))?;
        registry.register(Box::new(transactions_confirmed.clone()))?;
        registry.register(Box::new(bundle_confirm_latency.clone()))?;
        registry.register(Box::new(transaction_confirm_latency.clone()))?;

        Ok(Self {
            registry,
            bundles_submitted,
            bundles_confirmed,
            bundles_failed,
            bundle_outcomes,
            transactions_sent,
            transactions_confirmed,
            bundle_confirm_latency,
            transaction_confirm_latency,
        })
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Prometheus text exposition of every registered metric
    pub fn snapshot(&self) -> String {
        let mut buffer = Vec::new();
        if let Err(e) = TextEncoder::new().encode(&self.registry.gather(), &mut buffer) {
            tracing::debug!(error = %e, "Failed to encode metrics");
        }
        String::from_utf8_lossy(&buffer).into_owned()
    }
}

/// Global metrics instance, `None` if registration failed
pub fn metrics() -> Option<&'static Metrics> {
    static METRICS: once_cell::sync::Lazy<Option<Metrics>> = once_cell::sync::Lazy::new(|| {
        Metrics::new()
            .map_err(|e| tracing::warn!(error = %e, "Metrics disabled"))
            .ok()
    });
    METRICS.as_ref()
}

/// Measures an operation and records into a histogram on finish
pub struct Timer {
    start: Instant,
}

impl Timer {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    pub fn elapsed_secs(&self) -> f64 {
        self.start.elapsed().as_secs_f64()
    }

    pub fn observe_duration(&self, histogram: &Histogram) {
        histogram.observe(self.elapsed_secs());
    }
}

impl Default for Timer {
    fn default() -> Self {
        Self::new()
    }
}
