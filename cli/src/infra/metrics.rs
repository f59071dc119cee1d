//! Restart counter exported on `/metrics`.
//!
//! One `Family<RestartLabels, Counter>` registered as `cs_monitor_restarts`;
//! the OpenMetrics text encoder appends `_total`. The registry is built once
//! per monitor run and shared by cloning.

use std::sync::Arc;

use prometheus_client::encoding::EncodeLabelSet;
use prometheus_client::encoding::text::encode;
use prometheus_client::metrics::counter::Counter;
use prometheus_client::metrics::family::Family;
use prometheus_client::registry::Registry;

use crate::application::ports::RestartRecorder;
use crate::domain::monitor::{ALIVE_LABEL, RESTARTS_METRIC};

/// Label set for the restart counter.
#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct RestartLabels {
    /// Exit code of the finished run, or empty for the startup sentinel.
    pub return_code: String,
}

/// Thread-safe restart counter and its exposition registry.
#[derive(Clone)]
pub struct MetricsRegistry {
    registry: Arc<Registry>,
    restarts: Family<RestartLabels, Counter>,
}

impl std::fmt::Debug for MetricsRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MetricsRegistry").finish_non_exhaustive()
    }
}

impl Default for MetricsRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl MetricsRegistry {
    /// Create the registry with the empty-label entry already at `1`.
    #[must_use]
    pub fn new() -> Self {
        let mut registry = Registry::default();
        let restarts = Family::<RestartLabels, Counter>::default();
        registry.register(
            RESTARTS_METRIC,
            "Number of times the monitored command exited, by return code",
            restarts.clone(),
        );
        restarts
            .get_or_create(&RestartLabels {
                return_code: ALIVE_LABEL.to_string(),
            })
            .inc();

        Self {
            registry: Arc::new(registry),
            restarts,
        }
    }

    /// Current count for `exit_code_label`, `0` if never recorded.
    ///
    /// Read from the exposition text; looking up a label never adds a series.
    #[must_use]
    pub fn restarts(&self, exit_code_label: &str) -> u64 {
        let prefix = format!("{RESTARTS_METRIC}_total{{return_code=\"{exit_code_label}\"}} ");
        self.encode()
            .lines()
            .find_map(|line| line.strip_prefix(prefix.as_str()))
            .and_then(|value| value.trim().parse().ok())
            .unwrap_or(0)
    }

    /// Encode all metrics in the text exposition format.
    #[must_use]
    pub fn encode(&self) -> String {
        let mut buffer = String::new();
        if encode(&mut buffer, &self.registry).is_err() {
            tracing::error!("failed to encode metrics");
            return String::new();
        }
        buffer
    }

    /// Content-Type for [`MetricsRegistry::encode`] output.
    #[must_use]
    pub const fn content_type() -> &'static str {
        "application/openmetrics-text; version=1.0.0; charset=utf-8"
    }
}

impl RestartRecorder for MetricsRegistry {
    fn increment_restart(&self, exit_code_label: &str) {
        self.restarts
            .get_or_create(&RestartLabels {
                return_code: exit_code_label.to_string(),
            })
            .inc();
    }
}
