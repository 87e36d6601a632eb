//! Thread-safe gauge collector with Prometheus exposition rendering.

use std::collections::{BTreeMap, HashMap};
use std::io::Write;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::trace;

use crate::translate::{Metric, Observation};

/// A unique identifier for a metric time series.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SeriesKey {
    pub metric: Metric,
    /// Sorted label key-value pairs.
    pub labels: Vec<(String, String)>,
}

impl SeriesKey {
    fn from_observation(observation: &Observation) -> Self {
        let mut labels = observation.labels.clone();
        labels.sort_by(|a, b| a.0.cmp(&b.0));

        Self {
            metric: observation.metric,
            labels,
        }
    }

    /// Format labels for Prometheus exposition format.
    fn format_labels(&self) -> String {
        if self.labels.is_empty() {
            return String::new();
        }

        let parts: Vec<String> = self
            .labels
            .iter()
            .map(|(k, v)| format!("{}=\"{}\"", k, escape_label_value(v)))
            .collect();

        format!("{{{}}}", parts.join(","))
    }
}

/// Collector statistics.
#[derive(Debug, Clone, Default)]
pub struct CollectorStats {
    /// Total observations recorded since startup.
    pub observations_recorded: u64,
}

/// Gauge store shared between the poller and the HTTP server.
///
/// Recording an observation for an existing (metric, label-set) pair
/// replaces the previous value. Reads and writes are serialized
/// internally; callers never lock.
pub struct MetricCollector {
    metrics: RwLock<HashMap<SeriesKey, f64>>,
    stats: RwLock<CollectorStats>,
}

impl MetricCollector {
    pub fn new() -> Self {
        Self {
            metrics: RwLock::new(HashMap::new()),
            stats: RwLock::new(CollectorStats::default()),
        }
    }

    /// Record an observation, overwriting any previous value for the
    /// same series.
    pub fn record(&self, observation: &Observation) {
        let key = SeriesKey::from_observation(observation);
        trace!(
            metric = key.metric.name(),
            value = observation.value,
            "recording observation"
        );

        self.metrics.write().insert(key, observation.value);
        self.stats.write().observations_recorded += 1;
    }

    /// Get the current number of stored series.
    pub fn series_count(&self) -> usize {
        self.metrics.read().len()
    }

    /// Get collector statistics.
    pub fn stats(&self) -> CollectorStats {
        self.stats.read().clone()
    }

    /// Render all series in Prometheus text exposition format.
    pub fn render(&self) -> String {
        let metrics = self.metrics.read();
        let mut output = Vec::with_capacity(metrics.len() * 100);

        // Group by metric name; BTreeMap keeps the output ordering stable.
        let mut by_name: BTreeMap<&'static str, Vec<(&SeriesKey, f64)>> = BTreeMap::new();
        for (key, value) in metrics.iter() {
            by_name.entry(key.metric.name()).or_default().push((key, *value));
        }

        for (name, mut series) in by_name {
            series.sort_by(|a, b| a.0.labels.cmp(&b.0.labels));

            writeln!(output, "# HELP {} {}", name, series[0].0.metric.help()).ok();
            writeln!(output, "# TYPE {} gauge", name).ok();

            for (key, value) in series {
                writeln!(output, "{}{} {}", name, key.format_labels(), format_value(value)).ok();
            }
        }

        // Exporter self-metrics.
        let stats = self.stats.read();
        writeln!(output, "# TYPE hue_exporter_series gauge").ok();
        writeln!(output, "hue_exporter_series {}", metrics.len()).ok();
        writeln!(output, "# TYPE hue_exporter_observations_total counter").ok();
        writeln!(
            output,
            "hue_exporter_observations_total {}",
            stats.observations_recorded
        )
        .ok();

        String::from_utf8(output).unwrap_or_default()
    }
}

impl Default for MetricCollector {
    fn default() -> Self {
        Self::new()
    }
}

/// Create a shareable collector handle.
pub type SharedCollector = Arc<MetricCollector>;

/// Escape special characters in label values.
fn escape_label_value(value: &str) -> String {
    let mut result = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => result.push_str("\\\\"),
            '"' => result.push_str("\\\""),
            '\n' => result.push_str("\\n"),
            _ => result.push(c),
        }
    }
    result
}

/// Format a floating point value for Prometheus.
fn format_value(value: f64) -> String {
    if value.is_nan() {
        "NaN".to_string()
    } else if value.is_infinite() {
        if value.is_sign_positive() {
            "+Inf".to_string()
        } else {
            "-Inf".to_string()
        }
    } else if value.fract() == 0.0 {
        format!("{:.0}", value)
    } else {
        format!("{}", value)
    }
}
