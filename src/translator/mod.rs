//! OTLP metrics to Datadog series translation.
//!
//! The [`Translator`] walks resource → scope → metric → datapoint and
//! dispatches each metric to the mapper for its kind:
//!
//! - gauges and non-monotonic or delta sums become gauges
//! - cumulative monotonic sums become per-second rates
//! - histograms become `.count`, `.sum` and, optionally, per-bucket gauges
//!
//! Metrics with no data type or an unsupported one are counted as dropped.
//! Translation never fails.

pub mod mapper;
pub mod rate;
pub mod tags;

pub use rate::{CounterState, RateEngine, RateOutcome};
pub use tags::{get_tags, series_key, SeriesKey, EMPTY_VALUE_PLACEHOLDER};

use crate::core::{MetricData, MetricsConfig, OutputMetric, ResourceMetrics};
use crate::host::hostname_from_attributes;

/// Flags controlling how metrics are mapped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TranslatorConfig {
    /// Report cumulative monotonic sums as rates
    pub send_monotonic: bool,
    /// Report per-bucket histogram counts
    pub buckets: bool,
}

impl Default for TranslatorConfig {
    fn default() -> Self {
        Self {
            send_monotonic: true,
            buckets: false,
        }
    }
}

impl From<&MetricsConfig> for TranslatorConfig {
    fn from(config: &MetricsConfig) -> Self {
        Self {
            send_monotonic: config.send_monotonic_counter,
            buckets: config.report_buckets,
        }
    }
}

/// Result of one translation call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Translation {
    /// Flat list of output series points
    pub series: Vec<OutputMetric>,
    /// Datapoints (or data-less metrics) that could not be translated
    pub dropped: usize,
}

/// Stateless-per-call translator with shared counter memory.
#[derive(Debug, Clone)]
pub struct Translator {
    config: TranslatorConfig,
    rates: RateEngine,
}

impl Translator {
    /// Creates a translator.
    pub fn new(config: TranslatorConfig, rates: RateEngine) -> Self {
        Self { config, rates }
    }

    /// Mapping flags in use.
    pub fn config(&self) -> TranslatorConfig {
        self.config
    }

    /// The rate engine shared across calls.
    pub fn rates(&self) -> &RateEngine {
        &self.rates
    }

    /// Translates a batch of resource metrics.
    pub fn map_metrics(&self, resource_metrics: &[ResourceMetrics]) -> Translation {
        let mut translation = Translation::default();

        for rm in resource_metrics {
            let host = hostname_from_attributes(&rm.resource.attributes);

            for scope in &rm.scope_metrics {
                for metric in &scope.metrics {
                    let mut datapoints = match &metric.data {
                        MetricData::Empty => {
                            translation.dropped += 1;
                            continue;
                        },
                        MetricData::Unsupported { kind, data_points } => {
                            tracing::debug!(
                                "Dropping {} datapoints of unsupported {} metric {}",
                                data_points,
                                kind,
                                metric.name
                            );
                            translation.dropped += data_points;
                            continue;
                        },
                        MetricData::Gauge(gauge) => {
                            mapper::map_number_metrics(&metric.name, &gauge.points)
                        },
                        MetricData::Sum(sum) => {
                            if self.config.send_monotonic && sum.is_cumulative_monotonic() {
                                mapper::map_monotonic_metrics(&metric.name, &self.rates, &sum.points)
                            } else {
                                mapper::map_number_metrics(&metric.name, &sum.points)
                            }
                        },
                        MetricData::Histogram(histogram) => mapper::map_histogram_metrics(
                            &metric.name,
                            &histogram.points,
                            self.config.buckets,
                        ),
                    };

                    if let Some(host) = host {
                        for point in &mut datapoints {
                            point.set_host(host);
                        }
                    }

                    translation.series.append(&mut datapoints);
                }
            }
        }

        tracing::debug!(
            "Translated {} resource metrics into {} series points ({} dropped)",
            resource_metrics.len(),
            translation.series.len(),
            translation.dropped
        );

        translation
    }
}
