//! Input metrics model and translated output series.
//!
//! The input side mirrors the OTLP hierarchy (resource → scope → metric →
//! datapoints) with only the fields translation needs. The output side is a
//! flat list of [`OutputMetric`] values ready for post-processing.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Ordered string map used for datapoint labels and resource attributes.
///
/// Iteration follows insertion order. Inserting an existing key replaces its
/// value without moving it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Labels(Vec<(String, String)>);

impl Labels {
    /// Creates an empty label set
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Inserts a label, replacing the value of an existing key
    pub fn insert<K: Into<String>, V: Into<String>>(&mut self, key: K, value: V) {
        let key = key.into();
        let value = value.into();
        match self.0.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.0.push((key, value)),
        }
    }

    /// Builder-style insert
    pub fn with<K: Into<String>, V: Into<String>>(mut self, key: K, value: V) -> Self {
        self.insert(key, value);
        self
    }

    /// Returns the value for a key
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.iter().find(|(k, _)| k == key).map(|(_, v)| v.as_str())
    }

    /// Iterates over `(key, value)` pairs in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Number of labels
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if there are no labels
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Labels {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut labels = Labels::new();
        for (k, v) in iter {
            labels.insert(k, v);
        }
        labels
    }
}

/// Numeric value of a gauge or sum datapoint
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum NumberValue {
    /// Integer value
    Int(i64),
    /// Floating-point value
    Double(f64),
}

impl NumberValue {
    /// Value widened to `f64`
    pub fn as_f64(self) -> f64 {
        match self {
            NumberValue::Int(v) => v as f64,
            NumberValue::Double(v) => v,
        }
    }

    /// Difference `self - earlier`.
    ///
    /// Two integers are subtracted before widening so large counters keep
    /// their precision.
    pub fn delta(self, earlier: NumberValue) -> f64 {
        match (self, earlier) {
            (NumberValue::Int(now), NumberValue::Int(then)) => {
                (i128::from(now) - i128::from(then)) as f64
            },
            (now, then) => now.as_f64() - then.as_f64(),
        }
    }
}

impl From<i64> for NumberValue {
    fn from(v: i64) -> Self {
        NumberValue::Int(v)
    }
}

impl From<f64> for NumberValue {
    fn from(v: f64) -> Self {
        NumberValue::Double(v)
    }
}

/// Single gauge or sum observation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NumberDataPoint {
    /// Observation time in nanoseconds since the Unix epoch
    pub timestamp: u64,
    /// Observed value
    pub value: NumberValue,
    /// Point labels
    pub labels: Labels,
}

impl NumberDataPoint {
    /// Creates a point without labels
    pub fn new<V: Into<NumberValue>>(timestamp: u64, value: V) -> Self {
        Self {
            timestamp,
            value: value.into(),
            labels: Labels::new(),
        }
    }

    /// Attaches labels
    pub fn with_labels(mut self, labels: Labels) -> Self {
        self.labels = labels;
        self
    }
}

/// Histogram observation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistogramDataPoint {
    /// Observation time in nanoseconds since the Unix epoch
    pub timestamp: u64,
    /// Number of values in the population
    pub count: u64,
    /// Sum of values in the population
    pub sum: f64,
    /// Per-bucket counts, in bucket order
    pub bucket_counts: Vec<u64>,
    /// Bucket upper bounds. Accepted but never forwarded.
    pub explicit_bounds: Vec<f64>,
    /// Point labels
    pub labels: Labels,
}

impl HistogramDataPoint {
    /// Creates a histogram point without buckets or labels
    pub fn new(timestamp: u64, count: u64, sum: f64) -> Self {
        Self {
            timestamp,
            count,
            sum,
            bucket_counts: Vec::new(),
            explicit_bounds: Vec::new(),
            labels: Labels::new(),
        }
    }

    /// Sets bucket counts
    pub fn with_buckets(mut self, bucket_counts: Vec<u64>) -> Self {
        self.bucket_counts = bucket_counts;
        self
    }

    /// Attaches labels
    pub fn with_labels(mut self, labels: Labels) -> Self {
        self.labels = labels;
        self
    }
}

/// Aggregation temporality of a sum
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Temporality {
    /// Not set by the producer
    Unspecified,
    /// Each value is the increment since the previous report
    Delta,
    /// Each value is the running total since counter start
    Cumulative,
}

/// Gauge metric payload
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Gauge {
    /// Datapoints in arrival order
    pub points: Vec<NumberDataPoint>,
}

/// Sum metric payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sum {
    /// Aggregation temporality
    pub temporality: Temporality,
    /// Whether the sum only ever increases
    pub is_monotonic: bool,
    /// Datapoints in arrival order
    pub points: Vec<NumberDataPoint>,
}

impl Sum {
    /// True for monotonic sums reported with cumulative temporality
    pub fn is_cumulative_monotonic(&self) -> bool {
        self.is_monotonic && self.temporality == Temporality::Cumulative
    }
}

/// Histogram metric payload
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Histogram {
    /// Datapoints in arrival order
    pub points: Vec<HistogramDataPoint>,
}

/// Closed set of metric kinds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum MetricData {
    /// No data type set
    Empty,
    /// Point-in-time values
    Gauge(Gauge),
    /// Sums with temporality and monotonicity
    Sum(Sum),
    /// Count/sum/bucket aggregates
    Histogram(Histogram),
    /// Kind known to OTLP but not translated
    Unsupported {
        /// OTLP kind name
        kind: String,
        /// Datapoints carried by the metric
        data_points: usize,
    },
}

impl MetricData {
    /// Short kind name for logging
    pub fn kind_name(&self) -> &str {
        match self {
            MetricData::Empty => "empty",
            MetricData::Gauge(_) => "gauge",
            MetricData::Sum(_) => "sum",
            MetricData::Histogram(_) => "histogram",
            MetricData::Unsupported { kind, .. } => kind,
        }
    }
}

/// Named metric
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metric {
    /// Metric name
    pub name: String,
    /// Kind-specific payload
    pub data: MetricData,
}

impl Metric {
    /// Creates a metric
    pub fn new<S: Into<String>>(name: S, data: MetricData) -> Self {
        Self {
            name: name.into(),
            data,
        }
    }

    /// Gauge metric from points
    pub fn gauge<S: Into<String>>(name: S, points: Vec<NumberDataPoint>) -> Self {
        Self::new(name, MetricData::Gauge(Gauge { points }))
    }

    /// Sum metric from points
    pub fn sum<S: Into<String>>(
        name: S,
        temporality: Temporality,
        is_monotonic: bool,
        points: Vec<NumberDataPoint>,
    ) -> Self {
        Self::new(
            name,
            MetricData::Sum(Sum {
                temporality,
                is_monotonic,
                points,
            }),
        )
    }

    /// Histogram metric from points
    pub fn histogram<S: Into<String>>(name: S, points: Vec<HistogramDataPoint>) -> Self {
        Self::new(name, MetricData::Histogram(Histogram { points }))
    }
}

/// Instrumentation scope and its metrics
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScopeMetrics {
    /// Scope name
    pub name: String,
    /// Scope version
    pub version: String,
    /// Metrics produced by the scope
    pub metrics: Vec<Metric>,
}

/// Resource description
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Resource {
    /// Resource attributes
    pub attributes: Labels,
}

/// Metrics produced by one resource
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResourceMetrics {
    /// The producing resource
    pub resource: Resource,
    /// Metrics grouped by scope
    pub scope_metrics: Vec<ScopeMetrics>,
}

impl ResourceMetrics {
    /// Single-scope resource metrics
    pub fn new(attributes: Labels, metrics: Vec<Metric>) -> Self {
        Self {
            resource: Resource { attributes },
            scope_metrics: vec![ScopeMetrics {
                metrics,
                ..ScopeMetrics::default()
            }],
        }
    }
}

/// Output series kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricKind {
    /// Point-in-time value
    Gauge,
    /// Per-second rate
    Rate,
}

impl fmt::Display for MetricKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetricKind::Gauge => write!(f, "gauge"),
            MetricKind::Rate => write!(f, "rate"),
        }
    }
}

/// One translated series point
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputMetric {
    /// Series name
    pub name: String,
    /// Point time in nanoseconds since the Unix epoch
    pub timestamp: u64,
    /// Point value
    pub value: f64,
    /// `key:value` tags
    pub tags: Vec<String>,
    /// Series kind
    pub kind: MetricKind,
    /// Host the series is attributed to
    pub host: Option<String>,
}

impl OutputMetric {
    /// Creates a gauge point
    pub fn gauge<S: Into<String>>(name: S, timestamp: u64, value: f64, tags: Vec<String>) -> Self {
        Self {
            name: name.into(),
            timestamp,
            value,
            tags,
            kind: MetricKind::Gauge,
            host: None,
        }
    }

    /// Creates a rate point
    pub fn rate<S: Into<String>>(name: S, timestamp: u64, value: f64, tags: Vec<String>) -> Self {
        Self {
            kind: MetricKind::Rate,
            ..Self::gauge(name, timestamp, value, tags)
        }
    }

    /// Sets the host
    pub fn set_host<S: Into<String>>(&mut self, host: S) {
        self.host = Some(host.into());
    }
}
