//! Common test utilities and fixtures.

#![allow(dead_code)]

use opentelemetry_proto::tonic::{
    collector::metrics::v1::ExportMetricsServiceRequest,
    common::v1::{any_value::Value, AnyValue, KeyValue},
    metrics::v1::{
        metric::Data, number_data_point, AggregationTemporality, Gauge, Histogram,
        HistogramDataPoint, Metric, NumberDataPoint, ResourceMetrics, ScopeMetrics, Sum, Summary,
        SummaryDataPoint,
    },
    resource::v1::Resource,
};
use otlp2dd_lib::export::{ChannelSink, SeriesPayload, SeriesProcessor};
use otlp2dd_lib::host::HostResolver;
use otlp2dd_lib::receiver::MetricsPipeline;
use otlp2dd_lib::storage::TtlMap;
use otlp2dd_lib::translator::{RateEngine, Translator, TranslatorConfig};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::UnboundedReceiver;

pub const SECOND: u64 = 1_000_000_000;
pub const T0: u64 = 1_600_000_000 * SECOND;

pub fn string_attr(key: &str, value: &str) -> KeyValue {
    KeyValue {
        key: key.to_string(),
        value: Some(AnyValue {
            value: Some(Value::StringValue(value.to_string())),
        }),
    }
}

/// Test fixture builder for OTLP metrics with sensible defaults.
pub struct TestMetricBuilder {
    name: String,
    attributes: Vec<KeyValue>,
}

impl TestMetricBuilder {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            attributes: Vec::new(),
        }
    }

    pub fn attr(mut self, key: &str, value: &str) -> Self {
        self.attributes.push(string_attr(key, value));
        self
    }

    fn number_point(&self, ts: u64, value: number_data_point::Value) -> NumberDataPoint {
        NumberDataPoint {
            attributes: self.attributes.clone(),
            time_unix_nano: ts,
            value: Some(value),
            ..Default::default()
        }
    }

    fn metric(self, data: Data) -> Metric {
        Metric {
            name: self.name,
            data: Some(data),
            ..Default::default()
        }
    }

    pub fn gauge(self, points: &[(u64, f64)]) -> Metric {
        let data_points = points
            .iter()
            .map(|(ts, v)| self.number_point(*ts, number_data_point::Value::AsDouble(*v)))
            .collect();
        self.metric(Data::Gauge(Gauge { data_points }))
    }

    pub fn counter(self, temporality: AggregationTemporality, points: &[(u64, i64)]) -> Metric {
        let data_points = points
            .iter()
            .map(|(ts, v)| self.number_point(*ts, number_data_point::Value::AsInt(*v)))
            .collect();
        self.metric(Data::Sum(Sum {
            data_points,
            aggregation_temporality: temporality as i32,
            is_monotonic: true,
        }))
    }

    pub fn cumulative_counter(self, points: &[(u64, i64)]) -> Metric {
        self.counter(AggregationTemporality::Cumulative, points)
    }

    pub fn histogram(self, ts: u64, count: u64, sum: f64, buckets: Vec<u64>) -> Metric {
        let point = HistogramDataPoint {
            attributes: self.attributes.clone(),
            time_unix_nano: ts,
            count,
            sum: Some(sum),
            bucket_counts: buckets,
            ..Default::default()
        };
        self.metric(Data::Histogram(Histogram {
            data_points: vec![point],
            aggregation_temporality: AggregationTemporality::Delta as i32,
        }))
    }

    pub fn summary(self, points: usize) -> Metric {
        let data_points = (0..points).map(|_| SummaryDataPoint::default()).collect();
        self.metric(Data::Summary(Summary { data_points }))
    }
}

/// Wraps metrics into a single-resource export request.
pub fn export_request(resource_attrs: Vec<KeyValue>, metrics: Vec<Metric>) -> ExportMetricsServiceRequest {
    ExportMetricsServiceRequest {
        resource_metrics: vec![ResourceMetrics {
            resource: Some(Resource {
                attributes: resource_attrs,
                ..Default::default()
            }),
            scope_metrics: vec![ScopeMetrics {
                metrics,
                ..Default::default()
            }],
            ..Default::default()
        }],
    }
}

pub fn new_translator(config: TranslatorConfig) -> Translator {
    let store = TtlMap::new(Duration::from_secs(3600), Duration::from_secs(1800)).unwrap();
    Translator::new(config, RateEngine::new(Arc::new(store)))
}

/// Pipeline delivering into a channel, with a fixed default host.
pub fn channel_pipeline(
    config: TranslatorConfig,
    namespace: Option<&str>,
    static_tags: Vec<String>,
) -> (Arc<MetricsPipeline>, UnboundedReceiver<SeriesPayload>) {
    let (sink, rx) = ChannelSink::new();
    let processor = SeriesProcessor::new(
        namespace.map(str::to_string),
        Arc::new(HostResolver::new(Some("default-host".to_string()))),
        static_tags,
    );
    let pipeline = MetricsPipeline::new(new_translator(config), processor, Arc::new(sink));
    (Arc::new(pipeline), rx)
}
