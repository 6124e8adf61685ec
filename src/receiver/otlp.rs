//! Conversion from OTLP protobuf messages to the translation model.

use crate::core::{
    Gauge, Histogram, HistogramDataPoint, Labels, Metric, MetricData, NumberDataPoint,
    NumberValue, Otlp2ddError, Resource, ResourceMetrics, Result, ScopeMetrics, Sum, Temporality,
};
use opentelemetry_proto::tonic::{
    collector::metrics::v1::ExportMetricsServiceRequest,
    common::v1::{any_value::Value, AnyValue, KeyValue},
    metrics::v1 as proto,
};
use prost::Message;

/// Decodes a binary protobuf export request.
pub fn decode_request(body: &[u8]) -> Result<ExportMetricsServiceRequest> {
    ExportMetricsServiceRequest::decode(body)
        .map_err(|e| Otlp2ddError::protocol(format!("Failed to parse protobuf: {}", e)))
}

/// Converts an export request into resource metrics.
pub fn convert_request(request: ExportMetricsServiceRequest) -> Vec<ResourceMetrics> {
    request.resource_metrics.into_iter().map(convert_resource_metrics).collect()
}

fn convert_resource_metrics(rm: proto::ResourceMetrics) -> ResourceMetrics {
    let attributes = rm
        .resource
        .map(|resource| attributes_to_labels(resource.attributes))
        .unwrap_or_default();

    ResourceMetrics {
        resource: Resource { attributes },
        scope_metrics: rm.scope_metrics.into_iter().map(convert_scope_metrics).collect(),
    }
}

fn convert_scope_metrics(sm: proto::ScopeMetrics) -> ScopeMetrics {
    let (name, version) = sm
        .scope
        .map(|scope| (scope.name, scope.version))
        .unwrap_or_default();

    ScopeMetrics {
        name,
        version,
        metrics: sm.metrics.into_iter().map(convert_metric).collect(),
    }
}

/// Converts a single OTLP metric.
pub fn convert_metric(metric: proto::Metric) -> Metric {
    use proto::metric::Data;

    let data = match metric.data {
        None => MetricData::Empty,
        Some(Data::Gauge(gauge)) => MetricData::Gauge(Gauge {
            points: gauge.data_points.into_iter().map(convert_number_point).collect(),
        }),
        Some(Data::Sum(sum)) => MetricData::Sum(Sum {
            temporality: convert_temporality(sum.aggregation_temporality),
            is_monotonic: sum.is_monotonic,
            points: sum.data_points.into_iter().map(convert_number_point).collect(),
        }),
        Some(Data::Histogram(histogram)) => MetricData::Histogram(Histogram {
            points: histogram.data_points.into_iter().map(convert_histogram_point).collect(),
        }),
        Some(Data::ExponentialHistogram(histogram)) => MetricData::Unsupported {
            kind: "exponential_histogram".to_string(),
            data_points: histogram.data_points.len(),
        },
        Some(Data::Summary(summary)) => MetricData::Unsupported {
            kind: "summary".to_string(),
            data_points: summary.data_points.len(),
        },
    };

    Metric::new(metric.name, data)
}

fn convert_temporality(value: i32) -> Temporality {
    match proto::AggregationTemporality::try_from(value) {
        Ok(proto::AggregationTemporality::Delta) => Temporality::Delta,
        Ok(proto::AggregationTemporality::Cumulative) => Temporality::Cumulative,
        _ => Temporality::Unspecified,
    }
}

fn convert_number_point(point: proto::NumberDataPoint) -> NumberDataPoint {
    use proto::number_data_point::Value as PointValue;

    // An unset value reads as 0.0, like the collector's pdata accessors.
    let value = match point.value {
        Some(PointValue::AsInt(v)) => NumberValue::Int(v),
        Some(PointValue::AsDouble(v)) => NumberValue::Double(v),
        None => NumberValue::Double(0.0),
    };

    NumberDataPoint::new(point.time_unix_nano, value)
        .with_labels(attributes_to_labels(point.attributes))
}

fn convert_histogram_point(point: proto::HistogramDataPoint) -> HistogramDataPoint {
    HistogramDataPoint {
        timestamp: point.time_unix_nano,
        count: point.count,
        sum: point.sum.unwrap_or_default(),
        bucket_counts: point.bucket_counts,
        explicit_bounds: point.explicit_bounds,
        labels: attributes_to_labels(point.attributes),
    }
}

/// Flattens OTLP attributes into string labels.
pub fn attributes_to_labels(attributes: Vec<KeyValue>) -> Labels {
    attributes
        .into_iter()
        .map(|kv| {
            let value = kv.value.map(any_value_to_string).unwrap_or_default();
            (kv.key, value)
        })
        .collect()
}

/// Renders an attribute value as a string.
pub fn any_value_to_string(value: AnyValue) -> String {
    match value.value {
        Some(Value::StringValue(s)) => s,
        Some(Value::BoolValue(b)) => b.to_string(),
        Some(Value::IntValue(i)) => i.to_string(),
        Some(Value::DoubleValue(d)) => d.to_string(),
        Some(Value::BytesValue(bytes)) => hex::encode(bytes),
        Some(Value::ArrayValue(arr)) => {
            let values: Vec<String> = arr.values.into_iter().map(any_value_to_string).collect();
            format!("[{}]", values.join(","))
        },
        Some(Value::KvlistValue(kv)) => {
            let pairs: Vec<String> = kv
                .values
                .into_iter()
                .map(|kv| {
                    let value = kv.value.map(any_value_to_string).unwrap_or_default();
                    format!("{}:{}", kv.key, value)
                })
                .collect();
            format!("{{{}}}", pairs.join(","))
        },
        None => String::new(),
    }
}
