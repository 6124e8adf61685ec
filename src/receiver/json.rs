//! OTLP/HTTP JSON encoding for metrics.
//!
//! Follows the protobuf JSON mapping OTLP uses: lowerCamelCase field names,
//! 64-bit integers as strings or numbers, enums as integers or names, and
//! `bytesValue` as base64. Missing fields take their protobuf defaults.

use crate::core::{Otlp2ddError, Result};
use base64::prelude::*;
use opentelemetry_proto::tonic::{
    collector::metrics::v1::{ExportMetricsServiceRequest, ExportMetricsServiceResponse},
    common::v1::{any_value, AnyValue, ArrayValue, InstrumentationScope, KeyValue, KeyValueList},
    metrics::v1::{self as proto, metric::Data, number_data_point},
    resource::v1::Resource,
};
use serde_json::Value;

/// Parses a JSON export request.
pub fn parse_request(body: &[u8]) -> Result<ExportMetricsServiceRequest> {
    let json: Value = serde_json::from_slice(body)
        .map_err(|e| Otlp2ddError::protocol(format!("Invalid JSON: {}", e)))?;

    if !json.is_object() {
        return Err(Otlp2ddError::protocol("Export request must be a JSON object"));
    }

    let resource_metrics = array(&json, "resourceMetrics")?
        .into_iter()
        .map(parse_resource_metrics)
        .collect::<Result<_>>()?;

    Ok(ExportMetricsServiceRequest { resource_metrics })
}

/// Renders an export response as OTLP JSON.
pub fn response_body(response: &ExportMetricsServiceResponse) -> Value {
    match &response.partial_success {
        Some(partial) => serde_json::json!({
            "partialSuccess": {
                "rejectedDataPoints": partial.rejected_data_points.to_string(),
                "errorMessage": partial.error_message,
            }
        }),
        None => serde_json::json!({}),
    }
}

fn parse_resource_metrics(rm: &Value) -> Result<proto::ResourceMetrics> {
    let resource = match rm.get("resource") {
        Some(resource) if !resource.is_null() => Some(Resource {
            attributes: parse_attributes(resource)?,
            ..Default::default()
        }),
        _ => None,
    };

    let scope_metrics = array(rm, "scopeMetrics")?
        .into_iter()
        .map(parse_scope_metrics)
        .collect::<Result<_>>()?;

    Ok(proto::ResourceMetrics {
        resource,
        scope_metrics,
        schema_url: string(rm, "schemaUrl"),
        ..Default::default()
    })
}

fn parse_scope_metrics(sm: &Value) -> Result<proto::ScopeMetrics> {
    let scope = sm.get("scope").filter(|s| !s.is_null()).map(|scope| InstrumentationScope {
        name: string(scope, "name"),
        version: string(scope, "version"),
        ..Default::default()
    });

    let metrics = array(sm, "metrics")?
        .into_iter()
        .map(parse_metric)
        .collect::<Result<_>>()?;

    Ok(proto::ScopeMetrics {
        scope,
        metrics,
        schema_url: string(sm, "schemaUrl"),
        ..Default::default()
    })
}

fn parse_metric(metric: &Value) -> Result<proto::Metric> {
    let data = if let Some(gauge) = metric.get("gauge") {
        Some(Data::Gauge(proto::Gauge {
            data_points: number_points(gauge)?,
        }))
    } else if let Some(sum) = metric.get("sum") {
        Some(Data::Sum(proto::Sum {
            data_points: number_points(sum)?,
            aggregation_temporality: temporality(sum)?,
            is_monotonic: sum.get("isMonotonic").and_then(Value::as_bool).unwrap_or(false),
        }))
    } else if let Some(histogram) = metric.get("histogram") {
        Some(Data::Histogram(proto::Histogram {
            data_points: array(histogram, "dataPoints")?
                .into_iter()
                .map(histogram_point)
                .collect::<Result<_>>()?,
            aggregation_temporality: temporality(histogram)?,
        }))
    } else if let Some(histogram) = metric.get("exponentialHistogram") {
        // Only the point count matters downstream.
        Some(Data::ExponentialHistogram(proto::ExponentialHistogram {
            data_points: array(histogram, "dataPoints")?
                .iter()
                .map(|_| proto::ExponentialHistogramDataPoint::default())
                .collect(),
            aggregation_temporality: temporality(histogram)?,
        }))
    } else if let Some(summary) = metric.get("summary") {
        Some(Data::Summary(proto::Summary {
            data_points: array(summary, "dataPoints")?
                .iter()
                .map(|_| proto::SummaryDataPoint::default())
                .collect(),
        }))
    } else {
        None
    };

    Ok(proto::Metric {
        name: string(metric, "name"),
        description: string(metric, "description"),
        unit: string(metric, "unit"),
        data,
        ..Default::default()
    })
}

fn number_points(parent: &Value) -> Result<Vec<proto::NumberDataPoint>> {
    array(parent, "dataPoints")?
        .into_iter()
        .map(|point| {
            let value = if let Some(v) = point.get("asInt").filter(|v| !v.is_null()) {
                Some(number_data_point::Value::AsInt(int64(v, "asInt")?))
            } else if let Some(v) = point.get("asDouble").filter(|v| !v.is_null()) {
                Some(number_data_point::Value::AsDouble(float64(v, "asDouble")?))
            } else {
                None
            };

            Ok(proto::NumberDataPoint {
                attributes: parse_attributes(point)?,
                start_time_unix_nano: uint64_field(point, "startTimeUnixNano")?,
                time_unix_nano: uint64_field(point, "timeUnixNano")?,
                value,
                ..Default::default()
            })
        })
        .collect()
}

fn histogram_point(point: &Value) -> Result<proto::HistogramDataPoint> {
    let sum = match point.get("sum") {
        Some(v) if !v.is_null() => Some(float64(v, "sum")?),
        _ => None,
    };

    Ok(proto::HistogramDataPoint {
        attributes: parse_attributes(point)?,
        start_time_unix_nano: uint64_field(point, "startTimeUnixNano")?,
        time_unix_nano: uint64_field(point, "timeUnixNano")?,
        count: uint64_field(point, "count")?,
        sum,
        bucket_counts: array(point, "bucketCounts")?
            .into_iter()
            .map(|v| uint64(v, "bucketCounts"))
            .collect::<Result<_>>()?,
        explicit_bounds: array(point, "explicitBounds")?
            .into_iter()
            .map(|v| float64(v, "explicitBounds"))
            .collect::<Result<_>>()?,
        ..Default::default()
    })
}

fn temporality(parent: &Value) -> Result<i32> {
    let invalid = || Otlp2ddError::protocol("Invalid 'aggregationTemporality'");
    match parent.get("aggregationTemporality") {
        None | Some(Value::Null) => Ok(0),
        Some(Value::Number(n)) => n.as_i64().and_then(|n| i32::try_from(n).ok()).ok_or_else(invalid),
        Some(Value::String(name)) => proto::AggregationTemporality::from_str_name(name)
            .map(|t| t as i32)
            .ok_or_else(invalid),
        Some(_) => Err(invalid()),
    }
}

fn parse_attributes(parent: &Value) -> Result<Vec<KeyValue>> {
    array(parent, "attributes")?.into_iter().map(parse_key_value).collect()
}

fn parse_key_value(kv: &Value) -> Result<KeyValue> {
    let key = kv
        .get("key")
        .and_then(Value::as_str)
        .ok_or_else(|| Otlp2ddError::protocol("Attribute without 'key'"))?;

    let value = match kv.get("value") {
        Some(v) if !v.is_null() => Some(parse_any_value(v)?),
        _ => None,
    };

    Ok(KeyValue {
        key: key.to_string(),
        value,
    })
}

fn parse_any_value(value: &Value) -> Result<AnyValue> {
    use any_value::Value as Kind;

    let kind = if let Some(s) = value.get("stringValue").and_then(Value::as_str) {
        Some(Kind::StringValue(s.to_string()))
    } else if let Some(b) = value.get("boolValue").and_then(Value::as_bool) {
        Some(Kind::BoolValue(b))
    } else if let Some(i) = value.get("intValue") {
        Some(Kind::IntValue(int64(i, "intValue")?))
    } else if let Some(d) = value.get("doubleValue") {
        Some(Kind::DoubleValue(float64(d, "doubleValue")?))
    } else if let Some(b) = value.get("bytesValue").and_then(Value::as_str) {
        let bytes = BASE64_STANDARD
            .decode(b)
            .map_err(|e| Otlp2ddError::protocol(format!("Invalid 'bytesValue': {}", e)))?;
        Some(Kind::BytesValue(bytes))
    } else if let Some(arr) = value.get("arrayValue") {
        Some(Kind::ArrayValue(ArrayValue {
            values: array(arr, "values")?
                .into_iter()
                .map(parse_any_value)
                .collect::<Result<_>>()?,
        }))
    } else if let Some(kvlist) = value.get("kvlistValue") {
        Some(Kind::KvlistValue(KeyValueList {
            values: array(kvlist, "values")?
                .into_iter()
                .map(parse_key_value)
                .collect::<Result<_>>()?,
        }))
    } else {
        None
    };

    Ok(AnyValue { value: kind })
}

/// Elements of an array field; a missing or null field is empty.
fn array<'a>(parent: &'a Value, field: &str) -> Result<Vec<&'a Value>> {
    match parent.get(field) {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::Array(items)) => Ok(items.iter().collect()),
        Some(_) => Err(Otlp2ddError::protocol(format!("'{}' must be an array", field))),
    }
}

fn string(parent: &Value, field: &str) -> String {
    parent
        .get(field)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

fn invalid_number(field: &str) -> Otlp2ddError {
    Otlp2ddError::protocol(format!("Invalid number in '{}'", field))
}

fn uint64(value: &Value, field: &str) -> Result<u64> {
    match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
    .ok_or_else(|| invalid_number(field))
}

fn uint64_field(parent: &Value, field: &str) -> Result<u64> {
    match parent.get(field) {
        None | Some(Value::Null) => Ok(0),
        Some(value) => uint64(value, field),
    }
}

fn int64(value: &Value, field: &str) -> Result<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
    .ok_or_else(|| invalid_number(field))
}

fn float64(value: &Value, field: &str) -> Result<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
    .ok_or_else(|| invalid_number(field))
}

#[cfg(test)]
mod tests {
    use super::*;
    use opentelemetry_proto::tonic::collector::metrics::v1::ExportMetricsPartialSuccess;
    use pretty_assertions::assert_eq;

    fn parse(json: Value) -> Result<ExportMetricsServiceRequest> {
        parse_request(json.to_string().as_bytes())
    }

    fn only_metric(request: &ExportMetricsServiceRequest) -> &proto::Metric {
        &request.resource_metrics[0].scope_metrics[0].metrics[0]
    }

    #[test]
    fn test_parse_cumulative_sum() {
        let request = parse(serde_json::json!({
            "resourceMetrics": [{
                "resource": {
                    "attributes": [{"key": "host.name", "value": {"stringValue": "node-1"}}]
                },
                "scopeMetrics": [{
                    "scope": {"name": "meter", "version": "1.0"},
                    "metrics": [{
                        "name": "requests",
                        "sum": {
                            "aggregationTemporality": 2,
                            "isMonotonic": true,
                            "dataPoints": [{
                                "attributes": [{"key": "code", "value": {"intValue": "200"}}],
                                "timeUnixNano": "1600000000000000000",
                                "asInt": "42"
                            }]
                        }
                    }]
                }]
            }]
        }))
        .unwrap();

        let resource = request.resource_metrics[0].resource.as_ref().unwrap();
        assert_eq!(resource.attributes[0].key, "host.name");
        assert_eq!(
            request.resource_metrics[0].scope_metrics[0].scope.as_ref().unwrap().name,
            "meter"
        );

        let metric = only_metric(&request);
        assert_eq!(metric.name, "requests");
        match metric.data.as_ref().unwrap() {
            Data::Sum(sum) => {
                assert!(sum.is_monotonic);
                assert_eq!(sum.aggregation_temporality, proto::AggregationTemporality::Cumulative as i32);
                let point = &sum.data_points[0];
                assert_eq!(point.time_unix_nano, 1_600_000_000_000_000_000);
                assert_eq!(point.value, Some(number_data_point::Value::AsInt(42)));
                assert_eq!(
                    point.attributes[0].value.as_ref().unwrap().value,
                    Some(any_value::Value::IntValue(200))
                );
            },
            other => panic!("unexpected data: {:?}", other),
        }
    }

    #[test]
    fn test_parse_histogram_and_enum_names() {
        let request = parse(serde_json::json!({
            "resourceMetrics": [{
                "scopeMetrics": [{
                    "metrics": [{
                        "name": "latency",
                        "histogram": {
                            "aggregationTemporality": "AGGREGATION_TEMPORALITY_DELTA",
                            "dataPoints": [{
                                "timeUnixNano": 10,
                                "count": "20",
                                "sum": 200.5,
                                "bucketCounts": ["2", 18],
                                "explicitBounds": [0.5]
                            }]
                        }
                    }]
                }]
            }]
        }))
        .unwrap();

        match only_metric(&request).data.as_ref().unwrap() {
            Data::Histogram(histogram) => {
                assert_eq!(histogram.aggregation_temporality, proto::AggregationTemporality::Delta as i32);
                let point = &histogram.data_points[0];
                assert_eq!(point.count, 20);
                assert_eq!(point.sum, Some(200.5));
                assert_eq!(point.bucket_counts, vec![2, 18]);
                assert_eq!(point.explicit_bounds, vec![0.5]);
            },
            other => panic!("unexpected data: {:?}", other),
        }
    }

    #[test]
    fn test_parse_any_values() {
        let value = parse_any_value(&serde_json::json!({"bytesValue": "3q0="})).unwrap();
        assert_eq!(value.value, Some(any_value::Value::BytesValue(vec![0xde, 0xad])));

        let value = parse_any_value(&serde_json::json!({
            "arrayValue": {"values": [{"stringValue": "a"}, {"boolValue": true}]}
        }))
        .unwrap();
        match value.value {
            Some(any_value::Value::ArrayValue(arr)) => assert_eq!(arr.values.len(), 2),
            other => panic!("unexpected value: {:?}", other),
        }

        assert_eq!(parse_any_value(&serde_json::json!({})).unwrap().value, None);
    }

    #[test]
    fn test_summary_keeps_point_count() {
        let request = parse(serde_json::json!({
            "resourceMetrics": [{"scopeMetrics": [{"metrics": [{
                "name": "rpc.duration",
                "summary": {"dataPoints": [{}, {}, {}]}
            }]}]}]
        }))
        .unwrap();

        match only_metric(&request).data.as_ref().unwrap() {
            Data::Summary(summary) => assert_eq!(summary.data_points.len(), 3),
            other => panic!("unexpected data: {:?}", other),
        }
    }

    #[test]
    fn test_empty_object_is_empty_request() {
        assert_eq!(parse(serde_json::json!({})).unwrap(), ExportMetricsServiceRequest::default());
    }

    #[test]
    fn test_malformed_requests() {
        for body in [
            "not json",
            "[]",
            r#"{"resourceMetrics": {}}"#,
            r#"{"resourceMetrics": [{"scopeMetrics": [{"metrics": [{"gauge": {"dataPoints": [{"asInt": "x"}]}}]}]}]}"#,
            r#"{"resourceMetrics": [{"resource": {"attributes": [{"value": {}}]}}]}"#,
        ] {
            let err = parse_request(body.as_bytes()).unwrap_err();
            assert_eq!(err.category(), "protocol", "{}", body);
        }
    }

    #[test]
    fn test_response_body() {
        assert_eq!(response_body(&ExportMetricsServiceResponse::default()), serde_json::json!({}));

        let response = ExportMetricsServiceResponse {
            partial_success: Some(ExportMetricsPartialSuccess {
                rejected_data_points: 3,
                error_message: "dropped".to_string(),
            }),
        };
        assert_eq!(
            response_body(&response),
            serde_json::json!({
                "partialSuccess": {"rejectedDataPoints": "3", "errorMessage": "dropped"}
            })
        );
    }
}
