//! Per-kind conversion of datapoints into output series.

use crate::core::{HistogramDataPoint, NumberDataPoint, OutputMetric};
use crate::translator::rate::RateEngine;
use crate::translator::tags::{format_tag, get_tags, series_key};

/// Maps gauge (or plain sum) datapoints to gauges.
pub fn map_number_metrics(name: &str, points: &[NumberDataPoint]) -> Vec<OutputMetric> {
    points
        .iter()
        .map(|p| OutputMetric::gauge(name, p.timestamp, p.value.as_f64(), get_tags(&p.labels)))
        .collect()
}

/// Maps cumulative monotonic datapoints to rates.
///
/// Points that produce no rate (first point of a series, counter resets,
/// out-of-order points) are omitted.
pub fn map_monotonic_metrics(
    name: &str,
    rates: &RateEngine,
    points: &[NumberDataPoint],
) -> Vec<OutputMetric> {
    let mut ms = Vec::with_capacity(points.len());
    for p in points {
        let tags = get_tags(&p.labels);
        let key = series_key(name, &tags);

        if let Some(rate) = rates.compute_rate(&key, p.timestamp, p.value) {
            ms.push(OutputMetric::rate(name, p.timestamp, rate, tags));
        }
    }
    ms
}

/// Maps histogram datapoints to `.count` and `.sum` gauges.
///
/// With `buckets` enabled each bucket count is also reported under
/// `.count_per_bucket`, tagged with its `bucket_idx`. Bucket bounds are not
/// reported.
pub fn map_histogram_metrics(
    name: &str,
    points: &[HistogramDataPoint],
    buckets: bool,
) -> Vec<OutputMetric> {
    // Allocate assuming no buckets
    let mut ms = Vec::with_capacity(2 * points.len());
    let count_name = format!("{}.count", name);
    let sum_name = format!("{}.sum", name);
    let bucket_name = format!("{}.count_per_bucket", name);

    for p in points {
        let tags = get_tags(&p.labels);

        ms.push(OutputMetric::gauge(&count_name, p.timestamp, p.count as f64, tags.clone()));
        ms.push(OutputMetric::gauge(&sum_name, p.timestamp, p.sum, tags.clone()));

        if buckets {
            for (idx, count) in p.bucket_counts.iter().enumerate() {
                let mut bucket_tags = Vec::with_capacity(tags.len() + 1);
                bucket_tags.extend(tags.iter().cloned());
                bucket_tags.push(format_tag("bucket_idx", &idx.to_string()));
                ms.push(OutputMetric::gauge(&bucket_name, p.timestamp, *count as f64, bucket_tags));
            }
        }
    }
    ms
}
