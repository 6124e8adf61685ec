//! Core domain models for otlp2dd.
//!
//! This module contains the configuration, error type, and the input and
//! output metric models shared by the translator and the receivers.

#![warn(missing_docs)]

pub mod config;
pub mod error;
pub mod types;

// Re-export commonly used types
pub use config::{Config, ConfigBuilder, HostConfig, MetricsConfig};
pub use error::{Otlp2ddError, Result};
pub use types::{
    Gauge, Histogram, HistogramDataPoint, Labels, Metric, MetricData, MetricKind,
    NumberDataPoint, NumberValue, OutputMetric, Resource, ResourceMetrics, ScopeMetrics, Sum,
    Temporality,
};
