//! Post-translation processing and series delivery.
//!
//! Translation output is destination-neutral. Before it leaves the process
//! the [`SeriesProcessor`] applies the destination-specific fields: a name
//! namespace, a default host for series without one, and static tags. The
//! result is wrapped in a Datadog series payload and handed to a
//! [`SeriesSink`].

use crate::core::{HostConfig, MetricKind, Otlp2ddError, OutputMetric, Result};
use crate::host::HostResolver;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use tokio::sync::{mpsc, Mutex};

const NANOS_PER_SECOND: u64 = 1_000_000_000;

/// Applies namespace, default host and static tags to translated series.
#[derive(Debug)]
pub struct SeriesProcessor {
    namespace: Option<String>,
    host: Arc<HostResolver>,
    static_tags: Vec<String>,
}

impl SeriesProcessor {
    /// Creates a processor.
    ///
    /// A namespace without a trailing `.` gets one appended.
    pub fn new(namespace: Option<String>, host: Arc<HostResolver>, static_tags: Vec<String>) -> Self {
        let namespace = namespace
            .filter(|ns| !ns.is_empty())
            .map(|ns| if ns.ends_with('.') { ns } else { format!("{}.", ns) });
        Self {
            namespace,
            host,
            static_tags,
        }
    }

    /// Builds a processor from configuration.
    pub fn from_config(namespace: Option<String>, host_config: &HostConfig) -> Self {
        Self::new(
            namespace,
            Arc::new(HostResolver::new(host_config.hostname.clone())),
            host_config.static_tags(),
        )
    }

    /// Processes series in place.
    pub fn process(&self, metrics: &mut [OutputMetric]) {
        for metric in metrics.iter_mut() {
            if let Some(namespace) = &self.namespace {
                metric.name.insert_str(0, namespace);
            }

            if metric.host.is_none() {
                metric.set_host(self.host.hostname());
            }

            metric.tags.extend(self.static_tags.iter().cloned());
        }
    }
}

/// One series in a Datadog submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Series {
    /// Series name
    pub metric: String,
    /// `[unix_seconds, value]` points
    pub points: Vec<(u64, f64)>,
    /// `gauge` or `rate`
    #[serde(rename = "type")]
    pub kind: MetricKind,
    /// Reporting host
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    /// `key:value` tags
    pub tags: Vec<String>,
}

impl From<OutputMetric> for Series {
    fn from(metric: OutputMetric) -> Self {
        Series {
            metric: metric.name,
            points: vec![(metric.timestamp / NANOS_PER_SECOND, metric.value)],
            kind: metric.kind,
            host: metric.host,
            tags: metric.tags,
        }
    }
}

/// Datadog series submission body.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SeriesPayload {
    /// Submitted series
    pub series: Vec<Series>,
}

impl SeriesPayload {
    /// Wraps translated series.
    pub fn from_metrics(metrics: Vec<OutputMetric>) -> Self {
        Self {
            series: metrics.into_iter().map(Series::from).collect(),
        }
    }

    /// Number of series
    pub fn len(&self) -> usize {
        self.series.len()
    }

    /// Returns true if there are no series
    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }

    /// JSON body
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Destination for processed series.
#[async_trait]
pub trait SeriesSink: Send + Sync {
    /// Delivers one payload.
    async fn send(&self, payload: SeriesPayload) -> Result<()>;
}

/// Writes each payload as one JSON line on stdout.
#[derive(Debug)]
pub struct StdoutSink {
    stdout: Mutex<tokio::io::Stdout>,
}

impl StdoutSink {
    /// Creates the sink.
    pub fn new() -> Self {
        Self {
            stdout: Mutex::new(tokio::io::stdout()),
        }
    }
}

impl Default for StdoutSink {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SeriesSink for StdoutSink {
    async fn send(&self, payload: SeriesPayload) -> Result<()> {
        let mut line = payload.to_json()?;
        line.push('\n');

        let mut stdout = self.stdout.lock().await;
        stdout
            .write_all(line.as_bytes())
            .await
            .map_err(|e| Otlp2ddError::sink(format!("Failed to write to stdout: {}", e)))?;
        stdout
            .flush()
            .await
            .map_err(|e| Otlp2ddError::sink(format!("Failed to flush stdout: {}", e)))
    }
}

/// Forwards payloads to an in-process channel.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<SeriesPayload>,
}

impl ChannelSink {
    /// Creates a sink and the receiving end of its channel.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<SeriesPayload>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

#[async_trait]
impl SeriesSink for ChannelSink {
    async fn send(&self, payload: SeriesPayload) -> Result<()> {
        self.tx.send(payload).map_err(|_| Otlp2ddError::ChannelSend)
    }
}
