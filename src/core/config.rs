//! Configuration management for otlp2dd.
//!
//! This module provides configuration handling with:
//! - YAML file support
//! - CLI argument overrides
//! - Validation and defaults

use crate::core::{Otlp2ddError, Result};
use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use std::time::Duration;

/// Longest hostname accepted by the backend
const MAX_HOSTNAME_LEN: usize = 255;

/// Complete configuration for otlp2dd
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Receiver configuration
    pub server: ServerConfig,
    /// Translation configuration
    pub metrics: MetricsConfig,
    /// Host identity and static tags
    pub host: HostConfig,
    /// Logging configuration
    pub logging: LoggingConfig,
    /// Debug mode
    #[serde(skip)]
    pub debug: bool,
}

/// Receiver configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// GRPC port for the OTLP receiver
    pub grpc_port: u16,
    /// HTTP port for the OTLP receiver
    pub http_port: u16,
    /// Serve OTLP/HTTP in addition to GRPC
    pub http_enabled: bool,
    /// Bind address for receivers
    pub bind_address: IpAddr,
}

/// Translation configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    /// Report cumulative monotonic sums as per-second rates
    pub send_monotonic_counter: bool,
    /// Emit one `count_per_bucket` series per histogram bucket
    pub report_buckets: bool,
    /// Prefix prepended to every series name
    pub namespace: Option<String>,
    /// How long a counter's previous point is remembered without refresh
    #[serde(with = "humantime_serde")]
    pub delta_ttl: Duration,
    /// How often expired counter points are swept
    #[serde(with = "humantime_serde")]
    pub sweep_interval: Duration,
    /// Upper bound on entries removed by a single sweep
    pub max_evictions_per_sweep: usize,
}

/// Host identity and static tags applied after translation
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct HostConfig {
    /// Hostname for series without a resource-level host
    pub hostname: Option<String>,
    /// `env:` tag value
    pub env: Option<String>,
    /// `service:` tag value
    pub service: Option<String>,
    /// `version:` tag value
    pub version: Option<String>,
    /// Additional `key:value` tags
    pub tags: Vec<String>,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level
    pub level: LogLevel,
    /// Include targets, thread ids and line numbers
    pub structured: bool,
}

/// Log levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Everything, including per-point tracing
    Trace,
    /// Per-batch summaries and counter resets
    Debug,
    /// Lifecycle events
    Info,
    /// Recoverable failures
    Warn,
    /// Failures only
    Error,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            grpc_port: 4317,
            http_port: 4318,
            http_enabled: true,
            bind_address: IpAddr::from([0, 0, 0, 0]),
        }
    }
}

impl Default for MetricsConfig {
    fn default() -> Self {
        MetricsConfig {
            send_monotonic_counter: true,
            report_buckets: false,
            namespace: None,
            delta_ttl: Duration::from_secs(3600),       // 1 hour
            sweep_interval: Duration::from_secs(1800), // 30 minutes
            max_evictions_per_sweep: 100_000,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            level: LogLevel::Info,
            structured: false,
        }
    }
}

impl HostConfig {
    /// Static tags derived from `env`, `service`, `version` and `tags`
    pub fn static_tags(&self) -> Vec<String> {
        let mut tags = Vec::with_capacity(self.tags.len() + 3);
        if let Some(env) = &self.env {
            tags.push(format!("env:{}", env));
        }
        if let Some(service) = &self.service {
            tags.push(format!("service:{}", service));
        }
        if let Some(version) = &self.version {
            tags.push(format!("version:{}", version));
        }
        tags.extend(self.tags.iter().cloned());
        tags
    }
}

/// Checks a hostname against the backend's accepted format
pub fn validate_hostname(hostname: &str) -> Result<()> {
    if hostname.is_empty() {
        return Err(Otlp2ddError::config("hostname cannot be empty"));
    }
    if hostname.len() > MAX_HOSTNAME_LEN {
        return Err(Otlp2ddError::config(format!(
            "hostname cannot exceed {} characters, got {}",
            MAX_HOSTNAME_LEN,
            hostname.len()
        )));
    }
    if let Some(c) = hostname
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '-' | '.' | '_')))
    {
        return Err(Otlp2ddError::config(format!(
            "hostname '{}' contains invalid character '{}'",
            hostname, c
        )));
    }
    Ok(())
}

impl Config {
    /// Create new config with defaults
    pub fn new() -> Result<Self> {
        let config = Config::default();
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.server.http_enabled && self.server.grpc_port == self.server.http_port {
            return Err(Otlp2ddError::config(format!(
                "GRPC and HTTP ports must be different: both set to {}",
                self.server.grpc_port
            )));
        }

        if self.metrics.delta_ttl.is_zero() {
            return Err(Otlp2ddError::config("delta_ttl must be greater than 0"));
        }

        if self.metrics.sweep_interval.is_zero() {
            return Err(Otlp2ddError::config("sweep_interval must be greater than 0"));
        }

        if self.metrics.max_evictions_per_sweep == 0 {
            return Err(Otlp2ddError::config("max_evictions_per_sweep must be greater than 0"));
        }

        if let Some(namespace) = &self.metrics.namespace {
            if namespace.trim_matches('.').is_empty() {
                return Err(Otlp2ddError::config("namespace cannot be empty"));
            }
        }

        if let Some(hostname) = &self.host.hostname {
            validate_hostname(hostname)?;
        }

        for (name, value) in [
            ("env", &self.host.env),
            ("service", &self.host.service),
            ("version", &self.host.version),
        ] {
            if value.as_deref().is_some_and(str::is_empty) {
                return Err(Otlp2ddError::config(format!("{} cannot be empty", name)));
            }
        }

        for tag in &self.host.tags {
            if tag.is_empty() || tag.ends_with(':') {
                return Err(Otlp2ddError::config(format!("invalid static tag '{}'", tag)));
            }
        }

        Ok(())
    }
}

impl LogLevel {
    /// Convert to tracing filter string
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

/// Configuration builder for programmatic construction
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Create a new builder with defaults
    pub fn new() -> Self {
        ConfigBuilder {
            config: Config::default(),
        }
    }

    /// Load configuration from YAML string
    pub fn from_yaml(mut self, yaml: &str) -> Result<Self> {
        self.config = serde_yaml::from_str(yaml)
            .map_err(|e| Otlp2ddError::config(format!("Failed to parse YAML config: {}", e)))?;
        Ok(self)
    }

    /// Set GRPC port
    pub fn grpc_port(mut self, port: u16) -> Self {
        self.config.server.grpc_port = port;
        self
    }

    /// Set HTTP port
    pub fn http_port(mut self, port: u16) -> Self {
        self.config.server.http_port = port;
        self
    }

    /// Enable or disable the HTTP receiver
    pub fn http_enabled(mut self, enabled: bool) -> Self {
        self.config.server.http_enabled = enabled;
        self
    }

    /// Report cumulative monotonic sums as rates
    pub fn send_monotonic_counter(mut self, enabled: bool) -> Self {
        self.config.metrics.send_monotonic_counter = enabled;
        self
    }

    /// Emit per-bucket histogram series
    pub fn report_buckets(mut self, enabled: bool) -> Self {
        self.config.metrics.report_buckets = enabled;
        self
    }

    /// Set series namespace
    pub fn namespace<S: Into<String>>(mut self, namespace: S) -> Self {
        self.config.metrics.namespace = Some(namespace.into());
        self
    }

    /// Set counter memory time-to-live
    pub fn delta_ttl(mut self, ttl: Duration) -> Self {
        self.config.metrics.delta_ttl = ttl;
        self
    }

    /// Set sweep interval
    pub fn sweep_interval(mut self, interval: Duration) -> Self {
        self.config.metrics.sweep_interval = interval;
        self
    }

    /// Set default hostname
    pub fn hostname<S: Into<String>>(mut self, hostname: S) -> Self {
        self.config.host.hostname = Some(hostname.into());
        self
    }

    /// Set debug mode
    pub fn debug(mut self, debug: bool) -> Self {
        self.config.debug = debug;
        self
    }

    /// Build and validate the configuration
    pub fn build(self) -> Result<Config> {
        self.config.validate()?;
        Ok(self.config)
    }
}
