//! Command-line interface for otlp2dd.
//!
//! Run `otlp2dd` to receive OTLP metrics on the default ports and print
//! Datadog series payloads on stdout, one JSON document per export.

use crate::application::Application;
use crate::core::{Config, ConfigBuilder, Otlp2ddError, Result};
use clap::Parser;
use std::path::{Path, PathBuf};

const CONFIG_DIR_NAME: &str = "otlp2dd";
const CONFIG_FILE_NAME: &str = "config.yaml";

/// Translate OTLP metrics into Datadog series.
#[derive(Parser, Debug, Default)]
#[command(name = "otlp2dd")]
#[command(version, about, long_about = None)]
#[command(disable_version_flag = true)]
pub struct Cli {
    /// Configuration file path (default: <config dir>/otlp2dd/config.yaml)
    #[arg(short, long, env = "OTLP2DD_CONFIG")]
    pub config: Option<PathBuf>,

    /// GRPC port for the OTLP receiver
    #[arg(long, env = "OTLP2DD_GRPC_PORT")]
    pub grpc_port: Option<u16>,

    /// HTTP port for the OTLP receiver
    #[arg(long, env = "OTLP2DD_HTTP_PORT")]
    pub http_port: Option<u16>,

    /// Disable the OTLP/HTTP receiver
    #[arg(long, env = "OTLP2DD_NO_HTTP")]
    pub no_http: bool,

    /// Prefix added to every series name
    #[arg(long, env = "OTLP2DD_NAMESPACE")]
    pub namespace: Option<String>,

    /// Report per-bucket histogram counts
    #[arg(long, env = "OTLP2DD_REPORT_BUCKETS")]
    pub report_buckets: bool,

    /// Report cumulative monotonic sums as raw gauges instead of rates
    #[arg(long, env = "OTLP2DD_NO_MONOTONIC_RATE")]
    pub no_monotonic_rate: bool,

    /// Default hostname for series without a host attribute
    #[arg(long, env = "OTLP2DD_HOSTNAME")]
    pub hostname: Option<String>,

    /// Enable debug logging
    #[arg(short, long, env = "OTLP2DD_DEBUG")]
    pub debug: bool,

    /// Validate configuration and exit
    #[arg(long)]
    pub check_config: bool,

    /// Show version information
    #[arg(short = 'V', long = "show-version")]
    pub version: bool,
}

impl Cli {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Cli::parse()
    }

    /// Load configuration with proper precedence:
    /// 1. CLI arguments (highest priority)
    /// 2. Environment variables
    /// 3. Config file
    /// 4. Defaults (lowest priority)
    pub async fn load_config(&self) -> Result<Config> {
        let builder = match self.config_path() {
            Some(path) => match tokio::fs::read_to_string(&path).await {
                Ok(content) => ConfigBuilder::new().from_yaml(&content)?,
                Err(e) if self.config.is_some() => {
                    // Explicitly requested file must exist
                    return Err(Otlp2ddError::config(format!(
                        "Failed to read config file {:?}: {}",
                        path, e
                    )));
                },
                Err(_) => ConfigBuilder::new(),
            },
            None => ConfigBuilder::new(),
        };

        self.apply_overrides(builder).build()
    }

    /// The config file to read, if any.
    pub fn config_path(&self) -> Option<PathBuf> {
        if let Some(path) = &self.config {
            return Some(path.clone());
        }
        default_config_path().filter(|path| path.exists())
    }

    fn apply_overrides(&self, mut builder: ConfigBuilder) -> ConfigBuilder {
        if let Some(port) = self.grpc_port {
            builder = builder.grpc_port(port);
        }
        if let Some(port) = self.http_port {
            builder = builder.http_port(port);
        }
        if self.no_http {
            builder = builder.http_enabled(false);
        }
        if let Some(namespace) = &self.namespace {
            builder = builder.namespace(namespace.as_str());
        }
        if self.report_buckets {
            builder = builder.report_buckets(true);
        }
        if self.no_monotonic_rate {
            builder = builder.send_monotonic_counter(false);
        }
        if let Some(hostname) = &self.hostname {
            builder = builder.hostname(hostname.as_str());
        }

        builder.debug(self.debug)
    }

    /// Initialize logging based on configuration.
    pub fn init_logging(&self, config: &Config) -> Result<()> {
        use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

        let env_log_level = std::env::var("OTLP2DD_LOG_LEVEL")
            .unwrap_or_else(|_| config.logging.level.as_str().to_string());
        let log_level = if self.debug || config.debug {
            "debug"
        } else {
            env_log_level.as_str()
        };

        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

        // Logs go to stderr; stdout carries the series payloads.
        let fmt_layer = if config.logging.structured {
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_thread_ids(true)
                .with_line_number(true)
                .compact()
                .boxed()
        } else {
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .compact()
                .boxed()
        };

        tracing_subscriber::registry()
            .with(filter)
            .with(fmt_layer)
            .try_init()
            .map_err(|e| Otlp2ddError::config(format!("Failed to initialize logging: {}", e)))?;

        Ok(())
    }
}

/// Default config file location.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
}

fn describe_config_source(path: Option<&Path>) -> String {
    path.map_or_else(|| "defaults".to_string(), |p| p.display().to_string())
}

/// Execute the otlp2dd application.
pub async fn execute(cli: Cli) -> Result<()> {
    if cli.version {
        println!("otlp2dd {}", env!("CARGO_PKG_VERSION"));
        println!("OTLP metrics to Datadog series translator");
        return Ok(());
    }

    let config = cli.load_config().await?;

    if cli.check_config {
        println!("Configuration is valid!");
        println!("  Source: {}", describe_config_source(cli.config_path().as_deref()));
        println!("  GRPC port: {}", config.server.grpc_port);
        if config.server.http_enabled {
            println!("  HTTP port: {}", config.server.http_port);
        } else {
            println!("  HTTP receiver: disabled");
        }
        println!("  Delta TTL: {:?}", config.metrics.delta_ttl);
        println!("  Sweep interval: {:?}", config.metrics.sweep_interval);
        return Ok(());
    }

    cli.init_logging(&config)?;
    tracing::info!(
        "Loaded configuration from {}",
        describe_config_source(cli.config_path().as_deref())
    );

    Application::new(config)?.run().await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::time::Duration;

    #[test]
    fn test_cli_parses_flags() {
        let cli = Cli::try_parse_from([
            "otlp2dd",
            "--grpc-port",
            "5317",
            "--no-http",
            "--namespace",
            "otel",
            "--report-buckets",
        ])
        .unwrap();

        assert_eq!(cli.grpc_port, Some(5317));
        assert!(cli.no_http);
        assert_eq!(cli.namespace.as_deref(), Some("otel"));
        assert!(cli.report_buckets);
        assert!(!cli.no_monotonic_rate);
    }

    #[tokio::test]
    async fn test_cli_overrides_config_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "server:\n  grpc_port: 6317\n  http_port: 6318\nmetrics:\n  delta_ttl: 10m\n  report_buckets: false"
        )
        .unwrap();

        let cli = Cli {
            config: Some(file.path().to_path_buf()),
            http_port: Some(7318),
            report_buckets: true,
            ..Cli::default()
        };
        let config = cli.load_config().await.unwrap();

        assert_eq!(config.server.grpc_port, 6317);
        assert_eq!(config.server.http_port, 7318);
        assert_eq!(config.metrics.delta_ttl, Duration::from_secs(600));
        assert!(config.metrics.report_buckets);
    }

    #[tokio::test]
    async fn test_missing_explicit_config_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let cli = Cli {
            config: Some(dir.path().join("missing.yaml")),
            ..Cli::default()
        };
        let err = cli.load_config().await.unwrap_err();
        assert_eq!(err.category(), "config");
    }

    #[test]
    fn test_describe_config_source() {
        assert_eq!(describe_config_source(None), "defaults");
        assert_eq!(describe_config_source(Some(Path::new("/etc/otlp2dd.yaml"))), "/etc/otlp2dd.yaml");
    }
}
