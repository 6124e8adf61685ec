//! Configuration system tests.

use otlp2dd_lib::cli::Cli;
use otlp2dd_lib::core::{Config, ConfigBuilder};
use std::io::Write;
use std::time::Duration;

#[test]
fn test_default_config() {
    let config = Config::default();
    assert!(config.validate().is_ok());
    assert_eq!(config.server.grpc_port, 4317);
    assert_eq!(config.server.http_port, 4318);
    assert!(config.server.http_enabled);
    assert!(config.metrics.send_monotonic_counter);
    assert!(!config.metrics.report_buckets);
    assert_eq!(config.metrics.delta_ttl, Duration::from_secs(3600));
    assert_eq!(config.metrics.sweep_interval, Duration::from_secs(1800));
}

#[test]
fn test_config_builder() {
    let config = ConfigBuilder::new()
        .grpc_port(9090)
        .http_port(9091)
        .namespace("otel")
        .report_buckets(true)
        .send_monotonic_counter(false)
        .hostname("collector-1")
        .debug(true)
        .build()
        .unwrap();

    assert_eq!(config.server.grpc_port, 9090);
    assert_eq!(config.server.http_port, 9091);
    assert_eq!(config.metrics.namespace.as_deref(), Some("otel"));
    assert!(config.metrics.report_buckets);
    assert!(!config.metrics.send_monotonic_counter);
    assert_eq!(config.host.hostname.as_deref(), Some("collector-1"));
    assert!(config.debug);
}

#[test]
fn test_yaml_config() {
    let yaml = r#"
server:
  grpc_port: 5317
  http_enabled: false
metrics:
  namespace: "app"
  report_buckets: true
  delta_ttl: 15m
  sweep_interval: 5m
  max_evictions_per_sweep: 500
host:
  hostname: "edge-01"
  env: "staging"
  service: "checkout"
  tags:
    - "team:payments"
logging:
  level: debug
  structured: true
"#;

    let config = ConfigBuilder::new()
        .from_yaml(yaml)
        .unwrap()
        .build()
        .unwrap();

    assert_eq!(config.server.grpc_port, 5317);
    assert_eq!(config.server.http_port, 4318);
    assert!(!config.server.http_enabled);
    assert_eq!(config.metrics.namespace.as_deref(), Some("app"));
    assert_eq!(config.metrics.delta_ttl, Duration::from_secs(900));
    assert_eq!(config.metrics.sweep_interval, Duration::from_secs(300));
    assert_eq!(config.metrics.max_evictions_per_sweep, 500);
    assert_eq!(
        config.host.static_tags(),
        vec!["env:staging", "service:checkout", "team:payments"]
    );
    assert_eq!(config.logging.level.as_str(), "debug");
    assert!(config.logging.structured);
}

#[test]
fn test_invalid_configs() {
    // Port clash with HTTP enabled
    assert!(ConfigBuilder::new().grpc_port(4000).http_port(4000).build().is_err());
    // Same ports are fine once HTTP is off
    assert!(ConfigBuilder::new()
        .grpc_port(4000)
        .http_port(4000)
        .http_enabled(false)
        .build()
        .is_ok());

    assert!(ConfigBuilder::new().delta_ttl(Duration::ZERO).build().is_err());
    assert!(ConfigBuilder::new().sweep_interval(Duration::ZERO).build().is_err());
    assert!(ConfigBuilder::new().hostname("bad host!").build().is_err());
    assert!(ConfigBuilder::new().namespace(".").build().is_err());
    // An empty env would be emitted as the tag `env:`
    assert!(ConfigBuilder::new()
        .from_yaml("host:\n  env: \"\"\n")
        .unwrap()
        .build()
        .is_err());
}

#[test]
fn test_invalid_yaml() {
    let err = ConfigBuilder::new()
        .from_yaml("metrics:\n  delta_ttl: not-a-duration\n")
        .err()
        .unwrap();
    assert!(err.to_string().contains("YAML"));
}

#[tokio::test]
async fn test_cli_loads_config_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(
        file,
        "metrics:\n  namespace: fromfile\n  send_monotonic_counter: true\nhost:\n  env: prod\n"
    )
    .unwrap();

    let cli = Cli {
        config: Some(file.path().to_path_buf()),
        no_monotonic_rate: true,
        ..Cli::default()
    };
    let config = cli.load_config().await.unwrap();

    assert_eq!(config.metrics.namespace.as_deref(), Some("fromfile"));
    assert!(!config.metrics.send_monotonic_counter);
    assert_eq!(config.host.env.as_deref(), Some("prod"));
}
