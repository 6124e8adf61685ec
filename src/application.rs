//! Main application entry point for otlp2dd.

use crate::core::{Config, Result};
use crate::export::{SeriesProcessor, SeriesSink, StdoutSink};
use crate::receiver::{MetricsPipeline, OtlpReceiver, ReceiverConfig};
use crate::storage::TtlMap;
use crate::translator::{RateEngine, Translator, TranslatorConfig};
use std::net::SocketAddr;
use std::sync::Arc;

/// Coordinates the counter store, its sweeper and the receivers.
#[derive(Debug)]
pub struct Application {
    /// The OTLP receivers
    receiver: Arc<OtlpReceiver>,
    /// Counter memory shared with the translator
    rates: RateEngine,
    /// Application configuration
    config: Config,
}

impl Application {
    /// Create an application writing series to stdout.
    pub fn new(config: Config) -> Result<Self> {
        Self::with_sink(config, Arc::new(StdoutSink::new()))
    }

    /// Create an application delivering series to `sink`.
    pub fn with_sink(config: Config, sink: Arc<dyn SeriesSink>) -> Result<Self> {
        config.validate()?;

        let store = TtlMap::new(config.metrics.delta_ttl, config.metrics.sweep_interval)?
            .with_max_evictions_per_sweep(config.metrics.max_evictions_per_sweep);
        let rates = RateEngine::new(Arc::new(store));

        let translator = Translator::new(TranslatorConfig::from(&config.metrics), rates.clone());
        let processor = SeriesProcessor::from_config(config.metrics.namespace.clone(), &config.host);
        let pipeline = Arc::new(MetricsPipeline::new(translator, processor, sink));

        let bind = config.server.bind_address;
        let receiver_config = ReceiverConfig {
            grpc_addr: SocketAddr::new(bind, config.server.grpc_port),
            http_addr: config
                .server
                .http_enabled
                .then(|| SocketAddr::new(bind, config.server.http_port)),
        };
        let receiver = Arc::new(OtlpReceiver::new(receiver_config, pipeline));

        Ok(Self {
            receiver,
            rates,
            config,
        })
    }

    /// Run until ctrl-c.
    pub async fn run(self) -> Result<()> {
        self.run_until(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!("Failed to listen for shutdown signal: {}", e);
            }
        })
        .await
    }

    /// Run until `shutdown` completes or a receiver stops.
    pub async fn run_until<F>(self, shutdown: F) -> Result<()>
    where
        F: std::future::Future<Output = ()>,
    {
        tracing::info!(
            "Starting otlp2dd (delta ttl {:?}, sweep every {:?})",
            self.config.metrics.delta_ttl,
            self.config.metrics.sweep_interval
        );

        let sweeper = self.rates.store().spawn_sweeper();
        let result = Arc::clone(&self.receiver).run_until(shutdown).await;

        sweeper.stop().await?;
        let stats = self.rates.store().stats();
        tracing::info!(
            "Stopped with {} tracked series ({} sweeps, {} evictions)",
            stats.entries,
            stats.sweeps,
            stats.evictions
        );

        result
    }

    /// Get a reference to the rate engine.
    pub fn rates(&self) -> &RateEngine {
        &self.rates
    }

    /// Get a reference to the configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ConfigBuilder;
    use crate::export::ChannelSink;

    #[test]
    fn test_application_uses_configured_store() {
        let config = ConfigBuilder::new()
            .delta_ttl(std::time::Duration::from_secs(120))
            .sweep_interval(std::time::Duration::from_secs(60))
            .build()
            .unwrap();
        let (sink, _rx) = ChannelSink::new();
        let app = Application::with_sink(config, Arc::new(sink)).unwrap();

        assert_eq!(app.rates().store().ttl(), std::time::Duration::from_secs(120));
        assert_eq!(app.rates().store().sweep_interval(), std::time::Duration::from_secs(60));
    }

    #[test]
    fn test_application_rejects_invalid_config() {
        let mut config = Config::default();
        config.metrics.sweep_interval = std::time::Duration::ZERO;
        let (sink, _rx) = ChannelSink::new();
        assert!(Application::with_sink(config, Arc::new(sink)).is_err());
    }

    #[tokio::test]
    async fn test_run_stops_on_shutdown() {
        let config = ConfigBuilder::new()
            .grpc_port(0)
            .http_enabled(false)
            .build()
            .unwrap();
        let (sink, _rx) = ChannelSink::new();
        let app = Application::with_sink(config, Arc::new(sink)).unwrap();

        app.run_until(async {}).await.unwrap();
    }
}
