//! OpenTelemetry metrics receivers.
//!
//! This module implements the OTLP/gRPC metrics service and an OTLP/HTTP
//! endpoint accepting protobuf and JSON. Both decode requests into the
//! translation model and push them through one shared [`MetricsPipeline`].

pub mod http;
pub mod json;
pub mod otlp;

use crate::core::{Otlp2ddError, Result};
use crate::export::{SeriesPayload, SeriesProcessor, SeriesSink};
use crate::translator::Translator;
use opentelemetry_proto::tonic::collector::metrics::v1::{
    metrics_service_server::{MetricsService, MetricsServiceServer},
    ExportMetricsPartialSuccess, ExportMetricsServiceRequest, ExportMetricsServiceResponse,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tonic::{transport::Server, Request, Response, Status};

/// Outcome of one export request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExportSummary {
    /// Series handed to the sink
    pub series: usize,
    /// Datapoints that could not be translated
    pub dropped: usize,
}

/// Translate → post-process → deliver.
pub struct MetricsPipeline {
    translator: Translator,
    processor: SeriesProcessor,
    sink: Arc<dyn SeriesSink>,
}

impl MetricsPipeline {
    /// Creates a pipeline.
    pub fn new(translator: Translator, processor: SeriesProcessor, sink: Arc<dyn SeriesSink>) -> Self {
        Self {
            translator,
            processor,
            sink,
        }
    }

    /// Handles one OTLP export request.
    ///
    /// Translation never fails; only delivery to the sink can.
    pub async fn consume(&self, request: ExportMetricsServiceRequest) -> Result<ExportSummary> {
        let resource_metrics = otlp::convert_request(request);
        let mut translation = self.translator.map_metrics(&resource_metrics);
        self.processor.process(&mut translation.series);

        let summary = ExportSummary {
            series: translation.series.len(),
            dropped: translation.dropped,
        };

        if !translation.series.is_empty() {
            self.sink
                .send(SeriesPayload::from_metrics(translation.series))
                .await?;
        }

        Ok(summary)
    }
}

impl std::fmt::Debug for MetricsPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MetricsPipeline")
            .field("translator", &self.translator)
            .field("processor", &self.processor)
            .finish_non_exhaustive()
    }
}

/// Receiver settings.
#[derive(Debug, Clone)]
pub struct ReceiverConfig {
    /// Address for the gRPC server
    pub grpc_addr: SocketAddr,
    /// Address for the HTTP server, if enabled
    pub http_addr: Option<SocketAddr>,
}

/// OTLP metrics receiver.
#[derive(Debug)]
pub struct OtlpReceiver {
    config: ReceiverConfig,
    pipeline: Arc<MetricsPipeline>,
}

impl OtlpReceiver {
    /// Creates a receiver.
    pub fn new(config: ReceiverConfig, pipeline: Arc<MetricsPipeline>) -> Self {
        Self { config, pipeline }
    }

    /// Runs the receivers until `shutdown` completes or a server stops.
    pub async fn run_until<F>(self: Arc<Self>, shutdown: F) -> Result<()>
    where
        F: std::future::Future<Output = ()>,
    {
        let grpc_addr = self.config.grpc_addr;
        let mut grpc_handle = {
            let receiver = Arc::clone(&self);
            tokio::spawn(async move { receiver.start_grpc(grpc_addr).await })
        };

        let mut http_handle = match self.config.http_addr {
            Some(addr) => {
                let receiver = Arc::clone(&self);
                Some(tokio::spawn(async move { receiver.start_http(addr).await }))
            },
            None => None,
        };

        let http_done = async {
            match http_handle.as_mut() {
                Some(handle) => handle.await,
                None => std::future::pending().await,
            }
        };

        let result = tokio::select! {
            _ = shutdown => {
                tracing::info!("Received shutdown signal, stopping receivers");
                Ok(())
            }
            result = &mut grpc_handle => {
                tracing::warn!("GRPC server stopped unexpectedly");
                result.unwrap_or_else(|e| Err(e.into()))
            }
            result = http_done => {
                tracing::warn!("HTTP server stopped unexpectedly");
                result.unwrap_or_else(|e| Err(e.into()))
            }
        };

        grpc_handle.abort();
        if let Some(handle) = http_handle {
            handle.abort();
        }
        result
    }

    /// Serves the OTLP/gRPC metrics service.
    pub async fn start_grpc(self: Arc<Self>, addr: SocketAddr) -> Result<()> {
        let service = MetricsServiceServer::new(GrpcMetricsService::new(Arc::clone(&self.pipeline)));

        tracing::info!("GRPC metrics receiver listening on {}", addr);

        Server::builder()
            .add_service(service)
            .serve(addr)
            .await
            .map_err(|e| {
                if e.to_string().contains("Address already in use") {
                    Otlp2ddError::network(format!("Port {} already in use", addr.port()))
                } else {
                    Otlp2ddError::network(format!("GRPC server error on {}: {}", addr, e))
                }
            })
    }

    /// Serves the OTLP/HTTP metrics endpoint.
    pub async fn start_http(self: Arc<Self>, addr: SocketAddr) -> Result<()> {
        let app = http::create_http_router(Arc::clone(&self.pipeline));

        let listener = tokio::net::TcpListener::bind(addr).await.map_err(|e| {
            Otlp2ddError::network(format!("Failed to bind HTTP server to {}: {}", addr, e))
        })?;

        tracing::info!("HTTP metrics receiver listening on {}", addr);

        axum::serve(listener, app)
            .await
            .map_err(|e| Otlp2ddError::network(format!("HTTP server error: {}", e)))
    }
}

/// gRPC `MetricsService` backed by the pipeline.
#[derive(Debug, Clone)]
pub struct GrpcMetricsService {
    pipeline: Arc<MetricsPipeline>,
}

impl GrpcMetricsService {
    /// Creates the service.
    pub fn new(pipeline: Arc<MetricsPipeline>) -> Self {
        Self { pipeline }
    }
}

#[tonic::async_trait]
impl MetricsService for GrpcMetricsService {
    async fn export(
        &self,
        request: Request<ExportMetricsServiceRequest>,
    ) -> std::result::Result<Response<ExportMetricsServiceResponse>, Status> {
        let request = request.into_inner();
        tracing::debug!("Received {} resource metrics via gRPC", request.resource_metrics.len());

        let summary = self.pipeline.consume(request).await.map_err(|e| {
            tracing::error!("Failed to deliver series: {}", e);
            Status::unavailable(e.to_string())
        })?;

        Ok(Response::new(export_response(summary)))
    }
}

/// Builds the OTLP response, reporting dropped datapoints as rejected.
pub fn export_response(summary: ExportSummary) -> ExportMetricsServiceResponse {
    let partial_success = (summary.dropped > 0).then(|| ExportMetricsPartialSuccess {
        rejected_data_points: summary.dropped as i64,
        error_message: format!("{} datapoints of unsupported metric kinds dropped", summary.dropped),
    });

    ExportMetricsServiceResponse { partial_success }
}
