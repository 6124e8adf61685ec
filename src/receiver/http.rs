//! HTTP OTLP receiver implementation.
//!
//! Implements OTLP/HTTP for metrics on `/v1/metrics` (port 4318 by
//! default). Binary protobuf (`application/x-protobuf` or
//! `application/octet-stream`) and JSON (`application/json`, also assumed
//! when no content type is given) are accepted; the response uses the
//! request's encoding.

use crate::receiver::{json, otlp, ExportSummary, MetricsPipeline};
use axum::{
    body::Bytes,
    extract::State,
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use prost::Message;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

const PROTOBUF_CONTENT_TYPE: &str = "application/x-protobuf";
const OCTET_STREAM_CONTENT_TYPE: &str = "application/octet-stream";
const JSON_CONTENT_TYPE: &str = "application/json";

/// Wire encoding of an OTLP/HTTP request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    /// Binary protobuf
    Protobuf,
    /// Protobuf JSON mapping
    Json,
}

impl Encoding {
    /// Picks the encoding from a `Content-Type` value.
    ///
    /// Returns `None` for unsupported media types.
    pub fn from_content_type(content_type: Option<&str>) -> Option<Self> {
        let media_type = match content_type {
            Some(value) => value.split(';').next().unwrap_or_default().trim(),
            None => return Some(Encoding::Json),
        };

        if media_type.eq_ignore_ascii_case(PROTOBUF_CONTENT_TYPE)
            || media_type.eq_ignore_ascii_case(OCTET_STREAM_CONTENT_TYPE)
        {
            Some(Encoding::Protobuf)
        } else if media_type.eq_ignore_ascii_case(JSON_CONTENT_TYPE) {
            Some(Encoding::Json)
        } else {
            None
        }
    }
}

/// HTTP receiver state.
#[derive(Debug, Clone)]
pub struct HttpState {
    /// Shared metrics pipeline
    pub pipeline: Arc<MetricsPipeline>,
}

/// Create HTTP router for OTLP endpoints.
pub fn create_http_router(pipeline: Arc<MetricsPipeline>) -> Router {
    let state = HttpState { pipeline };

    Router::new()
        .route("/v1/metrics", post(handle_metrics_v1))
        .route("/health", get(health_check))
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
        .with_state(state)
}

/// Handle OTLP metrics export requests.
async fn handle_metrics_v1(
    State(state): State<HttpState>,
    headers: HeaderMap,
    body: Bytes,
) -> std::result::Result<Response, HttpError> {
    tracing::debug!("Received HTTP metrics export request, {} bytes", body.len());

    let content_type = headers
        .get(header::CONTENT_TYPE)
        .map(|v| v.to_str().unwrap_or_default());

    tracing::debug!("Content-Type: {:?}", content_type);

    let encoding = Encoding::from_content_type(content_type).ok_or_else(|| {
        HttpError::UnsupportedMediaType(content_type.unwrap_or_default().to_string())
    })?;

    let request = match encoding {
        Encoding::Protobuf => otlp::decode_request(&body),
        Encoding::Json => json::parse_request(&body),
    }
    .map_err(|e| HttpError::BadRequest(e.to_string()))?;

    let summary = state.pipeline.consume(request).await.map_err(|e| {
        tracing::error!("Failed to deliver series: {}", e);
        HttpError::Unavailable(e.to_string())
    })?;

    Ok(export_response(summary, encoding))
}

fn export_response(summary: ExportSummary, encoding: Encoding) -> Response {
    let response = super::export_response(summary);
    match encoding {
        Encoding::Protobuf => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, HeaderValue::from_static(PROTOBUF_CONTENT_TYPE))],
            response.encode_to_vec(),
        )
            .into_response(),
        Encoding::Json => (StatusCode::OK, Json(json::response_body(&response))).into_response(),
    }
}

/// Health check endpoint.
async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "service": "otlp2dd",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// HTTP-specific error type.
#[derive(Debug)]
pub enum HttpError {
    /// Undecodable body
    BadRequest(String),
    /// Content type other than protobuf or JSON
    UnsupportedMediaType(String),
    /// Sink delivery failed
    Unavailable(String),
}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            HttpError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            HttpError::UnsupportedMediaType(content_type) => (
                StatusCode::UNSUPPORTED_MEDIA_TYPE,
                format!(
                    "Unsupported content type '{}', expected {} or {}",
                    content_type, PROTOBUF_CONTENT_TYPE, JSON_CONTENT_TYPE
                ),
            ),
            HttpError::Unavailable(msg) => (StatusCode::SERVICE_UNAVAILABLE, msg),
        };

        let body = Json(serde_json::json!({
            "error": error_message,
            "status": status.as_u16()
        }));

        (status, body).into_response()
    }
}

impl std::fmt::Display for HttpError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HttpError::BadRequest(msg) => write!(f, "Bad Request: {}", msg),
            HttpError::UnsupportedMediaType(ct) => write!(f, "Unsupported Media Type: {}", ct),
            HttpError::Unavailable(msg) => write!(f, "Service Unavailable: {}", msg),
        }
    }
}

impl std::error::Error for HttpError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_status_codes() {
        let cases = [
            (HttpError::BadRequest("x".into()), StatusCode::BAD_REQUEST),
            (
                HttpError::UnsupportedMediaType("application/json".into()),
                StatusCode::UNSUPPORTED_MEDIA_TYPE,
            ),
            (HttpError::Unavailable("x".into()), StatusCode::SERVICE_UNAVAILABLE),
        ];
        for (error, status) in cases {
            assert_eq!(error.into_response().status(), status);
        }
    }

    #[test]
    fn test_encoding_from_content_type() {
        let cases = [
            (Some("application/x-protobuf"), Some(Encoding::Protobuf)),
            (Some("application/octet-stream"), Some(Encoding::Protobuf)),
            (Some("Application/X-Protobuf; charset=binary"), Some(Encoding::Protobuf)),
            (Some("application/json"), Some(Encoding::Json)),
            (Some("application/json; charset=utf-8"), Some(Encoding::Json)),
            (None, Some(Encoding::Json)),
            (Some("text/plain"), None),
            (Some("application/x-protobuf-extra"), None),
        ];
        for (content_type, expected) in cases {
            assert_eq!(Encoding::from_content_type(content_type), expected, "{:?}", content_type);
        }
    }

    #[test]
    fn test_response_follows_request_encoding() {
        let summary = ExportSummary {
            series: 1,
            dropped: 2,
        };

        let response = export_response(summary, Encoding::Protobuf);
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).unwrap(),
            PROTOBUF_CONTENT_TYPE
        );

        let response = export_response(summary, Encoding::Json);
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers().get(header::CONTENT_TYPE).unwrap(), JSON_CONTENT_TYPE);
    }
}
