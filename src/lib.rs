//! otlp2dd - OTLP metrics to Datadog series translator.
//!
//! otlp2dd receives OpenTelemetry metrics over OTLP/gRPC and OTLP/HTTP and
//! turns them into flat, tagged Datadog series.
//!
//! # Features
//!
//! - **OTEL Protocol Support**: GRPC (port 4317) and HTTP (port 4318) receivers
//! - **Rate Conversion**: cumulative monotonic sums become per-second rates
//! - **Histogram Expansion**: `.count`, `.sum` and optional per-bucket series
//! - **Bounded Memory**: per-series counter state expires after a TTL
//!
//! # Architecture
//!
//! - `translator`: tag canonicalization, rate engine, mapper and driver
//! - `storage`: expiring key-value store with a background sweeper
//! - `receiver`: OTLP protocol implementation
//! - `export`: namespace, host and tag post-processing, series sinks
//! - `host`: host identity from resource attributes
//! - `core`: domain models, configuration and errors
//! - `cli`: command-line interface
//!
//! # Example
//!
//! ```no_run
//! use otlp2dd_lib::core::Config;
//! use otlp2dd_lib::Application;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::default();
//!     let app = Application::new(config)?;
//!     app.run().await?;
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

pub mod application;
pub mod cli;
pub mod core;
pub mod export;
pub mod host;
pub mod receiver;
pub mod storage;
pub mod translator;

// Re-export core types for convenience
pub use crate::application::Application;
pub use crate::core::{Config, Result};
pub use crate::translator::{Translation, Translator};
