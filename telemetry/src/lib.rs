//! Notetrace Telemetry Library
//!
//! This crate wires span-producing instrumentation to an OTLP collector for
//! the notes application processes. It provides:
//!
//! - [`LoggingSpanExporter`] - a pass-through decorator over any span
//!   exporter that logs the outcome of every export batch
//! - [`init_telemetry`] - process-wide tracer provider bootstrap (service
//!   resource, OTLP transport, batching, sampling, global registration)
//! - [`init_subscriber`] - console logging plus the `tracing` →
//!   OpenTelemetry bridge
//!
//! # Example
//!
//! ```no_run
//! use telemetry::{init_subscriber, init_telemetry, TelemetryConfig, TelemetryError};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), TelemetryError> {
//!     let config = TelemetryConfig::from_env()?;
//!     let telemetry = init_telemetry(&config)?;
//!     init_subscriber(&telemetry)?;
//!
//!     // Instrumentation hooks now obtain tracers from the global provider.
//!     Ok(())
//! }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod config;
mod error;
pub mod export;
pub mod provider;
pub mod subscriber;

pub use config::{OtlpProtocol, TelemetryConfig};
pub use error::TelemetryError;
pub use export::LoggingSpanExporter;
pub use provider::{build_tracer_provider, init_telemetry, Telemetry};
pub use subscriber::init_subscriber;
