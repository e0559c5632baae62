//! Error types for telemetry initialization.

use thiserror::Error;

/// Errors that can occur while configuring or initializing telemetry.
#[derive(Debug, Error)]
pub enum TelemetryError {
    /// A configuration value could not be parsed.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// The OTLP span exporter could not be constructed.
    #[error("failed to build OTLP span exporter: {0}")]
    ExporterBuild(#[from] opentelemetry_otlp::ExporterBuildError),

    /// The global tracing subscriber could not be installed.
    #[error("failed to install tracing subscriber: {0}")]
    Subscriber(#[from] tracing_subscriber::util::TryInitError),

    /// The tracer provider has already been initialized for this process.
    #[error("telemetry already initialized for this process")]
    AlreadyInitialized,
}
