//! Tracing subscriber wiring.
//!
//! Installs the process-wide `tracing` subscriber: a fmt layer for console
//! logs (filtered via `RUST_LOG`, defaulting to `info`) and an OpenTelemetry
//! layer that bridges `tracing` spans into the tracer provider, so
//! framework and database instrumentation emitting `tracing` spans feed the
//! export pipeline.

use crate::error::TelemetryError;
use crate::provider::Telemetry;
use opentelemetry::trace::TracerProvider as _;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Installs the global tracing subscriber bound to the given telemetry
/// handle.
///
/// Call once at startup, after [`crate::init_telemetry`].
///
/// # Errors
///
/// Returns an error if a global subscriber has already been installed.
pub fn init_subscriber(telemetry: &Telemetry) -> Result<(), TelemetryError> {
    let tracer = telemetry.provider().tracer("notetrace");

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let fmt_layer = tracing_subscriber::fmt::layer().with_target(true);
    let otel_layer = tracing_opentelemetry::layer().with_tracer(tracer);

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .with(otel_layer)
        .try_init()?;

    Ok(())
}
