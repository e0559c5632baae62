//! Tracer provider bootstrap.
//!
//! Builds the OTLP export pipeline (service resource, OTLP transport wrapped
//! in [`LoggingSpanExporter`], batching processor, sampler) and registers it
//! as the process-wide tracer source so instrumentation hooks can obtain
//! tracers. Construction, flushing and shutdown flow through the returned
//! [`Telemetry`] handle, keeping initialization order deterministic and the
//! bootstrap testable.

use crate::config::{OtlpProtocol, TelemetryConfig};
use crate::error::TelemetryError;
use crate::export::LoggingSpanExporter;
use opentelemetry::{global, KeyValue};
use opentelemetry_otlp::{Protocol, WithExportConfig};
use opentelemetry_sdk::error::OTelSdkResult;
use opentelemetry_sdk::trace::{RandomIdGenerator, Sampler, SdkTracerProvider};
use opentelemetry_sdk::Resource;
use opentelemetry_semantic_conventions::resource as semconv;
use std::sync::atomic::{AtomicBool, Ordering};

static INITIALIZED: AtomicBool = AtomicBool::new(false);

/// Handle to the initialized tracer provider.
///
/// The handle owns the provider for the process lifetime. Dropping it shuts
/// the provider down and flushes pending spans; in normal operation the
/// handle is simply kept alive until process exit.
#[derive(Debug)]
pub struct Telemetry {
    provider: SdkTracerProvider,
    shut_down: bool,
}

impl Telemetry {
    /// Returns the underlying tracer provider.
    #[must_use]
    pub fn provider(&self) -> &SdkTracerProvider {
        &self.provider
    }

    /// Flushes all pending spans through the export pipeline.
    ///
    /// # Errors
    ///
    /// Returns an error if the provider has already been shut down or the
    /// flush times out.
    pub fn force_flush(&self) -> OTelSdkResult {
        self.provider.force_flush()
    }

    /// Shuts the provider down, flushing pending spans.
    ///
    /// Subsequent calls are no-ops.
    ///
    /// # Errors
    ///
    /// Returns an error if the final flush fails or times out.
    pub fn shutdown(&mut self) -> OTelSdkResult {
        if self.shut_down {
            return Ok(());
        }
        self.shut_down = true;
        self.provider.shutdown()
    }
}

impl Drop for Telemetry {
    fn drop(&mut self) {
        if let Err(err) = self.shutdown() {
            tracing::warn!(error = %err, "failed to shut down tracer provider");
        }
    }
}

/// Builds a tracer provider for the given configuration without touching any
/// process-global state.
///
/// The provider exports spans through an OTLP transport wrapped in a
/// [`LoggingSpanExporter`], batched by the SDK's batch span processor, and
/// samples according to `config.sample_ratio`.
///
/// Must be called from within a Tokio runtime when the gRPC protocol is
/// selected; the tonic transport requires one.
///
/// # Errors
///
/// Returns an error if the OTLP span exporter cannot be constructed.
pub fn build_tracer_provider(
    config: &TelemetryConfig,
) -> Result<SdkTracerProvider, TelemetryError> {
    let exporter = build_otlp_exporter(config)?;
    let exporter = LoggingSpanExporter::new(exporter);

    let provider = SdkTracerProvider::builder()
        .with_batch_exporter(exporter)
        .with_resource(build_resource(config))
        .with_sampler(sampler_for(config.sample_ratio))
        .with_id_generator(RandomIdGenerator::default())
        .build();

    Ok(provider)
}

/// Initializes telemetry for the whole process.
///
/// Builds a tracer provider via [`build_tracer_provider`] and registers it
/// as the global tracer provider so that instrumentation hooks (web
/// framework middleware, database driver instrumentation) can obtain
/// tracers. The returned [`Telemetry`] handle owns the provider and must be
/// kept alive for the process lifetime.
///
/// Log lines emitted here (and by the export pipeline before
/// [`crate::init_subscriber`] runs) are only visible if a `tracing`
/// subscriber is already installed. The OpenTelemetry bridge layer needs the
/// provider built here, so the usual order is `init_telemetry` then
/// `init_subscriber`; install a plain fmt subscriber beforehand if the
/// initialization lines themselves must be captured.
///
/// # Errors
///
/// Returns [`TelemetryError::AlreadyInitialized`] on a second call, or an
/// exporter build error if the OTLP transport cannot be constructed.
pub fn init_telemetry(config: &TelemetryConfig) -> Result<Telemetry, TelemetryError> {
    if INITIALIZED.swap(true, Ordering::SeqCst) {
        tracing::warn!("Tracer provider already set. Skipping re-initialization.");
        return Err(TelemetryError::AlreadyInitialized);
    }

    let provider = match build_tracer_provider(config) {
        Ok(provider) => provider,
        Err(err) => {
            INITIALIZED.store(false, Ordering::SeqCst);
            return Err(err);
        }
    };

    global::set_tracer_provider(provider.clone());

    tracing::info!(
        service = %config.service_name,
        endpoint = %config.endpoint,
        protocol = ?config.protocol,
        "OpenTelemetry tracer provider initialized"
    );

    Ok(Telemetry {
        provider,
        shut_down: false,
    })
}

fn build_otlp_exporter(
    config: &TelemetryConfig,
) -> Result<opentelemetry_otlp::SpanExporter, TelemetryError> {
    let exporter = match config.protocol {
        OtlpProtocol::Grpc => opentelemetry_otlp::SpanExporter::builder()
            .with_tonic()
            .with_endpoint(config.traces_endpoint())
            .with_timeout(config.export_timeout)
            .build()?,
        OtlpProtocol::HttpProtobuf => opentelemetry_otlp::SpanExporter::builder()
            .with_http()
            .with_protocol(Protocol::HttpBinary)
            .with_endpoint(config.traces_endpoint())
            .with_timeout(config.export_timeout)
            .build()?,
    };
    Ok(exporter)
}

fn build_resource(config: &TelemetryConfig) -> Resource {
    Resource::builder()
        .with_service_name(config.service_name.clone())
        .with_attributes([
            KeyValue::new(semconv::SERVICE_VERSION, config.service_version.clone()),
            KeyValue::new(semconv::SERVICE_NAMESPACE, config.service_namespace.clone()),
            KeyValue::new(
                semconv::SERVICE_INSTANCE_ID,
                config.service_instance_id.clone(),
            ),
            KeyValue::new(
                "deployment.environment",
                config.deployment_environment.clone(),
            ),
        ])
        .build()
}

fn sampler_for(ratio: f64) -> Sampler {
    if ratio >= 1.0 {
        Sampler::AlwaysOn
    } else if ratio <= 0.0 {
        Sampler::AlwaysOff
    } else {
        Sampler::ParentBased(Box::new(Sampler::TraceIdRatioBased(ratio)))
    }
}
