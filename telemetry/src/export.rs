//! Logging span exporter.
//!
//! [`LoggingSpanExporter`] decorates an underlying span-export transport with
//! observability logging: every batch handed over by the batch processor
//! produces exactly one log line stating how many spans were exported (info)
//! or lost (error). Export semantics are otherwise untouched — the inner
//! result is returned to the caller unchanged and no retries are performed
//! here. Retry and backoff, if any, are the wrapped exporter's concern.

use opentelemetry_sdk::error::OTelSdkResult;
use opentelemetry_sdk::trace::{SpanData, SpanExporter};
use opentelemetry_sdk::Resource;
use std::time::Duration;

/// A pass-through span exporter that logs the outcome of each export call.
///
/// Export failures are reported through the returned status and an
/// error-level log line; they are never escalated further, so span loss on
/// transport failure is visible only in the log record.
#[derive(Debug)]
pub struct LoggingSpanExporter<E> {
    inner: E,
}

impl<E> LoggingSpanExporter<E> {
    /// Wraps `inner`, leaving its export behavior unchanged.
    pub fn new(inner: E) -> Self {
        Self { inner }
    }
}

impl<E: SpanExporter> SpanExporter for LoggingSpanExporter<E> {
    async fn export(&self, batch: Vec<SpanData>) -> OTelSdkResult {
        let count = batch.len();
        match self.inner.export(batch).await {
            Ok(()) => {
                tracing::info!("Successfully exported {count} spans.");
                Ok(())
            }
            Err(err) => {
                tracing::error!(error = %err, "Failed to export {count} spans.");
                Err(err)
            }
        }
    }

    fn shutdown_with_timeout(&mut self, timeout: Duration) -> OTelSdkResult {
        self.inner.shutdown_with_timeout(timeout)
    }

    fn shutdown(&mut self) -> OTelSdkResult {
        self.inner.shutdown()
    }

    fn force_flush(&mut self) -> OTelSdkResult {
        self.inner.force_flush()
    }

    fn set_resource(&mut self, resource: &Resource) {
        self.inner.set_resource(resource);
    }
}
