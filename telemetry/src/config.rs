//! Telemetry configuration module.
//!
//! Handles loading configuration from environment variables with sensible defaults.

use crate::error::TelemetryError;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::time::Duration;

/// Default OTLP collector endpoint.
pub const DEFAULT_ENDPOINT: &str = "http://localhost:4317";

/// Default service name reported on spans.
pub const DEFAULT_SERVICE_NAME: &str = "notes-web-service";

const DEFAULT_EXPORT_TIMEOUT_MS: u64 = 10_000;

/// Wire protocol used to ship spans to the collector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OtlpProtocol {
    /// OTLP over gRPC (port 4317).
    #[serde(rename = "grpc")]
    Grpc,
    /// OTLP over HTTP with protobuf payloads (port 4318).
    #[serde(rename = "http/protobuf")]
    HttpProtobuf,
}

impl Default for OtlpProtocol {
    fn default() -> Self {
        Self::Grpc
    }
}

impl FromStr for OtlpProtocol {
    type Err = TelemetryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "grpc" => Ok(Self::Grpc),
            "http/protobuf" | "http" => Ok(Self::HttpProtobuf),
            other => Err(TelemetryError::InvalidConfig(format!(
                "unknown OTLP protocol '{other}', expected 'grpc' or 'http/protobuf'"
            ))),
        }
    }
}

/// Telemetry configuration.
///
/// Configuration values can be set via environment variables:
/// - `OTEL_SERVICE_NAME`: service name reported on spans (default: "notes-web-service")
/// - `OTEL_EXPORTER_OTLP_ENDPOINT`: collector endpoint (default: "http://localhost:4317")
/// - `OTEL_EXPORTER_OTLP_PROTOCOL`: "grpc" or "http/protobuf" (default: "grpc")
/// - `OTEL_TRACES_SAMPLER_ARG`: sampling ratio in `0.0..=1.0` (default: 1.0)
/// - `OTEL_EXPORTER_OTLP_TIMEOUT`: export timeout in milliseconds (default: 10000)
/// - `SERVICE_VERSION`, `SERVICE_NAMESPACE`, `DEPLOYMENT_ENV`, `HOSTNAME`: resource attributes
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetryConfig {
    /// Service name reported on spans.
    pub service_name: String,
    /// OTLP collector endpoint URL.
    pub endpoint: String,
    /// Wire protocol for span export.
    pub protocol: OtlpProtocol,
    /// Sampling ratio (0.0 = none, 1.0 = all).
    pub sample_ratio: f64,
    /// Service version resource attribute.
    pub service_version: String,
    /// Deployment environment resource attribute.
    pub deployment_environment: String,
    /// Service namespace resource attribute.
    pub service_namespace: String,
    /// Service instance id resource attribute.
    pub service_instance_id: String,
    /// Timeout applied to each export call.
    pub export_timeout: Duration,
}

impl TelemetryConfig {
    /// Creates a new configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - `OTEL_EXPORTER_OTLP_PROTOCOL` is set to an unknown protocol name
    /// - `OTEL_TRACES_SAMPLER_ARG` or `OTEL_EXPORTER_OTLP_TIMEOUT` cannot be parsed
    pub fn from_env() -> Result<Self, TelemetryError> {
        let service_name = std::env::var("OTEL_SERVICE_NAME")
            .unwrap_or_else(|_| DEFAULT_SERVICE_NAME.to_string());

        let endpoint = std::env::var("OTEL_EXPORTER_OTLP_ENDPOINT")
            .unwrap_or_else(|_| DEFAULT_ENDPOINT.to_string());

        let protocol = std::env::var("OTEL_EXPORTER_OTLP_PROTOCOL")
            .ok()
            .map(|p| p.parse())
            .transpose()?
            .unwrap_or_default();

        let sample_ratio = std::env::var("OTEL_TRACES_SAMPLER_ARG")
            .ok()
            .map(|v| parse_sample_ratio(&v))
            .transpose()?
            .unwrap_or(1.0);

        let export_timeout_ms = std::env::var("OTEL_EXPORTER_OTLP_TIMEOUT")
            .ok()
            .map(|v| parse_timeout_ms(&v))
            .transpose()?
            .unwrap_or(DEFAULT_EXPORT_TIMEOUT_MS);

        let service_version =
            std::env::var("SERVICE_VERSION").unwrap_or_else(|_| "1.0.0".to_string());
        let deployment_environment =
            std::env::var("DEPLOYMENT_ENV").unwrap_or_else(|_| "kubernetes".to_string());
        let service_namespace =
            std::env::var("SERVICE_NAMESPACE").unwrap_or_else(|_| "notes-app".to_string());
        let service_instance_id =
            std::env::var("HOSTNAME").unwrap_or_else(|_| "unknown-instance".to_string());

        Ok(Self {
            service_name,
            endpoint,
            protocol,
            sample_ratio,
            service_version,
            deployment_environment,
            service_namespace,
            service_instance_id,
            export_timeout: Duration::from_millis(export_timeout_ms),
        })
    }

    /// Returns the endpoint the span exporter should target.
    ///
    /// For gRPC the configured endpoint is used as-is. For HTTP the OTLP
    /// traces signal path `/v1/traces` is appended unless already present.
    #[must_use]
    pub fn traces_endpoint(&self) -> String {
        match self.protocol {
            OtlpProtocol::Grpc => self.endpoint.clone(),
            OtlpProtocol::HttpProtobuf => {
                let base = self.endpoint.trim_end_matches('/');
                if base.ends_with("/v1/traces") {
                    base.to_string()
                } else {
                    format!("{base}/v1/traces")
                }
            }
        }
    }
}

/// Parses a sampling ratio, clamping the result to `0.0..=1.0`.
fn parse_sample_ratio(value: &str) -> Result<f64, TelemetryError> {
    value
        .parse::<f64>()
        .map_err(|e| TelemetryError::InvalidConfig(format!("OTEL_TRACES_SAMPLER_ARG: {e}")))
        .map(|ratio| ratio.clamp(0.0, 1.0))
}

/// Parses an export timeout given in milliseconds.
fn parse_timeout_ms(value: &str) -> Result<u64, TelemetryError> {
    value
        .parse::<u64>()
        .map_err(|e| TelemetryError::InvalidConfig(format!("OTEL_EXPORTER_OTLP_TIMEOUT: {e}")))
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            service_name: DEFAULT_SERVICE_NAME.to_string(),
            endpoint: DEFAULT_ENDPOINT.to_string(),
            protocol: OtlpProtocol::default(),
            sample_ratio: 1.0,
            service_version: "1.0.0".to_string(),
            deployment_environment: "kubernetes".to_string(),
            service_namespace: "notes-app".to_string(),
            service_instance_id: "unknown-instance".to_string(),
            export_timeout: Duration::from_millis(DEFAULT_EXPORT_TIMEOUT_MS),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default_values() {
        let config = TelemetryConfig::default();
        assert_eq!(config.service_name, "notes-web-service");
        assert_eq!(config.endpoint, "http://localhost:4317");
        assert_eq!(config.protocol, OtlpProtocol::Grpc);
        assert!((config.sample_ratio - 1.0).abs() < f64::EPSILON);
        assert_eq!(config.export_timeout, Duration::from_millis(10_000));
    }

    #[test]
    fn test_protocol_parse() {
        assert_eq!("grpc".parse::<OtlpProtocol>().unwrap(), OtlpProtocol::Grpc);
        assert_eq!(
            "http/protobuf".parse::<OtlpProtocol>().unwrap(),
            OtlpProtocol::HttpProtobuf
        );
        assert_eq!(
            " GRPC ".parse::<OtlpProtocol>().unwrap(),
            OtlpProtocol::Grpc
        );
        assert!("thrift".parse::<OtlpProtocol>().is_err());
    }

    #[test]
    fn test_protocol_serde_names() {
        assert_eq!(
            serde_json::to_string(&OtlpProtocol::Grpc).unwrap(),
            "\"grpc\""
        );
        assert_eq!(
            serde_json::to_string(&OtlpProtocol::HttpProtobuf).unwrap(),
            "\"http/protobuf\""
        );
    }

    #[test]
    fn test_sample_ratio_is_clamped() {
        assert!((parse_sample_ratio("0.25").unwrap() - 0.25).abs() < f64::EPSILON);
        assert!((parse_sample_ratio("2.5").unwrap() - 1.0).abs() < f64::EPSILON);
        assert!(parse_sample_ratio("-0.5").unwrap().abs() < f64::EPSILON);
    }

    #[test]
    fn test_malformed_sample_ratio_is_rejected() {
        let err = parse_sample_ratio("always").unwrap_err();
        assert!(matches!(err, TelemetryError::InvalidConfig(_)));
        assert!(err.to_string().contains("OTEL_TRACES_SAMPLER_ARG"));
    }

    #[test]
    fn test_timeout_parse() {
        assert_eq!(parse_timeout_ms("2500").unwrap(), 2500);

        let err = parse_timeout_ms("2.5s").unwrap_err();
        assert!(matches!(err, TelemetryError::InvalidConfig(_)));
        assert!(err.to_string().contains("OTEL_EXPORTER_OTLP_TIMEOUT"));
    }

    #[test]
    fn test_traces_endpoint_grpc_unchanged() {
        let config = TelemetryConfig {
            endpoint: "http://collector:4317".to_string(),
            ..TelemetryConfig::default()
        };
        assert_eq!(config.traces_endpoint(), "http://collector:4317");
    }

    #[test]
    fn test_traces_endpoint_http_appends_signal_path() {
        let config = TelemetryConfig {
            endpoint: "http://collector:4318/".to_string(),
            protocol: OtlpProtocol::HttpProtobuf,
            ..TelemetryConfig::default()
        };
        assert_eq!(config.traces_endpoint(), "http://collector:4318/v1/traces");

        let config = TelemetryConfig {
            endpoint: "http://collector:4318/v1/traces".to_string(),
            protocol: OtlpProtocol::HttpProtobuf,
            ..TelemetryConfig::default()
        };
        assert_eq!(config.traces_endpoint(), "http://collector:4318/v1/traces");
    }
}
