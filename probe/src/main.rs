//! Notetrace Database Probe
//!
//! Background tracing probe that runs as a sibling process to the database
//! server inside the database container. It bootstraps its own tracer
//! provider and periodically emits diagnostic spans describing database
//! reachability, independent of the main application's request path.
//!
//! The container entrypoint launches this binary before the database server
//! takes over as the foreground process. A failure to initialize telemetry
//! exits non-zero, which the entrypoint treats as fatal; probe failures
//! after startup are logged and recorded on spans but never abort the
//! process, since the database server is the container's main process.

#![deny(unsafe_code)]

use anyhow::Result;
use clap::Parser;
use opentelemetry::global::{self, BoxedTracer};
use opentelemetry::trace::{Span, SpanKind, Status, TraceContextExt, Tracer};
use opentelemetry::KeyValue;
use std::time::{Duration, Instant};
use telemetry::{init_subscriber, init_telemetry, TelemetryConfig};
use tokio::net::TcpStream;
use tokio::time::{timeout, MissedTickBehavior};

/// Service name reported when `OTEL_SERVICE_NAME` is not set.
const PROBE_SERVICE_NAME: &str = "postgresql";

/// Notetrace database probe - emits diagnostic spans for the database container
#[derive(Parser)]
#[command(name = "notetrace-probe")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Database host to probe
    #[arg(long, env = "DB_HOST", default_value = "127.0.0.1")]
    db_host: String,

    /// Database port to probe
    #[arg(long, env = "DB_PORT", default_value_t = 5432)]
    db_port: u16,

    /// Database name reported on probe spans
    #[arg(long, env = "DB_NAME", default_value = "notes")]
    db_name: String,

    /// Database user reported on probe spans
    #[arg(long, env = "DB_USER", default_value = "django")]
    db_user: String,

    /// Seconds between probe spans
    #[arg(long, env = "PROBE_INTERVAL_SECONDS", default_value_t = 30)]
    interval_seconds: u64,

    /// Seconds to wait for a TCP connect before reporting failure
    #[arg(long, env = "PROBE_CONNECT_TIMEOUT_SECONDS", default_value_t = 5)]
    connect_timeout_seconds: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let mut config = TelemetryConfig::from_env()?;
    if std::env::var("OTEL_SERVICE_NAME").is_err() {
        config.service_name = PROBE_SERVICE_NAME.to_string();
    }

    // Any failure here is fatal: the container entrypoint aborts startup on
    // a non-zero exit from the probe.
    let mut telemetry = init_telemetry(&config)?;
    init_subscriber(&telemetry)?;

    tracing::info!(
        service = %config.service_name,
        endpoint = %config.endpoint,
        host = %cli.db_host,
        port = cli.db_port,
        interval_seconds = cli.interval_seconds,
        "database tracing probe starting"
    );
    log_environment();

    let tracer = global::tracer("notetrace-probe");
    emit_startup_span(&tracer, &cli);
    tracing::info!("PostgreSQL tracing initialized");

    let mut ticker = tokio::time::interval(Duration::from_secs(cli.interval_seconds.max(1)));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = ticker.tick() => probe_database(&tracer, &cli).await,
            () = &mut shutdown => break,
        }
    }

    tracing::info!("flushing pending spans and shutting down");
    if let Err(err) = telemetry.shutdown() {
        tracing::warn!(error = %err, "failed to flush spans on shutdown");
    }

    Ok(())
}

/// Logs which telemetry environment overrides are in effect.
fn log_environment() {
    for key in [
        "OTEL_SERVICE_NAME",
        "OTEL_EXPORTER_OTLP_ENDPOINT",
        "OTEL_EXPORTER_OTLP_PROTOCOL",
        "OTEL_TRACES_SAMPLER_ARG",
    ] {
        match std::env::var(key) {
            Ok(value) => tracing::debug!(%key, %value, "environment override"),
            Err(_) => tracing::debug!(%key, "using default"),
        }
    }
}

/// Emits a single span marking probe startup inside the database container.
fn emit_startup_span(tracer: &BoxedTracer, cli: &Cli) {
    tracer.in_span("postgresql-startup", |cx| {
        let span = cx.span();
        span.set_attribute(KeyValue::new("db.system", "postgresql"));
        span.set_attribute(KeyValue::new("probe.version", env!("CARGO_PKG_VERSION")));
        span.set_attribute(KeyValue::new("server.address", cli.db_host.clone()));
        span.set_attribute(KeyValue::new("server.port", i64::from(cli.db_port)));
    });
}

/// Emits one probe span describing database reachability.
///
/// A failed or timed-out connect is recorded on the span and logged; it is
/// not fatal, the database may still be starting up.
async fn probe_database(tracer: &BoxedTracer, cli: &Cli) {
    let mut span = tracer
        .span_builder("postgresql-probe")
        .with_kind(SpanKind::Client)
        .with_attributes(probe_attributes(cli))
        .start(tracer);

    let started = Instant::now();
    let connect = TcpStream::connect((cli.db_host.as_str(), cli.db_port));

    match timeout(Duration::from_secs(cli.connect_timeout_seconds), connect).await {
        Ok(Ok(_stream)) => {
            let elapsed_ms = i64::try_from(started.elapsed().as_millis()).unwrap_or(i64::MAX);
            span.set_attribute(KeyValue::new("db.probe.duration_ms", elapsed_ms));
            span.set_status(Status::Ok);
            tracing::debug!(host = %cli.db_host, port = cli.db_port, elapsed_ms, "database reachable");
        }
        Ok(Err(err)) => {
            span.set_status(Status::error(err.to_string()));
            tracing::error!(host = %cli.db_host, port = cli.db_port, error = %err, "database probe failed");
        }
        Err(_) => {
            span.set_status(Status::error("connect timed out"));
            tracing::error!(host = %cli.db_host, port = cli.db_port, "database probe timed out");
        }
    }

    span.end();
}

/// Attributes identifying the probed database on every probe span.
fn probe_attributes(cli: &Cli) -> Vec<KeyValue> {
    vec![
        KeyValue::new("db.system", "postgresql"),
        KeyValue::new("db.name", cli.db_name.clone()),
        KeyValue::new("db.user", cli.db_user.clone()),
        KeyValue::new("server.address", cli.db_host.clone()),
        KeyValue::new("server.port", i64::from(cli.db_port)),
    ]
}

/// Waits for a shutdown signal (SIGTERM or SIGINT).
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received Ctrl+C, stopping probe");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, stopping probe");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parse_defaults() {
        let cli = Cli::try_parse_from(["notetrace-probe"]);
        assert!(cli.is_ok());
        let cli = cli.unwrap();
        assert_eq!(cli.db_port, 5432);
        assert_eq!(cli.interval_seconds, 30);
        assert_eq!(cli.connect_timeout_seconds, 5);
    }

    #[test]
    fn test_cli_parse_overrides() {
        let cli = Cli::try_parse_from([
            "notetrace-probe",
            "--db-host",
            "db.notes-app.svc",
            "--db-port",
            "5433",
            "--interval-seconds",
            "10",
        ])
        .unwrap();
        assert_eq!(cli.db_host, "db.notes-app.svc");
        assert_eq!(cli.db_port, 5433);
        assert_eq!(cli.interval_seconds, 10);
    }

    #[test]
    fn test_probe_attributes_identify_database() {
        let cli = Cli::try_parse_from([
            "notetrace-probe",
            "--db-name",
            "notes",
            "--db-user",
            "django",
        ])
        .unwrap();

        let attributes = probe_attributes(&cli);
        let get = |key: &str| {
            attributes
                .iter()
                .find(|kv| kv.key.as_str() == key)
                .map(|kv| kv.value.to_string())
        };

        assert_eq!(get("db.system").as_deref(), Some("postgresql"));
        assert_eq!(get("db.name").as_deref(), Some("notes"));
        assert_eq!(get("db.user").as_deref(), Some("django"));
    }
}
