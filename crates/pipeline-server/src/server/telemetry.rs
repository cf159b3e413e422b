//! # Telemetry
//!
//! Logging is always on: every stage reports through `tracing` and a
//! `tracing_subscriber` registry prints the events as text or JSON.
//!
//! ## Feature matrix
//!
//! - `metrics`: Enables OpenTelemetry counters exported to stdout by a
//!   periodic reader.
//!
//! Without `metrics` the recording helpers at the bottom of this module are
//! no-ops, so call sites never need their own `cfg` guards.
//!
//! ## Level and format
//!
//! Invalid `--log-level` / `--log-format` values are not fatal: the default
//! (`info` / `text`) is used and a line saying so is logged once the
//! subscriber is installed.

use tracing::level_filters::LevelFilter;
use tracing_subscriber::{
    EnvFilter, Layer, fmt, fmt::time::ChronoLocal, layer::SubscriberExt, util::SubscriberInitExt,
};

#[cfg(feature = "metrics")]
use opentelemetry::metrics::{Counter, Meter, UpDownCounter};
#[cfg(feature = "metrics")]
use opentelemetry::{InstrumentationScope, KeyValue};
#[cfg(feature = "metrics")]
use opentelemetry_sdk::{Resource, metrics as sdkmetrics};
#[cfg(feature = "metrics")]
use opentelemetry_semantic_conventions as semvcns;
#[cfg(feature = "metrics")]
use std::sync::OnceLock;

/// Output format of the log lines.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}

/// Parses a log level name.
///
/// `panic` and `fatal` have no `tracing` counterpart and map to `error`.
pub fn parse_level(level: &str) -> Option<LevelFilter> {
    match level.trim().to_ascii_lowercase().as_str() {
        "panic" | "fatal" | "error" => Some(LevelFilter::ERROR),
        "warn" | "warning" => Some(LevelFilter::WARN),
        "info" => Some(LevelFilter::INFO),
        "debug" => Some(LevelFilter::DEBUG),
        "trace" => Some(LevelFilter::TRACE),
        _ => None,
    }
}

pub fn parse_format(format: &str) -> Option<LogFormat> {
    match format.trim().to_ascii_lowercase().as_str() {
        "json" => Some(LogFormat::Json),
        "text" | "txt" => Some(LogFormat::Text),
        _ => None,
    }
}

pub struct TelemetryProviders {
    #[cfg(feature = "metrics")]
    pub meter_provider: sdkmetrics::SdkMeterProvider,
}

impl TelemetryProviders {
    /// Flushes and stops every exporter. Call once, right before exiting.
    pub fn shutdown(self) {
        #[cfg(feature = "metrics")]
        {
            if let Err(err) = self.meter_provider.force_flush() {
                eprintln!("Error flushing metrics: {:#?}", err);
            }
            if let Err(err) = self.meter_provider.shutdown() {
                eprintln!("Error shutting down meter: {:#?}", err);
            }
        }
    }
}

pub fn init_telemetry(level: &str, format: &str) -> anyhow::Result<TelemetryProviders> {
    let parsed_level = parse_level(level);
    let parsed_format = parse_format(format);

    let filter = EnvFilter::default().add_directive(parsed_level.unwrap_or(LevelFilter::INFO).into());

    let output = match parsed_format.unwrap_or(LogFormat::Text) {
        LogFormat::Text => fmt::layer()
            .with_thread_ids(true)
            .with_line_number(true)
            .with_target(false)
            .with_timer(ChronoLocal::rfc_3339())
            .boxed(),
        LogFormat::Json => fmt::layer()
            .json()
            .with_thread_ids(true)
            .with_timer(ChronoLocal::rfc_3339())
            .boxed(),
    };

    #[cfg(feature = "metrics")]
    let meter_provider = {
        let meter_provider = init_metrics();
        opentelemetry::global::set_meter_provider(meter_provider.clone());
        let scope = InstrumentationScope::builder("pipeline")
            .with_version(env!("CARGO_PKG_VERSION"))
            .with_schema_url(semvcns::SCHEMA_URL)
            .build();
        init_metric_handles(opentelemetry::global::meter_with_scope(scope));
        meter_provider
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(output)
        .try_init()?;

    match parsed_format {
        Some(_) => tracing::info!("Set formatter: {format}"),
        None => tracing::info!("Set default formatter - text"),
    }
    match parsed_level {
        Some(level) => tracing::info!("Set log level: {level}"),
        None => tracing::info!("Set default log level - info"),
    }

    Ok(TelemetryProviders {
        #[cfg(feature = "metrics")]
        meter_provider,
    })
}

#[cfg(feature = "metrics")]
fn resource() -> Resource {
    Resource::builder()
        .with_service_name("pipeline")
        .with_schema_url(
            [KeyValue::new(
                semvcns::resource::SERVICE_VERSION,
                env!("CARGO_PKG_VERSION"),
            )],
            semvcns::SCHEMA_URL,
        )
        .build()
}

#[cfg(feature = "metrics")]
fn init_metrics() -> sdkmetrics::SdkMeterProvider {
    use opentelemetry_stdout::MetricExporter;

    let reader = sdkmetrics::PeriodicReader::builder(MetricExporter::default())
        .with_interval(std::time::Duration::from_secs(5))
        .build();

    sdkmetrics::SdkMeterProvider::builder()
        .with_resource(resource())
        .with_reader(reader)
        .build()
}

// Metric handles - only compiled when metrics feature is enabled
#[cfg(feature = "metrics")]
static PACKETS_GENERATED: OnceLock<Counter<u64>> = OnceLock::new();
#[cfg(feature = "metrics")]
static PACKETS_DROPPED: OnceLock<Counter<u64>> = OnceLock::new();
#[cfg(feature = "metrics")]
static PACKETS_REDUCED: OnceLock<Counter<u64>> = OnceLock::new();
#[cfg(feature = "metrics")]
static VALUES_ACCUMULATED: OnceLock<UpDownCounter<i64>> = OnceLock::new();

#[cfg(feature = "metrics")]
fn init_metric_handles(meter: Meter) {
    let _ = PACKETS_GENERATED.set(
        meter
            .u64_counter("packets_generated")
            .with_description("Packets built by the generator")
            .build(),
    );

    let _ = PACKETS_DROPPED.set(
        meter
            .u64_counter("packets_dropped")
            .with_description("Packets dropped because cancellation won the send")
            .build(),
    );

    let _ = PACKETS_REDUCED.set(
        meter
            .u64_counter("packets_reduced")
            .with_description("Packets reduced to their top values")
            .build(),
    );

    let _ = VALUES_ACCUMULATED.set(
        meter
            .i64_up_down_counter("values_accumulated")
            .with_description("Running sum folded by the accumulator")
            .build(),
    );
}

// Convenience functions that compile to no-ops when metrics are disabled
#[cfg(feature = "metrics")]
pub fn increment_packets_generated() {
    if let Some(counter) = PACKETS_GENERATED.get() {
        counter.add(1, &[]);
    }
}

#[cfg(not(feature = "metrics"))]
pub fn increment_packets_generated() {}

#[cfg(feature = "metrics")]
pub fn increment_packets_dropped(stage: &'static str) {
    if let Some(counter) = PACKETS_DROPPED.get() {
        counter.add(1, &[KeyValue::new("stage", stage)]);
    }
}

#[cfg(not(feature = "metrics"))]
pub fn increment_packets_dropped(_stage: &'static str) {}

#[cfg(feature = "metrics")]
pub fn increment_packets_reduced() {
    if let Some(counter) = PACKETS_REDUCED.get() {
        counter.add(1, &[]);
    }
}

#[cfg(not(feature = "metrics"))]
pub fn increment_packets_reduced() {}

#[cfg(feature = "metrics")]
pub fn record_accumulated(sum: i64) {
    if let Some(counter) = VALUES_ACCUMULATED.get() {
        counter.add(sum, &[]);
    }
}

#[cfg(not(feature = "metrics"))]
pub fn record_accumulated(_sum: i64) {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_every_documented_level() {
        assert_eq!(parse_level("panic"), Some(LevelFilter::ERROR));
        assert_eq!(parse_level("fatal"), Some(LevelFilter::ERROR));
        assert_eq!(parse_level("error"), Some(LevelFilter::ERROR));
        assert_eq!(parse_level("warn"), Some(LevelFilter::WARN));
        assert_eq!(parse_level("warning"), Some(LevelFilter::WARN));
        assert_eq!(parse_level("INFO"), Some(LevelFilter::INFO));
        assert_eq!(parse_level("debug"), Some(LevelFilter::DEBUG));
        assert_eq!(parse_level("trace"), Some(LevelFilter::TRACE));
        assert_eq!(parse_level("loud"), None);
        assert_eq!(parse_level(""), None);
    }

    #[test]
    fn parses_formats() {
        assert_eq!(parse_format("json"), Some(LogFormat::Json));
        assert_eq!(parse_format("text"), Some(LogFormat::Text));
        assert_eq!(parse_format("txt"), Some(LogFormat::Text));
        assert_eq!(parse_format("yaml"), None);
    }
}
