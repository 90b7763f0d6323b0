//! OpenTelemetry telemetry module for distributed tracing.
//!
//! This module provides:
//! - OTLP exporter configuration for sending traces to collectors like Jaeger, Zipkin, or Tempo
//! - Integration with the `tracing` crate for seamless span creation
//! - Configurable sampling for production environments
//! - Plain-text or JSON console output (`LOGGING__FORMAT`)
//!
//! # Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `OTEL__ENABLED` | Enable OpenTelemetry tracing | `false` |
//! | `OTEL__ENDPOINT` | OTLP gRPC endpoint | `http://localhost:4317` |
//! | `OTEL__SERVICE_NAME` | Service name in traces | `transition-notifier` |
//! | `OTEL__SAMPLING_RATIO` | Trace sampling ratio (0.0-1.0) | `1.0` |
//! | `LOGGING__FORMAT` | `text` or `json` | `text` |

use opentelemetry::trace::TracerProvider;
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::{
    runtime,
    trace::{RandomIdGenerator, Sampler, TracerProvider as SdkTracerProvider},
    Resource,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::{LoggingConfig, OtelConfig};

/// Result type for telemetry operations
pub type TelemetryResult<T> = Result<T, TelemetryError>;

/// Telemetry-specific error type
#[derive(Debug, thiserror::Error)]
pub enum TelemetryError {
    #[error("Failed to initialize OpenTelemetry tracer: {0}")]
    TracerInit(String),
    #[error("Failed to build OTLP exporter: {0}")]
    ExporterBuild(String),
}

/// Telemetry guard that ensures proper shutdown of OpenTelemetry on drop.
pub struct TelemetryGuard {
    _provider: Option<SdkTracerProvider>,
}

impl Drop for TelemetryGuard {
    fn drop(&mut self) {
        if self._provider.is_some() {
            // Shutdown is handled automatically by TracerProvider drop
            tracing::info!("Shutting down OpenTelemetry tracer provider");
        }
    }
}

/// Initialize the telemetry system with the given configuration.
///
/// This function sets up the tracing subscriber with:
/// - Console output (text or JSON) for local debugging and log shipping
/// - OpenTelemetry layer for distributed tracing (if enabled)
///
/// Returns a `TelemetryGuard` that should be kept alive for the duration of the
/// application.
pub fn init_telemetry(
    config: &OtelConfig,
    logging: &LoggingConfig,
) -> TelemetryResult<TelemetryGuard> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let json = logging.is_json();
    let json_layer = json.then(|| tracing_subscriber::fmt::layer().json());
    let text_layer = (!json).then(tracing_subscriber::fmt::layer);

    if config.enabled {
        // Initialize OpenTelemetry with OTLP exporter
        let provider = init_otel_tracer(config)?;
        let tracer = provider.tracer("transition-notifier");
        let otel_layer = tracing_opentelemetry::layer().with_tracer(tracer);

        tracing_subscriber::registry()
            .with(env_filter)
            .with(json_layer)
            .with(text_layer)
            .with(otel_layer)
            .try_init()
            .map_err(|e| TelemetryError::TracerInit(e.to_string()))?;

        tracing::info!(
            endpoint = %config.endpoint,
            service_name = %config.service_name,
            sampling_ratio = %config.sampling_ratio,
            "OpenTelemetry tracing initialized"
        );

        Ok(TelemetryGuard {
            _provider: Some(provider),
        })
    } else {
        // Standard logging without OpenTelemetry
        tracing_subscriber::registry()
            .with(env_filter)
            .with(json_layer)
            .with(text_layer)
            .try_init()
            .map_err(|e| TelemetryError::TracerInit(e.to_string()))?;

        tracing::info!(format = %logging.format, "Tracing initialized (OpenTelemetry disabled)");

        Ok(TelemetryGuard { _provider: None })
    }
}

/// Initialize the OpenTelemetry tracer with OTLP exporter.
fn init_otel_tracer(config: &OtelConfig) -> TelemetryResult<SdkTracerProvider> {
    use opentelemetry::KeyValue;

    // Create OTLP exporter
    let exporter = opentelemetry_otlp::SpanExporter::builder()
        .with_tonic()
        .with_endpoint(&config.endpoint)
        .build()
        .map_err(|e| TelemetryError::ExporterBuild(e.to_string()))?;

    // Configure sampler based on sampling ratio
    let sampler = if config.sampling_ratio >= 1.0 {
        Sampler::AlwaysOn
    } else if config.sampling_ratio <= 0.0 {
        Sampler::AlwaysOff
    } else {
        Sampler::TraceIdRatioBased(config.sampling_ratio)
    };

    // Build the tracer provider
    let provider = SdkTracerProvider::builder()
        .with_batch_exporter(exporter, runtime::Tokio)
        .with_sampler(sampler)
        .with_id_generator(RandomIdGenerator::default())
        .with_resource(Resource::new(vec![
            KeyValue::new(
                opentelemetry_semantic_conventions::resource::SERVICE_NAME,
                config.service_name.clone(),
            ),
            KeyValue::new(
                opentelemetry_semantic_conventions::resource::SERVICE_VERSION,
                env!("CARGO_PKG_VERSION"),
            ),
        ]))
        .build();

    Ok(provider)
}
