//! The outermost middleware: wraps every call in an `arcllm.invoke` span
//! carrying the GenAI semantic-convention attributes, and (behind the
//! `otel` feature) owns installing the OTLP exporter pipeline that turns
//! those spans into exported traces.
//!
//! This layer never constructs its own root span context — if the caller
//! is already inside a span (their HTTP handler, their job runner), this
//! one nests under it the way `tracing` always nests: through the
//! ambient current span, not anything this crate tracks itself.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use tracing::Instrument;

use crate::core::traits::Provider;
use crate::error::Result;
use crate::types::{LLMResponse, Message, Tool};

#[derive(Debug, Clone)]
pub struct OtelConfig {
    pub endpoint: String,
    pub service_name: String,
}

impl Default for OtelConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:4317".to_string(),
            service_name: "arcllm".to_string(),
        }
    }
}

/// Everything `OtelConfig` doesn't carry a dedicated field for — protocol,
/// sampling, TLS, batching, and resource attributes — lives here so
/// `OtelConfig` itself stays the shape the registry's `[modules.otel]`
/// table maps onto one-to-one, with this struct only populated by callers
/// doing their own `install_tracer` setup.
#[derive(Debug, Clone)]
pub struct ExporterSettings {
    pub protocol: OtlpProtocol,
    pub sampling_ratio: f64,
    pub use_tls: bool,
    pub batch: bool,
    pub resource_attributes: HashMap<String, String>,
}

impl Default for ExporterSettings {
    fn default() -> Self {
        Self {
            protocol: OtlpProtocol::Grpc,
            sampling_ratio: 1.0,
            use_tls: false,
            batch: true,
            resource_attributes: HashMap::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OtlpProtocol {
    Grpc,
    HttpProtobuf,
}

#[derive(Debug)]
pub struct OtelMiddleware {
    inner: Box<dyn Provider>,
    config: OtelConfig,
}

impl OtelMiddleware {
    pub fn new(inner: Box<dyn Provider>, config: OtelConfig) -> Self {
        Self { inner, config }
    }
}

#[async_trait]
impl Provider for OtelMiddleware {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn model_name(&self) -> &str {
        self.inner.model_name()
    }

    async fn invoke(
        &self,
        messages: Vec<Message>,
        tools: Option<Vec<Tool>>,
        extras: Option<Value>,
    ) -> Result<LLMResponse> {
        let span = tracing::info_span!(
            "arcllm.invoke",
            otel.kind = "client",
            gen_ai.system = %self.inner.name(),
            gen_ai.request.model = %self.inner.model_name(),
            gen_ai.response.model = tracing::field::Empty,
            gen_ai.response.finish_reasons = tracing::field::Empty,
            gen_ai.usage.input_tokens = tracing::field::Empty,
            gen_ai.usage.output_tokens = tracing::field::Empty,
            otel.exporter.endpoint = %self.config.endpoint,
            otel.service.name = %self.config.service_name,
            error = tracing::field::Empty,
        );
        let result = self
            .inner
            .invoke(messages, tools, extras)
            .instrument(span.clone())
            .await;

        match &result {
            Ok(response) => {
                let finish_reason = serde_json::to_value(response.stop_reason)
                    .ok()
                    .and_then(|v| v.as_str().map(str::to_string))
                    .unwrap_or_default();
                span.record("gen_ai.response.model", tracing::field::display(&response.model));
                span.record(
                    "gen_ai.response.finish_reasons",
                    tracing::field::display(format!("[{finish_reason}]")),
                );
                span.record("gen_ai.usage.input_tokens", response.usage.input_tokens);
                span.record("gen_ai.usage.output_tokens", response.usage.output_tokens);
            }
            Err(err) => {
                super::record_error(&span, err);
            }
        }

        result
    }
}

/// Installs the process-global OTLP exporter pipeline. Real exporter wiring
/// lives entirely behind the `otel` feature; without it, tracing spans are
/// still emitted (any `tracing-subscriber` layer the caller installs can
/// consume them) but nothing ships them to a collector.
#[cfg(feature = "otel")]
pub fn install_tracer(
    config: &OtelConfig,
    exporter: &ExporterSettings,
) -> Result<opentelemetry_sdk::trace::Tracer> {
    use opentelemetry::KeyValue;
    use opentelemetry_otlp::WithExportConfig;
    use opentelemetry_sdk::trace::{Config, Sampler};
    use opentelemetry_sdk::Resource;

    let mut exporter_builder = opentelemetry_otlp::new_exporter()
        .tonic()
        .with_endpoint(&config.endpoint);
    if exporter.protocol == OtlpProtocol::HttpProtobuf {
        exporter_builder = exporter_builder.with_endpoint(&config.endpoint);
    }

    let mut resource_kvs = vec![KeyValue::new("service.name", config.service_name.clone())];
    resource_kvs.extend(
        exporter
            .resource_attributes
            .iter()
            .map(|(k, v)| KeyValue::new(k.clone(), v.clone())),
    );

    let trace_config = Config::default()
        .with_sampler(Sampler::TraceIdRatioBased(exporter.sampling_ratio))
        .with_resource(Resource::new(resource_kvs));

    let tracer = opentelemetry_otlp::new_pipeline()
        .tracing()
        .with_exporter(exporter_builder)
        .with_trace_config(trace_config)
        .install_batch(opentelemetry_sdk::runtime::Tokio)
        .map_err(|e| {
            crate::error::ConfigError::new(format!("failed to install OTLP tracer: {e}"))
        })?;

    Ok(tracer)
}

/// Bridges the tracer from [`install_tracer`] into a `tracing-subscriber`
/// layer, so every `arcllm.invoke` span (and anything nested under it)
/// is exported as an OTLP span. Callers add this layer to their own
/// `tracing_subscriber::registry()` alongside whatever fmt/filter layers
/// they already run; this crate never installs a global subscriber itself.
#[cfg(feature = "otel")]
pub fn otel_layer<S>(
    tracer: opentelemetry_sdk::trace::Tracer,
) -> tracing_opentelemetry::OpenTelemetryLayer<S, opentelemetry_sdk::trace::Tracer>
where
    S: tracing::Subscriber + for<'a> tracing_subscriber::registry::LookupSpan<'a>,
{
    tracing_opentelemetry::layer().with_tracer(tracer)
}
