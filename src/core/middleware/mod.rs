//! The middleware chain. Each module wraps an inner `Provider` trait object
//! and implements `Provider` itself — composition by containment, stacked
//! in `core::registry::load_model` innermost-first as: rate-limit →
//! fallback → retry → audit → security → telemetry → otel (outermost).

pub mod audit;
pub mod fallback;
pub mod otel;
pub mod rate_limit;
pub mod retry;
pub mod security;
pub mod telemetry;

use tracing::Span;

/// Records a failed `invoke` on the current span the way every middleware
/// in this chain does it: an `error` field plus an explicit ERROR-level
/// event, so a span exporter sees the failure without needing to inspect
/// the return value out of band. A no-op absent any subscriber.
pub(crate) fn record_error(span: &Span, err: &crate::error::ArcLlmError) {
    span.record("error", tracing::field::display(err));
    tracing::error!(parent: span, error = %err, "provider invocation failed");
}
