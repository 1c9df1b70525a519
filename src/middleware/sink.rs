//! Where request log entries go.
//!
//! The wrapper asks a [`LoggerFactory`] for one [`RequestLogger`] per request
//! and emits every entry for that request through it. The default factory
//! writes `tracing` events inside a `request` span carrying the id, method
//! and path, so any installed subscriber (see [`crate::telemetry`]) decides
//! the format and transport.

use serde_json::{Map, Value, json};
use tracing::Span;

/// Structured payload attached to one log entry.
pub type Fields = Map<String, Value>;

/// Severity-scoped emitter bound to a single request.
pub trait RequestLogger: Send + Sync {
    fn info(&self, fields: Fields, message: &str);
    fn warn(&self, fields: Fields, message: &str);
    fn error(&self, fields: Fields, message: &str);
}

/// Creates the logger for one request.
pub trait LoggerFactory: Send + Sync + 'static {
    fn request_logger(&self, request_id: &str, method: &str, path: &str) -> Box<dyn RequestLogger>;
}

// ── tracing ──────────────────────────────────────────────────────────────────

/// Default factory: `tracing` events under a per-request span.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingLoggerFactory;

impl LoggerFactory for TracingLoggerFactory {
    fn request_logger(&self, request_id: &str, method: &str, path: &str) -> Box<dyn RequestLogger> {
        let span = tracing::info_span!("request", request_id, method, path);
        Box::new(TracingRequestLogger { span })
    }
}

struct TracingRequestLogger {
    span: Span,
}

impl RequestLogger for TracingRequestLogger {
    fn info(&self, fields: Fields, message: &str) {
        let fields = Value::Object(fields);
        self.span.in_scope(|| tracing::info!(%fields, "{message}"));
    }

    fn warn(&self, fields: Fields, message: &str) {
        let fields = Value::Object(fields);
        self.span.in_scope(|| tracing::warn!(%fields, "{message}"));
    }

    fn error(&self, fields: Fields, message: &str) {
        let fields = Value::Object(fields);
        self.span.in_scope(|| tracing::error!(%fields, "{message}"));
    }
}

// ── error helper ─────────────────────────────────────────────────────────────

/// Logs a caught error at error severity.
///
/// The payload holds the error's message and its `source()` chain under
/// `error`, merged with every key of `context`.
pub fn log_error(
    logger: &dyn RequestLogger,
    error: &(dyn std::error::Error + 'static),
    context: Fields,
) {
    let mut causes = Vec::new();
    let mut source = error.source();
    while let Some(cause) = source {
        causes.push(Value::String(cause.to_string()));
        source = cause.source();
    }

    let mut fields = Fields::new();
    fields.insert("error".to_owned(), json!({
        "message": error.to_string(),
        "causes": causes,
    }));
    fields.extend(context);

    logger.error(fields, &format!("Unhandled error: {error}"));
}
