//! Request logging: per-request id, start/end entries, latency, failure capture.
//!
//! Every call through a wrapped handler produces exactly one request entry
//! and exactly one terminal entry (a response entry, or an error entry when
//! the handler fails). All of them carry the same request id, which is also
//! returned to the client in `x-request-id`.
//!
//! ```rust,no_run
//! use noteworthy::{Request, Response, Router, Server};
//! use noteworthy::middleware::with_request_logging;
//!
//! async fn list_notes(_req: Request) -> Response {
//!     Response::json(&b"[]"[..])
//! }
//!
//! # async fn run() -> Result<(), noteworthy::Error> {
//! let app = Router::new().get("/api/notes", with_request_logging(list_notes));
//! Server::bind("0.0.0.0:3000")?.serve(app).await
//! # }
//! ```

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use futures_util::FutureExt;
use http::{HeaderValue, StatusCode};
use serde::Serialize;
use serde_json::Value;
use tokio::time::Instant;

use super::metadata::{client_ip, user_agent};
use super::request_id::{REQUEST_ID_HEADER, RequestStamp, stamp_request};
use super::sink::{Fields, LoggerFactory, RequestLogger, TracingLoggerFactory, log_error};
use crate::config::LoggingConfig;
use crate::error::BoxError;
use crate::handler::{BoxedHandler, Handler};
use crate::request::Request;
use crate::response::{ContentType, Response};

/// Requests slower than this also get a warning entry.
pub const DEFAULT_SLOW_REQUEST_THRESHOLD: Duration = Duration::from_millis(1000);

const INTERNAL_ERROR_BODY: &[u8] = br#"{"error":"Internal server error"}"#;
const NONE: &str = "none";

/// Wraps `handler` with request logging using the default settings.
pub fn with_request_logging(handler: impl Handler) -> impl Handler {
    RequestLogging::new().wrap(handler)
}

/// Request-logging middleware settings.
///
/// Cheap to clone; all wrapped handlers share one logger factory.
#[derive(Clone)]
pub struct RequestLogging {
    slow_threshold: Duration,
    factory: Arc<dyn LoggerFactory>,
}

impl Default for RequestLogging {
    fn default() -> Self { Self::new() }
}

impl std::fmt::Debug for RequestLogging {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestLogging")
            .field("slow_threshold", &self.slow_threshold)
            .finish_non_exhaustive()
    }
}

impl RequestLogging {
    pub fn new() -> Self {
        Self {
            slow_threshold: DEFAULT_SLOW_REQUEST_THRESHOLD,
            factory: Arc::new(TracingLoggerFactory),
        }
    }

    pub fn from_config(config: &LoggingConfig) -> Self {
        Self::new().slow_request_threshold(Duration::from_millis(config.slow_request_threshold_ms))
    }

    /// Durations strictly above `threshold` are flagged as slow.
    pub fn slow_request_threshold(mut self, threshold: Duration) -> Self {
        self.slow_threshold = threshold;
        self
    }

    /// Replaces the `tracing` sink.
    pub fn logger_factory(mut self, factory: impl LoggerFactory) -> Self {
        self.factory = Arc::new(factory);
        self
    }

    /// Returns a handler with the same shape as `handler` that logs around it.
    pub fn wrap<H: Handler>(&self, handler: H) -> impl Handler + use<H> {
        let inner = handler.into_boxed_handler();
        let this = self.clone();
        move |req: Request| {
            let inner = Arc::clone(&inner);
            let this = this.clone();
            async move { this.instrument(inner, req).await }
        }
    }

    /// Runs one request through `inner`. Never fails: handler errors and
    /// panics become a generic 500.
    pub(crate) async fn instrument(&self, inner: BoxedHandler, mut req: Request) -> Response {
        let started = Instant::now();
        let (stamp, logger) = self.begin(&mut req);

        let method = req.method().to_string();
        let url = req.url();

        // The call sits inside the future so a panic while building the
        // handler's future is caught along with one raised while polling it.
        let outcome = AssertUnwindSafe(async move { inner.call(req).await })
            .catch_unwind()
            .await
            .unwrap_or_else(|payload| Err::<Response, BoxError>(HandlerPanicked::from_payload(payload).into()));
        let duration_ms = millis(started.elapsed());

        let mut res = match outcome {
            Ok(res) => {
                self.log_response(&*logger, &res, duration_ms, &stamp.id);
                res
            }
            Err(err) => {
                log_failure(&*logger, &*err, FailureContext {
                    request_id: &stamp.id,
                    method: &method,
                    url: &url,
                    duration: duration_ms,
                });
                internal_error()
            }
        };

        if let Ok(v) = HeaderValue::from_str(&stamp.id) {
            res.headers_mut().insert(REQUEST_ID_HEADER, v);
        }
        res
    }

    /// Stamps `req` with a fresh id and start time and emits its request
    /// entry.
    ///
    /// For callers that drive the handler themselves; [`wrap`](Self::wrap)
    /// does this and everything after it.
    pub fn log_incoming(&self, req: &mut Request) -> RequestStamp {
        self.begin(req).0
    }

    fn begin(&self, req: &mut Request) -> (RequestStamp, Box<dyn RequestLogger>) {
        let stamp = stamp_request(req);
        let logger = self.factory.request_logger(&stamp.id, req.method().as_str(), req.path());
        log_request(&*logger, req, &stamp.id);
        (stamp, logger)
    }

    fn log_response(&self, logger: &dyn RequestLogger, res: &Response, duration: u64, request_id: &str) {
        let status = res.status_code().as_u16();
        let entry = ResponseLogEntry {
            status_code: status,
            duration,
            content_type: res.header("content-type").unwrap_or(NONE),
            content_length: res.content_length(),
            request_id,
        };
        logger.info(to_fields(&entry), &format!("Response {status} sent in {duration}ms"));

        if duration > millis(self.slow_threshold) {
            let warning = SlowRequestWarning { duration, performance_warning: true, request_id };
            logger.warn(to_fields(&warning), &format!("Slow request detected: {duration}ms"));
        }
    }
}

// ── Entries ───────────────────────────────────────────────────────────────────

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RequestLogEntry<'a> {
    method: &'a str,
    path: &'a str,
    url: String,
    user_agent: String,
    #[serde(rename = "clientIP")]
    client_ip: String,
    referrer: &'a str,
    content_type: &'a str,
    request_id: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ResponseLogEntry<'a> {
    status_code: u16,
    duration: u64,
    content_type: &'a str,
    content_length: u64,
    request_id: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SlowRequestWarning<'a> {
    duration: u64,
    performance_warning: bool,
    request_id: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct FailureContext<'a> {
    request_id: &'a str,
    method: &'a str,
    url: &'a str,
    duration: u64,
}

fn log_request(logger: &dyn RequestLogger, req: &Request, request_id: &str) {
    let method = req.method().as_str();
    let path = req.path();
    let entry = RequestLogEntry {
        method,
        path,
        url: req.url(),
        user_agent: user_agent(req),
        client_ip: client_ip(req),
        referrer: req.header("referer").unwrap_or(NONE),
        content_type: req.header("content-type").unwrap_or(NONE),
        request_id,
    };
    logger.info(to_fields(&entry), &format!("Incoming {method} request to {path}"));
}

fn log_failure(logger: &dyn RequestLogger, err: &(dyn std::error::Error + 'static), ctx: FailureContext<'_>) {
    log_error(logger, err, to_fields(&ctx));
}

fn to_fields<T: Serialize>(entry: &T) -> Fields {
    match serde_json::to_value(entry) {
        Ok(Value::Object(map)) => map,
        _ => Fields::new(),
    }
}

fn millis(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}

/// The generic failure response. The cause stays in the logs.
pub(crate) fn internal_error() -> Response {
    Response::builder()
        .status(StatusCode::INTERNAL_SERVER_ERROR)
        .bytes(ContentType::Json, Bytes::from_static(INTERNAL_ERROR_BODY))
}

// ── Panics ────────────────────────────────────────────────────────────────────

/// A handler panicked instead of returning.
#[derive(Debug, thiserror::Error)]
#[error("handler panicked: {0}")]
pub struct HandlerPanicked(String);

impl HandlerPanicked {
    pub(crate) fn from_payload(payload: Box<dyn Any + Send>) -> Self {
        let msg = payload.downcast_ref::<&str>().map(|s| (*s).to_owned())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "non-string panic payload".to_owned());
        Self(msg)
    }
}
