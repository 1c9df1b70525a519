//! Middleware layer.
//!
//! Middleware intercepts requests and responses and is the right place for
//! cross-cutting concerns. Built in:
//!
//! - [`logging`]: request id, start/end entries, latency, slow-request
//!   warnings, and conversion of handler failures into a generic 500
//! - [`request_id`]: id generation and the per-request stamp
//! - [`metadata`]: best-effort header extraction for log fields
//! - [`sink`]: where the log entries go

pub mod logging;
pub mod metadata;
pub mod request_id;
pub mod sink;

pub use logging::{DEFAULT_SLOW_REQUEST_THRESHOLD, HandlerPanicked, RequestLogging, with_request_logging};
pub use metadata::{RequestMetadata, ResponseMetadata, client_ip, extract_request_metadata, extract_response_metadata, user_agent};
pub use request_id::{REQUEST_ID_HEADER, REQUEST_START_HEADER, RequestStamp, generate_request_id, stamp_request};
pub use sink::{Fields, LoggerFactory, RequestLogger, TracingLoggerFactory, log_error};
