//! Request identifiers and the per-request stamp.
//!
//! Ids come from the operating system's secure random source: 16 bytes,
//! rendered as 32 lowercase hex characters. When that source is unavailable
//! the id degrades to `req_<base36 random><base36 millis>` from a
//! non-cryptographic generator. The fallback is a diagnostic label only and
//! makes no uniqueness promise.

use std::fmt::Write as _;
use std::time::{SystemTime, UNIX_EPOCH};

use http::HeaderValue;
use rand::RngCore;
use rand::rngs::OsRng;

use crate::request::Request;

/// Response (and forwarded request) header carrying the correlation id.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Forwarded request header carrying the start time in ms since the epoch.
pub const REQUEST_START_HEADER: &str = "x-request-start-time";

const FALLBACK_PREFIX: &str = "req_";

/// Correlation data attached to a request as it enters the middleware.
///
/// Stored in the request's extensions; handlers read the id back with
/// [`Request::request_id`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RequestStamp {
    pub id: String,
    /// Milliseconds since the Unix epoch.
    pub started_at_ms: u64,
}

/// Generates a fresh request id.
pub fn generate_request_id() -> String {
    request_id_from(&mut OsRng)
}

/// Generates a request id from `rng`, falling back when it cannot deliver.
pub fn request_id_from<R: RngCore + ?Sized>(rng: &mut R) -> String {
    let mut bytes = [0u8; 16];
    match rng.try_fill_bytes(&mut bytes) {
        Ok(()) => hex(&bytes),
        Err(e) => {
            tracing::debug!(error = %e, "secure random source unavailable, using fallback request id");
            fallback_request_id()
        }
    }
}

fn fallback_request_id() -> String {
    format!(
        "{FALLBACK_PREFIX}{}{}",
        base36(fastrand::u64(..)),
        base36(now_millis()),
    )
}

/// Assigns an id and start time to `req`.
///
/// The stamp is inserted as a request extension and forwarded to the handler
/// as the `x-request-id` / `x-request-start-time` headers, replacing any the
/// client sent.
pub fn stamp_request(req: &mut Request) -> RequestStamp {
    let stamp = RequestStamp {
        id: generate_request_id(),
        started_at_ms: now_millis(),
    };

    if let Ok(v) = HeaderValue::from_str(&stamp.id) {
        req.headers_mut().insert(REQUEST_ID_HEADER, v);
    }
    req.headers_mut().insert(REQUEST_START_HEADER, HeaderValue::from(stamp.started_at_ms));
    req.extensions_mut().insert(stamp.clone());

    stamp
}

pub(crate) fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
}

fn hex(bytes: &[u8]) -> String {
    bytes.iter().fold(String::with_capacity(bytes.len() * 2), |mut out, b| {
        let _ = write!(out, "{b:02x}");
        out
    })
}

fn base36(mut n: u64) -> String {
    const DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    if n == 0 {
        return "0".to_owned();
    }
    let mut buf = Vec::with_capacity(13);
    while n > 0 {
        buf.push(DIGITS[(n % 36) as usize]);
        n /= 36;
    }
    buf.reverse();
    String::from_utf8(buf).unwrap_or_default()
}
