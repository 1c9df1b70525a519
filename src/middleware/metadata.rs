//! Header extraction for diagnostic log fields.
//!
//! Everything here is best-effort: a header that is missing or cannot be
//! decoded degrades the record, it never fails the request.

use http::header::{CONTENT_TYPE, REFERER, USER_AGENT};
use serde::Serialize;

use crate::request::Request;
use crate::response::Response;

/// Placeholder for values that could not be determined.
pub const UNKNOWN: &str = "unknown";

/// Proxy headers consulted for the client address, in precedence order.
/// `x-forwarded-for` is a list; only its first hop is used.
const FORWARDED_FOR: &str = "x-forwarded-for";
const REAL_IP: &str = "x-real-ip";
const PLATFORM_FORWARDED_FOR: &str = "x-vercel-forwarded-for";

/// Best-effort client address.
///
/// First hop of `x-forwarded-for`, then `x-real-ip`, then the platform's
/// `x-vercel-forwarded-for`; `"unknown"` when none carries a value.
pub fn client_ip(req: &Request) -> String {
    let first_hop = req.header(FORWARDED_FOR)
        .and_then(|v| v.split(',').next())
        .map(str::trim);

    first_hop
        .into_iter()
        .chain([req.header(REAL_IP), req.header(PLATFORM_FORWARDED_FOR)].into_iter().flatten())
        .find(|v| !v.is_empty())
        .unwrap_or(UNKNOWN)
        .to_owned()
}

/// The `user-agent` header verbatim, or `"unknown"`.
pub fn user_agent(req: &Request) -> String {
    req.header(USER_AGENT.as_str())
        .filter(|v| !v.is_empty())
        .unwrap_or(UNKNOWN)
        .to_owned()
}

/// Diagnostic snapshot of a request.
///
/// The degraded form carries only `method` and `url`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestMetadata {
    pub method: String,
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ip: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub referer: Option<String>,
}

/// Diagnostic snapshot of a response.
///
/// The degraded form carries only `status`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseMetadata {
    pub status: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_text: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
}

pub fn extract_request_metadata(req: &Request) -> RequestMetadata {
    let degraded = || RequestMetadata {
        method: req.method().to_string(),
        url: req.url(),
        user_agent: None,
        ip: None,
        referer: None,
    };

    let headers = req.try_header(USER_AGENT.as_str()).and_then(|ua| {
        Ok((ua, req.try_header(REFERER.as_str())?))
    });

    match headers {
        Ok((user_agent, referer)) => RequestMetadata {
            user_agent: user_agent.map(str::to_owned),
            ip: Some(client_ip(req)),
            referer: referer.map(str::to_owned),
            ..degraded()
        },
        Err(e) => {
            tracing::warn!(error = %e, "failed to extract request metadata");
            degraded()
        }
    }
}

pub fn extract_response_metadata(res: &Response) -> ResponseMetadata {
    let status = res.status_code();

    match res.headers().get(CONTENT_TYPE).map(|v| v.to_str()).transpose() {
        Ok(content_type) => ResponseMetadata {
            status: status.as_u16(),
            status_text: status.canonical_reason(),
            content_type: content_type.map(str::to_owned),
        },
        Err(e) => {
            tracing::warn!(error = %e, "failed to extract response metadata");
            ResponseMetadata { status: status.as_u16(), status_text: None, content_type: None }
        }
    }
}
