//! The external login endpoint.
//!
//! `POST <login_url>` with `{"email", "password"}`. A 2xx reply carries
//! `accessToken` and `user`; anything else carries `error` and optionally
//! `details`, a map of field name to messages.

use std::future::Future;

use http::StatusCode;
use serde::Deserialize;
use serde_json::Value;

use super::form::Credentials;
use crate::config::AuthConfig;
use crate::error::Error;

/// Banner text when the server rejects without a usable message.
pub const LOGIN_FAILED: &str = "Login failed. Please try again.";

/// Status and decoded JSON body of one login attempt.
#[derive(Clone, Debug, PartialEq)]
pub struct BackendReply {
    pub status: StatusCode,
    pub body: Value,
}

/// Anything that can carry credentials to the auth service.
pub trait LoginBackend {
    fn login(&self, credentials: &Credentials) -> impl Future<Output = Result<BackendReply, Error>> + Send;
}

/// What a reply means for the page.
#[derive(Clone, Debug, PartialEq)]
pub enum LoginReply {
    /// 2xx. Token and user are present only if the server sent both.
    Accepted { session: Option<(String, Value)> },
    /// Non-2xx, with the banner text to show.
    Rejected { message: String },
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Accepted {
    access_token: Option<String>,
    user: Option<Value>,
}

#[derive(Deserialize)]
struct Rejected {
    error: Option<String>,
    details: Option<Value>,
}

impl BackendReply {
    pub fn interpret(self) -> LoginReply {
        if self.status.is_success() {
            let accepted: Accepted = serde_json::from_value(self.body)
                .unwrap_or(Accepted { access_token: None, user: None });
            let session = match (accepted.access_token, accepted.user) {
                (Some(token), Some(user)) if !token.is_empty() && !user.is_null() => Some((token, user)),
                _ => None,
            };
            LoginReply::Accepted { session }
        } else {
            LoginReply::Rejected { message: rejection_message(self.body) }
        }
    }
}

/// Banner text for a rejected login.
///
/// Field-level `details` win when they hold any message, joined with single
/// spaces in the order the server sent them; then `error`; then a generic
/// fallback.
pub fn rejection_message(body: Value) -> String {
    let rejected: Rejected = serde_json::from_value(body)
        .unwrap_or(Rejected { error: None, details: None });

    let error = rejected.error.filter(|e| !e.is_empty());

    let detailed = rejected.details
        .filter(|d| !d.is_null())
        .map(|details| flatten_details(&details).join(" "))
        .filter(|joined| !joined.is_empty());

    detailed
        .or(error)
        .unwrap_or_else(|| LOGIN_FAILED.to_owned())
}

fn flatten_details(details: &Value) -> Vec<String> {
    let values: Vec<&Value> = match details {
        Value::Object(map) => map.values().collect(),
        Value::Array(items) => items.iter().collect(),
        other => vec![other],
    };

    values.into_iter()
        .flat_map(|v| match v {
            Value::Array(items) => items.iter().collect::<Vec<_>>(),
            other => vec![other],
        })
        .filter_map(|v| match v {
            Value::String(s) => Some(s.clone()),
            Value::Null => None,
            other => Some(other.to_string()),
        })
        .collect()
}

// ── HTTP ──────────────────────────────────────────────────────────────────────

/// [`LoginBackend`] over HTTP.
#[derive(Clone, Debug)]
pub struct HttpLoginBackend {
    client: reqwest::Client,
    url: String,
}

impl HttpLoginBackend {
    pub fn new(url: impl Into<String>) -> Self {
        Self::with_client(url, reqwest::Client::new())
    }

    /// Uses a preconfigured client (timeouts, proxy settings).
    pub fn with_client(url: impl Into<String>, client: reqwest::Client) -> Self {
        Self { client, url: url.into() }
    }

    pub fn from_config(config: &AuthConfig) -> Self {
        Self::new(config.login_url.clone())
    }
}

impl LoginBackend for HttpLoginBackend {
    async fn login(&self, credentials: &Credentials) -> Result<BackendReply, Error> {
        let res = self.client
            .post(&self.url)
            .json(credentials)
            .send()
            .await?;

        let status = res.status();
        let body = res.json::<Value>().await?;
        Ok(BackendReply { status, body })
    }
}
