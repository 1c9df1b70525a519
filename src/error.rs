//! Unified error type.

use thiserror::Error;

/// Boxed error returned by failing route handlers.
///
/// Any `E: std::error::Error + Send + Sync` converts into it, so handlers
/// can use `?` freely and let the logging wrapper turn the failure into a 500.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// The error type returned by the crate's fallible operations.
///
/// Application-level errors (404, 422, etc.) are expressed as HTTP
/// [`Response`](crate::Response) values, not as `Error`s. This type surfaces
/// infrastructure failures: binding a port, loading configuration, or talking
/// to the external login endpoint.
#[derive(Debug, Error)]
pub enum Error {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid socket address `{addr}`: {source}")]
    Addr {
        addr: String,
        #[source]
        source: std::net::AddrParseError,
    },

    #[error("config: {0}")]
    Config(#[from] Box<figment::Error>),

    #[error("http client: {0}")]
    Http(#[from] reqwest::Error),

    #[error("json: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<figment::Error> for Error {
    fn from(e: figment::Error) -> Self {
        Self::Config(Box::new(e))
    }
}
