//! Application configuration.
//!
//! Layered with figment: built-in defaults, then an optional TOML file, then
//! `NOTEWORTHY_`-prefixed environment variables (`__` separates nesting, so
//! `NOTEWORTHY_LOGGING__JSON=true` sets `logging.json`).

use std::path::Path;

use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use serde::{Deserialize, Serialize};

use crate::error::Error;

const ENV_PREFIX: &str = "NOTEWORTHY_";

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub auth: AuthConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_addr")]
    pub addr: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// `EnvFilter` directive used when `RUST_LOG` is unset.
    #[serde(default = "default_level")]
    pub level: String,
    /// One JSON object per line instead of human-readable output.
    #[serde(default)]
    pub json: bool,
    #[serde(default = "default_slow_request_threshold_ms")]
    pub slow_request_threshold_ms: u64,
}

/// Where the login page sends credentials and where it goes afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthConfig {
    #[serde(default = "default_login_url")]
    pub login_url: String,
    #[serde(default = "default_dashboard_path")]
    pub dashboard_path: String,
}

// ── Defaults ──────────────────────────────────────────────────

fn default_addr() -> String { "0.0.0.0:3000".into() }
fn default_level() -> String { "info".into() }
fn default_slow_request_threshold_ms() -> u64 { 1000 }
fn default_login_url() -> String { "http://localhost:3000/api/auth/login".into() }
fn default_dashboard_path() -> String { "/dashboard".into() }

impl Default for ServerConfig {
    fn default() -> Self {
        Self { addr: default_addr() }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            json: false,
            slow_request_threshold_ms: default_slow_request_threshold_ms(),
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            login_url: default_login_url(),
            dashboard_path: default_dashboard_path(),
        }
    }
}

// ── Loading ───────────────────────────────────────────────────

impl AppConfig {
    /// Defaults overlaid with environment variables only.
    pub fn figment() -> Figment {
        Figment::from(Serialized::defaults(Self::default()))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    /// Defaults, then the TOML file at `path` (skipped if missing), then env.
    pub fn load(path: &Path) -> Result<Self, Error> {
        let config = Figment::from(Serialized::defaults(Self::default()))
            .merge(Toml::file(path))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()?;
        Ok(config)
    }

    pub fn from_env() -> Result<Self, Error> {
        Ok(Self::figment().extract()?)
    }
}
