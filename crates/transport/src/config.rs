//! HTTP client configuration.
//!
//! [`ClientConfig`] is read from JSON (usually a file passed to the CLI) and
//! validated once at load time; a service is never built from an invalid
//! config.
//!
//! ## Sentinel values
//! - `timeout_ms = 0` → no overall request timeout
//! - `connect_timeout_ms = 0` → no connect timeout

use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use reqwest::Url;
use serde::{Deserialize, Serialize};

use crate::errors::ConfigError;

/// Settings shared by every call a service creates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ClientConfig {
    /// Absolute `http`/`https` URL that endpoint paths are resolved against.
    pub base_url: String,

    /// Overall per-request deadline in milliseconds (`0` = none).
    pub timeout_ms: u64,

    /// Connection establishment deadline in milliseconds (`0` = none).
    pub connect_timeout_ms: u64,

    /// `User-Agent` header sent with every request.
    pub user_agent: String,

    /// Headers added to every request.
    pub default_headers: BTreeMap<String, String>,
}

impl Default for ClientConfig {
    /// - `base_url = "http://127.0.0.1/"`
    /// - `timeout_ms = 30000`
    /// - `connect_timeout_ms = 10000`
    /// - `user_agent = "fluxcall/<version>"`
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1/".to_string(),
            timeout_ms: 30_000,
            connect_timeout_ms: 10_000,
            user_agent: concat!("fluxcall/", env!("CARGO_PKG_VERSION")).to_string(),
            default_headers: BTreeMap::new(),
        }
    }
}

impl ClientConfig {
    /// Parses and validates a JSON document. Missing fields take defaults.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses, and validates a JSON config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json_str(&json)
    }

    /// Checks the base URL and header names/values.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.base()?;
        for (name, value) in &self.default_headers {
            if reqwest::header::HeaderName::from_bytes(name.as_bytes()).is_err()
                || reqwest::header::HeaderValue::from_str(value).is_err()
            {
                return Err(ConfigError::InvalidHeader { name: name.clone() });
            }
        }
        Ok(())
    }

    /// The parsed base URL.
    pub fn base(&self) -> Result<Url, ConfigError> {
        let url = Url::parse(&self.base_url).map_err(|e| ConfigError::InvalidBaseUrl {
            url: self.base_url.clone(),
            reason: e.to_string(),
        })?;
        match url.scheme() {
            "http" | "https" => Ok(url),
            other => Err(ConfigError::InvalidBaseUrl {
                url: self.base_url.clone(),
                reason: format!("unsupported scheme '{other}'"),
            }),
        }
    }

    /// Resolves an endpoint path (or absolute URL) against the base URL.
    pub fn resolve(&self, path: &str) -> Result<Url, ConfigError> {
        self.base()?
            .join(path)
            .map_err(|e| ConfigError::InvalidBaseUrl {
                url: format!("{}{}", self.base_url, path),
                reason: e.to_string(),
            })
    }

    /// Returns the request timeout as an `Option`.
    #[inline]
    pub fn timeout(&self) -> Option<Duration> {
        (self.timeout_ms > 0).then(|| Duration::from_millis(self.timeout_ms))
    }

    /// Returns the connect timeout as an `Option`.
    #[inline]
    pub fn connect_timeout(&self) -> Option<Duration> {
        (self.connect_timeout_ms > 0).then(|| Duration::from_millis(self.connect_timeout_ms))
    }
}
