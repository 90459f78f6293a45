//! Transport-side errors and the `reqwest` error classification.

use fluxcall::{DomainFailure, FailureTag, TransportError, TransportErrorKind};
use thiserror::Error;

/// Failure loading or applying a [`ClientConfig`](crate::ClientConfig).
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file '{path}': {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid base URL '{url}': {reason}")]
    InvalidBaseUrl { url: String, reason: String },

    #[error("invalid default header '{name}'")]
    InvalidHeader { name: String },

    #[error("invalid HTTP method '{method}'")]
    InvalidMethod { method: String },

    #[error("failed to encode request body: {0}")]
    Body(#[source] serde_json::Error),

    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),
}

impl ConfigError {
    pub fn as_label(&self) -> &'static str {
        match self {
            ConfigError::Read { .. } => "config_read",
            ConfigError::Parse(_) => "config_parse",
            ConfigError::InvalidBaseUrl { .. } => "config_invalid_base_url",
            ConfigError::InvalidHeader { .. } => "config_invalid_header",
            ConfigError::InvalidMethod { .. } => "config_invalid_method",
            ConfigError::Body(_) => "config_body",
            ConfigError::Client(_) => "config_client",
        }
    }
}

/// Tag for requests that hit the configured deadline.
pub const TIMEOUT_TAG: &str = "transport.timeout";
/// Tag for connections that could not be established.
pub const CONNECT_TAG: &str = "transport.connect";

/// Maps a `reqwest` failure onto the transport error taxonomy.
///
/// Timeouts and connect failures carry a domain lineage
/// (`transport.timeout` / `transport.connect`) so fallbacks can target them.
pub(crate) fn classify(error: reqwest::Error) -> TransportError {
    let (kind, tag) = if error.is_timeout() {
        (TransportErrorKind::Timeout, Some(TIMEOUT_TAG))
    } else if error.is_connect() {
        (TransportErrorKind::Connect, Some(CONNECT_TAG))
    } else if error.is_body() || error.is_decode() || error.is_request() {
        (TransportErrorKind::Io, None)
    } else {
        (TransportErrorKind::Other, None)
    };

    let message = error.to_string();
    let mut transport = TransportError::new(kind, message.clone());
    if let Some(tag) = tag.and_then(FailureTag::new) {
        transport = transport.with_domain(DomainFailure::new(tag, message));
    }
    transport.with_source(error)
}
