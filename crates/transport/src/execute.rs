//! The wire-level exchange: one request out, one response head and body in.
//!
//! [`Execute`] is the seam between [`HttpCall`](crate::HttpCall) and the HTTP
//! client library. [`ReqwestExecutor`] is the production implementation; tests
//! substitute their own.

use async_trait::async_trait;
use chrono::Utc;
use fluxcall::{Headers, RequestDescriptor, Timestamp, TransportError, TransportErrorKind};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use tracing::trace;

use crate::config::ClientConfig;
use crate::errors::{classify, ConfigError};

/// A fully resolved request, ready to put on the wire.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    descriptor: RequestDescriptor,
    headers: Headers,
    body: Option<Vec<u8>>,
}

impl HttpRequest {
    pub fn new(descriptor: RequestDescriptor) -> Self {
        Self {
            descriptor,
            headers: Headers::new(),
            body: None,
        }
    }

    #[must_use]
    pub fn with_headers(mut self, headers: Headers) -> Self {
        self.headers = headers;
        self
    }

    #[must_use]
    pub fn with_body(mut self, body: Vec<u8>) -> Self {
        self.body = Some(body);
        self
    }

    pub fn descriptor(&self) -> &RequestDescriptor {
        &self.descriptor
    }

    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    pub fn body(&self) -> Option<&[u8]> {
        self.body.as_deref()
    }
}

/// What came back over the wire, body fully read.
#[derive(Debug, Clone)]
pub struct WireResponse {
    pub status: u16,
    pub reason: String,
    pub headers: Headers,
    pub body: Vec<u8>,
    /// When the response head arrived.
    pub received_at: Timestamp,
}

/// Performs one HTTP exchange.
///
/// Dropping the returned future must abort the exchange; [`HttpCall`]
/// cancels by aborting the task that polls it.
///
/// [`HttpCall`]: crate::HttpCall
#[async_trait]
pub trait Execute: Send + Sync {
    async fn execute(&self, request: &HttpRequest) -> Result<WireResponse, TransportError>;
}

/// [`Execute`] over a shared `reqwest::Client`.
#[derive(Debug, Clone)]
pub struct ReqwestExecutor {
    client: reqwest::Client,
}

impl ReqwestExecutor {
    /// Builds a client with the config's timeouts, user agent, and default
    /// headers.
    pub fn new(config: &ClientConfig) -> Result<Self, ConfigError> {
        let mut default_headers = HeaderMap::new();
        for (name, value) in &config.default_headers {
            let header_name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|_| ConfigError::InvalidHeader { name: name.clone() })?;
            let header_value = HeaderValue::from_str(value)
                .map_err(|_| ConfigError::InvalidHeader { name: name.clone() })?;
            default_headers.append(header_name, header_value);
        }

        let mut builder = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .default_headers(default_headers);
        if let Some(timeout) = config.timeout() {
            builder = builder.timeout(timeout);
        }
        if let Some(timeout) = config.connect_timeout() {
            builder = builder.connect_timeout(timeout);
        }

        let client = builder.build().map_err(ConfigError::Client)?;
        Ok(Self { client })
    }

    /// Wraps an existing client as-is.
    pub fn from_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Execute for ReqwestExecutor {
    async fn execute(&self, request: &HttpRequest) -> Result<WireResponse, TransportError> {
        let descriptor = request.descriptor();
        let method = reqwest::Method::from_bytes(descriptor.method().as_bytes()).map_err(|e| {
            TransportError::new(
                TransportErrorKind::Other,
                format!("invalid method '{}'", descriptor.method()),
            )
            .with_source(e)
        })?;

        let mut builder = self.client.request(method, descriptor.url());
        for (name, value) in request.headers().iter() {
            builder = builder.header(name, value);
        }
        if let Some(body) = request.body() {
            builder = builder.body(body.to_vec());
        }

        trace!(request = %descriptor, "sending request");
        let response = builder.send().await.map_err(classify)?;
        let received_at = Utc::now();

        let status = response.status();
        let reason = status.canonical_reason().unwrap_or_default().to_string();
        let headers: Headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|value| (name.as_str().to_string(), value.to_string()))
            })
            .collect();
        let body = response.bytes().await.map_err(classify)?.to_vec();
        trace!(request = %descriptor, status = status.as_u16(), bytes = body.len(), "response read");

        Ok(WireResponse {
            status: status.as_u16(),
            reason,
            headers,
            body,
            received_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn executor_rejects_bad_default_header_value() {
        let mut config = ClientConfig::default();
        config
            .default_headers
            .insert("X-Trace".to_string(), "line\nbreak".to_string());
        let err = ReqwestExecutor::new(&config).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidHeader { name } if name == "X-Trace"));
    }

    #[test]
    fn request_builder_keeps_headers_and_body() {
        let request = HttpRequest::new(RequestDescriptor::new("post", "http://api.local/users"))
            .with_headers(Headers::from_iter([("Content-Type", "application/json")]))
            .with_body(b"{}".to_vec());
        assert_eq!(request.descriptor().method(), "POST");
        assert_eq!(request.headers().get("content-type"), Some("application/json"));
        assert_eq!(request.body(), Some(&b"{}"[..]));
    }
}
