//! [`HttpService`]: turns endpoint declarations into call factories.
//!
//! ```text
//! HttpService ── get("users/7").named("users.get") ── decode_with(JsonDecoder) ─► Endpoint<User>
//!                                                                                   │ factory()
//!                                                                 CallAdapter::body(..) ─► BodyPublisher<User>
//! ```
//!
//! Everything that can be wrong with a request (URL, method, body encoding)
//! is caught when the endpoint is built, not when a subscriber subscribes.

use std::sync::Arc;

use fluxcall::{Call, Decode, EndpointName, Headers, RequestDescriptor};
use serde::Serialize;
use tokio::runtime::Handle;
use tracing::debug;

use crate::call::HttpCall;
use crate::config::ClientConfig;
use crate::errors::ConfigError;
use crate::execute::{Execute, HttpRequest, ReqwestExecutor};

/// Shared client state: config, executor, and the runtime calls run on.
#[derive(Clone)]
pub struct HttpService {
    config: Arc<ClientConfig>,
    executor: Arc<dyn Execute>,
    runtime: Handle,
}

impl HttpService {
    /// Service backed by a `reqwest` client built from `config`.
    pub fn new(config: ClientConfig, runtime: Handle) -> Result<Self, ConfigError> {
        config.validate()?;
        let executor = ReqwestExecutor::new(&config)?;
        Self::with_executor(config, Arc::new(executor), runtime)
    }

    /// Service over a caller-supplied executor.
    pub fn with_executor(
        config: ClientConfig,
        executor: Arc<dyn Execute>,
        runtime: Handle,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            config: Arc::new(config),
            executor,
            runtime,
        })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Starts declaring an endpoint. `path` is resolved against the base URL.
    pub fn request(&self, method: &str, path: &str) -> EndpointBuilder {
        EndpointBuilder {
            service: self.clone(),
            method: method.to_string(),
            path: path.to_string(),
            name: None,
            headers: Headers::new(),
            body: None,
        }
    }

    pub fn get(&self, path: &str) -> EndpointBuilder {
        self.request("GET", path)
    }

    pub fn post(&self, path: &str) -> EndpointBuilder {
        self.request("POST", path)
    }
}

impl std::fmt::Debug for HttpService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpService")
            .field("base_url", &self.config.base_url)
            .finish_non_exhaustive()
    }
}

/// Accumulates one endpoint's request template.
#[derive(Debug)]
pub struct EndpointBuilder {
    service: HttpService,
    method: String,
    path: String,
    name: Option<String>,
    headers: Headers,
    body: Option<Vec<u8>>,
}

impl EndpointBuilder {
    /// Names the API operation; fallback handlers see it on the request.
    #[must_use]
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.append(name, value);
        self
    }

    #[must_use]
    pub fn body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Serializes `value` as the JSON request body.
    pub fn json<B: Serialize>(self, value: &B) -> Result<Self, ConfigError> {
        let body = serde_json::to_vec(value).map_err(ConfigError::Body)?;
        Ok(self.header("Content-Type", "application/json").body(body))
    }

    /// Finishes the endpoint with the decoder for `2xx` bodies.
    pub fn decode_with<T, D>(self, decoder: D) -> Result<Endpoint<T>, ConfigError>
    where
        D: Decode<T> + 'static,
    {
        if reqwest::Method::from_bytes(self.method.as_bytes()).is_err() {
            return Err(ConfigError::InvalidMethod {
                method: self.method,
            });
        }
        let url = self.service.config.resolve(&self.path)?;

        let mut descriptor = RequestDescriptor::new(self.method, url.as_str());
        if let Some(endpoint) = self.name.and_then(EndpointName::new) {
            descriptor = descriptor.with_endpoint(endpoint);
        }
        debug!(request = %descriptor, "endpoint declared");

        let mut request = HttpRequest::new(descriptor).with_headers(self.headers);
        if let Some(body) = self.body {
            request = request.with_body(body);
        }

        Ok(Endpoint {
            request: Arc::new(request),
            executor: self.service.executor,
            decoder: Arc::new(decoder),
            runtime: self.service.runtime,
        })
    }
}

/// A declared endpoint. Each [`call`](Self::call) is a fresh one-shot call.
pub struct Endpoint<T> {
    request: Arc<HttpRequest>,
    executor: Arc<dyn Execute>,
    decoder: Arc<dyn Decode<T>>,
    runtime: Handle,
}

impl<T> Clone for Endpoint<T> {
    fn clone(&self) -> Self {
        Self {
            request: Arc::clone(&self.request),
            executor: Arc::clone(&self.executor),
            decoder: Arc::clone(&self.decoder),
            runtime: self.runtime.clone(),
        }
    }
}

impl<T: Send + 'static> Endpoint<T> {
    pub fn descriptor(&self) -> &RequestDescriptor {
        self.request.descriptor()
    }

    /// A new, not yet dispatched call.
    pub fn call(&self) -> Box<dyn Call<T>> {
        Box::new(HttpCall::new(
            Arc::clone(&self.request),
            Arc::clone(&self.executor),
            Arc::clone(&self.decoder),
            self.runtime.clone(),
        ))
    }

    /// A call factory for [`fluxcall::CallAdapter`].
    pub fn factory(&self) -> impl Fn() -> Box<dyn Call<T>> + Send + Sync + 'static {
        let endpoint = self.clone();
        move || endpoint.call()
    }
}

impl<T> std::fmt::Debug for Endpoint<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Endpoint")
            .field("request", self.request.descriptor())
            .finish_non_exhaustive()
    }
}
