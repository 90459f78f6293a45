//! Shared value types: request and response metadata, the response envelope,
//! the result wrapper, call outcomes, and stream signals.
//!
//! These types carry no behaviour beyond accessors. The mapping from an
//! [`Outcome`] to a sequence of [`Signal`]s lives in [`crate::strategy`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::CallError;
use crate::identifiers::{EndpointName, StatusCode};

/// A UTC wall-clock instant.
pub type Timestamp = DateTime<Utc>;

// ---------------------------------------------------------------------------
// Request / response metadata
// ---------------------------------------------------------------------------

/// Ordered, case-insensitive multi-map of HTTP header fields.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Headers(Vec<(String, String)>);

impl Headers {
    /// Creates an empty header set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a header field. Existing fields with the same name are kept.
    pub fn append(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.0.push((name.into(), value.into()));
    }

    /// Returns the first value for `name`, compared case-insensitively.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Returns every value for `name` in insertion order.
    pub fn get_all<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.0
            .iter()
            .filter(move |(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Iterates over all `(name, value)` pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Headers {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

/// Describes the request a call was created for.
///
/// This is the "method/arguments context" handed to fallback handlers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestDescriptor {
    method: String,
    url: String,
    endpoint: Option<EndpointName>,
}

impl RequestDescriptor {
    /// Creates a descriptor for `method url`. The method is upper-cased.
    pub fn new(method: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            method: method.into().to_ascii_uppercase(),
            url: url.into(),
            endpoint: None,
        }
    }

    /// Records the API operation this request belongs to.
    #[must_use]
    pub fn with_endpoint(mut self, endpoint: EndpointName) -> Self {
        self.endpoint = Some(endpoint);
        self
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn endpoint(&self) -> Option<&EndpointName> {
        self.endpoint.as_ref()
    }
}

impl std::fmt::Display for RequestDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.method, self.url)
    }
}

/// Everything the transport read from the wire except the body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawResponse {
    /// The request that produced this response.
    pub request: RequestDescriptor,
    /// Status line code.
    pub status: StatusCode,
    /// Status line reason phrase (may be empty).
    pub reason: String,
    /// Response header fields.
    pub headers: Headers,
    /// When the request was handed to the transport.
    pub sent_at: Timestamp,
    /// When the response head was received.
    pub received_at: Timestamp,
}

// ---------------------------------------------------------------------------
// Response envelope and result wrapper
// ---------------------------------------------------------------------------

/// Where a [`Response`] came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResponseSource {
    /// Read from the network.
    Network,
    /// Synthesised from a fallback handler's substitute value.
    Fallback,
}

/// Full HTTP response envelope: status, headers, and body-or-absent.
///
/// The decoded body is present only for `2xx` responses. Non-`2xx` responses
/// keep the undecoded error body bytes instead.
#[derive(Debug, Clone, PartialEq)]
pub struct Response<T> {
    raw: RawResponse,
    body: Option<T>,
    error_body: Option<Vec<u8>>,
    source: ResponseSource,
}

impl<T> Response<T> {
    /// Creates a successful envelope around a decoded body.
    pub fn success(body: T, raw: RawResponse) -> Self {
        Self {
            raw,
            body: Some(body),
            error_body: None,
            source: ResponseSource::Network,
        }
    }

    /// Creates a non-`2xx` envelope; the body is absent.
    pub fn error(raw: RawResponse, error_body: Option<Vec<u8>>) -> Self {
        Self {
            raw,
            body: None,
            error_body,
            source: ResponseSource::Network,
        }
    }

    /// Creates a `200` envelope around a fallback substitute value.
    pub fn fallback(body: T, request: RequestDescriptor) -> Self {
        let now = Utc::now();
        Self {
            raw: RawResponse {
                request,
                status: StatusCode::OK,
                reason: "Fallback".to_string(),
                headers: Headers::new(),
                sent_at: now,
                received_at: now,
            },
            body: Some(body),
            error_body: None,
            source: ResponseSource::Fallback,
        }
    }

    pub fn status(&self) -> StatusCode {
        self.raw.status
    }

    pub fn reason(&self) -> &str {
        &self.raw.reason
    }

    pub fn headers(&self) -> &Headers {
        &self.raw.headers
    }

    /// The decoded body; `None` for non-`2xx` responses.
    pub fn body(&self) -> Option<&T> {
        self.body.as_ref()
    }

    pub fn into_body(self) -> Option<T> {
        self.body
    }

    /// The raw body of a non-`2xx` response, if one was read.
    pub fn error_body(&self) -> Option<&[u8]> {
        self.error_body.as_deref()
    }

    /// Returns `true` if the status is `2xx`.
    pub fn is_successful(&self) -> bool {
        self.raw.status.is_success()
    }

    pub fn raw(&self) -> &RawResponse {
        &self.raw
    }

    pub fn source(&self) -> ResponseSource {
        self.source
    }
}

/// Unifies success and failure as data: either a response envelope (any
/// status) or the error that prevented one.
#[derive(Debug, Clone)]
pub enum CallResult<T> {
    /// A response was received (its status may be non-`2xx`).
    Response(Response<T>),
    /// No usable response: transport or decode failure.
    Error(CallError),
}

impl<T> CallResult<T> {
    pub fn is_error(&self) -> bool {
        matches!(self, CallResult::Error(_))
    }

    pub fn response(&self) -> Option<&Response<T>> {
        match self {
            CallResult::Response(r) => Some(r),
            CallResult::Error(_) => None,
        }
    }

    pub fn error(&self) -> Option<&CallError> {
        match self {
            CallResult::Response(_) => None,
            CallResult::Error(e) => Some(e),
        }
    }
}

// ---------------------------------------------------------------------------
// Outcomes, emissions, and signals
// ---------------------------------------------------------------------------

/// The single completion result of one call, produced exactly once by the
/// transport.
#[derive(Debug)]
pub enum Outcome<T> {
    /// `2xx` response with a decoded body.
    Success {
        /// The decoded body.
        body: T,
        /// Response metadata.
        raw: RawResponse,
    },
    /// Non-`2xx` response that was read successfully.
    HttpError {
        /// Response metadata.
        raw: RawResponse,
        /// Undecoded error body, if any was read.
        error_body: Option<Vec<u8>>,
    },
    /// No usable response: connection, timeout, I/O, or decode failure.
    TransportFailure(CallError),
}

/// One element emitted by a call publisher.
///
/// The variant always matches the publisher's [`EmissionStrategy`](crate::EmissionStrategy).
#[derive(Debug, Clone)]
pub enum Emission<T> {
    /// The decoded body (Body mode).
    Body(T),
    /// The full response envelope (Response mode).
    Response(Response<T>),
    /// The result wrapper (Result mode).
    Result(CallResult<T>),
}

impl<T> Emission<T> {
    pub fn into_body(self) -> Option<T> {
        match self {
            Emission::Body(b) => Some(b),
            _ => None,
        }
    }

    pub fn into_response(self) -> Option<Response<T>> {
        match self {
            Emission::Response(r) => Some(r),
            _ => None,
        }
    }

    pub fn into_result(self) -> Option<CallResult<T>> {
        match self {
            Emission::Result(r) => Some(r),
            _ => None,
        }
    }
}

/// A primitive event delivered to a subscriber.
#[derive(Debug, Clone)]
pub enum Signal<T, E> {
    Next(T),
    Complete,
    Error(E),
}

impl<T, E> Signal<T, E> {
    /// `Complete` and `Error` end the stream.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Signal::Next(_))
    }

    /// Returns a short stable label for logs.
    pub fn as_label(&self) -> &'static str {
        match self {
            Signal::Next(_) => "next",
            Signal::Complete => "complete",
            Signal::Error(_) => "error",
        }
    }
}
