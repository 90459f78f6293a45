//! Error types delivered through call publishers.
//!
//! [`CallError`] is the single error type a subscriber ever sees. Its variants
//! follow the failure taxonomy of a one-shot HTTP call:
//!
//! | Variant | Meaning | Body mode | Response mode | Result mode |
//! |---------|---------|-----------|---------------|-------------|
//! | `Http` | non-`2xx` status, response read | stream error | data | data |
//! | `Transport` | connection / timeout / I/O | stream error | stream error | data |
//! | `Decode` | body could not be converted | stream error | stream error | data |
//! | `Protocol` | `request(0)` | stream error, immediately | same | same |
//!
//! Every failure can describe itself as a lineage of [`FailureTag`]s, most
//! specific first, which the [`FallbackRegistry`](crate::FallbackRegistry)
//! uses to pick a substitute value.

use std::error::Error as StdError;
use std::sync::Arc;

use thiserror::Error;

use crate::identifiers::{FailureTag, StatusCode};
use crate::types::RawResponse;

/// Built-in failure tags used by [`CallError::failure_lineage`].
pub mod tags {
    /// Root tag of every HTTP status failure.
    pub const HTTP: &str = "http";
    /// Root tag of every transport failure.
    pub const TRANSPORT: &str = "transport";
    /// Tag of body decode failures.
    pub const DECODE: &str = "decode";
}

// ---------------------------------------------------------------------------
// Domain failures
// ---------------------------------------------------------------------------

/// A recognised, domain-specific failure attached to a transport error.
///
/// The lineage lists the failure's own tag first, followed by each declared
/// supertype from most to least specific.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DomainFailure {
    lineage: Vec<FailureTag>,
    message: String,
}

impl DomainFailure {
    pub fn new(tag: FailureTag, message: impl Into<String>) -> Self {
        Self {
            lineage: vec![tag],
            message: message.into(),
        }
    }

    /// Declares the next, more general supertype of this failure.
    #[must_use]
    pub fn extends(mut self, parent: FailureTag) -> Self {
        if !self.lineage.contains(&parent) {
            self.lineage.push(parent);
        }
        self
    }

    /// The failure's own (most specific) tag.
    pub fn tag(&self) -> &FailureTag {
        &self.lineage[0]
    }

    pub fn lineage(&self) -> &[FailureTag] {
        &self.lineage
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl std::fmt::Display for DomainFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.tag(), self.message)
    }
}

// ---------------------------------------------------------------------------
// Leaf errors
// ---------------------------------------------------------------------------

/// Coarse classification of a transport failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportErrorKind {
    /// Connection could not be established or was dropped.
    Connect,
    /// The transport's own deadline elapsed.
    Timeout,
    /// Reading or writing the exchange failed.
    Io,
    Other,
}

impl TransportErrorKind {
    pub fn as_label(self) -> &'static str {
        match self {
            TransportErrorKind::Connect => "connect",
            TransportErrorKind::Timeout => "timeout",
            TransportErrorKind::Io => "io",
            TransportErrorKind::Other => "other",
        }
    }
}

impl std::fmt::Display for TransportErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_label())
    }
}

/// The network exchange failed before a response could be read.
#[derive(Debug, Clone, Error)]
#[error("{kind} failure: {message}")]
pub struct TransportError {
    kind: TransportErrorKind,
    message: String,
    domain: Option<DomainFailure>,
    #[source]
    source: Option<Arc<dyn StdError + Send + Sync>>,
}

impl TransportError {
    pub fn new(kind: TransportErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            domain: None,
            source: None,
        }
    }

    /// Attaches the underlying error.
    #[must_use]
    pub fn with_source(mut self, source: impl StdError + Send + Sync + 'static) -> Self {
        self.source = Some(Arc::new(source));
        self
    }

    /// Marks this failure as a recognised domain failure.
    #[must_use]
    pub fn with_domain(mut self, domain: DomainFailure) -> Self {
        self.domain = Some(domain);
        self
    }

    pub fn kind(&self) -> TransportErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn domain(&self) -> Option<&DomainFailure> {
        self.domain.as_ref()
    }
}

/// A non-`2xx` response, surfaced as an error in Body mode.
///
/// Displays as `HTTP {code} {reason}`, e.g. `HTTP 404 Client Error`.
#[derive(Debug, Clone)]
pub struct HttpError {
    raw: RawResponse,
    error_body: Option<Vec<u8>>,
}

impl HttpError {
    pub fn new(raw: RawResponse, error_body: Option<Vec<u8>>) -> Self {
        Self { raw, error_body }
    }

    pub fn status(&self) -> StatusCode {
        self.raw.status
    }

    pub fn raw(&self) -> &RawResponse {
        &self.raw
    }

    pub fn error_body(&self) -> Option<&[u8]> {
        self.error_body.as_deref()
    }
}

impl std::fmt::Display for HttpError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.raw.reason.is_empty() {
            write!(f, "HTTP {}", self.raw.status)
        } else {
            write!(f, "HTTP {} {}", self.raw.status, self.raw.reason)
        }
    }
}

impl StdError for HttpError {}

/// The response body could not be converted to the element type.
#[derive(Debug, Clone, Error)]
#[error("could not decode body as {target}: {message}")]
pub struct DecodeError {
    target: &'static str,
    message: String,
    #[source]
    source: Option<Arc<dyn StdError + Send + Sync>>,
}

impl DecodeError {
    pub fn new(target: &'static str, message: impl Into<String>) -> Self {
        Self {
            target,
            message: message.into(),
            source: None,
        }
    }

    #[must_use]
    pub fn with_source(mut self, source: impl StdError + Send + Sync + 'static) -> Self {
        self.source = Some(Arc::new(source));
        self
    }

    /// Name of the type decoding was attempted into.
    pub fn target(&self) -> &'static str {
        self.target
    }
}

/// Misuse of the subscription contract by the subscriber.
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ProtocolViolation {
    /// `request(0)`: demand must be at least one.
    #[error("request(n) requires n >= 1, got 0")]
    NonPositiveRequest,
}

// ---------------------------------------------------------------------------
// CallError
// ---------------------------------------------------------------------------

/// Every error a call publisher can deliver.
#[non_exhaustive]
#[derive(Debug, Clone, Error)]
pub enum CallError {
    #[error(transparent)]
    Http(#[from] HttpError),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error("subscription protocol violation: {0}")]
    Protocol(#[from] ProtocolViolation),

    /// The call object was already dispatched once.
    #[error("call already executed")]
    AlreadyExecuted,

    /// The call was canceled before it could be dispatched.
    #[error("call canceled")]
    Canceled,
}

impl CallError {
    /// Returns a short stable label (snake_case) for use in logs.
    pub fn as_label(&self) -> &'static str {
        match self {
            CallError::Http(_) => "call_http",
            CallError::Transport(_) => "call_transport",
            CallError::Decode(_) => "call_decode",
            CallError::Protocol(_) => "call_protocol_violation",
            CallError::AlreadyExecuted => "call_already_executed",
            CallError::Canceled => "call_canceled",
        }
    }

    /// The HTTP status, for `Http` errors.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            CallError::Http(e) => Some(e.status()),
            _ => None,
        }
    }

    /// Tags describing this failure, most specific first.
    ///
    /// - `Http`: `http.{code}`, `http.{class}xx`, `http`
    /// - `Transport`: the domain failure's lineage (if any), then `transport`
    /// - `Decode`: `decode`
    /// - anything else: empty, never eligible for a fallback
    pub fn failure_lineage(&self) -> Vec<FailureTag> {
        match self {
            CallError::Http(e) => {
                let status = e.status();
                [
                    format!("{}.{}", tags::HTTP, status),
                    format!("{}.{}xx", tags::HTTP, status.class()),
                    tags::HTTP.to_string(),
                ]
                .into_iter()
                .filter_map(FailureTag::new)
                .collect()
            }
            CallError::Transport(e) => {
                let mut lineage: Vec<FailureTag> = e
                    .domain()
                    .map(|d| d.lineage().to_vec())
                    .unwrap_or_default();
                lineage.extend(FailureTag::new(tags::TRANSPORT));
                lineage
            }
            CallError::Decode(_) => FailureTag::new(tags::DECODE).into_iter().collect(),
            CallError::Protocol(_) | CallError::AlreadyExecuted | CallError::Canceled => {
                Vec::new()
            }
        }
    }
}
