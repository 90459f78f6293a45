//! Typed fallback registry: maps failure tags to substitute-value handlers.
//!
//! A failure describes itself as a lineage of [`FailureTag`]s, most specific
//! first (see [`CallError::failure_lineage`]). Resolution walks that lineage
//! and, for each tag, tries the handlers registered under exactly that tag in
//! registration order. The first handler returning `Some` wins:
//!
//! ```text
//! lineage: [http.404, http.4xx, http]
//!
//!   http.404 ─► handlers registered for "http.404" (in order)
//!   http.4xx ─► handlers registered for "http.4xx"
//!   http     ─► handlers registered for "http"
//! ```
//!
//! So the most specific declared tag always beats a more general one, and
//! registration order only breaks ties between handlers of the same tag.

use std::sync::Arc;

use tracing::debug;

use crate::errors::CallError;
use crate::identifiers::FailureTag;
use crate::types::RequestDescriptor;

/// Produces a substitute value for a failed call, or `None` to decline.
pub type FallbackHandler<T> =
    Arc<dyn Fn(&RequestDescriptor, &CallError) -> Option<T> + Send + Sync + 'static>;

/// Ordered set of fallback handlers keyed by failure tag.
///
/// Immutable once handed to a publisher; cloning shares the handlers.
pub struct FallbackRegistry<T> {
    handlers: Vec<(FailureTag, FallbackHandler<T>)>,
}

impl<T> FallbackRegistry<T> {
    pub fn new() -> Self {
        Self {
            handlers: Vec::new(),
        }
    }

    /// Registers `handler` for failures whose lineage contains `tag`.
    #[must_use]
    pub fn with<F>(mut self, tag: FailureTag, handler: F) -> Self
    where
        F: Fn(&RequestDescriptor, &CallError) -> Option<T> + Send + Sync + 'static,
    {
        self.handlers.push((tag, Arc::new(handler)));
        self
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Asks the registered handlers for a substitute for `error`.
    pub fn resolve(&self, request: &RequestDescriptor, error: &CallError) -> Option<T> {
        if self.handlers.is_empty() {
            return None;
        }

        for (depth, tag) in error.failure_lineage().iter().enumerate() {
            let candidates = self.handlers.iter().filter(|(t, _)| t == tag);
            for (_, handler) in candidates {
                if let Some(value) = handler(request, error) {
                    debug!(%tag, depth, %request, "fallback produced a substitute");
                    return Some(value);
                }
            }
        }
        None
    }
}

impl<T> Default for FallbackRegistry<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for FallbackRegistry<T> {
    fn clone(&self) -> Self {
        Self {
            handlers: self.handlers.clone(),
        }
    }
}

impl<T> std::fmt::Debug for FallbackRegistry<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.handlers.iter().map(|(tag, _)| tag))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::{DomainFailure, HttpError, TransportError, TransportErrorKind};
    use crate::identifiers::StatusCode;
    use crate::types::{Headers, RawResponse};
    use chrono::Utc;

    fn tag(s: &str) -> FailureTag {
        FailureTag::new(s).unwrap()
    }

    fn request() -> RequestDescriptor {
        RequestDescriptor::new("GET", "http://localhost/users")
    }

    fn http(status: u16) -> CallError {
        HttpError::new(
            RawResponse {
                request: request(),
                status: StatusCode::new(status).unwrap(),
                reason: String::new(),
                headers: Headers::new(),
                sent_at: Utc::now(),
                received_at: Utc::now(),
            },
            None,
        )
        .into()
    }

    #[test]
    fn empty_registry_declines() {
        let registry = FallbackRegistry::<&str>::new();
        assert!(registry.resolve(&request(), &http(500)).is_none());
    }

    #[test]
    fn most_specific_tag_wins_over_registration_order() {
        let registry = FallbackRegistry::new()
            .with(tag("http"), |_, _| Some("any http"))
            .with(tag("http.4xx"), |_, _| Some("client error"))
            .with(tag("http.404"), |_, _| Some("not found"));

        assert_eq!(registry.resolve(&request(), &http(404)), Some("not found"));
        assert_eq!(registry.resolve(&request(), &http(401)), Some("client error"));
        assert_eq!(registry.resolve(&request(), &http(503)), Some("any http"));
    }

    #[test]
    fn registration_order_breaks_ties_and_declines_fall_through() {
        let registry = FallbackRegistry::new()
            .with(tag("http.404"), |_, _| None)
            .with(tag("http.404"), |_, _| Some("second"))
            .with(tag("http.404"), |_, _| Some("third"));

        assert_eq!(registry.resolve(&request(), &http(404)), Some("second"));
    }

    #[test]
    fn declared_supertypes_of_domain_failures_match() {
        let registry = FallbackRegistry::new()
            .with(tag("rate_limited"), |req: &RequestDescriptor, _: &CallError| {
                Some(format!("retry later: {}", req.url()))
            });

        let domain = DomainFailure::new(tag("quota_exceeded"), "daily quota")
            .extends(tag("rate_limited"));
        let err: CallError = TransportError::new(TransportErrorKind::Other, "429")
            .with_domain(domain)
            .into();

        assert_eq!(
            registry.resolve(&request(), &err).as_deref(),
            Some("retry later: http://localhost/users")
        );
    }

    #[test]
    fn protocol_errors_are_never_substituted() {
        let registry = FallbackRegistry::new().with(tag("transport"), |_, _| Some(1));
        let err = CallError::Protocol(crate::errors::ProtocolViolation::NonPositiveRequest);
        assert!(registry.resolve(&request(), &err).is_none());
    }
}
