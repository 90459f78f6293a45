//! Emission strategies: how one [`Outcome`] becomes a sequence of [`Signal`]s.
//!
//! | Outcome | Body | Response | Result |
//! |---------|------|----------|--------|
//! | Success | `Next(body)`, `Complete` | `Next(envelope)`, `Complete` | `Next(Response(envelope))`, `Complete` |
//! | HttpError | `Error(http)` | `Next(envelope)`, `Complete` | `Next(Response(envelope))`, `Complete` |
//! | TransportFailure | `Error(e)` | `Error(e)` | `Next(Error(e))`, `Complete` |
//!
//! Whenever the default mapping would treat the outcome as a failure (every
//! `Error` cell above, plus the failure captured as data in Result mode), the
//! [`FallbackRegistry`] is consulted first. A substitute turns the sequence
//! into `Next(substitute)`, `Complete`; in Response and Result modes the
//! substitute is wrapped in a [`Response::fallback`] envelope.

use serde::{Deserialize, Serialize};

use crate::errors::{CallError, HttpError};
use crate::fallback::FallbackRegistry;
use crate::types::{CallResult, Emission, Outcome, RequestDescriptor, Response, Signal};

/// Signals produced for one outcome.
pub type Signals<T> = Vec<Signal<Emission<T>, CallError>>;

/// The three element shapes a call publisher can emit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmissionStrategy {
    /// Emit the decoded body; any failure is a stream error.
    Body,
    /// Emit the response envelope for any status; only transport failures are errors.
    Response,
    /// Emit a result wrapper; nothing is ever a stream error.
    Result,
}

impl EmissionStrategy {
    pub fn as_label(self) -> &'static str {
        match self {
            EmissionStrategy::Body => "body",
            EmissionStrategy::Response => "response",
            EmissionStrategy::Result => "result",
        }
    }

    /// Maps `outcome` to the ordered signals to deliver.
    pub fn signals<T>(
        self,
        outcome: Outcome<T>,
        request: &RequestDescriptor,
        fallbacks: &FallbackRegistry<T>,
    ) -> Signals<T> {
        match (self, outcome) {
            (EmissionStrategy::Body, Outcome::Success { body, .. }) => completed(Emission::Body(body)),
            (EmissionStrategy::Body, Outcome::HttpError { raw, error_body }) => {
                let error = CallError::from(HttpError::new(raw, error_body));
                match fallbacks.resolve(request, &error) {
                    Some(substitute) => completed(Emission::Body(substitute)),
                    None => vec![Signal::Error(error)],
                }
            }
            (EmissionStrategy::Body, Outcome::TransportFailure(error)) => {
                match fallbacks.resolve(request, &error) {
                    Some(substitute) => completed(Emission::Body(substitute)),
                    None => vec![Signal::Error(error)],
                }
            }

            (EmissionStrategy::Response, Outcome::Success { body, raw }) => {
                completed(Emission::Response(Response::success(body, raw)))
            }
            (EmissionStrategy::Response, Outcome::HttpError { raw, error_body }) => {
                completed(Emission::Response(Response::error(raw, error_body)))
            }
            (EmissionStrategy::Response, Outcome::TransportFailure(error)) => {
                match fallbacks.resolve(request, &error) {
                    Some(substitute) => completed(Emission::Response(Response::fallback(
                        substitute,
                        request.clone(),
                    ))),
                    None => vec![Signal::Error(error)],
                }
            }

            (EmissionStrategy::Result, Outcome::Success { body, raw }) => completed(Emission::Result(
                CallResult::Response(Response::success(body, raw)),
            )),
            (EmissionStrategy::Result, Outcome::HttpError { raw, error_body }) => completed(
                Emission::Result(CallResult::Response(Response::error(raw, error_body))),
            ),
            (EmissionStrategy::Result, Outcome::TransportFailure(error)) => {
                let result = match fallbacks.resolve(request, &error) {
                    Some(substitute) => {
                        CallResult::Response(Response::fallback(substitute, request.clone()))
                    }
                    None => CallResult::Error(error),
                };
                completed(Emission::Result(result))
            }
        }
    }
}

impl std::fmt::Display for EmissionStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_label())
    }
}

fn completed<T>(item: Emission<T>) -> Signals<T> {
    vec![Signal::Next(item), Signal::Complete]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::{DecodeError, TransportError, TransportErrorKind};
    use crate::identifiers::{FailureTag, StatusCode};
    use crate::types::{Headers, RawResponse, ResponseSource};
    use chrono::Utc;

    fn request() -> RequestDescriptor {
        RequestDescriptor::new("GET", "http://localhost/")
    }

    fn raw(status: u16) -> RawResponse {
        RawResponse {
            request: request(),
            status: StatusCode::new(status).unwrap(),
            reason: if status == 200 { "OK" } else { "Client Error" }.to_string(),
            headers: Headers::new(),
            sent_at: Utc::now(),
            received_at: Utc::now(),
        }
    }

    fn success() -> Outcome<String> {
        Outcome::Success {
            body: "Hi".to_string(),
            raw: raw(200),
        }
    }

    fn not_found() -> Outcome<String> {
        Outcome::HttpError {
            raw: raw(404),
            error_body: Some(b"missing".to_vec()),
        }
    }

    fn dropped() -> Outcome<String> {
        Outcome::TransportFailure(
            TransportError::new(TransportErrorKind::Connect, "connection reset").into(),
        )
    }

    fn none() -> FallbackRegistry<String> {
        FallbackRegistry::new()
    }

    fn labels(signals: &Signals<String>) -> Vec<&'static str> {
        signals.iter().map(Signal::as_label).collect()
    }

    #[test]
    fn body_success_emits_value_then_complete() {
        let mut signals = EmissionStrategy::Body.signals(success(), &request(), &none());
        assert_eq!(labels(&signals), vec!["next", "complete"]);
        match signals.remove(0) {
            Signal::Next(e) => assert_eq!(e.into_body().as_deref(), Some("Hi")),
            other => panic!("expected next, got {other:?}"),
        }
    }

    #[test]
    fn body_http_error_is_stream_error() {
        let signals = EmissionStrategy::Body.signals(not_found(), &request(), &none());
        match signals.as_slice() {
            [Signal::Error(CallError::Http(e))] => {
                assert_eq!(e.status().as_u16(), 404);
                assert_eq!(e.error_body(), Some(&b"missing"[..]));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn response_http_error_is_data() {
        let mut signals = EmissionStrategy::Response.signals(not_found(), &request(), &none());
        assert_eq!(labels(&signals), vec!["next", "complete"]);
        let Signal::Next(item) = signals.remove(0) else {
            panic!("expected next")
        };
        let response = item.into_response().unwrap();
        assert_eq!(response.status().as_u16(), 404);
        assert!(response.body().is_none());
        assert!(!response.is_successful());
    }

    #[test]
    fn response_transport_failure_is_stream_error() {
        let signals = EmissionStrategy::Response.signals(dropped(), &request(), &none());
        assert!(matches!(
            signals.as_slice(),
            [Signal::Error(CallError::Transport(_))]
        ));
    }

    #[test]
    fn result_never_errors() {
        for outcome in [success(), not_found(), dropped()] {
            let signals = EmissionStrategy::Result.signals(outcome, &request(), &none());
            assert_eq!(labels(&signals), vec!["next", "complete"]);
        }

        let mut signals = EmissionStrategy::Result.signals(dropped(), &request(), &none());
        let Signal::Next(item) = signals.remove(0) else {
            panic!("expected next")
        };
        let result = item.into_result().unwrap();
        assert!(result.is_error());
        assert!(matches!(result.error(), Some(CallError::Transport(_))));
    }

    #[test]
    fn decode_failure_follows_transport_rules() {
        let decode = || Outcome::<String>::TransportFailure(DecodeError::new("String", "bad utf-8").into());

        let body = EmissionStrategy::Body.signals(decode(), &request(), &none());
        assert!(matches!(body.as_slice(), [Signal::Error(CallError::Decode(_))]));

        let result = EmissionStrategy::Result.signals(decode(), &request(), &none());
        assert_eq!(labels(&result), vec!["next", "complete"]);
    }

    #[test]
    fn fallback_substitutes_in_every_mode() {
        let registry = FallbackRegistry::new()
            .with(FailureTag::new("transport").unwrap(), |_, _| Some("cached".to_string()))
            .with(FailureTag::new("http.404").unwrap(), |_, _| Some("default".to_string()));

        let mut body = EmissionStrategy::Body.signals(not_found(), &request(), &registry);
        assert_eq!(labels(&body), vec!["next", "complete"]);
        let Signal::Next(item) = body.remove(0) else { panic!() };
        assert_eq!(item.into_body().as_deref(), Some("default"));

        let mut response = EmissionStrategy::Response.signals(dropped(), &request(), &registry);
        let Signal::Next(item) = response.remove(0) else { panic!() };
        let envelope = item.into_response().unwrap();
        assert_eq!(envelope.source(), ResponseSource::Fallback);
        assert_eq!(envelope.body().map(String::as_str), Some("cached"));

        let mut result = EmissionStrategy::Result.signals(dropped(), &request(), &registry);
        let Signal::Next(item) = result.remove(0) else { panic!() };
        assert!(!item.into_result().unwrap().is_error());
    }

    #[test]
    fn strategy_json_uses_the_label() {
        for strategy in [
            EmissionStrategy::Body,
            EmissionStrategy::Response,
            EmissionStrategy::Result,
        ] {
            let json = serde_json::to_string(&strategy).unwrap();
            assert_eq!(json, format!("\"{}\"", strategy.as_label()));
        }
        let parsed: EmissionStrategy = serde_json::from_str(r#""response""#).unwrap();
        assert_eq!(parsed, EmissionStrategy::Response);
        assert!(serde_json::from_str::<EmissionStrategy>(r#""Body""#).is_err());
    }

    #[test]
    fn response_mode_keeps_http_errors_as_data_even_with_fallbacks() {
        let registry = FallbackRegistry::new()
            .with(FailureTag::new("http").unwrap(), |_, _| Some("unused".to_string()));
        let mut signals = EmissionStrategy::Response.signals(not_found(), &request(), &registry);
        let Signal::Next(item) = signals.remove(0) else { panic!() };
        assert_eq!(item.into_response().unwrap().status().as_u16(), 404);
    }
}
