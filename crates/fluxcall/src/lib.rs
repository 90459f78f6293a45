//! Reactive adaptation of one-shot HTTP calls.
//!
//! An HTTP call is "invoke once, get one result, fail once". This crate turns
//! it into a cold reactive [`Publisher`] that honours the reactive-stream
//! contract: nothing is emitted before subscription and demand, at most one
//! terminal signal is delivered, and cancellation is safe at any point, even
//! while the transport is mid-flight on another thread.
//!
//! ## Architectural Layer
//!
//! **Adaptation logic + port definitions.** This crate has no I/O
//! dependencies. It defines the [`Call`] and [`Decode`] ports; the `transport`
//! crate implements them over `reqwest`.
//!
//! ## Data flow
//! ```text
//! subscribe ─► CallFactory ─► CallHandle ─► CallSubscription (Awaiting)
//!                                                │
//!                         Scheduler::schedule(dispatch)
//!                                                │
//!                         CallHandle::dispatch_async ─► transport thread
//!                                                              │
//!                         EmissionStrategy::signals(outcome) ◄─┘
//!                                                │
//!                         deliver Next* then Complete | Error  (demand-gated)
//! ```
//!
//! ## Module Layout
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`identifiers`] | Newtypes (`SubscriptionId`, `FailureTag`, `StatusCode`, ...) |
//! | [`types`] | Envelope, result wrapper, outcome, emission, and signal types |
//! | [`errors`] | [`CallError`] and its leaf errors |
//! | [`call`] | [`Call`] / [`Decode`] ports and the one-shot [`CallHandle`] |
//! | [`reactive`] | [`Publisher`] / [`Subscriber`] / [`Subscription`] traits |
//! | [`strategy`] | [`EmissionStrategy`]: outcome to signals |
//! | [`fallback`] | [`FallbackRegistry`]: failure tag to substitute value |
//! | [`scheduler`] | Scheduler gate: [`Immediate`], [`ManualScheduler`] |
//! | [`publisher`] | [`CallAdapter`] factory, [`CallPublisher`] and the mode-typed [`ShapedPublisher`] |
//! | [`blocking`] | [`collect_blocking`] bridge |

pub mod blocking;
pub mod call;
mod controller;
pub mod errors;
pub mod fallback;
pub mod identifiers;
pub mod publisher;
pub mod reactive;
pub mod scheduler;
pub mod strategy;
pub mod types;

// Re-export everything at the crate root for ergonomic usage by downstream crates.
pub use blocking::{collect_blocking, CollectTimeout};
pub use call::{Call, CallHandle, Callback, Decode};
pub use errors::{
    CallError, DecodeError, DomainFailure, HttpError, ProtocolViolation, TransportError,
    TransportErrorKind,
};
pub use fallback::{FallbackHandler, FallbackRegistry};
pub use identifiers::{EndpointName, FailureTag, StatusCode, SubscriptionId};
pub use publisher::{
    BodyPublisher, CallAdapter, CallFactory, CallPublisher, Projection, ResponsePublisher,
    ResultPublisher, ShapedPublisher,
};
pub use reactive::{Publisher, Subscriber, Subscription};
pub use scheduler::{Action, Immediate, ManualScheduler, Scheduler};
pub use strategy::{EmissionStrategy, Signals};
pub use types::{
    CallResult, Emission, Headers, Outcome, RawResponse, RequestDescriptor, Response,
    ResponseSource, Signal, Timestamp,
};
