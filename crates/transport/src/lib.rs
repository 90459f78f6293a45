//! fluxcall HTTP transport adapter.
//!
//! Implements the [`fluxcall::Call`] and [`fluxcall::Decode`] ports over
//! `reqwest`, running every exchange as a task on a tokio runtime.
//!
//! ## Architectural Layer
//!
//! **Infrastructure.** Connection handling, timeouts, status classification,
//! and body decoding live here. The `fluxcall` crate sees only
//! [`fluxcall::Call`] and the [`fluxcall::Outcome`] it reports.
//!
//! ## Outcome mapping
//!
//! | Wire result | Outcome |
//! |-------------|---------|
//! | `2xx`, body decodes | `Success` |
//! | `2xx`, body does not decode | `TransportFailure(Decode)` |
//! | non-`2xx` | `HttpError` (error body kept) |
//! | connect / timeout / I/O failure | `TransportFailure(Transport)` |
//!
//! Timeouts and connect failures carry the `transport.timeout` and
//! `transport.connect` failure tags ahead of `transport`.

pub mod call;
pub mod config;
pub mod decode;
pub mod errors;
pub mod execute;
pub mod scheduler;
pub mod service;

pub use call::HttpCall;
pub use config::ClientConfig;
pub use decode::{BytesDecoder, JsonDecoder, TextDecoder};
pub use errors::{ConfigError, CONNECT_TAG, TIMEOUT_TAG};
pub use execute::{Execute, HttpRequest, ReqwestExecutor, WireResponse};
pub use scheduler::TokioScheduler;
pub use service::{Endpoint, EndpointBuilder, HttpService};
