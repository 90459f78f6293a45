//! Transport-facing ports and the one-shot [`CallHandle`].
//!
//! The transport crate implements [`Call`] (one network exchange that reports
//! its [`Outcome`] through a callback) and [`Decode`] (bytes to element type).
//! [`CallHandle`] wraps a `Call` and enforces the one-shot rules no matter how
//! well the transport behaves:
//!
//! - dispatch happens at most once; a second attempt fails fast;
//! - dispatch after cancel fails fast and never reaches the transport;
//! - cancel is idempotent and forwarded to the transport once;
//! - a callback arriving after cancel is swallowed.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::debug;

use crate::errors::{CallError, DecodeError};
use crate::types::{Outcome, RequestDescriptor};

/// Completion callback handed to [`Call::enqueue`].
pub type Callback<T> = Box<dyn FnOnce(Outcome<T>) + Send + 'static>;

/// One asynchronous network invocation.
///
/// Implementations must invoke the callback at most once, from any thread,
/// and must release their transport resources when canceled. They do not need
/// to guard against double dispatch; [`CallHandle`] does that.
pub trait Call<T>: Send + Sync {
    /// The request this call will perform.
    fn request(&self) -> &RequestDescriptor;

    /// Starts the exchange and returns immediately.
    fn enqueue(&self, callback: Callback<T>);

    /// Aborts the exchange if it is still in flight.
    fn cancel(&self);
}

/// Converts a `2xx` response body into the element type.
pub trait Decode<T>: Send + Sync {
    fn decode(&self, body: &[u8]) -> Result<T, DecodeError>;
}

impl<T, F> Decode<T> for F
where
    F: Fn(&[u8]) -> Result<T, DecodeError> + Send + Sync,
{
    fn decode(&self, body: &[u8]) -> Result<T, DecodeError> {
        self(body)
    }
}

/// Exclusive, one-shot ownership of a [`Call`].
pub struct CallHandle<T> {
    call: Box<dyn Call<T>>,
    executed: AtomicBool,
    canceled: Arc<AtomicBool>,
}

impl<T: Send + 'static> CallHandle<T> {
    pub fn new(call: Box<dyn Call<T>>) -> Self {
        Self {
            call,
            executed: AtomicBool::new(false),
            canceled: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Triggers the network invocation.
    ///
    /// # Errors
    ///
    /// - [`CallError::Canceled`] if [`cancel`](Self::cancel) already ran.
    /// - [`CallError::AlreadyExecuted`] if this handle was dispatched before.
    ///
    /// In both cases the transport is never touched.
    pub fn dispatch_async(&self, on_complete: Callback<T>) -> Result<(), CallError> {
        if self.canceled.load(Ordering::Acquire) {
            return Err(CallError::Canceled);
        }
        if self.executed.swap(true, Ordering::AcqRel) {
            return Err(CallError::AlreadyExecuted);
        }

        let canceled = Arc::clone(&self.canceled);
        self.call.enqueue(Box::new(move |outcome| {
            if canceled.load(Ordering::Acquire) {
                debug!("call completed after cancel; outcome discarded");
                return;
            }
            on_complete(outcome);
        }));
        Ok(())
    }

    /// Cancels the call. Only the first invocation reaches the transport.
    pub fn cancel(&self) {
        if !self.canceled.swap(true, Ordering::AcqRel) {
            self.call.cancel();
        }
    }

    pub fn is_executed(&self) -> bool {
        self.executed.load(Ordering::Acquire)
    }

    pub fn is_canceled(&self) -> bool {
        self.canceled.load(Ordering::Acquire)
    }

    pub fn request(&self) -> &RequestDescriptor {
        self.call.request()
    }
}
