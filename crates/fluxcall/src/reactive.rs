//! Reactive-stream port traits: [`Publisher`], [`Subscriber`], [`Subscription`].
//!
//! ## Contract
//!
//! ```text
//! publisher.subscribe(subscriber)
//!     └─► subscriber.on_subscribe(subscription)      exactly once, first
//!             └─► subscription.request(n)            n >= 1, may be called any time
//!     └─► subscriber.on_next(item)                   at most the requested count
//!     └─► subscriber.on_complete() | on_error(e)     at most once, last
//! ```
//!
//! - No `on_next` is delivered before demand has been requested.
//! - After a terminal signal or after [`Subscription::cancel`], nothing more is
//!   delivered.
//! - Signals for one subscription are never delivered concurrently.
//! - Subscriber callbacks may call back into the subscription (`request`,
//!   `cancel`) without deadlocking.

use std::sync::Arc;

/// Handle a subscriber uses to signal demand or cancel.
pub trait Subscription: Send + Sync {
    /// Adds `n` to the outstanding demand. `n == 0` is a protocol violation
    /// and terminates the subscription with an error.
    fn request(&self, n: u64);

    /// Stops delivery. Idempotent.
    fn cancel(&self);
}

/// Receives the signals of one subscription.
///
/// Callbacks may arrive on a transport-owned thread.
pub trait Subscriber<T, E>: Send + Sync {
    fn on_subscribe(&self, subscription: Arc<dyn Subscription>);

    fn on_next(&self, item: T);

    fn on_error(&self, error: E);

    fn on_complete(&self);
}

/// A cold source of signals: every subscribe starts an independent run.
pub trait Publisher: Send + Sync {
    type Item;
    type Error;

    fn subscribe(&self, subscriber: Arc<dyn Subscriber<Self::Item, Self::Error>>);
}
