//! Blocking bridge for callers without a reactive pipeline.
//!
//! [`collect_blocking`] subscribes with unbounded demand and parks the
//! calling thread until the publisher terminates or the timeout elapses. On
//! timeout the subscription is canceled so the call releases its resources.
//!
//! Do not call this from inside an async runtime worker thread: the transport
//! may need that thread to make progress.

use std::sync::{Arc, Condvar, Mutex, PoisonError};
use std::time::{Duration, Instant};

use thiserror::Error;
use tracing::debug;

use crate::reactive::{Publisher, Subscriber, Subscription};
use crate::types::Signal;

/// The publisher did not terminate in time.
#[derive(Debug, Error)]
#[error("publisher did not terminate within {timeout:?}")]
pub struct CollectTimeout {
    /// The configured wait.
    pub timeout: Duration,
}

struct Collected<T, E> {
    signals: Vec<Signal<T, E>>,
    subscription: Option<Arc<dyn Subscription>>,
    terminated: bool,
}

struct Collector<T, E> {
    inner: Mutex<Collected<T, E>>,
    done: Condvar,
}

impl<T, E> Collector<T, E> {
    fn push(&self, signal: Signal<T, E>) {
        let mut inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        if signal.is_terminal() {
            inner.terminated = true;
            inner.subscription = None;
        }
        inner.signals.push(signal);
        self.done.notify_all();
    }
}

impl<T: Send, E: Send> Subscriber<T, E> for Collector<T, E> {
    fn on_subscribe(&self, subscription: Arc<dyn Subscription>) {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .subscription = Some(Arc::clone(&subscription));
        subscription.request(u64::MAX);
    }

    fn on_next(&self, item: T) {
        self.push(Signal::Next(item));
    }

    fn on_error(&self, error: E) {
        self.push(Signal::Error(error));
    }

    fn on_complete(&self) {
        self.push(Signal::Complete);
    }
}

/// Subscribes to `publisher` and waits for its terminal signal.
///
/// Returns every signal received, terminal signal last.
///
/// # Errors
///
/// [`CollectTimeout`] if no terminal signal arrived within `timeout`; the
/// subscription has been canceled by then.
pub fn collect_blocking<P>(
    publisher: &P,
    timeout: Duration,
) -> Result<Vec<Signal<P::Item, P::Error>>, CollectTimeout>
where
    P: Publisher,
    P::Item: Send + 'static,
    P::Error: Send + 'static,
{
    let collector = Arc::new(Collector {
        inner: Mutex::new(Collected {
            signals: Vec::new(),
            subscription: None,
            terminated: false,
        }),
        done: Condvar::new(),
    });
    publisher.subscribe(Arc::clone(&collector) as Arc<dyn Subscriber<P::Item, P::Error>>);

    let deadline = Instant::now() + timeout;
    let mut inner = collector.inner.lock().unwrap_or_else(PoisonError::into_inner);
    while !inner.terminated {
        let now = Instant::now();
        if now >= deadline {
            let subscription = inner.subscription.take();
            drop(inner);
            if let Some(subscription) = subscription {
                subscription.cancel();
            }
            debug!(?timeout, "blocking collection timed out; subscription canceled");
            return Err(CollectTimeout { timeout });
        }
        inner = collector
            .done
            .wait_timeout(inner, deadline - now)
            .unwrap_or_else(PoisonError::into_inner)
            .0;
    }
    Ok(std::mem::take(&mut inner.signals))
}
