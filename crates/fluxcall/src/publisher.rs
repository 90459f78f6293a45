//! Publisher factory: the public entry point.
//!
//! [`CallAdapter`] carries the scheduler gate and builds [`CallPublisher`]s
//! from a call factory and an [`EmissionStrategy`]. [`CallAdapter::body`],
//! [`CallAdapter::response`] and [`CallAdapter::result`] fix the mode up front
//! and return a [`ShapedPublisher`] whose item is that mode's element type:
//! `T`, [`Response<T>`] or [`CallResult<T>`]. Publishers are cold: every
//! `subscribe` creates a fresh call from the factory, a fresh
//! [`CallHandle`], and a fresh subscription controller. Nothing mutable is
//! shared between subscriptions.
//!
//! ## Example
//! ```
//! use fluxcall::{Call, CallAdapter, ManualScheduler};
//!
//! # fn make_call() -> Box<dyn Call<String>> { unimplemented!() }
//! let scheduler = ManualScheduler::new();
//! let adapter = CallAdapter::with_scheduler(scheduler.clone());
//! let users = adapter.body(make_call);
//! // users.subscribe(subscriber);  // nothing is sent yet
//! // scheduler.drain();            // now the call is dispatched
//! ```

use std::sync::Arc;

use tracing::{debug, warn};

use crate::call::{Call, CallHandle};
use crate::controller::CallSubscription;
use crate::errors::CallError;
use crate::fallback::FallbackRegistry;
use crate::reactive::{Publisher, Subscriber, Subscription};
use crate::scheduler::{Immediate, Scheduler};
use crate::strategy::EmissionStrategy;
use crate::types::{CallResult, Emission, Response};

/// Produces one fresh [`Call`] per subscription.
pub type CallFactory<T> = Arc<dyn Fn() -> Box<dyn Call<T>> + Send + Sync + 'static>;

/// Builds call publishers that share one scheduler gate.
#[derive(Clone)]
pub struct CallAdapter {
    scheduler: Arc<dyn Scheduler>,
}

impl CallAdapter {
    /// Adapter that dispatches synchronously on subscribe.
    pub fn create() -> Self {
        Self {
            scheduler: Arc::new(Immediate),
        }
    }

    /// Adapter that hands every dispatch to `scheduler`.
    pub fn with_scheduler(scheduler: impl Scheduler + 'static) -> Self {
        Self {
            scheduler: Arc::new(scheduler),
        }
    }

    /// Like [`with_scheduler`](Self::with_scheduler), for an already shared gate.
    pub fn with_shared_scheduler(scheduler: Arc<dyn Scheduler>) -> Self {
        Self { scheduler }
    }

    pub fn publisher<T, F>(&self, strategy: EmissionStrategy, factory: F) -> CallPublisher<T>
    where
        F: Fn() -> Box<dyn Call<T>> + Send + Sync + 'static,
    {
        CallPublisher::new(Arc::new(factory), strategy, Arc::clone(&self.scheduler))
    }

    /// Publisher of decoded bodies.
    pub fn body<T, F>(&self, factory: F) -> BodyPublisher<T>
    where
        F: Fn() -> Box<dyn Call<T>> + Send + Sync + 'static,
    {
        ShapedPublisher::new(
            self.publisher(EmissionStrategy::Body, factory),
            Emission::into_body,
        )
    }

    /// Publisher of response envelopes.
    pub fn response<T, F>(&self, factory: F) -> ResponsePublisher<T>
    where
        F: Fn() -> Box<dyn Call<T>> + Send + Sync + 'static,
    {
        ShapedPublisher::new(
            self.publisher(EmissionStrategy::Response, factory),
            Emission::into_response,
        )
    }

    /// Publisher of result wrappers.
    pub fn result<T, F>(&self, factory: F) -> ResultPublisher<T>
    where
        F: Fn() -> Box<dyn Call<T>> + Send + Sync + 'static,
    {
        ShapedPublisher::new(
            self.publisher(EmissionStrategy::Result, factory),
            Emission::into_result,
        )
    }
}

impl Default for CallAdapter {
    fn default() -> Self {
        Self::create()
    }
}

impl std::fmt::Debug for CallAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CallAdapter")
            .field("scheduler", &self.scheduler.name())
            .finish()
    }
}

/// Cold publisher of one HTTP call per subscription.
pub struct CallPublisher<T> {
    factory: CallFactory<T>,
    strategy: EmissionStrategy,
    scheduler: Arc<dyn Scheduler>,
    fallbacks: FallbackRegistry<T>,
}

impl<T> CallPublisher<T> {
    pub fn new(
        factory: CallFactory<T>,
        strategy: EmissionStrategy,
        scheduler: Arc<dyn Scheduler>,
    ) -> Self {
        Self {
            factory,
            strategy,
            scheduler,
            fallbacks: FallbackRegistry::new(),
        }
    }

    /// Consults `fallbacks` before any failure is delivered.
    #[must_use]
    pub fn with_fallbacks(mut self, fallbacks: FallbackRegistry<T>) -> Self {
        self.fallbacks = fallbacks;
        self
    }

    pub fn strategy(&self) -> EmissionStrategy {
        self.strategy
    }
}

impl<T> Clone for CallPublisher<T> {
    fn clone(&self) -> Self {
        Self {
            factory: Arc::clone(&self.factory),
            strategy: self.strategy,
            scheduler: Arc::clone(&self.scheduler),
            fallbacks: self.fallbacks.clone(),
        }
    }
}

impl<T: Send + 'static> Publisher for CallPublisher<T> {
    type Item = Emission<T>;
    type Error = CallError;

    fn subscribe(&self, subscriber: Arc<dyn Subscriber<Emission<T>, CallError>>) {
        let call = CallHandle::new((self.factory)());
        let subscription = CallSubscription::new(
            call,
            self.strategy,
            self.fallbacks.clone(),
            Arc::clone(&subscriber),
        );
        debug!(subscription = %subscription.id(), strategy = %self.strategy, "subscribed");

        subscriber.on_subscribe(Arc::clone(&subscription) as Arc<dyn Subscription>);
        subscription.start(self.scheduler.as_ref());
    }
}

// ---------------------------------------------------------------------------
// Mode-typed publishers
// ---------------------------------------------------------------------------

/// Extracts a mode's element from an [`Emission`] of that mode.
pub type Projection<T, I> = fn(Emission<T>) -> Option<I>;

/// Emits decoded bodies.
pub type BodyPublisher<T> = ShapedPublisher<T, T>;

/// Emits response envelopes.
pub type ResponsePublisher<T> = ShapedPublisher<T, Response<T>>;

/// Emits result wrappers.
pub type ResultPublisher<T> = ShapedPublisher<T, CallResult<T>>;

/// A [`CallPublisher`] fixed to one emission mode, emitting that mode's
/// element type `I` instead of an [`Emission`].
pub struct ShapedPublisher<T, I> {
    inner: CallPublisher<T>,
    project: Projection<T, I>,
}

impl<T, I> ShapedPublisher<T, I> {
    fn new(inner: CallPublisher<T>, project: Projection<T, I>) -> Self {
        Self { inner, project }
    }

    /// Consults `fallbacks` before any failure is delivered.
    #[must_use]
    pub fn with_fallbacks(self, fallbacks: FallbackRegistry<T>) -> Self {
        Self {
            inner: self.inner.with_fallbacks(fallbacks),
            project: self.project,
        }
    }

    pub fn strategy(&self) -> EmissionStrategy {
        self.inner.strategy()
    }

    /// The untyped publisher underneath.
    pub fn into_inner(self) -> CallPublisher<T> {
        self.inner
    }
}

impl<T, I> Clone for ShapedPublisher<T, I> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            project: self.project,
        }
    }
}

impl<T: Send + 'static, I: Send + 'static> Publisher for ShapedPublisher<T, I> {
    type Item = I;
    type Error = CallError;

    fn subscribe(&self, subscriber: Arc<dyn Subscriber<I, CallError>>) {
        self.inner.subscribe(Arc::new(Projected {
            downstream: subscriber,
            project: self.project,
            strategy: self.inner.strategy(),
        }));
    }
}

/// Forwards every signal downstream, projecting items on the way.
struct Projected<T, I> {
    downstream: Arc<dyn Subscriber<I, CallError>>,
    project: Projection<T, I>,
    strategy: EmissionStrategy,
}

impl<T: Send, I> Subscriber<Emission<T>, CallError> for Projected<T, I> {
    fn on_subscribe(&self, subscription: Arc<dyn Subscription>) {
        self.downstream.on_subscribe(subscription);
    }

    fn on_next(&self, item: Emission<T>) {
        match (self.project)(item) {
            Some(item) => self.downstream.on_next(item),
            None => warn!(strategy = %self.strategy, "emission of another mode; dropped"),
        }
    }

    fn on_error(&self, error: CallError) {
        self.downstream.on_error(error);
    }

    fn on_complete(&self) {
        self.downstream.on_complete();
    }
}
