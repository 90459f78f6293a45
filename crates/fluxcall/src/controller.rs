//! Subscription controller: binds one [`CallHandle`] to one subscriber.
//!
//! ## State machine
//! ```text
//!                request(n)                   outcome, demand == 0
//!              ┌───────────┐               ┌──────────────────────► Ready ──┐
//!              ▼           │               │                                │ request(n)
//! subscribe ─► Awaiting { demand } ────────┤                                ▼
//!                                          │ outcome, demand > 0        deliver ─► Terminated
//!                                          └────────────────────────────────▲
//!                                                                           │
//! cancel / request(0) from any live state ─────────────────────────────────► Terminated
//! ```
//!
//! ## Exclusion
//! The subscriber reference lives inside the live states. Whoever moves the
//! state to `Terminated` takes it out, and only the holder of that reference
//! may deliver. A racing callback and cancel therefore cannot both deliver,
//! and delivery itself runs outside the lock so subscriber callbacks may call
//! `request` or `cancel` re-entrantly.
//!
//! Once canceled, the subscription is silent: a pending outcome is dropped and
//! an in-progress delivery stops before its next signal.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::{debug, debug_span, trace, warn, Span};

use crate::call::CallHandle;
use crate::errors::{CallError, ProtocolViolation};
use crate::fallback::FallbackRegistry;
use crate::identifiers::SubscriptionId;
use crate::reactive::{Subscriber, Subscription};
use crate::scheduler::Scheduler;
use crate::strategy::{EmissionStrategy, Signals};
use crate::types::{Emission, Outcome, Signal};

type SubscriberRef<T> = Arc<dyn Subscriber<Emission<T>, CallError>>;

enum State<T> {
    /// No outcome yet.
    Awaiting {
        demand: u64,
        subscriber: SubscriberRef<T>,
    },
    /// Outcome arrived before any demand.
    Ready {
        signals: Signals<T>,
        subscriber: SubscriberRef<T>,
    },
    Terminated,
}

/// The [`Subscription`] handed to a call publisher's subscriber.
pub(crate) struct CallSubscription<T> {
    id: SubscriptionId,
    span: Span,
    call: CallHandle<T>,
    strategy: EmissionStrategy,
    fallbacks: FallbackRegistry<T>,
    state: Mutex<State<T>>,
    canceled: AtomicBool,
}

impl<T: Send + 'static> CallSubscription<T> {
    pub(crate) fn new(
        call: CallHandle<T>,
        strategy: EmissionStrategy,
        fallbacks: FallbackRegistry<T>,
        subscriber: SubscriberRef<T>,
    ) -> Arc<Self> {
        let id = SubscriptionId::new_random();
        let span = debug_span!(
            "subscription",
            id = %id,
            strategy = %strategy,
            request = %call.request(),
        );
        Arc::new(Self {
            id,
            span,
            call,
            strategy,
            fallbacks,
            state: Mutex::new(State::Awaiting {
                demand: 0,
                subscriber,
            }),
            canceled: AtomicBool::new(false),
        })
    }

    pub(crate) fn id(&self) -> SubscriptionId {
        self.id
    }

    /// Hands the dispatch to `scheduler`.
    pub(crate) fn start(self: &Arc<Self>, scheduler: &dyn Scheduler) {
        let _entered = self.span.enter();
        debug!(scheduler = scheduler.name(), "scheduling dispatch");
        let this = Arc::clone(self);
        scheduler.schedule(Box::new(move || this.dispatch()));
    }

    fn dispatch(self: Arc<Self>) {
        let _entered = self.span.enter();
        if self.is_canceled() {
            debug!("canceled before dispatch; call never started");
            return;
        }

        let this = Arc::clone(&self);
        let dispatched = self
            .call
            .dispatch_async(Box::new(move |outcome| this.on_outcome(outcome)));
        match dispatched {
            Ok(()) => debug!("call dispatched"),
            Err(error) => self.on_outcome(Outcome::TransportFailure(error)),
        }
    }

    fn on_outcome(&self, outcome: Outcome<T>) {
        let _entered = self.span.enter();
        if self.is_canceled() {
            debug!("outcome arrived after cancel; dropped");
            return;
        }

        let signals = self
            .strategy
            .signals(outcome, self.call.request(), &self.fallbacks);

        let ready = {
            let mut state = self.lock();
            match std::mem::replace(&mut *state, State::Terminated) {
                State::Awaiting {
                    demand,
                    subscriber,
                } if demand > 0 => Some((subscriber, signals)),
                State::Awaiting { subscriber, .. } => {
                    trace!("outcome held until demand");
                    *state = State::Ready {
                        signals,
                        subscriber,
                    };
                    None
                }
                held @ State::Ready { .. } => {
                    *state = held;
                    debug!("second outcome for a one-shot call; dropped");
                    None
                }
                State::Terminated => {
                    debug!("outcome arrived after termination; dropped");
                    None
                }
            }
        };

        if let Some((subscriber, signals)) = ready {
            self.deliver(subscriber, signals);
        }
    }

    fn deliver(&self, subscriber: SubscriberRef<T>, signals: Signals<T>) {
        for signal in signals {
            if self.is_canceled() {
                debug!("canceled during delivery; remaining signals dropped");
                return;
            }
            trace!(signal = signal.as_label(), "delivering");
            match signal {
                Signal::Next(item) => subscriber.on_next(item),
                Signal::Complete => {
                    debug!("completed");
                    subscriber.on_complete();
                }
                Signal::Error(error) => {
                    debug!(error = %error, label = error.as_label(), "terminated with error");
                    subscriber.on_error(error);
                }
            }
        }
    }

    fn violate(&self, violation: ProtocolViolation) {
        let subscriber = match std::mem::replace(&mut *self.lock(), State::Terminated) {
            State::Awaiting { subscriber, .. } | State::Ready { subscriber, .. } => subscriber,
            State::Terminated => return,
        };
        warn!(%violation, "subscriber broke the subscription protocol");
        self.call.cancel();
        self.deliver(subscriber, vec![Signal::Error(CallError::Protocol(violation))]);
    }

    fn is_canceled(&self) -> bool {
        self.canceled.load(Ordering::Acquire)
    }

    fn lock(&self) -> MutexGuard<'_, State<T>> {
        // Subscriber code never runs under this lock, so a poisoned state is
        // still a valid state.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<T: Send + 'static> Subscription for CallSubscription<T> {
    fn request(&self, n: u64) {
        let _entered = self.span.enter();
        if n == 0 {
            self.violate(ProtocolViolation::NonPositiveRequest);
            return;
        }

        let ready = {
            let mut state = self.lock();
            match std::mem::replace(&mut *state, State::Terminated) {
                State::Awaiting { demand, subscriber } => {
                    let demand = demand.saturating_add(n);
                    trace!(demand, "demand recorded");
                    *state = State::Awaiting { demand, subscriber };
                    None
                }
                State::Ready {
                    signals,
                    subscriber,
                } => Some((subscriber, signals)),
                State::Terminated => None,
            }
        };

        if let Some((subscriber, signals)) = ready {
            self.deliver(subscriber, signals);
        }
    }

    fn cancel(&self) {
        let _entered = self.span.enter();
        if self.canceled.swap(true, Ordering::AcqRel) {
            return;
        }
        let previous = std::mem::replace(&mut *self.lock(), State::Terminated);
        drop(previous);
        self.call.cancel();
        debug!("subscription canceled");
    }
}
