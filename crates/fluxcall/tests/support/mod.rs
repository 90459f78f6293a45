//! Shared fixtures: a scripted in-memory transport and a recording subscriber.
#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::time::{Duration, Instant};

use chrono::Utc;
use fluxcall::{
    Call, CallError, Callback, Emission, Headers, Outcome, RawResponse, RequestDescriptor,
    Signal, StatusCode, Subscriber, Subscription, TransportError, TransportErrorKind,
};

pub const WAIT: Duration = Duration::from_secs(5);

// ---------------------------------------------------------------------------
// Scripted transport
// ---------------------------------------------------------------------------

/// What the fake server answers.
#[derive(Debug, Clone, Copy)]
pub enum Reply {
    /// `200 OK` with the given body.
    Body(&'static str),
    /// Given status, no body.
    Status(u16),
    /// Connection dropped after the request was sent.
    Disconnect,
}

/// When the fake transport invokes the completion callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// Inside `enqueue`, on the dispatching thread.
    Inline,
    /// On a freshly spawned thread.
    Thread,
    /// Only when the test calls [`MockTransport::fire_parked`].
    Parked,
}

#[derive(Default)]
struct Counters {
    created: AtomicUsize,
    dispatched: AtomicUsize,
    canceled: AtomicUsize,
}

/// Produces [`MockCall`]s and records what happened to them.
#[derive(Clone)]
pub struct MockTransport {
    reply: Reply,
    delivery: Delivery,
    counters: Arc<Counters>,
    parked: Arc<Mutex<Vec<Callback<String>>>>,
}

impl MockTransport {
    pub fn new(reply: Reply, delivery: Delivery) -> Self {
        Self {
            reply,
            delivery,
            counters: Arc::default(),
            parked: Arc::default(),
        }
    }

    /// A call factory for `CallAdapter::body` and friends.
    pub fn factory(&self) -> impl Fn() -> Box<dyn Call<String>> + Send + Sync + 'static {
        let transport = self.clone();
        move || {
            transport.counters.created.fetch_add(1, Ordering::SeqCst);
            Box::new(MockCall {
                transport: transport.clone(),
                request: RequestDescriptor::new("GET", "http://mock.local/"),
            }) as Box<dyn Call<String>>
        }
    }

    pub fn created(&self) -> usize {
        self.counters.created.load(Ordering::SeqCst)
    }

    pub fn dispatched(&self) -> usize {
        self.counters.dispatched.load(Ordering::SeqCst)
    }

    pub fn canceled(&self) -> usize {
        self.counters.canceled.load(Ordering::SeqCst)
    }

    /// Completes every parked call and returns how many there were.
    pub fn fire_parked(&self) -> usize {
        let parked: Vec<_> = std::mem::take(&mut *self.parked.lock().unwrap());
        let count = parked.len();
        for callback in parked {
            callback(outcome(self.reply));
        }
        count
    }
}

pub struct MockCall {
    transport: MockTransport,
    request: RequestDescriptor,
}

impl Call<String> for MockCall {
    fn request(&self) -> &RequestDescriptor {
        &self.request
    }

    fn enqueue(&self, callback: Callback<String>) {
        self.transport
            .counters
            .dispatched
            .fetch_add(1, Ordering::SeqCst);
        let reply = self.transport.reply;
        match self.transport.delivery {
            Delivery::Inline => callback(outcome(reply)),
            Delivery::Thread => {
                std::thread::spawn(move || callback(outcome(reply)));
            }
            Delivery::Parked => self.transport.parked.lock().unwrap().push(callback),
        }
    }

    fn cancel(&self) {
        self.transport
            .counters
            .canceled
            .fetch_add(1, Ordering::SeqCst);
    }
}

pub fn raw(status: u16) -> RawResponse {
    let reason = match status {
        200..=299 => "OK",
        400..=499 => "Client Error",
        _ => "Server Error",
    };
    RawResponse {
        request: RequestDescriptor::new("GET", "http://mock.local/"),
        status: StatusCode::new(status).unwrap(),
        reason: reason.to_string(),
        headers: Headers::from_iter([("Content-Type", "text/plain")]),
        sent_at: Utc::now(),
        received_at: Utc::now(),
    }
}

pub fn outcome(reply: Reply) -> Outcome<String> {
    match reply {
        Reply::Body(body) => Outcome::Success {
            body: body.to_string(),
            raw: raw(200),
        },
        Reply::Status(code) => Outcome::HttpError {
            raw: raw(code),
            error_body: None,
        },
        Reply::Disconnect => Outcome::TransportFailure(
            TransportError::new(TransportErrorKind::Connect, "unexpected end of stream").into(),
        ),
    }
}

// ---------------------------------------------------------------------------
// Recording subscriber
// ---------------------------------------------------------------------------

/// A subscriber that records every signal so tests can assert on them in order.
pub struct RecordingSubscriber<T> {
    initial_request: Option<u64>,
    cancel_on_next: bool,
    events: Mutex<VecDeque<Signal<T, CallError>>>,
    arrived: Condvar,
    subscription: Mutex<Option<Arc<dyn Subscription>>>,
    subscribed: AtomicBool,
}

impl<T: Send + std::fmt::Debug + 'static> RecordingSubscriber<T> {
    /// Requests unbounded demand on subscribe.
    pub fn create() -> Arc<Self> {
        Self::build(Some(u64::MAX), false)
    }

    pub fn with_initial_request(n: u64) -> Arc<Self> {
        Self::build(Some(n), false)
    }

    /// Requests nothing until [`request_more`](Self::request_more).
    pub fn without_request() -> Arc<Self> {
        Self::build(None, false)
    }

    /// Cancels its subscription from inside the first `on_next`.
    pub fn canceling_on_next() -> Arc<Self> {
        Self::build(Some(u64::MAX), true)
    }

    fn build(initial_request: Option<u64>, cancel_on_next: bool) -> Arc<Self> {
        Arc::new(Self {
            initial_request,
            cancel_on_next,
            events: Mutex::new(VecDeque::new()),
            arrived: Condvar::new(),
            subscription: Mutex::new(None),
            subscribed: AtomicBool::new(false),
        })
    }

    pub fn as_subscriber(self: &Arc<Self>) -> Arc<dyn Subscriber<T, CallError>> {
        Arc::clone(self) as Arc<dyn Subscriber<T, CallError>>
    }

    fn record(&self, signal: Signal<T, CallError>) {
        self.events.lock().unwrap().push_back(signal);
        self.arrived.notify_all();
    }

    fn subscription(&self) -> Arc<dyn Subscription> {
        self.subscription
            .lock()
            .unwrap()
            .clone()
            .expect("on_subscribe was never called")
    }

    pub fn is_subscribed(&self) -> bool {
        self.subscribed.load(Ordering::SeqCst)
    }

    pub fn request_more(&self, n: u64) {
        self.subscription().request(n);
    }

    pub fn cancel(&self) {
        self.subscription().cancel();
    }

    pub fn event_count(&self) -> usize {
        self.events.lock().unwrap().len()
    }

    /// Waits until at least `count` events are recorded.
    pub fn await_events(&self, count: usize, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut events = self.events.lock().unwrap();
        while events.len() < count {
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            events = self.arrived.wait_timeout(events, deadline - now).unwrap().0;
        }
        true
    }

    /// Drains every recorded event.
    pub fn take_all(&self) -> Vec<Signal<T, CallError>> {
        self.events.lock().unwrap().drain(..).collect()
    }

    fn take_signal(&self) -> Signal<T, CallError> {
        self.events
            .lock()
            .unwrap()
            .pop_front()
            .expect("No event found!")
    }

    pub fn take_value(&self) -> T {
        match self.take_signal() {
            Signal::Next(value) => value,
            other => panic!("Expected on_next event but was {other:?}"),
        }
    }

    pub fn take_error(&self) -> CallError {
        match self.take_signal() {
            Signal::Error(error) => error,
            other => panic!("Expected on_error event but was {other:?}"),
        }
    }

    pub fn assert_any_value(&self) -> &Self {
        self.take_value();
        self
    }

    pub fn assert_complete(&self) {
        match self.take_signal() {
            Signal::Complete => {}
            other => panic!("Expected on_complete event but was {other:?}"),
        }
        self.assert_no_events();
    }

    /// Asserts the next event is an error with `label` and, if given, `message`.
    pub fn assert_error(&self, label: &str, message: Option<&str>) {
        let error = self.take_error();
        assert_eq!(error.as_label(), label, "unexpected error: {error}");
        if let Some(message) = message {
            assert_eq!(error.to_string(), message);
        }
        self.assert_no_events();
    }

    pub fn assert_no_events(&self) {
        let events = self.events.lock().unwrap();
        assert!(events.is_empty(), "Unconsumed events found! {events:?}");
    }
}

impl RecordingSubscriber<Emission<String>> {
    pub fn assert_body(&self, expected: &str) -> &Self {
        let body = self.take_value().into_body().expect("expected a body emission");
        assert_eq!(body, expected);
        self
    }
}

impl RecordingSubscriber<String> {
    pub fn assert_body(&self, expected: &str) -> &Self {
        assert_eq!(self.take_value(), expected);
        self
    }
}

impl<T: Send + std::fmt::Debug + 'static> Subscriber<T, CallError> for RecordingSubscriber<T> {
    fn on_subscribe(&self, subscription: Arc<dyn Subscription>) {
        self.subscribed.store(true, Ordering::SeqCst);
        *self.subscription.lock().unwrap() = Some(Arc::clone(&subscription));
        if let Some(n) = self.initial_request {
            subscription.request(n);
        }
    }

    fn on_next(&self, item: T) {
        self.record(Signal::Next(item));
        if self.cancel_on_next {
            self.cancel();
        }
    }

    fn on_error(&self, error: CallError) {
        self.record(Signal::Error(error));
    }

    fn on_complete(&self) {
        self.record(Signal::Complete);
    }
}
