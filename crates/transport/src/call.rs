//! [`HttpCall`]: a [`Call`] that runs one exchange as a tokio task.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use chrono::Utc;
use fluxcall::{
    Call, CallError, Callback, Decode, Outcome, RawResponse, RequestDescriptor,
    StatusCode, Timestamp, TransportError, TransportErrorKind,
};
use tokio::runtime::Handle;
use tokio::task::AbortHandle;
use tracing::{debug, trace};

use crate::execute::{Execute, HttpRequest, WireResponse};

/// One HTTP exchange, spawned on a tokio runtime when enqueued.
///
/// Cancel aborts the task, which drops the in-flight request future and
/// with it the connection. The completion callback runs on a runtime worker.
pub struct HttpCall<T> {
    request: Arc<HttpRequest>,
    executor: Arc<dyn Execute>,
    decoder: Arc<dyn Decode<T>>,
    runtime: Handle,
    task: Mutex<Option<AbortHandle>>,
    canceled: AtomicBool,
}

impl<T> HttpCall<T> {
    pub fn new(
        request: Arc<HttpRequest>,
        executor: Arc<dyn Execute>,
        decoder: Arc<dyn Decode<T>>,
        runtime: Handle,
    ) -> Self {
        Self {
            request,
            executor,
            decoder,
            runtime,
            task: Mutex::new(None),
            canceled: AtomicBool::new(false),
        }
    }
}

impl<T: Send + 'static> Call<T> for HttpCall<T> {
    fn request(&self) -> &RequestDescriptor {
        self.request.descriptor()
    }

    fn enqueue(&self, callback: Callback<T>) {
        let request = Arc::clone(&self.request);
        let executor = Arc::clone(&self.executor);
        let decoder = Arc::clone(&self.decoder);

        let task = self.runtime.spawn(async move {
            let sent_at = Utc::now();
            let outcome = match executor.execute(&request).await {
                Ok(wire) => into_outcome(wire, request.descriptor(), sent_at, decoder.as_ref()),
                Err(error) => Outcome::TransportFailure(error.into()),
            };
            trace!(request = %request.descriptor(), "exchange finished");
            callback(outcome);
        });

        // Holding the slot while checking the flag pairs with `cancel`.
        let mut slot = self.task.lock().unwrap_or_else(PoisonError::into_inner);
        if self.canceled.load(Ordering::Acquire) {
            task.abort();
        } else {
            *slot = Some(task.abort_handle());
        }
    }

    fn cancel(&self) {
        self.canceled.store(true, Ordering::Release);
        let task = self
            .task
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(task) = task {
            debug!(request = %self.request.descriptor(), "aborting in-flight exchange");
            task.abort();
        }
    }
}

/// Splits a wire response into success, HTTP error, or decode failure.
fn into_outcome<T>(
    wire: WireResponse,
    request: &RequestDescriptor,
    sent_at: Timestamp,
    decoder: &dyn Decode<T>,
) -> Outcome<T> {
    let Some(status) = StatusCode::new(wire.status) else {
        return Outcome::TransportFailure(
            TransportError::new(
                TransportErrorKind::Other,
                format!("invalid status code {}", wire.status),
            )
            .into(),
        );
    };

    let raw = RawResponse {
        request: request.clone(),
        status,
        reason: wire.reason,
        headers: wire.headers,
        sent_at,
        received_at: wire.received_at,
    };

    if !status.is_success() {
        let error_body = (!wire.body.is_empty()).then_some(wire.body);
        return Outcome::HttpError { raw, error_body };
    }

    match decoder.decode(&wire.body) {
        Ok(body) => Outcome::Success { body, raw },
        Err(error) => {
            debug!(request = %request, %error, "body decode failed");
            Outcome::TransportFailure(CallError::Decode(error))
        }
    }
}
