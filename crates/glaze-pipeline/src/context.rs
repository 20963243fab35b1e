//! Request context shared along a producer chain
//!
//! The context carries the request configuration, the stage listener, and
//! the two pieces of mutable per-request state stages react to:
//! cancellation and whether anyone downstream still wants intermediate
//! results. Cancellation is one-way; once requested it never resets, and
//! registered callbacks hear about it exactly once.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::debug;

use crate::listener::StageListener;
use crate::request::ImageRequest;

/// Hooks a stage registers to hear about context state changes
///
/// Both methods default to no-ops so implementors override only what they
/// react to.
pub trait ContextCallbacks: Send + Sync {
    /// The request was cancelled.
    fn on_cancellation_requested(&self) {}

    /// The value of `is_intermediate_result_expected` flipped.
    fn on_is_intermediate_result_expected_changed(&self) {}
}

struct ContextState {
    intermediate_expected: bool,
    callbacks: Vec<Arc<dyn ContextCallbacks>>,
}

/// Shared state for one image request travelling the pipeline
pub struct RequestContext {
    id: u64,
    request: ImageRequest,
    listener: Arc<dyn StageListener>,
    state: Mutex<ContextState>,
    cancelled: AtomicBool,
}

impl RequestContext {
    /// Creates a context for `request`, expecting intermediate results.
    pub fn new(id: u64, request: ImageRequest, listener: Arc<dyn StageListener>) -> Self {
        Self {
            id,
            request,
            listener,
            state: Mutex::new(ContextState {
                intermediate_expected: true,
                callbacks: Vec::new(),
            }),
            cancelled: AtomicBool::new(false),
        }
    }

    /// Identifier of the request, stable for its lifetime
    pub fn id(&self) -> u64 {
        self.id
    }

    /// The request configuration
    pub fn request(&self) -> &ImageRequest {
        &self.request
    }

    /// The listener observing stage lifecycle events for this request
    pub fn listener(&self) -> &Arc<dyn StageListener> {
        &self.listener
    }

    /// True once cancellation has been requested
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// True while a downstream consumer still wants intermediate results
    pub fn is_intermediate_result_expected(&self) -> bool {
        self.state.lock().intermediate_expected
    }

    /// Registers callbacks for state changes.
    ///
    /// If the request was already cancelled the cancellation callback is
    /// replayed immediately instead of registering.
    pub fn add_callbacks(&self, callbacks: Arc<dyn ContextCallbacks>) {
        let replay = {
            let mut state = self.state.lock();
            if self.cancelled.load(Ordering::SeqCst) {
                true
            } else {
                state.callbacks.push(Arc::clone(&callbacks));
                false
            }
        };
        if replay {
            callbacks.on_cancellation_requested();
        }
    }

    /// Requests cancellation.
    ///
    /// The first call drains the registered callbacks and notifies each of
    /// them once, outside any lock. Later calls do nothing.
    pub fn cancel(&self) {
        if self.cancelled.swap(true, Ordering::SeqCst) {
            return;
        }
        debug!(request_id = self.id, "request cancelled");
        let callbacks = {
            let mut state = self.state.lock();
            std::mem::take(&mut state.callbacks)
        };
        for callback in callbacks {
            callback.on_cancellation_requested();
        }
    }

    /// Updates whether intermediate results are still expected.
    ///
    /// Callbacks fire only when the value actually changes, and never
    /// after cancellation drained them.
    pub fn set_intermediate_expected(&self, expected: bool) {
        let callbacks = {
            let mut state = self.state.lock();
            if state.intermediate_expected == expected {
                return;
            }
            state.intermediate_expected = expected;
            state.callbacks.clone()
        };
        for callback in callbacks {
            callback.on_is_intermediate_result_expected_changed();
        }
    }
}

impl std::fmt::Debug for RequestContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestContext")
            .field("id", &self.id)
            .field("request", &self.request)
            .field("cancelled", &self.is_cancelled())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;

    use super::*;
    use crate::listener::NoopListener;

    #[derive(Default)]
    struct CountingCallbacks {
        cancellations: AtomicUsize,
        expectation_changes: AtomicUsize,
    }

    impl ContextCallbacks for CountingCallbacks {
        fn on_cancellation_requested(&self) {
            self.cancellations.fetch_add(1, Ordering::SeqCst);
        }

        fn on_is_intermediate_result_expected_changed(&self) {
            self.expectation_changes.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn context() -> RequestContext {
        RequestContext::new(1, ImageRequest::default(), Arc::new(NoopListener))
    }

    #[test]
    fn test_cancel_notifies_each_callback_once() {
        let context = context();
        let callbacks = Arc::new(CountingCallbacks::default());
        context.add_callbacks(callbacks.clone());

        context.cancel();
        context.cancel();

        assert!(context.is_cancelled());
        assert_eq!(callbacks.cancellations.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_add_callbacks_after_cancel_replays_cancellation() {
        let context = context();
        context.cancel();

        let callbacks = Arc::new(CountingCallbacks::default());
        context.add_callbacks(callbacks.clone());
        assert_eq!(callbacks.cancellations.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_expectation_callbacks_fire_only_on_change() {
        let context = context();
        let callbacks = Arc::new(CountingCallbacks::default());
        context.add_callbacks(callbacks.clone());

        assert!(context.is_intermediate_result_expected());
        context.set_intermediate_expected(true);
        assert_eq!(callbacks.expectation_changes.load(Ordering::SeqCst), 0);

        context.set_intermediate_expected(false);
        assert!(!context.is_intermediate_result_expected());
        context.set_intermediate_expected(false);
        assert_eq!(callbacks.expectation_changes.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_no_expectation_events_after_cancel() {
        let context = context();
        let callbacks = Arc::new(CountingCallbacks::default());
        context.add_callbacks(callbacks.clone());

        context.cancel();
        context.set_intermediate_expected(false);
        assert_eq!(callbacks.expectation_changes.load(Ordering::SeqCst), 0);
    }
}
