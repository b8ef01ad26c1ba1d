//! Single-shot deferred results.
//!
//! Data source commands complete later than the call that issued them. A
//! command hands back a [`Deferred`], and whoever performs the work keeps the
//! matching [`Resolver`]. The two halves are created together by
//! [`deferred_pair`].
//!
//! A continuation registered with [`Deferred::on_complete`] runs exactly once:
//! immediately if the value is already there, otherwise on the thread that
//! calls [`Resolver::resolve`]. No lock is held while it runs.
//!
//! # Example
//!
//! ```
//! use lattice_grid_core::deferred_pair;
//! use std::sync::Arc;
//! use std::sync::atomic::{AtomicI32, Ordering};
//!
//! let (resolver, deferred) = deferred_pair::<i32>();
//! let seen = Arc::new(AtomicI32::new(0));
//!
//! let seen_clone = seen.clone();
//! deferred.on_complete(move |value| seen_clone.store(value, Ordering::SeqCst));
//!
//! resolver.resolve(7);
//! assert_eq!(seen.load(Ordering::SeqCst), 7);
//! ```

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::error::DeferredError;
use crate::logging::targets;

type Continuation<T> = Box<dyn FnOnce(T) + Send>;

enum DeferredState<T> {
    /// Not resolved yet, with an optional continuation waiting for the value.
    Pending(Option<Continuation<T>>),
    /// Resolved, value not taken yet.
    Ready(T),
    /// The value has been handed out.
    Consumed,
    /// The resolver was dropped without producing a value.
    Abandoned,
}

/// The receiving half of a deferred result.
pub struct Deferred<T> {
    state: Arc<Mutex<DeferredState<T>>>,
}

/// The producing half of a deferred result.
///
/// Dropping a resolver without calling [`resolve`](Self::resolve) abandons the
/// deferred; any continuation registered on it is dropped without running.
pub struct Resolver<T> {
    state: Option<Arc<Mutex<DeferredState<T>>>>,
}

/// Create a connected resolver/deferred pair.
pub fn deferred_pair<T: Send + 'static>() -> (Resolver<T>, Deferred<T>) {
    let state = Arc::new(Mutex::new(DeferredState::Pending(None)));
    (
        Resolver {
            state: Some(state.clone()),
        },
        Deferred { state },
    )
}

impl<T: Send + 'static> Deferred<T> {
    /// Create a deferred that is already resolved with `value`.
    pub fn resolved(value: T) -> Self {
        Self {
            state: Arc::new(Mutex::new(DeferredState::Ready(value))),
        }
    }

    /// Returns true if a value is waiting to be taken.
    pub fn is_ready(&self) -> bool {
        matches!(*self.state.lock(), DeferredState::Ready(_))
    }

    /// Register the continuation that receives the value.
    ///
    /// Runs `f` right away when the value is already available. Registering
    /// on an abandoned or already consumed deferred drops `f`.
    pub fn on_complete<F>(self, f: F)
    where
        F: FnOnce(T) + Send + 'static,
    {
        let mut state = self.state.lock();
        match std::mem::replace(&mut *state, DeferredState::Consumed) {
            DeferredState::Ready(value) => {
                drop(state);
                f(value);
            }
            DeferredState::Pending(_) => {
                *state = DeferredState::Pending(Some(Box::new(f)));
            }
            DeferredState::Abandoned => {
                *state = DeferredState::Abandoned;
                tracing::trace!(target: targets::DEFERRED, "continuation registered on abandoned deferred");
            }
            DeferredState::Consumed => {}
        }
    }

    /// Take the value without registering a continuation.
    pub fn try_take(&self) -> Result<T, DeferredError> {
        let mut state = self.state.lock();
        match std::mem::replace(&mut *state, DeferredState::Consumed) {
            DeferredState::Ready(value) => Ok(value),
            DeferredState::Pending(continuation) => {
                *state = DeferredState::Pending(continuation);
                Err(DeferredError::NotReady)
            }
            DeferredState::Abandoned => {
                *state = DeferredState::Abandoned;
                Err(DeferredError::Abandoned)
            }
            DeferredState::Consumed => Err(DeferredError::AlreadyTaken),
        }
    }
}

impl<T, E> Deferred<Result<T, E>>
where
    T: Send + 'static,
    E: Send + 'static,
{
    /// Split a fallible result into success and failure continuations.
    pub fn on_settled<S, F>(self, on_success: S, on_failure: F)
    where
        S: FnOnce(T) + Send + 'static,
        F: FnOnce(E) + Send + 'static,
    {
        self.on_complete(move |result| match result {
            Ok(value) => on_success(value),
            Err(err) => on_failure(err),
        });
    }
}

impl<T> fmt::Debug for Deferred<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = match *self.state.lock() {
            DeferredState::Pending(_) => "pending",
            DeferredState::Ready(_) => "ready",
            DeferredState::Consumed => "consumed",
            DeferredState::Abandoned => "abandoned",
        };
        f.debug_struct("Deferred").field("state", &state).finish()
    }
}

impl<T> Resolver<T> {
    /// Resolve the deferred, running its continuation if one is registered.
    pub fn resolve(mut self, value: T) {
        let Some(shared) = self.state.take() else {
            return;
        };
        let mut state = shared.lock();
        match std::mem::replace(&mut *state, DeferredState::Consumed) {
            DeferredState::Pending(Some(continuation)) => {
                drop(state);
                continuation(value);
            }
            DeferredState::Pending(None) => {
                *state = DeferredState::Ready(value);
            }
            other => {
                *state = other;
            }
        }
    }
}

impl<T> Drop for Resolver<T> {
    fn drop(&mut self) {
        if let Some(shared) = self.state.take() {
            let mut state = shared.lock();
            if matches!(*state, DeferredState::Pending(_)) {
                // Drop the continuation outside the lock.
                let abandoned = std::mem::replace(&mut *state, DeferredState::Abandoned);
                drop(state);
                drop(abandoned);
                tracing::debug!(target: targets::DEFERRED, "resolver dropped without a value");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_continuation_before_resolve() {
        let (resolver, deferred) = deferred_pair::<&'static str>();
        let seen = Arc::new(Mutex::new(None));

        let seen_clone = seen.clone();
        deferred.on_complete(move |value| *seen_clone.lock() = Some(value));
        assert!(seen.lock().is_none());

        resolver.resolve("done");
        assert_eq!(*seen.lock(), Some("done"));
    }

    #[test]
    fn test_continuation_after_resolve() {
        let (resolver, deferred) = deferred_pair::<i32>();
        resolver.resolve(5);
        assert!(deferred.is_ready());

        let seen = Arc::new(Mutex::new(None));
        let seen_clone = seen.clone();
        deferred.on_complete(move |value| *seen_clone.lock() = Some(value));
        assert_eq!(*seen.lock(), Some(5));
    }

    #[test]
    fn test_resolved_constructor() {
        let deferred = Deferred::resolved(3);
        assert_eq!(deferred.try_take(), Ok(3));
        assert_eq!(deferred.try_take(), Err(DeferredError::AlreadyTaken));
    }

    #[test]
    fn test_try_take_pending() {
        let (resolver, deferred) = deferred_pair::<i32>();
        assert_eq!(deferred.try_take(), Err(DeferredError::NotReady));
        resolver.resolve(1);
        assert_eq!(deferred.try_take(), Ok(1));
    }

    #[test]
    fn test_abandoned_resolver() {
        let (resolver, deferred) = deferred_pair::<i32>();
        let calls = Arc::new(AtomicUsize::new(0));

        let calls_clone = calls.clone();
        let deferred_probe = Deferred {
            state: deferred.state.clone(),
        };
        deferred.on_complete(move |_| {
            calls_clone.fetch_add(1, Ordering::SeqCst);
        });
        drop(resolver);

        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert_eq!(deferred_probe.try_take(), Err(DeferredError::Abandoned));
    }

    #[test]
    fn test_on_settled_routes_result() {
        let failures = Arc::new(Mutex::new(Vec::new()));
        let successes = Arc::new(AtomicUsize::new(0));

        let ok: Deferred<Result<(), String>> = Deferred::resolved(Ok(()));
        let err: Deferred<Result<(), String>> = Deferred::resolved(Err("boom".into()));

        for deferred in [ok, err] {
            let successes = successes.clone();
            let failures = failures.clone();
            deferred.on_settled(
                move |()| {
                    successes.fetch_add(1, Ordering::SeqCst);
                },
                move |e| failures.lock().push(e),
            );
        }

        assert_eq!(successes.load(Ordering::SeqCst), 1);
        assert_eq!(*failures.lock(), vec!["boom".to_string()]);
    }

    #[test]
    fn test_resolve_from_other_thread() {
        let (resolver, deferred) = deferred_pair::<u64>();
        let seen = Arc::new(Mutex::new(None));

        let seen_clone = seen.clone();
        deferred.on_complete(move |value| *seen_clone.lock() = Some(value));

        std::thread::spawn(move || resolver.resolve(99)).join().unwrap();
        assert_eq!(*seen.lock(), Some(99));
    }
}
