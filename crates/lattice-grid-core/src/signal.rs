//! Typed publish/subscribe channels.
//!
//! A [`Signal`] owns a list of slots. [`Signal::emit`] hands the same
//! argument to every slot, in the calling thread, before returning.
//!
//! Subscriptions end either explicitly through the [`ConnectionId`] that
//! [`Signal::connect`] returns, or implicitly when the [`ConnectionGuard`]
//! from [`Signal::connect_scoped`] is dropped. Data sources publish their
//! changes this way and the grid holds guards for as long as it is bound.
//!
//! Emission works on a copy of the slot list taken under the lock, so slots
//! may subscribe, unsubscribe or emit again without deadlocking. A slot
//! removed during an emission still sees that emission.
//!
//! # Example
//!
//! ```
//! use lattice_grid_core::Signal;
//!
//! let renamed = Signal::<String>::new();
//! let id = renamed.connect(|name| println!("renamed to {name}"));
//! renamed.emit("totals".to_string());
//! assert!(renamed.disconnect(id));
//! ```

use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use slotmap::{new_key_type, SlotMap};

use crate::logging::targets;

new_key_type! {
    /// Handle for one subscription on a [`Signal`].
    pub struct ConnectionId;
}

type Slot<Args> = Arc<dyn Fn(&Args) + Send + Sync>;
type SlotList<Args> = Mutex<SlotMap<ConnectionId, Slot<Args>>>;

/// A channel that calls every subscribed slot with `&Args` on emit.
///
/// Use `()` for notifications without a payload.
pub struct Signal<Args> {
    slots: Arc<SlotList<Args>>,
}

impl<Args: Send + 'static> Default for Signal<Args> {
    fn default() -> Self {
        Self::new()
    }
}

impl<Args: Send + 'static> Signal<Args> {
    /// A signal without subscribers.
    pub fn new() -> Self {
        Self {
            slots: Arc::new(Mutex::new(SlotMap::with_key())),
        }
    }

    /// Subscribes `slot` until [`disconnect`](Self::disconnect) is called
    /// with the returned id.
    pub fn connect<F>(&self, slot: F) -> ConnectionId
    where
        F: Fn(&Args) + Send + Sync + 'static,
    {
        self.slots.lock().insert(Arc::new(slot))
    }

    /// Subscribes `slot` for the lifetime of the returned guard.
    pub fn connect_scoped<F>(&self, slot: F) -> ConnectionGuard<Args>
    where
        F: Fn(&Args) + Send + Sync + 'static,
    {
        ConnectionGuard {
            slots: Arc::downgrade(&self.slots),
            id: self.connect(slot),
        }
    }

    /// Removes a subscription. Returns false if `id` was not subscribed.
    pub fn disconnect(&self, id: ConnectionId) -> bool {
        self.slots.lock().remove(id).is_some()
    }

    /// Number of live subscriptions.
    pub fn connection_count(&self) -> usize {
        self.slots.lock().len()
    }

    /// Calls every subscribed slot with `args`.
    #[tracing::instrument(skip_all, target = "lattice_grid_core::signal", level = "trace")]
    pub fn emit(&self, args: Args) {
        let slots: Vec<Slot<Args>> = self.slots.lock().values().cloned().collect();
        tracing::trace!(target: targets::SIGNAL, slots = slots.len(), "emit");

        for slot in slots {
            slot(&args);
        }
    }
}

/// Ends a subscription made with [`Signal::connect_scoped`] when dropped.
///
/// Dropping the guard after its signal is gone is a no-op.
pub struct ConnectionGuard<Args> {
    slots: Weak<SlotList<Args>>,
    id: ConnectionId,
}

impl<Args> Drop for ConnectionGuard<Args> {
    fn drop(&mut self) {
        if let Some(slots) = self.slots.upgrade() {
            slots.lock().remove(self.id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn recorder(signal: &Signal<i32>) -> (ConnectionId, Arc<Mutex<Vec<i32>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let id = signal.connect(move |&n| sink.lock().push(n));
        (id, seen)
    }

    #[test]
    fn test_emit_reaches_every_slot_in_order() {
        let signal = Signal::<i32>::new();
        let (_, first) = recorder(&signal);
        let (_, second) = recorder(&signal);

        signal.emit(7);
        signal.emit(8);

        assert_eq!(*first.lock(), vec![7, 8]);
        assert_eq!(*second.lock(), vec![7, 8]);
    }

    #[test]
    fn test_disconnect_stops_delivery() {
        let signal = Signal::<i32>::new();
        let (id, seen) = recorder(&signal);

        signal.emit(1);
        assert!(signal.disconnect(id));
        assert!(!signal.disconnect(id));
        signal.emit(2);

        assert_eq!(*seen.lock(), vec![1]);
        assert_eq!(signal.connection_count(), 0);
    }

    #[test]
    fn test_scoped_subscription_ends_with_guard() {
        let signal = Signal::<i32>::new();
        let seen = Arc::new(Mutex::new(Vec::new()));

        let sink = seen.clone();
        let guard = signal.connect_scoped(move |&n| sink.lock().push(n));
        signal.emit(1);
        assert_eq!(signal.connection_count(), 1);

        drop(guard);
        signal.emit(2);

        assert_eq!(*seen.lock(), vec![1]);
        assert_eq!(signal.connection_count(), 0);
    }

    #[test]
    fn test_guard_dropped_after_signal() {
        let signal = Signal::<i32>::new();
        let guard = signal.connect_scoped(|_| {});
        drop(signal);
        drop(guard);
    }

    #[test]
    fn test_slot_can_emit_its_own_signal() {
        let signal = Arc::new(Signal::<i32>::new());
        let calls = Arc::new(AtomicUsize::new(0));

        let weak = Arc::downgrade(&signal);
        let counter = calls.clone();
        signal.connect(move |&n| {
            counter.fetch_add(1, Ordering::SeqCst);
            if let Some(signal) = weak.upgrade()
                && n > 0
            {
                signal.emit(n - 1);
            }
        });

        signal.emit(2);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_slot_removing_itself_sees_current_emit() {
        let signal = Arc::new(Signal::<()>::new());
        let calls = Arc::new(AtomicUsize::new(0));
        let own_id: Arc<Mutex<Option<ConnectionId>>> = Arc::new(Mutex::new(None));

        let weak = Arc::downgrade(&signal);
        let counter = calls.clone();
        let slot_id = own_id.clone();
        let id = signal.connect(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            if let (Some(signal), Some(id)) = (weak.upgrade(), *slot_id.lock()) {
                signal.disconnect(id);
            }
        });
        *own_id.lock() = Some(id);

        signal.emit(());
        signal.emit(());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_emit_from_several_threads() {
        let signal = Arc::new(Signal::<i32>::new());
        let (_, seen) = recorder(&signal);

        let handles: Vec<_> = (0..8)
            .map(|n| {
                let signal = signal.clone();
                std::thread::spawn(move || signal.emit(n))
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let mut values = seen.lock().clone();
        values.sort_unstable();
        assert_eq!(values, (0..8).collect::<Vec<_>>());
    }
}
