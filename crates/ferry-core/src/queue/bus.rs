//! SubscriptionBus - キュー変更の通知
//!
//! Listeners are plain synchronous callbacks that receive the full list after a
//! mutation. They must be quick: the queue calls them while it still holds its
//! write lock so that no listener ever sees an older list after a newer one.
//!
//! # Subscription
//! [`register`](SubscriptionBus::register) returns a [`Subscription`]. Calling
//! [`unsubscribe`](Subscription::unsubscribe) any number of times, or dropping
//! the handle, removes the listener. [`detach`](Subscription::detach) keeps the
//! listener for the lifetime of the bus.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, Weak};

use crate::domain::QueueItem;

pub type Listener = Arc<dyn Fn(&[QueueItem]) + Send + Sync>;

struct Entry {
    listener: Listener,
    active: Arc<AtomicBool>,
}

#[derive(Default)]
struct Registry {
    next_id: u64,
    entries: BTreeMap<u64, Entry>,
}

fn lock(registry: &Mutex<Registry>) -> MutexGuard<'_, Registry> {
    // A listener that panicked elsewhere must not take notifications down with it.
    registry.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[derive(Default)]
pub struct SubscriptionBus {
    registry: Arc<Mutex<Registry>>,
}

impl SubscriptionBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, listener: Listener) -> Subscription {
        let active = Arc::new(AtomicBool::new(true));
        let mut registry = lock(&self.registry);
        let id = registry.next_id;
        registry.next_id += 1;
        registry.entries.insert(
            id,
            Entry {
                listener,
                active: active.clone(),
            },
        );

        Subscription {
            id,
            registry: Arc::downgrade(&self.registry),
            active,
            detached: false,
        }
    }

    /// Call every active listener with `items`, in registration order.
    pub fn notify(&self, items: &[QueueItem]) {
        // Snapshot first so a listener may (un)subscribe without deadlocking.
        let listeners: Vec<(Listener, Arc<AtomicBool>)> = lock(&self.registry)
            .entries
            .values()
            .map(|e| (e.listener.clone(), e.active.clone()))
            .collect();

        for (listener, active) in listeners {
            if active.load(Ordering::Acquire) {
                listener(items);
            }
        }
    }

    pub fn len(&self) -> usize {
        lock(&self.registry).entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Handle to a registered listener.
#[must_use = "dropping a Subscription unsubscribes the listener"]
pub struct Subscription {
    id: u64,
    registry: Weak<Mutex<Registry>>,
    active: Arc<AtomicBool>,
    detached: bool,
}

impl Subscription {
    /// Stop receiving notifications. Safe to call more than once.
    pub fn unsubscribe(&self) {
        if !self.active.swap(false, Ordering::AcqRel) {
            return;
        }
        if let Some(registry) = self.registry.upgrade() {
            lock(&registry).entries.remove(&self.id);
        }
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    /// Keep the listener registered after this handle is gone.
    pub fn detach(mut self) {
        self.detached = true;
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if !self.detached {
            self.unsubscribe();
        }
    }
}
