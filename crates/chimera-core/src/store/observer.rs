// ── Synchronous change observers ──

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock, Weak};

use super::StoreChange;

pub(crate) type Callback = Arc<dyn Fn(&StoreChange) + Send + Sync>;

/// Observers in registration order, keyed by a monotonically increasing id.
#[derive(Default)]
pub(crate) struct ObserverRegistry {
    next_id: AtomicU64,
    entries: RwLock<Vec<(u64, Callback)>>,
}

impl ObserverRegistry {
    pub(crate) fn register(&self, callback: Callback) -> u64 {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push((id, callback));
        id
    }

    pub(crate) fn remove(&self, id: u64) -> bool {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        let before = entries.len();
        entries.retain(|(entry, _)| *entry != id);
        entries.len() != before
    }

    fn contains(&self, id: u64) -> bool {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .any(|(entry, _)| *entry == id)
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Call every observer in registration order.
    ///
    /// The list is copied before the first call so observers can
    /// subscribe or unsubscribe re-entrantly. An observer removed by an
    /// earlier one in the same round is skipped.
    pub(crate) fn notify(&self, change: &StoreChange) {
        let current: Vec<(u64, Callback)> = self
            .entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(id, cb)| (*id, Arc::clone(cb)))
            .collect();

        for (id, callback) in current {
            if self.contains(id) {
                callback(change);
            }
        }
    }
}

/// Handle for a registered store observer.
///
/// Dropping the handle unregisters the observer, as does
/// [`unsubscribe`](Self::unsubscribe).
#[must_use = "dropping a Subscription unregisters its observer"]
pub struct Subscription {
    id: u64,
    registry: Weak<ObserverRegistry>,
}

impl Subscription {
    pub(crate) fn new(id: u64, registry: &Arc<ObserverRegistry>) -> Self {
        Self {
            id,
            registry: Arc::downgrade(registry),
        }
    }

    pub fn unsubscribe(self) {
        drop(self);
    }

    /// Whether the observer is still registered.
    pub fn is_active(&self) -> bool {
        self.registry.upgrade().is_some_and(|r| r.contains(self.id))
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(registry) = self.registry.upgrade() {
            registry.remove(self.id);
        }
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription").field("id", &self.id).finish_non_exhaustive()
    }
}
