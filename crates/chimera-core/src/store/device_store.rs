// ── Device store ──
//
// Ordered, id-keyed device records plus the server summary. Every
// mutation rebuilds the snapshot watched by `DeviceStream`s and then
// notifies observers synchronously, outside the write lock but inside
// the writer turn, so observers see mutations in store order.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use tokio::sync::watch;
use tracing::trace;

use super::observer::{ObserverRegistry, Subscription};
use crate::model::{Device, DeviceId, Summary};
use crate::stream::DeviceStream;

/// What changed in a [`DeviceStore`].
#[derive(Debug, Clone)]
pub enum StoreChange {
    /// One record was overwritten with `device`.
    Replaced { device: Arc<Device> },
    /// The whole store was reloaded and now holds `count` devices.
    Reloaded { count: usize },
}

impl StoreChange {
    /// The affected device, for single-record changes.
    pub fn device_id(&self) -> Option<DeviceId> {
        match self {
            Self::Replaced { device } => Some(device.id),
            Self::Reloaded { .. } => None,
        }
    }
}

/// The in-memory device inventory.
///
/// Owned by a `Session` and shared by `Arc`. Records keep their load
/// order; `replace` never inserts, so only a reload adds or removes ids.
pub struct DeviceStore {
    /// Held from the write until the last observer returns.
    writer: Mutex<()>,
    devices: RwLock<IndexMap<DeviceId, Arc<Device>>>,
    snapshot: watch::Sender<Arc<Vec<Arc<Device>>>>,
    summary: watch::Sender<Arc<Summary>>,
    version: watch::Sender<u64>,
    last_load: watch::Sender<Option<DateTime<Utc>>>,
    observers: Arc<ObserverRegistry>,
}

impl Default for DeviceStore {
    fn default() -> Self {
        Self::new()
    }
}

impl DeviceStore {
    pub fn new() -> Self {
        let (snapshot, _) = watch::channel(Arc::new(Vec::new()));
        let (summary, _) = watch::channel(Arc::new(Summary::default()));
        let (version, _) = watch::channel(0u64);
        let (last_load, _) = watch::channel(None);

        Self {
            writer: Mutex::new(()),
            devices: RwLock::new(IndexMap::new()),
            snapshot,
            summary,
            version,
            last_load,
            observers: Arc::new(ObserverRegistry::default()),
        }
    }

    // ── Reads ────────────────────────────────────────────────────────

    /// Every device in load order. Cheap: shares the current snapshot.
    pub fn all(&self) -> Arc<Vec<Arc<Device>>> {
        self.snapshot.borrow().clone()
    }

    pub fn get(&self, id: DeviceId) -> Option<Arc<Device>> {
        self.read().get(&id).cloned()
    }

    pub fn contains(&self, id: DeviceId) -> bool {
        self.read().contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    /// The summary from the most recent load.
    pub fn summary(&self) -> Arc<Summary> {
        self.summary.borrow().clone()
    }

    /// Bumped on every mutation.
    pub fn version(&self) -> u64 {
        *self.version.borrow()
    }

    /// When the last full load completed, if ever.
    pub fn last_load(&self) -> Option<DateTime<Utc>> {
        *self.last_load.borrow()
    }

    // ── Writes ───────────────────────────────────────────────────────

    /// Overwrite the record with `device.id`, keeping its position.
    ///
    /// Returns `false` and notifies nobody if the id is not in the store.
    pub fn replace(&self, device: impl Into<Arc<Device>>) -> bool {
        let device = device.into();
        let _turn = self.writer_turn();
        {
            let mut devices = self.write();
            let Some(slot) = devices.get_mut(&device.id) else {
                trace!(device_id = %device.id, "replace ignored: device not in store");
                return false;
            };
            *slot = Arc::clone(&device);
            self.publish(&devices);
        }
        self.observers.notify(&StoreChange::Replaced { device });
        true
    }

    /// Replace every record and the summary in one step.
    ///
    /// A repeated id keeps the position of its first occurrence and the
    /// value of its last.
    pub fn replace_all(&self, devices: Vec<Device>, summary: Summary) {
        let mut next = IndexMap::with_capacity(devices.len());
        for device in devices {
            next.insert(device.id, Arc::new(device));
        }
        let count = next.len();
        let _turn = self.writer_turn();
        {
            let mut devices = self.write();
            *devices = next;
            self.summary.send_replace(Arc::new(summary));
            self.last_load.send_replace(Some(Utc::now()));
            self.publish(&devices);
        }
        self.observers.notify(&StoreChange::Reloaded { count });
    }

    // ── Subscriptions ────────────────────────────────────────────────

    /// Register `observer`, called synchronously after every mutation in
    /// registration order. Lives as long as the returned handle.
    ///
    /// Observers may read the store but must not mutate it: `replace`
    /// or `replace_all` from inside a notification deadlocks.
    pub fn subscribe<F>(&self, observer: F) -> Subscription
    where
        F: Fn(&StoreChange) + Send + Sync + 'static,
    {
        let id = self.observers.register(Arc::new(observer));
        Subscription::new(id, &self.observers)
    }

    pub fn observer_count(&self) -> usize {
        self.observers.len()
    }

    /// Async snapshot stream of the device list.
    pub fn watch(&self) -> DeviceStream {
        DeviceStream::new(self.snapshot.subscribe())
    }

    // ── Private helpers ──────────────────────────────────────────────

    fn writer_turn(&self) -> MutexGuard<'_, ()> {
        self.writer.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn read(&self) -> RwLockReadGuard<'_, IndexMap<DeviceId, Arc<Device>>> {
        self.devices.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, IndexMap<DeviceId, Arc<Device>>> {
        self.devices.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Rebuild the snapshot from `devices` and bump the version.
    fn publish(&self, devices: &IndexMap<DeviceId, Arc<Device>>) {
        let values: Vec<Arc<Device>> = devices.values().cloned().collect();
        // `send_modify` updates unconditionally, even with zero receivers.
        self.snapshot.send_modify(|snap| *snap = Arc::new(values));
        self.version.send_modify(|v| *v += 1);
    }
}
