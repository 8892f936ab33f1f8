// ── Session ──
//
// Top-level owner of one Device Service connection: the store, the
// coordinator, and the service they share. Cheaply cloneable.

use std::sync::Arc;

use chimera_api::DeviceClient;
use tracing::{debug, info, warn};

use crate::config::{ActionOrdering, ClientConfig};
use crate::coordinator::ActionCoordinator;
use crate::error::CoreError;
use crate::model::{CategoryCatalog, Device, DeviceAction, DeviceId, DeviceUpdate, ServiceInfo};
use crate::service::DeviceService;
use crate::store::DeviceStore;
use crate::stream::{DeviceFilter, filter_devices};

/// The main entry point for consumers.
pub struct Session<S = DeviceClient> {
    inner: Arc<SessionInner<S>>,
}

struct SessionInner<S> {
    store: Arc<DeviceStore>,
    service: Arc<S>,
    coordinator: ActionCoordinator<S>,
}

impl<S> Clone for Session<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl Session<DeviceClient> {
    /// Build an HTTP-backed session. Does not contact the service;
    /// call [`load`](Self::load) to populate the store.
    pub fn new(config: ClientConfig) -> Result<Self, CoreError> {
        let client = DeviceClient::new(config.base_url.clone(), &config.transport()).map_err(|e| {
            CoreError::Config {
                message: e.to_string(),
            }
        })?;
        debug!(base_url = %config.base_url, ordering = %config.ordering, "session created");
        Ok(Self::with_service(client, config.categories, config.ordering))
    }

    pub fn base_url(&self) -> &url::Url {
        self.inner.service.base_url()
    }
}

impl<S: DeviceService> Session<S> {
    /// Build a session around any `DeviceService`.
    pub fn with_service(service: S, categories: CategoryCatalog, ordering: ActionOrdering) -> Self {
        let store = Arc::new(DeviceStore::new());
        let service = Arc::new(service);
        let coordinator =
            ActionCoordinator::new(Arc::clone(&store), Arc::clone(&service), categories, ordering);
        Self {
            inner: Arc::new(SessionInner {
                store,
                service,
                coordinator,
            }),
        }
    }

    pub fn store(&self) -> &Arc<DeviceStore> {
        &self.inner.store
    }

    pub fn catalog(&self) -> &CategoryCatalog {
        self.inner.coordinator.catalog()
    }

    pub fn ordering(&self) -> ActionOrdering {
        self.inner.coordinator.ordering()
    }

    // ── Loading ──────────────────────────────────────────────────────

    /// Fetch devices and summary concurrently and replace the store.
    ///
    /// If either request fails the store is left exactly as it was.
    pub async fn load(&self) -> Result<(), CoreError> {
        let service = &self.inner.service;
        let (devices, summary) = tokio::try_join!(service.list_devices(), service.get_summary())
            .map_err(|e| {
                warn!(error = %e, "device load failed, keeping previous data");
                CoreError::load(&e)
            })?;

        let count = devices.len();
        self.inner.store.replace_all(devices, summary);
        info!(devices = count, "device inventory loaded");
        Ok(())
    }

    /// Re-fetch everything. Same contract as [`load`](Self::load).
    pub async fn refresh(&self) -> Result<(), CoreError> {
        debug!("refreshing device inventory");
        self.load().await
    }

    // ── Actions ──────────────────────────────────────────────────────

    /// See [`ActionCoordinator::perform_action`].
    pub async fn perform_action(
        &self,
        device_id: DeviceId,
        action: DeviceAction,
    ) -> Result<Arc<Device>, CoreError> {
        self.inner.coordinator.perform_action(device_id, action).await
    }

    pub async fn isolate(&self, device_id: DeviceId) -> Result<Arc<Device>, CoreError> {
        self.perform_action(device_id, DeviceAction::Isolate).await
    }

    pub async fn release(&self, device_id: DeviceId) -> Result<Arc<Device>, CoreError> {
        self.perform_action(device_id, DeviceAction::Release).await
    }

    pub async fn toggle_block(
        &self,
        device_id: DeviceId,
        category: impl Into<String>,
    ) -> Result<Arc<Device>, CoreError> {
        self.perform_action(device_id, DeviceAction::toggle_block(category))
            .await
    }

    /// Rename, regroup, or set blocklist entries. Not optimistic: the
    /// store changes only once the service confirms.
    pub async fn update_device(
        &self,
        device_id: DeviceId,
        update: &DeviceUpdate,
    ) -> Result<Arc<Device>, CoreError> {
        self.inner.coordinator.update_device(device_id, update).await
    }

    // ── Reads ────────────────────────────────────────────────────────

    pub fn device(&self, device_id: DeviceId) -> Option<Arc<Device>> {
        self.inner.store.get(device_id)
    }

    /// Current devices narrowed by search text and filter key.
    pub fn filtered(&self, query: &str, filter: &DeviceFilter) -> Vec<Arc<Device>> {
        filter_devices(self.inner.store.all().iter(), query, filter)
    }

    pub async fn service_info(&self) -> Result<ServiceInfo, CoreError> {
        self.inner
            .service
            .service_info()
            .await
            .map_err(|e| CoreError::load(&e))
    }
}
