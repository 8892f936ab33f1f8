// ── Optimistic action coordinator ──
//
// Applies a predicted record to the store before the network call, then
// settles it: the server's record on success, the exact pre-action
// record on failure. A device passes through at most D0 -> D1 -> D2|D0
// per action.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{debug, info, warn};

use crate::config::ActionOrdering;
use crate::error::{CoreError, RemoteFailureKind};
use crate::model::{CategoryCatalog, Device, DeviceAction, DeviceId, DeviceUpdate};
use crate::service::DeviceService;
use crate::store::DeviceStore;

type LockTable = DashMap<DeviceId, Arc<Mutex<()>>>;

/// Runs device actions against a store and a remote service.
pub struct ActionCoordinator<S> {
    store: Arc<DeviceStore>,
    service: Arc<S>,
    catalog: CategoryCatalog,
    ordering: ActionOrdering,
    /// Per-device locks, only used with `ActionOrdering::Serialized`.
    locks: Arc<LockTable>,
}

impl<S: DeviceService> ActionCoordinator<S> {
    pub fn new(
        store: Arc<DeviceStore>,
        service: Arc<S>,
        catalog: CategoryCatalog,
        ordering: ActionOrdering,
    ) -> Self {
        Self {
            store,
            service,
            catalog,
            ordering,
            locks: Arc::new(DashMap::new()),
        }
    }

    pub fn ordering(&self) -> ActionOrdering {
        self.ordering
    }

    pub fn catalog(&self) -> &CategoryCatalog {
        &self.catalog
    }

    /// Perform `action` on `device_id` optimistically.
    ///
    /// Rejections (`NotFound`, `InvalidCategory`) leave the store untouched
    /// and send nothing. Otherwise the prediction is visible to store
    /// observers before the request goes out, and the returned record is
    /// the one the service confirmed.
    ///
    /// Once the request is issued the settle step runs on its own task,
    /// so dropping this future never strands a prediction in the store.
    pub async fn perform_action(
        &self,
        device_id: DeviceId,
        action: DeviceAction,
    ) -> Result<Arc<Device>, CoreError> {
        let guard = self.acquire(device_id).await;

        let prepared = self
            .store
            .get(device_id)
            .ok_or(CoreError::NotFound { id: device_id })
            .and_then(|original| {
                let predicted = action.apply(&original, &self.catalog)?;
                Ok((original, predicted))
            });
        let (original, predicted) = match prepared {
            Ok(pair) => pair,
            Err(err) => {
                drop(guard);
                self.release_lock(device_id);
                return Err(err);
            }
        };
        self.store.replace(predicted);
        debug!(device_id = %device_id, %action, "optimistic update applied");

        let label = action.to_string();
        let settle = tokio::spawn(settle(
            Arc::clone(&self.store),
            Arc::clone(&self.service),
            device_id,
            action,
            Arc::clone(&original),
            Arc::clone(&self.locks),
            guard,
        ));

        let result = match settle.await {
            Ok(result) => result,
            Err(join_err) => {
                self.store.replace(original);
                if join_err.is_panic() {
                    std::panic::resume_unwind(join_err.into_panic());
                }
                warn!(device_id = %device_id, action = %label, "settle task cancelled, rolled back");
                Err(CoreError::RemoteFailure {
                    device_id,
                    action: label,
                    kind: RemoteFailureKind::Network,
                    message: "action was cancelled before the service answered".into(),
                })
            }
        };

        self.release_lock(device_id);
        result
    }

    /// Send a non-optimistic edit and store the record the service returns.
    ///
    /// Blocklist keys are checked against the catalog first. Nothing in
    /// the store changes unless the service confirms.
    pub async fn update_device(
        &self,
        device_id: DeviceId,
        update: &DeviceUpdate,
    ) -> Result<Arc<Device>, CoreError> {
        if update.is_empty() {
            return Err(CoreError::ValidationFailed {
                message: "nothing to update".into(),
            });
        }
        if let Some(blocklist) = &update.blocklist {
            for category in blocklist.keys() {
                self.catalog.validate(category)?;
            }
        }

        let guard = self.acquire(device_id).await;
        let result = self.confirm_update(device_id, update).await;
        drop(guard);
        self.release_lock(device_id);
        result
    }

    async fn confirm_update(
        &self,
        device_id: DeviceId,
        update: &DeviceUpdate,
    ) -> Result<Arc<Device>, CoreError> {
        if !self.store.contains(device_id) {
            return Err(CoreError::NotFound { id: device_id });
        }
        debug!(device_id = %device_id, "sending device update");

        let confirmed = self
            .service
            .update_device(device_id, update)
            .await
            .map_err(|err| {
                warn!(device_id = %device_id, error = %err, "device update failed");
                CoreError::remote(device_id, "update", &err)
            })?;
        if confirmed.id != device_id {
            return Err(CoreError::RemoteFailure {
                device_id,
                action: "update".into(),
                kind: RemoteFailureKind::InvalidResponse,
                message: format!("service returned device {} instead", confirmed.id),
            });
        }

        let confirmed = Arc::new(confirmed);
        self.store.replace(Arc::clone(&confirmed));
        info!(device_id = %device_id, "device updated");
        Ok(confirmed)
    }

    async fn acquire(&self, device_id: DeviceId) -> Option<OwnedMutexGuard<()>> {
        match self.ordering {
            ActionOrdering::Serialized => Some(self.lock_for(device_id).lock_owned().await),
            ActionOrdering::Overlapping => None,
        }
    }

    fn lock_for(&self, device_id: DeviceId) -> Arc<Mutex<()>> {
        Arc::clone(self.locks.entry(device_id).or_default().value())
    }

    fn release_lock(&self, device_id: DeviceId) {
        prune_lock(&self.locks, device_id);
    }
}

/// Drop the lock entry once nobody holds or waits on it.
fn prune_lock(locks: &LockTable, device_id: DeviceId) {
    locks.remove_if(&device_id, |_, lock| Arc::strong_count(lock) == 1);
}

/// Call the service, then confirm or roll back. The device lock is
/// released here, so a caller that stops waiting leaves no entry behind.
async fn settle<S: DeviceService>(
    store: Arc<DeviceStore>,
    service: Arc<S>,
    device_id: DeviceId,
    action: DeviceAction,
    original: Arc<Device>,
    locks: Arc<LockTable>,
    guard: Option<OwnedMutexGuard<()>>,
) -> Result<Arc<Device>, CoreError> {
    let result = confirm_or_roll_back(&store, &*service, device_id, &action, original).await;
    drop(guard);
    prune_lock(&locks, device_id);
    result
}

async fn confirm_or_roll_back<S: DeviceService>(
    store: &DeviceStore,
    service: &S,
    device_id: DeviceId,
    action: &DeviceAction,
    original: Arc<Device>,
) -> Result<Arc<Device>, CoreError> {
    match service.perform_action(device_id, &action.to_request()).await {
        Ok(confirmed) if confirmed.id == device_id => {
            let confirmed = Arc::new(confirmed);
            store.replace(Arc::clone(&confirmed));
            info!(device_id = %device_id, %action, "action confirmed");
            Ok(confirmed)
        }
        Ok(other) => {
            store.replace(original);
            warn!(
                device_id = %device_id,
                %action,
                returned = %other.id,
                "service answered for a different device, rolled back"
            );
            Err(CoreError::RemoteFailure {
                device_id,
                action: action.to_string(),
                kind: RemoteFailureKind::InvalidResponse,
                message: format!("service returned device {} instead", other.id),
            })
        }
        Err(err) => {
            store.replace(original);
            warn!(device_id = %device_id, %action, error = %err, "action failed, rolled back");
            Err(CoreError::remote(device_id, action.to_string(), &err))
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::Mutex as StdMutex;
    use std::time::Duration;

    use chimera_api::{ActionRequest, Error};
    use pretty_assertions::assert_eq;
    use tokio::sync::oneshot;

    use super::*;
    use crate::model::{ActionKind, ServiceInfo, Summary};
    use crate::store::StoreChange;

    // ── Scripted service ─────────────────────────────────────────────

    enum Reply {
        Confirm(Device),
        Fail(u16),
        Deferred(oneshot::Receiver<Result<Device, u16>>),
    }

    #[derive(Default)]
    struct ScriptedService {
        replies: StdMutex<VecDeque<Reply>>,
        requests: StdMutex<Vec<(DeviceId, ActionRequest)>>,
    }

    impl ScriptedService {
        fn new(replies: impl IntoIterator<Item = Reply>) -> Self {
            Self {
                replies: StdMutex::new(replies.into_iter().collect()),
                requests: StdMutex::default(),
            }
        }

        fn requests(&self) -> Vec<(DeviceId, ActionRequest)> {
            self.requests.lock().unwrap().clone()
        }
    }

    fn status(code: u16) -> Error {
        Error::Status {
            status: code,
            detail: None,
        }
    }

    impl DeviceService for ScriptedService {
        async fn list_devices(&self) -> Result<Vec<Device>, Error> {
            Ok(Vec::new())
        }

        async fn get_summary(&self) -> Result<Summary, Error> {
            Ok(Summary::default())
        }

        async fn perform_action(&self, id: DeviceId, request: &ActionRequest) -> Result<Device, Error> {
            self.requests.lock().unwrap().push((id, request.clone()));
            let reply = self.replies.lock().unwrap().pop_front().expect("unscripted call");
            match reply {
                Reply::Confirm(device) => Ok(device),
                Reply::Fail(code) => Err(status(code)),
                Reply::Deferred(rx) => rx.await.unwrap().map_err(status),
            }
        }

        async fn update_device(&self, _id: DeviceId, _update: &DeviceUpdate) -> Result<Device, Error> {
            Err(status(501))
        }

        async fn service_info(&self) -> Result<ServiceInfo, Error> {
            Ok(ServiceInfo::default())
        }
    }

    // ── Fixtures ─────────────────────────────────────────────────────

    const TV: DeviceId = DeviceId(7);

    fn tv() -> Device {
        let mut d = Device::new(TV, true);
        d.hostname = Some("lounge-tv".into());
        d.blocklist.set("gaming", false);
        d.blocklist.set("porn", true);
        d
    }

    fn setup(
        replies: impl IntoIterator<Item = Reply>,
        ordering: ActionOrdering,
    ) -> (Arc<ActionCoordinator<ScriptedService>>, Arc<ScriptedService>, Arc<DeviceStore>) {
        let store = Arc::new(DeviceStore::new());
        store.replace_all(vec![tv(), Device::new(DeviceId(8), true)], Summary::default());
        let service = Arc::new(ScriptedService::new(replies));
        let coordinator = ActionCoordinator::new(
            Arc::clone(&store),
            Arc::clone(&service),
            CategoryCatalog::standard(),
            ordering,
        );
        (Arc::new(coordinator), service, store)
    }

    /// Record every state device 7 passes through.
    fn record(store: &DeviceStore) -> (Arc<StdMutex<Vec<Device>>>, crate::store::Subscription) {
        let seen = Arc::new(StdMutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let sub = store.subscribe(move |change| {
            if let StoreChange::Replaced { device } = change {
                if device.id == TV {
                    sink.lock().unwrap().push(Device::clone(device));
                }
            }
        });
        (seen, sub)
    }

    async fn wait_until(cond: impl Fn() -> bool) {
        for _ in 0..1000 {
            if cond() {
                return;
            }
            tokio::task::yield_now().await;
        }
        panic!("condition not reached");
    }

    fn current(store: &DeviceStore) -> Device {
        Device::clone(&store.get(TV).unwrap())
    }

    // ── Single actions ───────────────────────────────────────────────

    #[tokio::test]
    async fn confirmed_record_wins_over_prediction() {
        let mut server = tv();
        server.is_active = false;
        server.has_custom_blocklist = true;
        server.blocklist = [("gaming", true), ("porn", true)].into_iter().collect();

        let (coordinator, service, store) =
            setup([Reply::Confirm(server.clone())], ActionOrdering::default());
        let (seen, _sub) = record(&store);

        let result = coordinator.perform_action(TV, DeviceAction::Isolate).await.unwrap();

        let mut predicted = tv();
        predicted.is_active = false;
        assert_eq!(*result, server);
        assert_eq!(current(&store), server);
        assert_eq!(*seen.lock().unwrap(), [predicted, server]);
        assert_eq!(
            service.requests(),
            [(
                TV,
                ActionRequest {
                    action: ActionKind::Isolate,
                    category: None
                }
            )]
        );
    }

    #[tokio::test]
    async fn failure_restores_exact_original() {
        let (coordinator, _service, store) = setup([Reply::Fail(503)], ActionOrdering::default());
        let (seen, _sub) = record(&store);

        let err = coordinator
            .perform_action(TV, DeviceAction::toggle_block("gaming"))
            .await
            .unwrap_err();

        let mut predicted = tv();
        predicted.blocklist.set("gaming", true);
        assert_eq!(*seen.lock().unwrap(), [predicted, tv()]);
        assert_eq!(current(&store), tv());
        match err {
            CoreError::RemoteFailure {
                device_id, kind, ..
            } => {
                assert_eq!(device_id, TV);
                assert_eq!(kind, RemoteFailureKind::Status(503));
            }
            other => panic!("expected RemoteFailure, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn toggle_sends_category_and_flips_only_that_key() {
        let mut server = tv();
        server.blocklist.set("gaming", true);
        let (coordinator, service, store) =
            setup([Reply::Confirm(server.clone())], ActionOrdering::default());

        coordinator
            .perform_action(TV, DeviceAction::toggle_block("gaming"))
            .await
            .unwrap();

        let after = current(&store);
        assert!(after.blocklist.is_blocked("gaming"));
        assert!(after.blocklist.is_blocked("porn"));
        assert_eq!(service.requests()[0].1.category.as_deref(), Some("gaming"));
    }

    #[tokio::test]
    async fn unknown_device_is_rejected_without_request() {
        let (coordinator, service, store) = setup(Vec::<Reply>::new(), ActionOrdering::default());
        let (seen, _sub) = record(&store);
        let version = store.version();

        let err = coordinator
            .perform_action(DeviceId(404), DeviceAction::Isolate)
            .await
            .unwrap_err();

        assert!(matches!(err, CoreError::NotFound { id } if id == DeviceId(404)));
        assert!(service.requests().is_empty());
        assert!(seen.lock().unwrap().is_empty());
        assert_eq!(store.version(), version);
    }

    #[tokio::test]
    async fn unknown_category_is_rejected_without_request() {
        let (coordinator, service, store) = setup(Vec::<Reply>::new(), ActionOrdering::default());
        let (seen, _sub) = record(&store);

        let err = coordinator
            .perform_action(TV, DeviceAction::toggle_block("crypto"))
            .await
            .unwrap_err();

        assert!(matches!(err, CoreError::InvalidCategory { ref category } if category == "crypto"));
        assert!(service.requests().is_empty());
        assert!(seen.lock().unwrap().is_empty());
        assert_eq!(current(&store), tv());
    }

    #[tokio::test]
    async fn response_for_another_device_rolls_back() {
        let (coordinator, _service, store) =
            setup([Reply::Confirm(Device::new(DeviceId(8), false))], ActionOrdering::default());

        let err = coordinator.perform_action(TV, DeviceAction::Isolate).await.unwrap_err();

        assert_eq!(err.remote_kind(), Some(RemoteFailureKind::InvalidResponse));
        assert_eq!(current(&store), tv());
        assert!(store.get(DeviceId(8)).unwrap().is_active);
    }

    #[tokio::test]
    async fn dropped_caller_still_settles() {
        let (tx, rx) = oneshot::channel();
        let (coordinator, service, store) = setup([Reply::Deferred(rx)], ActionOrdering::default());

        let pending = tokio::time::timeout(
            Duration::from_millis(20),
            coordinator.perform_action(TV, DeviceAction::Isolate),
        )
        .await;
        assert!(pending.is_err());
        assert_eq!(service.requests().len(), 1);
        assert!(!current(&store).is_active);

        tx.send(Err(500)).unwrap();
        wait_until(|| current(&store).is_active).await;
        assert_eq!(current(&store), tv());
        wait_until(|| coordinator.locks.is_empty()).await;
    }

    #[tokio::test]
    async fn rejected_action_leaves_no_lock_entry() {
        let (coordinator, _service, _store) = setup(Vec::<Reply>::new(), ActionOrdering::Serialized);

        coordinator
            .perform_action(TV, DeviceAction::toggle_block("crypto"))
            .await
            .unwrap_err();

        assert!(coordinator.locks.is_empty());
    }

    // ── Overlapping actions ──────────────────────────────────────────

    #[tokio::test]
    async fn overlapping_rollback_clobbers_later_prediction() {
        let (tx_a, rx_a) = oneshot::channel();
        let (tx_b, rx_b) = oneshot::channel();
        let (coordinator, service, store) = setup(
            [Reply::Deferred(rx_a), Reply::Deferred(rx_b)],
            ActionOrdering::Overlapping,
        );

        let a = tokio::spawn({
            let c = Arc::clone(&coordinator);
            async move { c.perform_action(TV, DeviceAction::Isolate).await }
        });
        wait_until(|| service.requests().len() == 1).await;

        let b = tokio::spawn({
            let c = Arc::clone(&coordinator);
            async move { c.perform_action(TV, DeviceAction::toggle_block("gaming")).await }
        });
        wait_until(|| service.requests().len() == 2).await;

        // B predicted on top of A's in-flight prediction.
        let stacked = current(&store);
        assert!(!stacked.is_active);
        assert!(stacked.blocklist.is_blocked("gaming"));

        tx_a.send(Err(503)).unwrap();
        assert!(a.await.unwrap().is_err());
        // A's rollback discards B's prediction.
        assert_eq!(current(&store), tv());

        let mut confirmed = tv();
        confirmed.blocklist.set("gaming", true);
        tx_b.send(Ok(confirmed.clone())).unwrap();
        assert_eq!(*b.await.unwrap().unwrap(), confirmed);
        assert_eq!(current(&store), confirmed);
    }

    #[tokio::test]
    async fn serialized_action_waits_for_previous_to_settle() {
        let (tx_a, rx_a) = oneshot::channel();
        let (tx_b, rx_b) = oneshot::channel();
        let (coordinator, service, store) = setup(
            [Reply::Deferred(rx_a), Reply::Deferred(rx_b)],
            ActionOrdering::Serialized,
        );

        let a = tokio::spawn({
            let c = Arc::clone(&coordinator);
            async move { c.perform_action(TV, DeviceAction::Isolate).await }
        });
        wait_until(|| service.requests().len() == 1).await;

        let b = tokio::spawn({
            let c = Arc::clone(&coordinator);
            async move { c.perform_action(TV, DeviceAction::toggle_block("gaming")).await }
        });
        for _ in 0..50 {
            tokio::task::yield_now().await;
        }

        // B has neither predicted nor called the service yet.
        assert_eq!(service.requests().len(), 1);
        assert!(!current(&store).blocklist.is_blocked("gaming"));

        tx_a.send(Err(503)).unwrap();
        assert!(a.await.unwrap().is_err());
        wait_until(|| service.requests().len() == 2).await;

        // B predicted from the rolled-back record.
        let predicted = current(&store);
        assert!(predicted.is_active);
        assert!(predicted.blocklist.is_blocked("gaming"));

        let mut confirmed = tv();
        confirmed.blocklist.set("gaming", true);
        tx_b.send(Ok(confirmed.clone())).unwrap();
        assert_eq!(*b.await.unwrap().unwrap(), confirmed);
        assert_eq!(current(&store), confirmed);
        assert!(coordinator.locks.is_empty());
    }

    #[tokio::test]
    async fn serialized_actions_on_different_devices_do_not_wait() {
        let (tx_a, rx_a) = oneshot::channel();
        let (coordinator, service, store) = setup(
            [Reply::Deferred(rx_a), Reply::Confirm(Device::new(DeviceId(8), false))],
            ActionOrdering::Serialized,
        );

        let a = tokio::spawn({
            let c = Arc::clone(&coordinator);
            async move { c.perform_action(TV, DeviceAction::Isolate).await }
        });
        wait_until(|| service.requests().len() == 1).await;

        let other = coordinator
            .perform_action(DeviceId(8), DeviceAction::Isolate)
            .await
            .unwrap();
        assert!(!other.is_active);

        tx_a.send(Ok(Device::new(TV, false))).unwrap();
        a.await.unwrap().unwrap();
        assert!(!store.get(TV).unwrap().is_active);
    }
}
