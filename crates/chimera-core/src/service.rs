// ── Remote device service seam ──
//
// The coordinator and session talk to the backend through this trait so
// they can be driven by `DeviceClient` in production and a scripted
// double in tests.

use std::future::Future;

use chimera_api::{ActionRequest, DeviceClient, Error};

use crate::model::{Device, DeviceId, DeviceUpdate, ServiceInfo, Summary};

/// Operations the client needs from a Device Service.
pub trait DeviceService: Send + Sync + 'static {
    fn list_devices(&self) -> impl Future<Output = Result<Vec<Device>, Error>> + Send;

    fn get_summary(&self) -> impl Future<Output = Result<Summary, Error>> + Send;

    /// Apply an action and return the authoritative record.
    fn perform_action(
        &self,
        id: DeviceId,
        request: &ActionRequest,
    ) -> impl Future<Output = Result<Device, Error>> + Send;

    fn update_device(
        &self,
        id: DeviceId,
        update: &DeviceUpdate,
    ) -> impl Future<Output = Result<Device, Error>> + Send;

    fn service_info(&self) -> impl Future<Output = Result<ServiceInfo, Error>> + Send;
}

impl DeviceService for DeviceClient {
    fn list_devices(&self) -> impl Future<Output = Result<Vec<Device>, Error>> + Send {
        DeviceClient::list_devices(self)
    }

    fn get_summary(&self) -> impl Future<Output = Result<Summary, Error>> + Send {
        DeviceClient::get_summary(self)
    }

    fn perform_action(
        &self,
        id: DeviceId,
        request: &ActionRequest,
    ) -> impl Future<Output = Result<Device, Error>> + Send {
        DeviceClient::perform_action(self, id, request)
    }

    fn update_device(
        &self,
        id: DeviceId,
        update: &DeviceUpdate,
    ) -> impl Future<Output = Result<Device, Error>> + Send {
        DeviceClient::update_device(self, id, update)
    }

    fn service_info(&self) -> impl Future<Output = Result<ServiceInfo, Error>> + Send {
        DeviceClient::service_info(self)
    }
}
