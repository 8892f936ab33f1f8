// ── Device store ──
//
// The single in-memory source of truth for device records and the
// server summary. Mutations replace whole records and are pushed to
// observers synchronously and to `watch` subscribers asynchronously.

mod device_store;
mod observer;

pub use device_store::{DeviceStore, StoreChange};
pub use observer::Subscription;
