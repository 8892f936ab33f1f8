// chimera-api: Async Rust client for the Chimera Device Service

pub mod client;
pub mod error;
pub mod models;
pub mod transport;

pub use client::DeviceClient;
pub use error::Error;
pub use models::{
    ActionKind, ActionRequest, AiClassification, Blocklist, Device, DeviceGroup, DeviceId,
    DeviceUpdate, GroupRef, RiskCounts, ServiceInfo, Summary,
};
pub use transport::{TlsMode, TransportConfig};
