// chimera-core: device inventory state between chimera-api and consumers.
//
// - `store`: the single in-memory copy of devices and summary
// - `coordinator`: optimistic actions with exact rollback
// - `stream`: snapshot streams and the search/filter projection
// - `session`: owns all of the above for one service

pub mod config;
pub mod coordinator;
pub mod error;
pub mod model;
pub mod service;
pub mod session;
pub mod store;
pub mod stream;

// ── Primary re-exports ──────────────────────────────────────────────
pub use config::{ActionOrdering, ClientConfig, TlsVerification};
pub use coordinator::ActionCoordinator;
pub use error::{CoreError, RemoteFailureKind};
pub use service::DeviceService;
pub use session::Session;
pub use store::{DeviceStore, StoreChange, Subscription};
pub use stream::{DeviceFilter, DeviceStream, EntityStream, filter_devices};

pub use model::{
    ActionKind, AiClassification, BlockCategory, Blocklist, CategoryCatalog, Device, DeviceAction,
    DeviceGroup, DeviceId, DeviceUpdate, GroupRef, RiskCounts, RiskLevel, ServiceInfo, Summary,
};
