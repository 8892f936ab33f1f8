// ── Domain model ──
//
// Wire records come from chimera-api unchanged; this module adds the
// client-side vocabulary on top: actions and their predictions, the
// category catalog, and risk tiers.

mod action;
mod category;
mod risk;

pub use action::DeviceAction;
pub use category::{BlockCategory, CategoryCatalog};
pub use risk::RiskLevel;

pub use chimera_api::{
    ActionKind, AiClassification, Blocklist, Device, DeviceGroup, DeviceId, DeviceUpdate,
    GroupRef, RiskCounts, ServiceInfo, Summary,
};
