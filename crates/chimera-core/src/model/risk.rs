use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use super::Device;

/// More than this many blocked categories is high risk.
pub const HIGH_RISK_THRESHOLD: usize = 8;
/// More than this many blocked categories is medium risk.
pub const MEDIUM_RISK_THRESHOLD: usize = 4;

/// Risk tier derived from how many categories a device has blocked.
///
/// Uses the same thresholds the service uses for `by_risk`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    pub fn from_blocked_count(blocked: usize) -> Self {
        if blocked > HIGH_RISK_THRESHOLD {
            Self::High
        } else if blocked > MEDIUM_RISK_THRESHOLD {
            Self::Medium
        } else {
            Self::Low
        }
    }

    pub fn of(device: &Device) -> Self {
        Self::from_blocked_count(device.blocklist.blocked_count())
    }
}
