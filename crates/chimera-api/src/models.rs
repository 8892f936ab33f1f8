// Device Service wire types
//
// Shapes returned by `/api/devices`, `/api/summary`, and the action/update
// endpoints. Fields the client does not interpret are carried through
// verbatim so a replaced record always equals what the server sent.

use std::fmt;
use std::num::ParseIntError;
use std::str::FromStr;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

// ── Identity ────────────────────────────────────────────────────────

/// Integer device identity. Unique within a service, never reassigned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeviceId(pub u64);

impl DeviceId {
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for DeviceId {
    type Err = ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse().map(Self)
    }
}

impl From<u64> for DeviceId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

// ── Device ──────────────────────────────────────────────────────────

/// Device group as embedded in a device record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceGroup {
    #[serde(default)]
    pub id: u32,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub is_default: bool,
}

/// Server-side AI classification. Read-only for the client.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AiClassification {
    #[serde(default)]
    pub device_type: String,
    #[serde(default)]
    pub device_category: String,
    /// Confidence score in `[0, 1]`.
    #[serde(default)]
    pub confidence: f64,
    #[serde(default)]
    pub reasoning: String,
    #[serde(default)]
    pub indicators: Vec<String>,
    #[serde(default)]
    pub last_classified: Option<String>,
}

/// Per-category content blocklist: category name -> blocked.
///
/// Key order follows the server's response and survives edits.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Blocklist(IndexMap<String, bool>);

impl Blocklist {
    pub fn new() -> Self {
        Self::default()
    }

    /// The flag for `category`, or `None` if the key is absent.
    pub fn get(&self, category: &str) -> Option<bool> {
        self.0.get(category).copied()
    }

    /// Whether `category` is blocked. Absent keys count as unblocked.
    pub fn is_blocked(&self, category: &str) -> bool {
        self.get(category).unwrap_or(false)
    }

    pub fn set(&mut self, category: impl Into<String>, blocked: bool) {
        self.0.insert(category.into(), blocked);
    }

    /// Flip `category` and return the new flag. An absent key becomes `true`.
    pub fn toggle(&mut self, category: &str) -> bool {
        let next = !self.is_blocked(category);
        self.set(category, next);
        next
    }

    /// Number of categories currently blocked.
    pub fn blocked_count(&self) -> usize {
        self.0.values().filter(|blocked| **blocked).count()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, bool)> {
        self.0.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>> FromIterator<(K, bool)> for Blocklist {
    fn from_iter<I: IntoIterator<Item = (K, bool)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}

/// A network device as served by `/api/devices`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[allow(clippy::struct_excessive_bools)]
pub struct Device {
    pub id: DeviceId,
    pub mac: Option<String>,
    pub hostname: Option<String>,
    pub vendor: Option<String>,
    pub given_name: Option<String>,
    pub ip: Option<String>,
    #[serde(default)]
    pub user_agent: Vec<String>,
    #[serde(default)]
    pub group: DeviceGroup,
    /// `false` while the device is isolated.
    pub is_active: bool,
    #[serde(default)]
    pub has_custom_blocklist: bool,
    pub first_seen: Option<String>,
    pub last_seen: Option<String>,
    #[serde(default)]
    pub is_mac_universal: bool,

    // OS fingerprint
    pub os_name: Option<String>,
    pub os_accuracy: Option<u8>,
    pub os_type: Option<String>,
    pub os_vendor: Option<String>,
    pub os_family: Option<String>,
    pub os_gen: Option<String>,
    #[serde(default)]
    pub os_cpe: Vec<String>,
    pub os_last_updated: Option<String>,

    #[serde(default)]
    pub blocklist: Blocklist,
    #[serde(default)]
    pub ai_classification: AiClassification,

    /// Fields this client does not model, kept for lossless pass-through.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Device {
    /// Minimal record with every optional field empty.
    pub fn new(id: DeviceId, is_active: bool) -> Self {
        Self {
            id,
            mac: None,
            hostname: None,
            vendor: None,
            given_name: None,
            ip: None,
            user_agent: Vec::new(),
            group: DeviceGroup::default(),
            is_active,
            has_custom_blocklist: false,
            first_seen: None,
            last_seen: None,
            is_mac_universal: false,
            os_name: None,
            os_accuracy: None,
            os_type: None,
            os_vendor: None,
            os_family: None,
            os_gen: None,
            os_cpe: Vec::new(),
            os_last_updated: None,
            blocklist: Blocklist::new(),
            ai_classification: AiClassification::default(),
            extra: Map::new(),
        }
    }

    /// Best human label: given name, then hostname, then IP, then id.
    pub fn display_name(&self) -> String {
        [&self.given_name, &self.hostname, &self.ip]
            .into_iter()
            .find_map(|field| field.as_deref().filter(|s| !s.is_empty()))
            .map_or_else(|| format!("device-{}", self.id), str::to_owned)
    }
}

// ── Summary ─────────────────────────────────────────────────────────

/// Device counts per risk tier.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskCounts {
    #[serde(default)]
    pub high: u64,
    #[serde(default)]
    pub medium: u64,
    #[serde(default)]
    pub low: u64,
}

/// Aggregate statistics from `/api/summary`. Derived server-side.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Summary {
    #[serde(default)]
    pub total: u64,
    #[serde(default)]
    pub active: u64,
    #[serde(default)]
    pub by_group: IndexMap<String, u64>,
    #[serde(default)]
    pub by_category: IndexMap<String, u64>,
    #[serde(default)]
    pub by_risk: RiskCounts,
}

// ── Requests ────────────────────────────────────────────────────────

/// Action verbs accepted by `POST /api/devices/{id}/actions`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    Isolate,
    Release,
    ToggleBlock,
}

impl ActionKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Isolate => "isolate",
            Self::Release => "release",
            Self::ToggleBlock => "toggle_block",
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Body of an action request. `category` is only sent for `toggle_block`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionRequest {
    pub action: ActionKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

/// Group reference in an update request; the server fills in the rest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupRef {
    pub id: u32,
}

/// Body of `PATCH /api/devices/{id}`. Unset fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub given_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group: Option<GroupRef>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub blocklist: Option<IndexMap<String, bool>>,
}

impl DeviceUpdate {
    pub fn is_empty(&self) -> bool {
        self.given_name.is_none() && self.group.is_none() && self.blocklist.is_none()
    }
}

/// Response of `GET /`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceInfo {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub version: String,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn sample() -> Value {
        json!({
            "id": 7,
            "mac": "aa:bb:cc:dd:ee:ff",
            "hostname": "living-room-tv",
            "vendor": "Samsung",
            "given_name": null,
            "ip": "192.168.0.42",
            "user_agent": [],
            "group": { "id": 4, "name": "IoT", "is_default": false },
            "is_active": true,
            "has_custom_blocklist": false,
            "first_seen": "2024-01-01T00:00:00Z",
            "last_seen": "2024-06-01T00:00:00Z",
            "is_mac_universal": true,
            "os_name": "Tizen",
            "os_accuracy": 90,
            "os_cpe": ["cpe:/o:samsung:tizen"],
            "os_last_updated": "2024-06-01T00:00:00Z",
            "blocklist": { "ads_trackers": true, "gambling": false, "safesearch": true },
            "ai_classification": {
                "device_type": "TV",
                "device_category": "smart_tv",
                "confidence": 0.93,
                "reasoning": "vendor and hostname",
                "indicators": ["hostname"],
                "last_classified": "2024-06-01T00:00:00Z"
            },
            "firmware": "T-KTM2"
        })
    }

    #[test]
    fn device_round_trip_keeps_unknown_fields() {
        let raw = sample();
        let device: Device = serde_json::from_value(raw.clone()).unwrap();
        assert_eq!(device.id, DeviceId(7));
        assert_eq!(device.extra.get("firmware"), Some(&json!("T-KTM2")));
        assert_eq!(device.blocklist.blocked_count(), 2);

        let keys: Vec<&str> = device.blocklist.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, ["ads_trackers", "gambling", "safesearch"]);

        let back = serde_json::to_value(&device).unwrap();
        assert_eq!(back["firmware"], json!("T-KTM2"));
        assert_eq!(back["group"]["name"], json!("IoT"));
    }

    #[test]
    fn blocklist_toggle_treats_missing_as_unblocked() {
        let mut list: Blocklist = [("ads", true)].into_iter().collect();
        assert!(list.toggle("porn"));
        assert!(!list.toggle("ads"));
        assert_eq!(list.get("porn"), Some(true));
        assert_eq!(list.get("ads"), Some(false));
        assert_eq!(list.len(), 2);
    }

    #[test]
    fn action_request_omits_category_unless_toggling() {
        let isolate = ActionRequest {
            action: ActionKind::Isolate,
            category: None,
        };
        assert_eq!(serde_json::to_value(&isolate).unwrap(), json!({ "action": "isolate" }));

        let toggle = ActionRequest {
            action: ActionKind::ToggleBlock,
            category: Some("gaming".into()),
        };
        assert_eq!(
            serde_json::to_value(&toggle).unwrap(),
            json!({ "action": "toggle_block", "category": "gaming" })
        );
    }

    #[test]
    fn summary_tolerates_missing_fields() {
        let summary: Summary = serde_json::from_value(json!({ "total": 3 })).unwrap();
        assert_eq!(summary.total, 3);
        assert_eq!(summary.active, 0);
        assert!(summary.by_group.is_empty());
        assert_eq!(summary.by_risk, RiskCounts::default());
    }

    #[test]
    fn display_name_falls_back_through_fields() {
        let mut device = Device::new(DeviceId(3), true);
        assert_eq!(device.display_name(), "device-3");
        device.ip = Some("10.0.0.3".into());
        assert_eq!(device.display_name(), "10.0.0.3");
        device.hostname = Some("nas".into());
        device.given_name = Some("Backup NAS".into());
        assert_eq!(device.display_name(), "Backup NAS");
    }

    #[test]
    fn display_name_skips_empty_fields() {
        let mut device = Device::new(DeviceId(3), true);
        device.given_name = Some(String::new());
        device.hostname = Some("nas".into());
        assert_eq!(device.display_name(), "nas");

        device.hostname = Some(String::new());
        device.ip = Some("10.0.0.3".into());
        assert_eq!(device.display_name(), "10.0.0.3");
    }
}
