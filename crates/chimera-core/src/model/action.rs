// ── Device actions ──
//
// The closed set of writes the coordinator can perform, and the local
// prediction of each one's effect.

use std::fmt;

use chimera_api::ActionRequest;

use super::{ActionKind, CategoryCatalog, Device};
use crate::error::CoreError;

/// A user-initiated write against one device.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DeviceAction {
    /// Cut the device off the network.
    Isolate,
    /// Undo an isolation.
    Release,
    /// Flip one blocklist category.
    ToggleBlock { category: String },
}

impl DeviceAction {
    pub fn toggle_block(category: impl Into<String>) -> Self {
        Self::ToggleBlock {
            category: category.into(),
        }
    }

    /// Build from the wire verb plus optional category.
    pub fn parse(action: &str, category: Option<&str>) -> Result<Self, CoreError> {
        match (action.trim().to_ascii_lowercase().as_str(), category) {
            ("isolate", _) => Ok(Self::Isolate),
            ("release", _) => Ok(Self::Release),
            ("toggle_block", Some(category)) => Ok(Self::toggle_block(category)),
            ("toggle_block", None) => Err(CoreError::ValidationFailed {
                message: "toggle_block requires a category".into(),
            }),
            (other, _) => Err(CoreError::ValidationFailed {
                message: format!("unknown action '{other}' (expected isolate, release, or toggle_block)"),
            }),
        }
    }

    pub fn kind(&self) -> ActionKind {
        match self {
            Self::Isolate => ActionKind::Isolate,
            Self::Release => ActionKind::Release,
            Self::ToggleBlock { .. } => ActionKind::ToggleBlock,
        }
    }

    pub fn category(&self) -> Option<&str> {
        match self {
            Self::ToggleBlock { category } => Some(category.as_str()),
            Self::Isolate | Self::Release => None,
        }
    }

    pub fn to_request(&self) -> ActionRequest {
        ActionRequest {
            action: self.kind(),
            category: self.category().map(str::to_owned),
        }
    }

    /// Predict the device after this action succeeds.
    ///
    /// Touches only the field the action targets. A category absent from
    /// the device's blocklist is treated as unblocked and becomes blocked.
    pub fn apply(&self, device: &Device, catalog: &CategoryCatalog) -> Result<Device, CoreError> {
        let mut next = device.clone();
        match self {
            Self::Isolate => next.is_active = false,
            Self::Release => next.is_active = true,
            Self::ToggleBlock { category } => {
                catalog.validate(category)?;
                next.blocklist.toggle(category);
            }
        }
        Ok(next)
    }
}

impl fmt::Display for DeviceAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ToggleBlock { category } => write!(f, "toggle_block({category})"),
            other => f.write_str(other.kind().as_str()),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::model::DeviceId;
    use pretty_assertions::assert_eq;

    fn device() -> Device {
        let mut d = Device::new(DeviceId(1), true);
        d.hostname = Some("laptop".into());
        d.blocklist.set("gaming", false);
        d.blocklist.set("porn", true);
        d
    }

    #[test]
    fn isolate_and_release_touch_only_is_active() {
        let catalog = CategoryCatalog::standard();
        let d0 = device();

        let isolated = DeviceAction::Isolate.apply(&d0, &catalog).unwrap();
        assert!(!isolated.is_active);
        assert_eq!(isolated.blocklist, d0.blocklist);
        assert_eq!(isolated.hostname, d0.hostname);

        let released = DeviceAction::Release.apply(&isolated, &catalog).unwrap();
        assert_eq!(released, d0);
    }

    #[test]
    fn toggle_flips_one_category_and_keeps_order() {
        let catalog = CategoryCatalog::standard();
        let d0 = device();

        let d1 = DeviceAction::toggle_block("gaming").apply(&d0, &catalog).unwrap();
        assert_eq!(d1.blocklist.get("gaming"), Some(true));
        assert_eq!(d1.blocklist.get("porn"), Some(true));
        let keys: Vec<&str> = d1.blocklist.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, ["gaming", "porn"]);

        let d2 = DeviceAction::toggle_block("gaming").apply(&d1, &catalog).unwrap();
        assert_eq!(d2, d0);
    }

    #[test]
    fn toggle_of_absent_key_blocks_it() {
        let catalog = CategoryCatalog::standard();
        let d1 = DeviceAction::toggle_block("youtube").apply(&device(), &catalog).unwrap();
        assert_eq!(d1.blocklist.get("youtube"), Some(true));
        assert_eq!(d1.blocklist.len(), 3);
    }

    #[test]
    fn toggle_rejects_unrecognized_category() {
        let catalog = CategoryCatalog::standard();
        let err = DeviceAction::toggle_block("crypto").apply(&device(), &catalog).unwrap_err();
        assert!(matches!(err, CoreError::InvalidCategory { .. }));
    }

    #[test]
    fn parse_accepts_wire_verbs() {
        assert_eq!(DeviceAction::parse("isolate", None).unwrap(), DeviceAction::Isolate);
        assert_eq!(DeviceAction::parse("Release", Some("x")).unwrap(), DeviceAction::Release);
        assert_eq!(
            DeviceAction::parse("toggle_block", Some("ai")).unwrap(),
            DeviceAction::toggle_block("ai")
        );
        assert!(DeviceAction::parse("toggle_block", None).is_err());
        assert!(DeviceAction::parse("reboot", None).is_err());
    }

    #[test]
    fn request_carries_category_only_for_toggle() {
        assert_eq!(DeviceAction::Isolate.to_request().category, None);
        let req = DeviceAction::toggle_block("ai").to_request();
        assert_eq!(req.action, ActionKind::ToggleBlock);
        assert_eq!(req.category.as_deref(), Some("ai"));
        assert_eq!(DeviceAction::toggle_block("ai").to_string(), "toggle_block(ai)");
    }
}
