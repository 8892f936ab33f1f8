// ── Search and filter projection ──
//
// Pure functions over a device snapshot. No I/O and no store access.

use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use crate::model::{Device, RiskLevel};

/// Narrowing predicate selected by a filter key.
///
/// Keys: `all`, `active`, `inactive`, `custom`, `high_risk`; any other
/// key names a device group, matched case-insensitively.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub enum DeviceFilter {
    #[default]
    All,
    Active,
    Inactive,
    /// Devices with a per-device blocklist override.
    CustomBlocklist,
    HighRisk,
    Group(String),
}

impl DeviceFilter {
    pub fn matches(&self, device: &Device) -> bool {
        match self {
            Self::All => true,
            Self::Active => device.is_active,
            Self::Inactive => !device.is_active,
            Self::CustomBlocklist => device.has_custom_blocklist,
            Self::HighRisk => RiskLevel::of(device) == RiskLevel::High,
            Self::Group(name) => device.group.name.eq_ignore_ascii_case(name),
        }
    }

    /// The key this filter parses from.
    pub fn key(&self) -> &str {
        match self {
            Self::All => "all",
            Self::Active => "active",
            Self::Inactive => "inactive",
            Self::CustomBlocklist => "custom",
            Self::HighRisk => "high_risk",
            Self::Group(name) => name.as_str(),
        }
    }
}

impl FromStr for DeviceFilter {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = s.trim();
        Ok(match key.to_ascii_lowercase().as_str() {
            "" | "all" => Self::All,
            "active" => Self::Active,
            "inactive" => Self::Inactive,
            "custom" => Self::CustomBlocklist,
            "high_risk" => Self::HighRisk,
            _ => Self::Group(key.to_owned()),
        })
    }
}

impl fmt::Display for DeviceFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Case-insensitive substring match over given name, hostname, vendor,
/// and IP. An empty (or blank) query matches every device.
pub fn matches_search(device: &Device, query: &str) -> bool {
    let needle = query.trim().to_lowercase();
    needle.is_empty() || contains_needle(device, &needle)
}

fn contains_needle(device: &Device, needle: &str) -> bool {
    [&device.given_name, &device.hostname, &device.vendor, &device.ip]
        .into_iter()
        .flatten()
        .any(|field| field.to_lowercase().contains(needle))
}

/// Devices matching both `query` and `filter`, in input order.
pub fn filter_devices<'a, I>(devices: I, query: &str, filter: &DeviceFilter) -> Vec<Arc<Device>>
where
    I: IntoIterator<Item = &'a Arc<Device>>,
{
    let needle = query.trim().to_lowercase();
    devices
        .into_iter()
        .filter(|d| needle.is_empty() || contains_needle(d, &needle))
        .filter(|d| filter.matches(d))
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::model::{DeviceGroup, DeviceId};

    fn device(id: u64, name: Option<&str>, group: &str, active: bool) -> Arc<Device> {
        let mut d = Device::new(DeviceId(id), active);
        d.given_name = name.map(str::to_owned);
        d.group = DeviceGroup {
            id: 1,
            name: group.into(),
            is_default: false,
        };
        Arc::new(d)
    }

    fn ids(devices: &[Arc<Device>]) -> Vec<u64> {
        devices.iter().map(|d| d.id.get()).collect()
    }

    fn fleet() -> Vec<Arc<Device>> {
        let mut tv = Device::clone(&device(3, Some("Lounge TV"), "IoT", true));
        tv.vendor = Some("Samsung".into());
        tv.ip = Some("192.168.0.42".into());
        tv.has_custom_blocklist = true;

        let mut kid = Device::clone(&device(4, None, "Guests", true));
        kid.hostname = Some("kids-tablet".into());
        for category in ["a", "b", "c", "d", "e", "f", "g", "h", "i"] {
            kid.blocklist.set(category, true);
        }

        vec![
            device(1, Some("Sam's Phone"), "Staff", true),
            device(2, None, "Staff", false),
            Arc::new(tv),
            Arc::new(kid),
        ]
    }

    #[test]
    fn empty_query_and_all_filter_return_everything() {
        let devices = fleet();
        assert_eq!(ids(&filter_devices(&devices, "", &DeviceFilter::All)), [1, 2, 3, 4]);
        assert_eq!(ids(&filter_devices(&devices, "   ", &DeviceFilter::All)), [1, 2, 3, 4]);
    }

    #[test]
    fn search_is_case_insensitive_across_fields() {
        let devices = fleet();
        assert_eq!(ids(&filter_devices(&devices, "PHONE", &DeviceFilter::All)), [1]);
        assert_eq!(ids(&filter_devices(&devices, "samsung", &DeviceFilter::All)), [3]);
        assert_eq!(ids(&filter_devices(&devices, "0.42", &DeviceFilter::All)), [3]);
        assert_eq!(ids(&filter_devices(&devices, "KIDS", &DeviceFilter::All)), [4]);
        assert!(filter_devices(&devices, "printer", &DeviceFilter::All).is_empty());
    }

    #[test]
    fn filter_keys_select_expected_devices() {
        let devices = fleet();
        let run = |key: &str| {
            let filter = key.parse::<DeviceFilter>().unwrap_or_default();
            ids(&filter_devices(&devices, "", &filter))
        };
        assert_eq!(run("active"), [1, 3, 4]);
        assert_eq!(run("inactive"), [2]);
        assert_eq!(run("custom"), [3]);
        assert_eq!(run("high_risk"), [4]);
        assert_eq!(run("staff"), [1, 2]);
        assert_eq!(run("Nonexistent"), Vec::<u64>::new());
    }

    #[test]
    fn empty_query_keeps_devices_without_searchable_fields() {
        let bare = vec![device(9, None, "Staff", true)];
        assert!(bare[0].hostname.is_none() && bare[0].vendor.is_none() && bare[0].ip.is_none());

        assert_eq!(ids(&filter_devices(&bare, "", &DeviceFilter::All)), [9]);
        assert!(filter_devices(&bare, "9", &DeviceFilter::All).is_empty());
    }

    #[test]
    fn keyword_filter_does_not_match_group_of_same_name() {
        let devices = vec![device(1, None, "Active", false), device(2, None, "Staff", true)];
        assert_eq!(ids(&filter_devices(&devices, "", &DeviceFilter::Active)), [2]);
    }

    #[test]
    fn search_and_filter_combine() {
        let devices = fleet();
        let staff: DeviceFilter = "Staff".parse().unwrap_or_default();
        assert_eq!(ids(&filter_devices(&devices, "sam", &staff)), [1]);
        assert_eq!(ids(&filter_devices(&devices, "sam", &DeviceFilter::Inactive)), Vec::<u64>::new());
    }

    #[test]
    fn projection_is_pure() {
        let devices = fleet();
        let before: Vec<Device> = devices.iter().map(|d| (**d).clone()).collect();
        let a = filter_devices(&devices, "s", &DeviceFilter::Active);
        let b = filter_devices(&devices, "s", &DeviceFilter::Active);
        assert_eq!(ids(&a), ids(&b));
        let after: Vec<Device> = devices.iter().map(|d| (**d).clone()).collect();
        assert_eq!(before, after);
    }

    #[test]
    fn keys_round_trip() {
        for key in ["all", "active", "inactive", "custom", "high_risk", "IoT"] {
            let filter: DeviceFilter = key.parse().unwrap_or_default();
            assert_eq!(filter.to_string(), key);
        }
        assert_eq!("".parse::<DeviceFilter>().unwrap_or_default(), DeviceFilter::All);
    }

    #[test]
    fn matches_search_single_device() {
        let devices = fleet();
        assert!(matches_search(&devices[0], "sam's"));
        assert!(!matches_search(&devices[1], "sam"));
        assert!(matches_search(&devices[1], ""));
    }
}
