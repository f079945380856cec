//! Cheap navigator/screen/Intl readouts and user-agent classification.

use crate::env::{EnvironmentProbe, NavigatorInfo, ScreenInfo};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use tracing::debug;

pub const UNKNOWN: &str = "Unknown";

/// Browser family and version parsed from a user agent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrowserInfo {
    pub name: String,
    pub version: String,
}

/// Coarse device class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceType {
    Desktop,
    Mobile,
    Tablet,
    Unknown,
}

/// Everything read synchronously from the host.
#[derive(Debug, Clone, PartialEq)]
pub struct HostReadouts {
    pub navigator: NavigatorInfo,
    pub screen: ScreenInfo,
    pub timezone: String,
    pub browser: BrowserInfo,
    pub operating_system: String,
    pub device_type: DeviceType,
    pub touch_support: bool,
}

/// Read the navigator, screen and timezone, degrading each independently.
pub fn read(env: &dyn EnvironmentProbe) -> HostReadouts {
    let navigator = env.navigator().unwrap_or_else(|e| {
        debug!(error = %e, "navigator readout unavailable");
        NavigatorInfo::default()
    });
    let screen = env.screen().unwrap_or_else(|e| {
        debug!(error = %e, "screen readout unavailable");
        ScreenInfo::default()
    });
    let timezone = match env.timezone() {
        Ok(tz) => normalize_timezone(&tz),
        Err(e) => {
            debug!(error = %e, "timezone readout unavailable");
            "unknown".to_string()
        }
    };

    let device_type = if navigator.user_agent == "unknown" {
        DeviceType::Unknown
    } else {
        classify_device(&navigator.user_agent)
    };

    HostReadouts {
        browser: classify_browser(&navigator.user_agent),
        operating_system: classify_os(&navigator.platform, &navigator.user_agent),
        touch_support: navigator.touch_events || navigator.max_touch_points > 0,
        device_type,
        navigator,
        screen,
        timezone,
    }
}

/// Canonical IANA spelling when the zone is known; the raw value otherwise.
pub fn normalize_timezone(raw: &str) -> String {
    match raw.parse::<Tz>() {
        Ok(tz) => tz.name().to_string(),
        Err(_) => raw.to_string(),
    }
}

/// Browser family by marker precedence: Firefox, Opera, Edge, Chrome, Safari.
pub fn classify_browser(user_agent: &str) -> BrowserInfo {
    let rules: &[(&str, &[&str])] = &[
        ("Firefox", &["Firefox/"]),
        ("Opera", &["Opera/", "OPR/"]),
        ("Edge", &["Edg/"]),
        ("Chrome", &["Chrome/"]),
        ("Safari", &["Version/"]),
    ];

    for (name, markers) in rules {
        let family_present = match *name {
            "Opera" => user_agent.contains("Opera") || user_agent.contains("OPR"),
            "Edge" => user_agent.contains("Edg"),
            "Safari" => user_agent.contains("Safari"),
            other => user_agent.contains(other),
        };
        if !family_present {
            continue;
        }
        let version = markers
            .iter()
            .find_map(|marker| version_after(user_agent, marker))
            .unwrap_or_else(|| UNKNOWN.to_string());
        return BrowserInfo {
            name: name.to_string(),
            version,
        };
    }

    BrowserInfo {
        name: UNKNOWN.to_string(),
        version: UNKNOWN.to_string(),
    }
}

/// `major.minor` following `marker`, if present.
fn version_after(user_agent: &str, marker: &str) -> Option<String> {
    let start = user_agent.find(marker)? + marker.len();
    let rest = &user_agent[start..];
    let mut parts = rest.split(|c: char| !c.is_ascii_digit());
    let major = parts.next().filter(|p| !p.is_empty())?;
    if !rest[major.len()..].starts_with('.') {
        return None;
    }
    let minor = parts.next().filter(|p| !p.is_empty())?;
    Some(format!("{major}.{minor}"))
}

/// Operating system from the platform string, then the user agent.
pub fn classify_os(platform: &str, user_agent: &str) -> String {
    let os = if platform.contains("Win") {
        "Windows"
    } else if platform.contains("Mac") {
        "macOS"
    } else if platform.contains("Linux") {
        "Linux"
    } else if platform.contains("iPhone") || platform.contains("iPad") {
        "iOS"
    } else if user_agent.contains("Android") {
        "Android"
    } else {
        UNKNOWN
    };
    os.to_string()
}

/// Tablet, mobile or desktop from user-agent markers.
pub fn classify_device(user_agent: &str) -> DeviceType {
    let lower = user_agent.to_lowercase();
    let android_tablet = lower.contains("android") && !lower.contains("mobi");
    if ["tablet", "ipad", "playbook", "silk"]
        .iter()
        .any(|m| lower.contains(m))
        || android_tablet
    {
        return DeviceType::Tablet;
    }

    let mobile_markers = [
        "Mobile",
        "Android",
        "iPhone",
        "iPod",
        "IEMobile",
        "BlackBerry",
        "Kindle",
        "Silk-Accelerated",
        "hpwOS",
        "webOS",
        "Opera Mobi",
        "Opera Mini",
    ];
    if mobile_markers.iter().any(|m| user_agent.contains(m)) {
        return DeviceType::Mobile;
    }

    DeviceType::Desktop
}
