//! Device domain - decides where a verification flow starts
//!
//! Desktop visitors are handed off to their phone via a QR code; mobile
//! visitors capture documents directly. Classification happens once, at
//! flow entry.

use serde::{Deserialize, Serialize};

/// Platform tokens that identify a touch-first handset or tablet
const MOBILE_TOKENS: &[&str] = &[
    "android",
    "iphone",
    "ipad",
    "ipod",
    "mobile",
    "webos",
    "blackberry",
    "iemobile",
    "opera mini",
];

/// Widest viewport still treated as a handset when the user agent says nothing
pub const TOUCH_VIEWPORT_MAX: u32 = 768;

/// What the client can do, as far as the server can tell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientCapabilities {
    pub is_touch_primary: bool,
    pub has_camera: bool,
    pub viewport_width: Option<u32>,
}

impl ClientCapabilities {
    /// Infer capabilities from a User-Agent header and an optional viewport width.
    ///
    /// Every recognised handset is assumed to carry a camera.
    pub fn from_user_agent(user_agent: &str, viewport_width: Option<u32>) -> Self {
        let ua = user_agent.to_ascii_lowercase();
        let mobile_platform = MOBILE_TOKENS.iter().any(|token| ua.contains(token));
        let narrow = viewport_width.is_some_and(|w| w > 0 && w <= TOUCH_VIEWPORT_MAX);
        let is_touch_primary = mobile_platform || narrow;

        Self {
            is_touch_primary,
            has_camera: is_touch_primary,
            viewport_width,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceClass {
    Mobile,
    Desktop,
}

/// First screen of the verification flow
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlowEntry {
    /// CPF entry, then a QR code pointing the phone at the mobile flow
    DesktopHandoff,
    /// Capture flow starting at the CPF step
    MobileCapture,
}

impl FlowEntry {
    /// Client route for this entry point, without query. The mobile route
    /// only opens with a session attached (`handoff::MobileEntry`).
    pub fn path(&self, mobile_path: &str) -> String {
        match self {
            FlowEntry::DesktopHandoff => "/verify".to_string(),
            FlowEntry::MobileCapture => mobile_path.to_string(),
        }
    }
}

pub struct DeviceRouter;

impl DeviceRouter {
    pub fn classify(caps: &ClientCapabilities) -> DeviceClass {
        if caps.is_touch_primary && caps.has_camera {
            DeviceClass::Mobile
        } else {
            DeviceClass::Desktop
        }
    }

    pub fn entry(class: DeviceClass) -> FlowEntry {
        match class {
            DeviceClass::Desktop => FlowEntry::DesktopHandoff,
            DeviceClass::Mobile => FlowEntry::MobileCapture,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const IPHONE: &str = "Mozilla/5.0 (iPhone; CPU iPhone OS 17_4 like Mac OS X) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.4 Mobile/15E148 Safari/604.1";
    const ANDROID: &str = "Mozilla/5.0 (Linux; Android 14; Pixel 8) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0 Mobile Safari/537.36";
    const MAC: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 14_4) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.4 Safari/605.1.15";
    const WINDOWS: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0 Safari/537.36";

    fn route(ua: &str, viewport: Option<u32>) -> FlowEntry {
        DeviceRouter::entry(DeviceRouter::classify(&ClientCapabilities::from_user_agent(ua, viewport)))
    }

    #[test]
    fn test_handsets_go_to_mobile_capture() {
        assert_eq!(route(IPHONE, None), FlowEntry::MobileCapture);
        assert_eq!(route(ANDROID, Some(412)), FlowEntry::MobileCapture);
        assert_eq!(route("Opera/9.80 (J2ME/MIDP; Opera Mini/9.80)", None), FlowEntry::MobileCapture);
    }

    #[test]
    fn test_desktops_go_to_handoff() {
        assert_eq!(route(MAC, None), FlowEntry::DesktopHandoff);
        assert_eq!(route(WINDOWS, Some(1920)), FlowEntry::DesktopHandoff);
        assert_eq!(route("", None), FlowEntry::DesktopHandoff);
    }

    #[test]
    fn test_narrow_viewport_counts_as_touch() {
        assert_eq!(route(WINDOWS, Some(768)), FlowEntry::MobileCapture);
        assert_eq!(route(WINDOWS, Some(769)), FlowEntry::DesktopHandoff);
        assert_eq!(route(WINDOWS, Some(0)), FlowEntry::DesktopHandoff);
    }

    #[test]
    fn test_touch_without_camera_is_desktop() {
        let caps = ClientCapabilities {
            is_touch_primary: true,
            has_camera: false,
            viewport_width: Some(400),
        };
        assert_eq!(DeviceRouter::classify(&caps), DeviceClass::Desktop);
    }

    #[test]
    fn test_entry_paths() {
        assert_eq!(FlowEntry::DesktopHandoff.path("/verify/mobile"), "/verify");
        assert_eq!(FlowEntry::MobileCapture.path("/verify/mobile"), "/verify/mobile");
    }
}
