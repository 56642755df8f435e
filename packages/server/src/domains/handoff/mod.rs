//! Handoff domain - continue a desktop-started verification on a phone
//!
//! The desktop mints a session id and renders a QR code for a mobile URL that
//! carries `userId`, `sessionId` and `cpf`. The phone reads the same query
//! parameters back. Nothing is stored server-side; the URL is the session.

pub mod desktop;
pub mod errors;
pub mod mobile;

pub use desktop::{render_qr_svg, DesktopHandoff, HandoffCode};
pub use errors::HandoffError;
pub use mobile::{parse_mobile_link, InvalidLinkRedirect, MobileEntry, MobileLink};

use url::Url;

/// Where mobile links point
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandoffSettings {
    /// Externally reachable origin, when the deployment knows it
    pub public_base_url: Option<String>,
    /// Path of the mobile capture page
    pub mobile_path: String,
}

impl Default for HandoffSettings {
    fn default() -> Self {
        Self {
            public_base_url: None,
            mobile_path: "/verify/mobile".to_string(),
        }
    }
}

impl HandoffSettings {
    /// Configured base URL, else the origin the request came from.
    pub fn resolve_base(&self, request_origin: Option<&str>) -> Result<Url, HandoffError> {
        let raw = self
            .public_base_url
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .or(request_origin)
            .ok_or(HandoffError::NoBaseUrl)?;

        let base = Url::parse(raw).map_err(|e| HandoffError::InvalidBaseUrl(e.to_string()))?;
        match base.scheme() {
            "http" | "https" => Ok(base),
            other => Err(HandoffError::InvalidBaseUrl(format!(
                "unsupported scheme {}",
                other
            ))),
        }
    }
}

/// Reconstruct the caller's origin from request headers.
///
/// `Origin` wins; otherwise `Host` with `X-Forwarded-Proto` (default https).
pub fn origin_from_headers(
    origin: Option<&str>,
    forwarded_proto: Option<&str>,
    host: Option<&str>,
) -> Option<String> {
    if let Some(origin) = origin.map(str::trim).filter(|o| !o.is_empty() && *o != "null") {
        return Some(origin.to_string());
    }

    let host = host.map(str::trim).filter(|h| !h.is_empty())?;
    let proto = forwarded_proto
        .and_then(|p| p.split(',').next())
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .unwrap_or("https");
    Some(format!("{}://{}", proto, host))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_configured_base_wins() {
        let settings = HandoffSettings {
            public_base_url: Some("https://verify.example.com".into()),
            ..Default::default()
        };
        let base = settings.resolve_base(Some("http://localhost:3000")).unwrap();
        assert_eq!(base.as_str(), "https://verify.example.com/");
    }

    #[test]
    fn test_falls_back_to_request_origin() {
        let settings = HandoffSettings::default();
        let base = settings.resolve_base(Some("http://192.168.0.10:8080")).unwrap();
        assert_eq!(base.host_str(), Some("192.168.0.10"));
        assert!(matches!(settings.resolve_base(None), Err(HandoffError::NoBaseUrl)));
    }

    #[test]
    fn test_rejects_non_http_base() {
        let settings = HandoffSettings {
            public_base_url: Some("ftp://example.com".into()),
            ..Default::default()
        };
        assert!(matches!(
            settings.resolve_base(None),
            Err(HandoffError::InvalidBaseUrl(_))
        ));
    }

    #[test]
    fn test_origin_from_headers() {
        assert_eq!(
            origin_from_headers(Some("https://a.example"), Some("http"), Some("b.example")),
            Some("https://a.example".into())
        );
        assert_eq!(
            origin_from_headers(None, Some("http, https"), Some("b.example:8080")),
            Some("http://b.example:8080".into())
        );
        assert_eq!(
            origin_from_headers(Some("null"), None, Some("b.example")),
            Some("https://b.example".into())
        );
        assert_eq!(origin_from_headers(None, None, None), None);
    }
}
