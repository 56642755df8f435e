//! Desktop side of the handoff: mint a session and render its QR code

use qrcode::render::svg;
use qrcode::QrCode;
use serde::Serialize;
use tracing::debug;
use url::Url;

use super::errors::HandoffError;
use crate::common::{Cpf, SessionId};

/// Smallest rendered QR edge in pixels
const QR_MIN_DIMENSION: u32 = 240;

/// A session the desktop has started and can render for a phone to scan
#[derive(Debug, Clone)]
pub struct DesktopHandoff {
    pub session_id: SessionId,
    pub user_id: String,
    pub cpf: Cpf,
    mobile_url: Url,
}

/// What the desktop page shows
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HandoffCode {
    pub session_id: SessionId,
    pub url: String,
    pub qr_svg: String,
}

impl DesktopHandoff {
    /// Start a new session. The CPF must pass its checksum before a link exists.
    pub fn start(
        user_id: &str,
        cpf: &str,
        base: &Url,
        mobile_path: &str,
    ) -> Result<Self, HandoffError> {
        Self::resume(SessionId::new(), user_id, cpf, base, mobile_path)
    }

    /// Rebuild the handoff for a session the desktop already minted.
    pub fn resume(
        session_id: SessionId,
        user_id: &str,
        cpf: &str,
        base: &Url,
        mobile_path: &str,
    ) -> Result<Self, HandoffError> {
        let user_id = user_id.trim();
        if user_id.is_empty() {
            return Err(HandoffError::MissingUserId);
        }
        let cpf = Cpf::parse(cpf)?;
        let mobile_url = build_mobile_url(base, mobile_path, user_id, session_id, &cpf);

        debug!(user_id, session_id = %session_id, "Handoff session prepared");

        Ok(Self {
            session_id,
            user_id: user_id.to_string(),
            cpf,
            mobile_url,
        })
    }

    pub fn mobile_url(&self) -> &Url {
        &self.mobile_url
    }

    /// Render a fresh QR code for the same session parameters.
    pub fn regenerate(&self) -> Result<HandoffCode, HandoffError> {
        Ok(HandoffCode {
            session_id: self.session_id,
            url: self.mobile_url.to_string(),
            qr_svg: render_qr_svg(self.mobile_url.as_str())?,
        })
    }
}

fn build_mobile_url(
    base: &Url,
    mobile_path: &str,
    user_id: &str,
    session_id: SessionId,
    cpf: &Cpf,
) -> Url {
    let mut url = base.clone();
    let path = format!(
        "{}/{}",
        base.path().trim_end_matches('/'),
        mobile_path.trim_start_matches('/')
    );
    url.set_path(&path);
    url.set_fragment(None);
    url.set_query(Some(&link_query(user_id, session_id, Some(cpf))));
    url
}

/// Query string the mobile capture page reads back with `parse_mobile_link`.
pub(crate) fn link_query(user_id: &str, session_id: SessionId, cpf: Option<&Cpf>) -> String {
    let mut query = url::form_urlencoded::Serializer::new(String::new());
    query
        .append_pair("userId", user_id)
        .append_pair("sessionId", &session_id.to_string());
    if let Some(cpf) = cpf {
        query.append_pair("cpf", cpf.digits());
    }
    query.finish()
}

/// Encode `data` as an SVG QR code.
pub fn render_qr_svg(data: &str) -> Result<String, HandoffError> {
    let code = QrCode::new(data.as_bytes()).map_err(|e| HandoffError::QrEncoding(e.to_string()))?;
    Ok(code
        .render::<svg::Color>()
        .min_dimensions(QR_MIN_DIMENSION, QR_MIN_DIMENSION)
        .dark_color(svg::Color("#000000"))
        .light_color(svg::Color("#ffffff"))
        .build())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domains::handoff::parse_mobile_link;

    fn base() -> Url {
        Url::parse("https://app.example.com").unwrap()
    }

    #[test]
    fn test_start_builds_mobile_url() {
        let handoff =
            DesktopHandoff::start("user-1", "529.982.247-25", &base(), "/verify/mobile").unwrap();
        let url = handoff.mobile_url();

        assert_eq!(url.path(), "/verify/mobile");
        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert_eq!(
            pairs,
            vec![
                ("userId".to_string(), "user-1".to_string()),
                ("sessionId".to_string(), handoff.session_id.to_string()),
                ("cpf".to_string(), "52998224725".to_string()),
            ]
        );
    }

    #[test]
    fn test_base_with_path_prefix_is_kept() {
        let base = Url::parse("https://example.com/app/").unwrap();
        let handoff = DesktopHandoff::start("u", "52998224725", &base, "verify/mobile").unwrap();
        assert_eq!(handoff.mobile_url().path(), "/app/verify/mobile");
    }

    #[test]
    fn test_user_id_is_escaped() {
        let handoff = DesktopHandoff::start("a&b=c", "52998224725", &base(), "/m").unwrap();
        assert!(handoff.mobile_url().as_str().contains("userId=a%26b%3Dc"));
        let link = parse_mobile_link(handoff.mobile_url().query().unwrap()).unwrap();
        assert_eq!(link.user_id, "a&b=c");
    }

    #[test]
    fn test_invalid_cpf_produces_no_link() {
        assert!(matches!(
            DesktopHandoff::start("user-1", "11111111111", &base(), "/m"),
            Err(HandoffError::InvalidCpf(_))
        ));
        assert!(matches!(
            DesktopHandoff::start("", "52998224725", &base(), "/m"),
            Err(HandoffError::MissingUserId)
        ));
    }

    #[test]
    fn test_sessions_are_unique_and_resume_keeps_id() {
        let a = DesktopHandoff::start("u", "52998224725", &base(), "/m").unwrap();
        let b = DesktopHandoff::start("u", "52998224725", &base(), "/m").unwrap();
        assert_ne!(a.session_id, b.session_id);

        let again = DesktopHandoff::resume(a.session_id, "u", "52998224725", &base(), "/m").unwrap();
        assert_eq!(again.mobile_url(), a.mobile_url());
    }

    #[test]
    fn test_regenerate_renders_svg_for_same_url() {
        let handoff = DesktopHandoff::start("u", "52998224725", &base(), "/m").unwrap();
        let first = handoff.regenerate().unwrap();
        let second = handoff.regenerate().unwrap();

        assert_eq!(first.url, second.url);
        assert_eq!(first.session_id, handoff.session_id);
        assert!(first.qr_svg.contains("<svg"));
    }
}
