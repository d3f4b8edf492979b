//! Realtime endpoint URL construction.

use url::Url;

use sb_core::config::AppConfig;
use sb_core::error::{SbError, SbResult};

/// Which client the session belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Variant {
    /// Agent dashboard: token in the query string, keep-alive pings.
    Admin,
    /// Customer chat widget: conversation id in the path.
    Widget,
}

impl Variant {
    pub fn name(&self) -> &'static str {
        match self {
            Variant::Admin => "admin",
            Variant::Widget => "widget",
        }
    }
}

/// Where a realtime session connects to.
#[derive(Debug, Clone)]
pub struct Endpoint {
    variant: Variant,
    origin: String,
    path: String,
}

impl Endpoint {
    /// Build an endpoint from a backend address.
    ///
    /// `ws_override` wins over the address when non-empty. Otherwise the
    /// scheme is derived: `https` becomes `wss`, anything else `ws`.
    pub fn new(variant: Variant, server_address: &str, ws_override: Option<&str>) -> Self {
        let origin = match ws_override.map(str::trim).filter(|s| !s.is_empty()) {
            Some(ws) => ws.trim_end_matches('/').to_string(),
            None => ws_origin(server_address),
        };
        let path = match variant {
            Variant::Admin => sb_core::constants::ADMIN_WS_PATH,
            Variant::Widget => sb_core::constants::WIDGET_WS_PATH,
        };
        Self {
            variant,
            origin,
            path: path.to_string(),
        }
    }

    /// Build an endpoint from the application configuration.
    pub fn from_config(variant: Variant, config: &AppConfig) -> Self {
        let endpoint = Self::new(
            variant,
            &config.server.address,
            Some(config.realtime.ws_url.as_str()),
        );
        let path = match variant {
            Variant::Admin => &config.realtime.admin_path,
            Variant::Widget => &config.realtime.widget_path,
        };
        endpoint.with_path(path)
    }

    /// Replace the endpoint path.
    pub fn with_path(mut self, path: &str) -> Self {
        if !path.trim().is_empty() {
            self.path = format!("/{}", path.trim().trim_matches('/'));
        }
        self
    }

    pub fn variant(&self) -> Variant {
        self.variant
    }

    /// Origin without path, e.g. `wss://support.example-bank.com`.
    pub fn origin(&self) -> &str {
        &self.origin
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Full socket URL for a session identity (token or conversation id).
    pub fn url_for(&self, identity: &str) -> SbResult<Url> {
        if identity.is_empty() {
            return Err(SbError::MissingConfig(match self.variant {
                Variant::Admin => "auth token".into(),
                Variant::Widget => "conversation id".into(),
            }));
        }

        let mut url = Url::parse(&self.origin)
            .map_err(|e| SbError::InvalidUrl(format!("{}: {e}", self.origin)))?;
        if url.cannot_be_a_base() {
            return Err(SbError::InvalidUrl(self.origin.clone()));
        }
        url.set_path(&self.path);

        match self.variant {
            Variant::Admin => {
                url.query_pairs_mut().append_pair("token", identity);
            }
            Variant::Widget => {
                url.path_segments_mut()
                    .map_err(|_| SbError::InvalidUrl(self.origin.clone()))?
                    .pop_if_empty()
                    .push(identity);
            }
        }
        Ok(url)
    }
}

/// Map an http(s) backend address to the matching ws(s) origin.
fn ws_origin(address: &str) -> String {
    let address = AppConfig::sanitize_server_address(address);
    if let Some(rest) = address.strip_prefix("https://") {
        format!("wss://{rest}")
    } else if let Some(rest) = address.strip_prefix("http://") {
        format!("ws://{rest}")
    } else {
        address
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_admin_url_over_https() {
        let endpoint = Endpoint::new(Variant::Admin, "https://support.bank.test", None);
        let url = endpoint.url_for("abc123").unwrap();
        assert_eq!(
            url.as_str(),
            "wss://support.bank.test/api/v1/conversations/ws/admin?token=abc123"
        );
    }

    #[test]
    fn test_widget_url_over_http() {
        let endpoint = Endpoint::new(Variant::Widget, "http://localhost:8000/", None);
        assert_eq!(endpoint.origin(), "ws://localhost:8000");
        let url = endpoint.url_for("conv-42").unwrap();
        assert_eq!(url.as_str(), "ws://localhost:8000/ws/chat/conv-42");
    }

    #[test]
    fn test_override_wins() {
        let endpoint = Endpoint::new(
            Variant::Widget,
            "https://api.bank.test",
            Some("ws://127.0.0.1:9000/"),
        );
        let url = endpoint.url_for("c1").unwrap();
        assert_eq!(url.as_str(), "ws://127.0.0.1:9000/ws/chat/c1");
    }

    #[test]
    fn test_identity_is_encoded() {
        let endpoint = Endpoint::new(Variant::Admin, "http://localhost:8000", None);
        let url = endpoint.url_for("a b&c").unwrap();
        assert_eq!(url.query(), Some("token=a+b%26c"));

        let widget = Endpoint::new(Variant::Widget, "http://localhost:8000", None);
        let url = widget.url_for("x/y").unwrap();
        assert_eq!(url.path(), "/ws/chat/x%2Fy");
    }

    #[test]
    fn test_from_config_custom_path() {
        let mut config = AppConfig::default();
        config.server.address = "https://bank.test".into();
        config.realtime.widget_path = "realtime/chat/".into();
        let endpoint = Endpoint::from_config(Variant::Widget, &config);
        let url = endpoint.url_for("c9").unwrap();
        assert_eq!(url.as_str(), "wss://bank.test/realtime/chat/c9");
    }

    #[test]
    fn test_missing_identity_and_bad_origin() {
        let endpoint = Endpoint::new(Variant::Admin, "http://localhost:8000", None);
        assert!(matches!(endpoint.url_for(""), Err(SbError::MissingConfig(_))));

        let broken = Endpoint::new(Variant::Widget, "http://localhost:8000", Some("not a url"));
        assert!(matches!(broken.url_for("c1"), Err(SbError::InvalidUrl(_))));
    }
}
