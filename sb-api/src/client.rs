//! HTTP client for the support backend REST API.
//!
//! All calls go through [`ApiClient::execute`], which attaches the bearer
//! token and configured headers, retries gateway failures with exponential
//! backoff, and turns FastAPI error bodies into [`SbError`] values.

use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, warn};

use sb_core::config::{AppConfig, ServerConfig};
use sb_core::constants;
use sb_core::error::{SbError, SbResult};

use crate::response::ApiErrorBody;

/// Backoff settings for idempotent-enough requests.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Retries after the first attempt.
    pub max_retries: u32,
    /// Delay before the first retry; doubles after each one.
    pub base_delay: Duration,
    /// Upper bound for any single delay.
    pub max_delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(4),
        }
    }
}

impl RetryConfig {
    /// Single attempt, no backoff.
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }

    /// Gateway errors are the only statuses worth repeating.
    fn retries_status(&self, status: StatusCode) -> bool {
        matches!(status.as_u16(), 502..=504)
    }

    /// Delay before retry number `retry` (0-based).
    fn delay_for(&self, retry: u32) -> Duration {
        let factor = 1u32.checked_shl(retry).unwrap_or(u32::MAX);
        self.base_delay
            .checked_mul(factor)
            .unwrap_or(self.max_delay)
            .min(self.max_delay)
    }
}

/// Body of an outgoing request.
#[derive(Debug, Clone, Copy)]
enum Payload<'a> {
    Empty,
    Json(&'a Value),
    Form(&'a [(&'a str, &'a str)]),
}

/// Typed client for the support backend.
///
/// Cheap to clone; clones share the connection pool.
#[derive(Clone)]
pub struct ApiClient {
    http: Client,
    /// `{origin}/api/v1`, no trailing slash.
    api_root: String,
    origin: String,
    token: Option<String>,
    headers: HeaderMap,
    retry: RetryConfig,
}

impl ApiClient {
    /// Build a client for the configured backend address.
    pub fn new(config: &ServerConfig) -> SbResult<Self> {
        let address = AppConfig::sanitize_server_address(&config.address);
        if address.is_empty() {
            return Err(SbError::MissingConfig("server address".into()));
        }
        let origin = origin_of(&address)?;

        let http = Client::builder()
            .timeout(Duration::from_millis(config.api_timeout_ms))
            .connect_timeout(Duration::from_secs(15))
            .pool_idle_timeout(Duration::from_secs(90))
            .danger_accept_invalid_certs(config.accept_invalid_certs)
            .build()
            .map_err(|e| SbError::Http(format!("failed to build HTTP client: {e}")))?;

        let mut headers = HeaderMap::new();
        for (name, value) in &config.custom_headers {
            match (
                HeaderName::from_bytes(name.as_bytes()),
                HeaderValue::from_str(value),
            ) {
                (Ok(name), Ok(value)) => {
                    headers.insert(name, value);
                }
                _ => warn!("ignoring invalid custom header {name:?}"),
            }
        }

        Ok(Self {
            http,
            api_root: format!("{origin}/api/{}", constants::API_VERSION),
            origin,
            token: None,
            headers,
            retry: RetryConfig::default(),
        })
    }

    /// Build a client and pick up the stored agent token, if any.
    pub fn from_config(config: &AppConfig) -> SbResult<Self> {
        let mut client = Self::new(&config.server)?;
        client.set_token(Some(config.auth.token.clone()));
        Ok(client)
    }

    pub fn with_retry_config(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Attach a bearer token to every request.
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.set_token(Some(token.into()));
        self
    }

    /// Replace or clear the bearer token. Empty tokens count as none.
    pub fn set_token(&mut self, token: Option<String>) {
        self.token = token.filter(|t| !t.trim().is_empty());
    }

    pub fn has_token(&self) -> bool {
        self.token.is_some()
    }

    pub fn api_root(&self) -> &str {
        &self.api_root
    }

    pub fn origin(&self) -> &str {
        &self.origin
    }

    fn request(&self, method: Method, path: &str, payload: Payload<'_>) -> RequestBuilder {
        let mut builder = self
            .http
            .request(method, format!("{}{path}", self.api_root))
            .headers(self.headers.clone());
        if let Some(token) = &self.token {
            builder = builder.bearer_auth(token);
        }
        match payload {
            Payload::Empty => builder,
            Payload::Json(body) => builder.json(body),
            Payload::Form(fields) => builder.form(fields),
        }
    }

    /// Send a request, retrying gateway errors and connect/timeout failures
    /// when `retry` is set, and map the final outcome.
    async fn execute(
        &self,
        method: Method,
        path: &str,
        payload: Payload<'_>,
        retry: bool,
    ) -> SbResult<Response> {
        let max_retries = if retry { self.retry.max_retries } else { 0 };
        let mut retries = 0;

        loop {
            debug!("{method} {path}");
            let outcome = self.request(method.clone(), path, payload).send().await;

            let retry_reason = match &outcome {
                Ok(resp) if self.retry.retries_status(resp.status()) => {
                    Some(format!("status {}", resp.status().as_u16()))
                }
                Err(e) if e.is_timeout() || e.is_connect() => Some(e.to_string()),
                _ => None,
            };

            match retry_reason {
                Some(reason) if retries < max_retries => {
                    let delay = self.retry.delay_for(retries);
                    retries += 1;
                    warn!(
                        "{method} {path} failed ({reason}), retry {retries}/{max_retries} in {}ms",
                        delay.as_millis()
                    );
                    tokio::time::sleep(delay).await;
                }
                _ => {
                    return match outcome {
                        Ok(resp) => ensure_success(resp).await,
                        Err(e) => Err(transport_error(e)),
                    };
                }
            }
        }
    }

    pub async fn get(&self, path: &str) -> SbResult<Response> {
        self.execute(Method::GET, path, Payload::Empty, true).await
    }

    pub async fn post(&self, path: &str, body: &Value) -> SbResult<Response> {
        self.execute(Method::POST, path, Payload::Json(body), true)
            .await
    }

    pub async fn put(&self, path: &str, body: &Value) -> SbResult<Response> {
        self.execute(Method::PUT, path, Payload::Json(body), true)
            .await
    }

    pub async fn patch(&self, path: &str, body: &Value) -> SbResult<Response> {
        self.execute(Method::PATCH, path, Payload::Json(body), true)
            .await
    }

    pub async fn delete(&self, path: &str) -> SbResult<Response> {
        self.execute(Method::DELETE, path, Payload::Empty, true)
            .await
    }

    /// Form-encoded POST, sent once. Used for credentials.
    pub async fn post_form(&self, path: &str, fields: &[(&str, &str)]) -> SbResult<Response> {
        self.execute(Method::POST, path, Payload::Form(fields), false)
            .await
    }

    /// Decode a successful response body.
    pub async fn read_json<T: DeserializeOwned>(response: Response) -> SbResult<T> {
        let url = response.url().path().to_string();
        response
            .json::<T>()
            .await
            .map_err(|e| SbError::Serialization(format!("unexpected response from {url}: {e}")))
    }

    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> SbResult<T> {
        Self::read_json(self.get(path).await?).await
    }

    pub async fn post_json<T: DeserializeOwned>(&self, path: &str, body: &Value) -> SbResult<T> {
        Self::read_json(self.post(path, body).await?).await
    }

    pub async fn patch_json<T: DeserializeOwned>(&self, path: &str, body: &Value) -> SbResult<T> {
        Self::read_json(self.patch(path, body).await?).await
    }
}

async fn ensure_success(response: Response) -> SbResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(status_error(status, &body))
}

/// Map a non-success status and its body to an error.
fn status_error(status: StatusCode, body: &str) -> SbError {
    let mut message = ApiErrorBody::message_from(body);
    if message.is_empty() {
        message = status.to_string();
    }

    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => SbError::AuthFailed(message),
        StatusCode::NOT_FOUND => SbError::NotFound(message),
        _ => SbError::ServerError {
            status: status.as_u16(),
            message,
        },
    }
}

fn transport_error(e: reqwest::Error) -> SbError {
    if e.is_timeout() {
        SbError::Timeout(e.to_string())
    } else if e.is_connect() {
        SbError::Http(format!("connection failed: {e}"))
    } else {
        SbError::Http(e.to_string())
    }
}

/// Scheme, host and port of an address, dropping any path.
fn origin_of(address: &str) -> SbResult<String> {
    let url = Url::parse(address).map_err(|e| SbError::InvalidUrl(format!("{address}: {e}")))?;
    if url.host_str().is_none() {
        return Err(SbError::InvalidUrl(format!("{address}: missing host")));
    }
    Ok(url.origin().ascii_serialization())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn local() -> ServerConfig {
        ServerConfig {
            address: "http://localhost:8000".into(),
            ..ServerConfig::default()
        }
    }

    #[test]
    fn test_origin_drops_path() {
        assert_eq!(
            origin_of("https://support.bank.test/api/v1").unwrap(),
            "https://support.bank.test"
        );
        assert_eq!(
            origin_of("http://192.168.1.100:8000").unwrap(),
            "http://192.168.1.100:8000"
        );
        assert!(origin_of("not a url").is_err());
    }

    #[test]
    fn test_api_root() {
        let client = ApiClient::new(&local()).unwrap();
        assert_eq!(client.api_root(), "http://localhost:8000/api/v1");
        assert_eq!(client.origin(), "http://localhost:8000");
    }

    #[test]
    fn test_empty_address_rejected() {
        let config = ServerConfig {
            address: "  ".into(),
            ..ServerConfig::default()
        };
        assert!(matches!(
            ApiClient::new(&config),
            Err(SbError::MissingConfig(_))
        ));
    }

    #[test]
    fn test_backoff_doubles_and_caps() {
        let retry = RetryConfig::default();
        assert_eq!(retry.delay_for(0), Duration::from_secs(1));
        assert_eq!(retry.delay_for(1), Duration::from_secs(2));
        assert_eq!(retry.delay_for(2), Duration::from_secs(4));
        assert_eq!(retry.delay_for(40), Duration::from_secs(4));
        assert!(retry.retries_status(StatusCode::SERVICE_UNAVAILABLE));
        assert!(!retry.retries_status(StatusCode::INTERNAL_SERVER_ERROR));
    }

    #[test]
    fn test_bearer_and_custom_headers() {
        let mut config = local();
        config
            .custom_headers
            .insert("X-Branch".into(), "north".into());
        config
            .custom_headers
            .insert("bad header".into(), "x".into());
        let client = ApiClient::new(&config).unwrap().with_token("tok-1");

        let request = client
            .request(Method::GET, "/tickets", Payload::Empty)
            .build()
            .unwrap();
        assert_eq!(request.url().as_str(), "http://localhost:8000/api/v1/tickets");
        assert_eq!(request.headers()["authorization"], "Bearer tok-1");
        assert_eq!(request.headers()["x-branch"], "north");
    }

    #[test]
    fn test_json_body_without_token() {
        let mut client = ApiClient::new(&local()).unwrap().with_token("tok-1");
        client.set_token(Some("  ".into()));
        assert!(!client.has_token());

        let body = json!({"user_id": "u"});
        let request = client
            .request(Method::POST, "/chat/start", Payload::Json(&body))
            .build()
            .unwrap();
        assert!(request.headers().get("authorization").is_none());
        assert_eq!(request.headers()["content-type"], "application/json");
        let bytes = request.body().and_then(|b| b.as_bytes()).unwrap();
        assert_eq!(bytes, br#"{"user_id":"u"}"#);
    }

    #[test]
    fn test_form_body() {
        let client = ApiClient::new(&local()).unwrap();
        let fields = [("username", "ana@banco.com"), ("password", "a b")];
        let request = client
            .request(Method::POST, "/auth/login", Payload::Form(&fields))
            .build()
            .unwrap();
        let bytes = request.body().and_then(|b| b.as_bytes()).unwrap();
        assert_eq!(bytes, b"username=ana%40banco.com&password=a+b");
    }

    #[test]
    fn test_from_config_picks_up_token() {
        let mut config = AppConfig::default();
        assert!(!ApiClient::from_config(&config).unwrap().has_token());
        config.auth.token = "abc".into();
        assert!(ApiClient::from_config(&config).unwrap().has_token());
    }

    #[test]
    fn test_status_mapping() {
        assert!(matches!(
            status_error(StatusCode::UNAUTHORIZED, r#"{"detail":"Credenciales incorrectas"}"#),
            SbError::AuthFailed(m) if m == "Credenciales incorrectas"
        ));
        assert!(matches!(
            status_error(StatusCode::FORBIDDEN, ""),
            SbError::AuthFailed(_)
        ));
        assert!(matches!(
            status_error(StatusCode::NOT_FOUND, r#"{"detail":"Conversation not found"}"#),
            SbError::NotFound(m) if m == "Conversation not found"
        ));
        assert!(matches!(
            status_error(StatusCode::UNPROCESSABLE_ENTITY, r#"{"detail":[{"msg":"field required"}]}"#),
            SbError::ServerError { status: 422, message } if message == "field required"
        ));
        assert!(matches!(
            status_error(StatusCode::INTERNAL_SERVER_ERROR, ""),
            SbError::ServerError { status: 500, message } if message.contains("500")
        ));
    }
}
