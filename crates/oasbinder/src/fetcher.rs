//! Spec retrieval from configured microservices
//!
//! One GET per call with no retries, no caching and no client-side timeout.
//! The raw body is always kept when the backend answers 200; title and
//! summary are extracted on a best-effort basis for the service picker.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, StatusCode};
use serde_json::Value;
use shared::{GatewayConfig, HeaderSet, MicroserviceConfig};
use thiserror::Error;

/// Errors produced while retrieving a microservice spec
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    /// Base URL lacks the trailing '/' needed to append the spec path
    #[error("Microservice URL doesn't have a trailing '/'.")]
    MalformedUrl { url: String },

    /// DNS, connection or I/O failure talking to the backend
    #[error("failed to reach microservice: {0}")]
    Transport(String),

    /// Backend answered with something other than 200
    #[error("failed to retrieve OpenAPI spec: received status code {status}")]
    FetchFailed { status: u16 },

    /// Body is not well-formed JSON
    #[error("invalid OpenAPI document: {0}")]
    Parse(String),
}

impl FetchError {
    /// Whether the spec body is unusable. A parse failure only degrades the
    /// picker label; the raw body is still served.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, FetchError::Parse(_))
    }

    fn transport(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            FetchError::Transport("request timed out".to_string())
        } else if err.is_connect() {
            FetchError::Transport(format!("connection failed: {}", err))
        } else {
            FetchError::Transport(err.to_string())
        }
    }
}

/// Outcome of fetching one microservice spec, scoped to a single request
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SpecResult {
    /// Raw specification bytes (empty when the fetch failed)
    pub body: Vec<u8>,
    /// `info.title`, or empty
    pub title: String,
    /// `info.summary`, or empty
    pub summary: String,
    pub error: Option<FetchError>,
}

impl SpecResult {
    /// Build a result from a 200 response body
    pub fn from_body(body: Vec<u8>) -> Self {
        match serde_json::from_slice::<Value>(&body) {
            Ok(document) => Self {
                title: info_field(&document, "title"),
                summary: info_field(&document, "summary"),
                body,
                error: None,
            },
            Err(e) => Self {
                body,
                error: Some(FetchError::Parse(e.to_string())),
                ..Default::default()
            },
        }
    }

    pub fn failed(error: FetchError) -> Self {
        Self {
            error: Some(error),
            ..Default::default()
        }
    }

    /// True when the body can be handed to the viewer
    pub fn is_usable(&self) -> bool {
        self.error.as_ref().map_or(true, |e| !e.is_fatal())
    }

    /// The body as text for embedding
    pub fn spec_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

fn info_field(document: &Value, field: &str) -> String {
    document
        .get("info")
        .and_then(|info| info.get(field))
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

/// Build the spec URL for a microservice
///
/// The base URL must end with '/'. A leading '/' on the suffix is dropped so
/// the two never produce a double slash.
pub fn spec_url(base_url: &str, api_specs_path: &str) -> Result<String, FetchError> {
    if !base_url.ends_with('/') {
        return Err(FetchError::MalformedUrl {
            url: base_url.to_string(),
        });
    }
    Ok(format!(
        "{}{}",
        base_url,
        api_specs_path.strip_prefix('/').unwrap_or(api_specs_path)
    ))
}

/// Source of microservice specs
#[async_trait]
pub trait SpecFetcher: Send + Sync {
    /// Fetch one microservice's spec. Never fails outright: errors are
    /// carried inside the result so aggregation can continue.
    async fn fetch(&self, service: &MicroserviceConfig) -> SpecResult;
}

/// Reqwest-based spec fetcher
#[derive(Clone)]
pub struct ReqwestSpecFetcher {
    client: Client,
    headers: HeaderMap,
    api_specs_path: String,
}

impl ReqwestSpecFetcher {
    /// Create a fetcher for the given snapshot
    ///
    /// Fails when a configured header name or value is not valid HTTP.
    pub fn new(config: &GatewayConfig) -> shared::Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("oasbinder/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| shared::Error::internal(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            headers: header_map(&config.headers)?,
            api_specs_path: config.api_specs_path.clone(),
        })
    }

    async fn fetch_body(&self, service: &MicroserviceConfig) -> Result<Vec<u8>, FetchError> {
        let url = spec_url(&service.url, &self.api_specs_path)?;
        tracing::debug!(endpoint = %service.endpoint, url = %url, "Requesting OpenAPI spec");

        let response = self
            .client
            .get(&url)
            .headers(self.headers.clone())
            .send()
            .await
            .map_err(FetchError::transport)?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(FetchError::FetchFailed {
                status: status.as_u16(),
            });
        }

        let body = response.bytes().await.map_err(FetchError::transport)?;
        Ok(body.to_vec())
    }
}

#[async_trait]
impl SpecFetcher for ReqwestSpecFetcher {
    async fn fetch(&self, service: &MicroserviceConfig) -> SpecResult {
        match self.fetch_body(service).await {
            Ok(body) => SpecResult::from_body(body),
            Err(e) => SpecResult::failed(e),
        }
    }
}

fn header_map(headers: &HeaderSet) -> shared::Result<HeaderMap> {
    let mut map = HeaderMap::with_capacity(headers.len());
    for (name, value) in headers {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|_| shared::Error::config(format!("Invalid header name: {}", name)))?;
        let value = HeaderValue::from_str(value)
            .map_err(|_| shared::Error::config(format!("Invalid value for header {}", name)))?;
        map.insert(name, value);
    }
    Ok(map)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spec_url_joins_without_double_slash() {
        assert_eq!(
            spec_url("http://svc1/", "/openapi.json").unwrap(),
            "http://svc1/openapi.json"
        );
        assert_eq!(
            spec_url("http://svc1/api/", "openapi.json").unwrap(),
            "http://svc1/api/openapi.json"
        );
    }

    #[test]
    fn test_spec_url_requires_trailing_slash() {
        let err = spec_url("http://svc1", "/openapi.json").unwrap_err();
        assert_eq!(
            err,
            FetchError::MalformedUrl {
                url: "http://svc1".to_string()
            }
        );
        assert_eq!(err.to_string(), "Microservice URL doesn't have a trailing '/'.");
    }

    #[test]
    fn test_fetch_failed_message() {
        let err = FetchError::FetchFailed { status: 503 };
        assert_eq!(
            err.to_string(),
            "failed to retrieve OpenAPI spec: received status code 503"
        );
    }

    #[test]
    fn test_only_parse_errors_are_non_fatal() {
        assert!(FetchError::MalformedUrl { url: String::new() }.is_fatal());
        assert!(FetchError::Transport("refused".into()).is_fatal());
        assert!(FetchError::FetchFailed { status: 404 }.is_fatal());
        assert!(!FetchError::Parse("eof".into()).is_fatal());
    }

    #[test]
    fn test_from_body_extracts_title_and_summary() {
        let body = br#"{"openapi":"3.1.0","info":{"title":"Svc1","summary":"demo"}}"#.to_vec();
        let result = SpecResult::from_body(body.clone());

        assert_eq!(result.title, "Svc1");
        assert_eq!(result.summary, "demo");
        assert_eq!(result.body, body);
        assert!(result.error.is_none());
        assert!(result.is_usable());
    }

    #[test]
    fn test_from_body_tolerates_missing_info() {
        let result = SpecResult::from_body(br#"{"openapi":"3.0.0"}"#.to_vec());
        assert_eq!(result.title, "");
        assert_eq!(result.summary, "");
        assert!(result.error.is_none());

        let result = SpecResult::from_body(br#"{"info":{"title":42}}"#.to_vec());
        assert_eq!(result.title, "");
    }

    #[test]
    fn test_from_body_keeps_bytes_on_parse_error() {
        let body = b"openapi: 3.0.0\ninfo:\n  title: yaml".to_vec();
        let result = SpecResult::from_body(body.clone());

        assert_eq!(result.body, body);
        assert_eq!(result.title, "");
        assert!(matches!(result.error, Some(FetchError::Parse(_))));
        assert!(result.is_usable());
    }

    #[test]
    fn test_failed_result_is_not_usable() {
        let result = SpecResult::failed(FetchError::FetchFailed { status: 500 });
        assert!(result.body.is_empty());
        assert!(!result.is_usable());
    }

    #[test]
    fn test_invalid_header_name_rejected() {
        let mut headers = HeaderSet::new();
        headers.insert("bad header".to_string(), "x".to_string());
        let config = GatewayConfig {
            headers,
            api_specs_path: "/openapi.json".to_string(),
            ..Default::default()
        };

        let result = ReqwestSpecFetcher::new(&config);
        assert!(matches!(result, Err(shared::Error::Config(_))));
    }

    #[tokio::test]
    async fn test_malformed_url_fails_before_any_request() {
        let config = GatewayConfig {
            api_specs_path: "/openapi.json".to_string(),
            ..Default::default()
        };
        let fetcher = ReqwestSpecFetcher::new(&config).unwrap();

        // Nothing listens on this port; a MalformedUrl proves no connect was tried.
        let service = MicroserviceConfig::new("svc1", "http://127.0.0.1:9");
        let result = fetcher.fetch(&service).await;

        assert!(matches!(result.error, Some(FetchError::MalformedUrl { .. })));
    }
}
