//! Remote HTTP/Consul configuration source.

use super::cache::DocumentCache;
use super::{ConfigSource, Format};
use crate::core::{Provider, WatchSettings};
use crate::error::{ConfigError, Result};
use async_trait::async_trait;
use reqwest::{Client, header::HeaderValue};
use serde_json::Value as JsonValue;
use std::time::Duration;

/// Header Consul reads ACL tokens from.
const CONSUL_TOKEN_HEADER: &str = "X-Consul-Token";

/// Authentication method for remote requests.
#[derive(Clone)]
pub enum HttpAuth {
    /// No authentication
    None,
    /// Token authentication (`Authorization: Bearer` for HTTP, `X-Consul-Token` for Consul)
    Token(String),
    /// Basic authentication (username, password)
    Basic(String, String),
}

/// Remote configuration source.
///
/// Fetches a whole configuration document from a remote store on each refresh and caches the
/// last-known-good copy. Reads are served from that cache, so an outage only makes values
/// stale.
///
/// # Examples
///
/// ```rust,no_run
/// use remote_config_watch::core::Provider;
/// use remote_config_watch::sources::{Format, RemoteSource};
/// use std::time::Duration;
///
/// # fn example() -> remote_config_watch::error::Result<()> {
/// let source = RemoteSource::builder()
///     .with_address("127.0.0.1:8500")
///     .with_provider(Provider::Consul)
///     .with_path("services/api/config")
///     .with_format(Format::Yaml)
///     .with_timeout(Duration::from_secs(5))
///     .build()?;
/// # Ok(())
/// # }
/// ```
pub struct RemoteSource {
    provider: Provider,
    endpoint: String,
    client: Client,
    auth: HttpAuth,
    format: Format,
    cache: DocumentCache,
}

impl RemoteSource {
    /// Create a new builder for constructing a remote source.
    pub fn builder() -> RemoteSourceBuilder {
        RemoteSourceBuilder::new()
    }

    /// The fully resolved URL this source polls.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Fetch and decode the document from the remote endpoint.
    async fn fetch(&self) -> Result<JsonValue> {
        let mut request = self.client.get(&self.endpoint);

        request = match (&self.auth, self.provider) {
            (HttpAuth::None, _) => request,
            (HttpAuth::Token(token), Provider::Consul) => {
                let header_value = HeaderValue::from_str(token)
                    .map_err(|e| ConfigError::LoadError(format!("Invalid Consul token: {}", e)))?;
                request.header(CONSUL_TOKEN_HEADER, header_value)
            }
            (HttpAuth::Token(token), Provider::Http) => request.bearer_auth(token),
            (HttpAuth::Basic(username, password), _) => {
                request.basic_auth(username, Some(password))
            }
        };

        let response = request
            .send()
            .await
            .map_err(|e| ConfigError::refresh(self.name(), format!("request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ConfigError::refresh(
                self.name(),
                format!(
                    "request failed with status {}: {}",
                    status,
                    status.canonical_reason().unwrap_or("Unknown")
                ),
            ));
        }

        let body = response
            .text()
            .await
            .map_err(|e| ConfigError::refresh(self.name(), format!("failed to read body: {}", e)))?;

        self.format.decode(&body)
    }
}

#[async_trait]
impl ConfigSource for RemoteSource {
    type Value = JsonValue;

    fn get(&self, key: &str) -> Option<JsonValue> {
        self.cache.get(key)
    }

    fn set_default(&self, key: &str, value: JsonValue) {
        self.cache.set_default(key, value);
    }

    async fn refresh(&self) -> Result<()> {
        let document = self.fetch().await?;
        self.cache.replace(document);
        Ok(())
    }

    fn name(&self) -> String {
        match self.provider {
            Provider::Consul => format!("consul:{}", self.endpoint),
            Provider::Http => format!("http:{}", self.endpoint),
        }
    }
}

/// Builder for constructing a [`RemoteSource`].
pub struct RemoteSourceBuilder {
    address: Option<String>,
    provider: Provider,
    path: String,
    format: Format,
    auth: HttpAuth,
    timeout: Duration,
}

impl RemoteSourceBuilder {
    /// Create a new builder with default settings (Consul, JSON, 10s timeout).
    pub fn new() -> Self {
        Self {
            address: None,
            provider: Provider::default(),
            path: String::new(),
            format: Format::default(),
            auth: HttpAuth::None,
            timeout: Duration::from_secs(10),
        }
    }

    /// Seed a builder from [`WatchSettings`].
    pub fn from_settings(settings: &WatchSettings) -> Self {
        let mut builder = Self::new()
            .with_address(settings.address.clone())
            .with_provider(settings.provider)
            .with_path(settings.path.clone())
            .with_format(settings.format);
        if let Some(token) = &settings.token {
            builder = builder.with_auth_token(token.clone());
        }
        builder
    }

    /// Set the remote store address, e.g. `127.0.0.1:8500` or `https://config.internal`.
    ///
    /// A missing scheme defaults to `http://`.
    pub fn with_address(mut self, address: impl Into<String>) -> Self {
        self.address = Some(address.into());
        self
    }

    /// Select the remote store kind.
    pub fn with_provider(mut self, provider: Provider) -> Self {
        self.provider = provider;
        self
    }

    /// Set the key (Consul) or URL path (HTTP) holding the document.
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = path.into();
        self
    }

    /// Set the document encoding.
    pub fn with_format(mut self, format: Format) -> Self {
        self.format = format;
        self
    }

    /// Set token authentication.
    pub fn with_auth_token(mut self, token: impl Into<String>) -> Self {
        self.auth = HttpAuth::Token(token.into());
        self
    }

    /// Set Basic authentication.
    pub fn with_basic_auth(
        mut self,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        self.auth = HttpAuth::Basic(username.into(), password.into());
        self
    }

    /// Set the request timeout.
    ///
    /// Default is 10 seconds.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Build the remote source.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - No address is provided
    /// - The Consul provider is selected without a key path
    /// - The HTTP client cannot be constructed
    pub fn build(self) -> Result<RemoteSource> {
        let address = self
            .address
            .filter(|address| !address.trim().is_empty())
            .ok_or_else(|| {
                ConfigError::InvalidSettings("address is required for RemoteSource".to_string())
            })?;

        let endpoint = resolve_endpoint(&address, self.provider, &self.path)?;

        let client = Client::builder()
            .timeout(self.timeout)
            .build()
            .map_err(|e| ConfigError::LoadError(format!("Failed to create HTTP client: {}", e)))?;

        Ok(RemoteSource {
            provider: self.provider,
            endpoint,
            client,
            auth: self.auth,
            format: self.format,
            cache: DocumentCache::new(),
        })
    }
}

impl Default for RemoteSourceBuilder {
    fn default() -> Self {
        Self::new()
    }
}

fn resolve_endpoint(address: &str, provider: Provider, path: &str) -> Result<String> {
    let address = address.trim().trim_end_matches('/');
    let base = if address.contains("://") {
        address.to_string()
    } else {
        format!("http://{}", address)
    };
    let path = path.trim_matches('/');

    match provider {
        Provider::Consul if path.is_empty() => Err(ConfigError::InvalidSettings(
            "path is required for the Consul provider".to_string(),
        )),
        Provider::Consul => Ok(format!("{}/v1/kv/{}?raw", base, path)),
        Provider::Http if path.is_empty() => Ok(base),
        Provider::Http => Ok(format!("{}/{}", base, path)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::task::JoinHandle;

    /// Answer one HTTP request with `status_line` and `body`, returning the raw request.
    async fn serve_once(status_line: &'static str, body: &'static str) -> (String, JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = vec![0u8; 8192];
            let n = socket.read(&mut buf).await.unwrap();
            let request = String::from_utf8_lossy(&buf[..n]).to_string();

            let response = format!(
                "{}\r\nContent-Type: text/plain\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                status_line,
                body.len(),
                body
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            let _ = socket.shutdown().await;
            request
        });

        (addr.to_string(), handle)
    }

    #[test]
    fn test_consul_endpoint() {
        let source = RemoteSource::builder()
            .with_address("127.0.0.1:8500/")
            .with_path("/services/api/config/")
            .build()
            .unwrap();
        assert_eq!(
            source.endpoint(),
            "http://127.0.0.1:8500/v1/kv/services/api/config?raw"
        );
        assert!(source.name().starts_with("consul:"));
    }

    #[test]
    fn test_http_endpoint() {
        let source = RemoteSource::builder()
            .with_address("https://config.example.com")
            .with_provider(Provider::Http)
            .with_path("api/config")
            .build()
            .unwrap();
        assert_eq!(source.endpoint(), "https://config.example.com/api/config");

        let bare = RemoteSource::builder()
            .with_address("https://config.example.com/api/config")
            .with_provider(Provider::Http)
            .build()
            .unwrap();
        assert_eq!(bare.endpoint(), "https://config.example.com/api/config");
    }

    #[test]
    fn test_builder_no_address() {
        assert!(RemoteSource::builder().with_path("a").build().is_err());
        assert!(RemoteSource::builder().with_address("  ").with_path("a").build().is_err());
    }

    #[test]
    fn test_consul_requires_path() {
        let result = RemoteSource::builder().with_address("localhost:8500").build();
        assert!(matches!(result, Err(ConfigError::InvalidSettings(_))));
    }

    #[tokio::test]
    async fn test_refresh_from_consul() {
        let (address, server) = serve_once("HTTP/1.1 200 OK", "limit: 10\nname: api\n").await;

        let source = RemoteSource::builder()
            .with_address(address)
            .with_path("app/config")
            .with_format(Format::Yaml)
            .with_auth_token("secret")
            .build()
            .unwrap();

        source.refresh().await.unwrap();
        assert_eq!(source.get("limit"), Some(json!(10)));
        assert_eq!(source.get("name"), Some(json!("api")));

        let request = server.await.unwrap().to_lowercase();
        assert!(request.starts_with("get /v1/kv/app/config?raw "));
        assert!(request.contains("x-consul-token: secret"));
    }

    #[tokio::test]
    async fn test_refresh_from_http_with_bearer() {
        let (address, server) = serve_once("HTTP/1.1 200 OK", r#"{"limit": 20}"#).await;

        let source = RemoteSource::builder()
            .with_address(address)
            .with_provider(Provider::Http)
            .with_path("config.json")
            .with_auth_token("abc")
            .build()
            .unwrap();

        source.refresh().await.unwrap();
        assert_eq!(source.get("limit"), Some(json!(20)));

        let request = server.await.unwrap().to_lowercase();
        assert!(request.starts_with("get /config.json "));
        assert!(request.contains("authorization: bearer abc"));
    }

    #[tokio::test]
    async fn test_error_status_keeps_last_good() {
        let (address, _server) = serve_once("HTTP/1.1 200 OK", r#"{"limit": 10}"#).await;
        let source = RemoteSource::builder()
            .with_address(address)
            .with_provider(Provider::Http)
            .build()
            .unwrap();
        source.refresh().await.unwrap();

        // The responder only answers once, so this refresh cannot connect.
        let result = source.refresh().await;
        assert!(result.is_err());
        assert_eq!(source.get("limit"), Some(json!(10)));

        let (address, _server) = serve_once("HTTP/1.1 404 Not Found", "").await;
        let missing = RemoteSource::builder()
            .with_address(address)
            .with_path("missing")
            .build()
            .unwrap();
        let err = missing.refresh().await.unwrap_err();
        assert!(matches!(err, ConfigError::RefreshError { .. }));
        assert!(err.to_string().contains("404"));
    }
}
