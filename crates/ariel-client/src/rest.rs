//! reqwest-backed [`Transport`] implementation.
//!
//! # Features
//!
//! - **Automatic Retries**: exponential backoff for transient failures, honouring
//!   `Retry-After` headers first
//! - **TLS Control**: system roots, an extra trusted self-signed certificate, or
//!   no verification at all
//! - **SNI Override**: present a different server name than the address
//!   connected to
//! - **Secret Headers**: credential headers are marked sensitive and never
//!   appear in `Debug` output

use std::net::{SocketAddr, ToSocketAddrs};

use async_trait::async_trait;
use log::{debug, warn};
use reqwest::header::HeaderMap;
use reqwest_middleware::ClientWithMiddleware;
use reqwest_retry::{RetryTransientMiddleware, policies::ExponentialBackoff};
use reqwest_retry_after::RetryAfterMiddleware;
use url::Url;

use ariel_common::{RetryConfig, TlsVerification};

use crate::error::ClientError;
use crate::transport::{ApiRequest, ApiResponse, Transport, UrlModifier};

/// Port assumed when the host carries none.
const DEFAULT_HTTPS_PORT: u16 = 443;

/// Everything needed to build a [`RestApiClient`].
#[derive(Debug, Clone)]
pub struct TransportConfig {
    /// `host:port` requests are sent to.
    pub host_port: String,
    /// Headers sent with every request.
    pub headers: HeaderMap,
    /// Hook applied to each request just before dispatch.
    pub url_modifier: Option<UrlModifier>,
    /// Certificate verification.
    pub tls: TlsVerification,
    /// Server name presented during the TLS handshake.
    pub sni: Option<String>,
    /// Retry behaviour.
    pub retry: RetryConfig,
}

impl TransportConfig {
    /// Creates a configuration with no default headers, verification on, and
    /// default retries.
    pub fn new(host_port: impl Into<String>) -> Self {
        Self {
            host_port: host_port.into(),
            headers: HeaderMap::new(),
            url_modifier: None,
            tls: TlsVerification::default(),
            sni: None,
            retry: RetryConfig::default(),
        }
    }
}

/// Generic REST client over HTTPS.
///
/// Requests go to `https://<host:port>/<endpoint>`. Default headers are sent
/// with every call; per-call headers replace defaults of the same name. Every
/// HTTP response is returned as an [`ApiResponse`], whatever its status.
#[derive(Clone)]
pub struct RestApiClient {
    client: ClientWithMiddleware,
    base_url: Url,
    headers: HeaderMap,
    url_modifier: Option<UrlModifier>,
}

impl std::fmt::Debug for RestApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // HeaderMap prints sensitive values as `Sensitive`
        f.debug_struct("RestApiClient")
            .field("base_url", &self.base_url.as_str())
            .field("headers", &self.headers)
            .field("url_modifier", &self.url_modifier.is_some())
            .finish_non_exhaustive()
    }
}

impl RestApiClient {
    /// Builds the client.
    ///
    /// When an SNI name is configured, the request URL carries that name and
    /// its DNS lookup is pinned to the addresses of the configured host, so the
    /// handshake presents the SNI name while connecting to the real host.
    ///
    /// The pinning lookup uses the blocking system resolver and runs once,
    /// here. Call this at startup rather than from a hot async path. The
    /// resolved addresses are kept for the lifetime of the client; build a new
    /// client to pick up DNS changes.
    ///
    /// # Errors
    ///
    /// Returns an error if the certificate cannot be parsed, the host cannot
    /// be resolved for SNI pinning, the base URL is invalid, or the HTTP
    /// client fails to build.
    pub fn new(config: TransportConfig) -> Result<Self, ClientError> {
        let mut builder = reqwest::Client::builder();

        builder = match &config.tls {
            TlsVerification::Flag(true) => builder,
            TlsVerification::Flag(false) => {
                warn!("Certificate verification disabled for {}", config.host_port);
                builder.danger_accept_invalid_certs(true)
            }
            TlsVerification::Certificate(pem) => {
                let certificate = reqwest::Certificate::from_pem(pem.as_bytes()).map_err(|e| {
                    ClientError::ConfigurationError(format!("invalid certificate: {e}"))
                })?;
                builder.add_root_certificate(certificate)
            }
        };

        let authority = match &config.sni {
            Some(sni) => {
                let (host, port) = split_host_port(&config.host_port);
                let addrs: Vec<SocketAddr> = (host, port).to_socket_addrs()?.collect();
                if addrs.is_empty() {
                    return Err(ClientError::ConfigurationError(format!(
                        "cannot resolve {host} for SNI {sni}"
                    )));
                }
                debug!("Pinning {sni} to {addrs:?}");
                builder = builder.resolve_to_addrs(sni, &addrs);
                format!("{sni}:{port}")
            }
            None => config.host_port.clone(),
        };

        let base_url = Url::parse(&format!("https://{authority}/"))?;

        let retry_policy = ExponentialBackoff::builder()
            .retry_bounds(config.retry.initial_delay, config.retry.max_delay)
            .build_with_max_retries(config.retry.max_retries);

        // RetryAfterMiddleware goes first so Retry-After wins over backoff
        let client = reqwest_middleware::ClientBuilder::new(builder.build()?)
            .with(RetryAfterMiddleware::new())
            .with(RetryTransientMiddleware::new_with_policy(retry_policy))
            .build();

        Ok(Self {
            client,
            base_url,
            headers: config.headers,
            url_modifier: config.url_modifier,
        })
    }

    /// Replaces the base URL requests are sent to.
    ///
    /// Useful for plain-HTTP endpoints and local test servers.
    ///
    /// # Errors
    ///
    /// Returns an error if `base_url` is not a valid URL.
    pub fn with_base_url(mut self, base_url: &str) -> Result<Self, ClientError> {
        let mut base_url = Url::parse(base_url)?;
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }
        self.base_url = base_url;
        Ok(self)
    }

    /// The URL endpoints are joined onto.
    #[must_use]
    pub const fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Headers sent with every request.
    #[must_use]
    pub const fn default_headers(&self) -> &HeaderMap {
        &self.headers
    }
}

#[async_trait]
impl Transport for RestApiClient {
    async fn call_api(&self, request: ApiRequest) -> Result<ApiResponse, ClientError> {
        let ApiRequest {
            endpoint,
            method,
            headers: overrides,
            form,
            query,
            timeout,
        } = request;

        let mut url = self.base_url.join(&endpoint)?;
        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query.iter());
        }

        let mut headers = self.headers.clone();
        headers.extend(overrides);

        let (url, headers) = match self.url_modifier {
            Some(modifier) => {
                let rewritten = modifier(url.as_str(), &endpoint, &headers)?;
                (Url::parse(&rewritten.url)?, rewritten.headers)
            }
            None => (url, headers),
        };

        debug!("{method} {} (timeout {}s)", url.path(), timeout.as_secs());

        let mut builder = self
            .client
            .request(method, url)
            .headers(headers)
            .timeout(timeout);
        if let Some(form) = &form {
            builder = builder.form(form.as_slice());
        }

        let response = builder.send().await?;
        let status = response.status();
        let headers = response.headers().clone();
        let body = response.bytes().await?.to_vec();

        debug!("{endpoint} responded {status} ({} bytes)", body.len());

        Ok(ApiResponse {
            status,
            headers,
            body,
        })
    }
}

/// Splits `host:port`, defaulting the port to 443 and stripping IPv6 brackets.
fn split_host_port(host_port: &str) -> (&str, u16) {
    let (host, port) = match host_port.rsplit_once(':') {
        Some((host, port)) if !host.is_empty() && !port.contains(']') => {
            match port.parse::<u16>() {
                Ok(port) => (host, port),
                Err(_) => (host_port, DEFAULT_HTTPS_PORT),
            }
        }
        _ => (host_port, DEFAULT_HTTPS_PORT),
    };
    (host.trim_start_matches('[').trim_end_matches(']'), port)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::expect_used)]

    use std::time::Duration;

    use reqwest::Method;
    use reqwest::header::{ACCEPT, HeaderValue};
    use wiremock::matchers::{body_string, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::forward::{X_FORWARD_URL, add_endpoint_to_url_header};
    use crate::transport::Params;

    fn test_config() -> TransportConfig {
        let mut config = TransportConfig::new("siem.local:443");
        config.retry = RetryConfig::disabled();
        config
            .headers
            .insert(ACCEPT, HeaderValue::from_static("application/json"));
        config
            .headers
            .insert("version", HeaderValue::from_static("8.0"));
        config
    }

    fn client_for(server: &MockServer, config: TransportConfig) -> RestApiClient {
        RestApiClient::new(config)
            .unwrap()
            .with_base_url(&server.uri())
            .unwrap()
    }

    fn get(endpoint: &str) -> ApiRequest {
        ApiRequest::builder()
            .endpoint(endpoint)
            .method(Method::GET)
            .timeout(Duration::from_secs(5))
            .build()
    }

    #[test]
    fn test_base_url_uses_https_host_port() {
        let client = RestApiClient::new(test_config()).unwrap();
        // 443 is the https default and is dropped from the serialized URL
        assert_eq!(client.base_url().as_str(), "https://siem.local/");
        assert_eq!(client.base_url().port_or_known_default(), Some(443));
    }

    #[test]
    fn test_sni_replaces_url_host() {
        let mut config = test_config();
        config.host_port = "127.0.0.1:8443".to_string();
        config.sni = Some("console.example.com".to_string());

        let client = RestApiClient::new(config).unwrap();
        assert_eq!(
            client.base_url().as_str(),
            "https://console.example.com:8443/"
        );
    }

    #[test]
    fn test_invalid_certificate_is_rejected() {
        let mut config = test_config();
        config.tls = TlsVerification::Certificate(
            "-----BEGIN CERTIFICATE-----\nnot-a-certificate\n-----END CERTIFICATE-----".to_string(),
        );

        let err = RestApiClient::new(config).unwrap_err();
        assert!(
            matches!(err, ClientError::ConfigurationError(ref msg) if msg.contains("invalid certificate")),
            "unexpected error {err:?}"
        );
    }

    #[test]
    fn test_unverified_tls_builds() {
        let mut config = test_config();
        config.tls = TlsVerification::Flag(false);

        let client = RestApiClient::new(config).unwrap();
        assert_eq!(client.base_url().host_str(), Some("siem.local"));
    }

    #[test]
    fn test_sni_with_unresolvable_host_fails() {
        let mut config = test_config();
        config.host_port = "console.invalid:8443".to_string();
        config.sni = Some("console.example.com".to_string());

        let err = RestApiClient::new(config).unwrap_err();
        assert!(
            matches!(err, ClientError::Io(_) | ClientError::ConfigurationError(_)),
            "unexpected error {err:?}"
        );
    }

    #[test]
    fn test_split_host_port() {
        assert_eq!(split_host_port("siem.local:8443"), ("siem.local", 8443));
        assert_eq!(split_host_port("siem.local"), ("siem.local", 443));
        assert_eq!(split_host_port("[::1]:9443"), ("::1", 9443));
        assert_eq!(split_host_port("[::1]"), ("::1", 443));
    }

    #[test]
    fn test_with_base_url_adds_trailing_slash() {
        let client = RestApiClient::new(test_config())
            .unwrap()
            .with_base_url("http://127.0.0.1:9000/prefix")
            .unwrap();
        assert_eq!(client.base_url().as_str(), "http://127.0.0.1:9000/prefix/");
    }

    #[test]
    fn test_debug_hides_sensitive_headers() {
        let mut config = test_config();
        let mut sec = HeaderValue::from_static("super-secret-token");
        sec.set_sensitive(true);
        config.headers.insert("sec", sec);

        let client = RestApiClient::new(config).unwrap();
        let debug_str = format!("{client:?}");
        assert!(!debug_str.contains("super-secret-token"));
        assert!(debug_str.contains("siem.local"));
    }

    #[tokio::test]
    async fn test_default_headers_sent() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/ariel/databases"))
            .and(header("version", "8.0"))
            .and(header("accept", "application/json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!(["events"])))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server, test_config());
        let response = client.call_api(get("api/ariel/databases")).await.unwrap();

        assert!(response.is_success());
        let databases: Vec<String> = response.json().unwrap();
        assert_eq!(databases, vec!["events"]);
    }

    #[tokio::test]
    async fn test_call_headers_replace_defaults() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/ariel/searches/s1/results"))
            .and(header("accept", "application/csv"))
            .respond_with(ResponseTemplate::new(200).set_body_string("a,b\n1,2\n"))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server, test_config());
        let mut request = get("api/ariel/searches/s1/results");
        request
            .headers
            .insert("Accept", HeaderValue::from_static("application/csv"));

        let response = client.call_api(request).await.unwrap();
        assert_eq!(response.text(), "a,b\n1,2\n");

        let received = server.received_requests().await.unwrap();
        let accept: Vec<_> = received[0].headers.get_all("accept").iter().collect();
        assert_eq!(accept.len(), 1);
    }

    #[tokio::test]
    async fn test_query_params_sent() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/ariel/searches"))
            .and(query_param("data_lake", "\"qcdl\""))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([])))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server, test_config());
        let mut request = get("api/ariel/searches");
        request.query = Params::new().with("data_lake", "\"qcdl\"");

        let response = client.call_api(request).await.unwrap();
        assert!(response.is_success());
    }

    #[tokio::test]
    async fn test_form_body_sent() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/ariel/searches/s1"))
            .and(header("content-type", "application/x-www-form-urlencoded"))
            .and(body_string("status=CANCELED"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "search_id": "s1",
                "status": "CANCELED"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server, test_config());
        let request = ApiRequest::builder()
            .endpoint("api/ariel/searches/s1")
            .method(Method::POST)
            .form(Params::new().with("status", "CANCELED"))
            .timeout(Duration::from_secs(5))
            .build();

        let response = client.call_api(request).await.unwrap();
        assert!(response.is_success());
    }

    #[tokio::test]
    async fn test_error_status_is_returned() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/ariel/databases/missing"))
            .respond_with(ResponseTemplate::new(404).set_body_json(serde_json::json!({
                "http_response": {"code": 404, "message": "Not Found"},
                "code": 1002,
                "message": "Database missing does not exist"
            })))
            .mount(&server)
            .await;

        let client = client_for(&server, test_config());
        let response = client
            .call_api(get("api/ariel/databases/missing"))
            .await
            .unwrap();

        assert_eq!(response.status.as_u16(), 404);
        assert!(!response.is_success());
        let body: serde_json::Value = response.json().unwrap();
        assert_eq!(body["code"], 1002);
    }

    #[tokio::test]
    async fn test_url_modifier_applied() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/ariel/searches"))
            .and(header("x-forward-url", "https://siem.local:443/api/ariel/searches"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([])))
            .expect(1)
            .mount(&server)
            .await;

        let mut config = test_config();
        config.headers.insert(
            X_FORWARD_URL,
            HeaderValue::from_static("https://siem.local:443/"),
        );
        config.url_modifier = Some(add_endpoint_to_url_header);

        let client = client_for(&server, config);
        client.call_api(get("api/ariel/searches")).await.unwrap();
        // The stored default is not modified by a call
        assert_eq!(
            client.default_headers().get(X_FORWARD_URL).unwrap(),
            "https://siem.local:443/"
        );
    }

    #[tokio::test]
    async fn test_timeout_surfaces_as_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/help/resources"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(2)))
            .mount(&server)
            .await;

        let client = client_for(&server, test_config());
        let request = ApiRequest::builder()
            .endpoint("api/help/resources")
            .method(Method::GET)
            .timeout(Duration::from_millis(100))
            .build();

        let err = client.call_api(request).await.unwrap_err();
        assert!(err.is_timeout(), "expected timeout, got {err:?}");
    }
}
