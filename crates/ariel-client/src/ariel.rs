//! Ariel search API client.
//!
//! Each method issues exactly one request and hands back the raw response.
//! Status checks and body parsing are left to the caller.
//!
//! # Examples
//!
//! ## Submitting a search
//!
//! ```no_run
//! use ariel_client::ArielClient;
//! use ariel_common::{AuthConfig, ConnectionConfig, Search};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let connection = ConnectionConfig::new("siem.example.com", Some(443), 30);
//! let auth = AuthConfig::with_sec("00000000-0000-0000-0000-000000000000");
//! let client = ArielClient::new(&connection, &auth)?;
//!
//! let response = client
//!     .create_search("SELECT sourceip FROM events LAST 10 MINUTES")
//!     .await?;
//! let search: Search = response.json()?;
//!
//! let results = client
//!     .get_search_results(&search.search_id, "application/json", Some(0), Some(49))
//!     .await?;
//! println!("{}", results.text());
//! # Ok(())
//! # }
//! ```
//!
//! ## Forwarding through a proxy
//!
//! ```
//! use ariel_client::ArielClient;
//! use ariel_common::{AuthConfig, ConnectionConfig, ProxyConfig};
//!
//! let connection = ConnectionConfig::new("siem.example.com", Some(443), 30).with_proxy(
//!     ProxyConfig {
//!         x_forward_proxy: Some("forwarder.local:8443".to_string()),
//!         ..ProxyConfig::default()
//!     },
//! );
//!
//! let client = ArielClient::new(&connection, &AuthConfig::default())?;
//! assert_eq!(client.transport().base_url().as_str(), "https://forwarder.local:8443/");
//! # Ok::<(), ariel_client::ClientError>(())
//! ```

use std::time::Duration;

use log::debug;
use reqwest::Method;
use reqwest::header::{ACCEPT, HeaderMap, HeaderValue, PROXY_AUTHORIZATION, RANGE, USER_AGENT};
use secrecy::{ExposeSecret, SecretString};

use ariel_common::{AuthConfig, ConnectionConfig, SearchStatus};

use crate::error::ClientError;
use crate::forward::{X_FORWARD_AUTH, X_FORWARD_URL, add_endpoint_to_url_header};
use crate::rest::{RestApiClient, TransportConfig};
use crate::transport::{ApiRequest, ApiResponse, Params, Transport, UrlModifier};

/// Timeout for [`ArielClient::ping_box`], independent of the search timeout.
pub const PING_TIMEOUT: Duration = Duration::from_secs(10);

/// Prefix of every Ariel endpoint.
const ENDPOINT_START: &str = "api/ariel/";

/// Cheap endpoint used to check connectivity and credentials.
const PING_ENDPOINT: &str = "api/help/resources";

const API_VERSION: &str = "8.0";
const VERSION: &str = "version";
const SEC: &str = "sec";
const PROXY: &str = "proxy";
const FORWARD_USER_AGENT: &str = "UDS";

const DATA_LAKE_PARAM: &str = "data_lake";
const DATA_LAKE_VALUE: &str = "\"qcdl\"";

/// Builds the transport settings for a connection.
///
/// Resolves the target address, the fixed header set, and the forwarding
/// hook. With a forwarding proxy the transport talks to the proxy and the
/// console address travels in `x-forward-url`.
///
/// # Errors
///
/// Returns [`ClientError::InvalidHeader`] if a configured value cannot be
/// sent as a header.
pub fn transport_config(
    connection: &ConnectionConfig,
    auth: &AuthConfig,
) -> Result<TransportConfig, ClientError> {
    let mut host_port = connection.host_port();
    let mut headers = HeaderMap::new();
    let mut url_modifier: Option<UrlModifier> = None;

    headers.insert(VERSION, HeaderValue::from_static(API_VERSION));
    headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

    if let Some(sec) = &auth.sec {
        headers.insert(SEC, sensitive_value(sec, "")?);
    }

    if let Some(proxy) = &connection.proxy {
        if let Some((url, proxy_auth)) = proxy.basic_auth() {
            headers.insert(PROXY, HeaderValue::from_str(url)?);
            headers.insert(PROXY_AUTHORIZATION, sensitive_value(proxy_auth, "Basic ")?);
        }

        if let Some(forward_proxy) = &proxy.x_forward_proxy {
            // endpoint is appended per request by the url modifier
            headers.insert(
                X_FORWARD_URL,
                HeaderValue::from_str(&format!("https://{host_port}/"))?,
            );
            host_port.clone_from(forward_proxy);
            if let Some(forward_auth) = &proxy.x_forward_proxy_auth {
                headers.insert(X_FORWARD_AUTH, sensitive_value(forward_auth, "")?);
            }
            headers.insert(USER_AGENT, HeaderValue::from_static(FORWARD_USER_AGENT));
            url_modifier = Some(add_endpoint_to_url_header);
        }
    }

    Ok(TransportConfig {
        host_port,
        headers,
        url_modifier,
        tls: connection.tls.clone(),
        sni: connection.sni.clone(),
        retry: connection.options.retry.clone(),
    })
}

fn sensitive_value(secret: &SecretString, prefix: &str) -> Result<HeaderValue, ClientError> {
    let mut value = HeaderValue::from_str(&format!("{prefix}{}", secret.expose_secret()))?;
    value.set_sensitive(true);
    Ok(value)
}

/// `Range` header value for a results page, set only when both bounds are known.
fn range_header(
    range_start: Option<u64>,
    range_end: Option<u64>,
) -> Result<Option<HeaderValue>, ClientError> {
    match (range_start, range_end) {
        (Some(start), Some(end)) => Ok(Some(HeaderValue::from_str(&format!(
            "items={start}-{end}"
        ))?)),
        _ => Ok(None),
    }
}

/// Client for the Ariel search API.
///
/// Generic over the [`Transport`] so requests can be captured or redirected;
/// [`ArielClient::new`] wires up the reqwest-backed [`RestApiClient`].
///
/// Configuration is fixed at construction. The client keeps no state between
/// calls, so the data lake parameter is derived afresh for every request.
#[derive(Debug, Clone)]
pub struct ArielClient<T = RestApiClient> {
    transport: T,
    search_timeout: Duration,
    data_lake: bool,
}

impl ArielClient<RestApiClient> {
    /// Creates a client from connection and auth settings.
    ///
    /// # Errors
    ///
    /// Returns an error if a header value is invalid or the transport cannot be
    /// built (bad certificate, unresolvable SNI target).
    pub fn new(connection: &ConnectionConfig, auth: &AuthConfig) -> Result<Self, ClientError> {
        let transport = RestApiClient::new(transport_config(connection, auth)?)?;
        Ok(Self::with_transport(transport, connection))
    }
}

impl<T: Transport> ArielClient<T> {
    /// Creates a client that sends requests through `transport`.
    ///
    /// Only the search timeout and data lake flag are read from `connection`;
    /// everything else is the transport's business.
    pub fn with_transport(transport: T, connection: &ConnectionConfig) -> Self {
        if connection.data_lake {
            debug!("Ariel data lake enabled");
        }

        Self {
            transport,
            search_timeout: connection.search_timeout(),
            data_lake: connection.data_lake,
        }
    }

    /// The underlying transport.
    pub const fn transport(&self) -> &T {
        &self.transport
    }

    /// Timeout applied to every call except [`ping_box`](Self::ping_box).
    pub const fn search_timeout(&self) -> Duration {
        self.search_timeout
    }

    /// Whether search calls target the data lake.
    pub const fn data_lake(&self) -> bool {
        self.data_lake
    }

    fn search_params(&self) -> Params {
        if self.data_lake {
            Params::new().with(DATA_LAKE_PARAM, DATA_LAKE_VALUE)
        } else {
            Params::new()
        }
    }

    async fn send(&self, request: ApiRequest) -> Result<ApiResponse, ClientError> {
        self.transport.call_api(request).await
    }

    /// `GET api/help/resources` with a fixed 10 second timeout.
    ///
    /// # Errors
    ///
    /// Returns any transport error unchanged.
    pub async fn ping_box(&self) -> Result<ApiResponse, ClientError> {
        self.send(
            ApiRequest::builder()
                .endpoint(PING_ENDPOINT)
                .method(Method::GET)
                .timeout(PING_TIMEOUT)
                .build(),
        )
        .await
    }

    /// `GET api/ariel/databases`.
    ///
    /// # Errors
    ///
    /// Returns any transport error unchanged.
    pub async fn get_databases(&self) -> Result<ApiResponse, ClientError> {
        self.send(
            ApiRequest::builder()
                .endpoint(format!("{ENDPOINT_START}databases"))
                .method(Method::GET)
                .timeout(self.search_timeout)
                .build(),
        )
        .await
    }

    /// `GET api/ariel/databases/{database_name}`.
    ///
    /// # Errors
    ///
    /// Returns any transport error unchanged.
    pub async fn get_database(&self, database_name: &str) -> Result<ApiResponse, ClientError> {
        self.send(
            ApiRequest::builder()
                .endpoint(format!("{ENDPOINT_START}databases/{database_name}"))
                .method(Method::GET)
                .timeout(self.search_timeout)
                .build(),
        )
        .await
    }

    /// `GET api/ariel/searches`.
    ///
    /// # Errors
    ///
    /// Returns any transport error unchanged.
    pub async fn get_searches(&self) -> Result<ApiResponse, ClientError> {
        self.send(
            ApiRequest::builder()
                .endpoint(format!("{ENDPOINT_START}searches"))
                .method(Method::GET)
                .query(self.search_params())
                .timeout(self.search_timeout)
                .build(),
        )
        .await
    }

    /// `POST api/ariel/searches` with `query_expression` in the form body.
    ///
    /// # Errors
    ///
    /// Returns any transport error unchanged.
    pub async fn create_search(&self, query_expression: &str) -> Result<ApiResponse, ClientError> {
        self.send(
            ApiRequest::builder()
                .endpoint(format!("{ENDPOINT_START}searches"))
                .method(Method::POST)
                .form(Params::new().with("query_expression", query_expression))
                .query(self.search_params())
                .timeout(self.search_timeout)
                .build(),
        )
        .await
    }

    /// `GET api/ariel/searches/{search_id}`.
    ///
    /// # Errors
    ///
    /// Returns any transport error unchanged.
    pub async fn get_search(&self, search_id: &str) -> Result<ApiResponse, ClientError> {
        self.send(
            ApiRequest::builder()
                .endpoint(format!("{ENDPOINT_START}searches/{search_id}"))
                .method(Method::GET)
                .query(self.search_params())
                .timeout(self.search_timeout)
                .build(),
        )
        .await
    }

    /// `GET api/ariel/searches/{search_id}/results`.
    ///
    /// `response_type` becomes the `Accept` header (for example
    /// `application/json` or `application/csv`). A `Range: items=<start>-<end>`
    /// header is added only when both bounds are given.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::InvalidHeader`] if `response_type` is not a valid
    /// header value, otherwise any transport error unchanged.
    pub async fn get_search_results(
        &self,
        search_id: &str,
        response_type: &str,
        range_start: Option<u64>,
        range_end: Option<u64>,
    ) -> Result<ApiResponse, ClientError> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_str(response_type)?);
        if let Some(range) = range_header(range_start, range_end)? {
            headers.insert(RANGE, range);
        }

        self.send(
            ApiRequest::builder()
                .endpoint(format!("{ENDPOINT_START}searches/{search_id}/results"))
                .method(Method::GET)
                .headers(headers)
                .query(self.search_params())
                .timeout(self.search_timeout)
                .build(),
        )
        .await
    }

    /// `POST api/ariel/searches/{search_id}` to change a search.
    ///
    /// `save_results` is sent only when `Some(true)` and `status` only when
    /// given; otherwise the form body is empty. Setting the status to
    /// [`SearchStatus::Canceled`] stops a running search.
    ///
    /// # Errors
    ///
    /// Returns any transport error unchanged.
    pub async fn update_search(
        &self,
        search_id: &str,
        save_results: Option<bool>,
        status: Option<SearchStatus>,
    ) -> Result<ApiResponse, ClientError> {
        let mut form = Params::new();
        if save_results == Some(true) {
            form.insert("save_results", "true");
        }
        if let Some(status) = status {
            form.insert("status", status.to_string());
        }

        self.send(
            ApiRequest::builder()
                .endpoint(format!("{ENDPOINT_START}searches/{search_id}"))
                .method(Method::POST)
                .form(form)
                .query(self.search_params())
                .timeout(self.search_timeout)
                .build(),
        )
        .await
    }

    /// `DELETE api/ariel/searches/{search_id}`.
    ///
    /// # Errors
    ///
    /// Returns any transport error unchanged.
    pub async fn delete_search(&self, search_id: &str) -> Result<ApiResponse, ClientError> {
        self.send(
            ApiRequest::builder()
                .endpoint(format!("{ENDPOINT_START}searches/{search_id}"))
                .method(Method::DELETE)
                .query(self.search_params())
                .timeout(self.search_timeout)
                .build(),
        )
        .await
    }
}
