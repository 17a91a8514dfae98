//! The request/response contract between the Ariel client and an HTTP transport.
//!
//! [`ArielClient`](crate::ArielClient) only decides *what* to send. Anything
//! implementing [`Transport`] decides *how*: connection pooling, TLS, retries,
//! and proxying. [`RestApiClient`](crate::RestApiClient) is the reqwest-backed
//! implementation used in production.

use std::borrow::Cow;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::HeaderMap;
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use typed_builder::TypedBuilder;

use crate::error::ClientError;

/// Ordered key/value pairs used for query strings and form bodies.
///
/// Setting a key that is already present replaces its value in place.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Params(Vec<(String, String)>);

impl Params {
    /// Creates an empty parameter set.
    #[must_use]
    pub const fn new() -> Self {
        Self(Vec::new())
    }

    /// Sets `key` to `value` and returns the updated set.
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(key, value);
        self
    }

    /// Sets `key` to `value`, replacing any previous value.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.0.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.0.push((key, value)),
        }
    }

    /// Returns the value for `key`, if set.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Whether no parameters are set.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of parameters.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.0.len()
    }

    /// Iterates over `(key, value)` pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// The pairs as a slice, suitable for form encoding.
    #[must_use]
    pub fn as_slice(&self) -> &[(String, String)] {
        &self.0
    }
}

/// A single HTTP call, described independently of any HTTP library.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use ariel_client::{ApiRequest, Params};
/// use reqwest::Method;
///
/// let request = ApiRequest::builder()
///     .endpoint("api/ariel/searches")
///     .method(Method::GET)
///     .query(Params::new().with("data_lake", "\"qcdl\""))
///     .timeout(Duration::from_secs(30))
///     .build();
///
/// assert_eq!(request.query.get("data_lake"), Some("\"qcdl\""));
/// ```
#[derive(Debug, Clone, TypedBuilder)]
pub struct ApiRequest {
    /// Path relative to the API root, without a leading slash.
    #[builder(setter(into))]
    pub endpoint: String,
    /// HTTP verb.
    pub method: Method,
    /// Headers that replace same-named defaults for this call only.
    #[builder(default)]
    pub headers: HeaderMap,
    /// Form-encoded request body.
    #[builder(default, setter(strip_option))]
    pub form: Option<Params>,
    /// Query string parameters.
    #[builder(default)]
    pub query: Params,
    /// Deadline for the whole call.
    pub timeout: Duration,
}

/// The raw outcome of a call: status, headers, and body bytes.
///
/// No interpretation is applied. Callers check [`status`](Self::status) and
/// parse the body themselves.
#[derive(Debug, Clone)]
pub struct ApiResponse {
    /// HTTP status code.
    pub status: StatusCode,
    /// Response headers.
    pub headers: HeaderMap,
    /// Response body.
    pub body: Vec<u8>,
}

impl ApiResponse {
    /// Whether the status is in the 2xx range.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// The body as text, replacing invalid UTF-8.
    #[must_use]
    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.body)
    }

    /// Parses the body as JSON.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::SerializationError`] if the body is not valid
    /// JSON for `T`.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, ClientError> {
        Ok(serde_json::from_slice(&self.body)?)
    }
}

/// Output of a [`UrlModifier`]: where to send the request and with which headers.
#[derive(Debug, Clone)]
pub struct RewrittenRequest {
    /// The URL to dispatch to.
    pub url: String,
    /// The complete header set to send.
    pub headers: HeaderMap,
}

/// Hook applied to every request just before dispatch.
///
/// Receives the full request URL, the endpoint path, and the merged headers,
/// and returns a new URL and header set. It must not depend on anything but
/// its inputs.
pub type UrlModifier = fn(&str, &str, &HeaderMap) -> Result<RewrittenRequest, ClientError>;

/// A generic REST call primitive.
///
/// Implementations own connection handling, TLS, retries, and timeouts. They
/// return every HTTP response, successful or not, and fail only when no
/// response was obtained.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Performs one HTTP call.
    ///
    /// # Errors
    ///
    /// Returns an error if the request could not be built or no response was
    /// received (connection refused, TLS failure, timeout, retries exhausted).
    async fn call_api(&self, request: ApiRequest) -> Result<ApiResponse, ClientError>;
}
