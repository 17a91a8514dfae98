//! Proxy forwarding support.
//!
//! A forwarding proxy receives every request on its own address and learns the
//! real destination from the `x-forward-url` header. The header is seeded with
//! the console's base URL at construction; the endpoint of each request is
//! appended just before dispatch by [`add_endpoint_to_url_header`].

use reqwest::header::{HeaderMap, HeaderValue};

use crate::error::ClientError;
use crate::transport::RewrittenRequest;

/// Header carrying the true destination of a forwarded request.
pub const X_FORWARD_URL: &str = "x-forward-url";

/// Header carrying the forwarding proxy's credential.
pub const X_FORWARD_AUTH: &str = "x-forward-auth";

/// Appends `endpoint` to the `x-forward-url` header.
///
/// The URL is returned unchanged so the physical request still targets the
/// proxy. A new header map is returned; `headers` is left untouched. When no
/// `x-forward-url` header is present the headers are passed through as-is.
///
/// # Errors
///
/// Returns [`ClientError::InvalidHeader`] if the combined value is not a valid
/// header value, for example when `endpoint` contains a line break.
///
/// # Examples
///
/// ```
/// use ariel_client::forward::{X_FORWARD_URL, add_endpoint_to_url_header};
/// use reqwest::header::{HeaderMap, HeaderValue};
///
/// let mut headers = HeaderMap::new();
/// headers.insert(X_FORWARD_URL, HeaderValue::from_static("https://h:1/"));
///
/// let rewritten =
///     add_endpoint_to_url_header("https://proxy:8080/api/ariel/searches", "api/ariel/searches", &headers)?;
///
/// assert_eq!(rewritten.url, "https://proxy:8080/api/ariel/searches");
/// assert_eq!(rewritten.headers[X_FORWARD_URL], "https://h:1/api/ariel/searches");
/// assert_eq!(headers[X_FORWARD_URL], "https://h:1/");
/// # Ok::<(), ariel_client::ClientError>(())
/// ```
pub fn add_endpoint_to_url_header(
    url: &str,
    endpoint: &str,
    headers: &HeaderMap,
) -> Result<RewrittenRequest, ClientError> {
    let mut headers = headers.clone();

    let forwarded = headers.get(X_FORWARD_URL).map(|base| {
        let mut value = base.as_bytes().to_vec();
        value.extend_from_slice(endpoint.as_bytes());
        value
    });

    if let Some(forwarded) = forwarded {
        headers.insert(X_FORWARD_URL, HeaderValue::from_bytes(&forwarded)?);
    }

    Ok(RewrittenRequest {
        url: url.to_string(),
        headers,
    })
}
