//! Connection, authentication, and transport configuration.
//!
//! The field names follow the connection document used by Ariel deployments,
//! so a configuration file can be deserialized directly:
//!
//! ```toml
//! [connection]
//! host = "siem.example.com"
//! port = 443
//! data_lake = false
//! selfSignedCert = true
//!
//! [connection.options]
//! timeout = 30
//!
//! [connection.proxy]
//! url = "proxy.example.com:3128"
//! auth = "dXNlcjpwYXNz"
//!
//! [auth]
//! sec = "00000000-0000-0000-0000-000000000000"
//! ```

use std::time::Duration;

use secrecy::SecretString;
use serde::Deserialize;

/// Configuration for exponential backoff retry behavior in the transport.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use ariel_common::RetryConfig;
///
/// let config = RetryConfig {
///     max_retries: 5,
///     initial_delay: Duration::from_millis(500),
///     max_delay: Duration::from_secs(60),
/// };
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryConfig {
    /// Maximum number of retry attempts before failing.
    pub max_retries: u32,
    /// Initial delay before the first retry attempt.
    pub initial_delay: Duration,
    /// Maximum delay between retry attempts (caps exponential growth).
    pub max_delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay: Duration::from_millis(1000),
            max_delay: Duration::from_secs(30),
        }
    }
}

impl RetryConfig {
    /// A policy that never retries.
    #[must_use]
    pub fn disabled() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }
}

/// How the server certificate is verified.
///
/// Deserializes from either a boolean or a PEM string, matching the
/// `selfSignedCert` connection field:
///
/// - `true` verifies against the system trust store (the default)
/// - `false` accepts any certificate
/// - a PEM string is trusted as an additional root certificate
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum TlsVerification {
    /// Verification on or off.
    Flag(bool),
    /// A PEM-encoded certificate to trust.
    Certificate(String),
}

impl Default for TlsVerification {
    fn default() -> Self {
        Self::Flag(true)
    }
}

/// Proxy settings for a connection.
///
/// `url` and `auth` are only honoured as a pair. `x_forward_proxy` switches the
/// client into forwarding mode, where requests are sent to that address and the
/// real destination travels in the `x-forward-url` header.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProxyConfig {
    /// Proxy address sent in the `proxy` header.
    pub url: Option<String>,
    /// Basic credential sent as `proxy-authorization: Basic <auth>`.
    pub auth: Option<SecretString>,
    /// `host:port` of a forwarding proxy.
    pub x_forward_proxy: Option<String>,
    /// Credential for the forwarding proxy, sent as `x-forward-auth`.
    pub x_forward_proxy_auth: Option<SecretString>,
}

impl ProxyConfig {
    /// Returns the proxy url and credential when both are configured.
    #[must_use]
    pub fn basic_auth(&self) -> Option<(&str, &SecretString)> {
        match (self.url.as_deref(), self.auth.as_ref()) {
            (Some(url), Some(auth)) => Some((url, auth)),
            _ => None,
        }
    }

    /// Whether requests are routed through a forwarding proxy.
    #[must_use]
    pub const fn is_forwarding(&self) -> bool {
        self.x_forward_proxy.is_some()
    }
}

/// Per-connection options.
#[derive(Debug, Clone, Deserialize)]
pub struct ConnectionOptions {
    /// Timeout in seconds applied to every search-related request.
    pub timeout: u64,
    /// Retry behaviour of the transport.
    #[serde(skip)]
    pub retry: RetryConfig,
}

/// Where and how to reach the Ariel API.
#[derive(Debug, Clone, Deserialize)]
pub struct ConnectionConfig {
    /// Host name or address of the console.
    pub host: String,
    /// Port of the console. When absent the host is used on its own.
    pub port: Option<u16>,
    /// Optional proxy settings.
    pub proxy: Option<ProxyConfig>,
    /// Certificate verification.
    #[serde(default, rename = "selfSignedCert", alias = "self_signed_cert")]
    pub tls: TlsVerification,
    /// Server name to present during the TLS handshake.
    pub sni: Option<String>,
    /// Route search requests to the data lake.
    #[serde(default)]
    pub data_lake: bool,
    /// Request options.
    pub options: ConnectionOptions,
}

impl ConnectionConfig {
    /// Creates a connection with the given host, port, and search timeout.
    ///
    /// # Examples
    ///
    /// ```
    /// use ariel_common::ConnectionConfig;
    ///
    /// let connection = ConnectionConfig::new("siem.example.com", Some(443), 30);
    /// assert_eq!(connection.host_port(), "siem.example.com:443");
    /// ```
    pub fn new(host: impl Into<String>, port: Option<u16>, timeout_seconds: u64) -> Self {
        Self {
            host: host.into(),
            port,
            proxy: None,
            tls: TlsVerification::default(),
            sni: None,
            data_lake: false,
            options: ConnectionOptions {
                timeout: timeout_seconds,
                retry: RetryConfig::default(),
            },
        }
    }

    /// Sets the proxy configuration.
    #[must_use]
    pub fn with_proxy(mut self, proxy: ProxyConfig) -> Self {
        self.proxy = Some(proxy);
        self
    }

    /// Sets certificate verification.
    #[must_use]
    pub fn with_tls(mut self, tls: TlsVerification) -> Self {
        self.tls = tls;
        self
    }

    /// Sets the SNI override.
    #[must_use]
    pub fn with_sni(mut self, sni: impl Into<String>) -> Self {
        self.sni = Some(sni.into());
        self
    }

    /// Enables or disables the data lake.
    #[must_use]
    pub const fn with_data_lake(mut self, data_lake: bool) -> Self {
        self.data_lake = data_lake;
        self
    }

    /// Sets the transport retry configuration.
    #[must_use]
    pub fn with_retry_config(mut self, retry: RetryConfig) -> Self {
        self.options.retry = retry;
        self
    }

    /// `host:port`, or just the host when no port is configured.
    #[must_use]
    pub fn host_port(&self) -> String {
        match self.port {
            Some(port) => format!("{}:{port}", self.host),
            None => self.host.clone(),
        }
    }

    /// The search timeout as a `Duration`.
    #[must_use]
    pub const fn search_timeout(&self) -> Duration {
        Duration::from_secs(self.options.timeout)
    }
}

/// Authentication settings.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AuthConfig {
    /// Authorized service token, sent in the `sec` header.
    pub sec: Option<SecretString>,
}

impl AuthConfig {
    /// Creates auth settings with a security token.
    pub fn with_sec(sec: impl Into<String>) -> Self {
        Self {
            sec: Some(SecretString::new(sec.into().into())),
        }
    }
}

/// A complete client configuration as stored on disk.
#[derive(Debug, Clone, Deserialize)]
pub struct ArielConfig {
    /// Connection settings.
    pub connection: ConnectionConfig,
    /// Authentication settings.
    #[serde(default)]
    pub auth: AuthConfig,
}
