//! # ariel-common
//!
//! Shared types for talking to the Ariel search API:
//! - Connection, proxy, TLS, and retry configuration
//! - Authentication settings
//! - Search resource models
//!
//! ## Example
//!
//! ```
//! use ariel_common::{AuthConfig, ConnectionConfig, ProxyConfig};
//!
//! let connection = ConnectionConfig::new("siem.example.com", Some(443), 30)
//!     .with_data_lake(true)
//!     .with_proxy(ProxyConfig {
//!         x_forward_proxy: Some("forwarder.local:8443".to_string()),
//!         ..ProxyConfig::default()
//!     });
//! let auth = AuthConfig::with_sec("token");
//!
//! assert!(connection.proxy.as_ref().is_some_and(ProxyConfig::is_forwarding));
//! assert!(auth.sec.is_some());
//! ```

/// Connection and authentication configuration.
pub mod config;
/// Search resource models.
pub mod search;

pub use config::{
    ArielConfig, AuthConfig, ConnectionConfig, ConnectionOptions, ProxyConfig, RetryConfig,
    TlsVerification,
};
pub use search::{Search, SearchMessage, SearchStatus};
