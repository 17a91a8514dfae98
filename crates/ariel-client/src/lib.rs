//! # ariel-client
//!
//! Client library for the Ariel search REST API.
//!
//! The crate is split in two layers:
//! - [`ArielClient`] knows the Ariel endpoints, headers, and query parameters
//! - [`Transport`] performs the HTTP call; [`RestApiClient`] is the reqwest
//!   implementation with retries, TLS control, and SNI override
//!
//! Responses come back raw. Checking the status and parsing the body is up to
//! the caller.
//!
//! ## Example
//!
//! ```no_run
//! use ariel_client::ArielClient;
//! use ariel_common::{AuthConfig, ConnectionConfig, SearchStatus};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let connection = ConnectionConfig::new("siem.example.com", Some(443), 30);
//! let auth = AuthConfig::with_sec("00000000-0000-0000-0000-000000000000");
//! let client = ArielClient::new(&connection, &auth)?;
//!
//! let response = client.ping_box().await?;
//! if !response.is_success() {
//!     anyhow::bail!("console answered {}", response.status);
//! }
//!
//! // Stop a running search
//! client
//!     .update_search("7f3c9a2e", None, Some(SearchStatus::Canceled))
//!     .await?;
//! # Ok(())
//! # }
//! ```

mod ariel;
pub mod error;
pub mod forward;
pub mod rest;
pub mod transport;

pub use ariel::{ArielClient, PING_TIMEOUT, transport_config};
pub use error::ClientError;
pub use rest::{RestApiClient, TransportConfig};
pub use transport::{ApiRequest, ApiResponse, Params, RewrittenRequest, Transport, UrlModifier};
